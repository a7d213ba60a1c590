//! Import, export, move and copy between host and volume.
//!
//! Every operation works on a [`VolumeSession`] and reports stale
//! directories to an [`InvalidationSink`]. Batches stop at the first
//! failure, but whatever was touched up to that point is still invalidated,
//! so callers must re-read the tree rather than assume atomicity.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::config::settings::Config;
use crate::engine::{FileEntryInfo, TransferMode, VolumeHandle};
use crate::error::{CoreError, CoreResult};
use crate::path;
use crate::rendezvous::{Marshalled, Relay};
use crate::selection;
use crate::session::VolumeSession;
use crate::tree::invalidation::invalidate_parent;
use crate::tree::InvalidationSink;

/// Default prefix for internal-copy scratch directories.
pub const DEFAULT_COPY_PREFIX: &str = "hfsnav-copy";

/// Default prefix for drag-out staging directories.
pub const DEFAULT_DRAG_PREFIX: &str = "hfsnav-drag";

/// Decides whether an existing volume entry may be replaced.
pub trait ReplacePrompt {
    fn confirm_replace(&self, existing: &FileEntryInfo) -> bool;
}

impl<F> ReplacePrompt for F
where
    F: Fn(&FileEntryInfo) -> bool,
{
    fn confirm_replace(&self, existing: &FileEntryInfo) -> bool {
        self(existing)
    }
}

/// Asks the owning thread. A missing answer declines.
impl ReplacePrompt for Relay<FileEntryInfo, bool> {
    fn confirm_replace(&self, existing: &FileEntryInfo) -> bool {
        self.ask(existing.clone()).unwrap_or(false)
    }
}

/// Asks `local` on the owning thread and the owner through the relay
/// elsewhere. A missing relayed answer declines.
impl<F> ReplacePrompt for Marshalled<F, FileEntryInfo, bool>
where
    F: Fn(&FileEntryInfo) -> bool,
{
    fn confirm_replace(&self, existing: &FileEntryInfo) -> bool {
        self.answer(
            |local| local(existing),
            || existing.clone(),
            |answer| answer.unwrap_or(false),
        )
    }
}

/// Outcome of a batch operation, as volume paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferReport {
    /// Items written (or moved) to these destinations.
    pub completed: Vec<String>,
    /// Items the user declined to replace, or host items that vanished.
    pub skipped: Vec<String>,
    /// Items already where they were asked to go.
    pub unchanged: Vec<String>,
}

impl TransferReport {
    pub fn is_empty(&self) -> bool {
        self.completed.is_empty() && self.skipped.is_empty() && self.unchanged.is_empty()
    }
}

/// Performs transfers using one window's current settings.
#[derive(Debug, Clone)]
pub struct TransferOrchestrator {
    mode: TransferMode,
    copy_prefix: String,
    drag_prefix: String,
}

impl Default for TransferOrchestrator {
    fn default() -> Self {
        Self::new(TransferMode::default())
    }
}

impl TransferOrchestrator {
    pub fn new(mode: TransferMode) -> Self {
        Self {
            mode,
            copy_prefix: DEFAULT_COPY_PREFIX.to_string(),
            drag_prefix: DEFAULT_DRAG_PREFIX.to_string(),
        }
    }

    /// Uses the configured transfer mode and staging prefixes.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.general.transfer_mode).with_staging(
            config.staging.copy_prefix.clone(),
            config.staging.drag_prefix.clone(),
        )
    }

    /// Overrides the staging directory prefixes.
    pub fn with_staging(
        mut self,
        copy_prefix: impl Into<String>,
        drag_prefix: impl Into<String>,
    ) -> Self {
        self.copy_prefix = copy_prefix.into();
        self.drag_prefix = drag_prefix.into();
        self
    }

    pub fn mode(&self) -> TransferMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: TransferMode) {
        self.mode = mode;
    }

    /// Looks up an entry named `name` (case-insensitively) in `directory`.
    ///
    /// `None` means there is no conflict.
    pub fn find_conflict<H: VolumeHandle>(
        &self,
        session: &mut VolumeSession<H>,
        directory: &str,
        name: &str,
    ) -> CoreResult<Option<FileEntryInfo>> {
        Ok(session
            .list(directory)?
            .into_iter()
            .find(|entry| path::names_match(&entry.name, name)))
    }

    /// Clears the way for writing `name` into `directory`.
    ///
    /// Returns `false` if an existing entry is in the way and the prompt
    /// declined to replace it.
    fn make_room<H: VolumeHandle>(
        &self,
        session: &mut VolumeSession<H>,
        directory: &str,
        name: &str,
        prompt: &dyn ReplacePrompt,
    ) -> CoreResult<bool> {
        let Some(existing) = self.find_conflict(session, directory, name)? else {
            return Ok(true);
        };
        if !prompt.confirm_replace(&existing) {
            tracing::info!("kept existing {}", existing.path);
            return Ok(false);
        }
        session.delete(&existing)?;
        Ok(true)
    }

    /// Copies host files and directories into `destination`.
    ///
    /// Host items that no longer exist are skipped. `destination` is
    /// invalidated once, whether or not the batch succeeds.
    pub fn import<H: VolumeHandle>(
        &self,
        session: &mut VolumeSession<H>,
        sink: &mut dyn InvalidationSink,
        host_items: &[PathBuf],
        destination: &str,
        prompt: &dyn ReplacePrompt,
    ) -> CoreResult<TransferReport> {
        let mut report = TransferReport::default();
        let result = self.import_all(session, host_items, destination, prompt, &mut report);
        sink.invalidate(destination);
        result?;
        tracing::info!(
            "imported {} item(s) into {destination}, skipped {}",
            report.completed.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    fn import_all<H: VolumeHandle>(
        &self,
        session: &mut VolumeSession<H>,
        host_items: &[PathBuf],
        destination: &str,
        prompt: &dyn ReplacePrompt,
        report: &mut TransferReport,
    ) -> CoreResult<()> {
        for host in host_items {
            let metadata = match fs::metadata(host) {
                Ok(m) => m,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    tracing::warn!("skipping missing host item {}", host.display());
                    report.skipped.push(host.display().to_string());
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            let host_name = host
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let name = path::sanitize(&host_name);
            let target = path::join(destination, &name);

            if !self.make_room(session, destination, &name, prompt)? {
                report.skipped.push(target);
                continue;
            }
            if metadata.is_dir() {
                session.copy_in_directory(host, &target, self.mode)?;
            } else {
                session.copy_in(host, &target, self.mode)?;
            }
            report.completed.push(target);
        }
        Ok(())
    }

    /// Copies one volume entry to the host and returns the written path.
    ///
    /// A directory is merged into `host_destination/<name>`. A file goes
    /// into `host_destination` under its own name if that is an existing
    /// directory, otherwise to exactly `host_destination`.
    ///
    /// # Errors
    ///
    /// [`CoreError::HostNotFound`] if the host directory that should
    /// receive the entry does not exist.
    pub fn export<H: VolumeHandle>(
        &self,
        session: &mut VolumeSession<H>,
        entry: &FileEntryInfo,
        host_destination: &Path,
    ) -> CoreResult<PathBuf> {
        let target = if entry.is_directory || host_destination.is_dir() {
            if !host_destination.is_dir() {
                return Err(CoreError::HostNotFound(host_destination.to_path_buf()));
            }
            host_destination.join(path::host_name(&entry.name))
        } else {
            match host_destination.parent() {
                Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
                    return Err(CoreError::HostNotFound(parent.to_path_buf()));
                }
                _ => host_destination.to_path_buf(),
            }
        };

        if entry.is_directory {
            session.copy_out_directory(&entry.path, &target, self.mode)?;
        } else {
            session.copy_out(&entry.path, &target, self.mode)?;
        }
        tracing::info!("exported {} to {}", entry.path, target.display());
        Ok(target)
    }

    /// Exports `entries` into a fresh staging directory for a drag out of
    /// the window and returns the staged host paths.
    ///
    /// The staging directory is left in place for the drop target to read.
    pub fn export_for_drag<H: VolumeHandle>(
        &self,
        session: &mut VolumeSession<H>,
        entries: &[FileEntryInfo],
    ) -> CoreResult<Vec<PathBuf>> {
        let base = std::env::temp_dir().join(format!("{}-{}", self.drag_prefix, Uuid::new_v4()));
        fs::create_dir_all(&base)?;
        let mut staged = Vec::new();
        for (index, entry) in selection::normalize_for_delete(entries).iter().rev().enumerate() {
            // Same-named entries from different folders each get a slot.
            let slot = base.join(index.to_string());
            fs::create_dir_all(&slot)?;
            staged.push(self.export(session, entry, &slot)?);
        }
        Ok(staged)
    }

    /// Moves `sources` into `destination` on the same volume.
    ///
    /// A source already in `destination` is left alone. The old parents and
    /// `destination` are invalidated even if a move fails.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidDrop`] before any I/O if `destination` lies in
    /// a source's subtree.
    pub fn move_items<H: VolumeHandle, S: AsRef<str>>(
        &self,
        session: &mut VolumeSession<H>,
        sink: &mut dyn InvalidationSink,
        sources: &[S],
        destination: &str,
    ) -> CoreResult<TransferReport> {
        selection::validate_drop(sources, destination)?;
        let mut report = TransferReport::default();
        let mut touched = Vec::new();
        let result = self.move_all(
            session,
            &selection::collapse_paths(sources),
            destination,
            &mut report,
            &mut touched,
        );
        if !touched.is_empty() {
            for parent in &touched {
                sink.invalidate(parent);
            }
            sink.invalidate(destination);
        }
        result?;
        tracing::info!(
            "moved {} item(s) into {destination}, {} already there",
            report.completed.len(),
            report.unchanged.len()
        );
        Ok(report)
    }

    fn move_all<H: VolumeHandle>(
        &self,
        session: &mut VolumeSession<H>,
        sources: &[String],
        destination: &str,
        report: &mut TransferReport,
        touched: &mut Vec<String>,
    ) -> CoreResult<()> {
        for source in sources {
            let parent = path::parent_of(source);
            if path::names_match(parent, destination) {
                report.unchanged.push(source.clone());
                continue;
            }
            if !touched.iter().any(|t| t == parent) {
                touched.push(parent.to_string());
            }
            session.move_entry(source, destination)?;
            report
                .completed
                .push(path::join(destination, path::name_of(source)));
        }
        Ok(())
    }

    /// Copies `sources` into `destination` on the same volume.
    ///
    /// The volume has no copy primitive, so each source is exported into a
    /// scratch directory and imported back under its original name. The
    /// scratch directory is removed before returning, and `destination` is
    /// invalidated, on success and failure alike.
    pub fn copy_items<H: VolumeHandle, S: AsRef<str>>(
        &self,
        session: &mut VolumeSession<H>,
        sink: &mut dyn InvalidationSink,
        sources: &[S],
        destination: &str,
        prompt: &dyn ReplacePrompt,
    ) -> CoreResult<TransferReport> {
        selection::validate_drop(sources, destination)?;
        let scratch = tempfile::Builder::new()
            .prefix(&format!("{}-", self.copy_prefix))
            .tempdir()?;
        let mut report = TransferReport::default();
        let result = self.copy_all(
            session,
            &selection::collapse_paths(sources),
            destination,
            scratch.path(),
            prompt,
            &mut report,
        );
        sink.invalidate(destination);
        if let Err(e) = scratch.close() {
            tracing::warn!("failed to remove copy scratch directory: {e}");
        }
        result?;
        tracing::info!(
            "copied {} item(s) into {destination}, skipped {}",
            report.completed.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    fn copy_all<H: VolumeHandle>(
        &self,
        session: &mut VolumeSession<H>,
        sources: &[String],
        destination: &str,
        scratch: &Path,
        prompt: &dyn ReplacePrompt,
        report: &mut TransferReport,
    ) -> CoreResult<()> {
        for (index, source) in sources.iter().enumerate() {
            let entry = session.attributes(source)?;
            let slot = scratch.join(index.to_string());
            fs::create_dir_all(&slot)?;
            let staged = slot.join(path::host_name(&entry.name));
            if entry.is_directory {
                session.copy_out_directory(&entry.path, &staged, self.mode)?;
            } else {
                session.copy_out(&entry.path, &staged, self.mode)?;
            }

            let target = path::join(destination, &entry.name);
            if !self.make_room(session, destination, &entry.name, prompt)? {
                report.skipped.push(target);
                continue;
            }
            if entry.is_directory {
                session.copy_in_directory(&staged, &target, self.mode)?;
            } else {
                session.copy_in(&staged, &target, self.mode)?;
            }
            report.completed.push(target);
        }
        Ok(())
    }

    /// Renames the entry at `item` and returns its new path.
    pub fn rename<H: VolumeHandle>(
        &self,
        session: &mut VolumeSession<H>,
        sink: &mut dyn InvalidationSink,
        item: &str,
        new_name: &str,
    ) -> CoreResult<String> {
        let name = path::validate_name(new_name)?;
        if path::is_root(item) {
            return Err(CoreError::InvalidArgument(
                "the root directory cannot be renamed here".to_string(),
            ));
        }
        let parent = path::parent_of(item);
        let result = session.rename(item, &name);
        sink.invalidate(parent);
        result?;
        tracing::info!("renamed {item} to {name}");
        Ok(path::join(parent, &name))
    }

    /// Deletes `items` deepest first, then resets the whole tree.
    ///
    /// Returns how many entries were removed. The tree is reset even if a
    /// deletion fails part way.
    pub fn delete<H: VolumeHandle>(
        &self,
        session: &mut VolumeSession<H>,
        sink: &mut dyn InvalidationSink,
        items: &[FileEntryInfo],
    ) -> CoreResult<usize> {
        let normalized = selection::normalize_for_delete(items);
        let mut deleted = 0;
        let result = normalized.iter().try_for_each(|entry| {
            session.delete(entry)?;
            deleted += 1;
            Ok::<(), CoreError>(())
        });
        sink.reset();
        result?;
        tracing::info!("deleted {deleted} item(s)");
        Ok(deleted)
    }

    /// Sets the type and creator codes of `item`.
    pub fn set_type_creator<H: VolumeHandle>(
        &self,
        session: &mut VolumeSession<H>,
        sink: &mut dyn InvalidationSink,
        item: &str,
        file_type: &str,
        creator: &str,
    ) -> CoreResult<()> {
        path::validate_code(file_type)?;
        path::validate_code(creator)?;
        let result = session.set_type_creator(item, file_type, creator);
        invalidate_parent(sink, item);
        result
    }
}
