//! One window onto one volume.
//!
//! A [`VolumeBrowser`] owns the window's session, its tree cache, its
//! transfer settings and its drag state, and wires the cache into every
//! operation so callers never have to invalidate by hand. Frontends either
//! call the operations directly or send [`Command`]s through
//! [`VolumeBrowser::execute`].

use std::path::{Path, PathBuf};

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::config::settings::Config;
use crate::display::{EntryDetails, VolumeSummary};
use crate::engine::{FileEntryInfo, TransferMode, VolumeEngine, VolumeHandle, VolumeInfo};
use crate::error::{CoreError, CoreResult};
use crate::event::{Command, Event};
use crate::path;
use crate::partition::{OpenedPartition, PartitionChooser, PartitionResolver};
use crate::rendezvous::Relay;
use crate::selection::Selection;
use crate::session::VolumeSession;
use crate::transfer::{
    spawn_transfer, DragSession, DragTracker, DropKind, DropOperation, DropRequest, ReplacePrompt,
    TransferJob, TransferOrchestrator, TransferReport, TreeId, WorkerMessage,
};
use crate::tree::{NodeCache, PendingInvalidations, VisibleNode};

/// Decides whether a batch of entries may be deleted.
pub trait DeletePrompt {
    fn confirm_delete(&self, items: &[FileEntryInfo]) -> bool;
}

impl<F> DeletePrompt for F
where
    F: Fn(&[FileEntryInfo]) -> bool,
{
    fn confirm_delete(&self, items: &[FileEntryInfo]) -> bool {
        self(items)
    }
}

/// The confirmations [`VolumeBrowser::execute`] may need.
#[derive(Clone, Copy)]
pub struct Prompts<'a> {
    pub replace: &'a dyn ReplacePrompt,
    pub delete: &'a dyn DeletePrompt,
}

struct AlwaysReplace;

impl ReplacePrompt for AlwaysReplace {
    fn confirm_replace(&self, _existing: &FileEntryInfo) -> bool {
        true
    }
}

static ALWAYS_REPLACE: AlwaysReplace = AlwaysReplace;

fn attached<H: VolumeHandle>(
    session: &mut Option<VolumeSession<H>>,
) -> CoreResult<&mut VolumeSession<H>> {
    session.as_mut().ok_or(CoreError::SessionBusy)
}

/// Loads every ancestor of `directory`, root first, so it can be found.
fn load_ancestors<H: VolumeHandle>(
    cache: &mut NodeCache,
    session: &mut VolumeSession<H>,
    directory: &str,
) -> CoreResult<()> {
    let mut ancestors = Vec::new();
    let mut current = directory;
    while !path::is_root(current) {
        current = path::parent_of(current);
        ancestors.push(current);
    }
    for ancestor in ancestors.iter().rev() {
        cache.ensure_loaded(session, ancestor)?;
    }
    Ok(())
}

/// Per-window state.
pub struct VolumeBrowser<H: VolumeHandle> {
    /// `None` while a background transfer holds the session.
    session: Option<VolumeSession<H>>,
    close_on_reattach: bool,
    cache: NodeCache,
    orchestrator: TransferOrchestrator,
    drag: DragTracker,
    confirm_delete: bool,
    confirm_replace: bool,
}

impl<H: VolumeHandle> VolumeBrowser<H> {
    pub fn new(session: VolumeSession<H>, orchestrator: TransferOrchestrator) -> Self {
        Self {
            session: Some(session),
            close_on_reattach: false,
            cache: NodeCache::new(),
            orchestrator,
            drag: DragTracker::new(),
            confirm_delete: true,
            confirm_replace: true,
        }
    }

    /// Wraps `session` using the transfer and confirmation settings of
    /// `config`.
    pub fn with_config(session: VolumeSession<H>, config: &Config) -> Self {
        let mut browser = Self::new(session, TransferOrchestrator::from_config(config));
        browser.confirm_delete = config.general.confirm_delete;
        browser.confirm_replace = config.general.confirm_replace;
        browser
    }

    /// Opens the best volume in `image` and wraps it.
    ///
    /// The volume is opened for writing if `config` says so.
    pub fn open<E>(
        engine: &E,
        image: &Path,
        config: &Config,
        chooser: &dyn PartitionChooser,
    ) -> CoreResult<(Self, OpenedPartition)>
    where
        E: VolumeEngine<Handle = H>,
    {
        let (session, opened) = PartitionResolver::new(engine).open(
            image,
            config.general.open_writable,
            chooser,
        )?;
        Ok((Self::with_config(session, config), opened))
    }

    pub fn label(&self) -> Option<&str> {
        self.session.as_ref().map(VolumeSession::label)
    }

    /// Returns `true` if the session is here and still open.
    pub fn is_open(&self) -> bool {
        self.session.as_ref().is_some_and(VolumeSession::is_open)
    }

    /// Returns `true` while a background transfer holds the session.
    pub fn is_busy(&self) -> bool {
        self.session.is_none()
    }

    pub fn is_writable(&self) -> bool {
        self.session.as_ref().is_some_and(VolumeSession::is_writable)
    }

    pub fn transfer_mode(&self) -> TransferMode {
        self.orchestrator.mode()
    }

    pub fn set_transfer_mode(&mut self, mode: TransferMode) {
        tracing::info!("transfer mode set to {}", mode.label());
        self.orchestrator.set_mode(mode);
    }

    pub fn tree(&self) -> &NodeCache {
        &self.cache
    }

    // --- tree ---

    /// The children of `directory` in display order.
    pub fn children(&mut self, directory: &str) -> CoreResult<&[VisibleNode]> {
        let session = attached(&mut self.session)?;
        load_ancestors(&mut self.cache, session, directory)?;
        self.cache.children_of(session, directory)
    }

    pub fn child_count(&mut self, directory: &str) -> CoreResult<usize> {
        let session = attached(&mut self.session)?;
        load_ancestors(&mut self.cache, session, directory)?;
        self.cache.child_count(session, directory)
    }

    pub fn child_at(&mut self, directory: &str, index: usize) -> CoreResult<Option<&VisibleNode>> {
        let session = attached(&mut self.session)?;
        load_ancestors(&mut self.cache, session, directory)?;
        self.cache.child_at(session, directory, index)
    }

    pub fn is_expandable(&self, path: &str) -> bool {
        self.cache.is_expandable(path)
    }

    /// Re-reads `directory` from the volume.
    pub fn refresh(&mut self, directory: &str) -> CoreResult<()> {
        let session = attached(&mut self.session)?;
        load_ancestors(&mut self.cache, session, directory)?;
        self.cache.refresh(session, directory)
    }

    // --- selection and panes ---

    /// What `items` allow in this window.
    pub fn selection<'a>(&self, items: &'a [FileEntryInfo]) -> Selection<'a> {
        Selection::new(items, self.is_open())
    }

    /// Fresh attributes of each of `paths`.
    pub fn entries<S: AsRef<str>>(&mut self, paths: &[S]) -> CoreResult<Vec<FileEntryInfo>> {
        let session = attached(&mut self.session)?;
        paths
            .iter()
            .map(|p| session.attributes(p.as_ref()))
            .collect()
    }

    pub fn details(&mut self, path: &str) -> CoreResult<EntryDetails> {
        let session = attached(&mut self.session)?;
        Ok(EntryDetails::from_entry(&session.attributes(path)?))
    }

    pub fn volume_info(&mut self) -> CoreResult<VolumeInfo> {
        attached(&mut self.session)?.volume_info()
    }

    pub fn volume_summary(&mut self) -> CoreResult<VolumeSummary> {
        Ok(VolumeSummary::new(&self.volume_info()?))
    }

    // --- operations ---

    fn replace_prompt<'p>(&self, prompt: &'p dyn ReplacePrompt) -> &'p dyn ReplacePrompt {
        if self.confirm_replace {
            prompt
        } else {
            &ALWAYS_REPLACE
        }
    }

    pub fn find_conflict(&mut self, directory: &str, name: &str) -> CoreResult<Option<FileEntryInfo>> {
        let session = attached(&mut self.session)?;
        self.orchestrator.find_conflict(session, directory, name)
    }

    pub fn import(
        &mut self,
        host_items: &[PathBuf],
        destination: &str,
        prompt: &dyn ReplacePrompt,
    ) -> CoreResult<TransferReport> {
        let prompt = self.replace_prompt(prompt);
        let session = attached(&mut self.session)?;
        self.orchestrator
            .import(session, &mut self.cache, host_items, destination, prompt)
    }

    pub fn export(&mut self, path: &str, host_destination: &Path) -> CoreResult<PathBuf> {
        let session = attached(&mut self.session)?;
        let entry = session.attributes(path)?;
        self.orchestrator.export(session, &entry, host_destination)
    }

    pub fn export_for_drag<S: AsRef<str>>(&mut self, paths: &[S]) -> CoreResult<Vec<PathBuf>> {
        let entries = self.entries(paths)?;
        let session = attached(&mut self.session)?;
        self.orchestrator.export_for_drag(session, &entries)
    }

    pub fn move_items<S: AsRef<str>>(
        &mut self,
        sources: &[S],
        destination: &str,
    ) -> CoreResult<TransferReport> {
        let session = attached(&mut self.session)?;
        self.orchestrator
            .move_items(session, &mut self.cache, sources, destination)
    }

    pub fn copy_items<S: AsRef<str>>(
        &mut self,
        sources: &[S],
        destination: &str,
        prompt: &dyn ReplacePrompt,
    ) -> CoreResult<TransferReport> {
        let prompt = self.replace_prompt(prompt);
        let session = attached(&mut self.session)?;
        self.orchestrator
            .copy_items(session, &mut self.cache, sources, destination, prompt)
    }

    pub fn rename(&mut self, path: &str, new_name: &str) -> CoreResult<String> {
        let session = attached(&mut self.session)?;
        self.orchestrator
            .rename(session, &mut self.cache, path, new_name)
    }

    /// Deletes `items` without asking. The whole tree is reset afterwards.
    pub fn delete(&mut self, items: &[FileEntryInfo]) -> CoreResult<usize> {
        let session = attached(&mut self.session)?;
        self.orchestrator.delete(session, &mut self.cache, items)
    }

    pub fn set_type_creator(&mut self, path: &str, file_type: &str, creator: &str) -> CoreResult<()> {
        let session = attached(&mut self.session)?;
        self.orchestrator
            .set_type_creator(session, &mut self.cache, path, file_type, creator)
    }

    // --- drag and drop ---

    pub fn drag_id(&self) -> TreeId {
        self.drag.id()
    }

    pub fn begin_drag<S: AsRef<str>>(&mut self, paths: &[S]) -> &DragSession {
        self.drag.begin(paths)
    }

    pub fn end_drag(&mut self) {
        self.drag.end();
    }

    /// Carries out a drop onto this window's tree.
    ///
    /// A drag that started here becomes a move or copy within the volume and
    /// is ended; anything else is imported from the host.
    pub fn drop_items(
        &mut self,
        request: &DropRequest,
        prompt: &dyn ReplacePrompt,
    ) -> CoreResult<TransferReport> {
        let kind = self.drag.classify(request);
        // A drop that came from this tree ends its drag, rejected or not.
        if request.origin == Some(self.drag.id()) {
            self.drag.end();
        }
        match kind? {
            DropKind::Internal { sources, operation } => match operation {
                DropOperation::Move => self.move_items(&sources, &request.destination),
                DropOperation::Copy => self.copy_items(&sources, &request.destination, prompt),
            },
            DropKind::External { host_items } => {
                self.import(&host_items, &request.destination, prompt)
            }
        }
    }

    // --- background ---

    /// Hands the session out, leaving the browser busy.
    pub fn detach(&mut self) -> CoreResult<VolumeSession<H>> {
        let session = self.session.take().ok_or(CoreError::SessionBusy)?;
        tracing::debug!("detached {}", session.label());
        Ok(session)
    }

    /// Takes the session back and applies what went stale while it was away.
    ///
    /// If [`VolumeBrowser::close`] was called in the meantime the session is
    /// closed now.
    pub fn reattach(
        &mut self,
        session: VolumeSession<H>,
        invalidations: PendingInvalidations,
    ) -> CoreResult<()> {
        if self.session.is_some() {
            return Err(CoreError::InvalidArgument(
                "a session is already attached".to_string(),
            ));
        }
        invalidations.replay(&mut self.cache);
        tracing::debug!("reattached {}", session.label());
        self.session = Some(session);
        if std::mem::take(&mut self.close_on_reattach) {
            self.close();
        }
        Ok(())
    }

    /// Runs `job` on a background worker.
    ///
    /// The browser stays busy until the session comes back through `tx` and
    /// is passed to [`VolumeBrowser::reattach`]. Replace confirmations go
    /// through `prompt` whatever the confirmation setting.
    pub fn start_transfer(
        &mut self,
        job: TransferJob,
        prompt: Relay<FileEntryInfo, bool>,
        tx: UnboundedSender<WorkerMessage<H>>,
    ) -> CoreResult<JoinHandle<()>>
    where
        H: 'static,
    {
        let session = self.detach()?;
        Ok(spawn_transfer(
            session,
            self.orchestrator.clone(),
            job,
            prompt,
            tx,
        ))
    }

    /// Closes the volume and forgets the tree. Closing again does nothing.
    pub fn close(&mut self) {
        self.drag.end();
        self.cache.reset();
        match self.session.as_mut() {
            Some(session) => session.close(),
            None => self.close_on_reattach = true,
        }
    }

    // --- commands ---

    /// Runs `command` and reports the outcome as an [`Event`].
    pub fn execute(&mut self, command: Command, prompts: &Prompts<'_>) -> Event {
        let operation = command.operation();
        match self.dispatch(command, prompts) {
            Ok(event) => event,
            Err(CoreError::Cancelled) => Event::Declined {
                operation: operation.to_string(),
            },
            Err(e) => {
                tracing::warn!("{operation} failed: {e}");
                Event::OperationFailed {
                    operation: operation.to_string(),
                    error: e.to_string(),
                }
            }
        }
    }

    fn listed(&mut self, path: String) -> CoreResult<Event> {
        let entries = self
            .children(&path)?
            .iter()
            .map(|node| node.info().clone())
            .collect();
        Ok(Event::DirectoryLoaded { path, entries })
    }

    fn dispatch(&mut self, command: Command, prompts: &Prompts<'_>) -> CoreResult<Event> {
        let operation = command.operation();
        let transferred = move |report| Event::TransferComplete {
            operation: operation.to_string(),
            report,
        };
        match command {
            Command::Expand(path) => self.listed(path),
            Command::Refresh(path) => {
                self.refresh(&path)?;
                self.listed(path)
            }
            Command::Import {
                host_items,
                destination,
            } => self
                .import(&host_items, &destination, prompts.replace)
                .map(transferred),
            Command::Export {
                path,
                host_destination,
            } => Ok(Event::Exported(vec![self.export(&path, &host_destination)?])),
            Command::ExportForDrag(paths) => self.export_for_drag(&paths).map(Event::Exported),
            Command::Move {
                sources,
                destination,
            } => self.move_items(&sources, &destination).map(transferred),
            Command::Copy {
                sources,
                destination,
            } => self
                .copy_items(&sources, &destination, prompts.replace)
                .map(transferred),
            Command::Delete(paths) => {
                let items = self.entries(&paths)?;
                if self.confirm_delete && !prompts.delete.confirm_delete(&items) {
                    return Err(CoreError::Cancelled);
                }
                self.delete(&items).map(Event::Deleted)
            }
            Command::Rename { path, new_name } => {
                let to = self.rename(&path, &new_name)?;
                Ok(Event::Renamed { from: path, to })
            }
            Command::SetTypeCreator {
                path,
                file_type,
                creator,
            } => {
                self.set_type_creator(&path, &file_type, &creator)?;
                Ok(Event::OperationComplete {
                    operation: operation.to_string(),
                })
            }
            Command::SetTransferMode(mode) => {
                self.set_transfer_mode(mode);
                Ok(Event::OperationComplete {
                    operation: operation.to_string(),
                })
            }
            Command::Drop(request) => self.drop_items(&request, prompts.replace).map(transferred),
            Command::Close => {
                self.close();
                Ok(Event::VolumeClosed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::{
        MemoryEngine, MemoryHandle, MemoryImage, MemoryPartition, MemoryVolume,
    };
    use crate::engine::PartitionCandidate;
    use crate::rendezvous;
    use std::fs;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    const IMAGE: &str = "/browser.img";

    fn sample() -> MemoryVolume {
        let mut volume = MemoryVolume::new("Test", 4 * 1024 * 1024);
        volume.add_directory(":Docs").unwrap();
        volume.add_file(":Docs:note", b"note").unwrap();
        volume.add_directory(":Empty").unwrap();
        volume.add_file(":readme", b"hello").unwrap();
        volume
    }

    fn no_choice(_: &[PartitionCandidate]) -> Option<PartitionCandidate> {
        None
    }

    fn open(engine: &MemoryEngine, config: &Config) -> VolumeBrowser<MemoryHandle> {
        engine.insert_image(IMAGE, MemoryImage::unpartitioned(sample()));
        let (browser, _) = VolumeBrowser::open(engine, Path::new(IMAGE), config, &no_choice).unwrap();
        browser
    }

    fn accept(_: &FileEntryInfo) -> bool {
        true
    }

    fn decline(_: &FileEntryInfo) -> bool {
        false
    }

    fn approve(_: &[FileEntryInfo]) -> bool {
        true
    }

    fn refuse(_: &[FileEntryInfo]) -> bool {
        false
    }

    fn names(browser: &mut VolumeBrowser<MemoryHandle>, directory: &str) -> Vec<String> {
        browser
            .children(directory)
            .unwrap()
            .iter()
            .map(|n| n.name().to_string())
            .collect()
    }

    #[test]
    fn open_uses_config_and_lists_in_display_order() {
        let engine = MemoryEngine::new();
        let mut config = Config::default();
        config.general.open_writable = false;
        config.general.transfer_mode = TransferMode::Text;

        let mut browser = open(&engine, &config);

        assert!(browser.is_open());
        assert!(!browser.is_writable());
        assert_eq!(browser.transfer_mode(), TransferMode::Text);
        assert_eq!(browser.label(), Some("browser.img"));
        assert_eq!(names(&mut browser, ":"), vec!["Docs", "Empty", "readme"]);
    }

    #[test]
    fn open_picks_chosen_partition() {
        let engine = MemoryEngine::new();
        engine.insert_image(
            IMAGE,
            MemoryImage::partitioned(vec![
                MemoryPartition::hfs(1, MemoryVolume::new("First", 1024 * 1024)),
                MemoryPartition::hfs(2, sample()),
            ]),
        );
        let second =
            |candidates: &[PartitionCandidate]| -> Option<PartitionCandidate> { candidates.get(1).cloned() };

        let (mut browser, opened) =
            VolumeBrowser::open(&engine, Path::new(IMAGE), &Config::default(), &second).unwrap();

        assert!(opened.candidate.is_some());
        assert_eq!(browser.volume_info().unwrap().name, "Test");
    }

    #[test]
    fn selection_reflects_open_state() {
        let engine = MemoryEngine::new();
        let mut browser = open(&engine, &Config::default());
        let items = browser.entries(&[":readme"]).unwrap();

        assert!(browser.selection(&items).can_rename());

        browser.close();

        assert!(!browser.selection(&items).can_rename());
        assert!(!browser.selection(&items).can_import());
    }

    #[test]
    fn import_invalidates_destination_listing() {
        let tmp = TempDir::new().unwrap();
        let host = tmp.path().join("fresh");
        fs::write(&host, "f").unwrap();
        let engine = MemoryEngine::new();
        let mut browser = open(&engine, &Config::default());
        assert_eq!(browser.child_count(":Docs").unwrap(), 1);

        let report = browser.import(&[host], ":Docs", &decline).unwrap();

        assert_eq!(report.completed, vec![":Docs:fresh"]);
        assert!(!browser.tree().is_loaded(":Docs"));
        assert_eq!(names(&mut browser, ":Docs"), vec!["fresh", "note"]);
    }

    #[test]
    fn replace_confirmation_can_be_switched_off() {
        let tmp = TempDir::new().unwrap();
        let host = tmp.path().join("README");
        fs::write(&host, "replaced").unwrap();
        let engine = MemoryEngine::new();
        let mut config = Config::default();
        config.general.confirm_replace = false;
        let mut browser = open(&engine, &config);

        let report = browser.import(&[host], ":", &decline).unwrap();

        assert_eq!(report.completed, vec![":README"]);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn details_and_summary_come_from_the_volume() {
        let engine = MemoryEngine::new();
        let mut browser = open(&engine, &Config::default());

        let details = browser.details(":readme").unwrap();
        let summary = browser.volume_summary().unwrap();

        assert_eq!(details.kind, "File");
        assert_eq!(details.size, "5 B");
        assert_eq!(summary.rows()[0], ("Name", "Test".to_string()));
    }

    #[test]
    fn internal_drop_moves_and_ends_drag() {
        let engine = MemoryEngine::new();
        let mut browser = open(&engine, &Config::default());
        browser.begin_drag(&[":readme"]);
        let request = DropRequest {
            origin: Some(browser.drag_id()),
            host_items: Vec::new(),
            destination: ":Docs".to_string(),
            operation: DropOperation::Move,
        };

        let report = browser.drop_items(&request, &accept).unwrap();

        assert_eq!(report.completed, vec![":Docs:readme"]);
        assert!(browser.drag.active().is_none());
        assert_eq!(names(&mut browser, ":"), vec!["Docs", "Empty"]);
    }

    #[test]
    fn drop_into_own_subtree_is_rejected() {
        let engine = MemoryEngine::new();
        let mut browser = open(&engine, &Config::default());
        browser.begin_drag(&[":Docs"]);
        let request = DropRequest {
            origin: Some(browser.drag_id()),
            host_items: Vec::new(),
            destination: ":Docs".to_string(),
            operation: DropOperation::Copy,
        };

        assert!(matches!(
            browser.drop_items(&request, &accept),
            Err(CoreError::InvalidDrop { .. })
        ));
    }

    #[test]
    fn rejected_drop_still_ends_the_drag() {
        let engine = MemoryEngine::new();
        let mut browser = open(&engine, &Config::default());
        browser.begin_drag(&[":Docs"]);
        let request = DropRequest {
            origin: Some(browser.drag_id()),
            host_items: Vec::new(),
            destination: ":Docs:sub".to_string(),
            operation: DropOperation::Move,
        };

        assert!(browser.drop_items(&request, &accept).is_err());
        assert!(browser.drag.active().is_none());

        // With the drag gone the same drop is no longer internal.
        assert!(matches!(
            browser.drop_items(&request, &accept),
            Err(CoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn detached_browser_is_busy_until_reattached() {
        let engine = MemoryEngine::new();
        let mut browser = open(&engine, &Config::default());
        browser.children(":").unwrap();

        let session = browser.detach().unwrap();

        assert!(browser.is_busy());
        assert!(matches!(browser.children(":"), Err(CoreError::SessionBusy)));
        assert!(matches!(browser.detach(), Err(CoreError::SessionBusy)));

        let mut pending = PendingInvalidations::new();
        crate::tree::InvalidationSink::invalidate(&mut pending, ":");
        browser.reattach(session, pending).unwrap();

        assert!(!browser.is_busy());
        assert!(!browser.tree().is_loaded(":"));
        assert_eq!(browser.child_count(":").unwrap(), 3);
    }

    #[test]
    fn close_while_detached_closes_on_reattach() {
        let engine = MemoryEngine::new();
        let mut browser = open(&engine, &Config::default());
        let session = browser.detach().unwrap();

        browser.close();
        assert_eq!(engine.journal().closes, 0);
        browser
            .reattach(session, PendingInvalidations::new())
            .unwrap();

        assert!(!browser.is_open());
        assert_eq!(engine.journal().closes, 1);
    }

    #[test]
    fn close_is_idempotent() {
        let engine = MemoryEngine::new();
        let mut browser = open(&engine, &Config::default());

        browser.close();
        browser.close();

        assert_eq!(engine.journal().closes, 1);
        assert!(matches!(browser.children(":"), Err(CoreError::VolumeClosed)));
    }

    #[test]
    fn execute_expand_lists_entries() {
        let engine = MemoryEngine::new();
        let mut browser = open(&engine, &Config::default());
        let prompts = Prompts {
            replace: &accept,
            delete: &approve,
        };

        let event = browser.execute(Command::Expand(":Docs".to_string()), &prompts);

        match event {
            Event::DirectoryLoaded { path, entries } => {
                assert_eq!(path, ":Docs");
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].name, "note");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn execute_delete_honours_confirmation() {
        let engine = MemoryEngine::new();
        let mut browser = open(&engine, &Config::default());
        let refusing = Prompts {
            replace: &accept,
            delete: &refuse,
        };
        let approving = Prompts {
            replace: &accept,
            delete: &approve,
        };
        let command = Command::Delete(vec![":Docs".to_string(), ":Docs:note".to_string()]);

        assert_eq!(
            browser.execute(command.clone(), &refusing),
            Event::Declined {
                operation: "delete".to_string()
            }
        );
        assert_eq!(browser.child_count(":").unwrap(), 3);

        assert_eq!(browser.execute(command, &approving), Event::Deleted(2));
        assert_eq!(names(&mut browser, ":"), vec!["Empty", "readme"]);
    }

    #[test]
    fn execute_delete_without_confirmation_setting() {
        let engine = MemoryEngine::new();
        let mut config = Config::default();
        config.general.confirm_delete = false;
        let mut browser = open(&engine, &config);
        let prompts = Prompts {
            replace: &accept,
            delete: &refuse,
        };

        let event = browser.execute(Command::Delete(vec![":readme".to_string()]), &prompts);

        assert_eq!(event, Event::Deleted(1));
    }

    #[test]
    fn execute_rename_and_failures() {
        let engine = MemoryEngine::new();
        let mut browser = open(&engine, &Config::default());
        let prompts = Prompts {
            replace: &accept,
            delete: &approve,
        };

        let renamed = browser.execute(
            Command::Rename {
                path: ":readme".to_string(),
                new_name: " ReadMe ".to_string(),
            },
            &prompts,
        );
        assert_eq!(
            renamed,
            Event::Renamed {
                from: ":readme".to_string(),
                to: ":ReadMe".to_string()
            }
        );

        let failed = browser.execute(
            Command::Rename {
                path: ":ReadMe".to_string(),
                new_name: "a:b".to_string(),
            },
            &prompts,
        );
        assert!(matches!(failed, Event::OperationFailed { ref operation, .. } if operation == "rename"));
    }

    #[test]
    fn execute_close_then_expand_fails() {
        let engine = MemoryEngine::new();
        let mut browser = open(&engine, &Config::default());
        let prompts = Prompts {
            replace: &accept,
            delete: &approve,
        };

        assert_eq!(browser.execute(Command::Close, &prompts), Event::VolumeClosed);
        assert!(matches!(
            browser.execute(Command::Expand(":".to_string()), &prompts),
            Event::OperationFailed { .. }
        ));
    }

    #[test]
    fn execute_set_transfer_mode() {
        let engine = MemoryEngine::new();
        let mut browser = open(&engine, &Config::default());
        let prompts = Prompts {
            replace: &accept,
            delete: &approve,
        };

        browser.execute(Command::SetTransferMode(TransferMode::BinHex), &prompts);

        assert_eq!(browser.transfer_mode(), TransferMode::BinHex);
    }

    #[tokio::test]
    async fn background_transfer_round_trip() {
        let tmp = TempDir::new().unwrap();
        let host = tmp.path().join("big");
        fs::write(&host, vec![7u8; 4096]).unwrap();
        let engine = MemoryEngine::new();
        let mut browser = open(&engine, &Config::default());
        browser.children(":Docs").unwrap();
        let (relay, _desk) = rendezvous::channel();
        let (tx, mut rx) = mpsc::unbounded_channel();

        browser
            .start_transfer(
                TransferJob::Import {
                    host_items: vec![host],
                    destination: ":Docs".to_string(),
                },
                relay,
                tx,
            )
            .unwrap();
        assert!(browser.is_busy());

        let (session, invalidations, outcome) = loop {
            match rx.recv().await {
                Some(WorkerMessage::Started(_)) => {}
                Some(WorkerMessage::Finished {
                    session,
                    invalidations,
                    outcome,
                }) => break (session, invalidations, outcome),
                None => panic!("worker vanished"),
            }
        };
        assert!(outcome.is_ok());
        browser.reattach(session, invalidations).unwrap();

        assert_eq!(names(&mut browser, ":Docs"), vec!["big", "note"]);
    }
}
