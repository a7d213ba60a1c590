//! Ownership of one open volume.
//!
//! A [`VolumeSession`] is created when a volume is opened and closed exactly
//! once. Closing again is a no-op; every other call on a closed session fails
//! with [`CoreError::VolumeClosed`]. Each window owns its own session.

use std::path::Path;

use crate::engine::{
    FileEntryInfo, PartitionSelector, TransferMode, VolumeEngine, VolumeHandle, VolumeInfo,
};
use crate::error::{CoreError, CoreResult};

/// An open (or already closed) volume.
#[derive(Debug)]
pub struct VolumeSession<H: VolumeHandle> {
    handle: Option<H>,
    label: String,
    writable: bool,
}

impl<H: VolumeHandle> VolumeSession<H> {
    /// Opens `partition` of the container at `image`.
    ///
    /// # Errors
    ///
    /// Whatever the engine reports, converted into [`CoreError`].
    pub fn open<E>(
        engine: &E,
        image: &Path,
        writable: bool,
        partition: PartitionSelector,
    ) -> CoreResult<Self>
    where
        E: VolumeEngine<Handle = H>,
    {
        let handle = engine.open(image, writable, partition)?;
        let label = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| image.display().to_string());
        tracing::info!("opened {} ({partition:?}, writable: {writable})", image.display());
        Ok(Self::from_handle(handle, label, writable))
    }

    /// Wraps an already open handle.
    pub fn from_handle(handle: H, label: impl Into<String>, writable: bool) -> Self {
        Self {
            handle: Some(handle),
            label: label.into(),
            writable,
        }
    }

    /// Display label, usually the image file name.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns `true` if the volume was opened for writing.
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Returns `true` until [`VolumeSession::close`] is called.
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Closes the volume. Calling it again does nothing.
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.close();
            tracing::info!("closed {}", self.label);
        }
    }

    fn handle(&mut self) -> CoreResult<&mut H> {
        self.handle.as_mut().ok_or(CoreError::VolumeClosed)
    }

    pub fn list(&mut self, directory: &str) -> CoreResult<Vec<FileEntryInfo>> {
        tracing::debug!("list {directory}");
        Ok(self.handle()?.list(directory)?)
    }

    pub fn copy_in(&mut self, host: &Path, volume_path: &str, mode: TransferMode) -> CoreResult<()> {
        tracing::debug!("copy in {} -> {volume_path} ({mode:?})", host.display());
        Ok(self.handle()?.copy_in(host, volume_path, mode)?)
    }

    pub fn copy_in_directory(
        &mut self,
        host: &Path,
        volume_path: &str,
        mode: TransferMode,
    ) -> CoreResult<()> {
        tracing::debug!("copy in dir {} -> {volume_path} ({mode:?})", host.display());
        Ok(self.handle()?.copy_in_directory(host, volume_path, mode)?)
    }

    pub fn copy_out(&mut self, volume_path: &str, host: &Path, mode: TransferMode) -> CoreResult<()> {
        tracing::debug!("copy out {volume_path} -> {} ({mode:?})", host.display());
        Ok(self.handle()?.copy_out(volume_path, host, mode)?)
    }

    pub fn copy_out_directory(
        &mut self,
        volume_path: &str,
        host: &Path,
        mode: TransferMode,
    ) -> CoreResult<()> {
        tracing::debug!("copy out dir {volume_path} -> {} ({mode:?})", host.display());
        Ok(self.handle()?.copy_out_directory(volume_path, host, mode)?)
    }

    pub fn delete(&mut self, entry: &FileEntryInfo) -> CoreResult<()> {
        tracing::debug!("delete {}", entry.path);
        Ok(self.handle()?.delete(entry)?)
    }

    pub fn rename(&mut self, path: &str, new_name: &str) -> CoreResult<()> {
        tracing::debug!("rename {path} -> {new_name}");
        Ok(self.handle()?.rename(path, new_name)?)
    }

    pub fn move_entry(&mut self, path: &str, new_parent: &str) -> CoreResult<()> {
        tracing::debug!("move {path} -> {new_parent}");
        Ok(self.handle()?.move_entry(path, new_parent)?)
    }

    pub fn set_type_creator(&mut self, path: &str, file_type: &str, creator: &str) -> CoreResult<()> {
        tracing::debug!("set type/creator {path} -> {file_type}/{creator}");
        Ok(self.handle()?.set_type_creator(path, file_type, creator)?)
    }

    pub fn attributes(&mut self, path: &str) -> CoreResult<FileEntryInfo> {
        Ok(self.handle()?.attributes(path)?)
    }

    pub fn volume_info(&mut self) -> CoreResult<VolumeInfo> {
        Ok(self.handle()?.volume_info()?)
    }
}

impl<H: VolumeHandle> Drop for VolumeSession<H> {
    fn drop(&mut self) {
        self.close();
    }
}
