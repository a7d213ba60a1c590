//! The access-engine contract.
//!
//! The engine parses the on-disk volume format and performs the raw
//! list/copy/rename/delete/move operations. The core consumes it through two
//! narrow traits: [`VolumeEngine`] opens containers and [`VolumeHandle`] is
//! one open volume. [`memory::MemoryEngine`] is an in-memory implementation.

pub mod memory;

use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Partition type that marks an addressable HFS volume in a partition map.
pub const HFS_PARTITION_TYPE: &str = "Apple_HFS";

/// Seconds from the Unix epoch to 1984-01-01T00:00:00Z.
const EPOCH_FLOOR_SECS: u64 = 441_763_200;

/// Earliest timestamp that carries meaning. Anything older is an unset date.
pub fn epoch_floor() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(EPOCH_FLOOR_SECS)
}

/// Errors reported by an access engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The path does not name a live entry.
    #[error("no such entry: {0}")]
    NotFound(String),

    /// An entry with the same name already exists.
    #[error("entry already exists: {0}")]
    AlreadyExists(String),

    /// The volume was opened read-only.
    #[error("volume is read-only")]
    ReadOnly,

    /// A directory was expected.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// The container or partition holds no recognisable volume.
    #[error("unrecognized volume: {0}")]
    Unrecognized(String),

    /// Any other engine-native failure.
    #[error("{0}")]
    Other(String),

    /// Host I/O performed by the engine failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias for engine results.
pub type EngineResult<T> = Result<T, EngineError>;

/// Metadata for one live entry on the volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntryInfo {
    pub name: String,
    pub path: String,
    pub is_directory: bool,
    pub data_fork_size: u64,
    pub resource_fork_size: u64,
    pub created: SystemTime,
    pub modified: SystemTime,
    /// Four characters, or empty when unset.
    pub file_type: String,
    /// Four characters, or empty when unset.
    pub file_creator: String,
}

impl FileEntryInfo {
    /// Combined size of both forks.
    pub fn total_size(&self) -> u64 {
        self.data_fork_size.saturating_add(self.resource_fork_size)
    }

    /// Returns `true` if `time` is at or after the epoch floor.
    pub fn is_meaningful_date(time: SystemTime) -> bool {
        time >= epoch_floor()
    }
}

/// One row of a container's partition map, as the engine reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionMapEntry {
    pub map_index: u32,
    pub name: String,
    pub partition_type: String,
}

impl PartitionMapEntry {
    /// Returns `true` if this partition holds an addressable HFS volume.
    pub fn is_hfs(&self) -> bool {
        self.partition_type == HFS_PARTITION_TYPE
    }
}

/// A partition the user may choose to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionCandidate {
    /// 1-based position among the HFS partitions, as shown to the user.
    pub ordinal: u32,
    /// Index in the engine's partition map.
    pub map_index: u32,
    pub name: String,
}

/// Which volume inside a container the engine should open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitionSelector {
    /// Let the engine find the first usable volume.
    Automatic,
    /// Treat the container as one unpartitioned volume.
    Whole,
    /// Open the partition with this number.
    Number(u32),
}

/// How file content crosses the volume/host boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    #[default]
    Auto,
    Raw,
    MacBinary,
    BinHex,
    Text,
}

impl TransferMode {
    /// Every mode, in menu order.
    pub const ALL: [TransferMode; 5] = [
        TransferMode::Auto,
        TransferMode::Raw,
        TransferMode::MacBinary,
        TransferMode::BinHex,
        TransferMode::Text,
    ];

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            TransferMode::Auto => "Auto",
            TransferMode::Raw => "Raw",
            TransferMode::MacBinary => "MacBinary",
            TransferMode::BinHex => "BinHex",
            TransferMode::Text => "Text",
        }
    }

    /// Parses a label case-insensitively.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.label().eq_ignore_ascii_case(label))
    }
}

/// Volume-wide statistics for the info pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeInfo {
    pub name: String,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub file_count: u64,
    pub folder_count: u64,
    pub allocation_block_size: u32,
    pub clump_size: u32,
    pub modified: SystemTime,
    pub backup: SystemTime,
    pub flags: u32,
    pub blessed_folder_id: u32,
}

/// Opens containers and inspects their partition maps.
pub trait VolumeEngine {
    /// The open-volume type this engine produces.
    type Handle: VolumeHandle;

    /// Opens one volume inside the container at `image`.
    fn open(
        &self,
        image: &Path,
        writable: bool,
        partition: PartitionSelector,
    ) -> EngineResult<Self::Handle>;

    /// Lists the container's partition map.
    fn list_partitions(&self, image: &Path) -> EngineResult<Vec<PartitionMapEntry>>;

    /// Creates a blank, unpartitioned image.
    fn create_image(&self, image: &Path, size_bytes: u64, volume_name: &str) -> EngineResult<()>;
}

/// One open volume.
///
/// Handles are `Send` so a session can be lent to a background worker; they
/// are never used from two threads at once.
pub trait VolumeHandle: Send {
    /// Lists the immediate children of `directory`.
    fn list(&mut self, directory: &str) -> EngineResult<Vec<FileEntryInfo>>;

    /// Copies one host file to `volume_path`.
    fn copy_in(&mut self, host: &Path, volume_path: &str, mode: TransferMode) -> EngineResult<()>;

    /// Copies a host directory tree to `volume_path`.
    fn copy_in_directory(
        &mut self,
        host: &Path,
        volume_path: &str,
        mode: TransferMode,
    ) -> EngineResult<()>;

    /// Copies one volume file to the host path `host`.
    fn copy_out(&mut self, volume_path: &str, host: &Path, mode: TransferMode) -> EngineResult<()>;

    /// Copies a volume directory tree into the host directory `host`.
    fn copy_out_directory(
        &mut self,
        volume_path: &str,
        host: &Path,
        mode: TransferMode,
    ) -> EngineResult<()>;

    /// Deletes an entry (recursively for directories).
    fn delete(&mut self, entry: &FileEntryInfo) -> EngineResult<()>;

    /// Renames the entry at `path` in place.
    fn rename(&mut self, path: &str, new_name: &str) -> EngineResult<()>;

    /// Re-parents the entry at `path` under `new_parent`.
    fn move_entry(&mut self, path: &str, new_parent: &str) -> EngineResult<()>;

    /// Sets the four-character type and creator codes.
    fn set_type_creator(&mut self, path: &str, file_type: &str, creator: &str)
        -> EngineResult<()>;

    /// Returns the metadata for `path`.
    fn attributes(&mut self, path: &str) -> EngineResult<FileEntryInfo>;

    /// Returns volume-wide statistics.
    fn volume_info(&mut self) -> EngineResult<VolumeInfo>;

    /// Flushes and releases the volume.
    fn close(self)
    where
        Self: Sized;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(data: u64, rsrc: u64) -> FileEntryInfo {
        FileEntryInfo {
            name: "a".to_string(),
            path: ":a".to_string(),
            is_directory: false,
            data_fork_size: data,
            resource_fork_size: rsrc,
            created: epoch_floor(),
            modified: epoch_floor(),
            file_type: String::new(),
            file_creator: String::new(),
        }
    }

    #[test]
    fn total_size_sums_forks() {
        assert_eq!(entry(10, 5).total_size(), 15);
    }

    #[test]
    fn total_size_saturates() {
        assert_eq!(entry(u64::MAX, 1).total_size(), u64::MAX);
    }

    #[test]
    fn epoch_floor_is_meaningful_but_earlier_is_not() {
        assert!(FileEntryInfo::is_meaningful_date(epoch_floor()));
        assert!(!FileEntryInfo::is_meaningful_date(UNIX_EPOCH));
    }

    #[test]
    fn partition_entry_is_hfs() {
        let hfs = PartitionMapEntry {
            map_index: 3,
            name: "Macintosh HD".to_string(),
            partition_type: HFS_PARTITION_TYPE.to_string(),
        };
        let driver = PartitionMapEntry {
            map_index: 2,
            name: "Driver".to_string(),
            partition_type: "Apple_Driver43".to_string(),
        };
        assert!(hfs.is_hfs());
        assert!(!driver.is_hfs());
    }

    #[test]
    fn transfer_mode_defaults_to_auto() {
        assert_eq!(TransferMode::default(), TransferMode::Auto);
    }

    #[test]
    fn transfer_mode_label_roundtrip() {
        for mode in TransferMode::ALL {
            assert_eq!(TransferMode::from_label(mode.label()), Some(mode));
        }
        assert_eq!(TransferMode::from_label("macbinary"), Some(TransferMode::MacBinary));
        assert_eq!(TransferMode::from_label("zip"), None);
    }
}
