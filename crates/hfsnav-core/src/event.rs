//! Event system for communication between UI and Core.
//!
//! The UI translates user input into [`Command`]s, which a
//! [`VolumeBrowser`](crate::browser::VolumeBrowser) processes and answers
//! with [`Event`]s. Any frontend can drive the same core this way.

use std::path::PathBuf;

use crate::engine::{FileEntryInfo, TransferMode};
use crate::transfer::{DropRequest, TransferReport};

/// An action the UI requests the core to perform.
///
/// Commands flow **UI → Core**. The core never creates commands itself.
#[derive(Debug, Clone)]
pub enum Command {
    /// List the directory at the given volume path (loading it if needed).
    Expand(String),
    /// Re-read the directory at the given volume path.
    Refresh(String),
    /// Copy host files and folders into a volume directory.
    Import {
        host_items: Vec<PathBuf>,
        destination: String,
    },
    /// Copy one volume entry to the host.
    Export {
        path: String,
        host_destination: PathBuf,
    },
    /// Stage volume entries in a temporary host directory for a drag out.
    ExportForDrag(Vec<String>),
    /// Move volume entries into another directory of the same volume.
    Move {
        sources: Vec<String>,
        destination: String,
    },
    /// Duplicate volume entries into another directory of the same volume.
    Copy {
        sources: Vec<String>,
        destination: String,
    },
    /// Delete the listed volume entries (after confirmation).
    Delete(Vec<String>),
    Rename {
        path: String,
        new_name: String,
    },
    SetTypeCreator {
        path: String,
        file_type: String,
        creator: String,
    },
    /// Change the transfer mode used by later transfers.
    SetTransferMode(TransferMode),
    /// Carry out a drop onto the tree.
    Drop(DropRequest),
    /// Close the volume.
    Close,
}

impl Command {
    /// Short name used in [`Event::OperationFailed`].
    pub fn operation(&self) -> &'static str {
        match self {
            Command::Expand(_) => "expand",
            Command::Refresh(_) => "refresh",
            Command::Import { .. } => "import",
            Command::Export { .. } => "export",
            Command::ExportForDrag(_) => "drag out",
            Command::Move { .. } => "move",
            Command::Copy { .. } => "copy",
            Command::Delete(_) => "delete",
            Command::Rename { .. } => "rename",
            Command::SetTypeCreator { .. } => "set type and creator",
            Command::SetTransferMode(_) => "set transfer mode",
            Command::Drop(_) => "drop",
            Command::Close => "close",
        }
    }
}

/// A notification the core sends back to the UI.
///
/// Events flow **Core → UI**. The UI uses these to update its display state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A directory has been listed.
    DirectoryLoaded {
        path: String,
        entries: Vec<FileEntryInfo>,
    },
    /// A batch transfer finished.
    TransferComplete {
        operation: String,
        report: TransferReport,
    },
    /// Entries were written to these host paths.
    Exported(Vec<PathBuf>),
    Renamed {
        from: String,
        to: String,
    },
    /// This many entries were deleted.
    Deleted(usize),
    /// The user declined a confirmation; nothing changed.
    Declined {
        operation: String,
    },
    /// An operation without a more specific event completed.
    OperationComplete {
        operation: String,
    },
    /// An operation failed.
    OperationFailed {
        operation: String,
        error: String,
    },
    VolumeClosed,
}
