//! Moving data between the host and a volume, and within a volume.
//!
//! - [`orchestrator`] performs imports, exports, moves, copies, renames and
//!   deletes.
//! - [`drag`] tracks drags and classifies drops.
//! - [`background`] runs a transfer on a worker thread.

pub mod background;
pub mod drag;
pub mod orchestrator;

pub use background::{spawn_transfer, JobOutput, TransferJob, WorkerMessage};
pub use drag::{DragSession, DragTracker, DropKind, DropOperation, DropRequest, TreeId};
pub use orchestrator::{ReplacePrompt, TransferOrchestrator, TransferReport};
