//! hfsnav core library: navigation, caching and transfer for HFS volume
//! images.
//!
//! `hfsnav-core` holds everything an image editor needs between the user
//! interface and the volume access engine. It never touches the on-disk
//! format itself: that is the job of a [`VolumeEngine`], and
//! [`engine::memory::MemoryEngine`] is an in-memory one for tests and the
//! CLI.
//!
//! # Modules
//!
//! - [`path`]: Colon-delimited volume paths, name sanitizing and matching.
//! - [`engine`]: The [`VolumeEngine`] / [`VolumeHandle`] boundary and its data types.
//! - [`session`]: [`VolumeSession`], one open volume, closed exactly once.
//! - [`partition`]: Choosing and opening a volume inside a container.
//! - [`tree`]: The lazy [`NodeCache`] and invalidation plumbing.
//! - [`selection`]: Normalizing selections and what they allow.
//! - [`transfer`]: Import, export, move, copy, drag and drop, background jobs.
//! - [`browser`]: [`VolumeBrowser`], one window's session, tree and settings.
//! - [`display`]: Detail pane and prompt text.
//! - [`image`]: Options for creating a blank image.
//! - [`rendezvous`]: Asking the owning thread a question from a worker.
//! - [`config`]: User-facing configuration (TOML-based settings).
//! - [`event`]: Command and event types for UI ↔ Core communication.
//! - [`error`]: Unified error type ([`CoreError`]) and result alias ([`CoreResult`]).

pub mod browser;
pub mod config;
pub mod display;
pub mod engine;
pub mod error;
pub mod event;
pub mod image;
pub mod partition;
pub mod path;
pub mod rendezvous;
pub mod selection;
pub mod session;
pub mod transfer;
pub mod tree;

pub use browser::{DeletePrompt, Prompts, VolumeBrowser};
pub use config::settings::Config;
pub use engine::{
    EngineError, FileEntryInfo, PartitionCandidate, PartitionMapEntry, PartitionSelector,
    TransferMode, VolumeEngine, VolumeHandle, VolumeInfo,
};
pub use error::{CoreError, CoreResult};
pub use event::{Command, Event};
pub use image::NewImageOptions;
pub use partition::{OpenedPartition, PartitionChooser, PartitionResolver};
pub use rendezvous::Marshalled;
pub use selection::Selection;
pub use session::VolumeSession;
pub use transfer::{
    DropOperation, DropRequest, JobOutput, ReplacePrompt, TransferJob, TransferOrchestrator,
    TransferReport, WorkerMessage,
};
pub use tree::{InvalidationSink, NodeCache, PendingInvalidations, VisibleNode};
