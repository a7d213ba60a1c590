//! The lazily materialised tree of volume entries.
//!
//! [`cache::NodeCache`] owns every [`node::VisibleNode`] and loads a
//! directory's children the first time someone asks for them. Mutations
//! report the directories they touched through an [`invalidation::InvalidationSink`];
//! the next query re-reads those directories from the volume.

pub mod cache;
pub mod invalidation;
pub mod node;

pub use cache::NodeCache;
pub use invalidation::{Invalidation, InvalidationSink, PendingInvalidations};
pub use node::VisibleNode;
