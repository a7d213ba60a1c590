//! Drag sessions and drop classification.
//!
//! A drop is internal only if it started in the same tree and that tree is
//! still tracking the drag's source paths. Everything else is treated as a
//! host import.

use std::fmt;
use std::path::PathBuf;

use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::selection;

/// Identifies one tree instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeId(Uuid);

impl TreeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TreeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A drag that started in a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSession {
    pub origin: TreeId,
    pub source_paths: Vec<String>,
}

/// What an internal drop should do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DropOperation {
    #[default]
    Move,
    Copy,
}

/// A drop arriving at a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropRequest {
    /// The tree the drag started in, if it started in one.
    pub origin: Option<TreeId>,
    /// Host files carried by the drag.
    pub host_items: Vec<PathBuf>,
    pub destination: String,
    pub operation: DropOperation,
}

/// How a drop will be carried out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropKind {
    Internal {
        sources: Vec<String>,
        operation: DropOperation,
    },
    External {
        host_items: Vec<PathBuf>,
    },
}

/// Per-tree drag state.
#[derive(Debug, Default)]
pub struct DragTracker {
    id: TreeId,
    active: Option<DragSession>,
}

impl DragTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> TreeId {
        self.id
    }

    /// Starts tracking a drag of `paths` out of this tree.
    pub fn begin<S: AsRef<str>>(&mut self, paths: &[S]) -> &DragSession {
        let session = DragSession {
            origin: self.id,
            source_paths: selection::collapse_paths(paths),
        };
        tracing::debug!("drag started with {} item(s)", session.source_paths.len());
        self.active.insert(session)
    }

    pub fn active(&self) -> Option<&DragSession> {
        self.active.as_ref()
    }

    /// Stops tracking the current drag, whatever its outcome.
    pub fn end(&mut self) {
        if self.active.take().is_some() {
            tracing::debug!("drag ended");
        }
    }

    /// Decides whether `request` is an internal move/copy or a host import.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidDrop`] for an internal drop into a source's own
    ///   subtree.
    /// - [`CoreError::InvalidArgument`] for an external drop without host
    ///   items.
    pub fn classify(&self, request: &DropRequest) -> CoreResult<DropKind> {
        if let Some(session) = &self.active {
            if request.origin == Some(self.id) && !session.source_paths.is_empty() {
                selection::validate_drop(&session.source_paths, &request.destination)?;
                return Ok(DropKind::Internal {
                    sources: session.source_paths.clone(),
                    operation: request.operation,
                });
            }
        }
        if request.host_items.is_empty() {
            return Err(CoreError::InvalidArgument(
                "drop carries no host items".to_string(),
            ));
        }
        Ok(DropKind::External {
            host_items: request.host_items.clone(),
        })
    }
}
