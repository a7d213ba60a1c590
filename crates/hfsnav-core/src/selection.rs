//! Reducing multi-selections and deciding what they allow.
//!
//! Deleting, moving or dragging a selection that contains both a directory
//! and something inside it must process the directory once and never its
//! descendants separately. The functions here collapse a selection to the
//! minimal set of items whose ancestors are not also selected.

use std::cmp::Reverse;

use crate::engine::FileEntryInfo;
use crate::error::{CoreError, CoreResult};
use crate::path;
use crate::tree::VisibleNode;

/// Anything that names a volume path.
pub trait Selectable {
    fn volume_path(&self) -> &str;
}

impl Selectable for FileEntryInfo {
    fn volume_path(&self) -> &str {
        &self.path
    }
}

impl Selectable for VisibleNode {
    fn volume_path(&self) -> &str {
        self.path()
    }
}

impl Selectable for String {
    fn volume_path(&self) -> &str {
        self
    }
}

impl Selectable for &str {
    fn volume_path(&self) -> &str {
        self
    }
}

/// Keeps items whose ancestors are not selected, shortest paths first.
fn collapse<T: Selectable>(items: &[T]) -> Vec<&T> {
    let mut sorted: Vec<&T> = items.iter().collect();
    sorted.sort_by(|a, b| {
        let (a, b) = (a.volume_path(), b.volume_path());
        a.len().cmp(&b.len()).then_with(|| a.cmp(b))
    });

    let mut kept: Vec<&T> = Vec::with_capacity(sorted.len());
    for item in sorted {
        let covered = kept
            .iter()
            .any(|k| path::is_within(item.volume_path(), k.volume_path()));
        if !covered {
            kept.push(item);
        }
    }
    kept
}

/// The minimal covering set of `items`, deepest first.
///
/// Selecting `:a`, `:a:b` and `:c` yields `:a` and `:c`; `:a:b` is handled
/// by processing `:a` recursively.
pub fn normalize_for_delete<T: Selectable + Clone>(items: &[T]) -> Vec<T> {
    let mut kept = collapse(items);
    kept.sort_by_key(|item| Reverse(item.volume_path().len()));
    kept.into_iter().cloned().collect()
}

/// The same collapsing applied to plain paths, shortest first.
pub fn collapse_paths<S: AsRef<str>>(paths: &[S]) -> Vec<String> {
    let refs: Vec<&str> = paths.iter().map(AsRef::as_ref).collect();
    collapse(&refs).into_iter().map(|p| p.to_string()).collect()
}

/// Rejects a move or copy whose destination is one of the sources or lies
/// inside one.
///
/// # Errors
///
/// [`CoreError::InvalidDrop`] naming the offending source.
pub fn validate_drop<S: AsRef<str>>(sources: &[S], destination: &str) -> CoreResult<()> {
    match sources
        .iter()
        .map(AsRef::as_ref)
        .find(|source| path::is_within(destination, source))
    {
        Some(source) => Err(CoreError::InvalidDrop {
            source_path: source.to_string(),
            destination: destination.to_string(),
        }),
        None => Ok(()),
    }
}

/// What the current selection allows.
#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
    items: &'a [FileEntryInfo],
    volume_open: bool,
}

impl<'a> Selection<'a> {
    pub fn new(items: &'a [FileEntryInfo], volume_open: bool) -> Self {
        Self { items, volume_open }
    }

    pub fn items(&self) -> &'a [FileEntryInfo] {
        self.items
    }

    fn single(&self) -> Option<&'a FileEntryInfo> {
        match self.items {
            [only] => Some(only),
            _ => None,
        }
    }

    pub fn can_import(&self) -> bool {
        self.volume_open
    }

    pub fn can_export(&self) -> bool {
        self.volume_open && self.single().is_some()
    }

    pub fn can_rename(&self) -> bool {
        self.volume_open && self.single().is_some()
    }

    pub fn can_delete(&self) -> bool {
        self.volume_open && !self.items.is_empty()
    }

    pub fn can_set_type_creator(&self) -> bool {
        self.volume_open && self.single().is_some_and(|entry| !entry.is_directory)
    }

    /// Where an import lands: the selected directory, else the selected
    /// item's parent, else the root.
    pub fn import_destination(&self) -> String {
        match self.items.first() {
            Some(entry) if entry.is_directory => entry.path.clone(),
            Some(entry) => path::parent_of(&entry.path).to_string(),
            None => path::ROOT.to_string(),
        }
    }
}
