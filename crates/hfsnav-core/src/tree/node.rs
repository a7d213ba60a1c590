//! One entry as shown in the tree.

use std::cmp::Ordering;

use crate::engine::FileEntryInfo;
use crate::path;

/// A volume entry plus its (possibly unloaded) children.
///
/// `children` is `None` until the directory has been listed, and afterwards
/// always a complete, sorted snapshot of that listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleNode {
    info: FileEntryInfo,
    pub(crate) children: Option<Vec<VisibleNode>>,
}

impl VisibleNode {
    /// Wraps `info` with no children loaded.
    pub fn new(info: FileEntryInfo) -> Self {
        Self {
            info,
            children: None,
        }
    }

    pub fn info(&self) -> &FileEntryInfo {
        &self.info
    }

    pub fn path(&self) -> &str {
        &self.info.path
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn is_directory(&self) -> bool {
        self.info.is_directory
    }

    /// The loaded children, or `None` if this directory has not been listed.
    pub fn children(&self) -> Option<&[VisibleNode]> {
        self.children.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.children.is_some()
    }
}

/// Display order: directories first, then case-insensitive by name.
pub fn display_order(a: &VisibleNode, b: &VisibleNode) -> Ordering {
    b.is_directory()
        .cmp(&a.is_directory())
        .then_with(|| path::compare_names(a.name(), b.name()))
}

/// Wraps a raw listing into sorted, unloaded nodes.
pub fn from_listing(entries: Vec<FileEntryInfo>) -> Vec<VisibleNode> {
    let mut nodes: Vec<VisibleNode> = entries.into_iter().map(VisibleNode::new).collect();
    nodes.sort_by(display_order);
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::epoch_floor;

    fn info(name: &str, is_directory: bool) -> FileEntryInfo {
        FileEntryInfo {
            name: name.to_string(),
            path: path::join(path::ROOT, name),
            is_directory,
            data_fork_size: 0,
            resource_fork_size: 0,
            created: epoch_floor(),
            modified: epoch_floor(),
            file_type: String::new(),
            file_creator: String::new(),
        }
    }

    #[test]
    fn new_node_is_unloaded() {
        let node = VisibleNode::new(info("Docs", true));

        assert!(!node.is_loaded());
        assert!(node.children().is_none());
        assert_eq!(node.path(), ":Docs");
    }

    #[test]
    fn listing_sorts_directories_first_then_name() {
        let nodes = from_listing(vec![
            info("zebra", false),
            info("Apple", false),
            info("System Folder", true),
            info("apps", true),
        ]);

        let names: Vec<&str> = nodes.iter().map(VisibleNode::name).collect();
        assert_eq!(names, vec!["apps", "System Folder", "Apple", "zebra"]);
    }
}
