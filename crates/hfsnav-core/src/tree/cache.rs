//! Lazy, invalidatable cache of directory listings.

use crate::engine::VolumeHandle;
use crate::error::{CoreError, CoreResult};
use crate::path;
use crate::session::VolumeSession;
use crate::tree::invalidation::InvalidationSink;
use crate::tree::node::{self, VisibleNode};

/// Owns every node shown in one window's tree.
///
/// Nothing is listed until it is asked for. The root's children live in
/// `roots`; `None` means the root itself has not been listed yet.
#[derive(Debug, Default)]
pub struct NodeCache {
    roots: Option<Vec<VisibleNode>>,
}

fn find<'a>(nodes: &'a [VisibleNode], target: &str) -> Option<&'a VisibleNode> {
    for node in nodes {
        if node.path() == target {
            return Some(node);
        }
        if path::is_strict_descendant(target, node.path()) {
            return node.children.as_deref().and_then(|c| find(c, target));
        }
    }
    None
}

fn find_mut<'a>(nodes: &'a mut [VisibleNode], target: &str) -> Option<&'a mut VisibleNode> {
    for node in nodes.iter_mut() {
        if node.path() == target {
            return Some(node);
        }
        if path::is_strict_descendant(target, node.path()) {
            return node
                .children
                .as_deref_mut()
                .and_then(|c| find_mut(c, target));
        }
    }
    None
}

impl NodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lists `directory` into the cache unless it is already loaded.
    ///
    /// Files are a no-op. If the listing fails the node stays unloaded and
    /// the error is returned.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`] if `directory` is not in the loaded tree.
    /// - Whatever the session reports for the listing.
    pub fn ensure_loaded<H: VolumeHandle>(
        &mut self,
        session: &mut VolumeSession<H>,
        directory: &str,
    ) -> CoreResult<()> {
        if path::is_root(directory) {
            if self.roots.is_none() {
                let listing = session.list(directory)?;
                tracing::debug!("loaded {} root entries", listing.len());
                self.roots = Some(node::from_listing(listing));
            }
            return Ok(());
        }

        let roots = self
            .roots
            .as_deref_mut()
            .ok_or_else(|| CoreError::NotFound(directory.to_string()))?;
        let target = find_mut(roots, directory)
            .ok_or_else(|| CoreError::NotFound(directory.to_string()))?;
        if !target.is_directory() || target.is_loaded() {
            return Ok(());
        }
        let listing = session.list(directory)?;
        tracing::debug!("loaded {} entries of {directory}", listing.len());
        target.children = Some(node::from_listing(listing));
        Ok(())
    }

    /// The children of `directory`, loading them first if necessary.
    pub fn children_of<H: VolumeHandle>(
        &mut self,
        session: &mut VolumeSession<H>,
        directory: &str,
    ) -> CoreResult<&[VisibleNode]> {
        self.ensure_loaded(session, directory)?;
        Ok(self.loaded_children(directory).unwrap_or(&[]))
    }

    pub fn child_count<H: VolumeHandle>(
        &mut self,
        session: &mut VolumeSession<H>,
        directory: &str,
    ) -> CoreResult<usize> {
        Ok(self.children_of(session, directory)?.len())
    }

    pub fn child_at<H: VolumeHandle>(
        &mut self,
        session: &mut VolumeSession<H>,
        directory: &str,
        index: usize,
    ) -> CoreResult<Option<&VisibleNode>> {
        Ok(self.children_of(session, directory)?.get(index))
    }

    /// Returns `true` if `path` can be expanded. Never touches the volume.
    pub fn is_expandable(&self, path: &str) -> bool {
        path::is_root(path) || self.node(path).is_some_and(VisibleNode::is_directory)
    }

    /// The node at `path`, if it has been materialised.
    pub fn node(&self, path: &str) -> Option<&VisibleNode> {
        find(self.roots.as_deref()?, path)
    }

    /// Returns `true` if the children of `path` are cached.
    pub fn is_loaded(&self, path: &str) -> bool {
        if path::is_root(path) {
            return self.roots.is_some();
        }
        self.node(path).is_some_and(VisibleNode::is_loaded)
    }

    fn loaded_children(&self, directory: &str) -> Option<&[VisibleNode]> {
        if path::is_root(directory) {
            return self.roots.as_deref();
        }
        self.node(directory)?.children()
    }

    /// Drops the cached children of `path`. The root drops everything.
    ///
    /// Returns `false` when `path` is not materialised, which is not an error.
    pub fn invalidate(&mut self, path: &str) -> bool {
        if path::is_root(path) {
            return self.roots.take().is_some();
        }
        let Some(roots) = self.roots.as_deref_mut() else {
            return false;
        };
        match find_mut(roots, path) {
            Some(node) => {
                node.children = None;
                tracing::debug!("invalidated {path}");
                true
            }
            None => false,
        }
    }

    /// Forgets the whole tree.
    pub fn reset(&mut self) {
        self.roots = None;
        tracing::debug!("tree reset");
    }

    /// Re-reads `directory` from the volume.
    pub fn refresh<H: VolumeHandle>(
        &mut self,
        session: &mut VolumeSession<H>,
        directory: &str,
    ) -> CoreResult<()> {
        self.invalidate(directory);
        self.ensure_loaded(session, directory)
    }
}

impl InvalidationSink for NodeCache {
    fn invalidate(&mut self, path: &str) {
        NodeCache::invalidate(self, path);
    }

    fn reset(&mut self) {
        NodeCache::reset(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::{MemoryEngine, MemoryHandle, MemoryImage, MemoryVolume};
    use crate::engine::PartitionSelector;
    use std::path::Path;

    fn open(engine: &MemoryEngine) -> VolumeSession<MemoryHandle> {
        let mut volume = MemoryVolume::new("Test", 1024 * 1024);
        volume.add_directory(":a").unwrap();
        volume.add_directory(":a:b").unwrap();
        volume.add_file(":a:b:deep", b"x").unwrap();
        volume.add_file(":a:note", b"n").unwrap();
        volume.add_file(":c", b"c").unwrap();
        engine.insert_image("/img", MemoryImage::unpartitioned(volume));
        VolumeSession::open(engine, Path::new("/img"), true, PartitionSelector::Whole).unwrap()
    }

    fn listings_of(engine: &MemoryEngine, dir: &str) -> usize {
        engine
            .journal()
            .listings
            .iter()
            .filter(|l| l.as_str() == dir)
            .count()
    }

    #[test]
    fn nothing_is_listed_until_asked() {
        let engine = MemoryEngine::new();
        let _session = open(&engine);
        let cache = NodeCache::new();

        assert!(!cache.is_loaded(":"));
        assert!(engine.journal().listings.is_empty());
    }

    #[test]
    fn children_are_listed_once() {
        let engine = MemoryEngine::new();
        let mut session = open(&engine);
        let mut cache = NodeCache::new();

        assert_eq!(cache.child_count(&mut session, ":").unwrap(), 2);
        assert_eq!(cache.child_count(&mut session, ":").unwrap(), 2);

        assert_eq!(listings_of(&engine, ":"), 1);
    }

    #[test]
    fn directories_sort_before_files() {
        let engine = MemoryEngine::new();
        let mut session = open(&engine);
        let mut cache = NodeCache::new();

        assert!(cache.children_of(&mut session, ":a").is_err());

        cache.ensure_loaded(&mut session, ":").unwrap();
        let names: Vec<&str> = cache
            .children_of(&mut session, ":a")
            .unwrap()
            .iter()
            .map(VisibleNode::name)
            .collect();
        assert_eq!(names, vec!["b", "note"]);
    }

    #[test]
    fn unknown_path_is_not_found() {
        let engine = MemoryEngine::new();
        let mut session = open(&engine);
        let mut cache = NodeCache::new();
        cache.ensure_loaded(&mut session, ":").unwrap();

        assert!(matches!(
            cache.ensure_loaded(&mut session, ":zzz"),
            Err(CoreError::NotFound(_))
        ));
    }

    #[test]
    fn files_are_a_noop() {
        let engine = MemoryEngine::new();
        let mut session = open(&engine);
        let mut cache = NodeCache::new();
        cache.ensure_loaded(&mut session, ":").unwrap();

        cache.ensure_loaded(&mut session, ":c").unwrap();

        assert!(!cache.is_expandable(":c"));
        assert_eq!(listings_of(&engine, ":c"), 0);
    }

    #[test]
    fn invalidate_causes_exactly_one_fresh_listing() {
        let engine = MemoryEngine::new();
        let mut session = open(&engine);
        let mut cache = NodeCache::new();
        cache.ensure_loaded(&mut session, ":").unwrap();
        cache.ensure_loaded(&mut session, ":a").unwrap();
        cache.ensure_loaded(&mut session, ":a:b").unwrap();

        assert!(cache.invalidate(":a"));
        assert!(!cache.is_loaded(":a"));
        assert!(cache.node(":a:b").is_none());
        cache.child_count(&mut session, ":a").unwrap();
        cache.child_count(&mut session, ":a").unwrap();

        assert_eq!(listings_of(&engine, ":a"), 2);
        assert!(cache.is_loaded(":"));
    }

    #[test]
    fn invalidate_unknown_path_is_noop() {
        let engine = MemoryEngine::new();
        let mut session = open(&engine);
        let mut cache = NodeCache::new();
        cache.ensure_loaded(&mut session, ":").unwrap();

        assert!(!cache.invalidate(":missing:deeper"));
        assert!(cache.is_loaded(":"));
    }

    #[test]
    fn invalidate_root_drops_everything() {
        let engine = MemoryEngine::new();
        let mut session = open(&engine);
        let mut cache = NodeCache::new();
        cache.ensure_loaded(&mut session, ":").unwrap();
        cache.ensure_loaded(&mut session, ":a").unwrap();

        assert!(cache.invalidate(":"));

        assert!(!cache.is_loaded(":"));
        assert!(cache.node(":a").is_none());
    }

    #[test]
    fn failed_listing_leaves_node_unloaded() {
        let engine = MemoryEngine::new();
        let mut session = open(&engine);
        let mut cache = NodeCache::new();
        cache.ensure_loaded(&mut session, ":").unwrap();
        engine.fail_listing(":a");

        assert!(cache.ensure_loaded(&mut session, ":a").is_err());
        assert!(!cache.is_loaded(":a"));

        engine.heal_listing(":a");
        assert_eq!(cache.child_count(&mut session, ":a").unwrap(), 2);
    }

    #[test]
    fn refresh_rereads_directory() {
        let engine = MemoryEngine::new();
        let mut session = open(&engine);
        let mut cache = NodeCache::new();
        cache.ensure_loaded(&mut session, ":").unwrap();
        session.rename(":c", "renamed").unwrap();

        cache.refresh(&mut session, ":").unwrap();

        assert!(cache.node(":renamed").is_some());
        assert!(cache.node(":c").is_none());
    }

    #[test]
    fn child_at_out_of_range_is_none() {
        let engine = MemoryEngine::new();
        let mut session = open(&engine);
        let mut cache = NodeCache::new();

        assert_eq!(
            cache.child_at(&mut session, ":", 0).unwrap().map(VisibleNode::name),
            Some("a")
        );
        assert!(cache.child_at(&mut session, ":", 9).unwrap().is_none());
    }

    #[test]
    fn sink_trait_delegates() {
        let engine = MemoryEngine::new();
        let mut session = open(&engine);
        let mut cache = NodeCache::new();
        cache.ensure_loaded(&mut session, ":").unwrap();

        let sink: &mut dyn InvalidationSink = &mut cache;
        sink.reset();

        assert!(!cache.is_loaded(":"));
    }
}
