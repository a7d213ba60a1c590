//! Reporting which parts of the tree went stale.

use crate::path;

/// Receives stale-directory notifications from mutating operations.
pub trait InvalidationSink {
    /// The listing of `path` (and everything below it) is out of date.
    fn invalidate(&mut self, path: &str);

    /// Nothing cached can be trusted any more.
    fn reset(&mut self);
}

/// One recorded notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invalidation {
    Path(String),
    Reset,
}

/// Notifications recorded away from the cache, replayed later in order.
///
/// Background transfers cannot touch the cache, so they record into this
/// and hand it back with the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingInvalidations {
    recorded: Vec<Invalidation>,
}

impl PendingInvalidations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.recorded.is_empty()
    }

    pub fn len(&self) -> usize {
        self.recorded.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Invalidation> {
        self.recorded.iter()
    }

    /// Applies every notification to `sink` in the order it was recorded.
    pub fn replay(self, sink: &mut dyn InvalidationSink) {
        for invalidation in self.recorded {
            match invalidation {
                Invalidation::Path(p) => sink.invalidate(&p),
                Invalidation::Reset => sink.reset(),
            }
        }
    }
}

impl InvalidationSink for PendingInvalidations {
    fn invalidate(&mut self, path: &str) {
        let duplicate = self
            .recorded
            .last()
            .is_some_and(|last| *last == Invalidation::Path(path.to_string()));
        if !duplicate {
            self.recorded.push(Invalidation::Path(path.to_string()));
        }
    }

    fn reset(&mut self) {
        self.recorded.push(Invalidation::Reset);
    }
}

/// Invalidates the parent directory of `item`.
pub fn invalidate_parent(sink: &mut dyn InvalidationSink, item: &str) {
    sink.invalidate(path::parent_of(item));
}
