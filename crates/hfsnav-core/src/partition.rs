//! Choosing which volume of a container to open.
//!
//! A container may hold zero, one or many HFS partitions, and containers
//! number their partitions inconsistently. [`PartitionResolver`] enumerates
//! the candidates, asks a [`PartitionChooser`] when there is more than one,
//! and then walks a de-duplicated list of [`PartitionSelector`]s until one
//! opens.

use std::path::Path;

use crate::engine::{PartitionCandidate, PartitionMapEntry, PartitionSelector, VolumeEngine};
use crate::error::{CoreError, CoreResult};
use crate::rendezvous::{Marshalled, Relay};
use crate::session::VolumeSession;

/// Supplies the user's choice among several partitions.
pub trait PartitionChooser {
    /// Returns the chosen candidate, or `None` to cancel the open.
    fn choose(&self, candidates: &[PartitionCandidate]) -> Option<PartitionCandidate>;
}

impl<F> PartitionChooser for F
where
    F: Fn(&[PartitionCandidate]) -> Option<PartitionCandidate>,
{
    fn choose(&self, candidates: &[PartitionCandidate]) -> Option<PartitionCandidate> {
        self(candidates)
    }
}

/// Forwards the question to the owning thread and blocks for the answer.
impl PartitionChooser for Relay<Vec<PartitionCandidate>, Option<PartitionCandidate>> {
    fn choose(&self, candidates: &[PartitionCandidate]) -> Option<PartitionCandidate> {
        self.ask(candidates.to_vec()).flatten()
    }
}

/// Asks `local` directly on the owning thread and the owner through the
/// relay from anywhere else.
impl<F> PartitionChooser for Marshalled<F, Vec<PartitionCandidate>, Option<PartitionCandidate>>
where
    F: Fn(&[PartitionCandidate]) -> Option<PartitionCandidate>,
{
    fn choose(&self, candidates: &[PartitionCandidate]) -> Option<PartitionCandidate> {
        self.answer(
            |local| local(candidates),
            || candidates.to_vec(),
            Option::flatten,
        )
    }
}

/// What was actually opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedPartition {
    pub selector: PartitionSelector,
    pub candidate: Option<PartitionCandidate>,
}

/// Turns a raw partition map into user-facing candidates.
pub fn candidates_from_map(map: &[PartitionMapEntry]) -> Vec<PartitionCandidate> {
    map.iter()
        .filter(|entry| entry.is_hfs())
        .zip(1..)
        .map(|(entry, ordinal)| PartitionCandidate {
            ordinal,
            map_index: entry.map_index,
            name: entry.name.clone(),
        })
        .collect()
}

/// Removes repeated selectors, keeping the first occurrence.
pub fn dedup_attempts(attempts: Vec<PartitionSelector>) -> Vec<PartitionSelector> {
    let mut seen = Vec::with_capacity(attempts.len());
    for selector in attempts {
        if !seen.contains(&selector) {
            seen.push(selector);
        }
    }
    seen
}

/// The ordered open attempts for a candidate list.
///
/// Returns `None` when a choice was required and the chooser declined.
pub fn plan_attempts(
    candidates: &[PartitionCandidate],
    chooser: &dyn PartitionChooser,
) -> Option<(Vec<PartitionSelector>, Option<PartitionCandidate>)> {
    let fallback = [PartitionSelector::Automatic, PartitionSelector::Whole];
    match candidates {
        [] => Some((fallback.to_vec(), None)),
        [only] => {
            let mut attempts = vec![
                PartitionSelector::Number(only.ordinal),
                PartitionSelector::Number(only.map_index),
            ];
            attempts.extend(fallback);
            Some((dedup_attempts(attempts), Some(only.clone())))
        }
        _ => {
            let chosen = chooser.choose(candidates)?;
            let attempts = vec![
                PartitionSelector::Number(chosen.ordinal),
                PartitionSelector::Number(chosen.map_index),
            ];
            Some((dedup_attempts(attempts), Some(chosen)))
        }
    }
}

/// Opens containers through an engine.
pub struct PartitionResolver<'a, E: VolumeEngine> {
    engine: &'a E,
}

impl<'a, E: VolumeEngine> PartitionResolver<'a, E> {
    pub fn new(engine: &'a E) -> Self {
        Self { engine }
    }

    /// Lists the HFS partitions in `image`. Enumeration failures are logged
    /// and reported as no candidates.
    pub fn candidates(&self, image: &Path) -> Vec<PartitionCandidate> {
        match self.engine.list_partitions(image) {
            Ok(map) => candidates_from_map(&map),
            Err(e) => {
                tracing::warn!("no partition map for {}: {e}", image.display());
                Vec::new()
            }
        }
    }

    /// Opens the best volume in `image`.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Cancelled`] if a choice was needed and none was made;
    ///   nothing has been opened in that case.
    /// - [`CoreError::InvalidArgument`] if there was nothing to attempt.
    /// - The last open failure if every attempt failed.
    pub fn open(
        &self,
        image: &Path,
        writable: bool,
        chooser: &dyn PartitionChooser,
    ) -> CoreResult<(VolumeSession<E::Handle>, OpenedPartition)> {
        let candidates = self.candidates(image);
        let (attempts, candidate) =
            plan_attempts(&candidates, chooser).ok_or(CoreError::Cancelled)?;
        self.open_first(image, writable, &attempts)
            .map(|(session, selector)| (session, OpenedPartition { selector, candidate }))
    }

    /// Tries `attempts` in order; the first success wins.
    pub fn open_first(
        &self,
        image: &Path,
        writable: bool,
        attempts: &[PartitionSelector],
    ) -> CoreResult<(VolumeSession<E::Handle>, PartitionSelector)> {
        let mut last_error = None;
        for &selector in attempts {
            match VolumeSession::open(self.engine, image, writable, selector) {
                Ok(session) => return Ok((session, selector)),
                Err(e) => {
                    tracing::debug!("open {} as {selector:?} failed: {e}", image.display());
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            CoreError::InvalidArgument(format!(
                "no partition candidates in {}",
                image.display()
            ))
        }))
    }
}
