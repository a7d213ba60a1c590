//! Running long transfers off the owning thread.
//!
//! [`spawn_transfer`] moves the [`VolumeSession`] into a blocking worker,
//! so nothing else can touch the volume while the job runs. The worker
//! records the directories it made stale instead of touching the cache, and
//! hands both back in [`WorkerMessage::Finished`]. The owner replays the
//! invalidations before it renders again.

use std::path::PathBuf;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::engine::{FileEntryInfo, VolumeHandle};
use crate::error::CoreResult;
use crate::rendezvous::Relay;
use crate::session::VolumeSession;
use crate::transfer::orchestrator::{TransferOrchestrator, TransferReport};
use crate::tree::PendingInvalidations;

/// Work that can run in the background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferJob {
    Import {
        host_items: Vec<PathBuf>,
        destination: String,
    },
    Export {
        entry: FileEntryInfo,
        host_destination: PathBuf,
    },
    Move {
        sources: Vec<String>,
        destination: String,
    },
    Copy {
        sources: Vec<String>,
        destination: String,
    },
}

impl TransferJob {
    /// Short description for status lines.
    pub fn describe(&self) -> String {
        match self {
            TransferJob::Import {
                host_items,
                destination,
            } => format!("import {} item(s) into {destination}", host_items.len()),
            TransferJob::Export { entry, .. } => format!("export {}", entry.path),
            TransferJob::Move {
                sources,
                destination,
            } => format!("move {} item(s) into {destination}", sources.len()),
            TransferJob::Copy {
                sources,
                destination,
            } => format!("copy {} item(s) into {destination}", sources.len()),
        }
    }
}

/// What a finished job produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutput {
    Report(TransferReport),
    Exported(PathBuf),
}

/// Messages sent from a background transfer to the owning loop.
pub enum WorkerMessage<H: VolumeHandle> {
    Started(String),
    Finished {
        session: VolumeSession<H>,
        invalidations: PendingInvalidations,
        outcome: CoreResult<JobOutput>,
    },
}

/// Runs `job` on a blocking worker.
///
/// Sends [`WorkerMessage::Started`] immediately and
/// [`WorkerMessage::Finished`] with the session once the job is done.
/// Replace confirmations are asked through `prompt`.
pub fn spawn_transfer<H>(
    mut session: VolumeSession<H>,
    orchestrator: TransferOrchestrator,
    job: TransferJob,
    prompt: Relay<FileEntryInfo, bool>,
    tx: UnboundedSender<WorkerMessage<H>>,
) -> JoinHandle<()>
where
    H: VolumeHandle + 'static,
{
    tokio::task::spawn_blocking(move || {
        let description = job.describe();
        let _ = tx.send(WorkerMessage::Started(description.clone()));
        let mut invalidations = PendingInvalidations::new();
        let outcome = run(&orchestrator, &mut session, &mut invalidations, job, &prompt);
        match &outcome {
            Ok(_) => tracing::info!("background {description} finished"),
            Err(e) => tracing::warn!("background {description} failed: {e}"),
        }
        let _ = tx.send(WorkerMessage::Finished {
            session,
            invalidations,
            outcome,
        });
    })
}

fn run<H: VolumeHandle>(
    orchestrator: &TransferOrchestrator,
    session: &mut VolumeSession<H>,
    invalidations: &mut PendingInvalidations,
    job: TransferJob,
    prompt: &Relay<FileEntryInfo, bool>,
) -> CoreResult<JobOutput> {
    match job {
        TransferJob::Import {
            host_items,
            destination,
        } => orchestrator
            .import(session, invalidations, &host_items, &destination, prompt)
            .map(JobOutput::Report),
        TransferJob::Export {
            entry,
            host_destination,
        } => orchestrator
            .export(session, &entry, &host_destination)
            .map(JobOutput::Exported),
        TransferJob::Move {
            sources,
            destination,
        } => orchestrator
            .move_items(session, invalidations, &sources, &destination)
            .map(JobOutput::Report),
        TransferJob::Copy {
            sources,
            destination,
        } => orchestrator
            .copy_items(session, invalidations, &sources, &destination, prompt)
            .map(JobOutput::Report),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::{MemoryEngine, MemoryHandle, MemoryImage, MemoryVolume};
    use crate::engine::PartitionSelector;
    use crate::rendezvous;
    use crate::tree::NodeCache;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    fn open(engine: &MemoryEngine) -> VolumeSession<MemoryHandle> {
        let mut volume = MemoryVolume::new("Test", 1024 * 1024);
        volume.add_directory(":Docs").unwrap();
        volume.add_file(":Docs:note", b"old").unwrap();
        engine.insert_image("/img", MemoryImage::unpartitioned(volume));
        VolumeSession::open(engine, Path::new("/img"), true, PartitionSelector::Whole).unwrap()
    }

    #[test]
    fn describe_names_the_job() {
        let job = TransferJob::Move {
            sources: vec![":a".to_string(), ":b".to_string()],
            destination: ":c".to_string(),
        };

        assert_eq!(job.describe(), "move 2 item(s) into :c");
    }

    #[tokio::test]
    async fn import_returns_session_and_invalidations() {
        let tmp = TempDir::new().unwrap();
        let host = tmp.path().join("new");
        fs::write(&host, "n").unwrap();
        let engine = MemoryEngine::new();
        let mut session = open(&engine);
        let mut cache = NodeCache::new();
        cache.ensure_loaded(&mut session, ":").unwrap();
        cache.ensure_loaded(&mut session, ":Docs").unwrap();
        let (relay, _desk) = rendezvous::channel();
        let (tx, mut rx) = mpsc::unbounded_channel();

        spawn_transfer(
            session,
            TransferOrchestrator::default(),
            TransferJob::Import {
                host_items: vec![host],
                destination: ":Docs".to_string(),
            },
            relay,
            tx,
        );

        assert!(matches!(rx.recv().await, Some(WorkerMessage::Started(_))));
        let Some(WorkerMessage::Finished {
            mut session,
            invalidations,
            outcome,
        }) = rx.recv().await
        else {
            panic!("expected a finished message");
        };
        assert!(matches!(outcome, Ok(JobOutput::Report(ref r)) if r.completed.len() == 1));
        assert!(session.is_open());
        assert!(cache.is_loaded(":Docs"));

        invalidations.replay(&mut cache);

        assert!(!cache.is_loaded(":Docs"));
        assert_eq!(cache.child_count(&mut session, ":Docs").unwrap(), 2);
    }

    #[tokio::test]
    async fn replace_prompt_is_answered_by_owner() {
        let tmp = TempDir::new().unwrap();
        let host = tmp.path().join("NOTE");
        fs::write(&host, "new").unwrap();
        let engine = MemoryEngine::new();
        let session = open(&engine);
        let (relay, mut desk) = rendezvous::channel::<FileEntryInfo, bool>();
        let (tx, mut rx) = mpsc::unbounded_channel();

        spawn_transfer(
            session,
            TransferOrchestrator::default(),
            TransferJob::Import {
                host_items: vec![host],
                destination: ":Docs".to_string(),
            },
            relay,
            tx,
        );

        let mut asked = Vec::new();
        let outcome = loop {
            tokio::select! {
                _ = desk.serve_next(|existing| {
                    asked.push(existing.path.clone());
                    true
                }) => {}
                message = rx.recv() => match message {
                    Some(WorkerMessage::Finished { outcome, .. }) => break outcome,
                    Some(WorkerMessage::Started(_)) => {}
                    None => panic!("worker vanished"),
                },
            }
        };

        assert_eq!(asked, vec![":Docs:note"]);
        assert!(outcome.is_ok());
        let image = engine.image(Path::new("/img")).unwrap();
        let volume = image.partitions[0].volume.as_ref().unwrap();
        assert_eq!(volume.entry(":Docs:NOTE").unwrap().data, b"new");
    }
}
