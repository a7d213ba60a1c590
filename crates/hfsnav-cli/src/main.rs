//! hfsnav: browse and edit HFS volume images from the command line.
//!
//! Images are stored as JSON files by the in-memory engine. Writable
//! commands save the image when the volume closes.

mod args;
mod prompt;

use std::path::Path;
use std::sync::Mutex;

use anyhow::{bail, Context};
use clap::Parser;
use tokio::sync::mpsc;

use hfsnav_core::config::settings::LogConfig;
use hfsnav_core::display::{self, EntryDetails};
use hfsnav_core::engine::memory::{MemoryEngine, MemoryHandle};
use hfsnav_core::rendezvous;
use hfsnav_core::{
    Command, Config, Event, FileEntryInfo, JobOutput, NewImageOptions, PartitionResolver, Prompts,
    TransferJob, TransferMode, TransferReport, VolumeBrowser, WorkerMessage,
};

use crate::args::{Action, Cli, Invocation};

type Browser = VolumeBrowser<MemoryHandle>;

fn init_logging(log: &LogConfig) -> anyhow::Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log.file)
        .with_context(|| format!("failed to open log file {}", log.file.display()))?;
    let level = log
        .level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(level)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_default(&Config::default_path())?;
    init_logging(&config.log)?;

    match cli.invocation {
        Invocation::New { image, bytes, name } => {
            let options = NewImageOptions::new(bytes, name);
            options.create(&MemoryEngine::persistent(), &image)?;
            println!("created {}: {}", image.display(), options.size_label());
        }
        Invocation::Open {
            image,
            mode,
            action,
        } => run(&image, config, mode, action).await?,
    }
    Ok(())
}

async fn run(
    image: &Path,
    mut config: Config,
    mode: Option<TransferMode>,
    action: Action,
) -> anyhow::Result<()> {
    let engine = MemoryEngine::persistent();
    if matches!(action, Action::Partitions) {
        let candidates = PartitionResolver::new(&engine).candidates(image);
        if candidates.is_empty() {
            println!("no partition map; the image opens as a single volume");
        }
        for candidate in candidates {
            println!(
                "{:>3}  {:<24}  map entry {}",
                candidate.ordinal, candidate.name, candidate.map_index
            );
        }
        return Ok(());
    }

    if action.is_read_only() {
        config.general.open_writable = false;
    }
    let (mut browser, opened) =
        VolumeBrowser::open(&engine, image, &config, &prompt::choose_partition)
            .with_context(|| format!("failed to open {}", image.display()))?;
    tracing::debug!("{} opened as {:?}", image.display(), opened.selector);
    if let Some(mode) = mode {
        browser.set_transfer_mode(mode);
    }

    let result = perform(&mut browser, &config, action).await;
    browser.close();
    result
}

async fn perform(browser: &mut Browser, config: &Config, action: Action) -> anyhow::Result<()> {
    let replace = |existing: &FileEntryInfo| prompt::confirm(display::replace_prompt(existing));
    let delete = |items: &[FileEntryInfo]| prompt::confirm(display::delete_prompt(items));
    let prompts = Prompts {
        replace: &replace,
        delete: &delete,
    };

    let command = match action {
        // Listed before the volume is opened.
        Action::Partitions => return Ok(()),
        Action::Info => {
            for (label, value) in browser.volume_summary()?.rows() {
                println!("{label:>16}: {value}");
            }
            return Ok(());
        }
        Action::Tree { path } => return print_tree(browser, &path, 0),
        Action::Import {
            host_items,
            destination,
        } => return import_in_background(browser, config, host_items, destination).await,
        Action::Ls { path } => Command::Expand(path),
        Action::Export { path, host } => Command::Export {
            path,
            host_destination: host,
        },
        Action::Move {
            sources,
            destination,
        } => Command::Move {
            sources,
            destination,
        },
        Action::Copy {
            sources,
            destination,
        } => Command::Copy {
            sources,
            destination,
        },
        Action::Remove { paths } => Command::Delete(paths),
        Action::Rename { path, name } => Command::Rename {
            path,
            new_name: name,
        },
        Action::SetType {
            path,
            file_type,
            creator,
        } => Command::SetTypeCreator {
            path,
            file_type,
            creator,
        },
    };
    show(browser.execute(command, &prompts))
}

/// Prints `event`, turning a failure into an error.
fn show(event: Event) -> anyhow::Result<()> {
    match event {
        Event::DirectoryLoaded { entries, .. } => {
            for entry in &entries {
                println!("{}", entry_line(entry));
            }
        }
        Event::TransferComplete { operation, report } => {
            for line in report_lines(&operation, &report) {
                println!("{line}");
            }
        }
        Event::Exported(paths) => {
            for path in paths {
                println!("exported {}", path.display());
            }
        }
        Event::Renamed { from, to } => println!("renamed {from} to {to}"),
        Event::Deleted(count) => println!("deleted {count} item(s)"),
        Event::Declined { operation } => println!("{operation} cancelled"),
        Event::OperationComplete { operation } => println!("{operation}: done"),
        Event::OperationFailed { operation, error } => bail!("{operation} failed: {error}"),
        Event::VolumeClosed => {}
    }
    Ok(())
}

fn entry_line(entry: &FileEntryInfo) -> String {
    let details = EntryDetails::from_entry(entry);
    format!(
        "{:<6} {:>10}  {:<11}  {:<16}  {}",
        details.kind, details.size, details.type_creator, details.modified, details.name
    )
}

fn report_lines(operation: &str, report: &TransferReport) -> Vec<String> {
    let mut lines = vec![format!(
        "{operation}: {} completed, {} skipped, {} unchanged",
        report.completed.len(),
        report.skipped.len(),
        report.unchanged.len()
    )];
    lines.extend(report.completed.iter().map(|p| format!("  + {p}")));
    lines.extend(report.skipped.iter().map(|p| format!("  ~ {p} (skipped)")));
    lines.extend(report.unchanged.iter().map(|p| format!("  = {p} (already there)")));
    lines
}

fn print_tree(browser: &mut Browser, directory: &str, depth: usize) -> anyhow::Result<()> {
    let children: Vec<(String, String, bool)> = browser
        .children(directory)?
        .iter()
        .map(|node| {
            (
                node.path().to_string(),
                node.name().to_string(),
                node.is_directory(),
            )
        })
        .collect();
    for (path, name, is_directory) in children {
        let marker = if is_directory { ":" } else { "" };
        println!("{}{name}{marker}", "  ".repeat(depth));
        if is_directory {
            print_tree(browser, &path, depth + 1)?;
        }
    }
    Ok(())
}

/// Runs an import on the background worker while this task answers its
/// replace questions.
async fn import_in_background(
    browser: &mut Browser,
    config: &Config,
    host_items: Vec<std::path::PathBuf>,
    destination: String,
) -> anyhow::Result<()> {
    let (relay, mut desk) = rendezvous::channel::<FileEntryInfo, bool>();
    let (tx, mut rx) = mpsc::unbounded_channel::<WorkerMessage<MemoryHandle>>();
    browser.start_transfer(
        TransferJob::Import {
            host_items,
            destination,
        },
        relay,
        tx,
    )?;

    let confirm_replace = config.general.confirm_replace;
    let mut desk_open = true;
    loop {
        tokio::select! {
            served = desk.serve_next(|existing| {
                !confirm_replace || prompt::confirm(display::replace_prompt(existing))
            }), if desk_open => {
                desk_open = served;
            }
            message = rx.recv() => match message {
                Some(WorkerMessage::Started(description)) => eprintln!("{description}..."),
                Some(WorkerMessage::Finished {
                    session,
                    invalidations,
                    outcome,
                }) => {
                    browser.reattach(session, invalidations)?;
                    return match outcome? {
                        JobOutput::Report(report) => show(Event::TransferComplete {
                            operation: "import".to_string(),
                            report,
                        }),
                        JobOutput::Exported(path) => show(Event::Exported(vec![path])),
                    };
                }
                None => bail!("transfer worker exited without returning the volume"),
            },
        }
    }
}
