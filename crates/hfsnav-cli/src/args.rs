//! Command-line parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use hfsnav_core::image::DEFAULT_IMAGE_BYTES;
use hfsnav_core::path::ROOT;
use hfsnav_core::TransferMode;

#[derive(Parser, Debug)]
#[command(name = "hfsnav")]
#[command(about = "Browse and edit HFS volume images", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub invocation: Invocation,
}

/// What the user asked for.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Create a blank image
    New {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,
        /// Image size in bytes
        #[arg(default_value_t = DEFAULT_IMAGE_BYTES)]
        bytes: u64,
        /// Volume name
        #[arg(default_value = "Untitled")]
        name: String,
    },
    /// Run a command against an existing image
    Open {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,
        /// Transfer mode: auto, raw, macbinary, binhex or text
        #[arg(long, value_parser = parse_mode)]
        mode: Option<TransferMode>,
        #[command(subcommand)]
        action: Action,
    },
}

/// A command run against an existing image.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// List HFS partitions
    Partitions,
    /// Show volume information
    Info,
    /// List a directory
    Ls {
        #[arg(default_value = ROOT)]
        path: String,
    },
    /// List a directory recursively
    Tree {
        #[arg(default_value = ROOT)]
        path: String,
    },
    /// Copy host files into the volume
    Import {
        #[arg(required = true, value_name = "HOST")]
        host_items: Vec<PathBuf>,
        /// Destination folder on the volume
        #[arg(long = "to", default_value = ROOT)]
        destination: String,
    },
    /// Copy an entry to the host
    Export { path: String, host: PathBuf },
    /// Move entries within the volume
    #[command(name = "mv")]
    Move {
        #[arg(required = true, num_args = 1.., value_name = "SRC")]
        sources: Vec<String>,
        #[arg(value_name = "DEST")]
        destination: String,
    },
    /// Copy entries within the volume
    #[command(name = "cp")]
    Copy {
        #[arg(required = true, num_args = 1.., value_name = "SRC")]
        sources: Vec<String>,
        #[arg(value_name = "DEST")]
        destination: String,
    },
    /// Delete entries
    #[command(name = "rm")]
    Remove {
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Rename an entry
    Rename { path: String, name: String },
    /// Set type and creator codes
    #[command(name = "settype")]
    SetType {
        path: String,
        #[arg(value_name = "TYPE")]
        file_type: String,
        #[arg(value_name = "CREA")]
        creator: String,
    },
}

impl Action {
    /// Returns `true` if the action never writes to the volume.
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Action::Partitions
                | Action::Info
                | Action::Ls { .. }
                | Action::Tree { .. }
                | Action::Export { .. }
        )
    }
}

fn parse_mode(label: &str) -> Result<TransferMode, String> {
    TransferMode::from_label(label).ok_or_else(|| format!("unknown transfer mode: {label}"))
}
