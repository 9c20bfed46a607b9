use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use readlist_core::models::{ReadingStatus, Side};
use readlist_core::ItemId;

#[derive(Parser)]
#[command(name = "readlist")]
#[command(about = "Track reading progress and keep it in sync")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List tracked items
    #[command(alias = "ls")]
    List {
        /// Only show items with this status
        #[arg(long)]
        status: Option<ReadingStatus>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one item with its chapters
    Show {
        /// Item ID
        id: ItemId,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record the observed structure of an item
    Observe {
        /// Item ID
        id: ItemId,
        /// Title as shown on the source
        #[arg(long)]
        title: String,
        /// Author names, repeat for several
        #[arg(long = "author", value_name = "NAME")]
        authors: Vec<String>,
        /// Chapter stat such as "3/10" or "3/?"
        #[arg(long, value_name = "STAT")]
        chapters: String,
    },
    /// Mark a chapter as read now
    Mark {
        /// Item ID
        id: ItemId,
        /// Zero-based chapter index
        index: usize,
    },
    /// Set the reading status
    Status {
        /// Item ID
        id: ItemId,
        /// New status (reading, to-read, on-hold, read, dropped, unread)
        status: ReadingStatus,
    },
    /// Set the rating
    Rate {
        /// Item ID
        id: ItemId,
        /// Numeric score
        rating: u8,
    },
    /// Remove an item from the local list
    #[command(alias = "rm")]
    Remove {
        /// Item ID
        id: ItemId,
    },
    /// Sync the local list with the remote store
    Sync,
    /// List conflicts waiting for a choice
    Conflicts {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve a conflict by keeping one side
    #[command(group(ArgGroup::new("side").required(true).args(["local", "remote"])))]
    Resolve {
        /// Item ID
        id: ItemId,
        /// Keep the local version
        #[arg(long)]
        local: bool,
        /// Keep the remote version
        #[arg(long)]
        remote: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

/// Side picked by the mutually exclusive `--local`/`--remote` flags
pub const fn chosen_side(remote: bool) -> Side {
    if remote {
        Side::Remote
    } else {
        Side::Local
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
