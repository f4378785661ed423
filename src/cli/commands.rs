use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "mdnotes")]
#[command(version, about = "A local notes store with debounced autosave")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory (defaults to the nearest .mdnotes/ above the current directory)
    #[arg(long, global = true, env = "MDNOTES_DIR", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a .mdnotes/ data directory here (or at --data-dir)
    Init,

    /// Add a new note
    Add {
        /// Note title
        title: String,

        /// Note content
        #[arg(long, conflicts_with = "stdin")]
        content: Option<String>,

        /// Read content from stdin
        #[arg(long)]
        stdin: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List notes in display order
    List {
        /// Only show notes whose title or content contains this text
        #[arg(long)]
        filter: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a single note
    Get {
        /// Note ID
        id: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change a note's title or content
    Edit {
        /// Note ID
        id: i64,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New content
        #[arg(long, conflicts_with = "stdin")]
        content: Option<String>,

        /// Read new content from stdin
        #[arg(long)]
        stdin: bool,
    },

    /// Delete a note
    Delete {
        /// Note ID
        id: i64,

        /// Skip confirmation
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Search note titles and content (case-insensitive)
    Search {
        /// Text to look for
        query: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Set a note's display position
    Move {
        /// Note ID
        id: i64,

        /// New order index (lower sorts first)
        #[arg(allow_negative_numbers = true)]
        order_index: i64,
    },

    /// Renumber display order to 0..n-1
    Compact,

    /// Run a JSON-lines editing session over stdin/stdout
    Session,
}
