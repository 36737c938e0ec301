use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "shelfscan")]
#[command(about = "Keeps a catalog of a personal book library in sync with disk", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Reconcile the catalog with the configured storage root
    Scan {
        /// Duplicate policy override: "original" rewrites stored paths, anything else only reports
        #[arg(long)]
        policy: Option<String>,
    },
    /// Write the catalog to CSV pages in the notes directory
    Export,
    /// Restore a catalog previously written by `export`
    Import,
    /// List catalogued files
    List {
        /// Only files carrying one of these tag ids
        #[arg(long = "tag")]
        tags: Vec<i64>,
        /// Substring to look for in directory or file name
        #[arg(long, default_value = "")]
        search: String,
    },
    /// Manage tags
    #[command(subcommand)]
    Tags(TagCommands),
    /// Show previous scan sessions
    History {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Print configuration values
    PrintConfig,
    /// Truncate all database tables
    TruncateDb,
}

#[derive(Debug, Subcommand)]
pub enum TagCommands {
    /// List tags under a parent, or root tags
    List {
        #[arg(long)]
        parent: Option<i64>,
    },
    /// Create a tag
    Add {
        name: String,
        #[arg(long)]
        parent: Option<i64>,
    },
    /// Attach a tag to a file
    Assign { tag: i64, file: i64 },
    /// Delete a tag together with its descendants and links
    Delete { id: i64 },
}
