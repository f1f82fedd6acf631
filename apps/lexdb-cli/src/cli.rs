use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "lexdb", about = "Index a folder of text files and search it with tiered keyword retrieval", version)]
pub struct Cli {
    /// Directory to ingest (overrides ingest.resources_dir)
    #[arg(long, global = true)]
    pub resources: Option<String>,

    /// Glob of files to ingest, relative to the resources directory
    #[arg(long, global = true)]
    pub pattern: Option<String>,

    /// Only ingest the first N matching files
    #[arg(long, global = true)]
    pub limit_files: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a single query and print the ranked chunks
    Query {
        text: String,

        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Read queries from stdin until `:quit`
    Interactive {
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Ingest and report index sizes
    Stats,
}
