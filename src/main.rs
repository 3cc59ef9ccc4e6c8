use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::recall::RecallArgs;
use commands::serve::ServeOptions;
use commands::store::StoreArgs;

#[derive(Parser)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about = "Semantic memory for AI-assisted sessions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the memory daemon
    Serve {
        /// Bind address (default from config, 127.0.0.1)
        #[arg(long)]
        host: Option<String>,

        /// Port (default from config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Store a learning
    Store {
        /// The learning text
        content: String,

        /// Category label (gotcha, solution, pattern, rationale, ...)
        #[arg(short = 't', long = "type", default_value = "note")]
        kind: String,

        /// Situational detail
        #[arg(long)]
        context: Option<String>,

        /// Confidence in [0,1] (default 0.9)
        #[arg(long)]
        confidence: Option<f64>,

        /// Originating session id, for provenance
        #[arg(long)]
        session: Option<String>,

        /// Daemon address (host:port)
        #[arg(long)]
        address: Option<String>,
    },

    /// Recall learnings relevant to a query
    Recall {
        /// The query text
        query: String,

        /// Similarity threshold override
        #[arg(long)]
        min_similarity: Option<f32>,

        /// Result cap override
        #[arg(long)]
        max_results: Option<usize>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,

        /// Daemon address (host:port)
        #[arg(long)]
        address: Option<String>,
    },

    /// Check daemon and embedding-provider health
    Health {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,

        /// Daemon address (host:port)
        #[arg(long)]
        address: Option<String>,
    },

    /// Show corpus statistics
    Stats {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,

        /// Daemon address (host:port)
        #[arg(long)]
        address: Option<String>,
    },

    /// Delete a learning by id
    Forget {
        /// Learning id
        id: i64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { host, port } => commands::serve::run_server(ServeOptions { host, port }),
        Commands::Store {
            content,
            kind,
            context,
            confidence,
            session,
            address,
        } => commands::store::execute(StoreArgs {
            kind,
            content,
            context,
            confidence,
            session_source: session,
            address,
        }),
        Commands::Recall {
            query,
            min_similarity,
            max_results,
            json,
            address,
        } => commands::recall::execute(RecallArgs {
            query,
            min_similarity,
            max_results,
            json,
            address,
        }),
        Commands::Health { json, address } => commands::health::execute(json, address),
        Commands::Stats { json, address } => commands::stats::execute(json, address),
        Commands::Forget { id } => commands::forget::execute(id),
    }
}
