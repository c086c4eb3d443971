mod cmd;
mod output;
mod tables;

use clap::{Parser, Subcommand};
use cmd::run::RunArgs;
use cmd::tables::TablesSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "codegrab",
    about = "Capture generated code from producer output into named files",
    version,
    propagate_version = true
)]
struct Cli {
    /// Heuristics tables file (default: ./codegrab-tables.yaml when present)
    #[arg(long, global = true, env = "CODEGRAB_TABLES")]
    tables: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract named files from a saved output snapshot
    Extract {
        /// Snapshot file (reads stdin when omitted)
        file: Option<PathBuf>,

        /// Write the extracted files under this directory
        #[arg(long, value_name = "DIR")]
        write: Option<PathBuf>,
    },

    /// Normalize a result payload in any historical shape to named files
    Normalize {
        /// Payload file (reads stdin when omitted)
        file: Option<PathBuf>,
    },

    /// Run a producer command and capture the files it generates
    Run {
        /// Prompt delivered to the producer
        #[arg(long, short)]
        prompt: String,

        /// Image attachment path (repeatable; surfaces may ignore them)
        #[arg(long = "image", value_name = "PATH")]
        images: Vec<PathBuf>,

        /// Seconds the producer gets to show any output before the session
        /// completes empty
        #[arg(long, value_name = "SECS", default_value = "10")]
        start_timeout: u64,

        /// Quiet period in milliseconds before output counts as settled
        #[arg(long, value_name = "MS", default_value = "1500")]
        settle: u64,

        /// Busy/snapshot poll interval in milliseconds
        #[arg(long, value_name = "MS", default_value = "400")]
        poll: u64,

        /// Hard bound on the whole session, in seconds
        #[arg(long, value_name = "SECS", default_value = "300")]
        hard_timeout: u64,

        /// Write the captured files under this directory
        #[arg(long, value_name = "DIR")]
        write: Option<PathBuf>,

        /// Producer command line (everything after --)
        #[arg(last = true, required = true, value_name = "COMMAND")]
        producer: Vec<String>,
    },

    /// Manage the heuristics tables
    Tables {
        #[command(subcommand)]
        subcommand: TablesSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Run { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let tables = cli.tables.as_deref();

    let result = match cli.command {
        Commands::Extract { file, write } => {
            cmd::extract::run(tables, file.as_deref(), write.as_deref(), cli.json)
        }
        Commands::Normalize { file } => cmd::normalize::run(tables, file.as_deref()),
        Commands::Run {
            prompt,
            images,
            start_timeout,
            settle,
            poll,
            hard_timeout,
            write,
            producer,
        } => cmd::run::run(
            tables,
            RunArgs {
                prompt,
                images,
                start_timeout,
                settle,
                poll,
                hard_timeout,
                write,
                producer,
            },
            cli.json,
        ),
        Commands::Tables { subcommand } => cmd::tables::run(tables, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
