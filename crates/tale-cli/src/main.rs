//! CLI frontend for the tale story engine.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tale",
    about = "tale: play and inspect streamed interactive stories",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract segments from a markup file
    Parse {
        /// Markup file, or a wire transcript with --wire
        file: PathBuf,

        /// Read the file as newline-delimited JSON frames
        #[arg(short, long)]
        wire: bool,

        /// Print segments as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Report malformed markup in a file
    Check {
        /// Markup file
        file: PathBuf,
    },

    /// Print the wire frames a transport would emit for a markup file
    Frames {
        /// Markup file
        file: PathBuf,

        /// Send everything in one frame
        #[arg(short, long)]
        fast: bool,

        /// RNG seed for chunk boundaries
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Choice for the terminal frame, as ID=TEXT (repeatable)
        #[arg(short, long = "choice", value_name = "ID=TEXT")]
        choices: Vec<String>,
    },

    /// Play a scripted story interactively
    Play {
        /// Story script (TOML with [[scene]] tables)
        script: PathBuf,

        /// Engine configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Reveal segments instantly and deliver rounds in one frame
        #[arg(short, long)]
        fast: bool,

        /// Opening line sent to the generator
        #[arg(long, default_value = "begin")]
        opening: String,

        /// Write the session history as JSON when the session ends
        #[arg(short, long)]
        transcript: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse { file, wire, json } => commands::parse::run(&file, wire, json),
        Commands::Check { file } => commands::check::run(&file),
        Commands::Frames {
            file,
            fast,
            seed,
            choices,
        } => commands::frames::run(&file, fast, seed, &choices),
        Commands::Play {
            script,
            config,
            fast,
            opening,
            transcript,
        } => commands::play::run(
            &script,
            config.as_deref(),
            fast,
            &opening,
            transcript.as_deref(),
        ),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
