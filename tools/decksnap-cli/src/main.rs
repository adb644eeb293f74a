//! Decksnap CLI: export deck images and work with their embedded metadata.
//!
//! Usage:
//!   decksnap export <REQUEST> --descriptor <FILE> --thumbnails <DIR>
//!   decksnap extract <IMAGE>     Print the embedded deck descriptor
//!   decksnap embed <IMAGE> --descriptor <FILE> -o <OUT>
//!   decksnap inspect <IMAGE>     Show the PNG chunk table
//!   decksnap config [--init]     Show or create the config file

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use decksnap_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "decksnap",
    about = "Deck image exporter with self-describing PNG metadata",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a deck export request to a PNG
    Export {
        /// Path to the export request (JSON)
        request: PathBuf,

        /// Deck descriptor to embed (JSON)
        #[arg(short, long)]
        descriptor: PathBuf,

        /// Directory holding card thumbnails named by source id
        #[arg(short, long)]
        thumbnails: PathBuf,

        /// Output file path
        #[arg(short, long, default_value = "deck.png")]
        output: PathBuf,

        /// Footer date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        date: Option<String>,

        /// Override the request's scale factor
        #[arg(long)]
        scale: Option<f64>,

        /// Override the request's color variant
        #[arg(long)]
        variant: Option<String>,

        /// QR error-correction level: L, M, Q, H
        #[arg(long)]
        qr_level: Option<String>,
    },

    /// Print the deck descriptor embedded in an image
    Extract {
        /// Path to the image
        image: PathBuf,
    },

    /// Embed a deck descriptor into an existing PNG
    Embed {
        /// Path to the source PNG
        image: PathBuf,

        /// Deck descriptor to embed (JSON)
        #[arg(short, long)]
        descriptor: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show the chunk table of a PNG
    Inspect {
        /// Path to the image
        image: PathBuf,
    },

    /// Show the active configuration
    Config {
        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load();

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    decksnap_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Export {
            request,
            descriptor,
            thumbnails,
            output,
            date,
            scale,
            variant,
            qr_level,
        } => {
            let args = commands::export::ExportArgs {
                request,
                descriptor,
                thumbnails,
                output,
                date,
                scale,
                variant,
                qr_level,
            };
            commands::export::run(args, &config).await
        }
        Commands::Extract { image } => commands::extract::run(image),
        Commands::Embed {
            image,
            descriptor,
            output,
        } => commands::embed::run(image, descriptor, output),
        Commands::Inspect { image } => commands::inspect::run(image),
        Commands::Config { init } => commands::config::run(&config, init),
    }
}
