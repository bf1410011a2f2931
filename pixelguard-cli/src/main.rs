//! PixelGuard CLI - invisible watermarking and adversarial image protection.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

mod commands;
mod config;
mod exit_codes;
mod utils;

use config::Config;
use exit_codes::ExitCode;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Success
  1   General error
  2   Unparseable command line
  64  Invalid argument (strength, epsilon, identifier)
  65  Data error (capacity exceeded, no watermark found, already watermarked)
  66  Input file or record not found
  70  Classifier failure
  74  I/O error writing output";

#[derive(Parser)]
#[command(name = "pixelguard")]
#[command(author, version, about = "Invisible watermarking and adversarial image protection", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    /// Suppress decorative output (results and errors still printed)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed an invisible ownership watermark
    Embed {
        /// Image to watermark
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Owner identifier written into the image
        #[arg(short, long)]
        owner: String,

        /// Output PNG path (defaults to <FILE>_watermarked.png)
        #[arg(short = 'O', long)]
        output: Option<PathBuf>,

        /// Number of payload repetitions, 1-10 (default: PIXELGUARD_STRENGTH or 5)
        #[arg(short, long)]
        strength: Option<u32>,

        /// Watermark even if the image already carries one
        #[arg(long)]
        force: bool,
    },

    /// Extract the raw watermark text from an image
    Extract {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Verify ownership and tamper status of an image
    Verify {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Check whether an image already carries a watermark
    Detect {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Look up a stored watermark record by id
    Lookup {
        #[arg(value_name = "WATERMARK_ID")]
        watermark_id: String,
    },

    /// Apply an adversarial perturbation against image recognition
    Protect {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output PNG path (defaults to <FILE>_protected.png)
        #[arg(short = 'O', long)]
        output: Option<PathBuf>,

        /// Perturbation strength: <= 1 is used as-is, > 1 is a 0-100 scale
        #[arg(short, long)]
        epsilon: Option<f32>,
    },

    /// Re-encode an image as PNG without any metadata
    Strip {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output PNG path (defaults to <FILE>_clean.png)
        #[arg(short = 'O', long)]
        output: Option<PathBuf>,
    },

    /// Manage classifier model files
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Write a seeded reference classifier to a CBOR file
    Init {
        /// Output model path
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Classifier input resolution
        #[arg(long, default_value_t = pixelguard_core::adversarial::DEFAULT_INPUT_SIZE)]
        input_size: usize,

        /// Number of classes
        #[arg(long, default_value_t = pixelguard_core::adversarial::DEFAULT_NUM_CLASSES)]
        num_classes: usize,

        /// Weight seed
        #[arg(long, default_value_t = pixelguard_core::adversarial::DEFAULT_SEED)]
        seed: u64,
    },
}

/// Shared output settings passed to every command.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub quiet: bool,
    pub json: bool,
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env();
    let out = Output {
        quiet: cli.quiet,
        json: cli.json,
    };

    match cli.command {
        Commands::Embed {
            file,
            owner,
            output,
            strength,
            force,
        } => {
            let strength = strength.unwrap_or(u32::from(config.strength));
            commands::embed::execute(&config, file, owner, output, strength, force, out)
        }
        Commands::Extract { file } => commands::extract::execute(file, out),
        Commands::Verify { file } => commands::verify::execute(&config, file, out),
        Commands::Detect { file } => commands::detect::execute(&config, file, out),
        Commands::Lookup { watermark_id } => {
            commands::lookup::execute(&config, watermark_id, out)
        }
        Commands::Protect {
            file,
            output,
            epsilon,
        } => {
            let epsilon = epsilon.unwrap_or(config.epsilon);
            commands::protect::execute(&config, file, output, epsilon, out)
        }
        Commands::Strip { file, output } => commands::strip::execute(file, output, out),
        Commands::Model { action } => match action {
            ModelAction::Init {
                output,
                input_size,
                num_classes,
                seed,
            } => commands::model::init(output, input_size, num_classes, seed, out),
        },
    }
}

fn main() {
    let cli = Cli::parse();
    utils::init_tracing(cli.verbose);

    let exit = match run(cli) {
        Ok(()) => ExitCode::success(),
        Err(err) => ExitCode::from_anyhow(&err),
    };

    if let Some(message) = &exit.message {
        eprintln!("{} {}", "Error:".red().bold(), message);
    }
    std::process::exit(exit.code);
}
