mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "algoforge-cli")]
#[command(about = "AlgoForge CLI - Run submissions locally and manage language settings", long_about = None)]
struct Cli {
    /// Language settings file
    #[arg(long, global = true, default_value = algoforge_common::config::DEFAULT_LANGUAGES_CONFIG)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile and run a source file with the same pipeline as the API
    Run {
        /// Source file to execute
        file: PathBuf,

        /// Language name (inferred from the file extension when omitted)
        #[arg(short, long)]
        language: Option<String>,

        /// File whose contents become the program's stdin
        #[arg(short, long, conflicts_with = "stdin")]
        input: Option<PathBuf>,

        /// Literal text to feed on stdin
        #[arg(long)]
        stdin: Option<String>,

        /// Scratch storage root for materialized files
        #[arg(long, default_value = algoforge_common::config::DEFAULT_STORAGE_ROOT)]
        storage_root: PathBuf,
    },

    /// Show the resolved toolchain settings for every language
    Languages,

    /// Write the default language settings file
    Init {
        /// Overwrite an existing file
        #[arg(long, default_value = "false")]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            language,
            input,
            stdin,
            storage_root,
        } => {
            let succeeded = commands::run_file(
                &cli.config,
                &file,
                language.as_deref(),
                input.as_deref(),
                stdin,
                &storage_root,
            )
            .await?;
            if !succeeded {
                std::process::exit(1);
            }
        }
        Commands::Languages => {
            commands::list_languages(&cli.config)?;
        }
        Commands::Init { force } => {
            commands::init_config(&cli.config, force)?;
        }
    }

    Ok(())
}
