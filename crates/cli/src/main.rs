//! Atelier CLI - Database migrations and catalogue tools.
//!
//! # Usage
//!
//! ```bash
//! # Run shop database migrations
//! atelier-cli migrate
//!
//! # Upsert artworks from a YAML catalogue
//! atelier-cli seed artworks --file catalogue.yaml
//!
//! # Same, deleting unordered artworks missing from the file
//! atelier-cli seed artworks --file catalogue.yaml --replace
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "atelier-cli")]
#[command(author, version, about = "Atelier CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Upsert artworks by slug from a YAML catalogue
    Artworks {
        /// Path to the YAML catalogue
        #[arg(short, long)]
        file: String,

        /// Delete artworks not in the file (ordered artworks are kept)
        #[arg(long)]
        replace: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Artworks { file, replace } => {
                commands::seed::artworks(&file, replace).await?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_seed_artworks() {
        let cli = Cli::try_parse_from([
            "atelier-cli",
            "seed",
            "artworks",
            "--file",
            "catalogue.yaml",
            "--replace",
        ])
        .unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(
            cli.command,
            Commands::Seed {
                target: SeedTarget::Artworks { ref file, replace: true }
            } if file == "catalogue.yaml"
        ));
    }

    #[test]
    fn test_seed_requires_file() {
        assert!(Cli::try_parse_from(["atelier-cli", "seed", "artworks"]).is_err());
    }
}
