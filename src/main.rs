// src/main.rs

use anyhow::Result;
use clap::{Parser, Subcommand};
use toolstrap::install::{Installer, DEFAULT_INDEX_NAME, DEFAULT_REPO_URL};
use toolstrap::repository::HttpFetcher;
use tracing::info;

#[derive(Parser)]
#[command(name = "toolstrap")]
#[command(author, version, about = "Bootstrap a minimal POSIX toolchain from a binary package repository", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, verify, and unpack the toolchain closure into a directory
    Install {
        /// Destination root directory
        dest: String,
        /// Root packages to install (built-in default set if omitted)
        packages: Vec<String>,
        /// Repository base URL
        #[arg(long, default_value = DEFAULT_REPO_URL)]
        repo_url: String,
        /// Package index artifact name within the repository
        #[arg(long, default_value = DEFAULT_INDEX_NAME)]
        index: String,
    },
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Install {
            dest,
            packages,
            repo_url,
            index,
        } => {
            info!("Installing toolchain into: {}", dest);

            let installer = Installer::new(HttpFetcher::new()?, &dest)
                .repo_url(repo_url)
                .index_name(index)
                .roots(packages);

            let summary = installer.install()?;
            println!(
                "Installed {} packages ({} already up to date) into {}",
                summary.installed, summary.up_to_date, dest
            );
            Ok(())
        }
    }
}
