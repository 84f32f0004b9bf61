use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::Utc;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use tracing::{error, info};

use cplanet::config::Config;
use cplanet::feeds::Fetcher;
use cplanet::models::Planet;
use cplanet::tracing::setup_tracing;
use cplanet::{error_chain, planet, render, Error};

/// CPlanet - merges RSS and Atom feeds into a single planet.
#[derive(Debug, Parser)]
#[command(name = "cplanet")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the planet configuration.
    #[arg(
        short,
        long,
        global = true,
        env = "CPLANET_CONFIG",
        default_value = "cplanet.toml"
    )]
    config: PathBuf,

    /// Log to syslog instead of stderr.
    #[arg(short = 'l', long, global = true)]
    syslog: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
enum Commands {
    /// Fetch every feed and write the configured outputs (default).
    Generate,

    /// Fetch every feed and print the merged planet as JSON.
    Dump,
}

async fn build_planet(config: &Config) -> Result<Planet, Error> {
    let fetcher = Fetcher::new(&config.http)?;
    Ok(planet::aggregate(config, &fetcher, Utc::now()).await)
}

async fn generate(config_path: &Path) -> Result<(), Error> {
    let config = Config::load(config_path)?;
    let planet = build_planet(&config).await?;
    let written = render::write_outputs(&planet, &config)?;

    info!(outputs = written.len(), posts = planet.posts.len(), "Done");
    Ok(())
}

async fn dump(config_path: &Path) -> Result<(), Error> {
    let config = Config::load(config_path)?;
    let planet = build_planet(&config).await?;

    serde_json::to_writer_pretty(std::io::stdout().lock(), &planet)?;
    println!();
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(cli.syslog) {
        eprintln!("Couldn't set up logging: {}", e);
        return ExitCode::FAILURE;
    }

    let result = match cli.command.unwrap_or(Commands::Generate) {
        Commands::Generate => generate(&cli.config).await,
        Commands::Dump => dump(&cli.config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", error_chain(&e));
            ExitCode::FAILURE
        }
    }
}
