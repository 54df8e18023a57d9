//! vitrine CLI - resolve storefront gallery media from the terminal
//!
//! Entry point: parse arguments, set up logging, load configuration, then hand
//! off to the command modules.

use anyhow::{Context, Result};
use clap::Parser;
use vitrine_core::Config;

mod cli;
mod commands;
mod logging;
mod output;

use cli::{CacheCommands, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::initialize_logging(&cli)?;

    let config = load_config(&cli)?;
    execute_command(cli, &config).await
}

/// Explicit `--config` file, else the platform default; `--data-dir` wins over
/// whatever the file says.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load()?,
    };
    if let Some(dir) = &cli.data_dir {
        config.paths.data_dir.clone_from(dir);
    }
    Ok(config)
}

async fn execute_command(cli: Cli, config: &Config) -> Result<()> {
    let format = cli.output_format();
    match cli.command {
        Commands::Resolve {
            base_url,
            urls,
            kind,
            priority,
            report,
            network,
        } => {
            commands::resolve::execute(
                config,
                &base_url,
                &urls,
                kind.into(),
                priority,
                network.connection_info(),
                report,
                format,
            )
            .await
        },
        Commands::Candidates { path, kind } => {
            commands::candidates::execute(config, &path, kind.into(), format)
        },
        Commands::Profile { network } => {
            commands::profile::execute(config, network.connection_info(), format)
        },
        Commands::Gallery {
            catalog,
            category,
            search,
            eager,
            base_url,
            contact,
            network,
        } => {
            let filter = vitrine_core::CatalogFilter::new(&category, &search);
            commands::gallery::execute(
                config,
                &catalog,
                &filter,
                eager,
                base_url.as_deref(),
                contact.as_deref(),
                network.connection_info(),
                format,
            )
            .await
        },
        Commands::Carousel {
            count,
            current,
            radius,
        } => commands::gallery::carousel(count, current, radius, format),
        Commands::Cache { command } => match command {
            CacheCommands::Stats => commands::cache::stats(config, format),
            CacheCommands::Clear => commands::cache::clear(config, format),
        },
    }
}
