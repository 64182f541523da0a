mod extract;
mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tanka_core::Measure;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "tanka")]
#[command(about = "Marketplace listing acquisition and unit-price ranking")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scrape, normalize, score and rank configured categories
    Run {
        /// Restrict the run to one category (by slug)
        #[arg(long)]
        category: Option<String>,

        /// Write the JSON report here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print the categories that would run without touching the marketplace
        #[arg(long)]
        dry_run: bool,
    },
    /// List configured categories
    Categories,
    /// Print the attributes extracted from a product title
    Extract {
        title: String,

        #[arg(long)]
        description: Option<String>,

        /// Category measure; enables the LLM pass when one is configured
        #[arg(long, value_parser = parse_measure)]
        measure: Option<Measure>,
    },
}

fn parse_measure(value: &str) -> Result<Measure, String> {
    match value.to_ascii_lowercase().as_str() {
        "length" => Ok(Measure::Length),
        "volume" => Ok(Measure::Volume),
        "weight" => Ok(Measure::Weight),
        "count" => Ok(Measure::Count),
        other => Err(format!(
            "unknown measure '{other}' (expected length, volume, weight or count)"
        )),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = tanka_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    // stdout carries the JSON report
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Run {
            category,
            output,
            dry_run,
        }) => run::run(&config, category.as_deref(), output.as_deref(), dry_run).await,
        Some(Commands::Categories) => run::list_categories(&config),
        Some(Commands::Extract {
            title,
            description,
            measure,
        }) => extract::extract(&config, &title, description.as_deref(), measure).await,
        None => {
            println!("tanka: use --help to list commands");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests;
