//! Food Healthiness Scorer CLI
//!
//! A command-line tool for scoring products by barcode or by manually
//! entered nutrition values, browsing healthier alternatives, and checking
//! the scoring service.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{alternatives, score, status};

/// Food Healthiness Scorer CLI
#[derive(Parser)]
#[command(name = "fhs")]
#[command(author, version, about = "CLI for the Food Healthiness Scorer", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via FHS_API_URL env var)
    #[arg(long, env = "FHS_API_URL")]
    pub api_url: Option<String>,

    /// Output format [default: table]
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Predict the health label and NutriScore of a product
    #[command(subcommand)]
    Score(ScoreCommands),

    /// Suggest products from the dataset with a given health label
    Alternatives {
        /// Health label to sample (service default: Healthy)
        #[arg(long, short)]
        label: Option<String>,

        /// Number of products to suggest (service default: 3)
        #[arg(long, short)]
        count: Option<usize>,
    },

    /// Show health and readiness of the scoring service
    Status,
}

#[derive(Subcommand)]
pub enum ScoreCommands {
    /// Look up a product on OpenFoodFacts by barcode
    Barcode {
        /// Product barcode (digits only)
        #[arg(value_parser = score::parse_barcode)]
        barcode: String,
    },

    /// Score manually entered nutrition values
    Manual(score::ManualArgs),
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::Config::load()?;
    let format = config.resolve_format(cli.format);
    let client = client::ApiClient::new(&config.resolve_api_url(cli.api_url))?;

    match cli.command {
        Commands::Score(score_cmd) => match score_cmd {
            ScoreCommands::Barcode { barcode } => {
                score::score_barcode(&client, &barcode, format).await?;
            }
            ScoreCommands::Manual(args) => {
                score::score_manual(&client, args, format).await?;
            }
        },
        Commands::Alternatives { label, count } => {
            alternatives::list_alternatives(&client, label, count, format).await?;
        }
        Commands::Status => {
            status::show_status(&client, format).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
