//! Crema CLI
//!
//! Estimates a coffee shop's rating from its attributes using the shop corpus.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use crema_ai_trainer::{inspect_corpus, load_corpus, CremaConfig, Pipeline, StdScale};
use crema_ai_core::ShopRecord;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "crema")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Gaussian-process rating estimator for coffee shops", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Corpus directory of shop documents (overrides configuration)
    #[arg(long, global = true)]
    corpus: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Predict the rating of an unseen shop
    Predict(PredictArgs),
    /// Show the encoded layout and split of the corpus
    Inspect,
}

#[derive(Args, Debug)]
struct PredictArgs {
    #[arg(long)]
    price: String,

    #[arg(long)]
    roast_level: String,

    #[arg(long)]
    espresso: String,

    #[arg(long)]
    sweetness: String,

    #[arg(long)]
    strength: String,

    #[arg(long)]
    house_syrups: String,

    #[arg(long)]
    specialty_drinks: String,

    #[arg(long)]
    espresso_variety: String,

    #[arg(long)]
    mixed: String,

    #[arg(long)]
    edible_decor: String,

    /// Units of the reported standard deviation (standardized|rating)
    #[arg(long)]
    std_scale: Option<StdScale>,
}

impl PredictArgs {
    fn to_query(&self) -> ShopRecord {
        ShopRecord::query([
            ("price", &self.price),
            ("roast level", &self.roast_level),
            ("espresso", &self.espresso),
            ("sweetness", &self.sweetness),
            ("strength", &self.strength),
            ("house syrups", &self.house_syrups),
            ("specialty drinks", &self.specialty_drinks),
            ("espresso variety", &self.espresso_variety),
            ("mixed", &self.mixed),
            ("edible decor", &self.edible_decor),
        ])
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let mut config = CremaConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(corpus) = cli.corpus {
        config.corpus_dir = corpus;
    }

    info!("Crema rating estimator v{}", env!("CARGO_PKG_VERSION"));
    info!("Corpus: {}", config.corpus_dir.display());

    match cli.command {
        Command::Predict(args) => {
            if let Some(scale) = args.std_scale {
                config.std_scale = scale;
            }
            info!(
                "Training: {} iterations at lr {}, std reported in {} units",
                config.training.iterations, config.training.learning_rate, config.std_scale
            );

            let query = args.to_query();
            let mut pipeline = Pipeline::new(config);
            let prediction = pipeline.predict(&query).context("Prediction failed")?;

            println!("{}", serde_json::to_string_pretty(&prediction)?);
        }
        Command::Inspect => {
            let records = load_corpus(&config.corpus_dir).context("Failed to load corpus")?;
            let inspection = inspect_corpus(&records, &config).context("Failed to inspect corpus")?;
            println!("{}", serde_json::to_string_pretty(&inspection)?);
        }
    }

    Ok(())
}
