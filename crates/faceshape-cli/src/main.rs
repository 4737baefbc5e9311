use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use faceshape_core::{analyze, FaceAnalysis, PriorityRules};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod calibrate;
mod config;
mod input;

#[derive(Parser)]
#[command(name = "faceshape", version, about = "Geometric face-shape classifier")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify landmarks from a JSON file (point array or annotate response)
    Classify {
        file: PathBuf,
        /// Print single-line JSON
        #[arg(long)]
        compact: bool,
    },
    /// Detect a face in an image with the Vision API and classify it
    Detect {
        image: PathBuf,
        /// Print single-line JSON
        #[arg(long)]
        compact: bool,
    },
    /// Print the rule table in evaluation order
    Rules,
    /// Measure accuracy against a labelled set and check for regressions
    Calibrate(calibrate::CalibrateArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Classify { file, compact } => {
            let points = input::read_landmarks(&file)?;
            print_analysis(&analyze(&points), compact)?;
        }
        Commands::Detect { image, compact } => {
            let config = config::Config::from_env();
            let analysis = detect(&config, &image).await?;
            print_analysis(&analysis, compact)?;
        }
        Commands::Rules => {
            for rule in PriorityRules::calibrated().rules() {
                println!(
                    "{:>2}  {:<7} {:.2}  {}  [{}]",
                    rule.id,
                    rule.shape,
                    rule.confidence,
                    rule.condition,
                    rule.shape.label()
                );
            }
        }
        Commands::Calibrate(args) => {
            let config = config::Config::from_env();
            calibrate::run(args, &config).await?;
        }
    }

    Ok(())
}

async fn detect(config: &config::Config, image: &Path) -> Result<FaceAnalysis> {
    let bytes =
        std::fs::read(image).with_context(|| format!("failed to read {}", image.display()))?;
    let client = config.vision_client()?;
    let credential = config.credential()?;

    let points = client
        .detect_landmarks(&credential, &bytes)
        .await?
        .with_context(|| format!("no face detected in {}", image.display()))?;
    tracing::info!(landmarks = points.len(), "face detected");
    Ok(analyze(&points))
}

fn print_analysis(analysis: &FaceAnalysis, compact: bool) -> Result<()> {
    if let Some(error) = &analysis.error {
        tracing::warn!(error = %error, "classification fell back to default");
    }
    let json = if compact {
        serde_json::to_string(analysis)?
    } else {
        serde_json::to_string_pretty(analysis)?
    };
    println!("{json}");
    Ok(())
}
