use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use moodlens_core::{Analysis, Emotion, Pipeline, NO_FACE_MESSAGE};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "moodlens", about = "MoodLens emotion detection CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the dominant emotion in an image file
    Analyze {
        /// Image to analyze (any format the image crate can sniff)
        image: PathBuf,
        /// Directory containing det_10g.onnx and emotion-ferplus-8.onnx
        #[arg(long, env = "MOODLENS_MODEL_DIR")]
        model_dir: Option<PathBuf>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the emotion → genre map
    Genres,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze { image, model_dir, json } => {
            let model_dir = model_dir.unwrap_or_else(moodlens_core::default_model_dir);
            let detector = model_dir.join(moodlens_core::DEFAULT_DETECTOR_MODEL);
            let classifier = model_dir.join(moodlens_core::DEFAULT_CLASSIFIER_MODEL);

            let mut pipeline = Pipeline::load(&detector.to_string_lossy(), &classifier.to_string_lossy())
                .context("failed to load models")?;

            let frame = image::open(&image)
                .with_context(|| format!("failed to open {}", image.display()))?
                .to_rgb8();

            let analysis = pipeline.analyze(&frame)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&analysis_json(&analysis))?);
            } else {
                print_analysis(&analysis);
            }
        }
        Commands::Genres => {
            for (emotion, genre) in Emotion::genre_map() {
                println!("{:<10} {genre}", emotion.as_str());
            }
        }
    }

    Ok(())
}

fn analysis_json(analysis: &Analysis) -> serde_json::Value {
    match analysis {
        Analysis::NoFace => serde_json::json!({ "error": NO_FACE_MESSAGE, "emotion": null }),
        Analysis::Detected { emotion, scores, face } => serde_json::json!({
            "emotion": emotion,
            "genre": emotion.genre_id(),
            "scores": scores,
            "face": face,
        }),
    }
}

fn print_analysis(analysis: &Analysis) {
    match analysis {
        Analysis::NoFace => println!("{NO_FACE_MESSAGE}"),
        Analysis::Detected { emotion, scores, face } => {
            println!("Emotion: {emotion} (face confidence {:.2})", face.confidence);
            match emotion.genre_id() {
                Some(genre) => println!("Genre:   {genre}"),
                None => println!("Genre:   none"),
            }
            for e in Emotion::ALL {
                println!("  {:<10} {:.3}", e.as_str(), scores.get(e));
            }
        }
    }
}
