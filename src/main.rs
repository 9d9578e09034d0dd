use anyhow::{Context, Result};
use clap::Parser;
use stable_image_studio::app::App;
use stable_image_studio::models::{AspectRatio, Config};
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "stable-image-studio")]
#[command(about = "Generate images from text prompts with Stability AI")]
struct CliArgs {
    /// Prompt to generate once. Omit to start an interactive session.
    #[arg(value_name = "PROMPT")]
    prompt: Option<String>,

    /// Aspect ratio token: 1:1, 16:9, 9:16, 4:5, 5:4, 3:2, 2:3, 9:21 or 21:9.
    #[arg(short, long, default_value = "1:1")]
    aspect_ratio: String,

    /// Directory for saved images (overrides OUTPUT_DIR).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Model path segment, e.g. `core` (overrides STABILITY_MODEL).
    #[arg(short, long)]
    model: Option<String>,
}

impl CliArgs {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
    }
}

async fn run_once(app: &mut App, prompt: &str, aspect_ratio: AspectRatio) -> Result<()> {
    let preview = app.submit(prompt, aspect_ratio).await?;
    let result = app
        .generator()
        .history()
        .last()
        .context("generation finished without a recorded result")?;

    match &preview.latest {
        Some(path) => info!("Image saved to {}", path.display()),
        None => info!("No image saved (status {})", result.status()),
    }
    println!("{}", result.to_json()?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stable_image_studio=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    args.apply_overrides(&mut config);

    let mut app = match App::new(&config) {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    let aspect_ratio = AspectRatio::from(args.aspect_ratio.as_str());
    let outcome = match args.prompt.as_deref() {
        Some(prompt) => run_once(&mut app, prompt, aspect_ratio).await,
        None => {
            info!("Interactive session started; type a prompt, /ratios, /ratio <token>, /history or /quit");
            app.run_interactive(
                BufReader::new(tokio::io::stdin()),
                tokio::io::stdout(),
                aspect_ratio,
            )
            .await
            .map_err(anyhow::Error::from)
        }
    };

    if let Err(e) = outcome {
        error!("Generation failed: {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}
