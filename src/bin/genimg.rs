//! CLI for genimg - Gemini image generation.

use clap::{Args, Parser, Subcommand};
use genimg::image::GenerationClient;
use genimg::processing::{self, CropOutcome};
use genimg::{AspectRatio, Config, GenerationResult, DEFAULT_ENV_FILE};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "genimg")]
#[command(about = "Generate, edit and mix images with Gemini")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    legacy: LegacyArgs,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Key/value file to read the API key from
    #[arg(long, global = true, default_value = DEFAULT_ENV_FILE)]
    env_file: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new image from text
    Generate(GenerateArgs),

    /// Auto-crop transparent borders from images
    Crop(CropArgs),

    /// Edit an existing image
    Edit(EditArgs),

    /// Combine multiple images into a new image
    Mix(MixArgs),
}

/// `genimg PROMPT OUTPUT [--aspect-ratio R]` without a subcommand.
#[derive(Args)]
struct LegacyArgs {
    /// Text description of the image to generate
    prompt: Option<String>,

    /// Output path for the generated image
    output: Option<PathBuf>,

    /// Aspect ratio (1:1, 16:9, 9:16, 4:3, 3:4, etc.)
    #[arg(long, default_value = "1:1")]
    aspect_ratio: AspectRatio,
}

#[derive(Args)]
struct GenerateArgs {
    /// Text description of the image to generate
    prompt: String,

    /// Output path for the generated image
    output: PathBuf,

    /// Aspect ratio (1:1, 16:9, 9:16, 4:3, 3:4, etc.)
    #[arg(short, long, default_value = "1:1")]
    aspect_ratio: AspectRatio,

    /// Model to use
    #[arg(short, long)]
    model: Option<String>,

    /// Generate with transparent background (uses green screen removal)
    #[arg(short, long)]
    transparent: bool,
}

#[derive(Args)]
struct CropArgs {
    /// One or more image paths to crop
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Pixels of transparent padding to keep
    #[arg(short, long, default_value_t = 0)]
    padding: u32,
}

#[derive(Args)]
struct EditArgs {
    /// Text description of the edit to make
    prompt: String,

    /// Input image path
    input: PathBuf,

    /// Output path for the edited image
    output: PathBuf,

    /// Model to use
    #[arg(short, long)]
    model: Option<String>,
}

#[derive(Args)]
struct MixArgs {
    /// Text description of how to combine the images
    prompt: String,

    /// Input image paths (2-14 images)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output path for the combined image
    #[arg(short, long)]
    output: PathBuf,

    /// Aspect ratio (1:1, 16:9, 9:16, 4:3, 3:4, etc.)
    #[arg(short, long, default_value = "1:1")]
    aspect_ratio: AspectRatio,

    /// Model to use
    #[arg(short, long)]
    model: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load_from(&cli.env_file);
    let client = GenerationClient::new(&config);

    let code = match cli.command {
        Some(Commands::Generate(args)) => {
            let result = client
                .generate(
                    &args.prompt,
                    &args.output,
                    args.aspect_ratio,
                    args.model.as_deref(),
                    args.transparent,
                )
                .await;
            report(&result, "Image", cli.json)?
        }
        Some(Commands::Crop(args)) => crop_images(&args, cli.json)?,
        Some(Commands::Edit(args)) => {
            let result = client
                .edit(&args.prompt, &args.input, &args.output, args.model.as_deref())
                .await;
            report(&result, "Edited image", cli.json)?
        }
        Some(Commands::Mix(args)) => {
            let result = client
                .mix(
                    &args.prompt,
                    &args.inputs,
                    &args.output,
                    args.aspect_ratio,
                    args.model.as_deref(),
                )
                .await;
            report(&result, "Mixed image", cli.json)?
        }
        None => {
            let LegacyArgs {
                prompt: Some(prompt),
                output: Some(output),
                aspect_ratio,
            } = cli.legacy
            else {
                use clap::CommandFactory;
                Cli::command().print_help()?;
                return Ok(ExitCode::FAILURE);
            };
            let result = client
                .generate(&prompt, &output, aspect_ratio, None, false)
                .await;
            report(&result, "Image", cli.json)?
        }
    };

    Ok(code)
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "genimg=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn report(result: &GenerationResult, what: &str, json_output: bool) -> anyhow::Result<ExitCode> {
    if json_output {
        println!("{}", serde_json::to_string_pretty(&result.to_json())?);
    } else {
        match result.saved_path() {
            Some(path) => {
                println!("Success! {what} saved to: {}", path.display());
                if let Some(ref post) = result.post_processing {
                    if let Some(ref bg) = post.background {
                        println!("Removed background: {bg}");
                    }
                    if let Some(ref crop) = post.crop {
                        println!("{}", describe_crop(crop, path));
                    }
                    if let Some(ref warning) = post.warning {
                        println!("Warning: {warning}");
                    }
                }
                if let Some(ref text) = result.text_response {
                    println!("Model response: {text}");
                }
            }
            None => {
                if let Some(err) = result.error() {
                    println!("Error: {err}");
                }
                if let Some(ref text) = result.text_response {
                    println!("Model response: {text}");
                }
            }
        }
    }

    Ok(if result.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn crop_images(args: &CropArgs, json_output: bool) -> anyhow::Result<ExitCode> {
    if !processing::is_available() {
        notice(
            json_output,
            "Error: image support not available (built without the `transparency` feature)",
        );
        return Ok(ExitCode::FAILURE);
    }

    let mut cropped = 0;
    let mut rows = Vec::new();
    for path in &args.images {
        if !path.exists() {
            notice(
                json_output,
                &format!("Warning: {} not found, skipping", path.display()),
            );
            rows.push(serde_json::json!({"path": path, "status": "not_found"}));
            continue;
        }
        match processing::auto_crop_file(path, args.padding) {
            Ok(outcome) => {
                if outcome.is_cropped() {
                    cropped += 1;
                }
                if !json_output {
                    println!("{}", describe_crop(&outcome, path));
                }
                rows.push(serde_json::json!({"path": path, "outcome": outcome}));
            }
            Err(e) => {
                notice(
                    json_output,
                    &format!("Warning: could not crop {}: {e}", path.display()),
                );
                rows.push(serde_json::json!({"path": path, "error": e.to_string()}));
            }
        }
    }

    if json_output {
        let summary = serde_json::json!({
            "cropped": cropped,
            "total": args.images.len(),
            "images": rows,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("\nCropped {cropped}/{} images", args.images.len());
    }
    Ok(ExitCode::SUCCESS)
}

/// Prints a human-readable line, keeping stdout clean for `--json`.
fn notice(json_output: bool, line: &str) {
    if json_output {
        eprintln!("{line}");
    } else {
        println!("{line}");
    }
}

fn describe_crop(outcome: &CropOutcome, path: &Path) -> String {
    match outcome {
        CropOutcome::SkippedFullyTransparent => {
            format!("Skipped (fully transparent): {}", path.display())
        }
        CropOutcome::SkippedNoBorder => {
            format!("Skipped (no transparent border): {}", path.display())
        }
        CropOutcome::Cropped(report) => {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            format!("Cropped {name}: {report}")
        }
    }
}
