// ============================================================================
// CoDraw CLI: one sketch-to-image round trip without opening a window
// ============================================================================
//
// Usage examples:
//   codraw --input sketch.png --prompt "add a hat" --output hat.png
//   codraw -i sketch.jpg -p "make it night" -o night.png --model gemini-2.0-flash-preview-image-generation
//
// The input is fitted onto a white canvas of the configured size, exactly
// as if it had been drawn in the GUI, then sent with the usual style suffix.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;

use crate::ops::ai::{self, GeminiClient, GenerationRequest};
use crate::settings::AppSettings;

/// CoDraw headless generator.
#[derive(Parser, Debug)]
#[command(
    name = "codraw",
    about = "Send a sketch and an instruction to a Gemini image model",
    long_about = "Load a sketch, send it with a text instruction to a Gemini image\n\
                  model and write the returned image, without opening the GUI.\n\n\
                  Example:\n  \
                  codraw --input sketch.png --prompt \"add a hat\" --output hat.png"
)]
pub struct CliArgs {
    /// Sketch to send (PNG, JPEG or WEBP).
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Instruction for the model.
    #[arg(short, long)]
    pub prompt: String,

    /// Where to write the generated image (PNG).
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Model id. Defaults to the one in the settings file.
    #[arg(short, long)]
    pub model: Option<String>,

    /// API key. Defaults to GEMINI_API_KEY / API_KEY / the settings file.
    #[arg(long, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Print request timing and any text the model sent back.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// `main()` routes here before any window is created.
    pub fn is_cli_mode() -> bool {
        std::env::args().any(|a| a == "--input" || a == "-i")
    }
}

/// `0` on success, `1` on any failure.
pub fn run(args: CliArgs) -> ExitCode {
    let settings = AppSettings::load();
    match run_with(&args, &settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            if let Some(path) = crate::logger::log_path() {
                eprintln!("details: {}", path.display());
            }
            ExitCode::FAILURE
        }
    }
}

fn run_with(args: &CliArgs, settings: &AppSettings) -> Result<(), String> {
    let request = build_request(args, settings)?;

    let key = args
        .api_key
        .clone()
        .or_else(|| settings.resolved_api_key())
        .ok_or_else(|| ai::GenerateError::MissingApiKey.to_string())?;
    let client = GeminiClient::new(
        &settings.api_base_url,
        key,
        Duration::from_secs(settings.request_timeout_secs),
    )
    .map_err(|e| ai::parse_error(&e.to_string()))?;

    if args.verbose {
        println!("→ {} ({})", client.endpoint(&request.model), request.instruction());
    }
    let started = Instant::now();
    let outcome = client
        .generate(&request)
        .map_err(|e| ai::parse_error(&e.to_string()))?;

    let image = crate::io::decode_image(&outcome.image).map_err(|e| format!("decode failed: {}", e))?;
    crate::io::save_png(&image, &args.output).map_err(|e| format!("save failed: {}", e))?;
    log_info!("CLI wrote {}", args.output.display());

    if args.verbose {
        println!("  {} bytes of {}", outcome.image.len(), outcome.mime_type);
        if let Some(text) = &outcome.text {
            println!("  model: {}", text);
        }
        println!(
            "  → {} ({:.1}s)",
            args.output.display(),
            started.elapsed().as_secs_f64()
        );
    }
    Ok(())
}

/// Load the sketch onto a canvas-sized white page and wrap it in a request.
fn build_request(args: &CliArgs, settings: &AppSettings) -> Result<GenerationRequest, String> {
    let prompt = args.prompt.trim();
    if prompt.is_empty() {
        return Err("--prompt must not be empty".to_string());
    }
    let sketch = crate::io::load_image(&args.input)
        .map_err(|e| format!("could not load '{}': {}", args.input.display(), e))?;
    let page = crate::io::fit_onto_white(&sketch, settings.canvas_width, settings.canvas_height);
    let image_png = crate::io::encode_png(&page).map_err(|e| format!("encode failed: {}", e))?;

    Ok(GenerationRequest {
        model: args.model.clone().unwrap_or_else(|| settings.model.clone()),
        prompt: prompt.to_string(),
        prompt_suffix: settings.prompt_suffix.clone(),
        image_png,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn args(input: PathBuf, prompt: &str) -> CliArgs {
        CliArgs::parse_from([
            "codraw",
            "--input",
            input.to_str().unwrap(),
            "--prompt",
            prompt,
            "--output",
            "out.png",
        ])
    }

    #[test]
    fn flags_parse() {
        let a = CliArgs::parse_from([
            "codraw", "-i", "in.png", "-p", "add a hat", "-o", "out.png", "-m", "m1", "--api-key", "k", "-v",
        ]);
        assert_eq!(a.input, PathBuf::from("in.png"));
        assert_eq!(a.prompt, "add a hat");
        assert_eq!(a.output, PathBuf::from("out.png"));
        assert_eq!(a.model.as_deref(), Some("m1"));
        assert_eq!(a.api_key.as_deref(), Some("k"));
        assert!(a.verbose);
    }

    #[test]
    fn prompt_and_output_are_required() {
        assert!(CliArgs::try_parse_from(["codraw", "-i", "in.png"]).is_err());
        assert!(CliArgs::try_parse_from(["codraw", "-i", "in.png", "-p", "x"]).is_err());
    }

    #[test]
    fn sketch_is_fitted_to_the_canvas_size() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("sketch.png");
        RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255])).save(&input).unwrap();

        let settings = AppSettings {
            canvas_width: 40,
            canvas_height: 20,
            ..AppSettings::default()
        };
        let request = build_request(&args(input, "  add a hat "), &settings).unwrap();
        assert_eq!(request.prompt, "add a hat");
        assert_eq!(request.model, settings.model);
        let sent = crate::io::decode_image(&request.image_png).unwrap();
        assert_eq!(sent.dimensions(), (40, 20));
    }

    #[test]
    fn blank_prompt_or_missing_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let settings = AppSettings::default();
        assert!(build_request(&args(dir.path().join("missing.png"), "x"), &settings).is_err());

        let input = dir.path().join("sketch.png");
        RgbaImage::new(2, 2).save(&input).unwrap();
        assert!(build_request(&args(input, "   "), &settings).is_err());
    }
}
