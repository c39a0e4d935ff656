// ============================================================================
// RedactFE CLI — headless batch redaction via command-line arguments
// ============================================================================
//
// Usage examples:
//   redactfe -i scan.png --pixelate 10,10,200,40 -o scan_clean.png
//   redactfe -i shot.jpg --fill 0,0,300,50 --color "#ff0000"
//   redactfe -i "shots/*.png" --pixelate 0,0,120,30 --block-size 16 --output-dir out/
//
// No GUI is opened in CLI mode. Each file goes through the same EditSession
// as the desktop editor, on the current thread.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use image::Rgb;

use crate::canvas::Region;
use crate::error::{RedactError, Result};
use crate::io::{DEFAULT_JPEG_QUALITY, ExportFormat, write_export};
use crate::ops::redact::{RegionTransform, parse_block_size, parse_hex_color};
use crate::session::EditSession;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// RedactFE headless image redactor.
///
/// Pixelate or black out rectangular regions of image files, no GUI required.
#[derive(Parser, Debug)]
#[command(
    name = "redactfe",
    about = "RedactFE headless batch image redactor",
    long_about = "Pixelate or cover rectangular regions of image files without\n\
                  opening the GUI. Regions are X,Y,WIDTH,HEIGHT in image pixels.\n\n\
                  Example:\n  \
                  redactfe --input photo.png --pixelate 40,40,200,60 --output clean.png\n  \
                  redactfe -i *.jpg --fill 0,0,100,20 --output-dir out/ --format png"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Region to pixelate. May be repeated.
    #[arg(long, value_name = "X,Y,W,H")]
    pub pixelate: Vec<Region>,

    /// Region to cover with a solid color bar. May be repeated.
    /// Applied after all --pixelate regions.
    #[arg(long, value_name = "X,Y,W,H")]
    pub fill: Vec<Region>,

    /// Pixelation block size (minimum 2; non-numeric input means 10).
    #[arg(short, long, default_value = "10", value_name = "N")]
    pub block_size: String,

    /// Color bar color as #rrggbb.
    #[arg(short, long, default_value = "#000000", value_name = "#RRGGBB")]
    pub color: String,

    /// Output file path. Only valid for single-file input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: png, jpg, bmp, tga, tiff.
    /// When omitted, inferred from --output's extension, defaulting to png.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// JPEG quality (1–100).
    #[arg(short, long, default_value_t = DEFAULT_JPEG_QUALITY, value_name = "1-100")]
    pub quality: u8,

    /// Print per-file edits and timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Returns `true` when any CLI-mode flag is present in the real process arguments.
    /// Used by `main()` to route before creating an eframe window.
    pub fn is_cli_mode() -> bool {
        std::env::args().any(|a| a == "--input" || a == "-i" || a.starts_with("--input="))
    }
}

/// The edits to run on every input, in order.
#[derive(Clone, Debug, PartialEq)]
pub struct RedactionPlan {
    pub steps: Vec<(Region, RegionTransform)>,
}

impl RedactionPlan {
    pub fn from_args(args: &CliArgs) -> std::result::Result<Self, String> {
        let block_size = parse_block_size(&args.block_size);
        let color: Rgb<u8> = parse_hex_color(&args.color)
            .ok_or_else(|| format!("invalid color '{}', expected #rrggbb", args.color))?;

        let steps = args
            .pixelate
            .iter()
            .map(|&r| (r, RegionTransform::Pixelate { block_size }))
            .chain(
                args.fill
                    .iter()
                    .map(|&r| (r, RegionTransform::ColorFill { color })),
            )
            .collect();
        Ok(Self { steps })
    }
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let plan = match RedactionPlan::from_args(&args) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if plan.steps.is_empty() {
        log::warn!("no --pixelate or --fill regions given; images are re-encoded unchanged");
    }

    let format = match parse_format(args.format.as_deref(), args.output.as_deref(), args.quality) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!(
            "error: could not create output directory '{}': {}",
            dir.display(),
            e
        );
        return ExitCode::FAILURE;
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }

        let file_start = Instant::now();
        let Some(output_path) =
            build_output_path(input_path, args.output.as_deref(), args.output_dir.as_deref(), format)
        else {
            eprintln!("  error: cannot determine output path for '{}'.", input_path.display());
            any_failure = true;
            continue;
        };

        match run_one(input_path, &output_path, &plan, format) {
            Ok(labels) => {
                if args.verbose {
                    for label in &labels {
                        println!("  {}", label);
                    }
                }
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-file processing pipeline
// ============================================================================

/// Load, apply every step, export. Returns the history labels of the edits.
pub fn run_one(
    input: &Path,
    output: &Path,
    plan: &RedactionPlan,
    format: ExportFormat,
) -> Result<Vec<String>> {
    let mut session = EditSession::default();
    session.load_path(input)?;

    let mut labels = Vec::with_capacity(plan.steps.len());
    for &(region, transform) in &plan.steps {
        match session.apply_transform(region, transform)? {
            Some(label) => labels.push(format!("{} {}", label, region)),
            None => log::warn!(
                "{}: region {} lies outside the image, skipped",
                input.display(),
                region
            ),
        }
    }

    let buffer = session
        .buffer()
        .ok_or_else(|| RedactError::DecodeFailed("no image loaded".to_string()))?;
    write_export(buffer, output, format)?;
    Ok(labels)
}

// ============================================================================
// Helpers
// ============================================================================

/// Every input file named by `patterns`, in command-line order. A pattern
/// that names an existing file is taken literally (so bracketed file names
/// survive); anything else goes through `glob`. Each file appears once.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    patterns
        .iter()
        .flat_map(|pattern| {
            let matches = expand_pattern(pattern);
            if matches.is_empty() {
                log::warn!("'{}' matched no files", pattern);
            }
            matches
        })
        .filter(|path| seen.insert(path.clone()))
        .collect()
}

fn expand_pattern(pattern: &str) -> Vec<PathBuf> {
    let literal = PathBuf::from(pattern);
    if literal.is_file() {
        return vec![literal];
    }
    match glob::glob(pattern) {
        Ok(paths) => paths
            .filter_map(|entry| {
                entry
                    .map_err(|e| log::warn!("skipping unreadable match: {}", e))
                    .ok()
            })
            .filter(|path| path.is_file())
            .collect(),
        Err(e) => {
            log::warn!("'{}' is not a valid glob: {}", pattern, e);
            Vec::new()
        }
    }
}

/// Choose the [`ExportFormat`] from `--format` or infer it from the output
/// file extension. Defaults to PNG when neither is given.
fn parse_format(
    format_arg: Option<&str>,
    output: Option<&Path>,
    quality: u8,
) -> std::result::Result<ExportFormat, String> {
    if let Some(f) = format_arg {
        return ExportFormat::from_name(f, quality)
            .ok_or_else(|| format!("unsupported output format '{}'", f));
    }
    Ok(output
        .and_then(|out| ExportFormat::from_path(out, quality))
        .unwrap_or_default())
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path, used for single-file input)
/// 2. `--output-dir` (batch directory, `<stem>.<ext>`)
/// 3. Fallback: next to the input as `<stem>_redacted.<ext>`
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    format: ExportFormat,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let ext = format.extension();
    let stem = input.file_stem()?.to_string_lossy().into_owned();

    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.{}", stem, ext)));
    }

    let parent = input.parent().unwrap_or(Path::new("."));
    Some(parent.join(format!("{}_redacted.{}", stem, ext)))
}
