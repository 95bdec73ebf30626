//! Prelabel: detector-assisted bounding box annotation.
//!
//! Prelabel runs a zero-shot object detector over images to produce candidate
//! boxes, lets them be corrected through an index-addressed editor, and
//! exports the result as COCO JSON or PASCAL VOC XML.
//!
//! # Modules
//!
//! - [`ir`]: annotation records, the ordered [`ir::AnnotationSet`] and the codecs
//! - [`editor`]: the per-image [`editor::AnnotationEditor`] and textual edit commands
//! - [`session`]: writes an editor's slice back into the set
//! - [`detection`]: the detector contract and its output adapter
//! - [`batch`]: image discovery and the batch annotation loop
//! - [`conversion`]: format dispatch and lossiness reports
//! - [`render`]: box overlays
//! - [`error`]: error types for prelabel operations

pub mod batch;
pub mod conversion;
pub mod detection;
pub mod editor;
pub mod error;
pub mod ir;
pub mod render;
pub mod session;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use conversion::AnnotationFormat;
use detection::{CommandDetector, DetectionRequest};
use editor::EditOp;
use ir::{io_coco_json, read_image_dimensions, AnnotationSet};
use render::LabelPalette;
use session::AnnotationSession;

pub use error::PrelabelError;

/// The prelabel CLI application.
#[derive(Parser)]
#[command(name = "prelabel")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Pre-annotate images with a zero-shot detector.
    Annotate(AnnotateArgs),
    /// Convert annotations between formats.
    Convert(ConvertArgs),
    /// Draw annotations onto an image.
    Visualize(VisualizeArgs),
    /// Apply edit commands to one image's annotations.
    Edit(EditArgs),
}

#[derive(clap::Args)]
struct AnnotateArgs {
    /// Input image or directory of images.
    #[arg(long)]
    input: PathBuf,

    /// Output directory for annotations.
    #[arg(long)]
    output: PathBuf,

    /// Comma-separated text prompt for detection.
    #[arg(long, default_value = detection::DEFAULT_PROMPT)]
    prompt: String,

    /// Box confidence threshold, strictly between 0 and 1.
    #[arg(long, default_value_t = detection::DEFAULT_BOX_THRESHOLD)]
    box_threshold: f64,

    /// Text confidence threshold, strictly between 0 and 1.
    #[arg(long, default_value_t = detection::DEFAULT_TEXT_THRESHOLD)]
    text_threshold: f64,

    /// Output format ('coco' or 'pascal-voc').
    #[arg(long, default_value = "coco")]
    format: String,

    /// Also write box overlays to <output>/visualizations.
    #[arg(long)]
    visualize: bool,

    /// Detector program; receives --image, --prompt, --box-threshold and
    /// --text-threshold and prints detections as JSON.
    #[arg(long, env = "PRELABEL_DETECTOR")]
    detector: String,

    /// Extra argument passed to the detector before the per-image flags.
    #[arg(long = "detector-arg", allow_hyphen_values = true)]
    detector_args: Vec<String>,
}

#[derive(clap::Args)]
struct ConvertArgs {
    /// Input annotation file or directory.
    #[arg(long)]
    input: PathBuf,

    /// Input format ('coco' or 'pascal-voc').
    #[arg(long)]
    input_format: String,

    /// Output directory.
    #[arg(long)]
    output: PathBuf,

    /// Output format ('coco' or 'pascal-voc').
    #[arg(long)]
    output_format: String,
}

#[derive(clap::Args)]
struct VisualizeArgs {
    /// Image to draw on.
    #[arg(long)]
    image: PathBuf,

    /// Annotation file or directory.
    #[arg(long)]
    annotations: PathBuf,

    /// Annotation format ('coco' or 'pascal-voc').
    #[arg(long)]
    format: String,

    /// Output image file.
    #[arg(long)]
    output: PathBuf,
}

#[derive(clap::Args)]
struct EditArgs {
    /// Annotation file or directory to edit.
    #[arg(long)]
    annotations: PathBuf,

    /// Annotation format ('coco' or 'pascal-voc').
    #[arg(long)]
    format: String,

    /// Image whose annotations are edited; its dimensions bound move/resize.
    #[arg(long)]
    image: PathBuf,

    /// Edit command, applied in order (e.g. 'add:10,10,50,50:cat',
    /// 'move:0:5,-3', 'resize:0:right:-10,0', 'delete:1').
    #[arg(long = "op", required = true)]
    ops: Vec<String>,

    /// Output directory.
    #[arg(long)]
    output: PathBuf,

    /// Output format (defaults to the input format).
    #[arg(long)]
    output_format: Option<String>,
}

/// Run the prelabel CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), PrelabelError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Annotate(args)) => run_annotate(args),
        Some(Commands::Convert(args)) => run_convert(args),
        Some(Commands::Visualize(args)) => run_visualize(args),
        Some(Commands::Edit(args)) => run_edit(args),
        None => {
            println!("prelabel {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Detector-assisted bounding box annotation.");
            println!();
            println!("Run 'prelabel --help' for usage information.");
            Ok(())
        }
    }
}

fn run_annotate(args: AnnotateArgs) -> Result<(), PrelabelError> {
    // Bad configuration fails before any image is touched.
    let format: AnnotationFormat = args.format.parse()?;
    let request = DetectionRequest::new(args.prompt, args.box_threshold, args.text_threshold)?;

    let images = batch::collect_images(&args.input)?;
    if images.is_empty() {
        println!("No images found in {}", args.input.display());
        return Ok(());
    }
    println!("Found {} images", images.len());

    fs::create_dir_all(&args.output)?;
    let vis_dir = if args.visualize {
        let dir = args.output.join(batch::VISUALIZATIONS_DIR);
        fs::create_dir_all(&dir)?;
        Some(dir)
    } else {
        None
    };

    let mut detector = CommandDetector::new(args.detector).with_args(args.detector_args);
    let (set, detect_report) =
        batch::annotate_images(&mut detector, &images, &request, vis_dir.as_deref());

    println!("Detection:");
    print!("{detect_report}");

    let save_report = conversion::save_annotations(&set, format, &args.output)?;
    println!(
        "Saved {} annotations for {} images in {} format to {}",
        set.annotation_count(),
        save_report.processed,
        format,
        args.output.display()
    );
    if save_report.skipped_count() > 0 {
        print!("{save_report}");
    }
    if let Some(dir) = vis_dir {
        println!("Saved visualizations to {}", dir.display());
    }
    Ok(())
}

fn run_convert(args: ConvertArgs) -> Result<(), PrelabelError> {
    let from: AnnotationFormat = args.input_format.parse()?;
    let to: AnnotationFormat = args.output_format.parse()?;

    println!(
        "Loading annotations from {} in {} format...",
        args.input.display(),
        from
    );
    let (set, load_report) = conversion::load_annotations(&args.input, from)?;
    if load_report.skipped_count() > 0 {
        print!("{load_report}");
    }

    let report = conversion::build_conversion_report(&set, from, to);
    println!("Converting {} -> {}:", report.from, report.to);
    print!("{report}");

    println!(
        "Saving annotations to {} in {} format...",
        args.output.display(),
        to
    );
    let save_report = conversion::save_annotations(&set, to, &args.output)?;
    print!("{save_report}");
    println!("Conversion completed.");
    Ok(())
}

fn run_visualize(args: VisualizeArgs) -> Result<(), PrelabelError> {
    let format: AnnotationFormat = args.format.parse()?;
    let (set, _) = conversion::load_annotations(&args.annotations, format)?;

    let Some(key) = find_image_key(&set, &args.image) else {
        println!("No annotations found for {}", args.image.display());
        return Ok(());
    };
    let annotations = set.get(key).unwrap_or_default();
    println!(
        "Found {} annotations for {}",
        annotations.len(),
        args.image.display()
    );

    let mut palette = LabelPalette::new();
    render::render_overlay(&args.image, annotations, &mut palette, &args.output)?;
    println!("Saved visualization to {}", args.output.display());
    Ok(())
}

fn run_edit(args: EditArgs) -> Result<(), PrelabelError> {
    let from: AnnotationFormat = args.format.parse()?;
    let to: AnnotationFormat = match args.output_format.as_deref() {
        Some(raw) => raw.parse()?,
        None => from,
    };
    let ops = args
        .ops
        .iter()
        .map(|raw| raw.parse::<EditOp>())
        .collect::<Result<Vec<_>, _>>()?;

    let (set, _) = conversion::load_annotations(&args.annotations, from)?;
    let key = find_image_key(&set, &args.image)
        .map(str::to_string)
        .unwrap_or_else(|| args.image.to_string_lossy().into_owned());
    let (width, height) = read_image_dimensions(&args.image)?;

    let mut session = AnnotationSession::new(set);
    let editor = session.open(&key, width, height);
    for (raw, op) in args.ops.iter().zip(&ops) {
        let outcome = op.apply(editor);
        println!("{raw}: {outcome}");
    }
    let count = editor.len();

    let set = session.into_annotations();
    let save_report = conversion::save_annotations(&set, to, &args.output)?;
    println!(
        "Saved {key} ({count} annotations) in {to} format to {}",
        args.output.display()
    );
    if save_report.skipped_count() > 0 {
        print!("{save_report}");
    }
    Ok(())
}

/// Finds the set entry for `image`: the exact path first, then the first
/// key with the same basename (COCO input is keyed by bare file name).
fn find_image_key<'a>(set: &'a AnnotationSet, image: &Path) -> Option<&'a str> {
    let wanted = image.to_string_lossy();
    if let Some(key) = set.image_keys().find(|key| *key == wanted) {
        return Some(key);
    }
    let wanted = io_coco_json::basename(&wanted);
    set.image_keys()
        .find(|key| io_coco_json::basename(key) == wanted)
}
