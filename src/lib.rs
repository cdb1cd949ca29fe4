//! oicoco: Open Images annotations to COCO, and COCO dataset tooling.
//!
//! The conversion pathway turns Open Images box rows (normalized
//! coordinates, class MIDs) into a COCO detection dataset with dense ids,
//! filtering annotations by size and image aspect ratio on the way. The
//! dataset tools split a COCO dataset in two at random, rescale it with its
//! image files, copy its images, and check it for consistency.
//!
//! # Modules
//!
//! - [`ir`]: COCO dataset model, Open Images rows, and their readers/writers
//! - [`convert`]: the Open Images to COCO assembler and its filter
//! - [`split`]: random two-way split
//! - [`resize`]: uniform rescaling of geometry and image files
//! - [`remap`]: dense id renumbering shared by all of the above
//! - [`images`]: image file access (dimensions, resizing, copying)
//! - [`validation`]: dataset consistency checks
//! - [`error`]: error type

pub mod convert;
pub mod error;
pub mod images;
pub mod ir;
pub mod remap;
pub mod resize;
pub mod split;
pub mod validation;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;

pub use error::OicocoError;

use convert::{ConvertOptions, InclusionPolicy, DEFAULT_MIN_WIDTH_FOR_RATIO};
use images::{FsImageStore, MissingSourcePolicy};
use ir::io_class_ids::ClassIdMap;
use ir::io_coco_json::{read_coco_json, write_coco_json};
use ir::io_open_images_csv::{read_class_descriptions, read_open_images_csv};
use resize::MissingImagePolicy;

/// The oicoco CLI application.
#[derive(Parser)]
#[command(name = "oicoco")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert Open Images box annotations to a COCO dataset.
    Convert(ConvertArgs),
    /// Randomly split a COCO dataset in two.
    Split(SplitArgs),
    /// Rescale a COCO dataset and its image files by a constant factor.
    Resize(ResizeArgs),
    /// Copy the image files a COCO dataset references.
    CopyImages(CopyImagesArgs),
    /// Validate a COCO dataset for errors and warnings.
    Validate(ValidateArgs),
}

#[derive(clap::Args)]
struct ConvertArgs {
    /// Open Images box annotation CSV.
    #[arg(long)]
    annotations: PathBuf,

    /// Class description CSV (MID, name; no header).
    #[arg(long)]
    class_descriptions: PathBuf,

    /// YAML or JSON mapping of class name to output category id.
    #[arg(long, conflicts_with = "keep", required_unless_present = "keep")]
    class_ids: Option<PathBuf>,

    /// Class names to keep, numbered 1..n in the order given.
    #[arg(long, value_delimiter = ',')]
    keep: Vec<String>,

    /// Directories searched, in order, for each image file.
    #[arg(long = "image-dir", required = true, num_args = 1..)]
    image_dirs: Vec<PathBuf>,

    /// Output COCO JSON file.
    #[arg(short, long)]
    output: PathBuf,

    /// Text appended to the dataset's info string.
    #[arg(long, default_value = "")]
    description: String,

    /// First drop every image that has no box of a kept class.
    #[arg(long)]
    reduce: bool,

    /// Judge annotation size as if the longer image side were this long.
    #[arg(long)]
    max_size: Option<f64>,

    /// Minimum annotation size as WIDTH,HEIGHT in pixels.
    #[arg(long, value_parser = parse_min_size)]
    min_ann_size: Option<(f64, f64)>,

    /// Drop annotations of images whose width/height ratio reaches this.
    #[arg(long, default_value_t = 0.0)]
    min_ratio: f64,

    /// Only apply --min-ratio to images at least this wide.
    #[arg(long, default_value_t = DEFAULT_MIN_WIDTH_FOR_RATIO)]
    min_width_for_ratio: u32,

    /// Also copy the images of the output dataset into this directory.
    #[arg(long)]
    copy_images_to: Option<PathBuf>,
}

#[derive(clap::Args)]
struct SplitArgs {
    /// Input COCO JSON file.
    input: PathBuf,

    /// Probability that an image lands in the first output.
    #[arg(long)]
    fraction: f64,

    #[arg(long)]
    output_a: PathBuf,

    #[arg(long)]
    output_b: PathBuf,

    /// Seed for a reproducible split.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(clap::Args)]
struct ResizeArgs {
    /// Directory holding the dataset's image files.
    #[arg(long)]
    images: PathBuf,

    /// Input COCO JSON file.
    #[arg(long)]
    annotations: PathBuf,

    #[arg(long)]
    factor: f64,

    /// Directory the resized images are written to.
    #[arg(long)]
    output_images: PathBuf,

    /// Output COCO JSON file.
    #[arg(short, long)]
    output: PathBuf,

    /// What to do with entries whose image file could not be resized.
    #[arg(long, value_enum, default_value_t = OnMissing::Keep)]
    on_missing: OnMissing,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OnMissing {
    Keep,
    Drop,
}

impl From<OnMissing> for MissingImagePolicy {
    fn from(value: OnMissing) -> Self {
        match value {
            OnMissing::Keep => MissingImagePolicy::Keep,
            OnMissing::Drop => MissingImagePolicy::Drop,
        }
    }
}

#[derive(clap::Args)]
struct CopyImagesArgs {
    /// COCO JSON file listing the images.
    #[arg(long)]
    annotations: PathBuf,

    /// Source directories, searched in order.
    #[arg(long, required = true, num_args = 1..)]
    from: Vec<PathBuf>,

    /// Destination directory.
    #[arg(long)]
    to: PathBuf,

    /// Fail on the first image that no source directory holds.
    #[arg(long)]
    require_all: bool,
}

#[derive(clap::Args)]
struct ValidateArgs {
    /// Input COCO JSON file.
    input: PathBuf,

    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

fn parse_min_size(s: &str) -> Result<(f64, f64), String> {
    let (w, h) = s
        .split_once(',')
        .ok_or_else(|| format!("expected WIDTH,HEIGHT, got '{}'", s))?;
    let w: f64 = w.trim().parse().map_err(|e| format!("bad width '{}': {}", w, e))?;
    let h: f64 = h.trim().parse().map_err(|e| format!("bad height '{}': {}", h, e))?;
    Ok((w, h))
}

/// Run the oicoco CLI.
///
/// This is the entry point called from `main.rs`.
pub fn run() -> Result<(), OicocoError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Convert(args)) => run_convert(args),
        Some(Commands::Split(args)) => run_split(args),
        Some(Commands::Resize(args)) => run_resize(args),
        Some(Commands::CopyImages(args)) => run_copy_images(args),
        Some(Commands::Validate(args)) => run_validate(args),
        None => {
            println!("oicoco {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Open Images to COCO conversion and COCO dataset tools.");
            println!();
            println!("Run 'oicoco --help' for usage information.");
            Ok(())
        }
    }
}

fn require_dir(path: &Path) -> Result<(), OicocoError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(OicocoError::MissingDirectory {
            path: path.to_path_buf(),
        })
    }
}

/// Checks that `path` could be created, before any work is done.
fn require_parent_dir(path: &Path) -> Result<(), OicocoError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => require_dir(parent),
        _ => Ok(()),
    }
}

fn run_convert(args: ConvertArgs) -> Result<(), OicocoError> {
    for dir in &args.image_dirs {
        require_dir(dir)?;
    }
    require_parent_dir(&args.output)?;
    if let Some(dest) = &args.copy_images_to {
        require_dir(dest)?;
    }

    let class_ids = match &args.class_ids {
        Some(path) => ir::io_class_ids::read_class_ids(path)?,
        None => ClassIdMap::from_names(&args.keep),
    };
    if class_ids.is_empty() {
        return Err(OicocoError::InvalidArgument {
            message: "no classes to keep".to_string(),
        });
    }

    let mid_to_name = read_class_descriptions(&args.class_descriptions)?;
    let mut rows = read_open_images_csv(&args.annotations)?;
    if args.reduce {
        let keep: Vec<&str> = class_ids.names().collect();
        rows = convert::reduce_rows(rows, &mid_to_name, &keep)?;
    }

    let opts = ConvertOptions {
        description: args.description,
        policy: InclusionPolicy {
            max_size: args.max_size,
            min_ann_size: args.min_ann_size,
            min_ratio: args.min_ratio,
            min_width_for_ratio: args.min_width_for_ratio,
        },
    };
    let conversion = convert::openimages_to_coco(
        &rows,
        &mid_to_name,
        &class_ids,
        &FsImageStore,
        &args.image_dirs,
        &opts,
    )?;
    let stats = &conversion.stats;
    tracing::info!(
        rows = stats.rows,
        outside_classes = stats.rows_outside_classes,
        too_small = stats.dropped_too_small,
        panoramic = stats.dropped_panoramic,
        degenerate = stats.dropped_degenerate,
        images_dropped = stats.images_dropped,
        "conversion summary"
    );

    write_coco_json(&args.output, &conversion.dataset)?;

    if let Some(dest) = &args.copy_images_to {
        images::copy_images(
            &conversion.dataset,
            &args.image_dirs,
            dest,
            MissingSourcePolicy::Skip,
        )?;
    }

    println!(
        "Wrote {} images, {} annotations and {} categories to {}",
        conversion.dataset.images.len(),
        conversion.dataset.annotations.len(),
        conversion.dataset.categories.len(),
        args.output.display()
    );
    Ok(())
}

fn run_split(args: SplitArgs) -> Result<(), OicocoError> {
    require_parent_dir(&args.output_a)?;
    require_parent_dir(&args.output_b)?;

    let dataset = read_coco_json(&args.input)?;
    let pair = match args.seed {
        Some(seed) => split::split_dataset(&dataset, args.fraction, &mut StdRng::seed_from_u64(seed))?,
        None => split::split_dataset(&dataset, args.fraction, &mut rand::rng())?,
    };

    write_coco_json(&args.output_a, &pair.a)?;
    write_coco_json(&args.output_b, &pair.b)?;

    println!(
        "Split {} images into {} ({}) and {} ({})",
        dataset.images.len(),
        pair.a.images.len(),
        args.output_a.display(),
        pair.b.images.len(),
        args.output_b.display()
    );
    Ok(())
}

fn run_resize(args: ResizeArgs) -> Result<(), OicocoError> {
    require_parent_dir(&args.output)?;

    let dataset = read_coco_json(&args.annotations)?;
    let (resized, report) = resize::resize_dataset(
        &dataset,
        args.factor,
        &FsImageStore,
        &args.images,
        &args.output_images,
        args.on_missing.into(),
    )?;
    write_coco_json(&args.output, &resized)?;

    println!(
        "Resized {} images ({} missing, {} unreadable); wrote {}",
        report.resized,
        report.missing.len(),
        report.corrupt.len(),
        args.output.display()
    );
    Ok(())
}

fn run_copy_images(args: CopyImagesArgs) -> Result<(), OicocoError> {
    let dataset = read_coco_json(&args.annotations)?;
    let policy = if args.require_all {
        MissingSourcePolicy::Require
    } else {
        MissingSourcePolicy::Skip
    };
    let report = images::copy_images(&dataset, &args.from, &args.to, policy)?;

    println!(
        "Copied {} images to {} ({} not found)",
        report.copied,
        args.to.display(),
        report.missing.len()
    );
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<(), OicocoError> {
    let dataset = read_coco_json(&args.input)?;

    let opts = validation::ValidateOptions {
        strict: args.strict,
    };
    let report = validation::validate_dataset(&dataset, &opts);

    match args.output.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(&report.to_json()).map_err(|source| {
                OicocoError::CocoJsonWrite {
                    path: PathBuf::from("<stdout>"),
                    source,
                }
            })?;
            println!("{}", json);
        }
        _ => print!("{}", report),
    }

    if opts.passes(&report) {
        Ok(())
    } else {
        Err(OicocoError::ValidationFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        })
    }
}
