//! Open Images rows to a COCO dataset.
//!
//! The assembler runs in a fixed sequence of passes over the rows:
//!
//! 1. **Discover images** in order of first appearance and read their pixel
//!    size from the [`ImageStore`]. Provisional ids are `1, 2, ...` in that
//!    order.
//! 2. **Retain categories**: the distinct classes seen, in first-appearance
//!    order, that the [`ClassIdMap`] names.
//! 3. **Collect candidates**: project every retained row and run it through
//!    the [`InclusionPolicy`]. Survivors get provisional ids in row order and
//!    mark their parent image.
//! 4. **Compact**: drop unmarked images, renumber images and annotations
//!    from 1, and rewrite `image_id` through the image map.
//!
//! Passes 3 and 4 are separate pure functions ([`collect_candidates`],
//! [`compact`]); the survivor marker set is the only thing handed between
//! them.

mod filter;
mod project;
mod reduce;

pub use filter::{Exclusion, InclusionPolicy, Verdict, DEFAULT_MIN_WIDTH_FOR_RATIO};
pub use project::project_row;
pub use reduce::reduce_rows;

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::error::OicocoError;
use crate::images::ImageStore;
use crate::ir::io_class_ids::ClassIdMap;
use crate::ir::{Annotation, Category, Dataset, Image, ImageId, Info, SourceRow};
use crate::remap::{renumber_images_and_annotations, IdBase};
use reduce::class_name;

/// Supercategory given to every converted category.
pub const SUPERCATEGORY: &str = "object";

/// Prefix of the `info` string of converted datasets.
pub const INFO_PREFIX: &str = "Annotations produced from OpenImages.";

/// Settings for one conversion run.
#[derive(Clone, Debug, Default)]
pub struct ConvertOptions {
    /// Free text appended to the dataset's `info`.
    pub description: String,

    pub policy: InclusionPolicy,
}

/// What happened to the rows of a conversion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConvertStats {
    pub rows: usize,
    /// Rows whose class is not in the class id map.
    pub rows_outside_classes: usize,
    pub dropped_too_small: usize,
    pub dropped_panoramic: usize,
    pub dropped_degenerate: usize,
    pub images_discovered: usize,
    /// Images left without any surviving annotation.
    pub images_dropped: usize,
}

/// A converted dataset and the bookkeeping behind it.
#[derive(Clone, Debug)]
pub struct Conversion {
    pub dataset: Dataset,
    pub stats: ConvertStats,
}

/// Images found in the rows, keyed by file name.
#[derive(Clone, Debug, Default)]
pub struct DiscoveredImages {
    /// In order of first appearance, ids `1..=n`.
    pub images: Vec<Image>,
    by_file_name: HashMap<String, ImageId>,
}

impl DiscoveredImages {
    pub fn id_of(&self, file_name: &str) -> Option<ImageId> {
        self.by_file_name.get(file_name).copied()
    }

    /// Pixel size of a discovered image.
    pub fn size_of(&self, id: ImageId) -> Option<(u32, u32)> {
        let index = id.as_u64().checked_sub(1)? as usize;
        self.images.get(index).map(|img| (img.width, img.height))
    }
}

/// Output of the candidate pass.
#[derive(Clone, Debug, Default)]
pub struct Candidates {
    /// Kept annotations in row order, with provisional ids and provisional
    /// image ids.
    pub annotations: Vec<Annotation>,
    /// Provisional ids of images with at least one kept annotation.
    pub survivors: HashSet<ImageId>,
    pub stats: ConvertStats,
}

/// Converts Open Images rows to a COCO dataset.
///
/// `mid_to_name` resolves row MIDs to class names, `class_ids` decides which
/// names are kept and their category ids, and `image_dirs` are searched in
/// order for each image file.
///
/// # Errors
/// Fails without output if an image is in none of `image_dirs`, or a row's
/// MID is missing from `mid_to_name`.
pub fn openimages_to_coco<S: ImageStore + ?Sized>(
    rows: &[SourceRow],
    mid_to_name: &HashMap<String, String>,
    class_ids: &ClassIdMap,
    store: &S,
    image_dirs: &[PathBuf],
    opts: &ConvertOptions,
) -> Result<Conversion, OicocoError> {
    let discovered = discover_images(rows, store, image_dirs)?;
    let categories = retained_categories(rows, mid_to_name, class_ids)?;
    let candidates = collect_candidates(rows, &discovered, mid_to_name, class_ids, &opts.policy)?;

    let mut stats = candidates.stats.clone();
    stats.images_discovered = discovered.images.len();
    stats.images_dropped = discovered.images.len() - candidates.survivors.len();

    let (images, annotations) = compact(discovered.images, candidates)?;

    tracing::info!(
        rows = stats.rows,
        images = images.len(),
        annotations = annotations.len(),
        categories = categories.len(),
        images_dropped = stats.images_dropped,
        "converted Open Images rows to COCO"
    );

    Ok(Conversion {
        dataset: Dataset {
            info: Info::Text(format!("{} {}", INFO_PREFIX, opts.description)),
            licenses: Vec::new(),
            images,
            annotations,
            categories,
        },
        stats,
    })
}

/// Pass 1: every image named by the rows, in first-appearance order.
pub fn discover_images<S: ImageStore + ?Sized>(
    rows: &[SourceRow],
    store: &S,
    image_dirs: &[PathBuf],
) -> Result<DiscoveredImages, OicocoError> {
    let mut discovered = DiscoveredImages::default();
    for row in rows {
        let file_name = row.file_name();
        if discovered.by_file_name.contains_key(&file_name) {
            continue;
        }
        let (width, height) = store.dimensions(&file_name, image_dirs)?;
        let id = ImageId::new(discovered.images.len() as u64 + 1);
        tracing::debug!(file = %file_name, width, height, "discovered image");
        discovered
            .images
            .push(Image::new(id, file_name.clone(), width, height));
        discovered.by_file_name.insert(file_name, id);
    }
    Ok(discovered)
}

/// Pass 2: one category per kept class name, in first-appearance order of
/// the rows' MIDs.
pub fn retained_categories(
    rows: &[SourceRow],
    mid_to_name: &HashMap<String, String>,
    class_ids: &ClassIdMap,
) -> Result<Vec<Category>, OicocoError> {
    let mut seen_mids: HashSet<&str> = HashSet::new();
    let mut seen_names: HashSet<&str> = HashSet::new();
    let mut categories = Vec::new();

    for row in rows {
        if !seen_mids.insert(row.label_name.as_str()) {
            continue;
        }
        let name = class_name(mid_to_name, &row.label_name)?;
        let Some(id) = class_ids.get(name) else {
            continue;
        };
        if seen_names.insert(name) {
            categories.push(Category::with_supercategory(id, name, SUPERCATEGORY));
        }
    }
    Ok(categories)
}

/// Pass 3: project and filter every row of a kept class.
pub fn collect_candidates(
    rows: &[SourceRow],
    discovered: &DiscoveredImages,
    mid_to_name: &HashMap<String, String>,
    class_ids: &ClassIdMap,
    policy: &InclusionPolicy,
) -> Result<Candidates, OicocoError> {
    let mut candidates = Candidates::default();
    candidates.stats.rows = rows.len();

    for row in rows {
        let name = class_name(mid_to_name, &row.label_name)?;
        let Some(category_id) = class_ids.get(name) else {
            candidates.stats.rows_outside_classes += 1;
            continue;
        };

        let file_name = row.file_name();
        let image_id = discovered
            .id_of(&file_name)
            .ok_or_else(|| OicocoError::ImageNotFound {
                file_name: file_name.clone(),
                searched: "discovered images".to_string(),
            })?;
        let (width, height) = discovered
            .size_of(image_id)
            .ok_or(OicocoError::DanglingImageRef {
                image_id: image_id.as_u64(),
            })?;

        let bbox = project_row(row, width, height);
        match policy.evaluate(&bbox, width, height) {
            Verdict::Keep => {
                let provisional = candidates.annotations.len() as u64 + 1;
                candidates
                    .annotations
                    .push(Annotation::from_box(provisional, image_id, category_id, bbox));
                candidates.survivors.insert(image_id);
            }
            Verdict::Drop(reason) => {
                tracing::debug!(image = %row.image_id, class = name, ?reason, "annotation excluded");
                match reason {
                    Exclusion::TooSmall => candidates.stats.dropped_too_small += 1,
                    Exclusion::Panoramic => candidates.stats.dropped_panoramic += 1,
                    Exclusion::DegenerateImage => candidates.stats.dropped_degenerate += 1,
                }
            }
        }
    }
    Ok(candidates)
}

/// Pass 4: drop images without survivors and renumber everything from 1.
pub fn compact(
    images: Vec<Image>,
    candidates: Candidates,
) -> Result<(Vec<Image>, Vec<Annotation>), OicocoError> {
    let kept: Vec<Image> = images
        .into_iter()
        .filter(|img| candidates.survivors.contains(&img.id))
        .collect();

    renumber_images_and_annotations(kept, candidates.annotations, IdBase::One).map_err(
        |image_id| OicocoError::DanglingImageRef {
            image_id: image_id.as_u64(),
        },
    )
}
