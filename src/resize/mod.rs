//! Uniform rescaling of a COCO dataset and its image files.
//!
//! Geometry is scaled by `factor` and truncated toward zero, component by
//! component: image width and height, and each of the bbox `x`, `y`,
//! `width`, `height`. Area and segmentation are then rebuilt from the
//! truncated box, so the three stay consistent.

use std::collections::HashSet;
use std::path::Path;

use crate::error::OicocoError;
use crate::images::ImageStore;
use crate::ir::{Annotation, BBoxXYXY, Dataset, Image, ImageId};
use crate::remap::{renumber_images_and_annotations, IdBase};

/// What happens to an image entry whose file could not be resized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MissingImagePolicy {
    /// Keep the entry and its annotations, rescaled, without a file.
    #[default]
    Keep,
    /// Remove the entry and its annotations, then renumber.
    Drop,
}

/// Outcome of [`resize_dataset`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResizeReport {
    pub resized: usize,
    /// File names absent from the source directory.
    pub missing: Vec<String>,
    /// File names that could not be decoded or written.
    pub corrupt: Vec<String>,
}

impl ResizeReport {
    pub fn failed(&self) -> usize {
        self.missing.len() + self.corrupt.len()
    }
}

fn check_factor(factor: f64) -> Result<(), OicocoError> {
    if factor.is_finite() && factor > 0.0 {
        Ok(())
    } else {
        Err(OicocoError::InvalidArgument {
            message: format!("resize factor must be a positive finite number, got {}", factor),
        })
    }
}

fn scale(value: f64, factor: f64) -> f64 {
    (value * factor).trunc()
}

fn scale_dim(value: u32, factor: f64) -> u32 {
    (value as f64 * factor).trunc() as u32
}

/// Rescales image sizes and annotation geometry, leaving ids and every
/// other field as they are.
pub fn resize_annotations(dataset: &Dataset, factor: f64) -> Result<Dataset, OicocoError> {
    check_factor(factor)?;

    let mut resized = dataset.clone();
    for image in &mut resized.images {
        image.width = scale_dim(image.width, factor);
        image.height = scale_dim(image.height, factor);
    }
    for ann in &mut resized.annotations {
        let [x, y, w, h] = ann.bbox;
        ann.snap_box(BBoxXYXY::from_xywh([
            scale(x, factor),
            scale(y, factor),
            scale(w, factor),
            scale(h, factor),
        ]));
    }
    Ok(resized)
}

/// Resizes every image file of `dataset` from `src_dir` into `out_dir` and
/// returns the rescaled dataset.
///
/// A file that is missing or cannot be decoded is logged and skipped; the
/// batch goes on. `policy` decides whether its entry stays in the output.
///
/// # Errors
/// [`OicocoError::InvalidArgument`] for a non-positive or non-finite
/// `factor`, [`OicocoError::MissingDirectory`] if either directory does not
/// exist.
pub fn resize_dataset<S: ImageStore + ?Sized>(
    dataset: &Dataset,
    factor: f64,
    store: &S,
    src_dir: &Path,
    out_dir: &Path,
    policy: MissingImagePolicy,
) -> Result<(Dataset, ResizeReport), OicocoError> {
    check_factor(factor)?;
    for dir in [src_dir, out_dir] {
        if !dir.is_dir() {
            return Err(OicocoError::MissingDirectory {
                path: dir.to_path_buf(),
            });
        }
    }

    let mut resized = resize_annotations(dataset, factor)?;
    let mut report = ResizeReport::default();
    let mut failed: HashSet<ImageId> = HashSet::new();

    for image in &resized.images {
        let src = src_dir.join(&image.file_name);
        let dst = out_dir.join(&image.file_name);
        match store.resize_and_save(&src, &dst, image.width, image.height) {
            Ok(()) => report.resized += 1,
            Err(OicocoError::MissingFile { path }) => {
                tracing::warn!(file = %path.display(), "image file not found, skipping");
                report.missing.push(image.file_name.clone());
                failed.insert(image.id);
            }
            Err(err) => {
                tracing::warn!(file = %src.display(), error = %err, "could not resize image, skipping");
                report.corrupt.push(image.file_name.clone());
                failed.insert(image.id);
            }
        }
    }

    if policy == MissingImagePolicy::Drop && !failed.is_empty() {
        resized = drop_images(resized, &failed)?;
    }

    tracing::info!(
        factor,
        resized = report.resized,
        missing = report.missing.len(),
        corrupt = report.corrupt.len(),
        "resized dataset"
    );
    Ok((resized, report))
}

/// Removes `failed` images and their annotations and renumbers both from
/// the dataset's original base.
fn drop_images(dataset: Dataset, failed: &HashSet<ImageId>) -> Result<Dataset, OicocoError> {
    let base = if dataset.images.iter().any(|img| img.id == ImageId(0)) {
        IdBase::Zero
    } else {
        IdBase::One
    };

    let Dataset {
        info,
        licenses,
        images,
        annotations,
        categories,
    } = dataset;

    let images: Vec<Image> = images
        .into_iter()
        .filter(|img| !failed.contains(&img.id))
        .collect();
    let annotations: Vec<Annotation> = annotations
        .into_iter()
        .filter(|ann| !failed.contains(&ann.image_id))
        .collect();

    let (images, annotations) = renumber_images_and_annotations(images, annotations, base)
        .map_err(|image_id| OicocoError::DanglingImageRef {
            image_id: image_id.as_u64(),
        })?;

    Ok(Dataset {
        info,
        licenses,
        images,
        annotations,
        categories,
    })
}
