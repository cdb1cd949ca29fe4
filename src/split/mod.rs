//! Random two-way split of a COCO dataset.
//!
//! Each image is assigned to side A with probability `fraction`, one
//! uniform draw per image in stored order. Annotations follow their image.
//! Both sides are renumbered from 0 independently.

use std::collections::HashMap;

use rand::distr::{Distribution, StandardUniform};
use rand::Rng;

use crate::error::OicocoError;
use crate::ir::{Annotation, Dataset, Image, ImageId};
use crate::remap::{renumber_images_and_annotations, IdBase};

/// The two halves of a split.
#[derive(Clone, Debug)]
pub struct SplitPair {
    /// Images drawn below `fraction`.
    pub a: Dataset,
    pub b: Dataset,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    A,
    B,
}

/// Splits `dataset` into two datasets.
///
/// `info` of side A gets the suffix `" Split <fraction>"`, side B
/// `" Split <1 - fraction>"`. `licenses` and `categories` are copied to
/// both sides.
///
/// # Errors
/// [`OicocoError::InvalidArgument`] unless `0 < fraction < 1`;
/// [`OicocoError::SplitAssignmentMissing`] if an annotation points at an
/// image that is not in the dataset.
pub fn split_dataset<R: Rng + ?Sized>(
    dataset: &Dataset,
    fraction: f64,
    rng: &mut R,
) -> Result<SplitPair, OicocoError> {
    if !(fraction > 0.0 && fraction < 1.0) {
        return Err(OicocoError::InvalidArgument {
            message: format!("split fraction must be in (0, 1), got {}", fraction),
        });
    }

    let mut sides: HashMap<ImageId, Side> = HashMap::with_capacity(dataset.images.len());
    let mut images_a: Vec<Image> = Vec::new();
    let mut images_b: Vec<Image> = Vec::new();
    for image in &dataset.images {
        let draw: f64 = StandardUniform.sample(rng);
        let side = if draw < fraction { Side::A } else { Side::B };
        sides.insert(image.id, side);
        match side {
            Side::A => images_a.push(image.clone()),
            Side::B => images_b.push(image.clone()),
        }
    }

    let mut anns_a: Vec<Annotation> = Vec::new();
    let mut anns_b: Vec<Annotation> = Vec::new();
    for ann in &dataset.annotations {
        let side = sides
            .get(&ann.image_id)
            .ok_or(OicocoError::SplitAssignmentMissing {
                image_id: ann.image_id.as_u64(),
            })?;
        match side {
            Side::A => anns_a.push(ann.clone()),
            Side::B => anns_b.push(ann.clone()),
        }
    }

    let a = build_side(dataset, images_a, anns_a, &format!(" Split {}", fraction))?;
    let b = build_side(dataset, images_b, anns_b, &format!(" Split {}", 1.0 - fraction))?;

    tracing::info!(
        fraction,
        images_a = a.images.len(),
        annotations_a = a.annotations.len(),
        images_b = b.images.len(),
        annotations_b = b.annotations.len(),
        "split dataset"
    );
    Ok(SplitPair { a, b })
}

fn build_side(
    source: &Dataset,
    images: Vec<Image>,
    annotations: Vec<Annotation>,
    suffix: &str,
) -> Result<Dataset, OicocoError> {
    let (images, annotations) = renumber_images_and_annotations(images, annotations, IdBase::Zero)
        .map_err(|image_id| OicocoError::SplitAssignmentMissing {
            image_id: image_id.as_u64(),
        })?;
    Ok(Dataset {
        info: source.info.with_suffix(suffix),
        licenses: source.licenses.clone(),
        images,
        annotations,
        categories: source.categories.clone(),
    })
}
