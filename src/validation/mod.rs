//! Consistency checks for COCO datasets.
//!
//! Checks cover:
//! - id uniqueness (images, annotations, categories) and unique file names
//! - references from annotations to images and categories
//! - dense ids, as produced by the converter and the splitter
//! - image sizes, bbox geometry, and `area` agreeing with the bbox

mod report;

pub use report::{IssueCode, IssueContext, Severity, ValidationIssue, ValidationReport};

use std::collections::{HashMap, HashSet};

use crate::ir::{AnnotationId, CategoryId, Dataset, ImageId};

/// Options for validation behavior.
#[derive(Clone, Debug, Default)]
pub struct ValidateOptions {
    /// Treat warnings as failures.
    pub strict: bool,
}

impl ValidateOptions {
    pub fn passes(&self, report: &ValidationReport) -> bool {
        report.passes(self.strict)
    }
}

/// Relative tolerance for [`IssueCode::AreaMismatch`].
const AREA_TOLERANCE: f64 = 1e-6;

/// Slack in pixels for [`IssueCode::BBoxOutOfBounds`].
const BOUNDS_TOLERANCE: f64 = 0.5;

/// Validates a dataset and returns every issue found.
pub fn validate_dataset(dataset: &Dataset, _opts: &ValidateOptions) -> ValidationReport {
    let mut report = ValidationReport::new();

    let image_ids: HashSet<ImageId> = dataset.images.iter().map(|i| i.id).collect();
    let category_ids: HashSet<CategoryId> = dataset.categories.iter().map(|c| c.id).collect();

    validate_images(dataset, &mut report);
    validate_categories(dataset, &mut report);
    validate_annotations(dataset, &image_ids, &category_ids, &mut report);
    validate_id_density(dataset, &mut report);

    report
}

fn validate_images(dataset: &Dataset, report: &mut ValidationReport) {
    let mut seen_ids: HashMap<ImageId, usize> = HashMap::new();
    let mut seen_names: HashMap<&str, ImageId> = HashMap::new();
    let annotated: HashSet<ImageId> = dataset.annotations.iter().map(|a| a.image_id).collect();

    for (idx, image) in dataset.images.iter().enumerate() {
        let id = image.id.as_u64();

        if let Some(first_idx) = seen_ids.get(&image.id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateImageId,
                format!(
                    "Duplicate image ID {} (first seen at index {})",
                    id, first_idx
                ),
                IssueContext::Image { id },
            ));
        } else {
            seen_ids.insert(image.id, idx);
        }

        if image.width == 0 || image.height == 0 {
            report.add(ValidationIssue::error(
                IssueCode::InvalidImageDimensions,
                format!(
                    "Invalid dimensions {}x{} (must be positive)",
                    image.width, image.height
                ),
                IssueContext::Image { id },
            ));
        }

        if image.file_name.is_empty() {
            report.add(ValidationIssue::warning(
                IssueCode::EmptyFileName,
                "Empty filename",
                IssueContext::Image { id },
            ));
        } else if let Some(first_id) = seen_names.get(image.file_name.as_str()) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateFileName,
                format!(
                    "File name '{}' is also used by image {}",
                    image.file_name, first_id
                ),
                IssueContext::Image { id },
            ));
        } else {
            seen_names.insert(&image.file_name, image.id);
        }

        if !annotated.contains(&image.id) {
            report.add(ValidationIssue::warning(
                IssueCode::ImageWithoutAnnotations,
                format!("Image '{}' has no annotations", image.file_name),
                IssueContext::Image { id },
            ));
        }
    }
}

fn validate_categories(dataset: &Dataset, report: &mut ValidationReport) {
    let mut seen_ids: HashMap<CategoryId, usize> = HashMap::new();
    let mut seen_names: HashMap<&str, CategoryId> = HashMap::new();

    for (idx, category) in dataset.categories.iter().enumerate() {
        let id = category.id.as_u64();

        if let Some(first_idx) = seen_ids.get(&category.id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateCategoryId,
                format!(
                    "Duplicate category ID {} (first seen at index {})",
                    id, first_idx
                ),
                IssueContext::Category { id },
            ));
        } else {
            seen_ids.insert(category.id, idx);
        }

        if category.name.is_empty() {
            report.add(ValidationIssue::warning(
                IssueCode::EmptyCategoryName,
                "Empty category name",
                IssueContext::Category { id },
            ));
        } else if let Some(first_id) = seen_names.get(category.name.as_str()) {
            report.add(ValidationIssue::warning(
                IssueCode::DuplicateCategoryName,
                format!(
                    "Duplicate category name '{}' (also used by category {})",
                    category.name, first_id
                ),
                IssueContext::Category { id },
            ));
        } else {
            seen_names.insert(&category.name, category.id);
        }
    }
}

fn validate_annotations(
    dataset: &Dataset,
    image_ids: &HashSet<ImageId>,
    category_ids: &HashSet<CategoryId>,
    report: &mut ValidationReport,
) {
    let mut seen_ids: HashMap<AnnotationId, usize> = HashMap::new();
    let image_dims: HashMap<ImageId, (u32, u32)> = dataset
        .images
        .iter()
        .map(|i| (i.id, (i.width, i.height)))
        .collect();

    for (idx, annotation) in dataset.annotations.iter().enumerate() {
        let id = annotation.id.as_u64();

        if let Some(first_idx) = seen_ids.get(&annotation.id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateAnnotationId,
                format!(
                    "Duplicate annotation ID {} (first seen at index {})",
                    id, first_idx
                ),
                IssueContext::Annotation { id },
            ));
        } else {
            seen_ids.insert(annotation.id, idx);
        }

        if !image_ids.contains(&annotation.image_id) {
            report.add(ValidationIssue::error(
                IssueCode::MissingImageRef,
                format!("References non-existent image {}", annotation.image_id),
                IssueContext::Annotation { id },
            ));
        }

        if !category_ids.contains(&annotation.category_id) {
            report.add(ValidationIssue::error(
                IssueCode::MissingCategoryRef,
                format!(
                    "References non-existent category {}",
                    annotation.category_id
                ),
                IssueContext::Annotation { id },
            ));
        }

        let bbox = annotation.pixel_box();
        let [x, y, w, h] = annotation.bbox;

        if !bbox.is_finite() {
            report.add(ValidationIssue::error(
                IssueCode::BBoxNotFinite,
                format!("Non-finite bbox [{}, {}, {}, {}]", x, y, w, h),
                IssueContext::Annotation { id },
            ));
            continue;
        }

        if w < 0.0 || h < 0.0 {
            report.add(ValidationIssue::warning(
                IssueCode::NegativeBBoxSize,
                format!("Negative bbox size {}x{}", w, h),
                IssueContext::Annotation { id },
            ));
        }

        let expected = bbox.area();
        if (annotation.area - expected).abs() > AREA_TOLERANCE * expected.abs().max(1.0) {
            report.add(ValidationIssue::warning(
                IssueCode::AreaMismatch,
                format!(
                    "Area {} does not match bbox area {}",
                    annotation.area, expected
                ),
                IssueContext::Annotation { id },
            ));
        }

        if let Some((width, height)) = image_dims.get(&annotation.image_id) {
            let (iw, ih) = (*width as f64, *height as f64);
            if bbox.xmin().min(bbox.xmax()) < -BOUNDS_TOLERANCE
                || bbox.ymin().min(bbox.ymax()) < -BOUNDS_TOLERANCE
                || bbox.xmin().max(bbox.xmax()) > iw + BOUNDS_TOLERANCE
                || bbox.ymin().max(bbox.ymax()) > ih + BOUNDS_TOLERANCE
            {
                report.add(ValidationIssue::warning(
                    IssueCode::BBoxOutOfBounds,
                    format!(
                        "Bounding box [{:.1}, {:.1}, {:.1}, {:.1}] extends outside image bounds {}x{}",
                        x, y, w, h, width, height
                    ),
                    IssueContext::Annotation { id },
                ));
            }
        }
    }
}

/// Ids are dense when, in stored order, they read `b, b + 1, ...` for a
/// base `b` of 0 or 1.
fn is_dense(ids: impl Iterator<Item = u64>) -> bool {
    let mut ids = ids.peekable();
    let Some(&first) = ids.peek() else {
        return true;
    };
    first <= 1 && ids.zip(first..).all(|(id, expected)| id == expected)
}

fn validate_id_density(dataset: &Dataset, report: &mut ValidationReport) {
    if !is_dense(dataset.images.iter().map(|i| i.id.as_u64())) {
        report.add(ValidationIssue::warning(
            IssueCode::NonContiguousImageIds,
            "Image ids are not consecutive from 0 or 1 in stored order",
            IssueContext::Dataset,
        ));
    }
    if !is_dense(dataset.annotations.iter().map(|a| a.id.as_u64())) {
        report.add(ValidationIssue::warning(
            IssueCode::NonContiguousAnnotationIds,
            "Annotation ids are not consecutive from 0 or 1 in stored order",
            IssueContext::Dataset,
        ));
    }
}
