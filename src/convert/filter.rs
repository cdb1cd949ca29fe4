//! Per-annotation inclusion policy.
//!
//! The decision looks at the projected box and the parent image's size
//! only. It never modifies the box: the `max_size` rescale is a virtual
//! size used for the minimum-size test, kept in locals of its own.

use crate::ir::{BBoxXYXY, Pixel};

/// Default for [`InclusionPolicy::min_width_for_ratio`].
pub const DEFAULT_MIN_WIDTH_FOR_RATIO: u32 = 400;

/// Numeric thresholds that decide which projected annotations survive.
#[derive(Clone, Debug, PartialEq)]
pub struct InclusionPolicy {
    /// Judge annotation size as if the image's longer side were resized to
    /// this many pixels.
    pub max_size: Option<f64>,

    /// Minimum `(width, height)` an annotation must reach. Equal is enough.
    pub min_ann_size: Option<(f64, f64)>,

    /// Drop annotations from images whose `width / height` reaches this
    /// ratio. Disabled at `0`.
    pub min_ratio: f64,

    /// The ratio rule only applies to images at least this wide.
    pub min_width_for_ratio: u32,
}

impl Default for InclusionPolicy {
    fn default() -> Self {
        Self {
            max_size: None,
            min_ann_size: None,
            min_ratio: 0.0,
            min_width_for_ratio: DEFAULT_MIN_WIDTH_FOR_RATIO,
        }
    }
}

/// Why an annotation was excluded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Exclusion {
    /// Below `min_ann_size` on either axis.
    TooSmall,
    /// The parent image is wide enough and flat enough to hit `min_ratio`.
    Panoramic,
    /// The parent image has a zero dimension the policy needs to divide by.
    DegenerateImage,
}

/// Outcome of [`InclusionPolicy::evaluate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    Drop(Exclusion),
}

impl Verdict {
    pub fn is_keep(&self) -> bool {
        matches!(self, Verdict::Keep)
    }
}

impl InclusionPolicy {
    /// Decides whether an annotation with box `bbox` on an image of
    /// `image_width x image_height` is kept.
    ///
    /// The size rule is checked before the ratio rule; the first failing
    /// rule names the exclusion.
    pub fn evaluate(&self, bbox: &BBoxXYXY<Pixel>, image_width: u32, image_height: u32) -> Verdict {
        if let Some((min_w, min_h)) = self.min_ann_size {
            let mut judged_w = bbox.width();
            let mut judged_h = bbox.height();

            if let Some(max_size) = self.max_size.filter(|m| *m > 0.0) {
                let longest = image_width.max(image_height);
                if longest == 0 {
                    return Verdict::Drop(Exclusion::DegenerateImage);
                }
                let scale = max_size / longest as f64;
                judged_w *= scale;
                judged_h *= scale;
            }

            if judged_w < min_w || judged_h < min_h {
                return Verdict::Drop(Exclusion::TooSmall);
            }
        }

        if self.min_ratio > 0.0 {
            if image_height == 0 {
                return Verdict::Drop(Exclusion::DegenerateImage);
            }
            let ratio = image_width as f64 / image_height as f64;
            if ratio >= self.min_ratio && image_width >= self.min_width_for_ratio {
                return Verdict::Drop(Exclusion::Panoramic);
            }
        }

        Verdict::Keep
    }

    /// Shorthand for `evaluate(..).is_keep()`.
    pub fn admits(&self, bbox: &BBoxXYXY<Pixel>, image_width: u32, image_height: u32) -> bool {
        self.evaluate(bbox, image_width, image_height).is_keep()
    }
}
