//! Projection of a normalized Open Images box onto its image.

use crate::ir::{BBoxXYXY, Pixel, SourceRow};

/// Maps a row's normalized box to absolute pixels for an image of
/// `width x height`.
///
/// `XMin`/`XMax` scale by the width and `YMin`/`YMax` by the height. The
/// result is not clamped or reordered; an inverted row yields a negative
/// width or height.
pub fn project_row(row: &SourceRow, width: u32, height: u32) -> BBoxXYXY<Pixel> {
    row.normalized_box().to_pixel(width as f64, height as f64)
}
