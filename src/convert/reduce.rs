//! Image-level reduction of Open Images rows by class.

use std::collections::{HashMap, HashSet};

use crate::error::OicocoError;
use crate::ir::SourceRow;

/// Keeps only rows of images that contain at least one box of a class in
/// `keep_classes` (human-readable names).
///
/// This is coarser than the per-row class test the converter applies: an
/// image that qualifies keeps *all* of its rows, including rows of other
/// classes. Row order is preserved.
///
/// # Errors
/// [`OicocoError::UnknownClassMid`] if a row's MID is missing from
/// `mid_to_name`.
pub fn reduce_rows<S: AsRef<str>>(
    rows: Vec<SourceRow>,
    mid_to_name: &HashMap<String, String>,
    keep_classes: &[S],
) -> Result<Vec<SourceRow>, OicocoError> {
    let wanted: HashSet<&str> = keep_classes.iter().map(AsRef::as_ref).collect();
    let initial = rows.len();

    let mut qualifying: HashSet<&str> = HashSet::new();
    for row in &rows {
        let name = class_name(mid_to_name, &row.label_name)?;
        if wanted.contains(name) {
            qualifying.insert(row.image_id.as_str());
        }
    }
    let qualifying: HashSet<String> = qualifying.into_iter().map(str::to_string).collect();

    let reduced: Vec<SourceRow> = rows
        .into_iter()
        .filter(|row| qualifying.contains(&row.image_id))
        .collect();

    tracing::info!(
        initial_rows = initial,
        final_rows = reduced.len(),
        images = qualifying.len(),
        "reduced Open Images rows to images with wanted classes"
    );
    Ok(reduced)
}

pub(crate) fn class_name<'a>(
    mid_to_name: &'a HashMap<String, String>,
    mid: &str,
) -> Result<&'a str, OicocoError> {
    mid_to_name
        .get(mid)
        .map(String::as_str)
        .ok_or_else(|| OicocoError::UnknownClassMid {
            mid: mid.to_string(),
        })
}
