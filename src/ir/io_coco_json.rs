//! COCO JSON reader and writer.
//!
//! COCO bounding boxes are `[x, y, width, height]` with `(x, y)` the
//! top-left corner in absolute pixels. The [`Dataset`] model already uses
//! that layout, so reading and writing is a direct serde pass.
//!
//! # Empty payloads
//!
//! A file whose top-level value is `null`, `{}` or `[]` is rejected with
//! [`OicocoError::EmptyAnnotations`] before any schema decoding, so an
//! accidentally truncated export never turns into an empty dataset.
//!
//! # Output order
//!
//! Records are written in stored order. Every pathway in this crate leaves
//! the lists sorted by their dense ids, so stored order is id order.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde_json::Value;

use super::model::Dataset;
use crate::error::OicocoError;

/// Reads a dataset from a COCO JSON file.
///
/// # Errors
/// Fails if the file cannot be opened, is empty, or does not match the
/// COCO detection schema.
///
/// # Example
/// ```no_run
/// use std::path::Path;
/// use oicoco::ir::io_coco_json::read_coco_json;
///
/// let dataset = read_coco_json(Path::new("instances_train.json"))?;
/// # Ok::<(), oicoco::OicocoError>(())
/// ```
pub fn read_coco_json(path: &Path) -> Result<Dataset, OicocoError> {
    if !path.is_file() {
        return Err(OicocoError::MissingFile {
            path: path.to_path_buf(),
        });
    }

    tracing::info!(path = %path.display(), "reading COCO annotations");
    let file = File::open(path).map_err(OicocoError::Io)?;
    let reader = BufReader::new(file);

    let value: Value =
        serde_json::from_reader(reader).map_err(|source| OicocoError::CocoJsonParse {
            path: path.to_path_buf(),
            source,
        })?;

    from_coco_value(value, path)
}

/// Writes a dataset to a COCO JSON file.
///
/// The parent directory must already exist.
pub fn write_coco_json(path: &Path, dataset: &Dataset) -> Result<(), OicocoError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            return Err(OicocoError::MissingDirectory {
                path: parent.to_path_buf(),
            });
        }
    }

    let file = File::create(path).map_err(OicocoError::Io)?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer(&mut writer, dataset).map_err(|source| {
        OicocoError::CocoJsonWrite {
            path: path.to_path_buf(),
            source,
        }
    })?;
    writer.flush().map_err(OicocoError::Io)?;

    tracing::info!(
        path = %path.display(),
        images = dataset.images.len(),
        annotations = dataset.annotations.len(),
        "wrote COCO annotations"
    );
    Ok(())
}

/// Reads a dataset from a COCO JSON string.
pub fn from_coco_str(json: &str) -> Result<Dataset, OicocoError> {
    from_coco_slice(json.as_bytes())
}

/// Reads a dataset from COCO JSON bytes.
///
/// Used by the fuzz target; no UTF-8 check happens up front.
pub fn from_coco_slice(bytes: &[u8]) -> Result<Dataset, OicocoError> {
    let dummy_path = Path::new("<bytes>");
    let value: Value =
        serde_json::from_slice(bytes).map_err(|source| OicocoError::CocoJsonParse {
            path: dummy_path.to_path_buf(),
            source,
        })?;
    from_coco_value(value, dummy_path)
}

/// Serializes a dataset to a COCO JSON string.
pub fn to_coco_string(dataset: &Dataset) -> Result<String, OicocoError> {
    serde_json::to_string(dataset).map_err(|source| OicocoError::CocoJsonWrite {
        path: Path::new("<string>").to_path_buf(),
        source,
    })
}

fn from_coco_value(value: Value, path: &Path) -> Result<Dataset, OicocoError> {
    let empty = match &value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    };
    if empty {
        return Err(OicocoError::EmptyAnnotations {
            path: path.to_path_buf(),
        });
    }

    serde_json::from_value(value).map_err(|source| OicocoError::CocoJsonParse {
        path: path.to_path_buf(),
        source,
    })
}
