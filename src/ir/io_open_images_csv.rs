//! Open Images box annotation CSV and class description CSV.
//!
//! # Box annotations
//!
//! One row per bounding box, with the fixed header
//!
//! ```text
//! ImageID,Source,LabelName,Confidence,XMin,XMax,YMin,YMax,IsOccluded,IsTruncated,IsGroupOf,IsDepiction,IsInside
//! ```
//!
//! Coordinates are normalized to `[0, 1]`; `XMin = 0` is the leftmost pixel
//! column and `YMin = 0` the top row. The `Is*` flags are `1` (present),
//! `0` (absent) or `-1` (unknown). A file whose header differs from the
//! expected one is rejected before any row is read.
//!
//! # Class descriptions
//!
//! Two columns, `MID,name`, no header. Maps the opaque Open Images class key
//! (e.g. `/m/01g317`) to a human-readable class name.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::bbox::{BBoxXYXY, Normalized};
use crate::error::OicocoError;

/// The exact header an Open Images box CSV must carry.
pub const EXPECTED_HEADER: [&str; 13] = [
    "ImageID",
    "Source",
    "LabelName",
    "Confidence",
    "XMin",
    "XMax",
    "YMin",
    "YMax",
    "IsOccluded",
    "IsTruncated",
    "IsGroupOf",
    "IsDepiction",
    "IsInside",
];

/// One bounding box row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SourceRow {
    #[serde(rename = "ImageID")]
    pub image_id: String,
    /// How the box was made (`xclick`, `activemil`, ...).
    pub source: String,
    /// Class MID.
    pub label_name: String,
    pub confidence: f64,
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub is_occluded: i8,
    pub is_truncated: i8,
    pub is_group_of: i8,
    pub is_depiction: i8,
    pub is_inside: i8,
}

impl SourceRow {
    /// A manually drawn box with all flags absent.
    pub fn new(
        image_id: impl Into<String>,
        label_name: impl Into<String>,
        bbox: BBoxXYXY<Normalized>,
    ) -> Self {
        Self {
            image_id: image_id.into(),
            source: "xclick".to_string(),
            label_name: label_name.into(),
            confidence: 1.0,
            x_min: bbox.xmin(),
            x_max: bbox.xmax(),
            y_min: bbox.ymin(),
            y_max: bbox.ymax(),
            is_occluded: 0,
            is_truncated: 0,
            is_group_of: 0,
            is_depiction: 0,
            is_inside: 0,
        }
    }

    /// The image file this row annotates.
    pub fn file_name(&self) -> String {
        format!("{}.jpg", self.image_id)
    }

    pub fn normalized_box(&self) -> BBoxXYXY<Normalized> {
        BBoxXYXY::from_xyxy(self.x_min, self.y_min, self.x_max, self.y_max)
    }
}

/// Reads every row of an Open Images box CSV.
///
/// # Errors
/// Fails on a missing file, a header mismatch, or any unparsable row. No
/// rows are returned on failure.
pub fn read_open_images_csv(path: &Path) -> Result<Vec<SourceRow>, OicocoError> {
    if !path.is_file() {
        return Err(OicocoError::MissingFile {
            path: path.to_path_buf(),
        });
    }

    let file = File::open(path).map_err(OicocoError::Io)?;
    let rows = parse_rows(BufReader::new(file), path)?;
    tracing::info!(path = %path.display(), rows = rows.len(), "read Open Images annotation rows");
    Ok(rows)
}

/// Parses Open Images rows from bytes.
pub fn from_open_images_csv_slice(bytes: &[u8]) -> Result<Vec<SourceRow>, OicocoError> {
    parse_rows(bytes, Path::new("<bytes>"))
}

/// Parses Open Images rows from a string.
pub fn from_open_images_csv_str(csv_str: &str) -> Result<Vec<SourceRow>, OicocoError> {
    from_open_images_csv_slice(csv_str.as_bytes())
}

/// Renders rows back to CSV, header first.
pub fn to_open_images_csv_string(rows: &[SourceRow]) -> Result<String, OicocoError> {
    let dummy_path = Path::new("<string>");
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer
            .serialize(row)
            .map_err(|source| OicocoError::OpenImagesCsvParse {
                path: dummy_path.to_path_buf(),
                source,
            })?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| OicocoError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| OicocoError::InvalidArgument {
        message: format!("rendered CSV is not UTF-8: {}", e),
    })
}

fn parse_rows<R: Read>(reader: R, path: &Path) -> Result<Vec<SourceRow>, OicocoError> {
    let mut csv_reader = csv::Reader::from_reader(reader);

    let header = csv_reader
        .headers()
        .map_err(|source| OicocoError::OpenImagesCsvParse {
            path: path.to_path_buf(),
            source,
        })?
        .clone();
    if !header.iter().eq(EXPECTED_HEADER.iter().copied()) {
        return Err(OicocoError::OpenImagesCsvHeader {
            path: path.to_path_buf(),
            expected: EXPECTED_HEADER.join(","),
            found: header.iter().collect::<Vec<_>>().join(","),
        });
    }

    let mut rows = Vec::new();
    for result in csv_reader.deserialize() {
        let row: SourceRow = result.map_err(|source| OicocoError::OpenImagesCsvParse {
            path: path.to_path_buf(),
            source,
        })?;
        rows.push(row);
    }
    Ok(rows)
}

/// Reads the `MID -> class name` table.
pub fn read_class_descriptions(path: &Path) -> Result<HashMap<String, String>, OicocoError> {
    if !path.is_file() {
        return Err(OicocoError::MissingFile {
            path: path.to_path_buf(),
        });
    }

    let file = File::open(path).map_err(OicocoError::Io)?;
    let table = parse_class_descriptions(BufReader::new(file), path)?;
    tracing::info!(path = %path.display(), classes = table.len(), "read class descriptions");
    Ok(table)
}

/// Parses the `MID -> class name` table from a string.
pub fn from_class_descriptions_str(csv_str: &str) -> Result<HashMap<String, String>, OicocoError> {
    parse_class_descriptions(csv_str.as_bytes(), Path::new("<string>"))
}

/// Parses the `MID -> class name` table from raw bytes.
#[cfg(feature = "fuzzing")]
pub fn from_class_descriptions_slice(bytes: &[u8]) -> Result<HashMap<String, String>, OicocoError> {
    parse_class_descriptions(bytes, Path::new("<bytes>"))
}

fn parse_class_descriptions<R: Read>(
    reader: R,
    path: &Path,
) -> Result<HashMap<String, String>, OicocoError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(reader);

    let mut table = HashMap::new();
    for result in csv_reader.deserialize() {
        let (mid, name): (String, String) =
            result.map_err(|source| OicocoError::ClassDescriptionsParse {
                path: path.to_path_buf(),
                source,
            })?;
        table.insert(mid, name);
    }
    Ok(table)
}
