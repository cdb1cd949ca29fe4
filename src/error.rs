use std::path::PathBuf;
use thiserror::Error;

use crate::validation::ValidationReport;

/// The main error type for oicoco operations.
#[derive(Debug, Error)]
pub enum OicocoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse COCO JSON from {path}: {source}")]
    CocoJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write COCO JSON to {path}: {source}")]
    CocoJsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("The annotation file {path} is empty")]
    EmptyAnnotations { path: PathBuf },

    #[error("Failed to parse Open Images CSV from {path}: {source}")]
    OpenImagesCsvParse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Unexpected Open Images CSV header in {path}: expected {expected}, found {found}")]
    OpenImagesCsvHeader {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("Failed to parse class descriptions from {path}: {source}")]
    ClassDescriptionsParse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to parse class id mapping from {path}: {source}")]
    ClassIdsParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Class MID '{mid}' has no entry in the class descriptions")]
    UnknownClassMid { mid: String },

    #[error("Image {file_name} not found in any of: {searched}")]
    ImageNotFound { file_name: String, searched: String },

    #[error("Failed to read image dimensions from {path}: {source}")]
    ImageDimensionRead {
        path: PathBuf,
        #[source]
        source: imagesize::ImageError,
    },

    #[error("Image {path} has dimensions that do not fit in u32")]
    ImageDimensionOverflow { path: PathBuf },

    #[error("Image codec error for {path}: {source}")]
    ImageCodec {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Internal invariant violated: image {image_id} was assigned to neither split")]
    SplitAssignmentMissing { image_id: u64 },

    #[error("Annotation references image {image_id}, which is not in the dataset")]
    DanglingImageRef { image_id: u64 },

    #[error("Directory {path} does not exist")]
    MissingDirectory { path: PathBuf },

    #[error("File {path} does not exist")]
    MissingFile { path: PathBuf },

    #[error("Validation failed with {error_count} error(s) and {warning_count} warning(s)")]
    ValidationFailed {
        error_count: usize,
        warning_count: usize,
        report: ValidationReport,
    },
}
