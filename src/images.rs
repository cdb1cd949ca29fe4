//! Image file collaborators: dimension lookup, resize-and-save, copying.
//!
//! The conversion and resize pathways only talk to images through the
//! [`ImageStore`] trait, so tests can hand them an in-memory table of sizes
//! instead of real files.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};

use crate::error::OicocoError;
use crate::ir::Dataset;

/// JPEG quality used when re-encoding resized images.
pub const JPEG_QUALITY: u8 = 95;

/// Access to image files.
pub trait ImageStore {
    /// Pixel size of `file_name`, looked up in each of `candidate_dirs` in
    /// order; the first directory holding the file wins.
    ///
    /// # Errors
    /// [`OicocoError::ImageNotFound`] if no directory holds the file.
    fn dimensions(
        &self,
        file_name: &str,
        candidate_dirs: &[PathBuf],
    ) -> Result<(u32, u32), OicocoError>;

    /// Decodes `src`, resizes it to `width x height` and writes it to `dst`.
    ///
    /// # Errors
    /// [`OicocoError::MissingFile`] when `src` does not exist,
    /// [`OicocoError::InvalidArgument`] for a zero target size (nothing is
    /// written), [`OicocoError::ImageCodec`] when it cannot be decoded or
    /// encoded.
    fn resize_and_save(
        &self,
        src: &Path,
        dst: &Path,
        width: u32,
        height: u32,
    ) -> Result<(), OicocoError>;
}

/// [`ImageStore`] over the local file system.
///
/// Dimensions come from the file header via `imagesize`, without decoding
/// pixels. Resizing decodes with `image`, converts to RGB, scales with a
/// bilinear filter and writes JPEG at [`JPEG_QUALITY`] for `.jpg`/`.jpeg`
/// targets (other extensions use the format the extension implies).
#[derive(Clone, Copy, Debug, Default)]
pub struct FsImageStore;

impl ImageStore for FsImageStore {
    fn dimensions(
        &self,
        file_name: &str,
        candidate_dirs: &[PathBuf],
    ) -> Result<(u32, u32), OicocoError> {
        for dir in candidate_dirs {
            let path = dir.join(file_name);
            if path.is_file() {
                return read_image_dimensions(&path);
            }
        }
        Err(OicocoError::ImageNotFound {
            file_name: file_name.to_string(),
            searched: candidate_dirs
                .iter()
                .map(|d| d.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    fn resize_and_save(
        &self,
        src: &Path,
        dst: &Path,
        width: u32,
        height: u32,
    ) -> Result<(), OicocoError> {
        if !src.is_file() {
            return Err(OicocoError::MissingFile {
                path: src.to_path_buf(),
            });
        }
        if width == 0 || height == 0 {
            return Err(OicocoError::InvalidArgument {
                message: format!(
                    "{} would be resized to {}x{}",
                    src.display(),
                    width,
                    height
                ),
            });
        }
        let decoded = ImageReader::open(src)
            .map_err(OicocoError::Io)?
            .with_guessed_format()
            .map_err(OicocoError::Io)?
            .decode()
            .map_err(codec_error(src))?;
        let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());
        let resized = rgb.resize_exact(width, height, FilterType::Triangle);

        if is_jpeg_path(dst) {
            let writer = BufWriter::new(File::create(dst).map_err(OicocoError::Io)?);
            let encoder = JpegEncoder::new_with_quality(writer, JPEG_QUALITY);
            resized.write_with_encoder(encoder).map_err(codec_error(dst))
        } else {
            resized.save(dst).map_err(codec_error(dst))
        }
    }
}

fn codec_error(path: &Path) -> impl FnOnce(image::ImageError) -> OicocoError {
    let path = path.to_path_buf();
    move |source| OicocoError::ImageCodec { path, source }
}

fn is_jpeg_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
        .unwrap_or(false)
}

fn read_image_dimensions(path: &Path) -> Result<(u32, u32), OicocoError> {
    let size = imagesize::size(path).map_err(|source| OicocoError::ImageDimensionRead {
        path: path.to_path_buf(),
        source,
    })?;

    let overflow = || OicocoError::ImageDimensionOverflow {
        path: path.to_path_buf(),
    };
    let width: u32 = size.width.try_into().map_err(|_| overflow())?;
    let height: u32 = size.height.try_into().map_err(|_| overflow())?;
    Ok((width, height))
}

/// What [`copy_images`] does when no source directory holds an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MissingSourcePolicy {
    /// Log and continue with the next image.
    #[default]
    Skip,
    /// Abort the copy with [`OicocoError::ImageNotFound`].
    Require,
}

/// Outcome of a [`copy_images`] run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CopyReport {
    pub copied: usize,
    /// File names that were found in none of the source directories.
    pub missing: Vec<String>,
}

/// Copies the file of every image in `dataset` from the first of
/// `source_dirs` that holds it into `dest_dir`.
pub fn copy_images(
    dataset: &Dataset,
    source_dirs: &[PathBuf],
    dest_dir: &Path,
    policy: MissingSourcePolicy,
) -> Result<CopyReport, OicocoError> {
    for dir in source_dirs.iter().map(PathBuf::as_path).chain([dest_dir]) {
        if !dir.is_dir() {
            return Err(OicocoError::MissingDirectory {
                path: dir.to_path_buf(),
            });
        }
    }

    let mut report = CopyReport::default();
    for image in &dataset.images {
        let found = source_dirs
            .iter()
            .map(|dir| dir.join(&image.file_name))
            .find(|path| path.is_file());

        match found {
            Some(src) => {
                fs::copy(&src, dest_dir.join(&image.file_name)).map_err(OicocoError::Io)?;
                report.copied += 1;
            }
            None if policy == MissingSourcePolicy::Require => {
                return Err(OicocoError::ImageNotFound {
                    file_name: image.file_name.clone(),
                    searched: source_dirs
                        .iter()
                        .map(|d| d.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", "),
                });
            }
            None => {
                tracing::warn!(file = %image.file_name, "image not found in any source directory, skipping");
                report.missing.push(image.file_name.clone());
            }
        }
    }

    tracing::info!(
        copied = report.copied,
        missing = report.missing.len(),
        dest = %dest_dir.display(),
        "copied dataset images"
    );
    Ok(report)
}
