//! Image files to frames.
//!
//! Decoding is slow and runs on the caller's thread before a frame reaches
//! the session. [`TiffDecoder`] reads whatever the `image` crate reads
//! (TIFF, PNG, BMP with the default features), scales to the panel and
//! converts to 16-bit luma.

use std::path::Path;

use image::imageops::FilterType;
use image::{ImageDecoder, ImageError, ImageReader};
use serde::Serialize;

use crate::error::{Result, SlmError};
use crate::frame::Frame;

/// Header information of an image file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    /// Columns.
    pub width: u32,
    /// Rows.
    pub height: u32,
    /// Bits per pixel across all channels.
    pub bits_per_pixel: u16,
}

/// Reads image files into frames.
pub trait FrameDecoder {
    /// Header of `path` without decoding pixels.
    ///
    /// # Errors
    ///
    /// [`SlmError::Io`], [`SlmError::Decode`].
    fn info(&self, path: &Path) -> Result<ImageInfo>;

    /// Decode `path` and scale it to `width` × `height`.
    ///
    /// # Errors
    ///
    /// [`SlmError::Io`], [`SlmError::Decode`].
    fn decode(&self, path: &Path, width: u32, height: u32) -> Result<Frame>;
}

/// [`FrameDecoder`] backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct TiffDecoder;

impl TiffDecoder {
    /// New decoder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl FrameDecoder for TiffDecoder {
    fn info(&self, path: &Path) -> Result<ImageInfo> {
        let reader = ImageReader::open(path)
            .and_then(ImageReader::with_guessed_format)
            .map_err(|source| SlmError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let decoder = reader.into_decoder().map_err(|e| image_error(path, e))?;
        let (width, height) = decoder.dimensions();
        Ok(ImageInfo {
            width,
            height,
            bits_per_pixel: decoder.color_type().bits_per_pixel(),
        })
    }

    fn decode(&self, path: &Path, width: u32, height: u32) -> Result<Frame> {
        let mut image = image::open(path).map_err(|e| image_error(path, e))?;
        if image.width() != width || image.height() != height {
            tracing::debug!(
                path = %path.display(),
                from_w = image.width(),
                from_h = image.height(),
                width,
                height,
                "scaling image"
            );
            image = image.resize_exact(width, height, FilterType::Triangle);
        }
        Frame::new(width, height, image.into_luma16().into_raw())
    }
}

fn image_error(path: &Path, error: ImageError) -> SlmError {
    match error {
        ImageError::IoError(source) => SlmError::Io {
            path: path.to_path_buf(),
            source,
        },
        other => SlmError::Decode {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma};

    fn write_gradient(dir: &Path, name: &str, width: u32, height: u32) -> std::path::PathBuf {
        let path = dir.join(name);
        let image: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_fn(width, height, |x, _| Luma([u16::try_from(x * 1000).unwrap()]));
        image.save(&path).unwrap();
        path
    }

    #[test]
    fn info_reports_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_gradient(dir.path(), "gradient.tiff", 8, 4);
        let info = TiffDecoder.info(&path).unwrap();
        assert_eq!(
            info,
            ImageInfo {
                width: 8,
                height: 4,
                bits_per_pixel: 16
            }
        );
    }

    #[test]
    fn decode_at_native_size_keeps_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_gradient(dir.path(), "gradient.tiff", 8, 4);
        let frame = TiffDecoder.decode(&path, 8, 4).unwrap();
        assert_eq!(frame.len(), 32);
        assert_eq!(frame.get(3, 2), Some(3000));
    }

    #[test]
    fn decode_scales_to_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_gradient(dir.path(), "gradient.png", 8, 4);
        let frame = TiffDecoder.decode(&path, 4, 2).unwrap();
        assert_eq!((frame.width(), frame.height()), (4, 2));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = TiffDecoder
            .decode(Path::new("/nonexistent/none.tiff"), 4, 4)
            .unwrap_err();
        assert!(matches!(err, SlmError::Io { .. }));
    }

    #[test]
    fn garbage_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.tiff");
        std::fs::write(&path, b"not an image at all").unwrap();
        let err = TiffDecoder.decode(&path, 4, 4).unwrap_err();
        assert!(matches!(err, SlmError::Decode { .. }));
    }
}
