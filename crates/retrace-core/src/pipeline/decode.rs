//! Image decoding: the pixel source the extractor depends on.

use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;
use std::path::Path;

use crate::config::LimitsConfig;
use crate::error::{PipelineError, PipelineResult};

/// Result of decoding an image.
#[derive(Debug)]
pub struct DecodedImage {
    /// The decoded image data
    pub image: DynamicImage,
    /// Detected image format
    pub format: ImageFormat,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Original file size in bytes
    pub file_size: u64,
}

/// Source of pixel data for a path.
///
/// `read` and `decode_bytes` are split so a caller that also needs the raw
/// bytes (for a file checksum) reads the file once.
pub trait ImageSource: Send + Sync {
    /// Read the raw bytes of `path`, applying size limits.
    fn read(&self, path: &Path) -> PipelineResult<Vec<u8>>;

    /// Decode bytes previously read from `path`.
    fn decode_bytes(&self, bytes: &[u8], path: &Path) -> PipelineResult<DecodedImage>;

    /// Read and decode `path`.
    fn decode(&self, path: &Path) -> PipelineResult<DecodedImage> {
        let bytes = self.read(path)?;
        self.decode_bytes(&bytes, path)
    }
}

/// Decodes files from the local filesystem with the `image` crate.
#[derive(Debug, Clone)]
pub struct FileImageSource {
    limits: LimitsConfig,
}

impl FileImageSource {
    /// Create a new source with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }
}

impl ImageSource for FileImageSource {
    fn read(&self, path: &Path) -> PipelineResult<Vec<u8>> {
        if !path.exists() {
            return Err(PipelineError::FileNotFound(path.to_path_buf()));
        }

        let metadata = std::fs::metadata(path)
            .map_err(|e| PipelineError::decode(path, format!("Cannot read metadata: {e}")))?;
        let max_bytes = self.limits.max_file_size_mb * 1024 * 1024;
        if metadata.len() > max_bytes {
            return Err(PipelineError::FileTooLarge {
                path: path.to_path_buf(),
                size_mb: metadata.len() / (1024 * 1024),
                max_mb: self.limits.max_file_size_mb,
            });
        }

        std::fs::read(path)
            .map_err(|e| PipelineError::decode(path, format!("Cannot read file: {e}")))
    }

    fn decode_bytes(&self, bytes: &[u8], path: &Path) -> PipelineResult<DecodedImage> {
        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| PipelineError::decode(path, format!("Cannot detect image format: {e}")))?;

        // Content sniffing wins over the extension; the extension is only a fallback.
        let format = match reader.format() {
            Some(f) => f,
            None => ImageFormat::from_path(path).map_err(|_| PipelineError::UnsupportedFormat {
                path: path.to_path_buf(),
                format: path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("unknown")
                    .to_string(),
            })?,
        };

        let image = reader
            .decode()
            .map_err(|e| PipelineError::decode(path, e.to_string()))?;

        let (width, height) = image.dimensions();
        if width > self.limits.max_image_dimension || height > self.limits.max_image_dimension {
            return Err(PipelineError::ImageTooLarge {
                path: path.to_path_buf(),
                width,
                height,
                max_dim: self.limits.max_image_dimension,
            });
        }

        Ok(DecodedImage {
            image,
            format,
            width,
            height,
            file_size: bytes.len() as u64,
        })
    }
}

/// Convert an ImageFormat to a string representation.
pub fn format_to_string(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "jpeg".to_string(),
        ImageFormat::Png => "png".to_string(),
        ImageFormat::WebP => "webp".to_string(),
        ImageFormat::Gif => "gif".to_string(),
        ImageFormat::Tiff => "tiff".to_string(),
        ImageFormat::Bmp => "bmp".to_string(),
        ImageFormat::Avif => "avif".to_string(),
        _ => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> std::path::PathBuf {
        let path = dir.join(name);
        DynamicImage::new_rgb8(width, height)
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();
        path
    }

    #[test]
    fn test_format_to_string() {
        assert_eq!(format_to_string(ImageFormat::Jpeg), "jpeg");
        assert_eq!(format_to_string(ImageFormat::Png), "png");
        assert_eq!(format_to_string(ImageFormat::WebP), "webp");
    }

    #[test]
    fn test_decode_reports_dimensions_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "a.png", 40, 20);
        let decoded = FileImageSource::new(LimitsConfig::default())
            .decode(&path)
            .unwrap();
        assert_eq!((decoded.width, decoded.height), (40, 20));
        assert_eq!(decoded.format, ImageFormat::Png);
        assert_eq!(decoded.file_size, std::fs::metadata(&path).unwrap().len());

        let shown = format!("{decoded:?}");
        assert!(shown.contains("Png"));
        assert!(shown.contains("width: 40"));
    }

    #[test]
    fn test_format_detected_by_content() {
        // A PNG with a .jpg extension is still decoded as PNG
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "misnamed.png", 8, 8);
        let misnamed = dir.path().join("misnamed.jpg");
        std::fs::rename(&path, &misnamed).unwrap();

        let decoded = FileImageSource::new(LimitsConfig::default())
            .decode(&misnamed)
            .unwrap();
        assert_eq!(decoded.format, ImageFormat::Png);
    }

    #[test]
    fn test_missing_file() {
        let err = FileImageSource::new(LimitsConfig::default())
            .decode(Path::new("/nonexistent/photo.jpg"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::FileNotFound(_)));
    }

    #[test]
    fn test_dimension_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "big.png", 64, 8);
        let limits = LimitsConfig {
            max_image_dimension: 32,
            ..LimitsConfig::default()
        };
        let err = FileImageSource::new(limits).decode(&path).unwrap_err();
        assert!(matches!(err, PipelineError::ImageTooLarge { width: 64, .. }));
    }

    #[test]
    fn test_unknown_bytes_are_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.xyz");
        std::fs::write(&path, b"plain text, not pixels").unwrap();
        let err = FileImageSource::new(LimitsConfig::default())
            .decode(&path)
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedFormat { .. }));
    }
}
