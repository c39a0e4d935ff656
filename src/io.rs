use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::tga::TgaEncoder;
use image::codecs::tiff::TiffEncoder;
use image::{ColorType, DynamicImage, ImageEncoder, ImageError, RgbaImage};
use rfd::FileDialog;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::canvas::PixelBuffer;
use crate::error::{RedactError, Result};

/// File name offered when downloading the redacted image.
pub const DEFAULT_EXPORT_FILENAME: &str = "redacted-image.png";

/// Extensions accepted from the file picker, drag-and-drop and clipboard
/// paths (lowercase).
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "webp", "bmp", "gif", "tga", "tiff", "tif", "ico",
];

/// Check if a file extension is a supported image format.
pub fn is_supported_extension(ext: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str())
}

// ============================================================================
// INGESTION — every source is normalised to a DecodedImage
// ============================================================================

/// Decoded pixels as handed to the editing core.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA8.
    pub rgba: Vec<u8>,
}

impl DecodedImage {
    pub fn from_rgba_image(img: RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            rgba: img.into_raw(),
        }
    }

    pub fn into_buffer(self) -> Result<PixelBuffer> {
        PixelBuffer::from_rgba(self.width, self.height, self.rgba)
    }
}

/// Decode in-memory file contents. Data that is not recognisably an image is
/// rejected; an image that fails to decode is a decode failure.
pub fn decode_image_bytes(bytes: &[u8]) -> Result<DecodedImage> {
    if bytes.is_empty() {
        return Err(RedactError::InputRejected("empty input".to_string()));
    }
    let format = image::guess_format(bytes)
        .map_err(|_| RedactError::InputRejected("unrecognised file contents".to_string()))?;
    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| RedactError::DecodeFailed(e.to_string()))?;
    let decoded = DecodedImage::from_rgba_image(img.to_rgba8());
    if decoded.width == 0 || decoded.height == 0 {
        return Err(RedactError::DecodeFailed("image has zero size".to_string()));
    }
    Ok(decoded)
}

/// Read and decode an image file. The extension is checked first so that
/// obviously foreign files are rejected without being read.
pub fn load_image_file(path: &Path) -> Result<DecodedImage> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    if !is_supported_extension(ext) {
        return Err(RedactError::InputRejected(format!(
            "'{}' is not a supported image file",
            path.display()
        )));
    }
    let bytes = std::fs::read(path)?;
    decode_image_bytes(&bytes)
}

// ============================================================================
// EXPORT
// ============================================================================

/// Download formats. PNG is the lossless default.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg {
        quality: u8,
    },
    Bmp,
    Tga,
    Tiff,
}

pub const DEFAULT_JPEG_QUALITY: u8 = 90;

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg { .. } => "jpg",
            ExportFormat::Bmp => "bmp",
            ExportFormat::Tga => "tga",
            ExportFormat::Tiff => "tiff",
        }
    }

    /// Format for a name such as `png` or `jpeg`; `None` if unknown.
    pub fn from_name(name: &str, jpeg_quality: u8) -> Option<Self> {
        match name.trim().trim_start_matches('.').to_lowercase().as_str() {
            "png" => Some(ExportFormat::Png),
            "jpg" | "jpeg" => Some(ExportFormat::Jpeg {
                quality: jpeg_quality.clamp(1, 100),
            }),
            "bmp" => Some(ExportFormat::Bmp),
            "tga" => Some(ExportFormat::Tga),
            "tiff" | "tif" => Some(ExportFormat::Tiff),
            _ => None,
        }
    }

    /// Infer from a path's extension; `None` when it names no export format.
    pub fn from_path(path: &Path, jpeg_quality: u8) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| Self::from_name(e, jpeg_quality))
    }
}

fn encode_err(e: ImageError) -> RedactError {
    RedactError::Encode(e.to_string())
}

/// Encode an RGBA image in the requested format.
pub fn encode_image(image: &RgbaImage, format: ExportFormat) -> Result<Vec<u8>> {
    let (w, h) = image.dimensions();
    let mut out = Vec::new();

    match format {
        ExportFormat::Png => {
            PngEncoder::new(&mut out)
                .write_image(image.as_raw(), w, h, ColorType::Rgba8)
                .map_err(encode_err)?;
        }
        ExportFormat::Jpeg { quality } => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
                .write_image(rgb.as_raw(), w, h, ColorType::Rgb8)
                .map_err(encode_err)?;
        }
        ExportFormat::Bmp => {
            BmpEncoder::new(&mut out)
                .write_image(image.as_raw(), w, h, ColorType::Rgba8)
                .map_err(encode_err)?;
        }
        ExportFormat::Tga => {
            TgaEncoder::new(&mut out)
                .write_image(image.as_raw(), w, h, ColorType::Rgba8)
                .map_err(encode_err)?;
        }
        ExportFormat::Tiff => {
            let mut cursor = Cursor::new(&mut out);
            TiffEncoder::new(&mut cursor)
                .write_image(image.as_raw(), w, h, ColorType::Rgba8)
                .map_err(encode_err)?;
        }
    }

    Ok(out)
}

/// Export `buffer` and write it to `path`.
pub fn write_export(buffer: &PixelBuffer, path: &Path, format: ExportFormat) -> Result<()> {
    let bytes = buffer.export(format)?;
    std::fs::write(path, &bytes)?;
    log::info!("Exported {} bytes ({:?}) to {}", bytes.len(), format, path.display());
    Ok(())
}

// ============================================================================
// NATIVE DIALOGS
// ============================================================================

/// Show native file dialog to pick an image to redact.
pub fn pick_image_path() -> Option<PathBuf> {
    FileDialog::new()
        .add_filter("Images", SUPPORTED_EXTENSIONS)
        .add_filter("All Files", &["*"])
        .pick_file()
}

/// Show native save dialog for the export, prefilled with `file_name`.
pub fn pick_export_path(file_name: &str) -> Option<PathBuf> {
    FileDialog::new()
        .set_file_name(file_name)
        .add_filter("PNG", &["png"])
        .add_filter("JPEG", &["jpg", "jpeg"])
        .add_filter("BMP", &["bmp"])
        .add_filter("TGA", &["tga"])
        .add_filter("TIFF", &["tiff", "tif"])
        .save_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 7, 200]));
        encode_image(&img, ExportFormat::Png).unwrap()
    }

    #[test]
    fn png_bytes_decode_to_rgba() {
        let decoded = decode_image_bytes(&png_bytes(5, 3)).unwrap();
        assert_eq!((decoded.width, decoded.height), (5, 3));
        assert_eq!(&decoded.rgba[0..4], &[0, 0, 7, 200]);
    }

    #[test]
    fn text_is_rejected_not_decode_failure() {
        let err = decode_image_bytes(b"hello, this is not an image").unwrap_err();
        assert!(matches!(err, RedactError::InputRejected(_)));
        assert!(matches!(
            decode_image_bytes(&[]),
            Err(RedactError::InputRejected(_))
        ));
    }

    #[test]
    fn truncated_png_is_decode_failure() {
        let mut bytes = png_bytes(16, 16);
        bytes.truncate(40);
        assert!(matches!(
            decode_image_bytes(&bytes),
            Err(RedactError::DecodeFailed(_))
        ));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = load_image_file(Path::new("notes.txt")).unwrap_err();
        assert!(matches!(err, RedactError::InputRejected(_)));
    }

    #[test]
    fn format_inference_from_extension() {
        assert_eq!(
            ExportFormat::from_path(Path::new("a/b.JPG"), 80),
            Some(ExportFormat::Jpeg { quality: 80 })
        );
        assert_eq!(ExportFormat::from_path(Path::new("out.tif"), 90), Some(ExportFormat::Tiff));
        assert_eq!(ExportFormat::from_path(Path::new("out"), 90), None);
        assert_eq!(ExportFormat::from_path(Path::new("out.webp"), 90), None);
        assert_eq!(ExportFormat::default(), ExportFormat::Png);
        assert_eq!(ExportFormat::from_name("gif", 90), None);
    }

    #[test]
    fn every_format_encodes() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
        for format in [
            ExportFormat::Png,
            ExportFormat::Jpeg { quality: 90 },
            ExportFormat::Bmp,
            ExportFormat::Tga,
            ExportFormat::Tiff,
        ] {
            let bytes = encode_image(&img, format).unwrap();
            assert!(!bytes.is_empty(), "{:?}", format);
        }
    }
}
