use image::{DynamicImage, ImageFormat};
use khatt_core::{ImageKind, ImageUpload};
use std::io::Cursor;
use thiserror::Error;

/// Longest side sent to the model. Larger scans are downscaled.
pub const MAX_DIMENSION: u32 = 3072;

#[derive(Debug, Error)]
pub enum PrepareError {
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Failed to encode resized image: {0}")]
    Encode(String),
}

/// Image bytes ready to be inlined into a model request.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub file_name: String,
    pub kind: ImageKind,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Decode a validated upload to confirm it is intact, downscaling when it
/// exceeds [`MAX_DIMENSION`].
pub fn prepare_for_extraction(
    upload: &ImageUpload,
    kind: ImageKind,
) -> Result<PreparedImage, PrepareError> {
    let format = match kind {
        ImageKind::Jpeg => ImageFormat::Jpeg,
        ImageKind::Png => ImageFormat::Png,
    };
    let img = image::load_from_memory_with_format(&upload.bytes, format)?;

    if img.width() <= MAX_DIMENSION && img.height() <= MAX_DIMENSION {
        return Ok(PreparedImage {
            file_name: upload.file_name.clone(),
            kind,
            bytes: upload.bytes.clone(),
            width: img.width(),
            height: img.height(),
        });
    }

    let resized = img.resize(MAX_DIMENSION, MAX_DIMENSION, image::imageops::FilterType::Lanczos3);
    let bytes = encode_as_jpeg(&resized)?;
    Ok(PreparedImage {
        file_name: upload.file_name.clone(),
        kind: ImageKind::Jpeg,
        bytes,
        width: resized.width(),
        height: resized.height(),
    })
}

fn encode_as_jpeg(img: &DynamicImage) -> Result<Vec<u8>, PrepareError> {
    let mut buf = Vec::new();
    // JPEG has no alpha channel.
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .map_err(|e| PrepareError::Encode(e.to_string()))?;
    Ok(buf)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{GrayImage, ImageBuffer, Luma};

    pub(crate) fn gray_png(width: u32, height: u32) -> Vec<u8> {
        let img: GrayImage = ImageBuffer::from_fn(width, height, |x, _| Luma([(x % 256) as u8]));
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn small_image_passes_through_unchanged() {
        let png = gray_png(8, 4);
        let upload = ImageUpload::new("p.png", "image/png", png.clone());
        let prepared = prepare_for_extraction(&upload, ImageKind::Png).unwrap();
        assert_eq!(prepared.kind, ImageKind::Png);
        assert_eq!(prepared.bytes, png);
        assert_eq!((prepared.width, prepared.height), (8, 4));
        assert_eq!(prepared.file_name, "p.png");
    }

    #[test]
    fn oversized_image_is_downscaled_to_jpeg() {
        let upload = ImageUpload::new("wide.png", "image/png", gray_png(3600, 40));
        let prepared = prepare_for_extraction(&upload, ImageKind::Png).unwrap();
        assert_eq!(prepared.kind, ImageKind::Jpeg);
        assert!(prepared.width <= MAX_DIMENSION && prepared.height <= MAX_DIMENSION);
        assert_eq!(ImageKind::sniff(&prepared.bytes), Some(ImageKind::Jpeg));
    }

    #[test]
    fn truncated_image_fails_to_decode() {
        let mut png = gray_png(16, 16);
        png.truncate(24);
        let upload = ImageUpload::new("cut.png", "image/png", png);
        assert!(matches!(
            prepare_for_extraction(&upload, ImageKind::Png),
            Err(PrepareError::Decode(_))
        ));
    }
}
