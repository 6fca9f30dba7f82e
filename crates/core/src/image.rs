use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_IMAGES_PER_BATCH: usize = 40;
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ImageStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl ImageStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ImageStatus::Completed | ImageStatus::Error)
    }
}

impl std::fmt::Display for ImageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageStatus::Pending => write!(f, "pending"),
            ImageStatus::Processing => write!(f, "processing"),
            ImageStatus::Completed => write!(f, "completed"),
            ImageStatus::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for ImageStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ImageStatus::Pending),
            "processing" => Ok(ImageStatus::Processing),
            "completed" => Ok(ImageStatus::Completed),
            "error" => Ok(ImageStatus::Error),
            other => Err(format!("Unknown image status: '{other}'")),
        }
    }
}

/// The two image encodings the extraction model is fed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
        }
    }

    /// Accepts `image/jpg` as browsers sometimes report it.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(ImageKind::Jpeg),
            "image/png" => Some(ImageKind::Png),
            _ => None,
        }
    }

    pub fn from_extension(file_name: &str) -> Option<Self> {
        let ext = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(ImageKind::Jpeg),
            "png" => Some(ImageKind::Png),
            _ => None,
        }
    }

    /// Sniff the encoding from the leading magic bytes.
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageKind::Jpeg)
        } else if data.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(ImageKind::Png)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IntakeError {
    #[error("{file_name}: unsupported file type '{mime}' (JPEG or PNG only)")]
    UnsupportedType { file_name: String, mime: String },
    #[error("{file_name}: content is not a JPEG or PNG image")]
    ContentMismatch { file_name: String },
    #[error("{file_name}: {size} bytes exceeds the {max} byte limit", max = MAX_IMAGE_BYTES)]
    TooLarge { file_name: String, size: usize },
    #[error("{file_name}: file is empty")]
    Empty { file_name: String },
    #[error("{file_name}: batch already holds {max} images", max = MAX_IMAGES_PER_BATCH)]
    BatchFull { file_name: String },
}

/// An uploaded image file as received from the user.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Check type and size, returning the verified encoding.
    ///
    /// An empty or generic declared type (`application/octet-stream`) falls
    /// back to the file extension.
    pub fn validate(&self) -> Result<ImageKind, IntakeError> {
        let file_name = self.file_name.clone();
        if self.bytes.is_empty() {
            return Err(IntakeError::Empty { file_name });
        }
        if self.bytes.len() > MAX_IMAGE_BYTES {
            return Err(IntakeError::TooLarge { file_name, size: self.bytes.len() });
        }

        let declared = match ImageKind::from_mime(&self.mime_type) {
            Some(kind) => kind,
            None if is_generic_mime(&self.mime_type) => ImageKind::from_extension(&self.file_name)
                .ok_or_else(|| IntakeError::UnsupportedType {
                    file_name: file_name.clone(),
                    mime: self.mime_type.clone(),
                })?,
            None => {
                return Err(IntakeError::UnsupportedType {
                    file_name,
                    mime: self.mime_type.clone(),
                })
            }
        };

        match ImageKind::sniff(&self.bytes) {
            Some(actual) if actual == declared => Ok(actual),
            _ => Err(IntakeError::ContentMismatch { file_name }),
        }
    }
}

fn is_generic_mime(mime: &str) -> bool {
    let mime = mime.trim();
    mime.is_empty() || mime.eq_ignore_ascii_case("application/octet-stream")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG_HEADER: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F'];

    #[test]
    fn status_roundtrip_and_terminal() {
        for s in [
            ImageStatus::Pending,
            ImageStatus::Processing,
            ImageStatus::Completed,
            ImageStatus::Error,
        ] {
            assert_eq!(ImageStatus::from_str(&s.to_string()).unwrap(), s);
        }
        assert!(ImageStatus::Completed.is_terminal());
        assert!(ImageStatus::Error.is_terminal());
        assert!(!ImageStatus::Processing.is_terminal());
        assert!(ImageStatus::from_str("done").is_err());
    }

    #[test]
    fn mime_mapping() {
        assert_eq!(ImageKind::from_mime("image/jpg"), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_mime("IMAGE/PNG"), Some(ImageKind::Png));
        assert_eq!(ImageKind::from_mime("image/webp"), None);
    }

    #[test]
    fn valid_png_and_jpeg_pass() {
        let png = ImageUpload::new("a.png", "image/png", PNG_HEADER.to_vec());
        assert_eq!(png.validate(), Ok(ImageKind::Png));
        let jpg = ImageUpload::new("a.jpg", "image/jpeg", JPEG_HEADER.to_vec());
        assert_eq!(jpg.validate(), Ok(ImageKind::Jpeg));
    }

    #[test]
    fn generic_mime_falls_back_to_extension() {
        let up = ImageUpload::new("scan.JPG", "application/octet-stream", JPEG_HEADER.to_vec());
        assert_eq!(up.validate(), Ok(ImageKind::Jpeg));
        let up = ImageUpload::new("scan.gif", "", JPEG_HEADER.to_vec());
        assert!(matches!(up.validate(), Err(IntakeError::UnsupportedType { .. })));
    }

    #[test]
    fn wrong_type_is_rejected() {
        let up = ImageUpload::new("doc.pdf", "application/pdf", b"%PDF-1.7".to_vec());
        assert!(matches!(up.validate(), Err(IntakeError::UnsupportedType { .. })));
    }

    #[test]
    fn mislabelled_content_is_rejected() {
        let up = ImageUpload::new("a.png", "image/png", JPEG_HEADER.to_vec());
        assert!(matches!(up.validate(), Err(IntakeError::ContentMismatch { .. })));
    }

    #[test]
    fn oversize_and_empty_are_rejected() {
        let mut big = PNG_HEADER.to_vec();
        big.resize(MAX_IMAGE_BYTES + 1, 0);
        let up = ImageUpload::new("big.png", "image/png", big);
        assert!(matches!(up.validate(), Err(IntakeError::TooLarge { .. })));

        let up = ImageUpload::new("none.png", "image/png", vec![]);
        assert!(matches!(up.validate(), Err(IntakeError::Empty { .. })));
    }

    #[test]
    fn exactly_max_size_is_allowed() {
        let mut data = PNG_HEADER.to_vec();
        data.resize(MAX_IMAGE_BYTES, 0);
        let up = ImageUpload::new("edge.png", "image/png", data);
        assert_eq!(up.validate(), Ok(ImageKind::Png));
    }
}
