//! Upload validation: extension allow-list, magic-byte sniffing, size cap.

use crate::errors::ValidationError;
use crate::models::moderation::MAX_FILE_SIZE_BYTES;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }
}

/// Identify the image format from its leading bytes.
pub fn sniff(bytes: &[u8]) -> Option<ImageFormat> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(ImageFormat::Jpeg)
    } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some(ImageFormat::Png)
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some(ImageFormat::Gif)
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some(ImageFormat::Webp)
    } else {
        None
    }
}

/// Check an upload. The extension is checked first, then the content must
/// sniff as the same format the extension names, then the size cap applies.
pub fn validate(filename: &str, bytes: &[u8]) -> Result<ImageFormat, ValidationError> {
    let declared = filename
        .rsplit_once('.')
        .and_then(|(_, ext)| ImageFormat::from_extension(ext))
        .ok_or(ValidationError::UnsupportedExtension)?;

    match sniff(bytes) {
        Some(actual) if actual == declared => {}
        _ => return Err(ValidationError::InvalidFormat),
    }

    if bytes.len() > MAX_FILE_SIZE_BYTES {
        return Err(ValidationError::TooLarge);
    }

    Ok(declared)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
    const WEBP: &[u8] = b"RIFF\x24\0\0\0WEBPVP8 ";

    #[test]
    fn test_sniff_known_formats() {
        assert_eq!(sniff(PNG), Some(ImageFormat::Png));
        assert_eq!(sniff(JPEG), Some(ImageFormat::Jpeg));
        assert_eq!(sniff(b"GIF89a\x01\0"), Some(ImageFormat::Gif));
        assert_eq!(sniff(WEBP), Some(ImageFormat::Webp));
        assert_eq!(sniff(b"RIFF\x24\0\0\0WAVE"), None);
        assert_eq!(sniff(b"%PDF-1.7"), None);
        assert_eq!(sniff(&[]), None);
    }

    #[test]
    fn test_validate_accepts_matching_extension() {
        assert_eq!(validate("photo.PNG", PNG), Ok(ImageFormat::Png));
        assert_eq!(validate("a.b.jpeg", JPEG), Ok(ImageFormat::Jpeg));
        assert_eq!(validate("a.jpg", JPEG), Ok(ImageFormat::Jpeg));
        assert_eq!(validate("x.webp", WEBP), Ok(ImageFormat::Webp));
    }

    #[test]
    fn test_validate_rejects_extension_first() {
        assert_eq!(
            validate("notes.txt", PNG),
            Err(ValidationError::UnsupportedExtension)
        );
        assert_eq!(
            validate("png", PNG),
            Err(ValidationError::UnsupportedExtension)
        );
        assert_eq!(validate("", &[]), Err(ValidationError::UnsupportedExtension));
    }

    #[test]
    fn test_validate_requires_content_to_agree() {
        assert_eq!(validate("cat.png", JPEG), Err(ValidationError::InvalidFormat));
        assert_eq!(
            validate("cat.gif", b"not an image"),
            Err(ValidationError::InvalidFormat)
        );
    }

    #[test]
    fn test_validate_size_cap() {
        let mut big = PNG.to_vec();
        big.resize(MAX_FILE_SIZE_BYTES, 0);
        assert_eq!(validate("big.png", &big), Ok(ImageFormat::Png));
        big.push(0);
        assert_eq!(validate("big.png", &big), Err(ValidationError::TooLarge));
    }
}
