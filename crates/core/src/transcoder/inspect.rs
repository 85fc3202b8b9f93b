//! Byte-level source sniffing.

use super::types::SourceFormat;

const PNG_MAGIC: [u8; 4] = [0x89, 0x50, 0x4E, 0x47];
const PNG_TRAILER: [u8; 8] = [0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82];
const WEBP_TAG: &[u8; 4] = b"WEBP";

/// Identifies the container from its leading bytes.
pub fn detect_format(bytes: &[u8]) -> Option<SourceFormat> {
    if bytes.len() >= 4 && bytes[..4] == PNG_MAGIC {
        return Some(SourceFormat::Png);
    }
    if bytes.len() >= 12 && &bytes[8..12] == WEBP_TAG {
        return Some(SourceFormat::Webp);
    }
    None
}

/// True when the PNG ends with its IEND chunk, i.e. it was not truncated.
pub fn png_trailer_intact(bytes: &[u8]) -> bool {
    bytes.len() >= PNG_TRAILER.len() && bytes[bytes.len() - PNG_TRAILER.len()..] == PNG_TRAILER
}

/// Width and height from the IHDR chunk.
pub fn png_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.len() < 24 || &bytes[12..16] != b"IHDR" {
        return None;
    }
    let width = u32::from_be_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);
    let height = u32::from_be_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]);
    Some((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[test]
    fn test_detect() {
        assert_eq!(detect_format(&fixtures::png_bytes(200)), Some(SourceFormat::Png));
        assert_eq!(detect_format(&fixtures::webp_bytes(200)), Some(SourceFormat::Webp));
        assert_eq!(detect_format(b"GIF89a......"), None);
        assert_eq!(detect_format(b""), None);
    }

    #[test]
    fn test_png_trailer() {
        let png = fixtures::png_bytes(200);
        assert!(png_trailer_intact(&png));
        assert!(!png_trailer_intact(&png[..png.len() - 3]));
    }

    #[test]
    fn test_png_dimensions() {
        let png = fixtures::png_bytes(200);
        assert_eq!(png_dimensions(&png), Some((512, 512)));
        assert_eq!(png_dimensions(&png[..10]), None);
    }
}
