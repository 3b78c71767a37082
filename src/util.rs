//! Byte decoding and media format detection helpers.

use std::borrow::Cow;

/// Decode bytes to a string, handling various encodings.
///
/// This function:
/// 1. First tries UTF-8 (handles BOM automatically via encoding_rs)
/// 2. If malformed, tries the hint encoding (from `<?xml encoding="..."?>`)
/// 3. Falls back to Windows-1252 (common in old ebooks)
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);

    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    // Fallback: Windows-1252 (superset of ISO-8859-1)
    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Extract encoding from an XML declaration.
///
/// Parses `<?xml ... encoding="..." ?>` within the first ~100 bytes and
/// returns the encoding name if found.
pub fn extract_xml_encoding(bytes: &[u8]) -> Option<&str> {
    let check_len = bytes.len().min(100);
    let prefix = &bytes[..check_len];

    let xml_start = prefix.windows(5).position(|w| w == b"<?xml")?;
    let after_xml = &prefix[xml_start..];

    let enc_pos = after_xml
        .windows(9)
        .position(|w| w.eq_ignore_ascii_case(b"encoding="))?;
    let after_enc = &after_xml[enc_pos + 9..];

    if after_enc.is_empty() {
        return None;
    }

    let quote = after_enc[0];
    if quote != b'"' && quote != b'\'' {
        return None;
    }

    let value_start = 1;
    let value_end = after_enc[value_start..].iter().position(|&b| b == quote)? + value_start;

    std::str::from_utf8(&after_enc[value_start..value_end]).ok()
}

/// Detected media format for binary container resources.
///
/// Detection is done via mime type string or magic bytes; container parts
/// carry no file paths, so there is no extension to inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFormat {
    /// JPEG image
    Jpeg,
    /// PNG image
    Png,
    /// GIF image
    Gif,
    /// SVG image (vector)
    Svg,
    /// TrueType font
    Ttf,
    /// OpenType font
    Otf,
    /// Unknown/binary format
    Binary,
}

impl MediaFormat {
    /// Conventional file extension for resolver-assigned resource names.
    pub fn extension(self) -> &'static str {
        match self {
            MediaFormat::Jpeg => "jpg",
            MediaFormat::Png => "png",
            MediaFormat::Gif => "gif",
            MediaFormat::Svg => "svg",
            MediaFormat::Ttf => "ttf",
            MediaFormat::Otf => "otf",
            MediaFormat::Binary => "bin",
        }
    }

    /// Check if this format represents an image.
    pub fn is_image(self) -> bool {
        matches!(
            self,
            MediaFormat::Jpeg | MediaFormat::Png | MediaFormat::Gif | MediaFormat::Svg
        )
    }

    /// Check if this format represents a font.
    pub fn is_font(self) -> bool {
        matches!(self, MediaFormat::Ttf | MediaFormat::Otf)
    }
}

/// Detect media format from a mime type string and/or raw bytes.
///
/// Tries the mime type first, then falls back to magic bytes.
pub fn detect_media_format(mime: &str, data: &[u8]) -> MediaFormat {
    match mime.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => return MediaFormat::Jpeg,
        "image/png" => return MediaFormat::Png,
        "image/gif" => return MediaFormat::Gif,
        "image/svg+xml" => return MediaFormat::Svg,
        "font/ttf" | "application/x-font-ttf" | "application/x-font-truetype" => {
            return MediaFormat::Ttf;
        }
        "font/otf" | "application/vnd.ms-opentype" | "application/x-font-opentype" => {
            return MediaFormat::Otf;
        }
        _ => {}
    }

    if data.len() >= 4 {
        // JPEG: FF D8
        if data[0] == 0xFF && data[1] == 0xD8 {
            return MediaFormat::Jpeg;
        }
        // PNG: 89 50 4E 47 (.PNG)
        if data[0] == 0x89 && data[1] == 0x50 && data[2] == 0x4E && data[3] == 0x47 {
            return MediaFormat::Png;
        }
        // GIF: 47 49 46 (GIF)
        if data[0] == 0x47 && data[1] == 0x49 && data[2] == 0x46 {
            return MediaFormat::Gif;
        }
        // TrueType: 00 01 00 00
        if data[0] == 0x00 && data[1] == 0x01 && data[2] == 0x00 && data[3] == 0x00 {
            return MediaFormat::Ttf;
        }
        // OpenType: "OTTO"
        if &data[..4] == b"OTTO" {
            return MediaFormat::Otf;
        }
    }

    MediaFormat::Binary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_utf8() {
        assert_eq!(decode_text("héllo".as_bytes(), None), "héllo");
    }

    #[test]
    fn test_decode_text_cp1252_fallback() {
        // 0xE9 is é in Windows-1252 but malformed UTF-8
        let bytes = b"caf\xe9";
        assert_eq!(decode_text(bytes, None), "café");
    }

    #[test]
    fn test_decode_text_with_hint() {
        let bytes = b"caf\xe9";
        assert_eq!(decode_text(bytes, Some("iso-8859-1")), "café");
    }

    #[test]
    fn test_extract_xml_encoding() {
        let bytes = b"<?xml version=\"1.0\" encoding=\"utf-8\"?><html/>";
        assert_eq!(extract_xml_encoding(bytes), Some("utf-8"));

        let bytes = b"<html><body>no declaration</body></html>";
        assert_eq!(extract_xml_encoding(bytes), None);
    }

    #[test]
    fn test_detect_media_format_by_mime() {
        assert_eq!(detect_media_format("image/jpeg", &[]), MediaFormat::Jpeg);
        assert_eq!(detect_media_format("image/png", &[]), MediaFormat::Png);
        assert_eq!(detect_media_format("font/otf", &[]), MediaFormat::Otf);
        assert_eq!(
            detect_media_format("application/octet-stream", &[]),
            MediaFormat::Binary
        );
    }

    #[test]
    fn test_detect_media_format_by_magic_bytes() {
        let jpeg_data = [0xFF, 0xD8, 0xFF, 0xE0];
        assert_eq!(
            detect_media_format("application/octet-stream", &jpeg_data),
            MediaFormat::Jpeg
        );

        let png_data = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(detect_media_format("", &png_data), MediaFormat::Png);

        assert_eq!(detect_media_format("", b"OTTO\x00\x01"), MediaFormat::Otf);
    }

    #[test]
    fn test_media_format_classification() {
        assert!(MediaFormat::Jpeg.is_image());
        assert!(!MediaFormat::Ttf.is_image());
        assert!(MediaFormat::Ttf.is_font());
        assert!(MediaFormat::Otf.is_font());
        assert!(!MediaFormat::Binary.is_font());
    }
}
