//! Encoding resolution.
//!
//! Most content predates Unicode and was authored on Japanese systems, so a
//! file without a byte-order mark is read as the configured legacy encoding
//! (Shift_JIS unless overridden).

use std::path::Path;

use encoding_rs::Encoding;

use crate::config::ParserConfig;
use crate::error::ParseError;

/// Decoded file contents.
#[derive(Debug, Clone)]
pub struct DecodedText {
    pub text: String,
    pub encoding: &'static Encoding,
    /// True if malformed sequences were replaced with U+FFFD.
    pub had_errors: bool,
}

/// Pick an encoding from the leading bytes of a file.
///
/// Only the first four bytes matter. Never fails; an unmarked or empty
/// head yields `legacy`.
pub fn detect_encoding(head: &[u8], legacy: &'static Encoding) -> &'static Encoding {
    match Encoding::for_bom(head) {
        Some((encoding, _)) => encoding,
        None => legacy,
    }
}

/// Decode `bytes`, honouring a byte-order mark and otherwise using `fallback`.
pub fn decode(bytes: &[u8], fallback: &'static Encoding) -> DecodedText {
    decode_as(bytes, detect_encoding(bytes, fallback))
}

/// Decode `bytes` as `encoding`, skipping a matching byte-order mark.
pub fn decode_as(bytes: &[u8], encoding: &'static Encoding) -> DecodedText {
    let (text, had_errors) = encoding.decode_with_bom_removal(bytes);
    DecodedText {
        text: text.into_owned(),
        encoding,
        had_errors,
    }
}

/// Read a whole file into memory.
pub fn read_bytes(path: &Path) -> Result<Vec<u8>, ParseError> {
    std::fs::read(path).map_err(|e| ParseError::from_io(path, e))
}

/// Read and decode a file with byte-order-mark detection.
pub fn read_text(path: &Path, config: &ParserConfig) -> Result<DecodedText, ParseError> {
    let bytes = read_bytes(path)?;
    Ok(decode(&bytes, config.legacy_encoding()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_detects_byte_order_marks() {
        let sjis = encoding_rs::SHIFT_JIS;
        assert_eq!(detect_encoding(b"\xEF\xBB\xBFabc", sjis), encoding_rs::UTF_8);
        assert_eq!(detect_encoding(b"\xFF\xFEa\x00", sjis), encoding_rs::UTF_16LE);
        assert_eq!(detect_encoding(b"\xFE\xFF\x00a", sjis), encoding_rs::UTF_16BE);
        assert_eq!(detect_encoding(b"abcd", sjis), sjis);
        assert_eq!(detect_encoding(b"", sjis), sjis);
    }

    #[test]
    fn test_decode_strips_bom() {
        let decoded = decode(b"\xEF\xBB\xBFRoute.Comment(x)", encoding_rs::SHIFT_JIS);
        assert_eq!(decoded.text, "Route.Comment(x)");
        assert_eq!(decoded.encoding, encoding_rs::UTF_8);
        assert!(!decoded.had_errors);
    }

    #[test]
    fn test_decode_unmarked_shift_jis() {
        let (bytes, _, _) = encoding_rs::SHIFT_JIS.encode("東京駅");
        let decoded = decode(&bytes, encoding_rs::SHIFT_JIS);
        assert_eq!(decoded.text, "東京駅");
        assert!(!decoded.text.contains('\u{FFFD}'));
    }

    #[test]
    fn test_decode_utf16le() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "駅".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode(&bytes, encoding_rs::SHIFT_JIS).text, "駅");
    }

    #[test]
    fn test_read_text_honours_bom_over_legacy() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all("\u{feff}comment 駅\n".as_bytes()).unwrap();
        let decoded = read_text(file.path(), &ParserConfig::default()).unwrap();
        assert_eq!(decoded.encoding, encoding_rs::UTF_8);
        assert_eq!(decoded.text, "comment 駅\n");
    }

    #[test]
    fn test_read_text_missing_file() {
        let err = read_text(Path::new("/nonexistent/x.txt"), &ParserConfig::default());
        assert!(matches!(err, Err(ParseError::FileNotFound { .. })));
    }
}
