//! Input document decoding.
//!
//! HTML files are read as bytes and decoded to UTF-8 before parsing. The
//! character encoding is taken from, in order:
//! 1. a byte-order mark
//! 2. `<meta charset="...">`
//! 3. `<meta http-equiv="Content-Type" content="...; charset=...">`
//! 4. UTF-8 as the default
//!
//! Decoding is lossy: invalid sequences become U+FFFD rather than errors.

use encoding_rs::{Encoding, UTF_8};

use crate::patterns::{CHARSET_META, CONTENT_TYPE_CHARSET};

/// Only the head of the document is searched for charset declarations.
const SNIFF_LEN: usize = 1024;

/// Detects the document encoding, ignoring any byte-order mark.
#[must_use]
pub fn detect_encoding(html: &[u8]) -> &'static Encoding {
    let head = String::from_utf8_lossy(&html[..html.len().min(SNIFF_LEN)]);

    [&*CHARSET_META, &*CONTENT_TYPE_CHARSET]
        .iter()
        .filter_map(|re| re.captures(&head).and_then(|c| c.get(1)))
        .find_map(|label| Encoding::for_label(label.as_str().as_bytes()))
        .unwrap_or(UTF_8)
}

/// Decodes HTML bytes to a UTF-8 string.
///
/// # Examples
///
/// ```
/// use div2csv::encoding::decode_html;
///
/// let html = b"<meta charset=\"iso-8859-1\"><p>Caf\xE9</p>";
/// assert!(decode_html(html).contains("Café"));
/// ```
#[must_use]
pub fn decode_html(html: &[u8]) -> String {
    if let Some((encoding, bom_len)) = Encoding::for_bom(html) {
        let (decoded, _) = encoding.decode_without_bom_handling(&html[bom_len..]);
        return decoded.into_owned();
    }

    let encoding = detect_encoding(html);
    if encoding == UTF_8 {
        return String::from_utf8_lossy(html).into_owned();
    }

    let (decoded, _, had_errors) = encoding.decode(html);
    if had_errors {
        tracing::debug!(encoding = encoding.name(), "replaced undecodable bytes");
    }
    decoded.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_utf8() {
        assert_eq!(detect_encoding(b"<p>plain</p>"), UTF_8);
    }

    #[test]
    fn meta_charset_wins_over_content_type() {
        let html = br#"<meta charset="windows-1251"><meta http-equiv="Content-Type" content="text/html; charset=koi8-r">"#;
        assert_eq!(detect_encoding(html).name(), "windows-1251");
    }

    #[test]
    fn content_type_declaration_is_used() {
        let html = br#"<META HTTP-EQUIV="content-type" CONTENT="text/html; CHARSET=ISO-8859-1">"#;
        // WHATWG maps ISO-8859-1 to windows-1252.
        assert_eq!(detect_encoding(html).name(), "windows-1252");
    }

    #[test]
    fn unknown_labels_fall_back_to_utf8() {
        assert_eq!(detect_encoding(br#"<meta charset="no-such-thing">"#), UTF_8);
    }

    #[test]
    fn bom_overrides_meta() {
        let mut html = vec![0xFF, 0xFE];
        for unit in "<meta charset=\"windows-1252\">é".encode_utf16() {
            html.extend_from_slice(&unit.to_le_bytes());
        }
        let decoded = decode_html(&html);
        assert!(decoded.ends_with('é'));
        assert!(!decoded.starts_with('\u{feff}'));
    }

    #[test]
    fn windows_1252_quotes_are_decoded() {
        let html = b"<meta charset=\"windows-1252\"><td>\x93Hi\x94</td>";
        assert!(decode_html(html).contains("\u{201C}Hi\u{201D}"));
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let decoded = decode_html(b"<td>ok \xFF\xFE done</td>");
        assert!(decoded.contains("ok"));
        assert!(decoded.contains('\u{FFFD}'));
    }
}
