//! Text decoding and XML escaping helpers.

use std::borrow::Cow;

/// Decode bytes to a string, handling various encodings.
///
/// This function:
/// 1. First tries UTF-8 (handles BOM automatically via encoding_rs)
/// 2. If malformed, tries the hint encoding (from a `<meta>` charset declaration)
/// 3. Falls back to Windows-1252 (common in legacy HTML)
///
/// Uses `Cow<str>` to avoid allocation when the input is valid UTF-8.
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

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Extract the charset declared by a `<meta>` tag.
///
/// Handles both `<meta charset="...">` and
/// `<meta http-equiv="Content-Type" content="text/html; charset=...">`.
/// Only the first 1024 bytes are inspected, as browsers do.
pub fn extract_meta_charset(bytes: &[u8]) -> Option<&str> {
    let prefix = &bytes[..bytes.len().min(1024)];

    let pos = prefix
        .windows(8)
        .position(|w| w.eq_ignore_ascii_case(b"charset="))?;
    let mut value = &prefix[pos + 8..];

    if let Some(&quote) = value.first()
        && (quote == b'"' || quote == b'\'')
    {
        value = &value[1..];
    }

    let end = value
        .iter()
        .position(|&b| matches!(b, b'"' | b'\'' | b';' | b'>' | b'/') || b.is_ascii_whitespace())
        .unwrap_or(value.len());

    let name = std::str::from_utf8(&value[..end]).ok()?;
    (!name.is_empty()).then_some(name)
}

/// Escape text for use in XML character data and attribute values.
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Last `/`-delimited segment of a string; the whole string when it has no `/`.
pub fn last_segment(s: &str) -> &str {
    s.rsplit('/').next().unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8() {
        assert_eq!(decode_text("héllo".as_bytes(), None), "héllo");
        // BOM is stripped
        assert_eq!(decode_text(b"\xEF\xBB\xBFabc", None), "abc");
    }

    #[test]
    fn test_decode_fallbacks() {
        assert_eq!(decode_text(b"caf\xE9", None), "café");
        assert_eq!(decode_text(b"\xC0\xE0", Some("koi8-r")), "\u{44e}\u{42e}");
    }

    #[test]
    fn test_extract_meta_charset() {
        assert_eq!(extract_meta_charset(b"<meta charset=\"utf-8\">"), Some("utf-8"));
        assert_eq!(extract_meta_charset(b"<meta charset=latin1>"), Some("latin1"));
        assert_eq!(
            extract_meta_charset(
                b"<meta http-equiv=\"Content-Type\" content=\"text/html; charset=windows-1251\">"
            ),
            Some("windows-1251")
        );
        assert_eq!(extract_meta_charset(b"<p>no declaration</p>"), None);
        assert_eq!(extract_meta_charset(b"<meta charset=\"\">"), None);
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(
            escape_xml(r#"a<b>&"c"'d'"#),
            "a&lt;b&gt;&amp;&quot;c&quot;&apos;d&apos;"
        );
    }

    #[test]
    fn test_last_segment() {
        assert_eq!(last_segment("a/b/pic.png"), "pic.png");
        assert_eq!(last_segment("pic.png"), "pic.png");
        assert_eq!(last_segment("dir/"), "");
    }
}
