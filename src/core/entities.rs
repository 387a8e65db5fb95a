//! XML character and entity reference decoding
//!
//! Decodes the five predefined entities (`&lt;` `&gt;` `&amp;` `&quot;`
//! `&apos;`) and numeric character references (`&#123;` `&#x7B;`).
//! Unknown or malformed references are left in the text untouched.
//!
//! Uses Cow for zero-copy when no references are present.

use memchr::memchr;
use std::borrow::Cow;

/// Decode a single reference starting at a `&`.
///
/// Returns the decoded character and the number of input bytes consumed
/// (including the `&` and `;`), or `None` when the reference is unknown or
/// malformed and should stay literal.
pub fn decode_ref(input: &str) -> Option<(char, usize)> {
    let bytes = input.as_bytes();
    debug_assert_eq!(bytes.first(), Some(&b'&'));

    let semi = memchr(b';', bytes)?;
    let body = &bytes[1..semi];

    if let Some(numeric) = body.strip_prefix(b"#") {
        let code = if let Some(hex) = numeric
            .strip_prefix(b"x")
            .or_else(|| numeric.strip_prefix(b"X"))
        {
            u32::from_str_radix(std::str::from_utf8(hex).ok()?, 16).ok()?
        } else {
            std::str::from_utf8(numeric).ok()?.parse::<u32>().ok()?
        };
        return char::from_u32(code).map(|c| (c, semi + 1));
    }

    let ch = match body {
        b"lt" => '<',
        b"gt" => '>',
        b"amp" => '&',
        b"quot" => '"',
        b"apos" => '\'',
        _ => return None,
    };
    Some((ch, semi + 1))
}

/// Decode all references in the input.
///
/// Returns Borrowed if no `&` is present (zero-copy).
pub fn decode_refs(input: &str) -> Cow<'_, str> {
    if memchr(b'&', input.as_bytes()).is_none() {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = memchr(b'&', rest.as_bytes()) {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        match decode_ref(rest) {
            Some((ch, used)) => {
                out.push(ch);
                rest = &rest[used..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_refs() {
        let result = decode_refs("Hello, World!");
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result, "Hello, World!");
    }

    #[test]
    fn test_predefined() {
        assert_eq!(
            decode_refs("&lt;hello&gt; &amp; &quot;world&quot; &apos;"),
            "<hello> & \"world\" '"
        );
    }

    #[test]
    fn test_numeric() {
        assert_eq!(decode_refs("&#65;&#66;&#67;"), "ABC");
        assert_eq!(decode_refs("&#x41;&#x4F;"), "AO");
        assert_eq!(decode_refs("&#x1F600;"), "\u{1F600}");
    }

    #[test]
    fn test_unknown_stays_literal() {
        assert_eq!(decode_refs("&unknown; &nbsp;"), "&unknown; &nbsp;");
    }

    #[test]
    fn test_malformed_stays_literal() {
        assert_eq!(decode_refs("a & b"), "a & b");
        assert_eq!(decode_refs("a &# b;"), "a &# b;");
        assert_eq!(decode_refs("trailing &amp"), "trailing &amp");
        assert_eq!(decode_refs("&#x110000;"), "&#x110000;");
    }

    #[test]
    fn test_decode_ref_consumed() {
        assert_eq!(decode_ref("&amp;rest"), Some(('&', 5)));
        assert_eq!(decode_ref("&bogus;"), None);
    }
}
