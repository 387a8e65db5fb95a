//! XML encoding detection and conversion
//!
//! Detects the source encoding from a byte order mark or early `<` / `<?`
//! byte patterns, decodes UTF-16/UTF-32/Latin-1 input to the internal UTF-8
//! representation, and re-encodes UTF-8 for serializer output.

use std::borrow::Cow;

/// Source or target encoding of an XML buffer.
///
/// `Auto` is only meaningful on input, where it triggers detection.
/// `Utf16`/`Utf32` select the native byte order of the host, `Wchar` the
/// encoding of the platform's wide character type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XmlEncoding {
    #[default]
    Auto,
    Utf8,
    Utf16Le,
    Utf16Be,
    Utf16,
    Utf32Le,
    Utf32Be,
    Utf32,
    Wchar,
    Latin1,
}

impl XmlEncoding {
    /// Detect encoding from byte order mark or initial byte patterns.
    ///
    /// Always returns a concrete encoding, defaulting to UTF-8.
    pub fn detect(input: &[u8]) -> Self {
        let d = |i: usize| input.get(i).copied().unwrap_or(0xFF);
        let (d0, d1, d2, d3) = (d(0), d(1), d(2), d(3));

        // BOM
        if d0 == 0x00 && d1 == 0x00 && d2 == 0xFE && d3 == 0xFF {
            return XmlEncoding::Utf32Be;
        }
        if d0 == 0xFF && d1 == 0xFE && d2 == 0x00 && d3 == 0x00 {
            return XmlEncoding::Utf32Le;
        }
        if d0 == 0xFE && d1 == 0xFF {
            return XmlEncoding::Utf16Be;
        }
        if d0 == 0xFF && d1 == 0xFE {
            return XmlEncoding::Utf16Le;
        }
        if d0 == 0xEF && d1 == 0xBB && d2 == 0xBF {
            return XmlEncoding::Utf8;
        }

        // No BOM: look for '<' or '<?' widened by zero bytes
        if d0 == 0x00 && d1 == 0x00 && d2 == 0x00 && d3 == b'<' {
            return XmlEncoding::Utf32Be;
        }
        if d0 == b'<' && d1 == 0x00 && d2 == 0x00 && d3 == 0x00 {
            return XmlEncoding::Utf32Le;
        }
        if d0 == 0x00 && d1 == b'<' && d2 == 0x00 && d3 == b'?' {
            return XmlEncoding::Utf16Be;
        }
        if d0 == b'<' && d1 == 0x00 && d2 == b'?' && d3 == 0x00 {
            return XmlEncoding::Utf16Le;
        }
        if d0 == 0x00 && d1 == b'<' {
            return XmlEncoding::Utf16Be;
        }
        if d0 == b'<' && d1 == 0x00 {
            return XmlEncoding::Utf16Le;
        }

        XmlEncoding::Utf8
    }

    /// Resolve `Auto` and the native-order aliases to a concrete encoding
    /// for the given input.
    pub fn resolve(self, input: &[u8]) -> Self {
        match self {
            XmlEncoding::Auto => XmlEncoding::detect(input),
            other => other.concrete(),
        }
    }

    /// Resolve native-order aliases (`Utf16`, `Utf32`, `Wchar`) to an
    /// endian-explicit encoding. Concrete encodings pass through.
    pub fn concrete(self) -> Self {
        match self {
            XmlEncoding::Utf16 => {
                if cfg!(target_endian = "big") {
                    XmlEncoding::Utf16Be
                } else {
                    XmlEncoding::Utf16Le
                }
            }
            XmlEncoding::Utf32 => {
                if cfg!(target_endian = "big") {
                    XmlEncoding::Utf32Be
                } else {
                    XmlEncoding::Utf32Le
                }
            }
            XmlEncoding::Wchar => {
                if cfg!(windows) {
                    XmlEncoding::Utf16.concrete()
                } else {
                    XmlEncoding::Utf32.concrete()
                }
            }
            other => other,
        }
    }

    /// Byte order mark for this encoding (empty for Latin-1 and Auto)
    pub fn bom(self) -> &'static [u8] {
        match self.concrete() {
            XmlEncoding::Utf8 => &[0xEF, 0xBB, 0xBF],
            XmlEncoding::Utf16Le => &[0xFF, 0xFE],
            XmlEncoding::Utf16Be => &[0xFE, 0xFF],
            XmlEncoding::Utf32Le => &[0xFF, 0xFE, 0x00, 0x00],
            XmlEncoding::Utf32Be => &[0x00, 0x00, 0xFE, 0xFF],
            _ => &[],
        }
    }
}

/// Decode raw input bytes to UTF-8 using the given (or detected) encoding.
///
/// Returns the decoded text and the concrete encoding that was applied.
/// Decoding is lossy: malformed sequences become U+FFFD, a trailing partial
/// code unit is dropped.
pub fn decode(input: &[u8], encoding: XmlEncoding) -> (String, XmlEncoding) {
    let encoding = encoding.resolve(input);
    let text = match encoding {
        XmlEncoding::Utf8 => {
            let body = input.strip_prefix(&[0xEF, 0xBB, 0xBF][..]).unwrap_or(input);
            String::from_utf8_lossy(body).into_owned()
        }
        XmlEncoding::Utf16Le => decode_utf16(input, &[0xFF, 0xFE], u16::from_le_bytes),
        XmlEncoding::Utf16Be => decode_utf16(input, &[0xFE, 0xFF], u16::from_be_bytes),
        XmlEncoding::Utf32Le => decode_utf32(input, &[0xFF, 0xFE, 0x00, 0x00], u32::from_le_bytes),
        XmlEncoding::Utf32Be => decode_utf32(input, &[0x00, 0x00, 0xFE, 0xFF], u32::from_be_bytes),
        XmlEncoding::Latin1 => input.iter().map(|&b| b as char).collect(),
        // resolve() never returns the alias variants
        _ => String::new(),
    };
    (text, encoding)
}

fn decode_utf16(input: &[u8], bom: &[u8], read: fn([u8; 2]) -> u16) -> String {
    let body = input.strip_prefix(bom).unwrap_or(input);
    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|c| read([c[0], c[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

fn decode_utf32(input: &[u8], bom: &[u8], read: fn([u8; 4]) -> u32) -> String {
    let body = input.strip_prefix(bom).unwrap_or(input);
    body.chunks_exact(4)
        .map(|c| char::from_u32(read([c[0], c[1], c[2], c[3]])).unwrap_or('\u{FFFD}'))
        .collect()
}

/// Encode a UTF-8 string for output in the given encoding.
///
/// UTF-8 output borrows the input; other encodings allocate. Characters
/// outside Latin-1 become `?` when encoding to Latin-1.
pub fn encode<'a>(text: &'a str, encoding: XmlEncoding) -> Cow<'a, [u8]> {
    match encoding.concrete() {
        XmlEncoding::Utf8 | XmlEncoding::Auto => Cow::Borrowed(text.as_bytes()),
        XmlEncoding::Utf16Le => {
            let mut out = Vec::with_capacity(text.len() * 2);
            for unit in text.encode_utf16() {
                out.extend_from_slice(&unit.to_le_bytes());
            }
            Cow::Owned(out)
        }
        XmlEncoding::Utf16Be => {
            let mut out = Vec::with_capacity(text.len() * 2);
            for unit in text.encode_utf16() {
                out.extend_from_slice(&unit.to_be_bytes());
            }
            Cow::Owned(out)
        }
        XmlEncoding::Utf32Le => {
            let mut out = Vec::with_capacity(text.len() * 4);
            for ch in text.chars() {
                out.extend_from_slice(&(ch as u32).to_le_bytes());
            }
            Cow::Owned(out)
        }
        XmlEncoding::Utf32Be => {
            let mut out = Vec::with_capacity(text.len() * 4);
            for ch in text.chars() {
                out.extend_from_slice(&(ch as u32).to_be_bytes());
            }
            Cow::Owned(out)
        }
        XmlEncoding::Latin1 => {
            let mut out = Vec::with_capacity(text.len());
            for ch in text.chars() {
                out.push(if (ch as u32) < 0x100 { ch as u8 } else { b'?' });
            }
            Cow::Owned(out)
        }
        _ => Cow::Borrowed(text.as_bytes()),
    }
}
