//! Typed access to text content.
//!
//! `XmlText` is a lightweight proxy over the data node that stores the
//! text of an element: the element's first text child, or the element
//! record itself when text was embedded into it at parse time. The numeric
//! conversions here mimic the C library functions (`strtol`, `strtod`):
//! leading whitespace is skipped, the longest valid prefix is parsed, and
//! integers saturate at the bounds of the target type.

use crate::dom::node::NodeId;
use crate::dom::XmlNode;

/// Proxy for the text content of a node.
///
/// Obtained from [`XmlNode::text`]. Conversions never fail; they fall
/// back to `0`, `0.0` or `false` when there is no text or no parseable
/// prefix.
#[derive(Clone, Copy)]
pub struct XmlText<'a> {
    node: XmlNode<'a>,
}

impl<'a> XmlText<'a> {
    pub(crate) fn new(node: XmlNode<'a>) -> Self {
        XmlText { node }
    }

    fn target(&self) -> Option<NodeId> {
        let id = self.node.id()?;
        self.node.document().text_target(id)
    }

    /// True if no data node backs this text object.
    pub fn is_null(&self) -> bool {
        self.target().is_none()
    }

    /// The node whose value actually stores the text: the bound node for
    /// text kinds, otherwise its first text child.
    pub fn data(&self) -> XmlNode<'a> {
        let doc = self.node.document();
        match self.target() {
            Some(id) => doc.get(id),
            None => XmlNode::new(doc, None),
        }
    }

    /// Text content, or `""` when there is none.
    pub fn as_str(&self) -> &'a str {
        let doc = self.node.document();
        match self.target() {
            Some(id) => doc.value_of(id),
            None => "",
        }
    }

    pub fn as_i32(&self) -> i32 {
        parse_i32(self.as_str())
    }

    pub fn as_u32(&self) -> u32 {
        parse_u32(self.as_str())
    }

    pub fn as_i64(&self) -> i64 {
        parse_i64(self.as_str())
    }

    pub fn as_u64(&self) -> u64 {
        parse_u64(self.as_str())
    }

    pub fn as_f32(&self) -> f32 {
        parse_f64(self.as_str()) as f32
    }

    pub fn as_f64(&self) -> f64 {
        parse_f64(self.as_str())
    }

    /// True when the text starts with `1`, `t`, `T`, `y` or `Y`.
    pub fn as_bool(&self) -> bool {
        parse_bool(self.as_str())
    }
}

/// Looks at the first character only, like the C library did.
pub(crate) fn parse_bool(value: &str) -> bool {
    matches!(
        value.as_bytes().first(),
        Some(b'1') | Some(b't') | Some(b'T') | Some(b'y') | Some(b'Y')
    )
}

pub(crate) fn parse_i32(value: &str) -> i32 {
    string_to_integer(value, 0x8000_0000, 0x7FFF_FFFF, false) as u32 as i32
}

pub(crate) fn parse_u32(value: &str) -> u32 {
    string_to_integer(value, 0, 0xFFFF_FFFF, false) as u32
}

pub(crate) fn parse_i64(value: &str) -> i64 {
    string_to_integer(value, 0x8000_0000_0000_0000, 0x7FFF_FFFF_FFFF_FFFF, true) as i64
}

pub(crate) fn parse_u64(value: &str) -> u64 {
    string_to_integer(value, 0, u64::MAX, true)
}

/// Integer prefix parse with saturation. `minv`/`maxv` are the bounds of
/// the target type as bit patterns; `wide` selects 64-bit arithmetic.
/// Accepts an optional sign and a `0x` prefix for hexadecimal input.
fn string_to_integer(value: &str, minv: u64, maxv: u64, wide: bool) -> u64 {
    let mask: u64 = if wide { u64::MAX } else { 0xFFFF_FFFF };
    let b = value.as_bytes();
    let mut i = 0;
    while i < b.len() && is_c_space(b[i]) {
        i += 1;
    }
    let negative = i < b.len() && b[i] == b'-';
    if i < b.len() && (b[i] == b'+' || b[i] == b'-') {
        i += 1;
    }
    let mut result: u64 = 0;
    let overflow;
    if i + 1 < b.len() && b[i] == b'0' && (b[i + 1] | 0x20) == b'x' {
        i += 2;
        while i < b.len() && b[i] == b'0' {
            i += 1;
        }
        let start = i;
        while i < b.len() && b[i].is_ascii_hexdigit() {
            let digit = (b[i] as char).to_digit(16).unwrap_or(0) as u64;
            result = result.wrapping_mul(16).wrapping_add(digit) & mask;
            i += 1;
        }
        // 16 hex digits fill 64 bits, 8 fill 32.
        overflow = i - start > if wide { 16 } else { 8 };
    } else {
        while i < b.len() && b[i] == b'0' {
            i += 1;
        }
        let start = i;
        while i < b.len() && b[i].is_ascii_digit() {
            result = result.wrapping_mul(10).wrapping_add((b[i] - b'0') as u64) & mask;
            i += 1;
        }
        let digits = i - start;
        let max_digits = if wide { 20 } else { 10 };
        let max_lead = if wide { b'1' } else { b'4' };
        let high_bit = if wide { 63 } else { 31 };
        // A number of max_digits length fits only if its leading digit is
        // below the bound's, or equal with the high bit surviving the
        // accumulation (no wrap happened).
        overflow = digits >= max_digits
            && !(digits == max_digits
                && start < b.len()
                && (b[start] < max_lead
                    || (b[start] == max_lead && (result >> high_bit) & 1 == 1)));
    }
    if negative {
        let neg_min = minv.wrapping_neg() & mask;
        if overflow || result > neg_min {
            minv
        } else {
            result.wrapping_neg() & mask
        }
    } else if overflow || result > maxv {
        maxv
    } else {
        result
    }
}

/// `strtod`-style prefix parse. Returns `0.0` when no prefix parses.
pub(crate) fn parse_f64(value: &str) -> f64 {
    let prefix = float_prefix(value);
    prefix.trim_start().parse::<f64>().unwrap_or(0.0)
}

/// Longest prefix of `value` that forms a floating point literal.
fn float_prefix(value: &str) -> &str {
    let b = value.as_bytes();
    let mut i = 0;
    while i < b.len() && is_c_space(b[i]) {
        i += 1;
    }
    let mut end = i;
    if end < b.len() && (b[end] == b'+' || b[end] == b'-') {
        end += 1;
    }
    let mut seen_digit = false;
    while end < b.len() && b[end].is_ascii_digit() {
        end += 1;
        seen_digit = true;
    }
    if end < b.len() && b[end] == b'.' {
        end += 1;
        while end < b.len() && b[end].is_ascii_digit() {
            end += 1;
            seen_digit = true;
        }
    }
    if !seen_digit {
        return "";
    }
    if end < b.len() && (b[end] | 0x20) == b'e' {
        let mut exp = end + 1;
        if exp < b.len() && (b[exp] == b'+' || b[exp] == b'-') {
            exp += 1;
        }
        if exp < b.len() && b[exp].is_ascii_digit() {
            while exp < b.len() && b[exp].is_ascii_digit() {
                exp += 1;
            }
            end = exp;
        }
    }
    &value[..end]
}

/// Shortest representation that round-trips, e.g. `1.5` rather than the
/// seventeen significant digits the C formatting produced.
pub(crate) fn format_float(value: f64) -> String {
    value.to_string()
}

fn is_c_space(b: u8) -> bool {
    b == b' ' || (0x09..=0x0d).contains(&b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::document::XmlDocument;

    #[test]
    fn integer_parsing_basics() {
        assert_eq!(parse_i32("42"), 42);
        assert_eq!(parse_i32("-42"), -42);
        assert_eq!(parse_i32("+7"), 7);
        assert_eq!(parse_i32("  13"), 13);
        assert_eq!(parse_i32("99z"), 99);
        assert_eq!(parse_i32(""), 0);
        assert_eq!(parse_i32("text"), 0);
    }

    #[test]
    fn integer_parsing_saturates() {
        assert_eq!(parse_i32("2147483647"), i32::MAX);
        assert_eq!(parse_i32("2147483648"), i32::MAX);
        assert_eq!(parse_i32("-2147483648"), i32::MIN);
        assert_eq!(parse_i32("-2147483649"), i32::MIN);
        assert_eq!(parse_u32("-1"), 0);
        assert_eq!(parse_u32("4294967295"), u32::MAX);
        assert_eq!(parse_u32("4294967296"), u32::MAX);
        assert_eq!(parse_i64("9223372036854775807"), i64::MAX);
        assert_eq!(parse_i64("9223372036854775808"), i64::MAX);
        assert_eq!(parse_i64("-9223372036854775808"), i64::MIN);
        assert_eq!(parse_u64("18446744073709551615"), u64::MAX);
        assert_eq!(parse_u64("18446744073709551616"), u64::MAX);
    }

    #[test]
    fn integer_parsing_hex() {
        assert_eq!(parse_i32("0x20"), 32);
        assert_eq!(parse_i32("0XFF"), 255);
        assert_eq!(parse_u32("0xFFFFFFFF"), u32::MAX);
        assert_eq!(parse_i32("-0x10"), -16);
        assert_eq!(parse_u64("0x0000000000000001"), 1);
    }

    #[test]
    fn float_parsing() {
        assert_eq!(parse_f64("1.5"), 1.5);
        assert_eq!(parse_f64("-2.25e2"), -225.0);
        assert_eq!(parse_f64("3.5suffix"), 3.5);
        assert_eq!(parse_f64("7"), 7.0);
        assert_eq!(parse_f64(".5"), 0.5);
        assert_eq!(parse_f64("1e"), 1.0);
        assert_eq!(parse_f64("junk"), 0.0);
        assert_eq!(parse_f64(""), 0.0);
    }

    #[test]
    fn bool_parsing_first_char_only() {
        for s in ["1", "true", "True", "yes", "Y", "tottering"] {
            assert!(parse_bool(s), "{s}");
        }
        for s in ["0", "false", "no", "", " 1", "off"] {
            assert!(!parse_bool(s), "{s}");
        }
    }

    #[test]
    fn float_formatting_is_short() {
        assert_eq!(format_float(1.5), "1.5");
        assert_eq!(format_float(3.0), "3");
        assert_eq!(format_float(-0.25), "-0.25");
    }

    #[test]
    fn text_reads_first_text_child() {
        let mut doc = XmlDocument::new();
        let root_id = doc.root_id();
        let elem = doc.append_element(root_id, "n").unwrap();
        doc.append_child(elem, crate::dom::XmlNodeType::Comment);
        doc.set_text(elem, "117");
        let node = doc.get(elem);
        assert_eq!(node.text().as_str(), "117");
        assert_eq!(node.text().as_i32(), 117);
        assert!(!node.text().is_null());
        assert_eq!(node.text().data().node_type(), crate::dom::XmlNodeType::Pcdata);
    }

    #[test]
    fn text_binds_to_text_node_itself() {
        let mut doc = XmlDocument::new();
        let root_id = doc.root_id();
        let elem = doc.append_element(root_id, "n").unwrap();
        let cdata = doc.append_child(elem, crate::dom::XmlNodeType::Cdata).unwrap();
        doc.set_value(cdata, "payload");
        let handle = doc.get(cdata);
        assert_eq!(handle.text().as_str(), "payload");
        assert_eq!(handle.text().data().id(), Some(cdata));
    }

    #[test]
    fn text_of_empty_element_is_null() {
        let mut doc = XmlDocument::new();
        let root_id = doc.root_id();
        let elem = doc.append_element(root_id, "n").unwrap();
        let text = doc.get(elem).text();
        assert!(text.is_null());
        assert_eq!(text.as_str(), "");
        assert_eq!(text.as_i32(), 0);
        assert!(!text.as_bool());
        assert_eq!(text.as_f64(), 0.0);
    }
}
