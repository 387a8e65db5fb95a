//! XML serialization
//!
//! Renders a document or subtree back to markup. Output is produced as
//! UTF-8 text, buffered, and transcoded to the requested encoding in
//! chunks. Formatting is driven by a bitmask of [`FORMAT_*`](FORMAT_INDENT)
//! flags; the default indents children with the given indent string, while
//! [`FORMAT_RAW`] suppresses all inserted whitespace.

use std::io::{self, Write};

use crate::core::encoding::{self, XmlEncoding};
use crate::dom::document::XmlDocument;
use crate::dom::node::{NodeId, XmlNodeType};

/// Indent child nodes with the indent string.
pub const FORMAT_INDENT: u32 = 0x01;
/// Prepend the output encoding's byte order mark.
pub const FORMAT_WRITE_BOM: u32 = 0x02;
/// No line breaks or indentation; the most compact rendering.
pub const FORMAT_RAW: u32 = 0x04;
/// Never emit the synthetic `<?xml version="1.0"?>` declaration.
pub const FORMAT_NO_DECLARATION: u32 = 0x08;
/// Write text verbatim, without entity escaping.
pub const FORMAT_NO_ESCAPES: u32 = 0x10;
/// Open files in text mode. Byte output is unchanged on this platform;
/// the flag exists for save-call parity.
pub const FORMAT_SAVE_FILE_TEXT: u32 = 0x20;
/// Put every attribute on its own indented line.
pub const FORMAT_INDENT_ATTRIBUTES: u32 = 0x40;
/// Render childless elements as `<name></name>` instead of `<name />`.
pub const FORMAT_NO_EMPTY_ELEMENT_TAGS: u32 = 0x80;
/// Drop control characters instead of writing numeric references.
pub const FORMAT_SKIP_CONTROL_CHARS: u32 = 0x100;
/// Quote attribute values with `'` instead of `"`.
pub const FORMAT_ATTRIBUTE_SINGLE_QUOTE: u32 = 0x200;

/// Default formatting: indented output.
pub const FORMAT_DEFAULT: u32 = FORMAT_INDENT;

// Pending separators carried between sibling nodes. Text output clears
// both so following markup stays inline with mixed content.
const PENDING_INDENT: u8 = 0x1;
const PENDING_NEWLINE: u8 = 0x2;

const FLUSH_THRESHOLD: usize = 8 * 1024;

/// Buffered writer: accumulates UTF-8 text and transcodes whole chunks to
/// the output encoding. Flushing only ever happens at character
/// boundaries because the buffer is a `String`.
struct XmlWriter<'w, W: Write> {
    sink: &'w mut W,
    buffer: String,
    encoding: XmlEncoding,
}

impl<'w, W: Write> XmlWriter<'w, W> {
    fn new(sink: &'w mut W, encoding: XmlEncoding) -> Self {
        let encoding = match encoding {
            XmlEncoding::Auto => XmlEncoding::Utf8,
            other => other.concrete(),
        };
        XmlWriter {
            sink,
            buffer: String::new(),
            encoding,
        }
    }

    fn write_str(&mut self, text: &str) -> io::Result<()> {
        self.buffer.push_str(text);
        if self.buffer.len() >= FLUSH_THRESHOLD {
            self.flush_buffer()
        } else {
            Ok(())
        }
    }

    fn write_bom(&mut self) -> io::Result<()> {
        self.sink.write_all(self.encoding.bom())
    }

    fn flush_buffer(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let bytes = encoding::encode(&self.buffer, self.encoding);
        self.sink.write_all(&bytes)?;
        self.buffer.clear();
        Ok(())
    }
}

/// Serialize a whole document: optional byte order mark, a synthetic
/// declaration when the document does not carry its own, then the node
/// tree.
pub(crate) fn save_document<W: Write>(
    doc: &XmlDocument,
    sink: &mut W,
    indent: &str,
    flags: u32,
    encoding: XmlEncoding,
) -> io::Result<()> {
    let mut writer = XmlWriter::new(sink, encoding);
    if flags & FORMAT_WRITE_BOM != 0 {
        writer.write_bom()?;
    }
    if flags & FORMAT_NO_DECLARATION == 0 && !has_declaration(doc) {
        writer.write_str("<?xml version=\"1.0\"?>")?;
        if flags & FORMAT_RAW == 0 {
            writer.write_str("\n")?;
        }
    }
    write_subtree(doc, doc.root_id(), &mut writer, indent, flags, 0)?;
    writer.flush_buffer()
}

/// Serialize a single node and its subtree. No declaration or byte order
/// mark is synthesized; `depth` seeds the starting indentation.
pub(crate) fn print_node<W: Write>(
    doc: &XmlDocument,
    id: NodeId,
    sink: &mut W,
    indent: &str,
    flags: u32,
    encoding: XmlEncoding,
    depth: usize,
) -> io::Result<()> {
    let mut writer = XmlWriter::new(sink, encoding);
    write_subtree(doc, id, &mut writer, indent, flags, depth)?;
    writer.flush_buffer()
}

fn has_declaration(doc: &XmlDocument) -> bool {
    let mut cur = doc.first_child_of(doc.root_id());
    while let Some(id) = cur {
        match doc.kind_of(id) {
            XmlNodeType::Declaration => return true,
            XmlNodeType::Element => return false,
            _ => cur = doc.next_sibling_of(id),
        }
    }
    false
}

/// Non-recursive subtree walk. `pending` tracks the newline/indent owed
/// before the next piece of markup; text output clears it so mixed
/// content stays on one line.
fn write_subtree<W: Write>(
    doc: &XmlDocument,
    root: NodeId,
    writer: &mut XmlWriter<'_, W>,
    indent: &str,
    flags: u32,
    start_depth: usize,
) -> io::Result<()> {
    let raw = flags & FORMAT_RAW != 0;
    let indent_on =
        flags & (FORMAT_INDENT | FORMAT_INDENT_ATTRIBUTES) != 0 && !raw && !indent.is_empty();
    let mut pending = PENDING_INDENT;
    let mut depth = start_depth;
    let mut node = root;
    'tree: loop {
        let kind = doc.kind_of(node);
        let mut descended = false;
        if kind == XmlNodeType::Pcdata || kind == XmlNodeType::Cdata {
            write_simple(doc, node, writer, indent, flags)?;
            pending = 0;
        } else {
            if pending & PENDING_NEWLINE != 0 && !raw {
                writer.write_str("\n")?;
            }
            if pending & PENDING_INDENT != 0 && indent_on {
                write_indent(writer, indent, depth)?;
            }
            match kind {
                XmlNodeType::Document => {
                    pending = PENDING_INDENT;
                    if let Some(first) = doc.first_child_of(node) {
                        node = first;
                        descended = true;
                    }
                }
                XmlNodeType::Element => {
                    pending = PENDING_NEWLINE | PENDING_INDENT;
                    if write_element_start(doc, node, writer, indent, flags, depth + 1)? {
                        if !doc.value_of(node).is_empty() {
                            pending = 0;
                        }
                        if let Some(first) = doc.first_child_of(node) {
                            node = first;
                            depth += 1;
                            descended = true;
                        }
                    }
                }
                _ => {
                    write_simple(doc, node, writer, indent, flags)?;
                    pending = PENDING_NEWLINE | PENDING_INDENT;
                }
            }
        }
        if descended {
            continue;
        }
        // climb until a sibling exists, closing elements on the way up
        loop {
            if node == root {
                break 'tree;
            }
            if let Some(next) = doc.next_sibling_of(node) {
                node = next;
                break;
            }
            node = match doc.parent_of(node) {
                Some(parent) => parent,
                None => break 'tree,
            };
            if doc.kind_of(node) == XmlNodeType::Element {
                depth -= 1;
                if pending & PENDING_NEWLINE != 0 && !raw {
                    writer.write_str("\n")?;
                }
                if pending & PENDING_INDENT != 0 && indent_on {
                    write_indent(writer, indent, depth)?;
                }
                write_element_end(doc, node, writer)?;
                pending = PENDING_NEWLINE | PENDING_INDENT;
            }
        }
    }
    if pending & PENDING_NEWLINE != 0 && !raw {
        writer.write_str("\n")?;
    }
    Ok(())
}

fn write_indent<W: Write>(
    writer: &mut XmlWriter<'_, W>,
    indent: &str,
    depth: usize,
) -> io::Result<()> {
    for _ in 0..depth {
        writer.write_str(indent)?;
    }
    Ok(())
}

fn element_name(name: &str) -> &str {
    if name.is_empty() {
        ":anonymous"
    } else {
        name
    }
}

/// Start tag of an element, or the whole element when it has no children.
/// Returns true when the children (and closing tag) remain to be written.
fn write_element_start<W: Write>(
    doc: &XmlDocument,
    id: NodeId,
    writer: &mut XmlWriter<'_, W>,
    indent: &str,
    flags: u32,
    attr_depth: usize,
) -> io::Result<bool> {
    let name = element_name(doc.name_of(id));
    writer.write_str("<")?;
    writer.write_str(name)?;
    if doc.first_attr_of(id).is_some() {
        write_attributes(doc, id, writer, indent, flags, attr_depth)?;
    }
    let value = doc.value_of(id);
    if value.is_empty() {
        if doc.first_child_of(id).is_some() {
            writer.write_str(">")?;
            Ok(true)
        } else if flags & FORMAT_NO_EMPTY_ELEMENT_TAGS != 0 {
            writer.write_str("></")?;
            writer.write_str(name)?;
            writer.write_str(">")?;
            Ok(false)
        } else {
            if flags & FORMAT_RAW == 0 {
                writer.write_str(" ")?;
            }
            writer.write_str("/>")?;
            Ok(false)
        }
    } else {
        // text embedded in the element's own value slot
        writer.write_str(">")?;
        write_text(writer, value, false, flags)?;
        if doc.first_child_of(id).is_some() {
            Ok(true)
        } else {
            writer.write_str("</")?;
            writer.write_str(name)?;
            writer.write_str(">")?;
            Ok(false)
        }
    }
}

fn write_element_end<W: Write>(
    doc: &XmlDocument,
    id: NodeId,
    writer: &mut XmlWriter<'_, W>,
) -> io::Result<()> {
    writer.write_str("</")?;
    writer.write_str(element_name(doc.name_of(id)))?;
    writer.write_str(">")
}

fn write_attributes<W: Write>(
    doc: &XmlDocument,
    id: NodeId,
    writer: &mut XmlWriter<'_, W>,
    indent: &str,
    flags: u32,
    depth: usize,
) -> io::Result<()> {
    let quote = if flags & FORMAT_ATTRIBUTE_SINGLE_QUOTE != 0 {
        "'"
    } else {
        "\""
    };
    let indent_on =
        flags & (FORMAT_INDENT | FORMAT_INDENT_ATTRIBUTES) != 0 && !indent.is_empty();
    let mut cur = doc.first_attr_of(id);
    while let Some(attr) = cur {
        if flags & (FORMAT_INDENT_ATTRIBUTES | FORMAT_RAW) == FORMAT_INDENT_ATTRIBUTES {
            writer.write_str("\n")?;
            if indent_on {
                write_indent(writer, indent, depth)?;
            }
        } else {
            writer.write_str(" ")?;
        }
        writer.write_str(element_name(doc.attr_name_of(attr)))?;
        writer.write_str("=")?;
        writer.write_str(quote)?;
        write_text(writer, doc.attr_value_of(attr), true, flags)?;
        writer.write_str(quote)?;
        cur = doc.attr_next_of(attr);
    }
    Ok(())
}

/// Comment, PI, declaration, doctype, or text node. Elements and documents
/// are handled by the subtree walker.
fn write_simple<W: Write>(
    doc: &XmlDocument,
    id: NodeId,
    writer: &mut XmlWriter<'_, W>,
    indent: &str,
    flags: u32,
) -> io::Result<()> {
    match doc.kind_of(id) {
        XmlNodeType::Pcdata => write_text(writer, doc.value_of(id), false, flags),
        XmlNodeType::Cdata => write_cdata(writer, doc.value_of(id)),
        XmlNodeType::Comment => write_comment(writer, doc.value_of(id)),
        XmlNodeType::Pi => {
            writer.write_str("<?")?;
            writer.write_str(element_name(doc.name_of(id)))?;
            let value = doc.value_of(id);
            if !value.is_empty() {
                writer.write_str(" ")?;
                write_pi_value(writer, value)?;
            }
            writer.write_str("?>")
        }
        XmlNodeType::Declaration => {
            writer.write_str("<?")?;
            writer.write_str(element_name(doc.name_of(id)))?;
            // attribute-per-line layout never applies inside a declaration
            write_attributes(doc, id, writer, indent, flags & !FORMAT_INDENT_ATTRIBUTES, 0)?;
            writer.write_str("?>")
        }
        XmlNodeType::Doctype => {
            writer.write_str("<!DOCTYPE ")?;
            writer.write_str(doc.value_of(id))?;
            writer.write_str(">")
        }
        XmlNodeType::Document | XmlNodeType::Element | XmlNodeType::Null => Ok(()),
    }
}

/// Escaped text output. `attribute` additionally escapes the active quote
/// character and the whitespace characters that are literal in PCDATA.
fn write_text<W: Write>(
    writer: &mut XmlWriter<'_, W>,
    text: &str,
    attribute: bool,
    flags: u32,
) -> io::Result<()> {
    if flags & FORMAT_NO_ESCAPES != 0 {
        return writer.write_str(text);
    }
    let single_quote = flags & FORMAT_ATTRIBUTE_SINGLE_QUOTE != 0;
    let skip_control = flags & FORMAT_SKIP_CONTROL_CHARS != 0;
    let bytes = text.as_bytes();
    let mut seg = 0;
    for (i, &b) in bytes.iter().enumerate() {
        let replacement = match b {
            b'&' => Some("&amp;"),
            b'<' => Some("&lt;"),
            b'>' => Some("&gt;"),
            b'"' if attribute && !single_quote => Some("&quot;"),
            b'\'' if attribute && single_quote => Some("&apos;"),
            _ => None,
        };
        if let Some(rep) = replacement {
            writer.write_str(&text[seg..i])?;
            writer.write_str(rep)?;
            seg = i + 1;
        } else if b < 32 && (attribute || !matches!(b, b'\t' | b'\n' | b'\r')) {
            writer.write_str(&text[seg..i])?;
            if !skip_control {
                let numeric = format!("&#{:02};", b);
                writer.write_str(&numeric)?;
            }
            seg = i + 1;
        }
    }
    writer.write_str(&text[seg..])
}

/// CDATA output. A literal `]]>` in the value splits the section so the
/// terminator never appears in the output body.
fn write_cdata<W: Write>(writer: &mut XmlWriter<'_, W>, value: &str) -> io::Result<()> {
    let bytes = value.as_bytes();
    let mut seg = 0;
    loop {
        writer.write_str("<![CDATA[")?;
        let mut i = seg;
        while i < bytes.len()
            && !(bytes[i] == b']'
                && bytes.get(i + 1) == Some(&b']')
                && bytes.get(i + 2) == Some(&b'>'))
        {
            i += 1;
        }
        let split = i < bytes.len();
        // keep "]]" in this section; ">" opens the next one
        let end = if split { i + 2 } else { bytes.len() };
        writer.write_str(&value[seg..end])?;
        writer.write_str("]]>")?;
        if !split {
            return Ok(());
        }
        seg = end;
    }
}

/// Comment output. `--` (or a trailing `-`) would terminate or corrupt the
/// comment, so a space is inserted after the offending dash.
fn write_comment<W: Write>(writer: &mut XmlWriter<'_, W>, value: &str) -> io::Result<()> {
    writer.write_str("<!--")?;
    let bytes = value.as_bytes();
    let mut seg = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'-' && (i + 1 == bytes.len() || bytes[i + 1] == b'-') {
            writer.write_str(&value[seg..i])?;
            writer.write_str("- ")?;
            i += 1;
            seg = i;
        } else {
            i += 1;
        }
    }
    writer.write_str(&value[seg..])?;
    writer.write_str("-->")
}

/// PI value output; `?>` inside the value becomes `? >`.
fn write_pi_value<W: Write>(writer: &mut XmlWriter<'_, W>, value: &str) -> io::Result<()> {
    let bytes = value.as_bytes();
    let mut seg = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'?' && bytes.get(i + 1) == Some(&b'>') {
            writer.write_str(&value[seg..i])?;
            writer.write_str("? >")?;
            i += 2;
            seg = i;
        } else {
            i += 1;
        }
    }
    writer.write_str(&value[seg..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{PARSE_DEFAULT, PARSE_EMBED_PCDATA, PARSE_FULL};

    fn parse(text: &str, options: u32) -> XmlDocument {
        let mut doc = XmlDocument::new();
        assert!(doc.load_string_with(text, options).ok());
        doc
    }

    fn save(doc: &XmlDocument, indent: &str, flags: u32, enc: XmlEncoding) -> Vec<u8> {
        let mut out = Vec::new();
        doc.save(&mut out, indent, flags, enc).unwrap();
        out
    }

    #[test]
    fn test_round_trip_raw() {
        let source = "<a><b x=\"1\"><!--c--></b>text</a>";
        let doc = parse(source, PARSE_FULL);
        assert_eq!(
            doc.to_xml_with("", FORMAT_RAW | FORMAT_NO_DECLARATION),
            source
        );
    }

    #[test]
    fn test_default_document_formatting() {
        let doc = parse("<node><child/></node>", PARSE_DEFAULT);
        let out = save(&doc, "\t", FORMAT_DEFAULT, XmlEncoding::Utf8);
        assert_eq!(
            out,
            b"<?xml version=\"1.0\"?>\n<node>\n\t<child />\n</node>\n"
        );
    }

    #[test]
    fn test_raw_save_keeps_synthetic_declaration() {
        let doc = parse("<node><child/></node>", PARSE_DEFAULT);
        let out = save(&doc, "", FORMAT_RAW, XmlEncoding::Utf8);
        assert_eq!(out, b"<?xml version=\"1.0\"?><node><child/></node>");
    }

    #[test]
    fn test_explicit_declaration_not_duplicated() {
        let doc = parse("<?xml version=\"1.1\"?><node/>", PARSE_FULL);
        let out = save(&doc, "", FORMAT_RAW, XmlEncoding::Utf8);
        assert_eq!(out, b"<?xml version=\"1.1\"?><node/>");
    }

    #[test]
    fn test_print_has_no_declaration() {
        let doc = parse("<node attr='1'><child>\u{1F308}</child></node>", PARSE_DEFAULT);
        let mut out = Vec::new();
        doc.root()
            .print(&mut out, "\t", FORMAT_DEFAULT, XmlEncoding::Utf8, 0)
            .unwrap();
        assert_eq!(
            out,
            "<node attr=\"1\">\n\t<child>\u{1F308}</child>\n</node>\n".as_bytes()
        );
    }

    #[test]
    fn test_indent_attributes() {
        let doc = parse("<node attr='1'><child>x</child></node>", PARSE_DEFAULT);
        let mut out = Vec::new();
        doc.root()
            .print(
                &mut out,
                "\t",
                FORMAT_INDENT_ATTRIBUTES,
                XmlEncoding::Utf8,
                0,
            )
            .unwrap();
        assert_eq!(out, b"<node\n\tattr=\"1\">\n\t<child>x</child>\n</node>\n");
    }

    #[test]
    fn test_empty_indent_keeps_newlines() {
        let doc = parse("<node attr='1'><child>x</child></node>", PARSE_DEFAULT);
        let mut out = Vec::new();
        doc.root()
            .print(&mut out, "", FORMAT_DEFAULT, XmlEncoding::Utf8, 0)
            .unwrap();
        assert_eq!(out, b"<node attr=\"1\">\n<child>x</child>\n</node>\n");
    }

    #[test]
    fn test_print_depth_seeds_indent() {
        let doc = parse("<node><child/></node>", PARSE_DEFAULT);
        let mut out = Vec::new();
        doc.document_element()
            .print(&mut out, "\t", FORMAT_DEFAULT, XmlEncoding::Utf8, 2)
            .unwrap();
        assert_eq!(out, b"\t\t<node>\n\t\t\t<child />\n\t\t</node>\n");
    }

    #[test]
    fn test_utf16_output_with_bom() {
        let doc = parse("<n/>", PARSE_DEFAULT);
        let out = save(
            &doc,
            "",
            FORMAT_NO_DECLARATION | FORMAT_RAW | FORMAT_WRITE_BOM,
            XmlEncoding::Utf16Be,
        );
        assert_eq!(out, b"\xfe\xff\x00<\x00n\x00/\x00>");
    }

    #[test]
    fn test_utf16_le_text() {
        let doc = parse("<node>\u{1F308}</node>", PARSE_DEFAULT);
        let mut out = Vec::new();
        doc.root()
            .print(&mut out, "", FORMAT_RAW, XmlEncoding::Utf16Le, 0)
            .unwrap();
        let expected: Vec<u8> = "<node>\u{1F308}</node>"
            .encode_utf16()
            .flat_map(|u| u.to_le_bytes())
            .collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_escaping() {
        let mut doc = XmlDocument::new();
        let root = doc.root_id();
        let n = doc.append_child(root, XmlNodeType::Element).unwrap();
        doc.set_name(n, "n");
        let attr = doc.append_attribute(n, "a").unwrap();
        doc.set_attr_value(attr, "<>&\"'\u{1}");
        let text = doc.append_child(n, XmlNodeType::Pcdata).unwrap();
        doc.set_value(text, "<>&\"\tz");

        assert_eq!(
            doc.to_xml_with("", FORMAT_RAW | FORMAT_NO_DECLARATION),
            "<n a=\"&lt;&gt;&amp;&quot;'&#01;\">&lt;&gt;&amp;\"\tz</n>"
        );
        assert_eq!(
            doc.to_xml_with(
                "",
                FORMAT_RAW | FORMAT_NO_DECLARATION | FORMAT_SKIP_CONTROL_CHARS
            ),
            "<n a=\"&lt;&gt;&amp;&quot;'\">&lt;&gt;&amp;\"\tz</n>"
        );
        assert_eq!(
            doc.to_xml_with("", FORMAT_RAW | FORMAT_NO_DECLARATION | FORMAT_NO_ESCAPES),
            "<n a=\"<>&\"'\u{1}\"><>&\"\tz</n>"
        );
    }

    #[test]
    fn test_attribute_single_quote() {
        let mut doc = XmlDocument::new();
        let root = doc.root_id();
        let n = doc.append_child(root, XmlNodeType::Element).unwrap();
        doc.set_name(n, "n");
        let attr = doc.append_attribute(n, "x").unwrap();
        doc.set_attr_value(attr, "a\"b'c");
        assert_eq!(
            doc.to_xml_with(
                "",
                FORMAT_RAW | FORMAT_NO_DECLARATION | FORMAT_ATTRIBUTE_SINGLE_QUOTE
            ),
            "<n x='a\"b&apos;c'/>"
        );
    }

    #[test]
    fn test_no_empty_element_tags() {
        let doc = parse("<n/>", PARSE_DEFAULT);
        assert_eq!(
            doc.to_xml_with(
                "",
                FORMAT_RAW | FORMAT_NO_DECLARATION | FORMAT_NO_EMPTY_ELEMENT_TAGS
            ),
            "<n></n>"
        );
    }

    #[test]
    fn test_comment_dashes_are_split() {
        let mut doc = XmlDocument::new();
        let root = doc.root_id();
        let comment = doc.append_child(root, XmlNodeType::Comment).unwrap();
        doc.set_value(comment, "a--b-");
        assert_eq!(
            doc.to_xml_with("", FORMAT_RAW | FORMAT_NO_DECLARATION),
            "<!--a- -b- -->"
        );
    }

    #[test]
    fn test_cdata_terminator_is_split() {
        let mut doc = XmlDocument::new();
        let root = doc.root_id();
        let cdata = doc.append_child(root, XmlNodeType::Cdata).unwrap();
        doc.set_value(cdata, "a]]>b");
        assert_eq!(
            doc.to_xml_with("", FORMAT_RAW | FORMAT_NO_DECLARATION),
            "<![CDATA[a]]]]><![CDATA[>b]]>"
        );
    }

    #[test]
    fn test_pi_terminator_is_split() {
        let mut doc = XmlDocument::new();
        let root = doc.root_id();
        let pi = doc.append_child(root, XmlNodeType::Pi).unwrap();
        doc.set_name(pi, "p");
        doc.set_value(pi, "x?>y");
        assert_eq!(
            doc.to_xml_with("", FORMAT_RAW | FORMAT_NO_DECLARATION),
            "<?p x? >y?>"
        );
    }

    #[test]
    fn test_doctype_and_bare_declaration() {
        let doc = parse("<?xml?><!DOCTYPE><node/>", PARSE_FULL);
        assert_eq!(
            doc.to_xml_with("", FORMAT_RAW),
            "<?xml?><!DOCTYPE ><node/>"
        );
    }

    #[test]
    fn test_embedded_value_prints_inline() {
        let doc = parse("<n>text</n>", PARSE_DEFAULT | PARSE_EMBED_PCDATA);
        let out = save(&doc, "\t", FORMAT_DEFAULT | FORMAT_NO_DECLARATION, XmlEncoding::Utf8);
        assert_eq!(out, b"<n>text</n>\n");
    }

    #[test]
    fn test_mixed_content_stays_inline() {
        let doc = parse("<node>foo<child/><child/></node>", PARSE_DEFAULT);
        let out = save(&doc, "\t", FORMAT_DEFAULT | FORMAT_NO_DECLARATION, XmlEncoding::Utf8);
        assert_eq!(out, b"<node>foo<child />\n\t<child />\n</node>\n");
    }

    #[test]
    fn test_writer_errors_propagate() {
        struct FailingWriter;
        impl Write for FailingWriter {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "refused"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }
        let doc = parse("<node/>", PARSE_DEFAULT);
        let mut sink = FailingWriter;
        assert!(doc.save(&mut sink, "\t", FORMAT_DEFAULT, XmlEncoding::Utf8).is_err());
    }
}
