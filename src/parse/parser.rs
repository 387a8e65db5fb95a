//! Single-pass XML parser
//!
//! Walks the source text once with a [`Scanner`], building nodes directly
//! into the document arena. Name and value slots reference the source text
//! by range whenever no transformation applies, so a parse allocates only
//! for values that escapes or whitespace handling actually change.
//!
//! Errors carry the byte offset of the offending construct. Offsets for
//! truncated input point at the last byte of the text.

use std::borrow::Cow;

use crate::core::encoding::XmlEncoding;
use crate::core::entities;
use crate::core::scanner::{self, Scanner};
use crate::dom::document::XmlDocument;
use crate::dom::node::{NodeId, XmlNodeType};
use crate::dom::strings::StrSlot;

use super::{
    ParseResult, ParseStatus, PARSE_CDATA, PARSE_COMMENTS, PARSE_DECLARATION, PARSE_DOCTYPE,
    PARSE_EMBED_PCDATA, PARSE_EOL, PARSE_ESCAPES, PARSE_FRAGMENT, PARSE_MERGE_PCDATA,
    PARSE_PI, PARSE_TRIM_PCDATA, PARSE_WCONV_ATTRIBUTE, PARSE_WNORM_ATTRIBUTE, PARSE_WS_PCDATA,
    PARSE_WS_PCDATA_SINGLE,
};

struct Fail {
    status: ParseStatus,
    offset: usize,
}

type Parse<T> = Result<T, Fail>;

fn fail<T>(status: ParseStatus, offset: usize) -> Parse<T> {
    Err(Fail { status, offset })
}

/// Entry on the open-element stack: node id plus the byte range of the tag
/// name, used to match end tags without touching the (not yet installed)
/// document buffer.
struct OpenTag {
    id: NodeId,
    name_start: usize,
    name_end: usize,
    has_value: bool,
}

struct Parser<'a, 'd> {
    doc: &'d mut XmlDocument,
    scan: Scanner<'a>,
    text: &'a str,
    options: u32,
    stack: Vec<OpenTag>,
}

/// Parse `text` into `doc`, which must be freshly reset. The caller installs
/// `text` as the document buffer afterwards and fills in the encoding.
pub(crate) fn parse_into(doc: &mut XmlDocument, text: &str, options: u32) -> ParseResult {
    if text.is_empty() {
        let status = if options & PARSE_FRAGMENT != 0 {
            ParseStatus::Ok
        } else {
            ParseStatus::NoDocumentElement
        };
        return ParseResult {
            status,
            offset: 0,
            encoding: XmlEncoding::Auto,
        };
    }
    let mut parser = Parser {
        doc,
        scan: Scanner::new(text.as_bytes()),
        text,
        options,
        stack: Vec::new(),
    };
    match parser.run() {
        Ok(()) => ParseResult {
            status: ParseStatus::Ok,
            offset: 0,
            encoding: XmlEncoding::Auto,
        },
        Err(e) => ParseResult {
            status: e.status,
            offset: e.offset,
            encoding: XmlEncoding::Auto,
        },
    }
}

impl<'a, 'd> Parser<'a, 'd> {
    fn run(&mut self) -> Parse<()> {
        // UTF-8 byte order mark survives decoding; keep it out of the tree
        if self.scan.starts_with(&[0xEF, 0xBB, 0xBF]) {
            self.scan.advance(3);
        }
        let mut stray_open = false;
        loop {
            let b = match self.scan.peek() {
                Some(b) => b,
                None => break,
            };
            if b == b'<' {
                self.scan.advance(1);
                if self.scan.is_eof() {
                    stray_open = true;
                    break;
                }
                self.parse_markup()?;
            } else {
                self.parse_text()?;
            }
        }
        if !self.stack.is_empty() {
            return fail(ParseStatus::EndElementMismatch, self.eof_offset());
        }
        if stray_open {
            return fail(ParseStatus::UnrecognizedTag, self.eof_offset());
        }
        if self.options & PARSE_FRAGMENT == 0 && !self.has_element_child() {
            return fail(ParseStatus::NoDocumentElement, self.eof_offset());
        }
        Ok(())
    }

    /// Offset reported for errors discovered at the end of input.
    fn eof_offset(&self) -> usize {
        self.scan.len().saturating_sub(1)
    }

    /// Current insertion point: innermost open element, or the document.
    fn cursor(&self) -> NodeId {
        match self.stack.last() {
            Some(open) => open.id,
            None => self.doc.root_id(),
        }
    }

    fn append_node(&mut self, kind: XmlNodeType) -> NodeId {
        let parent = self.cursor();
        let id = self.doc.allocate_node(kind);
        self.doc.link_child_last(parent, id);
        id
    }

    fn has_element_child(&self) -> bool {
        let mut cur = self.doc.first_child_of(self.doc.root_id());
        while let Some(id) = cur {
            if self.doc.kind_of(id) == XmlNodeType::Element {
                return true;
            }
            cur = self.doc.next_sibling_of(id);
        }
        false
    }

    // ----- markup ----------------------------------------------------------

    /// Dispatch on the byte after `<`.
    fn parse_markup(&mut self) -> Parse<()> {
        let b = match self.scan.peek() {
            Some(b) => b,
            None => return fail(ParseStatus::UnrecognizedTag, self.eof_offset()),
        };
        if scanner::is_name_start_char(b) {
            self.parse_element()
        } else if b == b'/' {
            self.parse_end_element()
        } else if b == b'?' {
            self.parse_question()
        } else if b == b'!' {
            self.parse_exclamation()
        } else {
            fail(ParseStatus::UnrecognizedTag, self.scan.position())
        }
    }

    fn parse_element(&mut self) -> Parse<()> {
        let name_start = self.scan.position();
        if self.scan.read_name().is_none() {
            return fail(ParseStatus::BadStartElement, name_start);
        }
        let name_end = self.scan.position();
        let id = self.append_node(XmlNodeType::Element);
        self.doc
            .set_node_name_slot(id, StrSlot::from_range(name_start, name_end));
        self.doc.set_node_offset(id, name_start);

        match self.scan.peek() {
            Some(b'>') => {
                self.scan.advance(1);
                self.stack.push(OpenTag {
                    id,
                    name_start,
                    name_end,
                    has_value: false,
                });
                Ok(())
            }
            Some(b'/') => {
                self.scan.advance(1);
                match self.scan.peek() {
                    Some(b'>') => {
                        self.scan.advance(1);
                        Ok(())
                    }
                    Some(_) => fail(ParseStatus::BadStartElement, self.scan.position()),
                    None => fail(ParseStatus::BadStartElement, self.eof_offset()),
                }
            }
            Some(c) if scanner::is_space(c) => {
                self.scan.advance(1);
                if self.parse_attributes(id, false)? {
                    self.stack.push(OpenTag {
                        id,
                        name_start,
                        name_end,
                        has_value: false,
                    });
                }
                Ok(())
            }
            Some(_) => {
                self.scan.advance(1);
                fail(ParseStatus::BadStartElement, self.scan.position())
            }
            None => fail(ParseStatus::BadStartElement, self.eof_offset()),
        }
    }

    /// Attribute list of a start tag. With `declaration` set the list may
    /// also terminate with `?>`. Returns true when the tag was left open
    /// with `>`, false when it was self-closed.
    fn parse_attributes(&mut self, elem: NodeId, declaration: bool) -> Parse<bool> {
        loop {
            self.scan.skip_whitespace();
            let b = match self.scan.peek() {
                Some(b) => b,
                None => return fail(ParseStatus::BadStartElement, self.eof_offset()),
            };
            if scanner::is_name_start_char(b) {
                let name_start = self.scan.position();
                if self.scan.read_name().is_none() {
                    return fail(ParseStatus::BadStartElement, name_start);
                }
                let name_end = self.scan.position();
                let attr = self.doc.allocate_attr();
                self.doc.link_attr_last(elem, attr);
                self.doc
                    .set_attr_name_slot(attr, StrSlot::from_range(name_start, name_end));

                let mut ch = match self.scan.peek() {
                    Some(c) => c,
                    None => return fail(ParseStatus::BadAttribute, self.scan.position()),
                };
                self.scan.advance(1);
                if scanner::is_space(ch) {
                    self.scan.skip_whitespace();
                    ch = match self.scan.peek() {
                        Some(c) => c,
                        None => return fail(ParseStatus::BadAttribute, self.scan.position()),
                    };
                    self.scan.advance(1);
                }
                if ch != b'=' {
                    return fail(ParseStatus::BadAttribute, self.scan.position());
                }
                self.scan.skip_whitespace();
                let quote = match self.scan.peek() {
                    Some(q @ (b'"' | b'\'')) => q,
                    _ => return fail(ParseStatus::BadAttribute, self.scan.position()),
                };
                self.scan.advance(1);
                let value_start = self.scan.position();
                let value_end = match self.scan.find_byte(quote) {
                    Some(e) => e,
                    None => return fail(ParseStatus::BadAttribute, value_start),
                };
                let raw = &self.text[value_start..value_end];
                let slot = match convert_attribute(raw, self.options) {
                    Some(owned) => StrSlot::from_owned(owned),
                    None => StrSlot::from_range(value_start, value_end),
                };
                self.doc.set_attr_value_slot(attr, slot);
                self.scan.set_position(value_end + 1);
                if let Some(next) = self.scan.peek() {
                    if scanner::is_name_start_char(next) {
                        return fail(ParseStatus::BadAttribute, self.scan.position());
                    }
                }
            } else if b == b'/' {
                self.scan.advance(1);
                match self.scan.peek() {
                    Some(b'>') => {
                        self.scan.advance(1);
                        return Ok(false);
                    }
                    Some(_) => return fail(ParseStatus::BadStartElement, self.scan.position()),
                    None => return fail(ParseStatus::BadStartElement, self.eof_offset()),
                }
            } else if b == b'>' {
                self.scan.advance(1);
                return Ok(true);
            } else if declaration && b == b'?' && self.scan.peek_at(1) == Some(b'>') {
                self.scan.advance(2);
                return Ok(false);
            } else {
                return fail(ParseStatus::BadStartElement, self.scan.position());
            }
        }
    }

    fn parse_end_element(&mut self) -> Parse<()> {
        self.scan.advance(1);
        let mark = self.scan.position();
        let (expect_start, expect_end) = match self.stack.last() {
            Some(open) => (open.name_start, open.name_end),
            None => return fail(ParseStatus::EndElementMismatch, mark),
        };
        while let Some(c) = self.scan.peek() {
            if !scanner::is_name_char(c) {
                break;
            }
            self.scan.advance(1);
        }
        let bytes = self.text.as_bytes();
        if bytes[mark..self.scan.position()] != bytes[expect_start..expect_end] {
            return fail(ParseStatus::EndElementMismatch, mark);
        }
        self.stack.pop();
        self.scan.skip_whitespace();
        match self.scan.peek() {
            Some(b'>') => {
                self.scan.advance(1);
                Ok(())
            }
            Some(_) => fail(ParseStatus::BadEndElement, self.scan.position()),
            None => fail(ParseStatus::BadEndElement, self.eof_offset()),
        }
    }

    /// `<?...`: processing instruction or XML declaration.
    ///
    /// The target `xml` (case-insensitive) marks a declaration, which is
    /// only valid at top level and whose body parses as an attribute list.
    /// A PI value is kept verbatim. Disabled constructs are skipped but
    /// still validated for a terminator.
    fn parse_question(&mut self) -> Parse<()> {
        self.scan.advance(1);
        let target_start = self.scan.position();
        if self.scan.is_eof() {
            return fail(ParseStatus::BadPi, self.eof_offset());
        }
        let target = match self.scan.read_name() {
            Some(t) => t,
            None => return fail(ParseStatus::BadPi, self.scan.position()),
        };
        let target_end = self.scan.position();
        let declaration = target.eq_ignore_ascii_case(b"xml");
        let enabled = if declaration {
            self.options & PARSE_DECLARATION != 0
        } else {
            self.options & PARSE_PI != 0
        };
        let term = self.scan.peek();
        if term.is_some() {
            self.scan.advance(1);
        }

        if !enabled {
            return match term {
                Some(b'?') => {
                    if self.scan.peek() == Some(b'>') {
                        self.scan.advance(1);
                        Ok(())
                    } else {
                        fail(ParseStatus::BadPi, self.scan.position())
                    }
                }
                Some(_) => match self.scan.find_sequence(b"?>") {
                    Some(close) => {
                        self.scan.set_position(close + 2);
                        Ok(())
                    }
                    None => fail(ParseStatus::BadPi, self.eof_offset()),
                },
                None => fail(ParseStatus::BadPi, self.scan.position()),
            };
        }

        if declaration && !self.stack.is_empty() {
            return fail(ParseStatus::BadPi, self.scan.position());
        }
        match term {
            Some(b'?') => {
                if self.scan.peek() != Some(b'>') {
                    return fail(ParseStatus::BadPi, self.scan.position());
                }
                self.scan.advance(1);
                let kind = if declaration {
                    XmlNodeType::Declaration
                } else {
                    XmlNodeType::Pi
                };
                let id = self.append_node(kind);
                self.doc
                    .set_node_name_slot(id, StrSlot::from_range(target_start, target_end));
                self.doc.set_node_offset(id, target_start);
                Ok(())
            }
            Some(c) if scanner::is_space(c) => {
                self.scan.skip_whitespace();
                let value_start = self.scan.position();
                let close = match self.scan.find_sequence(b"?>") {
                    Some(p) => p,
                    None => return fail(ParseStatus::BadPi, self.eof_offset()),
                };
                if declaration {
                    let id = self.append_node(XmlNodeType::Declaration);
                    self.doc
                        .set_node_name_slot(id, StrSlot::from_range(target_start, target_end));
                    self.doc.set_node_offset(id, target_start);
                    if self.parse_attributes(id, true)? {
                        self.stack.push(OpenTag {
                            id,
                            name_start: target_start,
                            name_end: target_end,
                            has_value: false,
                        });
                    }
                } else {
                    let id = self.append_node(XmlNodeType::Pi);
                    self.doc
                        .set_node_name_slot(id, StrSlot::from_range(target_start, target_end));
                    self.doc
                        .set_node_value_slot(id, StrSlot::from_range(value_start, close));
                    self.doc.set_node_offset(id, target_start);
                    self.scan.set_position(close + 2);
                }
                Ok(())
            }
            Some(_) => fail(ParseStatus::BadPi, self.scan.position()),
            None => fail(ParseStatus::BadPi, self.scan.position()),
        }
    }

    /// `<!...`: comment, CDATA section, or document type declaration.
    fn parse_exclamation(&mut self) -> Parse<()> {
        self.scan.advance(1);
        match self.scan.peek() {
            Some(b'-') => {
                self.scan.advance(1);
                match self.scan.peek() {
                    Some(b'-') => {
                        self.scan.advance(1);
                        self.parse_comment()
                    }
                    Some(_) => fail(ParseStatus::BadComment, self.scan.position()),
                    None => fail(ParseStatus::BadComment, self.eof_offset()),
                }
            }
            Some(b'[') => {
                self.scan.advance(1);
                self.parse_cdata()
            }
            Some(_) if self.at_doctype() => self.parse_doctype(),
            Some(_) => fail(ParseStatus::UnrecognizedTag, self.scan.position()),
            None => fail(ParseStatus::UnrecognizedTag, self.eof_offset()),
        }
    }

    fn at_doctype(&self) -> bool {
        self.scan.starts_with(b"DOCTYPE")
            && match self.scan.peek_at(7) {
                Some(c) => scanner::is_space(c) || c == b'>',
                None => false,
            }
    }

    fn parse_comment(&mut self) -> Parse<()> {
        let value_start = self.scan.position();
        let keep = self.options & PARSE_COMMENTS != 0;
        let eol = self.options & PARSE_EOL != 0;
        let close = match self.scan.find_sequence(b"-->") {
            Some(p) => p,
            None if keep && eol => return fail(ParseStatus::BadComment, value_start),
            None => return fail(ParseStatus::BadComment, self.eof_offset()),
        };
        if keep {
            let raw = &self.text[value_start..close];
            let slot = if eol {
                match convert_eol(raw, false) {
                    Some(owned) => StrSlot::from_owned(owned),
                    None => StrSlot::from_range(value_start, close),
                }
            } else {
                StrSlot::from_range(value_start, close)
            };
            let id = self.append_node(XmlNodeType::Comment);
            self.doc.set_node_value_slot(id, slot);
            self.doc.set_node_offset(id, value_start);
        }
        self.scan.set_position(close + 3);
        Ok(())
    }

    fn parse_cdata(&mut self) -> Parse<()> {
        const MARKER: &[u8] = b"CDATA[";
        for (i, &expected) in MARKER.iter().enumerate() {
            match self.scan.peek_at(i) {
                Some(b) if b == expected => {}
                Some(_) => return fail(ParseStatus::BadCdata, self.scan.position() + i),
                None => return fail(ParseStatus::BadCdata, self.eof_offset()),
            }
        }
        self.scan.advance(MARKER.len());
        let value_start = self.scan.position();
        let keep = self.options & PARSE_CDATA != 0;
        let eol = self.options & PARSE_EOL != 0;
        let close = match self.scan.find_sequence(b"]]>") {
            Some(p) => p,
            None if keep && eol => return fail(ParseStatus::BadCdata, value_start),
            None => return fail(ParseStatus::BadCdata, self.eof_offset()),
        };
        if keep {
            let raw = &self.text[value_start..close];
            let slot = if eol {
                match convert_eol(raw, false) {
                    Some(owned) => StrSlot::from_owned(owned),
                    None => StrSlot::from_range(value_start, close),
                }
            } else {
                StrSlot::from_range(value_start, close)
            };
            let id = self.append_node(XmlNodeType::Cdata);
            self.doc.set_node_value_slot(id, slot);
            self.doc.set_node_offset(id, value_start);
        }
        self.scan.set_position(close + 3);
        Ok(())
    }

    /// `<!DOCTYPE ...>` with nested `[...]` groups, quoted strings, comments
    /// and PIs inside. Only valid at top level. The raw content (after the
    /// keyword, whitespace skipped) becomes the node value.
    fn parse_doctype(&mut self) -> Parse<()> {
        let open_pos = self.scan.position() - 2;
        if !self.stack.is_empty() {
            return fail(ParseStatus::BadDoctype, open_pos);
        }
        let mark = self.scan.position() + 7;
        let close = self.doctype_group()?;
        self.scan.set_position(close + 1);
        if self.options & PARSE_DOCTYPE != 0 {
            let bytes = self.text.as_bytes();
            let mut value_start = mark;
            while value_start < close && scanner::is_space(bytes[value_start]) {
                value_start += 1;
            }
            let id = self.append_node(XmlNodeType::Doctype);
            self.doc
                .set_node_value_slot(id, StrSlot::from_range(value_start, close));
            self.doc.set_node_offset(id, value_start);
        }
        Ok(())
    }

    /// Scan a doctype group, tracking `<!...>` nesting depth. Returns the
    /// position of the closing `>`.
    fn doctype_group(&mut self) -> Parse<usize> {
        let mut depth = 0usize;
        loop {
            let b = match self.scan.peek() {
                Some(b) => b,
                None => return fail(ParseStatus::BadDoctype, self.eof_offset()),
            };
            if b == b'<'
                && self.scan.peek_at(1) == Some(b'!')
                && self.scan.peek_at(2) != Some(b'-')
            {
                if self.scan.peek_at(2) == Some(b'[') {
                    self.doctype_ignore()?;
                } else {
                    self.scan.advance(2);
                    depth += 1;
                }
            } else if b == b'<' || b == b'"' || b == b'\'' {
                self.doctype_primitive()?;
            } else if b == b'>' {
                if depth == 0 {
                    return Ok(self.scan.position());
                }
                depth -= 1;
                self.scan.advance(1);
            } else {
                self.scan.advance(1);
            }
        }
    }

    /// Quoted string, `<?...?>`, or `<!--...-->` inside a doctype group.
    fn doctype_primitive(&mut self) -> Parse<()> {
        let b = match self.scan.peek() {
            Some(b) => b,
            None => return fail(ParseStatus::BadDoctype, self.eof_offset()),
        };
        if b == b'"' || b == b'\'' {
            self.scan.advance(1);
            match self.scan.find_byte(b) {
                Some(q) => {
                    self.scan.set_position(q + 1);
                    Ok(())
                }
                None => fail(ParseStatus::BadDoctype, self.eof_offset()),
            }
        } else if self.scan.starts_with(b"<?") {
            self.scan.advance(2);
            match self.scan.find_sequence(b"?>") {
                Some(q) => {
                    self.scan.set_position(q + 2);
                    Ok(())
                }
                None => fail(ParseStatus::BadDoctype, self.eof_offset()),
            }
        } else if self.scan.starts_with(b"<!--") {
            self.scan.advance(4);
            match self.scan.find_sequence(b"-->") {
                Some(q) => {
                    self.scan.set_position(q + 3);
                    Ok(())
                }
                None => fail(ParseStatus::BadDoctype, self.eof_offset()),
            }
        } else {
            fail(ParseStatus::BadDoctype, self.scan.position())
        }
    }

    /// `<![...]]>` conditional section inside a doctype, possibly nested.
    fn doctype_ignore(&mut self) -> Parse<()> {
        self.scan.advance(3);
        let mut depth = 0usize;
        loop {
            if self.scan.starts_with(b"<![") {
                self.scan.advance(3);
                depth += 1;
            } else if self.scan.starts_with(b"]]>") {
                self.scan.advance(3);
                if depth == 0 {
                    return Ok(());
                }
                depth -= 1;
            } else if self.scan.is_eof() {
                return fail(ParseStatus::BadDoctype, self.eof_offset());
            } else {
                self.scan.advance(1);
            }
        }
    }

    // ----- character data --------------------------------------------------

    /// Character data between markup. Whitespace-only runs are kept or
    /// dropped according to the whitespace options; text at document level
    /// is dropped unless fragment parsing is on.
    fn parse_text(&mut self) -> Parse<()> {
        let mark = self.scan.position();
        self.scan.skip_whitespace();
        let at_break = matches!(self.scan.peek(), None | Some(b'<'));
        if at_break && self.scan.position() > mark {
            let keep = self.options & (PARSE_WS_PCDATA | PARSE_WS_PCDATA_SINGLE) != 0
                && self.options & PARSE_TRIM_PCDATA == 0;
            if !keep {
                return Ok(());
            }
            if self.options & PARSE_WS_PCDATA_SINGLE != 0 {
                let closes_parent = self.scan.starts_with(b"</");
                let has_children = self.doc.first_child_of(self.cursor()).is_some();
                if !closes_parent || has_children {
                    return Ok(());
                }
            }
        }
        let start = if self.options & PARSE_TRIM_PCDATA != 0 {
            self.scan.position()
        } else {
            mark
        };
        self.scan.set_position(start);

        if self.stack.is_empty() && self.options & PARSE_FRAGMENT == 0 {
            let next = self.scan.find_tag_start().unwrap_or(self.scan.len());
            self.scan.set_position(next);
            return Ok(());
        }

        let end = self.scan.find_tag_start().unwrap_or(self.scan.len());
        let raw = &self.text[start..end];
        let converted = convert_pcdata(raw, self.options);

        let embeddable = match self.stack.last() {
            Some(open) => self.doc.first_child_of(open.id).is_none() && !open.has_value,
            None => false,
        };
        if self.options & PARSE_EMBED_PCDATA != 0 && embeddable {
            let slot = match converted {
                Some(owned) => StrSlot::from_owned(owned),
                None => StrSlot::from_range(start, end),
            };
            let cursor = self.cursor();
            self.doc.set_node_value_slot(cursor, slot);
            if let Some(open) = self.stack.last_mut() {
                open.has_value = true;
            }
        } else {
            let cursor = self.cursor();
            let merge_into = if self.options & PARSE_MERGE_PCDATA != 0 {
                self.doc
                    .last_child_of(cursor)
                    .filter(|&id| self.doc.kind_of(id) == XmlNodeType::Pcdata)
            } else {
                None
            };
            if let Some(prev) = merge_into {
                let mut merged = match self.doc.node_value_slot(prev) {
                    Some(slot) => slot.resolve(self.text).to_owned(),
                    None => String::new(),
                };
                merged.push_str(converted.as_deref().unwrap_or(raw));
                self.doc
                    .set_node_value_slot(prev, StrSlot::from_owned(merged));
            } else {
                let id = self.append_node(XmlNodeType::Pcdata);
                let slot = match converted {
                    Some(owned) => StrSlot::from_owned(owned),
                    None => StrSlot::from_range(start, end),
                };
                self.doc.set_node_value_slot(id, slot);
                self.doc.set_node_offset(id, start);
            }
        }
        self.scan.set_position(end);
        Ok(())
    }
}

// ----- text transformations ------------------------------------------------

/// PCDATA conversion: reference expansion, newline normalization, and
/// trailing trim. Returns None when the raw slice can be kept as-is.
fn convert_pcdata(raw: &str, options: u32) -> Option<String> {
    let escapes = options & PARSE_ESCAPES != 0;
    let eol = options & PARSE_EOL != 0;
    let trim = options & PARSE_TRIM_PCDATA != 0;
    let bytes = raw.as_bytes();
    let needs = bytes
        .iter()
        .any(|&b| (escapes && b == b'&') || (eol && b == b'\r'));
    if !needs {
        if trim {
            let mut end = raw.len();
            while end > 0 && scanner::is_space(bytes[end - 1]) {
                end -= 1;
            }
            if end != raw.len() {
                return Some(raw[..end].to_string());
            }
        }
        return None;
    }
    let mut out = String::with_capacity(raw.len());
    let mut seg = 0;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if escapes && b == b'&' {
            out.push_str(&raw[seg..i]);
            match entities::decode_ref(&raw[i..]) {
                Some((c, used)) => {
                    out.push(c);
                    i += used;
                }
                None => {
                    out.push('&');
                    i += 1;
                }
            }
            seg = i;
        } else if eol && b == b'\r' {
            out.push_str(&raw[seg..i]);
            out.push('\n');
            i += 1;
            if bytes.get(i) == Some(&b'\n') {
                i += 1;
            }
            seg = i;
        } else {
            i += 1;
        }
    }
    out.push_str(&raw[seg..]);
    if trim {
        pop_trailing_space(&mut out);
    }
    if out == raw {
        None
    } else {
        Some(out)
    }
}

/// `\r\n` and lone `\r` become `\n`; used for comments, CDATA, and
/// attribute values when only end-of-line handling applies.
fn convert_eol(raw: &str, escapes: bool) -> Option<String> {
    let bytes = raw.as_bytes();
    let needs = bytes
        .iter()
        .any(|&b| b == b'\r' || (escapes && b == b'&'));
    if !needs {
        return None;
    }
    let mut out = String::with_capacity(raw.len());
    let mut seg = 0;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\r' {
            out.push_str(&raw[seg..i]);
            out.push('\n');
            i += 1;
            if bytes.get(i) == Some(&b'\n') {
                i += 1;
            }
            seg = i;
        } else if escapes && b == b'&' {
            out.push_str(&raw[seg..i]);
            match entities::decode_ref(&raw[i..]) {
                Some((c, used)) => {
                    out.push(c);
                    i += used;
                }
                None => {
                    out.push('&');
                    i += 1;
                }
            }
            seg = i;
        } else {
            i += 1;
        }
    }
    out.push_str(&raw[seg..]);
    if out == raw {
        None
    } else {
        Some(out)
    }
}

/// Attribute value conversion, picked by option precedence: whitespace
/// normalization wins over whitespace conversion, which wins over plain
/// end-of-line handling.
fn convert_attribute(raw: &str, options: u32) -> Option<String> {
    let escapes = options & PARSE_ESCAPES != 0;
    if options & PARSE_WNORM_ATTRIBUTE != 0 {
        convert_attr_wnorm(raw, escapes)
    } else if options & PARSE_WCONV_ATTRIBUTE != 0 {
        convert_attr_wconv(raw, escapes)
    } else if options & PARSE_EOL != 0 {
        convert_eol(raw, escapes)
    } else if escapes {
        convert_refs_only(raw)
    } else {
        None
    }
}

fn convert_refs_only(raw: &str) -> Option<String> {
    match entities::decode_refs(raw) {
        Cow::Borrowed(_) => None,
        Cow::Owned(out) => {
            if out == raw {
                None
            } else {
                Some(out)
            }
        }
    }
}

/// Every whitespace character becomes a space, with `\r\n` collapsing to a
/// single one. Characters produced by reference expansion are kept verbatim.
fn convert_attr_wconv(raw: &str, escapes: bool) -> Option<String> {
    let bytes = raw.as_bytes();
    let needs = bytes
        .iter()
        .any(|&b| matches!(b, b'\t' | b'\n' | b'\r') || (escapes && b == b'&'));
    if !needs {
        return None;
    }
    let mut out = String::with_capacity(raw.len());
    let mut seg = 0;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\r' {
            out.push_str(&raw[seg..i]);
            out.push(' ');
            i += 1;
            if bytes.get(i) == Some(&b'\n') {
                i += 1;
            }
            seg = i;
        } else if b == b'\t' || b == b'\n' {
            out.push_str(&raw[seg..i]);
            out.push(' ');
            i += 1;
            seg = i;
        } else if escapes && b == b'&' {
            out.push_str(&raw[seg..i]);
            match entities::decode_ref(&raw[i..]) {
                Some((c, used)) => {
                    out.push(c);
                    i += used;
                }
                None => {
                    out.push('&');
                    i += 1;
                }
            }
            seg = i;
        } else {
            i += 1;
        }
    }
    out.push_str(&raw[seg..]);
    if out == raw {
        None
    } else {
        Some(out)
    }
}

/// Leading and trailing whitespace is removed and interior runs collapse to
/// a single space. Only raw whitespace collapses; expanded references do
/// not merge with neighboring runs.
fn convert_attr_wnorm(raw: &str, escapes: bool) -> Option<String> {
    let bytes = raw.as_bytes();
    let needs = bytes
        .iter()
        .any(|&b| scanner::is_space(b) || (escapes && b == b'&'));
    if !needs {
        return None;
    }
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;
    while i < bytes.len() && scanner::is_space(bytes[i]) {
        i += 1;
    }
    let mut seg = i;
    while i < bytes.len() {
        let b = bytes[i];
        if scanner::is_space(b) {
            out.push_str(&raw[seg..i]);
            out.push(' ');
            i += 1;
            while i < bytes.len() && scanner::is_space(bytes[i]) {
                i += 1;
            }
            seg = i;
        } else if escapes && b == b'&' {
            out.push_str(&raw[seg..i]);
            match entities::decode_ref(&raw[i..]) {
                Some((c, used)) => {
                    out.push(c);
                    i += used;
                }
                None => {
                    out.push('&');
                    i += 1;
                }
            }
            seg = i;
        } else {
            i += 1;
        }
    }
    out.push_str(&raw[seg..]);
    pop_trailing_space(&mut out);
    if out == raw {
        None
    } else {
        Some(out)
    }
}

fn pop_trailing_space(out: &mut String) {
    while matches!(out.as_bytes().last(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
        out.pop();
    }
}
