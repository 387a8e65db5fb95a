//! Document parsing: option bitmask, status taxonomy, and the parser itself
//!
//! Options are independently ORable `u32` flags. [`PARSE_DEFAULT`] matches
//! common expectations (CDATA kept, references expanded, newlines and
//! attribute whitespace normalized); [`PARSE_FULL`] additionally retains
//! every auxiliary node type the parser can produce.

mod parser;

pub(crate) use parser::parse_into;

use crate::core::encoding::XmlEncoding;

/// Minimal parsing mode: no auxiliary nodes, no text transformations.
pub const PARSE_MINIMAL: u32 = 0x0000;
/// Retain processing instruction nodes.
pub const PARSE_PI: u32 = 0x0001;
/// Retain comment nodes.
pub const PARSE_COMMENTS: u32 = 0x0002;
/// Retain CDATA sections as nodes.
pub const PARSE_CDATA: u32 = 0x0004;
/// Keep PCDATA nodes that consist only of whitespace.
pub const PARSE_WS_PCDATA: u32 = 0x0008;
/// Expand character and entity references in text and attribute values.
pub const PARSE_ESCAPES: u32 = 0x0010;
/// Normalize line endings (CRLF and lone CR become LF).
pub const PARSE_EOL: u32 = 0x0020;
/// Convert tabs and newlines in attribute values to spaces.
pub const PARSE_WCONV_ATTRIBUTE: u32 = 0x0040;
/// Collapse and trim whitespace runs in attribute values.
pub const PARSE_WNORM_ATTRIBUTE: u32 = 0x0080;
/// Retain the XML declaration as a node.
pub const PARSE_DECLARATION: u32 = 0x0100;
/// Retain the document type declaration as a node.
pub const PARSE_DOCTYPE: u32 = 0x0200;
/// Keep a whitespace-only PCDATA node when it is the only content of its
/// parent element.
pub const PARSE_WS_PCDATA_SINGLE: u32 = 0x0400;
/// Trim leading and trailing whitespace from PCDATA.
pub const PARSE_TRIM_PCDATA: u32 = 0x0800;
/// Accept multiple top-level nodes and top-level text instead of requiring
/// a single document element.
pub const PARSE_FRAGMENT: u32 = 0x1000;
/// Store the first text run of an element in the element's own value
/// instead of allocating a PCDATA child.
pub const PARSE_EMBED_PCDATA: u32 = 0x2000;
/// Concatenate adjacent text runs (including runs separated by discarded
/// comments or CDATA) into a single PCDATA node.
pub const PARSE_MERGE_PCDATA: u32 = 0x4000;

/// Default parsing mode.
pub const PARSE_DEFAULT: u32 = PARSE_CDATA | PARSE_ESCAPES | PARSE_WCONV_ATTRIBUTE | PARSE_EOL;
/// Default mode plus every auxiliary node type.
pub const PARSE_FULL: u32 =
    PARSE_DEFAULT | PARSE_PI | PARSE_COMMENTS | PARSE_DECLARATION | PARSE_DOCTYPE;

/// Outcome classification of a parse attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    /// The document parsed without errors.
    Ok,
    /// The file could not be opened.
    FileNotFound,
    /// The file could not be read.
    IoError,
    /// Allocation failed while building the tree.
    OutOfMemory,
    /// An unexpected internal condition; also the status of a
    /// default-constructed [`ParseResult`].
    InternalError,
    /// `<` was followed by something that starts no known construct.
    UnrecognizedTag,
    /// Malformed processing instruction or declaration.
    BadPi,
    /// Malformed comment.
    BadComment,
    /// Malformed CDATA section.
    BadCdata,
    /// Malformed document type declaration.
    BadDoctype,
    /// Malformed plain character data.
    BadPcdata,
    /// Malformed start tag.
    BadStartElement,
    /// Malformed attribute.
    BadAttribute,
    /// Malformed end tag.
    BadEndElement,
    /// An end tag did not match the open element, or an element was never
    /// closed.
    EndElementMismatch,
    /// A fragment was appended to a node that cannot carry children.
    AppendInvalidRoot,
    /// Parsing finished but produced no document element outside fragment
    /// mode.
    NoDocumentElement,
}

impl ParseStatus {
    /// Short human-readable description of the status.
    pub fn description(self) -> &'static str {
        match self {
            ParseStatus::Ok => "No error",
            ParseStatus::FileNotFound => "File was not found",
            ParseStatus::IoError => "Error reading from file/stream",
            ParseStatus::OutOfMemory => "Could not allocate memory",
            ParseStatus::InternalError => "Internal error occurred",
            ParseStatus::UnrecognizedTag => "Could not determine tag type",
            ParseStatus::BadPi => "Error parsing document declaration/processing instruction",
            ParseStatus::BadComment => "Error parsing comment",
            ParseStatus::BadCdata => "Error parsing CDATA section",
            ParseStatus::BadDoctype => "Error parsing document type declaration",
            ParseStatus::BadPcdata => "Error parsing PCDATA section",
            ParseStatus::BadStartElement => "Error parsing start element tag",
            ParseStatus::BadAttribute => "Error parsing element attribute",
            ParseStatus::BadEndElement => "Error parsing end element tag",
            ParseStatus::EndElementMismatch => "Start-end tags mismatch",
            ParseStatus::AppendInvalidRoot => {
                "Unable to append nodes: root is not an element or document"
            }
            ParseStatus::NoDocumentElement => "No document element found",
        }
    }
}

/// Result of a parse attempt: status, byte offset of the failure in the
/// source text (0 on success), and the encoding that was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseResult {
    pub status: ParseStatus,
    pub offset: usize,
    pub encoding: XmlEncoding,
}

impl ParseResult {
    /// True when parsing succeeded.
    pub fn ok(&self) -> bool {
        self.status == ParseStatus::Ok
    }

    /// Short human-readable description of the status.
    pub fn description(&self) -> &'static str {
        self.status.description()
    }

    pub(crate) fn failure(status: ParseStatus) -> Self {
        ParseResult {
            status,
            offset: 0,
            encoding: XmlEncoding::Auto,
        }
    }
}

impl Default for ParseResult {
    /// A default result reports an internal error, so a result that was
    /// never produced by a parse cannot be mistaken for success.
    fn default() -> Self {
        ParseResult {
            status: ParseStatus::InternalError,
            offset: 0,
            encoding: XmlEncoding::Auto,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_result_is_error() {
        let result = ParseResult::default();
        assert!(!result.ok());
        assert_eq!(result.status, ParseStatus::InternalError);
        assert_eq!(result.offset, 0);
        assert_eq!(result.description(), "Internal error occurred");
    }

    #[test]
    fn test_descriptions() {
        assert_eq!(ParseStatus::Ok.description(), "No error");
        assert_eq!(
            ParseStatus::EndElementMismatch.description(),
            "Start-end tags mismatch"
        );
        assert_eq!(
            ParseStatus::BadComment.description(),
            "Error parsing comment"
        );
    }

    #[test]
    fn test_option_composition() {
        assert_eq!(PARSE_DEFAULT & PARSE_CDATA, PARSE_CDATA);
        assert_eq!(PARSE_DEFAULT & PARSE_COMMENTS, 0);
        assert_eq!(PARSE_FULL & PARSE_COMMENTS, PARSE_COMMENTS);
        assert_eq!(PARSE_FULL & PARSE_DOCTYPE, PARSE_DOCTYPE);
        assert_eq!(PARSE_MINIMAL, 0);
    }
}
