//! XML node and attribute records
//!
//! Arena records are addressed by `NodeId`/`AttrId`, `NonZeroU32` newtypes so
//! that `Option<NodeId>` stays four bytes. Ids are plain indices without
//! generation tags: an id whose record was detached keeps pointing at the
//! abandoned slot until the owning document is reset or dropped, and reusing
//! it is a caller contract violation rather than a checked error.

use std::num::NonZeroU32;

use crate::dom::strings::StrSlot;

/// Compact node identifier (index into the node arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    #[inline]
    pub(crate) fn from_index(index: usize) -> Self {
        // index + 1 so index 0 (the document record) is representable
        NodeId(NonZeroU32::new(index as u32 + 1).unwrap_or(NonZeroU32::MIN))
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0.get() as usize - 1
    }
}

/// Compact attribute identifier (index into the attribute arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttrId(NonZeroU32);

impl AttrId {
    #[inline]
    pub(crate) fn from_index(index: usize) -> Self {
        AttrId(NonZeroU32::new(index as u32 + 1).unwrap_or(NonZeroU32::MIN))
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0.get() as usize - 1
    }
}

/// Type of XML node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum XmlNodeType {
    /// Empty handle
    #[default]
    Null,
    /// Document root
    Document,
    /// Element, e.g. `<node/>`
    Element,
    /// Plain character data, e.g. `text`
    Pcdata,
    /// CDATA section, e.g. `<![CDATA[text]]>`
    Cdata,
    /// Comment, e.g. `<!-- text -->`
    Comment,
    /// Processing instruction, e.g. `<?name value?>`
    Pi,
    /// Declaration, e.g. `<?xml version="1.0"?>`
    Declaration,
    /// Document type declaration, e.g. `<!DOCTYPE doc>`
    Doctype,
}

impl XmlNodeType {
    /// True for the kinds that carry a name (element, PI, declaration)
    #[inline]
    pub fn has_name(self) -> bool {
        matches!(
            self,
            XmlNodeType::Element | XmlNodeType::Pi | XmlNodeType::Declaration
        )
    }

    /// True for the kinds that carry a value (pcdata, CDATA, comment, PI, doctype)
    #[inline]
    pub fn has_value(self) -> bool {
        matches!(
            self,
            XmlNodeType::Pcdata
                | XmlNodeType::Cdata
                | XmlNodeType::Comment
                | XmlNodeType::Pi
                | XmlNodeType::Doctype
        )
    }
}

/// Check whether a node of type `child` may be inserted under a node of
/// type `parent`. Declarations and doctypes live only at document level.
#[inline]
pub(crate) fn allow_insert_child(parent: XmlNodeType, child: XmlNodeType) -> bool {
    if parent != XmlNodeType::Document && parent != XmlNodeType::Element {
        return false;
    }
    if child == XmlNodeType::Document || child == XmlNodeType::Null {
        return false;
    }
    if parent != XmlNodeType::Document
        && (child == XmlNodeType::Declaration || child == XmlNodeType::Doctype)
    {
        return false;
    }
    true
}

/// Check whether a node of this type may own attributes
#[inline]
pub(crate) fn allow_insert_attribute(parent: XmlNodeType) -> bool {
    matches!(parent, XmlNodeType::Element | XmlNodeType::Declaration)
}

/// A node record in the arena
#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub kind: XmlNodeType,
    pub parent: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub first_attr: Option<AttrId>,
    pub last_attr: Option<AttrId>,
    /// Name for elements/PIs/declarations, empty otherwise
    pub name: StrSlot,
    /// Value for pcdata/CDATA/comment/PI/doctype; also holds text embedded
    /// in an element by the embed_pcdata parse option
    pub value: StrSlot,
    /// Byte offset of the node's name (named kinds) or value (value kinds)
    /// in the retained source buffer; None for DOM-built nodes
    pub source_offset: Option<u32>,
}

impl NodeData {
    pub fn new(kind: XmlNodeType) -> Self {
        NodeData {
            kind,
            parent: None,
            prev_sibling: None,
            next_sibling: None,
            first_child: None,
            last_child: None,
            first_attr: None,
            last_attr: None,
            name: StrSlot::empty(),
            value: StrSlot::empty(),
            source_offset: None,
        }
    }
}

/// An attribute record in the arena, doubly linked among its element's
/// attributes. The owner is not stored; XPath carries the owning element
/// alongside the attribute where it needs one.
#[derive(Debug, Clone)]
pub(crate) struct AttributeData {
    pub name: StrSlot,
    pub value: StrSlot,
    pub prev: Option<AttrId>,
    pub next: Option<AttrId>,
}

impl AttributeData {
    pub fn new() -> Self {
        AttributeData {
            name: StrSlot::empty(),
            value: StrSlot::empty(),
            prev: None,
            next: None,
        }
    }
}
