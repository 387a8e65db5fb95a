//! Borrowing handles over nodes and attributes.
//!
//! `XmlNode` and `XmlAttribute` are `Copy` views that pair a document
//! reference with an optional id. A missing id means the null handle:
//! every accessor returns an empty or null result instead of panicking,
//! so navigation chains like `doc.child("a").child("b").attribute("x")`
//! need no intermediate checks.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::io;

use crate::core::encoding::XmlEncoding;
use crate::dom::document::XmlDocument;
use crate::dom::node::{AttrId, NodeId, XmlNodeType};
use crate::dom::text::{self, XmlText};
use crate::serial;
use crate::xpath::{self, XPathError, XPathNode, XPathNodeSet, XPathVariableSet};

/// Handle on a single node of an [`XmlDocument`].
#[derive(Clone, Copy)]
pub struct XmlNode<'a> {
    doc: &'a XmlDocument,
    id: Option<NodeId>,
}

impl<'a> XmlNode<'a> {
    pub(crate) fn new(doc: &'a XmlDocument, id: Option<NodeId>) -> Self {
        XmlNode { doc, id }
    }

    fn null(&self) -> XmlNode<'a> {
        XmlNode {
            doc: self.doc,
            id: None,
        }
    }

    /// The document this handle belongs to.
    pub fn document(&self) -> &'a XmlDocument {
        self.doc
    }

    /// Id of the node, usable with the document's mutation methods.
    pub fn id(&self) -> Option<NodeId> {
        self.id
    }

    pub fn is_null(&self) -> bool {
        self.id.is_none()
    }

    pub fn node_type(&self) -> XmlNodeType {
        match self.id {
            Some(id) => self.doc.kind_of(id),
            None => XmlNodeType::Null,
        }
    }

    /// Node name: tag name for elements, target for processing
    /// instructions. `""` for unnamed kinds and the null handle.
    pub fn name(&self) -> &'a str {
        match self.id {
            Some(id) => self.doc.name_of(id),
            None => "",
        }
    }

    /// Node value: text for text nodes, content for comments and
    /// doctypes. `""` for elements; element text is reached through
    /// [`child_value`](Self::child_value) or [`text`](Self::text).
    pub fn value(&self) -> &'a str {
        match self.id {
            Some(id) => self.doc.value_of(id),
            None => "",
        }
    }

    // ----- navigation -------------------------------------------------------

    pub fn parent(&self) -> XmlNode<'a> {
        XmlNode {
            doc: self.doc,
            id: self.id.and_then(|id| self.doc.parent_of(id)),
        }
    }

    /// Topmost ancestor; for attached nodes this is the document node.
    pub fn root(&self) -> XmlNode<'a> {
        let mut cur = *self;
        loop {
            let parent = cur.parent();
            if parent.is_null() {
                return cur;
            }
            cur = parent;
        }
    }

    pub fn first_child(&self) -> XmlNode<'a> {
        XmlNode {
            doc: self.doc,
            id: self.id.and_then(|id| self.doc.first_child_of(id)),
        }
    }

    pub fn last_child(&self) -> XmlNode<'a> {
        XmlNode {
            doc: self.doc,
            id: self.id.and_then(|id| self.doc.last_child_of(id)),
        }
    }

    pub fn next_sibling(&self) -> XmlNode<'a> {
        XmlNode {
            doc: self.doc,
            id: self.id.and_then(|id| self.doc.next_sibling_of(id)),
        }
    }

    pub fn previous_sibling(&self) -> XmlNode<'a> {
        XmlNode {
            doc: self.doc,
            id: self.id.and_then(|id| self.doc.prev_sibling_of(id)),
        }
    }

    /// First child with the given name.
    pub fn child(&self, name: &str) -> XmlNode<'a> {
        let mut cur = self.first_child();
        while let Some(id) = cur.id {
            if self.doc.name_of(id) == name {
                return cur;
            }
            cur = cur.next_sibling();
        }
        self.null()
    }

    /// Next sibling with the given name.
    pub fn next_sibling_named(&self, name: &str) -> XmlNode<'a> {
        let mut cur = self.next_sibling();
        while let Some(id) = cur.id {
            if self.doc.name_of(id) == name {
                return cur;
            }
            cur = cur.next_sibling();
        }
        self.null()
    }

    /// Previous sibling with the given name.
    pub fn previous_sibling_named(&self, name: &str) -> XmlNode<'a> {
        let mut cur = self.previous_sibling();
        while let Some(id) = cur.id {
            if self.doc.name_of(id) == name {
                return cur;
            }
            cur = cur.previous_sibling();
        }
        self.null()
    }

    /// Iterator over child nodes in document order.
    pub fn children(&self) -> Children<'a> {
        Children {
            doc: self.doc,
            next: self.id.and_then(|id| self.doc.first_child_of(id)),
        }
    }

    // ----- attributes -------------------------------------------------------

    pub fn first_attribute(&self) -> XmlAttribute<'a> {
        XmlAttribute {
            doc: self.doc,
            id: self.id.and_then(|id| self.doc.first_attr_of(id)),
        }
    }

    pub fn last_attribute(&self) -> XmlAttribute<'a> {
        XmlAttribute {
            doc: self.doc,
            id: self.id.and_then(|id| self.doc.last_attr_of(id)),
        }
    }

    /// Attribute with the given name.
    pub fn attribute(&self, name: &str) -> XmlAttribute<'a> {
        let mut cur = self.first_attribute();
        while let Some(id) = cur.id {
            if self.doc.attr_name_of(id) == name {
                return cur;
            }
            cur = cur.next_attribute();
        }
        XmlAttribute {
            doc: self.doc,
            id: None,
        }
    }

    /// Attribute lookup seeded by a position hint, for callers that fetch
    /// attributes roughly in document order. The search starts at the
    /// hint, wraps around to the front, and on a hit moves the hint to the
    /// attribute after the match. A miss leaves the hint untouched.
    pub fn attribute_hinted(&self, name: &str, hint: &mut Option<AttrId>) -> XmlAttribute<'a> {
        let id = match self.id {
            Some(id) => id,
            None => {
                return XmlAttribute {
                    doc: self.doc,
                    id: None,
                }
            }
        };
        let doc = self.doc;
        let start = *hint;
        let mut cur = start;
        while let Some(a) = cur {
            if doc.attr_name_of(a) == name {
                *hint = doc.attr_next_of(a);
                return XmlAttribute { doc, id: Some(a) };
            }
            cur = doc.attr_next_of(a);
        }
        let mut cur = doc.first_attr_of(id);
        while cur != start {
            let a = match cur {
                Some(a) => a,
                None => break,
            };
            if doc.attr_name_of(a) == name {
                *hint = doc.attr_next_of(a);
                return XmlAttribute { doc, id: Some(a) };
            }
            cur = doc.attr_next_of(a);
        }
        XmlAttribute { doc, id: None }
    }

    /// Iterator over attributes in list order.
    pub fn attributes(&self) -> Attributes<'a> {
        Attributes {
            doc: self.doc,
            next: self.id.and_then(|id| self.doc.first_attr_of(id)),
        }
    }

    // ----- content ----------------------------------------------------------

    /// Value of the first text child with content. For elements that had
    /// text embedded into them at parse time, the element's own value.
    pub fn child_value(&self) -> &'a str {
        let id = match self.id {
            Some(id) => id,
            None => return "",
        };
        let doc = self.doc;
        if doc.kind_of(id) == XmlNodeType::Element {
            let own = doc.value_of(id);
            if !own.is_empty() {
                return own;
            }
        }
        let mut cur = doc.first_child_of(id);
        while let Some(c) = cur {
            match doc.kind_of(c) {
                XmlNodeType::Pcdata | XmlNodeType::Cdata => {
                    let v = doc.value_of(c);
                    if !v.is_empty() {
                        return v;
                    }
                }
                _ => {}
            }
            cur = doc.next_sibling_of(c);
        }
        ""
    }

    /// `child(name).child_value()`.
    pub fn child_value_named(&self, name: &str) -> &'a str {
        self.child(name).child_value()
    }

    /// Typed view of this node's text.
    pub fn text(&self) -> XmlText<'a> {
        XmlText::new(*self)
    }

    // ----- searches ---------------------------------------------------------

    /// First attribute satisfying the predicate.
    pub fn find_attribute<P>(&self, mut pred: P) -> XmlAttribute<'a>
    where
        P: FnMut(XmlAttribute<'a>) -> bool,
    {
        let mut cur = self.first_attribute();
        while !cur.is_null() {
            if pred(cur) {
                return cur;
            }
            cur = cur.next_attribute();
        }
        cur
    }

    /// First child satisfying the predicate.
    pub fn find_child<P>(&self, mut pred: P) -> XmlNode<'a>
    where
        P: FnMut(XmlNode<'a>) -> bool,
    {
        let mut cur = self.first_child();
        while !cur.is_null() {
            if pred(cur) {
                return cur;
            }
            cur = cur.next_sibling();
        }
        cur
    }

    /// First node in the subtree (excluding this node, depth first)
    /// satisfying the predicate.
    pub fn find_node<P>(&self, mut pred: P) -> XmlNode<'a>
    where
        P: FnMut(XmlNode<'a>) -> bool,
    {
        let doc = self.doc;
        let id = match self.id {
            Some(id) => id,
            None => return self.null(),
        };
        // Children pushed youngest first so the stack pops in document order.
        let mut stack = Vec::new();
        let mut cur = doc.last_child_of(id);
        while let Some(c) = cur {
            stack.push(c);
            cur = doc.prev_sibling_of(c);
        }
        while let Some(c) = stack.pop() {
            let node = XmlNode { doc, id: Some(c) };
            if pred(node) {
                return node;
            }
            let mut kid = doc.last_child_of(c);
            while let Some(k) = kid {
                stack.push(k);
                kid = doc.prev_sibling_of(k);
            }
        }
        self.null()
    }

    /// First child whose name and attribute match. `child_name: None`
    /// matches any child.
    pub fn find_child_by_attribute(
        &self,
        child_name: Option<&str>,
        attr_name: &str,
        attr_value: &str,
    ) -> XmlNode<'a> {
        let mut cur = self.first_child();
        while let Some(id) = cur.id {
            let name_ok = match child_name {
                Some(n) => self.doc.name_of(id) == n,
                None => true,
            };
            if name_ok {
                let attr = cur.attribute(attr_name);
                if !attr.is_null() && attr.value() == attr_value {
                    return cur;
                }
            }
            cur = cur.next_sibling();
        }
        self.null()
    }

    // ----- paths ------------------------------------------------------------

    /// Absolute path from the document node, `'/'` separated.
    pub fn path(&self) -> String {
        self.path_with('/')
    }

    /// Absolute path with an explicit separator. The document node
    /// contributes an empty leading segment, so attached nodes get paths
    /// like `/root/child`.
    pub fn path_with(&self, delimiter: char) -> String {
        if self.is_null() {
            return String::new();
        }
        let mut names = Vec::new();
        let mut cur = *self;
        while !cur.is_null() {
            names.push(cur.name());
            cur = cur.parent();
        }
        let mut result = String::new();
        for (i, name) in names.iter().rev().enumerate() {
            if i > 0 {
                result.push(delimiter);
            }
            result.push_str(name);
        }
        result
    }

    /// First node matching a `'/'` separated path of names. A leading
    /// separator anchors the search at the document node; `.` and `..`
    /// segments select the current node and the parent. When several
    /// children share a name, each is tried until one leads to a full
    /// match.
    pub fn first_element_by_path(&self, path: &str) -> XmlNode<'a> {
        self.first_element_by_path_with(path, '/')
    }

    pub fn first_element_by_path_with(&self, path: &str, delimiter: char) -> XmlNode<'a> {
        if self.is_null() {
            return *self;
        }
        let context = if path.starts_with(delimiter) {
            self.root()
        } else {
            *self
        };
        Self::walk_path(context, path, delimiter)
    }

    fn walk_path(context: XmlNode<'a>, path: &str, delimiter: char) -> XmlNode<'a> {
        let path = path.trim_start_matches(delimiter);
        if path.is_empty() {
            return context;
        }
        let (segment, rest) = match path.find(delimiter) {
            Some(i) => (&path[..i], &path[i + delimiter.len_utf8()..]),
            None => (path, ""),
        };
        match segment {
            "." => Self::walk_path(context, rest, delimiter),
            ".." => {
                let parent = context.parent();
                if parent.is_null() {
                    parent
                } else {
                    Self::walk_path(parent, rest, delimiter)
                }
            }
            _ => {
                let mut child = context.first_child();
                while !child.is_null() {
                    if child.name() == segment {
                        let found = Self::walk_path(child, rest, delimiter);
                        if !found.is_null() {
                            return found;
                        }
                    }
                    child = child.next_sibling();
                }
                context.null()
            }
        }
    }

    // ----- diagnostics ------------------------------------------------------

    /// Byte offset of this node in the source text of the last load.
    /// `None` for nodes built through the DOM; `Some(0)` for the document
    /// node itself.
    pub fn offset_debug(&self) -> Option<usize> {
        let id = self.id?;
        if self.doc.kind_of(id) == XmlNodeType::Document {
            return Some(0);
        }
        self.doc.offset_of(id)
    }

    // ----- output -----------------------------------------------------------

    /// Serializes the subtree rooted at this node. Unlike
    /// [`XmlDocument::save`], no declaration or byte order mark is
    /// synthesized; `depth` seeds the starting indentation level. Printing
    /// a null handle writes nothing.
    pub fn print<W: io::Write>(
        &self,
        writer: &mut W,
        indent: &str,
        flags: u32,
        encoding: XmlEncoding,
        depth: usize,
    ) -> io::Result<()> {
        match self.id {
            Some(id) => serial::print_node(self.doc, id, writer, indent, flags, encoding, depth),
            None => Ok(()),
        }
    }

    // ----- traversal --------------------------------------------------------

    /// Depth first traversal of the subtree. `begin` and `end` bracket the
    /// walk; `for_each` sees every descendant with its depth relative to
    /// this node (immediate children are depth 0). Returning `false` from
    /// any callback aborts the walk and makes `traverse` return `false`.
    pub fn traverse<W: XmlTreeWalker>(&self, walker: &mut W) -> bool {
        if !walker.begin(*self) {
            return false;
        }
        let start = self.id;
        let mut depth: i32 = -1;
        let mut cur = self.first_child();
        if !cur.is_null() {
            depth += 1;
            while !cur.is_null() && cur.id != start {
                if !walker.for_each(cur, depth) {
                    return false;
                }
                let first = cur.first_child();
                if !first.is_null() {
                    depth += 1;
                    cur = first;
                } else if !cur.next_sibling().is_null() {
                    cur = cur.next_sibling();
                } else {
                    while cur.next_sibling().is_null()
                        && cur.id != start
                        && !cur.parent().is_null()
                    {
                        depth -= 1;
                        cur = cur.parent();
                    }
                    if cur.id != start {
                        cur = cur.next_sibling();
                    }
                }
            }
        }
        walker.end(*self)
    }

    // ----- xpath ------------------------------------------------------------

    /// Evaluates an XPath expression with this node as context and returns
    /// all matching nodes. Compiled programs for variable-free expressions
    /// are cached process-wide.
    pub fn select_nodes(&self, expr: &str) -> Result<XPathNodeSet<'a>, XPathError> {
        xpath::select_nodes(*self, expr)
    }

    /// Like [`select_nodes`](Self::select_nodes) with variable bindings.
    pub fn select_nodes_with(
        &self,
        expr: &str,
        vars: &XPathVariableSet<'a>,
    ) -> Result<XPathNodeSet<'a>, XPathError> {
        xpath::select_nodes_with(*self, expr, vars)
    }

    /// First matching node in document order, if any.
    pub fn select_node(&self, expr: &str) -> Result<Option<XPathNode<'a>>, XPathError> {
        xpath::select_node(*self, expr)
    }

    /// Like [`select_node`](Self::select_node) with variable bindings.
    pub fn select_node_with(
        &self,
        expr: &str,
        vars: &XPathVariableSet<'a>,
    ) -> Result<Option<XPathNode<'a>>, XPathError> {
        xpath::select_node_with(*self, expr, vars)
    }
}

impl PartialEq for XmlNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.id == other.id
    }
}

impl Eq for XmlNode<'_> {}

impl Hash for XmlNode<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.doc as *const XmlDocument as usize).hash(state);
        self.id.hash(state);
    }
}

impl fmt::Debug for XmlNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "XmlNode(null)")
        } else {
            write!(f, "XmlNode({:?}, {:?})", self.node_type(), self.name())
        }
    }
}

/// Handle on an attribute of an element (or declaration) node.
#[derive(Clone, Copy)]
pub struct XmlAttribute<'a> {
    doc: &'a XmlDocument,
    id: Option<AttrId>,
}

impl<'a> XmlAttribute<'a> {
    pub(crate) fn new(doc: &'a XmlDocument, id: Option<AttrId>) -> Self {
        XmlAttribute { doc, id }
    }

    pub fn id(&self) -> Option<AttrId> {
        self.id
    }

    pub fn is_null(&self) -> bool {
        self.id.is_none()
    }

    pub fn name(&self) -> &'a str {
        match self.id {
            Some(id) => self.doc.attr_name_of(id),
            None => "",
        }
    }

    pub fn value(&self) -> &'a str {
        match self.id {
            Some(id) => self.doc.attr_value_of(id),
            None => "",
        }
    }

    pub fn next_attribute(&self) -> XmlAttribute<'a> {
        XmlAttribute {
            doc: self.doc,
            id: self.id.and_then(|id| self.doc.attr_next_of(id)),
        }
    }

    pub fn previous_attribute(&self) -> XmlAttribute<'a> {
        XmlAttribute {
            doc: self.doc,
            id: self.id.and_then(|id| self.doc.attr_prev_of(id)),
        }
    }

    pub fn as_i32(&self) -> i32 {
        text::parse_i32(self.value())
    }

    pub fn as_u32(&self) -> u32 {
        text::parse_u32(self.value())
    }

    pub fn as_i64(&self) -> i64 {
        text::parse_i64(self.value())
    }

    pub fn as_u64(&self) -> u64 {
        text::parse_u64(self.value())
    }

    pub fn as_f32(&self) -> f32 {
        text::parse_f64(self.value()) as f32
    }

    pub fn as_f64(&self) -> f64 {
        text::parse_f64(self.value())
    }

    /// True when the value starts with `1`, `t`, `T`, `y` or `Y`.
    pub fn as_bool(&self) -> bool {
        text::parse_bool(self.value())
    }
}

impl PartialEq for XmlAttribute<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.id == other.id
    }
}

impl Eq for XmlAttribute<'_> {}

impl Hash for XmlAttribute<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.doc as *const XmlDocument as usize).hash(state);
        self.id.hash(state);
    }
}

impl fmt::Debug for XmlAttribute<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "XmlAttribute(null)")
        } else {
            write!(f, "XmlAttribute({:?}={:?})", self.name(), self.value())
        }
    }
}

/// Callbacks for [`XmlNode::traverse`].
pub trait XmlTreeWalker {
    /// Called once before the first node. Return `false` to abort.
    fn begin(&mut self, node: XmlNode<'_>) -> bool {
        let _ = node;
        true
    }

    /// Called for every node in the subtree with its depth relative to the
    /// traversal root (immediate children are depth 0).
    fn for_each(&mut self, node: XmlNode<'_>, depth: i32) -> bool;

    /// Called once after the last node. The return value becomes the
    /// result of `traverse`.
    fn end(&mut self, node: XmlNode<'_>) -> bool {
        let _ = node;
        true
    }
}

/// Iterator over the children of a node.
pub struct Children<'a> {
    doc: &'a XmlDocument,
    next: Option<NodeId>,
}

impl<'a> Iterator for Children<'a> {
    type Item = XmlNode<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        self.next = self.doc.next_sibling_of(id);
        Some(XmlNode {
            doc: self.doc,
            id: Some(id),
        })
    }
}

/// Iterator over the attributes of a node.
pub struct Attributes<'a> {
    doc: &'a XmlDocument,
    next: Option<AttrId>,
}

impl<'a> Iterator for Attributes<'a> {
    type Item = XmlAttribute<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        self.next = self.doc.attr_next_of(id);
        Some(XmlAttribute {
            doc: self.doc,
            id: Some(id),
        })
    }
}
