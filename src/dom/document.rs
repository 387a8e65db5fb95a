//! Arena-backed XML document.
//!
//! `XmlDocument` owns every node and attribute record in two flat vectors,
//! plus the decoded source text that parsed names and values point into.
//! Ids (`NodeId`, `AttrId`) are indices into those vectors; removing a node
//! detaches it from the tree but never frees its slot, so ids handed out
//! earlier stay in bounds until the next `reset` or load.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use crate::core::encoding::{self, XmlEncoding};
use crate::dom::node::{
    allow_insert_attribute, allow_insert_child, AttrId, AttributeData, NodeData, NodeId,
    XmlNodeType,
};
use crate::dom::strings::StrSlot;
use crate::dom::{XmlAttribute, XmlNode};
use crate::parse::{self, ParseResult, ParseStatus};
use crate::serial::{self, FORMAT_DEFAULT, FORMAT_SAVE_FILE_TEXT};
use crate::xpath::{XPathError, XPathNode, XPathNodeSet, XPathVariableSet};

/// An XML tree: the document node, its descendants, and their attributes.
///
/// All mutation goes through `&mut self` methods addressed by id. Read
/// access goes through the borrowing [`XmlNode`] / [`XmlAttribute`] handles
/// obtained from [`root`](Self::root) or [`get`](Self::get).
pub struct XmlDocument {
    pub(crate) nodes: Vec<NodeData>,
    pub(crate) attrs: Vec<AttributeData>,
    /// Decoded source text from the last load. `StrSlot::Ref` ranges in
    /// node and attribute records resolve against this.
    pub(crate) buffer: String,
}

impl Default for XmlDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlDocument {
    /// Creates an empty document containing only the document node.
    pub fn new() -> Self {
        XmlDocument {
            nodes: vec![NodeData::new(XmlNodeType::Document)],
            attrs: Vec::new(),
            buffer: String::new(),
        }
    }

    /// Id of the document node itself. Always valid.
    pub fn root_id(&self) -> NodeId {
        NodeId::from_index(0)
    }

    /// Handle on the document node.
    pub fn root(&self) -> XmlNode<'_> {
        XmlNode::new(self, Some(self.root_id()))
    }

    /// Handle for an id obtained from an earlier mutation call.
    pub fn get(&self, id: NodeId) -> XmlNode<'_> {
        if id.index() < self.nodes.len() {
            XmlNode::new(self, Some(id))
        } else {
            XmlNode::new(self, None)
        }
    }

    /// Wraps an attribute id in a handle.
    pub fn get_attr(&self, id: AttrId) -> XmlAttribute<'_> {
        if id.index() < self.attrs.len() {
            XmlAttribute::new(self, Some(id))
        } else {
            XmlAttribute::new(self, None)
        }
    }

    /// The first element child of the document node, or a null handle for
    /// documents without one.
    pub fn document_element(&self) -> XmlNode<'_> {
        let mut cur = self.first_child_of(self.root_id());
        while let Some(id) = cur {
            if self.kind_of(id) == XmlNodeType::Element {
                return XmlNode::new(self, Some(id));
            }
            cur = self.next_sibling_of(id);
        }
        XmlNode::new(self, None)
    }

    /// Shorthand for `root().child(name)`.
    pub fn child(&self, name: &str) -> XmlNode<'_> {
        self.root().child(name)
    }

    /// Shorthand for `root().first_child()`.
    pub fn first_child(&self) -> XmlNode<'_> {
        self.root().first_child()
    }

    /// Runs an XPath expression with the document node as context.
    pub fn select_nodes(&self, expr: &str) -> Result<XPathNodeSet<'_>, XPathError> {
        self.root().select_nodes(expr)
    }

    /// Like [`select_nodes`](Self::select_nodes) with variable bindings.
    pub fn select_nodes_with<'s>(
        &'s self,
        expr: &str,
        vars: &XPathVariableSet<'s>,
    ) -> Result<XPathNodeSet<'s>, XPathError> {
        self.root().select_nodes_with(expr, vars)
    }

    /// First match in document order with the document node as context.
    pub fn select_node(&self, expr: &str) -> Result<Option<XPathNode<'_>>, XPathError> {
        self.root().select_node(expr)
    }

    /// Like [`select_node`](Self::select_node) with variable bindings.
    pub fn select_node_with<'s>(
        &'s self,
        expr: &str,
        vars: &XPathVariableSet<'s>,
    ) -> Result<Option<XPathNode<'s>>, XPathError> {
        self.root().select_node_with(expr, vars)
    }

    // ----- record access ---------------------------------------------------

    #[inline]
    pub(crate) fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.index())
    }

    #[inline]
    fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id.index())
    }

    #[inline]
    pub(crate) fn attr(&self, id: AttrId) -> Option<&AttributeData> {
        self.attrs.get(id.index())
    }

    #[inline]
    fn attr_mut(&mut self, id: AttrId) -> Option<&mut AttributeData> {
        self.attrs.get_mut(id.index())
    }

    #[inline]
    pub(crate) fn kind_of(&self, id: NodeId) -> XmlNodeType {
        self.node(id).map(|n| n.kind).unwrap_or(XmlNodeType::Null)
    }

    #[inline]
    pub(crate) fn name_of(&self, id: NodeId) -> &str {
        self.node(id)
            .map(|n| n.name.resolve(&self.buffer))
            .unwrap_or("")
    }

    #[inline]
    pub(crate) fn value_of(&self, id: NodeId) -> &str {
        self.node(id)
            .map(|n| n.value.resolve(&self.buffer))
            .unwrap_or("")
    }

    #[inline]
    pub(crate) fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    #[inline]
    pub(crate) fn first_child_of(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.first_child)
    }

    #[inline]
    pub(crate) fn last_child_of(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.last_child)
    }

    #[inline]
    pub(crate) fn next_sibling_of(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.next_sibling)
    }

    #[inline]
    pub(crate) fn prev_sibling_of(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.prev_sibling)
    }

    #[inline]
    pub(crate) fn first_attr_of(&self, id: NodeId) -> Option<AttrId> {
        self.node(id).and_then(|n| n.first_attr)
    }

    #[inline]
    pub(crate) fn last_attr_of(&self, id: NodeId) -> Option<AttrId> {
        self.node(id).and_then(|n| n.last_attr)
    }

    #[inline]
    pub(crate) fn attr_name_of(&self, id: AttrId) -> &str {
        self.attr(id)
            .map(|a| a.name.resolve(&self.buffer))
            .unwrap_or("")
    }

    #[inline]
    pub(crate) fn attr_value_of(&self, id: AttrId) -> &str {
        self.attr(id)
            .map(|a| a.value.resolve(&self.buffer))
            .unwrap_or("")
    }

    #[inline]
    pub(crate) fn attr_next_of(&self, id: AttrId) -> Option<AttrId> {
        self.attr(id).and_then(|a| a.next)
    }

    #[inline]
    pub(crate) fn attr_prev_of(&self, id: AttrId) -> Option<AttrId> {
        self.attr(id).and_then(|a| a.prev)
    }

    /// Byte offset of the node in the source of the last load, if it was
    /// produced by a parse.
    pub(crate) fn offset_of(&self, id: NodeId) -> Option<usize> {
        self.node(id)
            .and_then(|n| n.source_offset)
            .map(|o| o as usize)
    }

    /// True if `ancestor` is `node` itself or one of its ancestors.
    pub(crate) fn is_in_subtree(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut cur = Some(node);
        while let Some(id) = cur {
            if id == ancestor {
                return true;
            }
            cur = self.parent_of(id);
        }
        false
    }

    /// True if `attr` is in the attribute list of `elem`.
    pub(crate) fn is_attribute_of(&self, attr: AttrId, elem: NodeId) -> bool {
        let mut cur = self.first_attr_of(elem);
        while let Some(id) = cur {
            if id == attr {
                return true;
            }
            cur = self.attr_next_of(id);
        }
        false
    }

    // ----- allocation and linking -----------------------------------------

    pub(crate) fn allocate_node(&mut self, kind: XmlNodeType) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(NodeData::new(kind));
        id
    }

    pub(crate) fn allocate_attr(&mut self) -> AttrId {
        let id = AttrId::from_index(self.attrs.len());
        self.attrs.push(AttributeData::new());
        id
    }

    pub(crate) fn set_node_name_slot(&mut self, id: NodeId, slot: StrSlot) {
        if let Some(n) = self.node_mut(id) {
            n.name = slot;
        }
    }

    pub(crate) fn set_node_value_slot(&mut self, id: NodeId, slot: StrSlot) {
        if let Some(n) = self.node_mut(id) {
            n.value = slot;
        }
    }

    /// Raw value slot access for the parser, which resolves slots against
    /// the source text before it becomes the document buffer.
    pub(crate) fn node_value_slot(&self, id: NodeId) -> Option<&StrSlot> {
        self.node(id).map(|n| &n.value)
    }

    pub(crate) fn set_node_offset(&mut self, id: NodeId, offset: usize) {
        if let Some(n) = self.node_mut(id) {
            n.source_offset = Some(offset as u32);
        }
    }

    pub(crate) fn set_attr_name_slot(&mut self, id: AttrId, slot: StrSlot) {
        if let Some(a) = self.attr_mut(id) {
            a.name = slot;
        }
    }

    pub(crate) fn set_attr_value_slot(&mut self, id: AttrId, slot: StrSlot) {
        if let Some(a) = self.attr_mut(id) {
            a.value = slot;
        }
    }

    pub(crate) fn link_child_last(&mut self, parent: NodeId, child: NodeId) {
        let prev = self.last_child_of(parent);
        if let Some(c) = self.node_mut(child) {
            c.parent = Some(parent);
            c.prev_sibling = prev;
            c.next_sibling = None;
        }
        if let Some(p) = prev {
            if let Some(r) = self.node_mut(p) {
                r.next_sibling = Some(child);
            }
        }
        if let Some(p) = self.node_mut(parent) {
            if p.first_child.is_none() {
                p.first_child = Some(child);
            }
            p.last_child = Some(child);
        }
    }

    fn link_child_first(&mut self, parent: NodeId, child: NodeId) {
        let next = self.first_child_of(parent);
        if let Some(c) = self.node_mut(child) {
            c.parent = Some(parent);
            c.prev_sibling = None;
            c.next_sibling = next;
        }
        if let Some(n) = next {
            if let Some(r) = self.node_mut(n) {
                r.prev_sibling = Some(child);
            }
        }
        if let Some(p) = self.node_mut(parent) {
            if p.last_child.is_none() {
                p.last_child = Some(child);
            }
            p.first_child = Some(child);
        }
    }

    /// Links `child` immediately after `anchor`, which must already be
    /// linked under `parent`.
    fn link_child_after(&mut self, parent: NodeId, anchor: NodeId, child: NodeId) {
        let next = self.next_sibling_of(anchor);
        if let Some(c) = self.node_mut(child) {
            c.parent = Some(parent);
            c.prev_sibling = Some(anchor);
            c.next_sibling = next;
        }
        if let Some(a) = self.node_mut(anchor) {
            a.next_sibling = Some(child);
        }
        match next {
            Some(n) => {
                if let Some(r) = self.node_mut(n) {
                    r.prev_sibling = Some(child);
                }
            }
            None => {
                if let Some(p) = self.node_mut(parent) {
                    p.last_child = Some(child);
                }
            }
        }
    }

    fn link_child_before(&mut self, parent: NodeId, anchor: NodeId, child: NodeId) {
        let prev = self.prev_sibling_of(anchor);
        if let Some(c) = self.node_mut(child) {
            c.parent = Some(parent);
            c.prev_sibling = prev;
            c.next_sibling = Some(anchor);
        }
        if let Some(a) = self.node_mut(anchor) {
            a.prev_sibling = Some(child);
        }
        match prev {
            Some(p) => {
                if let Some(r) = self.node_mut(p) {
                    r.next_sibling = Some(child);
                }
            }
            None => {
                if let Some(p) = self.node_mut(parent) {
                    p.first_child = Some(child);
                }
            }
        }
    }

    /// Unlinks `child` from its parent. The record's tree links are
    /// cleared; the slot itself stays allocated.
    fn unlink_child(&mut self, child: NodeId) {
        let (parent, prev, next) = match self.node(child) {
            Some(n) => (n.parent, n.prev_sibling, n.next_sibling),
            None => return,
        };
        if let Some(p) = parent {
            if let Some(r) = self.node_mut(p) {
                if r.first_child == Some(child) {
                    r.first_child = next;
                }
                if r.last_child == Some(child) {
                    r.last_child = prev;
                }
            }
        }
        if let Some(p) = prev {
            if let Some(r) = self.node_mut(p) {
                r.next_sibling = next;
            }
        }
        if let Some(n) = next {
            if let Some(r) = self.node_mut(n) {
                r.prev_sibling = prev;
            }
        }
        if let Some(c) = self.node_mut(child) {
            c.parent = None;
            c.prev_sibling = None;
            c.next_sibling = None;
        }
    }

    pub(crate) fn link_attr_last(&mut self, elem: NodeId, attr: AttrId) {
        let prev = self.last_attr_of(elem);
        if let Some(a) = self.attr_mut(attr) {
            a.prev = prev;
            a.next = None;
        }
        if let Some(p) = prev {
            if let Some(r) = self.attr_mut(p) {
                r.next = Some(attr);
            }
        }
        if let Some(n) = self.node_mut(elem) {
            if n.first_attr.is_none() {
                n.first_attr = Some(attr);
            }
            n.last_attr = Some(attr);
        }
    }

    fn link_attr_first(&mut self, elem: NodeId, attr: AttrId) {
        let next = self.first_attr_of(elem);
        if let Some(a) = self.attr_mut(attr) {
            a.prev = None;
            a.next = next;
        }
        if let Some(n) = next {
            if let Some(r) = self.attr_mut(n) {
                r.prev = Some(attr);
            }
        }
        if let Some(n) = self.node_mut(elem) {
            if n.last_attr.is_none() {
                n.last_attr = Some(attr);
            }
            n.first_attr = Some(attr);
        }
    }

    fn link_attr_after(&mut self, elem: NodeId, anchor: AttrId, attr: AttrId) {
        let next = self.attr_next_of(anchor);
        if let Some(a) = self.attr_mut(attr) {
            a.prev = Some(anchor);
            a.next = next;
        }
        if let Some(a) = self.attr_mut(anchor) {
            a.next = Some(attr);
        }
        match next {
            Some(n) => {
                if let Some(r) = self.attr_mut(n) {
                    r.prev = Some(attr);
                }
            }
            None => {
                if let Some(e) = self.node_mut(elem) {
                    e.last_attr = Some(attr);
                }
            }
        }
    }

    fn link_attr_before(&mut self, elem: NodeId, anchor: AttrId, attr: AttrId) {
        let prev = self.attr_prev_of(anchor);
        if let Some(a) = self.attr_mut(attr) {
            a.prev = prev;
            a.next = Some(anchor);
        }
        if let Some(a) = self.attr_mut(anchor) {
            a.prev = Some(attr);
        }
        match prev {
            Some(p) => {
                if let Some(r) = self.attr_mut(p) {
                    r.next = Some(attr);
                }
            }
            None => {
                if let Some(e) = self.node_mut(elem) {
                    e.first_attr = Some(attr);
                }
            }
        }
    }

    fn unlink_attr(&mut self, elem: NodeId, attr: AttrId) {
        let (prev, next) = match self.attr(attr) {
            Some(a) => (a.prev, a.next),
            None => return,
        };
        if let Some(n) = self.node_mut(elem) {
            if n.first_attr == Some(attr) {
                n.first_attr = next;
            }
            if n.last_attr == Some(attr) {
                n.last_attr = prev;
            }
        }
        if let Some(p) = prev {
            if let Some(r) = self.attr_mut(p) {
                r.next = next;
            }
        }
        if let Some(n) = next {
            if let Some(r) = self.attr_mut(n) {
                r.prev = prev;
            }
        }
        if let Some(a) = self.attr_mut(attr) {
            a.prev = None;
            a.next = None;
        }
    }

    // ----- node construction ----------------------------------------------

    /// Appends a new node of the given type as the last child of `parent`.
    /// Fails (returns `None`) if the combination is not allowed, e.g. a
    /// declaration outside the document node.
    pub fn append_child(&mut self, parent: NodeId, kind: XmlNodeType) -> Option<NodeId> {
        if !allow_insert_child(self.kind_of(parent), kind) {
            return None;
        }
        let child = self.allocate_node(kind);
        self.link_child_last(parent, child);
        Some(child)
    }

    /// Appends a new node as the first child of `parent`.
    pub fn prepend_child(&mut self, parent: NodeId, kind: XmlNodeType) -> Option<NodeId> {
        if !allow_insert_child(self.kind_of(parent), kind) {
            return None;
        }
        let child = self.allocate_node(kind);
        self.link_child_first(parent, child);
        Some(child)
    }

    /// Inserts a new node right after `anchor`, under the same parent.
    pub fn insert_child_after(&mut self, kind: XmlNodeType, anchor: NodeId) -> Option<NodeId> {
        let parent = self.parent_of(anchor)?;
        if !allow_insert_child(self.kind_of(parent), kind) {
            return None;
        }
        let child = self.allocate_node(kind);
        self.link_child_after(parent, anchor, child);
        Some(child)
    }

    /// Inserts a new node right before `anchor`, under the same parent.
    pub fn insert_child_before(&mut self, kind: XmlNodeType, anchor: NodeId) -> Option<NodeId> {
        let parent = self.parent_of(anchor)?;
        if !allow_insert_child(self.kind_of(parent), kind) {
            return None;
        }
        let child = self.allocate_node(kind);
        self.link_child_before(parent, anchor, child);
        Some(child)
    }

    /// Appends a new element child with the given name.
    pub fn append_element(&mut self, parent: NodeId, name: &str) -> Option<NodeId> {
        let child = self.append_child(parent, XmlNodeType::Element)?;
        self.set_name(child, name);
        Some(child)
    }

    /// Prepends a new element child with the given name.
    pub fn prepend_element(&mut self, parent: NodeId, name: &str) -> Option<NodeId> {
        let child = self.prepend_child(parent, XmlNodeType::Element)?;
        self.set_name(child, name);
        Some(child)
    }

    /// Sets the name of a node. Fails for node types that do not carry a
    /// name (document, text, CDATA, comment, doctype).
    pub fn set_name(&mut self, id: NodeId, name: &str) -> bool {
        if !self.kind_of(id).has_name() {
            return false;
        }
        if let Some(n) = self.node_mut(id) {
            n.name = StrSlot::from_owned(name);
            true
        } else {
            false
        }
    }

    /// Sets the value of a node. Fails for node types that do not carry a
    /// value (document, element). Element text lives in text children; see
    /// [`set_text`](Self::set_text).
    pub fn set_value(&mut self, id: NodeId, value: &str) -> bool {
        if !self.kind_of(id).has_value() {
            return false;
        }
        if let Some(n) = self.node_mut(id) {
            n.value = StrSlot::from_owned(value);
            true
        } else {
            false
        }
    }

    // ----- attribute construction -----------------------------------------

    /// Appends a new attribute with the given name and an empty value.
    /// Fails unless the node is an element or a declaration.
    pub fn append_attribute(&mut self, elem: NodeId, name: &str) -> Option<AttrId> {
        if !allow_insert_attribute(self.kind_of(elem)) {
            return None;
        }
        let attr = self.allocate_attr();
        if let Some(a) = self.attr_mut(attr) {
            a.name = StrSlot::from_owned(name);
        }
        self.link_attr_last(elem, attr);
        Some(attr)
    }

    /// Prepends a new attribute with the given name and an empty value.
    pub fn prepend_attribute(&mut self, elem: NodeId, name: &str) -> Option<AttrId> {
        if !allow_insert_attribute(self.kind_of(elem)) {
            return None;
        }
        let attr = self.allocate_attr();
        if let Some(a) = self.attr_mut(attr) {
            a.name = StrSlot::from_owned(name);
        }
        self.link_attr_first(elem, attr);
        Some(attr)
    }

    /// Inserts a new attribute right after `anchor` in the attribute list
    /// of `elem`. Fails if `anchor` does not belong to `elem`.
    pub fn insert_attribute_after(
        &mut self,
        elem: NodeId,
        name: &str,
        anchor: AttrId,
    ) -> Option<AttrId> {
        if !allow_insert_attribute(self.kind_of(elem)) || !self.is_attribute_of(anchor, elem) {
            return None;
        }
        let attr = self.allocate_attr();
        if let Some(a) = self.attr_mut(attr) {
            a.name = StrSlot::from_owned(name);
        }
        self.link_attr_after(elem, anchor, attr);
        Some(attr)
    }

    /// Inserts a new attribute right before `anchor` in the attribute list
    /// of `elem`.
    pub fn insert_attribute_before(
        &mut self,
        elem: NodeId,
        name: &str,
        anchor: AttrId,
    ) -> Option<AttrId> {
        if !allow_insert_attribute(self.kind_of(elem)) || !self.is_attribute_of(anchor, elem) {
            return None;
        }
        let attr = self.allocate_attr();
        if let Some(a) = self.attr_mut(attr) {
            a.name = StrSlot::from_owned(name);
        }
        self.link_attr_before(elem, anchor, attr);
        Some(attr)
    }

    /// Sets the name of an attribute.
    pub fn set_attr_name(&mut self, id: AttrId, name: &str) -> bool {
        if let Some(a) = self.attr_mut(id) {
            a.name = StrSlot::from_owned(name);
            true
        } else {
            false
        }
    }

    /// Sets the value of an attribute.
    pub fn set_attr_value(&mut self, id: AttrId, value: &str) -> bool {
        if let Some(a) = self.attr_mut(id) {
            a.value = StrSlot::from_owned(value);
            true
        } else {
            false
        }
    }

    /// Sets an attribute value from an integer.
    pub fn set_attr_i64(&mut self, id: AttrId, value: i64) -> bool {
        self.set_attr_value(id, &value.to_string())
    }

    /// Sets an attribute value from an unsigned integer.
    pub fn set_attr_u64(&mut self, id: AttrId, value: u64) -> bool {
        self.set_attr_value(id, &value.to_string())
    }

    /// Sets an attribute value from a float.
    pub fn set_attr_f64(&mut self, id: AttrId, value: f64) -> bool {
        self.set_attr_value(id, &crate::dom::text::format_float(value))
    }

    /// Sets an attribute value to `"true"` or `"false"`.
    pub fn set_attr_bool(&mut self, id: AttrId, value: bool) -> bool {
        self.set_attr_value(id, if value { "true" } else { "false" })
    }

    // ----- removal ---------------------------------------------------------

    /// Detaches `child` from `parent`. The id becomes dangling; the slot is
    /// not reclaimed until the document is reset or reloaded.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.parent_of(child) != Some(parent) {
            return false;
        }
        self.unlink_child(child);
        true
    }

    /// Detaches the first child of `parent` with the given name.
    pub fn remove_child_named(&mut self, parent: NodeId, name: &str) -> bool {
        let mut cur = self.first_child_of(parent);
        while let Some(id) = cur {
            if self.name_of(id) == name {
                self.unlink_child(id);
                return true;
            }
            cur = self.next_sibling_of(id);
        }
        false
    }

    /// Detaches all children of `parent`.
    pub fn remove_children(&mut self, parent: NodeId) -> bool {
        if self.node(parent).is_none() {
            return false;
        }
        while let Some(child) = self.first_child_of(parent) {
            self.unlink_child(child);
        }
        true
    }

    /// Removes `attr` from the attribute list of `elem`.
    pub fn remove_attribute(&mut self, elem: NodeId, attr: AttrId) -> bool {
        if !self.is_attribute_of(attr, elem) {
            return false;
        }
        self.unlink_attr(elem, attr);
        true
    }

    /// Removes the first attribute of `elem` with the given name.
    pub fn remove_attribute_named(&mut self, elem: NodeId, name: &str) -> bool {
        let mut cur = self.first_attr_of(elem);
        while let Some(id) = cur {
            if self.attr_name_of(id) == name {
                self.unlink_attr(elem, id);
                return true;
            }
            cur = self.attr_next_of(id);
        }
        false
    }

    /// Removes all attributes of `elem`.
    pub fn remove_attributes(&mut self, elem: NodeId) -> bool {
        if self.node(elem).is_none() {
            return false;
        }
        while let Some(attr) = self.first_attr_of(elem) {
            self.unlink_attr(elem, attr);
        }
        true
    }

    // ----- moves ------------------------------------------------------------

    fn allow_move(&self, parent: NodeId, child: NodeId) -> bool {
        // Moving a node under its own descendant would detach the subtree
        // from the rest of the tree.
        allow_insert_child(self.kind_of(parent), self.kind_of(child))
            && self.kind_of(child) != XmlNodeType::Document
            && !self.is_in_subtree(parent, child)
    }

    /// Detaches `child` from its current parent and appends it under
    /// `parent`. Fails if the insertion rules forbid the combination or if
    /// `parent` lies inside the subtree rooted at `child`.
    pub fn append_move(&mut self, parent: NodeId, child: NodeId) -> Option<NodeId> {
        if !self.allow_move(parent, child) {
            return None;
        }
        self.unlink_child(child);
        self.link_child_last(parent, child);
        Some(child)
    }

    /// Detaches `child` and prepends it under `parent`.
    pub fn prepend_move(&mut self, parent: NodeId, child: NodeId) -> Option<NodeId> {
        if !self.allow_move(parent, child) {
            return None;
        }
        self.unlink_child(child);
        self.link_child_first(parent, child);
        Some(child)
    }

    /// Detaches `child` and re-inserts it right after `anchor`.
    pub fn insert_move_after(&mut self, child: NodeId, anchor: NodeId) -> Option<NodeId> {
        let parent = self.parent_of(anchor)?;
        if !self.allow_move(parent, child) || child == anchor {
            return None;
        }
        self.unlink_child(child);
        self.link_child_after(parent, anchor, child);
        Some(child)
    }

    /// Detaches `child` and re-inserts it right before `anchor`.
    pub fn insert_move_before(&mut self, child: NodeId, anchor: NodeId) -> Option<NodeId> {
        let parent = self.parent_of(anchor)?;
        if !self.allow_move(parent, child) || child == anchor {
            return None;
        }
        self.unlink_child(child);
        self.link_child_before(parent, anchor, child);
        Some(child)
    }

    // ----- copies -----------------------------------------------------------

    /// Materialized fields of one source node, captured before any
    /// allocation so that copying a subtree into itself sees the original
    /// extent of the source.
    fn capture(&self, src: NodeId) -> Option<CapturedNode> {
        let node = self.node(src)?;
        let kind = node.kind;
        let name = self.name_of(src).to_owned();
        let value = self.value_of(src).to_owned();
        let mut attrs = Vec::new();
        let mut cur = self.first_attr_of(src);
        while let Some(id) = cur {
            attrs.push((
                self.attr_name_of(id).to_owned(),
                self.attr_value_of(id).to_owned(),
            ));
            cur = self.attr_next_of(id);
        }
        let mut children = Vec::new();
        let mut cur = self.first_child_of(src);
        while let Some(id) = cur {
            children.push(id);
            cur = self.next_sibling_of(id);
        }
        Some(CapturedNode {
            kind,
            name,
            value,
            attrs,
            children,
        })
    }

    fn fill_copy(&mut self, new: NodeId, cap: &CapturedNode) {
        if let Some(n) = self.node_mut(new) {
            if !cap.name.is_empty() {
                n.name = StrSlot::from_owned(cap.name.as_str());
            }
            if !cap.value.is_empty() {
                n.value = StrSlot::from_owned(cap.value.as_str());
            }
        }
        for (name, value) in &cap.attrs {
            if let Some(a) = self.append_attribute(new, name) {
                self.set_attr_value(a, value);
            }
        }
    }

    fn copy_tree(&mut self, parent: NodeId, src: NodeId) -> Option<NodeId> {
        let cap = self.capture(src)?;
        let new = self.append_child(parent, cap.kind)?;
        self.fill_copy(new, &cap);
        for child in &cap.children {
            self.copy_tree(new, *child);
        }
        Some(new)
    }

    /// Appends a deep copy of `src` (a node of this document) under
    /// `parent`. Copying a subtree into itself copies the original extent.
    pub fn append_copy(&mut self, parent: NodeId, src: NodeId) -> Option<NodeId> {
        if !allow_insert_child(self.kind_of(parent), self.kind_of(src)) {
            return None;
        }
        self.copy_tree(parent, src)
    }

    /// Prepends a deep copy of `src` under `parent`.
    pub fn prepend_copy(&mut self, parent: NodeId, src: NodeId) -> Option<NodeId> {
        if !allow_insert_child(self.kind_of(parent), self.kind_of(src)) {
            return None;
        }
        let cap = self.capture(src)?;
        let new = self.prepend_child(parent, cap.kind)?;
        self.fill_copy(new, &cap);
        for child in &cap.children {
            self.copy_tree(new, *child);
        }
        Some(new)
    }

    /// Inserts a deep copy of `src` right after `anchor`.
    pub fn insert_copy_after(&mut self, src: NodeId, anchor: NodeId) -> Option<NodeId> {
        let parent = self.parent_of(anchor)?;
        if !allow_insert_child(self.kind_of(parent), self.kind_of(src)) {
            return None;
        }
        let cap = self.capture(src)?;
        let new = self.insert_child_after(cap.kind, anchor)?;
        self.fill_copy(new, &cap);
        for child in &cap.children {
            self.copy_tree(new, *child);
        }
        Some(new)
    }

    /// Inserts a deep copy of `src` right before `anchor`.
    pub fn insert_copy_before(&mut self, src: NodeId, anchor: NodeId) -> Option<NodeId> {
        let parent = self.parent_of(anchor)?;
        if !allow_insert_child(self.kind_of(parent), self.kind_of(src)) {
            return None;
        }
        let cap = self.capture(src)?;
        let new = self.insert_child_before(cap.kind, anchor)?;
        self.fill_copy(new, &cap);
        for child in &cap.children {
            self.copy_tree(new, *child);
        }
        Some(new)
    }

    fn copy_tree_from(
        &mut self,
        parent: NodeId,
        other: &XmlDocument,
        src: NodeId,
    ) -> Option<NodeId> {
        let kind = other.kind_of(src);
        let new = self.append_child(parent, kind)?;
        if let Some(n) = self.node_mut(new) {
            let name = other.name_of(src);
            if !name.is_empty() {
                n.name = StrSlot::from_owned(name);
            }
            let value = other.value_of(src);
            if !value.is_empty() {
                n.value = StrSlot::from_owned(value);
            }
        }
        let mut cur = other.first_attr_of(src);
        while let Some(id) = cur {
            if let Some(a) = self.append_attribute(new, other.attr_name_of(id)) {
                self.set_attr_value(a, other.attr_value_of(id));
            }
            cur = other.attr_next_of(id);
        }
        let mut cur = other.first_child_of(src);
        while let Some(id) = cur {
            self.copy_tree_from(new, other, id);
            cur = other.next_sibling_of(id);
        }
        Some(new)
    }

    /// Appends a deep copy of a node from another document under `parent`.
    /// All strings are materialized into this document.
    pub fn append_copy_from(
        &mut self,
        parent: NodeId,
        other: &XmlDocument,
        src: NodeId,
    ) -> Option<NodeId> {
        if !allow_insert_child(self.kind_of(parent), other.kind_of(src)) {
            return None;
        }
        self.copy_tree_from(parent, other, src)
    }

    /// Appends a copy of an attribute of this document to `elem`.
    pub fn append_copy_attribute(&mut self, elem: NodeId, src: AttrId) -> Option<AttrId> {
        let name = self.attr_name_of(src).to_owned();
        let value = self.attr_value_of(src).to_owned();
        let attr = self.append_attribute(elem, &name)?;
        self.set_attr_value(attr, &value);
        Some(attr)
    }

    /// Appends a copy of an attribute from another document to `elem`.
    pub fn append_copy_attribute_from(
        &mut self,
        elem: NodeId,
        other: &XmlDocument,
        src: AttrId,
    ) -> Option<AttrId> {
        let attr = self.append_attribute(elem, other.attr_name_of(src))?;
        self.set_attr_value(attr, other.attr_value_of(src));
        Some(attr)
    }

    // ----- document lifecycle ----------------------------------------------

    /// Discards the whole tree, leaving an empty document. Every id handed
    /// out before the reset is invalidated.
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.nodes.push(NodeData::new(XmlNodeType::Document));
        self.attrs.clear();
        self.buffer = String::new();
    }

    /// Discards the tree and deep-copies the children of `other` instead.
    pub fn reset_from(&mut self, other: &XmlDocument) {
        self.reset();
        let root = self.root_id();
        let mut cur = other.first_child_of(other.root_id());
        while let Some(id) = cur {
            self.copy_tree_from(root, other, id);
            cur = other.next_sibling_of(id);
        }
    }

    // ----- parsing ---------------------------------------------------------

    /// Parses UTF-8 text, replacing current contents, with
    /// [`PARSE_DEFAULT`](crate::parse::PARSE_DEFAULT) options.
    pub fn load_string(&mut self, text: &str) -> ParseResult {
        self.load_string_with(text, parse::PARSE_DEFAULT)
    }

    /// Parses UTF-8 text with explicit options.
    pub fn load_string_with(&mut self, text: &str, options: u32) -> ParseResult {
        self.reset();
        let owned = text.to_owned();
        let mut result = parse::parse_into(self, &owned, options);
        result.encoding = XmlEncoding::Utf8;
        self.buffer = owned;
        result
    }

    /// Parses raw bytes: runs encoding detection (honoring `encoding` when
    /// it is not `Auto`), decodes to UTF-8, then parses.
    pub fn load_buffer(&mut self, data: &[u8], options: u32, enc: XmlEncoding) -> ParseResult {
        self.reset();
        let (text, resolved) = encoding::decode(data, enc);
        let mut result = parse::parse_into(self, &text, options);
        result.encoding = resolved;
        self.buffer = text;
        result
    }

    /// Loads and parses a file. I/O failures are reported through the
    /// parse status, not a separate error type.
    pub fn load_file<P: AsRef<Path>>(
        &mut self,
        path: P,
        options: u32,
        enc: XmlEncoding,
    ) -> ParseResult {
        self.reset();
        let mut file = match File::open(path) {
            Ok(f) => f,
            Err(_) => return ParseResult::failure(ParseStatus::FileNotFound),
        };
        let mut data = Vec::new();
        if file.read_to_end(&mut data).is_err() {
            return ParseResult::failure(ParseStatus::IoError);
        }
        self.load_buffer(&data, options, enc)
    }

    /// Parses a fragment and appends the resulting nodes as children of
    /// `node`, which must be the document node or an element.
    pub fn append_buffer(
        &mut self,
        node: NodeId,
        data: &[u8],
        options: u32,
        enc: XmlEncoding,
    ) -> ParseResult {
        match self.kind_of(node) {
            XmlNodeType::Document | XmlNodeType::Element => {}
            _ => return ParseResult::failure(ParseStatus::AppendInvalidRoot),
        }
        let mut fragment = XmlDocument::new();
        let result = fragment.load_buffer(data, options | parse::PARSE_FRAGMENT, enc);
        if !result.ok() {
            return result;
        }
        let mut cur = fragment.first_child_of(fragment.root_id());
        while let Some(id) = cur {
            self.copy_tree_from(node, &fragment, id);
            cur = fragment.next_sibling_of(id);
        }
        result
    }

    // ----- saving ----------------------------------------------------------

    /// Serializes the document to a writer.
    pub fn save<W: Write>(
        &self,
        writer: &mut W,
        indent: &str,
        flags: u32,
        enc: XmlEncoding,
    ) -> io::Result<()> {
        serial::save_document(self, writer, indent, flags, enc)
    }

    /// Serializes the document to a UTF-8 string with default formatting.
    pub fn to_xml(&self) -> String {
        self.to_xml_with("\t", FORMAT_DEFAULT)
    }

    /// Serializes the document to a UTF-8 string with explicit formatting.
    pub fn to_xml_with(&self, indent: &str, flags: u32) -> String {
        let mut out = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.save(&mut out, indent, flags, XmlEncoding::Utf8);
        String::from_utf8(out).unwrap_or_default()
    }

    /// Serializes the document to a file.
    pub fn save_file<P: AsRef<Path>>(
        &self,
        path: P,
        indent: &str,
        flags: u32,
        enc: XmlEncoding,
    ) -> io::Result<()> {
        let mut file = File::create(path)?;
        self.save(&mut file, indent, flags, enc)
    }

    /// Serializes the document to a file in text mode. The C runtime would
    /// translate `\n` on some platforms; Rust writes bytes as-is, so this
    /// differs from [`save_file`](Self::save_file) only by the flag it
    /// sets.
    pub fn save_file_text<P: AsRef<Path>>(
        &self,
        path: P,
        indent: &str,
        flags: u32,
        enc: XmlEncoding,
    ) -> io::Result<()> {
        self.save_file(path, indent, flags | FORMAT_SAVE_FILE_TEXT, enc)
    }

    // ----- text helpers -----------------------------------------------------

    /// Locates the node whose value backs the text of `id`: the node itself
    /// for text-bearing kinds, otherwise its first text child.
    pub(crate) fn text_target(&self, id: NodeId) -> Option<NodeId> {
        match self.kind_of(id) {
            XmlNodeType::Pcdata | XmlNodeType::Cdata => Some(id),
            // Elements carry text in their own value slot when it was
            // embedded there at parse time.
            XmlNodeType::Element if !self.value_of(id).is_empty() => Some(id),
            _ => {
                let mut cur = self.first_child_of(id);
                while let Some(child) = cur {
                    match self.kind_of(child) {
                        XmlNodeType::Pcdata | XmlNodeType::Cdata => return Some(child),
                        _ => cur = self.next_sibling_of(child),
                    }
                }
                None
            }
        }
    }

    /// Sets the text of `id` through the same target rules as
    /// [`XmlText`](crate::dom::XmlText): the data node itself, an existing
    /// text child, or a freshly appended one.
    pub fn set_text(&mut self, id: NodeId, value: &str) -> bool {
        match self.text_target(id) {
            // Embedded text lives in the element's own value slot, which
            // the type check in set_value would refuse.
            Some(target) if self.kind_of(target) == XmlNodeType::Element => {
                self.set_node_value_slot(target, StrSlot::from_owned(value));
                true
            }
            Some(target) => self.set_value(target, value),
            None => match self.append_child(id, XmlNodeType::Pcdata) {
                Some(target) => self.set_value(target, value),
                None => false,
            },
        }
    }

    /// Sets the text of `id` from an integer.
    pub fn set_text_i64(&mut self, id: NodeId, value: i64) -> bool {
        self.set_text(id, &value.to_string())
    }

    /// Sets the text of `id` from an unsigned integer.
    pub fn set_text_u64(&mut self, id: NodeId, value: u64) -> bool {
        self.set_text(id, &value.to_string())
    }

    /// Sets the text of `id` from a float.
    pub fn set_text_f64(&mut self, id: NodeId, value: f64) -> bool {
        self.set_text(id, &crate::dom::text::format_float(value))
    }

    /// Sets the text of `id` to `"true"` or `"false"`.
    pub fn set_text_bool(&mut self, id: NodeId, value: bool) -> bool {
        self.set_text(id, if value { "true" } else { "false" })
    }

    // ----- document order ---------------------------------------------------

    /// Compares two nodes by document position. Allocation order is not
    /// document order once the tree has been mutated, so this walks the
    /// ancestor chains to the divergence point and compares sibling ranks.
    pub(crate) fn cmp_in_document(&self, a: NodeId, b: NodeId) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        if a == b {
            return Ordering::Equal;
        }
        let chain_a = self.ancestor_chain(a);
        let chain_b = self.ancestor_chain(b);
        let mut i = 0;
        while i < chain_a.len() && i < chain_b.len() && chain_a[i] == chain_b[i] {
            i += 1;
        }
        match (chain_a.get(i), chain_b.get(i)) {
            // One node is an ancestor of the other; the ancestor comes first.
            (None, _) => Ordering::Less,
            (_, None) => Ordering::Greater,
            (Some(&x), Some(&y)) => self.cmp_siblings(x, y),
        }
    }

    fn ancestor_chain(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = vec![id];
        let mut cur = self.parent_of(id);
        while let Some(p) = cur {
            chain.push(p);
            cur = self.parent_of(p);
        }
        chain.reverse();
        chain
    }

    fn cmp_siblings(&self, a: NodeId, b: NodeId) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        let mut cur = self.next_sibling_of(a);
        while let Some(id) = cur {
            if id == b {
                return Ordering::Less;
            }
            cur = self.next_sibling_of(id);
        }
        Ordering::Greater
    }

    /// Position of `attr` in the attribute list of `elem`, for ordering
    /// attributes of the same element.
    pub(crate) fn attr_rank(&self, elem: NodeId, attr: AttrId) -> usize {
        let mut rank = 0;
        let mut cur = self.first_attr_of(elem);
        while let Some(id) = cur {
            if id == attr {
                break;
            }
            rank += 1;
            cur = self.attr_next_of(id);
        }
        rank
    }
}

struct CapturedNode {
    kind: XmlNodeType,
    name: String,
    value: String,
    attrs: Vec<(String, String)>,
    children: Vec<NodeId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_small() -> (XmlDocument, NodeId, NodeId, NodeId) {
        let mut doc = XmlDocument::new();
        let root = doc.append_element(doc.root_id(), "root").unwrap();
        let a = doc.append_element(root, "a").unwrap();
        let b = doc.append_element(root, "b").unwrap();
        (doc, root, a, b)
    }

    #[test]
    fn append_and_navigate() {
        let (doc, root, a, b) = build_small();
        assert_eq!(doc.first_child_of(root), Some(a));
        assert_eq!(doc.last_child_of(root), Some(b));
        assert_eq!(doc.next_sibling_of(a), Some(b));
        assert_eq!(doc.prev_sibling_of(b), Some(a));
        assert_eq!(doc.parent_of(a), Some(root));
        assert_eq!(doc.name_of(a), "a");
    }

    #[test]
    fn prepend_and_insert_positions() {
        let (mut doc, root, a, b) = build_small();
        let first = doc.prepend_element(root, "first").unwrap();
        let mid = doc.insert_child_after(XmlNodeType::Element, a).unwrap();
        doc.set_name(mid, "mid");
        let mut names = Vec::new();
        let mut cur = doc.first_child_of(root);
        while let Some(id) = cur {
            names.push(doc.name_of(id).to_owned());
            cur = doc.next_sibling_of(id);
        }
        assert_eq!(names, ["first", "a", "mid", "b"]);
        assert_eq!(doc.first_child_of(root), Some(first));
        assert_eq!(doc.last_child_of(root), Some(b));
    }

    #[test]
    fn remove_middle_child_relinks_siblings() {
        let (mut doc, root, a, b) = build_small();
        let c = doc.append_element(root, "c").unwrap();
        assert!(doc.remove_child(root, b));
        assert_eq!(doc.next_sibling_of(a), Some(c));
        assert_eq!(doc.prev_sibling_of(c), Some(a));
        assert_eq!(doc.parent_of(b), None);
        // Second removal fails: the node is already detached.
        assert!(!doc.remove_child(root, b));
    }

    #[test]
    fn remove_first_and_last_update_parent_links() {
        let (mut doc, root, a, b) = build_small();
        assert!(doc.remove_child(root, a));
        assert_eq!(doc.first_child_of(root), Some(b));
        assert!(doc.remove_child(root, b));
        assert_eq!(doc.first_child_of(root), None);
        assert_eq!(doc.last_child_of(root), None);
    }

    #[test]
    fn set_name_respects_node_kind() {
        let (mut doc, root, a, _) = build_small();
        assert!(doc.set_name(a, "renamed"));
        assert_eq!(doc.name_of(a), "renamed");
        let text = doc.append_child(root, XmlNodeType::Pcdata).unwrap();
        assert!(!doc.set_name(text, "nope"));
        assert!(doc.set_value(text, "hello"));
        assert!(!doc.set_value(a, "nope"));
        assert!(!doc.set_name(doc.root_id(), "nope"));
    }

    #[test]
    fn declaration_only_under_document() {
        let (mut doc, _, a, _) = build_small();
        assert!(doc.append_child(a, XmlNodeType::Declaration).is_none());
        let root_id = doc.root_id();
        assert!(doc.prepend_child(root_id, XmlNodeType::Declaration).is_some());
        assert!(doc.append_child(a, XmlNodeType::Doctype).is_none());
    }

    #[test]
    fn attribute_list_operations() {
        let (mut doc, _, a, _) = build_small();
        let x = doc.append_attribute(a, "x").unwrap();
        doc.set_attr_value(x, "1");
        let z = doc.append_attribute(a, "z").unwrap();
        let y = doc.insert_attribute_after(a, "y", x).unwrap();
        let mut names = Vec::new();
        let mut cur = doc.first_attr_of(a);
        while let Some(id) = cur {
            names.push(doc.attr_name_of(id).to_owned());
            cur = doc.attr_next_of(id);
        }
        assert_eq!(names, ["x", "y", "z"]);
        assert!(doc.remove_attribute(a, y));
        assert_eq!(doc.attr_next_of(x), Some(z));
        assert_eq!(doc.attr_prev_of(z), Some(x));
        assert!(!doc.remove_attribute(a, y));
    }

    #[test]
    fn attribute_insert_rejects_foreign_anchor() {
        let (mut doc, _, a, b) = build_small();
        let on_a = doc.append_attribute(a, "x").unwrap();
        assert!(doc.insert_attribute_after(b, "y", on_a).is_none());
    }

    #[test]
    fn attributes_only_on_elements_and_declarations() {
        let (mut doc, root, _, _) = build_small();
        let text = doc.append_child(root, XmlNodeType::Pcdata).unwrap();
        assert!(doc.append_attribute(text, "x").is_none());
        let root_id = doc.root_id();
        assert!(doc.append_attribute(root_id, "x").is_none());
        let decl = doc.prepend_child(root_id, XmlNodeType::Declaration).unwrap();
        assert!(doc.append_attribute(decl, "version").is_some());
    }

    #[test]
    fn move_between_parents() {
        let (mut doc, root, a, b) = build_small();
        let inner = doc.append_element(a, "inner").unwrap();
        assert_eq!(doc.append_move(b, inner), Some(inner));
        assert_eq!(doc.parent_of(inner), Some(b));
        assert_eq!(doc.first_child_of(a), None);
        assert_eq!(doc.first_child_of(root), Some(a));
    }

    #[test]
    fn move_into_own_subtree_fails() {
        let (mut doc, _, a, _) = build_small();
        let inner = doc.append_element(a, "inner").unwrap();
        assert!(doc.append_move(inner, a).is_none());
        assert!(doc.append_move(a, a).is_none());
        // The tree is untouched.
        assert_eq!(doc.parent_of(inner), Some(a));
    }

    #[test]
    fn move_preserves_subtree() {
        let (mut doc, _, a, b) = build_small();
        let inner = doc.append_element(a, "inner").unwrap();
        let leaf = doc.append_element(inner, "leaf").unwrap();
        doc.append_move(b, inner);
        assert_eq!(doc.first_child_of(inner), Some(leaf));
        assert_eq!(doc.parent_of(leaf), Some(inner));
    }

    #[test]
    fn deep_copy_same_document() {
        let (mut doc, _, a, b) = build_small();
        let inner = doc.append_element(a, "inner").unwrap();
        doc.set_text(inner, "payload");
        let x = doc.append_attribute(a, "x").unwrap();
        doc.set_attr_value(x, "1");

        let copy = doc.append_copy(b, a).unwrap();
        assert_ne!(copy, a);
        assert_eq!(doc.name_of(copy), "a");
        let copy_attr = doc.first_attr_of(copy).unwrap();
        assert_eq!(doc.attr_name_of(copy_attr), "x");
        assert_eq!(doc.attr_value_of(copy_attr), "1");
        let copy_inner = doc.first_child_of(copy).unwrap();
        assert_eq!(doc.name_of(copy_inner), "inner");
        let copy_text = doc.first_child_of(copy_inner).unwrap();
        assert_eq!(doc.value_of(copy_text), "payload");
        // Source is untouched.
        assert_eq!(doc.parent_of(inner), Some(a));
    }

    #[test]
    fn copy_subtree_into_itself_copies_original_extent() {
        let (mut doc, _, a, _) = build_small();
        doc.append_element(a, "inner").unwrap();
        let copy = doc.append_copy(a, a).unwrap();
        // The copy has exactly one child (the original inner), not two.
        let first = doc.first_child_of(copy).unwrap();
        assert_eq!(doc.name_of(first), "inner");
        assert_eq!(doc.next_sibling_of(first), None);
        // The source now has two children: inner and the copy.
        let src_first = doc.first_child_of(a).unwrap();
        assert_eq!(doc.name_of(src_first), "inner");
        assert_eq!(doc.last_child_of(a), Some(copy));
    }

    #[test]
    fn cross_document_copy_materializes_strings() {
        let mut src = XmlDocument::new();
        let src_root = src.root_id();
        let s_elem = src.append_element(src_root, "data").unwrap();
        let s_attr = src.append_attribute(s_elem, "id").unwrap();
        src.set_attr_value(s_attr, "42");
        src.set_text(s_elem, "body");

        let mut dst = XmlDocument::new();
        let dst_root = dst.root_id();
        let d_elem = dst.append_element(dst_root, "wrap").unwrap();
        let copied = dst.append_copy_from(d_elem, &src, s_elem).unwrap();
        drop(src);
        assert_eq!(dst.name_of(copied), "data");
        let a = dst.first_attr_of(copied).unwrap();
        assert_eq!(dst.attr_value_of(a), "42");
        let t = dst.first_child_of(copied).unwrap();
        assert_eq!(dst.value_of(t), "body");
    }

    #[test]
    fn reset_from_replicates_children() {
        let (mut src, _, a, _) = build_small();
        src.set_text(a, "x");
        let mut dst = XmlDocument::new();
        let dst_root = dst.root_id();
        dst.append_element(dst_root, "old").unwrap();
        dst.reset_from(&src);
        let root = dst.first_child_of(dst.root_id()).unwrap();
        assert_eq!(dst.name_of(root), "root");
        let first = dst.first_child_of(root).unwrap();
        assert_eq!(dst.name_of(first), "a");
        let t = dst.text_target(first).unwrap();
        assert_eq!(dst.value_of(t), "x");
    }

    #[test]
    fn reset_clears_everything() {
        let (mut doc, root, _, _) = build_small();
        doc.reset();
        assert_eq!(doc.first_child_of(doc.root_id()), None);
        assert_eq!(doc.kind_of(doc.root_id()), XmlNodeType::Document);
        // Stale id from before the reset is out of bounds and reads as null.
        assert_eq!(doc.kind_of(root), XmlNodeType::Null);
    }

    #[test]
    fn set_text_creates_or_reuses_text_child() {
        let (mut doc, _, a, _) = build_small();
        assert!(doc.set_text(a, "one"));
        let t = doc.first_child_of(a).unwrap();
        assert_eq!(doc.kind_of(t), XmlNodeType::Pcdata);
        assert_eq!(doc.value_of(t), "one");
        assert!(doc.set_text(a, "two"));
        // Same node rewritten, not a second text child.
        assert_eq!(doc.first_child_of(a), Some(t));
        assert_eq!(doc.next_sibling_of(t), None);
        assert_eq!(doc.value_of(t), "two");
    }

    #[test]
    fn typed_setters_format_values() {
        let (mut doc, _, a, _) = build_small();
        let x = doc.append_attribute(a, "x").unwrap();
        doc.set_attr_i64(x, -5);
        assert_eq!(doc.attr_value_of(x), "-5");
        doc.set_attr_bool(x, true);
        assert_eq!(doc.attr_value_of(x), "true");
        doc.set_attr_f64(x, 1.5);
        assert_eq!(doc.attr_value_of(x), "1.5");
        doc.set_text_i64(a, 7);
        let t = doc.text_target(a).unwrap();
        assert_eq!(doc.value_of(t), "7");
    }

    #[test]
    fn document_order_reflects_tree_position_after_moves() {
        use std::cmp::Ordering;
        let (mut doc, root, a, b) = build_small();
        assert_eq!(doc.cmp_in_document(a, b), Ordering::Less);
        assert_eq!(doc.cmp_in_document(b, a), Ordering::Greater);
        assert_eq!(doc.cmp_in_document(a, a), Ordering::Equal);
        // Ancestors come before descendants.
        assert_eq!(doc.cmp_in_document(root, a), Ordering::Less);
        // Move `a` after `b`: allocation order no longer matches.
        doc.append_move(root, a);
        assert_eq!(doc.cmp_in_document(a, b), Ordering::Greater);
    }

    #[test]
    fn document_element_skips_non_elements() {
        let mut doc = XmlDocument::new();
        let root_id = doc.root_id();
        let c = doc.append_child(root_id, XmlNodeType::Comment).unwrap();
        doc.set_value(c, "lead");
        let e = doc.append_element(root_id, "real").unwrap();
        assert_eq!(doc.document_element().id(), Some(e));
    }
}
