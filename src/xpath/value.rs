//! XPath value model.
//!
//! XPath 1.0 has four data types: node-set, boolean, number, and string.
//! A node-set holds [`XPathNode`] entries, each either a tree node or an
//! attribute paired with its owning element, so query results can point
//! at both kinds of location. Conversions between the four types follow
//! the XPath 1.0 coercion rules, including the number formatting quirks
//! ("NaN", "Infinity", integers without a decimal point).

use std::cmp::Ordering;
use std::fmt;
use std::ops::Index;

use crate::dom::{XmlAttribute, XmlDocument, XmlNode, XmlNodeType};

/// Category of an XPath value or variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XPathValueType {
    NodeSet,
    Number,
    String,
    Boolean,
}

/// One entry of a node-set: a tree node, or an attribute together with
/// the element that carries it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct XPathNode<'a> {
    node: XmlNode<'a>,
    attr: Option<XmlAttribute<'a>>,
}

impl<'a> XPathNode<'a> {
    /// Wraps a tree node. A null handle produces a null entry.
    pub fn from_node(node: XmlNode<'a>) -> Self {
        XPathNode { node, attr: None }
    }

    /// Wraps an attribute of `parent`. A null attribute handle produces a
    /// null entry regardless of `parent`.
    pub fn from_attribute(attr: XmlAttribute<'a>, parent: XmlNode<'a>) -> Self {
        if attr.is_null() {
            XPathNode {
                node: XmlNode::new(parent.document(), None),
                attr: None,
            }
        } else {
            XPathNode {
                node: parent,
                attr: Some(attr),
            }
        }
    }

    /// The tree node, or a null handle when this entry is an attribute.
    pub fn node(&self) -> XmlNode<'a> {
        if self.attr.is_some() {
            XmlNode::new(self.node.document(), None)
        } else {
            self.node
        }
    }

    /// The attribute, or a null handle when this entry is a tree node.
    pub fn attribute(&self) -> XmlAttribute<'a> {
        match self.attr {
            Some(attr) => attr,
            None => XmlAttribute::new(self.node.document(), None),
        }
    }

    /// Owning element for attribute entries, the node's parent otherwise.
    pub fn parent(&self) -> XmlNode<'a> {
        if self.attr.is_some() {
            self.node
        } else {
            self.node.parent()
        }
    }

    pub fn is_null(&self) -> bool {
        self.attr.is_none() && self.node.is_null()
    }

    pub(crate) fn document(&self) -> &'a XmlDocument {
        self.node.document()
    }

    /// The anchoring tree node: the node itself, or the attribute's owner.
    pub(crate) fn anchor(&self) -> XmlNode<'a> {
        self.node
    }

    pub(crate) fn is_attribute(&self) -> bool {
        self.attr.is_some()
    }
}

impl<'a> From<XmlNode<'a>> for XPathNode<'a> {
    fn from(node: XmlNode<'a>) -> Self {
        XPathNode::from_node(node)
    }
}

impl fmt::Debug for XPathNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.attr {
            Some(attr) => write!(f, "XPathNode({:?})", attr),
            None if self.node.is_null() => write!(f, "XPathNode(null)"),
            None => write!(f, "XPathNode({:?})", self.node),
        }
    }
}

/// Ordering state of a node-set.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum NodeSetType {
    /// No known order.
    #[default]
    Unsorted,
    /// Ascending document order.
    Sorted,
    /// Descending document order.
    SortedReverse,
}

/// Snapshot of nodes produced by a query, tagged with its ordering state.
#[derive(Debug, Default, Clone)]
pub struct XPathNodeSet<'a> {
    nodes: Vec<XPathNode<'a>>,
    kind: NodeSetType,
}

impl<'a> XPathNodeSet<'a> {
    pub(crate) fn from_parts(nodes: Vec<XPathNode<'a>>, kind: NodeSetType) -> Self {
        XPathNodeSet { nodes, kind }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Current ordering tag. Freshly evaluated sets come back sorted; the
    /// tag tracks later [`sort`](Self::sort) calls.
    pub fn kind(&self) -> NodeSetType {
        self.kind
    }

    pub fn get(&self, index: usize) -> Option<XPathNode<'a>> {
        self.nodes.get(index).copied()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, XPathNode<'a>> {
        self.nodes.iter()
    }

    pub fn as_slice(&self) -> &[XPathNode<'a>] {
        &self.nodes
    }

    /// First entry in document order. Sorted sets read one end of the
    /// vector; an unsorted set is scanned without reordering it.
    pub fn first(&self) -> Option<XPathNode<'a>> {
        match self.kind {
            NodeSetType::Sorted => self.nodes.first().copied(),
            NodeSetType::SortedReverse => self.nodes.last().copied(),
            NodeSetType::Unsorted => self
                .nodes
                .iter()
                .copied()
                .min_by(|a, b| cmp_document_order(a, b)),
        }
    }

    /// Sorts in place into ascending document order, or descending when
    /// `reverse` is set. An already-sorted set only flips direction.
    pub fn sort(&mut self, reverse: bool) {
        if self.kind == NodeSetType::Unsorted {
            self.nodes.sort_by(cmp_document_order);
            self.kind = NodeSetType::Sorted;
        }
        let want = if reverse {
            NodeSetType::SortedReverse
        } else {
            NodeSetType::Sorted
        };
        if self.kind != want {
            self.nodes.reverse();
            self.kind = want;
        }
    }

    /// Ascending sort plus removal of duplicate entries. Query results
    /// pass through here before they are handed out.
    pub(crate) fn sort_dedup(&mut self) {
        self.sort(false);
        self.nodes.dedup();
    }

    pub(crate) fn into_vec(self) -> Vec<XPathNode<'a>> {
        self.nodes
    }
}

impl<'a> Index<usize> for XPathNodeSet<'a> {
    type Output = XPathNode<'a>;

    fn index(&self, index: usize) -> &XPathNode<'a> {
        &self.nodes[index]
    }
}

impl<'a, 's> IntoIterator for &'s XPathNodeSet<'a> {
    type Item = &'s XPathNode<'a>;
    type IntoIter = std::slice::Iter<'s, XPathNode<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

/// Compares two node-set entries by document position. Attributes sort
/// after their owning element and before its children, in attribute-list
/// order. Entries from different documents get an arbitrary but stable
/// order so sorting stays total.
pub(crate) fn cmp_document_order(a: &XPathNode<'_>, b: &XPathNode<'_>) -> Ordering {
    let doc_a = a.node.document();
    let doc_b = b.node.document();
    if !std::ptr::eq(doc_a, doc_b) {
        let pa = doc_a as *const XmlDocument as usize;
        let pb = doc_b as *const XmlDocument as usize;
        return pa.cmp(&pb);
    }
    match (a.node.id(), b.node.id()) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) if x != y => doc_a.cmp_in_document(x, y),
        (Some(anchor), Some(_)) => {
            let ra = a.attr.and_then(|t| t.id()).map(|id| doc_a.attr_rank(anchor, id));
            let rb = b.attr.and_then(|t| t.id()).map(|id| doc_a.attr_rank(anchor, id));
            match (ra, rb) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(p), Some(q)) => p.cmp(&q),
            }
        }
    }
}

/// String-value of a node-set entry per XPath 1.0: attribute and text-like
/// nodes yield their value, elements and the document concatenate all
/// descendant character data. Text stored in an element's value slot by
/// the embedding parse option counts as character data.
pub(crate) fn string_value(item: &XPathNode<'_>) -> String {
    if item.is_attribute() {
        return item.attribute().value().to_string();
    }
    let node = item.node();
    match node.node_type() {
        XmlNodeType::Pcdata | XmlNodeType::Cdata | XmlNodeType::Comment | XmlNodeType::Pi => {
            node.value().to_string()
        }
        XmlNodeType::Document | XmlNodeType::Element => {
            let mut out = String::new();
            collect_text(node, &mut out);
            out
        }
        _ => String::new(),
    }
}

fn collect_text(root: XmlNode<'_>, out: &mut String) {
    out.push_str(root.value());
    let mut cur = root.first_child();
    while !cur.is_null() && cur != root {
        match cur.node_type() {
            XmlNodeType::Pcdata | XmlNodeType::Cdata | XmlNodeType::Element => {
                out.push_str(cur.value())
            }
            _ => {}
        }
        if cur.node_type() == XmlNodeType::Element && !cur.first_child().is_null() {
            cur = cur.first_child();
        } else {
            loop {
                let next = cur.next_sibling();
                if !next.is_null() {
                    cur = next;
                    break;
                }
                cur = cur.parent();
                if cur.is_null() || cur == root {
                    break;
                }
            }
        }
    }
}

/// A value produced by evaluation: one of the four XPath 1.0 types.
#[derive(Debug, Clone)]
#[must_use]
pub enum XPathValue<'a> {
    NodeSet(XPathNodeSet<'a>),
    Boolean(bool),
    Number(f64),
    String(String),
}

impl<'a> XPathValue<'a> {
    pub fn value_type(&self) -> XPathValueType {
        match self {
            XPathValue::NodeSet(_) => XPathValueType::NodeSet,
            XPathValue::Boolean(_) => XPathValueType::Boolean,
            XPathValue::Number(_) => XPathValueType::Number,
            XPathValue::String(_) => XPathValueType::String,
        }
    }

    /// Convert to boolean (XPath `boolean()` function semantics).
    pub fn to_boolean(&self) -> bool {
        match self {
            XPathValue::NodeSet(set) => !set.is_empty(),
            XPathValue::Boolean(b) => *b,
            XPathValue::Number(n) => *n != 0.0 && !n.is_nan(),
            XPathValue::String(s) => !s.is_empty(),
        }
    }

    /// Convert to number (XPath `number()` function semantics).
    pub fn to_number(&self) -> f64 {
        match self {
            XPathValue::NodeSet(_) => string_to_number(&self.to_string_value()),
            XPathValue::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            XPathValue::Number(n) => *n,
            XPathValue::String(s) => string_to_number(s),
        }
    }

    /// Convert to string (XPath `string()` function semantics). A node-set
    /// converts to the string-value of its first node in document order,
    /// the empty set to `""`.
    pub fn to_string_value(&self) -> String {
        match self {
            XPathValue::NodeSet(set) => match set.first() {
                Some(node) => string_value(&node),
                None => String::new(),
            },
            XPathValue::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
            XPathValue::Number(n) => number_to_string(*n),
            XPathValue::String(s) => s.clone(),
        }
    }

    pub(crate) fn empty_node_set() -> Self {
        XPathValue::NodeSet(XPathNodeSet::default())
    }

    pub(crate) fn default_of(ty: XPathValueType) -> Self {
        match ty {
            XPathValueType::NodeSet => XPathValue::empty_node_set(),
            XPathValueType::Number => XPathValue::Number(0.0),
            XPathValueType::String => XPathValue::String(String::new()),
            XPathValueType::Boolean => XPathValue::Boolean(false),
        }
    }
}

impl Default for XPathValue<'_> {
    fn default() -> Self {
        XPathValue::empty_node_set()
    }
}

impl<'a> From<bool> for XPathValue<'a> {
    fn from(b: bool) -> Self {
        XPathValue::Boolean(b)
    }
}

impl<'a> From<f64> for XPathValue<'a> {
    fn from(n: f64) -> Self {
        XPathValue::Number(n)
    }
}

impl<'a> From<String> for XPathValue<'a> {
    fn from(s: String) -> Self {
        XPathValue::String(s)
    }
}

impl<'a> From<&str> for XPathValue<'a> {
    fn from(s: &str) -> Self {
        XPathValue::String(s.to_string())
    }
}

impl<'a> From<XPathNodeSet<'a>> for XPathValue<'a> {
    fn from(set: XPathNodeSet<'a>) -> Self {
        XPathValue::NodeSet(set)
    }
}

/// Parses the XPath number grammar: optional surrounding whitespace, an
/// optional minus sign, digits with at most one decimal point. Anything
/// else, including exponent notation, is NaN.
pub(crate) fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim_matches(|c| matches!(c, ' ' | '\t' | '\r' | '\n'));
    let (neg, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    if body.is_empty() {
        return f64::NAN;
    }
    let mut seen_digit = false;
    let mut seen_dot = false;
    for b in body.bytes() {
        match b {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_dot => seen_dot = true,
            _ => return f64::NAN,
        }
    }
    if !seen_digit {
        return f64::NAN;
    }
    match body.parse::<f64>() {
        Ok(v) => {
            if neg {
                -v
            } else {
                v
            }
        }
        Err(_) => f64::NAN,
    }
}

/// XPath number formatting: "NaN" / "Infinity" / "-Infinity", integers
/// without a decimal point or sign on zero, shortest form otherwise.
pub(crate) fn number_to_string(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if v == 0.0 {
        return "0".to_string();
    }
    if v == v.trunc() {
        return format!("{:.0}", v);
    }
    format!("{}", v)
}

/// XPath `round()`: nearest integer, ties toward positive infinity.
pub(crate) fn round_half_up(v: f64) -> f64 {
    if v.is_nan() {
        return v;
    }
    (v + 0.5).floor()
}

/// One named, typed variable cell. The type is fixed when the variable is
/// added to its set; setters of a different type are rejected.
#[derive(Debug, Clone)]
pub struct XPathVariable<'a> {
    name: Box<str>,
    value: XPathValue<'a>,
}

impl<'a> XPathVariable<'a> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> XPathValueType {
        self.value.value_type()
    }

    /// The held boolean, or `false` for other variable types.
    pub fn get_boolean(&self) -> bool {
        match &self.value {
            XPathValue::Boolean(b) => *b,
            _ => false,
        }
    }

    /// The held number, or NaN for other variable types.
    pub fn get_number(&self) -> f64 {
        match &self.value {
            XPathValue::Number(n) => *n,
            _ => f64::NAN,
        }
    }

    /// The held string, or `""` for other variable types.
    pub fn get_string(&self) -> &str {
        match &self.value {
            XPathValue::String(s) => s,
            _ => "",
        }
    }

    /// A copy of the held node-set, or an empty set for other types.
    pub fn get_node_set(&self) -> XPathNodeSet<'a> {
        match &self.value {
            XPathValue::NodeSet(set) => set.clone(),
            _ => XPathNodeSet::default(),
        }
    }

    pub fn set_boolean(&mut self, value: bool) -> bool {
        match &mut self.value {
            XPathValue::Boolean(slot) => {
                *slot = value;
                true
            }
            _ => false,
        }
    }

    pub fn set_number(&mut self, value: f64) -> bool {
        match &mut self.value {
            XPathValue::Number(slot) => {
                *slot = value;
                true
            }
            _ => false,
        }
    }

    pub fn set_string(&mut self, value: &str) -> bool {
        match &mut self.value {
            XPathValue::String(slot) => {
                slot.clear();
                slot.push_str(value);
                true
            }
            _ => false,
        }
    }

    pub fn set_node_set(&mut self, value: XPathNodeSet<'a>) -> bool {
        match &mut self.value {
            XPathValue::NodeSet(slot) => {
                *slot = value;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn value(&self) -> &XPathValue<'a> {
        &self.value
    }
}

/// Named variables referenced from expressions as `$name`. Compilation
/// checks names and types against the set; evaluation reads the current
/// values, so bindings can change between runs of the same query.
#[derive(Debug, Default, Clone)]
pub struct XPathVariableSet<'a> {
    vars: Vec<XPathVariable<'a>>,
}

impl<'a> XPathVariableSet<'a> {
    pub fn new() -> Self {
        XPathVariableSet { vars: Vec::new() }
    }

    /// Adds a variable of the given type with a default value, or returns
    /// the existing one when the types agree. A type clash yields `None`.
    pub fn add(&mut self, name: &str, ty: XPathValueType) -> Option<&mut XPathVariable<'a>> {
        if let Some(pos) = self.vars.iter().position(|v| &*v.name == name) {
            if self.vars[pos].value_type() == ty {
                return Some(&mut self.vars[pos]);
            }
            return None;
        }
        self.vars.push(XPathVariable {
            name: name.into(),
            value: XPathValue::default_of(ty),
        });
        self.vars.last_mut()
    }

    pub fn get(&self, name: &str) -> Option<&XPathVariable<'a>> {
        self.vars.iter().find(|v| &*v.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut XPathVariable<'a>> {
        self.vars.iter_mut().find(|v| &*v.name == name)
    }

    /// Add-or-set convenience; fails when the variable exists with a
    /// different type.
    pub fn set_boolean(&mut self, name: &str, value: bool) -> bool {
        match self.add(name, XPathValueType::Boolean) {
            Some(var) => var.set_boolean(value),
            None => false,
        }
    }

    pub fn set_number(&mut self, name: &str, value: f64) -> bool {
        match self.add(name, XPathValueType::Number) {
            Some(var) => var.set_number(value),
            None => false,
        }
    }

    pub fn set_string(&mut self, name: &str, value: &str) -> bool {
        match self.add(name, XPathValueType::String) {
            Some(var) => var.set_string(value),
            None => false,
        }
    }

    pub fn set_node_set(&mut self, name: &str, value: XPathNodeSet<'a>) -> bool {
        match self.add(name, XPathValueType::NodeSet) {
            Some(var) => var.set_node_set(value),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::XmlDocument;

    fn load(text: &str) -> XmlDocument {
        let mut doc = XmlDocument::new();
        let result = doc.load_string(text);
        assert!(result.ok(), "parse failed: {}", result.description());
        doc
    }

    #[test]
    fn test_boolean_conversion() {
        assert!(XPathValue::Boolean(true).to_boolean());
        assert!(!XPathValue::Boolean(false).to_boolean());
        assert!(XPathValue::Number(1.0).to_boolean());
        assert!(!XPathValue::Number(0.0).to_boolean());
        assert!(!XPathValue::Number(f64::NAN).to_boolean());
        assert!(XPathValue::String("hello".to_string()).to_boolean());
        assert!(!XPathValue::String(String::new()).to_boolean());
        assert!(!XPathValue::empty_node_set().to_boolean());
    }

    #[test]
    fn test_number_conversion() {
        assert_eq!(XPathValue::Boolean(true).to_number(), 1.0);
        assert_eq!(XPathValue::Boolean(false).to_number(), 0.0);
        assert_eq!(XPathValue::String("42".to_string()).to_number(), 42.0);
        assert_eq!(XPathValue::String(" -3.5 ".to_string()).to_number(), -3.5);
        assert_eq!(XPathValue::String(".5".to_string()).to_number(), 0.5);
        assert!(XPathValue::String("abc".to_string()).to_number().is_nan());
        assert!(XPathValue::String("12e3".to_string()).to_number().is_nan());
        assert!(XPathValue::String("1.2.3".to_string()).to_number().is_nan());
        assert!(XPathValue::String(String::new()).to_number().is_nan());
    }

    #[test]
    fn test_string_conversion() {
        assert_eq!(XPathValue::Boolean(true).to_string_value(), "true");
        assert_eq!(XPathValue::Boolean(false).to_string_value(), "false");
        assert_eq!(XPathValue::Number(42.0).to_string_value(), "42");
        assert_eq!(XPathValue::Number(3.25).to_string_value(), "3.25");
        assert_eq!(XPathValue::Number(-0.0).to_string_value(), "0");
        assert_eq!(XPathValue::Number(f64::NAN).to_string_value(), "NaN");
        assert_eq!(XPathValue::Number(f64::INFINITY).to_string_value(), "Infinity");
        assert_eq!(
            XPathValue::Number(f64::NEG_INFINITY).to_string_value(),
            "-Infinity"
        );
        assert_eq!(
            XPathValue::Number(1e20).to_string_value(),
            "100000000000000000000"
        );
    }

    #[test]
    fn test_node_accessors() {
        let doc = load("<node attr='value'/>");
        let elem = doc.child("node");
        let attr = elem.attribute("attr");

        let as_node = XPathNode::from_node(elem);
        assert_eq!(as_node.node(), elem);
        assert!(as_node.attribute().is_null());
        assert_eq!(as_node.parent(), doc.root());
        assert!(!as_node.is_null());

        let as_attr = XPathNode::from_attribute(attr, elem);
        assert!(as_attr.node().is_null());
        assert_eq!(as_attr.attribute(), attr);
        assert_eq!(as_attr.parent(), elem);
        assert!(!as_attr.is_null());

        let null = XPathNode::from_node(doc.child("missing"));
        assert!(null.is_null());
        assert!(null.node().is_null());
        assert!(null.attribute().is_null());
        assert!(null.parent().is_null());
    }

    #[test]
    fn test_string_value() {
        let doc = load("<a>one<b>two</b><!--x-->three</a>");
        let a = XPathNode::from_node(doc.child("a"));
        assert_eq!(string_value(&a), "onetwothree");

        let root = XPathNode::from_node(doc.root());
        assert_eq!(string_value(&root), "onetwothree");

        let attr_doc = load("<n key='v'/>");
        let n = attr_doc.child("n");
        let attr = XPathNode::from_attribute(n.attribute("key"), n);
        assert_eq!(string_value(&attr), "v");

        let comment = XPathNode::from_node(doc.child("a").child("b").next_sibling());
        assert_eq!(string_value(&comment), "x");
    }

    #[test]
    fn test_document_order_with_attributes() {
        let doc = load("<node a='1' b='2'><child/></node>");
        let node = doc.child("node");
        let elem = XPathNode::from_node(node);
        let a = XPathNode::from_attribute(node.attribute("a"), node);
        let b = XPathNode::from_attribute(node.attribute("b"), node);
        let child = XPathNode::from_node(node.first_child());

        assert_eq!(cmp_document_order(&elem, &a), Ordering::Less);
        assert_eq!(cmp_document_order(&a, &b), Ordering::Less);
        assert_eq!(cmp_document_order(&b, &child), Ordering::Less);
        assert_eq!(cmp_document_order(&a, &a), Ordering::Equal);
        assert_eq!(cmp_document_order(&child, &elem), Ordering::Greater);
    }

    #[test]
    fn test_node_set_sort_and_first() {
        let doc = load("<r><a/><b/><c/></r>");
        let r = doc.child("r");
        let a = XPathNode::from_node(r.child("a"));
        let b = XPathNode::from_node(r.child("b"));
        let c = XPathNode::from_node(r.child("c"));

        let mut set = XPathNodeSet::from_parts(vec![c, a, b], NodeSetType::Unsorted);
        assert_eq!(set.kind(), NodeSetType::Unsorted);
        assert_eq!(set.first(), Some(a));

        set.sort(false);
        assert_eq!(set.kind(), NodeSetType::Sorted);
        assert_eq!(set.as_slice(), &[a, b, c]);
        assert_eq!(set.first(), Some(a));

        set.sort(true);
        assert_eq!(set.kind(), NodeSetType::SortedReverse);
        assert_eq!(set.as_slice(), &[c, b, a]);
        assert_eq!(set.first(), Some(a));

        let empty = XPathNodeSet::default();
        assert!(empty.is_empty());
        assert_eq!(empty.kind(), NodeSetType::Unsorted);
        assert_eq!(empty.first(), None);
    }

    #[test]
    fn test_node_set_dedup() {
        let doc = load("<r><a/></r>");
        let a = XPathNode::from_node(doc.child("r").child("a"));
        let mut set = XPathNodeSet::from_parts(vec![a, a, a], NodeSetType::Unsorted);
        set.sort_dedup();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_number_parsing_grammar() {
        assert_eq!(string_to_number("0"), 0.0);
        assert_eq!(string_to_number("  123  "), 123.0);
        assert_eq!(string_to_number("-12."), -12.0);
        assert!(string_to_number("--1").is_nan());
        assert!(string_to_number("-").is_nan());
        assert!(string_to_number(".").is_nan());
        assert!(string_to_number("1 2").is_nan());
    }

    #[test]
    fn test_variable_typed_access() {
        let mut vars = XPathVariableSet::new();
        assert!(vars.add("target", XPathValueType::Boolean).is_some());
        assert!(vars.set_boolean("target", true));

        let var = match vars.get("target") {
            Some(v) => v,
            None => panic!("variable disappeared"),
        };
        assert_eq!(var.name(), "target");
        assert_eq!(var.value_type(), XPathValueType::Boolean);
        assert!(var.get_boolean());
        // Accessors of the other three types fall back to their defaults.
        assert!(var.get_number().is_nan());
        assert!(var.get_string().is_empty());
        assert!(var.get_node_set().is_empty());
    }

    #[test]
    fn test_variable_set_operations() {
        let doc = load("<node/>");
        let mut vars = XPathVariableSet::new();
        assert!(vars.add("var1", XPathValueType::Number).is_some());
        assert!(vars.add("var2", XPathValueType::String).is_some());

        // Re-adding with the same type finds the existing cell, a
        // different type is a clash.
        assert!(vars.add("var1", XPathValueType::Number).is_some());
        assert!(vars.add("var2", XPathValueType::NodeSet).is_none());

        assert!(vars.get("var1").is_some());
        assert!(vars.get("var").is_none());
        assert!(vars.get("var11").is_none());

        assert!(vars.set_number("var1", 1.0));
        assert!(!vars.set_string("var1", "value"));
        assert!(!vars.set_boolean("var1", true));
        assert_eq!(vars.get("var1").map(|v| v.get_number()), Some(1.0));

        assert!(vars.set_string("var2", "value"));
        assert_eq!(
            vars.get("var2").map(|v| v.get_string().to_string()),
            Some("value".to_string())
        );

        let set = XPathNodeSet::from_parts(
            vec![XPathNode::from_node(doc.child("node"))],
            NodeSetType::Sorted,
        );
        assert!(vars.set_node_set("var3", set));
        assert_eq!(vars.get("var3").map(|v| v.get_node_set().len()), Some(1));
        assert!(!vars.set_number("var3", 1.0));

        // set_* adds missing variables with the value's type.
        assert!(vars.set_boolean("var4", true));
        assert_eq!(vars.get("var4").map(|v| v.get_boolean()), Some(true));
    }
}
