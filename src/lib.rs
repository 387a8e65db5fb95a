//! featherxml - light-weight XML processing with XPath
//!
//! An in-memory XML library built around three pieces:
//! - [`XmlDocument`]: an arena-backed DOM with full read and mutation
//!   access through borrowing [`XmlNode`] / [`XmlAttribute`] handles
//! - a single-pass parser with encoding detection and a `u32` option
//!   bitmask ([`parse`]), and a matching configurable serializer
//!   ([`serial`])
//! - an XPath 1.0 compiler and evaluator ([`xpath`]) with typed results
//!   and variable bindings
//!
//! ```
//! use featherxml::XmlDocument;
//!
//! let mut doc = XmlDocument::new();
//! let result = doc.load_string("<library><book id='1'>Dune</book></library>");
//! assert!(result.ok());
//!
//! let book = doc.child("library").child("book");
//! assert_eq!(book.attribute("id").value(), "1");
//! assert_eq!(book.text().as_str(), "Dune");
//!
//! let found = doc.select_node("//book[@id = '1']").unwrap();
//! assert_eq!(found.map(|n| n.node().child_value()), Some("Dune"));
//! ```

pub mod core;
pub mod dom;
pub mod parse;
pub mod serial;
pub mod xpath;

pub use crate::core::encoding::XmlEncoding;
pub use dom::{
    AttrId, NodeId, XmlAttribute, XmlDocument, XmlNode, XmlNodeType, XmlText, XmlTreeWalker,
};
pub use parse::{ParseResult, ParseStatus};
pub use xpath::{
    NodeSetType, XPathError, XPathNode, XPathNodeSet, XPathQuery, XPathValue, XPathValueType,
    XPathVariable, XPathVariableSet,
};
