//! XPath 1.0 over [`XmlDocument`](crate::dom::XmlDocument) trees.
//!
//! Expressions compile to a small stack program ([`XPathQuery`]) and
//! evaluate against any node handle. Results are typed
//! ([`XPathValue`]): node-set, boolean, number, or string, with the
//! XPath 1.0 coercion rules between them. Node-sets hold
//! [`XPathNode`] entries, each either an element/text/comment/PI node
//! or an attribute together with its owning element.
//!
//! The compiler covers the full 1.0 grammar: all thirteen axes, the
//! core function library, operators, predicates, and `$var` references
//! against a caller-supplied [`XPathVariableSet`]. Namespace nodes are
//! not modeled; the `namespace::` axis is accepted and selects nothing.

mod axes;
mod compiler;
mod eval;
mod functions;
mod lexer;
mod parser;
mod query;
mod value;

pub use query::{XPathError, XPathQuery};
pub use value::{
    NodeSetType, XPathNode, XPathNodeSet, XPathValue, XPathValueType, XPathVariable,
    XPathVariableSet,
};

pub(crate) use query::{select_node, select_node_with, select_nodes, select_nodes_with};
