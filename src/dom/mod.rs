//! Document object model.
//!
//! An [`XmlDocument`] owns the tree in arena storage; [`NodeId`] and
//! [`AttrId`] address records inside it. The borrowing handles
//! [`XmlNode`] and [`XmlAttribute`] cover read access and navigation,
//! [`XmlText`] adds typed conversions over text content.

pub mod document;
pub mod handle;
pub mod node;
pub(crate) mod strings;
pub mod text;

pub use document::XmlDocument;
pub use handle::{Attributes, Children, XmlAttribute, XmlNode, XmlTreeWalker};
pub use node::{AttrId, NodeId, XmlNodeType};
pub use text::XmlText;
