//! XPath axis navigation.
//!
//! All thirteen XPath 1.0 axes over node-set entries:
//! child, parent, self, descendant, descendant-or-self, ancestor,
//! ancestor-or-self, following, following-sibling, preceding,
//! preceding-sibling, attribute, and namespace (parsed but always empty,
//! since namespace nodes are not modeled).
//!
//! Reverse axes (ancestor, ancestor-or-self, preceding,
//! preceding-sibling) yield nodes in proximity order, nearest first, so
//! positional predicates count from the context node. Attribute entries
//! navigate too: their parent is the owning element, and their child-like
//! axes are empty. Declaration and doctype nodes are not part of the
//! XPath data model and never appear on any axis.

use crate::dom::{XmlNode, XmlNodeType};
use crate::xpath::parser::{Axis, NodeTest};
use crate::xpath::value::XPathNode;

/// Collect the nodes an axis reaches from the context entry, in axis
/// order.
pub fn navigate<'a>(item: &XPathNode<'a>, axis: Axis) -> Vec<XPathNode<'a>> {
    match axis {
        Axis::Child => child_axis(item),
        Axis::Descendant => descendant_axis(item),
        Axis::DescendantOrSelf => descendant_or_self_axis(item),
        Axis::Parent => parent_axis(item),
        Axis::Ancestor => ancestor_axis(item),
        Axis::AncestorOrSelf => ancestor_or_self_axis(item),
        Axis::FollowingSibling => following_sibling_axis(item),
        Axis::PrecedingSibling => preceding_sibling_axis(item),
        Axis::Following => following_axis(item),
        Axis::Preceding => preceding_axis(item),
        Axis::Self_ => vec![*item],
        Axis::Attribute => attribute_axis(item),
        Axis::Namespace => Vec::new(),
    }
}

fn visible(node: XmlNode<'_>) -> bool {
    !matches!(
        node.node_type(),
        XmlNodeType::Declaration | XmlNodeType::Doctype
    )
}

/// Pushes `node` and its whole subtree in document order.
fn collect_subtree<'a>(node: XmlNode<'a>, out: &mut Vec<XPathNode<'a>>) {
    if !visible(node) {
        return;
    }
    out.push(XPathNode::from_node(node));
    let mut cur = node.first_child();
    while !cur.is_null() && cur != node {
        if visible(cur) {
            out.push(XPathNode::from_node(cur));
        }
        if !cur.first_child().is_null() {
            cur = cur.first_child();
        } else {
            loop {
                let next = cur.next_sibling();
                if !next.is_null() {
                    cur = next;
                    break;
                }
                cur = cur.parent();
                if cur.is_null() || cur == node {
                    break;
                }
            }
        }
    }
}

fn child_axis<'a>(item: &XPathNode<'a>) -> Vec<XPathNode<'a>> {
    if item.is_attribute() {
        return Vec::new();
    }
    item.node()
        .children()
        .filter(|child| visible(*child))
        .map(XPathNode::from_node)
        .collect()
}

fn descendant_axis<'a>(item: &XPathNode<'a>) -> Vec<XPathNode<'a>> {
    if item.is_attribute() {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut child = item.node().first_child();
    while !child.is_null() {
        collect_subtree(child, &mut out);
        child = child.next_sibling();
    }
    out
}

fn descendant_or_self_axis<'a>(item: &XPathNode<'a>) -> Vec<XPathNode<'a>> {
    if item.is_attribute() {
        return vec![*item];
    }
    let mut out = Vec::new();
    collect_subtree(item.node(), &mut out);
    out
}

fn parent_axis<'a>(item: &XPathNode<'a>) -> Vec<XPathNode<'a>> {
    let parent = item.parent();
    if parent.is_null() {
        Vec::new()
    } else {
        vec![XPathNode::from_node(parent)]
    }
}

fn ancestor_axis<'a>(item: &XPathNode<'a>) -> Vec<XPathNode<'a>> {
    let mut out = Vec::new();
    let mut cur = item.parent();
    while !cur.is_null() {
        out.push(XPathNode::from_node(cur));
        cur = cur.parent();
    }
    out
}

fn ancestor_or_self_axis<'a>(item: &XPathNode<'a>) -> Vec<XPathNode<'a>> {
    let mut out = vec![*item];
    out.extend(ancestor_axis(item));
    out
}

fn following_sibling_axis<'a>(item: &XPathNode<'a>) -> Vec<XPathNode<'a>> {
    if item.is_attribute() {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut cur = item.node().next_sibling();
    while !cur.is_null() {
        if visible(cur) {
            out.push(XPathNode::from_node(cur));
        }
        cur = cur.next_sibling();
    }
    out
}

fn preceding_sibling_axis<'a>(item: &XPathNode<'a>) -> Vec<XPathNode<'a>> {
    if item.is_attribute() {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut cur = item.node().previous_sibling();
    while !cur.is_null() {
        if visible(cur) {
            out.push(XPathNode::from_node(cur));
        }
        cur = cur.previous_sibling();
    }
    out
}

fn following_axis<'a>(item: &XPathNode<'a>) -> Vec<XPathNode<'a>> {
    let mut out = Vec::new();
    let mut base = if item.is_attribute() {
        // An attribute sits before its element's content, so the whole
        // subtree of the owner follows it.
        let owner = item.parent();
        let mut child = owner.first_child();
        while !child.is_null() {
            collect_subtree(child, &mut out);
            child = child.next_sibling();
        }
        owner
    } else {
        item.node()
    };
    while !base.is_null() {
        let mut sib = base.next_sibling();
        while !sib.is_null() {
            collect_subtree(sib, &mut out);
            sib = sib.next_sibling();
        }
        base = base.parent();
    }
    out
}

fn preceding_axis<'a>(item: &XPathNode<'a>) -> Vec<XPathNode<'a>> {
    let mut out = Vec::new();
    let mut base = if item.is_attribute() {
        item.parent()
    } else {
        item.node()
    };
    // Ancestors themselves are excluded; each preceding sibling's subtree
    // is reversed so the whole result is in proximity order.
    while !base.is_null() {
        let mut sib = base.previous_sibling();
        while !sib.is_null() {
            let start = out.len();
            collect_subtree(sib, &mut out);
            out[start..].reverse();
            sib = sib.previous_sibling();
        }
        base = base.parent();
    }
    out
}

fn attribute_axis<'a>(item: &XPathNode<'a>) -> Vec<XPathNode<'a>> {
    if item.is_attribute() {
        return Vec::new();
    }
    let node = item.node();
    node.attributes()
        .map(|attr| XPathNode::from_attribute(attr, node))
        .collect()
}

/// Check one axis result against a node test. The principal node type is
/// attribute on the attribute axis and element everywhere else; name
/// tests compare full qualified names.
pub fn matches_node_test(item: &XPathNode<'_>, axis: Axis, test: &NodeTest) -> bool {
    let principal_is_attribute = axis == Axis::Attribute;
    match test {
        NodeTest::All => {
            if principal_is_attribute {
                item.is_attribute()
            } else {
                item.node().node_type() == XmlNodeType::Element
            }
        }
        NodeTest::Name(name) => {
            principal_name(item, principal_is_attribute) == Some(name.as_str())
        }
        NodeTest::Prefixed(prefix) => match principal_name(item, principal_is_attribute) {
            Some(n) => n
                .strip_prefix(prefix.as_str())
                .map(|rest| rest.starts_with(':'))
                .unwrap_or(false),
            None => false,
        },
        NodeTest::Node => true,
        NodeTest::Text => matches!(
            item.node().node_type(),
            XmlNodeType::Pcdata | XmlNodeType::Cdata
        ),
        NodeTest::Comment => item.node().node_type() == XmlNodeType::Comment,
        NodeTest::Pi(target) => {
            if item.node().node_type() != XmlNodeType::Pi {
                return false;
            }
            match target {
                Some(t) => item.node().name() == t.as_str(),
                None => true,
            }
        }
    }
}

fn principal_name<'a>(item: &XPathNode<'a>, principal_is_attribute: bool) -> Option<&'a str> {
    if principal_is_attribute {
        if item.is_attribute() {
            Some(item.attribute().name())
        } else {
            None
        }
    } else if !item.is_attribute() && item.node().node_type() == XmlNodeType::Element {
        Some(item.node().name())
    } else {
        None
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

    fn names(nodes: &[XPathNode<'_>]) -> Vec<String> {
        nodes
            .iter()
            .map(|n| {
                if n.is_attribute() {
                    n.attribute().name().to_string()
                } else {
                    n.node().name().to_string()
                }
            })
            .collect()
    }

    #[test]
    fn test_child_axis() {
        let doc = load("<root><a/>text<b/></root>");
        let root = XPathNode::from_node(doc.child("root"));
        let children = navigate(&root, Axis::Child);
        assert_eq!(children.len(), 3);
        assert_eq!(children[0].node().name(), "a");
        assert_eq!(children[2].node().name(), "b");
    }

    #[test]
    fn test_descendant_axes() {
        let doc = load("<root><a><b/></a><c/></root>");
        let root = XPathNode::from_node(doc.child("root"));

        let descendants = navigate(&root, Axis::Descendant);
        assert_eq!(names(&descendants), ["a", "b", "c"]);

        let with_self = navigate(&root, Axis::DescendantOrSelf);
        assert_eq!(names(&with_self), ["root", "a", "b", "c"]);
    }

    #[test]
    fn test_ancestor_axes() {
        let doc = load("<root><a><b/></a></root>");
        let b = XPathNode::from_node(doc.child("root").child("a").child("b"));

        let ancestors = navigate(&b, Axis::Ancestor);
        assert_eq!(ancestors.len(), 3); // a, root, document
        assert_eq!(ancestors[0].node().name(), "a");
        assert_eq!(ancestors[1].node().name(), "root");
        assert_eq!(ancestors[2].node().node_type(), XmlNodeType::Document);

        let with_self = navigate(&b, Axis::AncestorOrSelf);
        assert_eq!(with_self.len(), 4);
        assert_eq!(with_self[0].node().name(), "b");
    }

    #[test]
    fn test_sibling_axes() {
        let doc = load("<r><a/><b/><c/><d/></r>");
        let c = XPathNode::from_node(doc.child("r").child("c"));

        let following = navigate(&c, Axis::FollowingSibling);
        assert_eq!(names(&following), ["d"]);

        // Preceding siblings come nearest first.
        let preceding = navigate(&c, Axis::PrecedingSibling);
        assert_eq!(names(&preceding), ["b", "a"]);
    }

    #[test]
    fn test_following_and_preceding() {
        let doc = load("<r><a><a1/></a><b/><c><c1/></c></r>");
        let b = XPathNode::from_node(doc.child("r").child("b"));

        let following = navigate(&b, Axis::Following);
        assert_eq!(names(&following), ["c", "c1"]);

        // Ancestors are excluded; order is proximity (reverse document).
        let preceding = navigate(&b, Axis::Preceding);
        assert_eq!(names(&preceding), ["a1", "a"]);
    }

    #[test]
    fn test_attribute_axis() {
        let doc = load("<node a='1' b='2'/>");
        let node = XPathNode::from_node(doc.child("node"));

        let attrs = navigate(&node, Axis::Attribute);
        assert_eq!(names(&attrs), ["a", "b"]);
        assert!(attrs[0].is_attribute());
        assert_eq!(attrs[0].parent(), doc.child("node"));
    }

    #[test]
    fn test_attribute_context_navigation() {
        let doc = load("<node attr='v'><child/></node>");
        let elem = doc.child("node");
        let attr = XPathNode::from_attribute(elem.attribute("attr"), elem);

        assert!(navigate(&attr, Axis::Child).is_empty());
        assert!(navigate(&attr, Axis::Descendant).is_empty());
        assert!(navigate(&attr, Axis::Attribute).is_empty());
        assert!(navigate(&attr, Axis::FollowingSibling).is_empty());

        let parent = navigate(&attr, Axis::Parent);
        assert_eq!(parent.len(), 1);
        assert_eq!(parent[0].node(), elem);

        let with_self = navigate(&attr, Axis::DescendantOrSelf);
        assert_eq!(with_self.len(), 1);
        assert!(with_self[0].is_attribute());

        // The owner's content follows an attribute.
        let following = navigate(&attr, Axis::Following);
        assert_eq!(names(&following), ["child"]);
    }

    #[test]
    fn test_name_tests() {
        let doc = load("<r><ns:x/><nsx/>text</r>");
        let r = XPathNode::from_node(doc.child("r"));
        let children = navigate(&r, Axis::Child);
        let prefixed = children[0];
        let plain = children[1];
        let text = children[2];

        assert!(matches_node_test(&prefixed, Axis::Child, &NodeTest::All));
        assert!(!matches_node_test(&text, Axis::Child, &NodeTest::All));
        assert!(matches_node_test(&text, Axis::Child, &NodeTest::Node));
        assert!(matches_node_test(&text, Axis::Child, &NodeTest::Text));

        let by_name = NodeTest::Name("ns:x".to_string());
        assert!(matches_node_test(&prefixed, Axis::Child, &by_name));
        assert!(!matches_node_test(&plain, Axis::Child, &by_name));

        let by_prefix = NodeTest::Prefixed("ns".to_string());
        assert!(matches_node_test(&prefixed, Axis::Child, &by_prefix));
        assert!(!matches_node_test(&plain, Axis::Child, &by_prefix));
    }

    #[test]
    fn test_principal_type_for_attributes() {
        let doc = load("<node attr='v'/>");
        let elem = doc.child("node");
        let attr = XPathNode::from_attribute(elem.attribute("attr"), elem);

        // On the attribute axis the principal type is attribute.
        assert!(matches_node_test(&attr, Axis::Attribute, &NodeTest::All));
        assert!(matches_node_test(
            &attr,
            Axis::Attribute,
            &NodeTest::Name("attr".to_string())
        ));

        // Everywhere else attributes fail name and star tests but still
        // match node().
        assert!(!matches_node_test(&attr, Axis::Self_, &NodeTest::All));
        assert!(matches_node_test(&attr, Axis::Self_, &NodeTest::Node));
    }

    #[test]
    fn test_processing_instruction_test() {
        let doc = {
            let mut doc = XmlDocument::new();
            let result = doc.load_string_with(
                "<r><?tool data?><?other x?></r>",
                crate::parse::PARSE_DEFAULT | crate::parse::PARSE_PI,
            );
            assert!(result.ok());
            doc
        };
        let r = XPathNode::from_node(doc.child("r"));
        let children = navigate(&r, Axis::Child);
        assert_eq!(children.len(), 2);

        assert!(matches_node_test(&children[0], Axis::Child, &NodeTest::Pi(None)));
        assert!(matches_node_test(
            &children[0],
            Axis::Child,
            &NodeTest::Pi(Some("tool".to_string()))
        ));
        assert!(!matches_node_test(
            &children[1],
            Axis::Child,
            &NodeTest::Pi(Some("tool".to_string()))
        ));
    }

    #[test]
    fn test_declaration_is_invisible() {
        let mut doc = XmlDocument::new();
        let result = doc.load_string_with(
            "<?xml version='1.0'?><root/>",
            crate::parse::PARSE_DEFAULT | crate::parse::PARSE_DECLARATION,
        );
        assert!(result.ok());
        assert_eq!(
            doc.root().first_child().node_type(),
            XmlNodeType::Declaration
        );

        let root = XPathNode::from_node(doc.root());
        let children = navigate(&root, Axis::Child);
        assert_eq!(names(&children), ["root"]);

        let all = navigate(&root, Axis::DescendantOrSelf);
        assert_eq!(all.len(), 2); // document and root element only
    }
}
