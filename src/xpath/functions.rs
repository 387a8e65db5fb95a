//! XPath 1.0 core function library.
//!
//! Node-set functions: position(), last(), count(), id(), local-name(),
//! namespace-uri(), name().
//! String functions: string(), concat(), starts-with(), contains(),
//! substring(), substring-before(), substring-after(), string-length(),
//! normalize-space(), translate().
//! Boolean functions: boolean(), not(), true(), false(), lang().
//! Number functions: number(), sum(), floor(), ceiling(), round().
//!
//! Names and arities resolve at compile time, so [`call`] never fails:
//! by evaluation time every argument already has the type the function
//! was compiled against.

use crate::xpath::value::{
    round_half_up, string_to_number, string_value, XPathNode, XPathValue, XPathValueType,
};

/// A resolved core function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Last,
    Position,
    Count,
    Id,
    LocalName,
    NamespaceUri,
    Name,
    String,
    Concat,
    StartsWith,
    Contains,
    SubstringBefore,
    SubstringAfter,
    Substring,
    StringLength,
    NormalizeSpace,
    Translate,
    Boolean,
    Not,
    True,
    False,
    Lang,
    Number,
    Sum,
    Floor,
    Ceiling,
    Round,
}

impl Function {
    /// Resolve a function by name and argument count. `None` covers both
    /// unknown names and wrong arities.
    pub fn resolve(name: &str, argc: usize) -> Option<Function> {
        let f = match name {
            "last" => Function::Last,
            "position" => Function::Position,
            "count" => Function::Count,
            "id" => Function::Id,
            "local-name" => Function::LocalName,
            "namespace-uri" => Function::NamespaceUri,
            "name" => Function::Name,
            "string" => Function::String,
            "concat" => Function::Concat,
            "starts-with" => Function::StartsWith,
            "contains" => Function::Contains,
            "substring-before" => Function::SubstringBefore,
            "substring-after" => Function::SubstringAfter,
            "substring" => Function::Substring,
            "string-length" => Function::StringLength,
            "normalize-space" => Function::NormalizeSpace,
            "translate" => Function::Translate,
            "boolean" => Function::Boolean,
            "not" => Function::Not,
            "true" => Function::True,
            "false" => Function::False,
            "lang" => Function::Lang,
            "number" => Function::Number,
            "sum" => Function::Sum,
            "floor" => Function::Floor,
            "ceiling" => Function::Ceiling,
            "round" => Function::Round,
            _ => return None,
        };
        if f.accepts_arity(argc) {
            Some(f)
        } else {
            None
        }
    }

    fn accepts_arity(self, argc: usize) -> bool {
        match self {
            Function::Last | Function::Position | Function::True | Function::False => argc == 0,
            Function::Count
            | Function::Id
            | Function::Boolean
            | Function::Not
            | Function::Lang
            | Function::Sum
            | Function::Floor
            | Function::Ceiling
            | Function::Round => argc == 1,
            Function::LocalName
            | Function::NamespaceUri
            | Function::Name
            | Function::String
            | Function::StringLength
            | Function::NormalizeSpace
            | Function::Number => argc <= 1,
            Function::StartsWith
            | Function::Contains
            | Function::SubstringBefore
            | Function::SubstringAfter => argc == 2,
            Function::Substring => argc == 2 || argc == 3,
            Function::Concat => argc >= 2,
            Function::Translate => argc == 3,
        }
    }

    /// True when the first argument must statically be a node-set.
    pub fn requires_node_set_arg(self, argc: usize) -> bool {
        match self {
            Function::Count | Function::Sum => true,
            Function::LocalName | Function::NamespaceUri | Function::Name => argc == 1,
            _ => false,
        }
    }

    /// Static result type, used for query return type inference.
    pub fn return_type(self) -> XPathValueType {
        match self {
            Function::Last
            | Function::Position
            | Function::Count
            | Function::StringLength
            | Function::Number
            | Function::Sum
            | Function::Floor
            | Function::Ceiling
            | Function::Round => XPathValueType::Number,
            Function::Id => XPathValueType::NodeSet,
            Function::LocalName
            | Function::NamespaceUri
            | Function::Name
            | Function::String
            | Function::Concat
            | Function::SubstringBefore
            | Function::SubstringAfter
            | Function::Substring
            | Function::NormalizeSpace
            | Function::Translate => XPathValueType::String,
            Function::StartsWith
            | Function::Contains
            | Function::Boolean
            | Function::Not
            | Function::True
            | Function::False
            | Function::Lang => XPathValueType::Boolean,
        }
    }
}

/// Evaluate a function call against the context node and position.
pub fn call<'a>(
    f: Function,
    args: Vec<XPathValue<'a>>,
    node: &XPathNode<'a>,
    position: usize,
    size: usize,
) -> XPathValue<'a> {
    match f {
        Function::Last => XPathValue::Number(size as f64),
        Function::Position => XPathValue::Number(position as f64),
        Function::Count => {
            let n = match args.first() {
                Some(XPathValue::NodeSet(set)) => set.len(),
                _ => 0,
            };
            XPathValue::Number(n as f64)
        }
        // Without DTD processing no element carries an ID.
        Function::Id => XPathValue::empty_node_set(),
        Function::LocalName => {
            let name = target_node(&args, node).map(qualified_name).unwrap_or("");
            XPathValue::String(local_part(name).to_string())
        }
        Function::NamespaceUri => XPathValue::String(String::new()),
        Function::Name => {
            let name = target_node(&args, node).map(qualified_name).unwrap_or("");
            XPathValue::String(name.to_string())
        }
        Function::String => match args.into_iter().next() {
            Some(arg) => XPathValue::String(arg.to_string_value()),
            None => XPathValue::String(string_value(node)),
        },
        Function::Concat => {
            XPathValue::String(args.iter().map(|a| a.to_string_value()).collect())
        }
        Function::StartsWith => {
            let s = arg_string(&args, 0);
            let prefix = arg_string(&args, 1);
            XPathValue::Boolean(s.starts_with(&prefix))
        }
        Function::Contains => {
            let s = arg_string(&args, 0);
            let needle = arg_string(&args, 1);
            XPathValue::Boolean(s.contains(&needle))
        }
        Function::SubstringBefore => {
            let s = arg_string(&args, 0);
            let needle = arg_string(&args, 1);
            let result = match s.find(&needle) {
                Some(pos) => s[..pos].to_string(),
                None => String::new(),
            };
            XPathValue::String(result)
        }
        Function::SubstringAfter => {
            let s = arg_string(&args, 0);
            let needle = arg_string(&args, 1);
            let result = match s.find(&needle) {
                Some(pos) => s[pos + needle.len()..].to_string(),
                None => String::new(),
            };
            XPathValue::String(result)
        }
        Function::Substring => {
            let s = arg_string(&args, 0);
            let start = arg_number(&args, 1);
            let len = if args.len() >= 3 {
                Some(arg_number(&args, 2))
            } else {
                None
            };
            XPathValue::String(substring(&s, start, len))
        }
        Function::StringLength => {
            let s = match args.into_iter().next() {
                Some(arg) => arg.to_string_value(),
                None => string_value(node),
            };
            XPathValue::Number(s.chars().count() as f64)
        }
        Function::NormalizeSpace => {
            let s = match args.into_iter().next() {
                Some(arg) => arg.to_string_value(),
                None => string_value(node),
            };
            XPathValue::String(normalize_space(&s))
        }
        Function::Translate => {
            let s = arg_string(&args, 0);
            let from: Vec<char> = arg_string(&args, 1).chars().collect();
            let to: Vec<char> = arg_string(&args, 2).chars().collect();
            let result: String = s
                .chars()
                .filter_map(|c| match from.iter().position(|&fc| fc == c) {
                    Some(pos) => to.get(pos).copied(),
                    None => Some(c),
                })
                .collect();
            XPathValue::String(result)
        }
        Function::Boolean => {
            XPathValue::Boolean(args.first().map(|a| a.to_boolean()).unwrap_or(false))
        }
        Function::Not => {
            XPathValue::Boolean(!args.first().map(|a| a.to_boolean()).unwrap_or(false))
        }
        Function::True => XPathValue::Boolean(true),
        Function::False => XPathValue::Boolean(false),
        Function::Lang => {
            let target = arg_string(&args, 0);
            let mut cur = node.node();
            let mut matched = false;
            while !cur.is_null() {
                let attr = cur.attribute("xml:lang");
                if !attr.is_null() {
                    matched = lang_matches(attr.value(), &target);
                    break;
                }
                cur = cur.parent();
            }
            XPathValue::Boolean(matched)
        }
        Function::Number => match args.into_iter().next() {
            Some(arg) => XPathValue::Number(arg.to_number()),
            None => XPathValue::Number(string_to_number(&string_value(node))),
        },
        Function::Sum => {
            let mut total = 0.0;
            if let Some(XPathValue::NodeSet(set)) = args.first() {
                for item in set {
                    total += string_to_number(&string_value(item));
                }
            }
            XPathValue::Number(total)
        }
        Function::Floor => XPathValue::Number(arg_number(&args, 0).floor()),
        Function::Ceiling => XPathValue::Number(arg_number(&args, 0).ceil()),
        Function::Round => XPathValue::Number(round_half_up(arg_number(&args, 0))),
    }
}

/// Node an optional node-set argument designates: the set's first node in
/// document order, or the context node when no argument was given.
fn target_node<'a>(args: &[XPathValue<'a>], ctx: &XPathNode<'a>) -> Option<XPathNode<'a>> {
    match args.first() {
        Some(XPathValue::NodeSet(set)) => set.first(),
        Some(_) => None,
        None => Some(*ctx),
    }
}

fn qualified_name<'a>(item: XPathNode<'a>) -> &'a str {
    if item.is_attribute() {
        item.attribute().name()
    } else {
        item.node().name()
    }
}

fn local_part(name: &str) -> &str {
    match name.find(':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

fn arg_string(args: &[XPathValue<'_>], index: usize) -> String {
    args.get(index).map(|a| a.to_string_value()).unwrap_or_default()
}

fn arg_number(args: &[XPathValue<'_>], index: usize) -> f64 {
    args.get(index).map(|a| a.to_number()).unwrap_or(f64::NAN)
}

/// Character range selection per XPath substring(): positions are 1-based,
/// both bounds are rounded, and a character at position p is kept when
/// `p >= round(start)` and `p < round(start) + round(length)`. NaN in
/// either bound selects nothing.
fn substring(s: &str, start: f64, len: Option<f64>) -> String {
    let chars: Vec<char> = s.chars().collect();
    let n = chars.len() as f64;

    let first = round_half_up(start);
    if first.is_nan() || first >= n + 1.0 {
        return String::new();
    }

    let last = match len {
        Some(len) => {
            let last = first + round_half_up(len);
            if last.is_nan() || last < 1.0 || first >= last {
                return String::new();
            }
            last.min(n + 1.0)
        }
        None => n + 1.0,
    };

    let pos = if first < 1.0 { 1.0 } else { first };
    if pos >= last {
        return String::new();
    }
    chars[(pos as usize - 1)..(last as usize - 1)].iter().collect()
}

/// Collapses runs of XML whitespace to single spaces and trims the ends.
fn normalize_space(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending = false;
    for c in s.chars() {
        if matches!(c, ' ' | '\t' | '\r' | '\n') {
            if !out.is_empty() {
                pending = true;
            }
        } else {
            if pending {
                out.push(' ');
                pending = false;
            }
            out.push(c);
        }
    }
    out
}

/// ASCII case-insensitive language match: exact, or a subtag prefix such
/// as "en" against "en-US".
fn lang_matches(value: &str, target: &str) -> bool {
    let mut vc = value.chars();
    for tc in target.chars() {
        match vc.next() {
            Some(c) if c.eq_ignore_ascii_case(&tc) => {}
            _ => return false,
        }
    }
    matches!(vc.next(), None | Some('-'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::XmlDocument;
    use crate::xpath::value::{NodeSetType, XPathNodeSet};

    fn load(text: &str) -> XmlDocument {
        let mut doc = XmlDocument::new();
        let result = doc.load_string(text);
        assert!(result.ok(), "parse failed: {}", result.description());
        doc
    }

    fn call_on<'a>(f: Function, args: Vec<XPathValue<'a>>, node: XPathNode<'a>) -> XPathValue<'a> {
        call(f, args, &node, 1, 1)
    }

    #[test]
    fn test_resolution() {
        assert_eq!(Function::resolve("count", 1), Some(Function::Count));
        assert_eq!(Function::resolve("count", 2), None);
        assert_eq!(Function::resolve("count", 0), None);
        assert_eq!(Function::resolve("frobnicate", 1), None);
        assert_eq!(Function::resolve("concat", 1), None);
        assert_eq!(Function::resolve("concat", 2), Some(Function::Concat));
        assert_eq!(Function::resolve("concat", 7), Some(Function::Concat));
        assert_eq!(Function::resolve("substring", 2), Some(Function::Substring));
        assert_eq!(Function::resolve("substring", 3), Some(Function::Substring));
        assert_eq!(Function::resolve("substring", 4), None);
        assert_eq!(Function::resolve("name", 0), Some(Function::Name));
        assert_eq!(Function::resolve("name", 1), Some(Function::Name));
        assert_eq!(Function::resolve("true", 0), Some(Function::True));
        assert_eq!(Function::resolve("true", 1), None);
    }

    #[test]
    fn test_return_types() {
        assert_eq!(Function::Count.return_type(), XPathValueType::Number);
        assert_eq!(Function::Id.return_type(), XPathValueType::NodeSet);
        assert_eq!(Function::Concat.return_type(), XPathValueType::String);
        assert_eq!(Function::Lang.return_type(), XPathValueType::Boolean);
    }

    #[test]
    fn test_node_set_arg_requirements() {
        assert!(Function::Count.requires_node_set_arg(1));
        assert!(Function::Sum.requires_node_set_arg(1));
        assert!(Function::Name.requires_node_set_arg(1));
        assert!(!Function::Name.requires_node_set_arg(0));
        assert!(!Function::Id.requires_node_set_arg(1));
        assert!(!Function::Boolean.requires_node_set_arg(1));
    }

    #[test]
    fn test_substring_ranges() {
        assert_eq!(substring("hello", 2.0, Some(3.0)), "ell");
        assert_eq!(substring("12345", 1.5, Some(2.6)), "234");
        assert_eq!(substring("12345", 0.0, Some(3.0)), "12");
        assert_eq!(substring("12345", 2.0, None), "2345");
        assert_eq!(substring("12345", 0.0, None), "12345");
        assert_eq!(substring("12345", f64::NAN, Some(3.0)), "");
        assert_eq!(substring("12345", 1.0, Some(f64::NAN)), "");
        assert_eq!(substring("12345", -42.0, Some(f64::INFINITY)), "12345");
        assert_eq!(
            substring("12345", f64::NEG_INFINITY, Some(f64::INFINITY)),
            ""
        );
        assert_eq!(substring("12345", 6.0, None), "");
        assert_eq!(substring("12345", 1.0, Some(0.0)), "");
    }

    #[test]
    fn test_normalize_space() {
        assert_eq!(normalize_space("  hello   world  "), "hello world");
        assert_eq!(normalize_space("\t a \r\n b \t"), "a b");
        assert_eq!(normalize_space(""), "");
        assert_eq!(normalize_space("   "), "");
    }

    #[test]
    fn test_translate() {
        let doc = load("<r/>");
        let node = XPathNode::from_node(doc.root());
        let args = vec![
            XPathValue::from("bar"),
            XPathValue::from("abc"),
            XPathValue::from("ABC"),
        ];
        let result = call_on(Function::Translate, args, node);
        assert_eq!(result.to_string_value(), "BAr");

        // A shorter replacement list deletes characters.
        let args = vec![
            XPathValue::from("--aaa--"),
            XPathValue::from("abc-"),
            XPathValue::from("ABC"),
        ];
        let result = call_on(Function::Translate, args, node);
        assert_eq!(result.to_string_value(), "AAA");
    }

    #[test]
    fn test_string_matching() {
        let doc = load("<r/>");
        let node = XPathNode::from_node(doc.root());

        let result = call_on(
            Function::StartsWith,
            vec![XPathValue::from("hello"), XPathValue::from("he")],
            node,
        );
        assert!(result.to_boolean());

        let result = call_on(
            Function::Contains,
            vec![XPathValue::from("hello world"), XPathValue::from("o w")],
            node,
        );
        assert!(result.to_boolean());

        let result = call_on(
            Function::SubstringBefore,
            vec![XPathValue::from("1999/04/01"), XPathValue::from("/")],
            node,
        );
        assert_eq!(result.to_string_value(), "1999");

        let result = call_on(
            Function::SubstringAfter,
            vec![XPathValue::from("1999/04/01"), XPathValue::from("/")],
            node,
        );
        assert_eq!(result.to_string_value(), "04/01");

        // An empty needle splits before the first character.
        let result = call_on(
            Function::SubstringAfter,
            vec![XPathValue::from("abc"), XPathValue::from("")],
            node,
        );
        assert_eq!(result.to_string_value(), "abc");
    }

    #[test]
    fn test_rounding() {
        let doc = load("<r/>");
        let node = XPathNode::from_node(doc.root());

        let round = |v: f64| {
            call_on(Function::Round, vec![XPathValue::Number(v)], node).to_number()
        };
        assert_eq!(round(2.4), 2.0);
        assert_eq!(round(2.5), 3.0);
        assert_eq!(round(-2.5), -2.0);
        assert_eq!(round(-0.3), 0.0);
        assert!(round(f64::NAN).is_nan());

        let floor = |v: f64| {
            call_on(Function::Floor, vec![XPathValue::Number(v)], node).to_number()
        };
        assert_eq!(floor(1.9), 1.0);
        assert_eq!(floor(-1.1), -2.0);

        let ceiling = |v: f64| {
            call_on(Function::Ceiling, vec![XPathValue::Number(v)], node).to_number()
        };
        assert_eq!(ceiling(1.1), 2.0);
        assert_eq!(ceiling(-1.9), -1.0);
    }

    #[test]
    fn test_name_functions() {
        let doc = load("<ns:child attr='1'/>");
        let elem = doc.child("ns:child");
        let node = XPathNode::from_node(elem);

        let result = call_on(Function::Name, Vec::new(), node);
        assert_eq!(result.to_string_value(), "ns:child");

        let result = call_on(Function::LocalName, Vec::new(), node);
        assert_eq!(result.to_string_value(), "child");

        let result = call_on(Function::NamespaceUri, Vec::new(), node);
        assert_eq!(result.to_string_value(), "");

        let attr = XPathNode::from_attribute(elem.attribute("attr"), elem);
        let result = call_on(Function::Name, Vec::new(), attr);
        assert_eq!(result.to_string_value(), "attr");

        // With a node-set argument the first node in document order wins.
        let set = XPathNodeSet::from_parts(vec![node], NodeSetType::Sorted);
        let result = call_on(Function::Name, vec![XPathValue::NodeSet(set)], attr);
        assert_eq!(result.to_string_value(), "ns:child");

        let empty = XPathNodeSet::default();
        let result = call_on(Function::Name, vec![XPathValue::NodeSet(empty)], node);
        assert_eq!(result.to_string_value(), "");
    }

    #[test]
    fn test_count_and_sum() {
        let doc = load("<r><v>1</v><v>2.5</v></r>");
        let r = doc.child("r");
        let node = XPathNode::from_node(r);
        let nodes: Vec<XPathNode> = r.children().map(XPathNode::from_node).collect();
        let set = XPathNodeSet::from_parts(nodes, NodeSetType::Sorted);

        let result = call_on(
            Function::Count,
            vec![XPathValue::NodeSet(set.clone())],
            node,
        );
        assert_eq!(result.to_number(), 2.0);

        let result = call_on(Function::Sum, vec![XPathValue::NodeSet(set)], node);
        assert_eq!(result.to_number(), 3.5);

        let result = call_on(
            Function::Sum,
            vec![XPathValue::NodeSet(XPathNodeSet::default())],
            node,
        );
        assert_eq!(result.to_number(), 0.0);
    }

    #[test]
    fn test_lang() {
        let doc = load("<root xml:lang='en-US'><child/><other xml:lang='fr'/></root>");
        let root = doc.child("root");
        let child = XPathNode::from_node(root.child("child"));

        let matches = |node: XPathNode, lang: &str| {
            call_on(Function::Lang, vec![XPathValue::from(lang)], node).to_boolean()
        };
        assert!(matches(child, "en"));
        assert!(matches(child, "EN-us"));
        assert!(!matches(child, "e"));
        assert!(!matches(child, "fr"));

        // The nearest xml:lang wins.
        let other = XPathNode::from_node(root.child("other"));
        assert!(matches(other, "fr"));
        assert!(!matches(other, "en"));
    }

    #[test]
    fn test_context_functions() {
        let doc = load("<r>text</r>");
        let node = XPathNode::from_node(doc.child("r"));

        let result = call(Function::Position, Vec::new(), &node, 3, 7);
        assert_eq!(result.to_number(), 3.0);
        let result = call(Function::Last, Vec::new(), &node, 3, 7);
        assert_eq!(result.to_number(), 7.0);

        let result = call_on(Function::String, Vec::new(), node);
        assert_eq!(result.to_string_value(), "text");
        let result = call_on(Function::StringLength, Vec::new(), node);
        assert_eq!(result.to_number(), 4.0);

        let result = call_on(Function::Id, vec![XPathValue::from("x")], node);
        assert!(matches!(result, XPathValue::NodeSet(set) if set.is_empty()));
    }
}
