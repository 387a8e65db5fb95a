//! Compiled XPath queries.
//!
//! [`XPathQuery`] wraps a compiled program behind an `Arc`, so queries
//! are cheap to clone and evaluate any number of times against any
//! document. Compilation reports [`XPathError`] with a message and the
//! byte offset of the problem; evaluation itself never fails.
//!
//! Programs for variable-free expressions are kept in a process-wide
//! LRU cache, so the ad-hoc `select_nodes("...")` style of use does not
//! recompile the same expression on every call. Queries compiled with
//! a variable set bypass the cache: their result type depends on the
//! declared variable types.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, OnceLock};

use lru::LruCache;

use crate::dom::XmlNode;
use crate::xpath::compiler::{self, CompiledExpr};
use crate::xpath::eval::{evaluate, EvalContext};
use crate::xpath::value::{XPathNode, XPathNodeSet, XPathValue, XPathValueType, XPathVariableSet};

/// Number of compiled programs retained by the process-wide cache.
const QUERY_CACHE_CAPACITY: usize = 128;

/// An XPath expression the compiler rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPathError {
    message: &'static str,
    offset: usize,
}

impl XPathError {
    pub(crate) fn new(message: &'static str, offset: usize) -> Self {
        XPathError { message, offset }
    }

    /// What went wrong.
    pub fn message(&self) -> &'static str {
        self.message
    }

    /// Byte offset into the expression where the problem was detected.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl fmt::Display for XPathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.message, self.offset)
    }
}

impl std::error::Error for XPathError {}

/// A compiled XPath 1.0 expression.
///
/// The context node for evaluation is anything convertible to
/// [`XPathNode`], usually an [`XmlNode`] handle. The `_with` variants
/// take the variable set to read bindings from at evaluation time;
/// variables are resolved by name, so rebinding a value between
/// evaluations changes the result without recompiling.
#[derive(Clone)]
pub struct XPathQuery {
    program: Arc<CompiledExpr>,
}

impl XPathQuery {
    /// Compiles an expression without variables.
    pub fn new(expr: &str) -> Result<XPathQuery, XPathError> {
        Ok(XPathQuery {
            program: cached_compile(expr)?,
        })
    }

    /// Compiles an expression that may reference `$name` variables
    /// declared in `vars`.
    pub fn with_variables(expr: &str, vars: &XPathVariableSet<'_>) -> Result<XPathQuery, XPathError> {
        Ok(XPathQuery {
            program: Arc::new(compiler::compile(expr, Some(vars))?),
        })
    }

    /// Static type of the expression result.
    pub fn return_type(&self) -> XPathValueType {
        self.program.rtype
    }

    pub fn evaluate_boolean<'a>(&self, node: impl Into<XPathNode<'a>>) -> bool {
        self.eval(node.into(), None).to_boolean()
    }

    pub fn evaluate_boolean_with<'a>(
        &self,
        node: impl Into<XPathNode<'a>>,
        vars: &XPathVariableSet<'a>,
    ) -> bool {
        self.eval(node.into(), Some(vars)).to_boolean()
    }

    pub fn evaluate_number<'a>(&self, node: impl Into<XPathNode<'a>>) -> f64 {
        self.eval(node.into(), None).to_number()
    }

    pub fn evaluate_number_with<'a>(
        &self,
        node: impl Into<XPathNode<'a>>,
        vars: &XPathVariableSet<'a>,
    ) -> f64 {
        self.eval(node.into(), Some(vars)).to_number()
    }

    pub fn evaluate_string<'a>(&self, node: impl Into<XPathNode<'a>>) -> String {
        self.eval(node.into(), None).to_string_value()
    }

    pub fn evaluate_string_with<'a>(
        &self,
        node: impl Into<XPathNode<'a>>,
        vars: &XPathVariableSet<'a>,
    ) -> String {
        self.eval(node.into(), Some(vars)).to_string_value()
    }

    /// Evaluates and returns the result as a node-set in document
    /// order. Expressions of any other type yield an empty set; check
    /// [`return_type`](Self::return_type) to tell the cases apart.
    pub fn evaluate_node_set<'a>(&self, node: impl Into<XPathNode<'a>>) -> XPathNodeSet<'a> {
        finish_node_set(self.eval(node.into(), None))
    }

    pub fn evaluate_node_set_with<'a>(
        &self,
        node: impl Into<XPathNode<'a>>,
        vars: &XPathVariableSet<'a>,
    ) -> XPathNodeSet<'a> {
        finish_node_set(self.eval(node.into(), Some(vars)))
    }

    /// First result in document order, or a null entry when the result
    /// is empty or not a node-set.
    pub fn evaluate_node<'a>(&self, node: impl Into<XPathNode<'a>>) -> XPathNode<'a> {
        let ctx = node.into();
        finish_node(self.eval(ctx, None), &ctx)
    }

    pub fn evaluate_node_with<'a>(
        &self,
        node: impl Into<XPathNode<'a>>,
        vars: &XPathVariableSet<'a>,
    ) -> XPathNode<'a> {
        let ctx = node.into();
        finish_node(self.eval(ctx, Some(vars)), &ctx)
    }

    fn eval<'a>(&self, node: XPathNode<'a>, vars: Option<&XPathVariableSet<'a>>) -> XPathValue<'a> {
        evaluate(&self.program, &EvalContext::new(node, vars))
    }
}

impl fmt::Debug for XPathQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XPathQuery")
            .field("return_type", &self.program.rtype)
            .finish()
    }
}

fn finish_node_set(value: XPathValue<'_>) -> XPathNodeSet<'_> {
    match value {
        XPathValue::NodeSet(mut set) => {
            set.sort_dedup();
            set
        }
        _ => XPathNodeSet::default(),
    }
}

fn finish_node<'a>(value: XPathValue<'a>, ctx: &XPathNode<'a>) -> XPathNode<'a> {
    let found = match value {
        XPathValue::NodeSet(set) => set.first(),
        _ => None,
    };
    found.unwrap_or_else(|| XPathNode::from_node(XmlNode::new(ctx.document(), None)))
}

fn cached_compile(expr: &str) -> Result<Arc<CompiledExpr>, XPathError> {
    static CACHE: OnceLock<Mutex<LruCache<Box<str>, Arc<CompiledExpr>>>> = OnceLock::new();

    let cache = CACHE.get_or_init(|| {
        let cap = NonZeroUsize::new(QUERY_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Mutex::new(LruCache::new(cap))
    });
    let mut cache = match cache.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };

    if let Some(program) = cache.get(expr) {
        return Ok(Arc::clone(program));
    }
    let program = Arc::new(compiler::compile(expr, None)?);
    cache.put(Box::from(expr), Arc::clone(&program));
    Ok(program)
}

// One-shot entry points behind XmlNode::select_nodes and friends.

pub(crate) fn select_nodes<'a>(
    node: XmlNode<'a>,
    expr: &str,
) -> Result<XPathNodeSet<'a>, XPathError> {
    Ok(XPathQuery::new(expr)?.evaluate_node_set(node))
}

pub(crate) fn select_nodes_with<'a>(
    node: XmlNode<'a>,
    expr: &str,
    vars: &XPathVariableSet<'a>,
) -> Result<XPathNodeSet<'a>, XPathError> {
    Ok(XPathQuery::with_variables(expr, vars)?.evaluate_node_set_with(node, vars))
}

pub(crate) fn select_node<'a>(
    node: XmlNode<'a>,
    expr: &str,
) -> Result<Option<XPathNode<'a>>, XPathError> {
    let item = XPathQuery::new(expr)?.evaluate_node(node);
    Ok((!item.is_null()).then_some(item))
}

pub(crate) fn select_node_with<'a>(
    node: XmlNode<'a>,
    expr: &str,
    vars: &XPathVariableSet<'a>,
) -> Result<Option<XPathNode<'a>>, XPathError> {
    let item = XPathQuery::with_variables(expr, vars)?.evaluate_node_with(node, vars);
    Ok((!item.is_null()).then_some(item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::XmlDocument;
    use crate::xpath::value::NodeSetType;

    fn load(text: &str) -> XmlDocument {
        let mut doc = XmlDocument::new();
        let result = doc.load_string(text);
        assert!(result.ok(), "parse failed: {}", result.description());
        doc
    }

    #[test]
    fn test_compile_errors() {
        let err = XPathQuery::new("\"").unwrap_err();
        assert_eq!(err.message(), "Unterminated string literal");
        assert_eq!(err.offset(), 0);

        let err = XPathQuery::new("123a").unwrap_err();
        assert_eq!(err.offset(), 3);
        assert!(err.to_string().contains("at offset 3"));
    }

    #[test]
    fn test_literal_on_null_context() {
        let doc = XmlDocument::new();
        let null = XmlNode::new(&doc, None);

        let query = XPathQuery::new("'a\"b'").unwrap();
        assert_eq!(query.evaluate_string(null), "a\"b");
        assert_eq!(query.return_type(), XPathValueType::String);
    }

    #[test]
    fn test_evaluate_family_on_attribute_path() {
        let doc = load("<node attr='3'/>");
        let query = XPathQuery::new("node/@attr").unwrap();

        assert_eq!(query.return_type(), XPathValueType::NodeSet);
        assert!(query.evaluate_boolean(doc.root()));
        assert_eq!(query.evaluate_number(doc.root()), 3.0);
        assert_eq!(query.evaluate_string(doc.root()), "3");

        let set = query.evaluate_node_set(doc.root());
        assert_eq!(set.len(), 1);
        assert_eq!(set.kind(), NodeSetType::Sorted);
        let item = set[0];
        assert!(item.is_attribute());
        assert_eq!(item.attribute().name(), "attr");
        assert!(item.node().is_null());
        assert_eq!(item.parent(), doc.child("node"));
    }

    #[test]
    fn test_context_dot_on_attribute() {
        let doc = load("<node attr='v'/>");
        let elem = doc.child("node");
        let attr = XPathNode::from_attribute(elem.attribute("attr"), elem);

        let query = XPathQuery::new(".").unwrap();
        let set = query.evaluate_node_set(attr);
        assert_eq!(set.len(), 1);
        assert!(set[0].is_attribute());
        assert_eq!(query.evaluate_string(attr), "v");
    }

    #[test]
    fn test_variables_rebind_between_evaluations() {
        let doc = load("<r><a id='1'/><a id='2'/></r>");
        let mut vars = XPathVariableSet::new();
        vars.set_number("v", 2.0);

        let query = XPathQuery::with_variables("//*[@id = $v]", &vars).unwrap();

        let set = query.evaluate_node_set_with(doc.root(), &vars);
        assert_eq!(set.len(), 1);
        assert_eq!(set[0].node().attribute("id").value(), "2");

        vars.set_number("v", 5.0);
        let set = query.evaluate_node_set_with(doc.root(), &vars);
        assert!(set.is_empty());
    }

    #[test]
    fn test_select_helpers() {
        let doc = load("<r><a/><b/><c/></r>");

        let set = select_nodes(doc.root(), "r/*").unwrap();
        assert_eq!(set.len(), 3);

        let b = doc.child("r").child("b");
        let next = select_node(b, "following-sibling::*").unwrap().unwrap();
        assert_eq!(next.node().name(), "c");
        let prev = select_node(b, "preceding-sibling::*").unwrap().unwrap();
        assert_eq!(prev.node().name(), "a");

        assert!(select_node(doc.root(), "r/missing").unwrap().is_none());
        assert!(select_node(doc.root(), "///").is_err());
    }

    #[test]
    fn test_select_with_variables() {
        let doc = load("<r><x name='p'/><x name='q'/></r>");
        let mut vars = XPathVariableSet::new();
        vars.set_string("n", "q");

        let found = select_node_with(doc.root(), "//x[@name = $n]", &vars)
            .unwrap()
            .unwrap();
        assert_eq!(found.node().attribute("name").value(), "q");

        let none = select_nodes(doc.root(), "//x[@name = $n]");
        assert!(none.is_err(), "variables need with_variables compilation");
    }

    #[test]
    fn test_union_result_is_sorted_and_deduped() {
        let doc = load("<node a='1' b='2'/>");
        let elem = doc.child("node");

        let query = XPathQuery::new("@* | @*").unwrap();
        let mut set = query.evaluate_node_set(elem);
        assert_eq!(set.len(), 2);
        assert_eq!(set.kind(), NodeSetType::Sorted);
        assert_eq!(set[0].attribute().name(), "a");

        set.sort(true);
        assert_eq!(set.kind(), NodeSetType::SortedReverse);
        assert_eq!(set[0].attribute().name(), "b");
    }

    #[test]
    fn test_evaluate_node_takes_document_order_first() {
        let doc = load("<r><a/><b/></r>");

        // Union order is b, a; the first in document order is a.
        let query = XPathQuery::new("r/b | r/a").unwrap();
        let first = query.evaluate_node(doc.root());
        assert_eq!(first.node().name(), "a");

        let missing = XPathQuery::new("r/missing").unwrap();
        assert!(missing.evaluate_node(doc.root()).is_null());

        // Non-node-set results have no node to return.
        let number = XPathQuery::new("1 + 1").unwrap();
        assert!(number.evaluate_node(doc.root()).is_null());
        assert!(number.evaluate_node_set(doc.root()).is_empty());
    }

    #[test]
    fn test_compiled_programs_are_cached() {
        let q1 = XPathQuery::new("cache/probe/path").unwrap();
        let q2 = XPathQuery::new("cache/probe/path").unwrap();
        assert!(Arc::ptr_eq(&q1.program, &q2.program));

        let doc = load("<cache><probe><path/></probe></cache>");
        assert_eq!(q2.evaluate_node_set(doc.root()).len(), 1);
    }
}
