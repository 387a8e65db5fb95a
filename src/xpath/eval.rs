//! XPath evaluation engine.
//!
//! Runs a compiled program against a context node as a small stack
//! machine. Evaluation never fails: expressions that compile are
//! evaluated with XPath 1.0 coercions, and conditions with no defined
//! result (a missing variable, a step over a non-node input) yield an
//! empty node-set.
//!
//! Step results are left unsorted; callers that hand node-sets to user
//! code sort them first. Predicates inside a step are applied per
//! context node, over that node's axis result in axis order, so
//! `position()` counts from the context node even on reverse axes.

use std::collections::HashSet;

use crate::xpath::axes::{matches_node_test, navigate};
use crate::xpath::compiler::{CompiledExpr, Op, Pred};
use crate::xpath::functions;
use crate::xpath::parser::{Axis, BinaryOp, NodeTest};
use crate::xpath::value::{
    string_to_number, string_value, NodeSetType, XPathNode, XPathNodeSet, XPathValue,
    XPathVariableSet,
};

/// Everything an expression can observe at evaluation time.
pub struct EvalContext<'a, 'v> {
    pub node: XPathNode<'a>,
    pub position: usize,
    pub size: usize,
    pub vars: Option<&'v XPathVariableSet<'a>>,
}

impl<'a, 'v> EvalContext<'a, 'v> {
    pub fn new(node: XPathNode<'a>, vars: Option<&'v XPathVariableSet<'a>>) -> Self {
        EvalContext {
            node,
            position: 1,
            size: 1,
            vars,
        }
    }
}

pub fn evaluate<'a>(program: &CompiledExpr, ctx: &EvalContext<'a, '_>) -> XPathValue<'a> {
    let mut stack: Vec<XPathValue<'a>> = Vec::new();

    for op in &program.ops {
        match op {
            Op::Root => {
                if ctx.node.is_null() {
                    stack.push(XPathValue::empty_node_set());
                } else {
                    stack.push(single(XPathNode::from_node(ctx.node.anchor().root())));
                }
            }

            Op::Context => {
                if ctx.node.is_null() {
                    stack.push(XPathValue::empty_node_set());
                } else {
                    stack.push(single(ctx.node));
                }
            }

            Op::Step(axis, test, preds) => {
                let input = stack.pop().unwrap_or_else(XPathValue::empty_node_set);
                let result = eval_step(&input, *axis, test, preds, ctx);
                stack.push(XPathValue::NodeSet(result));
            }

            Op::Filter(pred) => {
                let input = stack.pop().unwrap_or_else(XPathValue::empty_node_set);
                let result = match input {
                    XPathValue::NodeSet(mut set) => {
                        // Filter predicates see the set in document order.
                        set.sort(false);
                        let kept = filter_list(set.into_vec(), pred, ctx);
                        XPathNodeSet::from_parts(kept, NodeSetType::Sorted)
                    }
                    _ => XPathNodeSet::default(),
                };
                stack.push(XPathValue::NodeSet(result));
            }

            Op::Union => {
                let right = stack.pop().unwrap_or_else(XPathValue::empty_node_set);
                let left = stack.pop().unwrap_or_else(XPathValue::empty_node_set);
                let merged = match (left, right) {
                    (XPathValue::NodeSet(l), XPathValue::NodeSet(r)) => {
                        let mut seen: HashSet<XPathNode<'a>> =
                            HashSet::with_capacity(l.len() + r.len());
                        let mut nodes = Vec::with_capacity(l.len() + r.len());
                        for item in l.into_vec().into_iter().chain(r.into_vec()) {
                            if seen.insert(item) {
                                nodes.push(item);
                            }
                        }
                        XPathNodeSet::from_parts(nodes, NodeSetType::Unsorted)
                    }
                    _ => XPathNodeSet::default(),
                };
                stack.push(XPathValue::NodeSet(merged));
            }

            Op::Number(n) => stack.push(XPathValue::Number(*n)),

            Op::String(s) => stack.push(XPathValue::String(s.clone())),

            Op::Variable(name) => {
                let value = ctx
                    .vars
                    .and_then(|vars| vars.get(name))
                    .map(|var| var.value().clone())
                    .unwrap_or_else(XPathValue::empty_node_set);
                stack.push(value);
            }

            Op::Negate => {
                let value = stack.pop().unwrap_or_else(XPathValue::empty_node_set);
                stack.push(XPathValue::Number(-value.to_number()));
            }

            Op::Binary(op) => {
                let right = stack.pop().unwrap_or_else(XPathValue::empty_node_set);
                let left = stack.pop().unwrap_or_else(XPathValue::empty_node_set);
                stack.push(apply_binary(*op, left, right));
            }

            Op::Call(f, argc) => {
                let mut args = Vec::with_capacity(*argc);
                for _ in 0..*argc {
                    args.push(stack.pop().unwrap_or_else(XPathValue::empty_node_set));
                }
                args.reverse();
                stack.push(functions::call(*f, args, &ctx.node, ctx.position, ctx.size));
            }
        }
    }

    stack.pop().unwrap_or_else(XPathValue::empty_node_set)
}

fn single(item: XPathNode<'_>) -> XPathValue<'_> {
    XPathValue::NodeSet(XPathNodeSet::from_parts(vec![item], NodeSetType::Sorted))
}

fn eval_step<'a>(
    input: &XPathValue<'a>,
    axis: Axis,
    test: &NodeTest,
    preds: &[Pred],
    ctx: &EvalContext<'a, '_>,
) -> XPathNodeSet<'a> {
    let XPathValue::NodeSet(set) = input else {
        return XPathNodeSet::default();
    };

    let mut seen: HashSet<XPathNode<'a>> = HashSet::new();
    let mut out: Vec<XPathNode<'a>> = Vec::new();
    for item in set.iter() {
        let mut list = navigate(item, axis);
        list.retain(|candidate| matches_node_test(candidate, axis, test));
        for pred in preds {
            list = filter_list(list, pred, ctx);
        }
        for candidate in list {
            if seen.insert(candidate) {
                out.push(candidate);
            }
        }
    }
    XPathNodeSet::from_parts(out, NodeSetType::Unsorted)
}

/// Apply one predicate to a candidate list; positions count within the
/// list. A number-valued predicate selects by position, anything else
/// by its boolean value.
fn filter_list<'a>(
    list: Vec<XPathNode<'a>>,
    pred: &Pred,
    ctx: &EvalContext<'a, '_>,
) -> Vec<XPathNode<'a>> {
    match pred {
        Pred::Position(n) => {
            let index = *n - 1;
            if index < list.len() {
                vec![list[index]]
            } else {
                Vec::new()
            }
        }
        Pred::Expr(expr) => {
            let size = list.len();
            let mut kept = Vec::new();
            for (i, item) in list.into_iter().enumerate() {
                let inner = EvalContext {
                    node: item,
                    position: i + 1,
                    size,
                    vars: ctx.vars,
                };
                let value = evaluate(expr, &inner);
                let keep = match &value {
                    XPathValue::Number(n) => (i + 1) as f64 == *n,
                    other => other.to_boolean(),
                };
                if keep {
                    kept.push(item);
                }
            }
            kept
        }
    }
}

fn apply_binary<'a>(op: BinaryOp, left: XPathValue<'a>, right: XPathValue<'a>) -> XPathValue<'a> {
    match op {
        BinaryOp::Or => XPathValue::Boolean(left.to_boolean() || right.to_boolean()),
        BinaryOp::And => XPathValue::Boolean(left.to_boolean() && right.to_boolean()),
        BinaryOp::Eq => XPathValue::Boolean(compare_equal(&left, &right, false)),
        BinaryOp::NotEq => XPathValue::Boolean(compare_equal(&left, &right, true)),
        BinaryOp::Lt => XPathValue::Boolean(compare_order(&left, &right, |a, b| a < b)),
        BinaryOp::LtEq => XPathValue::Boolean(compare_order(&left, &right, |a, b| a <= b)),
        BinaryOp::Gt => XPathValue::Boolean(compare_order(&left, &right, |a, b| a > b)),
        BinaryOp::GtEq => XPathValue::Boolean(compare_order(&left, &right, |a, b| a >= b)),
        BinaryOp::Add => XPathValue::Number(left.to_number() + right.to_number()),
        BinaryOp::Sub => XPathValue::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => XPathValue::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => XPathValue::Number(left.to_number() / right.to_number()),
        BinaryOp::Mod => XPathValue::Number(left.to_number() % right.to_number()),
    }
}

/// Equality per XPath 1.0. Node-sets compare existentially; mixed
/// scalar pairs coerce to boolean, then number, then string. `negate`
/// selects `!=`, which on node-sets is its own existential test rather
/// than the negation of `=`.
fn compare_equal(left: &XPathValue<'_>, right: &XPathValue<'_>, negate: bool) -> bool {
    match (left, right) {
        (XPathValue::NodeSet(l), XPathValue::NodeSet(r)) => {
            for a in l.iter() {
                let av = string_value(a);
                for b in r.iter() {
                    if (av == string_value(b)) != negate {
                        return true;
                    }
                }
            }
            false
        }
        (XPathValue::NodeSet(set), other) | (other, XPathValue::NodeSet(set)) => {
            equal_set_scalar(set, other, negate)
        }
        _ => {
            if matches!(left, XPathValue::Boolean(_)) || matches!(right, XPathValue::Boolean(_)) {
                (left.to_boolean() == right.to_boolean()) != negate
            } else if matches!(left, XPathValue::Number(_))
                || matches!(right, XPathValue::Number(_))
            {
                (left.to_number() == right.to_number()) != negate
            } else {
                (left.to_string_value() == right.to_string_value()) != negate
            }
        }
    }
}

fn equal_set_scalar(set: &XPathNodeSet<'_>, scalar: &XPathValue<'_>, negate: bool) -> bool {
    match scalar {
        XPathValue::Boolean(b) => (!set.is_empty() == *b) != negate,
        XPathValue::Number(n) => set
            .iter()
            .any(|item| (string_to_number(&string_value(item)) == *n) != negate),
        _ => {
            let s = scalar.to_string_value();
            set.iter().any(|item| (string_value(item) == s) != negate)
        }
    }
}

/// Relational comparison: always numeric, existential over node-set
/// operands, preserving which side each operand is on.
fn compare_order<F>(left: &XPathValue<'_>, right: &XPathValue<'_>, cmp: F) -> bool
where
    F: Fn(f64, f64) -> bool,
{
    match (left, right) {
        (XPathValue::NodeSet(l), XPathValue::NodeSet(r)) => {
            for a in l.iter() {
                let av = string_to_number(&string_value(a));
                for b in r.iter() {
                    if cmp(av, string_to_number(&string_value(b))) {
                        return true;
                    }
                }
            }
            false
        }
        (XPathValue::NodeSet(set), other) => {
            let rv = other.to_number();
            set.iter()
                .any(|item| cmp(string_to_number(&string_value(item)), rv))
        }
        (other, XPathValue::NodeSet(set)) => {
            let lv = other.to_number();
            set.iter()
                .any(|item| cmp(lv, string_to_number(&string_value(item))))
        }
        _ => cmp(left.to_number(), right.to_number()),
    }
}
