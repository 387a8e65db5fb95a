//! XPath expression compiler.
//!
//! Lowers the parsed AST into a flat stack program for the evaluator and
//! infers the static result type of every subexpression on the way down.
//! XPath 1.0 is statically typed, so all type errors surface here: steps,
//! predicates and unions demand node-set operands, functions demand their
//! declared arities, and variable references are checked against the
//! variable set the query was compiled with. Evaluation itself can then
//! never fail.

use crate::xpath::functions::Function;
use crate::xpath::parser::{self, Axis, BinaryOp, Expr, NodeTest, Step};
use crate::xpath::query::XPathError;
use crate::xpath::value::{XPathValueType, XPathVariableSet};

/// A compiled expression: the operation list plus its static result type.
/// Holds no document references, so compiled programs can be cached and
/// shared across documents.
#[derive(Debug, Clone)]
pub struct CompiledExpr {
    pub ops: Vec<Op>,
    pub rtype: XPathValueType,
}

/// One stack operation.
#[derive(Debug, Clone)]
pub enum Op {
    /// Push the context node's document root as a node-set
    Root,
    /// Push the context node as a node-set
    Context,
    /// Pop a node-set, walk the axis from each node, filter by node test,
    /// then apply the step's predicates per origin node
    Step(Axis, NodeTest, Vec<Pred>),
    /// Pop a node-set and apply a predicate across the whole set
    Filter(Pred),
    /// Pop two node-sets and push their union
    Union,
    /// Push a literal number
    Number(f64),
    /// Push a literal string
    String(String),
    /// Push the current value of a variable
    Variable(String),
    /// Pop a value and push its numeric negation
    Negate,
    /// Pop two values and apply a binary operator
    Binary(BinaryOp),
    /// Pop the given number of arguments and call a core function
    Call(Function, usize),
}

/// A compiled predicate. Literal integer positions like `[2]` keep a fast
/// path that skips subexpression evaluation.
#[derive(Debug, Clone)]
pub enum Pred {
    Position(usize),
    Expr(CompiledExpr),
}

struct Compiler<'v> {
    vars: Option<&'v XPathVariableSet<'v>>,
}

impl<'v> Compiler<'v> {
    /// Emit ops for `expr` and return its static type.
    fn compile_expr(&self, expr: &Expr, ops: &mut Vec<Op>) -> Result<XPathValueType, XPathError> {
        match expr {
            Expr::Root => {
                ops.push(Op::Root);
                Ok(XPathValueType::NodeSet)
            }
            Expr::Context => {
                ops.push(Op::Context);
                Ok(XPathValueType::NodeSet)
            }
            Expr::Parent => {
                ops.push(Op::Context);
                ops.push(Op::Step(Axis::Parent, NodeTest::Node, Vec::new()));
                Ok(XPathValueType::NodeSet)
            }
            Expr::Number(n) => {
                ops.push(Op::Number(*n));
                Ok(XPathValueType::Number)
            }
            Expr::String(s) => {
                ops.push(Op::String(s.clone()));
                Ok(XPathValueType::String)
            }
            Expr::Variable(name, offset) => {
                let vars = match self.vars {
                    Some(vars) => vars,
                    None => {
                        return Err(XPathError::new(
                            "Unknown variable: variable set is not provided",
                            *offset,
                        ))
                    }
                };
                let var = match vars.get(name) {
                    Some(var) => var,
                    None => {
                        return Err(XPathError::new(
                            "Unknown variable: variable set does not contain the given name",
                            *offset,
                        ))
                    }
                };
                ops.push(Op::Variable(name.clone()));
                Ok(var.value_type())
            }
            Expr::Negate(inner) => {
                self.compile_expr(inner, ops)?;
                ops.push(Op::Negate);
                Ok(XPathValueType::Number)
            }
            Expr::Binary(left, op, right) => {
                self.compile_expr(left, ops)?;
                self.compile_expr(right, ops)?;
                ops.push(Op::Binary(*op));
                Ok(match op {
                    BinaryOp::Add
                    | BinaryOp::Sub
                    | BinaryOp::Mul
                    | BinaryOp::Div
                    | BinaryOp::Mod => XPathValueType::Number,
                    _ => XPathValueType::Boolean,
                })
            }
            Expr::Union(left, right, offset) => {
                let lt = self.compile_expr(left, ops)?;
                let rt = self.compile_expr(right, ops)?;
                if lt != XPathValueType::NodeSet || rt != XPathValueType::NodeSet {
                    return Err(XPathError::new(
                        "Union operator has to be applied to node sets",
                        *offset,
                    ));
                }
                ops.push(Op::Union);
                Ok(XPathValueType::NodeSet)
            }
            Expr::Path(base, step) => {
                let base_t = self.compile_expr(base, ops)?;
                if base_t != XPathValueType::NodeSet {
                    return Err(XPathError::new(
                        "Step has to be applied to node set",
                        step.offset,
                    ));
                }
                self.compile_step(step, ops)?;
                Ok(XPathValueType::NodeSet)
            }
            Expr::Filter(base, pred, offset) => {
                let base_t = self.compile_expr(base, ops)?;
                if base_t != XPathValueType::NodeSet {
                    return Err(XPathError::new(
                        "Predicate has to be applied to node set",
                        *offset,
                    ));
                }
                let pred = self.compile_pred(pred)?;
                ops.push(Op::Filter(pred));
                Ok(XPathValueType::NodeSet)
            }
            Expr::Step(step) => {
                ops.push(Op::Context);
                self.compile_step(step, ops)?;
                Ok(XPathValueType::NodeSet)
            }
            Expr::Function(name, args, offset) => {
                let f = match Function::resolve(name, args.len()) {
                    Some(f) => f,
                    None => {
                        return Err(XPathError::new("Unrecognized function call", *offset))
                    }
                };
                let mut arg_types = Vec::with_capacity(args.len());
                for arg in args {
                    arg_types.push(self.compile_expr(arg, ops)?);
                }
                if f.requires_node_set_arg(args.len())
                    && arg_types.first() != Some(&XPathValueType::NodeSet)
                {
                    return Err(XPathError::new(
                        "Function has to be applied to node set",
                        *offset,
                    ));
                }
                ops.push(Op::Call(f, args.len()));
                Ok(f.return_type())
            }
        }
    }

    fn compile_step(&self, step: &Step, ops: &mut Vec<Op>) -> Result<(), XPathError> {
        let mut preds = Vec::with_capacity(step.predicates.len());
        for pred in &step.predicates {
            preds.push(self.compile_pred(pred)?);
        }
        ops.push(Op::Step(step.axis, step.node_test.clone(), preds));
        Ok(())
    }

    fn compile_pred(&self, expr: &Expr) -> Result<Pred, XPathError> {
        if let Expr::Number(n) = expr {
            if *n >= 1.0 && n.fract() == 0.0 {
                return Ok(Pred::Position(*n as usize));
            }
        }
        let mut ops = Vec::new();
        let rtype = self.compile_expr(expr, &mut ops)?;
        Ok(Pred::Expr(CompiledExpr { ops, rtype }))
    }
}

/// Compile an expression against an optional variable set. Variable
/// references resolve their static type here; values are read again at
/// evaluation time.
pub fn compile(
    text: &str,
    vars: Option<&XPathVariableSet<'_>>,
) -> Result<CompiledExpr, XPathError> {
    let expr = parser::parse(text)?;
    let compiler = Compiler { vars };
    let mut ops = Vec::new();
    let rtype = compiler.compile_expr(&expr, &mut ops)?;
    Ok(CompiledExpr { ops, rtype })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_simple() {
        let compiled = compile("/root", None).unwrap();
        assert!(matches!(compiled.ops[0], Op::Root));
        assert!(matches!(
            &compiled.ops[1],
            Op::Step(Axis::Child, NodeTest::Name(name), _) if name == "root"
        ));
        assert_eq!(compiled.rtype, XPathValueType::NodeSet);
    }

    #[test]
    fn test_return_types() {
        let rtype = |text: &str| compile(text, None).unwrap().rtype;
        assert_eq!(rtype("1 + 1"), XPathValueType::Number);
        assert_eq!(rtype("'s'"), XPathValueType::String);
        assert_eq!(rtype("a | b"), XPathValueType::NodeSet);
        assert_eq!(rtype("1 = 2"), XPathValueType::Boolean);
        assert_eq!(rtype("node/foo"), XPathValueType::NodeSet);
        assert_eq!(rtype("count(//a)"), XPathValueType::Number);
        assert_eq!(rtype("-x"), XPathValueType::Number);
        assert_eq!(rtype("concat('a', 'b')"), XPathValueType::String);
    }

    #[test]
    fn test_position_predicate_fold() {
        let compiled = compile("a[2]", None).unwrap();
        match &compiled.ops[1] {
            Op::Step(_, _, preds) => {
                assert!(matches!(preds[0], Pred::Position(2)));
            }
            other => panic!("expected step, got {:?}", other),
        }

        let compiled = compile("a[last()]", None).unwrap();
        match &compiled.ops[1] {
            Op::Step(_, _, preds) => {
                assert!(matches!(preds[0], Pred::Expr(_)));
            }
            other => panic!("expected step, got {:?}", other),
        }
    }

    #[test]
    fn test_step_requires_node_set() {
        let err = compile("(1)/a", None).unwrap_err();
        assert_eq!(err.message(), "Step has to be applied to node set");
        assert_eq!(err.offset(), 4);
    }

    #[test]
    fn test_predicate_requires_node_set() {
        let err = compile("(1)[2]", None).unwrap_err();
        assert_eq!(err.message(), "Predicate has to be applied to node set");
        assert_eq!(err.offset(), 3);
    }

    #[test]
    fn test_union_requires_node_sets() {
        let err = compile("1 | a", None).unwrap_err();
        assert_eq!(err.message(), "Union operator has to be applied to node sets");
        assert_eq!(err.offset(), 2);

        let err = compile("a | 'x'", None).unwrap_err();
        assert_eq!(err.message(), "Union operator has to be applied to node sets");
    }

    #[test]
    fn test_function_errors() {
        let err = compile("frobnicate()", None).unwrap_err();
        assert_eq!(err.message(), "Unrecognized function call");
        assert_eq!(err.offset(), 0);

        let err = compile("count(a, b)", None).unwrap_err();
        assert_eq!(err.message(), "Unrecognized function call");

        let err = compile("count('x')", None).unwrap_err();
        assert_eq!(err.message(), "Function has to be applied to node set");

        let err = compile("sum(1)", None).unwrap_err();
        assert_eq!(err.message(), "Function has to be applied to node set");

        assert!(compile("name(a)", None).is_ok());
        let err = compile("name('x')", None).unwrap_err();
        assert_eq!(err.message(), "Function has to be applied to node set");
    }

    #[test]
    fn test_variable_checks() {
        let err = compile("$v", None).unwrap_err();
        assert_eq!(err.message(), "Unknown variable: variable set is not provided");
        assert_eq!(err.offset(), 0);

        let vars = XPathVariableSet::new();
        let err = compile("$v", Some(&vars)).unwrap_err();
        assert_eq!(
            err.message(),
            "Unknown variable: variable set does not contain the given name"
        );

        let mut vars = XPathVariableSet::new();
        assert!(vars.set_number("v", 2.0));
        let compiled = compile("$v", Some(&vars)).unwrap();
        assert_eq!(compiled.rtype, XPathValueType::Number);
        assert!(matches!(&compiled.ops[0], Op::Variable(name) if name == "v"));

        let compiled = compile("$v + 1", Some(&vars)).unwrap();
        assert_eq!(compiled.rtype, XPathValueType::Number);
    }
}
