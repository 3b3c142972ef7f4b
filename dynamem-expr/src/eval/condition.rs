//! Condition evaluator
//!
//! Recursive walk over a condition AST producing a boolean. Comparisons
//! against the undefined sentinel are false; ordering comparisons across
//! types are errors while equality across types is simply false.

use super::env::Environment;
use super::{funcs, EvalError};
use crate::parser::{CmpOp, Expr};
use dynamem_core::AttrValue;
use std::cmp::Ordering;

/// Evaluation depth bound; adversarially deep ASTs error out rather than
/// overflow the stack.
const MAX_DEPTH: usize = 100;

/// Intermediate result of evaluating a condition sub-expression.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Evaluated {
    /// An attribute value (from a path, placeholder, or `size`)
    Value(AttrValue),
    /// The lookup-failure sentinel; never a stored value
    Undefined,
    /// A boolean produced by a comparison, connective, or predicate
    Truth(bool),
}

/// Evaluate a condition/filter/key-condition expression to a boolean.
pub fn eval_condition(expr: &Expr, env: &Environment) -> Result<bool, EvalError> {
    match eval_expr(expr, env, 0)? {
        Evaluated::Truth(b) => Ok(b),
        _ => Err(EvalError::new(format!(
            "Condition must evaluate to a boolean: {expr}"
        ))),
    }
}

pub(crate) fn eval_expr(
    expr: &Expr,
    env: &Environment,
    depth: usize,
) -> Result<Evaluated, EvalError> {
    if depth > MAX_DEPTH {
        return Err(EvalError::new("Expression nesting too deep"));
    }

    match expr {
        Expr::Path(path) => Ok(match env.resolve_path(path)? {
            Some(value) => Evaluated::Value(value.clone()),
            None => Evaluated::Undefined,
        }),
        Expr::Placeholder(name) => Ok(Evaluated::Value(env.resolve_value(name)?.clone())),
        Expr::Compare { op, lhs, rhs } => {
            let lhs = eval_expr(lhs, env, depth + 1)?;
            let rhs = eval_expr(rhs, env, depth + 1)?;
            eval_compare(*op, lhs, rhs, expr)
        }
        Expr::Between {
            operand,
            lower,
            upper,
        } => {
            let operand = eval_expr(operand, env, depth + 1)?;
            let lower = eval_expr(lower, env, depth + 1)?;
            let upper = eval_expr(upper, env, depth + 1)?;
            eval_between(operand, lower, upper, expr)
        }
        Expr::In {
            operand,
            candidates,
        } => {
            let operand = match eval_expr(operand, env, depth + 1)? {
                Evaluated::Value(v) => v,
                Evaluated::Undefined => return Ok(Evaluated::Truth(false)),
                Evaluated::Truth(_) => {
                    return Err(EvalError::new(format!("IN requires a value operand: {expr}")))
                }
            };
            for candidate in candidates {
                match eval_expr(candidate, env, depth + 1)? {
                    Evaluated::Value(v) if v == operand => return Ok(Evaluated::Truth(true)),
                    Evaluated::Value(_) | Evaluated::Undefined => {}
                    Evaluated::Truth(_) => {
                        return Err(EvalError::new(format!(
                            "IN candidates must be values: {expr}"
                        )))
                    }
                }
            }
            Ok(Evaluated::Truth(false))
        }
        Expr::And(lhs, rhs) => {
            // Short-circuits.
            if !expect_truth(eval_expr(lhs, env, depth + 1)?, lhs)? {
                return Ok(Evaluated::Truth(false));
            }
            let rhs = expect_truth(eval_expr(rhs, env, depth + 1)?, rhs)?;
            Ok(Evaluated::Truth(rhs))
        }
        Expr::Or(lhs, rhs) => {
            if expect_truth(eval_expr(lhs, env, depth + 1)?, lhs)? {
                return Ok(Evaluated::Truth(true));
            }
            let rhs = expect_truth(eval_expr(rhs, env, depth + 1)?, rhs)?;
            Ok(Evaluated::Truth(rhs))
        }
        Expr::Not(operand) => {
            let value = expect_truth(eval_expr(operand, env, depth + 1)?, operand)?;
            Ok(Evaluated::Truth(!value))
        }
        Expr::Call { name, args } => funcs::eval_condition_call(name, args, env, depth),
        Expr::Arith { .. } => Err(EvalError::new(format!(
            "Arithmetic is not allowed in condition expressions: {expr}"
        ))),
    }
}

fn expect_truth(value: Evaluated, expr: &Expr) -> Result<bool, EvalError> {
    match value {
        Evaluated::Truth(b) => Ok(b),
        _ => Err(EvalError::new(format!(
            "Expected a boolean condition: {expr}"
        ))),
    }
}

fn eval_compare(
    op: CmpOp,
    lhs: Evaluated,
    rhs: Evaluated,
    expr: &Expr,
) -> Result<Evaluated, EvalError> {
    let (lhs, rhs) = match (lhs, rhs) {
        (Evaluated::Value(l), Evaluated::Value(r)) => (l, r),
        (Evaluated::Truth(_), _) | (_, Evaluated::Truth(_)) => {
            return Err(EvalError::new(format!(
                "Booleans cannot be compared with {}: {expr}",
                op.symbol()
            )))
        }
        // Comparisons involving the undefined sentinel are false.
        _ => return Ok(Evaluated::Truth(false)),
    };

    match op {
        CmpOp::Eq => Ok(Evaluated::Truth(lhs == rhs)),
        CmpOp::Ne => Ok(Evaluated::Truth(lhs != rhs)),
        CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => {
            let ordering = lhs.cmp_scalar(&rhs).ok_or_else(|| {
                EvalError::new(format!(
                    "Cannot order {} against {}: {expr}",
                    lhs.type_tag(),
                    rhs.type_tag()
                ))
            })?;
            let result = match op {
                CmpOp::Lt => ordering == Ordering::Less,
                CmpOp::Le => ordering != Ordering::Greater,
                CmpOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(Evaluated::Truth(result))
        }
    }
}

fn eval_between(
    operand: Evaluated,
    lower: Evaluated,
    upper: Evaluated,
    expr: &Expr,
) -> Result<Evaluated, EvalError> {
    let (operand, lower, upper) = match (operand, lower, upper) {
        (Evaluated::Value(x), Evaluated::Value(lo), Evaluated::Value(hi)) => (x, lo, hi),
        (Evaluated::Truth(_), _, _) | (_, Evaluated::Truth(_), _) | (_, _, Evaluated::Truth(_)) => {
            return Err(EvalError::new(format!(
                "BETWEEN requires value operands: {expr}"
            )))
        }
        _ => return Ok(Evaluated::Truth(false)),
    };

    let low = operand.cmp_scalar(&lower);
    let high = operand.cmp_scalar(&upper);
    match (low, high) {
        (Some(low), Some(high)) => Ok(Evaluated::Truth(
            low != Ordering::Less && high != Ordering::Greater,
        )),
        _ => Err(EvalError::new(format!(
            "BETWEEN operands must share a comparable type: {expr}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_condition;
    use dynamem_core::Item;
    use std::collections::HashMap;

    fn check(source: &str, item: &Item, values: &[(&str, AttrValue)]) -> Result<bool, EvalError> {
        let names: HashMap<String, String> = HashMap::new();
        let values: HashMap<String, AttrValue> = values
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        let env = Environment::new(item, &names, &values);
        let expr = parse_condition(source).expect("condition parses");
        eval_condition(&expr, &env)
    }

    fn sample_item() -> Item {
        let mut item = Item::new();
        item.insert("id".to_string(), AttrValue::str("001"));
        item.insert("name".to_string(), AttrValue::str("Bulbasaur"));
        item.insert("lvl".to_string(), AttrValue::num("5"));
        item
    }

    #[test]
    fn test_equality() {
        let item = sample_item();
        assert!(check("id = :v", &item, &[(":v", AttrValue::str("001"))]).expect("evals"));
        assert!(!check("id = :v", &item, &[(":v", AttrValue::str("002"))]).expect("evals"));
        assert!(check("id <> :v", &item, &[(":v", AttrValue::str("002"))]).expect("evals"));
    }

    #[test]
    fn test_cross_type_equality_is_false_not_an_error() {
        let item = sample_item();
        assert!(!check("id = :v", &item, &[(":v", AttrValue::num("1"))]).expect("evals"));
        // <> across types is likewise false, not true.
        assert!(!check("id <> :v", &item, &[(":v", AttrValue::num("1"))]).expect("evals"));
    }

    #[test]
    fn test_ordering_comparisons() {
        let item = sample_item();
        assert!(check("lvl > :v", &item, &[(":v", AttrValue::num("4"))]).expect("evals"));
        assert!(check("lvl <= :v", &item, &[(":v", AttrValue::num("5"))]).expect("evals"));
        // Numeric, not lexicographic: 5 < 10.
        assert!(check("lvl < :v", &item, &[(":v", AttrValue::num("10"))]).expect("evals"));
    }

    #[test]
    fn test_ordering_across_types_is_an_error() {
        let item = sample_item();
        let err = check("lvl > :v", &item, &[(":v", AttrValue::str("4"))]).expect_err("must fail");
        assert!(err.message.contains("N"));
        assert!(err.message.contains("S"));
    }

    #[test]
    fn test_undefined_comparisons_are_false() {
        let item = sample_item();
        assert!(!check("ghost = :v", &item, &[(":v", AttrValue::str("x"))]).expect("evals"));
        assert!(!check("ghost <> :v", &item, &[(":v", AttrValue::str("x"))]).expect("evals"));
        assert!(!check("ghost < :v", &item, &[(":v", AttrValue::str("x"))]).expect("evals"));
    }

    #[test]
    fn test_between() {
        let item = sample_item();
        assert!(check(
            "lvl BETWEEN :lo AND :hi",
            &item,
            &[(":lo", AttrValue::num("1")), (":hi", AttrValue::num("10"))]
        )
        .expect("evals"));
        assert!(!check(
            "lvl BETWEEN :lo AND :hi",
            &item,
            &[(":lo", AttrValue::num("6")), (":hi", AttrValue::num("10"))]
        )
        .expect("evals"));
        // Undefined operand: false, not an error.
        assert!(!check(
            "ghost BETWEEN :lo AND :hi",
            &item,
            &[(":lo", AttrValue::num("1")), (":hi", AttrValue::num("10"))]
        )
        .expect("evals"));
        // Mixed bound types: error.
        assert!(check(
            "lvl BETWEEN :lo AND :hi",
            &item,
            &[(":lo", AttrValue::num("1")), (":hi", AttrValue::str("10"))]
        )
        .is_err());
    }

    #[test]
    fn test_in() {
        let item = sample_item();
        assert!(check(
            "id IN (:a, :b)",
            &item,
            &[(":a", AttrValue::str("007")), (":b", AttrValue::str("001"))]
        )
        .expect("evals"));
        assert!(!check(
            "id IN (:a, :b)",
            &item,
            &[(":a", AttrValue::str("007")), (":b", AttrValue::num("1"))]
        )
        .expect("evals"));
        assert!(!check("ghost IN (:a)", &item, &[(":a", AttrValue::str("x"))]).expect("evals"));
    }

    #[test]
    fn test_connectives_short_circuit() {
        let item = sample_item();
        // The right-hand side would error (cross-type ordering) if evaluated.
        assert!(!check(
            "id = :other AND lvl > :s",
            &item,
            &[(":other", AttrValue::str("xxx")), (":s", AttrValue::str("a"))]
        )
        .expect("evals"));
        assert!(check(
            "id = :v OR lvl > :s",
            &item,
            &[(":v", AttrValue::str("001")), (":s", AttrValue::str("a"))]
        )
        .expect("evals"));
    }

    #[test]
    fn test_not_requires_boolean() {
        let item = sample_item();
        assert!(check("NOT id = :v", &item, &[(":v", AttrValue::str("002"))]).expect("evals"));
        assert!(check("NOT id", &item, &[]).is_err());
    }

    #[test]
    fn test_top_level_must_be_boolean() {
        let item = sample_item();
        let err = check("id", &item, &[]).expect_err("must fail");
        assert!(err.message.contains("boolean"));
    }

    #[test]
    fn test_boolean_in_comparison_is_an_error() {
        let item = sample_item();
        assert!(check("(id = :v) = :v", &item, &[(":v", AttrValue::str("001"))]).is_err());
    }
}
