//! Built-in functions
//!
//! The condition dialect resolves function names against this fixed
//! table. Update-only functions (`if_not_exists`, `list_append`) are
//! rejected here and handled by the update evaluator; unknown names are
//! errors in both dialects.

use super::condition::{eval_expr, Evaluated};
use super::env::Environment;
use super::EvalError;
use crate::parser::Expr;
use dynamem_core::{AttrValue, Number};

/// All valid `attribute_type` tags.
const TYPE_TAGS: &[&str] = &["S", "N", "B", "BOOL", "NULL", "L", "M", "SS", "NS", "BS"];

pub(crate) fn eval_condition_call(
    name: &str,
    args: &[Expr],
    env: &Environment,
    depth: usize,
) -> Result<Evaluated, EvalError> {
    match name {
        "size" => {
            let [arg] = expect_arity::<1>(name, args)?;
            eval_size(arg, env, depth)
        }
        "attribute_exists" => {
            let [arg] = expect_arity::<1>(name, args)?;
            let resolved = resolve_path_arg(name, arg, env)?;
            Ok(Evaluated::Truth(resolved.is_some()))
        }
        "attribute_not_exists" => {
            let [arg] = expect_arity::<1>(name, args)?;
            let resolved = resolve_path_arg(name, arg, env)?;
            Ok(Evaluated::Truth(resolved.is_none()))
        }
        "attribute_type" => {
            let [path_arg, tag_arg] = expect_arity::<2>(name, args)?;
            let tag = match eval_expr(tag_arg, env, depth + 1)? {
                Evaluated::Value(AttrValue::String(tag)) => tag,
                _ => {
                    return Err(EvalError::new(
                        "attribute_type requires a string type tag".to_string(),
                    ))
                }
            };
            if !TYPE_TAGS.contains(&tag.as_str()) {
                return Err(EvalError::new(format!("Unknown type tag: {tag:?}")));
            }
            let resolved = resolve_path_arg(name, path_arg, env)?;
            Ok(Evaluated::Truth(
                resolved.is_some_and(|v| v.type_tag() == tag),
            ))
        }
        "begins_with" => {
            let [lhs, rhs] = expect_arity::<2>(name, args)?;
            let prefix = expect_value(name, eval_expr(rhs, env, depth + 1)?)?;
            let operand = match eval_expr(lhs, env, depth + 1)? {
                Evaluated::Value(v) => v,
                Evaluated::Undefined => return Ok(Evaluated::Truth(false)),
                Evaluated::Truth(_) => {
                    return Err(EvalError::new("begins_with requires a value operand"))
                }
            };
            match (&operand, &prefix) {
                (AttrValue::String(s), AttrValue::String(p)) => {
                    Ok(Evaluated::Truth(s.starts_with(p.as_str())))
                }
                (AttrValue::Binary(b), AttrValue::Binary(p)) => {
                    Ok(Evaluated::Truth(b.starts_with(p)))
                }
                _ => Err(EvalError::new(format!(
                    "begins_with requires matching string or binary operands, got {} and {}",
                    operand.type_tag(),
                    prefix.type_tag()
                ))),
            }
        }
        "contains" => {
            let [container_arg, operand_arg] = expect_arity::<2>(name, args)?;
            let operand = expect_value(name, eval_expr(operand_arg, env, depth + 1)?)?;
            let container = match eval_expr(container_arg, env, depth + 1)? {
                Evaluated::Value(v) => v,
                Evaluated::Undefined => return Ok(Evaluated::Truth(false)),
                Evaluated::Truth(_) => {
                    return Err(EvalError::new("contains requires a value container"))
                }
            };
            eval_contains(&container, &operand).map(Evaluated::Truth)
        }
        "if_not_exists" | "list_append" => Err(EvalError::new(format!(
            "Function is not allowed in condition expressions: {name}"
        ))),
        _ => Err(EvalError::new(format!("Unknown function: {name}"))),
    }
}

fn eval_size(arg: &Expr, env: &Environment, depth: usize) -> Result<Evaluated, EvalError> {
    let value = match eval_expr(arg, env, depth + 1)? {
        Evaluated::Value(v) => v,
        Evaluated::Undefined => {
            return Err(EvalError::new(format!(
                "size of a missing attribute: {arg}"
            )))
        }
        Evaluated::Truth(_) => return Err(EvalError::new("size requires a value operand")),
    };
    let len = match &value {
        AttrValue::String(s) => s.chars().count(),
        AttrValue::Binary(b) => b.len(),
        AttrValue::List(l) => l.len(),
        AttrValue::Map(m) => m.len(),
        AttrValue::StringSet(s) => s.len(),
        AttrValue::NumberSet(s) => s.len(),
        AttrValue::BinarySet(s) => s.len(),
        other => {
            return Err(EvalError::new(format!(
                "size is not defined for type {}",
                other.type_tag()
            )))
        }
    };
    Ok(Evaluated::Value(AttrValue::Number(Number::from_i64(
        len as i64,
    ))))
}

/// Membership test: substring, byte subsequence, element, or subset.
fn eval_contains(container: &AttrValue, operand: &AttrValue) -> Result<bool, EvalError> {
    match (container, operand) {
        (AttrValue::String(s), AttrValue::String(needle)) => Ok(s.contains(needle.as_str())),
        (AttrValue::Binary(haystack), AttrValue::Binary(needle)) => {
            if needle.is_empty() {
                return Ok(true);
            }
            Ok(haystack
                .windows(needle.len())
                .any(|window| window == needle.as_slice()))
        }
        (AttrValue::List(elements), operand) => Ok(elements.iter().any(|e| e == operand)),
        (AttrValue::StringSet(set), AttrValue::String(s)) => Ok(set.contains(s)),
        (AttrValue::StringSet(set), AttrValue::StringSet(other)) => Ok(other.is_subset(set)),
        (AttrValue::NumberSet(set), AttrValue::Number(n)) => Ok(set.contains(n)),
        (AttrValue::NumberSet(set), AttrValue::NumberSet(other)) => Ok(other.is_subset(set)),
        (AttrValue::BinarySet(set), AttrValue::Binary(b)) => Ok(set.contains(b)),
        (AttrValue::BinarySet(set), AttrValue::BinarySet(other)) => Ok(other.is_subset(set)),
        // A valid container with a mismatched operand is simply false.
        (AttrValue::String(_), _)
        | (AttrValue::Binary(_), _)
        | (AttrValue::StringSet(_), _)
        | (AttrValue::NumberSet(_), _)
        | (AttrValue::BinarySet(_), _) => Ok(false),
        _ => Err(EvalError::new(format!(
            "contains is not defined for container type {}",
            container.type_tag()
        ))),
    }
}

fn expect_arity<'e, const N: usize>(
    name: &str,
    args: &'e [Expr],
) -> Result<&'e [Expr; N], EvalError> {
    args.try_into().map_err(|_| {
        EvalError::new(format!(
            "{name} takes {N} argument(s), got {}",
            args.len()
        ))
    })
}

fn expect_value(name: &str, evaluated: Evaluated) -> Result<AttrValue, EvalError> {
    match evaluated {
        Evaluated::Value(v) => Ok(v),
        Evaluated::Undefined => Err(EvalError::new(format!(
            "{name} argument does not exist"
        ))),
        Evaluated::Truth(_) => Err(EvalError::new(format!("{name} requires a value argument"))),
    }
}

/// The path argument of the `attribute_*` predicates must be a literal
/// path, not a computed value.
fn resolve_path_arg<'e>(
    name: &str,
    arg: &Expr,
    env: &Environment<'e>,
) -> Result<Option<&'e AttrValue>, EvalError> {
    match arg {
        Expr::Path(path) => env.resolve_path(path),
        _ => Err(EvalError::new(format!("{name} requires an attribute path"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::eval_condition;
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
        item.insert("title".to_string(), AttrValue::str("Bulbasaur"));
        item.insert("blob".to_string(), AttrValue::Binary(vec![1, 2, 3, 4]));
        item.insert(
            "moves".to_string(),
            AttrValue::StringSet(["Growl", "Tackle"].iter().map(|s| s.to_string()).collect()),
        );
        item.insert(
            "stats".to_string(),
            AttrValue::List(vec![AttrValue::num("45"), AttrValue::num("49")]),
        );
        item.insert("nothing".to_string(), AttrValue::Null);
        item
    }

    #[test]
    fn test_size() {
        let item = sample_item();
        assert!(check("size(title) = :v", &item, &[(":v", AttrValue::num("9"))]).expect("evals"));
        assert!(check("size(blob) = :v", &item, &[(":v", AttrValue::num("4"))]).expect("evals"));
        assert!(check("size(moves) = :v", &item, &[(":v", AttrValue::num("2"))]).expect("evals"));
        assert!(check("size(stats) > :v", &item, &[(":v", AttrValue::num("1"))]).expect("evals"));
        // Not defined for null.
        assert!(check("size(nothing) = :v", &item, &[(":v", AttrValue::num("0"))]).is_err());
    }

    #[test]
    fn test_attribute_exists() {
        let item = sample_item();
        assert!(check("attribute_exists(title)", &item, &[]).expect("evals"));
        assert!(!check("attribute_exists(ghost)", &item, &[]).expect("evals"));
        assert!(check("attribute_not_exists(ghost)", &item, &[]).expect("evals"));
        // Explicit null is present, not missing.
        assert!(check("attribute_exists(nothing)", &item, &[]).expect("evals"));
    }

    #[test]
    fn test_attribute_type() {
        let item = sample_item();
        assert!(check(
            "attribute_type(title, :t)",
            &item,
            &[(":t", AttrValue::str("S"))]
        )
        .expect("evals"));
        assert!(check(
            "attribute_type(nothing, :t)",
            &item,
            &[(":t", AttrValue::str("NULL"))]
        )
        .expect("evals"));
        assert!(!check(
            "attribute_type(ghost, :t)",
            &item,
            &[(":t", AttrValue::str("S"))]
        )
        .expect("evals"));
        assert!(check(
            "attribute_type(title, :t)",
            &item,
            &[(":t", AttrValue::str("XX"))]
        )
        .is_err());
    }

    #[test]
    fn test_begins_with() {
        let item = sample_item();
        assert!(check(
            "begins_with(title, :p)",
            &item,
            &[(":p", AttrValue::str("Bulba"))]
        )
        .expect("evals"));
        assert!(check(
            "begins_with(blob, :p)",
            &item,
            &[(":p", AttrValue::Binary(vec![1, 2]))]
        )
        .expect("evals"));
        // Missing path is false.
        assert!(!check(
            "begins_with(ghost, :p)",
            &item,
            &[(":p", AttrValue::str("x"))]
        )
        .expect("evals"));
        // Type mismatch is an error.
        assert!(check(
            "begins_with(title, :p)",
            &item,
            &[(":p", AttrValue::Binary(vec![1]))]
        )
        .is_err());
    }

    #[test]
    fn test_contains() {
        let item = sample_item();
        assert!(check(
            "contains(title, :s)",
            &item,
            &[(":s", AttrValue::str("saur"))]
        )
        .expect("evals"));
        assert!(check(
            "contains(blob, :b)",
            &item,
            &[(":b", AttrValue::Binary(vec![2, 3]))]
        )
        .expect("evals"));
        assert!(check(
            "contains(moves, :m)",
            &item,
            &[(":m", AttrValue::str("Growl"))]
        )
        .expect("evals"));
        assert!(check(
            "contains(stats, :n)",
            &item,
            &[(":n", AttrValue::num("49"))]
        )
        .expect("evals"));
        // Set-in-set means subset.
        assert!(check(
            "contains(moves, :sub)",
            &item,
            &[(
                ":sub",
                AttrValue::StringSet(["Growl"].iter().map(|s| s.to_string()).collect())
            )]
        )
        .expect("evals"));
        // Mismatched operand in a valid container: false.
        assert!(!check(
            "contains(moves, :n)",
            &item,
            &[(":n", AttrValue::num("1"))]
        )
        .expect("evals"));
        // Invalid container type: error.
        assert!(check(
            "contains(nothing, :s)",
            &item,
            &[(":s", AttrValue::str("x"))]
        )
        .is_err());
    }

    #[test]
    fn test_update_only_functions_rejected() {
        let item = sample_item();
        let err = check("if_not_exists(title, :v) = :v", &item, &[(":v", AttrValue::str("x"))])
            .expect_err("must fail");
        assert!(err.message.contains("if_not_exists"));
    }

    #[test]
    fn test_unknown_function() {
        let item = sample_item();
        let err = check("frobnicate(title)", &item, &[]).expect_err("must fail");
        assert!(err.message.contains("frobnicate"));
    }

    #[test]
    fn test_arity_errors() {
        let item = sample_item();
        assert!(check("attribute_exists(title, ghost)", &item, &[]).is_err());
        assert!(check("size() = :v", &item, &[(":v", AttrValue::num("0"))]).is_err());
    }
}
