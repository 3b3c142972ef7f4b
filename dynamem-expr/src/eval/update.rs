//! Update evaluator
//!
//! Applies a parsed update program to an item in place. Actions run in
//! source order against the progressively mutated item, except list
//! `REMOVE`s: those are recorded as tombstones and compacted after all
//! actions complete, so `REMOVE a[1], a[2]` removes the originally
//! indexed elements instead of shifting on each removal.

use super::env::Environment;
use super::EvalError;
use crate::parser::{Expr, Path, PathSegment, UpdateAction, UpdateExpr};
use dynamem_core::{AttrValue, Item};
use std::collections::{BTreeSet, HashMap};

/// Apply an update expression to `item`.
pub fn apply_update(
    update: &UpdateExpr,
    item: &mut Item,
    names: &HashMap<String, String>,
    values: &HashMap<String, AttrValue>,
) -> Result<(), EvalError> {
    let mut list_removals: Vec<(Path, usize)> = Vec::new();

    for action in &update.actions {
        match action {
            UpdateAction::Set { path, value } => {
                let path = Environment::resolve_path_names(path, names)?;
                let value = {
                    let env = Environment::new(item, names, values);
                    eval_set_value(value, &env)?
                };
                assign(item, &path, value)?;
            }
            UpdateAction::Add { path, value } => {
                let path = Environment::resolve_path_names(path, names)?;
                let operand = {
                    let env = Environment::new(item, names, values);
                    eval_operand(value, &env)?
                };
                apply_add(item, &path, operand)?;
            }
            UpdateAction::Delete { path, value } => {
                let path = Environment::resolve_path_names(path, names)?;
                let operand = {
                    let env = Environment::new(item, names, values);
                    eval_operand(value, &env)?
                };
                apply_delete(item, &path, operand)?;
            }
            UpdateAction::Remove { path } => {
                let path = Environment::resolve_path_names(path, names)?;
                match path.segments.split_last() {
                    Some((PathSegment::Index(idx), parent)) => {
                        list_removals.push((
                            Path {
                                segments: parent.to_vec(),
                            },
                            *idx,
                        ));
                    }
                    _ => remove_at(item, &path),
                }
            }
        }
    }

    compact_lists(item, list_removals);
    Ok(())
}

/// The top-level attribute names an update writes through, for the
/// `Updated*` return-value subsets.
pub fn touched_attributes(
    update: &UpdateExpr,
    names: &HashMap<String, String>,
) -> Result<BTreeSet<String>, EvalError> {
    let mut touched = BTreeSet::new();
    for action in &update.actions {
        let path = Environment::resolve_path_names(action.path(), names)?;
        if let Some(PathSegment::Attr(name)) = path.segments.first() {
            touched.insert(name.clone());
        }
    }
    Ok(touched)
}

/// Evaluate the right-hand side of a `SET`.
fn eval_set_value(expr: &Expr, env: &Environment) -> Result<AttrValue, EvalError> {
    match expr {
        Expr::Placeholder(name) => Ok(env.resolve_value(name)?.clone()),
        Expr::Path(path) => env
            .resolve_path(path)?
            .cloned()
            .ok_or_else(|| EvalError::new(format!("Document path does not exist: {path}"))),
        Expr::Arith { op, lhs, rhs } => {
            let lhs = eval_set_value(lhs, env)?;
            let rhs = eval_set_value(rhs, env)?;
            match (&lhs, &rhs) {
                (AttrValue::Number(a), AttrValue::Number(b)) => {
                    let result = match op {
                        crate::parser::ArithOp::Plus => a.add(b),
                        crate::parser::ArithOp::Minus => a.sub(b),
                    };
                    Ok(AttrValue::Number(result))
                }
                _ => Err(EvalError::new(format!(
                    "Arithmetic requires number operands, got {} and {}",
                    lhs.type_tag(),
                    rhs.type_tag()
                ))),
            }
        }
        Expr::Call { name, args } => match name.as_str() {
            "if_not_exists" => {
                if args.len() != 2 {
                    return Err(EvalError::new("if_not_exists takes 2 arguments"));
                }
                let path = match &args[0] {
                    Expr::Path(path) => path,
                    _ => {
                        return Err(EvalError::new(
                            "if_not_exists requires an attribute path".to_string(),
                        ))
                    }
                };
                match env.resolve_path(path)? {
                    Some(value) if *value != AttrValue::Null => Ok(value.clone()),
                    _ => eval_set_value(&args[1], env),
                }
            }
            "list_append" => {
                if args.len() != 2 {
                    return Err(EvalError::new("list_append takes 2 arguments"));
                }
                let head = eval_set_value(&args[0], env)?;
                let tail = eval_set_value(&args[1], env)?;
                match (head, tail) {
                    (AttrValue::List(mut head), AttrValue::List(tail)) => {
                        head.extend(tail);
                        Ok(AttrValue::List(head))
                    }
                    (head, tail) => Err(EvalError::new(format!(
                        "list_append requires list operands, got {} and {}",
                        head.type_tag(),
                        tail.type_tag()
                    ))),
                }
            }
            _ => Err(EvalError::new(format!(
                "Function is not allowed in update expressions: {name}"
            ))),
        },
        other => Err(EvalError::new(format!(
            "Invalid value expression in update: {other}"
        ))),
    }
}

/// Evaluate an `ADD`/`DELETE` operand: a placeholder or a path.
fn eval_operand(expr: &Expr, env: &Environment) -> Result<AttrValue, EvalError> {
    match expr {
        Expr::Placeholder(name) => Ok(env.resolve_value(name)?.clone()),
        Expr::Path(path) => env
            .resolve_path(path)?
            .cloned()
            .ok_or_else(|| EvalError::new(format!("Document path does not exist: {path}"))),
        other => Err(EvalError::new(format!(
            "Expected a value operand, got: {other}"
        ))),
    }
}

/// `ADD`: numeric addition, set union, or initialisation when absent.
fn apply_add(item: &mut Item, path: &Path, operand: AttrValue) -> Result<(), EvalError> {
    let current = navigate_ref(item, &path.segments).cloned();
    let next = match (current, operand) {
        (None, operand) => match operand {
            AttrValue::Number(_)
            | AttrValue::StringSet(_)
            | AttrValue::NumberSet(_)
            | AttrValue::BinarySet(_) => operand,
            other => {
                return Err(EvalError::new(format!(
                    "ADD requires a number or set operand, got {}",
                    other.type_tag()
                )))
            }
        },
        (Some(AttrValue::Number(a)), AttrValue::Number(b)) => AttrValue::Number(a.add(&b)),
        (Some(AttrValue::StringSet(mut a)), AttrValue::StringSet(b)) => {
            a.extend(b);
            AttrValue::StringSet(a)
        }
        (Some(AttrValue::NumberSet(mut a)), AttrValue::NumberSet(b)) => {
            a.extend(b);
            AttrValue::NumberSet(a)
        }
        (Some(AttrValue::BinarySet(mut a)), AttrValue::BinarySet(b)) => {
            a.extend(b);
            AttrValue::BinarySet(a)
        }
        (Some(current), operand) => {
            return Err(EvalError::new(format!(
                "ADD cannot combine {} with {}",
                current.type_tag(),
                operand.type_tag()
            )))
        }
    };
    assign(item, path, next)
}

/// `DELETE`: set difference; emptying a set removes the attribute.
fn apply_delete(item: &mut Item, path: &Path, operand: AttrValue) -> Result<(), EvalError> {
    let current = match navigate_ref(item, &path.segments) {
        Some(value) => value.clone(),
        // Deleting from a missing attribute is a no-op.
        None => return Ok(()),
    };

    let next = match (current, operand) {
        (AttrValue::StringSet(mut a), AttrValue::StringSet(b)) => {
            a.retain(|e| !b.contains(e));
            AttrValue::StringSet(a)
        }
        (AttrValue::NumberSet(mut a), AttrValue::NumberSet(b)) => {
            a.retain(|e| !b.contains(e));
            AttrValue::NumberSet(a)
        }
        (AttrValue::BinarySet(mut a), AttrValue::BinarySet(b)) => {
            a.retain(|e| !b.contains(e));
            AttrValue::BinarySet(a)
        }
        (current, operand) => {
            return Err(EvalError::new(format!(
                "DELETE requires matching set operands, got {} and {}",
                current.type_tag(),
                operand.type_tag()
            )))
        }
    };

    if next.is_empty_set() {
        remove_at(item, path);
        Ok(())
    } else {
        assign(item, path, next)
    }
}

/// Assign a value into the path. Intermediate containers must already
/// exist; a list index equal to the length extends the list.
fn assign(item: &mut Item, path: &Path, value: AttrValue) -> Result<(), EvalError> {
    if value.is_empty_set() {
        return Err(EvalError::new(format!(
            "Empty sets cannot be stored: {path}"
        )));
    }

    let (last, parents) = match path.segments.split_last() {
        Some(split) => split,
        None => return Err(EvalError::new("Empty document path")),
    };

    if parents.is_empty() {
        match last {
            PathSegment::Attr(name) => {
                item.insert(name.clone(), value);
                return Ok(());
            }
            PathSegment::Index(_) => {
                return Err(EvalError::new(format!(
                    "Document path must start with an attribute name: {path}"
                )))
            }
        }
    }

    let parent = navigate_mut(item, parents)
        .ok_or_else(|| EvalError::new(format!("Document path does not exist: {path}")))?;

    match (parent, last) {
        (AttrValue::Map(map), PathSegment::Attr(name)) => {
            map.insert(name.clone(), value);
            Ok(())
        }
        (AttrValue::List(list), PathSegment::Index(idx)) => {
            use std::cmp::Ordering;
            match (*idx).cmp(&list.len()) {
                Ordering::Less => {
                    list[*idx] = value;
                    Ok(())
                }
                Ordering::Equal => {
                    list.push(value);
                    Ok(())
                }
                Ordering::Greater => Err(EvalError::new(format!(
                    "List index out of bounds: {path}"
                ))),
            }
        }
        _ => Err(EvalError::new(format!(
            "Document path does not match the item shape: {path}"
        ))),
    }
}

/// Unset the attribute at a path; missing paths are a no-op.
fn remove_at(item: &mut Item, path: &Path) {
    let (last, parents) = match path.segments.split_last() {
        Some(split) => split,
        None => return,
    };

    if parents.is_empty() {
        if let PathSegment::Attr(name) = last {
            item.remove(name);
        }
        return;
    }

    let Some(parent) = navigate_mut(item, parents) else {
        return;
    };
    match (parent, last) {
        (AttrValue::Map(map), PathSegment::Attr(name)) => {
            map.remove(name);
        }
        (AttrValue::List(list), PathSegment::Index(idx)) => {
            if *idx < list.len() {
                list.remove(*idx);
            }
        }
        _ => {}
    }
}

/// Second phase of list `REMOVE`: drop tombstoned positions per list,
/// highest index first, preserving the relative order of survivors.
fn compact_lists(item: &mut Item, removals: Vec<(Path, usize)>) {
    let mut by_parent: HashMap<Path, Vec<usize>> = HashMap::new();
    for (parent, idx) in removals {
        by_parent.entry(parent).or_default().push(idx);
    }

    for (parent, mut indexes) in by_parent {
        indexes.sort_unstable();
        indexes.dedup();
        let Some(AttrValue::List(list)) = navigate_mut(item, &parent.segments) else {
            continue;
        };
        for idx in indexes.into_iter().rev() {
            if idx < list.len() {
                list.remove(idx);
            }
        }
    }
}

fn navigate_ref<'a>(item: &'a Item, segments: &[PathSegment]) -> Option<&'a AttrValue> {
    let mut iter = segments.iter();
    let mut current = match iter.next()? {
        PathSegment::Attr(name) => item.get(name)?,
        PathSegment::Index(_) => return None,
    };
    for segment in iter {
        current = match (current, segment) {
            (AttrValue::Map(map), PathSegment::Attr(name)) => map.get(name)?,
            (AttrValue::List(list), PathSegment::Index(idx)) => list.get(*idx)?,
            _ => return None,
        };
    }
    Some(current)
}

fn navigate_mut<'a>(item: &'a mut Item, segments: &[PathSegment]) -> Option<&'a mut AttrValue> {
    let mut iter = segments.iter();
    let mut current = match iter.next()? {
        PathSegment::Attr(name) => item.get_mut(name)?,
        PathSegment::Index(_) => return None,
    };
    for segment in iter {
        current = match (current, segment) {
            (AttrValue::Map(map), PathSegment::Attr(name)) => map.get_mut(name)?,
            (AttrValue::List(list), PathSegment::Index(idx)) => list.get_mut(*idx)?,
            _ => return None,
        };
    }
    Some(current)
}
