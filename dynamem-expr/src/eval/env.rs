//! Environment and path resolution
//!
//! An environment scopes one evaluation: the item's top-level attributes,
//! the `#name` alias map, and the `:value` placeholder map. Path
//! resolution yields `None` for the undefined sentinel, which is distinct
//! from the stored `AttrValue::Null` value; conflating the two would
//! break `attribute_exists` for explicit-null attributes.

use super::EvalError;
use crate::parser::{Path, PathSegment};
use crate::reserved::is_reserved_word;
use dynamem_core::{AttrValue, Item};
use std::collections::HashMap;

/// Name→value scope for one expression evaluation.
pub struct Environment<'a> {
    item: &'a Item,
    names: &'a HashMap<String, String>,
    values: &'a HashMap<String, AttrValue>,
}

impl<'a> Environment<'a> {
    pub fn new(
        item: &'a Item,
        names: &'a HashMap<String, String>,
        values: &'a HashMap<String, AttrValue>,
    ) -> Self {
        Self {
            item,
            names,
            values,
        }
    }

    /// Resolve an attribute path against the item.
    ///
    /// `Ok(None)` is the undefined sentinel: the path, or any intermediate
    /// of it, does not exist (or navigates with the wrong shape, e.g. an
    /// index into a map).
    pub fn resolve_path(&self, path: &Path) -> Result<Option<&'a AttrValue>, EvalError> {
        let mut segments = path.segments.iter();

        let mut current = match segments.next() {
            Some(PathSegment::Attr(raw)) => {
                let name = self.resolve_name(raw, true)?;
                match self.item.get(&name) {
                    Some(value) => value,
                    None => return Ok(None),
                }
            }
            _ => return Ok(None),
        };

        for segment in segments {
            current = match (current, segment) {
                (AttrValue::Map(map), PathSegment::Attr(raw)) => {
                    let name = self.resolve_name(raw, false)?;
                    match map.get(&name) {
                        Some(value) => value,
                        None => return Ok(None),
                    }
                }
                (AttrValue::List(list), PathSegment::Index(idx)) => match list.get(*idx) {
                    Some(value) => value,
                    None => return Ok(None),
                },
                _ => return Ok(None),
            };
        }

        Ok(Some(current))
    }

    /// Resolve a `:value` placeholder; missing placeholders are errors,
    /// not undefined.
    pub fn resolve_value(&self, key: &str) -> Result<&'a AttrValue, EvalError> {
        self.values
            .get(key)
            .ok_or_else(|| EvalError::new(format!("Undefined value placeholder: {key}")))
    }

    /// Substitute one path segment name through the alias map.
    fn resolve_name(&self, raw: &str, top_level: bool) -> Result<String, EvalError> {
        resolve_segment(raw, self.names, top_level)
    }

    /// Rewrite a path into real attribute names, applying aliases and the
    /// reserved-word check. Used by the update evaluator, which mutates
    /// the item directly.
    pub fn resolve_path_names(
        path: &Path,
        names: &HashMap<String, String>,
    ) -> Result<Path, EvalError> {
        let mut segments = Vec::with_capacity(path.segments.len());
        for (i, segment) in path.segments.iter().enumerate() {
            match segment {
                PathSegment::Attr(raw) => {
                    segments.push(PathSegment::Attr(resolve_segment(raw, names, i == 0)?))
                }
                PathSegment::Index(idx) => segments.push(PathSegment::Index(*idx)),
            }
        }
        Ok(Path { segments })
    }
}

/// Resolve one attribute name: `#alias` through the name map, bare names
/// checked against the reserved-word list when top-level.
pub fn resolve_attr_name(
    raw: &str,
    names: &HashMap<String, String>,
    top_level: bool,
) -> Result<String, EvalError> {
    resolve_segment(raw, names, top_level)
}

fn resolve_segment(
    raw: &str,
    names: &HashMap<String, String>,
    top_level: bool,
) -> Result<String, EvalError> {
    if raw.starts_with('#') {
        return names
            .get(raw)
            .cloned()
            .ok_or_else(|| EvalError::new(format!("Undefined name placeholder: {raw}")));
    }
    if top_level && is_reserved_word(raw) {
        return Err(EvalError::new(format!(
            "Attribute name is a reserved keyword: {raw}"
        )));
    }
    Ok(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_condition;
    use crate::parser::Expr;

    fn path_of(source: &str) -> Path {
        // Parse `<path> = :x` and pull the left-hand path back out.
        match parse_condition(&format!("{source} = :x")).expect("parses") {
            Expr::Compare { lhs, .. } => match *lhs {
                Expr::Path(path) => path,
                other => panic!("expected a path, got {other:?}"),
            },
            other => panic!("expected a comparison, got {other:?}"),
        }
    }

    fn sample_item() -> Item {
        let mut address = Item::new();
        address.insert("city".to_string(), AttrValue::str("Lyon"));

        let mut item = Item::new();
        item.insert("id".to_string(), AttrValue::str("001"));
        item.insert("address".to_string(), AttrValue::Map(address));
        item.insert(
            "tags".to_string(),
            AttrValue::List(vec![AttrValue::str("a"), AttrValue::str("b")]),
        );
        item.insert("nothing".to_string(), AttrValue::Null);
        item
    }

    #[test]
    fn test_top_level_lookup() {
        let item = sample_item();
        let names = HashMap::new();
        let values = HashMap::new();
        let env = Environment::new(&item, &names, &values);

        let resolved = env.resolve_path(&path_of("id")).expect("resolves");
        assert_eq!(resolved, Some(&AttrValue::str("001")));
    }

    #[test]
    fn test_nested_and_indexed_lookup() {
        let item = sample_item();
        let names = HashMap::new();
        let values = HashMap::new();
        let env = Environment::new(&item, &names, &values);

        assert_eq!(
            env.resolve_path(&path_of("address.city")).expect("resolves"),
            Some(&AttrValue::str("Lyon"))
        );
        assert_eq!(
            env.resolve_path(&path_of("tags[1]")).expect("resolves"),
            Some(&AttrValue::str("b"))
        );
    }

    #[test]
    fn test_missing_paths_are_undefined_not_null() {
        let item = sample_item();
        let names = HashMap::new();
        let values = HashMap::new();
        let env = Environment::new(&item, &names, &values);

        // Missing leaf, missing intermediate, index past the end, index
        // into a map: all undefined.
        for p in ["ghost", "ghost.inner", "tags[9]", "address[0]", "id.sub"] {
            assert_eq!(env.resolve_path(&path_of(p)).expect("resolves"), None, "{p}");
        }
        // An explicit null attribute is defined.
        assert_eq!(
            env.resolve_path(&path_of("nothing")).expect("resolves"),
            Some(&AttrValue::Null)
        );
    }

    #[test]
    fn test_alias_resolution() {
        let item = sample_item();
        let mut names = HashMap::new();
        names.insert("#i".to_string(), "id".to_string());
        names.insert("#c".to_string(), "city".to_string());
        let values = HashMap::new();
        let env = Environment::new(&item, &names, &values);

        assert_eq!(
            env.resolve_path(&path_of("#i")).expect("resolves"),
            Some(&AttrValue::str("001"))
        );
        // Nested segments may be aliases too.
        assert_eq!(
            env.resolve_path(&path_of("address.#c")).expect("resolves"),
            Some(&AttrValue::str("Lyon"))
        );
    }

    #[test]
    fn test_unknown_alias_is_an_error() {
        let item = sample_item();
        let names = HashMap::new();
        let values = HashMap::new();
        let env = Environment::new(&item, &names, &values);

        let err = env.resolve_path(&path_of("#ghost")).expect_err("must fail");
        assert!(err.message.contains("#ghost"));
    }

    #[test]
    fn test_reserved_word_rejected_at_top_level() {
        let mut item = Item::new();
        item.insert("size".to_string(), AttrValue::num("1"));
        let names = HashMap::new();
        let values = HashMap::new();
        let env = Environment::new(&item, &names, &values);

        let err = env.resolve_path(&path_of("size")).expect_err("must fail");
        assert!(err.message.contains("reserved"));

        // Nested segments named like reserved words are fine.
        let mut outer = Item::new();
        let mut inner = Item::new();
        inner.insert("size".to_string(), AttrValue::num("2"));
        outer.insert("stats".to_string(), AttrValue::Map(inner));
        let env = Environment::new(&outer, &names, &values);
        assert_eq!(
            env.resolve_path(&path_of("stats.size")).expect("resolves"),
            Some(&AttrValue::num("2"))
        );
    }

    #[test]
    fn test_value_placeholder_lookup() {
        let item = Item::new();
        let names = HashMap::new();
        let mut values = HashMap::new();
        values.insert(":v".to_string(), AttrValue::str("poison"));
        let env = Environment::new(&item, &names, &values);

        assert_eq!(env.resolve_value(":v").expect("resolves"), &AttrValue::str("poison"));
        assert!(env.resolve_value(":ghost").is_err());
    }
}
