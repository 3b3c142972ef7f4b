//! Attribute values and items
//!
//! The tagged dynamic value tree stored in tables and manipulated by
//! expressions. Equality is structural and type-sensitive: a string `"1"`
//! never equals the number `1`. Ordering exists only for the three
//! comparable scalar types (number, string, binary).

use crate::Number;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// A top-level attribute map stored at one primary key.
pub type Item = BTreeMap<String, AttrValue>;

/// A dynamically typed attribute value.
///
/// Exactly one case is inhabited. The three set variants are homogeneous,
/// deduplicated, and never persisted empty (removing the last element of a
/// set attribute removes the attribute).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Binary(Vec<u8>),
    List(Vec<AttrValue>),
    Map(Item),
    StringSet(BTreeSet<String>),
    NumberSet(BTreeSet<Number>),
    BinarySet(BTreeSet<Vec<u8>>),
}

impl AttrValue {
    /// The type tag as tested by `attribute_type`.
    pub fn type_tag(&self) -> &'static str {
        match self {
            AttrValue::Null => "NULL",
            AttrValue::Bool(_) => "BOOL",
            AttrValue::Number(_) => "N",
            AttrValue::String(_) => "S",
            AttrValue::Binary(_) => "B",
            AttrValue::List(_) => "L",
            AttrValue::Map(_) => "M",
            AttrValue::StringSet(_) => "SS",
            AttrValue::NumberSet(_) => "NS",
            AttrValue::BinarySet(_) => "BS",
        }
    }

    /// True for the three scalar types usable as key attributes.
    pub fn is_key_scalar(&self) -> bool {
        matches!(
            self,
            AttrValue::String(_) | AttrValue::Number(_) | AttrValue::Binary(_)
        )
    }

    /// True for any of the three set variants.
    pub fn is_set(&self) -> bool {
        matches!(
            self,
            AttrValue::StringSet(_) | AttrValue::NumberSet(_) | AttrValue::BinarySet(_)
        )
    }

    /// True for a set variant with no elements left.
    pub fn is_empty_set(&self) -> bool {
        match self {
            AttrValue::StringSet(s) => s.is_empty(),
            AttrValue::NumberSet(s) => s.is_empty(),
            AttrValue::BinarySet(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Order two values of the same comparable scalar type.
    ///
    /// `None` for mixed types and for every non-comparable type; callers
    /// decide whether that is `false` or an error.
    pub fn cmp_scalar(&self, other: &AttrValue) -> Option<Ordering> {
        match (self, other) {
            (AttrValue::Number(a), AttrValue::Number(b)) => Some(a.cmp(b)),
            (AttrValue::String(a), AttrValue::String(b)) => Some(a.cmp(b)),
            (AttrValue::Binary(a), AttrValue::Binary(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self {
            AttrValue::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Item> {
        match self {
            AttrValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<AttrValue>> {
        match self {
            AttrValue::List(l) => Some(l),
            _ => None,
        }
    }

    /// Convenience constructor for string values.
    pub fn str(s: impl Into<String>) -> AttrValue {
        AttrValue::String(s.into())
    }

    /// Convenience constructor for number values; panics on an invalid
    /// literal, so only for trusted call sites and tests.
    pub fn num(literal: &str) -> AttrValue {
        AttrValue::Number(Number::new(literal).expect("valid number literal"))
    }
}
