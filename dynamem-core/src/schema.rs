//! Table and index schema descriptors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scalar type of a key attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    String,
    Number,
    Binary,
}

impl ScalarType {
    /// The short type tag used in attribute definitions.
    pub fn tag(&self) -> &'static str {
        match self {
            ScalarType::String => "S",
            ScalarType::Number => "N",
            ScalarType::Binary => "B",
        }
    }

    pub fn from_tag(tag: &str) -> Option<ScalarType> {
        match tag {
            "S" => Some(ScalarType::String),
            "N" => Some(ScalarType::Number),
            "B" => Some(ScalarType::Binary),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Declares the scalar type of an attribute referenced by some key schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub name: String,
    pub attr_type: ScalarType,
}

impl AttributeDefinition {
    pub fn new(name: impl Into<String>, attr_type: ScalarType) -> Self {
        Self {
            name: name.into(),
            attr_type,
        }
    }
}

/// Hash-only or hash+range key schema for a table or index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySchema {
    pub hash_key: String,
    pub range_key: Option<String>,
}

impl KeySchema {
    pub fn hash(hash_key: impl Into<String>) -> Self {
        Self {
            hash_key: hash_key.into(),
            range_key: None,
        }
    }

    pub fn hash_range(hash_key: impl Into<String>, range_key: impl Into<String>) -> Self {
        Self {
            hash_key: hash_key.into(),
            range_key: Some(range_key.into()),
        }
    }

    /// The attribute names this schema references, hash first.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.hash_key.as_str()).chain(self.range_key.as_deref())
    }
}

/// Which attributes an index entry materialises.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Projection {
    /// Project all attributes
    #[default]
    All,
    /// Project only the index and primary key attributes
    KeysOnly,
    /// Project the key attributes plus a named list
    Include(Vec<String>),
}

/// Global indexes carry independent keys; local indexes share the primary
/// hash key and require the primary schema to have a range key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexKind {
    Global,
    Local,
}

/// A secondary index declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryIndexDef {
    pub name: String,
    pub kind: IndexKind,
    pub key_schema: KeySchema,
    pub projection: Projection,
    pub throughput: Option<Throughput>,
}

/// Provisioned read/write capacity; carried as metadata only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Throughput {
    pub read_units: i64,
    pub write_units: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BillingMode {
    #[default]
    Provisioned,
    PayPerRequest,
}

/// A live change to the index set of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexChange {
    /// Install a new index and back-fill it from primary data.
    Create(SecondaryIndexDef),
    /// Adjust throughput metadata of an existing index.
    Update {
        name: String,
        throughput: Throughput,
    },
    /// Drop an index.
    Delete { name: String },
}

/// Which attributes a mutating operation echoes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ReturnValues {
    #[default]
    None,
    AllOld,
    AllNew,
    UpdatedOld,
    UpdatedNew,
}

/// Table-level metadata exposed by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescription {
    pub name: String,
    pub item_count: usize,
    pub created_at: DateTime<Utc>,
    pub billing_mode: BillingMode,
    pub key_schema: KeySchema,
    pub indexes: Vec<SecondaryIndexDef>,
}
