//! Keys address exactly one entity: a kind plus an optional identifier.

use crate::{TypesError, TypesResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical partition name. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Kind(String);

impl Kind {
    /// Creates a kind, rejecting the empty string.
    pub fn new(name: impl Into<String>) -> TypesResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(TypesError::EmptyKind);
        }
        Ok(Self(name))
    }

    /// Returns the kind name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Kind {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Kind {
    type Error = TypesError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Kind> for String {
    fn from(kind: Kind) -> Self {
        kind.0
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The store-side identity of an entity within its kind.
///
/// Numeric ids and string names are distinct: `Id(12345)` and
/// `Name("12345")` address two different entities.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Id(i64),
    Name(String),
}

impl From<i64> for Identifier {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

impl From<i32> for Identifier {
    fn from(id: i32) -> Self {
        Self::Id(i64::from(id))
    }
}

impl From<u32> for Identifier {
    fn from(id: u32) -> Self {
        Self::Id(i64::from(id))
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for Identifier {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<&Identifier> for Identifier {
    fn from(identifier: &Identifier) -> Self {
        identifier.clone()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// A `(kind, identifier?)` pair.
///
/// A key without identifier is incomplete: writing it asks the store to
/// allocate a fresh numeric id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Key {
    kind: Kind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    identifier: Option<Identifier>,
}

impl Key {
    /// Builds a key from a kind name and an optional identifier.
    pub fn new(kind: &str, identifier: Option<Identifier>) -> TypesResult<Self> {
        Ok(Self {
            kind: Kind::new(kind)?,
            identifier,
        })
    }

    /// Builds a complete key.
    pub fn complete(kind: &str, identifier: impl Into<Identifier>) -> TypesResult<Self> {
        Self::new(kind, Some(identifier.into()))
    }

    /// Builds an incomplete key; the store assigns the identifier.
    pub fn incomplete(kind: &str) -> TypesResult<Self> {
        Self::new(kind, None)
    }

    /// Builds a key from an already validated kind.
    #[must_use]
    pub const fn from_parts(kind: Kind, identifier: Option<Identifier>) -> Self {
        Self { kind, identifier }
    }

    #[must_use]
    pub const fn kind(&self) -> &Kind {
        &self.kind
    }

    #[must_use]
    pub const fn identifier(&self) -> Option<&Identifier> {
        self.identifier.as_ref()
    }

    /// Returns true when the key carries an identifier.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.identifier.is_some()
    }

    /// Returns a copy of this key with the given identifier.
    #[must_use]
    pub fn with_identifier(&self, identifier: Identifier) -> Self {
        Self {
            kind: self.kind.clone(),
            identifier: Some(identifier),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.identifier {
            Some(Identifier::Id(id)) => write!(f, "{}({id})", self.kind),
            Some(Identifier::Name(name)) => write!(f, "{}({name:?})", self.kind),
            None => write!(f, "{}(<incomplete>)", self.kind),
        }
    }
}
