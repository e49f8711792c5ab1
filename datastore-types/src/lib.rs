//! Core data model for the Cloud Datastore facade.
//!
//! Everything that crosses the store boundary is expressed with these types:
//! - [`Kind`] and [`Identifier`]: the two halves of a [`Key`]
//! - [`Value`] and [`Fields`]: untyped, scalar-only entity payloads
//! - [`Entity`]: a `(Key, Fields)` pair; the key is never a field
//! - [`Filter`] and [`Query`]: single-field equality scans scoped to one kind
//!
//! Typing is a caller-side convenience: [`Fields::from_serialize`] and
//! [`Fields::decode`] move between serde types and field bags.

mod entity;
mod key;
mod query;
mod value;

pub use entity::{Entity, Fields};
pub use key::{Identifier, Key, Kind};
pub use query::{Filter, Query};
pub use value::Value;

/// Result type alias using the crate's error type.
pub type TypesResult<T> = std::result::Result<T, TypesError>;

/// Errors that can occur while building keys or converting payloads.
#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    #[error("kind must not be empty")]
    EmptyKind,

    #[error("entity payload must be an object, got {0}")]
    NotAnObject(&'static str),

    #[error("field `{field}` holds an unsupported value ({found})")]
    UnsupportedValue { field: String, found: &'static str },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
