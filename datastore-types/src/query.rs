use crate::{Fields, Kind, TypesResult, Value};
use serde::{Deserialize, Serialize};

/// A single `field = value` equality filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Returns true when `fields` holds exactly `value` under `field`.
    ///
    /// Integers and doubles never compare equal to each other, matching the
    /// store's typed equality.
    #[must_use]
    pub fn matches(&self, fields: &Fields) -> bool {
        fields.get(&self.field) == Some(&self.value)
    }
}

/// A scan over one kind, optionally narrowed by a [`Filter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    kind: Kind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    filter: Option<Filter>,
}

impl Query {
    /// Unfiltered scan of `kind`.
    pub fn new(kind: &str) -> TypesResult<Self> {
        Ok(Self {
            kind: Kind::new(kind)?,
            filter: None,
        })
    }

    /// Replaces the filter; only one equality filter is supported.
    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub const fn kind(&self) -> &Kind {
        &self.kind
    }

    #[must_use]
    pub const fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }
}
