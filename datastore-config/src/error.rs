//! Error types for configuration wiring and resolution.

use std::time::Duration;
use thiserror::Error;

/// Result type for wiring-time validation.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for options resolution.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Invalid or contradictory wiring. Raised before any store access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// None of `use_factory`, `use_existing`, `use_class` was supplied.
    #[error("no provider can be built for the async datastore options: supply one of use_factory, use_existing or use_class")]
    NoStrategy,

    /// More than one mutually exclusive strategy was supplied.
    #[error("conflicting datastore options strategies: {}", .0.join(" + "))]
    ConflictingStrategies(Vec<&'static str>),
}

/// The deferred options could not be produced.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A dependency named in `inject` is not registered.
    #[error("dependency `{0}` is not registered")]
    MissingDependency(String),

    /// A dependency is registered under the name but with another type.
    #[error("dependency `{name}` is not a `{expected}`")]
    DependencyType { name: String, expected: &'static str },

    /// `use_existing` names an options factory that is not registered.
    #[error("options factory `{0}` is not registered")]
    UnknownFactory(String),

    /// Building the `use_class` type failed.
    #[error("failed to construct options factory `{type_name}`: {source:#}")]
    Construct {
        type_name: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// The factory itself returned an error.
    #[error("datastore options factory failed: {0:#}")]
    Factory(#[source] anyhow::Error),

    /// The factory did not complete within the wiring timeout.
    #[error("datastore options were not resolved within {0:?}")]
    Timeout(Duration),
}
