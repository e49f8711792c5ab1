//! Named values the deferred strategies can draw on.

use crate::error::{ResolveError, ResolveResult};
use crate::factory::OptionsFactory;
use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type SharedAny = Arc<dyn Any + Send + Sync>;

/// Registry of application values and options factories.
///
/// Stands in for the surrounding dependency graph: factories receive values
/// by name, `use_existing` looks factories up by name, and `use_class` types
/// build themselves from it.
#[derive(Clone, Default)]
pub struct Providers {
    values: HashMap<String, SharedAny>,
    factories: HashMap<String, Arc<dyn OptionsFactory>>,
}

impl Providers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a value under `name`, replacing any previous one.
    pub fn insert<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) {
        self.values.insert(name.into(), Arc::new(value));
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
        self.insert(name, value);
        self
    }

    /// Registers an options factory for `use_existing`.
    pub fn register_factory(&mut self, name: impl Into<String>, factory: Arc<dyn OptionsFactory>) {
        self.factories.insert(name.into(), factory);
    }

    /// Builder-style [`register_factory`](Self::register_factory).
    #[must_use]
    pub fn with_factory(
        mut self,
        name: impl Into<String>,
        factory: Arc<dyn OptionsFactory>,
    ) -> Self {
        self.register_factory(name, factory);
        self
    }

    /// Fetches a value by name and type.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> ResolveResult<Arc<T>> {
        let value = self
            .values
            .get(name)
            .ok_or_else(|| ResolveError::MissingDependency(name.to_string()))?;
        downcast(name, value)
    }

    /// Fetches an options factory by name.
    pub fn factory(&self, name: &str) -> ResolveResult<Arc<dyn OptionsFactory>> {
        self.factories
            .get(name)
            .cloned()
            .ok_or_else(|| ResolveError::UnknownFactory(name.to_string()))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Collects the values named in `inject`, in order.
    pub fn resolve_deps(&self, inject: &[String]) -> ResolveResult<ResolvedDeps> {
        let values = inject
            .iter()
            .map(|name| {
                self.values
                    .get(name)
                    .map(|value| (name.clone(), Arc::clone(value)))
                    .ok_or_else(|| ResolveError::MissingDependency(name.clone()))
            })
            .collect::<ResolveResult<Vec<_>>>()?;
        Ok(ResolvedDeps { values })
    }
}

impl fmt::Debug for Providers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut values: Vec<_> = self.values.keys().collect();
        values.sort();
        let mut factories: Vec<_> = self.factories.keys().collect();
        factories.sort();
        f.debug_struct("Providers")
            .field("values", &values)
            .field("factories", &factories)
            .finish()
    }
}

/// The dependencies handed to a `use_factory` closure.
#[derive(Clone, Default)]
pub struct ResolvedDeps {
    values: Vec<(String, SharedAny)>,
}

impl ResolvedDeps {
    /// Fetches an injected value by name and type.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> ResolveResult<Arc<T>> {
        let (_, value) = self
            .values
            .iter()
            .find(|(n, _)| n == name)
            .ok_or_else(|| ResolveError::MissingDependency(name.to_string()))?;
        downcast(name, value)
    }

    /// Fetches an injected value by its position in `inject`.
    pub fn at<T: Any + Send + Sync>(&self, index: usize) -> ResolveResult<Arc<T>> {
        let (name, value) = self
            .values
            .get(index)
            .ok_or_else(|| ResolveError::MissingDependency(format!("#{index}")))?;
        downcast(name, value)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for ResolvedDeps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

fn downcast<T: Any + Send + Sync>(name: &str, value: &SharedAny) -> ResolveResult<Arc<T>> {
    Arc::clone(value)
        .downcast::<T>()
        .map_err(|_| ResolveError::DependencyType {
            name: name.to_string(),
            expected: type_name::<T>(),
        })
}
