use async_trait::async_trait;
use datastore_config::{
    AsyncOptions, ConfigError, DatastoreOptions, FromProviders, OptionsFactory, OptionsSource,
    Providers, ResolveError,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn options_for(project: &str) -> DatastoreOptions {
    DatastoreOptions {
        project_id: Some(project.to_string()),
        ..Default::default()
    }
}

struct FixedFactory {
    project: String,
}

#[async_trait]
impl OptionsFactory for FixedFactory {
    async fn create_options(&self) -> anyhow::Result<DatastoreOptions> {
        Ok(options_for(&self.project))
    }
}

struct SettingsBackedFactory {
    project: Arc<String>,
}

impl FromProviders for SettingsBackedFactory {
    fn from_providers(providers: &Providers) -> anyhow::Result<Self> {
        Ok(Self {
            project: providers.get::<String>("settings.project")?,
        })
    }
}

#[async_trait]
impl OptionsFactory for SettingsBackedFactory {
    async fn create_options(&self) -> anyhow::Result<DatastoreOptions> {
        Ok(options_for(&self.project))
    }
}

// ── Validation ───────────────────────────────────────────────────

#[test]
fn no_strategy_is_rejected() {
    let err = AsyncOptions::new().into_source().unwrap_err();
    assert_eq!(err, ConfigError::NoStrategy);
}

#[test]
fn inject_alone_is_not_a_strategy() {
    let err = AsyncOptions::new()
        .inject(["project"])
        .into_source()
        .unwrap_err();
    assert_eq!(err, ConfigError::NoStrategy);
}

#[test]
fn factory_and_class_conflict() {
    let err = AsyncOptions::new()
        .use_factory(|_| async { Ok(DatastoreOptions::default()) })
        .use_class::<SettingsBackedFactory>()
        .into_source()
        .unwrap_err();
    assert_eq!(
        err,
        ConfigError::ConflictingStrategies(vec!["use_factory", "use_class"])
    );
}

#[test]
fn existing_and_class_conflict() {
    let err = AsyncOptions::new()
        .use_existing("options")
        .use_class::<SettingsBackedFactory>()
        .into_source()
        .unwrap_err();
    assert_eq!(
        err,
        ConfigError::ConflictingStrategies(vec!["use_existing", "use_class"])
    );
    assert!(err.to_string().contains("use_existing + use_class"));
}

#[test]
fn factory_and_existing_conflict() {
    let err = AsyncOptions::new()
        .use_factory(|_| async { Ok(DatastoreOptions::default()) })
        .use_existing("options")
        .into_source()
        .unwrap_err();
    assert!(matches!(err, ConfigError::ConflictingStrategies(ref s) if s.len() == 2));
}

#[test]
fn each_single_strategy_is_accepted() {
    let factory = AsyncOptions::new()
        .use_factory(|_| async { Ok(DatastoreOptions::default()) })
        .into_source()
        .unwrap();
    assert_eq!(factory.strategy(), "use_factory");

    let existing = AsyncOptions::new()
        .use_existing("options")
        .into_source()
        .unwrap();
    assert_eq!(existing.strategy(), "use_existing");

    let class = AsyncOptions::new()
        .use_class::<SettingsBackedFactory>()
        .into_source()
        .unwrap();
    assert_eq!(class.strategy(), "use_class");
    assert!(class.is_deferred());
}

#[test]
fn inject_without_factory_is_ignored() {
    let source = AsyncOptions::new()
        .use_existing("options")
        .inject(["unused"])
        .into_source()
        .unwrap();
    assert!(matches!(source, OptionsSource::Existing(ref name) if name == "options"));
}

// ── Immediate ────────────────────────────────────────────────────

#[tokio::test]
async fn immediate_options_are_returned_unchanged() {
    let source = OptionsSource::from(options_for("static"));
    assert!(!source.is_deferred());

    let options = source.resolve(&Providers::new()).await.unwrap();
    assert_eq!(options, options_for("static"));
}

// ── use_factory ──────────────────────────────────────────────────

#[tokio::test]
async fn factory_receives_injected_values_in_order() {
    let providers = Providers::new()
        .with("project", String::from("p1"))
        .with("namespace", String::from("tenant-a"));

    let source = AsyncOptions::new()
        .use_factory(|deps| async move {
            let names: Vec<String> = deps.names().map(str::to_string).collect();
            assert_eq!(names, vec!["project", "namespace"]);
            let project = deps.at::<String>(0)?;
            let namespace = deps.get::<String>("namespace")?;
            Ok(DatastoreOptions {
                project_id: Some(project.as_ref().clone()),
                namespace: Some(namespace.as_ref().clone()),
                ..Default::default()
            })
        })
        .inject(["project", "namespace"])
        .into_source()
        .unwrap();

    let options = source.resolve(&providers).await.unwrap();
    assert_eq!(options.project_id.as_deref(), Some("p1"));
    assert_eq!(options.namespace.as_deref(), Some("tenant-a"));
}

#[tokio::test]
async fn missing_injected_dependency_fails_before_factory_runs() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let source = AsyncOptions::new()
        .use_factory(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(DatastoreOptions::default()) }
        })
        .inject(["absent"])
        .into_source()
        .unwrap();

    let err = source.resolve(&Providers::new()).await.unwrap_err();
    assert!(matches!(err, ResolveError::MissingDependency(ref name) if name == "absent"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn mistyped_dependency_is_reported() {
    let providers = Providers::new().with("project", 42_u32);
    let source = AsyncOptions::new()
        .use_factory(|deps| async move {
            let project = deps.get::<String>("project")?;
            Ok(options_for(&project))
        })
        .inject(["project"])
        .into_source()
        .unwrap();

    let err = source.resolve(&providers).await.unwrap_err();
    let ResolveError::Factory(inner) = err else {
        panic!("expected factory failure, got {err:?}");
    };
    let cause = inner.downcast_ref::<ResolveError>().unwrap();
    assert!(matches!(cause, ResolveError::DependencyType { name, .. } if name == "project"));
}

#[tokio::test]
async fn factory_error_is_wrapped() {
    let source = AsyncOptions::new()
        .use_factory(|_| async { anyhow::bail!("secret manager unavailable") })
        .into_source()
        .unwrap();

    let err = source.resolve(&Providers::new()).await.unwrap_err();
    assert!(matches!(err, ResolveError::Factory(_)));
    assert!(err.to_string().contains("secret manager unavailable"));
}

// ── use_existing ─────────────────────────────────────────────────

#[tokio::test]
async fn existing_factory_is_looked_up_by_name() {
    let providers = Providers::new().with_factory(
        "options",
        Arc::new(FixedFactory {
            project: "from-existing".into(),
        }),
    );
    let source = AsyncOptions::new()
        .use_existing("options")
        .into_source()
        .unwrap();

    let options = source.resolve(&providers).await.unwrap();
    assert_eq!(options.project_id.as_deref(), Some("from-existing"));
}

#[tokio::test]
async fn unknown_existing_factory_fails() {
    let source = AsyncOptions::new()
        .use_existing("options")
        .into_source()
        .unwrap();

    let err = source.resolve(&Providers::new()).await.unwrap_err();
    assert!(matches!(err, ResolveError::UnknownFactory(ref name) if name == "options"));
}

// ── use_class ────────────────────────────────────────────────────

#[tokio::test]
async fn class_is_built_from_providers() {
    let providers = Providers::new().with("settings.project", String::from("from-class"));
    let source = AsyncOptions::new()
        .use_class::<SettingsBackedFactory>()
        .into_source()
        .unwrap();

    let options = source.resolve(&providers).await.unwrap();
    assert_eq!(options.project_id.as_deref(), Some("from-class"));
}

#[tokio::test]
async fn class_construction_failure_names_the_type() {
    let source = AsyncOptions::new()
        .use_class::<SettingsBackedFactory>()
        .into_source()
        .unwrap();

    let err = source.resolve(&Providers::new()).await.unwrap_err();
    let ResolveError::Construct { type_name, .. } = &err else {
        panic!("expected construct failure, got {err:?}");
    };
    assert!(type_name.ends_with("SettingsBackedFactory"));
    assert!(err.to_string().contains("settings.project"));
}

// ── Timeout ──────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn slow_factory_times_out() {
    let source = AsyncOptions::new()
        .use_factory(|_| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(DatastoreOptions::default())
        })
        .into_source()
        .unwrap();

    let err = source
        .resolve_within(&Providers::new(), Some(Duration::from_secs(5)))
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::Timeout(limit) if limit == Duration::from_secs(5)));
}

#[tokio::test]
async fn no_limit_waits_for_the_factory() {
    let source = AsyncOptions::new()
        .use_factory(|_| async {
            tokio::task::yield_now().await;
            Ok(options_for("eventual"))
        })
        .into_source()
        .unwrap();

    let options = source.resolve_within(&Providers::new(), None).await.unwrap();
    assert_eq!(options.project_id.as_deref(), Some("eventual"));
}
