//! Collection pass driver
//!
//! Runs every compiled domain definition against an [`AttributeSource`],
//! feeds the results through the transformer pipeline and publishes the
//! resulting [`Integration`] as JSON on stdout.

use std::io::Write;
use std::time::Duration;
use tokio::signal;
use tracing::{debug, error, info, instrument, warn};

use crate::collector::AttributeSource;
use crate::config::{CollectionDefinition, ConfigError};
use crate::error::{AppError, AppResult, CollectionError};
use crate::integration::Integration;
use crate::transformer::{classify, compile, DomainDefinition, TransformEngine};

/// Options of one run, independent of where the collection comes from
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Maximum metrics per entity, 0 disables the check
    pub metric_limit: usize,
    /// Indent the published JSON
    pub pretty: bool,
    /// Time between passes in long-running mode
    pub interval: Duration,
    /// Time between heartbeats in long-running mode
    pub heartbeat_interval: Duration,
    /// Version reported in the payload
    pub integration_version: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            metric_limit: 200,
            pretty: false,
            interval: Duration::from_secs(30),
            heartbeat_interval: Duration::from_secs(5),
            integration_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Load and compile the collection definitions of a run
///
/// Every file of the comma separated `files` list is compiled on its own,
/// then the inline JSON `config`. Each entry of the result is one
/// independent collection.
///
/// # Errors
/// Any unreadable, unparsable or invalid definition fails the whole run.
pub fn load_collections(
    files: Option<&str>,
    config: Option<&str>,
) -> Result<Vec<Vec<DomainDefinition>>, ConfigError> {
    let mut collections = Vec::new();

    if let Some(files) = files.filter(|f| !f.trim().is_empty()) {
        for definition in CollectionDefinition::load_files(files)? {
            collections.push(compile(&definition)?);
        }
    }

    if let Some(config) = config.filter(|c| !c.trim().is_empty()) {
        let definition = CollectionDefinition::from_json_str(config).inspect_err(|e| {
            error!(error = %e, "Failed to parse collection definition config");
        })?;
        collections.push(compile(&definition)?);
    }

    Ok(collections)
}

/// Run one collection over every domain definition
///
/// Per-query and per-bean failures are logged in one batch per domain and
/// never stop the pass.
///
/// # Errors
/// Returns `CollectionError::Connection` as soon as the source reports a
/// fatal transport error; everything collected so far stays in
/// `integration`.
#[instrument(skip_all, fields(domains = domains.len()))]
pub async fn run_collection<S>(
    domains: &[DomainDefinition],
    source: &S,
    integration: &mut Integration,
    engine: &TransformEngine,
) -> Result<(), CollectionError>
where
    S: AttributeSource + ?Sized,
{
    for domain in domains {
        let mut handling_errors: Vec<CollectionError> = Vec::new();

        for bean in &domain.beans {
            let pattern = domain.query_pattern(bean);

            let results = match source.query(&pattern).await {
                Ok(results) => results,
                Err(e) if e.is_fatal() => return Err(CollectionError::Connection(e)),
                Err(e) => {
                    handling_errors.push(CollectionError::NoDataForPattern {
                        pattern,
                        reason: Some(e.to_string()),
                    });
                    continue;
                }
            };

            if results.is_empty() {
                handling_errors.push(CollectionError::no_data(pattern));
                continue;
            }

            debug!(pattern = %pattern, results = results.len(), "Bean query answered");

            let classification = classify(&pattern, bean, results);
            handling_errors.extend(classification.errors);

            for (domain_name, values) in classification.groups {
                let errors = engine.insert_domain_metrics(
                    integration,
                    &domain.event_type,
                    &domain_name,
                    &bean.query,
                    values,
                );
                handling_errors.extend(errors);
            }
        }

        if !handling_errors.is_empty() {
            error!(domain = %domain.domain, "Failed to parse some responses for domain");
            for err in &handling_errors {
                error!(domain = %domain.domain, error = %err, "Can't parse response");
            }
        }
    }

    Ok(())
}

/// One full pass over every collection, limit enforced
pub async fn collect_once<S>(
    collections: &[Vec<DomainDefinition>],
    source: &S,
    engine: &TransformEngine,
    options: &RunOptions,
) -> Integration
where
    S: AttributeSource + ?Sized,
{
    let mut integration = Integration::new(options.integration_version.as_str());

    for domains in collections {
        if let Err(e) = run_collection(domains, source, &mut integration, engine).await {
            error!(error = %e, "Failed to complete collection");
        }
    }

    integration.enforce_metric_limit(options.metric_limit);
    integration
}

/// Write the payload as one line (or an indented document) to stdout
pub fn publish(integration: &Integration, pretty: bool) -> AppResult<()> {
    let json = integration
        .to_json(pretty)
        .map_err(|e| AppError::Publish(e.to_string()))?;

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", json)
        .and_then(|_| stdout.flush())
        .map_err(|e| AppError::Publish(e.to_string()))
}

/// Collect and publish every `interval` until Ctrl-C or SIGTERM
///
/// A heartbeat `{}` is printed every `heartbeat_interval` while running.
pub async fn run_long_running<S>(
    collections: &[Vec<DomainDefinition>],
    source: &S,
    engine: &TransformEngine,
    options: &RunOptions,
) -> AppResult<()>
where
    S: AttributeSource + ?Sized,
{
    info!(
        interval_secs = options.interval.as_secs(),
        heartbeat_secs = options.heartbeat_interval.as_secs(),
        "Starting long-running collection"
    );

    let heartbeat = tokio::spawn(heartbeat(options.heartbeat_interval));
    let mut ticker = tokio::time::interval(options.interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                let integration = collect_once(collections, source, engine, options).await;
                if let Err(e) = publish(&integration, options.pretty) {
                    error!(error = %e, "Failed to publish metrics");
                }
            }
        }
    }

    heartbeat.abort();
    info!("Long-running collection stopped");
    Ok(())
}

async fn heartbeat(period: Duration) {
    let mut ticker = tokio::time::interval(period);
    // first tick completes immediately
    ticker.tick().await;
    loop {
        ticker.tick().await;
        debug!("Sending heartbeat");
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{{}}").and_then(|_| stdout.flush()) {
            warn!(error = %e, "Failed to write heartbeat");
        }
    }
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{CollectResult, RawAttribute};
    use crate::error::CollectorError;
    use crate::transformer::CollectionContext;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Canned answers per query pattern
    #[derive(Default)]
    struct StaticSource {
        answers: HashMap<String, Vec<RawAttribute>>,
        fatal: bool,
        queried: Mutex<Vec<String>>,
    }

    impl StaticSource {
        fn with(mut self, pattern: &str, results: Vec<RawAttribute>) -> Self {
            self.answers.insert(pattern.to_string(), results);
            self
        }
    }

    #[async_trait]
    impl AttributeSource for StaticSource {
        async fn query(&self, pattern: &str) -> CollectResult<Vec<RawAttribute>> {
            self.queried.lock().unwrap().push(pattern.to_string());
            if self.fatal {
                return Err(CollectorError::ConnectionFailed("refused".to_string()));
            }
            self.answers
                .get(pattern)
                .cloned()
                .ok_or_else(|| CollectorError::Jolokia {
                    status: 404,
                    message: "javax.management.InstanceNotFoundException".to_string(),
                })
        }
    }

    fn domains(yaml: &str) -> Vec<DomainDefinition> {
        compile(&CollectionDefinition::from_yaml_str(yaml).unwrap()).unwrap()
    }

    fn engine() -> TransformEngine {
        TransformEngine::new(CollectionContext::new("localhost", "9999"))
    }

    const YAML: &str = r#"
collect:
  - domain: java.lang
    beans:
      - query: type=Threading
      - query: type=Missing
      - query: type=Memory
        attributes:
          - HeapMemoryUsage.used
"#;

    #[tokio::test]
    async fn test_run_collection_continues_past_query_errors() {
        let source = StaticSource::default()
            .with(
                "java.lang:type=Threading",
                vec![RawAttribute::ok("java.lang:type=Threading,attr=ThreadCount", 12)],
            )
            .with(
                "java.lang:type=Memory",
                vec![
                    RawAttribute::ok("java.lang:type=Memory,attr=HeapMemoryUsage.used", 100),
                    RawAttribute::ok("java.lang:type=Memory,attr=HeapMemoryUsage.max", 400),
                ],
            );
        let mut integration = Integration::new("test");

        run_collection(&domains(YAML), &source, &mut integration, &engine())
            .await
            .unwrap();

        assert_eq!(
            *source.queried.lock().unwrap(),
            vec![
                "java.lang:type=Threading",
                "java.lang:type=Missing",
                "java.lang:type=Memory"
            ]
        );
        assert_eq!(integration.data.len(), 1);
        let metrics = &integration.data[0].metrics;
        assert_eq!(metrics.len(), 2);
        assert!(metrics[1].get("HeapMemoryUsage.used").is_some());
        assert!(metrics[1].get("HeapMemoryUsage.max").is_none());
    }

    #[tokio::test]
    async fn test_run_collection_aborts_on_fatal_error() {
        let source = StaticSource {
            fatal: true,
            ..Default::default()
        };
        let mut integration = Integration::new("test");

        let result = run_collection(&domains(YAML), &source, &mut integration, &engine()).await;

        assert!(matches!(result, Err(CollectionError::Connection(_))));
        assert_eq!(source.queried.lock().unwrap().len(), 1);
        assert!(integration.data.is_empty());
    }

    #[tokio::test]
    async fn test_collect_once_enforces_limit() {
        let source = StaticSource::default().with(
            "java.lang:type=Threading",
            vec![RawAttribute::ok("java.lang:type=Threading,attr=ThreadCount", 12)],
        );
        let options = RunOptions {
            metric_limit: 3,
            ..Default::default()
        };

        let integration = collect_once(&[domains(YAML)], &source, &engine(), &options).await;
        assert!(integration.data.is_empty());

        let options = RunOptions {
            metric_limit: 0,
            ..Default::default()
        };
        let integration = collect_once(&[domains(YAML)], &source, &engine(), &options).await;
        assert_eq!(integration.data.len(), 1);
    }

    #[test]
    fn test_load_collections_inline_config() {
        let config = r#"{"collect":[{"domain":"java.lang","beans":[{"query":"type=Memory"}]}]}"#;
        let collections = load_collections(None, Some(config)).unwrap();
        assert_eq!(collections.len(), 1);
        assert_eq!(collections[0][0].event_type, "JavaLangSample");
    }

    #[test]
    fn test_load_collections_rejects_invalid_definition() {
        let config = r#"{"collect":[{"domain":"java.*","beans":[]}]}"#;
        assert!(matches!(
            load_collections(None, Some(config)),
            Err(ConfigError::WildcardEventType(_))
        ));
        assert!(matches!(
            load_collections(Some("relative.yml"), None),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_load_collections_empty() {
        assert!(load_collections(None, None).unwrap().is_empty());
        assert!(load_collections(Some(""), Some("  ")).unwrap().is_empty());
    }
}
