//! Entity and metric set construction
//!
//! [`TransformEngine`] places classified attributes into the output tree.
//! Which entity a domain lands in depends on the [`AddressingMode`] carried
//! by the run's [`CollectionContext`]; within an entity every unique bean
//! gets one labeled [`MetricSet`].

use std::collections::HashMap;
use tracing::{debug, instrument};

use super::classify::BeanAttrValue;
use super::object_name::{bean_name, parse_key_properties};
use super::resolver::resolve;
use crate::error::CollectionError;
use crate::integration::{Entity, IdAttribute, Integration, MetricSet, ENTITY_TYPE};

/// How domain entities are identified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressingMode {
    /// `<domain>` tagged with host and port id attributes
    #[default]
    Default,
    /// Everything goes into the single local entity
    Local,
    /// `<domain>:<endpoint>` without id attributes
    Remote,
}

/// Run-scoped settings the builder needs
#[derive(Debug, Clone)]
pub struct CollectionContext {
    pub mode: AddressingMode,
    pub host: String,
    pub port: String,
    /// Explicit JMX service URL, overrides host and port for identity
    pub connection_url: Option<String>,
    /// Value of the `host` label on every metric set
    pub jmx_host_label: String,
}

impl CollectionContext {
    pub fn new(host: impl Into<String>, port: impl Into<String>) -> Self {
        let host = host.into();
        Self {
            mode: AddressingMode::Default,
            jmx_host_label: host.clone(),
            host,
            port: port.into(),
            connection_url: None,
        }
    }

    pub fn with_mode(mut self, mode: AddressingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_connection_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.connection_url = (!url.is_empty()).then_some(url);
        self
    }

    pub fn with_jmx_host_label(mut self, label: impl Into<String>) -> Self {
        self.jmx_host_label = label.into();
        self
    }
}

/// Service access point of a JMX service URL
///
/// `service:jmx:rmi:///jndi/rmi://tomcat:9999/jmxrmi` becomes
/// `tomcat:9999/jmxrmi`. Any URL that does not split into exactly three
/// `://` segments is returned unchanged.
pub fn connection_url_sap(connection_url: &str) -> &str {
    let segments: Vec<&str> = connection_url.split("://").collect();
    match segments.as_slice() {
        [_, _, sap] => sap,
        _ => connection_url,
    }
}

/// Host and port of a JMX service URL, empty strings when not derivable
pub fn connection_url_host_port(connection_url: &str) -> (String, String) {
    let sap = connection_url_sap(connection_url);
    let host_port = sap.split('/').next().unwrap_or_default();
    let parts: Vec<&str> = host_port.split(':').collect();
    match parts.as_slice() {
        [host, port] => (host.to_string(), port.to_string()),
        _ => (String::new(), String::new()),
    }
}

/// `host:port`, with IPv6 literals bracketed
pub fn join_host_port(host: &str, port: &str) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// Builds entities and metric sets from classified attributes
#[derive(Debug, Clone)]
pub struct TransformEngine {
    context: CollectionContext,
}

impl TransformEngine {
    pub fn new(context: CollectionContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &CollectionContext {
        &self.context
    }

    fn entity<'i>(
        &self,
        integration: &'i mut Integration,
        domain: &str,
    ) -> Result<&'i mut Entity, CollectionError> {
        let ctx = &self.context;
        match ctx.mode {
            AddressingMode::Local => Ok(integration.local_entity()),
            AddressingMode::Remote => {
                let endpoint = match &ctx.connection_url {
                    Some(url) => connection_url_sap(url).to_string(),
                    None => join_host_port(&ctx.host, &ctx.port),
                };
                integration.entity(&format!("{}:{}", domain, endpoint), ENTITY_TYPE, vec![])
            }
            AddressingMode::Default => {
                let (host, port) = match &ctx.connection_url {
                    Some(url) => connection_url_host_port(url),
                    None => (ctx.host.clone(), ctx.port.clone()),
                };
                integration.entity(
                    domain,
                    ENTITY_TYPE,
                    vec![IdAttribute::new("host", host), IdAttribute::new("port", port)],
                )
            }
        }
    }

    fn new_metric_set(
        &self,
        event_type: &str,
        domain: &str,
        query: &str,
        bean: &str,
        entity_name: Option<&str>,
    ) -> Result<MetricSet, CollectionError> {
        let key_properties = parse_key_properties(bean)?;

        let mut metric_set = MetricSet::new(event_type);
        metric_set.set_label("query", query);
        metric_set.set_label("domain", domain);
        metric_set.set_label("host", self.context.jmx_host_label.as_str());
        metric_set.set_label("bean", bean);

        if self.context.mode != AddressingMode::Local {
            if let Some(name) = entity_name {
                metric_set.set_label("entityName", format!("domain:{}", name));
                metric_set.set_label("displayName", name);
            }
        }

        for (key, value) in key_properties {
            metric_set.set_label(format!("key:{}", key), value);
        }

        Ok(metric_set)
    }

    /// Insert one domain's classified attributes
    ///
    /// Failures are scoped: a bean whose labels cannot be built is skipped
    /// with all its attributes, an attribute that cannot be resolved is
    /// skipped alone. Only an entity creation failure drops the whole group.
    #[instrument(skip(self, integration, values), fields(count = values.len()))]
    pub fn insert_domain_metrics(
        &self,
        integration: &mut Integration,
        event_type: &str,
        domain: &str,
        query: &str,
        values: Vec<BeanAttrValue<'_>>,
    ) -> Vec<CollectionError> {
        let entity = match self.entity(integration, domain) {
            Ok(entity) => entity,
            Err(e) => return vec![e],
        };
        let entity_name = entity.name().map(str::to_string);

        // bean name -> metric set index, None once the bean failed
        let mut metric_sets: HashMap<String, Option<usize>> = HashMap::new();
        let mut errors = Vec::new();

        for attr in values {
            let bean = match bean_name(&attr.bean_attr) {
                Ok(bean) => bean,
                Err(e) => {
                    errors.push(e);
                    continue;
                }
            };

            let index = match metric_sets.get(bean) {
                Some(Some(index)) => *index,
                Some(None) => continue,
                None => match self.new_metric_set(
                    event_type,
                    domain,
                    query,
                    bean,
                    entity_name.as_deref(),
                ) {
                    Ok(metric_set) => {
                        let index = entity.push_metric_set(metric_set);
                        metric_sets.insert(bean.to_string(), Some(index));
                        index
                    }
                    Err(e) => {
                        metric_sets.insert(bean.to_string(), None);
                        errors.push(e);
                        continue;
                    }
                },
            };

            match resolve(attr.selector, &attr.bean_attr, attr.value) {
                Ok(metric) => {
                    debug!(metric = %metric.name, kind = %metric.kind, "Metric resolved");
                    entity.metrics[index].set_metric(metric);
                }
                Err(e) => errors.push(e),
            }
        }

        errors
    }
}
