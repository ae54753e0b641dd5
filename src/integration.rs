//! Output model
//!
//! The entity / metric set tree produced by one collection pass and its JSON
//! publication format (protocol version 3).
//!
//! ```json
//! {
//!   "name": "com.newrelic.jmx",
//!   "protocol_version": "3",
//!   "integration_version": "0.1.0",
//!   "data": [{
//!     "entity": {"name": "java.lang", "type": "jmx-domain", "id_attributes": [...]},
//!     "metrics": [{"event_type": "JavaLangSample", "bean": "type=Memory", ...}],
//!     "inventory": {},
//!     "events": []
//!   }]
//! }
//! ```

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

use crate::collector::AttributeValue;
use crate::error::CollectionError;
use crate::transformer::resolver::ResolvedMetric;

/// Integration name reported in every payload
pub const INTEGRATION_NAME: &str = "com.newrelic.jmx";

/// Payload protocol version
pub const PROTOCOL_VERSION: &str = "3";

/// Entity type of every domain entity
pub const ENTITY_TYPE: &str = "jmx-domain";

/// Root of the published payload
#[derive(Debug, Clone, Serialize)]
pub struct Integration {
    pub name: String,
    pub protocol_version: String,
    pub integration_version: String,
    pub data: Vec<Entity>,
}

impl Integration {
    pub fn new(integration_version: impl Into<String>) -> Self {
        Self {
            name: INTEGRATION_NAME.to_string(),
            protocol_version: PROTOCOL_VERSION.to_string(),
            integration_version: integration_version.into(),
            data: Vec::new(),
        }
    }

    /// The entity representing the monitored host itself
    pub fn local_entity(&mut self) -> &mut Entity {
        let index = match self.data.iter().position(|e| e.entity.is_none()) {
            Some(index) => index,
            None => {
                self.data.push(Entity::local());
                self.data.len() - 1
            }
        };
        &mut self.data[index]
    }

    /// Get or create the entity identified by name, type and id attributes
    ///
    /// # Errors
    /// Returns `CollectionError::EntityCreation` for an empty name.
    pub fn entity(
        &mut self,
        name: &str,
        entity_type: &str,
        mut id_attributes: Vec<IdAttribute>,
    ) -> Result<&mut Entity, CollectionError> {
        if name.is_empty() {
            return Err(CollectionError::EntityCreation(
                "entity name cannot be empty".to_string(),
            ));
        }
        id_attributes.sort_by(|a, b| a.key.cmp(&b.key));

        let metadata = EntityMetadata {
            name: name.to_string(),
            entity_type: entity_type.to_string(),
            id_attributes,
        };

        let index = match self
            .data
            .iter()
            .position(|e| e.entity.as_ref() == Some(&metadata))
        {
            Some(index) => index,
            None => {
                self.data.push(Entity::remote(metadata));
                self.data.len() - 1
            }
        };
        Ok(&mut self.data[index])
    }

    /// Drop entities over the metric limit, see [`enforce_metric_limit`]
    pub fn enforce_metric_limit(&mut self, limit: usize) {
        let entities = std::mem::take(&mut self.data);
        self.data = enforce_metric_limit(entities, limit);
    }

    /// Serialize the payload
    pub fn to_json(&self, pretty: bool) -> Result<String, serde_json::Error> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

/// Entity identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityMetadata {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub id_attributes: Vec<IdAttribute>,
}

/// Identity attribute of an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdAttribute {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Value")]
    pub value: String,
}

impl IdAttribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// One entity and its metric sets
#[derive(Debug, Clone, Serialize)]
pub struct Entity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<EntityMetadata>,
    pub metrics: Vec<MetricSet>,
    pub inventory: BTreeMap<String, serde_json::Value>,
    pub events: Vec<serde_json::Value>,
}

impl Entity {
    fn local() -> Self {
        Self {
            entity: None,
            metrics: Vec::new(),
            inventory: BTreeMap::new(),
            events: Vec::new(),
        }
    }

    fn remote(metadata: EntityMetadata) -> Self {
        Self {
            entity: Some(metadata),
            ..Self::local()
        }
    }

    /// Entity name; `None` for the local entity
    pub fn name(&self) -> Option<&str> {
        self.entity.as_ref().map(|m| m.name.as_str())
    }

    /// Total number of entries over all metric sets
    pub fn metric_count(&self) -> usize {
        self.metrics.iter().map(MetricSet::len).sum()
    }

    /// Append a metric set and return its index
    pub fn push_metric_set(&mut self, metric_set: MetricSet) -> usize {
        self.metrics.push(metric_set);
        self.metrics.len() - 1
    }
}

/// Flat key/value map of one bean: `event_type`, labels and metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetricSet {
    values: BTreeMap<String, AttributeValue>,
}

impl MetricSet {
    pub fn new(event_type: &str) -> Self {
        let mut values = BTreeMap::new();
        values.insert(
            "event_type".to_string(),
            AttributeValue::String(event_type.to_string()),
        );
        Self { values }
    }

    pub fn set_label(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values
            .insert(key.into(), AttributeValue::String(value.into()));
    }

    pub fn set_metric(&mut self, metric: ResolvedMetric) {
        self.values.insert(metric.name, metric.value);
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.values.get(key)
    }

    pub fn event_type(&self) -> Option<&str> {
        match self.values.get("event_type") {
            Some(AttributeValue::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Remove every entity whose metric count exceeds a non-zero `limit`
///
/// Surviving entities keep their order.
pub fn enforce_metric_limit(entities: Vec<Entity>, limit: usize) -> Vec<Entity> {
    if limit == 0 {
        return entities;
    }

    entities
        .into_iter()
        .filter(|entity| {
            let count = entity.metric_count();
            if count > limit {
                warn!(
                    domain = entity.name().unwrap_or("local"),
                    metrics = count,
                    limit,
                    "Domain exceeds the metric limit and will not be reported"
                );
                return false;
            }
            true
        })
        .collect()
}
