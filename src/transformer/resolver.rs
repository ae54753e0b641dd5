//! Metric name and kind resolution

use super::object_name::attr_name;
use super::rules::{AttributeSelector, MetricKind};
use crate::collector::AttributeValue;
use crate::error::CollectionError;

/// Kind inferred for a value when the selector does not declare one
pub fn infer_kind(value: &AttributeValue) -> MetricKind {
    match value {
        AttributeValue::Integer(_) | AttributeValue::Float(_) => MetricKind::Gauge,
        AttributeValue::String(_) | AttributeValue::Boolean(_) => MetricKind::Attribute,
    }
}

/// A metric ready to be stored in a metric set
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMetric {
    pub name: String,
    pub kind: MetricKind,
    pub value: AttributeValue,
}

/// Resolve the published name, kind and value of one attribute
///
/// Attribute-kind values are stored as their string form (floats print as
/// `1.23456789e+08` once the exponent reaches 6), every other kind keeps the
/// native value.
pub fn resolve(
    selector: &AttributeSelector,
    bean_attr: &str,
    value: AttributeValue,
) -> Result<ResolvedMetric, CollectionError> {
    let name = match selector.metric_name() {
        Some(name) => name.to_string(),
        None => attr_name(bean_attr)?.to_string(),
    };

    let kind = selector.metric_kind().unwrap_or_else(|| infer_kind(&value));

    let value = match (kind, value) {
        (MetricKind::Attribute, AttributeValue::String(s)) => AttributeValue::String(s),
        (MetricKind::Attribute, other) => AttributeValue::String(other.to_string()),
        (_, other) => other,
    };

    Ok(ResolvedMetric { name, kind, value })
}
