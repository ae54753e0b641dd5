//! Raw result classification
//!
//! Filters one bean query's raw results through its [`BeanSelector`] and
//! groups the survivors by the domain they actually came from. A wildcard
//! domain query can return beans from several domains.

use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::object_name::split_bean_name;
use super::rules::{AttributeSelector, BeanSelector};
use crate::collector::{AttributeValue, RawAttribute};
use crate::error::CollectionError;

/// One accepted attribute: `<props>,attr=<name>` without the domain, its
/// value and the selector that claimed it
#[derive(Debug, Clone)]
pub struct BeanAttrValue<'a> {
    pub bean_attr: String,
    pub value: AttributeValue,
    pub selector: &'a AttributeSelector,
}

/// Accepted attributes grouped by domain, plus the per-attribute failures
#[derive(Debug, Default)]
pub struct Classification<'a> {
    pub groups: BTreeMap<String, Vec<BeanAttrValue<'a>>>,
    pub errors: Vec<CollectionError>,
    /// Requested attributes the source could not read
    pub unreadable: Vec<String>,
}

impl Classification<'_> {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn attribute_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

/// Classify the results of querying `pattern` with `bean`
///
/// Error markers are dropped first, then excluded names, then anything no
/// selector claims. Only markers for requested attributes are warned about.
/// A query where nothing survives reports `NoDataForPattern`.
pub fn classify<'a>(
    pattern: &str,
    bean: &'a BeanSelector,
    results: Vec<RawAttribute>,
) -> Classification<'a> {
    let mut classification = Classification::default();

    for raw in results {
        let value = match raw.value {
            Ok(value) => value,
            Err(status) => {
                if bean.select(&raw.name).is_some() {
                    warn!(
                        query = %bean.query,
                        attribute = %raw.name,
                        status = %status,
                        "Failed to process attribute for query"
                    );
                    classification.unreadable.push(raw.name);
                } else {
                    debug!(attribute = %raw.name, status = %status, "Skipping unreadable attribute");
                }
                continue;
            }
        };

        let Some(selector) = bean.select(&raw.name) else {
            debug!(attribute = %raw.name, "Attribute not requested or excluded");
            continue;
        };

        match split_bean_name(&raw.name) {
            Ok((domain, bean_attr)) => {
                classification
                    .groups
                    .entry(domain.to_string())
                    .or_default()
                    .push(BeanAttrValue {
                        bean_attr: bean_attr.to_string(),
                        value,
                        selector,
                    });
            }
            Err(e) => classification.errors.push(e),
        }
    }

    if classification.is_empty() {
        classification.errors.push(CollectionError::no_data(pattern));
    }

    classification
}
