//! Collection definition compiler
//!
//! Turns the user-facing [`CollectionDefinition`] into immutable, compiled
//! matchers. Every regex is compiled exactly once here.
//!
//! # Example
//!
//! ```ignore
//! use rjmx_collector::config::CollectionDefinition;
//! use rjmx_collector::transformer::rules::compile;
//!
//! let def = CollectionDefinition::from_yaml_str(yaml)?;
//! let domains = compile(&def)?;
//! assert_eq!(domains[0].event_type, "JavaLangSample");
//! ```

use regex::Regex;
use std::fmt;
use std::str::FromStr;

use crate::config::{AttributeSpec, BeanSpec, CollectionDefinition, ConfigError, DomainSpec};

/// Kind of a published metric
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Point-in-time numeric value
    Gauge,
    /// Difference since the previous sample
    Delta,
    /// Opaque string value
    Attribute,
    /// Per-second rate
    Rate,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Delta => "delta",
            MetricKind::Attribute => "attribute",
            MetricKind::Rate => "rate",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gauge" => Ok(MetricKind::Gauge),
            "delta" => Ok(MetricKind::Delta),
            "attribute" => Ok(MetricKind::Attribute),
            "rate" => Ok(MetricKind::Rate),
            other => Err(ConfigError::InvalidMetricType(other.to_string())),
        }
    }
}

/// Compiled attribute selector
///
/// The pattern only ever matches a trailing `attr=<selector>` suffix of a
/// fully qualified `<props>,attr=<name>` string.
#[derive(Debug, Clone)]
pub struct AttributeSelector {
    pattern: Regex,
    metric_name: Option<String>,
    metric_kind: Option<MetricKind>,
}

impl AttributeSelector {
    /// Selector for one literal attribute name
    pub fn literal(attr: &str) -> Result<Self, ConfigError> {
        Self::from_suffix(&regex::escape(attr))
    }

    /// Selector for a user supplied attribute regex
    pub fn regex(attr_regex: &str) -> Result<Self, ConfigError> {
        Self::from_suffix(&format!("(?:{})", attr_regex))
    }

    /// Selector claiming every attribute
    pub fn catch_all() -> Self {
        Self {
            pattern: Regex::new("attr=.*$").expect("Invalid catch-all regex"),
            metric_name: None,
            metric_kind: None,
        }
    }

    fn from_suffix(suffix: &str) -> Result<Self, ConfigError> {
        let pattern = format!("attr={}$", suffix);
        let pattern = Regex::new(&pattern).map_err(|source| ConfigError::InvalidPattern {
            pattern: pattern.clone(),
            source,
        })?;

        Ok(Self {
            pattern,
            metric_name: None,
            metric_kind: None,
        })
    }

    /// Override the published metric name
    pub fn with_metric_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.metric_name = (!name.is_empty()).then_some(name);
        self
    }

    /// Override the inferred metric kind
    pub fn with_metric_kind(mut self, kind: MetricKind) -> Self {
        self.metric_kind = Some(kind);
        self
    }

    pub fn matches(&self, bean_attr: &str) -> bool {
        self.pattern.is_match(bean_attr)
    }

    pub fn metric_name(&self) -> Option<&str> {
        self.metric_name.as_deref()
    }

    pub fn metric_kind(&self) -> Option<MetricKind> {
        self.metric_kind
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    fn from_spec(spec: &AttributeSpec) -> Result<Self, ConfigError> {
        let entry = match spec {
            AttributeSpec::Name(name) => return Self::literal(name),
            AttributeSpec::Detailed(entry) => entry,
        };

        let mut selector = match (&entry.attr, &entry.attr_regex) {
            (Some(attr), None) => Self::literal(attr)?,
            (None, Some(attr_regex)) => Self::regex(attr_regex)?,
            (Some(_), Some(_)) => {
                return Err(ConfigError::ValidationError(
                    "attribute entry cannot define both attr and attr_regex".to_string(),
                ))
            }
            (None, None) => {
                return Err(ConfigError::ValidationError(
                    "attribute entry must define attr or attr_regex".to_string(),
                ))
            }
        };

        if let Some(name) = &entry.metric_name {
            selector = selector.with_metric_name(name.as_str());
        }
        if let Some(kind) = &entry.metric_type {
            selector = selector.with_metric_kind(kind.parse()?);
        }

        Ok(selector)
    }
}

/// Compiled bean query
#[derive(Debug, Clone)]
pub struct BeanSelector {
    /// Key property pattern, queried as `<domain>:<query>`
    pub query: String,
    exclude: Vec<Regex>,
    attributes: Vec<AttributeSelector>,
}

impl BeanSelector {
    /// Build a selector; an empty attribute list collects everything
    pub fn new(
        query: impl Into<String>,
        exclude: Vec<Regex>,
        attributes: Vec<AttributeSelector>,
    ) -> Self {
        let attributes = if attributes.is_empty() {
            vec![AttributeSelector::catch_all()]
        } else {
            attributes
        };

        Self {
            query: query.into(),
            exclude,
            attributes,
        }
    }

    fn from_spec(spec: &BeanSpec) -> Result<Self, ConfigError> {
        let exclude = spec
            .exclude_regex
            .as_ref()
            .map(|e| e.patterns())
            .unwrap_or_default()
            .into_iter()
            .map(|p| {
                Regex::new(p).map_err(|source| ConfigError::InvalidPattern {
                    pattern: p.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let attributes = spec
            .attributes
            .iter()
            .map(AttributeSelector::from_spec)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(spec.query.clone(), exclude, attributes))
    }

    /// Whether any exclude pattern matches the fully qualified name
    pub fn is_excluded(&self, name: &str) -> bool {
        self.exclude.iter().any(|re| re.is_match(name))
    }

    /// First declared selector claiming the attribute, if any.
    /// Exclusion wins over every selector.
    pub fn select(&self, name: &str) -> Option<&AttributeSelector> {
        if self.is_excluded(name) {
            return None;
        }
        self.attributes.iter().find(|a| a.matches(name))
    }

    pub fn attributes(&self) -> &[AttributeSelector] {
        &self.attributes
    }

    pub fn exclude_count(&self) -> usize {
        self.exclude.len()
    }
}

/// Compiled `collect` entry
#[derive(Debug, Clone)]
pub struct DomainDefinition {
    pub domain: String,
    pub event_type: String,
    pub beans: Vec<BeanSelector>,
}

impl DomainDefinition {
    fn from_spec(spec: &DomainSpec) -> Result<Self, ConfigError> {
        let beans = spec
            .beans
            .iter()
            .map(BeanSelector::from_spec)
            .collect::<Result<Vec<_>, _>>()?;

        let event_type = match spec.event_type.as_deref() {
            Some(event_type) if !event_type.is_empty() => event_type.to_string(),
            _ => generate_event_type(&spec.domain)?,
        };

        Ok(Self {
            domain: spec.domain.clone(),
            event_type,
            beans,
        })
    }

    /// Pattern handed to the transport for one bean selector
    pub fn query_pattern(&self, bean: &BeanSelector) -> String {
        format!("{}:{}", self.domain, bean.query)
    }
}

/// Compile a whole collection definition
///
/// # Errors
/// Fails on the first invalid regex, unknown metric type, ambiguous
/// attribute entry or wildcarded domain without an event type.
pub fn compile(definition: &CollectionDefinition) -> Result<Vec<DomainDefinition>, ConfigError> {
    definition
        .collect
        .iter()
        .map(DomainDefinition::from_spec)
        .collect()
}

/// Derive an event type from a domain: `java.lang` becomes `JavaLangSample`
pub fn generate_event_type(domain: &str) -> Result<String, ConfigError> {
    if domain.contains('*') {
        tracing::error!(
            domain = %domain,
            "Cannot generate an event type for a wildcarded domain, define event_type in the collection definition"
        );
        return Err(ConfigError::WildcardEventType(domain.to_string()));
    }

    let mut event_type: String = domain.split('.').map(title_case).collect();
    event_type.push_str("Sample");
    Ok(event_type)
}

/// Upper-case the first letter of every word. Letters, digits and `_`
/// continue a word, anything else separates words.
fn title_case(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut at_word_start = true;
    for c in segment.chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !(c.is_alphanumeric() || c == '_');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_yaml(yaml: &str) -> Result<Vec<DomainDefinition>, ConfigError> {
        compile(&CollectionDefinition::from_yaml_str(yaml).unwrap())
    }

    #[test]
    fn test_metric_kind_from_str() {
        assert_eq!("gauge".parse::<MetricKind>().unwrap(), MetricKind::Gauge);
        assert_eq!("delta".parse::<MetricKind>().unwrap(), MetricKind::Delta);
        assert_eq!(
            "attribute".parse::<MetricKind>().unwrap(),
            MetricKind::Attribute
        );
        assert_eq!("rate".parse::<MetricKind>().unwrap(), MetricKind::Rate);
        assert!(matches!(
            "counter".parse::<MetricKind>(),
            Err(ConfigError::InvalidMetricType(_))
        ));
    }

    #[test]
    fn test_generate_event_type() {
        assert_eq!(generate_event_type("java.lang").unwrap(), "JavaLangSample");
        assert_eq!(
            generate_event_type("kafka.server").unwrap(),
            "KafkaServerSample"
        );
        assert_eq!(
            generate_event_type("com.my-app.x_y").unwrap(),
            "ComMy-AppX_ySample"
        );
        assert!(matches!(
            generate_event_type("java.*"),
            Err(ConfigError::WildcardEventType(_))
        ));
    }

    #[test]
    fn test_literal_selector_is_escaped_and_anchored() {
        let selector = AttributeSelector::literal("test.test").unwrap();
        assert!(selector.matches("d:type=a,attr=test.test"));
        assert!(!selector.matches("d:type=a,attr=testXtest"));
        assert!(!selector.matches("d:type=a,attr=test.test.used"));
    }

    #[test]
    fn test_regex_selector_alternation_stays_anchored() {
        let selector = AttributeSelector::regex("Count|Time").unwrap();
        assert!(selector.matches("d:type=a,attr=Count"));
        assert!(selector.matches("d:type=a,attr=Time"));
        assert!(!selector.matches("d:type=a,attr=Count.total"));
        assert!(!selector.matches("d:type=Time,attr=Other"));
    }

    #[test]
    fn test_compile_full_definition() {
        let yaml = r#"
collect:
  - domain: test.test
    beans:
      - query: test=test
        exclude_regex: test
        attributes:
          - attr: test.test
            metric_name: t.test
            metric_type: rate
          - attr_regex: test.*
          - Plain
  - domain: test.*
    event_type: TestSample
    beans:
      - query: test=tester
        exclude_regex:
          - test2
          - test3
"#;
        let domains = compile_yaml(yaml).unwrap();
        assert_eq!(domains.len(), 2);

        let first = &domains[0];
        assert_eq!(first.event_type, "TestTestSample");
        assert_eq!(first.query_pattern(&first.beans[0]), "test.test:test=test");

        let bean = &first.beans[0];
        assert_eq!(bean.exclude_count(), 1);
        assert_eq!(bean.attributes().len(), 3);
        assert_eq!(bean.attributes()[0].metric_name(), Some("t.test"));
        assert_eq!(bean.attributes()[0].metric_kind(), Some(MetricKind::Rate));
        assert_eq!(bean.attributes()[1].metric_kind(), None);
        assert_eq!(bean.attributes()[2].pattern(), "attr=Plain$");

        let second = &domains[1];
        assert_eq!(second.event_type, "TestSample");
        assert_eq!(second.beans[0].exclude_count(), 2);
        assert_eq!(second.beans[0].attributes().len(), 1);
        assert_eq!(second.beans[0].attributes()[0].pattern(), "attr=.*$");
    }

    #[test]
    fn test_compile_rejects_wildcard_domain_without_event_type() {
        let yaml = "collect:\n  - domain: java.*\n    event_type: \"\"\n    beans: []\n";
        assert!(matches!(
            compile_yaml(yaml),
            Err(ConfigError::WildcardEventType(_))
        ));
    }

    #[test]
    fn test_compile_rejects_ambiguous_attribute_entry() {
        let both = r#"
collect:
  - domain: d
    beans:
      - query: a=b
        attributes:
          - attr: x
            attr_regex: y
"#;
        assert!(matches!(
            compile_yaml(both),
            Err(ConfigError::ValidationError(_))
        ));

        let neither = r#"
collect:
  - domain: d
    beans:
      - query: a=b
        attributes:
          - metric_name: x
"#;
        assert!(matches!(
            compile_yaml(neither),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_compile_rejects_bad_patterns_and_types() {
        let bad_exclude = "collect:\n  - domain: d\n    beans:\n      - query: a=b\n        exclude_regex: \"(\"\n";
        assert!(matches!(
            compile_yaml(bad_exclude),
            Err(ConfigError::InvalidPattern { .. })
        ));

        let bad_type = r#"
collect:
  - domain: d
    beans:
      - query: a=b
        attributes:
          - attr: x
            metric_type: counter
"#;
        assert!(matches!(
            compile_yaml(bad_type),
            Err(ConfigError::InvalidMetricType(_))
        ));
    }

    #[test]
    fn test_exclude_wins_over_selector() {
        let bean = BeanSelector::new(
            "type=Foo",
            vec![Regex::new("Secret").unwrap()],
            vec![AttributeSelector::regex(".*").unwrap()],
        );
        assert!(bean.select("d:type=Foo,attr=Secret").is_none());
        assert!(bean.select("d:type=Foo,attr=Public").is_some());
    }

    #[test]
    fn test_first_declared_selector_wins() {
        let bean = BeanSelector::new(
            "type=Foo",
            vec![],
            vec![
                AttributeSelector::literal("Count")
                    .unwrap()
                    .with_metric_name("first"),
                AttributeSelector::regex("Co.*")
                    .unwrap()
                    .with_metric_name("second"),
            ],
        );
        let selected = bean.select("d:type=Foo,attr=Count").unwrap();
        assert_eq!(selected.metric_name(), Some("first"));

        let selected = bean.select("d:type=Foo,attr=Cores").unwrap();
        assert_eq!(selected.metric_name(), Some("second"));

        assert!(bean.select("d:type=Foo,attr=Other").is_none());
    }
}
