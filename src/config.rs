//! Configuration management for rJMX-Collector
//!
//! Handles loading the declarative collection definitions (YAML files or
//! inline JSON) and the Jolokia transport settings.
//!
//! # Example (YAML)
//!
//! ```yaml
//! collect:
//!   - domain: java.lang
//!     beans:
//!       - query: type=GarbageCollector,name=*
//!         exclude_regex: ".*LastGcInfo.*"
//!         attributes:
//!           - CollectionCount
//!           - attr: CollectionTime
//!             metric_name: gc.collectionTimeMs
//!             metric_type: delta
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error reading the configuration file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Error parsing a YAML collection file
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Error parsing inline JSON collection config
    #[error("Failed to parse collection config JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Regex in the collection definition does not compile
    #[error("invalid regex pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Unknown `metric_type` value
    #[error("invalid metric type {0}")]
    InvalidMetricType(String),

    /// Wildcarded domain without an explicit `event_type`
    #[error("cannot generate event type for wildcarded domain {0}")]
    WildcardEventType(String),

    /// Configuration validation error
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Raw collection definition, as written by the user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionDefinition {
    /// Domains to collect
    #[serde(default)]
    pub collect: Vec<DomainSpec>,
}

/// One `collect` entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainSpec {
    /// Domain pattern, may contain wildcards
    #[serde(default)]
    pub domain: String,

    /// Explicit event type; derived from the domain when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,

    /// Bean queries in this domain
    #[serde(default)]
    pub beans: Vec<BeanSpec>,
}

/// One bean query with its filters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BeanSpec {
    /// Key property pattern appended to `<domain>:`
    #[serde(default)]
    pub query: String,

    /// Regex (or list of regexes) of attribute names to drop
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_regex: Option<ExcludeSpec>,

    /// Attributes to collect; empty means all of them
    #[serde(default)]
    pub attributes: Vec<AttributeSpec>,
}

/// `exclude_regex` accepts either one pattern or a list of patterns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExcludeSpec {
    Single(String),
    Multiple(Vec<String>),
}

impl ExcludeSpec {
    /// All patterns, in declaration order
    pub fn patterns(&self) -> Vec<&str> {
        match self {
            ExcludeSpec::Single(p) => vec![p.as_str()],
            ExcludeSpec::Multiple(ps) => ps.iter().map(String::as_str).collect(),
        }
    }
}

/// An `attributes` entry: a bare attribute name or a detailed map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeSpec {
    Name(String),
    Detailed(AttributeEntry),
}

/// Detailed attribute entry. Exactly one of `attr` / `attr_regex` is allowed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attr: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attr_regex: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_name: Option<String>,

    /// One of gauge, delta, attribute, rate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_type: Option<String>,
}

impl CollectionDefinition {
    /// Parse a YAML collection definition
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Parse an inline JSON collection definition
    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Load a collection definition file
    ///
    /// # Errors
    /// Returns an error if the path is relative, or the file cannot be read
    /// or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.is_absolute() {
            return Err(ConfigError::ValidationError(format!(
                "Invalid metrics collection path {}. Metrics collection files must be specified as absolute paths.",
                path.display()
            )));
        }

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Load every file of a comma separated path list
    pub fn load_files(paths: &str) -> Result<Vec<Self>, ConfigError> {
        paths
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| {
                Self::load(p).inspect_err(|e| {
                    tracing::error!(path = %p, error = %e, "Failed to load collection definition");
                })
            })
            .collect()
    }
}

/// Jolokia endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JolokiaConfig {
    /// Jolokia endpoint URL
    #[serde(default = "default_jolokia_url")]
    pub url: String,

    /// Optional username for basic auth
    pub username: Option<String>,

    /// Optional password for basic auth
    pub password: Option<String>,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

fn default_jolokia_url() -> String {
    "http://localhost:8778/jolokia".to_string()
}

fn default_timeout() -> u64 {
    10000
}

impl Default for JolokiaConfig {
    fn default() -> Self {
        Self {
            url: default_jolokia_url(),
            username: None,
            password: None,
            timeout_ms: default_timeout(),
        }
    }
}

impl JolokiaConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let parsed = url::Url::parse(&self.url).map_err(|e| {
            ConfigError::ValidationError(format!("Invalid Jolokia URL '{}': {}", self.url, e))
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError(format!(
                "Jolokia URL must use http or https, got '{}'",
                parsed.scheme()
            )));
        }

        if self.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_yaml_definition() {
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
  - domain: test.*
    event_type: TestSample
    beans:
      - query: test=tester
        exclude_regex:
          - test2
"#;
        let def = CollectionDefinition::from_yaml_str(yaml).unwrap();
        assert_eq!(def.collect.len(), 2);

        let bean = &def.collect[0].beans[0];
        assert_eq!(bean.exclude_regex, Some(ExcludeSpec::Single("test".to_string())));
        assert_eq!(bean.attributes.len(), 2);
        assert_eq!(
            bean.attributes[0],
            AttributeSpec::Detailed(AttributeEntry {
                attr: Some("test.test".to_string()),
                metric_name: Some("t.test".to_string()),
                metric_type: Some("rate".to_string()),
                ..Default::default()
            })
        );

        assert_eq!(def.collect[1].event_type.as_deref(), Some("TestSample"));
        assert_eq!(
            def.collect[1].beans[0].exclude_regex,
            Some(ExcludeSpec::Multiple(vec!["test2".to_string()]))
        );
        assert!(def.collect[1].beans[0].attributes.is_empty());
    }

    #[test]
    fn test_parse_bare_attribute_names() {
        let yaml = r#"
collect:
  - domain: java.lang
    beans:
      - query: type=Threading
        attributes:
          - ThreadCount
          - PeakThreadCount
"#;
        let def = CollectionDefinition::from_yaml_str(yaml).unwrap();
        assert_eq!(
            def.collect[0].beans[0].attributes,
            vec![
                AttributeSpec::Name("ThreadCount".to_string()),
                AttributeSpec::Name("PeakThreadCount".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_json_definition() {
        let json = r#"{
            "collect": [{
                "domain": "com.demo.app",
                "event_type": "JMXAnnotationSample",
                "beans": [{
                    "query": "name=SystemStatusExample",
                    "exclude_regex": ["Random.*"],
                    "attributes": [{
                        "attr_regex": "Random.*",
                        "metric_name": "t.test",
                        "metric_type": "rate"
                    }]
                }]
            }]
        }"#;
        let def = CollectionDefinition::from_json_str(json).unwrap();
        let bean = &def.collect[0].beans[0];
        assert_eq!(bean.query, "name=SystemStatusExample");
        assert_eq!(
            bean.exclude_regex.as_ref().map(|e| e.patterns()),
            Some(vec!["Random.*"])
        );
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let result = CollectionDefinition::from_yaml_str("collect: [this is: : broken");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_requires_absolute_path() {
        let result = CollectionDefinition::load("relative/collection.yml");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = CollectionDefinition::load("/nonexistent/jmx-collection.yml");
        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }

    #[test]
    fn test_load_files() {
        let mut first = tempfile::NamedTempFile::new().unwrap();
        writeln!(first, "collect:\n  - domain: java.lang\n    beans:\n      - query: type=Memory").unwrap();
        let mut second = tempfile::NamedTempFile::new().unwrap();
        writeln!(second, "collect: []").unwrap();

        let list = format!(
            "{},{}",
            first.path().display(),
            second.path().display()
        );
        let defs = CollectionDefinition::load_files(&list).unwrap();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].collect[0].domain, "java.lang");
        assert!(defs[1].collect.is_empty());
    }

    #[test]
    fn test_default_jolokia_config() {
        let config = JolokiaConfig::default();
        assert_eq!(config.url, "http://localhost:8778/jolokia");
        assert_eq!(config.timeout_ms, 10000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_jolokia_config_validation() {
        let mut config = JolokiaConfig {
            url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.url = "ftp://localhost/jolokia".to_string();
        assert!(config.validate().is_err());

        config.url = "https://jvm.internal:8778/jolokia".to_string();
        config.timeout_ms = 0;
        assert!(config.validate().is_err());
    }
}
