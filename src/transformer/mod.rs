//! Result mapping pipeline
//!
//! Compiled collection definitions decide which raw attribute results become
//! metrics, and how they are named, typed and grouped:
//!
//! 1. [`rules::compile`] builds [`DomainDefinition`]s once per run
//! 2. [`classify::classify`] filters and groups one bean query's results
//! 3. [`TransformEngine::insert_domain_metrics`] builds entities and metric sets

pub mod classify;
pub mod engine;
pub mod object_name;
pub mod resolver;
pub mod rules;

pub use classify::{classify, BeanAttrValue, Classification};
pub use engine::{AddressingMode, CollectionContext, TransformEngine};
pub use object_name::{parse_key_properties, KeyProperties};
pub use resolver::{resolve, ResolvedMetric};
pub use rules::{compile, AttributeSelector, BeanSelector, DomainDefinition, MetricKind};
