//! MBean 속성 수집 모듈
//!
//! Bean query transport boundary. The collection pipeline only sees the
//! [`AttributeSource`] trait: one query pattern in, a flat list of
//! `<objectName>,attr=<attribute>` results out. [`JolokiaClient`] is the
//! HTTP implementation.
//!
//! # Example
//!
//! ```ignore
//! use rjmx_collector::collector::{AttributeSource, JolokiaClient};
//!
//! let client = JolokiaClient::new("http://localhost:8778/jolokia", 5000)?;
//! let attributes = client.query("java.lang:type=Memory").await?;
//! ```

mod client;
mod parser;

use async_trait::async_trait;

pub use client::JolokiaClient;
pub use parser::{
    flatten_response, parse_response, AttributeValue, CollectResult, JolokiaResponse, RawAttribute,
    RequestInfo,
};

/// Something that can answer a bean query pattern with raw attribute results
#[async_trait]
pub trait AttributeSource: Send + Sync {
    /// Query every attribute of every bean matching `pattern`
    ///
    /// # Errors
    /// Per-query failures (unknown bean, malformed answer) and fatal
    /// connection failures are told apart by [`crate::error::CollectorError::is_fatal`].
    async fn query(&self, pattern: &str) -> CollectResult<Vec<RawAttribute>>;
}
