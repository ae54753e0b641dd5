//! rJMX-Collector - JMX bean collection integration
//!
//! Queries MBeans through Jolokia and prints labeled metric sets as JSON,
//! once or every interval in long-running mode.

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use rjmx_collector::cli::Cli;
use rjmx_collector::collector::JolokiaClient;
use rjmx_collector::runner::{collect_once, load_collections, publish, run_long_running};
use rjmx_collector::transformer::{DomainDefinition, TransformEngine};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    rjmx_collector::init_logging(&cli.log_level.to_string())?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting rJMX-Collector"
    );

    let files = cli.collection_files.as_deref().filter(|s| !s.trim().is_empty());
    let config = cli.collection_config.as_deref().filter(|s| !s.trim().is_empty());
    if files.is_none() && config.is_none() {
        bail!("Must specify at least one of --collection-files or --collection-config");
    }

    let collections =
        load_collections(files, config).context("Failed to load collection definitions")?;
    if collections.is_empty() {
        bail!("No collection definitions found in --collection-files or --collection-config");
    }

    if cli.validate {
        print_summary(&collections);
        return Ok(());
    }

    let jolokia = cli.jolokia_config();
    jolokia.validate()?;

    let mut client = JolokiaClient::new(&jolokia.url, jolokia.timeout_ms)?;
    if let Some(username) = &jolokia.username {
        client = client.with_auth(username, jolokia.password.as_deref().unwrap_or_default());
    }

    let engine = TransformEngine::new(cli.collection_context());
    let options = cli.run_options();

    if cli.long_running {
        run_long_running(&collections, &client, &engine, &options).await?;
    } else {
        let integration = collect_once(&collections, &client, &engine, &options).await;
        publish(&integration, options.pretty)?;
    }

    Ok(())
}

fn print_summary(collections: &[Vec<DomainDefinition>]) {
    let domains: Vec<&DomainDefinition> = collections.iter().flatten().collect();
    let beans: usize = domains.iter().map(|d| d.beans.len()).sum();
    let selectors: usize = domains
        .iter()
        .flat_map(|d| &d.beans)
        .map(|b| b.attributes().len())
        .sum();

    println!("Collection definitions are valid");
    println!("  Collections: {}", collections.len());
    println!("  Domains: {}", domains.len());
    println!("  Bean queries: {}", beans);
    println!("  Attribute selectors: {}", selectors);
    for domain in &domains {
        println!("  - {} ({})", domain.domain, domain.event_type);
    }
}
