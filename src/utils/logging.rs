use anyhow::{Result, anyhow};
use std::env;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, layer::SubscriberExt as _, util::SubscriberInitExt,
};

/// Installs the global subscriber. `RUST_LOG` adds directives on top of
/// `info`, `LOG_FORMAT` picks the output format.
pub fn init_tracing_subscriber() -> Result<()> {
    let directive = format!("info,{}", env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default());
    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match env::var("LOG_FORMAT").ok().map(|f| f.to_lowercase()).as_deref() {
        None | Some("default") => layer.boxed(),
        Some("compact") => layer.compact().boxed(),
        Some("pretty") => layer.pretty().boxed(),
        Some("json") => layer.json().boxed(),
        Some(other) => return Err(anyhow!("LOG_FORMAT '{}' is not supported", other)),
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(EnvFilter::new(directive)))
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;
    tracing::debug!("initialized global tracing subscriber");
    Ok(())
}
