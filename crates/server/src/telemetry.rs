use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

/// Install a bunyan JSON subscriber writing to stdout. `RUST_LOG` overrides
/// the `info` default.
pub fn init(name: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let formatting = BunyanFormattingLayer::new(name.to_string(), std::io::stdout);

    let _ = Registry::default()
        .with(filter)
        .with(JsonStorageLayer)
        .with(formatting)
        .try_init();
}
