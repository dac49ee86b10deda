//! Telemetry bootstrap: tracing subscriber and metric descriptions.
//!
//! Host applications call [`init`] once at startup; embedding applications
//! that install their own subscriber can skip it entirely — every call site
//! in the crate emits plain `tracing` events and `metrics` macros.

use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use thiserror::Error;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

static METRIC_DESCRIPTIONS: Once = Once::new();

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log directive `{directive}`: {detail}")]
    Directive { directive: String, detail: String },

    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(String),
}

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), TelemetryError> {
    describe_metrics();

    let directive =
        logging
            .level
            .parse()
            .map_err(|err: tracing_subscriber::filter::ParseError| TelemetryError::Directive {
                directive: logging.level.clone(),
                detail: err.to_string(),
            })?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| TelemetryError::Subscriber(err.to_string()))
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "glaze_cache_hit_total",
            Unit::Count,
            "Total number of cache hits, fresh or stale."
        );
        describe_counter!(
            "glaze_cache_miss_total",
            Unit::Count,
            "Total number of cache misses."
        );
        describe_counter!(
            "glaze_cache_stale_serve_total",
            Unit::Count,
            "Total number of reads answered with stale data while a refresh ran."
        );
        describe_counter!(
            "glaze_cache_refresh_total",
            Unit::Count,
            "Total number of background refreshes started."
        );
        describe_counter!(
            "glaze_cache_evict_total",
            Unit::Count,
            "Total number of entries evicted from the in-process store by the size bound."
        );
        describe_histogram!(
            "glaze_cache_fetch_ms",
            Unit::Milliseconds,
            "Fetcher latency, labeled by path (cold or refresh)."
        );
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_directive() {
        let settings = LoggingSettings {
            level: "!!not-a-directive!!".to_string(),
            format: LogFormat::Compact,
        };
        assert!(matches!(
            init(&settings),
            Err(TelemetryError::Directive { .. })
        ));
    }

    #[test]
    fn init_is_usable_once() {
        let settings = LoggingSettings::default();
        // A second install attempt fails gracefully rather than panicking;
        // other test binaries may already have installed a subscriber.
        let first = init(&settings);
        let second = init(&settings);
        assert!(first.is_ok() || matches!(first, Err(TelemetryError::Subscriber(_))));
        assert!(matches!(second, Err(TelemetryError::Subscriber(_))));
    }
}
