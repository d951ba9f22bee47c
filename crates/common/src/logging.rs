use crate::config::Environment;
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    layer::{Layered, SubscriberExt},
    util::SubscriberInitExt,
};

/// Subscriber stack the OpenTelemetry bridge layer sits on.
pub(crate) type FilteredRegistry = Layered<EnvFilter, Registry>;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install `RUST_LOG` filtering (default `info`), the given OpenTelemetry
/// layer, and console output: JSON in production, compact text otherwise.
pub(crate) fn install_subscriber<L>(environment: Environment, otel_layer: L)
where
    L: Layer<FilteredRegistry> + Send + Sync + 'static,
{
    let registry = tracing_subscriber::registry()
        .with(env_filter())
        .with(otel_layer);

    match environment {
        Environment::Production => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_level(true))
                .init();
        }
        Environment::Development => {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(false)
                        .with_ansi(true),
                )
                .init();
        }
    }
}

/// Console-only logging for the `detect` CLI and for a gateway started
/// without `OTEL_EXPORTER_OTLP_ENDPOINT`.
///
/// The OpenTelemetry layer is still installed but stays a no-op, since no
/// tracer provider exists. Call this or [`crate::TelemetryGuard::init`], not both.
pub fn setup_logging(environment: Environment) {
    install_subscriber(environment, tracing_opentelemetry::layer());
}
