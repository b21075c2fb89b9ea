use anyhow::{anyhow, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::config::ObservabilityConfig;

/// Initialize structured logging.
///
/// `RUST_LOG` takes precedence over the configured level. Returns an error if
/// a global subscriber has already been installed.
pub fn init_telemetry(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| anyhow!("Invalid log level '{}': {}", config.log_level, e))?;

    let registry = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init()?;
    }

    tracing::info!(
        log_level = %config.log_level,
        json = config.json_logs,
        "Phase coordinator telemetry initialized"
    );
    Ok(())
}

/// Generate a correlation ID for linking related operations
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span carrying the common workflow attributes, one correlation id per operation
pub fn create_workflow_span(
    operation: &str,
    workflow_id: &str,
    correlation_id: &str,
) -> tracing::Span {
    tracing::info_span!(
        "workflow_phase",
        operation = operation,
        workflow.id = workflow_id,
        correlation.id = correlation_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_ids_are_unique() {
        let a = generate_correlation_id();
        let b = generate_correlation_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }

    #[test]
    fn test_workflow_span_carries_correlation_id() {
        let correlation_id = generate_correlation_id();
        tracing::subscriber::with_default(tracing_subscriber::registry(), || {
            let span = create_workflow_span("transition", "wf-1", &correlation_id);
            let metadata = span.metadata().expect("span should be enabled");
            assert_eq!(metadata.name(), "workflow_phase");
            assert!(metadata.fields().field("correlation.id").is_some());
            assert!(metadata.fields().field("workflow.id").is_some());
        });
    }

    #[test]
    fn test_init_telemetry_twice_reports_error() {
        let config = ObservabilityConfig {
            log_level: "debug".to_string(),
            json_logs: true,
        };
        init_telemetry(&config).unwrap();

        let second = init_telemetry(&ObservabilityConfig {
            json_logs: false,
            ..config
        });
        assert!(second.is_err());
    }
}
