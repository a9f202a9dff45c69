use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::domain::CVError;

pub const LOG_ENV: &str = "CV_LOG";

/// Installs the global subscriber. The terminal belongs to the ui, so log lines only go to
/// `log_file`. The error layer is always installed so faults carry their span trace.
pub fn init(log_file: Option<&Path>) -> Result<(), CVError> {
    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path)?;
            Some(
                fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false)
                    .with_target(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(file_layer)
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| CVError::LoggingFailed(e.to_string()))
}
