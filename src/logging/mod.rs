pub mod config;
mod filters;
mod formatter;

use bflat_error::{BflatResult, GenericError, StatusCode};
pub use config::{LogFormat, LoggingConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Устанавливает глобальный subscriber.
///
/// Повторный вызов возвращает ошибку, а не паникует.
pub fn init_logging(config: &LoggingConfig) -> BflatResult<()> {
    config.validate()?;

    let env_filter = filters::build_filter_from_config(config);
    let formatter = formatter::build_formatter_from_config(config);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(formatter)
        .try_init()
        .map_err(|e| GenericError::new(StatusCode::Internal, e.to_string()))?;

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        level = %config.level,
        format = ?config.format,
        "Logging initialized"
    );
    Ok(())
}
