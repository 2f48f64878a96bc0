use tracing_subscriber::EnvFilter;

use super::config::LoggingConfig;

/// Фильтр событий: `RUST_LOG`, если задан и корректен, иначе директива из
/// конфигурации, иначе `info`.
pub fn build_filter_from_config(config: &LoggingConfig) -> EnvFilter {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    resolve_filter(env.as_deref(), &config.build_filter_directive())
}

fn resolve_filter(
    env: Option<&str>,
    directive: &str,
) -> EnvFilter {
    env.and_then(|value| EnvFilter::try_new(value).ok())
        .or_else(|| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}
