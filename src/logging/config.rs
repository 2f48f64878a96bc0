use std::str::FromStr;

use bflat_error::{ensure, BflatResult, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

/// Формат вывода событий.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

/// Настройки логирования (секция `[logging]` в `bflat.toml`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Базовый уровень: `trace`, `debug`, `info`, `warn`, `error` или `off`.
    pub level: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub with_target: bool,
    /// Дополнительные директивы `EnvFilter`, например `bflat::deserializer=trace`.
    pub directives: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            with_ansi: true,
            with_target: false,
            directives: Vec::new(),
        }
    }
}

impl LoggingConfig {
    /// Строка директив для `EnvFilter`: уровень, затем уточнения.
    pub fn build_filter_directive(&self) -> String {
        std::iter::once(self.level.as_str())
            .chain(self.directives.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn validate(&self) -> BflatResult<()> {
        ensure!(
            LevelFilter::from_str(&self.level).is_ok(),
            StatusCode::InvalidArgs,
            "unknown log level '{}'",
            self.level
        );
        Ok(())
    }
}
