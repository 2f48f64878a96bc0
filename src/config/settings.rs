use std::path::Path;

use bflat_error::{ensure, BflatResult, GenericError, ResultExt, StatusCode};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::logging::LoggingConfig;

/// Файл, который ищется в текущем каталоге, если путь не указан явно.
pub const DEFAULT_CONFIG_FILE: &str = "bflat.toml";
/// Префикс переменных окружения: `BFLAT_MAX_INPUT_BYTES`,
/// `BFLAT_LOGGING__LEVEL`.
pub const ENV_PREFIX: &str = "BFLAT";

const DEFAULT_MAX_INPUT_BYTES: i64 = 64 * 1024 * 1024;
const DEFAULT_PREVIEW_BYTES: i64 = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Файлы больше этого размера CLI не читает.
    pub max_input_bytes: u64,
    /// Сколько байт бинарного значения показывать в `dump`.
    pub preview_bytes: usize,
}

impl Settings {
    /// Значения по умолчанию, затем файл (необязательный `bflat.toml` или
    /// обязательный `path`), затем переменные окружения.
    pub fn load(path: Option<&Path>) -> BflatResult<Self> {
        Self::build(path, env_source())
    }

    fn build(
        path: Option<&Path>,
        env: Environment,
    ) -> BflatResult<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings: Settings = Config::builder()
            .set_default("max_input_bytes", DEFAULT_MAX_INPUT_BYTES)
            .and_then(|b| b.set_default("preview_bytes", DEFAULT_PREVIEW_BYTES))
            .map_err(config_error)?
            .add_source(file)
            .add_source(env)
            .build()
            .and_then(Config::try_deserialize)
            .map_err(config_error)?;

        settings.validate().context("invalid settings")?;
        Ok(settings)
    }

    pub fn validate(&self) -> BflatResult<()> {
        ensure!(
            self.max_input_bytes > 0,
            StatusCode::InvalidArgs,
            "max_input_bytes must be greater than zero"
        );
        self.logging.validate()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES as u64,
            preview_bytes: DEFAULT_PREVIEW_BYTES as usize,
        }
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

fn config_error(e: ConfigError) -> GenericError {
    GenericError::new(StatusCode::InvalidArgs, format!("configuration error: {e}"))
}
