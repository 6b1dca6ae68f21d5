//! Configuración de la tubería.
//!
//! Se lee desde un archivo TOML con dos secciones, ambas opcionales:
//!
//! ```toml
//! [executor]
//! workers = 4
//! delay_ms = 2000
//! timeout_ms = 10000
//!
//! [pipeline]
//! optimize = true
//! deploy = "Deploy Application"
//! deploy_nodes = 3
//! ```

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use bitflags::bitflags;
use hts_runtime::ExecutorConfig;
use serde::Deserialize;
use thiserror::Error;

bitflags! {
    /// Opciones que no provienen del archivo de configuración.
    #[derive(Default)]
    pub struct Options: u32 {
        const SKIP_OPTIMIZE = 1 << 0;
        const SKIP_JOBS = 1 << 1;

        /// Las advertencias léxicas se vuelven errores.
        const STRICT_LEX = 1 << 2;
    }
}

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("`executor.workers` must be at least 1")]
    NoWorkers,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub executor: ExecutorSection,
    pub pipeline: PipelineSection,

    #[serde(skip)]
    pub options: Options,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutorSection {
    pub workers: usize,

    /// Retardo simulado de los trabajos concurrentes.
    pub delay_ms: u64,

    pub timeout_ms: Option<u64>,
}

impl Default for ExecutorSection {
    fn default() -> Self {
        let defaults = ExecutorConfig::default();

        ExecutorSection {
            workers: defaults.workers,
            delay_ms: defaults.delay.as_millis() as u64,
            timeout_ms: defaults.timeout.map(|timeout| timeout.as_millis() as u64),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineSection {
    pub optimize: bool,

    /// Tarea distribuida que se agenda luego de los trabajos del programa.
    pub deploy: Option<String>,

    pub deploy_nodes: usize,
}

impl Default for PipelineSection {
    fn default() -> Self {
        PipelineSection {
            optimize: true,
            deploy: None,
            deploy_nodes: 3,
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        if config.executor.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }

        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Config::from_toml(&text)
    }

    pub fn with_options(self, options: Options) -> Self {
        Config {
            options: self.options | options,
            ..self
        }
    }

    /// Opciones efectivas, incluyendo las que derivan del archivo.
    pub fn options(&self) -> Options {
        let mut options = self.options;
        if !self.pipeline.optimize {
            options |= Options::SKIP_OPTIMIZE;
        }

        options
    }

    pub fn executor(&self) -> ExecutorConfig {
        let ExecutorSection {
            workers,
            delay_ms,
            timeout_ms,
        } = self.executor;

        ExecutorConfig {
            workers,
            delay: Duration::from_millis(delay_ms),
            timeout: timeout_ms.map(Duration::from_millis),
        }
    }
}
