use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    magic::{CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_UNIQUER_CAPACITY, ENV_CONFIG_PATH},
    utils::error::{IrError, IrResult},
};

/// Tuning knobs of the storage uniquers owned by an [`IrContext`](crate::context::IrContext).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniquerConfig {
    /// Number of hash buckets reserved up-front.
    pub initial_capacity: usize,

    /// Report hash collisions through the `log` facade.
    pub log_collisions: bool,
}

impl Default for UniquerConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_UNIQUER_CAPACITY,
            log_collisions: true,
        }
    }
}

/// Options of the textual printer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterConfig {
    /// Append the `: (inputs) -> (outputs)` signature to every printed operation.
    pub print_types: bool,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self { print_types: true }
    }
}

/// Configuration of an IR context.
///
/// Every section is optional in the TOML file; missing fields fall back to
/// their defaults.
///
/// ```rust
/// # use pir::utils::conf::IrConfig;
/// let config: IrConfig = toml::from_str("[uniquer]\ninitial_capacity = 8\n").unwrap();
/// assert_eq!(config.uniquer.initial_capacity, 8);
/// assert!(config.printer.print_types);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IrConfig {
    pub uniquer: UniquerConfig,
    pub printer: PrinterConfig,
}

impl IrConfig {
    /// Get the default path to the configuration file.
    pub fn default_path() -> PathBuf {
        if let Ok(config_path) = std::env::var(ENV_CONFIG_PATH) {
            return config_path.into();
        }

        let mut path = PathBuf::new();

        #[cfg(target_os = "windows")]
        {
            if let Ok(appdata) = std::env::var("APPDATA") {
                path.push(appdata);
            }
        }
        #[cfg(not(target_os = "windows"))]
        {
            if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
                path.push(xdg_config_home);
            } else if let Ok(home) = std::env::var("HOME") {
                path.push(home);
                path.push(".config");
            }
        }

        path.push(CONFIG_DIR_NAME);
        path.push(CONFIG_FILE_NAME);
        path
    }

    /// Load a configuration from a TOML file.
    pub fn load_from_toml(path: &Path) -> IrResult<Self> {
        let toml_str = std::fs::read_to_string(path)?;

        let config = toml::from_str(&toml_str).map_err(|e| IrError::ConfigParse {
            source: e,
            file: path.display().to_string(),
        })?;
        debug!("Loaded IR configuration from `{}`", path.display());
        Ok(config)
    }

    /// Save the configuration to a TOML file, creating parent directories as needed.
    pub fn save_to_toml(&self, path: &Path) -> IrResult<()> {
        let toml_str = toml::to_string(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, toml_str)?;
        Ok(())
    }

    /// Load the configuration found at [`Self::default_path`], or the defaults
    /// if no such file exists. A file that exists but cannot be parsed is an error.
    pub fn load_or_default() -> IrResult<Self> {
        let path = Self::default_path();
        if path.is_file() {
            Self::load_from_toml(&path)
        } else {
            debug!(
                "No IR configuration at `{}`, using defaults",
                path.display()
            );
            Ok(Self::default())
        }
    }
}
