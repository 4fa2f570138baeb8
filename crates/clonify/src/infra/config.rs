//! Configuration management utilities.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs_next::config_dir;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::domain::model::{ClonePlacement, TransformMode};

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));

/// Layered configuration loaded from defaults, user config, an explicit file, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub logging: Logging,
    #[serde(default, rename = "clone")]
    pub cloning: Cloning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Logging {
    #[serde(default)]
    enabled: Option<bool>,
    #[serde(default)]
    file: Option<PathBuf>,
    #[serde(default)]
    level: Option<String>,
}

impl Logging {
    fn default_enabled() -> bool {
        true
    }

    fn default_file() -> PathBuf {
        PathBuf::from("extension_log.txt")
    }

    fn default_level() -> &'static str {
        "info"
    }

    pub fn enabled(&self) -> bool {
        self.enabled.unwrap_or_else(Self::default_enabled)
    }

    /// Log file path, relative to the working directory unless absolute.
    pub fn file(&self) -> PathBuf {
        self.file.clone().unwrap_or_else(Self::default_file)
    }

    pub fn level(&self) -> String {
        self.level
            .clone()
            .unwrap_or_else(|| Self::default_level().to_owned())
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = Some(enabled);
    }

    pub fn set_file(&mut self, file: impl Into<PathBuf>) {
        self.file = Some(file.into());
    }
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            enabled: Some(Self::default_enabled()),
            file: Some(Self::default_file()),
            level: Some(Self::default_level().to_owned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cloning {
    #[serde(default)]
    transform_mode: Option<TransformMode>,
    #[serde(default)]
    placement: Option<ClonePlacement>,
    #[serde(default)]
    preserve_ids: Option<bool>,
    #[serde(default)]
    precision: Option<u32>,
}

impl Cloning {
    fn default_preserve_ids() -> bool {
        true
    }

    fn default_precision() -> u32 {
        8
    }

    pub fn transform_mode(&self) -> TransformMode {
        self.transform_mode.unwrap_or_default()
    }

    pub fn placement(&self) -> ClonePlacement {
        self.placement.unwrap_or_default()
    }

    pub fn preserve_ids(&self) -> bool {
        self.preserve_ids
            .unwrap_or_else(Self::default_preserve_ids)
    }

    /// Decimal places kept in generated matrices.
    pub fn precision(&self) -> Option<u32> {
        Some(self.precision.unwrap_or_else(Self::default_precision))
    }

    pub fn set_transform_mode(&mut self, mode: TransformMode) {
        self.transform_mode = Some(mode);
    }

    pub fn set_placement(&mut self, placement: ClonePlacement) {
        self.placement = Some(placement);
    }
}

impl Default for Cloning {
    fn default() -> Self {
        Self {
            transform_mode: Some(TransformMode::default()),
            placement: Some(ClonePlacement::default()),
            preserve_ids: Some(Self::default_preserve_ids()),
            precision: Some(Self::default_precision()),
        }
    }
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    log_file: Option<String>,
    logging: Option<String>,
    transform_mode: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            log_file: env::var("CLONIFY_LOG_FILE").ok(),
            logging: env::var("CLONIFY_LOG").ok(),
            transform_mode: env::var("CLONIFY_TRANSFORM_MODE").ok(),
        }
    }

    #[cfg(test)]
    fn for_tests(log_file: &str, logging: &str, transform_mode: &str) -> Self {
        Self {
            log_file: Some(log_file.to_owned()),
            logging: Some(logging.to_owned()),
            transform_mode: Some(transform_mode.to_owned()),
        }
    }
}

impl Config {
    /// Load configuration from defaults, the user config, an optional explicit file, and env
    /// overrides. The explicit file must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let env = EnvOverrides::from_env();
        let global = global_config_path();
        Self::load_with_layers(global, explicit.map(Path::to_path_buf), env)
    }

    fn load_with_layers(
        global: Option<PathBuf>,
        explicit: Option<PathBuf>,
        env_overrides: EnvOverrides,
    ) -> Result<Self> {
        let mut layers: Vec<Config> = Vec::new();

        layers.push(Self::from_str(&DEFAULT_CONFIG)?);

        if let Some(global_path) = global.filter(|path| path.exists()) {
            layers.push(Self::from_file(&global_path)?);
        }

        if let Some(explicit_path) = explicit {
            layers.push(Self::from_file(&explicit_path)?);
        }

        let merged = layers.into_iter().reduce(Config::merge).unwrap_or_default();
        apply_env_overrides(merged, env_overrides)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&data)
            .with_context(|| format!("invalid config file: {}", path.display()))
    }

    fn from_str(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).with_context(|| "failed to parse TOML config".to_string())?;
        Ok(config)
    }

    fn merge(self, other: Self) -> Self {
        Self {
            logging: merge_logging(self.logging, other.logging),
            cloning: merge_cloning(self.cloning, other.cloning),
        }
    }
}

fn merge_logging(mut base: Logging, overlay: Logging) -> Logging {
    if let Some(value) = overlay.enabled {
        base.enabled = Some(value);
    }
    if let Some(value) = overlay.file {
        base.file = Some(value);
    }
    if let Some(value) = overlay.level {
        base.level = Some(value);
    }
    base
}

fn merge_cloning(mut base: Cloning, overlay: Cloning) -> Cloning {
    if let Some(value) = overlay.transform_mode {
        base.transform_mode = Some(value);
    }
    if let Some(value) = overlay.placement {
        base.placement = Some(value);
    }
    if let Some(value) = overlay.preserve_ids {
        base.preserve_ids = Some(value);
    }
    if let Some(value) = overlay.precision {
        base.precision = Some(value);
    }
    base
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("clonify/config.toml"))
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Result<Config> {
    if let Some(file) = env.log_file.filter(|file| !file.trim().is_empty()) {
        config.logging.set_file(file);
    }
    if let Some(flag) = env.logging {
        config.logging.set_enabled(parse_flag(&flag));
    }
    if let Some(mode) = env.transform_mode {
        let mode = mode
            .parse::<TransformMode>()
            .context("invalid CLONIFY_TRANSFORM_MODE")?;
        config.cloning.set_transform_mode(mode);
    }
    Ok(config)
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "off" | "no"
    )
}
