//! Configuration loading for the Aviator engine
//!
//! TOML file, then `AVIATOR_*` environment overrides, then validation.

use crate::config::{AviatorConfig, BettingConfig, CrashConfig, HistoryConfig, MonitoringConfig, TimingConfig};
use crate::errors::{AviatorResult, ConfigurationError};
use crate::games::growth::GrowthCurve;
use std::env;
use std::path::Path;
use std::str::FromStr;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    /// Create a new config loader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> AviatorResult<AviatorConfig> {
        let mut config = if let Some(ref path) = self.config_path {
            self.load_from_file(path)?
        } else {
            AviatorConfig::default()
        };

        // Override with environment variables
        apply_overrides(&mut config, |key| env::var(key).ok())?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    fn load_from_file(&self, path: &str) -> AviatorResult<AviatorConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into())
    }

    /// Save configuration to file
    pub fn save(&self, config: &AviatorConfig, path: &str) -> AviatorResult<()> {
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path, e)).into())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply `AVIATOR_*` overrides read through `lookup`
pub fn apply_overrides<F>(config: &mut AviatorConfig, lookup: F) -> AviatorResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("AVIATOR_MIN_BET") {
        config.betting.min_bet = parse_var("AVIATOR_MIN_BET", value, "Invalid amount")?;
    }
    if let Some(value) = lookup("AVIATOR_MAX_BET") {
        config.betting.max_bet = parse_var("AVIATOR_MAX_BET", value, "Invalid amount")?;
    }
    if let Some(value) = lookup("AVIATOR_MAX_CRASH") {
        config.crash.max_crash = parse_var("AVIATOR_MAX_CRASH", value, "Invalid multiplier")?;
    }
    if let Some(value) = lookup("AVIATOR_COUNTDOWN_TICKS") {
        config.timing.countdown_ticks =
            parse_var("AVIATOR_COUNTDOWN_TICKS", value, "Invalid tick count")?;
    }
    if let Some(value) = lookup("AVIATOR_CRASH_DELAY_MS") {
        config.timing.crash_delay_ms =
            parse_var("AVIATOR_CRASH_DELAY_MS", value, "Invalid delay value")?;
    }
    if let Some(value) = lookup("AVIATOR_LOG_LEVEL") {
        config.monitoring.log_level = parse_var("AVIATOR_LOG_LEVEL", value, "Invalid log level")?;
    }
    Ok(())
}

fn parse_var<T: FromStr>(field: &str, value: String, reason: &str) -> Result<T, ConfigurationError> {
    value.trim().parse().map_err(|_| ConfigurationError::InvalidValue {
        field: field.to_string(),
        value,
        reason: reason.to_string(),
    })
}

/// Builder pattern for creating configurations
pub struct ConfigBuilder {
    config: AviatorConfig,
}

impl ConfigBuilder {
    /// Create a new config builder with defaults
    pub fn new() -> Self {
        Self {
            config: AviatorConfig::default(),
        }
    }

    /// Start from an existing configuration, e.g. a preset
    pub fn from_config(config: AviatorConfig) -> Self {
        Self { config }
    }

    pub fn betting(mut self, betting: BettingConfig) -> Self {
        self.config.betting = betting;
        self
    }

    pub fn crash(mut self, crash: CrashConfig) -> Self {
        self.config.crash = crash;
        self
    }

    pub fn growth(mut self, growth: GrowthCurve) -> Self {
        self.config.growth = growth;
        self
    }

    pub fn timing(mut self, timing: TimingConfig) -> Self {
        self.config.timing = timing;
        self
    }

    pub fn history(mut self, history: HistoryConfig) -> Self {
        self.config.history = history;
        self
    }

    pub fn monitoring(mut self, monitoring: MonitoringConfig) -> Self {
        self.config.monitoring = monitoring;
        self
    }

    /// Build and validate the final configuration
    pub fn build(self) -> AviatorResult<AviatorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a sample configuration file
pub fn generate_sample_config(path: &str) -> AviatorResult<()> {
    let config = AviatorConfig::default();
    let loader = ConfigLoader::new();
    loader.save(&config, path)
}
