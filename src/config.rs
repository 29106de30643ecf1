//! Configuration management with validation and defaults
//!
//! Every behavioural variant of the game (bet limits, crash ceiling,
//! distribution, growth curve, timings) is a parameter here rather than a
//! separate code path.

use crate::errors::ConfigurationError;
use crate::games::crash_point::{CrashDistribution, CrashPointGenerator};
use crate::games::growth::GrowthCurve;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Complete engine configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AviatorConfig {
    #[serde(default)]
    pub betting: BettingConfig,
    #[serde(default)]
    pub crash: CrashConfig,
    #[serde(default)]
    pub growth: GrowthCurve,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

/// Bet limits
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BettingConfig {
    pub min_bet: f64,
    pub max_bet: f64,
    /// Lowest accepted auto cash-out target
    pub min_auto_cashout: f64,
}

impl Default for BettingConfig {
    fn default() -> Self {
        Self {
            min_bet: 10.0,
            max_bet: 100_000.0,
            min_auto_cashout: 1.01,
        }
    }
}

/// Crash point bounds and distribution
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrashConfig {
    pub min_crash: f64,
    pub max_crash: f64,
    #[serde(default)]
    pub distribution: CrashDistribution,
}

impl Default for CrashConfig {
    fn default() -> Self {
        Self {
            min_crash: 1.01,
            max_crash: 1000.0,
            distribution: CrashDistribution::default(),
        }
    }
}

/// Tick cadence and round delays
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Waiting ticks before a round runs
    pub countdown_ticks: u32,
    pub waiting_tick_ms: u64,
    pub running_tick_ms: u64,
    /// Pause between a crash and the next round opening
    pub crash_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            countdown_ticks: 5,
            waiting_tick_ms: 1000,
            running_tick_ms: 50,
            crash_delay_ms: 3000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryConfig {
    pub round_capacity: usize,
    pub bet_capacity: usize,
    /// Number of the first round the engine opens
    pub first_round_number: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            round_capacity: 20,
            bet_capacity: 100,
            first_round_number: 1,
        }
    }
}

/// Logging and event verbosity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub log_level: LogLevel,
    /// Emit a `MultiplierUpdated` event on every running tick
    pub emit_multiplier_updates: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            emit_multiplier_updates: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

/// Configuration validation and factory methods
impl AviatorConfig {
    /// Lobby table: 100 minimum stake, 50x ceiling, stepped growth
    pub fn classic() -> Self {
        Self {
            betting: BettingConfig {
                min_bet: 100.0,
                max_bet: 1_000_000.0,
                min_auto_cashout: 1.1,
            },
            crash: CrashConfig {
                min_crash: 1.01,
                max_crash: 50.0,
                distribution: CrashDistribution::default(),
            },
            growth: GrowthCurve::classic_bands(),
            ..Default::default()
        }
    }

    /// No real waiting; for headless simulation and tests
    pub fn fast_simulation() -> Self {
        Self {
            timing: TimingConfig {
                countdown_ticks: 1,
                waiting_tick_ms: 1,
                running_tick_ms: 1,
                crash_delay_ms: 1,
            },
            monitoring: MonitoringConfig {
                log_level: LogLevel::Warn,
                emit_multiplier_updates: false,
            },
            ..Default::default()
        }
    }

    /// Validate configuration for logical consistency
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let betting = &self.betting;
        if !betting.min_bet.is_finite() || betting.min_bet <= 0.0 {
            return Err(invalid("betting.min_bet", betting.min_bet, "must be > 0"));
        }
        if !betting.max_bet.is_finite() || betting.max_bet < betting.min_bet {
            return Err(invalid("betting.max_bet", betting.max_bet, "must be >= min_bet"));
        }
        if !betting.min_auto_cashout.is_finite() || betting.min_auto_cashout < 1.0 {
            return Err(invalid(
                "betting.min_auto_cashout",
                betting.min_auto_cashout,
                "must be >= 1.0",
            ));
        }

        let crash = &self.crash;
        if !crash.min_crash.is_finite() || crash.min_crash < 1.01 {
            return Err(invalid("crash.min_crash", crash.min_crash, "must be >= 1.01"));
        }
        if !crash.max_crash.is_finite() || crash.max_crash < crash.min_crash {
            return Err(invalid("crash.max_crash", crash.max_crash, "must be >= min_crash"));
        }
        match crash.distribution {
            CrashDistribution::Geometric {
                growth_factor,
                stop_probability,
            } => {
                if !growth_factor.is_finite() || growth_factor <= 1.0 {
                    return Err(invalid(
                        "crash.distribution.growth_factor",
                        growth_factor,
                        "must be > 1.0",
                    ));
                }
                if !(stop_probability > 0.0 && stop_probability <= 1.0) {
                    return Err(invalid(
                        "crash.distribution.stop_probability",
                        stop_probability,
                        "must be in (0, 1]",
                    ));
                }
            }
            CrashDistribution::HouseEdge { house_edge } => {
                if !(0.0..1.0).contains(&house_edge) {
                    return Err(invalid(
                        "crash.distribution.house_edge",
                        house_edge,
                        "must be in [0, 1)",
                    ));
                }
            }
        }

        self.growth
            .check()
            .map_err(|reason| ConfigurationError::InvalidValue {
                field: "growth".to_string(),
                value: format!("{:?}", self.growth),
                reason,
            })?;

        let timing = &self.timing;
        if timing.countdown_ticks == 0 {
            return Err(invalid("timing.countdown_ticks", 0, "must be > 0"));
        }
        if timing.waiting_tick_ms == 0 {
            return Err(invalid("timing.waiting_tick_ms", 0, "must be > 0"));
        }
        if timing.running_tick_ms == 0 {
            return Err(invalid("timing.running_tick_ms", 0, "must be > 0"));
        }

        if self.history.round_capacity == 0 {
            return Err(invalid("history.round_capacity", 0, "must be > 0"));
        }
        if self.history.bet_capacity == 0 {
            return Err(invalid("history.bet_capacity", 0, "must be > 0"));
        }

        Ok(())
    }

    pub fn crash_generator(&self) -> CrashPointGenerator {
        CrashPointGenerator::new(
            self.crash.min_crash,
            self.crash.max_crash,
            self.crash.distribution.clone(),
        )
    }

    /// Convert to duration types for internal use
    pub fn waiting_tick(&self) -> Duration {
        Duration::from_millis(self.timing.waiting_tick_ms)
    }

    pub fn running_tick(&self) -> Duration {
        Duration::from_millis(self.timing.running_tick_ms)
    }

    pub fn crash_delay(&self) -> Duration {
        Duration::from_millis(self.timing.crash_delay_ms)
    }
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ConfigurationError {
    ConfigurationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::growth::GrowthBand;

    #[test]
    fn test_default_config_is_valid() {
        let config = AviatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.betting.min_bet, 10.0);
        assert_eq!(config.crash.max_crash, 1000.0);
        assert_eq!(config.history.round_capacity, 20);
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(AviatorConfig::classic().validate().is_ok());
        assert!(AviatorConfig::fast_simulation().validate().is_ok());
    }

    #[test]
    fn test_invalid_bet_limits() {
        let mut config = AviatorConfig::default();
        config.betting.max_bet = 5.0;
        assert!(config.validate().is_err());

        let mut config = AviatorConfig::default();
        config.betting.min_bet = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_crash_bounds() {
        let mut config = AviatorConfig::default();
        config.crash.min_crash = 1.0;
        assert!(config.validate().is_err());

        let mut config = AviatorConfig::default();
        config.crash.distribution = CrashDistribution::Geometric {
            growth_factor: 1.1,
            stop_probability: 0.0,
        };
        assert!(config.validate().is_err());

        let mut config = AviatorConfig::default();
        config.crash.distribution = CrashDistribution::HouseEdge { house_edge: 1.5 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_growth_is_reported_with_field() {
        let mut config = AviatorConfig::default();
        config.growth = GrowthCurve::Stepped {
            bands: vec![GrowthBand { from: 1.0, increment: -0.1 }],
        };
        match config.validate() {
            Err(ConfigurationError::InvalidValue { field, .. }) => assert_eq!(field, "growth"),
            other => panic!("Expected growth error, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_timings_rejected() {
        let mut config = AviatorConfig::default();
        config.timing.countdown_ticks = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duration_conversions() {
        let config = AviatorConfig::default();
        assert_eq!(config.waiting_tick(), Duration::from_millis(1000));
        assert_eq!(config.running_tick(), Duration::from_millis(50));
        assert_eq!(config.crash_delay(), Duration::from_millis(3000));
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("DEBUG".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert!("loud".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::Warn.as_filter(), "warn");
    }
}
