//! Runtime tunables for the expedition engine.
//!
//! Every field has a serde default so partial JSON overlays are valid. Fixed
//! balance tables stay in [`crate::constants`].
use anyhow::Context;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

const DEFAULT_ENGINE_DATA: &str = include_str!("../assets/engine.json");

/// Longest cache lifetime, sweep interval or departure grace accepted.
const MAX_SPAN_MINUTES: i64 = 366 * 24 * 60;
/// Longest penalty window accepted.
const MAX_WINDOW_DAYS: i64 = 366;

/// Minutes clamped into `[0, MAX_SPAN_MINUTES]`, so unvalidated values can
/// never push chrono out of range.
fn clamped_minutes(minutes: i64) -> Duration {
    Duration::minutes(minutes.clamp(0, MAX_SPAN_MINUTES))
}

/// Errors raised when engine configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be at least {min} (got {value})")]
    MinViolation {
        field: &'static str,
        min: i64,
        value: i64,
    },
    #[error("{field} must be at most {max} (got {value})")]
    MaxViolation {
        field: &'static str,
        max: i64,
        value: i64,
    },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("love change for {outcome} has the wrong sign ({value})")]
    LoveSign { outcome: &'static str, value: i32 },
}

/// Proposal cache timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "CacheConfig::default_ttl_minutes")]
    pub ttl_minutes: i64,
    #[serde(default = "CacheConfig::default_sweep_interval_minutes")]
    pub sweep_interval_minutes: i64,
}

impl CacheConfig {
    const fn default_ttl_minutes() -> i64 {
        10
    }

    const fn default_sweep_interval_minutes() -> i64 {
        5
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        clamped_minutes(self.ttl_minutes)
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        clamped_minutes(self.sweep_interval_minutes)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: Self::default_ttl_minutes(),
            sweep_interval_minutes: Self::default_sweep_interval_minutes(),
        }
    }
}

/// Outcome split and love deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeConfig {
    /// Partial-success chance when effective risk is zero.
    #[serde(default = "OutcomeConfig::default_partial_base")]
    pub partial_base: f64,
    /// Added to the partial chance per unit of effective risk (0..=1).
    #[serde(default = "OutcomeConfig::default_partial_risk_weight")]
    pub partial_risk_weight: f64,
    #[serde(default = "OutcomeConfig::default_love_failure")]
    pub love_failure: i32,
    #[serde(default = "OutcomeConfig::default_love_partial")]
    pub love_partial: i32,
    #[serde(default = "OutcomeConfig::default_love_success")]
    pub love_success: i32,
}

impl OutcomeConfig {
    const fn default_partial_base() -> f64 {
        0.10
    }

    const fn default_partial_risk_weight() -> f64 {
        0.30
    }

    const fn default_love_failure() -> i32 {
        -3
    }

    const fn default_love_partial() -> i32 {
        1
    }

    const fn default_love_success() -> i32 {
        3
    }

    /// Chance of a partial success once the failure roll has been survived.
    #[must_use]
    pub fn partial_chance(&self, effective_risk: f64) -> f64 {
        let risk = (effective_risk / 100.0).clamp(0.0, 1.0);
        self.partial_risk_weight
            .mul_add(risk, self.partial_base)
            .clamp(0.0, 1.0)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("outcome.partial_base", self.partial_base),
            ("outcome.partial_risk_weight", self.partial_risk_weight),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::RangeViolation {
                    field,
                    min: 0.0,
                    max: 1.0,
                    value,
                });
            }
        }
        if self.love_failure > 0 {
            return Err(ConfigError::LoveSign {
                outcome: "failure",
                value: self.love_failure,
            });
        }
        if self.love_partial < 0 {
            return Err(ConfigError::LoveSign {
                outcome: "partial",
                value: self.love_partial,
            });
        }
        if self.love_success < 0 {
            return Err(ConfigError::LoveSign {
                outcome: "success",
                value: self.love_success,
            });
        }
        Ok(())
    }
}

impl Default for OutcomeConfig {
    fn default() -> Self {
        Self {
            partial_base: Self::default_partial_base(),
            partial_risk_weight: Self::default_partial_risk_weight(),
            love_failure: Self::default_love_failure(),
            love_partial: Self::default_love_partial(),
            love_success: Self::default_love_success(),
        }
    }
}

/// Cancellation and recall love penalties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyConfig {
    #[serde(default = "PenaltyConfig::default_cancel_base")]
    pub cancel_base: i32,
    #[serde(default = "PenaltyConfig::default_recall_base")]
    pub recall_base: i32,
    #[serde(default = "PenaltyConfig::default_max_penalty")]
    pub max_penalty: u32,
    #[serde(default = "PenaltyConfig::default_window_days")]
    pub window_days: i64,
}

impl PenaltyConfig {
    const fn default_cancel_base() -> i32 {
        -10
    }

    const fn default_recall_base() -> i32 {
        -15
    }

    const fn default_max_penalty() -> u32 {
        60
    }

    const fn default_window_days() -> i64 {
        7
    }

    /// Trailing window over which earlier cancels and recalls count.
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::days(self.window_days.clamp(0, MAX_WINDOW_DAYS))
    }
}

impl Default for PenaltyConfig {
    fn default() -> Self {
        Self {
            cancel_base: Self::default_cancel_base(),
            recall_base: Self::default_recall_base(),
            max_penalty: Self::default_max_penalty(),
            window_days: Self::default_window_days(),
        }
    }
}

/// Lifecycle prerequisites and timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    #[serde(default = "LifecycleConfig::default_min_love_points")]
    pub min_love_points: u32,
    /// Minutes after start during which the pet has not yet departed.
    #[serde(default = "LifecycleConfig::default_departure_grace_minutes")]
    pub departure_grace_minutes: i64,
}

impl LifecycleConfig {
    const fn default_min_love_points() -> u32 {
        80
    }

    const fn default_departure_grace_minutes() -> i64 {
        5
    }

    #[must_use]
    pub fn departure_grace(&self) -> Duration {
        clamped_minutes(self.departure_grace_minutes)
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            min_love_points: Self::default_min_love_points(),
            departure_grace_minutes: Self::default_departure_grace_minutes(),
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub outcome: OutcomeConfig,
    #[serde(default)]
    pub penalty: PenaltyConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
}

impl EngineConfig {
    /// Parse configuration from a JSON string. The result is not validated;
    /// durations read through the section accessors are clamped regardless.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a valid configuration.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load the bundled configuration, falling back to compiled defaults when
    /// it does not parse or validate.
    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(DEFAULT_ENGINE_DATA)
            .ok()
            .filter(|config| {
                config
                    .validate()
                    .inspect_err(|err| log::warn!("bundled engine config rejected: {err}"))
                    .is_ok()
            })
            .unwrap_or_default()
    }

    /// Read and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn load_from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading engine config {}", path.display()))?;
        let config = Self::from_json(&raw)
            .with_context(|| format!("parsing engine config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns `ConfigError` when any field violates the documented bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value, min, max) in [
            ("cache.ttl_minutes", self.cache.ttl_minutes, 1, MAX_SPAN_MINUTES),
            (
                "cache.sweep_interval_minutes",
                self.cache.sweep_interval_minutes,
                1,
                MAX_SPAN_MINUTES,
            ),
            (
                "penalty.window_days",
                self.penalty.window_days,
                1,
                MAX_WINDOW_DAYS,
            ),
            (
                "lifecycle.departure_grace_minutes",
                self.lifecycle.departure_grace_minutes,
                0,
                MAX_SPAN_MINUTES,
            ),
        ] {
            if value < min {
                return Err(ConfigError::MinViolation { field, min, value });
            }
            if value > max {
                return Err(ConfigError::MaxViolation { field, max, value });
            }
        }
        self.outcome.validate()
    }
}
