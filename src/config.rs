//! Tunable constants of the scoring engine, optionally loaded from TOML.
//!
//! Every field defaults to the documented value, so an empty file (or no file)
//! gives the standard behavior.

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::{MasteryError, Result};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// EMA weight given to a new observation.
    pub smoothing_weight: f64,
    /// Aspect score used when the analysis carries no number for it.
    pub default_score: f64,
    pub recommendation_count: usize,
    /// Improvement added to the weakest level before rounding up to the next step.
    pub milestone_gain: f64,
    pub milestone_step: f64,
    pub intermediate_threshold: f64,
    pub advanced_threshold: f64,
    /// Scores at or above this are reported as strengths.
    pub strength_threshold: f64,
    /// Levels below this are critical areas.
    pub critical_threshold: f64,
    /// Improvements above this are called out in the change digest.
    pub improvement_threshold: f64,
    pub minutes_per_exercise: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            smoothing_weight: 0.3,
            default_score: 50.0,
            recommendation_count: 3,
            milestone_gain: 20.0,
            milestone_step: 10.0,
            intermediate_threshold: 40.0,
            advanced_threshold: 70.0,
            strength_threshold: 70.0,
            critical_threshold: 60.0,
            improvement_threshold: 10.0,
            minutes_per_exercise: 20,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(raw).map_err(|e| MasteryError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&raw)?;
        info!(target: "skill_mastery", path = %path.display(), "Loaded engine config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.smoothing_weight > 0.0 && self.smoothing_weight <= 1.0) {
            return Err(MasteryError::Config(format!(
                "smoothing_weight must be in (0, 1], got {}",
                self.smoothing_weight
            )));
        }
        if !(0.0..=100.0).contains(&self.default_score) {
            return Err(MasteryError::Config(format!(
                "default_score must be in [0, 100], got {}",
                self.default_score
            )));
        }
        if self.recommendation_count == 0 {
            return Err(MasteryError::Config(
                "recommendation_count must be at least 1".to_string(),
            ));
        }
        if !(self.milestone_gain.is_finite() && self.milestone_gain >= 1.0) {
            return Err(MasteryError::Config(format!(
                "milestone_gain must be at least 1, got {}",
                self.milestone_gain
            )));
        }
        if !(self.milestone_step.is_finite() && self.milestone_step > 0.0) {
            return Err(MasteryError::Config(format!(
                "milestone_step must be positive, got {}",
                self.milestone_step
            )));
        }
        let thresholds = [
            ("intermediate_threshold", self.intermediate_threshold),
            ("advanced_threshold", self.advanced_threshold),
            ("strength_threshold", self.strength_threshold),
            ("critical_threshold", self.critical_threshold),
            ("improvement_threshold", self.improvement_threshold),
        ];
        for (name, value) in thresholds {
            if !(0.0..=100.0).contains(&value) {
                return Err(MasteryError::Config(format!(
                    "{name} must be in [0, 100], got {value}"
                )));
            }
        }
        if self.intermediate_threshold > self.advanced_threshold {
            return Err(MasteryError::Config(format!(
                "intermediate_threshold ({}) exceeds advanced_threshold ({})",
                self.intermediate_threshold, self.advanced_threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_documented_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.smoothing_weight, 0.3);
        assert_eq!(config.default_score, 50.0);
        assert_eq!(config.recommendation_count, 3);
    }

    #[test]
    fn partial_toml_overrides_fields() {
        let config = EngineConfig::from_toml_str("smoothing_weight = 0.5\nrecommendation_count = 2\n").unwrap();
        assert_eq!(config.smoothing_weight, 0.5);
        assert_eq!(config.recommendation_count, 2);
        assert_eq!(config.advanced_threshold, 70.0);
    }

    #[test]
    fn rejects_out_of_range_weight() {
        let err = EngineConfig::from_toml_str("smoothing_weight = 0.0").unwrap_err();
        assert!(matches!(err, MasteryError::Config(_)));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(EngineConfig::from_toml_str("weight = 0.3").is_err());
    }

    #[test]
    fn rejects_milestone_settings_that_cannot_raise_a_level() {
        for raw in [
            "milestone_gain = -50.0",
            "milestone_gain = 0.0",
            "milestone_gain = nan",
            "milestone_step = 0.0",
            "milestone_step = nan",
            "milestone_step = inf",
        ] {
            let err = EngineConfig::from_toml_str(raw).unwrap_err();
            assert!(matches!(err, MasteryError::Config(_)), "{raw}");
        }
    }

    #[test]
    fn rejects_zero_recommendation_count() {
        let err = EngineConfig::from_toml_str("recommendation_count = 0").unwrap_err();
        assert!(err.to_string().contains("recommendation_count"));
    }

    #[test]
    fn rejects_thresholds_outside_range_or_nan() {
        for raw in [
            "intermediate_threshold = nan",
            "advanced_threshold = 150.0",
            "strength_threshold = -1.0",
            "critical_threshold = nan",
            "improvement_threshold = 101.0",
        ] {
            let err = EngineConfig::from_toml_str(raw).unwrap_err();
            assert!(matches!(err, MasteryError::Config(_)), "{raw}");
        }
    }

    #[test]
    fn rejects_inverted_tier_thresholds() {
        let err = EngineConfig::from_toml_str("intermediate_threshold = 80.0").unwrap_err();
        assert!(err.to_string().contains("intermediate_threshold"));
    }
}
