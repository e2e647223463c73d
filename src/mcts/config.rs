//! MCTS Configuration
//!
//! All tunable search parameters, with defaults suited to 9×9 self-play.
//! Values are validated once at construction; the search never re-checks them.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::neural::features::FeatureSet;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("resign threshold must lie in [-1, 0), got {0}")]
    ResignThreshold(f32),

    #[error("unknown feature set '{0}' (expected 'minimal' or 'extended')")]
    UnknownFeatureSet(String),

    #[error("invalid config: {0}")]
    Invalid(&'static str),

    #[error("cannot read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// MCTS configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MctsConfig {
    // ========== Selection ==========
    /// Exploration constant of the PUCT bonus
    /// Default: 0.96
    pub c_puct: f32,

    // ========== Budgets ==========
    /// Leaves collected per evaluator batch
    /// Default: 8
    pub parallel_readouts: usize,

    /// Root visits to add per move when not timed
    /// Default: 800
    pub num_readouts: u32,

    /// Search on wall-clock time instead of visit count
    /// Default: false
    pub timed: bool,

    /// Default: 5.0
    pub seconds_per_move: f64,

    // ========== Competitive time control ==========
    /// Main time per player, seconds
    /// Default: 900
    pub time_limit: f64,

    /// Per-move decay once in the endgame tail
    /// Default: 0.98
    pub decay_factor: f64,

    // ========== Play policy ==========
    /// Resign when the root value drops below this, in [-1, 0)
    /// Default: -0.9
    pub resign_threshold: f32,

    /// Deterministic play from move 0 and no training records
    /// Default: false
    pub two_player_mode: bool,

    /// "minimal" or "extended"
    pub feature_set: String,

    // ========== Root noise ==========
    /// Default: false
    pub inject_noise: bool,

    /// Default: 0.03
    pub dirichlet_alpha: f32,

    /// Fraction of the prior replaced by noise
    /// Default: 0.25
    pub noise_mix: f32,

    /// RNG seed for symmetries, sampling and noise; random when unset
    pub seed: Option<u64>,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            c_puct: 0.96,
            parallel_readouts: 8,
            num_readouts: 800,
            timed: false,
            seconds_per_move: 5.0,
            time_limit: 900.0,
            decay_factor: 0.98,
            resign_threshold: -0.9,
            two_player_mode: false,
            feature_set: FeatureSet::Minimal.name().to_string(),
            inject_noise: false,
            dirichlet_alpha: 0.03,
            noise_mix: 0.25,
            seed: None,
        }
    }
}

impl MctsConfig {
    /// Load a JSON config; missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.resign_threshold >= -1.0 && self.resign_threshold < 0.0) {
            return Err(ConfigError::ResignThreshold(self.resign_threshold));
        }
        if !(self.c_puct.is_finite() && self.c_puct > 0.0) {
            return Err(ConfigError::Invalid("c_puct must be finite and > 0"));
        }
        if self.parallel_readouts == 0 {
            return Err(ConfigError::Invalid("parallel_readouts must be > 0"));
        }
        if !self.timed && self.num_readouts == 0 {
            return Err(ConfigError::Invalid("num_readouts must be > 0"));
        }
        if self.timed && !(self.seconds_per_move.is_finite() && self.seconds_per_move > 0.0) {
            return Err(ConfigError::Invalid("seconds_per_move must be > 0"));
        }
        if !(self.decay_factor > 0.0 && self.decay_factor < 1.0) {
            return Err(ConfigError::Invalid("decay_factor must lie in (0, 1)"));
        }
        if self.inject_noise {
            if !(self.dirichlet_alpha.is_finite() && self.dirichlet_alpha > 0.0) {
                return Err(ConfigError::Invalid("dirichlet_alpha must be > 0"));
            }
            if !(0.0..=1.0).contains(&self.noise_mix) {
                return Err(ConfigError::Invalid("noise_mix must lie in [0, 1]"));
            }
        }
        self.features()?;
        Ok(())
    }

    pub fn features(&self) -> Result<FeatureSet, ConfigError> {
        self.feature_set.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_is_valid() {
        assert!(MctsConfig::default().validate().is_ok());
    }

    #[test]
    fn test_resign_threshold_range() {
        for bad in [0.0, 0.1, -1.5, f32::NAN] {
            let cfg = MctsConfig {
                resign_threshold: bad,
                ..Default::default()
            };
            assert!(matches!(cfg.validate(), Err(ConfigError::ResignThreshold(_))));
        }
        let edge = MctsConfig {
            resign_threshold: -1.0,
            ..Default::default()
        };
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn test_unknown_feature_set_rejected() {
        let cfg = MctsConfig {
            feature_set: "fancy".to_string(),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::UnknownFeatureSet(_))));
    }

    #[test]
    fn test_bad_noise_params_only_matter_when_enabled() {
        let mut cfg = MctsConfig {
            dirichlet_alpha: 0.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());
        cfg.inject_noise = true;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_partial_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"num_readouts": 64, "feature_set": "extended"}}"#).unwrap();
        let cfg = MctsConfig::load(file.path()).unwrap();
        assert_eq!(cfg.num_readouts, 64);
        assert_eq!(cfg.features().unwrap(), FeatureSet::Extended);
        assert_eq!(cfg.c_puct, 0.96);
    }

    #[test]
    fn test_load_missing_file() {
        let err = MctsConfig::load("/nonexistent/go_mcts.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
