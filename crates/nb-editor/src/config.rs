//! Board-wide tunables.
//!
//! Every field has a default; a host may override any subset by passing a
//! partial JSON document to `BoardConfig::from_json`.

use crate::error::ConfigError;
use nb_core::ViewportConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BoardConfig {
    pub viewport: ViewportConfig,

    /// World-space distance under which an edge alignment snaps.
    pub snap_distance: f64,

    /// Width of a freshly created card. Height starts as `auto`.
    pub default_card_width: f64,
    /// Height assumed when centering a new auto-height card.
    pub placement_height: f64,

    /// Offset applied by single-card duplicate (both axes).
    pub duplicate_offset: f64,
    /// Offset applied to each card of a multi-selection duplicate.
    pub multi_duplicate_offset: f64,

    /// Width/height changes at or below this are treated as noise and do
    /// not produce a history entry.
    pub resize_threshold: f64,

    /// Delay before a card change is written to storage.
    pub save_debounce_ms: f64,
    /// Window in which content edits collapse into one history entry.
    pub content_debounce_ms: f64,

    /// Maximum number of history entries kept.
    pub history_limit: usize,

    /// Scale factor of one keyboard zoom step.
    pub zoom_step: f64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            viewport: ViewportConfig::default(),
            snap_distance: 10.0,
            default_card_width: 300.0,
            placement_height: 120.0,
            duplicate_offset: 20.0,
            multi_duplicate_offset: 50.0,
            resize_threshold: 1.0,
            save_debounce_ms: 500.0,
            content_debounce_ms: 1000.0,
            history_limit: 100,
            zoom_step: 1.2,
        }
    }
}

impl BoardConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the viewport cannot animate or clamp with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let vp = &self.viewport;
        if !(vp.damping > 0.0 && vp.damping <= 1.0) {
            return Err(ConfigError::OutOfRange("viewport.damping must be in (0, 1]"));
        }
        if !(vp.min_scale.is_finite() && vp.min_scale > 0.0 && vp.max_scale.is_finite()) {
            return Err(ConfigError::OutOfRange(
                "viewport scale bounds must be finite and positive",
            ));
        }
        if vp.min_scale > vp.max_scale {
            return Err(ConfigError::OutOfRange(
                "viewport.minScale must not exceed viewport.maxScale",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_override_keeps_defaults() {
        let config =
            BoardConfig::from_json(r#"{"snapDistance": 4, "viewport": {"maxScale": 8}}"#).unwrap();
        assert_eq!(config.snap_distance, 4.0);
        assert_eq!(config.viewport.max_scale, 8.0);
        assert_eq!(config.viewport.min_scale, 0.1);
        assert_eq!(config.history_limit, 100);
    }

    #[test]
    fn malformed_config_is_rejected() {
        assert!(BoardConfig::from_json("{snap").is_err());
        assert!(BoardConfig::from_json(r#"{"historyLimit": "lots"}"#).is_err());
    }

    #[test]
    fn damping_must_converge() {
        for bad in [
            r#"{"viewport":{"damping":0}}"#,
            r#"{"viewport":{"damping":2.5}}"#,
            r#"{"viewport":{"damping":-0.2}}"#,
        ] {
            let err = BoardConfig::from_json(bad).unwrap_err();
            assert!(matches!(err, ConfigError::OutOfRange(_)), "{bad}: {err}");
        }
        let snappy = BoardConfig::from_json(r#"{"viewport":{"damping":1}}"#).unwrap();
        assert_eq!(snappy.viewport.damping, 1.0);
    }

    #[test]
    fn scale_bounds_must_be_ordered() {
        let err = BoardConfig::from_json(r#"{"viewport":{"minScale":5,"maxScale":2}}"#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid board config: viewport.minScale must not exceed viewport.maxScale"
        );
        assert!(BoardConfig::from_json(r#"{"viewport":{"minScale":0}}"#).is_err());
        assert!(BoardConfig::from_json(r#"{"viewport":{"minScale":2,"maxScale":2}}"#).is_ok());
        assert!(BoardConfig::default().validate().is_ok());
    }
}
