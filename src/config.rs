use serde::{Deserialize, Serialize};

use crate::error::{GalahadError, Result};
use crate::pump::layout::RingMode;
use crate::pump::profile::PumpModel;

pub const LED_COUNT_RANGE: std::ops::RangeInclusive<u8> = 12..=64;
pub const PERCENT_RANGE: std::ops::RangeInclusive<u8> = 1..=100;

/// Settings the host supplies before `initialize`.
///
/// Field names follow the host's parameter properties so a settings object
/// can be deserialized as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PluginConfig {
    /// Total LEDs, only used when the pump model is unknown
    pub led_count: u8,

    /// Global brightness in percent
    pub brightness: u8,

    pub ring_mode: RingMode,

    /// Address LEDs individually instead of one colour per zone
    pub per_led_mode: bool,

    /// Selected pump model; `None` resolves it from the opened device
    #[serde(rename = "modelType")]
    pub model: Option<PumpModel>,

    /// Reserved for hardware effect commands
    pub effect_speed: u8,

    /// Probe alternate header signatures before bring-up
    pub protocol_autodetect: bool,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            led_count: 24,
            brightness: 100,
            ring_mode: RingMode::Combined,
            per_led_mode: true,
            model: None,
            effect_speed: 50,
            protocol_autodetect: false,
        }
    }
}

impl PluginConfig {
    /// Parse the host's settings object and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| GalahadError::Config(format!("Failed to parse settings: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject out-of-range values instead of clamping them.
    pub fn validate(&self) -> Result<()> {
        if !LED_COUNT_RANGE.contains(&self.led_count) {
            return Err(GalahadError::Config(format!(
                "ledCount {} outside {}-{}",
                self.led_count,
                LED_COUNT_RANGE.start(),
                LED_COUNT_RANGE.end()
            )));
        }
        for (name, value) in [
            ("brightness", self.brightness),
            ("effectSpeed", self.effect_speed),
        ] {
            if !PERCENT_RANGE.contains(&value) {
                return Err(GalahadError::Config(format!(
                    "{name} {value} outside 1-100"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PluginConfig::from_json("{}").unwrap();
        assert_eq!(config, PluginConfig::default());
        assert_eq!(config.led_count, 24);
        assert_eq!(config.brightness, 100);
        assert!(config.per_led_mode);
    }

    #[test]
    fn test_host_settings_names() {
        let config = PluginConfig::from_json(
            r#"{
                "ledCount": 32,
                "brightness": 40,
                "ringMode": "Inner Ring Only",
                "perLedMode": false,
                "modelType": "LCD (0x7395)",
                "effectSpeed": 10
            }"#,
        )
        .unwrap();
        assert_eq!(config.led_count, 32);
        assert_eq!(config.brightness, 40);
        assert_eq!(config.ring_mode, RingMode::InnerOnly);
        assert!(!config.per_led_mode);
        assert_eq!(config.model, Some(PumpModel::Lcd));
        assert_eq!(config.effect_speed, 10);
    }

    #[test]
    fn test_out_of_range_rejected() {
        for json in [
            r#"{"ledCount": 8}"#,
            r#"{"ledCount": 65}"#,
            r#"{"brightness": 0}"#,
            r#"{"brightness": 101}"#,
            r#"{"effectSpeed": 0}"#,
        ] {
            let err = PluginConfig::from_json(json).unwrap_err();
            assert!(matches!(err, GalahadError::Config(_)), "{json}");
        }
    }

    #[test]
    fn test_unknown_ring_mode_rejected() {
        assert!(PluginConfig::from_json(r#"{"ringMode": "Sideways"}"#).is_err());
    }
}
