//! Tunable game settings
//!
//! Persisted in LocalStorage on the web; defaults everywhere else.
//! Thresholds are in simulation units, delays in seconds.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::secs_to_ticks;
use crate::sim::{DirectorConfig, SettlementMonitor};

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Settlement ===
    /// Linear speed below which a die counts as still
    pub settle_linear_threshold: f32,
    /// Angular speed below which a die counts as still
    pub settle_angular_threshold: f32,
    /// Consecutive still ticks before a roll is read
    pub settle_dwell_ticks: u32,
    /// Height below which a die has fallen off
    pub floor_threshold: f32,
    pub table_radius: f32,

    // === Shake ===
    pub shake_engage: f32,
    pub shake_release: f32,
    /// Manual roll hold time
    pub manual_dwell_secs: f32,
    /// Sensor shakes longer than this throw anyway
    pub max_shake_secs: f32,

    // === Pacing ===
    pub results_delay_secs: f32,
    pub decided_delay_secs: f32,
    pub sloppy_delay_secs: f32,
    pub sloppy_drinks: u8,

    // === Audio ===
    pub sound: bool,
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            settle_linear_threshold: SETTLE_LINEAR_THRESHOLD,
            settle_angular_threshold: SETTLE_ANGULAR_THRESHOLD,
            settle_dwell_ticks: SETTLE_DWELL_TICKS,
            floor_threshold: FLOOR_THRESHOLD,
            table_radius: TABLE_RADIUS,

            shake_engage: SHAKE_ENGAGE,
            shake_release: SHAKE_RELEASE,
            manual_dwell_secs: 0.5,
            max_shake_secs: 2.5,

            results_delay_secs: 4.0,
            decided_delay_secs: 2.0,
            sloppy_delay_secs: 3.0,
            sloppy_drinks: SLOPPY_DRINKS,

            sound: true,
            master_volume: 0.8,
        }
    }
}

impl Settings {
    /// LocalStorage key (used only in wasm32)
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "three_man_settings";

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Director tuning derived from these settings
    pub fn director_config(&self) -> DirectorConfig {
        let mut settle = SettlementMonitor::default();
        settle.linear_threshold = self.settle_linear_threshold;
        settle.angular_threshold = self.settle_angular_threshold;
        settle.dwell_ticks = self.settle_dwell_ticks;
        settle.floor_threshold = self.floor_threshold;
        settle.table_radius = self.table_radius;

        DirectorConfig {
            settle,
            shake_engage: self.shake_engage,
            // Release must sit below engage or a shake could never end
            shake_release: self.shake_release.min(self.shake_engage),
            manual_dwell_ticks: secs_to_ticks(self.manual_dwell_secs),
            max_shake_ticks: secs_to_ticks(self.max_shake_secs),
            results_delay_ticks: secs_to_ticks(self.results_delay_secs),
            decided_delay_ticks: secs_to_ticks(self.decided_delay_secs),
            sloppy_delay_ticks: secs_to_ticks(self.sloppy_delay_secs),
            sloppy_drinks: self.sloppy_drinks,
        }
    }

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(settings) => {
                        log::info!("Loaded settings from LocalStorage");
                        return settings;
                    }
                    Err(e) => log::warn!("Ignoring stored settings: {e}"),
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = self.to_json() {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_director_defaults() {
        let from_settings = Settings::default().director_config();
        let direct = DirectorConfig::default();
        assert_eq!(from_settings.manual_dwell_ticks, direct.manual_dwell_ticks);
        assert_eq!(from_settings.results_delay_ticks, 240);
        assert_eq!(from_settings.sloppy_delay_ticks, 180);
        assert_eq!(from_settings.settle.dwell_ticks, 30);
        assert_eq!(from_settings.shake_engage, direct.shake_engage);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let s = Settings::from_json(r#"{"settle_dwell_ticks": 40, "sound": false}"#).unwrap();
        assert_eq!(s.settle_dwell_ticks, 40);
        assert!(!s.sound);
        assert_eq!(s.shake_engage, SHAKE_ENGAGE);
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(Settings::from_json("{not json").is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let mut s = Settings::default();
        s.master_volume = 0.25;
        let back = Settings::from_json(&s.to_json().unwrap()).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn test_release_clamped_below_engage() {
        let s = Settings {
            shake_engage: 10.0,
            shake_release: 30.0,
            ..Default::default()
        };
        assert_eq!(s.director_config().shake_release, 10.0);
    }
}
