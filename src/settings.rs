//! Game settings and preferences
//!
//! Persisted separately from the leaderboard under its own storage key.

use serde::{Deserialize, Serialize};

use crate::platform::KeyValueStore;
use crate::platform::storage::{self, keys};

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Audio ===
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,
    pub muted: bool,

    // === Visual Effects ===
    /// Explosion particles and bear sparks
    pub particles: bool,
    /// Laser halos and bear glow
    pub glow: bool,

    // === Accessibility ===
    /// Reduced motion (no pulsing, no sparks)
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,

            particles: true,
            glow: true,

            reduced_motion: false,
        }
    }
}

impl Settings {
    /// Gain applied to sound effects
    pub fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            (self.master_volume * self.sfx_volume).clamp(0.0, 1.0)
        }
    }

    /// Effective pulsing (respects reduced_motion)
    pub fn effective_pulse(&self) -> bool {
        !self.reduced_motion
    }

    /// Effective sparks (respects reduced_motion)
    pub fn effective_sparks(&self) -> bool {
        self.particles && !self.reduced_motion
    }

    /// Flip mute and persist the change. Returns the new mute state.
    pub fn toggle_mute<S: KeyValueStore + ?Sized>(&mut self, store: &mut S) -> bool {
        self.muted = !self.muted;
        self.save(store);
        self.muted
    }

    /// Load settings; anything unreadable falls back to defaults
    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Self {
        match storage::load_json(store, keys::SETTINGS) {
            Ok(Some(settings)) => {
                log::info!("Loaded settings");
                settings
            }
            Ok(None) => {
                log::info!("Using default settings");
                Self::default()
            }
            Err(e) => {
                log::warn!("Could not read settings, using defaults: {e}");
                Self::default()
            }
        }
    }

    /// Save settings; failures are logged and dropped
    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &mut S) {
        match storage::save_json(store, keys::SETTINGS, self) {
            Ok(()) => log::info!("Settings saved"),
            Err(e) => log::warn!("Could not save settings: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryStore;

    #[test]
    fn test_volume_respects_mute() {
        let mut settings = Settings::default();
        assert!((settings.effective_volume() - 0.8).abs() < 1e-6);
        settings.muted = true;
        assert_eq!(settings.effective_volume(), 0.0);
    }

    #[test]
    fn test_reduced_motion_disables_sparks() {
        let settings = Settings {
            reduced_motion: true,
            ..Settings::default()
        };
        assert!(!settings.effective_sparks());
        assert!(!settings.effective_pulse());
    }

    #[test]
    fn test_save_and_load() {
        let mut store = MemoryStore::new();
        let settings = Settings {
            muted: true,
            glow: false,
            ..Settings::default()
        };
        settings.save(&mut store);
        assert_eq!(Settings::load(&store), settings);
    }

    #[test]
    fn test_toggle_mute_persists() {
        let mut store = MemoryStore::new();
        let mut settings = Settings::default();
        assert!(settings.toggle_mute(&mut store));
        assert_eq!(settings.effective_volume(), 0.0);
        assert!(Settings::load(&store).muted);

        assert!(!settings.toggle_mute(&mut store));
        assert!(!Settings::load(&store).muted);
    }

    #[test]
    fn test_toggle_mute_survives_store_failure() {
        let mut store = MemoryStore::new();
        store.fail_writes = true;
        let mut settings = Settings::default();
        assert!(settings.toggle_mute(&mut store));
        assert!(settings.muted);
        assert!(!Settings::load(&store).muted);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let mut store = MemoryStore::new();
        store.set(keys::SETTINGS, r#"{"muted":true}"#).unwrap();
        let settings = Settings::load(&store);
        assert!(settings.muted);
        assert!(settings.particles);
    }
}
