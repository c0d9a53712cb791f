//! Velatron - a single-screen arcade brawler
//!
//! Core modules:
//! - `sim`: Simulation (spawning, physics, collisions, game state)
//! - `renderer`: Scene building and the WebGPU sprite pipeline
//! - `platform`: Ports to the host (storage, audio, dialogs, input mapping)
//! - `highscores` / `profile`: Local leaderboard and per-device identity
//! - `tuning`: Data-driven game balance
//! - `game`: Session driver threading time through sim and render

#[cfg(target_arch = "wasm32")]
pub mod audio;
pub mod game;
pub mod highscores;
pub mod platform;
pub mod profile;
pub mod renderer;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use game::{GameSession, SessionMode};
pub use highscores::{HighScoreEntry, HighScores};
pub use profile::Profile;
pub use settings::Settings;
pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Duration of the 60 Hz reference frame that per-frame speeds are tuned against (ms)
    pub const REFERENCE_FRAME_MS: f32 = 1000.0 / 60.0;
    /// Largest frame delta the driver feeds into the simulation (ms).
    /// Backgrounded tabs report huge gaps between animation frames.
    pub const MAX_FRAME_DT_MS: f32 = 100.0;

    /// Double taps closer than this are a shoot gesture (ms)
    pub const DOUBLE_TAP_MS: f64 = 300.0;

    /// Avatar uploads above this size are rejected (bytes)
    pub const MAX_AVATAR_UPLOAD_BYTES: u64 = 500_000;
    /// Stored avatars are cropped to a square of this many pixels
    pub const AVATAR_SIZE_PX: u32 = 100;
    /// Display names are cut to this many characters
    pub const MAX_NAME_CHARS: usize = 20;
    /// Name stored when the profile prompt is abandoned
    pub const ANONYMOUS_NAME: &str = "Anonymous";
}

/// Scale factor converting a delta in ms into reference frames
#[inline]
pub fn frames_for(dt_ms: f32) -> f32 {
    dt_ms / consts::REFERENCE_FRAME_MS
}

/// Current wall-clock time in ms since the Unix epoch
#[cfg(target_arch = "wasm32")]
pub fn now_ms() -> f64 {
    js_sys::Date::now()
}

#[cfg(not(target_arch = "wasm32"))]
pub fn now_ms() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}
