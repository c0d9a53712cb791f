//! Data-driven game balance
//!
//! Every number the simulation depends on lives here. Speeds are in pixels per
//! 60 Hz reference frame, durations in milliseconds.

use serde::{Deserialize, Serialize};

/// Balance parameters for a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Run ===
    pub starting_lives: u32,
    /// Reaching this score ends the run in victory (None = endless)
    pub victory_score: Option<u64>,

    // === Player ===
    pub player_size: f32,
    pub player_speed: f32,
    /// Player baseline sits this far above the viewport bottom
    pub player_baseline_offset: f32,
    /// Horizontal margin the player is clamped to
    pub player_margin: f32,
    pub walk_speed: f32,
    pub bob_amount: f32,
    pub sway_amount: f32,

    // === Melee ===
    pub attack_duration_ms: f64,
    pub melee_width: f32,
    pub melee_height: f32,
    pub melee_score: u64,

    // === Lasers ===
    pub shoot_cooldown_ms: f64,
    pub laser_width: f32,
    pub laser_height: f32,
    pub laser_speed: f32,
    pub laser_glow_speed: f32,
    pub laser_score: u64,
    /// Lasers above `-laser_despawn_margin` are removed
    pub laser_despawn_margin: f32,

    // === Bears ===
    pub bear_size_ratio: f32,
    pub bear_size_min: f32,
    pub bear_size_max: f32,
    pub bear_size_jitter: f32,
    pub bear_speed_min: f32,
    pub bear_speed_max: f32,
    /// Every `difficulty_step_score` points add `difficulty_step_bonus` to the speed multiplier
    pub difficulty_step_score: u64,
    pub difficulty_step_bonus: f32,
    pub bear_spawn_margin: f32,
    /// Bears whose top passes `height + bear_escape_margin` escape
    pub bear_escape_margin: f32,
    pub bear_sway_rate: f32,
    pub bear_sway_ratio: f32,
    /// Probability of picking the walking animation on a state change
    pub bear_walk_weight: f64,
    pub bear_frame_interval_ms: (f32, f32),
    pub bear_first_state_ms: (f32, f32),
    pub bear_state_ms: (f32, f32),
    pub bear_walk_frames: u32,
    pub bear_attack_frames: u32,

    // === Spawning ===
    pub spawn_interval_ms: f32,
    pub spawn_interval_step_ms: f32,
    pub spawn_interval_floor_ms: f32,

    // === Explosions ===
    pub explosion_particles: (u32, u32),
    pub explosion_speed: f32,
    pub explosion_decay: (f32, f32),
    pub explosion_size: (f32, f32),
    pub explosion_gravity: f32,
    pub explosion_duration_ms: f32,

    // === Background ===
    pub background_speed: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            starting_lives: 3,
            victory_score: None,

            player_size: 288.0,
            player_speed: 15.0,
            player_baseline_offset: 370.0,
            player_margin: 10.0,
            walk_speed: 0.08,
            bob_amount: 8.0,
            sway_amount: 3.0,

            attack_duration_ms: 220.0,
            melee_width: 150.0,
            melee_height: 26.0,
            melee_score: 25,

            shoot_cooldown_ms: 300.0,
            laser_width: 16.0,
            laser_height: 35.0,
            laser_speed: 12.0,
            laser_glow_speed: 0.1,
            laser_score: 50,
            laser_despawn_margin: 50.0,

            bear_size_ratio: 0.35,
            bear_size_min: 200.0,
            bear_size_max: 350.0,
            bear_size_jitter: 0.1,
            bear_speed_min: 1.0,
            bear_speed_max: 2.8,
            difficulty_step_score: 400,
            difficulty_step_bonus: 0.3,
            bear_spawn_margin: 40.0,
            bear_escape_margin: 80.0,
            bear_sway_rate: 0.006,
            bear_sway_ratio: 0.08,
            bear_walk_weight: 0.9,
            bear_frame_interval_ms: (150.0, 250.0),
            bear_first_state_ms: (1000.0, 3000.0),
            bear_state_ms: (1500.0, 4000.0),
            bear_walk_frames: 4,
            bear_attack_frames: 4,

            spawn_interval_ms: 1200.0,
            spawn_interval_step_ms: 8.0,
            spawn_interval_floor_ms: 800.0,

            explosion_particles: (15, 25),
            explosion_speed: 4.0,
            explosion_decay: (0.02, 0.04),
            explosion_size: (3.0, 7.0),
            explosion_gravity: 0.1,
            explosion_duration_ms: 1000.0,

            background_speed: 1.5,
        }
    }
}

impl Tuning {
    /// Parse tuning overrides from JSON; absent fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Fall-speed multiplier for a given score (steps every `difficulty_step_score`)
    pub fn difficulty_multiplier(&self, score: u64) -> f32 {
        let steps = score / self.difficulty_step_score.max(1);
        1.0 + steps as f32 * self.difficulty_step_bonus
    }

    /// Base bear size for a viewport width, before per-spawn jitter
    pub fn bear_base_size(&self, viewport_width: f32) -> f32 {
        (viewport_width * self.bear_size_ratio).clamp(self.bear_size_min, self.bear_size_max)
    }
}
