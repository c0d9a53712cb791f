//! Simulation module
//!
//! All gameplay logic lives here. This module stays pure and reproducible:
//! - Variable timestep, scaled to a 60 Hz reference frame
//! - Seeded RNG only
//! - Stable iteration order (spawn order)
//! - No rendering or platform dependencies

pub mod collision;
pub mod spawn;
pub mod state;
pub mod tick;

pub use collision::{Rect, rects_collide};
pub use spawn::{make_bear, make_explosion, spawn_bear, update_spawner};
pub use state::{
    BackgroundScroll, Bear, BearAnim, Explosion, GameEvent, GamePhase, GameState, Laser,
    Particle, ParticleColor, Player, Viewport,
};
pub use tick::{TickInput, shoot_laser, start_attack, tick};
