//! Enemy and effect spawning
//!
//! Bears arrive on a timer that tightens over time, independent of score; their
//! fall speed scales with score in discrete difficulty steps.

use glam::Vec2;
use rand::Rng;

use super::state::{Bear, BearAnim, Explosion, GameState, Particle, ParticleColor, Viewport};
use crate::tuning::Tuning;

/// Uniform sample in `[lo, hi)`, collapsing to `lo` for empty ranges
pub(crate) fn uniform<R: Rng + ?Sized>(rng: &mut R, (lo, hi): (f32, f32)) -> f32 {
    if hi > lo { rng.random_range(lo..hi) } else { lo }
}

/// Build a bear above the top edge of the viewport
pub fn make_bear<R: Rng + ?Sized>(
    rng: &mut R,
    tuning: &Tuning,
    viewport: Viewport,
    score: u64,
    id: u32,
) -> Bear {
    let jitter = tuning.bear_size_jitter;
    let size = tuning.bear_base_size(viewport.width) * uniform(rng, (1.0 - jitter, 1.0 + jitter));
    let speed = uniform(rng, (tuning.bear_speed_min, tuning.bear_speed_max))
        * tuning.difficulty_multiplier(score);

    let margin = tuning.bear_spawn_margin / 2.0;
    let x = uniform(rng, (margin, viewport.width - size - margin));

    Bear {
        id,
        pos: Vec2::new(x, -size - tuning.bear_spawn_margin),
        size,
        speed,
        anim: BearAnim::Walking,
        frame: 0,
        frame_timer: 0.0,
        frame_interval: uniform(rng, tuning.bear_frame_interval_ms),
        state_timer: 0.0,
        state_duration: uniform(rng, tuning.bear_first_state_ms),
        anim_time: 0.0,
        run_phase: uniform(rng, (0.0, std::f32::consts::TAU)),
        sway_x: 0.0,
    }
}

/// Spawn a bear into the registry
pub fn spawn_bear(state: &mut GameState) {
    let id = state.next_entity_id();
    let bear = make_bear(
        &mut state.rng,
        &state.tuning,
        state.viewport,
        state.score,
        id,
    );
    log::debug!(
        "Spawned bear {} (size {:.0}, speed {:.2})",
        bear.id,
        bear.size,
        bear.speed
    );
    state.bears.push(bear);
}

/// Advance the spawn timer, spawning when due. Returns true if a bear spawned.
pub fn update_spawner(state: &mut GameState, dt_ms: f32) -> bool {
    state.spawn_timer += dt_ms;
    if state.spawn_timer < state.spawn_interval {
        return false;
    }
    state.spawn_timer = 0.0;
    spawn_bear(state);
    state.spawn_interval = (state.spawn_interval - state.tuning.spawn_interval_step_ms)
        .max(state.tuning.spawn_interval_floor_ms);
    true
}

/// Build a particle burst centred on `center`
pub fn make_explosion<R: Rng + ?Sized>(rng: &mut R, tuning: &Tuning, center: Vec2) -> Explosion {
    let (lo, hi) = tuning.explosion_particles;
    let count = if hi > lo { rng.random_range(lo..hi) } else { lo };
    let speed = tuning.explosion_speed;

    let particles = (0..count)
        .map(|_| Particle {
            pos: center,
            vel: Vec2::new(
                uniform(rng, (-speed, speed)),
                uniform(rng, (-speed, speed)),
            ),
            life: 1.0,
            decay: uniform(rng, tuning.explosion_decay),
            size: uniform(rng, tuning.explosion_size),
            color: if rng.random_bool(0.5) {
                ParticleColor::Orange
            } else {
                ParticleColor::Red
            },
        })
        .collect();

    Explosion {
        particles,
        time: 0.0,
        duration: tuning.explosion_duration_ms,
    }
}
