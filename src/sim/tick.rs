//! Variable timestep simulation tick
//!
//! One call advances every entity by the same elapsed time. Movement constants
//! are per 60 Hz reference frame and scaled by the delta; timers run in ms.

use std::f32::consts::TAU;

use rand::Rng;

use super::spawn::{make_explosion, uniform, update_spawner};
use super::state::{Bear, BearAnim, GameEvent, GamePhase, GameState, Laser};
use crate::frames_for;
use crate::tuning::Tuning;

/// Player intent for a single tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInput {
    /// Held: walk left
    pub move_left: bool,
    /// Held: walk right (wins over left)
    pub move_right: bool,
    /// One-shot: start a melee swing
    pub attack: bool,
    /// One-shot: fire a laser
    pub shoot: bool,
}

/// Advance the game state by `dt_ms` milliseconds
pub fn tick(state: &mut GameState, input: &TickInput, dt_ms: f32) {
    // Don't tick once the run is over
    if !state.is_playing() {
        return;
    }

    let dt_ms = if dt_ms.is_finite() { dt_ms.max(0.0) } else { 0.0 };
    let frames = frames_for(dt_ms);
    state.clock_ms += dt_ms as f64;

    update_placement(state);
    state
        .background
        .advance(state.tuning.background_speed * frames);

    update_player(state, input, frames);

    if input.attack {
        start_attack(state);
    }
    if input.shoot {
        shoot_laser(state);
    }

    // Expire the melee swing
    if state.player.attacking
        && state.clock_ms - state.player.attack_start > state.tuning.attack_duration_ms
    {
        state.player.attacking = false;
    }

    if update_bears(state, frames, dt_ms) || check_victory(state) {
        return;
    }
    update_lasers(state, frames);
    if check_victory(state) {
        return;
    }
    update_explosions(state, frames, dt_ms);
    update_spawner(state, dt_ms);
}

/// Viewport-derived placement; idempotent while the viewport is unchanged
fn update_placement(state: &mut GameState) {
    let player = &mut state.player;
    player.size = glam::Vec2::splat(state.tuning.player_size);
    player.base_y = state.viewport.height - state.tuning.player_baseline_offset;
    state.background.fit(state.viewport);
}

fn update_player(state: &mut GameState, input: &TickInput, frames: f32) {
    let tuning = &state.tuning;
    let player = &mut state.player;

    player.vel_x = 0.0;
    if input.move_left {
        player.vel_x = -tuning.player_speed;
        player.facing = -1.0;
    }
    if input.move_right {
        player.vel_x = tuning.player_speed;
        player.facing = 1.0;
    }
    player.pos.x += player.vel_x * frames;
    let margin = tuning.player_margin;
    let max_x = (state.viewport.width - player.size.x - margin).max(margin);
    player.pos.x = player.pos.x.clamp(margin, max_x);

    // Walk cycle: vertical bob always, horizontal sway only while standing
    player.walk_cycle += tuning.walk_speed * frames;
    player.pos.y = player.base_y + player.walk_cycle.sin() * tuning.bob_amount;
    player.walk_offset_x = if player.vel_x == 0.0 {
        (player.walk_cycle * 0.7).sin() * tuning.sway_amount
    } else {
        0.0
    };
}

/// Begin a melee swing. Returns false if one is already in progress.
pub fn start_attack(state: &mut GameState) -> bool {
    if state.player.attacking {
        return false;
    }
    state.player.attacking = true;
    state.player.attack_start = state.clock_ms;
    state.events.push(GameEvent::MeleeSwing);
    true
}

/// Fire a laser from the player's gun hand. Returns false while on cooldown.
pub fn shoot_laser(state: &mut GameState) -> bool {
    if let Some(last) = state.last_shot
        && state.clock_ms - last < state.tuning.shoot_cooldown_ms
    {
        return false;
    }
    state.last_shot = Some(state.clock_ms);

    let gun = state.player.gun_position();
    let size = glam::Vec2::new(state.tuning.laser_width, state.tuning.laser_height);
    let id = state.next_entity_id();
    state.lasers.push(Laser {
        id,
        pos: glam::Vec2::new(gun.x - size.x / 2.0, gun.y),
        size,
        speed: state.tuning.laser_speed,
        glow: 0.0,
    });
    state.events.push(GameEvent::Shoot);
    true
}

/// Fall, animate and sway a single bear
fn advance_bear<R: Rng + ?Sized>(
    bear: &mut Bear,
    tuning: &Tuning,
    rng: &mut R,
    frames: f32,
    dt_ms: f32,
) {
    bear.pos.y += bear.speed * frames;

    bear.anim_time += dt_ms;
    bear.frame_timer += dt_ms;
    bear.state_timer += dt_ms;
    bear.run_phase += dt_ms * tuning.bear_sway_rate;

    if bear.state_timer >= bear.state_duration {
        bear.state_timer = 0.0;
        bear.state_duration = uniform(rng, tuning.bear_state_ms);
        bear.anim = if rng.random_bool(tuning.bear_walk_weight.clamp(0.0, 1.0)) {
            BearAnim::Walking
        } else {
            BearAnim::Attacking
        };
        bear.frame = 0;
    }

    if bear.frame_timer >= bear.frame_interval {
        bear.frame_timer = 0.0;
        let frame_count = match bear.anim {
            BearAnim::Walking => tuning.bear_walk_frames,
            BearAnim::Attacking => tuning.bear_attack_frames,
        };
        bear.frame = (bear.frame + 1) % frame_count.max(1);
    }

    bear.sway_x = (bear.run_phase * 1.2).sin() * bear.size * tuning.bear_sway_ratio;
}

/// Take a life. Returns true if that ended the run.
///
/// Both bear collisions and escaping bears route through here, so a run can
/// end either way.
fn lose_life(state: &mut GameState) -> bool {
    state.lives = state.lives.saturating_sub(1);
    if state.lives > 0 {
        return false;
    }
    state.phase = GamePhase::Defeated;
    state.events.push(GameEvent::Defeat { score: state.score });
    log::info!("Run lost with score {}", state.score);
    true
}

/// Move bears and resolve bear/player and bear/melee contacts.
/// Returns true if the run ended.
fn update_bears(state: &mut GameState, frames: f32, dt_ms: f32) -> bool {
    let bears = std::mem::take(&mut state.bears);
    let mut kept = Vec::with_capacity(bears.len());

    let player_rect = state.player.rect();
    let sword = state
        .player
        .attacking
        .then(|| state.player.sword_region(&state.tuning));
    let escape_y = state.viewport.height + state.tuning.bear_escape_margin;

    let mut remaining = bears.into_iter();
    while let Some(mut bear) = remaining.next() {
        advance_bear(&mut bear, &state.tuning, &mut state.rng, frames, dt_ms);
        let rect = bear.rect();

        if rect.overlaps(&player_rect) {
            state.events.push(GameEvent::PlayerHit);
            if lose_life(state) {
                kept.extend(remaining);
                state.bears = kept;
                return true;
            }
            continue;
        }

        if let Some(sword) = sword
            && sword.overlaps(&rect)
        {
            state.score += state.tuning.melee_score;
            state.events.push(GameEvent::Explosion);
            continue;
        }

        if bear.pos.y > escape_y {
            state.events.push(GameEvent::BearEscaped);
            if lose_life(state) {
                kept.extend(remaining);
                state.bears = kept;
                return true;
            }
            continue;
        }

        kept.push(bear);
    }

    state.bears = kept;
    false
}

/// Move lasers; each laser destroys at most one bear
fn update_lasers(state: &mut GameState, frames: f32) {
    let lasers = std::mem::take(&mut state.lasers);
    let mut kept = Vec::with_capacity(lasers.len());
    let despawn_y = -state.tuning.laser_despawn_margin;

    for mut laser in lasers {
        laser.pos.y -= laser.speed * frames;
        laser.glow = (laser.glow + state.tuning.laser_glow_speed * frames) % TAU;

        let laser_rect = laser.rect();
        // Newest bear first
        if let Some(index) = state
            .bears
            .iter()
            .rposition(|bear| laser_rect.overlaps(&bear.rect()))
        {
            let bear = state.bears.remove(index);
            state.score += state.tuning.laser_score;
            let explosion = make_explosion(&mut state.rng, &state.tuning, bear.rect().center());
            state.explosions.push(explosion);
            state.events.push(GameEvent::Explosion);
            continue;
        }

        if laser.pos.y < despawn_y {
            continue;
        }
        kept.push(laser);
    }

    state.lasers = kept;
}

fn update_explosions(state: &mut GameState, frames: f32, dt_ms: f32) {
    let gravity = state.tuning.explosion_gravity;
    for explosion in &mut state.explosions {
        explosion.time += dt_ms;
        for particle in &mut explosion.particles {
            particle.pos += particle.vel * frames;
            particle.vel.y += gravity * frames;
            particle.life -= particle.decay * frames;
        }
        explosion.particles.retain(|p| p.life > 0.0);
    }
    state.explosions.retain(|e| !e.is_finished());
}

/// End the run in victory once the configured score is reached
fn check_victory(state: &mut GameState) -> bool {
    match state.tuning.victory_score {
        Some(target) if state.is_playing() && state.score >= target => {
            state.phase = GamePhase::Victorious;
            state.events.push(GameEvent::Victory { score: state.score });
            log::info!("Run won with score {}", state.score);
            true
        }
        _ => !state.is_playing(),
    }
}
