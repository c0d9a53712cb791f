//! Game state and core simulation types
//!
//! All mutable state of a run lives in [`GameState`]; the renderer only ever
//! sees it through a shared reference.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::collision::Rect;
use crate::tuning::Tuning;

/// Current phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// Lives ran out; frozen until reset
    Defeated,
    /// Victory score reached; frozen until reset
    Victorious,
}

/// Something that happened during a tick, drained by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// A laser was fired
    Shoot,
    /// A melee swing started
    MeleeSwing,
    /// A bear was destroyed by melee or laser
    Explosion,
    /// A bear reached the player
    PlayerHit,
    /// A bear fell past the bottom of the screen
    BearEscaped,
    /// Lives reached zero
    Defeat { score: u64 },
    /// The victory score was reached
    Victory { score: u64 },
}

/// Drawing surface size in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 720.0)
    }
}

/// The player character
#[derive(Debug, Clone)]
pub struct Player {
    /// Top-left corner (y includes the walk bob)
    pub pos: Vec2,
    pub size: Vec2,
    pub vel_x: f32,
    /// +1 facing right, -1 facing left
    pub facing: f32,
    pub attacking: bool,
    /// Sim clock (ms) at which the current attack started
    pub attack_start: f64,
    pub walk_cycle: f32,
    /// Horizontal walk sway, zero while moving
    pub walk_offset_x: f32,
    pub base_y: f32,
}

impl Player {
    pub fn new(tuning: &Tuning, viewport: Viewport) -> Self {
        let base_y = viewport.height - tuning.player_baseline_offset;
        Self {
            pos: Vec2::new(100.0, base_y),
            size: Vec2::splat(tuning.player_size),
            vel_x: 0.0,
            facing: 1.0,
            attacking: false,
            attack_start: 0.0,
            walk_cycle: 0.0,
            walk_offset_x: 0.0,
            base_y,
        }
    }

    /// Collision box (the walk sway is cosmetic and not part of it)
    pub fn rect(&self) -> Rect {
        Rect::from_pos_size(self.pos, self.size)
    }

    /// Where the sprite is drawn
    pub fn draw_rect(&self) -> Rect {
        Rect::new(
            self.pos.x + self.walk_offset_x,
            self.pos.y,
            self.size.x,
            self.size.y,
        )
    }

    pub fn center_x(&self) -> f32 {
        self.pos.x + self.size.x / 2.0
    }

    pub fn facing_right(&self) -> bool {
        self.facing > 0.0
    }

    /// Melee hitbox in front of the player, only meaningful while attacking
    pub fn sword_region(&self, tuning: &Tuning) -> Rect {
        let y = self.pos.y + self.size.y * 0.33;
        let x = if self.facing_right() {
            self.pos.x + self.size.x * 0.75
        } else {
            self.pos.x - tuning.melee_width * 0.78
        };
        Rect::new(x, y, tuning.melee_width, tuning.melee_height)
    }

    /// Muzzle position of the hand-mounted laser
    pub fn gun_position(&self) -> Vec2 {
        let x = if self.facing_right() {
            self.pos.x + self.size.x * 0.75
        } else {
            self.pos.x + self.size.x * 0.25
        };
        Vec2::new(x, self.pos.y + self.size.y * 0.35)
    }
}

/// Bear sprite animation state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BearAnim {
    Walking,
    Attacking,
}

/// An enemy descending from the top of the screen
#[derive(Debug, Clone)]
pub struct Bear {
    pub id: u32,
    pub pos: Vec2,
    pub size: f32,
    /// Fall speed per reference frame (difficulty already applied)
    pub speed: f32,
    pub anim: BearAnim,
    pub frame: u32,
    pub frame_timer: f32,
    pub frame_interval: f32,
    pub state_timer: f32,
    pub state_duration: f32,
    /// Total time alive (ms), drives cosmetic pulsing
    pub anim_time: f32,
    pub run_phase: f32,
    /// Horizontal sway applied on top of `pos.x`
    pub sway_x: f32,
}

impl Bear {
    /// Sway-adjusted hit box, also used for drawing
    pub fn rect(&self) -> Rect {
        Rect::new(self.pos.x + self.sway_x, self.pos.y, self.size, self.size)
    }
}

/// A projectile travelling straight up
#[derive(Debug, Clone)]
pub struct Laser {
    pub id: u32,
    pub pos: Vec2,
    pub size: Vec2,
    pub speed: f32,
    /// Pulse phase in [0, 2π)
    pub glow: f32,
}

impl Laser {
    pub fn rect(&self) -> Rect {
        Rect::from_pos_size(self.pos, self.size)
    }
}

/// Particle palette
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleColor {
    Orange,
    Red,
}

/// A particle for visual effects
#[derive(Debug, Clone)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub life: f32, // 0-1, decreases over time
    pub decay: f32,
    pub size: f32,
    pub color: ParticleColor,
}

/// A burst of particles spawned by a laser kill
#[derive(Debug, Clone)]
pub struct Explosion {
    pub particles: Vec<Particle>,
    /// Age in ms
    pub time: f32,
    pub duration: f32,
}

impl Explosion {
    pub fn is_finished(&self) -> bool {
        self.particles.is_empty() || self.time > self.duration
    }
}

/// Vertically looping background strip
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundScroll {
    /// Source image size in pixels, unknown until the image loads
    pub image_size: Option<Vec2>,
    pub scale: f32,
    pub scaled_height: f32,
    /// Offset in [0, scaled_height)
    pub offset: f32,
}

impl Default for BackgroundScroll {
    fn default() -> Self {
        Self {
            image_size: None,
            scale: 1.0,
            scaled_height: 0.0,
            offset: 0.0,
        }
    }
}

impl BackgroundScroll {
    /// Recompute the cover scale for a viewport; a no-op when nothing changed
    pub fn fit(&mut self, viewport: Viewport) {
        let Some(image) = self.image_size else {
            return;
        };
        if image.x <= 0.0 || image.y <= 0.0 {
            return;
        }
        let scale = (viewport.width / image.x).max(viewport.height / image.y);
        self.scale = scale;
        self.scaled_height = image.y * scale;
        if self.offset >= self.scaled_height {
            self.offset %= self.scaled_height;
        }
    }

    pub fn advance(&mut self, distance: f32) {
        if self.scaled_height <= 0.0 {
            return;
        }
        self.offset = (self.offset + distance) % self.scaled_height;
    }
}

/// Complete game state for a run
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    pub tuning: Tuning,
    pub viewport: Viewport,
    pub phase: GamePhase,
    pub lives: u32,
    pub score: u64,
    /// Simulation clock in ms (sum of all tick deltas)
    pub clock_ms: f64,
    /// Sim clock of the last accepted shot
    pub last_shot: Option<f64>,
    pub player: Player,
    /// Active bears, in spawn order
    pub bears: Vec<Bear>,
    /// Active lasers, in fire order
    pub lasers: Vec<Laser>,
    pub explosions: Vec<Explosion>,
    pub background: BackgroundScroll,
    pub spawn_timer: f32,
    pub spawn_interval: f32,
    /// Events emitted since the driver last drained them
    pub events: Vec<GameEvent>,
    /// Next entity ID
    next_id: u32,
}

impl GameState {
    /// Create a new run with the given seed
    pub fn new(seed: u64, tuning: Tuning, viewport: Viewport) -> Self {
        let player = Player::new(&tuning, viewport);
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            lives: tuning.starting_lives,
            spawn_interval: tuning.spawn_interval_ms,
            tuning,
            viewport,
            phase: GamePhase::Playing,
            score: 0,
            clock_ms: 0.0,
            last_shot: None,
            player,
            bears: Vec::new(),
            lasers: Vec::new(),
            explosions: Vec::new(),
            background: BackgroundScroll::default(),
            spawn_timer: 0.0,
            events: Vec::new(),
            next_id: 1,
        }
    }

    /// Start over with a fresh seed, keeping tuning, viewport and background
    pub fn reset(&mut self, seed: u64) {
        let background = BackgroundScroll {
            offset: 0.0,
            ..self.background
        };
        *self = Self::new(seed, self.tuning.clone(), self.viewport);
        self.background = background;
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn is_playing(&self) -> bool {
        self.phase == GamePhase::Playing
    }

    /// Hand over accumulated events
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Record the size of the loaded background image
    pub fn set_background_size(&mut self, width: f32, height: f32) {
        self.background.image_size = Some(Vec2::new(width, height));
        self.background.fit(self.viewport);
    }

    /// Total particles across all explosion groups
    pub fn particle_count(&self) -> usize {
        self.explosions.iter().map(|e| e.particles.len()).sum()
    }
}
