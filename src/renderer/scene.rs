//! Scene building
//!
//! Turns a `&GameState` into an ordered list of draw commands. This is a pure
//! read: nothing here mutates the game, and the same state always produces
//! the same scene.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::sprite::{SpriteSheet, bear_frame_index};
use super::vertex::colors::{self, with_alpha};
use crate::settings::Settings;
use crate::sim::{BearAnim, GameState, ParticleColor, Rect, Viewport};

/// Height of the translucent ground band at the bottom of the screen
pub const GROUND_HEIGHT: f32 = 40.0;

/// Images the renderer can sample from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureId {
    /// 1×1 white pixel for flat-colored geometry
    White,
    Background,
    Player,
    Bears,
}

impl TextureId {
    pub const ALL: [TextureId; 4] = [
        TextureId::White,
        TextureId::Background,
        TextureId::Player,
        TextureId::Bears,
    ];

    pub fn index(self) -> usize {
        match self {
            TextureId::White => 0,
            TextureId::Background => 1,
            TextureId::Player => 2,
            TextureId::Bears => 3,
        }
    }
}

/// Draw layers, back to front
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Layer {
    Background,
    Ground,
    Bears,
    Particles,
    Lasers,
    Melee,
    Player,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCmd {
    /// Textured (or flat, with `TextureId::White`) rectangle
    Quad {
        layer: Layer,
        texture: TextureId,
        dst: Rect,
        uv: [f32; 4],
        color: [f32; 4],
        flip_x: bool,
    },
    /// Flat filled circle
    Circle {
        layer: Layer,
        center: Vec2,
        radius: f32,
        color: [f32; 4],
    },
}

impl DrawCmd {
    pub fn layer(&self) -> Layer {
        match self {
            DrawCmd::Quad { layer, .. } | DrawCmd::Circle { layer, .. } => *layer,
        }
    }

    pub fn texture(&self) -> TextureId {
        match self {
            DrawCmd::Quad { texture, .. } => *texture,
            DrawCmd::Circle { .. } => TextureId::White,
        }
    }
}

/// Which images have finished loading
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoadedAssets {
    pub background: bool,
    pub player: bool,
    pub bears: Option<SpriteSheet>,
}

/// A frame's worth of draw commands in paint order
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    /// Logical size the commands are expressed in
    pub viewport: Viewport,
    pub clear: [f32; 4],
    pub commands: Vec<DrawCmd>,
}

const FULL_UV: [f32; 4] = [0.0, 0.0, 1.0, 1.0];

fn flat(layer: Layer, dst: Rect, color: [f32; 4]) -> DrawCmd {
    DrawCmd::Quad {
        layer,
        texture: TextureId::White,
        dst,
        uv: FULL_UV,
        color,
        flip_x: false,
    }
}

/// Build the scene for the current state
pub fn build_scene(state: &GameState, assets: &LoadedAssets, settings: &Settings) -> Scene {
    let mut commands = Vec::with_capacity(
        8 + state.bears.len() * 2 + state.lasers.len() * 4 + state.particle_count() * 3,
    );

    push_background(&mut commands, state, assets);
    push_ground(&mut commands, state.viewport);
    push_bears(&mut commands, state, assets, settings);
    if settings.particles {
        push_particles(&mut commands, state, settings);
    }
    push_lasers(&mut commands, state, settings);
    push_melee(&mut commands, state, settings);
    push_player(&mut commands, state, assets);

    Scene {
        viewport: state.viewport,
        clear: colors::CLEAR,
        commands,
    }
}

/// Vertically tiled copies of the background, covering the viewport while it scrolls
fn push_background(commands: &mut Vec<DrawCmd>, state: &GameState, assets: &LoadedAssets) {
    let bg = &state.background;
    let Some(image) = bg.image_size else {
        return;
    };
    if !assets.background || bg.scaled_height <= 0.0 {
        return;
    }

    let Viewport { width, height } = state.viewport;
    let scaled_width = image.x * bg.scale;
    let scaled_height = bg.scaled_height;
    let x = (width - scaled_width) / 2.0;
    let offset = bg.offset % scaled_height;
    let copies = (height / scaled_height).ceil() as i32 + 2;

    for i in -1..copies {
        let y = offset + i as f32 * scaled_height;
        if y + scaled_height > 0.0 && y < height {
            commands.push(DrawCmd::Quad {
                layer: Layer::Background,
                texture: TextureId::Background,
                dst: Rect::new(x, y, scaled_width, scaled_height),
                uv: FULL_UV,
                color: colors::WHITE,
                flip_x: false,
            });
        }
    }
}

fn push_ground(commands: &mut Vec<DrawCmd>, viewport: Viewport) {
    commands.push(flat(
        Layer::Ground,
        Rect::new(
            0.0,
            viewport.height - GROUND_HEIGHT,
            viewport.width,
            GROUND_HEIGHT,
        ),
        colors::GROUND,
    ));
}

fn push_bears(
    commands: &mut Vec<DrawCmd>,
    state: &GameState,
    assets: &LoadedAssets,
    settings: &Settings,
) {
    let Some(sheet) = assets.bears else {
        return;
    };

    for bear in &state.bears {
        let dst = bear.rect();
        let uv = sheet.frame_uv(bear_frame_index(bear.anim, bear.frame));
        let attacking = bear.anim == BearAnim::Attacking;

        let alpha = if attacking && settings.effective_pulse() {
            0.95 + 0.05 * (bear.anim_time * 0.01).sin()
        } else {
            1.0
        };

        if attacking && settings.glow {
            commands.push(DrawCmd::Quad {
                layer: Layer::Bears,
                texture: TextureId::Bears,
                dst: dst.inflate(6.0),
                uv,
                color: with_alpha(colors::BEAR_GLOW, 0.35 * alpha),
                flip_x: false,
            });
        }

        commands.push(DrawCmd::Quad {
            layer: Layer::Bears,
            texture: TextureId::Bears,
            dst,
            uv,
            color: with_alpha(colors::WHITE, alpha),
            flip_x: false,
        });

        if attacking && bear.frame == 2 && settings.effective_sparks() {
            push_sparks(commands, bear.id, bear.anim_time, dst);
        }
    }
}

/// Occasional sparks from an attacking bear's claws.
/// Randomness is keyed on the bear and its animation clock, so a given state
/// always draws the same sparks.
fn push_sparks(commands: &mut Vec<DrawCmd>, bear_id: u32, anim_time: f32, dst: Rect) {
    let tick = (anim_time / crate::consts::REFERENCE_FRAME_MS) as u64;
    let mut rng = Pcg32::seed_from_u64((u64::from(bear_id) << 32) ^ tick);
    if !rng.random_bool(0.2) {
        return;
    }
    for _ in 0..2 {
        let center = Vec2::new(
            dst.x + dst.w * 0.7 + rng.random_range(-10.0..10.0),
            dst.y + dst.h * 0.3 + rng.random_range(-10.0..10.0),
        );
        commands.push(DrawCmd::Circle {
            layer: Layer::Bears,
            center,
            radius: rng.random_range(1.0..3.0),
            color: with_alpha(colors::SPARK, rng.random_range(0.3..0.6)),
        });
    }
}

fn push_particles(commands: &mut Vec<DrawCmd>, state: &GameState, settings: &Settings) {
    for particle in state.explosions.iter().flat_map(|e| &e.particles) {
        let life = particle.life.clamp(0.0, 1.0);
        let radius = particle.size * life;
        if radius <= 0.0 {
            continue;
        }
        let base = match particle.color {
            ParticleColor::Orange => colors::ORANGE,
            ParticleColor::Red => colors::RED,
        };

        if settings.glow {
            commands.push(DrawCmd::Circle {
                layer: Layer::Particles,
                center: particle.pos,
                radius: radius + 8.0 * life,
                color: with_alpha(base, 0.25 * life),
            });
        }
        commands.push(DrawCmd::Circle {
            layer: Layer::Particles,
            center: particle.pos,
            radius,
            color: with_alpha(base, life),
        });
        commands.push(DrawCmd::Circle {
            layer: Layer::Particles,
            center: particle.pos,
            radius: radius * 0.5,
            color: with_alpha(colors::WHITE, life),
        });
    }
}

fn push_lasers(commands: &mut Vec<DrawCmd>, state: &GameState, settings: &Settings) {
    for laser in &state.lasers {
        let intensity = 0.8 + 0.2 * (laser.glow * 4.0).sin();
        let r = laser.rect();

        if settings.glow {
            let glow_size = 25.0 + 10.0 * (laser.glow * 2.0).sin();
            commands.push(flat(
                Layer::Lasers,
                r.inflate(glow_size * 0.3),
                with_alpha(colors::CYAN, intensity * 0.12),
            ));
            commands.push(flat(
                Layer::Lasers,
                Rect::new(r.x - 4.0, r.y, r.w + 8.0, r.h),
                with_alpha(colors::CYAN, intensity * 0.3),
            ));
        }
        commands.push(flat(
            Layer::Lasers,
            r,
            with_alpha(colors::CYAN, intensity),
        ));
        commands.push(flat(
            Layer::Lasers,
            Rect::new(r.x + 3.0, r.y, (r.w - 6.0).max(0.0), r.h),
            with_alpha(colors::WHITE, intensity * 0.9),
        ));
        commands.push(flat(
            Layer::Lasers,
            Rect::new(r.x + 6.0, r.y, (r.w - 12.0).max(0.0), r.h),
            with_alpha(colors::WHITE, intensity),
        ));
    }
}

fn push_melee(commands: &mut Vec<DrawCmd>, state: &GameState, settings: &Settings) {
    if !state.player.attacking {
        return;
    }
    let sword = state.player.sword_region(&state.tuning);
    if settings.glow {
        commands.push(flat(
            Layer::Melee,
            sword.inflate(6.0),
            with_alpha(colors::LIME, 0.25),
        ));
    }
    commands.push(flat(Layer::Melee, sword, with_alpha(colors::LIME, 0.8)));
}

fn push_player(commands: &mut Vec<DrawCmd>, state: &GameState, assets: &LoadedAssets) {
    if !assets.player {
        return;
    }
    commands.push(DrawCmd::Quad {
        layer: Layer::Player,
        texture: TextureId::Player,
        dst: state.player.draw_rect(),
        uv: FULL_UV,
        color: colors::WHITE,
        flip_x: !state.player.facing_right(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Bear, GameState, TickInput, Viewport, make_explosion, tick};
    use crate::tuning::Tuning;

    fn all_assets() -> LoadedAssets {
        LoadedAssets {
            background: true,
            player: true,
            bears: Some(SpriteSheet::bears(800, 400)),
        }
    }

    fn busy_state() -> GameState {
        let mut state = GameState::new(3, Tuning::default(), Viewport::new(1280.0, 720.0));
        state.set_background_size(640.0, 480.0);
        let input = TickInput {
            shoot: true,
            attack: true,
            ..Default::default()
        };
        tick(&mut state, &input, 16.0);
        let id = state.next_entity_id();
        let mut bear = crate::sim::make_bear(&mut state.rng, &state.tuning, state.viewport, 0, id);
        bear.pos = Vec2::new(700.0, 50.0);
        state.bears.push(bear);
        let explosion = make_explosion(&mut state.rng, &state.tuning, Vec2::new(500.0, 200.0));
        state.explosions.push(explosion);
        state
    }

    fn count_layer(scene: &Scene, layer: Layer) -> usize {
        scene.commands.iter().filter(|c| c.layer() == layer).count()
    }

    #[test]
    fn test_texture_slots_are_distinct() {
        for (i, id) in TextureId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
        }
    }

    #[test]
    fn test_layers_in_paint_order() {
        let scene = build_scene(&busy_state(), &all_assets(), &Settings::default());
        let layers: Vec<Layer> = scene.commands.iter().map(DrawCmd::layer).collect();
        assert!(layers.windows(2).all(|w| w[0] <= w[1]));
        for layer in [
            Layer::Background,
            Layer::Ground,
            Layer::Bears,
            Layer::Particles,
            Layer::Lasers,
            Layer::Melee,
            Layer::Player,
        ] {
            assert!(count_layer(&scene, layer) > 0, "missing {:?}", layer);
        }
    }

    #[test]
    fn test_missing_images_skip_their_layers() {
        let state = busy_state();
        let scene = build_scene(&state, &LoadedAssets::default(), &Settings::default());
        assert_eq!(count_layer(&scene, Layer::Background), 0);
        assert_eq!(count_layer(&scene, Layer::Bears), 0);
        assert_eq!(count_layer(&scene, Layer::Player), 0);
        assert_eq!(count_layer(&scene, Layer::Ground), 1);
        assert!(count_layer(&scene, Layer::Lasers) > 0);
    }

    #[test]
    fn test_background_tiles_cover_viewport() {
        let mut state = GameState::new(1, Tuning::default(), Viewport::new(1000.0, 800.0));
        state.set_background_size(500.0, 300.0);
        // scale = max(2, 2.67) -> scaled height 800, same as the viewport
        state.background.offset = 123.0;
        let scene = build_scene(&state, &all_assets(), &Settings::default());
        let tiles: Vec<Rect> = scene
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCmd::Quad {
                    layer: Layer::Background,
                    dst,
                    ..
                } => Some(*dst),
                _ => None,
            })
            .collect();
        assert_eq!(tiles.len(), 2);
        assert!(tiles.iter().any(|t| t.y <= 0.0 && t.bottom() > 0.0));
        assert!(tiles.iter().any(|t| t.y < 800.0 && t.bottom() >= 800.0));
        // Horizontally centred
        assert!((tiles[0].x - (1000.0 - tiles[0].w) / 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_player_mirrored_when_facing_left() {
        let mut state = busy_state();
        state.player.facing = -1.0;
        let scene = build_scene(&state, &all_assets(), &Settings::default());
        let flipped = scene.commands.iter().any(|c| {
            matches!(
                c,
                DrawCmd::Quad {
                    layer: Layer::Player,
                    flip_x: true,
                    ..
                }
            )
        });
        assert!(flipped);
    }

    #[test]
    fn test_attacking_bear_uses_second_row() {
        let mut state = busy_state();
        state.bears[0].anim = BearAnim::Attacking;
        state.bears[0].frame = 1;
        let settings = Settings {
            glow: false,
            ..Settings::default()
        };
        let scene = build_scene(&state, &all_assets(), &settings);
        let uv = scene.commands.iter().find_map(|c| match c {
            DrawCmd::Quad {
                texture: TextureId::Bears,
                uv,
                ..
            } => Some(*uv),
            _ => None,
        });
        assert_eq!(uv, Some([0.25, 0.5, 0.5, 1.0]));
    }

    #[test]
    fn test_particles_toggle() {
        let state = busy_state();
        let settings = Settings {
            particles: false,
            ..Settings::default()
        };
        let scene = build_scene(&state, &all_assets(), &settings);
        assert_eq!(count_layer(&scene, Layer::Particles), 0);
    }

    #[test]
    fn test_scene_is_a_pure_read() {
        let mut state = busy_state();
        for bear in &mut state.bears {
            bear.anim = BearAnim::Attacking;
            bear.frame = 2;
        }
        let a = build_scene(&state, &all_assets(), &Settings::default());
        let b = build_scene(&state, &all_assets(), &Settings::default());
        assert_eq!(a, b);
    }

    #[test]
    fn test_bear_rect_includes_sway() {
        let mut state = busy_state();
        let bear: &mut Bear = &mut state.bears[0];
        bear.anim = BearAnim::Walking;
        bear.sway_x = 12.0;
        let expected = bear.rect();
        let scene = build_scene(&state, &all_assets(), &Settings::default());
        let dst = scene.commands.iter().find_map(|c| match c {
            DrawCmd::Quad {
                texture: TextureId::Bears,
                dst,
                ..
            } => Some(*dst),
            _ => None,
        });
        assert_eq!(dst, Some(expected));
    }
}
