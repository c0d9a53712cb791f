//! Input mapping
//!
//! Raw key codes and touch points are translated into intents. Held
//! directions persist until released; attack, shoot and start are latched
//! until the next step consumes them.

use crate::consts::DOUBLE_TAP_MS;
use crate::sim::{Rect, TickInput};

/// Something the player wants to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    MoveLeft,
    MoveRight,
    Attack,
    Shoot,
    StartGame,
}

#[derive(Debug, Default, Clone)]
pub struct InputMapper {
    /// While true only the start keys do anything
    pub intro: bool,
    left: bool,
    right: bool,
    attack: bool,
    shoot: bool,
    start: bool,
    last_tap_ms: Option<f64>,
}

impl InputMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle a key press by `KeyboardEvent.code`.
    /// Returns the intent it mapped to; the caller should suppress the
    /// browser default for mapped keys.
    pub fn key_down(&mut self, code: &str) -> Option<Intent> {
        if self.intro {
            return match code {
                "Enter" | "Space" => {
                    self.start = true;
                    Some(Intent::StartGame)
                }
                _ => None,
            };
        }

        let intent = match code {
            "ArrowLeft" | "KeyA" => Intent::MoveLeft,
            "ArrowRight" | "KeyD" => Intent::MoveRight,
            "Space" => Intent::Shoot,
            "KeyZ" | "Enter" => Intent::Attack,
            _ => return None,
        };
        self.apply(intent);
        Some(intent)
    }

    pub fn key_up(&mut self, code: &str) {
        match code {
            "ArrowLeft" | "KeyA" => self.left = false,
            "ArrowRight" | "KeyD" => self.right = false,
            _ => {}
        }
    }

    /// Handle a new touch at canvas coordinates.
    ///
    /// A second tap within the double-tap window shoots. Otherwise a tap level
    /// with the player's body attacks, and anywhere else walks toward the tap.
    pub fn touch_start(&mut self, x: f32, y: f32, player: Rect, now_ms: f64) -> Option<Intent> {
        if self.intro {
            return None;
        }

        if self
            .last_tap_ms
            .is_some_and(|last| now_ms - last < DOUBLE_TAP_MS)
        {
            self.last_tap_ms = None;
            self.apply(Intent::Shoot);
            return Some(Intent::Shoot);
        }
        self.last_tap_ms = Some(now_ms);

        if y >= player.y && y <= player.bottom() {
            self.apply(Intent::Attack);
            return Some(Intent::Attack);
        }

        Some(self.steer(x, player.center().x))
    }

    /// Steer toward a dragged touch point
    pub fn touch_move(&mut self, x: f32, player_center_x: f32) -> Option<Intent> {
        if self.intro {
            return None;
        }
        Some(self.steer(x, player_center_x))
    }

    pub fn touch_end(&mut self) {
        self.left = false;
        self.right = false;
    }

    fn steer(&mut self, x: f32, player_center_x: f32) -> Intent {
        let intent = if x < player_center_x {
            Intent::MoveLeft
        } else {
            Intent::MoveRight
        };
        self.left = intent == Intent::MoveLeft;
        self.right = intent == Intent::MoveRight;
        intent
    }

    fn apply(&mut self, intent: Intent) {
        match intent {
            Intent::MoveLeft => self.left = true,
            Intent::MoveRight => self.right = true,
            Intent::Attack => self.attack = true,
            Intent::Shoot => self.shoot = true,
            Intent::StartGame => self.start = true,
        }
    }

    /// Intent for the next step; one-shot actions are consumed
    pub fn take_tick_input(&mut self) -> TickInput {
        TickInput {
            move_left: self.left,
            move_right: self.right,
            attack: std::mem::take(&mut self.attack),
            shoot: std::mem::take(&mut self.shoot),
        }
    }

    /// Consume a pending start request
    pub fn take_start(&mut self) -> bool {
        std::mem::take(&mut self.start)
    }

    /// Forget everything held or latched (e.g. on restart)
    pub fn clear(&mut self) {
        *self = Self {
            intro: self.intro,
            ..Self::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> Rect {
        Rect::new(100.0, 300.0, 288.0, 288.0)
    }

    #[test]
    fn test_keys_map_to_intents() {
        let mut input = InputMapper::new();
        assert_eq!(input.key_down("KeyA"), Some(Intent::MoveLeft));
        assert_eq!(input.key_down("ArrowRight"), Some(Intent::MoveRight));
        assert_eq!(input.key_down("Space"), Some(Intent::Shoot));
        assert_eq!(input.key_down("Enter"), Some(Intent::Attack));
        assert_eq!(input.key_down("KeyQ"), None);

        let tick = input.take_tick_input();
        assert!(tick.move_left && tick.move_right && tick.attack && tick.shoot);

        // One-shots are consumed, held keys persist
        let tick = input.take_tick_input();
        assert!(tick.move_left && !tick.attack && !tick.shoot);

        input.key_up("ArrowLeft");
        assert!(!input.take_tick_input().move_left);
    }

    #[test]
    fn test_intro_only_accepts_start_keys() {
        let mut input = InputMapper {
            intro: true,
            ..Default::default()
        };
        assert_eq!(input.key_down("KeyZ"), None);
        assert_eq!(input.key_down("ArrowLeft"), None);
        assert_eq!(input.touch_start(0.0, 0.0, player(), 0.0), None);
        assert_eq!(input.key_down("Space"), Some(Intent::StartGame));
        assert!(input.take_start());
        assert!(!input.take_start());
        assert_eq!(input.take_tick_input(), TickInput::default());
    }

    #[test]
    fn test_double_tap_shoots() {
        let mut input = InputMapper::new();
        assert_eq!(
            input.touch_start(50.0, 50.0, player(), 1000.0),
            Some(Intent::MoveLeft)
        );
        assert_eq!(
            input.touch_start(50.0, 50.0, player(), 1250.0),
            Some(Intent::Shoot)
        );
        // The window resets after a double tap
        assert_eq!(
            input.touch_start(50.0, 50.0, player(), 1400.0),
            Some(Intent::MoveLeft)
        );
        assert_eq!(
            input.touch_start(50.0, 50.0, player(), 1800.0),
            Some(Intent::MoveLeft)
        );
    }

    #[test]
    fn test_tap_on_body_attacks_and_sides_steer() {
        let mut input = InputMapper::new();
        assert_eq!(
            input.touch_start(700.0, 400.0, player(), 0.0),
            Some(Intent::Attack)
        );
        assert_eq!(
            input.touch_start(900.0, 50.0, player(), 1000.0),
            Some(Intent::MoveRight)
        );
        assert_eq!(input.touch_move(10.0, player().center().x), Some(Intent::MoveLeft));
        let tick = input.take_tick_input();
        assert!(tick.move_left && !tick.move_right && tick.attack);

        input.touch_end();
        let tick = input.take_tick_input();
        assert!(!tick.move_left && !tick.move_right);
    }

    #[test]
    fn test_clear_keeps_intro_flag() {
        let mut input = InputMapper::new();
        input.key_down("KeyA");
        input.key_down("Space");
        input.intro = true;
        input.clear();
        assert!(input.intro);
        assert_eq!(input.take_tick_input(), TickInput::default());
    }
}
