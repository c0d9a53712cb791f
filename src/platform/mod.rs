//! Platform abstraction layer
//!
//! The game core talks to the host only through the ports defined here:
//! - Audio feedback for gameplay events
//! - Score/lives status display
//! - Profile prompt and terminal (defeat/victory) screens
//! - Key-value storage (LocalStorage on web)
//! - Input mapping from raw keys and touches to intents
//!
//! Null implementations let the core run headless (tests, native demo).

pub mod input;
pub mod storage;
#[cfg(target_arch = "wasm32")]
pub mod web;

use std::future::Future;

pub use input::{InputMapper, Intent};
pub use storage::{KeyValueStore, MemoryStore, StorageError};

use crate::highscores::HighScoreEntry;
use crate::profile::Profile;

/// Sound cues for gameplay events. Fire and forget.
pub trait AudioFeedback {
    fn on_shoot(&mut self);
    fn on_melee_swing(&mut self);
    fn on_explosion(&mut self);
    fn on_hit(&mut self);
}

/// Receives the score and remaining lives once per simulation step
pub trait StatusDisplay {
    fn publish(&mut self, score: u64, lives: u32);
}

/// What the player chose to do with their avatar in the profile dialog
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AvatarChoice {
    /// Leave the stored avatar untouched
    #[default]
    Keep,
    /// Replace it with a new (already validated and cropped) data URL
    Set(String),
    /// Delete the stored avatar
    Clear,
}

/// Submitted profile dialog
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProfileInput {
    pub name: String,
    pub avatar: AvatarChoice,
}

/// Asks the player for a display name and optional avatar
pub trait ProfilePrompt {
    /// `None` means the dialog was dismissed
    fn prompt_profile(&mut self, current: &Profile) -> impl Future<Output = Option<ProfileInput>>;
}

/// Choice made on a defeat or victory screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalChoice {
    Restart,
    Abandon,
}

/// Shows end-of-run screens with the leaderboard
pub trait TerminalScreens {
    fn show_defeat(
        &mut self,
        score: u64,
        ranking: &[HighScoreEntry],
        rank: usize,
    ) -> impl Future<Output = TerminalChoice>;

    fn show_victory(
        &mut self,
        score: u64,
        ranking: &[HighScoreEntry],
        rank: usize,
    ) -> impl Future<Output = TerminalChoice>;
}

/// Silent audio
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudio;

impl AudioFeedback for NullAudio {
    fn on_shoot(&mut self) {}
    fn on_melee_swing(&mut self) {}
    fn on_explosion(&mut self) {}
    fn on_hit(&mut self) {}
}

/// Status display that logs changes at debug level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogStatus {
    last: Option<(u64, u32)>,
}

impl StatusDisplay for LogStatus {
    fn publish(&mut self, score: u64, lives: u32) {
        if self.last != Some((score, lives)) {
            log::debug!("Score {score}, lives {lives}");
            self.last = Some((score, lives));
        }
    }
}

/// Profile prompt that always submits the same answer (or dismisses)
#[derive(Debug, Default, Clone)]
pub struct ScriptedPrompt {
    pub answer: Option<ProfileInput>,
    /// Number of times the prompt was shown
    pub shown: usize,
}

impl ProfilePrompt for ScriptedPrompt {
    async fn prompt_profile(&mut self, _current: &Profile) -> Option<ProfileInput> {
        self.shown += 1;
        self.answer.clone()
    }
}

/// Terminal screens that answer immediately and remember what they were shown
#[derive(Debug, Clone)]
pub struct ScriptedScreens {
    pub choice: TerminalChoice,
    /// (victory, score, rank, ranking length) per screen shown
    pub shown: Vec<(bool, u64, usize, usize)>,
}

impl ScriptedScreens {
    pub fn new(choice: TerminalChoice) -> Self {
        Self {
            choice,
            shown: Vec::new(),
        }
    }
}

impl TerminalScreens for ScriptedScreens {
    async fn show_defeat(
        &mut self,
        score: u64,
        ranking: &[HighScoreEntry],
        rank: usize,
    ) -> TerminalChoice {
        self.shown.push((false, score, rank, ranking.len()));
        self.choice
    }

    async fn show_victory(
        &mut self,
        score: u64,
        ranking: &[HighScoreEntry],
        rank: usize,
    ) -> TerminalChoice {
        self.shown.push((true, score, rank, ranking.len()));
        self.choice
    }
}
