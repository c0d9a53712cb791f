//! Session driver
//!
//! Owns a run and everything the frame callback needs between frames: the
//! simulation state, input, the frame clock and the session mode. Ports are
//! passed in per call so the same driver runs in the browser and headless.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::consts::MAX_FRAME_DT_MS;
use crate::highscores::{HighScoreEntry, HighScores};
use crate::platform::{
    AudioFeedback, InputMapper, KeyValueStore, ProfilePrompt, StatusDisplay, TerminalChoice,
    TerminalScreens,
};
use crate::profile::{Profile, ProfileError};
use crate::settings::Settings;
use crate::sim::{GameEvent, GameState, TickInput, Viewport, tick};
use crate::tuning::Tuning;

/// Where the session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Waiting for the start intent; nothing simulates
    Intro,
    /// Simulation steps every frame
    Running,
    /// A dialog is open over the intro or a run; rendering only
    Paused,
    /// The run ended and the terminal sequence is in progress; rendering only
    Concluding,
    /// The player walked away from the terminal screen
    Abandoned,
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Defeat { score: u64 },
    Victory { score: u64 },
}

impl RunOutcome {
    pub fn score(&self) -> u64 {
        match *self {
            RunOutcome::Defeat { score } | RunOutcome::Victory { score } => score,
        }
    }
}

/// Leaderboard and identity, touched only by the terminal sequence
#[derive(Debug, Clone, Default)]
pub struct Records {
    pub profile: Profile,
    pub highscores: HighScores,
}

impl Records {
    pub fn load<S: KeyValueStore + ?Sized, R: rand::Rng + ?Sized>(
        store: &mut S,
        rng: &mut R,
        now_ms: f64,
    ) -> Self {
        Self {
            profile: Profile::load_or_create(store, rng, now_ms),
            highscores: HighScores::load(store),
        }
    }
}

/// A game session
pub struct GameSession {
    pub state: GameState,
    pub mode: SessionMode,
    pub input: InputMapper,
    pub settings: Settings,
    last_time: Option<f64>,
    /// Mode to return to when the pause ends
    paused_from: Option<SessionMode>,
}

impl GameSession {
    /// Create a session waiting on the intro
    pub fn new(seed: u64, tuning: Tuning, viewport: Viewport, settings: Settings) -> Self {
        let mut input = InputMapper::new();
        input.intro = true;
        Self {
            state: GameState::new(seed, tuning, viewport),
            mode: SessionMode::Intro,
            input,
            settings,
            last_time: None,
            paused_from: None,
        }
    }

    /// Leave the intro and begin simulating
    pub fn start(&mut self) {
        if self.mode != SessionMode::Intro {
            return;
        }
        self.mode = SessionMode::Running;
        self.input.intro = false;
        self.input.clear();
        log::info!("Run started with seed {}", self.state.seed);
    }

    /// Freeze the intro or a running game while a dialog is open. Returns
    /// false when there is nothing to pause.
    pub fn pause(&mut self) -> bool {
        if !matches!(self.mode, SessionMode::Intro | SessionMode::Running) {
            return false;
        }
        self.paused_from = Some(self.mode);
        self.mode = SessionMode::Paused;
        self.input.clear();
        true
    }

    /// Return to whatever was paused. Time spent paused is not simulated.
    pub fn resume(&mut self) {
        let Some(mode) = self.paused_from.take() else {
            return;
        };
        if self.mode == SessionMode::Paused {
            self.mode = mode;
            self.input.clear();
            self.last_time = None;
        }
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.state.viewport = Viewport::new(width, height);
        self.state.background.fit(self.state.viewport);
    }

    /// Handle one animation frame at `now_ms`. The delta since the previous
    /// frame is clamped so a backgrounded tab does not teleport everything.
    pub fn frame<A, D>(&mut self, now_ms: f64, audio: &mut A, status: &mut D) -> Option<RunOutcome>
    where
        A: AudioFeedback + ?Sized,
        D: StatusDisplay + ?Sized,
    {
        let dt_ms = match self.last_time {
            Some(last) => ((now_ms - last) as f32).clamp(0.0, MAX_FRAME_DT_MS),
            None => 0.0,
        };
        self.last_time = Some(now_ms);
        self.step(dt_ms, audio, status)
    }

    /// Advance by an explicit delta. Returns the outcome on the step that
    /// ends the run; the session is `Concluding` from then on.
    pub fn step<A, D>(&mut self, dt_ms: f32, audio: &mut A, status: &mut D) -> Option<RunOutcome>
    where
        A: AudioFeedback + ?Sized,
        D: StatusDisplay + ?Sized,
    {
        match self.mode {
            SessionMode::Intro => {
                if self.input.take_start() {
                    self.start();
                }
                None
            }
            SessionMode::Running => {
                let input: TickInput = self.input.take_tick_input();
                tick(&mut self.state, &input, dt_ms);
                status.publish(self.state.score, self.state.lives);

                let outcome = dispatch_events(self.state.drain_events(), audio);
                if let Some(outcome) = outcome {
                    self.mode = SessionMode::Concluding;
                    self.input.clear();
                    log::info!("Run over: {:?}", outcome);
                }
                outcome
            }
            SessionMode::Paused | SessionMode::Concluding | SessionMode::Abandoned => None,
        }
    }

    /// Act on the player's choice from the terminal screen
    pub fn apply_choice(&mut self, choice: TerminalChoice, seed: u64) {
        match choice {
            TerminalChoice::Restart => self.restart(seed),
            TerminalChoice::Abandon => {
                self.mode = SessionMode::Abandoned;
                log::info!("Session abandoned");
            }
        }
    }

    /// Begin a fresh run immediately
    pub fn restart(&mut self, seed: u64) {
        self.state.reset(seed);
        self.paused_from = None;
        self.input.intro = false;
        self.input.clear();
        self.mode = SessionMode::Running;
        log::info!("Game restarted with seed: {}", seed);
    }
}

/// Forward sim events to audio; returns the terminal outcome if one occurred
fn dispatch_events<A: AudioFeedback + ?Sized>(
    events: Vec<GameEvent>,
    audio: &mut A,
) -> Option<RunOutcome> {
    let mut outcome = None;
    for event in events {
        match event {
            GameEvent::Shoot => audio.on_shoot(),
            GameEvent::MeleeSwing => audio.on_melee_swing(),
            GameEvent::Explosion => audio.on_explosion(),
            GameEvent::PlayerHit | GameEvent::BearEscaped => audio.on_hit(),
            GameEvent::Defeat { score } => outcome = Some(RunOutcome::Defeat { score }),
            GameEvent::Victory { score } => outcome = Some(RunOutcome::Victory { score }),
        }
    }
    outcome
}

/// The end-of-run sequence: make sure the player has a name, record the
/// score, then show the matching terminal screen with the updated ranking.
pub async fn conclude_run<S, P, T>(
    outcome: RunOutcome,
    records: &mut Records,
    store: &mut S,
    prompt: &mut P,
    screens: &mut T,
    now_ms: f64,
) -> TerminalChoice
where
    S: KeyValueStore + ?Sized,
    P: ProfilePrompt,
    T: TerminalScreens,
{
    records.profile.ensure(store, prompt).await;

    let score = outcome.score();
    let profile = &records.profile;
    let entry = HighScoreEntry {
        score,
        name: profile.display_name().to_string(),
        avatar: profile.avatar.clone(),
        device_id: profile.device_id.clone(),
        timestamp: now_ms,
    };
    records.highscores.record_score(store, entry);
    let rank = records.highscores.rank_of(score, &records.profile.device_id);
    let ranking = records.highscores.ranking();

    match outcome {
        RunOutcome::Defeat { .. } => screens.show_defeat(score, ranking, rank).await,
        RunOutcome::Victory { .. } => screens.show_victory(score, ranking, rank).await,
    }
}

/// Records and the store they persist to, shared by the profile button and
/// the end-of-run sequence. Either may hold them across a dialog; a run that
/// ends while the profile dialog holds them is queued instead of concluded.
#[derive(Clone)]
pub struct SharedRecords {
    inner: Rc<RefCell<(Box<dyn KeyValueStore>, Records)>>,
    queued: Rc<Cell<Option<RunOutcome>>>,
}

impl SharedRecords {
    pub fn new(store: Box<dyn KeyValueStore>, records: Records) -> Self {
        Self {
            inner: Rc::new(RefCell::new((store, records))),
            queued: Rc::new(Cell::new(None)),
        }
    }

    /// Let the player change name and avatar. `Ok(None)` means the records
    /// were busy and no dialog was shown.
    pub async fn edit_profile<P: ProfilePrompt>(
        &self,
        prompt: &mut P,
    ) -> Result<Option<bool>, ProfileError> {
        let Ok(mut guard) = self.inner.try_borrow_mut() else {
            log::info!("Profile is busy; try again after this screen");
            return Ok(None);
        };
        let (store, records) = &mut *guard;
        records.profile.edit(store.as_mut(), prompt).await.map(Some)
    }

    /// Run the end-of-run sequence, or queue `outcome` and return `None`
    /// when the records are held elsewhere
    pub async fn conclude<P, T>(
        &self,
        outcome: RunOutcome,
        prompt: &mut P,
        screens: &mut T,
        now_ms: f64,
    ) -> Option<TerminalChoice>
    where
        P: ProfilePrompt,
        T: TerminalScreens,
    {
        let Ok(mut guard) = self.inner.try_borrow_mut() else {
            log::info!("Records busy; holding {:?} until they are free", outcome);
            self.queued.set(Some(outcome));
            return None;
        };
        let (store, records) = &mut *guard;
        Some(conclude_run(outcome, records, store.as_mut(), prompt, screens, now_ms).await)
    }

    /// Outcome that arrived while the records were busy
    pub fn take_queued(&self) -> Option<RunOutcome> {
        self.queued.take()
    }

    /// Read access for logging and tests; `None` while a dialog holds them
    pub fn with_records<R>(&self, f: impl FnOnce(&Records) -> R) -> Option<R> {
        self.inner.try_borrow().ok().map(|guard| f(&guard.1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{
        AvatarChoice, MemoryStore, NullAudio, ProfileInput, ScriptedPrompt, ScriptedScreens,
    };
    use crate::sim::{Bear, BearAnim, GamePhase};
    use glam::Vec2;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use std::task::{Context, Poll, Waker};

    /// Profile dialog that stays open until `release` is set
    struct HeldPrompt {
        release: Rc<Cell<bool>>,
        answer: ProfileInput,
    }

    impl ProfilePrompt for HeldPrompt {
        async fn prompt_profile(&mut self, _current: &Profile) -> Option<ProfileInput> {
            std::future::poll_fn(|_| {
                if self.release.get() {
                    Poll::Ready(())
                } else {
                    Poll::Pending
                }
            })
            .await;
            Some(self.answer.clone())
        }
    }

    #[derive(Default)]
    struct CountingAudio {
        shots: usize,
        swings: usize,
        explosions: usize,
        hits: usize,
    }

    impl AudioFeedback for CountingAudio {
        fn on_shoot(&mut self) {
            self.shots += 1;
        }
        fn on_melee_swing(&mut self) {
            self.swings += 1;
        }
        fn on_explosion(&mut self) {
            self.explosions += 1;
        }
        fn on_hit(&mut self) {
            self.hits += 1;
        }
    }

    #[derive(Default)]
    struct RecordingStatus(Vec<(u64, u32)>);

    impl StatusDisplay for RecordingStatus {
        fn publish(&mut self, score: u64, lives: u32) {
            self.0.push((score, lives));
        }
    }

    fn running_session(tuning: Tuning) -> GameSession {
        let mut session = GameSession::new(42, tuning, Viewport::default(), Settings::default());
        session.start();
        session.state.spawn_interval = f32::MAX;
        session
    }

    fn bear_on_player(session: &mut GameSession) {
        let id = session.state.next_entity_id();
        let player = session.state.player.rect();
        session.state.bears.push(Bear {
            id,
            pos: Vec2::new(player.x + 20.0, player.y + 20.0),
            size: 100.0,
            speed: 0.0,
            anim: BearAnim::Walking,
            frame: 0,
            frame_timer: 0.0,
            frame_interval: 200.0,
            state_timer: 0.0,
            state_duration: 10_000.0,
            anim_time: 0.0,
            run_phase: 0.0,
            sway_x: 0.0,
        });
    }

    #[test]
    fn test_intro_gates_the_simulation() {
        let mut session =
            GameSession::new(1, Tuning::default(), Viewport::default(), Settings::default());
        let mut status = RecordingStatus::default();
        session.step(16.0, &mut NullAudio, &mut status);
        assert_eq!(session.mode, SessionMode::Intro);
        assert_eq!(session.state.clock_ms, 0.0);
        assert!(status.0.is_empty());

        session.input.key_down("KeyZ");
        session.step(16.0, &mut NullAudio, &mut status);
        assert_eq!(session.mode, SessionMode::Intro);

        session.input.key_down("Enter");
        session.step(16.0, &mut NullAudio, &mut status);
        assert_eq!(session.mode, SessionMode::Running);

        // The start key must not also count as an attack
        session.step(16.0, &mut NullAudio, &mut status);
        assert!(!session.state.player.attacking);
        assert_eq!(status.0, vec![(0, 3)]);
    }

    #[test]
    fn test_frame_clamps_delta() {
        let mut session = running_session(Tuning::default());
        let mut status = RecordingStatus::default();
        session.frame(1_000.0, &mut NullAudio, &mut status);
        assert_eq!(session.state.clock_ms, 0.0);
        session.frame(61_000.0, &mut NullAudio, &mut status);
        assert_eq!(session.state.clock_ms, 100.0);
        session.frame(61_016.0, &mut NullAudio, &mut status);
        assert_eq!(session.state.clock_ms, 116.0);
    }

    #[test]
    fn test_events_reach_audio() {
        let mut session = running_session(Tuning::default());
        let mut audio = CountingAudio::default();
        let mut status = RecordingStatus::default();
        session.input.key_down("Space");
        session.input.key_down("KeyZ");
        session.step(16.0, &mut audio, &mut status);
        bear_on_player(&mut session);
        session.step(0.0, &mut audio, &mut status);
        assert_eq!((audio.shots, audio.swings, audio.hits), (1, 1, 1));
        assert_eq!(status.0.last(), Some(&(0, 2)));
    }

    #[test]
    fn test_defeat_concludes_and_restart() {
        let mut session = running_session(Tuning::default());
        session.state.score = 300;
        let mut status = RecordingStatus::default();

        let mut outcome = None;
        for _ in 0..3 {
            bear_on_player(&mut session);
            if let Some(o) = session.step(0.0, &mut NullAudio, &mut status) {
                outcome = Some(o);
            }
        }
        assert_eq!(outcome, Some(RunOutcome::Defeat { score: 300 }));
        assert_eq!(session.mode, SessionMode::Concluding);
        assert_eq!(session.state.phase, GamePhase::Defeated);

        // Concluding freezes the simulation
        let clock = session.state.clock_ms;
        assert_eq!(session.step(50.0, &mut NullAudio, &mut status), None);
        assert_eq!(session.state.clock_ms, clock);

        let mut store = MemoryStore::new();
        let mut rng = Pcg32::seed_from_u64(7);
        let mut records = Records::load(&mut store, &mut rng, 0.0);
        let mut prompt = ScriptedPrompt {
            answer: Some(ProfileInput {
                name: "Ana".to_string(),
                avatar: AvatarChoice::Keep,
            }),
            shown: 0,
        };
        let mut screens = ScriptedScreens::new(TerminalChoice::Restart);
        let choice = pollster::block_on(conclude_run(
            outcome.unwrap(),
            &mut records,
            &mut store,
            &mut prompt,
            &mut screens,
            1_000.0,
        ));

        assert_eq!(choice, TerminalChoice::Restart);
        assert_eq!(prompt.shown, 1);
        assert_eq!(screens.shown, vec![(false, 300, 1, 1)]);
        assert_eq!(records.highscores.ranking()[0].name, "Ana");
        assert_eq!(HighScores::load(&store).ranking().len(), 1);

        session.apply_choice(choice, 8);
        assert_eq!(session.mode, SessionMode::Running);
        assert_eq!(session.state.score, 0);
        assert_eq!(session.state.lives, 3);
    }

    #[test]
    fn test_second_run_reuses_profile_and_ranks() {
        let mut store = MemoryStore::new();
        let mut rng = Pcg32::seed_from_u64(9);
        let mut records = Records::load(&mut store, &mut rng, 0.0);
        let mut prompt = ScriptedPrompt::default();
        let mut screens = ScriptedScreens::new(TerminalChoice::Abandon);

        for score in [100, 400, 250] {
            pollster::block_on(conclude_run(
                RunOutcome::Defeat { score },
                &mut records,
                &mut store,
                &mut prompt,
                &mut screens,
                0.0,
            ));
        }
        assert_eq!(prompt.shown, 1);
        let ranks: Vec<_> = screens.shown.iter().map(|s| s.2).collect();
        assert_eq!(ranks, vec![1, 1, 2]);
        assert_eq!(records.highscores.ranking()[0].name, "Anonymous");
    }

    #[test]
    fn test_victory_uses_victory_screen() {
        let tuning = Tuning {
            victory_score: Some(25),
            ..Tuning::default()
        };
        let mut session = running_session(tuning);
        let id = session.state.next_entity_id();
        let sword = session.state.player.sword_region(&session.state.tuning);
        session.state.bears.push(Bear {
            id,
            pos: Vec2::new(sword.x + 80.0, sword.y - 10.0),
            size: 40.0,
            speed: 0.0,
            anim: BearAnim::Walking,
            frame: 0,
            frame_timer: 0.0,
            frame_interval: 200.0,
            state_timer: 0.0,
            state_duration: 10_000.0,
            anim_time: 0.0,
            run_phase: 0.0,
            sway_x: 0.0,
        });
        session.input.key_down("KeyZ");
        let outcome = session.step(0.0, &mut NullAudio, &mut RecordingStatus::default());
        assert_eq!(outcome, Some(RunOutcome::Victory { score: 25 }));

        let mut store = MemoryStore::new();
        let mut rng = Pcg32::seed_from_u64(1);
        let mut records = Records::load(&mut store, &mut rng, 0.0);
        let mut screens = ScriptedScreens::new(TerminalChoice::Abandon);
        let choice = pollster::block_on(conclude_run(
            RunOutcome::Victory { score: 25 },
            &mut records,
            &mut store,
            &mut ScriptedPrompt::default(),
            &mut screens,
            0.0,
        ));
        assert_eq!(screens.shown, vec![(true, 25, 1, 1)]);
        session.apply_choice(choice, 2);
        assert_eq!(session.mode, SessionMode::Abandoned);
        assert_eq!(session.step(16.0, &mut NullAudio, &mut RecordingStatus::default()), None);
    }

    #[test]
    fn test_pause_freezes_run_until_resumed() {
        let mut session = running_session(Tuning::default());
        let mut status = RecordingStatus::default();
        session.frame(0.0, &mut NullAudio, &mut status);

        assert!(session.pause());
        assert_eq!(session.mode, SessionMode::Paused);
        assert!(!session.pause());

        bear_on_player(&mut session);
        session.input.key_down("KeyZ");
        assert_eq!(session.frame(5_000.0, &mut NullAudio, &mut status), None);
        assert_eq!(session.state.clock_ms, 0.0);
        assert_eq!(session.state.lives, 3);

        session.resume();
        assert_eq!(session.mode, SessionMode::Running);
        // Neither the paused time nor the key pressed meanwhile carries over
        session.frame(6_000.0, &mut NullAudio, &mut status);
        assert_eq!(session.state.clock_ms, 0.0);
        assert!(!session.state.player.attacking);
        session.frame(6_016.0, &mut NullAudio, &mut status);
        assert_eq!(session.state.clock_ms, 16.0);
    }

    #[test]
    fn test_pause_over_intro_returns_to_intro() {
        let mut session =
            GameSession::new(1, Tuning::default(), Viewport::default(), Settings::default());
        assert!(session.pause());
        session.input.key_down("Enter");
        session.step(16.0, &mut NullAudio, &mut RecordingStatus::default());
        assert_eq!(session.mode, SessionMode::Paused);

        session.resume();
        assert_eq!(session.mode, SessionMode::Intro);
        session.step(16.0, &mut NullAudio, &mut RecordingStatus::default());
        assert_eq!(session.mode, SessionMode::Intro);
    }

    #[test]
    fn test_run_ending_during_profile_edit_is_queued() {
        let mut store = MemoryStore::new();
        let mut rng = Pcg32::seed_from_u64(3);
        let records = Records::load(&mut store, &mut rng, 0.0);
        let shared = SharedRecords::new(Box::new(store), records);

        let release = Rc::new(Cell::new(false));
        let mut held = HeldPrompt {
            release: release.clone(),
            answer: ProfileInput {
                name: "Ana".to_string(),
                avatar: AvatarChoice::Keep,
            },
        };
        let editing = shared.clone();
        let mut edit = std::pin::pin!(editing.edit_profile(&mut held));
        let mut cx = Context::from_waker(Waker::noop());
        assert!(edit.as_mut().poll(&mut cx).is_pending());

        // The run ends while the dialog is still open
        let mut screens = ScriptedScreens::new(TerminalChoice::Restart);
        let choice = pollster::block_on(shared.conclude(
            RunOutcome::Defeat { score: 120 },
            &mut ScriptedPrompt::default(),
            &mut screens,
            5.0,
        ));
        assert_eq!(choice, None);
        assert!(screens.shown.is_empty());
        assert_eq!(shared.with_records(|r| r.highscores.ranking().len()), None);

        // A second edit is refused rather than stacked
        let again = pollster::block_on(shared.edit_profile(&mut ScriptedPrompt::default()));
        assert!(matches!(again, Ok(None)));

        release.set(true);
        assert!(matches!(edit.as_mut().poll(&mut cx), Poll::Ready(Ok(Some(true)))));

        let outcome = shared.take_queued().unwrap();
        let choice = pollster::block_on(shared.conclude(
            outcome,
            &mut ScriptedPrompt::default(),
            &mut screens,
            5.0,
        ));
        assert_eq!(choice, Some(TerminalChoice::Restart));
        assert_eq!(screens.shown, vec![(false, 120, 1, 1)]);
        assert_eq!(
            shared.with_records(|r| r.highscores.ranking()[0].name.clone()),
            Some("Ana".to_string())
        );
        assert_eq!(shared.take_queued(), None);
    }
}
