//! Audio system using Web Audio API
//!
//! Every effect is synthesized on the fly from oscillators or a noise buffer.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use web_sys::{AudioContext, GainNode, OscillatorNode, OscillatorType};

use crate::platform::AudioFeedback;
use crate::settings::Settings;

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEffect {
    /// Laser fired
    Shoot,
    /// Sword swing
    MeleeSwing,
    /// Bear destroyed
    Explosion,
    /// Player loses a life
    Hit,
    /// Run begins
    GameStart,
}

/// Audio manager for the game
pub struct AudioManager {
    ctx: Option<AudioContext>,
    volume: f32,
    noise_rng: Pcg32,
}

impl AudioManager {
    pub fn new(settings: &Settings) -> Self {
        // May fail outside a secure context
        let ctx = AudioContext::new().ok();
        if ctx.is_none() {
            log::warn!("Failed to create AudioContext - audio disabled");
        }
        Self {
            ctx,
            volume: settings.effective_volume(),
            noise_rng: Pcg32::seed_from_u64(crate::now_ms() as u64),
        }
    }

    /// Pick up a volume or mute change
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.volume = settings.effective_volume();
    }

    /// Resume audio context (required after user gesture)
    pub fn resume(&self) {
        if let Some(ctx) = &self.ctx {
            let _ = ctx.resume();
        }
    }

    /// Play a sound effect
    pub fn play(&mut self, effect: SoundEffect) {
        let vol = self.volume;
        if vol <= 0.0 {
            return;
        }

        let Some(ctx) = self.ctx.clone() else { return };

        if ctx.state() == web_sys::AudioContextState::Suspended {
            let _ = ctx.resume();
        }

        match effect {
            SoundEffect::Shoot => {
                tone(&ctx, 800.0, 0.0, 0.15, OscillatorType::Sawtooth, vol * 0.2);
                tone(&ctx, 1200.0, 0.05, 0.1, OscillatorType::Sine, vol * 0.15);
            }
            SoundEffect::MeleeSwing => {
                tone(&ctx, 400.0, 0.0, 0.2, OscillatorType::Square, vol * 0.25);
                tone(&ctx, 600.0, 0.08, 0.15, OscillatorType::Sawtooth, vol * 0.2);
            }
            SoundEffect::Explosion => self.play_noise_burst(&ctx, vol * 0.15, 0.3),
            SoundEffect::Hit => {
                tone(&ctx, 200.0, 0.0, 0.3, OscillatorType::Sawtooth, vol * 0.3);
                tone(&ctx, 150.0, 0.1, 0.2, OscillatorType::Triangle, vol * 0.25);
            }
            SoundEffect::GameStart => {
                for (i, freq) in [400.0, 500.0, 600.0, 800.0].iter().enumerate() {
                    tone(&ctx, *freq, i as f64 * 0.1, 0.4, OscillatorType::Triangle, vol * 0.3);
                }
            }
        }
    }

    /// White noise with a quadratic fade, the explosion "crunch"
    fn play_noise_burst(&mut self, ctx: &AudioContext, peak: f32, duration: f64) {
        let sample_rate = ctx.sample_rate();
        let len = (sample_rate as f64 * duration) as u32;
        if len == 0 {
            return;
        }

        let mut samples: Vec<f32> = (0..len)
            .map(|i| {
                let fade = 1.0 - i as f32 / len as f32;
                self.noise_rng.random_range(-1.0f32..1.0) * fade * fade
            })
            .collect();

        let Ok(buffer) = ctx.create_buffer(1, len, sample_rate) else {
            return;
        };
        if buffer.copy_to_channel(&mut samples, 0).is_err() {
            return;
        }
        let Ok(source) = ctx.create_buffer_source() else {
            return;
        };
        let Ok(gain) = ctx.create_gain() else { return };

        source.set_buffer(Some(&buffer));
        if source.connect_with_audio_node(&gain).is_err()
            || gain.connect_with_audio_node(&ctx.destination()).is_err()
        {
            return;
        }

        let t = ctx.current_time();
        gain.gain().set_value_at_time(peak, t).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.001, t + duration)
            .ok();
        source.start().ok();
    }
}

/// Create an oscillator routed through a gain node
fn create_osc(
    ctx: &AudioContext,
    freq: f32,
    osc_type: OscillatorType,
) -> Option<(OscillatorNode, GainNode)> {
    let osc = ctx.create_oscillator().ok()?;
    let gain = ctx.create_gain().ok()?;

    osc.set_type(osc_type);
    osc.frequency().set_value(freq);
    osc.connect_with_audio_node(&gain).ok()?;
    gain.connect_with_audio_node(&ctx.destination()).ok()?;

    Some((osc, gain))
}

/// Short tone: 10 ms attack, exponential release over `duration`
fn tone(ctx: &AudioContext, freq: f32, delay: f64, duration: f64, osc_type: OscillatorType, vol: f32) {
    let Some((osc, gain)) = create_osc(ctx, freq, osc_type) else {
        return;
    };
    let t = ctx.current_time() + delay;

    gain.gain().set_value_at_time(0.0, t).ok();
    gain.gain().linear_ramp_to_value_at_time(vol, t + 0.01).ok();
    gain.gain()
        .exponential_ramp_to_value_at_time(0.001, t + duration)
        .ok();

    osc.start_with_when(t).ok();
    osc.stop_with_when(t + duration).ok();
}

impl AudioFeedback for AudioManager {
    fn on_shoot(&mut self) {
        self.play(SoundEffect::Shoot);
    }

    fn on_melee_swing(&mut self) {
        self.play(SoundEffect::MeleeSwing);
    }

    fn on_explosion(&mut self) {
        self.play(SoundEffect::Explosion);
    }

    fn on_hit(&mut self) {
        self.play(SoundEffect::Hit);
    }
}
