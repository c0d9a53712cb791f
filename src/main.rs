//! Velatron entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{HtmlCanvasElement, KeyboardEvent, TouchEvent};

    use velatron::audio::{AudioManager, SoundEffect};
    use velatron::game::{Records, RunOutcome, SharedRecords};
    use velatron::platform::KeyValueStore;
    use velatron::platform::storage::WebStorage;
    use velatron::platform::web::{self, DomDialogs, DomStatus};
    use velatron::platform::{Intent, MemoryStore};
    use velatron::renderer::{
        LoadedAssets, SpriteRenderer, SpriteSheet, TextureId, build_scene, chroma_key,
    };
    use velatron::sim::Viewport;
    use velatron::{GameSession, SessionMode, Settings, Tuning};

    const BACKGROUND_SRC: &str = "assets/background.png";
    const PLAYER_SRC: &str = "assets/velatron.jpg";
    const BEARS_SRC: &str = "assets/bears.png";

    /// Everything the frame callback and input listeners share
    struct App {
        session: GameSession,
        renderer: Option<SpriteRenderer>,
        assets: LoadedAssets,
        audio: AudioManager,
        status: DomStatus,
        dialogs: DomDialogs,
        records: SharedRecords,
        settings_store: Box<dyn KeyValueStore>,
    }

    impl App {
        /// Render the current frame
        fn render(&mut self) {
            let Some(renderer) = self.renderer.as_mut() else {
                return;
            };
            let scene = build_scene(&self.session.state, &self.assets, &self.session.settings);
            match renderer.render(&scene) {
                Ok(()) => {}
                Err(wgpu::SurfaceError::Lost) => {
                    renderer.resize(renderer.size.0, renderer.size.1);
                }
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    log::error!("Out of memory!");
                }
                Err(e) => log::warn!("Render error: {:?}", e),
            }
        }

        fn upload(&mut self, id: TextureId, width: u32, height: u32, rgba: &[u8]) {
            let Some(renderer) = self.renderer.as_mut() else {
                return;
            };
            renderer.upload_texture(id, width, height, rgba);
            if renderer.texture_size(id).is_none() {
                return;
            }
            match id {
                TextureId::Background => {
                    self.assets.background = true;
                    self.session
                        .state
                        .set_background_size(width as f32, height as f32);
                }
                TextureId::Player => self.assets.player = true,
                TextureId::Bears => self.assets.bears = Some(SpriteSheet::bears(width, height)),
                TextureId::White => {}
            }
        }
    }

    fn open_store() -> Box<dyn KeyValueStore> {
        match WebStorage::open() {
            Ok(store) => Box::new(store),
            Err(e) => {
                log::warn!("{} - scores will not persist", e);
                Box::new(MemoryStore::new())
            }
        }
    }

    /// Logical canvas size and the matching backing-store size
    fn fit_canvas(canvas: &HtmlCanvasElement) -> (Viewport, u32, u32) {
        let dpr = web_sys::window().map(|w| w.device_pixel_ratio()).unwrap_or(1.0);
        let client_w = canvas.client_width().max(1);
        let client_h = canvas.client_height().max(1);
        let width = (client_w as f64 * dpr) as u32;
        let height = (client_h as f64 * dpr) as u32;
        canvas.set_width(width);
        canvas.set_height(height);
        (Viewport::new(client_w as f32, client_h as f32), width, height)
    }

    pub async fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

        log::info!("Velatron starting...");

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;

        web::set_visible("loading", false);

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("game")
            .ok_or("no canvas")?
            .dyn_into()?;
        let (viewport, width, height) = fit_canvas(&canvas);

        let mut store = open_store();
        let settings_store = open_store();
        let settings = Settings::load(settings_store.as_ref());
        web::set_text("#mute-btn", mute_label(settings.muted));
        let seed = js_sys::Date::now() as u64;
        let mut seed_rng = <rand_pcg::Pcg32 as rand::SeedableRng>::seed_from_u64(seed);
        let records = Records::load(store.as_mut(), &mut seed_rng, js_sys::Date::now());
        log::info!(
            "Loaded profile {} with {} ranking entries",
            records.profile.display_name(),
            records.highscores.ranking().len()
        );

        let audio = AudioManager::new(&settings);
        let app = Rc::new(RefCell::new(App {
            session: GameSession::new(seed, Tuning::default(), viewport, settings),
            renderer: None,
            assets: LoadedAssets::default(),
            audio,
            status: DomStatus::default(),
            dialogs: DomDialogs::install(&records.profile.device_id),
            records: SharedRecords::new(store, records),
            settings_store,
        }));
        log::info!("Game initialized with seed: {}", seed);

        // Initialize WebGPU
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::BROWSER_WEBGPU | wgpu::Backends::GL,
            ..Default::default()
        });
        let surface = instance
            .create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        log::info!("Using adapter: {:?}", adapter.get_info().name);

        let renderer = SpriteRenderer::new(surface, &adapter, width, height)
            .await
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        app.borrow_mut().renderer = Some(renderer);

        load_assets(app.clone());
        setup_input_handlers(&canvas, app.clone());
        setup_resize(canvas, app.clone());
        setup_profile_button(app.clone());
        setup_mute_button(app.clone());

        request_animation_frame(app);

        log::info!("Velatron running!");
        Ok(())
    }

    /// Images arrive whenever they finish; until then their layers are skipped
    fn load_assets(app: Rc<RefCell<App>>) {
        for (id, src) in [
            (TextureId::Background, BACKGROUND_SRC),
            (TextureId::Player, PLAYER_SRC),
            (TextureId::Bears, BEARS_SRC),
        ] {
            let app = app.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let Some((w, h, mut rgba)) = web::load_rgba(src).await else {
                    return;
                };
                if id != TextureId::Background {
                    let keyed = chroma_key(&mut rgba);
                    log::debug!("{}: keyed {} backdrop pixels", src, keyed);
                }
                app.borrow_mut().upload(id, w, h, &rgba);
            });
        }
    }

    fn setup_input_handlers(canvas: &HtmlCanvasElement, app: Rc<RefCell<App>>) {
        // Keyboard
        {
            let app = app.clone();
            let window = web_sys::window().unwrap_throw();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let mut a = app.borrow_mut();
                // Keys belong to the open dialog
                if a.session.mode == SessionMode::Paused {
                    return;
                }
                if let Some(intent) = a.session.input.key_down(&event.code()) {
                    event.prevent_default();
                    a.audio.resume();
                    if intent == Intent::StartGame {
                        web::set_visible("intro", false);
                        web::set_visible("hud", true);
                        a.audio.play(SoundEffect::GameStart);
                    }
                }
            });
            let _ = window
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }
        {
            let app = app.clone();
            let window = web_sys::window().unwrap_throw();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                app.borrow_mut().session.input.key_up(&event.code());
            });
            let _ = window
                .add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Touch start: double tap shoots, tap on the player attacks, else steer
        {
            let app = app.clone();
            let canvas_clone = canvas.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                event.prevent_default();
                let Some(touch) = event.touches().get(0) else {
                    return;
                };
                let rect = canvas_clone.get_bounding_client_rect();
                let x = touch.client_x() as f32 - rect.left() as f32;
                let y = touch.client_y() as f32 - rect.top() as f32;
                let mut a = app.borrow_mut();
                if a.session.mode == SessionMode::Paused {
                    return;
                }
                a.audio.resume();
                let player = a.session.state.player.rect();
                a.session
                    .input
                    .touch_start(x, y, player, js_sys::Date::now());
            });
            let _ = canvas
                .add_event_listener_with_callback("touchstart", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Touch move
        {
            let app = app.clone();
            let canvas_clone = canvas.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                event.prevent_default();
                if let Some(touch) = event.touches().get(0) {
                    let rect = canvas_clone.get_bounding_client_rect();
                    let x = touch.client_x() as f32 - rect.left() as f32;
                    let mut a = app.borrow_mut();
                    let center_x = a.session.state.player.center_x();
                    a.session.input.touch_move(x, center_x);
                }
            });
            let _ = canvas
                .add_event_listener_with_callback("touchmove", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Touch end
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: TouchEvent| {
                app.borrow_mut().session.input.touch_end();
            });
            let _ = canvas
                .add_event_listener_with_callback("touchend", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_resize(canvas: HtmlCanvasElement, app: Rc<RefCell<App>>) {
        let window = web_sys::window().unwrap_throw();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let (viewport, width, height) = fit_canvas(&canvas);
            let mut a = app.borrow_mut();
            a.session.resize(viewport.width, viewport.height);
            if let Some(renderer) = a.renderer.as_mut() {
                renderer.resize(width, height);
            }
        });
        let _ = window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_profile_button(app: Rc<RefCell<App>>) {
        let Some(btn) = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id("profile-btn"))
        else {
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
            let (records, mut dialogs) = {
                let mut a = app.borrow_mut();
                // The terminal sequence owns the dialogs once a run is over
                if !a.session.pause() {
                    return;
                }
                (a.records.clone(), a.dialogs.clone())
            };
            let app = app.clone();
            wasm_bindgen_futures::spawn_local(async move {
                if let Err(e) = records.edit_profile(&mut dialogs).await {
                    log::warn!("Profile not changed: {}", e);
                    web::show_profile_error(&e.to_string());
                }
                app.borrow_mut().session.resume();
                if let Some(outcome) = records.take_queued() {
                    begin_conclusion(app, outcome);
                }
            });
        });
        let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn mute_label(muted: bool) -> &'static str {
        if muted { "Unmute" } else { "Mute" }
    }

    fn setup_mute_button(app: Rc<RefCell<App>>) {
        let Some(btn) = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id("mute-btn"))
        else {
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
            let mut a = app.borrow_mut();
            let App {
                session,
                audio,
                settings_store,
                ..
            } = &mut *a;
            let muted = session.settings.toggle_mute(settings_store.as_mut());
            audio.apply_settings(&session.settings);
            web::set_text("#mute-btn", mute_label(muted));
        });
        let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn request_animation_frame(app: Rc<RefCell<App>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(app, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(app: Rc<RefCell<App>>, time: f64) {
        let outcome = {
            let mut a = app.borrow_mut();
            let App {
                session,
                audio,
                status,
                ..
            } = &mut *a;
            let outcome = session.frame(time, audio, status);
            a.render();
            outcome
        };

        if let Some(outcome) = outcome {
            begin_conclusion(app.clone(), outcome);
        }

        if app.borrow().session.mode != SessionMode::Abandoned {
            request_animation_frame(app);
        } else {
            log::info!("Frame loop stopped");
        }
    }

    /// Run the profile/ranking/terminal-screen sequence without holding the
    /// app borrow across any await
    fn begin_conclusion(app: Rc<RefCell<App>>, outcome: RunOutcome) {
        let (records, mut dialogs) = {
            let a = app.borrow();
            (a.records.clone(), a.dialogs.clone())
        };
        web::set_visible("hud", false);

        wasm_bindgen_futures::spawn_local(async move {
            let mut screens = dialogs.clone();
            let Some(choice) = records
                .conclude(outcome, &mut dialogs, &mut screens, js_sys::Date::now())
                .await
            else {
                // Picked up again when the profile dialog closes
                return;
            };
            if let Some(entries) = records.with_records(|r| r.highscores.ranking().len()) {
                log::info!("Ranking now holds {} entries", entries);
            }

            let mut a = app.borrow_mut();
            a.session.apply_choice(choice, js_sys::Date::now() as u64);
            if a.session.mode == SessionMode::Running {
                web::set_visible("hud", true);
            } else {
                web::set_visible("goodbye", true);
            }
        });
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() -> Result<(), JsValue> {
    wasm_game::run().await
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Velatron (native) starting...");
    log::info!("Rendering needs a browser - run with `trunk serve`; playing a headless demo instead");

    let tuning = match std::env::args().nth(1) {
        Some(path) => match std::fs::read_to_string(&path).map(|json| velatron::Tuning::from_json(&json)) {
            Ok(Ok(tuning)) => {
                log::info!("Loaded tuning from {}", path);
                tuning
            }
            Ok(Err(e)) => {
                log::warn!("Bad tuning file {}: {} - using defaults", path, e);
                velatron::Tuning::default()
            }
            Err(e) => {
                log::warn!("Cannot read {}: {} - using defaults", path, e);
                velatron::Tuning::default()
            }
        },
        None => velatron::Tuning::default(),
    };

    headless::run_demo(tuning, 3);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Scripted runs against in-memory ports
#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    use velatron::consts::REFERENCE_FRAME_MS;
    use velatron::game::{Records, conclude_run};
    use velatron::platform::{
        LogStatus, MemoryStore, NullAudio, ProfileInput, ScriptedPrompt, ScriptedScreens,
        TerminalChoice,
    };
    use velatron::sim::{GameState, Viewport};
    use velatron::{GameSession, SessionMode, Settings, Tuning, highscores};

    /// Give up on a run after this much simulated time
    const MAX_RUN_MS: f64 = 120_000.0;

    /// Hold the key toward the nearest bear, swing when one is close, and
    /// fire whenever the cooldown allows
    fn autopilot(session: &mut GameSession, frame: u64) {
        let input = &mut session.input;
        input.key_up("ArrowLeft");
        input.key_up("ArrowRight");

        let state: &GameState = &session.state;
        let player_x = state.player.center_x();
        let nearest = state
            .bears
            .iter()
            .max_by(|a, b| a.pos.y.total_cmp(&b.pos.y))
            .map(|b| b.rect());

        if let Some(bear) = nearest {
            let bear_x = bear.center().x;
            if bear_x < player_x - 20.0 {
                input.key_down("ArrowLeft");
            } else if bear_x > player_x + 20.0 {
                input.key_down("ArrowRight");
            }
            if bear.bottom() > state.player.rect().y - 40.0 {
                input.key_down("KeyZ");
            }
        }
        if frame % 20 == 0 {
            input.key_down("Space");
        }
    }

    pub fn run_demo(tuning: Tuning, runs: usize) {
        let mut store = MemoryStore::new();
        let mut rng = Pcg32::seed_from_u64(7);
        let mut records = Records::load(&mut store, &mut rng, velatron::now_ms());
        let mut prompt = ScriptedPrompt {
            answer: Some(ProfileInput {
                name: "Demo Pilot".to_string(),
                ..Default::default()
            }),
            shown: 0,
        };

        let settings = Settings::load(&store);
        let mut session = GameSession::new(1, tuning, Viewport::new(1280.0, 720.0), settings);
        let mut audio = NullAudio;
        let mut status = LogStatus::default();

        session.input.key_down("Enter");
        for run in 0..runs {
            let mut now = 0.0;
            let mut frame = 0u64;
            let outcome = loop {
                if let Some(outcome) = session.frame(now, &mut audio, &mut status) {
                    break Some(outcome);
                }
                if session.mode == SessionMode::Running {
                    autopilot(&mut session, frame);
                }
                now += REFERENCE_FRAME_MS as f64;
                frame += 1;
                if now > MAX_RUN_MS {
                    break None;
                }
            };

            let Some(outcome) = outcome else {
                log::info!("Run {} still going after {} s; stopping", run + 1, MAX_RUN_MS / 1000.0);
                break;
            };

            let choice = if run + 1 < runs {
                TerminalChoice::Restart
            } else {
                TerminalChoice::Abandon
            };
            let mut screens = ScriptedScreens::new(choice);
            let choice = pollster::block_on(conclude_run(
                outcome,
                &mut records,
                &mut store,
                &mut prompt,
                &mut screens,
                velatron::now_ms(),
            ));
            log::info!("Run {} ended: {:?}", run + 1, outcome);
            session.apply_choice(choice, run as u64 + 2);
        }

        if let Some(best) = records.highscores.top_score() {
            log::info!("Best score: {}", best);
        }
        let now = velatron::now_ms();
        for (i, entry) in records.highscores.ranking().iter().enumerate() {
            let place = highscores::medal(i)
                .map(str::to_string)
                .unwrap_or_else(|| format!("#{}", i + 1));
            log::info!(
                "{} {} {} ({})",
                place,
                entry.name,
                entry.score,
                highscores::format_date(entry.timestamp, now)
            );
        }
    }
}
