//! Browser implementations of the ports
//!
//! The HUD, profile dialog and end-of-run screens are plain DOM elements
//! declared in `index.html`; this module fills them in and turns button
//! clicks into futures.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    CanvasRenderingContext2d, Document, Element, HtmlCanvasElement, HtmlElement,
    HtmlImageElement, HtmlInputElement,
};

use super::{
    AvatarChoice, ProfileInput, ProfilePrompt, StatusDisplay, TerminalChoice, TerminalScreens,
};
use crate::consts::AVATAR_SIZE_PX;
use crate::highscores::{self, HighScoreEntry, HighScores};
use crate::profile::{self, Profile, ProfileError};

fn document() -> Option<Document> {
    web_sys::window()?.document()
}

/// Toggle the `hidden` class on an element
pub fn set_visible(id: &str, visible: bool) {
    if let Some(el) = document().and_then(|d| d.get_element_by_id(id)) {
        let _ = el.class_list().toggle_with_force("hidden", !visible);
    }
}

pub fn set_text(selector: &str, text: &str) {
    if let Some(el) = document().and_then(|d| d.query_selector(selector).ok().flatten()) {
        el.set_text_content(Some(text));
    }
}

/// Show a message in the profile dialog's error line
pub fn show_profile_error(message: &str) {
    set_text("#profile-error", message);
}

/// HUD score and lives
#[derive(Debug, Default)]
pub struct DomStatus {
    last: Option<(u64, u32)>,
}

impl StatusDisplay for DomStatus {
    fn publish(&mut self, score: u64, lives: u32) {
        if self.last == Some((score, lives)) {
            return;
        }
        self.last = Some((score, lives));
        set_text("#hud-score .hud-value", &score.to_string());
        set_text("#hud-lives .hud-value", &lives.to_string());
    }
}

/// Resolve with the index of the first button clicked
async fn wait_for_click(ids: &[&str]) -> Option<usize> {
    let document = document()?;
    let buttons: Vec<HtmlElement> = ids
        .iter()
        .filter_map(|id| document.get_element_by_id(id)?.dyn_into().ok())
        .collect();
    if buttons.len() != ids.len() {
        log::warn!("Missing dialog buttons: {:?}", ids);
        return None;
    }

    let mut handlers = Vec::with_capacity(buttons.len());
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        for (i, button) in buttons.iter().enumerate() {
            let resolve = resolve.clone();
            let handler = Closure::<dyn FnMut()>::new(move || {
                let _ = resolve.call1(&JsValue::NULL, &JsValue::from_f64(i as f64));
            });
            button.set_onclick(Some(handler.as_ref().unchecked_ref()));
            handlers.push(handler);
        }
    });

    let picked = JsFuture::from(promise).await.ok()?.as_f64()? as usize;
    for button in &buttons {
        button.set_onclick(None);
    }
    drop(handlers);
    Some(picked)
}

/// Load an image element and wait for it to decode
async fn load_image(src: &str) -> Result<HtmlImageElement, ProfileError> {
    let img = HtmlImageElement::new().map_err(|_| ProfileError::Decode)?;
    let mut handlers = Vec::with_capacity(2);
    let promise = js_sys::Promise::new(&mut |resolve, reject| {
        let onload = Closure::<dyn FnMut()>::new(move || {
            let _ = resolve.call0(&JsValue::NULL);
        });
        let onerror = Closure::<dyn FnMut()>::new(move || {
            let _ = reject.call0(&JsValue::NULL);
        });
        img.set_onload(Some(onload.as_ref().unchecked_ref()));
        img.set_onerror(Some(onerror.as_ref().unchecked_ref()));
        handlers.push(onload);
        handlers.push(onerror);
    });
    img.set_src(src);

    let result = JsFuture::from(promise).await;
    img.set_onload(None);
    img.set_onerror(None);
    drop(handlers);
    result.map(|_| img).map_err(|_| ProfileError::Decode)
}

fn canvas_2d(width: u32, height: u32) -> Option<(HtmlCanvasElement, CanvasRenderingContext2d)> {
    let canvas: HtmlCanvasElement = document()?.create_element("canvas").ok()?.dyn_into().ok()?;
    canvas.set_width(width);
    canvas.set_height(height);
    let ctx = canvas.get_context("2d").ok()??.dyn_into().ok()?;
    Some((canvas, ctx))
}

/// Decode an image into RGBA8 pixels
pub async fn load_rgba(src: &str) -> Option<(u32, u32, Vec<u8>)> {
    let img = match load_image(src).await {
        Ok(img) => img,
        Err(e) => {
            log::warn!("Could not load {}: {}", src, e);
            return None;
        }
    };
    let (w, h) = (img.natural_width(), img.natural_height());
    let (_canvas, ctx) = canvas_2d(w, h)?;
    ctx.draw_image_with_html_image_element(&img, 0.0, 0.0).ok()?;
    let data = ctx.get_image_data(0.0, 0.0, w as f64, h as f64).ok()?;
    Some((w, h, data.data().0))
}

/// Centre-crop to a square avatar and encode as a JPEG data URL
async fn avatar_data_url(object_url: &str) -> Result<String, ProfileError> {
    let img = load_image(object_url).await?;
    let (sx, sy, sw, sh) = profile::cover_crop(img.natural_width() as f64, img.natural_height() as f64)?;
    let size = AVATAR_SIZE_PX as f64;
    let (canvas, ctx) = canvas_2d(AVATAR_SIZE_PX, AVATAR_SIZE_PX).ok_or(ProfileError::Decode)?;
    ctx.draw_image_with_html_image_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
        &img, sx, sy, sw, sh, 0.0, 0.0, size, size,
    )
    .map_err(|_| ProfileError::Decode)?;
    canvas
        .to_data_url_with_type_and_encoder_options("image/jpeg", &JsValue::from_f64(0.8))
        .map_err(|_| ProfileError::Decode)
}

fn set_preview(src: Option<&str>) {
    let Some(preview) = document().and_then(|d| d.get_element_by_id("profile-photo-preview")) else {
        return;
    };
    match src {
        Some(src) => {
            let _ = preview.set_attribute("src", src);
            let _ = preview.class_list().remove_1("hidden");
        }
        None => {
            let _ = preview.remove_attribute("src");
            let _ = preview.class_list().add_1("hidden");
        }
    }
}

/// Profile dialog plus the defeat/victory screens
#[derive(Clone, Default)]
pub struct DomDialogs {
    avatar: Rc<RefCell<AvatarChoice>>,
    /// Used to highlight this device's entry in the ranking
    device_id: String,
}

impl DomDialogs {
    /// Wire the avatar file input and clear button
    pub fn install(device_id: &str) -> Self {
        let dialogs = Self {
            device_id: device_id.to_string(),
            ..Self::default()
        };
        let Some(document) = document() else {
            return dialogs;
        };

        if let Some(input) = document
            .get_element_by_id("profile-photo")
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
        {
            let avatar = dialogs.avatar.clone();
            let input_clone = input.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                let Some(file) = input_clone.files().and_then(|f| f.get(0)) else {
                    return;
                };
                if let Err(e) = profile::validate_avatar_upload(&file.type_(), file.size() as u64) {
                    log::warn!("Rejected avatar: {}", e);
                    show_profile_error(&e.to_string());
                    *avatar.borrow_mut() = AvatarChoice::Keep;
                    return;
                }
                let Ok(url) = web_sys::Url::create_object_url_with_blob(&file) else {
                    return;
                };
                let avatar = avatar.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    match avatar_data_url(&url).await {
                        Ok(data_url) => {
                            show_profile_error("");
                            set_preview(Some(&data_url));
                            *avatar.borrow_mut() = AvatarChoice::Set(data_url);
                        }
                        Err(e) => {
                            log::warn!("Avatar processing failed: {}", e);
                            show_profile_error(&e.to_string());
                        }
                    }
                    let _ = web_sys::Url::revoke_object_url(&url);
                });
            });
            let _ = input.add_event_listener_with_callback("change", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        if let Some(btn) = document.get_element_by_id("profile-photo-clear") {
            let avatar = dialogs.avatar.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                *avatar.borrow_mut() = AvatarChoice::Clear;
                set_preview(None);
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        dialogs
    }

    async fn show_end_screen(
        &mut self,
        title: &str,
        score: u64,
        ranking: &[HighScoreEntry],
        rank: usize,
    ) -> TerminalChoice {
        set_text("#end-title", title);
        set_text("#end-score", &score.to_string());
        set_text("#end-rank", &format!("#{rank}"));
        render_ranking(ranking, score, &self.device_id);

        set_visible("end-screen", true);
        let picked = wait_for_click(&["end-restart", "end-abandon"]).await;
        set_visible("end-screen", false);

        match picked {
            Some(0) => TerminalChoice::Restart,
            _ => TerminalChoice::Abandon,
        }
    }
}

impl ProfilePrompt for DomDialogs {
    async fn prompt_profile(&mut self, current: &Profile) -> Option<ProfileInput> {
        let document = document()?;
        let name_input = document
            .get_element_by_id("profile-name")
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())?;

        name_input.set_value(current.name.as_deref().unwrap_or(""));
        *self.avatar.borrow_mut() = AvatarChoice::Keep;
        set_preview(current.avatar.as_deref());
        show_profile_error("");

        set_visible("profile-dialog", true);
        let _ = name_input.focus();
        let picked = wait_for_click(&["profile-save", "profile-skip"]).await;
        set_visible("profile-dialog", false);

        match picked {
            Some(0) => Some(ProfileInput {
                name: name_input.value(),
                avatar: self.avatar.replace(AvatarChoice::Keep),
            }),
            _ => None,
        }
    }
}

impl TerminalScreens for DomDialogs {
    async fn show_defeat(
        &mut self,
        score: u64,
        ranking: &[HighScoreEntry],
        rank: usize,
    ) -> TerminalChoice {
        self.show_end_screen("Defeated", score, ranking, rank).await
    }

    async fn show_victory(
        &mut self,
        score: u64,
        ranking: &[HighScoreEntry],
        rank: usize,
    ) -> TerminalChoice {
        self.show_end_screen("Victory!", score, ranking, rank).await
    }
}

/// Rebuild the ranking list. Player names go in as text, never markup.
fn render_ranking(ranking: &[HighScoreEntry], score: u64, device_id: &str) {
    let Some(document) = document() else { return };
    let Some(list) = document.get_element_by_id("ranking-list") else {
        return;
    };
    list.set_inner_html("");

    if ranking.is_empty() {
        if let Ok(row) = document.create_element("li") {
            row.set_text_content(Some("No scores yet"));
            let _ = list.append_child(&row);
        }
        return;
    }

    let now = crate::now_ms();

    for (i, entry) in ranking.iter().enumerate() {
        let Ok(row) = ranking_row(&document, i, entry, now) else {
            continue;
        };
        if HighScores::is_current(entry, score, device_id) {
            let _ = row.class_list().add_1("current");
        }
        let _ = list.append_child(&row);
    }
}

fn ranking_row(
    document: &Document,
    index: usize,
    entry: &HighScoreEntry,
    now: f64,
) -> Result<Element, JsValue> {
    let row = document.create_element("li")?;

    let place = document.create_element("span")?;
    place.set_class_name("rank");
    let label = highscores::medal(index)
        .map(str::to_string)
        .unwrap_or_else(|| format!("#{}", index + 1));
    place.set_text_content(Some(&label));
    row.append_child(&place)?;

    if let Some(avatar) = &entry.avatar {
        let img = document.create_element("img")?;
        img.set_class_name("avatar");
        img.set_attribute("src", avatar)?;
        row.append_child(&img)?;
    }

    for (class, text) in [
        ("name", entry.name.clone()),
        ("score", entry.score.to_string()),
        ("date", highscores::format_date(entry.timestamp, now)),
    ] {
        let cell = document.create_element("span")?;
        cell.set_class_name(class);
        cell.set_text_content(Some(&text));
        row.append_child(&cell)?;
    }

    Ok(row)
}
