//! Per-device player identity
//!
//! A device gets a random identity token the first time it runs the game.
//! The display name and avatar are asked for once, on the first finished run,
//! and reused afterwards unless the player edits them.

use rand::Rng;

use crate::consts::{ANONYMOUS_NAME, AVATAR_SIZE_PX, MAX_AVATAR_UPLOAD_BYTES, MAX_NAME_CHARS};
use crate::platform::storage::keys;
use crate::platform::{AvatarChoice, KeyValueStore, ProfilePrompt};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProfileError {
    #[error("avatar must be an image, got {0:?}")]
    NotAnImage(String),
    #[error("avatar must be at most {max} bytes, got {size}")]
    TooLarge { size: u64, max: u64 },
    #[error("could not decode avatar image")]
    Decode,
    #[error("name must not be empty")]
    EmptyName,
}

/// Identity shown on the leaderboard
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Profile {
    pub device_id: String,
    /// None until the player has been asked
    pub name: Option<String>,
    /// Avatar as an image data URL
    pub avatar: Option<String>,
}

impl Profile {
    /// Load the stored identity, creating and persisting a device id if
    /// there is none (or it cannot be read)
    pub fn load_or_create<S, R>(store: &mut S, rng: &mut R, now_ms: f64) -> Self
    where
        S: KeyValueStore + ?Sized,
        R: Rng + ?Sized,
    {
        let stored_id = store.get(keys::DEVICE_ID).unwrap_or_else(|e| {
            log::warn!("Could not read device id: {e}");
            None
        });
        let device_id = match stored_id.filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => {
                let id = generate_device_id(rng, now_ms);
                log::info!("Created device id {id}");
                if let Err(e) = store.set(keys::DEVICE_ID, &id) {
                    log::warn!("Could not save device id: {e}");
                }
                id
            }
        };

        let read = |key: &str| match store.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                log::warn!("Could not read {key}: {e}");
                None
            }
        };
        let name = read(keys::PLAYER_NAME);
        let avatar = read(keys::PLAYER_AVATAR);

        Self {
            device_id,
            name,
            avatar,
        }
    }

    /// Name for leaderboard entries
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(ANONYMOUS_NAME)
    }

    pub fn has_name(&self) -> bool {
        self.name.is_some()
    }

    /// Ask for a name and avatar if this device never gave one.
    /// Dismissing the prompt (or submitting a blank name) stores "Anonymous".
    pub async fn ensure<S, P>(&mut self, store: &mut S, prompt: &mut P)
    where
        S: KeyValueStore + ?Sized,
        P: ProfilePrompt,
    {
        if self.has_name() {
            return;
        }

        let answer = prompt.prompt_profile(self).await;
        let (name, avatar) = match answer {
            Some(input) => (sanitize_name(&input.name), input.avatar),
            None => (None, AvatarChoice::Keep),
        };
        self.name = Some(name.unwrap_or_else(|| ANONYMOUS_NAME.to_string()));
        self.apply_avatar(avatar);
        self.persist(store);
    }

    /// Re-open the profile prompt to rename or change the avatar.
    /// Returns Ok(false) if the player cancelled.
    pub async fn edit<S, P>(&mut self, store: &mut S, prompt: &mut P) -> Result<bool, ProfileError>
    where
        S: KeyValueStore + ?Sized,
        P: ProfilePrompt,
    {
        let Some(input) = prompt.prompt_profile(self).await else {
            return Ok(false);
        };
        let name = sanitize_name(&input.name).ok_or(ProfileError::EmptyName)?;

        self.name = Some(name);
        self.apply_avatar(input.avatar);
        self.persist(store);
        log::info!("Profile updated: {}", self.display_name());
        Ok(true)
    }

    fn apply_avatar(&mut self, choice: AvatarChoice) {
        match choice {
            AvatarChoice::Keep => {}
            AvatarChoice::Set(data_url) => self.avatar = Some(data_url),
            AvatarChoice::Clear => self.avatar = None,
        }
    }

    /// Write name and avatar; failures are logged and dropped
    fn persist<S: KeyValueStore + ?Sized>(&self, store: &mut S) {
        let result = store
            .set(keys::PLAYER_NAME, self.display_name())
            .and_then(|()| match &self.avatar {
                Some(avatar) => store.set(keys::PLAYER_AVATAR, avatar),
                None => store.remove(keys::PLAYER_AVATAR),
            });
        if let Err(e) = result {
            log::warn!("Could not save profile: {e}");
        }
    }
}

/// `VLT-<base36 ms timestamp>-<9 random base36 chars>`
pub fn generate_device_id<R: Rng + ?Sized>(rng: &mut R, now_ms: f64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let suffix: String = (0..9)
        .map(|_| DIGITS[rng.random_range(0..DIGITS.len())] as char)
        .collect();
    format!("VLT-{}-{}", to_base36(now_ms.max(0.0) as u64), suffix)
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.iter().rev().map(|&b| b as char).collect()
}

/// Trim and cut a display name; None if nothing is left
pub fn sanitize_name(raw: &str) -> Option<String> {
    let name: String = raw.trim().chars().take(MAX_NAME_CHARS).collect();
    let name = name.trim_end().to_string();
    (!name.is_empty()).then_some(name)
}

/// Check an avatar upload before decoding it
pub fn validate_avatar_upload(mime: &str, size: u64) -> Result<(), ProfileError> {
    if !mime.starts_with("image/") {
        return Err(ProfileError::NotAnImage(mime.to_string()));
    }
    if size > MAX_AVATAR_UPLOAD_BYTES {
        return Err(ProfileError::TooLarge {
            size,
            max: MAX_AVATAR_UPLOAD_BYTES,
        });
    }
    Ok(())
}

/// Destination rectangle (x, y, w, h) that covers the square avatar canvas
/// with a `width`×`height` image, centred and cropped
pub fn cover_crop(width: f64, height: f64) -> Result<(f64, f64, f64, f64), ProfileError> {
    if width <= 0.0 || height <= 0.0 || !width.is_finite() || !height.is_finite() {
        return Err(ProfileError::Decode);
    }
    let target = f64::from(AVATAR_SIZE_PX);
    let scale = (target / width).max(target / height);
    let (w, h) = (width * scale, height * scale);
    Ok(((target - w) / 2.0, (target - h) / 2.0, w, h))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{MemoryStore, ProfileInput, ScriptedPrompt};
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_device_id_format() {
        let mut rng = Pcg32::seed_from_u64(1);
        let id = generate_device_id(&mut rng, 1_700_000_000_000.0);
        let parts: Vec<_> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "VLT");
        assert_eq!(parts[1], to_base36(1_700_000_000_000));
        assert_eq!(parts[2].len(), 9);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn test_identity_created_once() {
        let mut store = MemoryStore::new();
        let mut rng = Pcg32::seed_from_u64(2);
        let first = Profile::load_or_create(&mut store, &mut rng, 1000.0);
        let second = Profile::load_or_create(&mut store, &mut rng, 2000.0);
        assert_eq!(first.device_id, second.device_id);
        assert_eq!(first.name, None);
    }

    #[test]
    fn test_unreadable_storage_gives_fresh_identity() {
        let mut store = MemoryStore::new();
        store.fail_reads = true;
        let mut rng = Pcg32::seed_from_u64(3);
        let profile = Profile::load_or_create(&mut store, &mut rng, 1000.0);
        assert!(profile.device_id.starts_with("VLT-"));
        assert_eq!(profile.display_name(), "Anonymous");
    }

    #[test]
    fn test_ensure_prompts_once() {
        let mut store = MemoryStore::new();
        let mut rng = Pcg32::seed_from_u64(4);
        let mut profile = Profile::load_or_create(&mut store, &mut rng, 0.0);
        let mut prompt = ScriptedPrompt {
            answer: Some(ProfileInput {
                name: "  Ana  ".to_string(),
                avatar: AvatarChoice::Set("data:image/jpeg;base64,AAAA".to_string()),
            }),
            shown: 0,
        };

        pollster::block_on(profile.ensure(&mut store, &mut prompt));
        pollster::block_on(profile.ensure(&mut store, &mut prompt));
        assert_eq!(prompt.shown, 1);
        assert_eq!(profile.display_name(), "Ana");

        let reloaded = Profile::load_or_create(&mut store, &mut rng, 0.0);
        assert_eq!(reloaded, profile);
    }

    #[test]
    fn test_dismissed_prompt_stores_anonymous() {
        let mut store = MemoryStore::new();
        let mut rng = Pcg32::seed_from_u64(5);
        let mut profile = Profile::load_or_create(&mut store, &mut rng, 0.0);
        let mut prompt = ScriptedPrompt::default();
        pollster::block_on(profile.ensure(&mut store, &mut prompt));
        assert_eq!(profile.name.as_deref(), Some("Anonymous"));
        assert_eq!(
            store.get(keys::PLAYER_NAME).unwrap().as_deref(),
            Some("Anonymous")
        );
    }

    #[test]
    fn test_edit_rejects_empty_name_and_clears_avatar() {
        let mut store = MemoryStore::new();
        let mut profile = Profile {
            device_id: "VLT-x-y".to_string(),
            name: Some("Ana".to_string()),
            avatar: Some("data:image/jpeg;base64,AAAA".to_string()),
        };

        let mut blank = ScriptedPrompt {
            answer: Some(ProfileInput {
                name: "   ".to_string(),
                avatar: AvatarChoice::Clear,
            }),
            shown: 0,
        };
        let result = pollster::block_on(profile.edit(&mut store, &mut blank));
        assert_eq!(result, Err(ProfileError::EmptyName));
        assert!(profile.avatar.is_some());

        let mut rename = ScriptedPrompt {
            answer: Some(ProfileInput {
                name: "Bea".to_string(),
                avatar: AvatarChoice::Clear,
            }),
            shown: 0,
        };
        assert_eq!(
            pollster::block_on(profile.edit(&mut store, &mut rename)),
            Ok(true)
        );
        assert_eq!(profile.display_name(), "Bea");
        assert_eq!(profile.avatar, None);
        assert_eq!(store.get(keys::PLAYER_AVATAR).unwrap(), None);

        let mut cancel = ScriptedPrompt::default();
        assert_eq!(
            pollster::block_on(profile.edit(&mut store, &mut cancel)),
            Ok(false)
        );
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("  Ana "), Some("Ana".to_string()));
        assert_eq!(sanitize_name("   "), None);
        let long = "x".repeat(40);
        assert_eq!(sanitize_name(&long).map(|n| n.len()), Some(20));
    }

    #[test]
    fn test_validate_avatar_upload() {
        assert!(validate_avatar_upload("image/png", 1000).is_ok());
        assert!(validate_avatar_upload("image/jpeg", 500_000).is_ok());
        assert_eq!(
            validate_avatar_upload("text/plain", 10),
            Err(ProfileError::NotAnImage("text/plain".to_string()))
        );
        assert!(matches!(
            validate_avatar_upload("image/png", 500_001),
            Err(ProfileError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_cover_crop_centres_wide_image() {
        let (x, y, w, h) = cover_crop(400.0, 200.0).unwrap();
        assert_eq!((w, h), (200.0, 100.0));
        assert_eq!((x, y), (-50.0, 0.0));
        assert_eq!(cover_crop(0.0, 10.0), Err(ProfileError::Decode));
    }
}
