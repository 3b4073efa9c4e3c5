use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use serde::{Serialize, Deserialize};

use crate::engine::VoiceProfile;
use crate::library::Library;
use crate::narration::{NarrationController, Rate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppStatus {
    #[default]
    Idle,
    Narrating,
    Generating,
}

pub struct AppState {
    pub status: Mutex<AppStatus>,
    pub settings: Mutex<Settings>,
    pub library: Mutex<Library>,
    pub narrator: Mutex<NarrationController>,
    pub data_dir: PathBuf,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl AppState {
    pub fn new(settings: Settings, library: Library, narrator: NarrationController, data_dir: PathBuf) -> Self {
        Self {
            status: Mutex::new(AppStatus::default()),
            settings: Mutex::new(settings),
            library: Mutex::new(library),
            narrator: Mutex::new(narrator),
            data_dir,
        }
    }

    pub fn status(&self) -> AppStatus {
        *lock(&self.status)
    }

    pub fn set_status(&self, status: AppStatus) {
        *lock(&self.status) = status;
    }

    pub fn settings(&self) -> MutexGuard<'_, Settings> {
        lock(&self.settings)
    }

    pub fn library(&self) -> MutexGuard<'_, Library> {
        lock(&self.library)
    }

    pub fn narrator(&self) -> MutexGuard<'_, NarrationController> {
        lock(&self.narrator)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub narration: NarrationSettings,
    #[serde(default)]
    pub draft: DraftSettings,
    #[serde(default)]
    pub general: GeneralSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationSettings {
    pub language: String,
    pub pitch: f32,
    /// Starting speed for each session; changes made while narrating are not saved
    pub default_rate: f32,
    pub quality_markers: Vec<String>,
    /// Speech command, `say` or `espeak-ng` by platform when unset
    pub command: Option<String>,
}

impl Default for NarrationSettings {
    fn default() -> Self {
        let profile = VoiceProfile::default();
        Self {
            language: profile.language,
            pitch: profile.pitch,
            default_rate: 1.0,
            quality_markers: profile.quality_markers,
            command: None,
        }
    }
}

impl NarrationSettings {
    pub fn voice_profile(&self) -> VoiceProfile {
        VoiceProfile {
            language: self.language.clone(),
            pitch: self.pitch,
            quality_markers: self.quality_markers.clone(),
        }
    }

    pub fn initial_rate(&self) -> Rate {
        Rate::from_value(self.default_rate)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DraftSettings {
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub target_word_count: u32,
}

impl Default for DraftSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            temperature: 0.9,
            top_k: 40,
            top_p: 0.95,
            target_word_count: 1000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Project reopened at start-up
    pub current_project_id: Option<String>,
}
