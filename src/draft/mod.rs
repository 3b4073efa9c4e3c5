pub mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;
use serde::{Serialize, Deserialize};

use crate::library::{Chapter, Project};
use crate::state::DraftSettings;

/// Amount of existing chapter text sent along with a request
const CURRENT_TEXT_TAIL_CHARS: usize = 2000;

#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    #[error("Draft generation is not configured: set GEMINI_API_KEY or API_KEY")]
    NotConfigured,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    #[error("Malformed provider response: {0}")]
    Malformed(String),
}

/// Worldbuilding fields of the project a draft belongs to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookContext {
    pub genre: String,
    pub setting: String,
    pub magic_system: String,
    pub tone: String,
    pub chapter_title: String,
    pub chapter_summary: String,
    /// Tail of the text already written in the chapter
    pub current_text: String,
}

impl BookContext {
    pub fn for_chapter(project: &Project, chapter: &Chapter) -> Self {
        let content = chapter.content.as_str();
        let skip = content.chars().count().saturating_sub(CURRENT_TEXT_TAIL_CHARS);
        Self {
            genre: project.genre.clone(),
            setting: project.setting.clone(),
            magic_system: project.magic_system.clone(),
            tone: project.tone.clone(),
            chapter_title: chapter.title.clone(),
            chapter_summary: chapter.summary.clone(),
            current_text: content.chars().skip(skip).collect(),
        }
    }

    /// Labelled lines for the non-empty fields
    pub fn to_lines(&self) -> Vec<String> {
        [
            ("Genre", &self.genre),
            ("Setting", &self.setting),
            ("Magic system", &self.magic_system),
            ("Tone", &self.tone),
            ("Chapter", &self.chapter_title),
            ("Chapter summary", &self.chapter_summary),
            ("Text so far", &self.current_text),
        ]
        .into_iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .map(|(label, value)| format!("{}: {}", label, value.trim()))
        .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
}

impl From<&DraftSettings> for GenerationParams {
    fn from(settings: &DraftSettings) -> Self {
        Self {
            temperature: settings.temperature,
            top_k: settings.top_k,
            top_p: settings.top_p,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DraftRequest {
    pub prompt: String,
    pub context: BookContext,
    pub params: GenerationParams,
}

/// Text generation backend used to draft or extend chapters
#[async_trait]
pub trait DraftGenerator: Send + Sync {
    async fn generate(&self, request: DraftRequest) -> Result<String, DraftError>;
}
