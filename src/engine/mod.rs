pub mod process;

use serde::{Serialize, Deserialize};

/// Identifies one dispatched utterance. Ids grow monotonically per controller,
/// so an event carrying an old id belongs to a superseded utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UtteranceId(pub u64);

impl std::fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A voice offered by the platform narration engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    pub name: String,
    /// BCP 47 tag as reported by the engine, e.g. `pt-BR` or `pt_BR`
    pub language: String,
}

/// One request to vocalize a single chunk
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub id: UtteranceId,
    pub text: String,
    pub rate: f32,
    pub pitch: f32,
    pub voice: Option<Voice>,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UtteranceOutcome {
    Finished,
    Failed(String),
}

/// Completion or error callback for a dispatched utterance
#[derive(Debug, Clone, PartialEq)]
pub struct EngineEvent {
    pub id: UtteranceId,
    pub outcome: UtteranceOutcome,
}

impl EngineEvent {
    pub fn finished(id: UtteranceId) -> Self {
        Self { id, outcome: UtteranceOutcome::Finished }
    }

    pub fn failed(id: UtteranceId, reason: impl Into<String>) -> Self {
        Self { id, outcome: UtteranceOutcome::Failed(reason.into()) }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("narration engine unavailable: {0}")]
    Unavailable(String),

    #[error("failed to start utterance: {0}")]
    Dispatch(String),
}

/// Platform narration capability.
///
/// `speak` only starts an utterance; completion and failure are reported later
/// as [`EngineEvent`]s which the host feeds back into the controller.
/// `cancel` drops the current utterance and any paused state.
pub trait NarrationEngine: Send {
    fn speak(&mut self, utterance: Utterance) -> Result<(), EngineError>;
    fn pause(&mut self);
    fn resume(&mut self);
    fn cancel(&mut self);
    fn voices(&self) -> Vec<Voice>;
}

/// Locale and voice preferences used for every utterance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceProfile {
    pub language: String,
    pub pitch: f32,
    /// Substrings of voice names that signal a high quality voice for the locale
    pub quality_markers: Vec<String>,
}

impl Default for VoiceProfile {
    fn default() -> Self {
        Self {
            language: "pt-BR".to_string(),
            pitch: 1.0,
            quality_markers: vec!["Google".to_string(), "Luciana".to_string()],
        }
    }
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().replace('_', "-").to_ascii_lowercase()
}

fn primary_subtag(tag: &str) -> &str {
    tag.split('-').next().unwrap_or(tag)
}

/// Primary language subtag, lowercased: `pt_BR` and `pt-PT` are both `pt`
pub fn language_family(tag: &str) -> String {
    primary_subtag(&normalize_tag(tag)).to_string()
}

/// Pick a voice: a quality voice for the exact locale, then any voice for the
/// exact locale, then any voice of the same language family, else none.
pub fn select_voice(voices: &[Voice], profile: &VoiceProfile) -> Option<Voice> {
    let wanted = normalize_tag(&profile.language);
    let family = language_family(&wanted);

    let exact: Vec<&Voice> = voices
        .iter()
        .filter(|v| normalize_tag(&v.language) == wanted)
        .collect();

    exact
        .iter()
        .find(|v| profile.quality_markers.iter().any(|m| v.name.contains(m.as_str())))
        .or_else(|| exact.first())
        .copied()
        .or_else(|| {
            voices
                .iter()
                .find(|v| language_family(&v.language) == family)
        })
        .cloned()
}
