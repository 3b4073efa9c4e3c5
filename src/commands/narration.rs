use anyhow::{Context, Result};

use crate::engine::{language_family, select_voice};
use crate::narration::{PlaybackState, SkipDirection};
use crate::state::{AppState, AppStatus};

fn describe(state: &AppState) -> String {
    let snapshot = state.narrator().snapshot();
    match snapshot.state {
        PlaybackState::Idle => format!("Narration stopped ({})", snapshot.rate),
        PlaybackState::Speaking | PlaybackState::Paused => format!(
            "{} chunk {}/{} at {}",
            if snapshot.is_paused { "Paused at" } else { "Reading" },
            (snapshot.cursor + 1).min(snapshot.chunk_count),
            snapshot.chunk_count,
            snapshot.rate
        ),
    }
}

/// Read the current chapter aloud from the beginning
pub fn read_chapter(state: &AppState) -> Result<String> {
    let (title, content) = {
        let library = state.library();
        let chapter = library.current_chapter().context("Open a project first")?;
        (chapter.title.clone(), chapter.content.clone())
    };
    if content.trim().is_empty() {
        return Ok(format!("'{}' has no text to read", title));
    }

    state.narrator().speak(&content);
    state.set_status(AppStatus::Narrating);
    tracing::info!("Reading chapter '{}'", title);
    Ok(describe(state))
}

pub fn toggle_pause(state: &AppState) -> String {
    state.narrator().toggle_pause();
    describe(state)
}

pub fn skip(state: &AppState, direction: SkipDirection) -> String {
    state.narrator().skip(direction);
    describe(state)
}

pub fn cycle_rate(state: &AppState) -> String {
    let rate = {
        let mut narrator = state.narrator();
        narrator.cycle_rate();
        narrator.rate()
    };
    format!("Speed {}", rate)
}

pub fn stop(state: &AppState) -> String {
    state.narrator().cancel();
    if state.status() == AppStatus::Narrating {
        state.set_status(AppStatus::Idle);
    }
    describe(state)
}

pub fn list_voices(state: &AppState) -> String {
    let narrator = state.narrator();
    let voices = narrator.voices();
    let profile = narrator.voice_profile();
    let family = language_family(&profile.language);
    let chosen = select_voice(&voices, profile);
    let mut lines = vec![format!(
        "{} voices, narrating with: {}",
        voices.len(),
        chosen.map(|v| v.name).unwrap_or_else(|| "engine default".to_string())
    )];
    lines.extend(
        voices
            .iter()
            .filter(|v| language_family(&v.language) == family)
            .map(|v| format!("  {} ({})", v.name, v.language)),
    );
    lines.join("\n")
}
