use anyhow::Result;

use crate::persistence;
use crate::state::AppState;

pub fn show_settings(state: &AppState) -> Result<String> {
    let settings = state.settings().clone();
    Ok(serde_json::to_string_pretty(&settings)?)
}

/// Change the narration locale; applies from the next utterance
pub fn set_language(state: &AppState, tag: &str) -> String {
    let profile = {
        let mut settings = state.settings();
        settings.narration.language = tag.to_string();
        persistence::save_settings(&state.data_dir, &settings);
        settings.narration.voice_profile()
    };
    state.narrator().set_voice_profile(profile);
    tracing::info!("Narration language set to {}", tag);
    format!("Narration language set to {}", tag)
}
