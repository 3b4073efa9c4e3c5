use anyhow::{Context, Result};

use super::library::join_paragraphs;
use crate::draft::{BookContext, DraftGenerator, DraftRequest, GenerationParams};
use crate::library::ChapterUpdate;
use crate::narration::PlaybackState;
use crate::persistence;
use crate::state::{AppState, AppStatus};

/// Generate a continuation for the current chapter and append it.
///
/// An empty chapter gets a full draft of roughly the configured word count.
pub async fn draft_into_chapter(
    state: &AppState,
    generator: &dyn DraftGenerator,
    instruction: String,
) -> Result<String> {
    let (chapter_id, request) = {
        let library = state.library();
        let project = library.current_project().context("Open a project first")?;
        let chapter = library.current_chapter().context("Open a project first")?;
        let settings = state.settings();
        let prompt = if chapter.content.trim().is_empty() {
            format!("{}\n\nTarget length: about {} words.", instruction, settings.draft.target_word_count)
        } else {
            instruction
        };
        let request = DraftRequest {
            prompt,
            context: BookContext::for_chapter(project, chapter),
            params: GenerationParams::from(&settings.draft),
        };
        (chapter.id.clone(), request)
    };

    state.set_status(AppStatus::Generating);
    let result = generator.generate(request).await;
    // Narration may have started or ended while the request was out
    let settled = if state.narrator().state() == PlaybackState::Idle {
        AppStatus::Idle
    } else {
        AppStatus::Narrating
    };
    state.set_status(settled);

    let text = result?;
    if text.trim().is_empty() {
        return Ok("The generator returned no text".to_string());
    }

    {
        let mut library = state.library();
        let project = library
            .current_project()
            .context("Project was closed while drafting")?;
        let existing = project
            .chapter(&chapter_id)
            .map(|c| c.content.clone())
            .context("Chapter was removed while drafting")?;
        library.update_chapter(
            &chapter_id,
            ChapterUpdate { content: Some(join_paragraphs(&existing, &text)), ..Default::default() },
        )?;
        persistence::save_projects(&state.data_dir, library.projects());
    }

    Ok(format!("Added {} words to the chapter", crate::library::word_count(&text)))
}
