use anyhow::{Context, Result};

use crate::library::{export as text_export, Chapter, ChapterUpdate, Library, MoveDirection, NewProject, ProjectField};
use super::ExportKind;
use crate::persistence;
use crate::state::AppState;

/// Write the project list after a mutation
fn persist(state: &AppState) {
    let library = state.library();
    persistence::save_projects(&state.data_dir, library.projects());
}

/// Remember the open project for the next start-up
fn remember_current_project(state: &AppState) {
    let current = state.library().current_project().map(|p| p.id.clone());
    let mut settings = state.settings();
    settings.general.current_project_id = current;
    persistence::save_settings(&state.data_dir, &settings);
}

/// Narration must not outlive the chapter it was started from
fn stop_narration(state: &AppState) {
    state.narrator().cancel();
}

fn project_id_at(library: &Library, n: usize) -> Result<String> {
    library
        .projects()
        .get(n - 1)
        .map(|p| p.id.clone())
        .ok_or_else(|| anyhow::anyhow!("No project #{}", n))
}

fn chapter_id_at(library: &Library, n: usize) -> Result<String> {
    let project = library.current_project().context("Open a project first")?;
    project
        .chapters
        .get(n - 1)
        .map(|c| c.id.clone())
        .ok_or_else(|| anyhow::anyhow!("No chapter #{}", n))
}

fn current_chapter(library: &Library) -> Result<&Chapter> {
    library.current_chapter().context("Open a project first")
}

pub fn list_projects(state: &AppState) -> String {
    let library = state.library();
    let current = library.current_project().map(|p| p.id.as_str());
    let lines: Vec<String> = library
        .projects()
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let marker = if Some(p.id.as_str()) == current { "*" } else { " " };
            format!(
                "{}{:>3}. {} by {} ({} chapters, {} words, edited {})",
                marker,
                i + 1,
                p.title,
                p.author,
                p.chapters.len(),
                p.word_count(),
                p.last_modified.format("%Y-%m-%d %H:%M")
            )
        })
        .collect();
    if lines.is_empty() {
        "Library is empty, create a project with 'new <title>'".to_string()
    } else {
        lines.join("\n")
    }
}

pub fn open_project(state: &AppState, n: usize) -> Result<String> {
    stop_narration(state);
    let title = {
        let mut library = state.library();
        let id = project_id_at(&library, n)?;
        library.open_project(&id)?;
        library.current_project().map(|p| p.title.clone()).unwrap_or_default()
    };
    remember_current_project(state);
    Ok(format!("Opened '{}'", title))
}

pub fn close_project(state: &AppState) -> String {
    stop_narration(state);
    state.library().close_project();
    remember_current_project(state);
    "Project closed".to_string()
}

pub fn create_project(state: &AppState, title: String) -> String {
    stop_narration(state);
    let title = {
        let mut library = state.library();
        library.create_project(NewProject { title, ..Default::default() });
        library.current_project().map(|p| p.title.clone()).unwrap_or_default()
    };
    persist(state);
    remember_current_project(state);
    format!("Created and opened '{}'", title)
}

pub fn remove_project(state: &AppState, n: usize) -> Result<String> {
    let (id, title, removes_current) = {
        let library = state.library();
        let id = project_id_at(&library, n)?;
        let title = library.project(&id).map(|p| p.title.clone()).unwrap_or_default();
        let removes_current = library.current_project().is_some_and(|p| p.id == id);
        (id, title, removes_current)
    };
    if removes_current {
        stop_narration(state);
    }
    state.library().delete_project(&id)?;
    persist(state);
    if removes_current {
        remember_current_project(state);
    }
    Ok(format!("Deleted '{}'", title))
}

/// Title, author and worldbuilding of the open project
pub fn project_info(state: &AppState) -> Result<String> {
    let library = state.library();
    let project = library.current_project().context("Open a project first")?;
    let mut lines = vec![format!("{} by {}", project.title, project.author)];
    for field in [ProjectField::Genre, ProjectField::Setting, ProjectField::MagicSystem, ProjectField::Tone] {
        let value = field.value(project);
        lines.push(format!("{}: {}", field.label(), if value.is_empty() { "-" } else { value }));
    }
    if !project.notes.is_empty() {
        lines.push(format!("Notes: {}", project.notes));
    }
    Ok(lines.join("\n"))
}

pub fn set_title(state: &AppState, title: &str) -> Result<String> {
    {
        let mut library = state.library();
        let author = library.current_project().context("Open a project first")?.author.clone();
        library.update_project_metadata(title, &author)?;
    }
    persist(state);
    Ok(format!("Project renamed to '{}'", title))
}

pub fn set_author(state: &AppState, author: &str) -> Result<String> {
    {
        let mut library = state.library();
        let title = library.current_project().context("Open a project first")?.title.clone();
        library.update_project_metadata(&title, author)?;
    }
    persist(state);
    Ok(format!("Author set to {}", author))
}

pub fn set_field(state: &AppState, field: ProjectField, value: &str) -> Result<String> {
    state.library().update_project_field(field, value)?;
    persist(state);
    Ok(format!("{} saved", field.label()))
}

pub fn import_project(state: &AppState, path: &str) -> Result<String> {
    let json = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
    let id = state.library().import_project_json(&json)?;
    persist(state);
    tracing::info!("Imported project {} from {}", id, path);
    Ok("Project imported, see 'projects'".to_string())
}

pub fn update_notes(state: &AppState, notes: &str) -> Result<String> {
    state.library().update_notes(notes)?;
    persist(state);
    Ok("Notes saved".to_string())
}

pub fn list_chapters(state: &AppState) -> Result<String> {
    let library = state.library();
    let project = library.current_project().context("Open a project first")?;
    let current = library.current_chapter().map(|c| c.id.as_str());
    let lines: Vec<String> = project
        .chapters
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let marker = if Some(c.id.as_str()) == current { "*" } else { " " };
            let done = if c.is_completed { "[x]" } else { "[ ]" };
            format!("{}{:>3}. {} {} ({} words)", marker, i + 1, done, c.title, c.word_count())
        })
        .collect();
    Ok(format!("{}\n{}", project.title, lines.join("\n")))
}

pub fn select_chapter(state: &AppState, n: usize) -> Result<String> {
    stop_narration(state);
    let mut library = state.library();
    let id = chapter_id_at(&library, n)?;
    library.select_chapter(&id)?;
    Ok(format!("Editing '{}'", current_chapter(&library)?.title))
}

pub fn add_chapter(state: &AppState) -> Result<String> {
    stop_narration(state);
    let title = {
        let mut library = state.library();
        library.add_chapter()?;
        current_chapter(&library)?.title.clone()
    };
    persist(state);
    Ok(format!("Added '{}'", title))
}

pub fn delete_chapter(state: &AppState, n: usize) -> Result<String> {
    let removes_current = {
        let library = state.library();
        let id = chapter_id_at(&library, n)?;
        library.current_chapter().map(|c| c.id == id).unwrap_or(false)
    };
    if removes_current {
        stop_narration(state);
    }
    {
        let mut library = state.library();
        let id = chapter_id_at(&library, n)?;
        library.delete_chapter(&id)?;
    }
    persist(state);
    Ok(format!("Deleted chapter #{}", n))
}

pub fn move_chapter(state: &AppState, n: usize, direction: MoveDirection) -> Result<String> {
    {
        let mut library = state.library();
        let id = chapter_id_at(&library, n)?;
        library.reorder_chapter(&id, direction)?;
    }
    persist(state);
    list_chapters(state)
}

pub fn toggle_completed(state: &AppState) -> Result<String> {
    let done = {
        let mut library = state.library();
        let chapter = current_chapter(&library)?;
        let (id, done) = (chapter.id.clone(), !chapter.is_completed);
        library.update_chapter(&id, ChapterUpdate { is_completed: Some(done), ..Default::default() })?;
        done
    };
    persist(state);
    let message = if done { "Chapter marked as completed" } else { "Chapter marked as in progress" };
    Ok(message.to_string())
}

pub fn update_summary(state: &AppState, summary: String) -> Result<String> {
    {
        let mut library = state.library();
        let id = current_chapter(&library)?.id.clone();
        library.update_chapter(&id, ChapterUpdate { summary: Some(summary), ..Default::default() })?;
    }
    persist(state);
    Ok("Summary saved".to_string())
}

/// Add a paragraph to the end of the current chapter
pub fn append_text(state: &AppState, text: &str) -> Result<String> {
    {
        let mut library = state.library();
        let chapter = current_chapter(&library)?;
        let id = chapter.id.clone();
        let content = join_paragraphs(&chapter.content, text);
        library.update_chapter(&id, ChapterUpdate { content: Some(content), ..Default::default() })?;
    }
    persist(state);
    word_counts(state)
}

pub(crate) fn join_paragraphs(existing: &str, addition: &str) -> String {
    let existing = existing.trim_end();
    if existing.is_empty() {
        addition.trim().to_string()
    } else {
        format!("{}\n\n{}", existing, addition.trim())
    }
}

pub fn word_counts(state: &AppState) -> Result<String> {
    let library = state.library();
    let chapter = current_chapter(&library)?;
    Ok(format!(
        "'{}': {} words, book total {} words",
        chapter.title,
        library.chapter_word_count(),
        library.total_word_count()
    ))
}

/// Export the open project (or its current chapter) into the exports folder
pub fn export(state: &AppState, kind: ExportKind) -> Result<String> {
    let (file_name, content) = {
        let library = state.library();
        let project = library.current_project().context("Open a project first")?;
        match kind {
            ExportKind::Manuscript => (
                text_export::export_file_name(&project.title, ".txt"),
                text_export::project_as_text(project),
            ),
            ExportKind::Backup => (
                text_export::export_file_name(&project.title, "_backup.json"),
                text_export::project_as_json(project)?,
            ),
            ExportKind::Chapter => {
                let chapter = current_chapter(&library)?;
                (
                    text_export::export_file_name(&chapter.title, ".txt"),
                    text_export::chapter_as_text(chapter),
                )
            }
        }
    };
    let path = persistence::write_export(&state.data_dir, &file_name, &content)?;
    Ok(format!("Exported to {}", path.display()))
}
