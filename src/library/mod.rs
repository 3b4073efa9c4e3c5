pub mod export;
pub mod model;

pub use model::{word_count, Chapter, ChapterUpdate, MoveDirection, NewProject, Project, ProjectField};

use chrono::Utc;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("No project is open")]
    NoOpenProject,

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Chapter not found: {0}")]
    ChapterNotFound(String),

    #[error("A project must keep at least one chapter")]
    LastChapter,

    #[error("Invalid project backup: {0}")]
    InvalidBackup(#[from] serde_json::Error),
}

pub type LibraryResult<T> = Result<T, LibraryError>;

/// In-memory project library with the current project and chapter selection
#[derive(Debug, Clone, Default)]
pub struct Library {
    projects: Vec<Project>,
    current_project_id: Option<String>,
    current_chapter_id: Option<String>,
}

impl Library {
    pub fn new(projects: Vec<Project>) -> Self {
        Self {
            projects,
            current_project_id: None,
            current_chapter_id: None,
        }
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn project(&self, project_id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == project_id)
    }

    pub fn current_project(&self) -> Option<&Project> {
        self.current_project_id.as_deref().and_then(|id| self.project(id))
    }

    pub fn current_chapter(&self) -> Option<&Chapter> {
        let chapter_id = self.current_chapter_id.as_deref()?;
        self.current_project()?.chapter(chapter_id)
    }

    pub fn chapter_word_count(&self) -> usize {
        self.current_chapter().map(Chapter::word_count).unwrap_or(0)
    }

    pub fn total_word_count(&self) -> usize {
        self.current_project().map(Project::word_count).unwrap_or(0)
    }

    fn current_project_mut(&mut self) -> LibraryResult<&mut Project> {
        let id = self.current_project_id.as_deref().ok_or(LibraryError::NoOpenProject)?;
        self.projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| LibraryError::ProjectNotFound(id.to_string()))
    }

    // --- Library actions ---

    /// Add a project at the top of the library and open it
    pub fn create_project(&mut self, data: NewProject) -> String {
        let or_default = |value: String, default: &str| {
            if value.trim().is_empty() {
                default.to_string()
            } else {
                value
            }
        };
        let project = Project {
            id: format!("proj-{}", Uuid::new_v4()),
            title: or_default(data.title, "Novo Livro"),
            author: or_default(data.author, "Eu"),
            genre: data.genre,
            setting: data.setting,
            magic_system: data.magic_system,
            tone: data.tone,
            chapters: vec![Chapter::new("Capítulo 1", "")],
            notes: String::new(),
            last_modified: Utc::now(),
        };
        let id = project.id.clone();
        tracing::info!("Created project '{}' ({})", project.title, id);
        self.projects.insert(0, project);
        // Just inserted, cannot be missing
        let _ = self.open_project(&id);
        id
    }

    pub fn delete_project(&mut self, project_id: &str) -> LibraryResult<()> {
        let before = self.projects.len();
        self.projects.retain(|p| p.id != project_id);
        if self.projects.len() == before {
            return Err(LibraryError::ProjectNotFound(project_id.to_string()));
        }
        if self.current_project_id.as_deref() == Some(project_id) {
            self.close_project();
        }
        tracing::info!("Deleted project {}", project_id);
        Ok(())
    }

    /// Open a project and select its first chapter
    pub fn open_project(&mut self, project_id: &str) -> LibraryResult<()> {
        let project = self
            .project(project_id)
            .ok_or_else(|| LibraryError::ProjectNotFound(project_id.to_string()))?;
        let first_chapter = project.chapters.first().map(|c| c.id.clone());
        self.current_project_id = Some(project_id.to_string());
        self.current_chapter_id = first_chapter;
        Ok(())
    }

    pub fn close_project(&mut self) {
        self.current_project_id = None;
        self.current_chapter_id = None;
    }

    /// Add a project from a JSON backup; a clashing id is replaced
    pub fn import_project_json(&mut self, json: &str) -> LibraryResult<String> {
        let mut project: Project = serde_json::from_str(json)?;
        if self.project(&project.id).is_some() {
            project.id = format!("proj-{}", Uuid::new_v4());
        }
        if project.chapters.is_empty() {
            project.chapters.push(Chapter::new("Capítulo 1", ""));
        }
        let id = project.id.clone();
        tracing::info!("Imported project '{}' ({})", project.title, id);
        self.projects.insert(0, project);
        Ok(id)
    }

    // --- Project actions ---

    pub fn update_project_metadata(&mut self, title: &str, author: &str) -> LibraryResult<()> {
        let project = self.current_project_mut()?;
        project.title = title.to_string();
        project.author = author.to_string();
        project.touch();
        Ok(())
    }

    pub fn update_project_field(&mut self, field: ProjectField, value: &str) -> LibraryResult<()> {
        let project = self.current_project_mut()?;
        field.set(project, value);
        project.touch();
        Ok(())
    }

    pub fn update_notes(&mut self, notes: &str) -> LibraryResult<()> {
        let project = self.current_project_mut()?;
        project.notes = notes.to_string();
        project.touch();
        Ok(())
    }

    // --- Chapter actions ---

    pub fn select_chapter(&mut self, chapter_id: &str) -> LibraryResult<()> {
        let project = self.current_project().ok_or(LibraryError::NoOpenProject)?;
        if project.chapter(chapter_id).is_none() {
            return Err(LibraryError::ChapterNotFound(chapter_id.to_string()));
        }
        self.current_chapter_id = Some(chapter_id.to_string());
        Ok(())
    }

    /// Append a chapter to the open project and select it
    pub fn add_chapter(&mut self) -> LibraryResult<String> {
        let project = self.current_project_mut()?;
        let chapter = Chapter::new(
            format!("Novo Capítulo {}", project.chapters.len() + 1),
            "Descreva o que acontece neste capítulo...",
        );
        let id = chapter.id.clone();
        project.chapters.push(chapter);
        project.touch();
        self.current_chapter_id = Some(id.clone());
        Ok(id)
    }

    pub fn update_chapter(&mut self, chapter_id: &str, update: ChapterUpdate) -> LibraryResult<()> {
        let project = self.current_project_mut()?;
        let chapter = project
            .chapters
            .iter_mut()
            .find(|c| c.id == chapter_id)
            .ok_or_else(|| LibraryError::ChapterNotFound(chapter_id.to_string()))?;
        update.apply(chapter);
        project.touch();
        Ok(())
    }

    /// Remove a chapter; the last one of a project is kept
    pub fn delete_chapter(&mut self, chapter_id: &str) -> LibraryResult<()> {
        let project = self.current_project_mut()?;
        if project.chapter(chapter_id).is_none() {
            return Err(LibraryError::ChapterNotFound(chapter_id.to_string()));
        }
        if project.chapters.len() <= 1 {
            return Err(LibraryError::LastChapter);
        }
        project.chapters.retain(|c| c.id != chapter_id);
        project.touch();
        let first = project.chapters.first().map(|c| c.id.clone());

        if self.current_chapter_id.as_deref() == Some(chapter_id) {
            self.current_chapter_id = first;
        }
        Ok(())
    }

    /// Swap a chapter with its neighbour; moving past either end does nothing
    pub fn reorder_chapter(&mut self, chapter_id: &str, direction: MoveDirection) -> LibraryResult<()> {
        let project = self.current_project_mut()?;
        let index = project
            .chapters
            .iter()
            .position(|c| c.id == chapter_id)
            .ok_or_else(|| LibraryError::ChapterNotFound(chapter_id.to_string()))?;
        let target = match direction {
            MoveDirection::Up if index > 0 => index - 1,
            MoveDirection::Down if index + 1 < project.chapters.len() => index + 1,
            _ => return Ok(()),
        };
        project.chapters.swap(index, target);
        project.touch();
        Ok(())
    }
}
