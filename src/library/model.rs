use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub is_completed: bool,
}

impl Chapter {
    pub fn new(title: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            id: format!("ch-{}", Uuid::new_v4()),
            title: title.into(),
            summary: summary.into(),
            content: String::new(),
            is_completed: false,
        }
    }

    pub fn word_count(&self) -> usize {
        word_count(&self.content)
    }
}

/// A writing project with its worldbuilding metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub setting: String,
    #[serde(default)]
    pub magic_system: String,
    #[serde(default)]
    pub tone: String,
    pub chapters: Vec<Chapter>,
    #[serde(default)]
    pub notes: String,
    #[serde(with = "chrono::serde::ts_milliseconds", default = "Utc::now")]
    pub last_modified: DateTime<Utc>,
}

impl Project {
    /// Seed project for an empty library
    pub fn starter() -> Self {
        Self {
            id: "default-1".to_string(),
            title: "Meu Primeiro Livro".to_string(),
            author: "Autor Desconhecido".to_string(),
            genre: "Geral".to_string(),
            setting: "Indefinido".to_string(),
            magic_system: String::new(),
            tone: "Neutro".to_string(),
            chapters: vec![Chapter {
                id: "c1".to_string(),
                title: "Capítulo 1: O Início".to_string(),
                summary: "O protagonista acorda em um lugar estranho. Ele percebe que não está sozinho."
                    .to_string(),
                content: String::new(),
                is_completed: false,
            }],
            notes: String::new(),
            last_modified: Utc::now(),
        }
    }

    pub fn chapter(&self, chapter_id: &str) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.id == chapter_id)
    }

    pub fn word_count(&self) -> usize {
        self.chapters.iter().map(Chapter::word_count).sum()
    }

    pub fn touch(&mut self) {
        self.last_modified = Utc::now();
    }
}

/// Fields for a new project; blank title and author get defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub setting: String,
    #[serde(default)]
    pub magic_system: String,
    #[serde(default)]
    pub tone: String,
}

/// Partial chapter update, `None` fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterUpdate {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub is_completed: Option<bool>,
}

impl ChapterUpdate {
    pub fn apply(self, chapter: &mut Chapter) {
        if let Some(title) = self.title {
            chapter.title = title;
        }
        if let Some(summary) = self.summary {
            chapter.summary = summary;
        }
        if let Some(content) = self.content {
            chapter.content = content;
        }
        if let Some(done) = self.is_completed {
            chapter.is_completed = done;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

/// Worldbuilding fields passed to the draft generator as context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectField {
    Genre,
    Setting,
    MagicSystem,
    Tone,
}

impl ProjectField {
    pub fn label(self) -> &'static str {
        match self {
            Self::Genre => "Genre",
            Self::Setting => "Setting",
            Self::MagicSystem => "Magic system",
            Self::Tone => "Tone",
        }
    }

    pub fn value(self, project: &Project) -> &str {
        match self {
            Self::Genre => &project.genre,
            Self::Setting => &project.setting,
            Self::MagicSystem => &project.magic_system,
            Self::Tone => &project.tone,
        }
    }

    fn slot(self, project: &mut Project) -> &mut String {
        match self {
            Self::Genre => &mut project.genre,
            Self::Setting => &mut project.setting,
            Self::MagicSystem => &mut project.magic_system,
            Self::Tone => &mut project.tone,
        }
    }

    pub fn set(self, project: &mut Project, value: &str) {
        *self.slot(project) = value.to_string();
    }
}

/// Number of whitespace separated words
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
