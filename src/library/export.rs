use regex::Regex;
use std::sync::OnceLock;

use super::model::{Chapter, Project};

fn whitespace() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}

/// File name for an export: whitespace runs in the title become `_`
pub fn export_file_name(title: &str, suffix: &str) -> String {
    format!("{}{}", whitespace().replace_all(title, "_"), suffix)
}

/// Plain text download of a single chapter
pub fn chapter_as_text(chapter: &Chapter) -> String {
    format!("{}\n\n{}", chapter.title, chapter.content)
}

/// Whole manuscript as plain text, chapters separated by `***`
pub fn project_as_text(project: &Project) -> String {
    let mut text = format!("{}\npor {}\n\n", project.title, project.author);
    for chapter in &project.chapters {
        text.push_str(&format!("### {}\n\n{}\n\n***\n\n", chapter.title, chapter.content));
    }
    text
}

/// Pretty printed JSON backup, readable by `Library::import_project_json`
pub fn project_as_json(project: &Project) -> serde_json::Result<String> {
    serde_json::to_string_pretty(project)
}
