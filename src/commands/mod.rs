pub mod draft;
pub mod library;
pub mod narration;
pub mod settings;

use anyhow::Result;

use crate::draft::DraftGenerator;
use crate::library::{MoveDirection, ProjectField};
use crate::narration::SkipDirection;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    /// Whole manuscript as plain text
    Manuscript,
    /// JSON backup of the project
    Backup,
    /// Current chapter as plain text
    Chapter,
}

/// One console command. Chapter and project positions are 1-based.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Projects,
    Open(usize),
    Close,
    New(String),
    Remove(usize),
    Info,
    Title(String),
    Author(String),
    Describe(ProjectField, String),
    Import(String),
    Notes(String),
    Chapters,
    Chapter(usize),
    Add,
    Delete(usize),
    Move(usize, MoveDirection),
    Done,
    Summary(String),
    Append(String),
    Words,
    Export(ExportKind),
    Read,
    Pause,
    Skip(SkipDirection),
    Rate,
    Stop,
    Voices,
    Draft(String),
    Settings,
    Language(String),
    Help,
    Quit,
}

pub enum Reply {
    Message(String),
    Quit,
}

pub const HELP: &str = "\
Library:    projects | open <n> | close | new <title> | remove <n> | import <file>
Project:    info | title <text> | author <text> | genre|setting|magic|tone <text> | notes <text>
Chapters:   chapters | chapter <n> | add | delete <n> | up <n> | down <n> | done
Writing:    summary <text> | append <text> | words | export [json|chapter] | draft <instruction>
Narration:  read | pause | next | prev | rate | stop | voices | language <tag>
            settings | help | quit";

fn position(arg: &str, usage: &str) -> Result<usize, String> {
    match arg.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("usage: {}", usage)),
    }
}

fn text(arg: &str, usage: &str) -> Result<String, String> {
    let arg = arg.trim();
    if arg.is_empty() {
        Err(format!("usage: {}", usage))
    } else {
        Ok(arg.to_string())
    }
}

impl Command {
    pub fn parse(line: &str) -> Result<Command, String> {
        let line = line.trim();
        let (word, arg) = line.split_once(char::is_whitespace).unwrap_or((line, ""));

        let command = match word.to_ascii_lowercase().as_str() {
            "projects" | "ls" => Command::Projects,
            "open" => Command::Open(position(arg, "open <n>")?),
            "close" => Command::Close,
            "new" => Command::New(arg.trim().to_string()),
            "remove" => Command::Remove(position(arg, "remove <n>")?),
            "info" => Command::Info,
            "title" => Command::Title(text(arg, "title <text>")?),
            "author" => Command::Author(text(arg, "author <text>")?),
            "genre" => Command::Describe(ProjectField::Genre, arg.trim().to_string()),
            "setting" => Command::Describe(ProjectField::Setting, arg.trim().to_string()),
            "magic" => Command::Describe(ProjectField::MagicSystem, arg.trim().to_string()),
            "tone" => Command::Describe(ProjectField::Tone, arg.trim().to_string()),
            "import" => Command::Import(text(arg, "import <file>")?),
            "notes" => Command::Notes(arg.trim().to_string()),
            "chapters" => Command::Chapters,
            "chapter" | "ch" => Command::Chapter(position(arg, "chapter <n>")?),
            "add" => Command::Add,
            "delete" => Command::Delete(position(arg, "delete <n>")?),
            "up" => Command::Move(position(arg, "up <n>")?, MoveDirection::Up),
            "down" => Command::Move(position(arg, "down <n>")?, MoveDirection::Down),
            "done" => Command::Done,
            "summary" => Command::Summary(arg.trim().to_string()),
            "append" => Command::Append(text(arg, "append <text>")?),
            "words" => Command::Words,
            "export" => match arg.trim() {
                "" | "txt" => Command::Export(ExportKind::Manuscript),
                "json" => Command::Export(ExportKind::Backup),
                "chapter" => Command::Export(ExportKind::Chapter),
                _ => return Err("usage: export [json|chapter]".to_string()),
            },
            "read" | "play" => Command::Read,
            "pause" | "resume" => Command::Pause,
            "next" => Command::Skip(SkipDirection::Next),
            "prev" => Command::Skip(SkipDirection::Prev),
            "rate" => Command::Rate,
            "stop" => Command::Stop,
            "voices" => Command::Voices,
            "draft" => Command::Draft(text(arg, "draft <instruction>")?),
            "settings" => Command::Settings,
            "language" | "lang" => Command::Language(text(arg, "language <tag>")?),
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            "" => return Err(String::new()),
            other => return Err(format!("unknown command '{}', try 'help'", other)),
        };
        Ok(command)
    }
}

/// Run one command against the application state
pub async fn execute(state: &AppState, generator: &dyn DraftGenerator, command: Command) -> Result<Reply> {
    let message = match command {
        Command::Projects => library::list_projects(state),
        Command::Open(n) => library::open_project(state, n)?,
        Command::Close => library::close_project(state),
        Command::New(title) => library::create_project(state, title),
        Command::Remove(n) => library::remove_project(state, n)?,
        Command::Info => library::project_info(state)?,
        Command::Title(title) => library::set_title(state, &title)?,
        Command::Author(author) => library::set_author(state, &author)?,
        Command::Describe(field, value) => library::set_field(state, field, &value)?,
        Command::Import(path) => library::import_project(state, &path)?,
        Command::Notes(notes) => library::update_notes(state, &notes)?,
        Command::Chapters => library::list_chapters(state)?,
        Command::Chapter(n) => library::select_chapter(state, n)?,
        Command::Add => library::add_chapter(state)?,
        Command::Delete(n) => library::delete_chapter(state, n)?,
        Command::Move(n, direction) => library::move_chapter(state, n, direction)?,
        Command::Done => library::toggle_completed(state)?,
        Command::Summary(summary) => library::update_summary(state, summary)?,
        Command::Append(text) => library::append_text(state, &text)?,
        Command::Words => library::word_counts(state)?,
        Command::Export(kind) => library::export(state, kind)?,
        Command::Read => narration::read_chapter(state)?,
        Command::Pause => narration::toggle_pause(state),
        Command::Skip(direction) => narration::skip(state, direction),
        Command::Rate => narration::cycle_rate(state),
        Command::Stop => narration::stop(state),
        Command::Voices => narration::list_voices(state),
        Command::Draft(instruction) => draft::draft_into_chapter(state, generator, instruction).await?,
        Command::Settings => settings::show_settings(state)?,
        Command::Language(tag) => settings::set_language(state, &tag),
        Command::Help => HELP.to_string(),
        Command::Quit => {
            narration::stop(state);
            return Ok(Reply::Quit);
        }
    };
    Ok(Reply::Message(message))
}
