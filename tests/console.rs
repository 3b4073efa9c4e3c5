mod common;

use std::sync::Mutex;

use async_trait::async_trait;
use common::{finish_last, FakeEngine};
use livroguia_lib::commands::{execute, Command, Reply};
use livroguia_lib::draft::{DraftError, DraftGenerator, DraftRequest};
use livroguia_lib::engine::VoiceProfile;
use livroguia_lib::library::{Library, Project};
use livroguia_lib::narration::{NarrationController, PlaybackState};
use livroguia_lib::persistence;
use livroguia_lib::state::{AppState, AppStatus, Settings};

/// Generator double returning a fixed text and keeping the last request
struct CannedGenerator {
    reply: Result<String, u16>,
    last_request: Mutex<Option<DraftRequest>>,
}

impl CannedGenerator {
    fn ok(text: &str) -> Self {
        Self { reply: Ok(text.to_string()), last_request: Mutex::new(None) }
    }

    fn failing(status: u16) -> Self {
        Self { reply: Err(status), last_request: Mutex::new(None) }
    }
}

#[async_trait]
impl DraftGenerator for CannedGenerator {
    async fn generate(&self, request: DraftRequest) -> Result<String, DraftError> {
        *self.last_request.lock().unwrap() = Some(request);
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(status) => Err(DraftError::Provider { status: *status, message: "quota".into() }),
        }
    }
}

struct Harness {
    state: AppState,
    log: std::sync::Arc<std::sync::Mutex<common::EngineLog>>,
    _dir: tempfile::TempDir,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let mut library = Library::new(vec![Project::starter()]);
    library.open_project("default-1").unwrap();
    let (engine, log) = FakeEngine::new();
    let narrator = NarrationController::new(Box::new(engine), VoiceProfile::default());
    let state = AppState::new(Settings::default(), library, narrator, dir.path().to_path_buf());
    Harness { state, log, _dir: dir }
}

async fn run(h: &Harness, generator: &dyn DraftGenerator, line: &str) -> String {
    let command = Command::parse(line).unwrap();
    match execute(&h.state, generator, command).await.unwrap() {
        Reply::Message(message) => message,
        Reply::Quit => "quit".to_string(),
    }
}

#[tokio::test]
async fn reading_an_empty_chapter_does_not_narrate() {
    let h = harness();
    let generator = CannedGenerator::ok("");
    let reply = run(&h, &generator, "read").await;
    assert!(reply.contains("no text"));
    assert_eq!(h.state.narrator().state(), PlaybackState::Idle);
}

#[tokio::test]
async fn append_then_read_aloud() {
    let h = harness();
    let generator = CannedGenerator::ok("");
    run(&h, &generator, "append Ele correu. Ela gritou! Fim?").await;
    run(&h, &generator, "read").await;

    assert_eq!(h.state.status(), AppStatus::Narrating);
    assert_eq!(h.state.narrator().queue().len(), 3);

    let reply = run(&h, &generator, "pause").await;
    assert!(reply.starts_with("Paused at chunk 1/3"));
    run(&h, &generator, "next").await;
    assert_eq!(h.state.narrator().cursor(), 1);

    let reply = run(&h, &generator, "rate").await;
    assert_eq!(reply, "Speed 1.25x");

    for _ in 0..2 {
        let event = finish_last(&h.log);
        h.state.narrator().handle_event(event);
    }
    assert_eq!(h.state.narrator().state(), PlaybackState::Idle);
}

#[tokio::test]
async fn switching_chapters_stops_narration() {
    let h = harness();
    let generator = CannedGenerator::ok("");
    run(&h, &generator, "append Um. Dois.").await;
    run(&h, &generator, "read").await;
    run(&h, &generator, "add").await;

    assert_eq!(h.state.narrator().state(), PlaybackState::Idle);
    assert!(h.state.narrator().queue().is_empty());

    run(&h, &generator, "chapter 1").await;
    run(&h, &generator, "read").await;
    run(&h, &generator, "close").await;
    assert_eq!(h.state.narrator().state(), PlaybackState::Idle);
}

#[tokio::test]
async fn draft_appends_generated_text_and_persists() {
    let h = harness();
    let generator = CannedGenerator::ok("O vento uivava lá fora.");
    run(&h, &generator, "append Era uma vez.").await;
    let reply = run(&h, &generator, "draft continue com suspense").await;
    assert_eq!(reply, "Added 5 words to the chapter");

    let content = h.state.library().current_chapter().unwrap().content.clone();
    assert_eq!(content, "Era uma vez.\n\nO vento uivava lá fora.");
    assert_eq!(h.state.status(), AppStatus::Idle);

    let request = generator.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(request.prompt, "continue com suspense");
    assert_eq!(request.context.current_text, "Era uma vez.");
    assert_eq!(request.context.genre, "Geral");
    assert_eq!(request.params.top_k, 40);

    let saved = persistence::load_projects(&h.state.data_dir);
    assert_eq!(saved[0].chapters[0].content, content);
}

#[tokio::test]
async fn draft_for_empty_chapter_asks_for_target_length() {
    let h = harness();
    let generator = CannedGenerator::ok("Texto.");
    run(&h, &generator, "draft escreva a cena").await;
    let request = generator.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(request.prompt, "escreva a cena\n\nTarget length: about 1000 words.");
}

#[tokio::test]
async fn draft_failure_leaves_chapter_untouched() {
    let h = harness();
    let generator = CannedGenerator::failing(429);
    let command = Command::parse("draft qualquer coisa").unwrap();
    let err = match execute(&h.state, &generator, command).await {
        Ok(_) => panic!("draft should fail"),
        Err(e) => e,
    };
    assert!(err.to_string().contains("429"));
    assert_eq!(h.state.library().current_chapter().unwrap().content, "");
    assert_eq!(h.state.status(), AppStatus::Idle);
}

#[tokio::test]
async fn chapter_management_and_export() {
    let h = harness();
    let generator = CannedGenerator::ok("");
    run(&h, &generator, "add").await;
    run(&h, &generator, "up 2").await;
    let listing = run(&h, &generator, "chapters").await;
    let lines: Vec<&str> = listing.lines().collect();
    assert_eq!(lines[0], "Meu Primeiro Livro");
    assert!(lines[1].contains("Novo Capítulo 2"));
    assert!(lines[2].contains("Capítulo 1: O Início"));

    run(&h, &generator, "done").await;
    assert!(h.state.library().current_chapter().unwrap().is_completed);

    let reply = run(&h, &generator, "export").await;
    assert!(reply.ends_with("Meu_Primeiro_Livro.txt"));
    let exported = std::fs::read_to_string(h.state.data_dir.join("exports/Meu_Primeiro_Livro.txt")).unwrap();
    assert!(exported.starts_with("Meu Primeiro Livro\npor Autor Desconhecido\n\n### Novo Capítulo 2"));

    run(&h, &generator, "export json").await;
    let backup = h.state.data_dir.join("exports/Meu_Primeiro_Livro_backup.json");
    let reply = run(&h, &generator, &format!("import {}", backup.display())).await;
    assert!(reply.contains("imported"));
    assert_eq!(h.state.library().projects().len(), 2);
}

#[tokio::test]
async fn opening_a_project_is_remembered() {
    let h = harness();
    let generator = CannedGenerator::ok("");
    run(&h, &generator, "new A Torre").await;
    run(&h, &generator, "open 2").await;
    let settings = persistence::load_settings(&h.state.data_dir);
    assert_eq!(settings.general.current_project_id.as_deref(), Some("default-1"));

    assert_eq!(run(&h, &generator, "quit").await, "quit");
}

#[tokio::test]
async fn drafting_during_narration_keeps_narrating_status() {
    let h = harness();
    let generator = CannedGenerator::ok("Mais uma frase.");
    run(&h, &generator, "append Um. Dois.").await;
    run(&h, &generator, "read").await;
    run(&h, &generator, "draft continue").await;

    assert_eq!(h.state.narrator().state(), PlaybackState::Speaking);
    assert_eq!(h.state.status(), AppStatus::Narrating);
}

#[tokio::test]
async fn project_metadata_feeds_draft_context() {
    let h = harness();
    let generator = CannedGenerator::ok("Texto.");
    run(&h, &generator, "new A Torre").await;
    run(&h, &generator, "title A Torre Negra").await;
    run(&h, &generator, "author Ana").await;
    run(&h, &generator, "genre Fantasia").await;
    run(&h, &generator, "magic Runas antigas").await;
    run(&h, &generator, "tone Sombrio").await;

    let info = run(&h, &generator, "info").await;
    assert_eq!(
        info.lines().collect::<Vec<_>>(),
        vec!["A Torre Negra by Ana", "Genre: Fantasia", "Setting: -", "Magic system: Runas antigas", "Tone: Sombrio"]
    );

    run(&h, &generator, "draft abra a cena").await;
    let request = generator.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(request.context.genre, "Fantasia");
    assert_eq!(request.context.magic_system, "Runas antigas");

    let saved = persistence::load_projects(&h.state.data_dir);
    assert_eq!(saved[0].title, "A Torre Negra");
    assert_eq!(saved[0].tone, "Sombrio");
}

#[tokio::test]
async fn exporting_the_current_chapter() {
    let h = harness();
    let generator = CannedGenerator::ok("");
    run(&h, &generator, "append Era uma vez.").await;
    let reply = run(&h, &generator, "export chapter").await;
    assert!(reply.ends_with("Capítulo_1:_O_Início.txt"));
    let exported = std::fs::read_to_string(h.state.data_dir.join("exports/Capítulo_1:_O_Início.txt")).unwrap();
    assert_eq!(exported, "Capítulo 1: O Início\n\nEra uma vez.");
}

#[tokio::test]
async fn removing_the_open_project_stops_narration() {
    let h = harness();
    let generator = CannedGenerator::ok("");
    run(&h, &generator, "new A Torre").await;
    run(&h, &generator, "append Um. Dois.").await;
    run(&h, &generator, "read").await;

    let reply = run(&h, &generator, "remove 1").await;
    assert_eq!(reply, "Deleted 'A Torre'");
    assert_eq!(h.state.narrator().state(), PlaybackState::Idle);
    assert!(h.state.library().current_project().is_none());

    let saved = persistence::load_projects(&h.state.data_dir);
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].id, "default-1");
    assert!(persistence::load_settings(&h.state.data_dir).general.current_project_id.is_none());
}
