pub mod commands;
pub mod draft;
pub mod engine;
pub mod library;
pub mod narration;
pub mod persistence;
pub mod state;

use std::sync::Arc;
use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use commands::{Command, Reply};
use draft::GeminiClient;
use engine::process::{default_program, ProcessEngine};
use library::Library;
use narration::{NarrationController, PlaybackState};
use state::{AppState, AppStatus};

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "livroguia=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Open the remembered project, or the first one in the library
fn restore_selection(library: &mut Library, remembered: Option<&str>) {
    if let Some(id) = remembered {
        match library.open_project(id) {
            Ok(()) => return,
            Err(e) => tracing::warn!("Previously open project unavailable: {}", e),
        }
    }
    let first = library.projects().first().map(|p| p.id.clone());
    if let Some(id) = first {
        let _ = library.open_project(&id);
    }
}

/// Feed engine callbacks into the controller
fn spawn_event_pump(state: Arc<AppState>, mut events: mpsc::UnboundedReceiver<engine::EngineEvent>) {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            state.narrator().handle_event(event);
        }
        tracing::debug!("Narration event channel closed");
    });
}

/// Log narration state changes and settle the app status when narration ends
fn spawn_state_watcher(state: Arc<AppState>) {
    let mut updates = state.narrator().subscribe();
    tokio::spawn(async move {
        let mut last = PlaybackState::Idle;
        while updates.changed().await.is_ok() {
            let snapshot = *updates.borrow_and_update();
            if snapshot.state != last {
                tracing::info!(
                    state = ?snapshot.state,
                    cursor = snapshot.cursor,
                    chunks = snapshot.chunk_count,
                    rate = %snapshot.rate,
                    "Narration state changed"
                );
                last = snapshot.state;
            }
            if snapshot.state == PlaybackState::Idle && state.status() == AppStatus::Narrating {
                state.set_status(AppStatus::Idle);
            }
        }
    });
}

pub async fn run() -> Result<()> {
    init_logging();

    tracing::info!("Starting LivroGuia v{}", env!("CARGO_PKG_VERSION"));

    let data_dir = persistence::data_dir()?;
    let settings = persistence::load_settings(&data_dir);
    let mut library = Library::new(persistence::load_projects(&data_dir));
    restore_selection(&mut library, settings.general.current_project_id.as_deref());
    tracing::info!("Loaded {} projects from {}", library.projects().len(), data_dir.display());

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let program = settings
        .narration
        .command
        .clone()
        .unwrap_or_else(|| default_program().to_string());
    let engine = ProcessEngine::new(program, events_tx);
    let narrator = NarrationController::new(Box::new(engine), settings.narration.voice_profile())
        .with_rate(settings.narration.initial_rate());
    let generator = GeminiClient::from_env(&settings.draft);

    let state = Arc::new(AppState::new(settings, library, narrator, data_dir));
    spawn_event_pump(state.clone(), events_rx);
    spawn_state_watcher(state.clone());

    println!("{}", commands::HELP);
    if !generator.is_configured() {
        println!("Drafting is disabled until GEMINI_API_KEY is set");
    }
    if let Ok(summary) = commands::library::word_counts(&state) {
        println!("{}", summary);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(message) => {
                if !message.is_empty() {
                    println!("{}", message);
                }
                continue;
            }
        };

        match commands::execute(&state, &generator, command).await {
            Ok(Reply::Message(message)) => println!("{}", message),
            Ok(Reply::Quit) => break,
            Err(e) => {
                tracing::warn!("Command failed: {:#}", e);
                println!("Error: {:#}", e);
            }
        }
    }

    state.narrator().cancel();
    persistence::save_projects(&state.data_dir, state.library().projects());
    persistence::save_settings(&state.data_dir, &state.settings());
    tracing::info!("Goodbye");
    Ok(())
}
