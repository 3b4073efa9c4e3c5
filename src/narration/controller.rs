use serde::{Serialize, Deserialize};
use tokio::sync::watch;

use super::chunk::{is_blank, split_into_chunks};
use super::rate::Rate;
use crate::engine::{
    select_voice, EngineEvent, NarrationEngine, Utterance, UtteranceId, UtteranceOutcome,
    VoiceProfile,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Idle,
    Speaking,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipDirection {
    Prev,
    Next,
}

/// Observable narration state pushed to subscribers after every change
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NarrationSnapshot {
    pub state: PlaybackState,
    /// True while a narration is active, paused or not
    pub is_speaking: bool,
    pub is_paused: bool,
    pub rate: Rate,
    pub cursor: usize,
    pub chunk_count: usize,
}

/// Plays a queue of text chunks through a [`NarrationEngine`], one utterance
/// at a time.
///
/// The controller never blocks on the engine. Completion and error callbacks
/// arrive through [`NarrationController::handle_event`]; only the event for the
/// utterance currently in flight moves the cursor, everything else is stale.
pub struct NarrationController {
    engine: Box<dyn NarrationEngine>,
    voice: VoiceProfile,
    queue: Vec<String>,
    cursor: usize,
    state: PlaybackState,
    rate: Rate,
    in_flight: Option<UtteranceId>,
    next_id: u64,
    observers: watch::Sender<NarrationSnapshot>,
}

impl NarrationController {
    pub fn new(engine: Box<dyn NarrationEngine>, voice: VoiceProfile) -> Self {
        let (observers, _) = watch::channel(NarrationSnapshot {
            state: PlaybackState::Idle,
            is_speaking: false,
            is_paused: false,
            rate: Rate::default(),
            cursor: 0,
            chunk_count: 0,
        });
        Self {
            engine,
            voice,
            queue: Vec::new(),
            cursor: 0,
            state: PlaybackState::Idle,
            rate: Rate::default(),
            in_flight: None,
            next_id: 0,
            observers,
        }
    }

    /// Start the session at `rate` instead of 1.0
    pub fn with_rate(mut self, rate: Rate) -> Self {
        self.rate = rate;
        self.publish();
        self
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn rate(&self) -> Rate {
        self.rate
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn queue(&self) -> &[String] {
        &self.queue
    }

    pub fn voice_profile(&self) -> &VoiceProfile {
        &self.voice
    }

    pub fn set_voice_profile(&mut self, voice: VoiceProfile) {
        self.voice = voice;
    }

    pub fn voices(&self) -> Vec<crate::engine::Voice> {
        self.engine.voices()
    }

    pub fn snapshot(&self) -> NarrationSnapshot {
        NarrationSnapshot {
            state: self.state,
            is_speaking: self.state != PlaybackState::Idle,
            is_paused: self.state == PlaybackState::Paused,
            rate: self.rate,
            cursor: self.cursor,
            chunk_count: self.queue.len(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<NarrationSnapshot> {
        self.observers.subscribe()
    }

    /// Narrate `text` from its first chunk, replacing any narration in progress.
    /// Blank text is ignored.
    pub fn speak(&mut self, text: &str) {
        if text.trim().is_empty() {
            tracing::debug!("Ignoring speak request with blank text");
            return;
        }

        self.cancel();
        self.queue = split_into_chunks(text);
        self.cursor = 0;
        self.state = PlaybackState::Speaking;
        tracing::info!("Narration started: {} chunks at {}", self.queue.len(), self.rate);
        self.dispatch_current();
    }

    pub fn toggle_pause(&mut self) {
        match self.state {
            PlaybackState::Speaking => {
                self.engine.pause();
                self.state = PlaybackState::Paused;
                tracing::info!("Narration paused at chunk {}", self.cursor);
                self.publish();
            }
            PlaybackState::Paused => {
                self.state = PlaybackState::Speaking;
                tracing::info!("Narration resumed at chunk {}", self.cursor);
                if self.in_flight.is_some() {
                    self.engine.resume();
                    self.publish();
                } else {
                    // The paused utterance already ended, continue with the next one
                    self.dispatch_current();
                }
            }
            PlaybackState::Idle => {}
        }
    }

    /// Move one chunk back or forward, staying within the queue, and replay from
    /// there if a narration is active.
    pub fn skip(&mut self, direction: SkipDirection) {
        self.stop_in_flight();

        match direction {
            SkipDirection::Next => {
                if self.cursor + 1 < self.queue.len() {
                    self.cursor += 1;
                }
            }
            SkipDirection::Prev => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                }
            }
        }
        tracing::debug!("Skipped {:?} to chunk {}", direction, self.cursor);

        if self.state != PlaybackState::Idle {
            self.state = PlaybackState::Speaking;
            self.dispatch_current();
        } else {
            self.publish();
        }
    }

    /// Advance to the next supported speed. An utterance playing unpaused is
    /// restarted at the new speed; the rest of the queue is untouched.
    pub fn cycle_rate(&mut self) {
        self.rate = self.rate.next();
        tracing::info!("Narration rate set to {}", self.rate);

        if self.state == PlaybackState::Speaking && self.in_flight.is_some() {
            self.stop_in_flight();
            self.dispatch_current();
        } else {
            self.publish();
        }
    }

    /// Stop narrating and discard the queue. Returns to `Idle` immediately.
    pub fn cancel(&mut self) {
        self.stop_in_flight();
        self.engine.cancel();
        if self.state != PlaybackState::Idle {
            tracing::info!("Narration cancelled");
        }
        self.queue.clear();
        self.cursor = 0;
        self.state = PlaybackState::Idle;
        self.publish();
    }

    /// Feed a completion or error callback from the engine
    pub fn handle_event(&mut self, event: EngineEvent) {
        if self.in_flight != Some(event.id) {
            tracing::debug!("Discarding stale event for utterance {}", event.id);
            return;
        }
        self.in_flight = None;

        if let UtteranceOutcome::Failed(ref reason) = event.outcome {
            tracing::error!("Narration of chunk {} failed: {}", self.cursor, reason);
        }
        self.cursor += 1;

        match self.state {
            PlaybackState::Speaking => self.dispatch_current(),
            PlaybackState::Paused if self.cursor >= self.queue.len() => self.finish(),
            _ => self.publish(),
        }
    }

    /// Clear the in-flight id before stopping so a late callback for it is stale
    fn stop_in_flight(&mut self) {
        if self.in_flight.take().is_some() {
            self.engine.cancel();
        }
    }

    fn finish(&mut self) {
        self.state = PlaybackState::Idle;
        self.in_flight = None;
        tracing::info!("Narration finished");
        self.publish();
    }

    /// Send the first non-blank chunk at or after the cursor, or finish
    fn dispatch_current(&mut self) {
        loop {
            let Some(chunk) = self.queue.get(self.cursor) else {
                self.finish();
                return;
            };
            if is_blank(chunk) {
                self.cursor += 1;
                continue;
            }

            self.next_id += 1;
            let id = UtteranceId(self.next_id);
            let utterance = Utterance {
                id,
                text: chunk.clone(),
                rate: self.rate.value(),
                pitch: self.voice.pitch,
                voice: select_voice(&self.engine.voices(), &self.voice),
                language: self.voice.language.clone(),
            };

            self.in_flight = Some(id);
            match self.engine.speak(utterance) {
                Ok(()) => {
                    self.publish();
                    return;
                }
                Err(e) => {
                    tracing::error!("Failed to dispatch chunk {}: {}", self.cursor, e);
                    self.in_flight = None;
                    self.cursor += 1;
                }
            }
        }
    }

    fn publish(&self) {
        self.observers.send_replace(self.snapshot());
    }
}

impl Drop for NarrationController {
    fn drop(&mut self) {
        self.engine.cancel();
    }
}
