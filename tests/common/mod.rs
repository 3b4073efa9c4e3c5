#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use livroguia_lib::engine::{EngineError, EngineEvent, NarrationEngine, Utterance, UtteranceId, Voice};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCall {
    Speak(UtteranceId),
    Pause,
    Resume,
    Cancel,
}

#[derive(Default)]
pub struct EngineLog {
    pub calls: Vec<EngineCall>,
    pub spoken: Vec<Utterance>,
}

impl EngineLog {
    pub fn texts(&self) -> Vec<String> {
        self.spoken.iter().map(|u| u.text.clone()).collect()
    }

    pub fn last_id(&self) -> UtteranceId {
        self.spoken.last().expect("nothing spoken").id
    }

    pub fn count(&self, call: EngineCall) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }
}

/// Engine double that records every call; completions are simulated by the test
pub struct FakeEngine {
    log: Arc<Mutex<EngineLog>>,
    voices: Vec<Voice>,
}

impl FakeEngine {
    pub fn new() -> (Self, Arc<Mutex<EngineLog>>) {
        let log = Arc::new(Mutex::new(EngineLog::default()));
        let engine = Self {
            log: log.clone(),
            voices: vec![
                Voice { name: "Samantha".into(), language: "en-US".into() },
                Voice { name: "Luciana".into(), language: "pt-BR".into() },
            ],
        };
        (engine, log)
    }
}

impl NarrationEngine for FakeEngine {
    fn speak(&mut self, utterance: Utterance) -> Result<(), EngineError> {
        let mut log = self.log.lock().unwrap();
        log.calls.push(EngineCall::Speak(utterance.id));
        log.spoken.push(utterance);
        Ok(())
    }

    fn pause(&mut self) {
        self.log.lock().unwrap().calls.push(EngineCall::Pause);
    }

    fn resume(&mut self) {
        self.log.lock().unwrap().calls.push(EngineCall::Resume);
    }

    fn cancel(&mut self) {
        self.log.lock().unwrap().calls.push(EngineCall::Cancel);
    }

    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }
}

pub fn finish_last(log: &Arc<Mutex<EngineLog>>) -> EngineEvent {
    EngineEvent::finished(log.lock().unwrap().last_id())
}

pub fn fail_last(log: &Arc<Mutex<EngineLog>>) -> EngineEvent {
    EngineEvent::failed(log.lock().unwrap().last_id(), "synthesis-failed")
}
