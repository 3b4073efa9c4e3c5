use std::io::{Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

use super::{EngineError, EngineEvent, NarrationEngine, Utterance, Voice};

/// Words per minute at rate 1.0 for both `say` and `espeak-ng`
const BASE_WORDS_PER_MINUTE: f32 = 175.0;
const POLL_INTERVAL: Duration = Duration::from_millis(25);

pub type CancelFlag = Arc<AtomicBool>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechCommandKind {
    /// macOS `say`
    Say,
    /// `espeak-ng` / `espeak`
    Espeak,
}

impl SpeechCommandKind {
    pub fn detect(program: &str) -> Self {
        let file_name = std::path::Path::new(program)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(program);
        if file_name == "say" {
            Self::Say
        } else {
            Self::Espeak
        }
    }
}

pub fn default_program() -> &'static str {
    if cfg!(target_os = "macos") {
        "say"
    } else {
        "espeak-ng"
    }
}

struct ActiveUtterance {
    child: Arc<Mutex<Child>>,
    cancelled: CancelFlag,
    paused: bool,
}

/// Narration engine backed by an OS speech command, one child process per utterance
pub struct ProcessEngine {
    program: String,
    kind: SpeechCommandKind,
    events: UnboundedSender<EngineEvent>,
    active: Option<ActiveUtterance>,
    voices: OnceLock<Vec<Voice>>,
}

impl ProcessEngine {
    pub fn new(program: impl Into<String>, events: UnboundedSender<EngineEvent>) -> Self {
        let program = program.into();
        let kind = SpeechCommandKind::detect(&program);
        Self {
            program,
            kind,
            events,
            active: None,
            voices: OnceLock::new(),
        }
    }

    fn build_command(&self, utterance: &Utterance) -> Command {
        let mut cmd = Command::new(&self.program);
        let wpm = (BASE_WORDS_PER_MINUTE * utterance.rate).round() as u32;
        match self.kind {
            SpeechCommandKind::Say => {
                cmd.arg("-r").arg(wpm.to_string());
                if let Some(ref voice) = utterance.voice {
                    cmd.arg("-v").arg(&voice.name);
                }
                cmd.arg("-f").arg("-");
            }
            SpeechCommandKind::Espeak => {
                let pitch = (utterance.pitch * 50.0).clamp(0.0, 99.0).round() as u32;
                cmd.arg("-s").arg(wpm.to_string());
                cmd.arg("-p").arg(pitch.to_string());
                match utterance.voice {
                    Some(ref voice) => cmd.arg("-v").arg(&voice.name),
                    None => cmd.arg("-v").arg(utterance.language.to_ascii_lowercase()),
                };
                cmd.arg("--stdin");
            }
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd
    }

    fn load_voices(&self) -> Vec<Voice> {
        let arg: &[&str] = match self.kind {
            SpeechCommandKind::Say => &["-v", "?"],
            SpeechCommandKind::Espeak => &["--voices"],
        };
        match Command::new(&self.program).args(arg).output() {
            Ok(output) if output.status.success() => {
                let listing = String::from_utf8_lossy(&output.stdout);
                let voices = match self.kind {
                    SpeechCommandKind::Say => parse_say_voices(&listing),
                    SpeechCommandKind::Espeak => parse_espeak_voices(&listing),
                };
                tracing::info!("Loaded {} voices from {}", voices.len(), self.program);
                voices
            }
            Ok(output) => {
                tracing::warn!("Voice listing from {} failed: {}", self.program, output.status);
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("Failed to list voices with {}: {}", self.program, e);
                Vec::new()
            }
        }
    }

    fn signal_active(&mut self, pause: bool) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if active.paused == pause {
            return;
        }
        let pid = match active.child.lock() {
            Ok(child) => child.id(),
            Err(_) => return,
        };
        if send_stop_signal(pid, pause) {
            active.paused = pause;
        }
    }
}

#[cfg(unix)]
fn send_stop_signal(pid: u32, pause: bool) -> bool {
    let signal = if pause { libc::SIGSTOP } else { libc::SIGCONT };
    let rc = unsafe { libc::kill(pid as libc::pid_t, signal) };
    if rc != 0 {
        tracing::warn!("Failed to signal speech process {}: {}", pid, std::io::Error::last_os_error());
        return false;
    }
    true
}

#[cfg(not(unix))]
fn send_stop_signal(_pid: u32, _pause: bool) -> bool {
    tracing::warn!("Pausing speech processes is not supported on this platform");
    false
}

/// Feed the text to the speech process, then wait for it to exit.
///
/// The write blocks for as long as the command takes to consume its input,
/// so it must never run under the controller's lock.
fn watch_child(
    child: Arc<Mutex<Child>>,
    stdin: Option<ChildStdin>,
    text: String,
    cancelled: CancelFlag,
    id: super::UtteranceId,
    events: UnboundedSender<EngineEvent>,
) {
    if let Some(mut stdin) = stdin {
        if let Err(e) = stdin.write_all(text.as_bytes()) {
            // A killed process closes its end of the pipe
            if !cancelled.load(Ordering::SeqCst) {
                tracing::warn!("Failed to send text to speech process: {}", e);
                if let Ok(mut child) = child.lock() {
                    let _ = child.kill();
                }
            }
        }
        // Dropping stdin signals end of input
    }

    let event = loop {
        let status = match child.lock() {
            Ok(mut guard) => guard.try_wait(),
            Err(_) => break EngineEvent::failed(id, "speech process handle poisoned"),
        };
        match status {
            Ok(Some(status)) if status.success() => break EngineEvent::finished(id),
            Ok(Some(_)) if cancelled.load(Ordering::SeqCst) => break EngineEvent::failed(id, "cancelled"),
            Ok(Some(status)) => {
                let mut stderr = String::new();
                let pipe = child.lock().ok().and_then(|mut guard| guard.stderr.take());
                if let Some(mut pipe) = pipe {
                    let _ = pipe.read_to_string(&mut stderr);
                }
                break EngineEvent::failed(id, format!("speech process exited with {}: {}", status, stderr.trim()));
            }
            Ok(None) => std::thread::sleep(POLL_INTERVAL),
            Err(e) => break EngineEvent::failed(id, format!("failed to wait on speech process: {}", e)),
        }
    };

    if cancelled.load(Ordering::SeqCst) {
        tracing::debug!("Utterance {} cancelled, dropping completion", id);
        return;
    }
    if events.send(event).is_err() {
        tracing::debug!("Narration event receiver closed");
    }
}

impl NarrationEngine for ProcessEngine {
    fn speak(&mut self, utterance: Utterance) -> Result<(), EngineError> {
        if self.active.is_some() {
            self.cancel();
        }

        let mut child = self
            .build_command(&utterance)
            .spawn()
            .map_err(|e| EngineError::Unavailable(format!("{}: {}", self.program, e)))?;
        let stdin = child.stdin.take();

        tracing::debug!(
            "Speaking utterance {} ({} chars, rate {}, voice {:?})",
            utterance.id,
            utterance.text.len(),
            utterance.rate,
            utterance.voice.as_ref().map(|v| v.name.as_str())
        );

        let child = Arc::new(Mutex::new(child));
        let cancelled: CancelFlag = Arc::new(AtomicBool::new(false));
        let spawned = {
            let child = child.clone();
            let cancelled = cancelled.clone();
            let events = self.events.clone();
            let id = utterance.id;
            let text = utterance.text;
            std::thread::Builder::new()
                .name(format!("speech-{}", id.0))
                .spawn(move || watch_child(child, stdin, text, cancelled, id, events))
        };
        if let Err(e) = spawned {
            if let Ok(mut child) = child.lock() {
                let _ = child.kill();
                let _ = child.wait();
            }
            return Err(EngineError::Dispatch(e.to_string()));
        }

        self.active = Some(ActiveUtterance {
            child,
            cancelled,
            paused: false,
        });
        Ok(())
    }

    fn pause(&mut self) {
        self.signal_active(true);
    }

    fn resume(&mut self) {
        self.signal_active(false);
    }

    fn cancel(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancelled.store(true, Ordering::SeqCst);
            if let Ok(mut child) = active.child.lock() {
                // A stopped process still dies on SIGKILL
                if let Err(e) = child.kill() {
                    tracing::debug!("Speech process already gone: {}", e);
                }
            }
        }
    }

    fn voices(&self) -> Vec<Voice> {
        self.voices.get_or_init(|| self.load_voices()).clone()
    }
}

impl Drop for ProcessEngine {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Parse `say -v ?` output: `Name   lang_CODE   # sample sentence`
pub fn parse_say_voices(listing: &str) -> Vec<Voice> {
    listing
        .lines()
        .filter_map(|line| {
            let head = line.split('#').next()?.trim();
            let (name, language) = head.rsplit_once(char::is_whitespace)?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(Voice {
                name: name.to_string(),
                language: language.to_string(),
            })
        })
        .collect()
}

/// Parse `espeak-ng --voices` output (header line, then
/// `Pty Language Age/Gender VoiceName File Other`)
pub fn parse_espeak_voices(listing: &str) -> Vec<Voice> {
    listing
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let _priority = cols.next()?;
            let language = cols.next()?;
            let _gender = cols.next()?;
            let name = cols.next()?;
            Some(Voice {
                name: name.to_string(),
                language: language.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{UtteranceId, UtteranceOutcome};

    #[test]
    fn detects_command_kind() {
        assert_eq!(SpeechCommandKind::detect("say"), SpeechCommandKind::Say);
        assert_eq!(SpeechCommandKind::detect("/usr/bin/say"), SpeechCommandKind::Say);
        assert_eq!(SpeechCommandKind::detect("espeak-ng"), SpeechCommandKind::Espeak);
        assert_eq!(SpeechCommandKind::detect("/usr/local/bin/espeak"), SpeechCommandKind::Espeak);
    }

    #[test]
    fn parses_say_listing() {
        let listing = "\
Alex                en_US    # Most people recognize me by my voice.
Luciana             pt_BR    # Olá, meu nome é Luciana e eu sou uma voz portuguesa do Brasil.
Eddy (Portuguese (Brazil)) pt_BR    # Olá! Meu nome é Eddy.
";
        let voices = parse_say_voices(listing);
        assert_eq!(voices.len(), 3);
        assert_eq!(voices[1], Voice { name: "Luciana".into(), language: "pt_BR".into() });
        assert_eq!(voices[2].name, "Eddy (Portuguese (Brazil))");
        assert_eq!(voices[2].language, "pt_BR");
    }

    #[test]
    fn parses_espeak_listing() {
        let listing = "\
Pty Language       Age/Gender VoiceName          File                 Other Languages
 5  pt             --/M       Portuguese_(Portugal) roa/pt               (pt-pt 5)
 5  pt-BR          --/M       Portuguese_(Brazil) roa/pt-BR
";
        let voices = parse_espeak_voices(listing);
        assert_eq!(voices.len(), 2);
        assert_eq!(voices[1].name, "Portuguese_(Brazil)");
        assert_eq!(voices[1].language, "pt-BR");
    }

    /// `sh -s` runs its stdin as a script, so each utterance text scripts the
    /// speech process it is fed to
    #[cfg(unix)]
    fn shell_engine() -> (ProcessEngine, tokio::sync::mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (ProcessEngine::new("/bin/sh", tx), rx)
    }

    fn scripted(id: u64, script: &str) -> Utterance {
        Utterance {
            id: UtteranceId(id),
            text: script.into(),
            rate: 1.0,
            pitch: 1.0,
            voice: None,
            language: "pt-BR".into(),
        }
    }

    async fn next_event(rx: &mut tokio::sync::mpsc::UnboundedReceiver<EngineEvent>, wait: Duration) -> Option<EngineEvent> {
        tokio::time::timeout(wait, rx.recv()).await.ok().flatten()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn reports_exit_status_of_each_utterance() {
        let (mut engine, mut rx) = shell_engine();

        engine.speak(scripted(1, "exit 0\n")).unwrap();
        let event = next_event(&mut rx, Duration::from_secs(5)).await.unwrap();
        assert_eq!(event, EngineEvent::finished(UtteranceId(1)));

        engine.speak(scripted(2, "echo no voice >&2\nexit 3\n")).unwrap();
        let event = next_event(&mut rx, Duration::from_secs(5)).await.unwrap();
        assert_eq!(event.id, UtteranceId(2));
        match event.outcome {
            UtteranceOutcome::Failed(reason) => {
                assert!(reason.contains("exit status: 3"), "{}", reason);
                assert!(reason.ends_with("no voice"), "{}", reason);
            }
            other => panic!("expected a failure, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cancelled_utterance_stays_silent() {
        let (mut engine, mut rx) = shell_engine();

        engine.speak(scripted(1, "sleep 5\n")).unwrap();
        engine.pause();
        engine.cancel();
        assert!(engine.active.is_none());
        assert_eq!(next_event(&mut rx, Duration::from_millis(1500)).await, None);

        // Replacing an utterance drops the old one the same way
        engine.speak(scripted(2, "sleep 5\n")).unwrap();
        engine.speak(scripted(3, "exit 0\n")).unwrap();
        let event = next_event(&mut rx, Duration::from_secs(5)).await.unwrap();
        assert_eq!(event, EngineEvent::finished(UtteranceId(3)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn paused_process_finishes_only_after_resume() {
        let (mut engine, mut rx) = shell_engine();

        engine.speak(scripted(1, "sleep 1\nexit 0\n")).unwrap();
        engine.pause();
        assert!(engine.active.as_ref().is_some_and(|a| a.paused));
        assert_eq!(next_event(&mut rx, Duration::from_millis(1500)).await, None);

        engine.resume();
        assert!(engine.active.as_ref().is_some_and(|a| !a.paused));
        let event = next_event(&mut rx, Duration::from_secs(5)).await.unwrap();
        assert_eq!(event, EngineEvent::finished(UtteranceId(1)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn long_text_does_not_block_speak() {
        let (mut engine, mut rx) = shell_engine();
        // Far beyond a pipe buffer, and never read while the process is stopped
        let mut script = String::from("sleep 5\n");
        script.push_str(&"# filler line for the speech process\n".repeat(20_000));

        let started = std::time::Instant::now();
        engine.speak(scripted(1, &script)).unwrap();
        engine.pause();
        engine.cancel();
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(next_event(&mut rx, Duration::from_millis(500)).await, None);
    }

    #[test]
    fn espeak_arguments_carry_rate_pitch_and_language() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let engine = ProcessEngine::new("espeak-ng", tx);
        let utterance = Utterance {
            id: UtteranceId(1),
            text: "Olá.".into(),
            rate: 2.0,
            pitch: 1.0,
            voice: None,
            language: "pt-BR".into(),
        };
        let cmd = engine.build_command(&utterance);
        let args: Vec<String> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, vec!["-s", "350", "-p", "50", "-v", "pt-br", "--stdin"]);
    }
}
