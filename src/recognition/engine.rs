//! Recognition engine abstraction
//!
//! [`RecognitionEngine`] is the capability seam over whatever actually turns
//! audio into text. `start`/`stop` are intentionally fallible in the two ways
//! native recognizers are: starting twice and stopping something that never
//! ran. The manager reconciles both instead of surfacing them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::audio::{AudioCapture, SAMPLE_RATE, samples_to_wav};
use crate::recognition::{SpeechSegmenter, SttClient};
use crate::Error;

/// How often the capture buffer is drained into the segmenter
const CAPTURE_POLL_MS: u64 = 100;

/// Events emitted by a recognition engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// The session is live and audio is flowing
    Started,
    /// The session ended (requested or spontaneous)
    Ended,
    /// A transcript was produced
    Transcript {
        text: String,
        is_final: bool,
    },
    /// The session hit an error
    Error(RecognitionErrorKind),
}

/// Classified recognition errors, mirroring the taxonomy the manager
/// handles: benign aborts, transient network failures, everything else
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionErrorKind {
    /// Expected during normal stop/restart cycles; ignored
    Aborted,
    /// Transient; the manager retries after a delay
    Network,
    /// Anything else; surfaced on the status channel
    Other(String),
}

/// Error from [`RecognitionEngine::start`]
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    /// A session is already running; the caller should reconcile to
    /// "listening" rather than treat this as a failure
    #[error("recognition already started")]
    AlreadyStarted,
    /// The engine could not start
    #[error("recognition start failed: {0}")]
    Failed(String),
}

/// Error from [`RecognitionEngine::stop`]
#[derive(Debug, thiserror::Error)]
pub enum StopError {
    /// No session is running; the caller should reconcile to "idle"
    #[error("recognition not started")]
    NotStarted,
    /// The engine could not stop cleanly
    #[error("recognition stop failed: {0}")]
    Failed(String),
}

/// A continuous speech recognition backend
#[async_trait]
pub trait RecognitionEngine: Send + Sync {
    /// Whether recognition can run at all on this machine
    fn available(&self) -> bool {
        true
    }

    /// Begin a recognition session. Events flow on the channel the engine
    /// was constructed with.
    ///
    /// # Errors
    ///
    /// `AlreadyStarted` if a session is live, `Failed` otherwise.
    async fn start(&self) -> Result<(), StartError>;

    /// End the current recognition session.
    ///
    /// # Errors
    ///
    /// `NotStarted` if no session is live, `Failed` otherwise.
    async fn stop(&self) -> Result<(), StopError>;
}

struct EngineRun {
    stop: Arc<AtomicBool>,
}

/// Microphone-backed recognition: drains capture into the segmenter and
/// transcribes completed utterances over HTTP.
pub struct MicEngine {
    stt: Arc<SttClient>,
    events: mpsc::UnboundedSender<RecognitionEvent>,
    running: Mutex<Option<EngineRun>>,
}

impl MicEngine {
    /// Create a microphone engine emitting events on `events`
    #[must_use]
    pub fn new(stt: SttClient, events: mpsc::UnboundedSender<RecognitionEvent>) -> Self {
        Self {
            stt: Arc::new(stt),
            events,
            running: Mutex::new(None),
        }
    }
}

#[async_trait]
impl RecognitionEngine for MicEngine {
    fn available(&self) -> bool {
        crate::audio::input_available()
    }

    async fn start(&self) -> Result<(), StartError> {
        let mut running = self.running.lock().expect("engine lock poisoned");
        if running.is_some() {
            return Err(StartError::AlreadyStarted);
        }

        let stop = Arc::new(AtomicBool::new(false));
        let (segment_tx, mut segment_rx) = mpsc::unbounded_channel::<Vec<f32>>();

        // The capture thread owns the (non-Send) audio stream; it drains
        // samples into the segmenter and ships completed segments out.
        let thread_stop = Arc::clone(&stop);
        let thread_events = self.events.clone();
        std::thread::spawn(move || {
            let mut capture = AudioCapture::new();
            if let Err(e) = capture.start() {
                let _ = thread_events.send(RecognitionEvent::Error(
                    RecognitionErrorKind::Other(e.to_string()),
                ));
                let _ = thread_events.send(RecognitionEvent::Ended);
                return;
            }

            let _ = thread_events.send(RecognitionEvent::Started);
            let mut segmenter = SpeechSegmenter::new();

            while !thread_stop.load(Ordering::SeqCst) {
                std::thread::sleep(std::time::Duration::from_millis(CAPTURE_POLL_MS));
                let samples = capture.drain();
                if let Some(segment) = segmenter.push(&samples) {
                    if segment_tx.send(segment).is_err() {
                        break;
                    }
                }
            }

            capture.stop();
            // Dropping segment_tx ends the transcription pump, which emits Ended
        });

        // Transcription pump: forwards finished segments to STT
        let stt = Arc::clone(&self.stt);
        let events = self.events.clone();
        tokio::spawn(async move {
            while let Some(segment) = segment_rx.recv().await {
                let wav = match samples_to_wav(&segment, SAMPLE_RATE) {
                    Ok(wav) => wav,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to encode segment");
                        continue;
                    }
                };

                match stt.transcribe(wav).await {
                    Ok(text) if !text.trim().is_empty() => {
                        let _ = events.send(RecognitionEvent::Transcript {
                            text,
                            is_final: true,
                        });
                    }
                    Ok(_) => {}
                    Err(e) => {
                        let _ = events.send(RecognitionEvent::Error(classify_error(&e)));
                    }
                }
            }
            let _ = events.send(RecognitionEvent::Ended);
        });

        *running = Some(EngineRun { stop });
        Ok(())
    }

    async fn stop(&self) -> Result<(), StopError> {
        let mut running = self.running.lock().expect("engine lock poisoned");
        match running.take() {
            None => Err(StopError::NotStarted),
            Some(run) => {
                run.stop.store(true, Ordering::SeqCst);
                Ok(())
            }
        }
    }
}

/// Map a transcription failure onto the manager's error taxonomy
fn classify_error(error: &Error) -> RecognitionErrorKind {
    match error {
        Error::Http(e) if e.is_connect() || e.is_timeout() => RecognitionErrorKind::Network,
        other => RecognitionErrorKind::Other(other.to_string()),
    }
}
