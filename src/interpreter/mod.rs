//! Wake-word and command interpretation
//!
//! Transcripts only become actions here. The interpreter tracks two flags:
//! `wake_active` gates whether transcripts are treated as commands at all,
//! and `processing` blocks concurrent dispatch and recognition restarts
//! while a command is being confirmed and executed.

mod intent;
pub(crate) mod phonetic;

pub use intent::{Intent, Page, classify, is_self_speech, is_wake_phrase};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::TimingConfig;
use crate::speech::SpeechQueue;

/// Spoken acknowledgement when command mode is entered
pub const LISTENING_ACK: &str = "I'm listening for your command";

/// Spoken feedback when no intent matched
const NOT_UNDERSTOOD: &str = "I didn't understand that command. Please try again.";

/// Delay before command-mode flags reset after deactivation or a miss
const RESET_DELAY: Duration = Duration::from_millis(1500);

/// Shared interpreter state observed by the recognition manager
#[derive(Debug, Default)]
pub struct AssistantFlags {
    wake_active: AtomicBool,
    processing: AtomicBool,
}

impl AssistantFlags {
    /// Whether command mode is active
    pub fn wake_active(&self) -> bool {
        self.wake_active.load(Ordering::SeqCst)
    }

    pub fn set_wake_active(&self, value: bool) {
        self.wake_active.store(value, Ordering::SeqCst);
    }

    /// Whether a command is currently being dispatched; blocks recognition
    /// restarts and concurrent dispatch
    pub fn processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    pub fn set_processing(&self, value: bool) {
        self.processing.store(value, Ordering::SeqCst);
    }
}

/// Interprets finalized transcripts into navigation and mode changes
pub struct Interpreter {
    speech: SpeechQueue,
    nav_tx: mpsc::UnboundedSender<Page>,
    flags: Arc<AssistantFlags>,
    navigation_delay: Duration,
    safety_timeout: Duration,
    /// Single-slot delayed tasks; scheduling a new one aborts the old
    nav_task: Option<JoinHandle<()>>,
    reset_task: Option<JoinHandle<()>>,
    safety_task: Option<JoinHandle<()>>,
}

impl Interpreter {
    #[must_use]
    pub fn new(
        speech: SpeechQueue,
        nav_tx: mpsc::UnboundedSender<Page>,
        flags: Arc<AssistantFlags>,
        timing: &TimingConfig,
    ) -> Self {
        Self {
            speech,
            nav_tx,
            flags,
            navigation_delay: timing.navigation_delay,
            safety_timeout: timing.safety_timeout,
            nav_task: None,
            reset_task: None,
            safety_task: None,
        }
    }

    /// Enter command mode without a wake phrase (the manual control)
    pub fn activate(&self) {
        self.flags.set_wake_active(true);
        self.speech.speak(LISTENING_ACK, true);
        tracing::info!("command mode activated manually");
    }

    /// Consume transcripts and manual activation requests until the
    /// transcript channel closes. A closed activation channel only means
    /// no manual trigger is wired; transcripts keep flowing.
    pub async fn run(
        mut self,
        mut transcripts: mpsc::UnboundedReceiver<String>,
        mut activations: mpsc::UnboundedReceiver<()>,
    ) {
        let mut activations_open = true;
        loop {
            tokio::select! {
                transcript = transcripts.recv() => {
                    let Some(transcript) = transcript else { break };
                    self.handle_transcript(&transcript);
                }
                activation = activations.recv(), if activations_open => {
                    match activation {
                        Some(()) => self.activate(),
                        None => activations_open = false,
                    }
                }
            }
        }
        tracing::debug!("interpreter stopped");
    }

    /// Process one finalized transcript
    pub fn handle_transcript(&mut self, raw: &str) {
        let transcript = raw.trim().to_lowercase();
        if transcript.is_empty() {
            return;
        }

        tracing::debug!(transcript = %transcript, "processing transcript");

        if is_self_speech(&transcript) {
            tracing::debug!("ignoring own speech echo");
            return;
        }

        if !self.flags.wake_active() {
            if is_wake_phrase(&transcript) {
                tracing::info!("wake phrase detected");
                self.flags.set_wake_active(true);
                self.speech.speak(LISTENING_ACK, true);
            }
            // No wake phrase, no command mode: nothing to do
            return;
        }

        self.flags.set_processing(true);
        self.arm_safety_timer();

        match classify(&transcript) {
            Some(Intent::Deactivate) => {
                tracing::info!("deactivating voice assistant");
                self.speech.speak(Intent::Deactivate.confirmation(), true);

                let flags = Arc::clone(&self.flags);
                self.replace_reset_task(tokio::spawn(async move {
                    tokio::time::sleep(RESET_DELAY).await;
                    flags.set_wake_active(false);
                    flags.set_processing(false);
                }));
            }
            Some(intent) => {
                // Deactivate is handled above; every remaining intent
                // navigates somewhere
                let Some(page) = intent.page() else {
                    self.flags.set_processing(false);
                    return;
                };
                tracing::info!(?intent, path = page.path(), "command recognized");
                self.speech.speak(intent.confirmation(), true);

                // Let the confirmation be heard before the mode changes
                let flags = Arc::clone(&self.flags);
                let nav_tx = self.nav_tx.clone();
                let delay = self.navigation_delay;
                self.replace_nav_task(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = nav_tx.send(page);
                    flags.set_processing(false);
                    // Command mode stays armed for the next command
                }));
            }
            None => {
                tracing::debug!(transcript = %transcript, "command not recognized");
                self.speech.speak(NOT_UNDERSTOOD, true);

                let flags = Arc::clone(&self.flags);
                self.replace_reset_task(tokio::spawn(async move {
                    tokio::time::sleep(RESET_DELAY).await;
                    // Keep command mode active for a retry
                    flags.set_processing(false);
                }));
            }
        }
    }

    /// Forcibly clears the processing flag if dispatch logic failed to,
    /// so a dropped task can never deadlock recognition restarts
    fn arm_safety_timer(&mut self) {
        if let Some(task) = self.safety_task.take() {
            task.abort();
        }

        let flags = Arc::clone(&self.flags);
        let timeout = self.safety_timeout;
        self.safety_task = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if flags.processing() {
                tracing::warn!("safety timeout: clearing stuck processing state");
                flags.set_processing(false);
            }
        }));
    }

    fn replace_nav_task(&mut self, task: JoinHandle<()>) {
        if let Some(old) = self.nav_task.take() {
            old.abort();
        }
        self.nav_task = Some(task);
    }

    fn replace_reset_task(&mut self, task: JoinHandle<()>) {
        if let Some(old) = self.reset_task.take() {
            old.abort();
        }
        self.reset_task = Some(task);
    }
}
