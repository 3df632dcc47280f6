//! Recognition session lifecycle management
//!
//! Drives the Idle → Starting → Listening → Stopping cycle around the
//! engine. The native recognizer stops spontaneously, throws on duplicate
//! start/stop calls, and can thrash into rapid stop/start cycles; this
//! module is the single authority that absorbs all of that.
//!
//! Coordination rules:
//! - while speech output is playing, recognition is stopped (the assistant
//!   must not transcribe itself);
//! - restarts are debounced through one pending deadline — scheduling a new
//!   restart cancels the previous one;
//! - three session endings less than a second apart trigger a cooldown
//!   before the next restart attempt.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::config::TimingConfig;
use crate::interpreter::AssistantFlags;
use crate::recognition::{
    RecognitionEngine, RecognitionErrorKind, RecognitionEvent, StartError, StopError,
};

/// Session endings closer together than this count as a rapid cycle
const RAPID_CYCLE_WINDOW: Duration = Duration::from_millis(1000);

/// Rapid cycles tolerated before forcing a cooldown
const MAX_RAPID_CYCLES: u32 = 3;

/// Retry delay after a transient network error
const NETWORK_RETRY: Duration = Duration::from_millis(3000);

/// Retry delay when a restart fires while the system is busy
/// (speaking or processing a command)
const BUSY_RETRY: Duration = Duration::from_millis(2000);

/// Retry delay after a failed start call
const START_FAILURE_RETRY: Duration = Duration::from_millis(2000);

/// Recognition session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session
    Idle,
    /// A start call is in flight; further starts are no-ops
    Starting,
    /// Session live, transcripts flowing
    Listening,
    /// A stop call is in flight; further stops are no-ops
    Stopping,
}

/// Owns the recognition session lifecycle
pub struct RecognitionManager {
    engine: Arc<dyn RecognitionEngine>,
    events: mpsc::UnboundedReceiver<RecognitionEvent>,
    transcript_tx: mpsc::UnboundedSender<String>,
    speaking_rx: watch::Receiver<bool>,
    flags: Arc<AssistantFlags>,
    state_tx: watch::Sender<SessionState>,
    status_tx: watch::Sender<Option<String>>,
    state: SessionState,
    last_event: Instant,
    rapid_cycles: u32,
    /// Single pending-restart slot; rescheduling overwrites it
    restart_at: Option<Instant>,
    restart_delay: Duration,
    cooldown_delay: Duration,
}

impl RecognitionManager {
    /// Create a manager around `engine`.
    ///
    /// `events` is the channel the engine emits on, `speaking_rx` observes
    /// the speech queue, and finalized transcripts are forwarded to
    /// `transcript_tx` lowercased and trimmed.
    #[must_use]
    pub fn new(
        engine: Arc<dyn RecognitionEngine>,
        events: mpsc::UnboundedReceiver<RecognitionEvent>,
        transcript_tx: mpsc::UnboundedSender<String>,
        speaking_rx: watch::Receiver<bool>,
        flags: Arc<AssistantFlags>,
        timing: &TimingConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Idle);
        let (status_tx, _) = watch::channel(None);

        Self {
            engine,
            events,
            transcript_tx,
            speaking_rx,
            flags,
            state_tx,
            status_tx,
            state: SessionState::Idle,
            last_event: Instant::now(),
            rapid_cycles: 0,
            restart_at: None,
            restart_delay: timing.restart_delay,
            cooldown_delay: timing.cooldown_delay,
        }
    }

    /// Watch the session state (status surface, tests)
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Watch the last surfaced recognition error
    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<Option<String>> {
        self.status_tx.subscribe()
    }

    /// Run the lifecycle loop until the engine event channel closes
    pub async fn run(mut self) {
        self.try_start().await;

        loop {
            let restart_at = self.restart_at;
            tokio::select! {
                event = self.events.recv() => {
                    let Some(event) = event else { break };
                    self.handle_event(event).await;
                }
                changed = self.speaking_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let speaking = *self.speaking_rx.borrow_and_update();
                    self.handle_speaking_change(speaking).await;
                }
                () = sleep_until_opt(restart_at), if restart_at.is_some() => {
                    self.restart_at = None;
                    self.handle_restart_due().await;
                }
            }
        }

        tracing::debug!("recognition manager stopped");
    }

    async fn handle_event(&mut self, event: RecognitionEvent) {
        match event {
            RecognitionEvent::Started => {
                self.last_event = Instant::now();
                self.set_state(SessionState::Listening);
                self.status_tx.send_replace(None);
                tracing::debug!("recognition started");

                // Speech may have begun while the start call was in flight;
                // do not listen through our own voice
                if *self.speaking_rx.borrow() {
                    tracing::debug!("speech began during start, stopping");
                    self.try_stop().await;
                }
            }
            RecognitionEvent::Ended => {
                let now = Instant::now();
                let since_last = now.duration_since(self.last_event);
                self.last_event = now;
                self.set_state(SessionState::Idle);
                tracing::debug!(gap_ms = since_last.as_millis() as u64, "recognition ended");

                if since_last < RAPID_CYCLE_WINDOW {
                    self.rapid_cycles += 1;
                    if self.rapid_cycles >= MAX_RAPID_CYCLES {
                        tracing::warn!("rapid stop/start cycling, entering cooldown");
                        self.rapid_cycles = 0;
                        self.schedule_restart(self.cooldown_delay);
                        return;
                    }
                } else {
                    self.rapid_cycles = 0;
                }

                if !self.flags.processing() && !*self.speaking_rx.borrow() {
                    self.schedule_restart(self.restart_delay);
                }
            }
            RecognitionEvent::Transcript { text, is_final } => {
                self.last_event = Instant::now();
                if is_final {
                    let normalized = text.trim().to_lowercase();
                    if !normalized.is_empty() {
                        let _ = self.transcript_tx.send(normalized);
                    }
                }
            }
            RecognitionEvent::Error(kind) => self.handle_error(kind),
        }
    }

    fn handle_error(&mut self, kind: RecognitionErrorKind) {
        match kind {
            // Expected during normal stop/restart cycles
            RecognitionErrorKind::Aborted => {
                tracing::trace!("recognition aborted");
            }
            RecognitionErrorKind::Network => {
                tracing::warn!("recognition network error, retrying");
                self.set_state(SessionState::Idle);
                self.schedule_restart(NETWORK_RETRY);
            }
            RecognitionErrorKind::Other(message) => {
                tracing::error!(error = %message, "recognition error");
                self.status_tx.send_replace(Some(message));
                self.set_state(SessionState::Idle);
            }
        }
    }

    async fn handle_speaking_change(&mut self, speaking: bool) {
        if speaking && self.state == SessionState::Listening {
            tracing::debug!("pausing recognition while speaking");
            self.try_stop().await;
        } else if !speaking && self.state == SessionState::Idle && !self.flags.processing() {
            // Delay the resume so the tail of our own audio is not captured
            self.schedule_restart(self.restart_delay);
        }
    }

    async fn handle_restart_due(&mut self) {
        if self.flags.processing() || *self.speaking_rx.borrow() {
            tracing::debug!("restart deferred, system busy");
            self.schedule_restart(BUSY_RETRY);
            return;
        }
        self.try_start().await;
    }

    async fn try_start(&mut self) {
        if !self.engine.available() {
            tracing::warn!("recognition engine unavailable");
            return;
        }
        if matches!(self.state, SessionState::Starting | SessionState::Listening) {
            tracing::trace!("already starting or listening, ignoring start");
            return;
        }

        self.set_state(SessionState::Starting);
        match self.engine.start().await {
            // Listening is confirmed by the Started event
            Ok(()) => {}
            Err(StartError::AlreadyStarted) => {
                // Reconcile with reality rather than erroring
                tracing::debug!("engine already started, reconciling state");
                self.set_state(SessionState::Listening);
            }
            Err(StartError::Failed(message)) => {
                tracing::warn!(error = %message, "recognition start failed");
                self.set_state(SessionState::Idle);
                self.schedule_restart(START_FAILURE_RETRY);
            }
        }
    }

    async fn try_stop(&mut self) {
        if self.state != SessionState::Listening {
            tracing::trace!("not listening, ignoring stop");
            return;
        }

        self.set_state(SessionState::Stopping);
        match self.engine.stop().await {
            // Idle is confirmed by the Ended event
            Ok(()) => {}
            Err(StopError::NotStarted) => {
                tracing::debug!("engine was not started, reconciling state");
                self.set_state(SessionState::Idle);
            }
            Err(StopError::Failed(message)) => {
                tracing::warn!(error = %message, "recognition stop failed");
                self.set_state(SessionState::Idle);
            }
        }
    }

    fn schedule_restart(&mut self, delay: Duration) {
        self.restart_at = Some(Instant::now() + delay);
    }

    fn set_state(&mut self, state: SessionState) {
        self.state = state;
        self.state_tx.send_replace(state);
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
