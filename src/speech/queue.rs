//! Speech output queue
//!
//! Serializes text-to-speech requests: one utterance at a time, strict FIFO,
//! a short gap between utterances, and time-windowed suppression of repeated
//! or near-identical messages. A forced request clears the queue, interrupts
//! the current utterance, and plays immediately.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::TimingConfig;
use crate::speech::Synthesizer;

/// Delimiter separating the event part of an alert from its positional
/// clause ("Obstacle approaching to your left"). Messages sharing the part
/// before it are considered the same event at a different position.
const POSITION_DELIMITER: &str = " to your ";

struct QueueState {
    queue: VecDeque<String>,
    last_spoken: HashMap<String, Instant>,
}

struct Inner {
    engine: Arc<dyn Synthesizer>,
    state: Mutex<QueueState>,
    /// Wakes the worker when a request is enqueued
    wake: Notify,
    /// Bumped by every forced request. The worker snapshots the value when
    /// it pops an utterance and cancels once the value moves past the
    /// snapshot; the watch channel keeps the latest value, so a force that
    /// lands between pop and await is never lost.
    cancel_tx: watch::Sender<u64>,
    speaking_tx: watch::Sender<bool>,
    /// Fallback visible channel for critical messages when synthesis is down
    status_tx: watch::Sender<Option<String>>,
    exact_window: Duration,
    similar_window: Duration,
    gap: Duration,
}

/// Serialized speech output with suppression and forced interruption
#[derive(Clone)]
pub struct SpeechQueue {
    inner: Arc<Inner>,
}

impl SpeechQueue {
    /// Create a queue backed by the given synthesizer
    #[must_use]
    pub fn new(engine: Arc<dyn Synthesizer>, timing: &TimingConfig) -> Self {
        let (speaking_tx, _) = watch::channel(false);
        let (status_tx, _) = watch::channel(None);
        let (cancel_tx, _) = watch::channel(0u64);

        Self {
            inner: Arc::new(Inner {
                engine,
                state: Mutex::new(QueueState {
                    queue: VecDeque::new(),
                    last_spoken: HashMap::new(),
                }),
                wake: Notify::new(),
                cancel_tx,
                speaking_tx,
                status_tx,
                exact_window: timing.exact_suppression,
                similar_window: timing.similar_suppression,
                gap: timing.utterance_gap,
            }),
        }
    }

    /// Enqueue an utterance.
    ///
    /// Without `force`, the request is dropped if the identical text was
    /// spoken within the exact-suppression window, or a message sharing the
    /// same pre-positional prefix was spoken within the similar-suppression
    /// window. With `force`, the pending queue is cleared, the current
    /// utterance is interrupted, and this text plays next.
    pub fn speak(&self, text: &str, force: bool) {
        if text.trim().is_empty() {
            return;
        }

        if !self.inner.engine.available() {
            if force {
                // Never silently drop a critical message
                tracing::warn!(message = %text, "synthesis unavailable, surfacing on status channel");
                self.inner.status_tx.send_replace(Some(text.to_string()));
            } else {
                tracing::debug!(message = %text, "synthesis unavailable, dropping");
            }
            return;
        }

        let now = Instant::now();
        let mut state = self.inner.state.lock().expect("speech queue poisoned");

        if force {
            state.queue.clear();
            // Bumped while holding the state lock so it orders against the
            // worker's pop-and-snapshot, which takes the same lock
            self.inner.cancel_tx.send_modify(|generation| *generation += 1);
        } else {
            if let Some(at) = state.last_spoken.get(text) {
                if now.duration_since(*at) < self.inner.exact_window {
                    tracing::trace!(message = %text, "suppressed duplicate");
                    return;
                }
            }

            // Suppress rapid alternation between positions of the same event
            let base = text.split(POSITION_DELIMITER).next().unwrap_or(text);
            let similar = state.last_spoken.iter().any(|(msg, at)| {
                msg != text
                    && msg.starts_with(base)
                    && now.duration_since(*at) < self.inner.similar_window
            });
            if similar {
                tracing::trace!(message = %text, "suppressed similar message");
                return;
            }
        }

        let horizon = self.inner.exact_window.max(self.inner.similar_window);
        state
            .last_spoken
            .retain(|_, at| now.duration_since(*at) < horizon);
        state.last_spoken.insert(text.to_string(), now);

        state.queue.push_back(text.to_string());
        drop(state);

        tracing::debug!(message = %text, force, "queued utterance");
        self.inner.wake.notify_one();
    }

    /// Current value of the speaking flag
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        *self.inner.speaking_tx.borrow()
    }

    /// Watch the speaking flag (used by the recognition manager)
    #[must_use]
    pub fn subscribe_speaking(&self) -> watch::Receiver<bool> {
        self.inner.speaking_tx.subscribe()
    }

    /// Watch the fallback status channel (critical messages that could not
    /// be spoken)
    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<Option<String>> {
        self.inner.status_tx.subscribe()
    }

    /// Spawn the worker task that plays queued utterances
    pub fn spawn_worker(&self) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        let mut cancel_rx = self.inner.cancel_tx.subscribe();
        tokio::spawn(async move {
            loop {
                let (next, seen) = {
                    let mut state = inner.state.lock().expect("speech queue poisoned");
                    (state.queue.pop_front(), *cancel_rx.borrow_and_update())
                };

                let Some(text) = next else {
                    inner.wake.notified().await;
                    continue;
                };

                inner.speaking_tx.send_replace(true);

                let played = tokio::select! {
                    result = inner.engine.speak(&text) => Some(result),
                    () = cancelled(&mut cancel_rx, seen) => None,
                };

                match played {
                    Some(result) => {
                        if let Err(e) = result {
                            // Synthesis failures advance the queue, never kill it
                            tracing::warn!(error = %e, message = %text, "utterance failed");
                        }
                        inner.speaking_tx.send_replace(false);

                        // Gap between utterances; a forced request skips it
                        let _ = tokio::time::timeout(inner.gap, cancelled(&mut cancel_rx, seen))
                            .await;
                    }
                    None => {
                        inner.engine.cancel();
                        inner.speaking_tx.send_replace(false);
                    }
                }
            }
        })
    }
}

/// Resolves once the cancel generation moves past `seen`
async fn cancelled(rx: &mut watch::Receiver<u64>, seen: u64) {
    loop {
        if *rx.borrow_and_update() > seen {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender lives in Inner, which the worker keeps alive
            std::future::pending::<()>().await;
        }
    }
}
