//! Daemon wiring and mode loop
//!
//! Builds the speech queue, recognition manager and interpreter, then runs
//! the mode loop: voice commands arrive as navigation events, and whichever
//! detection mode is active drives camera frames through its alert pipeline.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::config::Config;
use crate::detection::{
    DetectionClient, DirFrameSource, FrameSource, InteractionAlerts, WalkingAlerts,
};
use crate::interpreter::{AssistantFlags, Interpreter, Page};
use crate::recognition::{MicEngine, RecognitionEngine, RecognitionManager, SttClient};
use crate::speech::{HttpSynthesizer, NullSynthesizer, SpeechQueue, Synthesizer};
use crate::Result;

/// Spoken once at startup; also the anchor for self-speech rejection
const STARTUP_ANNOUNCEMENT: &str = "Welcome to ClearPath. Voice assistant is ready.";

const WALKING_ANNOUNCEMENT: &str =
    "Walking mode activated. Looking for obstacles in your path.";
const INTERACTION_ANNOUNCEMENT: &str =
    "Interaction mode activated. Looking for people around you.";

/// Active detection mode
enum Mode {
    Idle,
    Walking(WalkingAlerts),
    Interaction(InteractionAlerts),
}

/// The assembled assistant
pub struct Daemon {
    config: Config,
}

impl Daemon {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run until interrupted.
    ///
    /// # Errors
    ///
    /// Returns an error if the detection client cannot be built. Missing
    /// audio devices or speech credentials degrade the voice surfaces but
    /// do not abort the daemon.
    pub async fn run(self) -> Result<()> {
        let config = self.config;

        // Speech output: real synthesis when we have a key and a speaker,
        // otherwise the null backend that routes critical messages to the
        // status channel.
        let synth: Arc<dyn Synthesizer> = build_synthesizer(&config);
        let speech = SpeechQueue::new(synth, &config.timing);
        let _speech_worker = speech.spawn_worker();

        // Critical messages that could not be spoken still reach the user
        let mut status_rx = speech.subscribe_status();
        tokio::spawn(async move {
            while status_rx.changed().await.is_ok() {
                let message = status_rx.borrow_and_update().clone();
                if let Some(message) = message {
                    println!("[clearpath] {message}");
                }
            }
        });

        let flags = Arc::new(AssistantFlags::default());
        let (nav_tx, mut nav_rx) = mpsc::unbounded_channel::<Page>();
        let (transcript_tx, transcript_rx) = mpsc::unbounded_channel::<String>();
        let (activate_tx, activate_rx) = mpsc::unbounded_channel::<()>();

        // Recognition: microphone engine behind the lifecycle manager
        if config.voice.enabled {
            match SttClient::new(&config.voice) {
                Ok(stt) => {
                    let (event_tx, event_rx) = mpsc::unbounded_channel();
                    let engine = Arc::new(MicEngine::new(stt, event_tx));
                    if engine.available() {
                        let manager = RecognitionManager::new(
                            engine,
                            event_rx,
                            transcript_tx,
                            speech.subscribe_speaking(),
                            Arc::clone(&flags),
                            &config.timing,
                        );
                        tokio::spawn(manager.run());
                    } else {
                        tracing::warn!("no microphone available, voice commands disabled");
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "speech recognition disabled");
                }
            }
        } else {
            tracing::info!("voice disabled by configuration");
        }

        let interpreter = Interpreter::new(
            speech.clone(),
            nav_tx,
            Arc::clone(&flags),
            &config.timing,
        );
        tokio::spawn(interpreter.run(transcript_rx, activate_rx));

        // Manual fallback into command mode when the wake phrase cannot be
        // spoken or heard: `kill -USR1 <pid>`
        #[cfg(unix)]
        tokio::spawn(async move {
            use tokio::signal::unix::{SignalKind, signal};

            let Ok(mut usr1) = signal(SignalKind::user_defined1()) else {
                tracing::warn!("could not install SIGUSR1 handler");
                return;
            };
            while usr1.recv().await.is_some() {
                tracing::info!("manual activation requested");
                if activate_tx.send(()).is_err() {
                    break;
                }
            }
        });
        #[cfg(not(unix))]
        drop(activate_tx);

        // The assistant comes up armed: no wake phrase needed for the
        // first command after startup
        flags.set_wake_active(true);
        speech.speak(STARTUP_ANNOUNCEMENT, true);
        tracing::info!("clearpath daemon started");

        let client = DetectionClient::new(&config.detection)?;
        let mut mode = Mode::Idle;
        let mut frames: Option<DirFrameSource> = None;

        let mut detect_tick = interval_at(far_future(), config.detection.walking_interval);
        detect_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut echo_tick = tokio::time::interval(config.timing.echo_idle);
        echo_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                page = nav_rx.recv() => {
                    let Some(page) = page else { break };
                    match page {
                        Page::WalkingMode => {
                            tracing::info!("entering walking mode");
                            speech.speak(WALKING_ANNOUNCEMENT, true);
                            mode = Mode::Walking(WalkingAlerts::new(
                                speech.clone(),
                                config.timing.echo_min_elapsed,
                            ));
                            frames = Some(DirFrameSource::new(&config.detection.frame_dir));
                            detect_tick = interval_at(
                                Instant::now() + config.detection.walking_interval,
                                config.detection.walking_interval,
                            );
                            detect_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
                        }
                        Page::InteractionMode => {
                            tracing::info!("entering interaction mode");
                            speech.speak(INTERACTION_ANNOUNCEMENT, false);
                            mode = Mode::Interaction(InteractionAlerts::new(
                                speech.clone(),
                                config.timing.echo_min_elapsed,
                            ));
                            frames = Some(DirFrameSource::new(&config.detection.frame_dir));
                            detect_tick = interval_at(
                                Instant::now() + config.detection.interaction_interval,
                                config.detection.interaction_interval,
                            );
                            detect_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
                        }
                        other => {
                            tracing::info!(path = other.path(), "leaving detection modes");
                            mode = Mode::Idle;
                            frames = None;
                            detect_tick = interval_at(
                                far_future(),
                                config.detection.walking_interval,
                            );
                        }
                    }
                }
                _ = detect_tick.tick(), if !matches!(mode, Mode::Idle) => {
                    if let Some(source) = frames.as_mut() {
                        process_frame(source, &client, &mut mode).await;
                    }
                }
                _ = echo_tick.tick() => {
                    if !speech.is_speaking() {
                        match &mut mode {
                            Mode::Walking(alerts) => alerts.echo_tick(),
                            Mode::Interaction(alerts) => alerts.echo_tick(),
                            Mode::Idle => {}
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Fetch and analyze one frame for whichever mode is active
async fn process_frame(source: &mut DirFrameSource, client: &DetectionClient, mode: &mut Mode) {
    let frame = match source.next_frame().await {
        Ok(Some(frame)) => frame,
        Ok(None) => return,
        Err(e) => {
            tracing::warn!(error = %e, "frame fetch failed");
            return;
        }
    };

    match mode {
        Mode::Walking(alerts) => match client.analyze_walking(frame).await {
            Ok(Some(snapshot)) => alerts.observe(&snapshot),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "obstacle detection failed");
                alerts.reset();
            }
        },
        Mode::Interaction(alerts) => match client.analyze_interaction(frame).await {
            Ok(Some(snapshot)) => alerts.observe(&snapshot),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "people detection failed");
                alerts.reset();
            }
        },
        Mode::Idle => {}
    }
}

fn build_synthesizer(config: &Config) -> Arc<dyn Synthesizer> {
    if !config.voice.enabled {
        tracing::info!("speech output disabled by configuration");
        return Arc::new(NullSynthesizer);
    }
    if !crate::audio::output_available() {
        tracing::warn!("no audio output device, speech output disabled");
        return Arc::new(NullSynthesizer);
    }
    match HttpSynthesizer::new(&config.voice) {
        Ok(synth) => Arc::new(synth),
        Err(e) => {
            tracing::warn!(error = %e, "speech synthesis unavailable");
            Arc::new(NullSynthesizer)
        }
    }
}

/// A deadline that never arrives, for parking the detection interval
fn far_future() -> Instant {
    Instant::now() + std::time::Duration::from_secs(86400 * 365)
}
