//! Voice pipeline behavior: command interpretation end to end, and the
//! recognition lifecycle manager against a scripted engine.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use clearpath::config::TimingConfig;
use clearpath::interpreter::{AssistantFlags, Interpreter, Page};
use clearpath::recognition::{
    RecognitionEngine, RecognitionEvent, RecognitionManager, SessionState, StartError, StopError,
};
use clearpath::speech::{SpeechQueue, Synthesizer};
use clearpath::Result;

struct RecordingSynth {
    spoken: Arc<Mutex<Vec<String>>>,
}

impl RecordingSynth {
    fn new() -> (Arc<Self>, Arc<Mutex<Vec<String>>>) {
        let spoken = Arc::new(Mutex::new(Vec::new()));
        let synth = Arc::new(Self {
            spoken: Arc::clone(&spoken),
        });
        (synth, spoken)
    }
}

#[async_trait]
impl Synthesizer for RecordingSynth {
    async fn speak(&self, text: &str) -> Result<()> {
        self.spoken.lock().unwrap().push(text.to_string());
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(())
    }

    fn cancel(&self) {}
}

struct Harness {
    spoken: Arc<Mutex<Vec<String>>>,
    flags: Arc<AssistantFlags>,
    transcript_tx: mpsc::UnboundedSender<String>,
    activate_tx: mpsc::UnboundedSender<()>,
    nav_rx: mpsc::UnboundedReceiver<Page>,
}

fn interpreter_harness(timing: &TimingConfig) -> Harness {
    let (synth, spoken) = RecordingSynth::new();
    let queue = SpeechQueue::new(synth, timing);
    let _worker = queue.spawn_worker();

    let flags = Arc::new(AssistantFlags::default());
    let (nav_tx, nav_rx) = mpsc::unbounded_channel();
    let (transcript_tx, transcript_rx) = mpsc::unbounded_channel();
    let (activate_tx, activate_rx) = mpsc::unbounded_channel();

    let interpreter = Interpreter::new(queue, nav_tx, Arc::clone(&flags), timing);
    tokio::spawn(interpreter.run(transcript_rx, activate_rx));

    Harness {
        spoken,
        flags,
        transcript_tx,
        activate_tx,
        nav_rx,
    }
}

#[tokio::test(start_paused = true)]
async fn wake_phrase_arms_command_mode() {
    let mut h = interpreter_harness(&TimingConfig::default());
    assert!(!h.flags.wake_active());

    h.transcript_tx.send("hey assistant".to_string()).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(h.flags.wake_active());
    assert_eq!(
        h.spoken.lock().unwrap().last().map(String::as_str),
        Some("I'm listening for your command")
    );
    assert!(h.nav_rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn command_navigates_after_confirmation_delay() {
    let mut h = interpreter_harness(&TimingConfig::default());
    h.flags.set_wake_active(true);

    h.transcript_tx.send("walking mode".to_string()).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Confirmation first, navigation only after the delay
    assert!(h.flags.processing());
    assert!(h.nav_rx.try_recv().is_err());
    assert!(
        h.spoken
            .lock()
            .unwrap()
            .contains(&"Activating walking mode".to_string())
    );

    tokio::time::sleep(Duration::from_millis(1300)).await;
    assert_eq!(h.nav_rx.try_recv(), Ok(Page::WalkingMode));
    assert!(!h.flags.processing());
    // Command mode stays armed for the next command
    assert!(h.flags.wake_active());
}

#[tokio::test(start_paused = true)]
async fn manual_activation_arms_command_mode() {
    let mut h = interpreter_harness(&TimingConfig::default());
    assert!(!h.flags.wake_active());

    // No voice involved: the manual trigger arms command mode directly
    h.activate_tx.send(()).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(h.flags.wake_active());
    assert_eq!(
        h.spoken.lock().unwrap().last().map(String::as_str),
        Some("I'm listening for your command")
    );

    // And a command right after is dispatched normally
    h.transcript_tx.send("interaction mode".to_string()).unwrap();
    tokio::time::sleep(Duration::from_millis(1300)).await;
    assert_eq!(h.nav_rx.try_recv(), Ok(Page::InteractionMode));
}

#[tokio::test(start_paused = true)]
async fn command_ignored_without_wake() {
    let mut h = interpreter_harness(&TimingConfig::default());

    h.transcript_tx.send("walking mode".to_string()).unwrap();
    tokio::time::sleep(Duration::from_millis(2000)).await;

    assert!(h.nav_rx.try_recv().is_err());
    assert!(!h.flags.wake_active());
}

#[tokio::test(start_paused = true)]
async fn deactivate_clears_command_mode() {
    let mut h = interpreter_harness(&TimingConfig::default());
    h.flags.set_wake_active(true);

    h.transcript_tx.send("deactivate".to_string()).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(h.flags.processing());

    tokio::time::sleep(Duration::from_millis(1600)).await;
    assert!(!h.flags.wake_active());
    assert!(!h.flags.processing());
    assert!(h.nav_rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn unrecognized_command_keeps_command_mode() {
    let mut h = interpreter_harness(&TimingConfig::default());
    h.flags.set_wake_active(true);

    h.transcript_tx.send("what a lovely day".to_string()).unwrap();
    tokio::time::sleep(Duration::from_millis(2000)).await;

    assert!(h.flags.wake_active());
    assert!(!h.flags.processing());
    assert!(h.nav_rx.try_recv().is_err());
    assert!(
        h.spoken
            .lock()
            .unwrap()
            .contains(&"I didn't understand that command. Please try again.".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn own_speech_echo_ignored() {
    let mut h = interpreter_harness(&TimingConfig::default());
    h.flags.set_wake_active(true);

    h.transcript_tx
        .send("activating walking mode".to_string())
        .unwrap();
    tokio::time::sleep(Duration::from_millis(2000)).await;

    assert!(h.nav_rx.try_recv().is_err());
    assert!(!h.flags.processing());
}

#[tokio::test(start_paused = true)]
async fn safety_timer_unsticks_processing() {
    // Navigation delay deliberately longer than the safety timeout
    let timing = TimingConfig {
        navigation_delay: Duration::from_millis(10_000),
        safety_timeout: Duration::from_millis(2000),
        ..TimingConfig::default()
    };
    let h = interpreter_harness(&timing);
    h.flags.set_wake_active(true);

    h.transcript_tx.send("go to home".to_string()).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(h.flags.processing());

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert!(!h.flags.processing());
}

// --- recognition lifecycle ---

#[derive(Default)]
struct EngineScript {
    /// `start` returns AlreadyStarted instead of starting
    already_started: bool,
    /// `start` succeeds but the Started event is sent by the test,
    /// keeping the session in the Starting state meanwhile
    manual_started: bool,
}

struct MockEngine {
    events: mpsc::UnboundedSender<RecognitionEvent>,
    starts: AtomicU32,
    stops: AtomicU32,
    script: EngineScript,
}

impl MockEngine {
    fn new(events: mpsc::UnboundedSender<RecognitionEvent>, script: EngineScript) -> Arc<Self> {
        Arc::new(Self {
            events,
            starts: AtomicU32::new(0),
            stops: AtomicU32::new(0),
            script,
        })
    }

    fn starts(&self) -> u32 {
        self.starts.load(Ordering::SeqCst)
    }

    fn stops(&self) -> u32 {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecognitionEngine for MockEngine {
    async fn start(&self) -> std::result::Result<(), StartError> {
        if self.script.already_started {
            return Err(StartError::AlreadyStarted);
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        if !self.script.manual_started {
            let _ = self.events.send(RecognitionEvent::Started);
        }
        Ok(())
    }

    async fn stop(&self) -> std::result::Result<(), StopError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        let _ = self.events.send(RecognitionEvent::Ended);
        Ok(())
    }
}

struct LifecycleHarness {
    engine: Arc<MockEngine>,
    event_tx: mpsc::UnboundedSender<RecognitionEvent>,
    speaking_tx: watch::Sender<bool>,
    transcript_rx: mpsc::UnboundedReceiver<String>,
    state_rx: watch::Receiver<SessionState>,
    flags: Arc<AssistantFlags>,
}

fn lifecycle_harness(script: EngineScript) -> LifecycleHarness {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let engine = MockEngine::new(event_tx.clone(), script);
    let (transcript_tx, transcript_rx) = mpsc::unbounded_channel();
    let (speaking_tx, speaking_rx) = watch::channel(false);
    let flags = Arc::new(AssistantFlags::default());

    let manager = RecognitionManager::new(
        Arc::clone(&engine) as Arc<dyn RecognitionEngine>,
        event_rx,
        transcript_tx,
        speaking_rx,
        Arc::clone(&flags),
        &TimingConfig::default(),
    );
    let state_rx = manager.subscribe_state();
    tokio::spawn(manager.run());

    LifecycleHarness {
        engine,
        event_tx,
        speaking_tx,
        transcript_rx,
        state_rx,
        flags,
    }
}

#[tokio::test(start_paused = true)]
async fn final_transcripts_forwarded_normalized() {
    let mut h = lifecycle_harness(EngineScript::default());
    tokio::time::sleep(Duration::from_millis(50)).await;

    h.event_tx
        .send(RecognitionEvent::Transcript {
            text: "  Walking Mode  ".to_string(),
            is_final: true,
        })
        .unwrap();
    h.event_tx
        .send(RecognitionEvent::Transcript {
            text: "interim noise".to_string(),
            is_final: false,
        })
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(h.transcript_rx.try_recv(), Ok("walking mode".to_string()));
    assert!(h.transcript_rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn rapid_cycling_triggers_cooldown() {
    let h = lifecycle_harness(EngineScript::default());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.engine.starts(), 1);

    // Three session endings inside the one-second window
    for _ in 0..3 {
        h.event_tx.send(RecognitionEvent::Ended).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // Inside the cooldown no restart happens
    tokio::time::sleep(Duration::from_millis(2000)).await;
    assert_eq!(h.engine.starts(), 1);

    // After the 3s cooldown the session restarts
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(h.engine.starts(), 2);
}

#[tokio::test(start_paused = true)]
async fn recognition_pauses_while_speaking() {
    let h = lifecycle_harness(EngineScript::default());
    // Well past the rapid-cycle window so the stop below is not counted
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(h.engine.starts(), 1);
    assert_eq!(*h.state_rx.borrow(), SessionState::Listening);

    h.speaking_tx.send(true).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.engine.stops(), 1);
    assert_eq!(*h.state_rx.borrow(), SessionState::Idle);

    // Speech ends; recognition resumes after the restart delay
    h.speaking_tx.send(false).unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(h.engine.starts(), 1);

    tokio::time::sleep(Duration::from_millis(700)).await;
    assert_eq!(h.engine.starts(), 2);
}

#[tokio::test(start_paused = true)]
async fn already_started_engine_reconciled_to_listening() {
    let h = lifecycle_harness(EngineScript {
        already_started: true,
        ..EngineScript::default()
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(h.engine.starts(), 0);
    assert_eq!(*h.state_rx.borrow(), SessionState::Listening);
}

#[tokio::test(start_paused = true)]
async fn speech_beginning_during_start_stops_session() {
    let h = lifecycle_harness(EngineScript {
        manual_started: true,
        ..EngineScript::default()
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.engine.starts(), 1);

    // Speech begins while the start call is still settling; the manager
    // cannot stop yet because the session is not listening
    h.speaking_tx.send(true).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.engine.stops(), 0);

    // The session comes up into ongoing speech and is stopped right away
    h.event_tx.send(RecognitionEvent::Started).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(h.engine.stops(), 1);
    assert_eq!(*h.state_rx.borrow(), SessionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn network_error_retries_after_delay() {
    let h = lifecycle_harness(EngineScript::default());
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(h.engine.starts(), 1);

    h.event_tx
        .send(RecognitionEvent::Error(
            clearpath::recognition::RecognitionErrorKind::Network,
        ))
        .unwrap();

    tokio::time::sleep(Duration::from_millis(2000)).await;
    assert_eq!(h.engine.starts(), 1);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(h.engine.starts(), 2);
}

#[tokio::test(start_paused = true)]
async fn restart_deferred_while_processing_command() {
    let h = lifecycle_harness(EngineScript::default());
    tokio::time::sleep(Duration::from_millis(1500)).await;

    h.flags.set_processing(true);
    h.event_tx.send(RecognitionEvent::Ended).unwrap();
    tokio::time::sleep(Duration::from_millis(3000)).await;

    // No restart while a command is in flight
    assert_eq!(h.engine.starts(), 1);

    // Once the flag clears, a speaking transition schedules the resume
    h.flags.set_processing(false);
    h.speaking_tx.send(true).unwrap();
    h.speaking_tx.send(false).unwrap();
    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(h.engine.starts(), 2);

    drop(h.transcript_rx);
}
