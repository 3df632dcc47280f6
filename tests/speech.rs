//! Speech output queue behavior: ordering, suppression windows, forced
//! preemption, and the degraded path when synthesis is unavailable.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use clearpath::config::TimingConfig;
use clearpath::speech::{SpeechQueue, Synthesizer};
use clearpath::Result;

/// Synthesizer that records what it is asked to speak. Each utterance
/// "plays" for a configurable duration so interruption is observable.
struct RecordingSynth {
    spoken: Arc<Mutex<Vec<String>>>,
    utterance: Duration,
}

impl RecordingSynth {
    fn new(utterance: Duration) -> (Arc<Self>, Arc<Mutex<Vec<String>>>) {
        let spoken = Arc::new(Mutex::new(Vec::new()));
        let synth = Arc::new(Self {
            spoken: Arc::clone(&spoken),
            utterance,
        });
        (synth, spoken)
    }
}

#[async_trait]
impl Synthesizer for RecordingSynth {
    async fn speak(&self, text: &str) -> Result<()> {
        self.spoken.lock().unwrap().push(text.to_string());
        tokio::time::sleep(self.utterance).await;
        Ok(())
    }

    fn cancel(&self) {}
}

/// Synthesizer that errors on one specific utterance and records the rest
struct FailingSynth {
    spoken: Arc<Mutex<Vec<String>>>,
    fail_on: &'static str,
}

#[async_trait]
impl Synthesizer for FailingSynth {
    async fn speak(&self, text: &str) -> Result<()> {
        if text == self.fail_on {
            return Err(clearpath::Error::Speech("backend hiccup".to_string()));
        }
        self.spoken.lock().unwrap().push(text.to_string());
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(())
    }

    fn cancel(&self) {}
}

/// Synthesizer with no usable backend
struct UnavailableSynth;

#[async_trait]
impl Synthesizer for UnavailableSynth {
    fn available(&self) -> bool {
        false
    }

    async fn speak(&self, _text: &str) -> Result<()> {
        panic!("unavailable synthesizer must never be asked to speak");
    }

    fn cancel(&self) {}
}

fn timing() -> TimingConfig {
    TimingConfig::default()
}

async fn settle() {
    // Paused-clock runtimes auto-advance; this lets the worker drain
    tokio::time::sleep(Duration::from_millis(1000)).await;
}

#[tokio::test(start_paused = true)]
async fn utterances_play_in_fifo_order() {
    let (synth, spoken) = RecordingSynth::new(Duration::from_millis(100));
    let queue = SpeechQueue::new(synth, &timing());
    let _worker = queue.spawn_worker();

    queue.speak("first", false);
    queue.speak("second", false);
    queue.speak("third", false);
    settle().await;

    assert_eq!(*spoken.lock().unwrap(), vec!["first", "second", "third"]);
}

#[tokio::test(start_paused = true)]
async fn identical_message_suppressed_within_window() {
    let (synth, spoken) = RecordingSynth::new(Duration::from_millis(50));
    let queue = SpeechQueue::new(synth, &timing());
    let _worker = queue.spawn_worker();

    queue.speak("obstacle detected ahead", false);
    settle().await;
    queue.speak("obstacle detected ahead", false);
    settle().await;

    assert_eq!(spoken.lock().unwrap().len(), 1);

    // Past the 5s exact window the message may repeat
    tokio::time::sleep(Duration::from_millis(5100)).await;
    queue.speak("obstacle detected ahead", false);
    settle().await;

    assert_eq!(spoken.lock().unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn similar_message_suppressed_within_window() {
    let (synth, spoken) = RecordingSynth::new(Duration::from_millis(50));
    let queue = SpeechQueue::new(synth, &timing());
    let _worker = queue.spawn_worker();

    queue.speak("Obstacle approaching to your left", false);
    settle().await;

    // Same event, different position: suppressed inside the 3s window
    queue.speak("Obstacle approaching to your right", false);
    settle().await;
    assert_eq!(spoken.lock().unwrap().len(), 1);

    tokio::time::sleep(Duration::from_millis(3100)).await;
    queue.speak("Obstacle approaching to your right", false);
    settle().await;
    assert_eq!(spoken.lock().unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn forced_message_clears_queue_and_interrupts() {
    let (synth, spoken) = RecordingSynth::new(Duration::from_millis(2000));
    let queue = SpeechQueue::new(synth, &timing());
    let _worker = queue.spawn_worker();

    queue.speak("long current utterance", false);
    queue.speak("queued and doomed", false);

    // Let the first utterance start playing
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(queue.is_speaking());

    queue.speak("caution", true);
    settle().await;
    tokio::time::sleep(Duration::from_millis(3000)).await;

    let spoken = spoken.lock().unwrap();
    assert_eq!(*spoken, vec!["long current utterance", "caution"]);
}

#[tokio::test(start_paused = true)]
async fn forced_message_bypasses_suppression() {
    let (synth, spoken) = RecordingSynth::new(Duration::from_millis(50));
    let queue = SpeechQueue::new(synth, &timing());
    let _worker = queue.spawn_worker();

    queue.speak("caution obstacle very close", false);
    settle().await;
    queue.speak("caution obstacle very close", true);
    settle().await;

    assert_eq!(spoken.lock().unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_utterance_advances_queue() {
    let spoken = Arc::new(Mutex::new(Vec::new()));
    let synth = Arc::new(FailingSynth {
        spoken: Arc::clone(&spoken),
        fail_on: "broken utterance",
    });
    let queue = SpeechQueue::new(synth, &timing());
    let _worker = queue.spawn_worker();

    queue.speak("broken utterance", false);
    queue.speak("next utterance", false);
    settle().await;

    // The failure is swallowed: no retry, the queue moves on
    assert_eq!(*spoken.lock().unwrap(), vec!["next utterance"]);
    assert!(!queue.is_speaking());
}

#[tokio::test(start_paused = true)]
async fn force_ahead_of_worker_plays_only_forced() {
    let (synth, spoken) = RecordingSynth::new(Duration::from_millis(100));
    let queue = SpeechQueue::new(synth, &timing());
    let _worker = queue.spawn_worker();

    // Both requests land before the worker gets to run; the force must
    // clear the pending utterance and not cancel its own
    queue.speak("stale alert", false);
    queue.speak("urgent alert", true);
    settle().await;

    assert_eq!(*spoken.lock().unwrap(), vec!["urgent alert"]);
}

#[tokio::test(start_paused = true)]
async fn speaking_flag_tracks_playback() {
    let (synth, _spoken) = RecordingSynth::new(Duration::from_millis(500));
    let queue = SpeechQueue::new(synth, &timing());
    let _worker = queue.spawn_worker();
    let speaking = queue.subscribe_speaking();

    assert!(!queue.is_speaking());

    queue.speak("hello", false);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(*speaking.borrow());

    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert!(!*speaking.borrow());
}

#[tokio::test(start_paused = true)]
async fn forced_message_surfaces_when_synthesis_unavailable() {
    let queue = SpeechQueue::new(Arc::new(UnavailableSynth), &timing());
    let _worker = queue.spawn_worker();
    let status = queue.subscribe_status();

    // Routine messages are dropped quietly
    queue.speak("obstacle detected ahead", false);
    assert_eq!(*status.borrow(), None);

    // Critical messages reach the fallback channel
    queue.speak("Caution! Obstacle very close to you", true);
    assert_eq!(
        status.borrow().as_deref(),
        Some("Caution! Obstacle very close to you")
    );
}

#[tokio::test(start_paused = true)]
async fn empty_text_ignored() {
    let (synth, spoken) = RecordingSynth::new(Duration::from_millis(50));
    let queue = SpeechQueue::new(synth, &timing());
    let _worker = queue.spawn_worker();

    queue.speak("", false);
    queue.speak("   ", true);
    settle().await;

    assert!(spoken.lock().unwrap().is_empty());
}
