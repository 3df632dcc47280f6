//! Energy-based utterance segmentation
//!
//! Splits the continuous microphone stream into utterance-sized segments for
//! transcription: speech starts when RMS energy crosses a threshold and ends
//! after half a second of silence.

/// Minimum audio energy to consider speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum speech length for a segment to be worth transcribing
/// (0.3 seconds at 16kHz)
const MIN_SPEECH_SAMPLES: usize = 4800;

/// Silence run that ends an utterance (0.5 seconds at 16kHz)
const SILENCE_SAMPLES: usize = 8000;

/// Hard cap on segment length (15 seconds at 16kHz); a segment is flushed at
/// this size even without trailing silence
const MAX_SEGMENT_SAMPLES: usize = 240_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmenterState {
    Idle,
    Speech,
}

/// Accumulates samples and emits completed utterance segments
pub struct SpeechSegmenter {
    state: SegmenterState,
    buffer: Vec<f32>,
    silence_run: usize,
}

impl Default for SpeechSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechSegmenter {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SegmenterState::Idle,
            buffer: Vec::new(),
            silence_run: 0,
        }
    }

    /// Feed captured samples; returns a completed segment when one ends
    pub fn push(&mut self, samples: &[f32]) -> Option<Vec<f32>> {
        if samples.is_empty() {
            return None;
        }

        let is_speech = rms_energy(samples) > ENERGY_THRESHOLD;

        match self.state {
            SegmenterState::Idle => {
                if is_speech {
                    self.state = SegmenterState::Speech;
                    self.buffer.clear();
                    self.buffer.extend_from_slice(samples);
                    self.silence_run = 0;
                    tracing::trace!("speech started");
                }
                None
            }
            SegmenterState::Speech => {
                self.buffer.extend_from_slice(samples);

                if is_speech {
                    self.silence_run = 0;
                } else {
                    self.silence_run += samples.len();
                }

                if self.buffer.len() >= MAX_SEGMENT_SAMPLES {
                    tracing::debug!(samples = self.buffer.len(), "segment flushed at cap");
                    return Some(self.take_segment());
                }

                if self.silence_run > SILENCE_SAMPLES {
                    if self.buffer.len() - self.silence_run > MIN_SPEECH_SAMPLES {
                        tracing::debug!(samples = self.buffer.len(), "segment complete");
                        return Some(self.take_segment());
                    }

                    // Too short to be speech: a cough, a door, noise
                    tracing::trace!("discarding short segment");
                    self.reset();
                }

                None
            }
        }
    }

    /// Discard any partial segment and return to idle
    pub fn reset(&mut self) {
        self.state = SegmenterState::Idle;
        self.buffer.clear();
        self.silence_run = 0;
    }

    fn take_segment(&mut self) -> Vec<f32> {
        self.state = SegmenterState::Idle;
        self.silence_run = 0;
        std::mem::take(&mut self.buffer)
    }
}

/// RMS energy of a sample block
#[allow(clippy::cast_precision_loss)]
fn rms_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
