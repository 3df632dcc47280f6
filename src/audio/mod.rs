//! Audio I/O
//!
//! Microphone capture feeding the recognition engine and speaker playback
//! for synthesized speech. Both sides go through the default system devices.

mod capture;
mod playback;

pub use capture::{AudioCapture, SAMPLE_RATE, input_available, samples_to_wav};
pub use playback::{AudioPlayback, output_available};
