//! Speech output
//!
//! All spoken feedback goes through [`SpeechQueue`], which serializes
//! utterances, de-duplicates chatter, and exposes the `is_speaking` flag the
//! recognition side uses to avoid hearing the assistant's own voice.

mod queue;
mod synth;

pub use queue::SpeechQueue;
pub use synth::{HttpSynthesizer, NullSynthesizer, Synthesizer};
