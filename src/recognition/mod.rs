//! Speech recognition
//!
//! The [`RecognitionManager`] owns the continuous recognition session and is
//! the only place allowed to start or stop the underlying engine. Engines
//! implement [`RecognitionEngine`] and report lifecycle events and finalized
//! transcripts over a channel, mirroring the callback surface of a native
//! recognizer.

mod engine;
mod lifecycle;
mod segmenter;
mod stt;

pub use engine::{
    MicEngine, RecognitionEngine, RecognitionErrorKind, RecognitionEvent, StartError, StopError,
};
pub use lifecycle::{RecognitionManager, SessionState};
pub use segmenter::SpeechSegmenter;
pub use stt::SttClient;
