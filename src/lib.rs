//! ClearPath - voice-controlled navigation assistant
//!
//! This library provides the core functionality of the ClearPath daemon:
//! - Speech output queue with suppression and forced interruption
//! - Speech recognition lifecycle management (start/stop/restart races)
//! - Wake-word detection and spoken command interpretation
//! - Detection-to-alert pipelines for obstacle and people detection
//!
//! # Architecture
//!
//! ```text
//! microphone ──▶ RecognitionManager ──▶ transcript ──▶ Interpreter
//!                      ▲                                   │
//!                      │ pause while speaking              │ mode change
//!                      │                                   ▼
//! speakers ◀── SpeechQueue ◀── alerts ◀── pipelines ◀── Daemon mode loop
//!                                             ▲
//!                                             │ JSON snapshot
//!                               detection service (per camera frame)
//! ```
//!
//! The speech queue and the recognition manager coordinate through a single
//! `is_speaking` flag so the assistant never transcribes its own voice.

pub mod audio;
pub mod config;
pub mod daemon;
pub mod detection;
pub mod error;
pub mod interpreter;
pub mod recognition;
pub mod speech;

pub use config::Config;
pub use daemon::Daemon;
pub use error::{Error, Result};
pub use interpreter::{AssistantFlags, Interpreter, Page};
pub use recognition::{RecognitionEvent, RecognitionManager, SessionState};
pub use speech::{SpeechQueue, Synthesizer};
