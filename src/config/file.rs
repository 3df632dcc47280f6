//! TOML configuration file loading
//!
//! Supports `~/.config/clearpath/config.toml` as a persistent config source.
//! All fields are optional — the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    /// Voice/audio configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Detection service configuration
    #[serde(default)]
    pub detection: DetectionFileConfig,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Enable voice input/output
    pub enabled: Option<bool>,

    /// STT endpoint URL
    pub stt_url: Option<String>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// TTS endpoint URL
    pub tts_url: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// TTS voice identifier (e.g. "alloy")
    pub tts_voice: Option<String>,

    /// TTS speed multiplier
    pub tts_speed: Option<f32>,
}

/// Detection service configuration
#[derive(Debug, Default, Deserialize)]
pub struct DetectionFileConfig {
    /// Walking-mode (obstacle) detection endpoint
    pub walking_url: Option<String>,

    /// Interaction-mode (people) detection endpoint
    pub interaction_url: Option<String>,

    /// Directory the camera process writes frames into
    pub frame_dir: Option<PathBuf>,

    /// Frame interval in walking mode, milliseconds
    pub walking_interval_ms: Option<u64>,

    /// Frame interval in interaction mode, milliseconds
    pub interaction_interval_ms: Option<u64>,
}
