//! Configuration management for ClearPath

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use crate::{Error, Result};
use file::ConfigFile;

/// ClearPath configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Voice (speech recognition and synthesis) configuration
    pub voice: VoiceConfig,

    /// Detection service configuration
    pub detection: DetectionConfig,

    /// Timing parameters for the voice state machine
    pub timing: TimingConfig,
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Enable voice input/output (disable for headless debugging)
    pub enabled: bool,

    /// Speech-to-text endpoint URL
    pub stt_url: String,

    /// STT model identifier
    pub stt_model: String,

    /// Text-to-speech endpoint URL
    pub tts_url: String,

    /// TTS model identifier
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier
    pub tts_speed: f32,

    /// API key for the STT/TTS service (from `CLEARPATH_SPEECH_API_KEY`)
    pub api_key: Option<String>,
}

/// Detection service configuration
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    /// Walking-mode (obstacle) detection endpoint
    pub walking_url: String,

    /// Interaction-mode (people) detection endpoint
    pub interaction_url: String,

    /// Directory the camera process writes JPEG frames into
    pub frame_dir: PathBuf,

    /// Frame interval in walking mode
    pub walking_interval: Duration,

    /// Frame interval in interaction mode
    pub interaction_interval: Duration,
}

/// Timing parameters shared by the speech queue, recognition manager and
/// interpreter. Defaults match the behavior the state machine was tuned for;
/// tests shrink them where useful.
#[derive(Debug, Clone)]
pub struct TimingConfig {
    /// Suppression window for an identical message
    pub exact_suppression: Duration,

    /// Suppression window for a similar (same prefix) message
    pub similar_suppression: Duration,

    /// Gap between consecutive utterances
    pub utterance_gap: Duration,

    /// Baseline delay before restarting recognition
    pub restart_delay: Duration,

    /// Cooldown after a rapid start/stop cycle storm
    pub cooldown_delay: Duration,

    /// Delay between spoken confirmation and mode change
    pub navigation_delay: Duration,

    /// Hard ceiling on how long the command-processing flag may stay set
    pub safety_timeout: Duration,

    /// Idle delay before re-announcing a persistent finding
    pub echo_idle: Duration,

    /// Minimum silence before a re-announcement fires
    pub echo_min_elapsed: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            exact_suppression: Duration::from_millis(5000),
            similar_suppression: Duration::from_millis(3000),
            utterance_gap: Duration::from_millis(300),
            restart_delay: Duration::from_millis(1000),
            cooldown_delay: Duration::from_millis(3000),
            navigation_delay: Duration::from_millis(1200),
            safety_timeout: Duration::from_millis(5000),
            echo_idle: Duration::from_millis(1000),
            echo_min_elapsed: Duration::from_millis(3000),
        }
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            stt_url: "https://api.openai.com/v1/audio/transcriptions".to_string(),
            stt_model: "whisper-1".to_string(),
            tts_url: "https://api.openai.com/v1/audio/speech".to_string(),
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
            tts_speed: 1.0,
            api_key: None,
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            walking_url: "http://127.0.0.1:7860/detect".to_string(),
            interaction_url: "http://127.0.0.1:7861/detect".to_string(),
            frame_dir: PathBuf::from("/tmp/clearpath/frames"),
            walking_interval: Duration::from_millis(1000),
            interaction_interval: Duration::from_millis(1500),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            voice: VoiceConfig::default(),
            detection: DetectionConfig::default(),
            timing: TimingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration: defaults, overlaid by the TOML config file if one
    /// exists, overlaid by environment variables for secrets.
    ///
    /// # Errors
    ///
    /// Returns error if an existing config file cannot be read or parsed.
    pub fn load(path_override: Option<&PathBuf>) -> Result<Self> {
        let mut config = Self::default();

        let path = match path_override {
            Some(p) => Some(p.clone()),
            None => default_config_path(),
        };

        if let Some(path) = path {
            if path.exists() {
                let raw = std::fs::read_to_string(&path)?;
                let overlay: ConfigFile = toml::from_str(&raw)?;
                config.apply_overlay(overlay);
                tracing::debug!(path = %path.display(), "loaded config file");
            } else if path_override.is_some() {
                return Err(Error::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
        }

        if let Ok(key) = std::env::var("CLEARPATH_SPEECH_API_KEY") {
            if !key.is_empty() {
                config.voice.api_key = Some(key);
            }
        }

        Ok(config)
    }

    fn apply_overlay(&mut self, overlay: ConfigFile) {
        let voice = overlay.voice;
        if let Some(v) = voice.enabled {
            self.voice.enabled = v;
        }
        if let Some(v) = voice.stt_url {
            self.voice.stt_url = v;
        }
        if let Some(v) = voice.stt_model {
            self.voice.stt_model = v;
        }
        if let Some(v) = voice.tts_url {
            self.voice.tts_url = v;
        }
        if let Some(v) = voice.tts_model {
            self.voice.tts_model = v;
        }
        if let Some(v) = voice.tts_voice {
            self.voice.tts_voice = v;
        }
        if let Some(v) = voice.tts_speed {
            self.voice.tts_speed = v;
        }

        let detection = overlay.detection;
        if let Some(v) = detection.walking_url {
            self.detection.walking_url = v;
        }
        if let Some(v) = detection.interaction_url {
            self.detection.interaction_url = v;
        }
        if let Some(v) = detection.frame_dir {
            self.detection.frame_dir = v;
        }
        if let Some(v) = detection.walking_interval_ms {
            self.detection.walking_interval = Duration::from_millis(v);
        }
        if let Some(v) = detection.interaction_interval_ms {
            self.detection.interaction_interval = Duration::from_millis(v);
        }
    }
}

/// Default config file location (`~/.config/clearpath/config.toml`)
fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "clearpath", "clearpath")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
