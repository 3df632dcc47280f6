//! Speech synthesis engines
//!
//! The queue only talks to the [`Synthesizer`] trait so the rest of the
//! system degrades predictably when no synthesis backend is usable.

use std::sync::Arc;

use async_trait::async_trait;

use crate::audio::AudioPlayback;
use crate::config::VoiceConfig;
use crate::{Error, Result};

/// A speech synthesis backend.
///
/// `speak` resolves when the utterance has finished playing (or failed);
/// `cancel` interrupts whatever is currently audible.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Whether this backend can produce audio at all
    fn available(&self) -> bool {
        true
    }

    /// Synthesize and play one utterance to completion
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or playback fails
    async fn speak(&self, text: &str) -> Result<()>;

    /// Interrupt the in-progress utterance, if any
    fn cancel(&self);
}

/// HTTP TTS backend: synthesizes MP3 via a speech endpoint and plays it on
/// the default output device.
pub struct HttpSynthesizer {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    voice: String,
    speed: f32,
    playback: Arc<AudioPlayback>,
}

impl HttpSynthesizer {
    /// Create a new HTTP synthesizer
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing or no output device exists
    pub fn new(config: &VoiceConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| Error::Config("speech API key required for TTS".to_string()))?;

        Ok(Self {
            client: reqwest::Client::new(),
            url: config.tts_url.clone(),
            api_key,
            model: config.tts_model.clone(),
            voice: config.tts_voice.clone(),
            speed: config.tts_speed,
            playback: Arc::new(AudioPlayback::new()?),
        })
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
        }

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            speed: self.speed,
        };

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Speech(format!("TTS error {status}: {body}")));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl Synthesizer for HttpSynthesizer {
    async fn speak(&self, text: &str) -> Result<()> {
        tracing::debug!(chars = text.len(), "synthesizing utterance");
        let mp3 = self.synthesize(text).await?;

        let playback = Arc::clone(&self.playback);
        tokio::task::spawn_blocking(move || playback.play_mp3(&mp3))
            .await
            .map_err(|e| Error::Speech(format!("playback task failed: {e}")))?
    }

    fn cancel(&self) {
        self.playback.interrupt();
    }
}

/// Degraded backend used when synthesis is impossible (no device, no key).
///
/// Reports itself unavailable so the queue routes forced messages to the
/// fallback status channel instead of dropping them silently.
pub struct NullSynthesizer;

#[async_trait]
impl Synthesizer for NullSynthesizer {
    fn available(&self) -> bool {
        false
    }

    async fn speak(&self, _text: &str) -> Result<()> {
        Err(Error::Speech("synthesizer unavailable".to_string()))
    }

    fn cancel(&self) {}
}
