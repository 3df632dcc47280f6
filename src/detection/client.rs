//! HTTP client for the detection service

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use tokio::sync::Semaphore;

use crate::config::DetectionConfig;
use crate::detection::{ObstacleSnapshot, PeopleSnapshot};
use crate::error::{Error, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Uploads camera frames for analysis.
///
/// At most one request is in flight at a time; frames arriving while a
/// request is pending are skipped rather than queued, so alerts always
/// describe a recent scene.
pub struct DetectionClient {
    client: reqwest::Client,
    walking_url: String,
    interaction_url: String,
    in_flight: Semaphore,
}

impl DetectionClient {
    /// Build a client from the detection endpoint configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &DetectionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Detection(format!("building http client: {e}")))?;

        Ok(Self {
            client,
            walking_url: config.walking_url.clone(),
            interaction_url: config.interaction_url.clone(),
            in_flight: Semaphore::new(1),
        })
    }

    /// Analyze a frame for obstacles. Returns `None` when a previous
    /// request is still in flight.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is not valid
    /// JSON.
    pub async fn analyze_walking(&self, frame: Vec<u8>) -> Result<Option<ObstacleSnapshot>> {
        let Some(value) = self.post_frame(&self.walking_url, frame).await? else {
            return Ok(None);
        };
        Ok(Some(ObstacleSnapshot::from_json(&value)))
    }

    /// Analyze a frame for people. Returns `None` when a previous request
    /// is still in flight.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is not valid
    /// JSON.
    pub async fn analyze_interaction(&self, frame: Vec<u8>) -> Result<Option<PeopleSnapshot>> {
        let Some(value) = self.post_frame(&self.interaction_url, frame).await? else {
            return Ok(None);
        };
        Ok(Some(PeopleSnapshot::from_json(&value)))
    }

    async fn post_frame(&self, url: &str, frame: Vec<u8>) -> Result<Option<serde_json::Value>> {
        let Ok(_permit) = self.in_flight.try_acquire() else {
            tracing::trace!("detection request already in flight, skipping frame");
            return Ok(None);
        };

        let part = Part::bytes(frame)
            .file_name("frame.jpg")
            .mime_str("image/jpeg")
            .map_err(|e| Error::Detection(format!("building frame part: {e}")))?;
        let form = Form::new().part("file", part);

        let response = self.client.post(url).multipart(form).send().await?;
        if !response.status().is_success() {
            return Err(Error::Detection(format!(
                "detection service returned {}",
                response.status()
            )));
        }

        let value = response.json::<serde_json::Value>().await?;
        tracing::trace!(url = %url, "detection response received");
        Ok(Some(value))
    }
}
