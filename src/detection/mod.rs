//! Camera-frame detection pipeline
//!
//! Frames come from a [`FrameSource`], go to the detection service over
//! HTTP, and the normalized results drive spoken alerts for whichever mode
//! is active. Walking mode announces obstacles by priority; interaction
//! mode announces people counts and the closest person.

mod client;
mod interaction;
mod types;
mod walking;

pub use client::DetectionClient;
pub use interaction::InteractionAlerts;
pub use types::{
    Distance, Obstacle, ObstacleSnapshot, PeopleSnapshot, Person, Position, PositionCounts,
};
pub use walking::WalkingAlerts;

use std::path::PathBuf;
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Supplies camera frames to the detection loop
#[async_trait]
pub trait FrameSource: Send {
    /// Next frame as JPEG bytes, or `None` when no new frame is available
    async fn next_frame(&mut self) -> Result<Option<Vec<u8>>>;
}

/// Reads the newest JPEG from a spool directory the camera process writes
/// into. A frame is only returned once; the modification time tracks which
/// frames have been consumed.
pub struct DirFrameSource {
    dir: PathBuf,
    last_modified: Option<SystemTime>,
}

impl DirFrameSource {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            last_modified: None,
        }
    }
}

#[async_trait]
impl FrameSource for DirFrameSource {
    async fn next_frame(&mut self) -> Result<Option<Vec<u8>>> {
        let mut newest: Option<(SystemTime, PathBuf)> = None;

        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| Error::Detection(format!("reading frame directory: {e}")))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::Detection(format!("reading frame directory: {e}")))?
        {
            let path = entry.path();
            let is_jpeg = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"));
            if !is_jpeg {
                continue;
            }

            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            let Ok(modified) = metadata.modified() else {
                continue;
            };

            if newest.as_ref().is_none_or(|(t, _)| modified > *t) {
                newest = Some((modified, path));
            }
        }

        let Some((modified, path)) = newest else {
            return Ok(None);
        };
        if self.last_modified.is_some_and(|seen| modified <= seen) {
            return Ok(None);
        }

        let bytes = tokio::fs::read(&path).await?;
        self.last_modified = Some(modified);
        tracing::trace!(frame = %path.display(), bytes = bytes.len(), "frame picked up");
        Ok(Some(bytes))
    }
}

/// Remembers the last alert so it can be repeated while the condition
/// persists and the assistant has been quiet for a while
pub struct EchoBuffer {
    last: Option<String>,
    last_spoken_at: Option<Instant>,
    min_elapsed: Duration,
}

impl EchoBuffer {
    #[must_use]
    pub fn new(min_elapsed: Duration) -> Self {
        Self {
            last: None,
            last_spoken_at: None,
            min_elapsed,
        }
    }

    /// Remember `text` as the current alert, spoken just now
    pub fn record(&mut self, text: impl Into<String>) {
        self.last = Some(text.into());
        self.last_spoken_at = Some(Instant::now());
    }

    /// The alert due for re-announcement, if enough quiet time has passed
    #[must_use]
    pub fn due(&self) -> Option<&str> {
        let text = self.last.as_deref()?;
        let spoken_at = self.last_spoken_at?;
        (spoken_at.elapsed() >= self.min_elapsed).then_some(text)
    }

    /// Refresh the timestamp after a re-announcement
    pub fn mark_spoken(&mut self) {
        self.last_spoken_at = Some(Instant::now());
    }

    /// Forget the current alert (the condition cleared)
    pub fn clear(&mut self) {
        self.last = None;
        self.last_spoken_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_echo_due_after_min_elapsed() {
        let mut echo = EchoBuffer::new(Duration::from_millis(3000));
        echo.record("Obstacle approaching to your left");

        assert_eq!(echo.due(), None);

        tokio::time::advance(Duration::from_millis(3001)).await;
        assert_eq!(echo.due(), Some("Obstacle approaching to your left"));

        echo.mark_spoken();
        assert_eq!(echo.due(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_echo_clear() {
        let mut echo = EchoBuffer::new(Duration::from_millis(3000));
        echo.record("Detected 2 people.");
        echo.clear();

        tokio::time::advance(Duration::from_millis(5000)).await;
        assert_eq!(echo.due(), None);
    }
}
