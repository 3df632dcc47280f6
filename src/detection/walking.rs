//! Walking-mode obstacle alerts

use tokio::time::Duration;

use crate::detection::{Distance, EchoBuffer, ObstacleSnapshot, PositionCounts};
use crate::speech::SpeechQueue;

/// Turns obstacle snapshots into spoken alerts.
///
/// Only the highest-priority obstacle per frame is announced; a near
/// obstacle preempts any queued speech. When the scene empties, "path is
/// clear" is announced exactly once.
pub struct WalkingAlerts {
    speech: SpeechQueue,
    echo: EchoBuffer,
    had_obstacles: bool,
    counts: PositionCounts,
}

impl WalkingAlerts {
    #[must_use]
    pub fn new(speech: SpeechQueue, echo_min_elapsed: Duration) -> Self {
        Self {
            speech,
            echo: EchoBuffer::new(echo_min_elapsed),
            had_obstacles: false,
            counts: PositionCounts::default(),
        }
    }

    /// Obstacle counts from the most recent snapshot
    #[must_use]
    pub fn counts(&self) -> PositionCounts {
        self.counts
    }

    /// Process one normalized snapshot
    pub fn observe(&mut self, snapshot: &ObstacleSnapshot) {
        self.counts = snapshot.counts();

        let Some(obstacle) = snapshot.highest_priority() else {
            if self.had_obstacles {
                tracing::info!("path cleared");
                self.speech.speak("Path is clear.", false);
                self.echo.clear();
                self.had_obstacles = false;
            }
            return;
        };

        self.had_obstacles = true;

        let (lead, force) = match obstacle.distance {
            Distance::Near => ("Caution! Obstacle very close to you", true),
            Distance::Medium => ("Obstacle approaching", false),
            Distance::Far => ("Obstacle detected ahead", false),
        };
        let message = format!("{lead}{}", obstacle.position.obstacle_clause());

        tracing::info!(
            label = %obstacle.label,
            distance = ?obstacle.distance,
            position = ?obstacle.position,
            "obstacle alert"
        );
        self.speech.speak(&message, force);
        self.echo.record(message);
    }

    /// Re-announce a persisting alert if the assistant has been quiet
    pub fn echo_tick(&mut self) {
        if let Some(text) = self.echo.due() {
            let text = text.to_string();
            tracing::debug!("repeating obstacle alert");
            self.speech.speak(&text, false);
            self.echo.mark_spoken();
        }
    }

    /// Drop pending alert state after a fetch failure so stale alerts are
    /// not repeated over an unknown scene
    pub fn reset(&mut self) {
        self.echo.clear();
    }
}
