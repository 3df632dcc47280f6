//! Interaction-mode people announcements

use tokio::time::Duration;

use crate::detection::{EchoBuffer, PeopleSnapshot, PositionCounts};
use crate::speech::SpeechQueue;

/// Turns people snapshots into spoken announcements: total count, counts
/// per position, and how far away the closest person is. "No people
/// detected" is announced exactly once when the scene empties.
pub struct InteractionAlerts {
    speech: SpeechQueue,
    echo: EchoBuffer,
    had_people: bool,
    counts: PositionCounts,
}

impl InteractionAlerts {
    #[must_use]
    pub fn new(speech: SpeechQueue, echo_min_elapsed: Duration) -> Self {
        Self {
            speech,
            echo: EchoBuffer::new(echo_min_elapsed),
            had_people: false,
            counts: PositionCounts::default(),
        }
    }

    /// People counts from the most recent snapshot
    #[must_use]
    pub fn counts(&self) -> PositionCounts {
        self.counts
    }

    /// Process one normalized snapshot
    pub fn observe(&mut self, snapshot: &PeopleSnapshot) {
        self.counts = snapshot.counts();

        if snapshot.is_empty() {
            if self.had_people {
                tracing::info!("people left the scene");
                self.speech.speak("No people detected nearby", false);
                self.echo.clear();
                self.had_people = false;
            }
            return;
        }

        self.had_people = true;
        let message = describe(snapshot);

        tracing::info!(count = snapshot.people.len(), "people announcement");
        self.speech.speak(&message, false);
        self.echo.record(message);
    }

    /// Re-announce a persisting scene if the assistant has been quiet
    pub fn echo_tick(&mut self) {
        if let Some(text) = self.echo.due() {
            let text = text.to_string();
            tracing::debug!("repeating people announcement");
            self.speech.speak(&text, false);
            self.echo.mark_spoken();
        }
    }

    /// Drop pending announcement state after a fetch failure
    pub fn reset(&mut self) {
        self.echo.clear();
    }
}

fn describe(snapshot: &PeopleSnapshot) -> String {
    let total = snapshot.people.len();
    let noun = if total == 1 { "person" } else { "people" };
    let mut message = format!("Detected {total} {noun}.");

    let counts = snapshot.counts();
    if counts.left > 0 {
        message.push_str(&format!(" {} on your left.", counts.left));
    }
    if counts.center > 0 {
        message.push_str(&format!(" {} in center.", counts.center));
    }
    if counts.right > 0 {
        message.push_str(&format!(" {} on your right.", counts.right));
    }

    if let Some(closest) = snapshot.closest() {
        message.push_str(&format!(
            " Closest person is {} centimeters away on your {}.",
            closest.distance_cm.round(),
            closest.position.lowercase()
        ));
    }

    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_describe_single_person() {
        let snapshot = PeopleSnapshot::from_json(&json!({
            "people": { "person1": { "distance_cm": 149.6, "position": "Center" } }
        }));

        assert_eq!(
            describe(&snapshot),
            "Detected 1 person. 1 in center. Closest person is 150 centimeters away on your center."
        );
    }

    #[test]
    fn test_describe_multiple_positions() {
        let snapshot = PeopleSnapshot::from_json(&json!({
            "people": {
                "person1": { "distance_cm": 200.0, "position": "Left" },
                "person2": { "distance_cm": 80.0, "position": "Right" },
                "person3": { "distance_cm": 310.0, "position": "Left" }
            }
        }));

        assert_eq!(
            describe(&snapshot),
            "Detected 3 people. 2 on your left. 1 on your right. \
             Closest person is 80 centimeters away on your right."
        );
    }
}
