//! Detection snapshots
//!
//! The detection service returns loosely-shaped JSON (`people` as an object
//! or an array of single-key objects, `distance` or `distance_cm`). All of
//! that is normalized here, at the boundary; nothing deeper in the pipeline
//! ever branches on response shape.

use serde::Deserialize;

/// Horizontal position bucket reported by the detection service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Position {
    Left,
    Center,
    Right,
}

impl Position {
    /// Positional clause for obstacle alerts
    #[must_use]
    pub const fn obstacle_clause(self) -> &'static str {
        match self {
            Self::Center => " directly in front of you",
            Self::Left => " to your left",
            Self::Right => " to your right",
        }
    }

    /// Lowercase name used in people announcements
    #[must_use]
    pub const fn lowercase(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }
}

/// Categorical obstacle distance (walking mode)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
pub enum Distance {
    /// Announce immediately, preempting anything queued
    Near,
    Medium,
    Far,
}

/// Per-position counts for the status surface and people announcements
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PositionCounts {
    pub left: usize,
    pub center: usize,
    pub right: usize,
}

impl PositionCounts {
    pub fn add(&mut self, position: Position) {
        match position {
            Position::Left => self.left += 1,
            Position::Center => self.center += 1,
            Position::Right => self.right += 1,
        }
    }
}

/// One obstacle present in the scene (removed entries are dropped during
/// normalization)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Obstacle {
    pub label: String,
    pub distance: Distance,
    pub position: Position,
}

/// Normalized walking-mode snapshot for one frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObstacleSnapshot {
    pub obstacles: Vec<Obstacle>,
}

#[derive(Deserialize)]
struct RawObstacle {
    distance: Option<Distance>,
    position: Option<Position>,
    status: Option<String>,
}

impl ObstacleSnapshot {
    /// Normalize a walking-mode response. Entries marked removed, or with
    /// missing fields, are dropped.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        let mut obstacles = Vec::new();

        if let Some(changes) = value.get("detected_changes").and_then(|v| v.as_object()) {
            for (label, entry) in changes {
                let Ok(raw) = serde_json::from_value::<RawObstacle>(entry.clone()) else {
                    tracing::debug!(label = %label, "skipping malformed obstacle entry");
                    continue;
                };
                if raw.status.as_deref() == Some("Removed") {
                    continue;
                }
                let (Some(distance), Some(position)) = (raw.distance, raw.position) else {
                    continue;
                };
                obstacles.push(Obstacle {
                    label: label.clone(),
                    distance,
                    position,
                });
            }
        }

        Self { obstacles }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    #[must_use]
    pub fn counts(&self) -> PositionCounts {
        let mut counts = PositionCounts::default();
        for obstacle in &self.obstacles {
            counts.add(obstacle.position);
        }
        counts
    }

    /// The single obstacle worth announcing: Near wins over Medium wins
    /// over Far; within a category, first seen wins.
    #[must_use]
    pub fn highest_priority(&self) -> Option<&Obstacle> {
        for wanted in [Distance::Near, Distance::Medium, Distance::Far] {
            if let Some(found) = self.obstacles.iter().find(|o| o.distance == wanted) {
                return Some(found);
            }
        }
        None
    }
}

/// One detected person
#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    pub id: String,
    pub distance_cm: f64,
    pub position: Position,
}

/// Normalized interaction-mode snapshot for one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeopleSnapshot {
    pub people: Vec<Person>,
}

#[derive(Deserialize)]
struct RawPerson {
    distance: Option<f64>,
    distance_cm: Option<f64>,
    position: Option<Position>,
}

impl PeopleSnapshot {
    /// Normalize an interaction-mode response, accepting both the object
    /// form (`{"person1": {..}}`) and the array-of-singletons form
    /// (`[{"person1": {..}}, ..]`), and either distance field name.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        let mut people = Vec::new();

        match value.get("people") {
            Some(serde_json::Value::Array(entries)) => {
                for entry in entries {
                    if let Some(map) = entry.as_object() {
                        for (id, details) in map {
                            push_person(&mut people, id, details);
                        }
                    }
                }
            }
            Some(serde_json::Value::Object(map)) => {
                for (id, details) in map {
                    push_person(&mut people, id, details);
                }
            }
            _ => {}
        }

        Self { people }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    #[must_use]
    pub fn counts(&self) -> PositionCounts {
        let mut counts = PositionCounts::default();
        for person in &self.people {
            counts.add(person.position);
        }
        counts
    }

    /// The closest person by numeric distance; ties keep the first seen
    #[must_use]
    pub fn closest(&self) -> Option<&Person> {
        let mut best: Option<&Person> = None;
        for person in &self.people {
            match best {
                Some(current) if person.distance_cm >= current.distance_cm => {}
                _ => best = Some(person),
            }
        }
        best
    }
}

fn push_person(people: &mut Vec<Person>, id: &str, details: &serde_json::Value) {
    let Ok(raw) = serde_json::from_value::<RawPerson>(details.clone()) else {
        tracing::debug!(id = %id, "skipping malformed person entry");
        return;
    };
    let Some(distance_cm) = raw.distance_cm.or(raw.distance) else {
        return;
    };
    let Some(position) = raw.position else {
        return;
    };
    people.push(Person {
        id: id.to_string(),
        distance_cm,
        position,
    });
}
