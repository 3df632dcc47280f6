//! Wake phrase and command intent matching
//!
//! All matching happens on finalized, lowercased transcripts. Intents are
//! tested in a fixed priority order; within each intent the tiers run from
//! strict to loose: exact regex, phonetic similarity, bare short form,
//! substring containment.

use std::sync::LazyLock;

use regex::Regex;

use crate::interpreter::phonetic::similarity;

/// Phonetic threshold for accepting a wake phrase
const WAKE_PHONETIC_THRESHOLD: f64 = 0.7;

/// Phonetic threshold for accepting a command
const COMMAND_PHONETIC_THRESHOLD: f64 = 0.6;

/// A classified spoken command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Home,
    About,
    Help,
    WalkingMode,
    InteractionMode,
    Deactivate,
}

/// Application views reachable by voice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Home,
    About,
    HowToUse,
    WalkingMode,
    InteractionMode,
}

impl Page {
    /// Route path for the view
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::About => "/about",
            Self::HowToUse => "/how-to-use",
            Self::WalkingMode => "/walking-mode",
            Self::InteractionMode => "/interaction-mode",
        }
    }
}

impl Intent {
    /// Spoken confirmation for this intent
    #[must_use]
    pub const fn confirmation(self) -> &'static str {
        match self {
            Self::Home => "Going to home page",
            Self::About => "Going to about page",
            Self::Help => "Going to how to use page",
            Self::WalkingMode => "Activating walking mode",
            Self::InteractionMode => "Activating interaction mode",
            Self::Deactivate => "Deactivating voice assistant",
        }
    }

    /// The page this intent navigates to, if any
    #[must_use]
    pub const fn page(self) -> Option<Page> {
        match self {
            Self::Home => Some(Page::Home),
            Self::About => Some(Page::About),
            Self::Help => Some(Page::HowToUse),
            Self::WalkingMode => Some(Page::WalkingMode),
            Self::InteractionMode => Some(Page::InteractionMode),
            Self::Deactivate => None,
        }
    }
}

struct IntentPatterns {
    intent: Intent,
    regexes: Vec<Regex>,
    /// Canonical phrases for the phonetic fallback
    canonical: &'static [&'static str],
    /// Whole-transcript short forms
    short_forms: &'static [&'static str],
    /// Loosest tier: plain containment
    substrings: &'static [&'static str],
}

static WAKE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(hi|hey|hello)\s+(assistant|assist)(\s+ai)?\b").expect("valid regex")
});

/// Canonical wake phrases for the phonetic fallback
const WAKE_CANONICAL: &[&str] = &["hi assist ai", "hi assistant", "hey assist ai"];

static INTENTS: LazyLock<Vec<IntentPatterns>> = LazyLock::new(|| {
    let rx = |pattern: &str| Regex::new(pattern).expect("valid regex");

    // Priority order is load-bearing: first match wins
    vec![
        IntentPatterns {
            intent: Intent::Home,
            regexes: vec![rx(r"\b(go\s+to\s+home|home\s+page|go\s+home|homepage)\b")],
            canonical: &["go to home", "home page", "go home"],
            short_forms: &["home"],
            substrings: &["home"],
        },
        IntentPatterns {
            intent: Intent::About,
            regexes: vec![rx(
                r"\b(about\s+page|tell\s+about|about\s+you|tell\s+me\s+about\s+you)\b",
            )],
            canonical: &["about", "about page", "tell about you"],
            short_forms: &["about"],
            substrings: &["about"],
        },
        IntentPatterns {
            intent: Intent::Help,
            regexes: vec![rx(r"\b(how\s+to\s+use|help|instructions|guide|tutorial)\b")],
            canonical: &["how to use", "help", "instructions"],
            short_forms: &["help", "how to use"],
            substrings: &["how to use"],
        },
        IntentPatterns {
            intent: Intent::WalkingMode,
            regexes: vec![rx(
                r"\b(walking\s+mode|activate\s+walking|start\s+walking|working\s+mode|walking)\b",
            )],
            canonical: &["walking mode", "working mode", "walk mode"],
            short_forms: &["walking", "walking mode", "working"],
            substrings: &["walking"],
        },
        IntentPatterns {
            intent: Intent::InteractionMode,
            regexes: vec![
                rx(r"\b(interaction\s+mode|activate\s+interaction|start\s+interaction|interaction)\b"),
                // Common STT mishearings
                rx(r"\b(introduction|intraction|induction)\s+mode\b"),
            ],
            canonical: &["interaction mode", "introduction mode", "intraction mode"],
            short_forms: &["interaction", "interaction mode"],
            substrings: &["interaction", "introduction"],
        },
        IntentPatterns {
            intent: Intent::Deactivate,
            regexes: vec![rx(r"\b(deactivate|stop\s+listening|turn\s+off|exit|quit)\b")],
            canonical: &["deactivate", "stop listening", "turn off"],
            short_forms: &["deactivate"],
            substrings: &[],
        },
    ]
});

/// Check a transcript for the wake phrase
#[must_use]
pub fn is_wake_phrase(transcript: &str) -> bool {
    if WAKE_REGEX.is_match(transcript) {
        return true;
    }
    WAKE_CANONICAL
        .iter()
        .any(|phrase| similarity(transcript, phrase) > WAKE_PHONETIC_THRESHOLD)
}

/// Reject transcripts that are echoes of the assistant's own speech picked
/// up through speaker leakage
#[must_use]
pub fn is_self_speech(transcript: &str) -> bool {
    (transcript.contains("welcome to") && transcript.contains("clearpath"))
        || (transcript.contains("i'm listening") && transcript.contains("command"))
        || ((transcript.contains("activating") || transcript.contains("activated"))
            && (transcript.contains("walking mode") || transcript.contains("interaction mode")))
}

/// Classify a transcript into an intent.
///
/// Intents are tried in priority order (home, about, help, walking,
/// interaction, deactivate); the first match wins.
#[must_use]
pub fn classify(transcript: &str) -> Option<Intent> {
    let trimmed = transcript.trim();

    for patterns in INTENTS.iter() {
        let matched = patterns.regexes.iter().any(|r| r.is_match(trimmed))
            || patterns
                .canonical
                .iter()
                .any(|phrase| similarity(trimmed, phrase) > COMMAND_PHONETIC_THRESHOLD)
            || patterns.short_forms.contains(&trimmed)
            || patterns.substrings.iter().any(|s| trimmed.contains(s));

        if matched {
            return Some(patterns.intent);
        }
    }

    None
}
