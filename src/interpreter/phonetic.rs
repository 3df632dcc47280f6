//! Phonetic similarity for noisy transcripts
//!
//! Speech-to-text regularly mangles the wake phrase and short commands
//! ("walking" → "working", "interaction" → "introduction"). When exact
//! patterns miss, a Soundex-derived word-code comparison catches near
//! matches without accepting unrelated speech.

/// Soundex-style code for one word: first letter preserved, subsequent
/// consonants mapped to digit classes, vowels and h/w/y skipped, adjacent
/// duplicate digits collapsed, padded/truncated to 4 characters.
fn soundex_code(word: &str) -> Option<String> {
    let mut chars = word.chars().filter(|c| c.is_ascii_alphanumeric());
    let first = chars.next()?;

    let mut code = String::with_capacity(4);
    code.push(first.to_ascii_uppercase());

    let mut last_digit = digit_class(first);
    for c in chars {
        if code.len() >= 4 {
            break;
        }
        let Some(digit) = digit_class(c) else {
            // Vowels and h/w/y reset nothing but are not encoded
            last_digit = None;
            continue;
        };
        if Some(digit) != last_digit {
            code.push(digit);
        }
        last_digit = Some(digit);
    }

    while code.len() < 4 {
        code.push('0');
    }

    Some(code)
}

/// Consonant digit class: bfpv→1, cgjkqsxz→2, dt→3, l→4, mn→5, r→6
const fn digit_class(c: char) -> Option<char> {
    match c.to_ascii_lowercase() {
        'b' | 'f' | 'p' | 'v' => Some('1'),
        'c' | 'g' | 'j' | 'k' | 'q' | 's' | 'x' | 'z' => Some('2'),
        'd' | 't' => Some('3'),
        'l' => Some('4'),
        'm' | 'n' => Some('5'),
        'r' => Some('6'),
        _ => None,
    }
}

/// Phonetic similarity between two phrases, 0.0 to 1.0.
///
/// Each word is reduced to its Soundex-like code; the score is the fraction
/// of the first phrase's codes that also appear in the second, divided by
/// the larger code count.
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    let a_codes: Vec<String> = a.split_whitespace().filter_map(soundex_code).collect();
    let b_codes: Vec<String> = b.split_whitespace().filter_map(soundex_code).collect();

    let max_len = a_codes.len().max(b_codes.len());
    if max_len == 0 {
        return 0.0;
    }

    let matches = a_codes.iter().filter(|c| b_codes.contains(c)).count();

    #[allow(clippy::cast_precision_loss)]
    {
        matches as f64 / max_len as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soundex_basics() {
        assert_eq!(soundex_code("robert").as_deref(), Some("R163"));
        assert_eq!(soundex_code("rupert").as_deref(), Some("R163"));
        assert_eq!(soundex_code("assist").as_deref(), Some("A223"));
        assert_eq!(soundex_code("a").as_deref(), Some("A000"));
        assert_eq!(soundex_code("").as_deref(), None);
    }

    #[test]
    fn test_identical_phrases_score_one() {
        assert!((similarity("hi assist ai", "hi assist ai") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unrelated_phrases_score_low() {
        assert!(similarity("hi assist ai", "completely unrelated phrase") < 0.3);
    }

    #[test]
    fn test_symmetry_in_practice() {
        let a = similarity("walking mode", "working mode");
        let b = similarity("working mode", "walking mode");
        assert!((a - b).abs() < f64::EPSILON);
        assert!(a > 0.4);
    }

    #[test]
    fn test_near_miss_wake_phrase() {
        // "hey assist" vs canonical phrase shares most codes
        assert!(similarity("hey assist ai", "hi assist ai") > 0.6);
    }

    #[test]
    fn test_punctuation_ignored() {
        assert!((similarity("hi, assist... ai!", "hi assist ai") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_input() {
        assert!(similarity("", "anything").abs() < f64::EPSILON);
        assert!(similarity("", "").abs() < f64::EPSILON);
    }
}
