//! Transcript interpretation for the holdline automation.
//!
//! Provider speech recognition is noisy: verification codes arrive as digit
//! words ("four two five"), sometimes with stray digits misrecognized around
//! them. The heuristic here bets that in an utterance containing the word
//! "code", the code itself is the dominant numeric content, so after mapping
//! digit words to digits we keep the longest contiguous digit run.
//!
//! Everything in this crate is deterministic and side-effect free.

use tracing::debug;

/// Word-to-digit substitutions applied before digit-run extraction.
const WORD_DIGITS: [(&str, &str); 10] = [
    ("zero", "0"),
    ("one", "1"),
    ("two", "2"),
    ("three", "3"),
    ("four", "4"),
    ("five", "5"),
    ("six", "6"),
    ("seven", "7"),
    ("eight", "8"),
    ("nine", "9"),
];

/// Lowercases a transcript and collapses runs of whitespace to single spaces.
///
/// All matching in this crate (and in the state machine's phrase checks)
/// operates on this normalized form.
pub fn normalize(transcript: &str) -> String {
    transcript
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extracts a verification code from a transcript.
///
/// Only attempted when the transcript contains the word "code". Digit words
/// are substituted (zero..nine), interior whitespace is stripped so adjacent
/// digit words concatenate into one run, and the longest maximal run of
/// digit characters wins, ties going to the earliest run. Returns `None`
/// when the transcript never mentions "code" or contains no digits at all.
pub fn extract_code(transcript: &str) -> Option<String> {
    let mut speech = normalize(transcript);
    if !speech.contains("code") {
        return None;
    }

    for (word, digit) in WORD_DIGITS {
        speech = speech.replace(word, digit);
    }
    speech.retain(|c| c != ' ');

    let mut best: Option<&str> = None;
    let mut runs = Vec::new();
    let bytes = speech.as_bytes();
    let mut start = None;
    for (i, b) in bytes.iter().enumerate() {
        match (b.is_ascii_digit(), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                runs.push(&speech[s..i]);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push(&speech[s..]);
    }
    debug!(?runs, "digit runs found in transcript");
    for run in runs {
        if best.map_or(true, |b| run.len() > b.len()) {
            best = Some(run);
        }
    }

    best.map(|code| code.chars().filter(|c| c.is_alphanumeric()).collect())
}

/// Returns true when the normalized transcript contains any of the given
/// phrases as a substring. Phrases are expected in lowercase.
pub fn contains_any<S: AsRef<str>>(transcript: &str, phrases: &[S]) -> bool {
    let speech = normalize(transcript);
    phrases.iter().any(|p| speech.contains(p.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_and_collapses_whitespace() {
        assert_eq!(normalize("Please   Call\tAgain"), "please call again");
        assert_eq!(normalize("  banana  "), "banana");
    }

    #[test]
    fn extracts_code_from_digit_words() {
        assert_eq!(
            extract_code("your verification code is four two five"),
            Some("425".to_string())
        );
    }

    #[test]
    fn extracts_code_from_spaced_digits() {
        assert_eq!(extract_code("verification code 4 2 5"), Some("425".to_string()));
    }

    #[test]
    fn longest_run_wins_over_stray_digits() {
        // "four two five" concatenates into one run; "plus one" contributes
        // a separate shorter run that must lose.
        assert_eq!(
            extract_code("your code is four two five plus one"),
            Some("425".to_string())
        );
    }

    #[test]
    fn ties_break_to_first_run() {
        assert_eq!(extract_code("code 12 then 34"), Some("12".to_string()));
    }

    #[test]
    fn no_code_word_means_no_extraction() {
        assert_eq!(extract_code("your number is four two five"), None);
        assert_eq!(extract_code("1 2 3 4 5"), None);
    }

    #[test]
    fn code_word_without_digits_means_no_extraction() {
        assert_eq!(extract_code("a code will be read shortly"), None);
    }

    #[test]
    fn mixed_words_and_digits_concatenate() {
        assert_eq!(
            extract_code("code is six 7 eight"),
            Some("678".to_string())
        );
    }

    #[test]
    fn contains_any_is_case_and_whitespace_insensitive() {
        let phrases = ["goodbye", "please call again"];
        assert!(contains_any("Please   Call Again", &phrases));
        assert!(contains_any("GOODBYE now", &phrases));
        assert!(!contains_any("hold the line", &phrases));
    }

    #[test]
    fn contains_any_matches_embedded_keyword() {
        assert!(contains_any("let me get you to a banana", &["banana"]));
    }
}
