//! Line tokenization run on the task pool.

use crossbeam_channel::Sender;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::pool::{Task, WaitGuard};

/// One word found on one line of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordHit {
    pub word: String,
    pub file_index: u32,
}

/// Anything outside the Unicode letter (`L`) and number (`N`) categories.
/// Combining marks and letter-like symbols such as `Ⓐ` fall outside both.
static NON_WORD_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("word character pattern is valid"));

/// Strip every character that is not a letter or a digit.
pub fn normalize_word(token: &str) -> String {
    NON_WORD_CHARS.replace_all(token, "").into_owned()
}

/// Split a line on whitespace and normalize each token, skipping tokens that
/// normalize to nothing.
pub fn tokenize_line(line: &str) -> impl Iterator<Item = String> + '_ {
    line.split_whitespace()
        .map(normalize_word)
        .filter(|word| !word.is_empty())
}

/// Tokenizes one line and sends every word, tagged with the line's file
/// index, to the aggregator.
///
/// Holds a completion slot for the running scan until it is dropped.
pub struct TokenizeJob {
    line: String,
    file_index: u32,
    results: Sender<WordHit>,
    _done: WaitGuard,
}

impl TokenizeJob {
    pub fn new(line: String, file_index: u32, results: Sender<WordHit>, done: WaitGuard) -> Self {
        Self {
            line,
            file_index,
            results,
            _done: done,
        }
    }
}

impl Task for TokenizeJob {
    fn execute(&mut self) -> anyhow::Result<()> {
        for word in tokenize_line(&self.line) {
            let hit = WordHit {
                word,
                file_index: self.file_index,
            };
            if self.results.send(hit).is_err() {
                debug!(file_index = self.file_index, "Result channel closed, dropping line");
                break;
            }
        }
        Ok(())
    }

    // Tokenization has no failure path.
    fn on_failure(&mut self, _err: anyhow::Error) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::WaitGroup;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_normalize_strips_punctuation() {
        assert_eq!(normalize_word("World!"), "World");
        assert_eq!(normalize_word("\"quoted\","), "quoted");
        assert_eq!(normalize_word("don't"), "dont");
        assert_eq!(normalize_word("v1.2.3"), "v123");
        assert_eq!(normalize_word("--"), "");
    }

    #[test]
    fn test_normalize_keeps_unicode_letters() {
        assert_eq!(normalize_word("naïve,"), "naïve");
        assert_eq!(normalize_word("日本語。"), "日本語");
        assert_eq!(normalize_word("Привет!"), "Привет");
    }

    #[test]
    fn test_normalize_drops_marks_and_symbols() {
        // CIRCLED LATIN CAPITAL LETTER A is a symbol, not a letter.
        assert_eq!(normalize_word("\u{24B6}x"), "x");
        // Devanagari HA followed by the vowel sign I (a spacing mark).
        assert_eq!(normalize_word("\u{0939}\u{093F}"), "\u{0939}");
        // Combining diaeresis after a base letter.
        assert_eq!(normalize_word("nai\u{0308}ve"), "naive");
        assert_eq!(normalize_word("²x"), "²x");
    }

    #[test]
    fn test_tokenize_line_skips_empty_tokens() {
        let words: Vec<String> = tokenize_line("  Hello, -- World!\tagain ... ").collect();
        assert_eq!(words, vec!["Hello", "World", "again"]);
    }

    #[test]
    fn test_job_emits_every_occurrence_and_releases_slot() {
        let (tx, rx) = unbounded();
        let wg = WaitGroup::new();
        let mut job = TokenizeJob::new("Hello World, World".to_string(), 7, tx, wg.add());
        assert_eq!(wg.pending(), 1);

        job.execute().unwrap();
        drop(job);
        assert_eq!(wg.pending(), 0);

        let hits: Vec<WordHit> = rx.try_iter().collect();
        assert_eq!(
            hits.iter().map(|h| h.word.as_str()).collect::<Vec<_>>(),
            vec!["Hello", "World", "World"]
        );
        assert!(hits.iter().all(|h| h.file_index == 7));
    }

    #[test]
    fn test_job_tolerates_closed_channel() {
        let (tx, rx) = unbounded();
        drop(rx);
        let wg = WaitGroup::new();
        let mut job = TokenizeJob::new("one two".to_string(), 0, tx, wg.add());
        assert!(job.execute().is_ok());
    }
}
