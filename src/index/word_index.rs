use roaring::RoaringBitmap;
use rustc_hash::FxHashMap;
use std::time::SystemTime;

/// A file discovered during a scan.
///
/// Its position in the generation's file list is its file index, which is the
/// id stored in the [`WordIndex`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Path relative to the scan root, `/`-separated.
    pub path: String,
    pub modified_at: SystemTime,
}

/// Inverted index mapping a normalized word to the files containing it.
///
/// Each word maps to a roaring bitmap of file indices, so repeated
/// occurrences of a word in one file collapse into a single entry.
#[derive(Debug, Default, Clone)]
pub struct WordIndex {
    words: FxHashMap<String, RoaringBitmap>,
}

impl WordIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `word` occurs in the file at `file_index`.
    /// Returns `true` if this is the first occurrence of the word in that file.
    pub fn insert(&mut self, word: String, file_index: u32) -> bool {
        self.words.entry(word).or_default().insert(file_index)
    }

    /// File indices containing `word`, matched exactly.
    pub fn get(&self, word: &str) -> Option<&RoaringBitmap> {
        self.words.get(word)
    }

    /// Number of distinct words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Total number of (word, file) pairs.
    pub fn num_postings(&self) -> u64 {
        self.words.values().map(RoaringBitmap::len).sum()
    }

    /// Largest file index referenced by any word.
    pub fn max_file_index(&self) -> Option<u32> {
        self.words.values().filter_map(RoaringBitmap::max).max()
    }
}
