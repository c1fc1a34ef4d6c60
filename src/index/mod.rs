pub mod tokenize;
pub mod word_index;

pub use tokenize::{normalize_word, tokenize_line, TokenizeJob, WordHit};
pub use word_index::{FileRecord, WordIndex};
