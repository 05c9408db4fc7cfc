use crate::textutil::{content_words, word_count};

pub const DEFAULT_OVERLAP_THRESHOLD: f64 = 0.55;
pub const DEFAULT_MIN_WORDS: usize = 4;

/// Flags translations that still read mostly as English.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detector {
    threshold: f64,
    min_words: usize,
}

impl Default for Detector {
    fn default() -> Self {
        Self::new(DEFAULT_OVERLAP_THRESHOLD, DEFAULT_MIN_WORDS)
    }
}

impl Detector {
    #[must_use]
    pub fn new(threshold: f64, min_words: usize) -> Self {
        Self {
            threshold,
            min_words,
        }
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Share of the distinct English content words that also appear in `candidate`.
    /// `None` when the English text has no content words.
    #[must_use]
    pub fn english_overlap(&self, english: &str, candidate: &str) -> Option<f64> {
        let source = content_words(english);
        if source.is_empty() {
            return None;
        }
        let target = content_words(candidate);
        let shared = source.iter().filter(|w| target.contains(*w)).count();
        Some(shared as f64 / source.len() as f64)
    }

    #[must_use]
    pub fn is_bad(&self, english: &str, candidate: &str) -> bool {
        if english == candidate || word_count(english) < self.min_words {
            return false;
        }
        self.english_overlap(english, candidate)
            .is_some_and(|overlap| overlap > self.threshold)
    }

    /// A replacement is accepted only when it is clearly below the threshold.
    #[must_use]
    pub fn accepts(&self, english: &str, replacement: &str) -> bool {
        self.english_overlap(english, replacement)
            .is_some_and(|overlap| overlap < self.threshold)
    }

    /// `new` may replace `old`: it is accepted and shares strictly fewer English words.
    #[must_use]
    pub fn improves(&self, english: &str, old: &str, new: &str) -> bool {
        if !self.accepts(english, new) {
            return false;
        }
        match (
            self.english_overlap(english, old),
            self.english_overlap(english, new),
        ) {
            (Some(before), Some(after)) => after < before,
            _ => false,
        }
    }
}
