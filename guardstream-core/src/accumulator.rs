//! Buffers incoming deltas and decides when a segment is ready for validation.
//!
//! The accumulator only decides. Flushing is done by the driver, which takes the
//! buffer with [`Accumulator::take`].

use regex::Regex;

use crate::config::FlushConfig;
use crate::errors::GuardError;

/// When a buffered segment should be flushed.
#[derive(Debug, Clone)]
pub enum FlushPolicy {
    /// Flush once the buffer holds `size_threshold` chars.
    SizeOnly { size_threshold: usize },
    /// Flush on size, or earlier once `min_chars` are buffered and the buffer
    /// contains a sentence boundary.
    SizeOrSentence {
        size_threshold: usize,
        boundary: Regex,
        min_chars: usize,
    },
}

impl FlushPolicy {
    pub fn size_only(size_threshold: usize) -> Self {
        FlushPolicy::SizeOnly { size_threshold }
    }

    pub fn size_or_sentence(size_threshold: usize, pattern: &str, min_chars: usize) -> Result<Self, GuardError> {
        let boundary =
            Regex::new(pattern).map_err(|e| GuardError::InvalidPattern("flush.sentence".to_string(), e))?;
        Ok(FlushPolicy::SizeOrSentence { size_threshold, boundary, min_chars })
    }

    pub fn from_config(config: &FlushConfig) -> Result<Self, GuardError> {
        match &config.sentence {
            Some(sentence) => Self::size_or_sentence(config.size_threshold, &sentence.pattern, sentence.min_chars),
            None => Ok(Self::size_only(config.size_threshold)),
        }
    }

    pub fn size_threshold(&self) -> usize {
        match self {
            FlushPolicy::SizeOnly { size_threshold } | FlushPolicy::SizeOrSentence { size_threshold, .. } => {
                *size_threshold
            }
        }
    }
}

/// The pending, not-yet-validated text of one session.
#[derive(Debug, Clone)]
pub struct Accumulator {
    policy: FlushPolicy,
    pending: String,
    pending_chars: usize,
}

impl Accumulator {
    pub fn new(policy: FlushPolicy) -> Self {
        Self { policy, pending: String::new(), pending_chars: 0 }
    }

    pub fn append(&mut self, delta: &str) {
        self.pending.push_str(delta);
        self.pending_chars += delta.chars().count();
    }

    /// Evaluated after every append. The sentence check scans the whole buffer.
    pub fn should_flush(&self) -> bool {
        match &self.policy {
            FlushPolicy::SizeOnly { size_threshold } => self.pending_chars >= *size_threshold,
            FlushPolicy::SizeOrSentence { size_threshold, boundary, min_chars } => {
                self.pending_chars >= *size_threshold
                    || (self.pending_chars >= *min_chars && boundary.is_match(&self.pending))
            }
        }
    }

    /// Hands the buffer to the caller and leaves it empty.
    pub fn take(&mut self) -> String {
        self.pending_chars = 0;
        std::mem::take(&mut self.pending)
    }

    pub fn pending(&self) -> &str {
        &self.pending
    }

    pub fn pending_chars(&self) -> usize {
        self.pending_chars
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn policy(&self) -> &FlushPolicy {
        &self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_only_flushes_at_threshold() {
        let mut acc = Accumulator::new(FlushPolicy::size_only(10));
        acc.append("12345");
        assert!(!acc.should_flush());
        acc.append("6789");
        assert!(!acc.should_flush());
        acc.append("0");
        assert!(acc.should_flush());
    }

    #[test]
    fn test_size_counts_chars_not_bytes() {
        let mut acc = Accumulator::new(FlushPolicy::size_only(4));
        acc.append("héé");
        assert_eq!(acc.pending_chars(), 3);
        assert!(!acc.should_flush());
        acc.append("€");
        assert!(acc.should_flush());
    }

    #[test]
    fn test_sentence_boundary_needs_min_chars() {
        let policy = FlushPolicy::size_or_sentence(100, r"[.!?]\s", 12).unwrap();
        let mut acc = Accumulator::new(policy);
        acc.append("Hi. ");
        assert!(!acc.should_flush(), "boundary present but below min_chars");
        acc.append("more words");
        assert!(acc.should_flush(), "earlier boundary counts once min_chars is met");
    }

    #[test]
    fn test_sentence_policy_still_flushes_on_size() {
        let policy = FlushPolicy::size_or_sentence(8, r"[.!?]\s", 4).unwrap();
        let mut acc = Accumulator::new(policy);
        acc.append("no boundary");
        assert!(acc.should_flush());
    }

    #[test]
    fn test_take_clears_buffer() {
        let mut acc = Accumulator::new(FlushPolicy::size_only(3));
        acc.append("abcd");
        assert_eq!(acc.take(), "abcd");
        assert!(acc.is_empty());
        assert_eq!(acc.pending_chars(), 0);
        assert!(!acc.should_flush());
    }
}
