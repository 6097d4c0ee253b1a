//! The carry tail: trailing sanitized text held back between flushes.
//!
//! Each validation checks `carry_tail + pending`. After redaction the last `N`
//! chars of the result are held as the new tail and everything before them is
//! emitted, so a span cut at a flush boundary is still seen whole by the next
//! detector call and no character is ever written twice.
//!
//! The cut never lands inside a redaction marker: when the last `N` chars would
//! start mid-marker, the tail shrinks to begin right after that marker.

/// Splits `s` into (head, tail) where tail is the last `n` chars of `s`.
pub fn split_tail(s: &str, n: usize) -> (&str, &str) {
    if n == 0 {
        return (s, "");
    }
    match s.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => s.split_at(idx),
        None => ("", s),
    }
}

/// Moves `cut` forward past any marker occurrence it would split.
fn cut_outside_markers(s: &str, mut cut: usize, markers: &[String]) -> usize {
    loop {
        let straddled = markers
            .iter()
            .flat_map(|marker| s.match_indices(marker.as_str()))
            .map(|(start, found)| (start, start + found.len()))
            .filter(|(start, end)| *start < cut && cut < *end)
            .map(|(_, end)| end)
            .max();
        match straddled {
            Some(end) => cut = end,
            None => return cut,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BoundaryTracker {
    overlap_chars: usize,
    carry_tail: String,
    markers: Vec<String>,
}

impl BoundaryTracker {
    pub fn new(overlap_chars: usize) -> Self {
        Self { overlap_chars, carry_tail: String::new(), markers: Vec::new() }
    }

    /// Marker strings the tail must never split.
    pub fn with_markers(mut self, markers: &[String]) -> Self {
        self.markers = markers.to_vec();
        self
    }

    /// Text to hand to the detector for this cycle.
    pub fn compose(&self, pending: &str) -> String {
        let mut text = String::with_capacity(self.carry_tail.len() + pending.len());
        text.push_str(&self.carry_tail);
        text.push_str(pending);
        text
    }

    /// Holds back the last `N` chars of `sanitized` and returns the rest for emission.
    pub fn advance(&mut self, sanitized: &str) -> String {
        let (head, _) = split_tail(sanitized, self.overlap_chars);
        let cut = cut_outside_markers(sanitized, head.len(), &self.markers);
        let (head, tail) = sanitized.split_at(cut);
        self.carry_tail = tail.to_string();
        head.to_string()
    }

    /// Final pass: returns all of `sanitized` and clears the tail.
    pub fn finish(&mut self, sanitized: String) -> String {
        self.carry_tail.clear();
        sanitized
    }

    /// Releases the held tail without another validation.
    pub fn release(&mut self) -> String {
        std::mem::take(&mut self.carry_tail)
    }

    pub fn carry_tail(&self) -> &str {
        &self.carry_tail
    }

    pub fn overlap_chars(&self) -> usize {
        self.overlap_chars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_tail() {
        assert_eq!(split_tail("abcdef", 2), ("abcd", "ef"));
        assert_eq!(split_tail("ab", 5), ("", "ab"));
        assert_eq!(split_tail("abc", 0), ("abc", ""));
        assert_eq!(split_tail("xéé€", 2), ("xé", "é€"));
    }

    #[test]
    fn test_tail_never_exceeds_overlap() {
        let mut tracker = BoundaryTracker::new(4);
        let emitted = tracker.advance("hello world");
        assert_eq!(emitted, "hello w");
        assert_eq!(tracker.carry_tail(), "orld");
        assert!(tracker.carry_tail().chars().count() <= tracker.overlap_chars());
    }

    #[test]
    fn test_tail_never_starts_inside_a_marker() {
        let mut tracker = BoundaryTracker::new(8).with_markers(&["[REDACTED:EMAIL]".to_string()]);
        let emitted = tracker.advance("mail [REDACTED:EMAIL].");
        assert_eq!(emitted, "mail [REDACTED:EMAIL]");
        assert_eq!(tracker.carry_tail(), ".");
    }

    #[test]
    fn test_whole_marker_may_sit_in_tail() {
        let mut tracker = BoundaryTracker::new(6).with_markers(&["[X]".to_string()]);
        assert_eq!(tracker.advance("abcd[X]xyz"), "abcd");
        assert_eq!(tracker.carry_tail(), "[X]xyz");

        let mut tracker = BoundaryTracker::new(2).with_markers(&["[X]".to_string()]);
        assert_eq!(tracker.advance("ab[X]"), "ab[X]");
        assert_eq!(tracker.carry_tail(), "");
    }

    #[test]
    fn test_compose_prepends_tail() {
        let mut tracker = BoundaryTracker::new(3);
        tracker.advance("abcdef");
        assert_eq!(tracker.compose("ghi"), "defghi");
    }

    #[test]
    fn test_emissions_reconstruct_text_once() {
        let mut tracker = BoundaryTracker::new(3);
        let mut out = String::new();
        for chunk in ["abcde", "fgh", "ij"] {
            let text = tracker.compose(chunk);
            out.push_str(&tracker.advance(&text));
        }
        out.push_str(&tracker.release());
        assert_eq!(out, "abcdefghij");
        assert!(tracker.carry_tail().is_empty());
    }
}
