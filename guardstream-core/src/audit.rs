//! Audit channel vocabulary.
//!
//! Every audit write is exactly one newline-terminated line. A failure notice never
//! claims that anything was found.
//!
//! License: MIT OR APACHE 2.0

use std::fmt;

use crate::span::{DetectionPolicy, SpanKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditEvent {
    SessionStarted {
        session_id: String,
        policy: DetectionPolicy,
        detector: String,
    },
    Checking {
        chars: usize,
    },
    /// Result of a successful detector call; an empty list means nothing was found.
    Findings {
        kinds: Vec<SpanKind>,
    },
    DetectorUnavailable {
        reason: String,
        chars: usize,
    },
    Emitted {
        chars: usize,
    },
    Completed {
        flushes: usize,
        items: usize,
        chars_emitted: usize,
    },
    Failed {
        reason: String,
    },
}

impl AuditEvent {
    /// The event as a single newline-terminated line.
    pub fn line(&self) -> String {
        let mut line = self.to_string().replace(['\r', '\n'], " ");
        line.push('\n');
        line
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditEvent::SessionStarted { session_id, policy, detector } => write!(
                f,
                "Guardrail check started: session {}, policy {}, detector {}",
                session_id, policy, detector
            ),
            AuditEvent::Checking { chars } => write!(f, "Checking {} chars...", chars),
            AuditEvent::Findings { kinds } if kinds.is_empty() => f.write_str("No sensitive info found"),
            AuditEvent::Findings { kinds } => {
                let names: Vec<&str> = kinds.iter().map(SpanKind::as_str).collect();
                write!(f, "Found {} item(s): {}", kinds.len(), names.join(", "))
            }
            AuditEvent::DetectorUnavailable { reason, chars } => write!(
                f,
                "Detector unavailable ({}); passing {} chars through unredacted",
                reason, chars
            ),
            AuditEvent::Emitted { chars } => write!(f, "Emitted {} chars", chars),
            AuditEvent::Completed { flushes, items, chars_emitted } => write!(
                f,
                "Guardrail check complete: {} flush(es), {} item(s) redacted, {} chars emitted",
                flushes, items, chars_emitted
            ),
            AuditEvent::Failed { reason } => write!(f, "Guardrail check failed: {}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_findings_lines() {
        let found = AuditEvent::Findings { kinds: vec![SpanKind::Email, SpanKind::Phone] };
        assert_eq!(found.line(), "Found 2 item(s): email, phone\n");
        let none = AuditEvent::Findings { kinds: vec![] };
        assert_eq!(none.line(), "No sensitive info found\n");
    }

    #[test]
    fn test_checking_line() {
        assert_eq!(AuditEvent::Checking { chars: 52 }.line(), "Checking 52 chars...\n");
    }

    #[test]
    fn test_unavailable_line_never_reports_findings() {
        let line = AuditEvent::DetectorUnavailable { reason: "timeout".into(), chars: 10 }.line();
        assert!(!line.contains("Found"));
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn test_multiline_reason_stays_on_one_line() {
        let line = AuditEvent::Failed { reason: "a\nb".into() }.line();
        assert_eq!(line, "Guardrail check failed: a b\n");
    }
}
