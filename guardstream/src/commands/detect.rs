//! `guardstream detect`: run the configured detector once over the whole input.
//!
//! Values are never printed verbatim; each item shows its kind, a masked value and a
//! short fingerprint so repeated values can be correlated.

use anyhow::{Context, Result};
use is_terminal::IsTerminal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use tokio::io::AsyncReadExt;

use guardstream_core::{build_detector, mask_value, span_fingerprint, DetectedSpan, Detector, SpanKind};

use crate::cli::DetectCommand;
use crate::commands::load_config;
use crate::ui::output_format::paint;
use crate::ui::theme::{ThemeEntry, ThemeMap};

#[derive(Debug, Serialize)]
pub struct DetectionItem {
    pub kind: SpanKind,
    pub masked_value: String,
    pub fingerprint: String,
}

#[derive(Debug, Serialize)]
pub struct DetectionReport {
    pub detector: String,
    pub policy: String,
    pub chars_checked: usize,
    pub total: usize,
    pub by_kind: BTreeMap<SpanKind, usize>,
    pub items: Vec<DetectionItem>,
}

impl DetectionReport {
    pub fn new(detector: &str, policy: &str, text: &str, spans: &[DetectedSpan]) -> Self {
        let mut by_kind = BTreeMap::new();
        let items = spans
            .iter()
            .filter(|s| s.is_actionable())
            .map(|span| {
                *by_kind.entry(span.kind).or_insert(0) += 1;
                DetectionItem {
                    kind: span.kind,
                    masked_value: mask_value(&span.value),
                    fingerprint: span_fingerprint(span)[..12].to_string(),
                }
            })
            .collect::<Vec<_>>();
        Self {
            detector: detector.to_string(),
            policy: policy.to_string(),
            chars_checked: text.chars().count(),
            total: items.len(),
            by_kind,
            items,
        }
    }
}

pub async fn run_detect(cmd: &DetectCommand, theme: &ThemeMap) -> Result<DetectionReport> {
    let config = load_config(&cmd.detector)?;
    config.validate()?;
    let detector = build_detector(&config)?;

    let text = match &cmd.input {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read input file {}", path.display()))?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("Failed to read stdin")?;
            buf
        }
    };

    let spans = detector
        .detect(&text)
        .await
        .with_context(|| format!("Detector '{}' failed", detector.name()))?;
    let report = DetectionReport::new(detector.name(), config.detector.policy.as_str(), &text, &spans);

    let mut stdout = std::io::stdout().lock();
    if cmd.json {
        serde_json::to_writer_pretty(&mut stdout, &report).context("Failed to write JSON report")?;
        writeln!(stdout)?;
    } else {
        print_report(&mut stdout, &report, theme, std::io::stdout().is_terminal())?;
    }
    Ok(report)
}

fn print_report<W: Write>(out: &mut W, report: &DetectionReport, theme: &ThemeMap, enable_colors: bool) -> Result<()> {
    let header = format!(
        "Detector '{}' (policy {}) checked {} chars: {} item(s) found",
        report.detector, report.policy, report.chars_checked, report.total
    );
    writeln!(out, "{}", paint(&header, ThemeEntry::Header, theme, enable_colors))?;
    for (kind, count) in &report.by_kind {
        writeln!(
            out,
            "  {}: {}",
            paint(kind.as_str(), ThemeEntry::Finding, theme, enable_colors),
            paint(&count.to_string(), ThemeEntry::Count, theme, enable_colors)
        )?;
    }
    for item in &report.items {
        writeln!(out, "    - {} {} ({})", item.kind, item.masked_value, item.fingerprint)?;
    }
    Ok(())
}
