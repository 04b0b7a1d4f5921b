use std::sync::LazyLock;

use bloodwork_core::{RawValue, Resolver};
use regex::Regex;
use tracing::trace;

// Label, `:`/`=`/`-` or whitespace separator, first number on the line. Grouped
// numbers (`4,500`, `2,50,000`) are captured whole; any other `,digit` tail rejects
// the line.
static LINE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?P<label>[A-Za-z][A-Za-z0-9 ()/+.,'\-]*?)\s*(?:[:=\-]\s*|\s+)(?P<value>\d{1,3}(?:,\d{2,3})+(?:\.\d+)?|\d+(?:\.\d+)?)(?:[^\d.,]|,\D|,$|$)",
    )
    .unwrap()
});

/// Scan report text line by line for `label value` pairs.
///
/// Only labels that resolve exactly (case-insensitive) are kept. The emitted key is
/// the label as written, so the core resolves it again on its own.
pub fn parse_report_text(text: &str, resolver: &Resolver) -> Vec<(String, RawValue)> {
    let mut parameters = Vec::new();

    for line in text.lines() {
        let Some(captures) = LINE_PATTERN.captures(line) else {
            continue;
        };

        let label = &captures["label"];
        let Some(key) = label_candidates(label)
            .into_iter()
            .find(|candidate| resolver.resolve(candidate).is_some())
        else {
            trace!(line, "no catalog match for label");
            continue;
        };

        let value = captures["value"].replace(',', "");
        let raw = value
            .parse::<f64>()
            .map(RawValue::Number)
            .unwrap_or_else(|_| RawValue::from(value));
        parameters.push((key.to_string(), raw));
    }

    parameters
}

/// `Hemoglobin (Hb)` yields the full label, `Hemoglobin` and `Hb`.
fn label_candidates(label: &str) -> Vec<&str> {
    let full = label.trim();
    let mut candidates = vec![full];

    let stripped = full
        .trim_end_matches(|c: char| matches!(c, '-' | '.' | ',') || c.is_whitespace());
    if stripped != full && !stripped.is_empty() {
        candidates.push(stripped);
    }

    if let Some((before, rest)) = full.split_once('(') {
        let before = before.trim();
        if !before.is_empty() {
            candidates.push(before);
        }
        if let Some((inside, _)) = rest.split_once(')') {
            let inside = inside.trim();
            if !inside.is_empty() {
                candidates.push(inside);
            }
        }
    }

    candidates
}
