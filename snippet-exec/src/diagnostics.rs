//! Lexical classification of interpreter error output.
//!
//! A line is an error if it contains `"error: "` and otherwise a warning if
//! it contains `"warning: "`. Everything else is left out of the result. The
//! match is a plain substring test, so program output that happens to carry
//! a marker is classified too.

use crate::types::DiagnosticMessage;

const ERROR_MARKER: &str = "error: ";
const WARNING_MARKER: &str = "warning: ";

/// Classify `raw` line by line, keeping stream order and duplicates.
///
/// Lines are split on `\n` only; a `\r` before it stays part of the text.
pub fn classify(raw: &str) -> Vec<DiagnosticMessage> {
    raw.split('\n').filter_map(classify_line).collect()
}

fn classify_line(line: &str) -> Option<DiagnosticMessage> {
    if line.contains(ERROR_MARKER) {
        Some(DiagnosticMessage::error(line))
    } else if line.contains(WARNING_MARKER) {
        Some(DiagnosticMessage::warning(line))
    } else {
        None
    }
}
