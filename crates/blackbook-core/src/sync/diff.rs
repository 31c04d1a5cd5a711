//! Human-readable diffs between source and target content

use similar::TextDiff;

/// Unified diff of two contents, labelled `a/<label>` and `b/<label>`.
///
/// Content that is not valid UTF-8 on either side is reported as binary.
pub fn unified_diff(label: &str, old: &[u8], new: &[u8]) -> String {
    match (std::str::from_utf8(old), std::str::from_utf8(new)) {
        (Ok(old), Ok(new)) => TextDiff::from_lines(old, new)
            .unified_diff()
            .context_radius(3)
            .header(&format!("a/{label}"), &format!("b/{label}"))
            .to_string(),
        _ => format!("Binary files a/{label} and b/{label} differ\n"),
    }
}
