//! Line-level diff of expected and actual artifacts.

use goldcheck_schema::ArtifactDiff;
use similar::TextDiff;

/// Describe how `actual` differs from `expected`, or `None` when equal.
///
/// Both sides should already be normalized.
pub fn diff_artifacts(path: &str, expected: &str, actual: &str) -> Option<ArtifactDiff> {
    if expected == actual {
        return None;
    }

    let expected_lines: Vec<&str> = expected.lines().collect();
    let actual_lines: Vec<&str> = actual.lines().collect();

    let first_diff = expected_lines
        .iter()
        .zip(actual_lines.iter())
        .position(|(e, a)| e != a)
        .unwrap_or_else(|| expected_lines.len().min(actual_lines.len()));

    let unified = TextDiff::from_lines(expected, actual)
        .unified_diff()
        .context_radius(3)
        .header(&format!("expected/{path}"), &format!("actual/{path}"))
        .to_string();

    Some(ArtifactDiff {
        first_diff_line: first_diff + 1,
        expected_excerpt: expected_lines.get(first_diff).map(|s| s.to_string()),
        actual_excerpt: actual_lines.get(first_diff).map(|s| s.to_string()),
        expected_lines: expected_lines.len(),
        actual_lines: actual_lines.len(),
        unified,
    })
}
