//! Artifact normalization applied to both sides before comparison.

/// Normalize artifact text.
///
/// Line endings become `\n`, trailing spaces and tabs are removed from every
/// line, trailing blank lines are dropped, and a non-empty result ends with
/// exactly one newline.
pub fn normalize(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut lines: Vec<&str> = unified
        .split('\n')
        .map(|line| line.trim_end_matches([' ', '\t']))
        .collect();

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    if lines.is_empty() {
        return String::new();
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
