//! Human-readable reports (Markdown).
//!
//! Failures are grouped by kind so that "needs regeneration", "producer
//! crashed" and "output drifted" read as distinct problems.

use chrono::{TimeZone, Utc};
use goldcheck_schema::{
    ComparisonOutcome, ComparisonResult, RegenOutcome, RegenReport, SuiteReport,
    UnregisteredReason,
};

/// Format Unix milliseconds as an RFC 3339 UTC timestamp.
pub fn format_timestamp(millis: u64) -> String {
    Utc.timestamp_millis_opt(millis as i64)
        .single()
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| millis.to_string())
}

/// Render a verification report.
pub fn render_suite(report: &SuiteReport) -> String {
    let counts = report.counts();
    let mut out = String::new();

    out.push_str("# Golden-master verification\n\n");
    out.push_str(&format!("- **Root**: {}\n", report.root));
    out.push_str(&format!("- **Generated**: {}\n", report.generated_at));
    out.push_str(&format!("- **Elapsed**: {} ms\n", report.elapsed_ms));
    out.push_str(&format!(
        "- **Result**: {}\n\n",
        if report.passed() { "PASSED" } else { "FAILED" }
    ));

    out.push_str("| Outcome | Count |\n");
    out.push_str("|---------|-------|\n");
    for (label, n) in [
        ("match", counts.matched),
        ("mismatch", counts.mismatched),
        ("missing baseline", counts.missing_baseline),
        ("producer error", counts.producer_errors),
        ("baseline unreadable", counts.baseline_unreadable),
        ("not run", counts.not_run),
    ] {
        out.push_str(&format!("| {} | {} |\n", label, n));
    }
    out.push('\n');

    render_completeness(report, &mut out);

    let group = |kind: &str| -> Vec<&ComparisonResult> {
        report
            .results
            .iter()
            .filter(|r| r.outcome.label() == kind)
            .collect()
    };

    let missing = group("missing-baseline");
    if !missing.is_empty() {
        out.push_str("## Missing baselines (run `goldcheck regenerate --yes`)\n\n");
        for r in missing {
            if let ComparisonOutcome::MissingBaseline { expected_path } = &r.outcome {
                out.push_str(&format!(
                    "- `{}` expects `{}`\n",
                    r.fixture.relative_path, expected_path
                ));
            }
        }
        out.push('\n');
    }

    let crashed = group("producer-error");
    if !crashed.is_empty() {
        out.push_str("## Producer errors\n\n");
        for r in crashed {
            if let ComparisonOutcome::ProducerError { detail } = &r.outcome {
                out.push_str(&format!("- `{}`: {}\n", r.fixture.relative_path, detail));
            }
        }
        out.push('\n');
    }

    let drifted = group("mismatch");
    if !drifted.is_empty() {
        out.push_str("## Output drift\n\n");
        for r in drifted {
            if let ComparisonOutcome::Mismatch { diff } = &r.outcome {
                out.push_str(&format!(
                    "### `{}` ({})\n\n",
                    r.fixture.relative_path, r.fixture.derived_id
                ));
                out.push_str(&format!(
                    "First difference at line {} (expected {} lines, actual {}).\n\n",
                    diff.first_diff_line, diff.expected_lines, diff.actual_lines
                ));
                let fence = code_fence(&diff.unified);
                out.push_str(&format!("{}diff\n", fence));
                out.push_str(&diff.unified);
                if !diff.unified.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(&format!("{}\n\n", fence));
            }
        }
    }

    let unreadable = group("baseline-unreadable");
    if !unreadable.is_empty() {
        out.push_str("## Unreadable baselines\n\n");
        for r in unreadable {
            if let ComparisonOutcome::BaselineUnreadable { detail } = &r.outcome {
                out.push_str(&format!("- `{}`: {}\n", r.fixture.relative_path, detail));
            }
        }
        out.push('\n');
    }

    let skipped = group("not-run");
    if !skipped.is_empty() {
        out.push_str("## Not run\n\n");
        for r in skipped {
            if let ComparisonOutcome::NotRun { reason } = &r.outcome {
                out.push_str(&format!("- `{}`: {}\n", r.fixture.relative_path, reason));
            }
        }
        out.push('\n');
    }

    out
}

/// A backtick fence longer than any backtick run inside `body`.
fn code_fence(body: &str) -> String {
    let longest = body
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    "`".repeat(longest.max(2) + 1)
}

fn render_completeness(report: &SuiteReport, out: &mut String) {
    let completeness = &report.completeness;
    if !completeness.checked {
        out.push_str("Registry cross-check: not run.\n\n");
        return;
    }
    if completeness.is_complete() {
        out.push_str("Registry cross-check: complete.\n\n");
        return;
    }

    out.push_str("## Registry completeness violations\n\n");
    for entry in &completeness.unregistered {
        let fixture = &entry.fixture;
        match &entry.reason {
            UnregisteredReason::NoEntry => out.push_str(&format!(
                "- `{}`: no registry entry `{}`\n",
                fixture.relative_path, fixture.derived_id
            )),
            UnregisteredReason::PathMismatch { registered } => out.push_str(&format!(
                "- `{}`: `{}` is registered for `{}`\n",
                fixture.relative_path, fixture.derived_id, registered
            )),
        }
    }
    for orphan in &completeness.orphans {
        out.push_str(&format!(
            "- `{}`: registered for missing fixture `{}`\n",
            orphan.id, orphan.fixture
        ));
    }
    out.push('\n');
}

/// Render a regeneration report.
pub fn render_regen(report: &RegenReport) -> String {
    let counts = report.counts();
    let mut out = String::new();

    out.push_str("# Baseline regeneration\n\n");
    out.push_str(&format!("- **Root**: {}\n", report.root));
    out.push_str(&format!("- **Generated**: {}\n", report.generated_at));
    out.push_str(&format!(
        "- **Written**: {} created, {} updated, {} unchanged\n",
        counts.created, counts.updated, counts.unchanged
    ));
    out.push_str(&format!(
        "- **Failed**: {}, not run: {}\n\n",
        counts.failed, counts.not_run
    ));

    let failures: Vec<_> = report
        .results
        .iter()
        .filter(|r| !r.outcome.is_written())
        .collect();
    if !failures.is_empty() {
        out.push_str("## Not written\n\n");
        for r in failures {
            let detail = match &r.outcome {
                RegenOutcome::ProducerError { detail } => format!("producer error: {}", detail),
                RegenOutcome::StoreError { detail } => format!("store error: {}", detail),
                RegenOutcome::NotRun { reason } => format!("not run: {}", reason),
                _ => continue,
            };
            out.push_str(&format!("- `{}`: {}\n", r.fixture.relative_path, detail));
        }
        out.push('\n');
    }

    out
}
