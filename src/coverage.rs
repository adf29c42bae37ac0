//! Per-script byte coverage (spec §4.9): summarizes the precise-coverage
//! ranges taken during a coverage pass into total/used byte counts per
//! script, the second half of the dual-mode runner's joined output.

use serde::{Deserialize, Serialize};

use crate::browser::ScriptCoverageEntry;

/// Scripts a coverage pass must never attribute bytes to: unidentified
/// scripts and browser-internal pseudo-scripts (spec §4.9).
fn is_internal_script_url(url: &str) -> bool {
    url.is_empty()
        || url == "about:blank"
        || url.starts_with("chrome-extension://")
        || url.starts_with("devtools://")
        || url.starts_with("extensions::")
}

/// Byte coverage for one script: total instrumented bytes and the subset
/// actually executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerScriptCoverage {
    pub script_url: String,
    pub total_bytes: u64,
    pub used_bytes: u64,
}

impl PerScriptCoverage {
    pub fn ratio(&self) -> f64 {
        if self.total_bytes == 0 {
            0.0
        } else {
            self.used_bytes as f64 / self.total_bytes as f64
        }
    }
}

/// A coverage pass's full output: per-script breakdown plus the pooled
/// totals used for reporting.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CoverageReport {
    pub scripts: Vec<PerScriptCoverage>,
    pub total_bytes: u64,
    pub used_bytes: u64,
}

/// Sum `(end - start)` per range as total bytes, and the same where
/// `count > 0` as used bytes (spec §4.9), skipping ranges whose script URL
/// is empty or internal.
pub fn summarize_coverage(entries: &[ScriptCoverageEntry]) -> CoverageReport {
    let mut scripts = Vec::new();
    let mut total_bytes = 0u64;
    let mut used_bytes = 0u64;

    for entry in entries {
        if is_internal_script_url(&entry.script_url) {
            continue;
        }

        let mut script_total = 0u64;
        let mut script_used = 0u64;
        for range in &entry.ranges {
            let width = range.end_offset.saturating_sub(range.start_offset) as u64;
            script_total += width;
            if range.count > 0 {
                script_used += width;
            }
        }

        total_bytes += script_total;
        used_bytes += script_used;
        scripts.push(PerScriptCoverage {
            script_url: entry.script_url.clone(),
            total_bytes: script_total,
            used_bytes: script_used,
        });
    }

    CoverageReport {
        scripts,
        total_bytes,
        used_bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::CoverageRange;

    fn entry(url: &str, ranges: &[(u32, u32, u32)]) -> ScriptCoverageEntry {
        ScriptCoverageEntry {
            script_url: url.to_string(),
            ranges: ranges
                .iter()
                .map(|&(start_offset, end_offset, count)| CoverageRange {
                    start_offset,
                    end_offset,
                    count,
                })
                .collect(),
        }
    }

    #[test]
    fn sums_used_and_total_bytes_per_script() {
        let entries = vec![entry("https://x.test/app.js", &[(0, 100, 1), (100, 150, 0)])];
        let report = summarize_coverage(&entries);
        assert_eq!(report.total_bytes, 150);
        assert_eq!(report.used_bytes, 100);
        assert_eq!(report.scripts[0].ratio(), 100.0 / 150.0);
    }

    #[test]
    fn skips_empty_and_internal_script_urls() {
        let entries = vec![
            entry("", &[(0, 50, 1)]),
            entry("chrome-extension://abc/x.js", &[(0, 50, 1)]),
            entry("about:blank", &[(0, 50, 1)]),
        ];
        let report = summarize_coverage(&entries);
        assert!(report.scripts.is_empty());
        assert_eq!(report.total_bytes, 0);
    }

    #[test]
    fn pools_totals_across_multiple_scripts() {
        let entries = vec![
            entry("https://x.test/a.js", &[(0, 100, 1)]),
            entry("https://x.test/b.js", &[(0, 200, 0)]),
        ];
        let report = summarize_coverage(&entries);
        assert_eq!(report.total_bytes, 300);
        assert_eq!(report.used_bytes, 100);
        assert_eq!(report.scripts.len(), 2);
    }
}
