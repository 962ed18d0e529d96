// src/report/summary.rs

//! Counts parsed from the runner's console summary, e.g.
//!
//! ```text
//! Specifications: 1 executed      1 passed        0 failed        0 skipped
//! Scenarios:      3 executed      2 passed        1 failed        0 skipped
//! ```

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static SUMMARY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(Specifications|Scenarios):\s+(\d+) executed\s+(\d+) passed\s+(\d+) failed\s+(\d+) skipped",
    )
    .expect("summary regex is valid")
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub executed: u32,
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub specifications: Option<Counts>,
    pub scenarios: Option<Counts>,
}

impl RunSummary {
    /// Scan runner output for summary lines. `None` if there are none.
    ///
    /// The last occurrence wins when the runner prints several (reruns).
    pub fn parse(output: &str) -> Option<RunSummary> {
        let mut summary = RunSummary::default();
        let mut found = false;

        for line in output.lines() {
            let Some(caps) = SUMMARY_LINE.captures(line) else {
                continue;
            };
            let num = |i: usize| caps[i].parse::<u32>().unwrap_or(0);
            let counts = Counts {
                executed: num(2),
                passed: num(3),
                failed: num(4),
                skipped: num(5),
            };
            match &caps[1] {
                "Specifications" => summary.specifications = Some(counts),
                _ => summary.scenarios = Some(counts),
            }
            found = true;
        }

        found.then_some(summary)
    }
}
