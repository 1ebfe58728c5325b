//! # Report — Result Lines
//!
//! Appends one JSON object per completed test to `<root>/results.txt`, the
//! conventional hand-off point for whatever uploads results to a server.
//! The line carries everything a reporter needs: exponent, worktype, the
//! composite/probable-prime status, the res64 fingerprint, and the proof
//! power when a proof was generated. Appending must succeed — a result is
//! the product of days of compute — so failures propagate instead of being
//! logged away.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const PROGRAM_NAME: &str = "deepreach";
pub const PROGRAM_VERSION: &str = env!("CARGO_PKG_VERSION");

/// One completed test, serialized as a single JSON line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub exponent: u64,
    /// "PRP-3" or "LL".
    pub worktype: String,
    /// "C" composite, "P" probable prime, "PRIME" for an LL zero residue.
    pub status: String,
    pub res64: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_power: Option<u32>,
    pub program: ProgramInfo,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramInfo {
    pub name: String,
    pub version: String,
}

impl ProgramInfo {
    pub fn current() -> Self {
        ProgramInfo {
            name: PROGRAM_NAME.to_string(),
            version: PROGRAM_VERSION.to_string(),
        }
    }
}

/// Append a result line to `<root>/results.txt`, creating the file on first
/// use.
pub fn append_result(root: &Path, result: &TestResult) -> Result<()> {
    let path = root.join("results.txt");
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening {}", path.display()))?;
    let line = serde_json::to_string(result)?;
    writeln!(f, "{}", line).with_context(|| format!("appending to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(exponent: u64) -> TestResult {
        TestResult {
            exponent,
            worktype: "PRP-3".into(),
            status: "C".into(),
            res64: "DEADBEEF01234567".into(),
            proof_power: Some(8),
            program: ProgramInfo::current(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn appends_one_json_line_per_result() {
        let dir = tempfile::tempdir().unwrap();
        append_result(dir.path(), &sample(127)).unwrap();
        append_result(dir.path(), &sample(521)).unwrap();

        let text = std::fs::read_to_string(dir.path().join("results.txt")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: TestResult = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed.exponent, 521);
        assert_eq!(parsed.program.name, PROGRAM_NAME);
    }

    #[test]
    fn proof_power_is_omitted_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let mut r = sample(127);
        r.proof_power = None;
        r.worktype = "LL".into();
        append_result(dir.path(), &r).unwrap();
        let text = std::fs::read_to_string(dir.path().join("results.txt")).unwrap();
        assert!(!text.contains("proof_power"));
    }
}
