use std::path::Path;

use serde::Serialize;

use crate::compare::ComparisonOutcome;

/// Per-image result in `--json` mode.
#[derive(Debug, Serialize)]
pub struct FileReport {
    pub path: String,
    pub failed: bool,
    pub reference: String,
    pub candidate: String,
    pub reference_exit_code: i32,
    pub candidate_exit_code: i32,
    pub discrepancies: Vec<String>,
}

impl FileReport {
    pub fn new(path: &Path, outcome: &ComparisonOutcome) -> Self {
        Self {
            path: path.display().to_string(),
            failed: outcome.failed(),
            reference: outcome.reference.clone(),
            candidate: outcome.candidate.clone(),
            reference_exit_code: outcome.reference_exit_code,
            candidate_exit_code: outcome.candidate_exit_code,
            discrepancies: outcome.lines().collect(),
        }
    }
}

/// Print a Serialize value as pretty JSON, logging errors to stderr.
pub fn print_json(value: &(impl Serialize + ?Sized)) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("[everify] JSON serialization error: {e}"),
    }
}
