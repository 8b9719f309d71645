use std::fmt;

use crate::verifier::{HashPair, VerificationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Md5,
    Sha1,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Md5 => f.write_str("MD5"),
            Self::Sha1 => f.write_str("SHA1"),
        }
    }
}

/// Rendered in place of a hash one verifier did not print at all.
const NOT_PRINTED: &str = "missing";

/// Which half of a [`HashPair`] a discrepancy concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashKind {
    Stored,
    Computed,
}

impl HashKind {
    // Report wording is fixed; existing log searches depend on it.
    const fn noun(self) -> &'static str {
        match self {
            Self::Stored => "hashes",
            Self::Computed => "hash",
        }
    }
}

impl fmt::Display for HashKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stored => f.write_str("stored in file"),
            Self::Computed => f.write_str("calculated over data"),
        }
    }
}

/// One difference between the reference and candidate verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discrepancy {
    ExitCode {
        reference: i32,
        candidate: i32,
    },
    Hash {
        algorithm: Algorithm,
        kind: HashKind,
        reference: Option<String>,
        candidate: Option<String>,
    },
    /// Neither verifier reported this hash.
    Missing {
        algorithm: Algorithm,
        kind: HashKind,
    },
}

impl Discrepancy {
    /// Render as one report line, naming each verifier after its value.
    pub fn describe(&self, reference_name: &str, candidate_name: &str) -> String {
        match self {
            Self::ExitCode {
                reference,
                candidate,
            } => format!(
                "Return code doesn't equal: {reference} ({reference_name}), {candidate} ({candidate_name})"
            ),
            Self::Hash {
                algorithm,
                kind,
                reference,
                candidate,
            } => format!(
                "{algorithm} {} {kind} doesn't equal: {} ({reference_name}), {} ({candidate_name})",
                kind.noun(),
                reference.as_deref().unwrap_or(NOT_PRINTED),
                candidate.as_deref().unwrap_or(NOT_PRINTED),
            ),
            Self::Missing { algorithm, kind } => {
                format!("{algorithm} hash {kind} not reported by either tool")
            }
        }
    }
}

/// Everything found while comparing one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonOutcome {
    pub reference: String,
    pub candidate: String,
    pub reference_exit_code: i32,
    pub candidate_exit_code: i32,
    pub discrepancies: Vec<Discrepancy>,
}

impl ComparisonOutcome {
    pub fn failed(&self) -> bool {
        !self.discrepancies.is_empty()
    }

    /// One line per discrepancy, each terminated by a newline.
    pub fn message(&self) -> String {
        self.lines().map(|l| l + "\n").collect()
    }

    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.discrepancies
            .iter()
            .map(|d| d.describe(&self.reference, &self.candidate))
    }
}

fn check_value(
    algorithm: Algorithm,
    kind: HashKind,
    reference: Option<&String>,
    candidate: Option<&String>,
    out: &mut Vec<Discrepancy>,
) {
    match (reference, candidate) {
        (None, None) => out.push(Discrepancy::Missing { algorithm, kind }),
        (r, c) if r == c => {}
        (r, c) => out.push(Discrepancy::Hash {
            algorithm,
            kind,
            reference: r.cloned(),
            candidate: c.cloned(),
        }),
    }
}

fn check_pair(algorithm: Algorithm, reference: &HashPair, candidate: &HashPair, out: &mut Vec<Discrepancy>) {
    check_value(
        algorithm,
        HashKind::Stored,
        reference.stored.as_ref(),
        candidate.stored.as_ref(),
        out,
    );
    check_value(
        algorithm,
        HashKind::Computed,
        reference.computed.as_ref(),
        candidate.computed.as_ref(),
        out,
    );
}

/// Compare what two verifiers reported for the same image.
///
/// Every check runs so the outcome lists all discrepancies at once. SHA1 is
/// only compared when the reference reported it; if the candidate then has
/// none, that is a mismatch.
pub fn compare(
    reference_name: &str,
    reference: &VerificationResult,
    candidate_name: &str,
    candidate: &VerificationResult,
) -> ComparisonOutcome {
    let mut discrepancies = Vec::new();

    if reference.exit_code != candidate.exit_code {
        discrepancies.push(Discrepancy::ExitCode {
            reference: reference.exit_code,
            candidate: candidate.exit_code,
        });
    }

    check_pair(Algorithm::Md5, &reference.md5, &candidate.md5, &mut discrepancies);

    if let Some(reference_sha1) = &reference.sha1 {
        let candidate_sha1 = candidate.sha1.clone().unwrap_or_default();
        check_pair(Algorithm::Sha1, reference_sha1, &candidate_sha1, &mut discrepancies);
    }

    ComparisonOutcome {
        reference: reference_name.to_string(),
        candidate: candidate_name.to_string(),
        reference_exit_code: reference.exit_code,
        candidate_exit_code: candidate.exit_code,
        discrepancies,
    }
}
