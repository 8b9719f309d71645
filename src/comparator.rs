use std::io::Write;
use std::path::Path;

use crate::compare::{self, ComparisonOutcome};
use crate::verifier::HashVerifier;

/// Runs a reference and a candidate verifier against the same image and
/// compares what they report.
pub struct Comparator {
    reference: Box<dyn HashVerifier>,
    candidate: Box<dyn HashVerifier>,
}

impl Comparator {
    pub fn new(reference: Box<dyn HashVerifier>, candidate: Box<dyn HashVerifier>) -> Self {
        Self {
            reference,
            candidate,
        }
    }

    /// Run both verifiers on `path`, reference first, and compare.
    ///
    /// # Errors
    ///
    /// Returns an error if either verifier cannot be run.
    pub fn compare_file(&self, path: &Path) -> anyhow::Result<ComparisonOutcome> {
        let reference = self.reference.run(path)?;
        let candidate = self.candidate.run(path)?;
        Ok(compare::compare(
            self.reference.name(),
            &reference,
            self.candidate.name(),
            &candidate,
        ))
    }

    /// Compare `path` and write the text report to `out`. Returns `true` if
    /// the verifiers disagree.
    ///
    /// # Errors
    ///
    /// Returns an error if either verifier cannot be run or `out` fails.
    pub fn verify_file(&self, path: &Path, verbose: bool, out: &mut impl Write) -> anyhow::Result<bool> {
        let outcome = self.compare_file(path)?;
        write_report(out, path, &outcome, verbose)?;
        Ok(outcome.failed())
    }
}

/// The path is printed when the check failed or `verbose` is set; the
/// discrepancy lines only on failure.
///
/// # Errors
///
/// Returns any error from writing to `out`.
pub fn write_report(
    out: &mut impl Write,
    path: &Path,
    outcome: &ComparisonOutcome,
    verbose: bool,
) -> std::io::Result<()> {
    let failed = outcome.failed();
    if failed || verbose {
        writeln!(out, "{}", path.display())?;
    }
    if failed {
        write!(out, "{}", outcome.message())?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;

    use super::*;
    use crate::verifier::{HashPair, VerificationResult};

    const MD5_STORED: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const MD5_COMPUTED: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    struct FakeVerifier {
        name: &'static str,
        result: Option<VerificationResult>,
        calls: Rc<RefCell<Vec<PathBuf>>>,
    }

    impl HashVerifier for FakeVerifier {
        fn name(&self) -> &str {
            self.name
        }

        fn run(&self, path: &Path) -> anyhow::Result<VerificationResult> {
            self.calls.borrow_mut().push(path.to_path_buf());
            self.result
                .clone()
                .ok_or_else(|| anyhow::anyhow!("{} not installed", self.name))
        }
    }

    fn md5_result(computed: &str) -> VerificationResult {
        VerificationResult {
            exit_code: 0,
            output: String::new(),
            md5: HashPair {
                stored: Some(MD5_STORED.to_string()),
                computed: Some(computed.to_string()),
            },
            sha1: None,
        }
    }

    fn comparator(
        reference: Option<VerificationResult>,
        candidate: Option<VerificationResult>,
    ) -> (Comparator, Rc<RefCell<Vec<PathBuf>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let comparator = Comparator::new(
            Box::new(FakeVerifier {
                name: "ewfverify",
                result: reference,
                calls: Rc::clone(&calls),
            }),
            Box::new(FakeVerifier {
                name: "e01verify",
                result: candidate,
                calls: Rc::clone(&calls),
            }),
        );
        (comparator, calls)
    }

    fn verify(comparator: &Comparator, verbose: bool) -> (bool, String) {
        let mut out = Vec::new();
        let failed = comparator
            .verify_file(Path::new("case/disk.E01"), verbose, &mut out)
            .unwrap();
        (failed, String::from_utf8(out).unwrap())
    }

    #[test]
    fn agreement_prints_nothing() {
        let (comparator, calls) = comparator(
            Some(md5_result(MD5_COMPUTED)),
            Some(md5_result(MD5_COMPUTED)),
        );
        let (failed, out) = verify(&comparator, false);
        assert!(!failed);
        assert_eq!(out, "");
        assert_eq!(calls.borrow().len(), 2, "both verifiers must run");
    }

    #[test]
    fn agreement_verbose_prints_path_only() {
        let (comparator, _) = comparator(
            Some(md5_result(MD5_COMPUTED)),
            Some(md5_result(MD5_COMPUTED)),
        );
        let (failed, out) = verify(&comparator, true);
        assert!(!failed);
        assert_eq!(out, "case/disk.E01\n");
    }

    #[test]
    fn computed_mismatch_prints_path_and_one_line() {
        let (comparator, _) = comparator(
            Some(md5_result(MD5_COMPUTED)),
            Some(md5_result("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb0")),
        );
        let (failed, out) = verify(&comparator, false);
        assert!(failed);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2, "got: {out}");
        assert_eq!(lines[0], "case/disk.E01");
        assert!(lines[1].starts_with("MD5 hash calculated over data doesn't equal"));
        assert!(!out.contains("stored in file"));
    }

    #[test]
    fn both_verifiers_see_the_same_path() {
        let (comparator, calls) = comparator(
            Some(md5_result(MD5_COMPUTED)),
            Some(md5_result(MD5_COMPUTED)),
        );
        verify(&comparator, false);
        let calls = calls.borrow();
        assert_eq!(calls[0], calls[1]);
        assert_eq!(calls[0], PathBuf::from("case/disk.E01"));
    }

    #[test]
    fn verifier_error_propagates() {
        let (comparator, _) = comparator(Some(md5_result(MD5_COMPUTED)), None);
        let mut out = Vec::new();
        let err = comparator
            .verify_file(Path::new("disk.E01"), false, &mut out)
            .unwrap_err();
        assert!(err.to_string().contains("e01verify not installed"));
        assert!(out.is_empty());
    }
}
