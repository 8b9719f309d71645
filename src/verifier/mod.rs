pub mod extract;

use std::path::Path;

use anyhow::Context;

use crate::runner;

pub use extract::{ExtractMode, Extractor};

/// What a labelled verifier prints when it has no value for a hash, e.g. an
/// image acquired without a stored SHA1. Kept distinct from an absent line.
pub const NOT_AVAILABLE: &str = "N/A";

/// Stored/computed values for one hash algorithm.
///
/// `stored` is the hash recorded in the image's metadata at acquisition time,
/// `computed` is the hash the verifier recalculated over the image data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashPair {
    pub stored: Option<String>,
    pub computed: Option<String>,
}

impl HashPair {
    /// Build a pair from hashes in order of appearance: index 0 is the stored
    /// value, index 1 the computed one. Missing entries stay `None`.
    pub fn from_positional(values: &[&str]) -> Self {
        Self {
            stored: values.first().map(|s| (*s).to_string()),
            computed: values.get(1).map(|s| (*s).to_string()),
        }
    }
}

/// What a single verifier reported for a single image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationResult {
    pub exit_code: i32,
    pub output: String,
    pub md5: HashPair,
    /// `None` when the verifier reported no SHA1 (not every image carries one).
    pub sha1: Option<HashPair>,
}

/// Anything that can verify an image and report its hashes.
pub trait HashVerifier {
    /// Short name used in reports, e.g. `ewfverify`.
    fn name(&self) -> &str;

    /// Verify the image at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the verifier could not be run at all. A verifier
    /// that runs and reports a failure is not an error.
    fn run(&self, path: &Path) -> anyhow::Result<VerificationResult>;
}

/// A verifier backed by an external program.
#[derive(Debug, Clone)]
pub struct CommandVerifier {
    name: String,
    command: String,
    extractor: Extractor,
}

impl CommandVerifier {
    /// `command` is the program plus any leading arguments; the image path
    /// is appended as the final argument.
    pub fn new(name: impl Into<String>, command: impl Into<String>, extractor: Extractor) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            extractor,
        }
    }
}

impl HashVerifier for CommandVerifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, path: &Path) -> anyhow::Result<VerificationResult> {
        if crate::debug_enabled() {
            eprintln!("[everify] running: {} {}", self.command, path.display());
        }
        let out = runner::execute(&self.command, [path])
            .with_context(|| format!("failed to run {} on {}", self.name, path.display()))?;
        let hashes = self.extractor.extract(&out.combined);
        if crate::debug_enabled() {
            eprintln!(
                "[everify] {}: exit code {}, md5 {:?}, sha1 {:?}",
                self.name, out.exit_code, hashes.md5, hashes.sha1
            );
        }
        Ok(VerificationResult {
            exit_code: out.exit_code,
            output: out.combined,
            md5: hashes.md5,
            sha1: hashes.sha1,
        })
    }
}
