use regex::Regex;
use serde::Deserialize;

use super::{HashPair, NOT_AVAILABLE};

/// How hash values are located in a verifier's output.
#[derive(clap::ValueEnum, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExtractMode {
    /// Whitespace-bounded hex tokens; first is the stored hash, second the computed one
    #[default]
    Tokens,
    /// `MD5 hash stored in file: ...` / `MD5 hash calculated over data: ...` lines
    Labelled,
}

const MD5_LEN: usize = 32;
const SHA1_LEN: usize = 40;

/// Hashes found in one verifier's output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedHashes {
    pub md5: HashPair,
    /// `None` when the output carries no SHA1 at all.
    pub sha1: Option<HashPair>,
}

/// Pulls MD5/SHA1 values out of free-form verifier output.
#[derive(Debug, Clone)]
pub struct Extractor {
    mode: ExtractMode,
    token: Regex,
    labelled: Regex,
}

impl Extractor {
    /// # Errors
    ///
    /// Returns an error if one of the built-in patterns fails to compile.
    pub fn new(mode: ExtractMode) -> anyhow::Result<Self> {
        Ok(Self {
            mode,
            token: Regex::new(r"\S+")?,
            labelled: Regex::new(
                r"(?mi)^[ \t]*(MD5|SHA1)[ \t]+hash[ \t]+(stored in file|calculated over data)[ \t]*:[ \t]*(\S+)[ \t\r]*$",
            )?,
        })
    }

    pub fn extract(&self, output: &str) -> ExtractedHashes {
        match self.mode {
            ExtractMode::Tokens => self.from_tokens(output),
            ExtractMode::Labelled => self.from_labels(output),
        }
    }

    /// All lowercase hex tokens of exactly `len` characters that have
    /// whitespace on both sides. A token touching the start or end of the
    /// text does not count.
    pub fn hex_tokens<'a>(&self, output: &'a str, len: usize) -> Vec<&'a str> {
        self.token
            .find_iter(output)
            .filter(|m| m.start() > 0 && m.end() < output.len())
            .map(|m| m.as_str())
            .filter(|t| t.len() == len && t.bytes().all(is_lower_hex))
            .collect()
    }

    fn from_tokens(&self, output: &str) -> ExtractedHashes {
        let md5 = self.hex_tokens(output, MD5_LEN);
        let sha1 = self.hex_tokens(output, SHA1_LEN);
        ExtractedHashes {
            md5: HashPair::from_positional(&md5),
            sha1: (!sha1.is_empty()).then(|| HashPair::from_positional(&sha1)),
        }
    }

    fn from_labels(&self, output: &str) -> ExtractedHashes {
        let mut md5 = HashPair::default();
        let mut sha1: Option<HashPair> = None;

        for caps in self.labelled.captures_iter(output) {
            let value = &caps[3];
            let value = if value.eq_ignore_ascii_case(NOT_AVAILABLE) {
                NOT_AVAILABLE.to_string()
            } else {
                value.to_ascii_lowercase()
            };
            let pair = if caps[1].eq_ignore_ascii_case("md5") {
                &mut md5
            } else {
                sha1.get_or_insert_with(HashPair::default)
            };
            // First occurrence wins, matching the positional mode.
            let slot = if caps[2].eq_ignore_ascii_case("stored in file") {
                &mut pair.stored
            } else {
                &mut pair.computed
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }

        ExtractedHashes { md5, sha1 }
    }
}

const fn is_lower_hex(b: u8) -> bool {
    b.is_ascii_digit() || matches!(b, b'a'..=b'f')
}
