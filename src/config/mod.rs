//! Layered settings for the two verifiers and directory scanning.
//!
//! Priority (highest first):
//!   1. CLI flags and `EVERIFY_*` env vars (applied by the caller)
//!   2. `.everify/config.toml` in the current directory
//!   3. `{user_dir}/config.toml` (see [`user_dir`])
//!   4. Built-in defaults: `ewfverify -q` vs `e01verify`, `.e01` images


use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::verifier::ExtractMode;
use crate::walker::DEFAULT_EXTENSIONS;

pub const DEFAULT_REFERENCE: &str = "ewfverify -q";
pub const DEFAULT_CANDIDATE: &str = "e01verify";

/// Returns the everify user-level config directory.
///
/// `EVERIFY_HOME` (if set and non-empty) wins over the platform-native
/// `dirs::config_dir()/everify`.
pub fn user_dir() -> Option<PathBuf> {
    if let Ok(home) = std::env::var("EVERIFY_HOME")
        && !home.is_empty()
    {
        return Some(PathBuf::from(home));
    }
    dirs::config_dir().map(|d| d.join("everify"))
}

/// Extract the basename from a word that might be a path.
/// Examples: `/usr/bin/ewfverify` -> `ewfverify`, `ewfverify.exe` -> `ewfverify.exe`
fn extract_basename(word: &str) -> &str {
    word.rfind(['/', '\\']).map_or(word, |pos| &word[pos + 1..])
}

/// One verifier: its display name and command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierSettings {
    pub name: String,
    pub command: String,
}

impl VerifierSettings {
    /// Name the verifier after the program in `command`.
    pub fn from_command(command: &str) -> Self {
        let program = command.split_whitespace().next().unwrap_or_default();
        Self {
            name: extract_basename(program).to_string(),
            command: command.trim().to_string(),
        }
    }

    fn apply(&mut self, section: &VerifierSection) {
        if let Some(command) = &section.command {
            *self = Self::from_command(command);
        }
        if let Some(name) = &section.name {
            self.name.clone_from(name);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub reference: VerifierSettings,
    pub candidate: VerifierSettings,
    /// Image suffixes without the leading dot, matched case-insensitively.
    pub extensions: Vec<String>,
    pub extract: ExtractMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reference: VerifierSettings::from_command(DEFAULT_REFERENCE),
            candidate: VerifierSettings::from_command(DEFAULT_CANDIDATE),
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| (*s).to_string()).collect(),
            extract: ExtractMode::default(),
        }
    }
}

/// Private: parsed representation of an everify config file.
#[derive(Deserialize, Default, Debug)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    reference: Option<VerifierSection>,
    candidate: Option<VerifierSection>,
    extensions: Option<Vec<String>>,
    extract: Option<ExtractMode>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct VerifierSection {
    name: Option<String>,
    command: Option<String>,
}

/// Read a config file. Returns `Ok(None)` if it does not exist.
fn try_load_file(path: &Path) -> anyhow::Result<Option<ConfigFile>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(anyhow::Error::new(e)
                .context(format!("failed to read config file: {}", path.display())));
        }
    };
    let file: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;
    Ok(Some(file))
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_string()
}

impl Settings {
    /// Load settings for a run started in `cwd`.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read or parsed.
    pub fn load(cwd: &Path) -> anyhow::Result<Self> {
        let project = cwd.join(".everify").join("config.toml");
        let global = user_dir().map(|d| d.join("config.toml"));
        Self::load_from(Some(&project), global.as_deref())
    }

    /// Load settings from explicit paths. Useful for testing.
    /// Priority: project config → global config → defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read or parsed.
    pub fn load_from(project_config: Option<&Path>, global_config: Option<&Path>) -> anyhow::Result<Self> {
        let mut settings = Self::default();
        for path in [global_config, project_config].into_iter().flatten() {
            if let Some(file) = try_load_file(path)? {
                settings.apply(&file);
            }
        }
        Ok(settings)
    }

    fn apply(&mut self, file: &ConfigFile) {
        if let Some(section) = &file.reference {
            self.reference.apply(section);
        }
        if let Some(section) = &file.candidate {
            self.candidate.apply(section);
        }
        if let Some(exts) = &file.extensions {
            self.set_extensions(exts);
        }
        if let Some(mode) = file.extract {
            self.extract = mode;
        }
    }

    /// Replace the image suffixes; leading dots are dropped.
    pub fn set_extensions(&mut self, exts: &[String]) {
        self.extensions = exts
            .iter()
            .map(|e| normalize_extension(e))
            .filter(|e| !e.is_empty())
            .collect();
    }

    /// Check the settings describe something that can run.
    ///
    /// # Errors
    ///
    /// Returns an error if a verifier has no command or no image suffix is left.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (role, verifier) in [("reference", &self.reference), ("candidate", &self.candidate)] {
            if verifier.command.trim().is_empty() {
                anyhow::bail!("{role} verifier command is empty");
            }
        }
        if self.extensions.is_empty() {
            anyhow::bail!("no image extensions configured");
        }
        Ok(())
    }
}
