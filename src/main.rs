use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Parser;

use everify::comparator::{self, Comparator};
use everify::config::{Settings, VerifierSettings};
use everify::output::{self, FileReport};
use everify::verifier::{CommandVerifier, ExtractMode, Extractor};
use everify::walker;

#[derive(Parser)]
#[command(
    name = "everify",
    version,
    about = "Cross-check two E01 verifiers by comparing the hashes they report"
)]
struct Cli {
    /// Path to an E01 file or a directory containing E01 files
    path: PathBuf,

    /// Print every examined path, not only failing ones
    #[arg(short, long)]
    verbose: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Reference verifier command line; the image path is appended (default: "ewfverify -q")
    #[arg(long, env = "EVERIFY_REFERENCE", value_name = "CMD")]
    reference: Option<String>,

    /// Candidate verifier command line; the image path is appended (default: "e01verify")
    #[arg(long, env = "EVERIFY_CANDIDATE", value_name = "CMD")]
    candidate: Option<String>,

    /// Image extension to match in directory mode (repeatable, default: e01)
    #[arg(short, long = "extension", value_name = "EXT")]
    extensions: Vec<String>,

    /// How hashes are located in verifier output
    #[arg(long, value_enum)]
    extract: Option<ExtractMode>,

    /// Exit 0 even when the verifiers disagree
    #[arg(long)]
    exit_zero: bool,
}

fn or_exit(r: anyhow::Result<i32>) -> i32 {
    r.unwrap_or_else(|e| {
        eprintln!("[everify] error: {e:#}");
        2
    })
}

/// Config files first, then env/CLI overrides.
fn resolve_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let cwd = std::env::current_dir()?;
    let mut settings = Settings::load(&cwd)?;
    if let Some(cmd) = &cli.reference {
        settings.reference = VerifierSettings::from_command(cmd);
    }
    if let Some(cmd) = &cli.candidate {
        settings.candidate = VerifierSettings::from_command(cmd);
    }
    if !cli.extensions.is_empty() {
        settings.set_extensions(&cli.extensions);
    }
    if let Some(mode) = cli.extract {
        settings.extract = mode;
    }
    settings.validate()?;
    Ok(settings)
}

fn build_comparator(settings: &Settings) -> anyhow::Result<Comparator> {
    let verifier = |v: &VerifierSettings| -> anyhow::Result<Box<CommandVerifier>> {
        Ok(Box::new(CommandVerifier::new(
            v.name.clone(),
            v.command.clone(),
            Extractor::new(settings.extract)?,
        )))
    };
    Ok(Comparator::new(
        verifier(&settings.reference)?,
        verifier(&settings.candidate)?,
    ))
}

fn warn_if_empty(path: &Path, checked: usize) {
    if checked == 0 {
        eprintln!("[everify] no image files found in {}", path.display());
    }
}

fn cmd_verify_text(cli: &Cli, settings: &Settings, comparator: &Comparator) -> anyhow::Result<usize> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut failures = 0;

    let checked = walker::walk(&cli.path, &settings.extensions, |file| {
        if comparator.verify_file(file, cli.verbose, &mut out)? {
            failures += 1;
        }
        out.flush()?;
        Ok(())
    })?;

    warn_if_empty(&cli.path, checked);
    if cli.verbose {
        writeln!(out, "\n{checked} checked, {failures} failed")?;
    }
    Ok(failures)
}

fn cmd_verify_json(cli: &Cli, settings: &Settings, comparator: &Comparator) -> anyhow::Result<usize> {
    let mut reports = Vec::new();
    let checked = walker::walk(&cli.path, &settings.extensions, |file| {
        let outcome = comparator.compare_file(file)?;
        if cli.verbose {
            comparator::write_report(&mut std::io::stderr(), file, &outcome, true)?;
        }
        reports.push(FileReport::new(file, &outcome));
        Ok(())
    })?;

    warn_if_empty(&cli.path, checked);
    output::print_json(&reports);
    Ok(reports.iter().filter(|r| r.failed).count())
}

// Exit codes: 0 = verifiers agree, 1 = mismatch found, 2 = config/IO/launch error.
fn cmd_verify(cli: &Cli) -> anyhow::Result<i32> {
    let settings = resolve_settings(cli)?;
    let comparator = build_comparator(&settings)?;

    let failures = if cli.json {
        cmd_verify_json(cli, &settings, &comparator)?
    } else {
        cmd_verify_text(cli, &settings, &comparator)?
    };

    Ok(i32::from(failures > 0 && !cli.exit_zero))
}

fn main() {
    let cli = Cli::parse();
    std::process::exit(or_exit(cmd_verify(&cli)));
}
