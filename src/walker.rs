use std::path::{Path, PathBuf};

use anyhow::Context;

/// Image suffixes used when none are configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &["e01"];

// `._disk.E01` AppleDouble sidecars and other dot-files are not images.
fn is_hidden(entry: &std::fs::DirEntry) -> bool {
    entry.file_name().as_encoded_bytes().starts_with(b".")
}

fn has_image_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
}

/// Resolve `path` to the images to check.
///
/// A file is returned as-is, whatever its extension. For a directory, every
/// immediate regular file whose extension matches one of `extensions`
/// (case-insensitively, without the leading dot) is returned, sorted by
/// name. Names starting with `.` are skipped. Subdirectories are not searched.
///
/// # Errors
///
/// Returns an error if `path` does not exist or the directory cannot be read.
pub fn image_files(path: &Path, extensions: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let meta =
        std::fs::metadata(path).with_context(|| format!("cannot access {}", path.display()))?;
    if !meta.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let entries = std::fs::read_dir(path)
        .with_context(|| format!("cannot read directory {}", path.display()))?;
    let mut entries: Vec<_> = entries.filter_map(Result::ok).collect();
    entries.sort_by_key(std::fs::DirEntry::file_name);

    Ok(entries
        .iter()
        .filter(|e| !is_hidden(e))
        .map(std::fs::DirEntry::path)
        .filter(|p| p.is_file() && has_image_extension(p, extensions))
        .collect())
}

/// Call `visit` once per image under `path`, stopping at the first error.
/// Returns the number of images visited.
///
/// # Errors
///
/// Returns an error from [`image_files`] or from `visit`.
pub fn walk(
    path: &Path,
    extensions: &[String],
    mut visit: impl FnMut(&Path) -> anyhow::Result<()>,
) -> anyhow::Result<usize> {
    let files = image_files(path, extensions)?;
    for file in &files {
        visit(file)?;
    }
    Ok(files.len())
}
