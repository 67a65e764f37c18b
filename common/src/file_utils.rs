//! File utility functions for listing files and deriving product names.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Returns paths to all files in a directory matching the given extensions,
/// sorted by file name. Extensions are matched case-insensitively.
///
/// A missing directory yields an empty list.
pub fn files_with_extensions(dir: &Path, extensions: &[&str]) -> io::Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        if extensions.contains(&ext.to_lowercase().as_str()) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// File stem with everything from the last `_` removed, when that `_` is
/// not the first character.
///
/// `W3OH_12_20.sdf` becomes `W3OH_12`, `_raw.fits` stays `_raw`.
pub fn stem_without_suffix(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match stem.rfind('_') {
        Some(idx) if idx > 0 => stem[..idx].to_string(),
        _ => stem,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_only_matching_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.fits", "a.FIT", "c.txt", "d.fits.bak"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("sub.fits")).unwrap();

        let files = files_with_extensions(dir.path(), &["fit", "fits"]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.FIT", "b.fits"]);
    }

    #[test]
    fn missing_directory_is_empty() {
        let files = files_with_extensions(Path::new("/nonexistent/sdmap"), &["fits"]).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn strips_extension_and_last_underscore_suffix() {
        assert_eq!(stem_without_suffix(Path::new("data/W3OH_12_20.sdf")), "W3OH_12");
        assert_eq!(stem_without_suffix(Path::new("orion.fits")), "orion");
        assert_eq!(stem_without_suffix(Path::new("_raw.fits")), "_raw");
        assert_eq!(stem_without_suffix(Path::new("a_b")), "a");
    }
}
