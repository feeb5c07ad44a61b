use crate::hasher::ignore::IgnoreRules;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Walk a directory and return all non-ignored files, sorted by path so the
/// result is stable across filesystems and operating systems.
pub fn walk_dir(root: &Path, ignore: &IgnoreRules) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let rel = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_path_buf();
            if ignore.is_ignored(&rel) {
                None
            } else {
                Some(entry.path().to_path_buf())
            }
        })
        .collect();

    files.sort();
    files
}
