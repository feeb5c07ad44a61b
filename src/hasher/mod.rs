pub mod ignore;
pub mod walker;

pub use ignore::IgnoreRules;

use anyhow::Result;
use std::fs;
use std::path::Path;

/// Hash a file or directory tree with BLAKE3.
///
/// Directories are walked deterministically (sorted paths) and each file
/// contributes its root-relative path followed by its content, so renames
/// and moves change the hash as much as edits do.
pub fn hash_path(path: &Path, ignore: &IgnoreRules) -> Result<String> {
    let mut hasher = blake3::Hasher::new();

    if path.is_file() {
        hasher.update(&fs::read(path)?);
    } else {
        for file in walker::walk_dir(path, ignore) {
            let rel = file.strip_prefix(path).unwrap_or(&file);
            hasher.update(rel.to_string_lossy().as_bytes());
            hasher.update(&fs::read(&file)?);
        }
    }

    Ok(hasher.finalize().to_hex().to_string())
}
