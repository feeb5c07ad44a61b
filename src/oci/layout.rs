use crate::error::MonoshipError;
use crate::oci::digest;
use crate::oci::manifest::{ImageIndex, ImageManifest};
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A locally built OCI image layout: `index.json`, `oci-layout`, and blobs
/// under `blobs/sha256/`. Produced by the build task, consumed by `push`.
#[derive(Debug)]
pub struct ImageLayout {
    root: PathBuf,
    /// Keeps the unpack directory alive when the layout came from an archive
    _unpacked: Option<TempDir>,
}

impl ImageLayout {
    /// Locate the built image for `app` under `dist_dir`: either the layout
    /// directory `dist/<app>/image` or the archive `dist/<app>/image.tar`,
    /// which gets unpacked to a temporary directory first.
    pub fn open(dist_dir: &Path, app: &str) -> Result<Self> {
        let layout_dir = dist_dir.join(app).join("image");
        let archive = dist_dir.join(app).join("image.tar");

        if layout_dir.is_dir() {
            return Ok(Self {
                root: layout_dir,
                _unpacked: None,
            });
        }

        if archive.is_file() {
            let tmp = TempDir::new()?;
            let file = File::open(&archive)
                .with_context(|| format!("opening {}", archive.display()))?;
            tar::Archive::new(file)
                .unpack(tmp.path())
                .with_context(|| format!("unpacking {}", archive.display()))?;
            return Ok(Self {
                root: tmp.path().to_path_buf(),
                _unpacked: Some(tmp),
            });
        }

        Err(MonoshipError::ArtifactMissing {
            app: app.to_string(),
            layout: layout_dir,
            archive,
        }
        .into())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read the layout's manifest: its digest from `index.json`, the raw
    /// manifest bytes (needed verbatim for upload), and the parsed form.
    pub fn manifest(&self) -> Result<(String, String, ImageManifest)> {
        let index_path = self.root.join("index.json");
        let index_content = fs::read_to_string(&index_path)
            .with_context(|| format!("reading {}", index_path.display()))?;
        let index: ImageIndex =
            serde_json::from_str(&index_content).context("parsing index.json")?;

        let descriptor = index
            .manifests
            .first()
            .context("no manifest listed in index.json")?;

        let manifest_path = self.blob_path(&descriptor.digest);
        let manifest_content = fs::read_to_string(&manifest_path)
            .with_context(|| format!("reading manifest blob {}", descriptor.digest))?;
        let manifest: ImageManifest =
            serde_json::from_str(&manifest_content).context("parsing image manifest")?;

        Ok((descriptor.digest.clone(), manifest_content, manifest))
    }

    pub fn blob_path(&self, blob_digest: &str) -> PathBuf {
        self.root
            .join("blobs")
            .join("sha256")
            .join(digest::digest_hex(blob_digest))
    }
}
