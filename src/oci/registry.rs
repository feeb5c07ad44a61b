use crate::oci::digest;
use crate::oci::layout::ImageLayout;
use crate::oci::manifest::MANIFEST_MEDIA_TYPE;
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use std::fs;
use std::path::Path;

/// Blocking client for the registry `/v2/` protocol: blob upload, manifest
/// upload, and digest resolution. Every failure is surfaced immediately;
/// there is no retry layer.
pub struct RegistryClient {
    client: Client,
    base_url: String, // e.g. https://ghcr.io/v2
    repo: String,     // e.g. acme/web
    token: Option<String>,
}

impl RegistryClient {
    pub fn new(registry: &str, repo: &str) -> Self {
        let base_url = if registry.contains("://") {
            format!("{}/v2", registry)
        } else {
            format!("https://{}/v2", registry)
        };

        Self {
            client: Client::new(),
            base_url,
            repo: repo.to_string(),
            token: None,
        }
    }

    pub fn set_token(&mut self, token: &str) {
        self.token = Some(token.to_string());
    }

    /// Verify credentials once against the registry API root before any
    /// upload traffic.
    pub fn verify_login(&self) -> Result<()> {
        let url = format!("{}/", self.base_url);
        let mut rb = self.client.get(&url);
        if let Some(ref t) = self.token {
            rb = rb.bearer_auth(t);
        }

        let resp = rb.send().context("registry login check failed")?;
        if !resp.status().is_success() {
            anyhow::bail!(
                "registry login to {} rejected: {}",
                self.base_url,
                resp.status()
            );
        }
        Ok(())
    }

    /// Push an OCI layout to the registry under `tag` and return the image's
    /// content digest as reported by the registry.
    pub fn push(&self, layout: &ImageLayout, tag: &str) -> Result<String> {
        println!("🚀 Pushing image to {}/{}...", self.base_url, self.repo);

        let (manifest_digest, manifest_content, manifest) = layout.manifest()?;

        for layer in &manifest.layers {
            self.upload_blob(&layer.digest, &layout.blob_path(&layer.digest))?;
        }

        self.upload_blob(
            &manifest.config.digest,
            &layout.blob_path(&manifest.config.digest),
        )?;

        self.upload_manifest(tag, &manifest_content)?;

        // Read the digest back from the registry; if it can't be resolved,
        // the locally computed manifest digest is the same content address.
        let pushed_digest = match self.resolve_digest(tag) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(error = %e, "digest read-back failed, using local digest");
                manifest_digest
            }
        };

        Ok(pushed_digest)
    }

    /// Resolve the current content digest for `tag`. Prefers the
    /// Docker-Content-Digest header; falls back to hashing the manifest body.
    pub fn resolve_digest(&self, tag: &str) -> Result<String> {
        let url = format!("{}/{}/manifests/{}", self.base_url, self.repo, tag);

        let mut rb = self
            .client
            .head(&url)
            .header("Accept", MANIFEST_MEDIA_TYPE);
        if let Some(ref t) = self.token {
            rb = rb.bearer_auth(t);
        }

        let resp = rb.send()?;
        if !resp.status().is_success() {
            anyhow::bail!("failed to resolve digest for tag {}: {}", tag, resp.status());
        }

        if let Some(d) = resp
            .headers()
            .get("Docker-Content-Digest")
            .and_then(|v| v.to_str().ok())
        {
            return Ok(d.to_string());
        }

        // Registry without the digest header: fetch the manifest and hash it
        let mut rb = self
            .client
            .get(&url)
            .header("Accept", MANIFEST_MEDIA_TYPE);
        if let Some(ref t) = self.token {
            rb = rb.bearer_auth(t);
        }

        let resp = rb.send()?;
        if !resp.status().is_success() {
            anyhow::bail!("failed to fetch manifest for tag {}: {}", tag, resp.status());
        }

        Ok(digest::sha256_string(&resp.text()?))
    }

    fn blob_exists(&self, blob_digest: &str) -> Result<bool> {
        let url = format!("{}/{}/blobs/{}", self.base_url, self.repo, blob_digest);
        let mut rb = self.client.head(&url);
        if let Some(ref t) = self.token {
            rb = rb.bearer_auth(t);
        }
        let resp = rb.send()?;
        Ok(resp.status().is_success())
    }

    fn upload_blob(&self, blob_digest: &str, path: &Path) -> Result<()> {
        // Skip blobs the registry already has
        if self.blob_exists(blob_digest)? {
            println!("   (skip blob: {} already exists)", status_hash(blob_digest));
            return Ok(());
        }

        println!("   📤 Uploading blob: {}...", status_hash(blob_digest));

        let url = format!("{}/{}/blobs/uploads/", self.base_url, self.repo);
        let mut rb = self.client.post(&url);
        if let Some(ref t) = self.token {
            rb = rb.bearer_auth(t);
        }

        let resp = rb.send()?;
        if !resp.status().is_success() {
            anyhow::bail!("failed to initiate blob upload: {}", resp.status());
        }

        let location = resp
            .headers()
            .get("Location")
            .context("no Location header in upload initiation")?
            .to_str()?;

        // The Location may be relative, and may or may not carry a query
        let absolute = if location.starts_with('/') {
            let host = self
                .base_url
                .split("/v2")
                .next()
                .unwrap_or(&self.base_url);
            format!("{}{}", host, location)
        } else {
            location.to_string()
        };
        let separator = if absolute.contains('?') { '&' } else { '?' };
        let final_url = format!("{}{}digest={}", absolute, separator, blob_digest);

        let file_content =
            fs::read(path).with_context(|| format!("reading blob {}", path.display()))?;
        let mut rb = self.client.put(&final_url).body(file_content);
        if let Some(ref t) = self.token {
            rb = rb.bearer_auth(t);
        }

        let resp = rb.send()?;
        if !resp.status().is_success() {
            anyhow::bail!("failed to upload blob: {}", resp.status());
        }

        Ok(())
    }

    fn upload_manifest(&self, tag: &str, content: &str) -> Result<()> {
        println!("   📜 Uploading manifest for tag {}...", tag);
        let url = format!("{}/{}/manifests/{}", self.base_url, self.repo, tag);

        let mut rb = self
            .client
            .put(&url)
            .header("Content-Type", MANIFEST_MEDIA_TYPE)
            .body(content.to_string());

        if let Some(ref t) = self.token {
            rb = rb.bearer_auth(t);
        }

        let resp = rb.send()?;
        if !resp.status().is_success() {
            anyhow::bail!("failed to upload manifest: {}", resp.status());
        }

        Ok(())
    }
}

fn status_hash(blob_digest: &str) -> &str {
    if blob_digest.len() > 15 {
        &blob_digest[7..15]
    } else {
        blob_digest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalization() {
        let client = RegistryClient::new("ghcr.io", "acme/web");
        assert_eq!(client.base_url, "https://ghcr.io/v2");

        let client = RegistryClient::new("http://localhost:5000", "web");
        assert_eq!(client.base_url, "http://localhost:5000/v2");
    }
}
