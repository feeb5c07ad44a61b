pub mod digest;
pub mod layout;
pub mod manifest;
pub mod registry;

use std::fmt;

/// An image identifier: registry host, repository name, and tag,
/// concatenated as `registry/repository:tag` by convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub registry: String,
    pub repository: String,
    pub tag: String,
}

impl ImageRef {
    pub fn new(registry: &str, repository: &str, tag: &str) -> Self {
        Self {
            registry: registry.to_string(),
            repository: repository.to_string(),
            tag: tag.to_string(),
        }
    }

    /// Parse `registry/repo[:tag]`; the tag defaults to `latest` and the
    /// registry is everything before the first slash. A colon inside the
    /// registry host (a port) is not a tag separator.
    pub fn parse(full_name: &str) -> Option<Self> {
        let (registry_repo, tag) = match full_name.rsplit_once(':') {
            Some((head, t)) if !t.contains('/') => (head, t),
            _ => (full_name, "latest"),
        };
        let (registry, repo) = registry_repo.split_once('/')?;

        if registry.is_empty() || repo.is_empty() || tag.is_empty() {
            return None;
        }

        Some(Self::new(registry, repo, tag))
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.registry, self.repository, self.tag)
    }
}
