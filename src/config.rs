use crate::error::MonoshipError;
use crate::oci::ImageRef;
use std::env;

/// Registry publishing configuration, resolved from the environment.
///
/// `MONOSHIP_REGISTRY` and `MONOSHIP_TAG` are required and must be non-empty.
/// `MONOSHIP_REPO` overrides the repository name (defaults to the app name),
/// `MONOSHIP_TOKEN` enables bearer authentication.
#[derive(Debug, Clone)]
pub struct PushConfig {
    pub registry: String,
    pub repository: String,
    pub tag: String,
    pub token: Option<String>,
}

impl PushConfig {
    pub fn from_env(app: &str) -> Result<Self, MonoshipError> {
        let registry = required_env("MONOSHIP_REGISTRY")?;
        let tag = required_env("MONOSHIP_TAG")?;
        let repository = optional_env("MONOSHIP_REPO").unwrap_or_else(|| app.to_string());
        let token = optional_env("MONOSHIP_TOKEN");

        Ok(Self {
            registry,
            repository,
            tag,
            token,
        })
    }

    pub fn image_ref(&self) -> ImageRef {
        ImageRef::new(&self.registry, &self.repository, &self.tag)
    }
}

/// Environment label reported by the status API (`MONOSHIP_ENV`).
pub fn environment_label() -> String {
    optional_env("MONOSHIP_ENV").unwrap_or_else(|| "development".to_string())
}

/// Bearer token for registry requests, when configured.
pub fn registry_token() -> Option<String> {
    optional_env("MONOSHIP_TOKEN")
}

fn required_env(name: &str) -> Result<String, MonoshipError> {
    optional_env(name)
        .ok_or_else(|| MonoshipError::Config(format!("{} must be set and non-empty", name)))
}

fn optional_env(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment variables are process-global, so every case lives in one
    // test to keep the assertions race-free under the parallel test runner.
    #[test]
    fn test_push_config_from_env() {
        env::remove_var("MONOSHIP_REGISTRY");
        env::remove_var("MONOSHIP_TAG");
        env::remove_var("MONOSHIP_REPO");
        env::remove_var("MONOSHIP_TOKEN");

        // Missing registry
        let err = PushConfig::from_env("web").unwrap_err();
        assert!(err.to_string().contains("MONOSHIP_REGISTRY"));

        // Empty string counts as missing
        env::set_var("MONOSHIP_REGISTRY", "  ");
        let err = PushConfig::from_env("web").unwrap_err();
        assert!(err.to_string().contains("MONOSHIP_REGISTRY"));

        env::set_var("MONOSHIP_REGISTRY", "ghcr.io");
        let err = PushConfig::from_env("web").unwrap_err();
        assert!(err.to_string().contains("MONOSHIP_TAG"));

        // Fully configured; repo defaults to the app name
        env::set_var("MONOSHIP_TAG", "v1.2.3");
        let cfg = PushConfig::from_env("web").unwrap();
        assert_eq!(cfg.registry, "ghcr.io");
        assert_eq!(cfg.repository, "web");
        assert_eq!(cfg.tag, "v1.2.3");
        assert!(cfg.token.is_none());

        // Explicit repo override and token
        env::set_var("MONOSHIP_REPO", "acme/web");
        env::set_var("MONOSHIP_TOKEN", "secret");
        let cfg = PushConfig::from_env("web").unwrap();
        assert_eq!(cfg.repository, "acme/web");
        assert_eq!(cfg.token.as_deref(), Some("secret"));
        assert_eq!(cfg.image_ref().to_string(), "ghcr.io/acme/web:v1.2.3");

        env::remove_var("MONOSHIP_REGISTRY");
        env::remove_var("MONOSHIP_TAG");
        env::remove_var("MONOSHIP_REPO");
        env::remove_var("MONOSHIP_TOKEN");
    }
}
