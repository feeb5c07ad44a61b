use std::path::PathBuf;
use thiserror::Error;

/// Main error type for monoship operations
#[derive(Debug, Error)]
pub enum MonoshipError {
    /// Required configuration is missing or empty
    #[error("configuration error: {0}")]
    Config(String),

    /// The workspace file is missing, malformed, or inconsistent
    #[error("workspace error: {0}")]
    Workspace(String),

    /// The task graph contains a dependency cycle
    #[error("dependency cycle detected at {node}")]
    Cycle { node: String },

    /// No built image artifact was found for the app
    #[error(
        "image artifact for '{app}' not found: expected {layout} or {archive} (build it first)"
    )]
    ArtifactMissing {
        app: String,
        layout: PathBuf,
        archive: PathBuf,
    },

    /// A task exited with a nonzero status
    #[error("task {task} failed with exit code {code}")]
    TaskFailed { task: String, code: i32 },

    /// The registry rejected a request or returned an unexpected response
    #[error("registry error: {0}")]
    Registry(String),
}
