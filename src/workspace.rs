use crate::error::MonoshipError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Name of the declarative workspace file at the repository root.
pub const WORKSPACE_FILE: &str = "workspace.json";

/// The parsed `workspace.json`: which projects exist, where they live, how
/// they depend on each other, and which tasks can run across them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    #[serde(default)]
    pub projects: BTreeMap<String, Project>,
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub path: PathBuf,
    /// Names of projects this one depends on
    #[serde(default)]
    pub deps: Vec<String>,
    /// Per-project task overrides; fall back to the workspace-level task
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDef {
    pub command: String,
    /// `"^build"` means "the build task of every project dependency";
    /// a bare `"build"` means "this project's build task, first".
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
}

impl Workspace {
    pub fn load(path: &Path) -> Result<Self, MonoshipError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MonoshipError::Workspace(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, MonoshipError> {
        let ws: Workspace = serde_json::from_str(content)
            .map_err(|e| MonoshipError::Workspace(format!("invalid workspace file: {}", e)))?;
        ws.validate()?;
        Ok(ws)
    }

    /// Every project dependency must name a project declared in this file.
    fn validate(&self) -> Result<(), MonoshipError> {
        for (name, project) in &self.projects {
            for dep in &project.deps {
                if !self.projects.contains_key(dep) {
                    return Err(MonoshipError::Workspace(format!(
                        "project '{}' depends on unknown project '{}'",
                        name, dep
                    )));
                }
            }
        }
        Ok(())
    }

    /// Resolve the task definition for a project, honoring overrides.
    pub fn task_for(&self, project: &str, task: &str) -> Option<&TaskDef> {
        self.projects
            .get(project)
            .and_then(|p| p.tasks.get(task))
            .or_else(|| self.tasks.get(task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "projects": {
            "web": {"path": "apps/web", "deps": ["ui"]},
            "api": {"path": "apps/api"},
            "ui": {"path": "packages/ui"}
        },
        "tasks": {
            "build": {"command": "npm run build", "depends_on": ["^build"], "outputs": ["dist"]},
            "lint": {"command": "npm run lint"}
        }
    }"#;

    #[test]
    fn test_parse_sample() {
        let ws = Workspace::parse(SAMPLE).unwrap();
        assert_eq!(ws.projects.len(), 3);
        assert_eq!(ws.projects["web"].deps, vec!["ui"]);
        assert_eq!(ws.tasks["build"].depends_on, vec!["^build"]);
        assert!(ws.tasks["lint"].depends_on.is_empty());
    }

    #[test]
    fn test_unknown_dep_rejected() {
        let err = Workspace::parse(
            r#"{"projects": {"web": {"path": "apps/web", "deps": ["ghost"]}}, "tasks": {}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(Workspace::parse("{not json").is_err());
    }

    #[test]
    fn test_task_override_wins() {
        let ws = Workspace::parse(
            r#"{
                "projects": {
                    "ui": {"path": "packages/ui", "tasks": {"build": {"command": "make ui"}}}
                },
                "tasks": {"build": {"command": "npm run build"}}
            }"#,
        )
        .unwrap();
        assert_eq!(ws.task_for("ui", "build").unwrap().command, "make ui");
        assert!(ws.task_for("ui", "lint").is_none());
    }

    #[test]
    fn test_empty_workspace_is_valid() {
        let ws = Workspace::parse(r#"{"projects": {}, "tasks": {}}"#).unwrap();
        assert!(ws.projects.is_empty());
    }
}
