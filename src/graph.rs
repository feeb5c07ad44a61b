use crate::error::MonoshipError;
use crate::workspace::Workspace;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One schedulable unit: a task within a project.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskNode {
    pub id: usize,
    pub project: String,
    pub task: String,
    pub command: String,
    /// Directory whose contents are hashed as this node's input
    pub project_dir: PathBuf,
    pub deps: Vec<usize>,
    pub input_hash: String,
    pub cache_key: String,
    pub dirty: bool,
    pub cache_hit: bool,
}

impl TaskNode {
    pub fn label(&self) -> String {
        format!("{}#{}", self.project, self.task)
    }

    /// Computes the content-addressed key for this node from its command, its
    /// input tree hash, and its dependencies' keys. Any upstream change flows
    /// into every downstream key.
    pub fn compute_cache_key(&self, dep_keys: &[String]) -> String {
        let mut hasher = blake3::Hasher::new();

        hasher.update(self.project.as_bytes());
        hasher.update(self.task.as_bytes());
        hasher.update(self.command.as_bytes());
        hasher.update(self.input_hash.as_bytes());

        // Sorted for deterministic ordering regardless of edge insertion
        let mut sorted_dep_keys = dep_keys.to_vec();
        sorted_dep_keys.sort();
        for dep_key in sorted_dep_keys {
            hasher.update(dep_key.as_bytes());
        }

        hasher.finalize().to_hex().to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TaskGraph {
    pub nodes: Vec<TaskNode>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Get nodes in dependency-first order for execution.
    /// Rejects cyclic graphs instead of hanging or overflowing.
    pub fn topological_order(&self) -> Result<Vec<usize>, MonoshipError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        let mut marks = vec![Mark::Unvisited; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());

        fn visit(
            graph: &TaskGraph,
            node: usize,
            marks: &mut Vec<Mark>,
            order: &mut Vec<usize>,
        ) -> Result<(), MonoshipError> {
            match marks[node] {
                Mark::Done => return Ok(()),
                Mark::InProgress => {
                    return Err(MonoshipError::Cycle {
                        node: graph.nodes[node].label(),
                    })
                }
                Mark::Unvisited => {}
            }

            marks[node] = Mark::InProgress;
            for &dep in &graph.nodes[node].deps {
                if dep < graph.nodes.len() {
                    visit(graph, dep, marks, order)?;
                }
            }
            marks[node] = Mark::Done;
            order.push(node);
            Ok(())
        }

        for i in 0..self.nodes.len() {
            visit(self, i, &mut marks, &mut order)?;
        }

        Ok(order)
    }
}

/// Expand a workspace into the graph of (project, task) nodes needed to run
/// `task`, starting from every project that defines it (or just
/// `only_project`), then following `depends_on` references:
/// `"^x"` pulls in task x of each project dependency, a bare `"x"` pulls in
/// task x of the same project.
pub fn build_graph(
    ws: &Workspace,
    root: &Path,
    task: &str,
    only_project: Option<&str>,
) -> Result<TaskGraph, MonoshipError> {
    let mut seeds: Vec<(String, String)> = Vec::new();

    match only_project {
        Some(project) => {
            if !ws.projects.contains_key(project) {
                return Err(MonoshipError::Workspace(format!(
                    "unknown project '{}'",
                    project
                )));
            }
            if ws.task_for(project, task).is_none() {
                return Err(MonoshipError::Workspace(format!(
                    "task '{}' is not defined for project '{}'",
                    task, project
                )));
            }
            seeds.push((project.to_string(), task.to_string()));
        }
        None => {
            for name in ws.projects.keys() {
                if ws.task_for(name, task).is_some() {
                    seeds.push((name.clone(), task.to_string()));
                }
            }
            if seeds.is_empty() {
                return Err(MonoshipError::Workspace(format!(
                    "task '{}' is not defined for any project",
                    task
                )));
            }
        }
    }

    let mut graph = TaskGraph::new();
    let mut ids: HashMap<(String, String), usize> = HashMap::new();
    let mut worklist: Vec<(String, String)> = Vec::new();

    for (project, task_name) in seeds {
        intern_node(ws, root, &project, &task_name, &mut graph, &mut ids, &mut worklist);
    }

    while let Some((project, task_name)) = worklist.pop() {
        let node_id = ids[&(project.clone(), task_name.clone())];
        let depends_on = match ws.task_for(&project, &task_name) {
            Some(def) => def.depends_on.clone(),
            None => continue,
        };
        let project_deps = ws
            .projects
            .get(&project)
            .map(|p| p.deps.clone())
            .unwrap_or_default();

        let mut edges = Vec::new();
        for dep_ref in &depends_on {
            if let Some(upstream_task) = dep_ref.strip_prefix('^') {
                for dep_project in &project_deps {
                    // Skip dependency projects that don't define the task
                    if ws.task_for(dep_project, upstream_task).is_some() {
                        edges.push(intern_node(
                            ws,
                            root,
                            dep_project,
                            upstream_task,
                            &mut graph,
                            &mut ids,
                            &mut worklist,
                        ));
                    }
                }
            } else {
                if ws.task_for(&project, dep_ref).is_none() {
                    return Err(MonoshipError::Workspace(format!(
                        "task '{}' required by {}#{} is not defined",
                        dep_ref, project, task_name
                    )));
                }
                edges.push(intern_node(
                    ws,
                    root,
                    &project,
                    dep_ref,
                    &mut graph,
                    &mut ids,
                    &mut worklist,
                ));
            }
        }

        graph.nodes[node_id].deps = edges;
    }

    Ok(graph)
}

fn intern_node(
    ws: &Workspace,
    root: &Path,
    project: &str,
    task: &str,
    graph: &mut TaskGraph,
    ids: &mut HashMap<(String, String), usize>,
    worklist: &mut Vec<(String, String)>,
) -> usize {
    let key = (project.to_string(), task.to_string());
    if let Some(&id) = ids.get(&key) {
        return id;
    }

    let command = ws
        .task_for(project, task)
        .map(|def| def.command.clone())
        .unwrap_or_default();
    let project_path = ws
        .projects
        .get(project)
        .map(|p| p.path.clone())
        .unwrap_or_default();
    let id = graph.nodes.len();

    graph.nodes.push(TaskNode {
        id,
        project: project.to_string(),
        task: task.to_string(),
        command,
        project_dir: root.join(project_path),
        deps: Vec::new(),
        input_hash: String::new(),
        cache_key: String::new(),
        dirty: false,
        cache_hit: false,
    });

    ids.insert(key.clone(), id);
    worklist.push(key);
    id
}
