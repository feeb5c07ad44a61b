use crate::cache::LocalCache;
use crate::graph::TaskGraph;
use crate::hasher::{self, IgnoreRules};
use anyhow::{Context, Result};

/// Hash a string using BLAKE3 (used for nodes without a real input tree)
pub fn hash_str(input: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(input.as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// Compute every node's input hash from its project directory.
/// Ignore rules are loaded per project (.monoshipignore > .gitignore > none).
pub fn detect_changes(graph: &mut TaskGraph) -> Result<()> {
    for node in graph.nodes.iter_mut() {
        let ignore = IgnoreRules::for_context(&node.project_dir);
        node.input_hash = if node.project_dir.exists() {
            hasher::hash_path(&node.project_dir, &ignore)
                .with_context(|| format!("hashing inputs of {}", node.label()))?
        } else {
            // A project path that doesn't exist yet still gets a stable key
            hash_str(&node.project_dir.to_string_lossy())
        };
    }
    Ok(())
}

/// Recompute composite cache keys for all nodes in topological order, so a
/// node's key reflects its command, its inputs, and its dependencies' keys.
pub fn compute_cache_keys(graph: &mut TaskGraph) -> Result<()> {
    let order = graph.topological_order()?;

    for node_id in order {
        let dep_keys: Vec<String> = graph.nodes[node_id]
            .deps
            .iter()
            .map(|&d| graph.nodes[d].cache_key.clone())
            .collect();

        graph.nodes[node_id].cache_key = graph.nodes[node_id].compute_cache_key(&dep_keys);
    }

    Ok(())
}

/// A node is dirty when its key has no cached artifact.
pub fn mark_dirty(graph: &mut TaskGraph, cache: &LocalCache) {
    for node in graph.nodes.iter_mut() {
        node.dirty = !cache.exists(&node.cache_key);
        if node.dirty {
            let key = &node.cache_key;
            tracing::debug!(node = %node.label(), key = %&key[..8.min(key.len())], "cache miss");
        }
    }
}

/// Propagate dirty flags: if a dependency is dirty, mark all dependents dirty too.
pub fn propagate_dirty(graph: &mut TaskGraph) {
    let mut changed = true;
    while changed {
        changed = false;
        for i in 0..graph.nodes.len() {
            let deps_dirty = graph.nodes[i]
                .deps
                .iter()
                .any(|&d| d < graph.nodes.len() && graph.nodes[d].dirty);

            if deps_dirty && !graph.nodes[i].dirty {
                graph.nodes[i].dirty = true;
                changed = true;
            }
        }
    }
}
