use crate::cache::LocalCache;
use crate::error::MonoshipError;
use crate::graph::TaskGraph;
use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

/// Sequential task runner with cache-first execution.
///
/// Tasks run one at a time in dependency order. The first nonzero exit
/// status aborts the whole run and surfaces as a nonzero process exit.
pub struct TaskRunner<'a> {
    cache: &'a LocalCache,
    execution_stats: ExecutionStats,
}

#[derive(Debug, Default, Clone)]
pub struct ExecutionStats {
    pub total_nodes: usize,
    pub executed_nodes: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub total_execution_time_ms: u64,
}

impl<'a> TaskRunner<'a> {
    pub fn new(cache: &'a LocalCache) -> Self {
        Self {
            cache,
            execution_stats: ExecutionStats::default(),
        }
    }

    /// Execute the graph in topological order, replaying cached transcripts
    /// for clean nodes and running commands for dirty ones.
    pub fn execute(&mut self, graph: &mut TaskGraph) -> Result<ExecutionStats> {
        let start_time = Instant::now();

        self.execution_stats = ExecutionStats::default();
        self.execution_stats.total_nodes = graph.nodes.len();

        let order = graph.topological_order()?;

        for node_id in order {
            let label = graph.nodes[node_id].label();
            let key = graph.nodes[node_id].cache_key.clone();

            if !graph.nodes[node_id].dirty {
                if let Some(transcript) = self.cache.get_data(&key)? {
                    println!(
                        "{} Cache HIT: {} [{}]",
                        "⚡".yellow(),
                        label,
                        &key[..8.min(key.len())]
                    );
                    print!("{}", String::from_utf8_lossy(&transcript));
                    graph.nodes[node_id].cache_hit = true;
                    self.execution_stats.cache_hits += 1;
                    continue;
                }
                // Clean node whose artifact was evicted from the index:
                // run it again and repopulate the cache.
                tracing::debug!(node = %label, "clean node missing from cache, re-running");
            }

            println!("🔧 Running {} ({})", label, graph.nodes[node_id].command);

            let node_start = Instant::now();
            let transcript = self.run_node(graph, node_id)?;
            tracing::info!(
                node = %label,
                duration_ms = node_start.elapsed().as_millis() as u64,
                "task completed"
            );

            if let Err(e) = self.cache.put(&key, &transcript) {
                eprintln!("⚠️ Cache put error for {}: {}", label, e);
            }

            graph.nodes[node_id].dirty = false;
            self.execution_stats.cache_misses += 1;
            self.execution_stats.executed_nodes += 1;
        }

        self.execution_stats.total_execution_time_ms = start_time.elapsed().as_millis() as u64;
        self.print_execution_summary();

        Ok(self.execution_stats.clone())
    }

    /// Run one node's command via `sh -c` in its project directory,
    /// returning the combined output transcript.
    fn run_node(&self, graph: &TaskGraph, node_id: usize) -> Result<Vec<u8>> {
        let node = &graph.nodes[node_id];

        let output = Command::new("sh")
            .arg("-c")
            .arg(&node.command)
            .current_dir(&node.project_dir)
            .output()
            .with_context(|| format!("spawning command for {}", node.label()))?;

        print!("{}", String::from_utf8_lossy(&output.stdout));
        eprint!("{}", String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            println!("{} {} failed", "✗".red(), node.label());
            return Err(MonoshipError::TaskFailed {
                task: node.label(),
                code: output.status.code().unwrap_or(-1),
            }
            .into());
        }

        let mut transcript = output.stdout;
        transcript.extend_from_slice(&output.stderr);
        Ok(transcript)
    }

    fn print_execution_summary(&self) {
        println!("\n📊 Execution Summary:");
        println!("  Total tasks: {}", self.execution_stats.total_nodes);
        println!("  Executed: {}", self.execution_stats.executed_nodes);
        println!(
            "  Cache hits: {}",
            self.execution_stats.cache_hits.to_string().green()
        );
        println!(
            "  Total time: {}ms",
            self.execution_stats.total_execution_time_ms
        );

        if self.execution_stats.total_nodes > 0 {
            let cache_hit_rate = (self.execution_stats.cache_hits as f64
                / self.execution_stats.total_nodes as f64)
                * 100.0;
            println!("  Cache hit rate: {:.1}%", cache_hit_rate);
        }
    }
}
