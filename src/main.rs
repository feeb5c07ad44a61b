use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::Path;

use monoship::cache::LocalCache;
use monoship::config::{self, PushConfig};
use monoship::core;
use monoship::executor::TaskRunner;
use monoship::graph;
use monoship::logging;
use monoship::oci::layout::ImageLayout;
use monoship::oci::registry::RegistryClient;
use monoship::oci::ImageRef;
use monoship::server;
use monoship::workspace::{Workspace, WORKSPACE_FILE};

#[derive(Parser)]
#[command(
    name = "monoship",
    version,
    about = "Monorepo task runner with incremental caching and OCI image publishing"
)]
struct Cli {
    /// Emit logs as JSON instead of human-readable lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a task across the workspace in dependency order
    Run {
        /// Task name from workspace.json
        task: String,
        /// Restrict to a single project (and what it needs)
        #[arg(long)]
        project: Option<String>,
    },
    /// Push an app's built OCI image to the registry and print its digest
    Push {
        /// App name; the artifact is expected under dist/<app>/
        app: String,
    },
    /// Print the registry digest for an app, or a full registry/repo:tag reference
    Digest { image: String },
    /// Serve the status API
    Serve {
        #[arg(long, default_value_t = 8080, env = "MONOSHIP_PORT")]
        port: u16,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(cli.log_json) {
        eprintln!("⚠️ Failed to initialize logging: {}", e);
    }

    match cli.command {
        Commands::Run { task, project } => cmd_run(&task, project.as_deref()),
        Commands::Push { app } => cmd_push(&app),
        Commands::Digest { image } => cmd_digest(&image),
        Commands::Serve { port } => {
            // The registry client is blocking; only `serve` gets a runtime.
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(server::serve(port, config::environment_label()))
        }
    }
}

/// Starter workspace: two demo apps and a shared package, so `monoship run
/// build` works in an empty directory.
const STARTER_WORKSPACE: &str = r#"{
  "projects": {
    "web": {"path": "apps/web", "deps": ["ui"]},
    "api": {"path": "apps/api"},
    "ui": {"path": "packages/ui"}
  },
  "tasks": {
    "build": {"command": "echo build placeholder", "depends_on": ["^build"], "outputs": ["dist"]},
    "lint": {"command": "echo lint placeholder"},
    "test": {"command": "echo test placeholder", "depends_on": ["build"]}
  }
}
"#;

fn cmd_run(task: &str, project: Option<&str>) -> Result<()> {
    let root = std::env::current_dir()?;

    if !root.join(WORKSPACE_FILE).exists() {
        for dir in ["apps/web", "apps/api", "packages/ui"] {
            std::fs::create_dir_all(root.join(dir))?;
        }
        std::fs::write(root.join(WORKSPACE_FILE), STARTER_WORKSPACE)?;
        println!("📄 Generated starter {}", WORKSPACE_FILE);
    }

    let ws = Workspace::load(&root.join(WORKSPACE_FILE))?;

    let mut graph = graph::build_graph(&ws, &root, task, project)?;
    println!("📊 {} tasks scheduled for '{}'", graph.nodes.len(), task);

    core::detect_changes(&mut graph)?;
    core::compute_cache_keys(&mut graph)?;

    let cache = LocalCache::new()?;
    core::mark_dirty(&mut graph, &cache);
    core::propagate_dirty(&mut graph);

    let dirty = graph.nodes.iter().filter(|n| n.dirty).count();
    println!("   {} dirty  |  {} cached", dirty, graph.nodes.len() - dirty);

    let mut runner = TaskRunner::new(&cache);
    runner.execute(&mut graph)?;

    Ok(())
}

fn cmd_push(app: &str) -> Result<()> {
    let cfg = PushConfig::from_env(app)?;

    let mut client = RegistryClient::new(&cfg.registry, &cfg.repository);
    if let Some(ref token) = cfg.token {
        client.set_token(token);
        client.verify_login()?;
        println!("🔐 Authenticated with {}", cfg.registry);
    }

    let layout = ImageLayout::open(Path::new("dist"), app)?;
    println!("📦 Using artifact at {}", layout.root().display());

    let image_digest = client.push(&layout, &cfg.tag)?;
    println!("✅ Pushed {}", cfg.image_ref());
    // The digest alone must be the final stdout line
    println!("{}", image_digest);

    Ok(())
}

fn cmd_digest(image: &str) -> Result<()> {
    let (mut client, tag) = if image.contains('/') {
        let image_ref = ImageRef::parse(image)
            .ok_or_else(|| anyhow!("invalid image reference '{}'", image))?;
        (
            RegistryClient::new(&image_ref.registry, &image_ref.repository),
            image_ref.tag,
        )
    } else {
        let cfg = PushConfig::from_env(image)?;
        (
            RegistryClient::new(&cfg.registry, &cfg.repository),
            cfg.tag,
        )
    };

    if let Some(token) = config::registry_token() {
        client.set_token(&token);
    }

    println!("{}", client.resolve_digest(&tag)?);
    Ok(())
}
