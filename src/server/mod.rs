use anyhow::Result;
use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

/// Shared state for the status API. Everything served is computed per
/// request from the current process; nothing is persisted.
pub struct AppState {
    started: Instant,
    environment: String,
}

impl AppState {
    pub fn new(environment: String) -> Self {
        Self {
            started: Instant::now(),
            environment,
        }
    }

    fn uptime_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(port: u16, environment: String) -> Result<()> {
    let state = Arc::new(AppState::new(environment));
    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    println!("🌐 monoship status API running on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}

async fn service_info() -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "endpoints": ["/", "/health", "/metrics"],
    }))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
        "environment": state.environment,
        "uptime_seconds": state.uptime_seconds(),
    }))
}

async fn metrics(State(state): State<Arc<AppState>>) -> Json<Value> {
    let (rss_bytes, vm_bytes) = process_memory();
    Json(json!({
        "pid": std::process::id(),
        "uptime_seconds": state.uptime_seconds(),
        "memory": {
            "rss_bytes": rss_bytes,
            "vm_bytes": vm_bytes,
        },
        "os": std::env::consts::OS,
        "arch": std::env::consts::ARCH,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Resident and virtual set size from /proc/self/status, in bytes.
/// Both report zero where /proc is unavailable.
fn process_memory() -> (u64, u64) {
    let content = match std::fs::read_to_string("/proc/self/status") {
        Ok(c) => c,
        Err(_) => return (0, 0),
    };

    let mut rss = 0;
    let mut vm = 0;
    for line in content.lines() {
        if let Some(rest) = line.strip_prefix("VmRSS:") {
            rss = parse_kb_line(rest);
        } else if let Some(rest) = line.strip_prefix("VmSize:") {
            vm = parse_kb_line(rest);
        }
    }
    (rss, vm)
}

fn parse_kb_line(rest: &str) -> u64 {
    rest.split_whitespace()
        .next()
        .and_then(|n| n.parse::<u64>().ok())
        .map(|kb| kb * 1024)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kb_line() {
        assert_eq!(parse_kb_line("    1024 kB"), 1024 * 1024);
        assert_eq!(parse_kb_line("garbage"), 0);
    }

    #[test]
    fn test_process_memory_on_linux() {
        let (rss, vm) = process_memory();
        if cfg!(target_os = "linux") {
            assert!(rss > 0, "a running process has resident memory");
            assert!(vm >= rss);
        }
    }
}
