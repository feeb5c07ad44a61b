use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::HashMap;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CacheEntry {
    pub cache_key: String,
    pub created_at: i64,
    pub artifact_path: PathBuf,
    pub size: u64,
}

/// Content-addressed task artifact cache with a JSON index.
/// Artifacts are stored gzip-compressed; the index maps cache keys to them.
pub struct LocalCache {
    cache_dir: PathBuf,
    store: Arc<RwLock<HashMap<String, CacheEntry>>>,
    index_path: PathBuf,
}

impl LocalCache {
    pub fn new() -> Result<Self> {
        Self::with_dir(Self::default_cache_dir()?)
    }

    pub fn with_dir<P: Into<PathBuf>>(cache_dir: P) -> Result<Self> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)?;

        let index_path = cache_dir.join("index.json");
        let store = Self::load_index(&index_path)?;

        Ok(Self {
            cache_dir,
            store: Arc::new(RwLock::new(store)),
            index_path,
        })
    }

    fn default_cache_dir() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var("MONOSHIP_CACHE_DIR") {
            return Ok(PathBuf::from(dir));
        }
        let home = std::env::var("HOME").context("HOME environment variable not set")?;
        Ok(PathBuf::from(home).join(".monoship").join("cache"))
    }

    fn load_index(path: &Path) -> Result<HashMap<String, CacheEntry>> {
        if !path.exists() {
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(path)?;
        let store: HashMap<String, CacheEntry> = serde_json::from_str(&content).unwrap_or_default();

        Ok(store)
    }

    fn save_index(&self) -> Result<()> {
        let store = self
            .store
            .read()
            .map_err(|_| anyhow::anyhow!("Poisoned lock"))?;
        let content = serde_json::to_string_pretty(&*store)?;
        fs::write(&self.index_path, content)?;
        Ok(())
    }

    pub fn get_data(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let store = self
            .store
            .read()
            .map_err(|_| anyhow::anyhow!("Poisoned lock"))?;
        if let Some(entry) = store.get(key) {
            let path = self.cache_dir.join(&entry.artifact_path);
            if path.exists() {
                let compressed = fs::read(path)?;
                let mut decoder = GzDecoder::new(&compressed[..]);
                let mut data = Vec::new();
                decoder.read_to_end(&mut data)?;
                return Ok(Some(data));
            }
        }
        Ok(None)
    }

    pub fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        let artifact_path = PathBuf::from(format!("{}.bin.gz", key));
        let full_path = self.cache_dir.join(&artifact_path);

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data)?;
        fs::write(&full_path, encoder.finish()?)?;

        let entry = CacheEntry {
            cache_key: key.to_string(),
            created_at: chrono::Utc::now().timestamp(),
            artifact_path,
            size: data.len() as u64,
        };

        {
            let mut store = self
                .store
                .write()
                .map_err(|_| anyhow::anyhow!("Poisoned lock"))?;
            store.insert(key.to_string(), entry);
        }

        self.save_index()?;

        Ok(())
    }

    pub fn exists(&self, key: &str) -> bool {
        let store = self.store.read().ok();
        store.map(|s| s.contains_key(key)).unwrap_or(false)
    }
}
