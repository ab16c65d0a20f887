//! Where puzzle pools come from.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::puzzle::ingest::{PoolRecord, PuzzleSource};

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Failed to read puzzle pool: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse puzzle pool: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown puzzle category: {0}")]
    NotFound(String),
}

pub trait PoolSource: Send + Sync {
    fn fetch_pool(&self, category: &str) -> Result<Vec<PuzzleSource>, PoolError>;
}

/// One JSON array of pool records per category: `<dir>/<category>.json`.
#[derive(Debug, Clone)]
pub struct JsonPoolSource {
    dir: PathBuf,
}

impl JsonPoolSource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, category: &str) -> PathBuf {
        self.dir.join(format!("{}.json", category))
    }
}

impl PoolSource for JsonPoolSource {
    fn fetch_pool(&self, category: &str) -> Result<Vec<PuzzleSource>, PoolError> {
        if category.is_empty() || category.contains(['/', '\\']) || category.contains("..") {
            return Err(PoolError::NotFound(category.to_string()));
        }
        let path = self.path_for(category);
        if !path.exists() {
            return Err(PoolError::NotFound(category.to_string()));
        }
        let reader = BufReader::new(File::open(&path)?);
        let records: Vec<PoolRecord> = serde_json::from_reader(reader)?;
        info!("Loaded {} puzzle records from {}", records.len(), path.display());
        Ok(records.into_iter().map(PuzzleSource::Pool).collect())
    }
}

/// Fixed pools keyed by category.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPool {
    categories: HashMap<String, Vec<PuzzleSource>>,
}

impl InMemoryPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, category: impl Into<String>, sources: Vec<PuzzleSource>) -> Self {
        self.categories.insert(category.into(), sources);
        self
    }
}

impl PoolSource for InMemoryPool {
    fn fetch_pool(&self, category: &str) -> Result<Vec<PuzzleSource>, PoolError> {
        self.categories
            .get(category)
            .cloned()
            .ok_or_else(|| PoolError::NotFound(category.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_pool_source() {
        let dir = std::env::temp_dir().join(format!("puzzle-pool-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("forks.json"),
            r#"[{"PuzzleId": "a1", "FEN": "8/8/8/8/8/8/8/8 w - - 0 1", "Moves": "e2e4 e7e5", "Rating": 1500}]"#,
        )
        .unwrap();
        std::fs::write(dir.join("broken.json"), "{not json").unwrap();

        let source = JsonPoolSource::new(&dir);
        let records = source.fetch_pool("forks").unwrap();
        assert_eq!(records.len(), 1);
        assert!(matches!(source.fetch_pool("broken"), Err(PoolError::Parse(_))));
        assert!(matches!(source.fetch_pool("pins"), Err(PoolError::NotFound(_))));
        assert!(matches!(source.fetch_pool("../forks"), Err(PoolError::NotFound(_))));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_in_memory_pool() {
        let pool = InMemoryPool::new().with_category("forks", Vec::new());
        assert!(pool.fetch_pool("forks").unwrap().is_empty());
        assert!(pool.fetch_pool("pins").is_err());
    }
}
