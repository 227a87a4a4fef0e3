use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, anyhow};

use cartilla_backend::config::DirectoryConfig;
use cartilla_backend::store::{DuckDbStore, MemoryStore, RecordStore};

use crate::cli::SourceArgs;

#[derive(Debug, Clone)]
pub struct StoragePaths {
    pub duckdb_path: PathBuf,
    pub config_path: PathBuf,
}

impl StoragePaths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir: PathBuf = data_dir.into();
        Self {
            duckdb_path: data_dir.join("cartilla.duckdb"),
            config_path: data_dir.join("directory.json"),
        }
    }
}

pub fn file_present_nonempty(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(m) => m.is_file() && m.len() > 0,
        Err(_) => false,
    }
}

/// Picks the store (fixtures win over DuckDB) and the directory config.
pub fn open_sources(args: &SourceArgs) -> anyhow::Result<(Arc<dyn RecordStore>, DirectoryConfig)> {
    let paths = StoragePaths::new(&args.data_dir);

    let config_path = match &args.config {
        Some(p) => Some(PathBuf::from(p)),
        None if file_present_nonempty(&paths.config_path) => Some(paths.config_path.clone()),
        None => None,
    };
    let config = DirectoryConfig::load_or_default(config_path.as_deref())?;
    if let Some(p) = &config_path {
        tracing::info!("Using directory config {}", p.display());
    }

    let store: Arc<dyn RecordStore> = match &args.fixtures {
        Some(fixtures) => {
            let path = Path::new(fixtures);
            tracing::info!("Reading tables from fixture file {}", path.display());
            Arc::new(MemoryStore::load(path).context("load fixtures")?)
        }
        None => {
            if !file_present_nonempty(&paths.duckdb_path) {
                return Err(anyhow!(
                    "DuckDB not found at {}. Pass --data-dir or --fixtures",
                    paths.duckdb_path.display()
                ));
            }
            tracing::info!("Opening DuckDB at {}", paths.duckdb_path.display());
            Arc::new(
                DuckDbStore::open(&paths.duckdb_path)
                    .with_context(|| format!("open duckdb at {}", paths.duckdb_path.display()))?,
            )
        }
    };

    Ok((store, config))
}
