use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::Result;
use crate::archive::RawArchive;
use crate::config::Config;
use crate::coordinator::ScrapeCoordinator;
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::parser::{BitcointalkParser, EntityParser};
use crate::store::{SqliteStore, Store};

pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub fetcher: Arc<HttpFetcher>,
    pub parser: Arc<BitcointalkParser>,
    archive: Option<RawArchive>,
}

impl AppContext {
    /// Build from configuration; `db_path` overrides the configured database.
    ///
    /// The database is not opened until something first touches the store.
    pub fn new(config: Config, db_path: Option<PathBuf>) -> Result<Self> {
        let db_path = match db_path {
            Some(p) => p,
            None => config.database_path()?,
        };
        Self::with_store(config, SqliteStore::new(db_path))
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        Self::with_store(config, SqliteStore::in_memory())
    }

    fn with_store(config: Config, store: SqliteStore) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new(&config.fetch)?);
        let archive = config.archive_dir()?.map(RawArchive::new);

        Ok(Self {
            config,
            store: Arc::new(store),
            fetcher,
            parser: Arc::new(BitcointalkParser::new()),
            archive,
        })
    }

    /// A coordinator sharing this context's store, fetcher and parser, with
    /// its cache primed from what is already stored.
    pub fn coordinator(&self) -> Result<ScrapeCoordinator> {
        let store: Arc<dyn Store + Send + Sync> = self.store.clone();
        let fetcher: Arc<dyn Fetcher + Send + Sync> = self.fetcher.clone();
        let parser: Arc<dyn EntityParser + Send + Sync> = self.parser.clone();

        let coordinator = ScrapeCoordinator::prime(store, fetcher, parser)?;
        Ok(match &self.archive {
            Some(archive) => coordinator.with_archive(archive.clone()),
            None => coordinator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Board, EntityKind};

    #[test]
    fn test_store_stays_closed_until_used() {
        let ctx = AppContext::in_memory(Config::default()).unwrap();
        assert!(!ctx.store.is_connected());
    }

    #[test]
    fn test_coordinator_is_primed_from_store() {
        let ctx = AppContext::in_memory(Config::default()).unwrap();
        ctx.store
            .upsert_board(&Board {
                id: 74,
                name: "Legal".into(),
                parent: Some(1),
                container: Some("Bitcoin".into()),
            })
            .unwrap();

        let coordinator = ctx.coordinator().unwrap();
        assert!(coordinator.is_cached(EntityKind::Board, 74));
        assert_eq!(coordinator.requests_issued(), 0);
    }

    #[test]
    fn test_db_override_wins_over_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("override.db");

        let ctx = AppContext::new(Config::default(), Some(path.clone())).unwrap();
        ctx.store.count(EntityKind::Board).unwrap();
        assert!(path.exists());
    }
}
