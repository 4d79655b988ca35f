//! Resolution of forum entities: check the cache, otherwise fetch, parse,
//! persist and remember.

pub mod entity;

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::app::{HarvestError, Result};
use crate::archive::RawArchive;
use crate::cache::MemoCache;
use crate::domain::{Board, EntityKind, Member, Message, Record, Topic};
use crate::fetcher::{Fetcher, Request};
use crate::parser::EntityParser;
use crate::store::Store;

pub use entity::Entity;

/// Drives every (kind, id) resolution for one crawl session.
///
/// A resolution either finds the id in the cache and reads the record back
/// from the store, or goes Fetch → Parse → Persist → Commit. A failure at any
/// step propagates and leaves the cache untouched, so a retry fetches again.
pub struct ScrapeCoordinator {
    store: Arc<dyn Store + Send + Sync>,
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    parser: Arc<dyn EntityParser + Send + Sync>,
    cache: MemoCache,
    archive: Option<RawArchive>,
    reference_date: Option<NaiveDate>,
}

impl ScrapeCoordinator {
    /// Coordinator with a cold cache.
    pub fn new(
        store: Arc<dyn Store + Send + Sync>,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        parser: Arc<dyn EntityParser + Send + Sync>,
    ) -> Self {
        Self {
            store,
            fetcher,
            parser,
            cache: MemoCache::new(),
            archive: None,
            reference_date: None,
        }
    }

    /// Coordinator whose cache already knows every id in the store.
    pub fn prime(
        store: Arc<dyn Store + Send + Sync>,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        parser: Arc<dyn EntityParser + Send + Sync>,
    ) -> Result<Self> {
        let cache = MemoCache::prime(store.as_ref())?;
        tracing::info!(
            "Primed cache with {} boards, {} members, {} topics",
            cache.len(EntityKind::Board),
            cache.len(EntityKind::Member),
            cache.len(EntityKind::Topic)
        );

        Ok(Self {
            cache,
            ..Self::new(store, fetcher, parser)
        })
    }

    pub fn with_archive(mut self, archive: RawArchive) -> Self {
        self.archive = Some(archive);
        self
    }

    /// Pin the date "Today at" timestamps resolve against.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    pub async fn resolve(&mut self, kind: EntityKind, id: i64) -> Result<Record> {
        match kind {
            EntityKind::Board => self.resolve_entity::<Board>(id).await.map(Entity::into_record),
            EntityKind::Member => self.resolve_entity::<Member>(id).await.map(Entity::into_record),
            EntityKind::Topic => self.resolve_entity::<Topic>(id).await.map(Entity::into_record),
        }
    }

    pub async fn resolve_entity<E: Entity>(&mut self, id: i64) -> Result<E> {
        E::check_id(id)?;

        if self.cache.contains(E::KIND, id) {
            tracing::debug!("Serving {} {} from the store", E::KIND, id);
            return E::load(self.store.as_ref(), id);
        }

        self.scrape::<E>(id).await
    }

    pub async fn scrape_board(&mut self, id: i64) -> Result<Board> {
        self.resolve_entity(id).await
    }

    pub async fn scrape_member(&mut self, id: i64) -> Result<Member> {
        self.resolve_entity(id).await
    }

    /// Topic metadata; the first page of messages is stored alongside it.
    pub async fn scrape_topic(&mut self, id: i64) -> Result<Topic> {
        self.resolve_entity(id).await
    }

    /// Fetch and store one 1-based page of a topic's messages.
    ///
    /// Never served from the cache: a topic keeps growing between visits.
    pub async fn scrape_messages(&mut self, topic: i64, page: u32) -> Result<Vec<Message>> {
        if page == 0 {
            return Err(HarvestError::InvalidRecord(
                "topic pages are numbered from 1".to_string(),
            ));
        }

        let request = Request::topic_page(topic, page).ok_or_else(|| {
            HarvestError::InvalidRecord(format!("topic page {} is out of range", page))
        })?;
        let html = self.fetch(&request).await?;
        let parsed = self.parser.parse_topic_page(&html, self.today())?;
        ensure_same_id(EntityKind::Topic, topic, parsed.topic.id)?;

        self.store.upsert_topic_page(&parsed.topic, &parsed.messages)?;
        self.cache.record(EntityKind::Topic, topic);

        tracing::info!(
            "Stored {} messages from page {} of topic {}",
            parsed.messages.len(),
            page,
            topic
        );
        Ok(parsed.messages)
    }

    /// Re-scrape an entity whether or not it is already stored.
    pub async fn refresh<E: Entity>(&mut self, id: i64) -> Result<E> {
        E::check_id(id)?;
        self.scrape::<E>(id).await
    }

    pub fn is_cached(&self, kind: EntityKind, id: i64) -> bool {
        self.cache.contains(kind, id)
    }

    pub fn cache(&self) -> &MemoCache {
        &self.cache
    }

    pub fn requests_issued(&self) -> u64 {
        self.fetcher.requests_issued()
    }

    pub fn store(&self) -> &(dyn Store + Send + Sync) {
        self.store.as_ref()
    }

    async fn scrape<E: Entity>(&mut self, id: i64) -> Result<E> {
        let html = self.fetch(&E::request(id)).await?;
        let parsed = E::parse(self.parser.as_ref(), &html, self.today())?;
        ensure_same_id(E::KIND, id, E::parsed_id(&parsed))?;

        E::persist(self.store.as_ref(), &parsed)?;
        self.cache.record(E::KIND, id);
        tracing::debug!("Stored {} {}", E::KIND, id);

        Ok(E::from_parsed(parsed))
    }

    async fn fetch(&self, request: &Request) -> Result<String> {
        let html = self.fetcher.fetch(request).await?;
        if let Some(archive) = &self.archive {
            if let Err(e) = archive.save(request, &html) {
                tracing::warn!("Could not archive {}: {}", request.query(), e);
            }
        }
        Ok(html)
    }

    fn today(&self) -> NaiveDate {
        self.reference_date.unwrap_or_else(|| Utc::now().date_naive())
    }
}

fn ensure_same_id(kind: EntityKind, requested: i64, parsed: i64) -> Result<()> {
    if requested != parsed {
        return Err(HarvestError::Parse(format!(
            "requested {} {} but the page describes {} {}",
            kind, requested, kind, parsed
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::BitcointalkParser;
    use crate::store::SqliteStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Counts calls and always fails, so any request shows up in the count.
    #[derive(Default)]
    struct RefusingFetcher {
        calls: AtomicU64,
    }

    #[async_trait]
    impl Fetcher for RefusingFetcher {
        async fn fetch(&self, request: &Request) -> Result<String> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Err(HarvestError::Retrieval {
                status: 503,
                url: request.query(),
            })
        }

        fn requests_issued(&self) -> u64 {
            self.calls.load(Ordering::Relaxed)
        }
    }

    fn coordinator() -> ScrapeCoordinator {
        ScrapeCoordinator::new(
            Arc::new(SqliteStore::in_memory()),
            Arc::new(RefusingFetcher::default()),
            Arc::new(BitcointalkParser::new()),
        )
    }

    #[tokio::test]
    async fn test_guest_member_never_fetched() {
        let mut coordinator = coordinator();
        let err = coordinator.scrape_member(0).await.unwrap_err();

        assert!(matches!(err, HarvestError::InvalidRecord(_)));
        assert_eq!(coordinator.requests_issued(), 0);
    }

    #[tokio::test]
    async fn test_page_zero_never_fetched() {
        let mut coordinator = coordinator();
        let err = coordinator.scrape_messages(14, 0).await.unwrap_err();

        assert!(matches!(err, HarvestError::InvalidRecord(_)));
        assert_eq!(coordinator.requests_issued(), 0);
    }

    #[tokio::test]
    async fn test_page_past_offset_range_never_fetched() {
        let mut coordinator = coordinator();

        for page in [214_748_366, u32::MAX] {
            let err = coordinator.scrape_messages(14, page).await.unwrap_err();
            assert!(matches!(err, HarvestError::InvalidRecord(_)));
        }
        assert_eq!(coordinator.requests_issued(), 0);
    }

    #[tokio::test]
    async fn test_retrieval_failure_leaves_cache_cold() {
        let mut coordinator = coordinator();
        let err = coordinator.resolve(EntityKind::Board, 74).await.unwrap_err();

        assert!(matches!(err, HarvestError::Retrieval { status: 503, .. }));
        assert!(!coordinator.is_cached(EntityKind::Board, 74));

        // A retry goes back to the network.
        let _ = coordinator.resolve(EntityKind::Board, 74).await;
        assert_eq!(coordinator.requests_issued(), 2);
    }

    #[test]
    fn test_mismatched_id_is_a_parse_error() {
        assert!(ensure_same_id(EntityKind::Topic, 14, 14).is_ok());
        assert!(matches!(
            ensure_same_id(EntityKind::Topic, 14, 15),
            Err(HarvestError::Parse(_))
        ));
    }
}
