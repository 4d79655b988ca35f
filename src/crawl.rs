//! Crawling a contiguous range of topic ids.

use std::collections::BTreeSet;
use std::fmt::Display;
use std::ops::RangeInclusive;

use serde::Serialize;

use crate::app::Result;
use crate::coordinator::ScrapeCoordinator;
use crate::domain::{EntityKind, Message};

/// What a crawl stored and what it had to skip.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    pub topics: usize,
    pub messages: usize,
    pub skipped: usize,
    pub requests: u64,
}

/// Crawl every topic in `ids`: the topic, its board, each page of messages
/// and every registered author.
///
/// Pages that fail to download or parse are logged and skipped. Any other
/// error (storage, integrity) aborts the crawl.
pub async fn crawl_topics(
    coordinator: &mut ScrapeCoordinator,
    ids: RangeInclusive<i64>,
) -> Result<CrawlSummary> {
    let requests_before = coordinator.requests_issued();
    let mut summary = CrawlSummary::default();

    for topic_id in ids {
        tracing::info!("Starting scrape of topic {}", topic_id);

        let was_cached = coordinator.is_cached(EntityKind::Topic, topic_id);
        let scraped = coordinator.scrape_topic(topic_id).await;
        let Some(topic) = skip_failure(scraped, format!("topic {}", topic_id), &mut summary)? else {
            continue;
        };
        summary.topics += 1;

        let scraped = coordinator.scrape_board(topic.board).await;
        skip_failure(scraped, format!("board {}", topic.board), &mut summary)?;

        let mut authors = BTreeSet::new();

        // A fresh topic scrape already stored its first page.
        let first_page = if was_cached {
            1
        } else {
            let stored = coordinator.store().get_topic_messages(topic_id)?;
            summary.messages += stored.len();
            authors.extend(registered_authors(&stored));
            2
        };

        tracing::info!("Found {} message pages", topic.page_count);
        for page in first_page..=topic.page_count {
            let scraped = coordinator.scrape_messages(topic_id, page).await;
            let what = format!("page {} of topic {}", page, topic_id);
            if let Some(messages) = skip_failure(scraped, what, &mut summary)? {
                summary.messages += messages.len();
                authors.extend(registered_authors(&messages));
            }
        }

        for member in authors {
            let scraped = coordinator.scrape_member(member).await;
            skip_failure(scraped, format!("member {}", member), &mut summary)?;
        }

        tracing::info!("Done scraping topic {}", topic_id);
    }

    summary.requests = coordinator.requests_issued() - requests_before;
    tracing::info!("Made {} requests in total", summary.requests);
    Ok(summary)
}

fn registered_authors(messages: &[Message]) -> impl Iterator<Item = i64> + '_ {
    messages
        .iter()
        .filter(|message| !message.is_guest_post())
        .map(|message| message.member)
}

fn skip_failure<T>(
    result: Result<T>,
    what: impl Display,
    summary: &mut CrawlSummary,
) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_skippable() => {
            tracing::warn!("Skipping {}: {}", what, e);
            summary.skipped += 1;
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
