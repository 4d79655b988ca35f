pub mod http_fetcher;
pub mod limiter;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::TopicPage;

pub use http_fetcher::HttpFetcher;
pub use limiter::RateLimiter;

/// One logical retrieval against the forum origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Request {
    Board(i64),
    Profile(i64),
    /// A topic page starting at a zero-based message offset.
    TopicPage { topic: i64, offset: u32 },
}

impl Request {
    /// Request for a 1-based topic page number, if that page is addressable.
    pub fn topic_page(topic: i64, page: u32) -> Option<Self> {
        Some(Request::TopicPage {
            topic,
            offset: TopicPage::offset_of_page(page)?,
        })
    }

    /// Query string appended to the origin's base endpoint.
    pub fn query(&self) -> String {
        match self {
            Request::Board(id) => format!("board={}", id),
            Request::Profile(id) => format!("action=profile;u={}", id),
            Request::TopicPage { topic, offset } => format!("topic={}.{}", topic, offset),
        }
    }

    /// Label and descriptor used when archiving the raw page.
    pub fn archive_name(&self) -> (&'static str, String) {
        match self {
            Request::Board(id) => ("board", id.to_string()),
            Request::Profile(id) => ("profile", id.to_string()),
            Request::TopicPage { topic, offset } => ("topic", format!("{}.{}", topic, offset)),
        }
    }
}

#[async_trait]
pub trait Fetcher {
    /// Issue one request and return the raw document body.
    ///
    /// Non-success statuses fail with `HarvestError::Retrieval`; nothing is retried.
    async fn fetch(&self, request: &Request) -> Result<String>;

    /// Total requests issued by this fetcher so far.
    fn requests_issued(&self) -> u64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_strings() {
        assert_eq!(Request::Board(74).query(), "board=74");
        assert_eq!(Request::Profile(12).query(), "action=profile;u=12");
        assert_eq!(
            Request::TopicPage {
                topic: 602041,
                offset: 12400
            }
            .query(),
            "topic=602041.12400"
        );
    }

    #[test]
    fn test_topic_page_offsets() {
        assert_eq!(
            Request::topic_page(14, 1),
            Some(Request::TopicPage { topic: 14, offset: 0 })
        );
        assert_eq!(Request::topic_page(14, 3).unwrap().query(), "topic=14.40");
        assert_eq!(Request::topic_page(14, 0), None);
        assert_eq!(Request::topic_page(14, u32::MAX), None);
    }

    #[test]
    fn test_archive_names() {
        assert_eq!(Request::Board(74).archive_name(), ("board", "74".to_string()));
        assert_eq!(
            Request::topic_page(14, 2).unwrap().archive_name(),
            ("topic", "14.20".to_string())
        );
    }
}
