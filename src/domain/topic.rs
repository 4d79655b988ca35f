use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Messages the origin serves per topic page.
pub const MESSAGES_PER_PAGE: u32 = 20;

/// Topic metadata. Messages are stored separately and never embedded here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    pub name: String,
    pub board: i64,
    pub page_count: u32,
    pub read_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub topic: i64,
    /// Author id; 0 for guests.
    pub member: i64,
    pub subject: String,
    pub link: String,
    /// 1-based position within the topic, assigned by the origin.
    pub position: u32,
    pub post_time: NaiveDateTime,
    pub content: String,
    pub content_plain: String,
    pub content_no_quote: String,
    pub content_no_quote_plain: String,
}

impl Message {
    pub fn is_guest_post(&self) -> bool {
        super::Member::is_guest_id(self.member)
    }
}

/// One parsed topic page: the topic's metadata plus the messages on that page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPage {
    pub topic: Topic,
    pub messages: Vec<Message>,
}

impl TopicPage {
    /// Zero-based message offset of a 1-based page number.
    ///
    /// `None` for page 0 and for pages whose offset does not fit in a `u32`.
    pub fn offset_of_page(page: u32) -> Option<u32> {
        page.checked_sub(1)?.checked_mul(MESSAGES_PER_PAGE)
    }
}
