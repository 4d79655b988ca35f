use chrono::NaiveDate;

use crate::app::{HarvestError, Result};
use crate::domain::{Board, EntityKind, Member, Record, Topic, TopicPage};
use crate::fetcher::Request;
use crate::parser::EntityParser;
use crate::store::Store;

/// A memoized kind together with everything needed to resolve it:
/// how to ask for it, read it from a page, persist it and load it back.
pub trait Entity: Sized {
    const KIND: EntityKind;

    /// What a page of this kind parses into before it is persisted.
    type Parsed;

    fn request(id: i64) -> Request;

    fn parse(parser: &dyn EntityParser, html: &str, today: NaiveDate) -> Result<Self::Parsed>;

    fn parsed_id(parsed: &Self::Parsed) -> i64;

    fn persist(store: &dyn Store, parsed: &Self::Parsed) -> Result<()>;

    fn from_parsed(parsed: Self::Parsed) -> Self;

    fn load(store: &dyn Store, id: i64) -> Result<Self>;

    fn into_record(self) -> Record;

    /// Reject ids that can never name a stored entity.
    fn check_id(_id: i64) -> Result<()> {
        Ok(())
    }
}

impl Entity for Board {
    const KIND: EntityKind = EntityKind::Board;
    type Parsed = Board;

    fn request(id: i64) -> Request {
        Request::Board(id)
    }

    fn parse(parser: &dyn EntityParser, html: &str, _today: NaiveDate) -> Result<Board> {
        parser.parse_board(html)
    }

    fn parsed_id(parsed: &Board) -> i64 {
        parsed.id
    }

    fn persist(store: &dyn Store, parsed: &Board) -> Result<()> {
        store.upsert_board(parsed)
    }

    fn from_parsed(parsed: Board) -> Self {
        parsed
    }

    fn load(store: &dyn Store, id: i64) -> Result<Self> {
        store.get_board(id)
    }

    fn into_record(self) -> Record {
        Record::Board(self)
    }
}

impl Entity for Member {
    const KIND: EntityKind = EntityKind::Member;
    type Parsed = Member;

    fn request(id: i64) -> Request {
        Request::Profile(id)
    }

    fn parse(parser: &dyn EntityParser, html: &str, today: NaiveDate) -> Result<Member> {
        parser.parse_profile(html, today)
    }

    fn parsed_id(parsed: &Member) -> i64 {
        parsed.id
    }

    fn persist(store: &dyn Store, parsed: &Member) -> Result<()> {
        store.upsert_member(parsed)
    }

    fn from_parsed(parsed: Member) -> Self {
        parsed
    }

    fn load(store: &dyn Store, id: i64) -> Result<Self> {
        store.get_member(id)
    }

    fn into_record(self) -> Record {
        Record::Member(self)
    }

    fn check_id(id: i64) -> Result<()> {
        if Member::is_guest_id(id) {
            return Err(HarvestError::InvalidRecord(
                "member id 0 is reserved for guests".to_string(),
            ));
        }
        Ok(())
    }
}

/// Topics resolve through their first page, whose messages are stored too.
impl Entity for Topic {
    const KIND: EntityKind = EntityKind::Topic;
    type Parsed = TopicPage;

    fn request(id: i64) -> Request {
        Request::TopicPage { topic: id, offset: 0 }
    }

    fn parse(parser: &dyn EntityParser, html: &str, today: NaiveDate) -> Result<TopicPage> {
        parser.parse_topic_page(html, today)
    }

    fn parsed_id(parsed: &TopicPage) -> i64 {
        parsed.topic.id
    }

    fn persist(store: &dyn Store, parsed: &TopicPage) -> Result<()> {
        store.upsert_topic_page(&parsed.topic, &parsed.messages)
    }

    fn from_parsed(parsed: TopicPage) -> Self {
        parsed.topic
    }

    fn load(store: &dyn Store, id: i64) -> Result<Self> {
        store.get_topic(id)
    }

    fn into_record(self) -> Record {
        Record::Topic(self)
    }
}
