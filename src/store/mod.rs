pub mod sqlite;

use crate::app::Result;
use crate::domain::{Board, EntityKind, Member, Message, Record, Topic};

pub use sqlite::SqliteStore;

/// Durable storage keyed by the origin's id.
///
/// Upserts replace any existing row with the same id and commit before
/// returning, so repeating one is observationally a no-op. Single reads fail
/// with `NotFound` on zero rows and `Integrity` on more than one. Batch reads
/// return rows ordered by id and fail with `MissingRows` unless every
/// requested id was found.
pub trait Store {
    // Upserts
    fn upsert_board(&self, board: &Board) -> Result<()>;
    fn upsert_member(&self, member: &Member) -> Result<()>;
    fn upsert_topic(&self, topic: &Topic) -> Result<()>;
    fn upsert_messages(&self, messages: &[Message]) -> Result<()>;
    /// Replace a topic and a batch of its messages in one transaction.
    fn upsert_topic_page(&self, topic: &Topic, messages: &[Message]) -> Result<()>;

    // Single reads
    fn get_board(&self, id: i64) -> Result<Board>;
    fn get_member(&self, id: i64) -> Result<Member>;
    fn get_topic(&self, id: i64) -> Result<Topic>;

    // Batch reads
    fn get_boards(&self, ids: &[i64]) -> Result<Vec<Board>>;
    fn get_members(&self, ids: &[i64]) -> Result<Vec<Member>>;
    fn get_topics(&self, ids: &[i64]) -> Result<Vec<Topic>>;
    fn get_messages(&self, ids: &[i64]) -> Result<Vec<Message>>;
    fn get_topic_messages(&self, topic_id: i64) -> Result<Vec<Message>>;

    // Listing
    fn list_ids(&self, kind: EntityKind) -> Result<Vec<i64>>;
    fn count(&self, kind: EntityKind) -> Result<i64>;
    fn count_messages(&self) -> Result<i64>;

    fn read(&self, kind: EntityKind, id: i64) -> Result<Record> {
        match kind {
            EntityKind::Board => self.get_board(id).map(Record::Board),
            EntityKind::Member => self.get_member(id).map(Record::Member),
            EntityKind::Topic => self.get_topic(id).map(Record::Topic),
        }
    }

    fn read_batch(&self, kind: EntityKind, ids: &[i64]) -> Result<Vec<Record>> {
        let records = match kind {
            EntityKind::Board => self.get_boards(ids)?.into_iter().map(Record::Board).collect(),
            EntityKind::Member => self.get_members(ids)?.into_iter().map(Record::Member).collect(),
            EntityKind::Topic => self.get_topics(ids)?.into_iter().map(Record::Topic).collect(),
        };
        Ok(records)
    }
}
