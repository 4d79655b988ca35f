use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::types::ToSql;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};

use crate::app::{HarvestError, Result};
use crate::domain::{Board, EntityKind, Member, Message, Topic};
use crate::store::Store;

const BOARD_COLUMNS: &str = "sid, name, parent, container";
const MEMBER_COLUMNS: &str = "sid, name, position, date_registered, last_active, email, \
     website_name, website_link, address, other_contact, signature";
const TOPIC_COLUMNS: &str = "sid, name, board, page_count, read_count";
const MESSAGE_COLUMNS: &str = "sid, topic, member, subject, link, position, post_time, \
     content, content_plain, content_no_quote, content_no_quote_plain";

#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    Memory,
}

/// SQLite-backed store holding one connection for the life of the process.
///
/// The connection is opened, and migrations applied, on first use.
pub struct SqliteStore {
    location: Location,
    conn: Mutex<Option<Connection>>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            location: Location::File(path.as_ref().to_path_buf()),
            conn: Mutex::new(None),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            location: Location::Memory,
            conn: Mutex::new(None),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.conn.lock().map(|conn| conn.is_some()).unwrap_or(false)
    }

    fn connect(&self) -> Result<Connection> {
        let mut conn = match &self.location {
            Location::File(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        fs::create_dir_all(parent)?;
                    }
                }
                tracing::debug!("Opening database at {}", path.display());
                Connection::open(path)?
            }
            Location::Memory => Connection::open_in_memory()?,
        };

        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);
        migrations.to_latest(&mut conn)?;

        Ok(conn)
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|e| HarvestError::Other(format!("Store connection lock poisoned: {}", e)))?;

        if guard.is_none() {
            *guard = Some(self.connect()?);
        }

        match guard.as_mut() {
            Some(conn) => f(conn),
            None => Err(HarvestError::Other("Store connection unavailable".into())),
        }
    }
}

fn board_from_row(row: &Row<'_>) -> rusqlite::Result<Board> {
    Ok(Board {
        id: row.get(0)?,
        name: row.get(1)?,
        parent: row.get(2)?,
        container: row.get(3)?,
    })
}

fn member_from_row(row: &Row<'_>) -> rusqlite::Result<Member> {
    Ok(Member {
        id: row.get(0)?,
        name: row.get(1)?,
        position: row.get(2)?,
        date_registered: row.get(3)?,
        last_active: row.get(4)?,
        email: row.get(5)?,
        website_name: row.get(6)?,
        website_link: row.get(7)?,
        address: row.get(8)?,
        other_contact: row.get(9)?,
        signature: row.get(10)?,
    })
}

fn topic_from_row(row: &Row<'_>) -> rusqlite::Result<Topic> {
    Ok(Topic {
        id: row.get(0)?,
        name: row.get(1)?,
        board: row.get(2)?,
        page_count: row.get(3)?,
        read_count: row.get(4)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        topic: row.get(1)?,
        member: row.get(2)?,
        subject: row.get(3)?,
        link: row.get(4)?,
        position: row.get(5)?,
        post_time: row.get(6)?,
        content: row.get(7)?,
        content_plain: row.get(8)?,
        content_no_quote: row.get(9)?,
        content_no_quote_plain: row.get(10)?,
    })
}

fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Delete-then-insert of a single row. Callers own the transaction.
fn replace_row(
    conn: &Connection,
    table: &str,
    columns: &str,
    sid: i64,
    values: &[&dyn ToSql],
) -> Result<()> {
    conn.execute(&format!("DELETE FROM {} WHERE sid = ?1", table), params![sid])?;
    conn.execute(
        &format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns,
            placeholders(values.len())
        ),
        values,
    )?;
    Ok(())
}

fn select_one<T, F>(conn: &Connection, kind: &'static str, table: &str, columns: &str, id: i64, map: F) -> Result<T>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(&format!("SELECT {} FROM {} WHERE sid = ?1", columns, table))?;
    let mut rows = stmt
        .query_map(params![id], map)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    match rows.len() {
        0 => Err(HarvestError::NotFound { kind, id }),
        1 => Ok(rows.remove(0)),
        count => Err(HarvestError::Integrity { kind, id, count }),
    }
}

fn select_batch<T, F>(
    conn: &Connection,
    kind: &'static str,
    table: &str,
    columns: &str,
    ids: &[i64],
    map: F,
) -> Result<Vec<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    // A repeated sid could otherwise mask a missing one in the count below.
    let duplicate = conn
        .query_row(
            &format!(
                "SELECT sid, COUNT(*) FROM {} WHERE sid IN ({}) \
                 GROUP BY sid HAVING COUNT(*) > 1 ORDER BY sid LIMIT 1",
                table,
                placeholders(ids.len())
            ),
            params_from_iter(ids.iter()),
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        )
        .optional()?;
    if let Some((id, count)) = duplicate {
        return Err(HarvestError::Integrity {
            kind,
            id,
            count: count as usize,
        });
    }

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM {} WHERE sid IN ({}) ORDER BY sid",
        columns,
        table,
        placeholders(ids.len())
    ))?;
    let rows = stmt
        .query_map(params_from_iter(ids.iter()), map)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if rows.len() != ids.len() {
        return Err(HarvestError::MissingRows {
            kind,
            requested: ids.len(),
            found: rows.len(),
        });
    }

    Ok(rows)
}

/// Load a message batch into a fresh temporary table and return its name.
///
/// When the batch repeats an id, only its last occurrence is kept.
fn stage_messages(conn: &Connection, messages: &[Message]) -> Result<String> {
    let staging = format!("messages_staging_{:010}", rand::random::<u32>());

    conn.execute_batch(&format!(
        "CREATE TEMP TABLE {} AS SELECT {} FROM messages WHERE 0",
        staging, MESSAGE_COLUMNS
    ))?;

    {
        let mut stmt = conn.prepare(&format!(
            "INSERT INTO {} ({}) VALUES ({})",
            staging,
            MESSAGE_COLUMNS,
            placeholders(11)
        ))?;
        for message in messages {
            stmt.execute(params![
                message.id,
                message.topic,
                message.member,
                message.subject,
                message.link,
                message.position,
                message.post_time,
                message.content,
                message.content_plain,
                message.content_no_quote,
                message.content_no_quote_plain
            ])?;
        }
    }

    conn.execute(
        &format!(
            "DELETE FROM {0} WHERE rowid NOT IN (SELECT MAX(rowid) FROM {0} GROUP BY sid)",
            staging
        ),
        [],
    )?;

    Ok(staging)
}

fn delete_colliding(conn: &Connection, staging: &str) -> Result<usize> {
    let deleted = conn.execute(
        &format!("DELETE FROM messages WHERE sid IN (SELECT sid FROM {})", staging),
        [],
    )?;
    Ok(deleted)
}

fn insert_staged(conn: &Connection, staging: &str) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO messages ({0}) SELECT {0} FROM {1}",
            MESSAGE_COLUMNS, staging
        ),
        [],
    )?;
    conn.execute_batch(&format!("DROP TABLE {}", staging))?;
    Ok(())
}

fn replace_messages(conn: &Connection, messages: &[Message]) -> Result<()> {
    let staging = stage_messages(conn, messages)?;
    let replaced = delete_colliding(conn, &staging)?;
    insert_staged(conn, &staging)?;
    tracing::debug!(
        "Stored {} messages ({} replaced) via {}",
        messages.len(),
        replaced,
        staging
    );
    Ok(())
}

fn replace_topic(conn: &Connection, topic: &Topic) -> Result<()> {
    replace_row(
        conn,
        "topics",
        TOPIC_COLUMNS,
        topic.id,
        params![
            topic.id,
            topic.name,
            topic.board,
            topic.page_count,
            topic.read_count
        ],
    )
}

impl Store for SqliteStore {
    fn upsert_board(&self, board: &Board) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            replace_row(
                &tx,
                "boards",
                BOARD_COLUMNS,
                board.id,
                params![board.id, board.name, board.parent, board.container],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    fn upsert_member(&self, member: &Member) -> Result<()> {
        if Member::is_guest_id(member.id) {
            return Err(HarvestError::InvalidRecord(
                "member id 0 is reserved for guests".into(),
            ));
        }

        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            replace_row(
                &tx,
                "members",
                MEMBER_COLUMNS,
                member.id,
                params![
                    member.id,
                    member.name,
                    member.position,
                    member.date_registered,
                    member.last_active,
                    member.email,
                    member.website_name,
                    member.website_link,
                    member.address,
                    member.other_contact,
                    member.signature
                ],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    fn upsert_topic(&self, topic: &Topic) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            replace_topic(&tx, topic)?;
            tx.commit()?;
            Ok(())
        })
    }

    fn upsert_messages(&self, messages: &[Message]) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }

        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            replace_messages(&tx, messages)?;
            tx.commit()?;
            Ok(())
        })
    }

    fn upsert_topic_page(&self, topic: &Topic, messages: &[Message]) -> Result<()> {
        if let Some(stray) = messages.iter().find(|m| m.topic != topic.id) {
            return Err(HarvestError::InvalidRecord(format!(
                "message {} belongs to topic {}, not {}",
                stray.id, stray.topic, topic.id
            )));
        }

        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            if !messages.is_empty() {
                replace_messages(&tx, messages)?;
            }
            replace_topic(&tx, topic)?;
            tx.commit()?;
            Ok(())
        })
    }

    fn get_board(&self, id: i64) -> Result<Board> {
        self.with_conn(|conn| select_one(conn, "board", "boards", BOARD_COLUMNS, id, board_from_row))
    }

    fn get_member(&self, id: i64) -> Result<Member> {
        self.with_conn(|conn| {
            select_one(conn, "member", "members", MEMBER_COLUMNS, id, member_from_row)
        })
    }

    fn get_topic(&self, id: i64) -> Result<Topic> {
        self.with_conn(|conn| select_one(conn, "topic", "topics", TOPIC_COLUMNS, id, topic_from_row))
    }

    fn get_boards(&self, ids: &[i64]) -> Result<Vec<Board>> {
        self.with_conn(|conn| {
            select_batch(conn, "board", "boards", BOARD_COLUMNS, ids, board_from_row)
        })
    }

    fn get_members(&self, ids: &[i64]) -> Result<Vec<Member>> {
        self.with_conn(|conn| {
            select_batch(conn, "member", "members", MEMBER_COLUMNS, ids, member_from_row)
        })
    }

    fn get_topics(&self, ids: &[i64]) -> Result<Vec<Topic>> {
        self.with_conn(|conn| {
            select_batch(conn, "topic", "topics", TOPIC_COLUMNS, ids, topic_from_row)
        })
    }

    fn get_messages(&self, ids: &[i64]) -> Result<Vec<Message>> {
        self.with_conn(|conn| {
            select_batch(conn, "message", "messages", MESSAGE_COLUMNS, ids, message_from_row)
        })
    }

    fn get_topic_messages(&self, topic_id: i64) -> Result<Vec<Message>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM messages WHERE topic = ?1 ORDER BY position, sid",
                MESSAGE_COLUMNS
            ))?;
            let messages = stmt
                .query_map(params![topic_id], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(messages)
        })
    }

    fn list_ids(&self, kind: EntityKind) -> Result<Vec<i64>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT DISTINCT sid FROM {} ORDER BY sid",
                kind.table()
            ))?;
            let ids = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<i64>, _>>()?;
            Ok(ids)
        })
    }

    fn count(&self, kind: EntityKind) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                &format!("SELECT COUNT(*) FROM {}", kind.table()),
                [],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    fn count_messages(&self) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
            Ok(count)
        })
    }
}
