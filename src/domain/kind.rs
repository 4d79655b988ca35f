use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::{Board, Member, Topic};

/// The memoized entity kinds. Messages always travel with a topic page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Board,
    Member,
    Topic,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Board, EntityKind::Member, EntityKind::Topic];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Board => "board",
            EntityKind::Member => "member",
            EntityKind::Topic => "topic",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Board => "boards",
            EntityKind::Member => "members",
            EntityKind::Topic => "topics",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "board" | "boards" => Ok(EntityKind::Board),
            "member" | "members" | "profile" => Ok(EntityKind::Member),
            "topic" | "topics" => Ok(EntityKind::Topic),
            other => Err(format!("Unknown entity kind: {}", other)),
        }
    }
}

/// A resolved record of any memoized kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Record {
    Board(Board),
    Member(Member),
    Topic(Topic),
}

impl Record {
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::Board(_) => EntityKind::Board,
            Record::Member(_) => EntityKind::Member,
            Record::Topic(_) => EntityKind::Topic,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Record::Board(board) => board.id,
            Record::Member(member) => member.id,
            Record::Topic(topic) => topic.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_str() {
        assert_eq!("board".parse::<EntityKind>().unwrap(), EntityKind::Board);
        assert_eq!("Profile".parse::<EntityKind>().unwrap(), EntityKind::Member);
        assert_eq!(" topics ".parse::<EntityKind>().unwrap(), EntityKind::Topic);
        assert!("message".parse::<EntityKind>().is_err());
    }

    #[test]
    fn test_record_kind_and_id() {
        let record = Record::Board(Board {
            id: 74,
            name: "Legal".into(),
            parent: Some(1),
            container: Some("Bitcoin".into()),
        });
        assert_eq!(record.kind(), EntityKind::Board);
        assert_eq!(record.id(), 74);
    }
}
