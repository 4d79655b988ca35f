pub mod board;
pub mod kind;
pub mod member;
pub mod topic;

pub use board::Board;
pub use kind::{EntityKind, Record};
pub use member::{Member, GUEST_MEMBER_ID};
pub use topic::{Message, Topic, TopicPage, MESSAGES_PER_PAGE};
