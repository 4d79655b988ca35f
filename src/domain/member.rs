use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Reserved member id for posts made by guests.
pub const GUEST_MEMBER_ID: i64 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub name: String,
    pub position: String,
    pub date_registered: NaiveDateTime,
    pub last_active: NaiveDateTime,
    pub email: Option<String>,
    pub website_name: Option<String>,
    pub website_link: Option<String>,
    pub address: Option<String>,
    pub other_contact: Option<String>,
    /// Signature markup as served, not sanitized.
    pub signature: Option<String>,
}

impl Member {
    pub fn is_guest_id(id: i64) -> bool {
        id == GUEST_MEMBER_ID
    }
}
