use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Request failed with status {status}: {url}")]
    Retrieval { status: u16, url: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Page parsing error: {0}")]
    Parse(String),

    #[error("No {kind} found with id {id}")]
    NotFound { kind: &'static str, id: i64 },

    #[error("Found {count} {kind} rows with id {id}")]
    Integrity {
        kind: &'static str,
        id: i64,
        count: usize,
    },

    #[error("Requested {requested} {kind} rows but found {found}")]
    MissingRows {
        kind: &'static str,
        requested: usize,
        found: usize,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] rusqlite_migration::Error),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl HarvestError {
    /// Errors a crawl driver may log and step past, moving on to the next id.
    ///
    /// Storage and integrity failures are never skippable.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            HarvestError::Retrieval { .. } | HarvestError::Http(_) | HarvestError::Parse(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, HarvestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retrieval_and_parse_are_skippable() {
        let retrieval = HarvestError::Retrieval {
            status: 404,
            url: "https://example.com/index.php?board=1".into(),
        };
        assert!(retrieval.is_skippable());
        assert!(HarvestError::Parse("missing title".into()).is_skippable());
    }

    #[test]
    fn test_store_errors_are_not_skippable() {
        let integrity = HarvestError::Integrity {
            kind: "board",
            id: 74,
            count: 2,
        };
        assert!(!integrity.is_skippable());
        assert!(!HarvestError::NotFound { kind: "topic", id: 1 }.is_skippable());
        assert!(!HarvestError::Database(rusqlite::Error::InvalidQuery).is_skippable());
    }

    #[test]
    fn test_retrieval_message_carries_status() {
        let err = HarvestError::Retrieval {
            status: 503,
            url: "https://example.com/index.php?topic=14.0".into(),
        };
        assert_eq!(
            err.to_string(),
            "Request failed with status 503: https://example.com/index.php?topic=14.0"
        );
    }
}
