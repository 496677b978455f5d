/// Remote identifiers (children, parents) are integer ids assigned by the API.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
