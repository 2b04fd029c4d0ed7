/// Zone identifiers are human-assigned slugs from the zones config file.
pub type ZoneId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
