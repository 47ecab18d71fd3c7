//! Storage gateway backed by SQLite through Diesel.
//!
//! All access goes through diesel-async's `SyncConnectionWrapper`, so
//! repositories expose async methods while queries keep Diesel's
//! compile-time checking.

pub mod articles;
pub mod context;
pub mod meta;
pub mod pool;
pub mod records;
pub mod structured;
pub mod util;

pub use articles::{ArticleRepository, ArticleSearch, DateOrder, SearchPage, SourceCounts};
pub use context::DbContext;
pub use meta::{MetaRepository, WATERMARK_KEY};
pub use pool::{AsyncSqlitePool, DieselError};
pub use structured::{NewStructuredMetadata, StructuredMetadataRepository};

use chrono::{DateTime, Utc};

/// Parse an RFC 3339 timestamp, falling back to now for corrupt values.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
