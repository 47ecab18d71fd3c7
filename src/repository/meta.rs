//! Key-value settings table, home of the harvest watermark.

use chrono::NaiveDate;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::pool::{AsyncSqlitePool, DieselError};
use crate::schema::meta;

/// Key of the shared harvest watermark.
pub const WATERMARK_KEY: &str = "last_moisson_date";

const WATERMARK_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone)]
pub struct MetaRepository {
    pool: AsyncSqlitePool,
}

impl MetaRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, DieselError> {
        let mut conn = self.pool.get().await?;

        let value: Option<Option<String>> = meta::table
            .find(key)
            .select(meta::value)
            .first(&mut conn)
            .await
            .optional()?;

        Ok(value.flatten())
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        diesel::replace_into(meta::table)
            .values((meta::key.eq(key), meta::value.eq(Some(value))))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    /// Date the next harvest starts from. Unparseable values read as unset.
    pub async fn get_watermark(&self) -> Result<Option<NaiveDate>, DieselError> {
        let value = self.get(WATERMARK_KEY).await?;
        Ok(value.and_then(|v| NaiveDate::parse_from_str(v.trim(), WATERMARK_FORMAT).ok()))
    }

    pub async fn set_watermark(&self, date: NaiveDate) -> Result<(), DieselError> {
        self.set(WATERMARK_KEY, &date.format(WATERMARK_FORMAT).to_string())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::DbContext;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_watermark_roundtrip() {
        let dir = tempdir().unwrap();
        let ctx = DbContext::from_path(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        let repo = ctx.meta();

        assert_eq!(repo.get_watermark().await.unwrap(), None);

        let date = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();
        repo.set_watermark(date).await.unwrap();
        assert_eq!(repo.get_watermark().await.unwrap(), Some(date));
        assert_eq!(
            repo.get(WATERMARK_KEY).await.unwrap().as_deref(),
            Some("2024-05-17")
        );

        // Overwrite keeps a single row
        let later = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        repo.set_watermark(later).await.unwrap();
        assert_eq!(repo.get_watermark().await.unwrap(), Some(later));
    }

    #[tokio::test]
    async fn test_garbage_watermark_reads_as_unset() {
        let dir = tempdir().unwrap();
        let ctx = DbContext::from_path(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        let repo = ctx.meta();

        repo.set(WATERMARK_KEY, "yesterday").await.unwrap();
        assert_eq!(repo.get_watermark().await.unwrap(), None);
    }
}
