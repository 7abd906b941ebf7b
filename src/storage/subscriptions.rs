use super::db::Database;
use super::types::{NewSubscription, StorageError, Subscription, WatermarkOutcome};

impl Database {
    // ========================================================================
    // Subscription Operations
    // ========================================================================

    /// Insert a new subscription, returning its row id.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::DuplicateSubscription`] when the
    /// (link, channel_id) pair already exists. Detection happens at the
    /// storage layer from the unique-constraint violation, never from a
    /// pre-read that could race a concurrent insert.
    pub async fn insert_subscription(&self, new: &NewSubscription) -> Result<i64, StorageError> {
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO subscriptions (title, link, channel_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
        "#,
        )
        .bind(&new.title)
        .bind(&new.link)
        .bind(&new.channel_id)
        .bind(new.created_at)
        .bind(new.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(StorageError::from_sqlx)?;

        Ok(row.0)
    }

    /// Delete the subscription matching (link, channel_id).
    ///
    /// Removes zero or one row; absence of a match is not an error. Returns
    /// true when a row was actually removed.
    pub async fn delete_subscription(
        &self,
        link: &str,
        channel_id: &str,
    ) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE link = ? AND channel_id = ?")
            .bind(link)
            .bind(channel_id)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from_sqlx)?;

        Ok(result.rows_affected() > 0)
    }

    /// All subscriptions for one channel, in insertion order.
    pub async fn list_by_channel(&self, channel_id: &str) -> Result<Vec<Subscription>, StorageError> {
        let subs = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT id, title, link, channel_id, created_at, updated_at
            FROM subscriptions
            WHERE channel_id = ?
            ORDER BY id
        "#,
        )
        .bind(channel_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from_sqlx)?;

        Ok(subs)
    }

    /// All subscriptions across all channels, in insertion order.
    ///
    /// Used only by the detection cycle to discover the set of distinct
    /// links to fetch.
    pub async fn list_all(&self) -> Result<Vec<Subscription>, StorageError> {
        let subs = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT id, title, link, channel_id, created_at, updated_at
            FROM subscriptions
            ORDER BY id
        "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from_sqlx)?;

        Ok(subs)
    }

    /// Advance the watermarks of every subscriber of `link` whose stored
    /// value is strictly below `new_updated_at`.
    ///
    /// The read and the conditional updates share one transaction: a
    /// watermark only moves together with the read that justified the move.
    /// Rows at or above `new_updated_at` are left untouched and reported
    /// with `advanced: false`. A subscription created or removed mid-cycle
    /// is picked up or dropped here because the rows are re-read inside the
    /// transaction rather than carried over from the cycle's initial
    /// `list_all` snapshot.
    pub async fn advance_watermarks(
        &self,
        link: &str,
        new_updated_at: i64,
    ) -> Result<Vec<WatermarkOutcome>, StorageError> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from_sqlx)?;

        let rows: Vec<(i64, String, i64)> = sqlx::query_as(
            "SELECT id, channel_id, updated_at FROM subscriptions WHERE link = ? ORDER BY id",
        )
        .bind(link)
        .fetch_all(&mut *tx)
        .await
        .map_err(StorageError::from_sqlx)?;

        let mut outcomes = Vec::with_capacity(rows.len());
        for (id, channel_id, updated_at) in rows {
            let advanced = new_updated_at > updated_at;
            if advanced {
                sqlx::query("UPDATE subscriptions SET updated_at = ? WHERE id = ?")
                    .bind(new_updated_at)
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .map_err(StorageError::from_sqlx)?;
            }
            outcomes.push(WatermarkOutcome {
                channel_id,
                advanced,
            });
        }

        tx.commit().await.map_err(StorageError::from_sqlx)?;

        Ok(outcomes)
    }
}
