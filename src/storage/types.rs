use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Storage-layer errors with user-friendly messages
#[derive(Debug, Error)]
pub enum StorageError {
    /// The (link, channel) pair already exists - surfaced as its own variant
    /// so callers can answer the user instead of reporting a constraint dump.
    #[error("already subscribed to this feed")]
    DuplicateSubscription,

    /// Another process has the database locked
    #[error("another instance of crier appears to be running. Please close it and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl StorageError {
    /// Classify a sqlx error: unique-constraint violations become
    /// [`StorageError::DuplicateSubscription`], lock conditions become
    /// [`StorageError::InstanceLocked`], everything else passes through.
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return StorageError::DuplicateSubscription;
            }
        }

        // SQLITE_BUSY (5): database is locked
        // SQLITE_LOCKED (6): database table is locked
        // SQLITE_CANTOPEN (14): unable to open database file
        let error_string = err.to_string().to_lowercase();
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
            || error_string.contains("unable to open database file")
        {
            return StorageError::InstanceLocked;
        }

        StorageError::Other(err)
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// A persisted subscription: one chat channel watching one feed URL.
///
/// `updated_at` is the watermark - the highest feed-root update time already
/// reported to this channel for this link. It only moves forward, and only
/// inside the per-link cycle transaction.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Subscription {
    pub id: i64,
    pub title: String,
    pub link: String,
    pub channel_id: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Insert payload for a new subscription.
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub title: String,
    pub link: String,
    pub channel_id: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Per-subscriber outcome of a watermark pass over one link.
///
/// `advanced` is true when the freshly fetched root update time was strictly
/// greater than the stored watermark and the row was updated.
#[derive(Debug, Clone)]
pub struct WatermarkOutcome {
    pub channel_id: String,
    pub advanced: bool,
}
