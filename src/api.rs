//! Subscription management API.
//!
//! The operations the command layer invokes on behalf of channel operators:
//! preview a URL, subscribe, unsubscribe, list. Errors render as
//! human-readable text via `Display`; internal detail goes to the log.

use crate::feed::{check_feed_url, FetchError, Fetcher, UrlCheckError};
use crate::storage::{Database, NewSubscription, StorageError};
use thiserror::Error;

/// Latest-item preview of a feed, without persisting anything.
#[derive(Debug, Clone)]
pub struct Preview {
    pub feed_title: String,
    pub latest_title: String,
    pub latest_link: Option<String>,
}

/// What a successful subscribe reports back to the user.
#[derive(Debug, Clone)]
pub struct Subscribed {
    pub title: String,
    pub link: String,
}

/// One row of a channel's subscription list.
#[derive(Debug, Clone)]
pub struct ChannelFeed {
    pub title: String,
    pub link: String,
}

/// User-facing errors of the management operations.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidUrl(#[from] UrlCheckError),

    #[error("could not fetch the feed: {0}")]
    Fetch(#[from] FetchError),

    #[error("already subscribed to this feed")]
    AlreadySubscribed,

    #[error("something went wrong with the bot's storage")]
    Storage(#[source] StorageError),
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::DuplicateSubscription => ApiError::AlreadySubscribed,
            other => {
                tracing::error!(error = %other, "storage operation failed");
                ApiError::Storage(other)
            }
        }
    }
}

/// The management operations, shared between the daemon's command layer and
/// the one-shot CLI subcommands. Cheap to clone.
#[derive(Clone)]
pub struct Subscriptions {
    db: Database,
    fetcher: Fetcher,
    allow_private_hosts: bool,
}

impl Subscriptions {
    pub fn new(db: Database, fetcher: Fetcher) -> Self {
        Self {
            db,
            fetcher,
            allow_private_hosts: false,
        }
    }

    /// Admit loopback and RFC 1918 addresses as feed hosts. Off by default;
    /// intended for operators watching feeds on their own network.
    pub fn allow_private_hosts(mut self, allow: bool) -> Self {
        self.allow_private_hosts = allow;
        self
    }

    /// Fetch-only "test this URL" affordance: returns the latest item.
    pub async fn preview(&self, url: &str) -> Result<Preview, ApiError> {
        let url = check_feed_url(url, self.allow_private_hosts)?;
        let feed = self.fetcher.fetch(url.as_str()).await?;

        // fetch() guarantees at least one item
        let latest = &feed.items[0];
        Ok(Preview {
            feed_title: feed.title.clone(),
            latest_title: latest.title.clone(),
            latest_link: latest.link.clone(),
        })
    }

    /// Subscribe a channel to a URL.
    ///
    /// Performs the preliminary fetch first - a URL that fails to fetch,
    /// fails to parse, or has zero items is refused and nothing is stored.
    /// The watermark starts at the feed's root update time at subscribe
    /// time, so the first cycle after subscribing does not re-announce the
    /// item that was already current.
    pub async fn subscribe(&self, url: &str, channel_id: &str) -> Result<Subscribed, ApiError> {
        let url = check_feed_url(url, self.allow_private_hosts)?;
        let feed = self.fetcher.fetch(url.as_str()).await?;

        let now = chrono::Utc::now().timestamp();
        let new = NewSubscription {
            title: feed.title.clone(),
            link: url.to_string(),
            channel_id: channel_id.to_string(),
            created_at: now,
            updated_at: feed.root_updated_at,
        };
        self.db.insert_subscription(&new).await?;

        tracing::info!(link = %new.link, channel = %channel_id, "subscribed");
        Ok(Subscribed {
            title: new.title,
            link: new.link,
        })
    }

    /// Remove a channel's subscription to a URL.
    ///
    /// A missing match is a benign no-op; returns whether a row was removed.
    pub async fn unsubscribe(&self, url: &str, channel_id: &str) -> Result<bool, ApiError> {
        // Subscribe stores the normalized form, so normalize here too or an
        // exact-as-typed URL would fail to match its own row.
        let link = match url::Url::parse(url) {
            Ok(parsed) => parsed.to_string(),
            Err(_) => url.to_string(),
        };
        let removed = self.db.delete_subscription(&link, channel_id).await?;
        if removed {
            tracing::info!(link = %url, channel = %channel_id, "unsubscribed");
        }
        Ok(removed)
    }

    /// Title+link pairs of a channel's subscriptions, for display.
    pub async fn list(&self, channel_id: &str) -> Result<Vec<ChannelFeed>, ApiError> {
        let subs = self.db.list_by_channel(channel_id).await?;
        Ok(subs
            .into_iter()
            .map(|s| ChannelFeed {
                title: s.title,
                link: s.link,
            })
            .collect())
    }
}
