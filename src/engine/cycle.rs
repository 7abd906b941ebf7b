use crate::feed::{FetchError, Fetcher};
use crate::storage::{Database, StorageError};

/// One new item to report to a channel.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub title: String,
    pub link: Option<String>,
}

/// Output unit of a detection cycle: what one subscription should hear.
///
/// An empty `new_items` means "checked, nothing new." A link that failed to
/// fetch produces no event at all - its error sits in
/// [`CycleReport::failures`] instead, so consumers can tell the two apart.
#[derive(Debug, Clone)]
pub struct NotificationEvent {
    pub feed_title: String,
    pub link: String,
    pub channel_id: String,
    pub new_items: Vec<NewItem>,
}

/// Everything one detection cycle produced.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub events: Vec<NotificationEvent>,
    pub failures: Vec<(String, FetchError)>,
}

impl CycleReport {
    /// Number of events that actually carry new items.
    pub fn notified(&self) -> usize {
        self.events.iter().filter(|e| !e.new_items.is_empty()).count()
    }
}

/// Run one detection cycle.
///
/// Reads the full subscription list, fetches each **distinct** link at most
/// once regardless of subscriber count, and advances watermarks per link in
/// their own transaction. Events are staged only after the link's
/// transaction commits, so nothing is ever reported for an advance that was
/// not durably written.
///
/// Fetch failures are isolated per link: the link is logged, recorded in the
/// report, and the remaining links still commit. Storage errors abort the
/// cycle - the transaction in flight rolls back and the error propagates to
/// the scheduler, which survives to run the next tick.
pub async fn run_cycle(db: &Database, fetcher: &Fetcher) -> Result<CycleReport, StorageError> {
    let subscriptions = db.list_all().await?;

    let mut report = CycleReport::default();
    if subscriptions.is_empty() {
        tracing::debug!("no subscriptions, nothing to check");
        return Ok(report);
    }

    // Group by link before the fetch phase: multiple channels subscribing to
    // the same URL must not multiply remote requests. First-seen order keeps
    // the cycle deterministic.
    let mut links: Vec<String> = Vec::new();
    for sub in &subscriptions {
        if !links.contains(&sub.link) {
            links.push(sub.link.clone());
        }
    }

    tracing::debug!(
        subscriptions = subscriptions.len(),
        distinct_links = links.len(),
        "starting detection cycle"
    );

    for link in links {
        let feed = match fetcher.fetch(&link).await {
            Ok(feed) => feed,
            Err(e) => {
                tracing::warn!(link = %link, error = %e, "feed fetch failed, skipping link for this cycle");
                report.failures.push((link, e));
                continue;
            }
        };

        // Read-and-advance in one transaction; rows are re-read here rather
        // than reused from the snapshot above, so subscriptions added or
        // removed mid-cycle are handled consistently.
        let outcomes = db.advance_watermarks(&link, feed.root_updated_at).await?;

        // Only the single most-recent item is reported. Feeds are not
        // guaranteed to order items monotonically; this mirrors the
        // watermark being a feed-root time, not a per-item cursor.
        let latest = feed.items.first();

        for outcome in outcomes {
            let new_items = if outcome.advanced {
                latest
                    .map(|item| NewItem {
                        title: item.title.clone(),
                        link: item.link.clone(),
                    })
                    .into_iter()
                    .collect()
            } else {
                Vec::new()
            };

            report.events.push(NotificationEvent {
                feed_title: feed.title.clone(),
                link: link.clone(),
                channel_id: outcome.channel_id,
                new_items,
            });
        }
    }

    tracing::info!(
        checked = report.events.len(),
        notified = report.notified(),
        failed = report.failures.len(),
        "detection cycle finished"
    );

    Ok(report)
}
