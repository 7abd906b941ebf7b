//! Chat-platform delivery seam.
//!
//! The engine never talks to a chat platform directly; it hands
//! [`NotificationEvent`]s to a [`ChatClient`]. Delivery is fire-and-forget:
//! send errors are logged, never propagated, and never block the next cycle.

mod webhook;

pub use webhook::WebhookClient;

use crate::engine::cycle::CycleReport;
use async_trait::async_trait;

/// Outbound message sink for one chat platform.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Deliver one message to one channel.
    async fn send_message(&self, channel_id: &str, text: &str) -> anyhow::Result<()>;
}

/// Deliver the events of one finished cycle: one outbound message per new
/// item, addressed to the event's channel.
///
/// Events with an empty item list mean "checked, nothing new" and produce
/// no message.
pub async fn deliver_events(client: &dyn ChatClient, report: &CycleReport) {
    for event in &report.events {
        if event.new_items.is_empty() {
            tracing::debug!(link = %event.link, channel = %event.channel_id, "no new items");
            continue;
        }

        for item in &event.new_items {
            let text = format!(
                "New from **{}**!\n{}",
                event.feed_title,
                item.link.as_deref().unwrap_or(&event.link)
            );
            if let Err(e) = client.send_message(&event.channel_id, &text).await {
                tracing::warn!(
                    channel = %event.channel_id,
                    link = %event.link,
                    error = %e,
                    "failed to deliver notification"
                );
            }
        }
    }
}
