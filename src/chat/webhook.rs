use super::ChatClient;
use anyhow::Context;
use async_trait::async_trait;
use std::collections::HashMap;

/// Webhook-backed [`ChatClient`].
///
/// Routes each channel id to a webhook URL from the config file and posts
/// messages as `{"content": ...}` JSON, the shape Discord-compatible
/// webhooks accept. A channel without a route is logged and dropped - the
/// engine does not care whether anyone is listening.
pub struct WebhookClient {
    client: reqwest::Client,
    routes: HashMap<String, String>,
}

impl WebhookClient {
    pub fn new(client: reqwest::Client, routes: HashMap<String, String>) -> Self {
        Self { client, routes }
    }
}

#[async_trait]
impl ChatClient for WebhookClient {
    async fn send_message(&self, channel_id: &str, text: &str) -> anyhow::Result<()> {
        let Some(url) = self.routes.get(channel_id) else {
            tracing::warn!(channel = %channel_id, "no webhook route for channel, dropping message");
            return Ok(());
        };

        let response = self
            .client
            .post(url)
            .json(&serde_json::json!({ "content": text }))
            .send()
            .await
            .context("webhook request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("webhook returned status {}", response.status());
        }

        Ok(())
    }
}
