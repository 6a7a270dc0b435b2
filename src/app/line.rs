//! LINE platform plumbing: credentials and the reply-endpoint client.

use anyhow::Context as _;

const REPLY_ENDPOINT: &str = "https://api.line.me/v2/bot/message/reply";

/// Channel credentials, supplied through the environment.
#[derive(Debug, Clone)]
pub struct LineConfig {
    pub channel_access_token: String,
    pub channel_secret: String,
}

impl LineConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let channel_access_token = std::env::var("CHANNEL_ACCESS_TOKEN")
            .context("CHANNEL_ACCESS_TOKEN is required")?
            .trim()
            .to_string();
        if channel_access_token.is_empty() {
            anyhow::bail!("CHANNEL_ACCESS_TOKEN is empty");
        }

        let channel_secret = std::env::var("CHANNEL_SECRET")
            .context("CHANNEL_SECRET is required")?
            .trim()
            .to_string();
        if channel_secret.is_empty() {
            anyhow::bail!("CHANNEL_SECRET is empty");
        }

        Ok(Self {
            channel_access_token,
            channel_secret,
        })
    }
}

/// Sends the formatted reply back through the platform's reply primitive.
pub struct LineClient {
    http: reqwest::Client,
    access_token: String,
    endpoint: String,
}

impl LineClient {
    pub fn new(access_token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            access_token,
            endpoint: REPLY_ENDPOINT.to_owned(),
        }
    }

    /// Point the client at a different reply endpoint (staging, tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// One reply per event; the token is single-use and expires, so there
    /// is nothing to retry.
    pub async fn reply(&self, reply_token: &str, text: &str) -> anyhow::Result<()> {
        let body = serde_json::json!({
            "replyToken": reply_token,
            "messages": [{ "type": "text", "text": text }],
        });

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .context("send reply request")?;

        if resp.status().is_success() {
            return Ok(());
        }
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("reply send failed ({status}): {body}");
    }
}
