//! Slack Web API client

use pacioli_core::error::{PacioliError, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info};

/// Default Slack Web API base URL
pub const SLACK_API_URL: &str = "https://slack.com/api";

/// Slack rejects messages with more blocks than this
pub const MAX_BLOCKS_PER_MESSAGE: usize = 50;

const CHANNEL_PAGE_LIMIT: u32 = 200;

#[derive(Debug, Deserialize)]
struct Channel {
    id: String,
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Debug, Deserialize)]
struct UploadTarget {
    upload_url: String,
    file_id: String,
}

#[derive(Debug, Deserialize)]
struct ConversationsList {
    #[serde(default)]
    channels: Vec<Channel>,
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

/// Posts report messages as a named bot
#[derive(Debug, Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    token: String,
    base_url: String,
    bot_name: String,
    icon_url: Option<String>,
}

impl SlackClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.into(),
            base_url: SLACK_API_URL.to_string(),
            bot_name: "pacioli".to_string(),
            icon_url: None,
        }
    }

    /// Point the client at another API root (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Username and icon shown on posted messages
    pub fn with_identity(mut self, bot_name: impl Into<String>, icon_url: Option<String>) -> Self {
        self.bot_name = bot_name.into();
        self.icon_url = icon_url;
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T> {
        let url = self.method_url(method);
        debug!("POST {}", url);
        let response: Value = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Self::check(method, response)
    }

    /// Call a method that takes its arguments as query parameters
    async fn call_with_params<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let url = reqwest::Url::parse_with_params(&self.method_url(method), params)
            .map_err(|e| PacioliError::Slack(format!("{method}: {e}")))?;
        debug!("POST {}", url);
        let response: Value = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Self::check(method, response)
    }

    fn check<T: DeserializeOwned>(method: &str, response: Value) -> Result<T> {
        if response.get("ok").and_then(Value::as_bool) != Some(true) {
            let error = response
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error");
            return Err(PacioliError::Slack(format!("{method}: {error}")));
        }
        Ok(serde_json::from_value(response)?)
    }

    /// Resolve a channel name to its id, following list cursors
    pub async fn channel_id(&self, channel_name: &str) -> Result<String> {
        let name = channel_name.trim_start_matches('#');
        let mut cursor = String::new();
        loop {
            let mut body = json!({
                "exclude_archived": true,
                "limit": CHANNEL_PAGE_LIMIT,
                "types": "public_channel,private_channel",
            });
            if !cursor.is_empty() {
                body["cursor"] = Value::String(cursor.clone());
            }

            let page: ConversationsList = self.call("conversations.list", &body).await?;
            if let Some(channel) = page.channels.into_iter().find(|c| c.name == name) {
                debug!("Resolved channel #{} to {}", name, channel.id);
                return Ok(channel.id);
            }

            cursor = page.response_metadata.next_cursor;
            if cursor.is_empty() {
                return Err(PacioliError::ChannelNotFound(name.to_string()));
            }
        }
    }

    /// Post `text` with `blocks` to the channel with id `channel`
    ///
    /// Resolve names with [`SlackClient::channel_id`] once per run. Block
    /// lists longer than Slack's per-message limit are split across
    /// consecutive messages.
    pub async fn post_message(&self, channel: &str, text: &str, blocks: &[Value]) -> Result<()> {
        let chunks: Vec<&[Value]> = if blocks.is_empty() {
            vec![blocks]
        } else {
            blocks.chunks(MAX_BLOCKS_PER_MESSAGE).collect()
        };
        for chunk in chunks {
            let mut body = json!({
                "channel": channel,
                "username": self.bot_name,
                "text": text,
            });
            if let Some(icon_url) = &self.icon_url {
                body["icon_url"] = Value::String(icon_url.clone());
            }
            if !chunk.is_empty() {
                body["blocks"] = Value::Array(chunk.to_vec());
            }
            let _: Value = self.call("chat.postMessage", &body).await?;
        }
        info!("Posted '{}' to {}", text, channel);
        Ok(())
    }

    /// Upload `content` as `filename` and share it in the channel with id
    /// `channel`, with `comment` as the accompanying message
    pub async fn upload_file(
        &self,
        channel: &str,
        filename: &str,
        title: &str,
        comment: &str,
        content: Vec<u8>,
    ) -> Result<()> {
        let length = content.len().to_string();
        let target: UploadTarget = self
            .call_with_params(
                "files.getUploadURLExternal",
                &[("filename", filename), ("length", &length)],
            )
            .await?;

        debug!("Uploading {} bytes as {}", length, target.file_id);
        self.http
            .post(&target.upload_url)
            .bearer_auth(&self.token)
            .body(content)
            .send()
            .await?
            .error_for_status()?;

        let body = json!({
            "files": [{"id": target.file_id, "title": title}],
            "channel_id": channel,
            "initial_comment": comment,
        });
        let _: Value = self.call("files.completeUploadExternal", &body).await?;
        info!("Uploaded '{}' to {}", title, channel);
        Ok(())
    }
}
