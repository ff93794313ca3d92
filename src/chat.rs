//! Chat boundary for scoreboard fetching and prediction publishing
//!
//! The scoreboard lives in the description of the first embed of a fixed
//! Discord message. The poller reads that text, posts refresh requests and
//! predictions into the same channel, and deletes its own refresh request
//! once the scoreboard moves.

use crate::error::ChatError;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const API_BASE: &str = "https://discord.com/api/v10";

/// Chat operations the poller needs
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Current raw scoreboard text
    async fn fetch_scoreboard(&self) -> Result<String, ChatError>;

    /// Post a message to the scoreboard channel, returning its id
    async fn post_message(&self, content: &str) -> Result<String, ChatError>;

    /// Delete a previously posted message
    async fn delete_message(&self, message_id: &str) -> Result<(), ChatError>;
}

/// Discord message shape, reduced to the fields this crate reads
#[derive(Debug, Deserialize)]
struct DiscordMessage {
    id: String,
    #[serde(default)]
    embeds: Vec<DiscordEmbed>,
}

#[derive(Debug, Deserialize)]
struct DiscordEmbed {
    description: Option<String>,
}

/// Discord REST implementation of [`ChatClient`]
pub struct DiscordClient {
    http: reqwest::Client,
    token: String,
    channel_id: String,
    message_id: String,
}

impl DiscordClient {
    pub fn new(token: &str, channel_id: &str, message_id: &str) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            token: token.to_string(),
            channel_id: channel_id.to_string(),
            message_id: message_id.to_string(),
        })
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.token)
    }

    /// Map non-success statuses to [`ChatError::Status`] with the body
    /// attached, keeping transient/fatal classification possible upstream.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ChatError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ChatError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl ChatClient for DiscordClient {
    async fn fetch_scoreboard(&self) -> Result<String, ChatError> {
        let url = format!(
            "{}/channels/{}/messages/{}",
            API_BASE, self.channel_id, self.message_id
        );

        let response = self
            .http
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let message: DiscordMessage = response.json().await?;
        message
            .embeds
            .first()
            .and_then(|embed| embed.description.clone())
            .ok_or(ChatError::MissingEmbed)
    }

    async fn post_message(&self, content: &str) -> Result<String, ChatError> {
        let url = format!("{}/channels/{}/messages", API_BASE, self.channel_id);

        let response = self
            .http
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let message: DiscordMessage = response.json().await?;
        Ok(message.id)
    }

    async fn delete_message(&self, message_id: &str) -> Result<(), ChatError> {
        let url = format!(
            "{}/channels/{}/messages/{}",
            API_BASE, self.channel_id, message_id
        );

        let response = self
            .http
            .delete(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;
        Self::check_status(response).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_embed_parsing() {
        // Shape captured from GET /channels/{channel}/messages/{message}
        let raw = r#"{
            "id": "1332133523099877377",
            "channel_id": "1332041209903972375",
            "content": "",
            "embeds": [{"title": "Scoreboard", "description": "`#1` - `trukipouss` - 101.50ft 📏"}]
        }"#;

        let message: DiscordMessage = serde_json::from_str(raw).unwrap();

        assert_eq!(message.id, "1332133523099877377");
        let description = message.embeds.first().and_then(|e| e.description.clone());
        assert_eq!(
            description.as_deref(),
            Some("`#1` - `trukipouss` - 101.50ft 📏")
        );
    }

    #[test]
    fn test_message_without_embeds() {
        // Messages with no embeds array at all still deserialize
        let raw = r#"{"id": "123", "content": "hello"}"#;
        let message: DiscordMessage = serde_json::from_str(raw).unwrap();
        assert!(message.embeds.is_empty());
    }

    #[tokio::test]
    #[ignore] // Run only when testing with live credentials
    async fn test_fetch_scoreboard_live() {
        dotenv::dotenv().ok();
        let config = crate::config::Config::from_env();

        let client = DiscordClient::new(
            &config.discord_token,
            &config.channel_id,
            &config.message_id,
        )
        .unwrap();

        let text = client.fetch_scoreboard().await.unwrap();
        assert!(!text.is_empty());
    }
}
