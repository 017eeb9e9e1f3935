//! Slack incoming webhook 渠道

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::notification::channel::{NotificationMessage, NotificationSink, SendResult};

/// 默认超时（秒）
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Slack 渠道配置
#[derive(Debug, Clone)]
pub struct SlackConfig {
    /// Incoming webhook URL
    pub webhook_url: String,
    /// 覆盖 webhook 默认频道（如 `#builds`）
    pub channel: Option<String>,
    pub username: Option<String>,
    pub icon_emoji: Option<String>,
    /// 超时时间 (秒)
    pub timeout_secs: u64,
}

impl SlackConfig {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            channel: None,
            username: None,
            icon_emoji: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Webhook 附件
#[derive(Debug, Serialize)]
struct Attachment<'a> {
    fallback: &'a str,
    text: &'a str,
    color: &'a str,
    mrkdwn_in: [&'static str; 3],
}

/// Webhook 请求载荷
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon_emoji: Option<&'a str>,
    attachments: Vec<Attachment<'a>>,
}

/// Slack webhook 渠道
pub struct SlackWebhookChannel {
    client: reqwest::blocking::Client,
    config: SlackConfig,
}

impl SlackWebhookChannel {
    pub fn new(config: SlackConfig) -> Result<Self> {
        if config.webhook_url.is_empty() {
            return Err(anyhow!("webhook_url is required"));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| anyhow!("Cannot create HTTP client: {}", e))?;

        Ok(Self { client, config })
    }

    fn payload<'a>(&'a self, message: &'a NotificationMessage) -> WebhookPayload<'a> {
        WebhookPayload {
            channel: self.config.channel.as_deref(),
            username: self.config.username.as_deref(),
            icon_emoji: self.config.icon_emoji.as_deref(),
            attachments: vec![Attachment {
                fallback: &message.text,
                text: &message.text,
                color: message.color.as_str(),
                mrkdwn_in: ["pretext", "text", "fields"],
            }],
        }
    }
}

impl NotificationSink for SlackWebhookChannel {
    fn name(&self) -> &str {
        "slack"
    }

    fn publish(&self, message: &NotificationMessage) -> Result<SendResult> {
        debug!(
            channel = "slack",
            target = ?self.config.channel,
            color = %message.color,
            "Posting to Slack webhook"
        );

        let response = self
            .client
            .post(&self.config.webhook_url)
            .json(&self.payload(message))
            .send()
            .map_err(|e| anyhow!("Slack webhook request failed: {}", e))?;

        let status = response.status();
        if status.is_success() {
            info!(channel = "slack", project = ?message.project, build = ?message.build, "Notification posted");
            Ok(SendResult::Sent)
        } else {
            let body = response.text().unwrap_or_default();
            Ok(SendResult::Failed(format!("HTTP {}: {}", status, body)))
        }
    }
}
