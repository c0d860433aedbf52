//! Digest formatting and delivery
//!
//! Digests always go to the log; with a webhook configured they are also
//! POSTed as `{"content": ...}` messages. Delivery is best effort.

use crate::error::NotifyError;
use crate::report::Report;
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

/// Longest message body the webhook accepts
pub const WEBHOOK_MESSAGE_LIMIT: usize = 2000;

/// Render a report as `**Caption**:` blocks of `- item` lines
///
/// Empty categories render nothing; blocks are separated by a blank line.
pub fn compose_message(report: &Report) -> String {
    report
        .iter()
        .map(|(category, lines)| {
            let items = lines
                .iter()
                .map(|line| format!("- {}", line))
                .collect::<Vec<_>>()
                .join("\n");
            format!("**{}**:\n{}", category.label(), items)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Split a message into chunks of at most `limit` characters, preferring
/// line boundaries
pub fn split_message(message: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in message.split('\n') {
        let line_len = line.chars().count();
        let needed = if current.is_empty() { line_len } else { line_len + 1 };

        if current_len + needed <= limit {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
            current_len += needed;
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len <= limit {
            current.push_str(line);
            current_len = line_len;
        } else {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(limit) {
                chunks.push(piece.iter().collect());
            }
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Posts digests to a webhook URL
pub struct WebhookSink {
    http_client: reqwest::Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>) -> Result<Self, NotifyError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            http_client,
            url: url.into(),
        })
    }

    pub async fn send(&self, message: &str) -> Result<(), NotifyError> {
        for chunk in split_message(message, WEBHOOK_MESSAGE_LIMIT) {
            let response = self
                .http_client
                .post(&self.url)
                .json(&json!({ "content": chunk }))
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                return Err(NotifyError::Status(status.as_u16()));
            }
        }
        Ok(())
    }
}

/// Publishes reports to the log and, optionally, a webhook
#[derive(Default)]
pub struct Notifier {
    webhook: Option<WebhookSink>,
}

impl Notifier {
    pub fn log_only() -> Self {
        Self::default()
    }

    pub fn with_webhook(webhook: WebhookSink) -> Self {
        Self {
            webhook: Some(webhook),
        }
    }

    /// Returns the rendered digest (empty when nothing changed)
    pub async fn publish(&self, report: &Report) -> String {
        let message = compose_message(report);
        if message.is_empty() {
            info!("No updates detected.");
            return message;
        }

        info!("{}", message);
        if let Some(webhook) = &self.webhook {
            if let Err(e) = webhook.send(&message).await {
                warn!("Failed to deliver digest: {}", e);
            }
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Category;

    #[test]
    fn test_compose_message() {
        let mut report = Report::new();
        report.push(Category::AddedBronzeCoins, "**+1** A by B (1)");
        report.push(Category::LevelsUnrated, "C by D (2)");
        report.push(Category::LevelsUnrated, "E by F (3)");

        assert_eq!(
            compose_message(&report),
            "**Levels unrated**:\n- C by D (2)\n- E by F (3)\n\n**Added bronze coins**:\n- **+1** A by B (1)"
        );
    }

    #[test]
    fn test_empty_report_renders_nothing() {
        assert_eq!(compose_message(&Report::new()), "");
    }

    #[test]
    fn test_split_message_on_lines() {
        let message = "aaaa\nbbbb\ncccc";
        assert_eq!(split_message(message, 9), vec!["aaaa\nbbbb", "cccc"]);
        assert_eq!(split_message(message, 100), vec![message]);
    }

    #[test]
    fn test_split_message_breaks_long_lines() {
        let chunks = split_message("abcdefghij", 4);
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
        assert!(chunks.iter().all(|c| c.chars().count() <= 4));
    }

    #[tokio::test]
    async fn test_publish_returns_digest() {
        let notifier = Notifier::log_only();
        assert_eq!(notifier.publish(&Report::new()).await, "");

        let mut report = Report::new();
        report.push(Category::SongsFirstUsed, "501 - Track by Artist");
        assert_eq!(
            notifier.publish(&report).await,
            "**Songs used for the first time**:\n- 501 - Track by Artist"
        );
    }
}
