//! Best-effort webhook notification on bug creation.

use std::sync::Arc;
use std::time::Duration;

use bugtrack_store::Bug;
use serde_json::json;
use thiserror::Error;
use tokio::task::JoinHandle;

pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("webhook client setup failed: {0}")]
    Client(reqwest::Error),
    #[error("webhook delivery failed: {0}")]
    Delivery(reqwest::Error),
}

#[derive(Debug)]
struct WebhookTarget {
    url: String,
    client: reqwest::Client,
}

/// Sends creation summaries to a configured webhook. Without a URL every
/// call is a no-op.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    target: Option<Arc<WebhookTarget>>,
}

impl Notifier {
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Blank URLs disable notifications.
    pub fn from_url(url: Option<&str>) -> Result<Self, NotifyError> {
        let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) else {
            return Ok(Self::disabled());
        };
        let client = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .map_err(NotifyError::Client)?;
        Ok(Self {
            target: Some(Arc::new(WebhookTarget {
                url: url.to_string(),
                client,
            })),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.target.is_some()
    }

    /// Dispatch a creation notice without waiting for it. The outcome is
    /// only logged. Returns the task handle when a send was spawned.
    pub fn bug_created(&self, bug: &Bug) -> Option<JoinHandle<()>> {
        if !self.is_enabled() {
            return None;
        }
        let notifier = self.clone();
        let bug_id = bug.id.clone();
        let text = bug_summary(bug);
        Some(tokio::spawn(async move {
            match notifier.send(&text).await {
                Ok(()) => tracing::debug!(bug_id = %bug_id, "webhook notification delivered"),
                Err(err) => {
                    tracing::warn!(bug_id = %bug_id, error = %err, "webhook notification failed")
                }
            }
        }))
    }

    /// POST `{"text": ...}` to the webhook.
    pub async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let Some(target) = &self.target else {
            return Ok(());
        };
        target
            .client
            .post(&target.url)
            .json(&json!({ "text": text }))
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(NotifyError::Delivery)?;
        Ok(())
    }
}

/// Plain-text summary of a newly reported bug.
pub fn bug_summary(bug: &Bug) -> String {
    let mut lines = vec![
        format!("New bug reported: {}", bug.title),
        format!("Priority: {}", bug.priority.as_str()),
        format!("Reported by: {}", bug.reported_by),
    ];
    if !bug.assigned_to.trim().is_empty() {
        lines.push(format!("Assigned to: {}", bug.assigned_to));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_url_disables_notifier() {
        assert!(!Notifier::from_url(None).expect("builds").is_enabled());
        assert!(!Notifier::from_url(Some("  ")).expect("builds").is_enabled());
        assert!(
            Notifier::from_url(Some("http://127.0.0.1:9/hook"))
                .expect("builds")
                .is_enabled()
        );
    }

    #[tokio::test]
    async fn disabled_notifier_spawns_nothing() {
        let store = bugtrack_store::BugStore::in_memory();
        let bug = store
            .create(bugtrack_store::BugFields {
                title: Some("t".to_string()),
                description: Some("d".to_string()),
                reported_by: Some("r".to_string()),
                ..Default::default()
            })
            .expect("create succeeds");
        assert!(Notifier::disabled().bug_created(&bug).is_none());
    }
}
