use serde_json::json;
use std::time::Duration;
use tracing::warn;

// External calls must fail visibly instead of hanging a request.
const DISPATCH_TIMEOUT_SECS: u64 = 10;

/// Secondary delivery status. Dispatch failures are reported through this
/// and never break the state transition they announce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationStatus {
    pub delivered: bool,
}

pub fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(DISPATCH_TIMEOUT_SECS))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Hand a template + recipient to the notify service. Fire-and-forget
/// relative to whatever triggered it: every failure path lands in the
/// returned status.
pub async fn dispatch(
    client: &reqwest::Client,
    notify_url: &str,
    template: &str,
    recipient: &str,
    vars: serde_json::Value,
) -> NotificationStatus {
    let url = format!(
        "{}/api/v1/notifications/send",
        notify_url.trim_end_matches('/')
    );

    let response = client
        .post(&url)
        .json(&json!({
            "template": template,
            "recipient": recipient,
            "vars": vars,
        }))
        .send()
        .await;

    match response {
        Ok(resp) if resp.status().is_success() => NotificationStatus { delivered: true },
        Ok(resp) => {
            warn!(
                "Notification '{}' for {} rejected: {}",
                template,
                recipient,
                resp.status()
            );
            NotificationStatus { delivered: false }
        }
        Err(e) => {
            warn!("Notification '{}' for {} failed: {}", template, recipient, e);
            NotificationStatus { delivered: false }
        }
    }
}
