use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::SignalConfig;
use crate::signal::types::Received;
use crate::signal::SignalApi;

/// Prefix signal-cli uses for the send-side id of a group.
const GROUP_ID_PREFIX: &str = "group.";

#[derive(Debug, Deserialize)]
struct GroupEntry {
    id: String,
    internal_id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    message: &'a str,
    number: &'a str,
    recipients: Vec<String>,
    base64_attachments: &'a [String],
}

/// Client for the signal-cli REST API.
pub struct SignalRestClient {
    client: reqwest::Client,
    base_url: String,
    phone_number: String,
    receive_timeout: u64,
    /// internal group id (as seen in envelopes) -> id accepted by `/v2/send`
    groups: RwLock<HashMap<String, String>>,
}

fn normalize_base_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}

impl SignalRestClient {
    pub fn new(config: &SignalConfig) -> Result<Self> {
        // Long enough to outlast a blocking receive call.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.receive_timeout_secs + 60))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: normalize_base_url(&config.api_host),
            phone_number: config.phone_number.clone(),
            receive_timeout: config.receive_timeout_secs,
            groups: RwLock::new(HashMap::new()),
        })
    }

    /// Learn the send ids of all groups the account is a member of.
    pub async fn detect_groups(&self) -> Result<usize> {
        let url = format!("{}/v1/groups/{}", self.base_url, self.phone_number);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to list Signal groups")?;
        let response = check_status(response, "list groups").await?;

        let entries: Vec<GroupEntry> = response
            .json()
            .await
            .context("Failed to parse Signal group list")?;

        let mut groups = self.groups.write().await;
        for entry in entries {
            debug!(
                "Signal group {} ({}) -> {}",
                entry.internal_id,
                entry.name.as_deref().unwrap_or("unnamed"),
                entry.id
            );
            groups.insert(entry.internal_id, entry.id);
        }

        info!("Detected {} Signal groups", groups.len());
        Ok(groups.len())
    }

    async fn recipient_for(&self, group_id: &str) -> String {
        if group_id.starts_with(GROUP_ID_PREFIX) {
            return group_id.to_string();
        }
        match self.groups.read().await.get(group_id) {
            Some(id) => id.clone(),
            None => {
                warn!("Group {} was not detected, sending to it as-is", group_id);
                group_id.to_string()
            }
        }
    }
}

async fn check_status(response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    anyhow::bail!("signal-cli {} failed ({}): {}", action, status, body);
}

#[async_trait]
impl SignalApi for SignalRestClient {
    async fn send(&self, group_id: &str, text: &str, attachments: &[String]) -> Result<()> {
        let request = SendRequest {
            message: text,
            number: &self.phone_number,
            recipients: vec![self.recipient_for(group_id).await],
            base64_attachments: attachments,
        };

        let url = format!("{}/v2/send", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to send to Signal group {}", group_id))?;
        check_status(response, "send").await?;
        Ok(())
    }

    async fn receive(&self) -> Result<Vec<Received>> {
        let url = format!("{}/v1/receive/{}", self.base_url, self.phone_number);
        let response = self
            .client
            .get(&url)
            .query(&[("timeout", self.receive_timeout)])
            .send()
            .await
            .context("Failed to poll Signal messages")?;
        let response = check_status(response, "receive").await?;

        let raw: Vec<serde_json::Value> = response
            .json()
            .await
            .context("Failed to parse Signal receive batch")?;

        let mut received = Vec::with_capacity(raw.len());
        for value in raw {
            match serde_json::from_value::<Received>(value) {
                Ok(r) => received.push(r),
                Err(e) => warn!("Skipping undecodable Signal envelope: {}", e),
            }
        }
        Ok(received)
    }

    async fn fetch_attachment(&self, attachment_id: &str) -> Result<Vec<u8>> {
        let url = format!("{}/v1/attachments/{}", self.base_url, attachment_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch Signal attachment {}", attachment_id))?;
        let response = check_status(response, "fetch attachment").await?;

        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read Signal attachment {}", attachment_id))?;
        if bytes.is_empty() {
            anyhow::bail!("Signal attachment {} is empty", attachment_id);
        }
        Ok(bytes.to_vec())
    }
}
