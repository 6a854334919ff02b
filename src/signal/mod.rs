pub mod client;
pub mod listener;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;

use crate::signal::types::Received;

/// The bridge's Signal account.
#[async_trait]
pub trait SignalApi: Send + Sync {
    /// Send `text` and base64 data-string attachments to a group.
    async fn send(&self, group_id: &str, text: &str, attachments: &[String]) -> Result<()>;

    /// Next batch of inbound envelopes; may be empty.
    async fn receive(&self) -> Result<Vec<Received>>;

    /// Raw bytes of a received attachment.
    async fn fetch_attachment(&self, attachment_id: &str) -> Result<Vec<u8>>;
}
