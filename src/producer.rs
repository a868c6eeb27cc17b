//! NATS reply publisher

use anyhow::Result;
use async_nats::{Client, Subject};
use serde::Serialize;
use tracing::debug;

/// Publishes reply bodies to a request's reply subject
#[derive(Clone)]
pub struct ReplyProducer {
    client: Client,
}

impl ReplyProducer {
    /// Create a new reply producer
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Serialize `body` as JSON and publish it to `reply_to`
    pub async fn reply<T: Serialize>(&self, reply_to: Subject, body: &T) -> Result<()> {
        let payload = encode(body)?;
        let size = payload.len();

        self.client.publish(reply_to.clone(), payload.into()).await?;

        debug!(subject = %reply_to, bytes = size, "Published reply");
        Ok(())
    }
}

/// JSON encoding used for every reply
pub fn encode<T: Serialize>(body: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(body)?)
}
