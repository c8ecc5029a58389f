use anyhow::{Context, Result};
use async_nats::Client;
use futures::stream::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::messages::{PhoneMessage, WatchMessage};

/// Outbound half of the phone link
#[async_trait::async_trait]
pub trait PhoneLink: Send + Sync {
    async fn send(&self, message: &WatchMessage) -> Result<()>;
}

/// Phone link over NATS
///
/// The watch publishes on `reftrack.watch.<user>` and listens on
/// `reftrack.phone.<user>`.
pub struct NatsLink {
    client: Client,
    user_id: String,
}

impl NatsLink {
    /// Connect to NATS server
    pub async fn connect(url: &str, user_id: String) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self { client, user_id })
    }

    fn outbound_subject(&self) -> String {
        format!("reftrack.watch.{}", self.user_id)
    }

    fn inbound_subject(&self) -> String {
        format!("reftrack.phone.{}", self.user_id)
    }

    /// Subscribe to messages from the phone
    ///
    /// Malformed or invalid payloads are logged and dropped.
    pub async fn subscribe(&self) -> Result<mpsc::Receiver<PhoneMessage>> {
        let subject = self.inbound_subject();
        info!("Subscribing to phone messages on {}", subject);

        let mut subscriber = self
            .client
            .subscribe(subject)
            .await
            .context("Failed to subscribe to phone messages")?;

        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            while let Some(msg) = subscriber.next().await {
                match PhoneMessage::parse(&msg.payload) {
                    Ok(message) => {
                        if tx.send(message).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Rejected phone message: {:#}", e),
                }
            }
        });

        Ok(rx)
    }

    /// Close NATS connection
    pub async fn close(self) -> Result<()> {
        info!("Closing NATS connection");
        self.client.flush().await.context("Failed to flush NATS")?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl PhoneLink for NatsLink {
    async fn send(&self, message: &WatchMessage) -> Result<()> {
        let subject = self.outbound_subject();
        let payload = serde_json::to_vec(message)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .context("Failed to publish to phone")?;

        debug!("Published to {}: {:?}", subject, message);
        Ok(())
    }
}
