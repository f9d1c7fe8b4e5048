use async_trait::async_trait;
use rumqttc::{ClientError, ConnectReturnCode, ConnectionError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("error connecting to MQTT broker at {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: ConnectionError,
    },
    #[error("MQTT broker at {address} refused the connection: {code:?}")]
    Refused {
        address: String,
        code: ConnectReturnCode,
    },
    #[error("failed to subscribe to '{topic}': {source}")]
    Subscribe {
        topic: String,
        #[source]
        source: ClientError,
    },
    #[error("connection to MQTT broker lost: {0}")]
    ConnectionLost(#[source] ConnectionError),
    #[error("failed to disconnect from MQTT broker: {0}")]
    Disconnect(#[source] ClientError),
    #[error("replay source failed: {0}")]
    Replay(#[from] std::io::Error),
}

/// A broker session that delivers inbound messages one at a time.
#[async_trait]
pub trait MessageSource: Send {
    /// Human-readable endpoint, used in notices and logs.
    fn endpoint(&self) -> String;

    async fn connect(&mut self) -> Result<(), TransportError>;

    async fn subscribe(&mut self, topics: &[String]) -> Result<(), TransportError>;

    /// `Ok(None)` means the source has no more messages.
    async fn recv(&mut self) -> Result<Option<InboundMessage>, TransportError>;

    async fn disconnect(&mut self) -> Result<(), TransportError>;
}
