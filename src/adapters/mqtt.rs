use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{
    AsyncClient, ConnectionError, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS,
};

use crate::adapters::transport::{InboundMessage, MessageSource, TransportError};

const REQUEST_CHANNEL_CAPACITY: usize = 10;
const DISCONNECT_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub keep_alive_secs: u64,
    pub client_id: String,
}

pub struct MqttSource {
    address: String,
    client: AsyncClient,
    eventloop: EventLoop,
    pending: VecDeque<InboundMessage>,
}

impl MqttSource {
    pub fn new(settings: &MqttSettings) -> Self {
        let mut options = MqttOptions::new(&settings.client_id, &settings.host, settings.port);
        options.set_keep_alive(Duration::from_secs(settings.keep_alive_secs));

        let (client, eventloop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);

        Self {
            address: format!("{}:{}", settings.host, settings.port),
            client,
            eventloop,
            pending: VecDeque::new(),
        }
    }
}

fn connect_failure(address: &str, error: ConnectionError) -> TransportError {
    match error {
        ConnectionError::ConnectionRefused(code) => TransportError::Refused {
            address: address.to_string(),
            code,
        },
        source => TransportError::Connect {
            address: address.to_string(),
            source,
        },
    }
}

#[async_trait]
impl MessageSource for MqttSource {
    fn endpoint(&self) -> String {
        self.address.clone()
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        loop {
            match self.eventloop.poll().await {
                // Refused ConnAcks surface from poll() as errors.
                Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
                Ok(_) => continue,
                Err(error) => return Err(connect_failure(&self.address, error)),
            }
        }
    }

    async fn subscribe(&mut self, topics: &[String]) -> Result<(), TransportError> {
        for topic in topics {
            self.client
                .subscribe(topic.as_str(), QoS::AtMostOnce)
                .await
                .map_err(|source| TransportError::Subscribe {
                    topic: topic.clone(),
                    source,
                })?;
        }

        let mut acknowledged = 0;
        while acknowledged < topics.len() {
            match self
                .eventloop
                .poll()
                .await
                .map_err(TransportError::ConnectionLost)?
            {
                Event::Incoming(Packet::SubAck(_)) => acknowledged += 1,
                // Retained messages may arrive before the last SubAck.
                Event::Incoming(Packet::Publish(publish)) => {
                    self.pending.push_back(InboundMessage {
                        topic: publish.topic,
                        payload: publish.payload.to_vec(),
                    });
                }
                _ => {}
            }
        }

        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<InboundMessage>, TransportError> {
        if let Some(message) = self.pending.pop_front() {
            return Ok(Some(message));
        }

        loop {
            match self
                .eventloop
                .poll()
                .await
                .map_err(TransportError::ConnectionLost)?
            {
                Event::Incoming(Packet::Publish(publish)) => {
                    return Ok(Some(InboundMessage {
                        topic: publish.topic,
                        payload: publish.payload.to_vec(),
                    }));
                }
                _ => continue,
            }
        }
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.client
            .disconnect()
            .await
            .map_err(TransportError::Disconnect)?;

        // The DISCONNECT packet only leaves once the event loop runs.
        let flush = async {
            loop {
                match self.eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => continue,
                }
            }
        };
        if tokio::time::timeout(DISCONNECT_FLUSH_TIMEOUT, flush)
            .await
            .is_err()
        {
            tracing::warn!(address = %self.address, "timed out flushing MQTT disconnect");
        }

        Ok(())
    }
}
