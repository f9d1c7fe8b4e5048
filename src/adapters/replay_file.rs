use std::fs;
use std::io;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::adapters::transport::{InboundMessage, MessageSource, TransportError};

#[derive(Debug, Clone, Deserialize)]
struct ReplayScript {
    #[serde(default)]
    loop_forever: bool,
    #[serde(default)]
    connect_error: Option<String>,
    messages: Vec<ReplayEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct ReplayEntry {
    topic: Option<String>,
    payload: Option<Value>,
    raw: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone)]
enum ReplayStep {
    Message(InboundMessage),
    Error(String),
}

/// Replays a scripted message file in place of a broker session.
#[derive(Debug)]
pub struct ReplaySource {
    path: String,
    loop_forever: bool,
    connect_error: Option<String>,
    steps: Vec<ReplayStep>,
    next_idx: usize,
    subscribed: Vec<String>,
}

impl ReplaySource {
    pub fn from_file(path: &str) -> Result<Self, TransportError> {
        let content = fs::read_to_string(path)?;
        let script: ReplayScript = serde_json::from_str(&content)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

        let steps = script
            .messages
            .into_iter()
            .enumerate()
            .map(|(idx, entry)| build_step(idx, entry))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            path: path.to_string(),
            loop_forever: script.loop_forever,
            connect_error: script.connect_error,
            steps,
            next_idx: 0,
            subscribed: Vec::new(),
        })
    }

    pub fn subscribed(&self) -> &[String] {
        &self.subscribed
    }

    fn next_step(&mut self) -> Option<ReplayStep> {
        if self.next_idx >= self.steps.len() {
            if !self.loop_forever || self.steps.is_empty() {
                return None;
            }
            self.next_idx = 0;
        }

        let step = self.steps.get(self.next_idx).cloned();
        self.next_idx = self.next_idx.saturating_add(1);
        step
    }
}

fn build_step(idx: usize, entry: ReplayEntry) -> Result<ReplayStep, io::Error> {
    match (entry.topic, entry.payload, entry.raw, entry.error) {
        (Some(topic), Some(payload), None, None) => Ok(ReplayStep::Message(InboundMessage {
            topic,
            payload: payload.to_string().into_bytes(),
        })),
        (Some(topic), None, Some(raw), None) => Ok(ReplayStep::Message(InboundMessage {
            topic,
            payload: raw.into_bytes(),
        })),
        (_, None, None, Some(error)) => Ok(ReplayStep::Error(error)),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "replay entry {idx} must contain a topic and exactly one of: payload, raw or error"
            ),
        )),
    }
}

fn map_script_error(kind: &str) -> io::Error {
    let normalized = kind.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "timeout" => io::Error::new(io::ErrorKind::TimedOut, kind),
        "connection_refused" | "broker_down" => {
            io::Error::new(io::ErrorKind::ConnectionRefused, kind)
        }
        "host_unreachable" => io::Error::new(io::ErrorKind::HostUnreachable, kind),
        "network_unreachable" => io::Error::new(io::ErrorKind::NetworkUnreachable, kind),
        "connection_lost" | "connection_reset" => {
            io::Error::new(io::ErrorKind::ConnectionReset, kind)
        }
        _ => io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("unknown scripted error kind: {kind}"),
        ),
    }
}

#[async_trait]
impl MessageSource for ReplaySource {
    fn endpoint(&self) -> String {
        format!("replay:{}", self.path)
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        match &self.connect_error {
            Some(kind) => Err(TransportError::Replay(map_script_error(kind))),
            None => Ok(()),
        }
    }

    async fn subscribe(&mut self, topics: &[String]) -> Result<(), TransportError> {
        self.subscribed.extend(topics.iter().cloned());
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<InboundMessage>, TransportError> {
        match self.next_step() {
            Some(ReplayStep::Message(message)) => Ok(Some(message)),
            Some(ReplayStep::Error(kind)) => Err(TransportError::Replay(map_script_error(&kind))),
            None => Ok(None),
        }
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::ErrorKind;

    use crate::adapters::transport::{MessageSource, TransportError};
    use crate::test_support::{block_on, fixture};

    use super::ReplaySource;

    #[test]
    fn replays_payload_and_raw_entries_in_order() {
        let mut source =
            ReplaySource::from_file(&fixture("alarms.json")).expect("script should load");

        block_on(async {
            source.connect().await.expect("connect should succeed");
            source
                .subscribe(&["alarms/#".to_string()])
                .await
                .expect("subscribe should succeed");

            let first = source.recv().await.expect("recv").expect("first message");
            assert_eq!(first.topic, "alarms/pump-3");
            let value: serde_json::Value =
                serde_json::from_slice(&first.payload).expect("payload should be JSON");
            assert_eq!(value["level"], "CRITICAL");

            let second = source.recv().await.expect("recv").expect("second message");
            assert_eq!(second.payload, b"{not json".to_vec());

            let third = source.recv().await.expect("recv").expect("third message");
            assert_eq!(third.topic, "alarms/pump-7");

            assert!(source.recv().await.expect("recv").is_none());
        });
        assert_eq!(source.subscribed(), &["alarms/#".to_string()]);
    }

    #[test]
    fn loops_when_requested() {
        let mut source =
            ReplaySource::from_file(&fixture("looping.json")).expect("script should load");

        block_on(async {
            let a = source.recv().await.expect("recv").expect("message");
            let b = source.recv().await.expect("recv").expect("message");
            assert_eq!(a, b);
        });
    }

    #[test]
    fn simulates_refused_connection() {
        let mut source =
            ReplaySource::from_file(&fixture("connect_refused.json")).expect("script should load");

        let err = block_on(source.connect()).expect_err("connect should fail");
        match err {
            TransportError::Replay(io) => assert_eq!(io.kind(), ErrorKind::ConnectionRefused),
            other => panic!("expected replay io error, got {other:?}"),
        }
    }

    #[test]
    fn simulates_lost_connection() {
        let mut source =
            ReplaySource::from_file(&fixture("connection_lost.json")).expect("script should load");

        block_on(async {
            assert!(source.recv().await.expect("recv").is_some());
            let err = source.recv().await.expect_err("second step should fail");
            match err {
                TransportError::Replay(io) => assert_eq!(io.kind(), ErrorKind::ConnectionReset),
                other => panic!("expected replay io error, got {other:?}"),
            }
        });
    }

    #[test]
    fn rejects_entry_without_topic() {
        let err = ReplaySource::from_file(&fixture("invalid_entry.json"))
            .expect_err("entry without topic should fail");

        match err {
            TransportError::Replay(io) => assert_eq!(io.kind(), ErrorKind::InvalidData),
            other => panic!("expected invalid data error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_invalid_script_json() {
        let err = ReplaySource::from_file(&fixture("invalid_top_level_json.json"))
            .expect_err("invalid json should fail");

        match err {
            TransportError::Replay(io) => assert_eq!(io.kind(), ErrorKind::InvalidData),
            other => panic!("expected invalid data error, got {other:?}"),
        }
    }
}
