use std::future::Future;
use std::io::{IsTerminal, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::adapters::audit_log::AuditLog;
use crate::adapters::mqtt::{MqttSettings, MqttSource};
use crate::adapters::replay_file::ReplaySource;
use crate::adapters::transport::{InboundMessage, MessageSource, TransportError};
use crate::app::cli::MonitorSettings;
use crate::app::config::AppConfig;
use crate::app::error::AppError;
use crate::app::sink::{EventSink, Outcome, SinkError};
use crate::domain::filter::Clock;
use crate::domain::format::Formatter;

#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Disconnected,
    Connecting,
    Subscribed,
    Disconnecting,
    Terminated,
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("{0}")]
    Connect(#[source] TransportError),
    #[error("{0}")]
    Subscribe(#[source] TransportError),
    #[error("{0}")]
    Receive(#[source] TransportError),
    #[error("failed to write operator output: {0}")]
    Sink(#[from] SinkError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverSummary {
    pub received: u64,
    pub displayed: u64,
    pub filtered: u64,
    pub rejected: u64,
    pub failed: u64,
}

pub struct SubscriptionDriver<S, W, C> {
    source: S,
    sink: EventSink<W, C>,
    topics: Vec<String>,
    title: &'static str,
    state: DriverState,
    summary: DriverSummary,
}

impl<S, W, C> SubscriptionDriver<S, W, C>
where
    S: MessageSource,
    W: Write,
    C: Clock,
{
    pub fn new(
        source: S,
        sink: EventSink<W, C>,
        topics: Vec<String>,
        title: &'static str,
    ) -> Self {
        Self {
            source,
            sink,
            topics,
            title,
            state: DriverState::Disconnected,
            summary: DriverSummary::default(),
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn into_sink(self) -> EventSink<W, C> {
        self.sink
    }

    /// Runs until `shutdown` resolves or the source is exhausted. Shutdown is only
    /// observed between messages.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<DriverSummary, DriverError>
    where
        F: Future<Output = ()>,
    {
        self.transition(DriverState::Connecting);
        if let Err(error) = self.source.connect().await {
            self.sink.report_fatal(&error)?;
            self.transition(DriverState::Terminated);
            return Err(DriverError::Connect(error));
        }
        self.sink.notice("Connected to MQTT broker")?;

        if let Err(error) = self.source.subscribe(&self.topics).await {
            self.sink.report_fatal(&error)?;
            self.teardown().await;
            return Err(DriverError::Subscribe(error));
        }
        self.transition(DriverState::Subscribed);

        self.sink.notice(&format!("Starting {}...", self.title))?;
        self.sink.notice("Press Ctrl+C to exit")?;
        let log_file = format!("Log file: {}", self.sink.audit_path().display());
        self.sink.notice(&log_file)?;

        tokio::pin!(shutdown);

        let received = loop {
            let next = tokio::select! {
                biased;
                () = &mut shutdown => None,
                received = self.source.recv() => Some(received),
            };

            match next {
                None => {
                    tracing::info!("shutdown requested");
                    break Ok(());
                }
                Some(Ok(Some(message))) => self.dispatch(&message),
                Some(Ok(None)) => {
                    tracing::info!("message source exhausted");
                    break Ok(());
                }
                Some(Err(error)) => break Err(error),
            }
        };

        if let Err(error) = received {
            self.sink.report_fatal(&error)?;
            self.teardown().await;
            return Err(DriverError::Receive(error));
        }

        self.sink.notice(&format!("Stopping {}...", self.title))?;
        self.teardown().await;
        Ok(self.summary)
    }

    fn dispatch(&mut self, message: &InboundMessage) {
        self.summary.received += 1;

        match self.sink.handle(&message.topic, &message.payload) {
            Ok(Outcome::Displayed) => self.summary.displayed += 1,
            Ok(Outcome::Filtered) => self.summary.filtered += 1,
            Ok(Outcome::Rejected) => self.summary.rejected += 1,
            Err(error) => {
                self.summary.failed += 1;
                tracing::warn!(topic = %message.topic, error = %error, "message handling failed");
                if let Err(report_error) = self.sink.report_message_error(&error) {
                    tracing::warn!(error = %report_error, "failed to report message error");
                }
            }
        }
    }

    async fn teardown(&mut self) {
        self.transition(DriverState::Disconnecting);
        if let Err(error) = self.source.disconnect().await {
            tracing::warn!(error = %error, "disconnect failed");
        }
        self.transition(DriverState::Terminated);
    }

    fn transition(&mut self, next: DriverState) {
        tracing::debug!(from = ?self.state, to = ?next, endpoint = %self.source.endpoint(), "driver state change");
        self.state = next;
    }
}

pub fn run(config: AppConfig, settings: MonitorSettings) -> Result<(), AppError> {
    let connection = &settings.connection;
    let log_dir = connection.log_dir.as_deref().unwrap_or(&config.log_dir);
    let audit = AuditLog::open(Path::new(log_dir).join(settings.kind.audit_file_name()))
        .map_err(AppError::audit_log)?;

    let stdout = std::io::stdout();
    let use_color = !connection.no_color && stdout.is_terminal();
    let sink = EventSink::new(
        settings.kind,
        audit,
        stdout,
        settings.criteria.clone(),
        Formatter::new(use_color),
        SystemClock,
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(AppError::runtime)?;

    let summary = match connection.replay.as_deref() {
        Some(path) => {
            let source = ReplaySource::from_file(path).map_err(AppError::transport)?;
            runtime.block_on(drive(source, sink, &settings))?
        }
        None => {
            let client_id = config.mqtt_client_id.clone().unwrap_or_else(|| {
                format!("{}-{}", settings.kind.client_id_prefix(), uuid::Uuid::new_v4())
            });
            let mqtt = MqttSettings {
                host: connection.host.clone().unwrap_or(config.mqtt_host.clone()),
                port: connection.port.unwrap_or(config.mqtt_port),
                keep_alive_secs: config.mqtt_keep_alive_secs,
                client_id,
            };
            runtime.block_on(drive(MqttSource::new(&mqtt), sink, &settings))?
        }
    };

    tracing::info!(
        received = summary.received,
        displayed = summary.displayed,
        filtered = summary.filtered,
        rejected = summary.rejected,
        failed = summary.failed,
        "monitor stopped"
    );

    Ok(())
}

async fn drive<S, W>(
    source: S,
    sink: EventSink<W, SystemClock>,
    settings: &MonitorSettings,
) -> Result<DriverSummary, AppError>
where
    S: MessageSource,
    W: Write,
{
    let mut driver =
        SubscriptionDriver::new(source, sink, settings.topics.clone(), settings.kind.title());

    let shutdown = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %error, "failed to listen for Ctrl+C; running until the source ends");
            std::future::pending::<()>().await;
        }
    };

    let result = driver.run(shutdown).await;
    driver.into_sink().close().map_err(AppError::runtime)?;

    result.map_err(|error| match error {
        DriverError::Sink(error) => AppError::runtime(error),
        other => AppError::transport(other),
    })
}
