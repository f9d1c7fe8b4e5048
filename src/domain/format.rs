use owo_colors::{AnsiColors, OwoColorize};
use serde_json::Value;

use crate::domain::models::{
    AlarmLevel, AlarmRecord, AlarmStatus, Details, EventRecord, EventTime, LogLevel, LogRecord,
    MISSING_MESSAGE, MISSING_VALUE, TemperatureBatch, UNKNOWN_SOURCE,
};

const RULE_WIDTH: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Yellow,
    Green,
    Cyan,
    Blue,
    Magenta,
    White,
}

impl Color {
    fn ansi(self) -> AnsiColors {
        match self {
            Self::Red => AnsiColors::Red,
            Self::Yellow => AnsiColors::Yellow,
            Self::Green => AnsiColors::Green,
            Self::Cyan => AnsiColors::Cyan,
            Self::Blue => AnsiColors::Blue,
            Self::Magenta => AnsiColors::Magenta,
            Self::White => AnsiColors::White,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub color: Option<Color>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayLine {
    pub spans: Vec<Span>,
}

impl DisplayLine {
    fn blank() -> Self {
        Self::default()
    }

    fn plain(text: impl Into<String>) -> Self {
        Self::default().with(text, None)
    }

    fn colored(text: impl Into<String>, color: Color) -> Self {
        Self::default().with(text, Some(color))
    }

    fn labeled(label: &str, value: impl Into<String>, color: Color) -> Self {
        Self::plain(format!("{label}: ")).with(value, Some(color))
    }

    fn rule(fill: char) -> Self {
        Self::plain(fill.to_string().repeat(RULE_WIDTH))
    }

    fn with(mut self, text: impl Into<String>, color: Option<Color>) -> Self {
        self.spans.push(Span {
            text: text.into(),
            color,
        });
        self
    }

    /// The line without any color codes.
    pub fn text(&self) -> String {
        self.spans.iter().map(|span| span.text.as_str()).collect()
    }

    /// Color of the span following `label: `, if the line has one.
    pub fn value_color(&self, label: &str) -> Option<Color> {
        let prefix = format!("{label}: ");
        match self.spans.as_slice() {
            [first, value, ..] if first.text == prefix => value.color,
            _ => None,
        }
    }
}

pub fn alarm_level_color(level: &AlarmLevel) -> Color {
    match level {
        AlarmLevel::Critical | AlarmLevel::High => Color::Red,
        AlarmLevel::Medium => Color::Yellow,
        AlarmLevel::Low => Color::Green,
        AlarmLevel::Info => Color::Cyan,
        AlarmLevel::Other(_) => Color::White,
    }
}

pub fn alarm_status_color(status: &AlarmStatus) -> Color {
    match status {
        AlarmStatus::Active => Color::Red,
        AlarmStatus::Acknowledged => Color::Yellow,
        AlarmStatus::Cleared | AlarmStatus::Other(_) => Color::Green,
    }
}

pub fn log_level_color(level: &LogLevel) -> Color {
    match level {
        LogLevel::Error => Color::Red,
        LogLevel::Warning => Color::Yellow,
        LogLevel::Info => Color::Green,
        LogLevel::Debug => Color::Cyan,
        LogLevel::Other(_) => Color::White,
    }
}

/// Bands in degrees Celsius: below 10 or above 70 is critical, above 60 hot, above 40 warm.
pub fn temperature_color(value: f64) -> Color {
    if value < 10.0 || value > 70.0 {
        Color::Red
    } else if value > 60.0 {
        Color::Yellow
    } else if value > 40.0 {
        Color::Green
    } else {
        Color::Cyan
    }
}

pub fn sensor_status_color(status: &str) -> Color {
    if status == "Good" {
        Color::Green
    } else {
        Color::Red
    }
}

/// Renders records and notices for the console.
#[derive(Debug, Clone, Copy)]
pub struct Formatter {
    use_color: bool,
}

impl Formatter {
    pub fn new(use_color: bool) -> Self {
        Self { use_color }
    }

    pub fn render(&self, record: &EventRecord) -> Vec<DisplayLine> {
        match record {
            EventRecord::Alarm(alarm) => render_alarm(alarm),
            EventRecord::Log(log) => render_log(log),
            EventRecord::Temperature(batch) => render_temperature(batch),
        }
    }

    pub fn format(&self, record: &EventRecord) -> String {
        self.paint(&self.render(record))
    }

    pub fn notice(&self, text: &str, color: Color) -> String {
        let mut painted = self.paint_span(&Span {
            text: text.to_string(),
            color: Some(color),
        });
        painted.push('\n');
        painted
    }

    pub fn paint(&self, lines: &[DisplayLine]) -> String {
        let mut output = String::new();
        for line in lines {
            for span in &line.spans {
                output.push_str(&self.paint_span(span));
            }
            output.push('\n');
        }
        output
    }

    fn paint_span(&self, span: &Span) -> String {
        match span.color {
            Some(color) if self.use_color => span.text.color(color.ansi()).to_string(),
            _ => span.text.clone(),
        }
    }
}

fn render_alarm(alarm: &AlarmRecord) -> Vec<DisplayLine> {
    let level = alarm.level.as_ref().unwrap_or(&AlarmLevel::Info);
    let mut lines = vec![
        DisplayLine::blank(),
        DisplayLine::rule('='),
        DisplayLine::labeled(
            "Alarm ID",
            alarm.alarm_id.as_deref().unwrap_or(MISSING_VALUE),
            Color::Yellow,
        ),
        timestamp_line("Timestamp", alarm.timestamp.as_ref()),
        DisplayLine::labeled("Level", level.as_str(), alarm_level_color(level)),
        DisplayLine::labeled(
            "Status",
            alarm.status.as_str(),
            alarm_status_color(&alarm.status),
        ),
        source_line(alarm.source.as_deref()),
        DisplayLine::rule('-'),
        message_line(alarm.message.as_deref()),
    ];

    push_details(&mut lines, alarm.details.as_ref());

    if let Some(ack) = &alarm.acknowledgement {
        lines.push(DisplayLine::blank());
        lines.push(DisplayLine::plain(format!("Acknowledged by: {}", ack.by)));
        lines.push(timestamp_line("Acknowledged at", ack.at.as_ref()));
    }

    lines.push(DisplayLine::rule('='));
    lines
}

fn render_log(log: &LogRecord) -> Vec<DisplayLine> {
    let level = log.level.as_ref().unwrap_or(&LogLevel::Info);
    let mut lines = vec![
        DisplayLine::blank(),
        DisplayLine::rule('='),
        DisplayLine::labeled("Topic", log.topic.as_str(), Color::Yellow),
        timestamp_line("Timestamp", log.timestamp.as_ref()),
        DisplayLine::labeled("Level", level.as_str(), log_level_color(level)),
        source_line(log.source.as_deref()),
        DisplayLine::rule('-'),
        message_line(log.message.as_deref()),
    ];

    push_details(&mut lines, log.details.as_ref());

    lines.push(DisplayLine::rule('='));
    lines
}

fn render_temperature(batch: &TemperatureBatch) -> Vec<DisplayLine> {
    let timestamp = batch
        .batch_timestamp
        .as_ref()
        .map_or(MISSING_VALUE, |time| time.raw.as_str());

    let mut lines = vec![
        DisplayLine::blank(),
        DisplayLine::colored(
            format!(
                "MCU: {}",
                batch.device_id.as_deref().unwrap_or(UNKNOWN_SOURCE)
            ),
            Color::Yellow,
        ),
        DisplayLine::colored(format!("Timestamp: {timestamp}"), Color::Yellow),
        DisplayLine::colored(
            format!("Number of Sensors: {}", batch.sensor_count),
            Color::Yellow,
        ),
        DisplayLine::blank(),
        DisplayLine::plain("Sensor Readings:"),
        DisplayLine::rule('-'),
        DisplayLine::plain(format!(
            "{:<10} {:<20} {:<15} {}",
            "Sensor ID", "Read At", "Temperature", "Status"
        )),
        DisplayLine::rule('-'),
    ];

    for reading in &batch.readings {
        let temperature = format!("{:.2}°C", reading.value);
        lines.push(
            DisplayLine::plain(format!(
                "{:<10} {:<20} ",
                reading.sensor_id,
                reading.read_at.as_deref().unwrap_or(MISSING_VALUE)
            ))
            .with(
                format!("{temperature:<15}"),
                Some(temperature_color(reading.value)),
            )
            .with(" ", None)
            .with(
                reading.status.as_str(),
                Some(sensor_status_color(&reading.status)),
            ),
        );
    }

    lines.push(DisplayLine::rule('-'));
    lines
}

fn timestamp_line(label: &str, time: Option<&EventTime>) -> DisplayLine {
    DisplayLine::labeled(
        label,
        time.map_or(MISSING_VALUE, |time| time.raw.as_str()),
        Color::Blue,
    )
}

fn source_line(source: Option<&str>) -> DisplayLine {
    DisplayLine::labeled("Source", source.unwrap_or(UNKNOWN_SOURCE), Color::Magenta)
}

fn message_line(message: Option<&str>) -> DisplayLine {
    DisplayLine::plain(format!("Message: {}", message.unwrap_or(MISSING_MESSAGE)))
}

fn push_details(lines: &mut Vec<DisplayLine>, details: Option<&Details>) {
    let Some(details) = details else {
        return;
    };

    lines.push(DisplayLine::blank());
    lines.push(DisplayLine::plain("Details:"));
    for (key, value) in details {
        lines.push(DisplayLine::plain(format!("  {key}: {}", display_value(value))));
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
