//! Fire-and-forget usage events. Sinks must never fail the caller.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Debug;
use tokio::sync::mpsc;
use tracing::info;

pub const QUIZ_START: &str = "quiz_start";
pub const ANSWER_SUBMITTED: &str = "answer_submitted";
pub const QUIZ_COMPLETE: &str = "quiz_complete";
pub const QUIZ_RESTART: &str = "quiz_restart";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsEvent {
    pub name: &'static str,
    pub params: BTreeMap<&'static str, Value>,
    pub at: DateTime<Utc>,
}

impl AnalyticsEvent {
    pub fn new(name: &'static str) -> Self {
        Self { name, params: BTreeMap::new(), at: Utc::now() }
    }

    #[must_use]
    pub fn with(mut self, key: &'static str, value: impl Into<Value>) -> Self {
        self.params.insert(key, value.into());
        self
    }

    pub fn quiz_start() -> Self {
        Self::new(QUIZ_START)
    }

    pub fn answer_submitted(question_index: usize, correct: bool) -> Self {
        Self::new(ANSWER_SUBMITTED)
            .with("question_index", question_index)
            .with("correct", correct)
    }

    pub fn quiz_complete(score: usize, total: usize) -> Self {
        Self::new(QUIZ_COMPLETE).with("score", score).with("total", total)
    }

    pub fn quiz_restart() -> Self {
        Self::new(QUIZ_RESTART)
    }
}

pub trait AnalyticsSink: Send + Sync + Debug {
    fn track(&self, event: AnalyticsEvent);
}

/// Emits each event as a structured log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl AnalyticsSink for TracingSink {
    fn track(&self, event: AnalyticsEvent) {
        let params = serde_json::to_string(&event.params).unwrap_or_default();
        info!(target: "flag_quiz::analytics", event = event.name, %params, at = %event.at, "analytics event");
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl AnalyticsSink for NoopSink {
    fn track(&self, _event: AnalyticsEvent) {}
}

/// Forwards events to a channel. A dropped receiver silently discards them.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<AnalyticsEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AnalyticsEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl AnalyticsSink for ChannelSink {
    fn track(&self, event: AnalyticsEvent) {
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn answer_payload_is_flat() {
        let event = AnalyticsEvent::answer_submitted(2, true);
        assert_eq!(event.name, "answer_submitted");
        assert_eq!(event.params.get("question_index"), Some(&json!(2)));
        assert_eq!(event.params.get("correct"), Some(&json!(true)));
    }

    #[test]
    fn closed_channel_is_ignored() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.track(AnalyticsEvent::quiz_complete(3, 7));
    }

    #[tokio::test]
    async fn channel_delivers_in_order() {
        let (sink, mut rx) = ChannelSink::new();
        sink.track(AnalyticsEvent::quiz_start());
        sink.track(AnalyticsEvent::quiz_restart());
        assert_eq!(rx.recv().await.map(|e| e.name), Some(QUIZ_START));
        assert_eq!(rx.recv().await.map(|e| e.name), Some(QUIZ_RESTART));
    }
}
