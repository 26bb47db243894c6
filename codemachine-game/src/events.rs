//! Structured puzzle events and the sinks that receive them.
//!
//! Every interaction with a puzzle instance is reported as a [`PuzzleEvent`]
//! carrying the instance's trial id. Hosts choose where the transcript goes by
//! handing the instance an [`EventSink`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

pub const EVENT_INITIALIZE: &str = "machine.initialize";
pub const EVENT_RUN: &str = "machine.run";
pub const EVENT_ENTER: &str = "machine.enter";
pub const EVENT_UNDO_PARTIAL: &str = "machine.undo-partial";
pub const EVENT_MANUAL_UPDATE: &str = "machine.manual.update";
pub const EVENT_NEXT_CODE_FAILURE: &str = "machine.WARNING.getNextCode.failure";
pub const EVENT_DONE: &str = "machine.done";
pub const EVENT_FATAL: &str = "machine.fatal";

/// `machine.select.<dial>`
#[must_use]
pub fn select_event(index: usize) -> String {
    format!("machine.select.{index}")
}

/// `machine.button.<kind>`
#[must_use]
pub fn button_event(kind: impl std::fmt::Display) -> String {
    format!("machine.button.{kind}")
}

/// `machine.solution.<state>`
#[must_use]
pub fn solution_event(state: impl std::fmt::Display) -> String {
    format!("machine.solution.{state}")
}

/// Severity tier for a puzzle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventSeverity {
    #[default]
    Info,
    Warning,
    Critical,
}

/// One entry in a puzzle transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PuzzleEvent {
    /// Zero-based position within the instance's transcript.
    pub seq: u32,
    pub trial_id: String,
    pub name: String,
    #[serde(default)]
    pub severity: EventSeverity,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
}

impl PuzzleEvent {
    #[must_use]
    pub fn new(seq: u32, trial_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            seq,
            trial_id: trial_id.into(),
            name: name.into(),
            severity: EventSeverity::Info,
            payload: Value::Null,
        }
    }

    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    #[must_use]
    pub const fn with_severity(mut self, severity: EventSeverity) -> Self {
        self.severity = severity;
        self
    }
}

/// Destination for puzzle events.
pub trait EventSink {
    fn log_event(&mut self, event: &PuzzleEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn log_event(&mut self, _event: &PuzzleEvent) {}
}

/// Keeps the transcript in memory. Clones share the same buffer, so a caller
/// can keep one handle and give the other to the puzzle.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Rc<RefCell<Vec<PuzzleEvent>>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<PuzzleEvent> {
        self.events.borrow().clone()
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.events.borrow().iter().map(|e| e.name.clone()).collect()
    }

    #[must_use]
    pub fn count(&self, name: &str) -> usize {
        self.events.borrow().iter().filter(|e| e.name == name).count()
    }

    #[must_use]
    pub fn last(&self) -> Option<PuzzleEvent> {
        self.events.borrow().last().cloned()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl EventSink for RecordingSink {
    fn log_event(&mut self, event: &PuzzleEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// Forwards events to the `log` facade under the `codemachine::events` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn log_event(&mut self, event: &PuzzleEvent) {
        let level = match event.severity {
            EventSeverity::Info => log::Level::Debug,
            EventSeverity::Warning => log::Level::Warn,
            EventSeverity::Critical => log::Level::Error,
        };
        log::log!(
            target: "codemachine::events",
            level,
            "[{}#{}] {} {}",
            event.trial_id,
            event.seq,
            event.name,
            event.payload
        );
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn log_event(&mut self, event: &PuzzleEvent) {
        (**self).log_event(event);
    }
}
