//! Player-visible manual of discovered solutions.
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

use crate::code::Code;

/// Manual shared by every puzzle instance in one session.
pub type SharedManual = Rc<RefCell<ManualLedger>>;

/// One solved example shown in the manual.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualEntry {
    pub task: String,
    pub block_string: String,
    pub compositional: bool,
    pub code: Code,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ManualError {
    #[error("manual entry for task {task} has an empty block string")]
    BlankBlockString { task: String },
}

/// Append-only ledger deduplicated on `(task, compositional)`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManualLedger {
    entries: Vec<ManualEntry>,
}

impl ManualLedger {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Wrap the ledger for sharing across puzzle instances.
    #[must_use]
    pub fn into_shared(self) -> SharedManual {
        Rc::new(RefCell::new(self))
    }

    /// Record an entry unless its `(task, compositional)` key is already present.
    /// Returns whether the entry was added.
    ///
    /// # Errors
    ///
    /// Returns [`ManualError::BlankBlockString`] for entries without a shape.
    pub fn record(&mut self, entry: ManualEntry) -> Result<bool, ManualError> {
        if entry.block_string.trim().is_empty() {
            return Err(ManualError::BlankBlockString { task: entry.task });
        }
        if self.contains(&entry.task, entry.compositional) {
            return Ok(false);
        }
        self.entries.push(entry);
        Ok(true)
    }

    #[must_use]
    pub fn contains(&self, task: &str, compositional: bool) -> bool {
        self.entries
            .iter()
            .any(|e| e.task == task && e.compositional == compositional)
    }

    #[must_use]
    pub fn entries(&self) -> &[ManualEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(task: &str, compositional: bool, code: &str) -> ManualEntry {
        ManualEntry {
            task: task.to_string(),
            block_string: "11_22".to_string(),
            compositional,
            code: Code::parse(code).unwrap(),
        }
    }

    #[test]
    fn first_entry_per_key_wins() {
        let mut ledger = ManualLedger::new();
        assert!(ledger.record(entry("12", true, "1112")).unwrap());
        assert!(!ledger.record(entry("12", true, "2212")).unwrap());
        assert!(ledger.record(entry("12", false, "1121")).unwrap());
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.entries()[0].code, Code::parse("1112").unwrap());
    }

    #[test]
    fn blank_shape_is_rejected() {
        let mut ledger = ManualLedger::new();
        let mut bad = entry("21", false, "2211");
        bad.block_string = "  \n ".to_string();
        assert_eq!(
            ledger.record(bad),
            Err(ManualError::BlankBlockString {
                task: "21".to_string()
            })
        );
        assert!(ledger.is_empty());
    }

    #[test]
    fn serializes_with_experiment_field_names() {
        let mut ledger = ManualLedger::new();
        ledger.record(entry("11", true, "1212")).unwrap();
        let json = serde_json::to_value(&ledger).unwrap();
        assert_eq!(json[0]["blockString"], "11_22");
        assert_eq!(json[0]["code"], "1212");
    }

    #[test]
    fn shared_ledger_is_visible_to_all_holders() {
        let shared = ManualLedger::new().into_shared();
        let other = Rc::clone(&shared);
        shared.borrow_mut().record(entry("33", true, "3311")).unwrap();
        assert!(other.borrow().contains("33", true));
    }
}
