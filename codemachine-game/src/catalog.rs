//! Task catalog: builds puzzle configurations and manual entries by task name.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::code::Code;
use crate::config::{ConfigError, PuzzleConfig};
use crate::manual::{ManualEntry, ManualError, ManualLedger};
use crate::solutions::{SolutionEntry, SolutionKind};
use crate::stimuli::TaskCodeSet;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unknown task: {task}")]
    UnknownTask { task: String },
    #[error("task {task} has a shape but no codes")]
    MissingCodes { task: String },
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Manual(#[from] ManualError),
}

/// The code shown for each solution kind of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCodes {
    pub compositional: Code,
    pub bespoke: Code,
}

impl TaskCodes {
    #[must_use]
    pub const fn code(&self, kind: SolutionKind) -> &Code {
        match kind {
            SolutionKind::Compositional => &self.compositional,
            SolutionKind::Bespoke => &self.bespoke,
        }
    }
}

/// Per-puzzle overrides applied on top of the catalog parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PuzzleOptions {
    /// Register only this kind's code instead of both.
    #[serde(default)]
    pub solution_kind: Option<SolutionKind>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub trial_id: Option<String>,
}

/// Shapes and codes for every task of an experiment, plus shared puzzle
/// parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCatalog {
    #[serde(default)]
    pub params: PuzzleConfig,
    pub shapes: BTreeMap<String, String>,
    pub codes: BTreeMap<String, TaskCodes>,
}

impl TaskCatalog {
    #[must_use]
    pub const fn new(
        params: PuzzleConfig,
        shapes: BTreeMap<String, String>,
        codes: BTreeMap<String, TaskCodes>,
    ) -> Self {
        Self {
            params,
            shapes,
            codes,
        }
    }

    /// Parse `{"params": {...}, "shapes": {...}, "codes": {...}}`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Parse`] for malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build a catalog from generated stimuli, showing the first bespoke code
    /// of each task. Tasks without a bespoke code are skipped.
    #[must_use]
    pub fn from_code_sets(
        params: PuzzleConfig,
        shapes: BTreeMap<String, String>,
        code_sets: &BTreeMap<String, TaskCodeSet>,
    ) -> Self {
        let codes = code_sets
            .iter()
            .filter_map(|(task, set)| {
                set.bespoke.first().map(|bespoke| {
                    (
                        task.clone(),
                        TaskCodes {
                            compositional: set.compositional.clone(),
                            bespoke: bespoke.clone(),
                        },
                    )
                })
            })
            .collect();
        Self::new(params, shapes, codes)
    }

    fn lookup(&self, task: &str) -> Result<(&String, &TaskCodes), CatalogError> {
        let shape = self
            .shapes
            .get(task)
            .ok_or_else(|| CatalogError::UnknownTask {
                task: task.to_string(),
            })?;
        let codes = self
            .codes
            .get(task)
            .ok_or_else(|| CatalogError::MissingCodes {
                task: task.to_string(),
            })?;
        Ok((shape, codes))
    }

    /// Configuration for one puzzle of `task`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownTask`] for tasks without a shape and
    /// [`CatalogError::Config`] when the resulting configuration is invalid.
    pub fn puzzle_config(
        &self,
        task: &str,
        options: &PuzzleOptions,
    ) -> Result<PuzzleConfig, CatalogError> {
        let (shape, codes) = self.lookup(task)?;
        let solutions = match options.solution_kind {
            Some(kind) => vec![SolutionEntry::new(codes.code(kind).clone(), kind)],
            None => vec![
                SolutionEntry::compositional(codes.compositional.clone()),
                SolutionEntry::bespoke(codes.bespoke.clone()),
            ],
        };
        let mut config = PuzzleConfig {
            solutions,
            task: Some(task.to_string()),
            block_string: Some(shape.clone()),
            ..self.params.clone()
        };
        if let Some(seed) = options.seed {
            config.seed = seed;
        }
        if let Some(trial_id) = &options.trial_id {
            config.trial_id = Some(trial_id.clone());
        }
        config.validate()?;
        Ok(config)
    }

    /// Manual entry describing `task` solved as `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownTask`] for tasks without a shape.
    pub fn manual_entry(&self, task: &str, kind: SolutionKind) -> Result<ManualEntry, CatalogError> {
        let (shape, codes) = self.lookup(task)?;
        Ok(ManualEntry {
            task: task.to_string(),
            block_string: shape.clone(),
            compositional: kind == SolutionKind::Compositional,
            code: codes.code(kind).clone(),
        })
    }

    /// Ledger pre-filled with the given `(task, kind)` examples.
    ///
    /// # Errors
    ///
    /// Returns the first lookup or manual error.
    pub fn build_manual<'a, I>(&self, pairs: I) -> Result<ManualLedger, CatalogError>
    where
        I: IntoIterator<Item = (&'a str, SolutionKind)>,
    {
        let mut ledger = ManualLedger::new();
        for (task, kind) in pairs {
            ledger.record(self.manual_entry(task, kind)?)?;
        }
        Ok(ledger)
    }

    /// Task names in sorted order.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.shapes.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "params": {"maxDigit": 3, "codeLength": 4, "nClickPartial": 5},
        "shapes": {"12": "11_\n_22", "21": "1__\n222"},
        "codes": {
            "12": {"compositional": "1312", "bespoke": "2231"},
            "21": {"compositional": "2113", "bespoke": "3322"}
        }
    }"#;

    #[test]
    fn puzzle_config_registers_both_kinds_by_default() {
        let catalog = TaskCatalog::from_json(CATALOG).unwrap();
        let cfg = catalog
            .puzzle_config("12", &PuzzleOptions::default())
            .unwrap();
        assert_eq!(cfg.max_digit, 3);
        assert_eq!(cfg.n_click_partial, 5);
        assert_eq!(cfg.task.as_deref(), Some("12"));
        assert_eq!(cfg.block_string.as_deref(), Some("11_\n_22"));
        assert_eq!(cfg.solutions.len(), 2);
    }

    #[test]
    fn solution_kind_restricts_registry() {
        let catalog = TaskCatalog::from_json(CATALOG).unwrap();
        let cfg = catalog
            .puzzle_config(
                "21",
                &PuzzleOptions {
                    solution_kind: Some(SolutionKind::Bespoke),
                    seed: Some(5),
                    trial_id: None,
                },
            )
            .unwrap();
        assert_eq!(
            cfg.solutions,
            vec![SolutionEntry::bespoke(Code::parse("3322").unwrap())]
        );
        assert_eq!(cfg.seed, 5);
    }

    #[test]
    fn unknown_task_is_an_error() {
        let catalog = TaskCatalog::from_json(CATALOG).unwrap();
        assert!(matches!(
            catalog.puzzle_config("99", &PuzzleOptions::default()),
            Err(CatalogError::UnknownTask { .. })
        ));
        assert!(matches!(
            catalog.manual_entry("99", SolutionKind::Bespoke),
            Err(CatalogError::UnknownTask { .. })
        ));
    }

    #[test]
    fn build_manual_dedupes_pairs() {
        let catalog = TaskCatalog::from_json(CATALOG).unwrap();
        let ledger = catalog
            .build_manual([
                ("12", SolutionKind::Compositional),
                ("21", SolutionKind::Bespoke),
                ("12", SolutionKind::Compositional),
            ])
            .unwrap();
        assert_eq!(ledger.len(), 2);
        let first = &ledger.entries()[0];
        assert!(first.compositional);
        assert_eq!(first.code, Code::parse("1312").unwrap());
        assert!(!ledger.entries()[1].compositional);
    }
}
