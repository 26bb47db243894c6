//! Stimulus generation: per-task code sets and block-string shapes.
//!
//! Tasks are named by two digits `"ij"`: the compositional code of task `ij`
//! is left part `i` followed by right part `j`. Every task also receives
//! bespoke codes that are unused anywhere else and share neither half with
//! the task's compositional code.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

use crate::code::{Code, CodeError, MAX_DIAL_DIGIT};
use crate::solutions::SolutionEntry;

/// Enumerating more candidate codes than this is refused.
pub const MAX_ENUMERATED_CODES: usize = 1 << 20;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StimulusError {
    #[error("invalid generator settings: {detail}")]
    Settings { detail: String },
    #[error("{codes} candidate codes exceed the enumeration limit")]
    SpaceTooLarge { codes: u128 },
    #[error("need {needed} distinct half codes, only {available} exist")]
    NotEnoughHalves { needed: usize, available: usize },
    #[error("no unused bespoke code left for task {task}")]
    NoBespokeCode { task: String },
    #[error("expected {expected} tasks, got {actual}")]
    TaskCount { expected: usize, actual: usize },
    #[error("task name {task:?} is out of range")]
    InvalidTask { task: String },
    #[error("task {task} has {actual} solutions, expected {expected}")]
    SolutionCount {
        task: String,
        expected: usize,
        actual: usize,
    },
    #[error("code {code} is malformed: {source}")]
    InvalidCode {
        code: Code,
        #[source]
        source: CodeError,
    },
    #[error("code {code} is used more than once")]
    DuplicateCode { code: Code },
    #[error("bespoke code {code} of task {task} shares a half with its compositional code")]
    BespokeSharesHalf { task: String, code: Code },
    #[error("shapes have different lengths ({left} and {right})")]
    ShapeLength { left: usize, right: usize },
    #[error("left and right parts overlap at cell {index}")]
    ShapeConflict { index: usize },
    #[error("rows are misaligned at cell {index}")]
    MisalignedRows { index: usize },
    #[error("unexpected cells {left:?}/{right:?} at {index}")]
    UnexpectedCell { index: usize, left: char, right: char },
}

/// Every solution of one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCodeSet {
    pub compositional: Code,
    pub bespoke: Vec<Code>,
}

impl TaskCodeSet {
    /// Registry entries, compositional first.
    #[must_use]
    pub fn entries(&self) -> Vec<SolutionEntry> {
        std::iter::once(SolutionEntry::compositional(self.compositional.clone()))
            .chain(self.bespoke.iter().cloned().map(SolutionEntry::bespoke))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.bespoke.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Builds the task-to-codes mapping for one experiment configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCodeGenerator {
    pub max_digit: u8,
    pub code_length: usize,
    /// Number of left parts (and of right parts); yields `n_part^2` tasks.
    pub n_part: usize,
    /// Compositional plus bespoke codes per task.
    pub solutions_per_task: usize,
}

impl Default for TaskCodeGenerator {
    fn default() -> Self {
        Self {
            max_digit: 6,
            code_length: 4,
            n_part: 4,
            solutions_per_task: 20,
        }
    }
}

impl TaskCodeGenerator {
    fn half_len(&self) -> usize {
        self.code_length / 2
    }

    /// Task names `"11"` through `"NN"`.
    #[must_use]
    pub fn task_names(&self) -> Vec<String> {
        (1..=self.n_part)
            .flat_map(|i| (1..=self.n_part).map(move |j| format!("{i}{j}")))
            .collect()
    }

    fn check_settings(&self) -> Result<(), StimulusError> {
        let detail = if self.code_length == 0 || self.code_length % 2 != 0 {
            "code_length must be a positive even number"
        } else if !(1..=MAX_DIAL_DIGIT).contains(&self.max_digit) {
            "max_digit must be within 1..=9"
        } else if !(1..=9).contains(&self.n_part) {
            "n_part must be within 1..=9"
        } else if self.solutions_per_task == 0 {
            "solutions_per_task must be positive"
        } else {
            return Ok(());
        };
        Err(StimulusError::Settings {
            detail: detail.to_string(),
        })
    }

    /// Generate a fresh mapping and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`StimulusError`] when the settings are invalid or the code
    /// space is too small for the requested number of tasks and solutions.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<BTreeMap<String, TaskCodeSet>, StimulusError> {
        self.check_settings()?;
        let mut full_codes = all_codes(self.max_digit, self.code_length)?;
        full_codes.shuffle(rng);
        let mut halves = all_codes(self.max_digit, self.half_len())?;
        halves.shuffle(rng);

        let needed = 2 * self.n_part;
        if halves.len() < needed {
            return Err(StimulusError::NotEnoughHalves {
                needed,
                available: halves.len(),
            });
        }
        let (left_parts, rest) = halves.split_at(self.n_part);
        let right_parts = &rest[..self.n_part];

        let compositional: BTreeMap<String, Code> = left_parts
            .iter()
            .enumerate()
            .flat_map(|(i, left)| {
                right_parts
                    .iter()
                    .enumerate()
                    .map(move |(j, right)| (format!("{}{}", i + 1, j + 1), Code::splice(left, right)))
            })
            .collect();
        let mut used: HashSet<Code> = compositional.values().cloned().collect();

        let half = self.half_len();
        let mut mapping = BTreeMap::new();
        for (task, comp) in compositional {
            let mut bespoke = Vec::with_capacity(self.solutions_per_task - 1);
            for _ in 1..self.solutions_per_task {
                let code = full_codes
                    .iter()
                    .find(|code| {
                        !used.contains(*code)
                            && code.prefix(half) != comp.prefix(half)
                            && code.suffix(half) != comp.suffix(half)
                    })
                    .cloned()
                    .ok_or_else(|| StimulusError::NoBespokeCode { task: task.clone() })?;
                used.insert(code.clone());
                bespoke.push(code);
            }
            mapping.insert(
                task,
                TaskCodeSet {
                    compositional: comp,
                    bespoke,
                },
            );
        }

        self.validate(&mapping)?;
        Ok(mapping)
    }

    /// Check a mapping against the generator's invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self, mapping: &BTreeMap<String, TaskCodeSet>) -> Result<(), StimulusError> {
        let expected_tasks = self.n_part * self.n_part;
        if mapping.len() != expected_tasks {
            return Err(StimulusError::TaskCount {
                expected: expected_tasks,
                actual: mapping.len(),
            });
        }

        let valid_part = |c: char| {
            c.to_digit(10)
                .and_then(|d| usize::try_from(d).ok())
                .is_some_and(|d| (1..=self.n_part).contains(&d))
        };
        let half = self.half_len();
        let mut seen: HashSet<&Code> = HashSet::new();
        for (task, set) in mapping {
            if task.chars().count() != 2 || !task.chars().all(valid_part) {
                return Err(StimulusError::InvalidTask { task: task.clone() });
            }
            if set.len() != self.solutions_per_task {
                return Err(StimulusError::SolutionCount {
                    task: task.clone(),
                    expected: self.solutions_per_task,
                    actual: set.len(),
                });
            }
            for code in std::iter::once(&set.compositional).chain(&set.bespoke) {
                code.validate(self.code_length, self.max_digit)
                    .map_err(|source| StimulusError::InvalidCode {
                        code: code.clone(),
                        source,
                    })?;
                if !seen.insert(code) {
                    return Err(StimulusError::DuplicateCode { code: code.clone() });
                }
            }
            let comp = &set.compositional;
            if let Some(code) = set.bespoke.iter().find(|code| {
                code.prefix(half) == comp.prefix(half) || code.suffix(half) == comp.suffix(half)
            }) {
                return Err(StimulusError::BespokeSharesHalf {
                    task: task.clone(),
                    code: code.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Every code of `len` digits over `[1, max_digit]`, in lexicographic order.
fn all_codes(max_digit: u8, len: usize) -> Result<Vec<Code>, StimulusError> {
    let base = usize::from(max_digit.max(1));
    let total = u32::try_from(len)
        .ok()
        .and_then(|exp| base.checked_pow(exp))
        .filter(|total| *total <= MAX_ENUMERATED_CODES)
        .ok_or(StimulusError::SpaceTooLarge {
            codes: u128::from(max_digit).saturating_pow(u32::try_from(len).unwrap_or(u32::MAX)),
        })?;

    Ok((0..total)
        .map(|mut index| {
            let mut digits = vec![0u8; len];
            for slot in digits.iter_mut().rev() {
                // index % base < 10 because max_digit <= 9
                *slot = u8::try_from(index % base).unwrap_or(0) + 1;
                index /= base;
            }
            Code::from_digits(digits)
        })
        .collect())
}

/// Overlay a left-part shape (`1` cells) and a right-part shape (`2` cells).
///
/// # Errors
///
/// Returns an error when the shapes differ in length, overlap, or have rows
/// that do not line up.
pub fn compose_block_strings(left: &str, right: &str) -> Result<String, StimulusError> {
    let (left_len, right_len) = (left.chars().count(), right.chars().count());
    if left_len != right_len {
        return Err(StimulusError::ShapeLength {
            left: left_len,
            right: right_len,
        });
    }
    left.chars()
        .zip(right.chars())
        .enumerate()
        .map(|(index, cells)| match cells {
            ('\n', '\n') => Ok('\n'),
            ('\n', _) | (_, '\n') => Err(StimulusError::MisalignedRows { index }),
            ('1', '2') => Err(StimulusError::ShapeConflict { index }),
            ('1', '_') => Ok('1'),
            ('_', '2') => Ok('2'),
            ('_', '_') => Ok('_'),
            (left, right) => Err(StimulusError::UnexpectedCell { index, left, right }),
        })
        .collect()
}

/// Repaint both parts of a composed shape as one undivided block (`3`).
#[must_use]
pub fn make_bespoke(block_string: &str) -> String {
    block_string.replace(['1', '2'], "3")
}
