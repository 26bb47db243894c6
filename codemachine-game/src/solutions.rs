//! Solution registry and live classification of dial codes.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::code::Code;

/// How a registered full code solves the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolutionKind {
    /// A standalone code with no half structure.
    Bespoke,
    /// A code whose halves are independently discoverable.
    Compositional,
}

impl SolutionKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bespoke => "bespoke",
            Self::Compositional => "compositional",
        }
    }
}

impl fmt::Display for SolutionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SolutionKind {
    type Err = UnknownSolutionKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bespoke" => Ok(Self::Bespoke),
            "compositional" => Ok(Self::Compositional),
            _ => Err(UnknownSolutionKind {
                label: s.to_string(),
            }),
        }
    }
}

/// Label that names no solution kind.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown solution kind {label:?}")]
pub struct UnknownSolutionKind {
    pub label: String,
}

/// Live classification of the code currently on the dials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SolutionState {
    #[default]
    None,
    Left,
    Right,
    Compositional,
    Bespoke,
}

impl SolutionState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Left => "left",
            Self::Right => "right",
            Self::Compositional => "compositional",
            Self::Bespoke => "bespoke",
        }
    }

    /// Whether reaching this state solves the puzzle.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Compositional | Self::Bespoke)
    }

    /// The solution kind a terminal state corresponds to.
    #[must_use]
    pub const fn solution_kind(self) -> Option<SolutionKind> {
        match self {
            Self::Compositional => Some(SolutionKind::Compositional),
            Self::Bespoke => Some(SolutionKind::Bespoke),
            Self::None | Self::Left | Self::Right => None,
        }
    }
}

impl fmt::Display for SolutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<SolutionKind> for SolutionState {
    fn from(kind: SolutionKind) -> Self {
        match kind {
            SolutionKind::Bespoke => Self::Bespoke,
            SolutionKind::Compositional => Self::Compositional,
        }
    }
}

/// One registered full-code solution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SolutionEntry {
    pub code: Code,
    pub kind: SolutionKind,
}

impl SolutionEntry {
    #[must_use]
    pub const fn new(code: Code, kind: SolutionKind) -> Self {
        Self { code, kind }
    }

    #[must_use]
    pub const fn bespoke(code: Code) -> Self {
        Self::new(code, SolutionKind::Bespoke)
    }

    #[must_use]
    pub const fn compositional(code: Code) -> Self {
        Self::new(code, SolutionKind::Compositional)
    }
}

/// Errors raised when a solution set cannot form a registry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("more than one compositional solution ({first} and {second})")]
    MultipleCompositional { first: Code, second: Code },
    #[error("solution {code} is registered twice")]
    DuplicateCode { code: Code },
    #[error("solution {code} has {actual} digits, machine has {expected} dials")]
    WrongLength {
        code: Code,
        expected: usize,
        actual: usize,
    },
}

/// Fixed set of solutions for one puzzle instance.
///
/// The compositional entry (if any) is split into a left and right half of
/// `code_length / 2` digits each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionRegistry {
    code_length: usize,
    bespoke: Vec<Code>,
    compositional: Option<Code>,
    left_half: Option<Code>,
    right_half: Option<Code>,
}

impl SolutionRegistry {
    /// Build a registry for a machine with `code_length` dials.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if a code has the wrong length, a code is
    /// registered twice, or more than one compositional entry is present.
    pub fn new(code_length: usize, entries: &[SolutionEntry]) -> Result<Self, RegistryError> {
        let mut bespoke: Vec<Code> = Vec::new();
        let mut compositional: Option<Code> = None;

        for entry in entries {
            if entry.code.len() != code_length {
                return Err(RegistryError::WrongLength {
                    code: entry.code.clone(),
                    expected: code_length,
                    actual: entry.code.len(),
                });
            }
            let seen =
                bespoke.contains(&entry.code) || compositional.as_ref() == Some(&entry.code);
            if seen {
                return Err(RegistryError::DuplicateCode {
                    code: entry.code.clone(),
                });
            }
            match entry.kind {
                SolutionKind::Bespoke => bespoke.push(entry.code.clone()),
                SolutionKind::Compositional => {
                    if let Some(first) = &compositional {
                        return Err(RegistryError::MultipleCompositional {
                            first: first.clone(),
                            second: entry.code.clone(),
                        });
                    }
                    compositional = Some(entry.code.clone());
                }
            }
        }

        let split = code_length / 2;
        let left_half = compositional.as_ref().map(|code| code.prefix(split));
        let right_half = compositional.as_ref().map(|code| code.suffix(split));
        Ok(Self {
            code_length,
            bespoke,
            compositional,
            left_half,
            right_half,
        })
    }

    /// Classify a code. Full matches win over half matches.
    #[must_use]
    pub fn classify(&self, code: &Code) -> SolutionState {
        if self.bespoke.contains(code) {
            return SolutionState::Bespoke;
        }
        if self.compositional.as_ref() == Some(code) {
            return SolutionState::Compositional;
        }
        if self.left_half.as_ref().is_some_and(|half| code.starts_with(half)) {
            return SolutionState::Left;
        }
        if self.right_half.as_ref().is_some_and(|half| code.ends_with(half)) {
            return SolutionState::Right;
        }
        SolutionState::None
    }

    #[must_use]
    pub const fn code_length(&self) -> usize {
        self.code_length
    }

    /// Digits in each half of the compositional solution.
    #[must_use]
    pub const fn half_len(&self) -> usize {
        self.code_length / 2
    }

    #[must_use]
    pub fn bespoke_codes(&self) -> &[Code] {
        &self.bespoke
    }

    #[must_use]
    pub const fn compositional_code(&self) -> Option<&Code> {
        self.compositional.as_ref()
    }

    #[must_use]
    pub const fn left_half(&self) -> Option<&Code> {
        self.left_half.as_ref()
    }

    #[must_use]
    pub const fn right_half(&self) -> Option<&Code> {
        self.right_half.as_ref()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bespoke.is_empty() && self.compositional.is_none()
    }

    /// Every registered solution, compositional first.
    #[must_use]
    pub fn entries(&self) -> Vec<SolutionEntry> {
        self.compositional
            .iter()
            .cloned()
            .map(SolutionEntry::compositional)
            .chain(self.bespoke.iter().cloned().map(SolutionEntry::bespoke))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> Code {
        Code::parse(s).unwrap()
    }

    fn registry() -> SolutionRegistry {
        SolutionRegistry::new(
            4,
            &[
                SolutionEntry::compositional(code("1112")),
                SolutionEntry::bespoke(code("1121")),
            ],
        )
        .unwrap()
    }

    #[test]
    fn derives_halves_from_compositional_entry() {
        let reg = registry();
        assert_eq!(reg.left_half(), Some(&code("11")));
        assert_eq!(reg.right_half(), Some(&code("12")));
        assert_eq!(reg.half_len(), 2);
    }

    #[test]
    fn classify_prefers_full_matches() {
        let reg = registry();
        // 1121 starts with the left half but is a bespoke solution.
        assert_eq!(reg.classify(&code("1121")), SolutionState::Bespoke);
        assert_eq!(reg.classify(&code("1112")), SolutionState::Compositional);
        assert_eq!(reg.classify(&code("1122")), SolutionState::Left);
        assert_eq!(reg.classify(&code("2212")), SolutionState::Right);
        assert_eq!(reg.classify(&code("2221")), SolutionState::None);
    }

    #[test]
    fn solution_kind_parses_labels() {
        assert_eq!("bespoke".parse::<SolutionKind>(), Ok(SolutionKind::Bespoke));
        assert_eq!(
            "compositional".parse::<SolutionKind>(),
            Ok(SolutionKind::Compositional)
        );
        assert_eq!(
            "Bespoke".parse::<SolutionKind>(),
            Err(UnknownSolutionKind {
                label: "Bespoke".to_string()
            })
        );
    }

    #[test]
    fn classify_is_pure() {
        let reg = registry();
        let snapshot = reg.clone();
        for raw in ["1111", "1112", "1121", "2212", "2222"] {
            let c = code(raw);
            assert_eq!(reg.classify(&c), reg.classify(&c));
        }
        assert_eq!(reg, snapshot);
    }

    #[test]
    fn rejects_second_compositional_entry() {
        let err = SolutionRegistry::new(
            4,
            &[
                SolutionEntry::compositional(code("1112")),
                SolutionEntry::compositional(code("2221")),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, RegistryError::MultipleCompositional { .. }));
    }

    #[test]
    fn rejects_duplicates_and_wrong_lengths() {
        assert!(matches!(
            SolutionRegistry::new(
                4,
                &[
                    SolutionEntry::bespoke(code("1121")),
                    SolutionEntry::compositional(code("1121")),
                ],
            ),
            Err(RegistryError::DuplicateCode { .. })
        ));
        assert!(matches!(
            SolutionRegistry::new(4, &[SolutionEntry::bespoke(code("112"))]),
            Err(RegistryError::WrongLength { actual: 3, .. })
        ));
    }

    #[test]
    fn bespoke_only_registry_never_reports_halves() {
        let reg = SolutionRegistry::new(4, &[SolutionEntry::bespoke(code("1121"))]).unwrap();
        assert_eq!(reg.left_half(), None);
        assert_eq!(reg.classify(&code("1112")), SolutionState::None);
        assert_eq!(reg.entries(), vec![SolutionEntry::bespoke(code("1121"))]);
    }
}
