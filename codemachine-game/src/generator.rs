//! Random code generation under reveal/avoid policies.
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::code::Code;
use crate::solutions::{SolutionRegistry, SolutionState};

/// Upper bound on candidate draws before a generator gives up.
pub const MAX_DRAW_ATTEMPTS: usize = 1000;

/// Which search button a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    Bespoke,
    Left,
    Right,
}

impl SearchKind {
    pub const ALL: [Self; 3] = [Self::Left, Self::Right, Self::Bespoke];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bespoke => "bespoke",
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// The classification a forced reveal for this kind produces.
    #[must_use]
    pub const fn target_state(self) -> SolutionState {
        match self {
            Self::Bespoke => SolutionState::Bespoke,
            Self::Left => SolutionState::Left,
            Self::Right => SolutionState::Right,
        }
    }
}

impl fmt::Display for SearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchKind {
    type Err = UnknownSearchKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bespoke" => Ok(Self::Bespoke),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            _ => Err(UnknownSearchKind {
                label: s.to_string(),
            }),
        }
    }
}

/// Label that names no search kind.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown search kind {label:?}")]
pub struct UnknownSearchKind {
    pub label: String,
}

/// Candidate policy for a single generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerateMode {
    /// Uniform draw; may land on a solution by accident.
    Rand,
    /// The true (partial) solution.
    Correct,
    /// Uniform draw that never reveals the requested solution.
    Incorrect,
}

impl fmt::Display for GenerateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Rand => "rand",
            Self::Correct => "correct",
            Self::Incorrect => "incorrect",
        })
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("no {mode} {kind} code found after {attempts} draws")]
    Exhausted {
        kind: SearchKind,
        mode: GenerateMode,
        attempts: usize,
    },
    #[error("cannot generate a {mode} {kind} code for this solution set")]
    Unsupported { kind: SearchKind, mode: GenerateMode },
}

/// Draw codes of `len` digits until one is not `blocked`, up to
/// [`MAX_DRAW_ATTEMPTS`] times.
pub fn draw_code<R, F>(rng: &mut R, max_digit: u8, len: usize, mut blocked: F) -> Option<Code>
where
    R: Rng + ?Sized,
    F: FnMut(&Code) -> bool,
{
    (0..MAX_DRAW_ATTEMPTS)
        .map(|_| Code::random(&mut *rng, max_digit, len))
        .find(|candidate| !blocked(candidate))
}

/// Produces candidate codes for one registry; knows nothing about budgets.
#[derive(Debug, Clone, Copy)]
pub struct CodeGenerator<'a> {
    registry: &'a SolutionRegistry,
    max_digit: u8,
}

impl<'a> CodeGenerator<'a> {
    #[must_use]
    pub const fn new(registry: &'a SolutionRegistry, max_digit: u8) -> Self {
        Self {
            registry,
            max_digit,
        }
    }

    /// Generate a code for `kind` under `mode`. Half kinds keep the other
    /// half of `current` as displayed.
    ///
    /// # Errors
    ///
    /// Returns [`GeneratorError::Exhausted`] when an `Incorrect` draw cannot
    /// avoid the solution, and [`GeneratorError::Unsupported`] when the
    /// registry has nothing for `kind` to reveal.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        kind: SearchKind,
        mode: GenerateMode,
        current: &Code,
        rng: &mut R,
    ) -> Result<Code, GeneratorError> {
        match kind {
            SearchKind::Bespoke => self.generate_full(mode, rng),
            SearchKind::Left | SearchKind::Right => self.generate_half(kind, mode, current, rng),
        }
    }

    fn generate_full<R: Rng + ?Sized>(
        &self,
        mode: GenerateMode,
        rng: &mut R,
    ) -> Result<Code, GeneratorError> {
        let len = self.registry.code_length();
        let exhausted = GeneratorError::Exhausted {
            kind: SearchKind::Bespoke,
            mode,
            attempts: MAX_DRAW_ATTEMPTS,
        };
        match mode {
            GenerateMode::Correct => self
                .registry
                .bespoke_codes()
                .choose(rng)
                .or_else(|| self.registry.compositional_code())
                .cloned()
                .ok_or(GeneratorError::Unsupported {
                    kind: SearchKind::Bespoke,
                    mode,
                }),
            GenerateMode::Rand => draw_code(rng, self.max_digit, len, |_| false).ok_or(exhausted),
            GenerateMode::Incorrect => draw_code(rng, self.max_digit, len, |candidate| {
                self.registry.classify(candidate) != SolutionState::None
            })
            .ok_or(exhausted),
        }
    }

    fn generate_half<R: Rng + ?Sized>(
        &self,
        kind: SearchKind,
        mode: GenerateMode,
        current: &Code,
        rng: &mut R,
    ) -> Result<Code, GeneratorError> {
        let solution = match kind {
            SearchKind::Left => self.registry.left_half(),
            SearchKind::Right => self.registry.right_half(),
            SearchKind::Bespoke => None,
        }
        .ok_or(GeneratorError::Unsupported { kind, mode })?;

        let half = match mode {
            GenerateMode::Correct => Some(solution.clone()),
            GenerateMode::Rand => draw_code(rng, self.max_digit, solution.len(), |_| false),
            GenerateMode::Incorrect => {
                draw_code(rng, self.max_digit, solution.len(), |candidate| {
                    candidate == solution
                })
            }
        }
        .ok_or(GeneratorError::Exhausted {
            kind,
            mode,
            attempts: MAX_DRAW_ATTEMPTS,
        })?;

        let other_len = current.len().saturating_sub(solution.len());
        Ok(match kind {
            SearchKind::Left => Code::splice(&half, &current.suffix(other_len)),
            _ => Code::splice(&current.prefix(other_len), &half),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solutions::SolutionEntry;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

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
    fn correct_half_keeps_other_half() {
        let reg = registry();
        let generator = CodeGenerator::new(&reg, 2);
        let mut rng = SmallRng::seed_from_u64(1);
        let current = code("2222");
        assert_eq!(
            generator
                .generate(SearchKind::Left, GenerateMode::Correct, &current, &mut rng)
                .unwrap(),
            code("1122")
        );
        assert_eq!(
            generator
                .generate(SearchKind::Right, GenerateMode::Correct, &current, &mut rng)
                .unwrap(),
            code("2212")
        );
    }

    #[test]
    fn correct_bespoke_picks_registered_code() {
        let reg = SolutionRegistry::new(
            4,
            &[
                SolutionEntry::bespoke(code("1121")),
                SolutionEntry::bespoke(code("2211")),
            ],
        )
        .unwrap();
        let generator = CodeGenerator::new(&reg, 2);
        let mut rng = SmallRng::seed_from_u64(2);
        for _ in 0..20 {
            let c = generator
                .generate(SearchKind::Bespoke, GenerateMode::Correct, &code("2222"), &mut rng)
                .unwrap();
            assert_eq!(reg.classify(&c), SolutionState::Bespoke);
        }
    }

    #[test]
    fn incorrect_never_reveals() {
        let reg = registry();
        let generator = CodeGenerator::new(&reg, 3);
        let mut rng = SmallRng::seed_from_u64(3);
        let current = code("3333");
        for _ in 0..1000 {
            let full = generator
                .generate(SearchKind::Bespoke, GenerateMode::Incorrect, &current, &mut rng)
                .unwrap();
            assert_eq!(reg.classify(&full), SolutionState::None);

            let left = generator
                .generate(SearchKind::Left, GenerateMode::Incorrect, &current, &mut rng)
                .unwrap();
            assert_ne!(left.prefix(2), code("11"));
            assert_eq!(left.suffix(2), code("33"));

            let right = generator
                .generate(SearchKind::Right, GenerateMode::Incorrect, &current, &mut rng)
                .unwrap();
            assert_ne!(right.suffix(2), code("12"));
            assert_eq!(right.prefix(2), code("33"));
        }
    }

    #[test]
    fn incorrect_exhausts_on_degenerate_alphabet() {
        let reg = SolutionRegistry::new(2, &[SolutionEntry::compositional(code("11"))]).unwrap();
        let generator = CodeGenerator::new(&reg, 1);
        let mut rng = SmallRng::seed_from_u64(4);
        let err = generator
            .generate(SearchKind::Left, GenerateMode::Incorrect, &code("11"), &mut rng)
            .unwrap_err();
        assert_eq!(
            err,
            GeneratorError::Exhausted {
                kind: SearchKind::Left,
                mode: GenerateMode::Incorrect,
                attempts: MAX_DRAW_ATTEMPTS,
            }
        );
    }

    #[test]
    fn half_requests_need_a_compositional_solution() {
        let reg = SolutionRegistry::new(4, &[SolutionEntry::bespoke(code("1121"))]).unwrap();
        let generator = CodeGenerator::new(&reg, 2);
        let mut rng = SmallRng::seed_from_u64(5);
        assert!(matches!(
            generator.generate(SearchKind::Right, GenerateMode::Rand, &code("2222"), &mut rng),
            Err(GeneratorError::Unsupported { .. })
        ));
    }

    #[test]
    fn search_kind_parses_labels() {
        assert_eq!("left".parse::<SearchKind>(), Ok(SearchKind::Left));
        let err = "middle".parse::<SearchKind>().unwrap_err();
        assert_eq!(err.label, "middle");
        assert_eq!(err.to_string(), "unknown search kind \"middle\"");
        assert_eq!(SearchKind::Bespoke.to_string(), "bespoke");
    }
}
