//! Budgeted next-code search.
//!
//! Each press of a search button spends one click of that button's budget.
//! While clicks remain the controller offers fresh non-solutions; once the
//! budget is spent it reveals the (partial) solution.
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::budget::ClickBudget;
use crate::code::Code;
use crate::generator::{CodeGenerator, GenerateMode, GeneratorError, MAX_DRAW_ATTEMPTS, SearchKind};

/// Every code entered during one puzzle instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriedCodes(HashSet<Code>);

impl TriedCodes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the code had not been tried before.
    pub fn insert(&mut self, code: Code) -> bool {
        self.0.insert(code)
    }

    #[must_use]
    pub fn contains(&self, code: &Code) -> bool {
        self.0.contains(code)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Code> {
        self.0.iter()
    }
}

/// How a suggestion was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// A fresh random code.
    Random,
    /// The budget ran out and the solution was revealed.
    Forced,
    /// No fresh code could be found, so the solution was revealed early.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub code: Code,
    pub resolution: Resolution,
}

/// Decides between a random suggestion and a forced reveal.
#[derive(Debug, Clone, Copy)]
pub struct SearchController<'a> {
    generator: CodeGenerator<'a>,
    allow_accidental_solution: bool,
}

impl<'a> SearchController<'a> {
    #[must_use]
    pub const fn new(generator: CodeGenerator<'a>, allow_accidental_solution: bool) -> Self {
        Self {
            generator,
            allow_accidental_solution,
        }
    }

    const fn random_mode(&self) -> GenerateMode {
        if self.allow_accidental_solution {
            GenerateMode::Rand
        } else {
            GenerateMode::Incorrect
        }
    }

    /// Spend one click of `kind` and produce the next suggestion.
    ///
    /// # Errors
    ///
    /// Returns [`GeneratorError::Unsupported`] when the registry has no
    /// solution `kind` could ever reveal.
    pub fn next_code<R: Rng + ?Sized>(
        &self,
        kind: SearchKind,
        budget: &mut ClickBudget,
        tried: &TriedCodes,
        current: &Code,
        rng: &mut R,
    ) -> Result<SearchResult, GeneratorError> {
        if budget.spend(kind) == 0 {
            return self.reveal(kind, current, rng, Resolution::Forced);
        }

        let mode = self.random_mode();
        for _ in 0..MAX_DRAW_ATTEMPTS {
            match self.generator.generate(kind, mode, current, rng) {
                Ok(code) if !tried.contains(&code) => {
                    return Ok(SearchResult {
                        code,
                        resolution: Resolution::Random,
                    });
                }
                Ok(_) => {}
                Err(GeneratorError::Exhausted { .. }) => break,
                Err(err @ GeneratorError::Unsupported { .. }) => return Err(err),
            }
        }

        log::warn!(
            "no untried {kind} code after {MAX_DRAW_ATTEMPTS} attempts; revealing solution"
        );
        self.reveal(kind, current, rng, Resolution::Fallback)
    }

    fn reveal<R: Rng + ?Sized>(
        &self,
        kind: SearchKind,
        current: &Code,
        rng: &mut R,
        resolution: Resolution,
    ) -> Result<SearchResult, GeneratorError> {
        self.generator
            .generate(kind, GenerateMode::Correct, current, rng)
            .map(|code| SearchResult { code, resolution })
    }
}
