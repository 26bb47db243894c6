//! Puzzle configuration with serde defaults and validation.
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

use crate::code::{Code, CodeError, MAX_DIAL_DIGIT};
use crate::solutions::{RegistryError, SolutionEntry, SolutionKind, SolutionRegistry};

/// Errors raised when a configuration cannot produce a puzzle instance.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("code_length must be a positive even number, got {code_length}")]
    CodeLength { code_length: usize },
    #[error("max_digit must be within 1..={MAX_DIAL_DIGIT}, got {max_digit}")]
    MaxDigit { max_digit: u8 },
    #[error("no solutions configured")]
    NoSolutions,
    #[error("solution {code} is malformed: {source}")]
    InvalidSolution {
        code: Code,
        #[source]
        source: CodeError,
    },
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("initial code {code} is malformed: {source}")]
    InitialCode {
        code: Code,
        #[source]
        source: CodeError,
    },
    #[error("could not draw a non-solution initial code in {attempts} attempts")]
    InitialCodeExhausted { attempts: usize },
}

/// Where the dials start.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum InitialCode {
    /// A random code that does not classify as any solution.
    #[default]
    Random,
    Fixed(Code),
}

impl TryFrom<String> for InitialCode {
    type Error = CodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.trim().eq_ignore_ascii_case("random") {
            return Ok(Self::Random);
        }
        Code::parse(&value).map(Self::Fixed)
    }
}

impl From<InitialCode> for String {
    fn from(value: InitialCode) -> Self {
        match value {
            InitialCode::Random => "random".to_string(),
            InitialCode::Fixed(code) => code.to_string(),
        }
    }
}

/// Everything needed to build one puzzle instance.
///
/// Field names accept the camelCase spelling used by experiment JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleConfig {
    #[serde(default = "PuzzleConfig::default_max_digit", alias = "maxDigit")]
    pub max_digit: u8,
    #[serde(default = "PuzzleConfig::default_code_length", alias = "codeLength")]
    pub code_length: usize,
    /// Either a `code -> kind` map or a list of entries.
    #[serde(default, deserialize_with = "deserialize_solutions")]
    pub solutions: Vec<SolutionEntry>,
    #[serde(
        default = "PuzzleConfig::default_n_click_bespoke",
        alias = "nClickBespoke"
    )]
    pub n_click_bespoke: u32,
    #[serde(
        default = "PuzzleConfig::default_n_click_partial",
        alias = "nClickPartial"
    )]
    pub n_click_partial: u32,
    #[serde(default, alias = "clickNoise", alias = "intNoise")]
    pub click_noise: u32,
    #[serde(default, alias = "allowAccidentalSolution")]
    pub allow_accidental_solution: bool,
    #[serde(default, alias = "initialCode")]
    pub initial_code: InitialCode,
    #[serde(default = "PuzzleConfig::default_max_tries", alias = "maxTries")]
    pub max_tries: u32,
    #[serde(
        default = "PuzzleConfig::default_record_solutions",
        alias = "recordSolutions"
    )]
    pub record_solutions: bool,
    #[serde(default)]
    pub task: Option<String>,
    #[serde(default, alias = "blockString")]
    pub block_string: Option<String>,
    #[serde(default, alias = "trialId", alias = "trialID")]
    pub trial_id: Option<String>,
    #[serde(default)]
    pub seed: u64,
    #[serde(
        default = "PuzzleConfig::default_button_delay_ms",
        alias = "buttonDelay"
    )]
    pub button_delay_ms: u64,
    #[serde(
        default = "PuzzleConfig::default_solution_delay_ms",
        alias = "solutionDelay"
    )]
    pub solution_delay_ms: u64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SolutionsRepr {
    Map(BTreeMap<Code, SolutionKind>),
    List(Vec<SolutionEntry>),
}

fn deserialize_solutions<'de, D>(deserializer: D) -> Result<Vec<SolutionEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match SolutionsRepr::deserialize(deserializer)? {
        SolutionsRepr::Map(map) => map
            .into_iter()
            .map(|(code, kind)| SolutionEntry::new(code, kind))
            .collect(),
        SolutionsRepr::List(list) => list,
    })
}

impl PuzzleConfig {
    const fn default_max_digit() -> u8 {
        9
    }

    const fn default_code_length() -> usize {
        4
    }

    const fn default_n_click_bespoke() -> u32 {
        20
    }

    const fn default_n_click_partial() -> u32 {
        15
    }

    const fn default_max_tries() -> u32 {
        400
    }

    const fn default_record_solutions() -> bool {
        true
    }

    const fn default_button_delay_ms() -> u64 {
        1000
    }

    const fn default_solution_delay_ms() -> u64 {
        2000
    }

    /// Defaults with the given dials and solution set.
    #[must_use]
    pub fn new(code_length: usize, max_digit: u8, solutions: Vec<SolutionEntry>) -> Self {
        Self {
            code_length,
            max_digit,
            solutions,
            ..Self::default()
        }
    }

    /// Parse a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error for malformed input. Call
    /// [`PuzzleConfig::validate`] before use.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Validate dial shape, solutions and initial code.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.registry().map(|_| ())
    }

    /// Validate and build the solution registry.
    ///
    /// # Errors
    ///
    /// Same as [`PuzzleConfig::validate`].
    pub fn registry(&self) -> Result<SolutionRegistry, ConfigError> {
        if self.code_length == 0 || self.code_length % 2 != 0 {
            return Err(ConfigError::CodeLength {
                code_length: self.code_length,
            });
        }
        if !(1..=MAX_DIAL_DIGIT).contains(&self.max_digit) {
            return Err(ConfigError::MaxDigit {
                max_digit: self.max_digit,
            });
        }
        if self.solutions.is_empty() {
            return Err(ConfigError::NoSolutions);
        }
        for entry in &self.solutions {
            entry
                .code
                .validate(self.code_length, self.max_digit)
                .map_err(|source| ConfigError::InvalidSolution {
                    code: entry.code.clone(),
                    source,
                })?;
        }
        if let InitialCode::Fixed(code) = &self.initial_code {
            code.validate(self.code_length, self.max_digit)
                .map_err(|source| ConfigError::InitialCode {
                    code: code.clone(),
                    source,
                })?;
        }
        Ok(SolutionRegistry::new(self.code_length, &self.solutions)?)
    }

    #[must_use]
    pub const fn button_delay(&self) -> Duration {
        Duration::from_millis(self.button_delay_ms)
    }

    #[must_use]
    pub const fn solution_delay(&self) -> Duration {
        Duration::from_millis(self.solution_delay_ms)
    }
}

impl Default for PuzzleConfig {
    fn default() -> Self {
        Self {
            max_digit: Self::default_max_digit(),
            code_length: Self::default_code_length(),
            solutions: Vec::new(),
            n_click_bespoke: Self::default_n_click_bespoke(),
            n_click_partial: Self::default_n_click_partial(),
            click_noise: 0,
            allow_accidental_solution: false,
            initial_code: InitialCode::Random,
            max_tries: Self::default_max_tries(),
            record_solutions: Self::default_record_solutions(),
            task: None,
            block_string: None,
            trial_id: None,
            seed: 0,
            button_delay_ms: Self::default_button_delay_ms(),
            solution_delay_ms: Self::default_solution_delay_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> Code {
        Code::parse(s).unwrap()
    }

    #[test]
    fn json_accepts_camel_case_and_solution_map() {
        let cfg = PuzzleConfig::from_json(
            r#"{
                "maxDigit": 2,
                "codeLength": 4,
                "solutions": {"1112": "compositional", "1121": "bespoke"},
                "nClickPartial": 3,
                "initialCode": "2222",
                "trialID": "abc"
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.max_digit, 2);
        assert_eq!(cfg.n_click_partial, 3);
        assert_eq!(cfg.n_click_bespoke, 20);
        assert_eq!(cfg.max_tries, 400);
        assert_eq!(cfg.initial_code, InitialCode::Fixed(code("2222")));
        assert_eq!(cfg.trial_id.as_deref(), Some("abc"));
        assert!(cfg.record_solutions);
        let registry = cfg.registry().unwrap();
        assert_eq!(registry.compositional_code(), Some(&code("1112")));
        assert_eq!(registry.bespoke_codes(), &[code("1121")]);
    }

    #[test]
    fn json_accepts_solution_list() {
        let cfg = PuzzleConfig::from_json(
            r#"{"code_length": 2, "max_digit": 3,
                "solutions": [{"code": "13", "kind": "bespoke"}],
                "initial_code": "random"}"#,
        )
        .unwrap();
        assert_eq!(cfg.solutions, vec![SolutionEntry::bespoke(code("13"))]);
        assert_eq!(cfg.initial_code, InitialCode::Random);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_bad_shapes() {
        let solutions = vec![SolutionEntry::bespoke(code("121"))];
        assert_eq!(
            PuzzleConfig::new(3, 2, solutions).validate(),
            Err(ConfigError::CodeLength { code_length: 3 })
        );
        assert_eq!(
            PuzzleConfig::new(0, 2, Vec::new()).validate(),
            Err(ConfigError::CodeLength { code_length: 0 })
        );
        assert_eq!(
            PuzzleConfig::new(4, 0, vec![SolutionEntry::bespoke(code("1111"))]).validate(),
            Err(ConfigError::MaxDigit { max_digit: 0 })
        );
        assert_eq!(
            PuzzleConfig::new(4, 2, Vec::new()).validate(),
            Err(ConfigError::NoSolutions)
        );
        assert!(matches!(
            PuzzleConfig::new(4, 2, vec![SolutionEntry::bespoke(code("1131"))]).validate(),
            Err(ConfigError::InvalidSolution { .. })
        ));
        assert!(matches!(
            PuzzleConfig::new(
                4,
                2,
                vec![
                    SolutionEntry::compositional(code("1112")),
                    SolutionEntry::compositional(code("2211")),
                ]
            )
            .validate(),
            Err(ConfigError::Registry(RegistryError::MultipleCompositional { .. }))
        ));
    }

    #[test]
    fn rejects_malformed_initial_code() {
        let mut cfg = PuzzleConfig::new(4, 2, vec![SolutionEntry::bespoke(code("1121"))]);
        cfg.initial_code = InitialCode::Fixed(code("22"));
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InitialCode { .. })
        ));
    }

    #[test]
    fn delays_convert_to_durations() {
        let cfg = PuzzleConfig::default();
        assert_eq!(cfg.button_delay(), Duration::from_secs(1));
        assert_eq!(cfg.solution_delay(), Duration::from_secs(2));
    }
}
