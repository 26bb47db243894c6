//! Dial codes: fixed-length digit strings set on the machine.
//!
//! A [`Code`] is immutable once produced. The live dial state is replaced
//! wholesale through [`Code::with_digit`] rather than mutated in place, which
//! keeps every submitted code hashable for the tried-code set.

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Inline storage for code digits; codes longer than eight dials spill to the heap.
pub type Digits = SmallVec<[u8; 8]>;

/// Highest digit a single dial can show.
pub const MAX_DIAL_DIGIT: u8 = 9;

/// Errors raised when a code string or digit does not fit the machine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodeError {
    #[error("code is empty")]
    Empty,
    #[error("invalid character {found:?} at position {index}")]
    InvalidChar { index: usize, found: char },
    #[error("digit {digit} at position {index} is outside 1..={max_digit}")]
    DigitOutOfRange { index: usize, digit: u8, max_digit: u8 },
    #[error("expected {expected} digits, got {actual}")]
    WrongLength { expected: usize, actual: usize },
    #[error("dial {index} does not exist on a {len}-dial machine")]
    DialOutOfRange { index: usize, len: usize },
}

/// Ordered digits shown on the dials, serialized as a plain string (`"1121"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Code(Digits);

impl Code {
    /// Build a code from raw digits without range checks.
    #[must_use]
    pub fn from_digits(digits: impl IntoIterator<Item = u8>) -> Self {
        Self(digits.into_iter().collect())
    }

    /// Parse a digit string.
    ///
    /// # Errors
    ///
    /// Returns [`CodeError::Empty`] for an empty string and
    /// [`CodeError::InvalidChar`] for anything other than ASCII digits.
    pub fn parse(value: &str) -> Result<Self, CodeError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(CodeError::Empty);
        }
        trimmed
            .chars()
            .enumerate()
            .map(|(index, ch)| {
                ch.to_digit(10)
                    .and_then(|d| u8::try_from(d).ok())
                    .ok_or(CodeError::InvalidChar { index, found: ch })
            })
            .collect::<Result<Digits, _>>()
            .map(Self)
    }

    /// Draw a code uniformly from `[1, max_digit]^len`.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, max_digit: u8, len: usize) -> Self {
        let max_digit = max_digit.max(1);
        Self((0..len).map(|_| rng.gen_range(1..=max_digit)).collect())
    }

    /// Check the code against the machine's dial count and alphabet.
    ///
    /// # Errors
    ///
    /// Returns the first length or digit violation found.
    pub fn validate(&self, code_length: usize, max_digit: u8) -> Result<(), CodeError> {
        if self.0.len() != code_length {
            return Err(CodeError::WrongLength {
                expected: code_length,
                actual: self.0.len(),
            });
        }
        for (index, &digit) in self.0.iter().enumerate() {
            if digit == 0 || digit > max_digit {
                return Err(CodeError::DigitOutOfRange {
                    index,
                    digit,
                    max_digit,
                });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn digits(&self) -> &[u8] {
        &self.0
    }

    /// First `n` digits (the whole code when `n` exceeds its length).
    #[must_use]
    pub fn prefix(&self, n: usize) -> Self {
        Self::from_digits(self.0.iter().copied().take(n))
    }

    /// Last `n` digits (the whole code when `n` exceeds its length).
    #[must_use]
    pub fn suffix(&self, n: usize) -> Self {
        let start = self.0.len().saturating_sub(n);
        Self::from_digits(self.0[start..].iter().copied())
    }

    #[must_use]
    pub fn starts_with(&self, head: &Self) -> bool {
        self.0.starts_with(&head.0)
    }

    #[must_use]
    pub fn ends_with(&self, tail: &Self) -> bool {
        self.0.ends_with(&tail.0)
    }

    /// Concatenate a left part and a right part into one code.
    #[must_use]
    pub fn splice(left: &Self, right: &Self) -> Self {
        Self::from_digits(left.0.iter().chain(right.0.iter()).copied())
    }

    /// Copy of this code with one dial turned to `digit`.
    ///
    /// # Errors
    ///
    /// Returns [`CodeError::DialOutOfRange`] when `index` is past the last dial.
    pub fn with_digit(&self, index: usize, digit: u8) -> Result<Self, CodeError> {
        if index >= self.0.len() {
            return Err(CodeError::DialOutOfRange {
                index,
                len: self.0.len(),
            });
        }
        let mut digits = self.0.clone();
        digits[index] = digit;
        Ok(Self(digits))
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for digit in &self.0 {
            write!(f, "{digit}")?;
        }
        Ok(())
    }
}

impl FromStr for Code {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Code> for String {
    fn from(value: Code) -> Self {
        value.to_string()
    }
}

impl Serialize for Code {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Code {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn code(s: &str) -> Code {
        Code::parse(s).expect("valid code")
    }

    #[test]
    fn parse_rejects_non_digits_and_empty() {
        assert_eq!(Code::parse(""), Err(CodeError::Empty));
        assert_eq!(
            Code::parse("12a4"),
            Err(CodeError::InvalidChar {
                index: 2,
                found: 'a'
            })
        );
        assert_eq!(code(" 1121 ").to_string(), "1121");
    }

    #[test]
    fn validate_checks_length_and_alphabet() {
        assert!(code("1212").validate(4, 2).is_ok());
        assert_eq!(
            code("121").validate(4, 2),
            Err(CodeError::WrongLength {
                expected: 4,
                actual: 3
            })
        );
        assert!(matches!(
            code("1302").validate(4, 2),
            Err(CodeError::DigitOutOfRange { index: 1, digit: 3, .. })
        ));
        assert!(matches!(
            code("1102").validate(4, 2),
            Err(CodeError::DigitOutOfRange { digit: 0, .. })
        ));
    }

    #[test]
    fn halves_and_splice() {
        let c = code("1234");
        assert_eq!(c.prefix(2), code("12"));
        assert_eq!(c.suffix(2), code("34"));
        assert!(c.starts_with(&code("12")));
        assert!(c.ends_with(&code("34")));
        assert!(!c.ends_with(&code("12")));
        assert_eq!(Code::splice(&code("56"), &c.suffix(2)), code("5634"));
        assert_eq!(c.suffix(9), c);
    }

    #[test]
    fn with_digit_replaces_single_dial() {
        let c = code("1111");
        assert_eq!(c.with_digit(2, 2).unwrap(), code("1121"));
        assert_eq!(c, code("1111"));
        assert_eq!(
            c.with_digit(4, 1),
            Err(CodeError::DialOutOfRange { index: 4, len: 4 })
        );
    }

    #[test]
    fn random_codes_stay_in_alphabet() {
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..200 {
            let c = Code::random(&mut rng, 3, 4);
            assert!(c.validate(4, 3).is_ok(), "{c} escaped the alphabet");
        }
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_string(&code("2112")).unwrap();
        assert_eq!(json, "\"2112\"");
        let back: Code = serde_json::from_str(&json).unwrap();
        assert_eq!(back, code("2112"));
        assert!(serde_json::from_str::<Code>("\"x1\"").is_err());
    }
}
