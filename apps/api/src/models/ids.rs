use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

/// A 64-bit database or external-platform identifier.
///
/// Stored as `BIGINT`, but always serialized as a decimal string so JSON
/// clients never round it through a float.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, sqlx::Type)]
#[sqlx(transparent)]
pub struct BigId(pub i64);

impl fmt::Display for BigId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdParseError {
    #[error("must contain only digits")]
    NotDigits,
    #[error("is too large")]
    OutOfRange,
}

impl FromStr for BigId {
    type Err = IdParseError;

    /// Accepts only a non-empty run of ASCII digits. Signs, whitespace and
    /// exponents are rejected before the magnitude check.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(IdParseError::NotDigits);
        }
        s.parse::<i64>()
            .map(BigId)
            .map_err(|_| IdParseError::OutOfRange)
    }
}

impl Serialize for BigId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
