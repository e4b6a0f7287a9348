//! Accepted HTTP status ranges.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::registry::StatusValidator;

/// Inclusive range of accepted HTTP statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRange {
    pub low: u16,
    pub high: u16,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatusRangeError {
    #[error("invalid status code: {0:?}")]
    InvalidCode(String),

    #[error("status {0} outside 100-599")]
    OutOfRange(u16),

    #[error("empty range: {low} > {high}")]
    Empty { low: u16, high: u16 },
}

impl StatusRange {
    pub fn contains(&self, status: u16) -> bool {
        (self.low..=self.high).contains(&status)
    }

    pub fn validator(&self) -> StatusValidator {
        StatusValidator::range(self.low, self.high)
    }
}

fn parse_code(s: &str) -> Result<u16, StatusRangeError> {
    let code: u16 = s
        .trim()
        .parse()
        .map_err(|_| StatusRangeError::InvalidCode(s.trim().to_string()))?;
    if !(100..=599).contains(&code) {
        return Err(StatusRangeError::OutOfRange(code));
    }
    Ok(code)
}

impl FromStr for StatusRange {
    type Err = StatusRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (low, high) = match s.split_once('-') {
            Some((low, high)) => (parse_code(low)?, parse_code(high)?),
            None => {
                let code = parse_code(s)?;
                (code, code)
            }
        };
        if low > high {
            return Err(StatusRangeError::Empty { low, high });
        }
        Ok(Self { low, high })
    }
}

impl fmt::Display for StatusRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.low == self.high {
            write!(f, "{}", self.low)
        } else {
            write!(f, "{}-{}", self.low, self.high)
        }
    }
}
