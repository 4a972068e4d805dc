use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// A storage filename whose leading number encodes display order: `3.jpg`.
///
/// Only canonical spellings parse: the number is positive and carries no
/// leading zero, so `to_string()` always reproduces the raw filename. The
/// extension is kept verbatim (case included) because it belongs to the
/// file's bytes, not to its slot.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PositionalName {
    number: u32,
    ext: String,
}

impl PositionalName {
    pub fn new(number: u32, ext: impl Into<String>) -> Result<Self, CoreError> {
        if number == 0 {
            return Err(CoreError::InvalidName("position number must be positive".into()));
        }
        let ext = ext.into();
        if ext.contains(['/', '\\']) {
            return Err(CoreError::InvalidName(format!("bad extension: {ext}")));
        }
        Ok(Self { number, ext })
    }

    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let (digits, ext) = match raw.split_once('.') {
            Some((digits, ext)) => (digits, ext),
            None => (raw, ""),
        };
        if digits.is_empty()
            || !digits.bytes().all(|b| b.is_ascii_digit())
            || digits.starts_with('0')
        {
            return Err(CoreError::InvalidName(raw.to_string()));
        }
        if raw.ends_with('.') {
            return Err(CoreError::InvalidName(raw.to_string()));
        }
        let number = digits
            .parse::<u32>()
            .map_err(|_| CoreError::InvalidName(raw.to_string()))?;
        Self::new(number, ext)
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn ext(&self) -> &str {
        &self.ext
    }

    /// Same extension, different slot.
    pub fn with_number(&self, number: u32) -> Self {
        Self {
            number,
            ext: self.ext.clone(),
        }
    }
}

impl FromStr for PositionalName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PositionalName {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PositionalName> for String {
    fn from(value: PositionalName) -> Self {
        value.to_string()
    }
}

impl fmt::Display for PositionalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ext.is_empty() {
            write!(f, "{}", self.number)
        } else {
            write!(f, "{}.{}", self.number, self.ext)
        }
    }
}

impl fmt::Debug for PositionalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PositionalName({self})")
    }
}
