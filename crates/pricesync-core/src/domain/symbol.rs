use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Longest symbol the store accepts.
pub const SYMBOL_MAX_LENGTH: usize = 20;

/// Normalized market symbol/ticker.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Trim and uppercase `input`, then check length and alphabet.
    ///
    /// A symbol starts with a letter and otherwise holds letters, digits,
    /// `.` or `-`.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = input.trim().to_ascii_uppercase();
        let mut chars = normalized.char_indices();
        match chars.next() {
            None => return Err(ValidationError::EmptySymbol),
            Some((_, head)) if !head.is_ascii_alphabetic() => {
                return Err(ValidationError::SymbolInvalidStart { ch: head })
            }
            Some(_) => {}
        }

        let len = normalized.chars().count();
        if len > SYMBOL_MAX_LENGTH {
            return Err(ValidationError::SymbolTooLong {
                len,
                max: SYMBOL_MAX_LENGTH,
            });
        }

        let allowed = |ch: char| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-');
        if let Some((index, ch)) = chars.find(|&(_, ch)| !allowed(ch)) {
            return Err(ValidationError::SymbolInvalidChar { ch, index });
        }

        Ok(Self(normalized))
    }

    /// Parse a comma-separated list such as `IBM,AAPL`, skipping blanks.
    pub fn parse_list(input: &str) -> Result<Vec<Self>, ValidationError> {
        input
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(Self::parse)
            .collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Symbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}
