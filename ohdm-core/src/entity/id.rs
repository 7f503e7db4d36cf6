use std::{fmt, str::FromStr};

use thiserror::Error;

/// Application identifier carried by every staging entity.
///
/// Identifiers are kept as normalised decimal text so values wider than 64
/// bits round-trip without loss.
///
/// # Examples
/// ```
/// use ohdm_core::OsmId;
///
/// let id: OsmId = "  0042 ".parse()?;
/// assert_eq!(id.as_str(), "42");
///
/// let wide = OsmId::parse("170141183460469231731687303715884105728")?;
/// assert_eq!(wide.to_string(), "170141183460469231731687303715884105728");
/// # Ok::<(), ohdm_core::OsmIdError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct OsmId(String);

/// Errors raised when parsing an [`OsmId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OsmIdError {
    /// The identifier was empty after trimming.
    #[error("identifier must not be empty")]
    Empty,
    /// The identifier was not an integer literal.
    #[error("identifier {raw:?} is not an integer")]
    NotInteger {
        /// Input that failed validation.
        raw: String,
    },
}

impl OsmId {
    /// Parse and normalise an integer identifier.
    ///
    /// Leading zeros are dropped and a trailing `.0…` fraction (as produced by
    /// numeric columns) is accepted when every fractional digit is zero.
    pub fn parse(raw: &str) -> Result<Self, OsmIdError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(OsmIdError::Empty);
        }
        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let integral = match unsigned.split_once('.') {
            Some((whole, fraction)) if fraction.chars().all(|ch| ch == '0') => whole,
            Some(_) => return Err(not_integer(raw)),
            None => unsigned,
        };
        if integral.is_empty() || !integral.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(not_integer(raw));
        }
        let digits = integral.trim_start_matches('0');
        let normalised = match (digits.is_empty(), negative) {
            (true, _) => "0".to_owned(),
            (false, true) => format!("-{digits}"),
            (false, false) => digits.to_owned(),
        };
        Ok(Self(normalised))
    }

    /// Borrow the normalised decimal text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the identifier, returning the decimal text.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

fn not_integer(raw: &str) -> OsmIdError {
    OsmIdError::NotInteger {
        raw: raw.to_owned(),
    }
}

impl fmt::Display for OsmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for OsmId {
    type Err = OsmIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for OsmId {
    type Error = OsmIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OsmId> for String {
    fn from(value: OsmId) -> Self {
        value.0
    }
}

impl AsRef<str> for OsmId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
