use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Opaque per-download identifier embedded into a distributed artifact.
///
/// A `TrackingCode` is always exactly [`TrackingCode::LEN`] uppercase
/// hexadecimal characters. Parsing accepts either case and normalizes to
/// uppercase, so equality is a plain string comparison.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TrackingCode(String);

impl TrackingCode {
    /// Number of characters in a code.
    pub const LEN: usize = 8;

    /// Build a code from 32 bits of raw entropy.
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(hex::encode_upper(bytes))
    }

    /// Parse and case-normalize a code.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let len = s.chars().count();
        if len != Self::LEN {
            return Err(TypeError::InvalidLength {
                expected: Self::LEN,
                actual: len,
            });
        }
        if let Some((position, character)) =
            s.chars().enumerate().find(|(_, c)| !c.is_ascii_hexdigit())
        {
            return Err(TypeError::InvalidCharacter {
                character,
                position,
            });
        }
        Ok(Self(s.to_ascii_uppercase()))
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 4-bit values of each character, most significant first.
    pub fn nibbles(&self) -> impl Iterator<Item = u8> + '_ {
        // Characters are validated hex digits, so `to_digit` cannot fail.
        self.0
            .chars()
            .filter_map(|c| c.to_digit(16))
            .map(|d| d as u8)
    }

    /// Rebuild a code from exactly [`TrackingCode::LEN`] nibbles.
    pub fn from_nibbles(nibbles: &[u8]) -> Result<Self, TypeError> {
        if nibbles.len() != Self::LEN {
            return Err(TypeError::InvalidLength {
                expected: Self::LEN,
                actual: nibbles.len(),
            });
        }
        let mut s = String::with_capacity(Self::LEN);
        for (position, &n) in nibbles.iter().enumerate() {
            let c = char::from_digit(u32::from(n), 16).ok_or(TypeError::InvalidCharacter {
                character: char::from(n),
                position,
            })?;
            s.push(c.to_ascii_uppercase());
        }
        Ok(Self(s))
    }
}

impl fmt::Debug for TrackingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TrackingCode({})", self.0)
    }
}

impl fmt::Display for TrackingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TrackingCode {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TrackingCode {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<TrackingCode> for String {
    fn from(code: TrackingCode) -> Self {
        code.0
    }
}

impl AsRef<str> for TrackingCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
