// SPDX-License-Identifier: MIT
//! Four-character type tags naming a chunk's payload kind

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ChunkError, Result};

/// Width of a type tag in octets
pub const TYPE_TAG_SIZE: usize = 4;

/// Opaque 4-octet chunk type identifier, compared by its bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeTag([u8; TYPE_TAG_SIZE]);

impl TypeTag {
    pub const fn new(octets: [u8; TYPE_TAG_SIZE]) -> Self {
        Self(octets)
    }

    /// Build a tag from a slice that must hold exactly four octets
    pub fn from_bytes(octets: &[u8]) -> Result<Self> {
        let fixed: [u8; TYPE_TAG_SIZE] = octets.try_into().map_err(|_| {
            ChunkError::InvalidTypeTag(format!(
                "expected {} octets, got {}",
                TYPE_TAG_SIZE,
                octets.len()
            ))
        })?;
        Ok(Self(fixed))
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; TYPE_TAG_SIZE] {
        &self.0
    }

    /// The tag as text, when its octets are valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    /// Compare against a tag string without allocating
    #[inline]
    pub fn eq_str(&self, other: &str) -> bool {
        self.0.as_slice() == other.as_bytes()
    }
}

impl From<[u8; TYPE_TAG_SIZE]> for TypeTag {
    fn from(octets: [u8; TYPE_TAG_SIZE]) -> Self {
        Self(octets)
    }
}

impl FromStr for TypeTag {
    type Err = ChunkError;

    /// Tag strings are measured in octets: `"cafe"` is valid, `"café"` is not.
    fn from_str(s: &str) -> Result<Self> {
        if s.len() != TYPE_TAG_SIZE {
            return Err(ChunkError::InvalidTypeTag(format!(
                "{:?} is {} octets, expected {}",
                s,
                s.len(),
                TYPE_TAG_SIZE
            )));
        }
        Self::from_bytes(s.as_bytes())
    }
}

impl TryFrom<&str> for TypeTag {
    type Error = ChunkError;

    fn try_from(s: &str) -> Result<Self> {
        s.parse()
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &octet in &self.0 {
            if octet.is_ascii_graphic() || octet == b' ' {
                write!(f, "{}", octet as char)?;
            } else {
                write!(f, "\\x{:02x}", octet)?;
            }
        }
        Ok(())
    }
}

impl Serialize for TypeTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Only printable tags survive the string form; escaped octets do not parse back.
impl<'de> Deserialize<'de> for TypeTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
