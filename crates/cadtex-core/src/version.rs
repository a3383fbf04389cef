//! Geometry format versions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CadtexError;

/// Version of the binary geometry format, ordered lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FormatVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl FormatVersion {
    /// Library headers and trim-set buffers carry an aggregate area.
    pub const TOTAL_AREA: Self = Self::new(0, 0, 26);
    /// Trim-set ids in the surface TOC use the signed packed-pair encoding.
    pub const SIGNED_TRIM_SET_ID: Self = Self::new(0, 0, 27);
    /// Packed-pair integers switch from base 2048 to base 4096.
    pub const WIDE_PACKED_PAIRS: Self = Self::new(0, 0, 28);
    /// Body instance references carry an RGBA color.
    pub const BODY_REF_COLOR: Self = Self::new(0, 0, 29);
    /// Body descriptors carry a curve reference list.
    pub const BODY_CURVES: Self = Self::new(1, 0, 5);

    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// The newest layout this crate understands.
    pub const fn latest() -> Self {
        Self::BODY_CURVES
    }

    pub fn at_least(self, other: Self) -> bool {
        self >= other
    }
}

impl Default for FormatVersion {
    fn default() -> Self {
        Self::latest()
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for FormatVersion {
    type Err = CadtexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split('.');
        let mut next = |name: &str| -> Result<u32, CadtexError> {
            parts
                .next()
                .ok_or_else(|| CadtexError::Config(format!("version '{s}' is missing its {name} part")))?
                .parse::<u32>()
                .map_err(|e| CadtexError::Config(format!("invalid {name} in version '{s}': {e}")))
        };
        let major = next("major")?;
        let minor = next("minor")?;
        let patch = next("patch")?;
        if parts.next().is_some() {
            return Err(CadtexError::Config(format!("version '{s}' has too many parts")));
        }
        Ok(Self::new(major, minor, patch))
    }
}
