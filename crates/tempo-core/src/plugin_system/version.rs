//! Version parsing and range matching for plugin compatibility.
//!
//! Versions follow the `MAJOR.MINOR.PATCH` form and are parsed with the
//! `semver` crate. Range matching is deliberately looser than strict semver:
//! comparisons only look at the numeric triple, so pre-release and build
//! metadata are accepted on input but ignored when ranges are evaluated.

use std::fmt;
use std::str::FromStr;

use semver::Version;
use thiserror::Error;

/// Errors related to version parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("invalid version format: '{0}' (expected MAJOR.MINOR.PATCH)")]
    InvalidFormat(String),
    #[error("invalid version range: '{0}'")]
    InvalidRange(String),
}

/// Parses a version string, requiring all three numeric components.
///
/// `"1.2"` and `"1"` are rejected; `"1.2.3-beta.1"` parses and keeps its
/// pre-release tag, which range matching then ignores.
pub fn parse_version(version: &str) -> Result<Version, VersionError> {
    Version::parse(version.trim()).map_err(|_| VersionError::InvalidFormat(version.to_string()))
}

/// The comparator at the front of a range string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeOp {
    Exact,
    GreaterEq,
    Greater,
    LessEq,
    Less,
    Caret,
    Tilde,
}

/// A single-comparator version range such as `>=1.2.0`, `^1.2.3` or `1.0.0`.
///
/// A bare version means exact equality of the numeric triple. Compound
/// ranges (`>=1.0.0 <2.0.0`) are not supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    op: RangeOp,
    reference: Version,
    raw: String,
}

impl VersionRange {
    /// Parses a range string into a comparator and reference version.
    pub fn parse(range: &str) -> Result<Self, VersionError> {
        let raw = range.trim();
        if raw.is_empty() {
            return Err(VersionError::InvalidRange(range.to_string()));
        }
        let (op, rest) = if let Some(rest) = raw.strip_prefix(">=") {
            (RangeOp::GreaterEq, rest)
        } else if let Some(rest) = raw.strip_prefix("<=") {
            (RangeOp::LessEq, rest)
        } else if let Some(rest) = raw.strip_prefix('>') {
            (RangeOp::Greater, rest)
        } else if let Some(rest) = raw.strip_prefix('<') {
            (RangeOp::Less, rest)
        } else if let Some(rest) = raw.strip_prefix('^') {
            (RangeOp::Caret, rest)
        } else if let Some(rest) = raw.strip_prefix('~') {
            (RangeOp::Tilde, rest)
        } else {
            (RangeOp::Exact, raw)
        };
        let reference =
            parse_version(rest).map_err(|_| VersionError::InvalidRange(range.to_string()))?;
        Ok(Self {
            op,
            reference,
            raw: raw.to_string(),
        })
    }

    /// Checks if a version falls inside this range.
    ///
    /// Only the numeric triple participates:
    /// - `>=`, `>`, `<=`, `<` compare triples lexicographically.
    /// - `^X.Y.Z` with `X > 0` accepts any version with the same major.
    /// - `^0.Y.Z` additionally pins the minor and requires `>= 0.Y.Z`.
    /// - `~X.Y.Z` pins major and minor and requires `>= X.Y.Z`.
    /// - A bare version accepts only an identical triple.
    pub fn includes(&self, version: &Version) -> bool {
        let v = triple(version);
        let r = triple(&self.reference);
        match self.op {
            RangeOp::Exact => v == r,
            RangeOp::GreaterEq => v >= r,
            RangeOp::Greater => v > r,
            RangeOp::LessEq => v <= r,
            RangeOp::Less => v < r,
            RangeOp::Tilde => v.0 == r.0 && v.1 == r.1 && v >= r,
            RangeOp::Caret => {
                if v.0 != r.0 {
                    return false;
                }
                // For 0.x the minor acts as the compatibility line.
                if r.0 == 0 {
                    v.1 == r.1 && v >= r
                } else {
                    true
                }
            }
        }
    }

    /// The range exactly as it was written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// True for ranges that reject routine host upgrades: exact pins and
    /// tilde ranges, which both break on the next minor release.
    pub fn is_narrow(&self) -> bool {
        matches!(self.op, RangeOp::Exact | RangeOp::Tilde)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl FromStr for VersionRange {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Checks a version string against a range string.
///
/// Malformed input on either side yields `false`, never an error. Callers
/// that need to distinguish "incompatible" from "unparseable" should go
/// through [`parse_version`] and [`VersionRange::parse`] directly.
pub fn satisfies_version(version: &str, range: &str) -> bool {
    match (parse_version(version), VersionRange::parse(range)) {
        (Ok(version), Ok(range)) => range.includes(&version),
        _ => false,
    }
}

fn triple(version: &Version) -> (u64, u64, u64) {
    (version.major, version.minor, version.patch)
}
