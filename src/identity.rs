//! Composite identities for association resources
//!
//! An association between a job template and a credential is addressed as
//! `"<job_template_id>-<credential_id>"`.

use crate::error::ReconcileError;
use std::fmt;
use std::str::FromStr;

/// Format named in parse errors.
pub const COMPOSITE_FORMAT: &str = "<job_template_id>-<credential_id>";

const DELIMITER: char = '-';

/// A `(parent, child)` id pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompositeId {
    pub parent: i64,
    pub child: i64,
}

impl CompositeId {
    pub fn new(parent: i64, child: i64) -> Self {
        Self { parent, child }
    }
}

impl fmt::Display for CompositeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{DELIMITER}{}", self.parent, self.child)
    }
}

impl FromStr for CompositeId {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ReconcileError::MalformedIdentity {
            id: s.to_string(),
            expected: COMPOSITE_FORMAT,
        };

        let mut segments = s.split(DELIMITER);
        let (Some(parent), Some(child), None) = (segments.next(), segments.next(), segments.next())
        else {
            return Err(malformed());
        };

        Ok(Self {
            parent: parse_segment(parent).ok_or_else(malformed)?,
            child: parse_segment(child).ok_or_else(malformed)?,
        })
    }
}

/// Digits only: no sign, no whitespace, no empty segment.
fn parse_segment(segment: &str) -> Option<i64> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

/// Encode a pair of ids.
pub fn encode(parent: i64, child: i64) -> String {
    CompositeId::new(parent, child).to_string()
}

/// Decode a composite identity into `(parent, child)`.
pub fn decode(s: &str) -> Result<(i64, i64), ReconcileError> {
    let id: CompositeId = s.parse()?;
    Ok((id.parent, id.child))
}

/// Parse a plain numeric identity, naming `expected` on failure.
pub fn parse_numeric(s: &str, expected: &'static str) -> Result<i64, ReconcileError> {
    parse_segment(s).ok_or_else(|| ReconcileError::MalformedIdentity {
        id: s.to_string(),
        expected,
    })
}
