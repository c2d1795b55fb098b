//! # Temporal Types — Second-Precision Emission Timestamps
//!
//! Defines `Timestamp`, the emission-time type rendered into documents. The
//! remote profile accepts `YYYY-MM-DDTHH:MM:SS` with no offset and no
//! fractional seconds; a fractional part is a structural rejection.
//!
//! Timestamps are truncated to seconds at construction, so a `Timestamp`
//! can never render a sub-second component. The free functions
//! [`fraction_digits()`] and [`truncate_subsecond()`] operate on text already
//! present in a tree, for the validator and the correction step.

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EdocError;

/// Rendering format for emission timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A naive wall-clock timestamp at seconds precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(NaiveDateTime);

impl Timestamp {
    /// Current UTC wall-clock time, truncated.
    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    /// From a UTC datetime, discarding sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self::from_naive(dt.naive_utc())
    }

    /// From a naive datetime, discarding sub-seconds.
    pub fn from_naive(dt: NaiveDateTime) -> Self {
        Self(dt.with_nanosecond(0).unwrap_or(dt))
    }

    /// Parse `YYYY-MM-DDTHH:MM:SS`. Fractional seconds are rejected rather
    /// than silently truncated.
    pub fn parse(s: &str) -> Result<Self, EdocError> {
        if fraction_digits(s).is_some() {
            return Err(EdocError::Timestamp {
                value: s.to_string(),
                reason: "fractional seconds are not accepted".to_string(),
            });
        }
        let dt = NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).map_err(|e| {
            EdocError::Timestamp {
                value: s.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self(dt))
    }

    /// Access the inner datetime.
    pub fn as_naive(&self) -> &NaiveDateTime {
        &self.0
    }

    /// Render in the document format.
    pub fn to_document_string(&self) -> String {
        self.0.format(TIMESTAMP_FORMAT).to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_document_string())
    }
}

/// Number of fractional-second digits in a timestamp string, or `None` if
/// the text is not a timestamp with a fractional part.
///
/// Only text that parses as a full datetime counts, so amounts such as
/// `"100.50"` are never mistaken for timestamps.
pub fn fraction_digits(text: &str) -> Option<usize> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    let (_, fraction) = text.rsplit_once('.')?;
    let digits = fraction.chars().take_while(char::is_ascii_digit).count();
    (digits > 0).then_some(digits)
}

/// Drop the fractional-second part of a timestamp string. Returns `None` if
/// there is nothing to truncate.
pub fn truncate_subsecond(text: &str) -> Option<String> {
    fraction_digits(text)?;
    let dt = NaiveDateTime::parse_from_str(text.trim(), "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Some(Timestamp::from_naive(dt).to_document_string())
}
