//! Booking record recognition in completed AI turns.
//!
//! The AI is prompted to end an information-gathering turn with the literal
//! marker `BOOKING:` followed by a single JSON object. The object must run to
//! the end of the turn text; anything else is treated as malformed.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Marker that introduces the booking object in AI text.
pub const BOOKING_MARKER: &str = "BOOKING:";

/// A booking recognized from one completed AI turn.
///
/// `start` and `end` are kept verbatim as RFC 3339 strings after validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub job: String,
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub emergency: bool,
}

/// Reasons a marked booking could not be recognized.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Booking marker present but no object follows it")]
    MissingPayload,

    #[error("Malformed booking object: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid {field} timestamp '{value}': {reason}")]
    InvalidTimestamp {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Booking ends before it starts ({start} > {end})")]
    EndBeforeStart { start: String, end: String },
}

/// Scan the text of a completed turn for a booking.
///
/// Returns `Ok(None)` when the marker is absent. When the marker is present the
/// object after it must parse completely, or an error is returned and no record
/// is produced.
pub fn extract_booking(turn_text: &str) -> Result<Option<BookingRecord>, BookingError> {
    let Some(position) = turn_text.find(BOOKING_MARKER) else {
        return Ok(None);
    };

    let payload = turn_text[position + BOOKING_MARKER.len()..].trim();
    if payload.is_empty() {
        return Err(BookingError::MissingPayload);
    }

    let record: BookingRecord = serde_json::from_str(payload)?;
    let start = parse_timestamp("start", &record.start)?;
    let end = parse_timestamp("end", &record.end)?;
    if end < start {
        return Err(BookingError::EndBeforeStart {
            start: record.start,
            end: record.end,
        });
    }

    Ok(Some(record))
}

fn parse_timestamp(field: &'static str, value: &str) -> Result<OffsetDateTime, BookingError> {
    OffsetDateTime::parse(value, &Rfc3339).map_err(|e| BookingError::InvalidTimestamp {
        field,
        value: value.to_string(),
        reason: e.to_string(),
    })
}
