use crate::limits::{CLOSE, OPEN};
use crate::model::*;

use super::EngineError;

/// Reject malformed spans and spans reaching outside business hours.
pub fn validate_span(span: &Span) -> Result<(), EngineError> {
    if span.start >= span.end {
        return Err(EngineError::Validation(format!(
            "start time {} must be before end time {}",
            format_time(span.start),
            format_time(span.end)
        )));
    }
    if span.start < OPEN || span.end > CLOSE {
        return Err(EngineError::Validation(format!(
            "{span} is outside business hours {}-{}",
            format_time(OPEN),
            format_time(CLOSE)
        )));
    }
    Ok(())
}

/// First existing booking that overlaps `span`, if any.
///
/// `bookings` is sorted by start, so the scan stops at the first booking
/// starting at or after `span.end`. Touching endpoints are not overlaps.
pub fn find_conflict(bookings: &[Span], span: &Span) -> Option<Span> {
    bookings
        .iter()
        .take_while(|b| b.start < span.end)
        .find(|b| b.overlaps(span))
        .copied()
}

/// Full admission check for one (category, date): hours first, then overlap.
pub fn check_no_conflict(bookings: &[Span], span: &Span) -> Result<(), EngineError> {
    validate_span(span)?;
    match find_conflict(bookings, span) {
        Some(existing) => Err(EngineError::Conflict {
            requested: *span,
            existing,
        }),
        None => Ok(()),
    }
}

/// Verify a day loaded from storage: every span valid and no two overlapping.
/// Sorts in place so the rest of the engine can rely on order.
pub(crate) fn validate_day(day: &mut DayBookings) -> Result<(), String> {
    day.sort();
    for span in day.as_slice() {
        validate_span(span).map_err(|e| e.to_string())?;
    }
    for pair in day.as_slice().windows(2) {
        if pair[0].overlaps(&pair[1]) {
            return Err(format!("bookings {} and {} overlap", pair[0], pair[1]));
        }
    }
    Ok(())
}
