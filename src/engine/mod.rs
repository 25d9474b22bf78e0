mod availability;
mod conflict;
mod error;
mod store;

pub use availability::{free_slots, free_slots_at_least};
pub use conflict::{check_no_conflict, find_conflict, validate_span};
pub use error::EngineError;
pub use store::CalendarStore;

use std::path::Path;

use chrono::{Datelike, NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::inquiry::InquiryLog;
use crate::limits::*;
use crate::model::*;

pub const CALENDAR_FILE: &str = "calendar.json";
pub const INQUIRY_FILE: &str = "inquiries.json";

/// The booking service: the one entry point the tool layer calls.
///
/// Reads go through the calendar's shared lock; every mutation goes through
/// [`CalendarStore::insert`], which owns the check-then-write atomicity.
pub struct Engine {
    calendar: CalendarStore,
    inquiries: InquiryLog,
}

impl Engine {
    /// Open both stores inside `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self, EngineError> {
        Ok(Self::new(
            CalendarStore::open(data_dir.join(CALENDAR_FILE))?,
            InquiryLog::open(data_dir.join(INQUIRY_FILE))?,
        ))
    }

    pub fn new(calendar: CalendarStore, inquiries: InquiryLog) -> Self {
        Self {
            calendar,
            inquiries,
        }
    }

    pub fn calendar(&self) -> &CalendarStore {
        &self.calendar
    }

    pub fn inquiries(&self) -> &InquiryLog {
        &self.inquiries
    }

    pub async fn check_availability(
        &self,
        category: SpaceCategory,
        date: NaiveDate,
        span: Span,
    ) -> Availability {
        let verdict = self
            .calendar
            .read_day(category, date, |bookings| check_no_conflict(bookings, &span))
            .await;
        match verdict {
            Ok(()) => Availability {
                available: true,
                message: format!(
                    "The {} is available on {date} from {} to {}.",
                    category.label(),
                    format_time(span.start),
                    format_time(span.end)
                ),
                conflict: None,
            },
            Err(e) => {
                debug!("{category} {date} {span} unavailable: {e}");
                unavailable(category, date, &e)
            }
        }
    }

    pub async fn get_available_slots(
        &self,
        category: SpaceCategory,
        date: NaiveDate,
        min_duration: Option<Minute>,
    ) -> Vec<Span> {
        self.calendar
            .read_day(category, date, |bookings| {
                free_slots_at_least(bookings, min_duration)
            })
            .await
    }

    /// Reserve `span`. The availability re-check, the insert and the save
    /// happen under one exclusive lock; a concurrent overlapping request
    /// sees this booking and gets `Conflict`.
    pub async fn make_reservation(
        &self,
        category: SpaceCategory,
        date: NaiveDate,
        span: Span,
    ) -> Result<Booking, EngineError> {
        let result = self.calendar.insert(category, date, span).await;
        let outcome = match &result {
            Ok(_) => {
                info!("reserved {category} on {date} {span}");
                "committed"
            }
            Err(e @ EngineError::Conflict { .. }) => {
                warn!("reservation rejected: {category} on {date}: {e}");
                "conflict"
            }
            Err(e) if e.is_recoverable() => {
                debug!("reservation rejected: {category} on {date}: {e}");
                e.kind()
            }
            Err(_) => "persistence",
        };
        metrics::counter!(crate::observability::RESERVATIONS_TOTAL, "outcome" => outcome)
            .increment(1);
        result
    }

    /// Validate and log a contact request. Storage failures degrade to a
    /// warning; only invalid input is an error.
    pub async fn collect_contact(&self, request: ContactRequest) -> Result<String, EngineError> {
        validate_contact(&request)?;
        let inquiry = Inquiry::from_request(request, Utc::now());
        Ok(self.inquiries.append(inquiry).await)
    }

    /// Fill `days` days starting at `from` with the demo booking pattern.
    /// Seeds that collide with existing bookings are skipped. Returns the
    /// number of bookings added.
    pub async fn seed_demo_bookings(&self, from: NaiveDate, days: u32) -> Result<usize, EngineError> {
        if days > MAX_SEED_DAYS {
            return Err(EngineError::Validation(format!(
                "cannot seed more than {MAX_SEED_DAYS} days"
            )));
        }
        let mut added = 0;
        for date in from.iter_days().take(days as usize) {
            for (category, span) in demo_pattern(date) {
                match self.calendar.insert(category, date, span).await {
                    Ok(_) => added += 1,
                    Err(EngineError::Conflict { .. }) => {}
                    Err(e) => return Err(e),
                }
            }
        }
        info!("seeded {added} demo bookings from {from} over {days} days");
        Ok(added)
    }
}

fn unavailable(category: SpaceCategory, date: NaiveDate, reason: &EngineError) -> Availability {
    match reason {
        EngineError::Conflict {
            requested,
            existing,
        } => Availability {
            available: false,
            message: format!(
                "The {} is not available on {date} from {} to {}: it is already booked from {} to {}.",
                category.label(),
                format_time(requested.start),
                format_time(requested.end),
                format_time(existing.start),
                format_time(existing.end)
            ),
            conflict: Some(*existing),
        },
        other => Availability {
            available: false,
            message: format!("The {} cannot be booked: {other}.", category.label()),
            conflict: None,
        },
    }
}

fn validate_contact(request: &ContactRequest) -> Result<(), EngineError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(EngineError::Validation("name is required".into()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(EngineError::Validation("name too long".into()));
    }
    let value = request.contact_value.trim();
    if value.is_empty() {
        return Err(EngineError::Validation("contact value is required".into()));
    }
    if value.len() > MAX_CONTACT_LEN {
        return Err(EngineError::Validation("contact value too long".into()));
    }
    match request.contact_type {
        ContactType::Email => {
            let valid = value
                .split_once('@')
                .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
            if !valid || value.contains(char::is_whitespace) {
                return Err(EngineError::Validation(format!("{value:?} is not an email address")));
            }
        }
        ContactType::Phone => {
            let allowed = value
                .chars()
                .all(|c| c.is_ascii_digit() || " +-()/".contains(c));
            let digits = value.chars().filter(char::is_ascii_digit).count();
            if !allowed || digits < 6 {
                return Err(EngineError::Validation(format!("{value:?} is not a phone number")));
            }
        }
    }
    let requirements_len = serde_json::to_vec(&request.requirements)
        .map(|v| v.len())
        .unwrap_or(usize::MAX);
    if requirements_len > MAX_REQUIREMENTS_BYTES {
        return Err(EngineError::Validation("requirements too large".into()));
    }
    Ok(())
}

/// Alternating daily pattern: even days of the month are busier.
fn demo_pattern(date: NaiveDate) -> Vec<(SpaceCategory, Span)> {
    const H: Minute = 60;
    if date.day() % 2 == 0 {
        vec![
            (SpaceCategory::Hall, Span::new(9 * H, 12 * H)),
            (SpaceCategory::Hall, Span::new(14 * H, 17 * H)),
            (SpaceCategory::MeetingRoom, Span::new(10 * H, 11 * H)),
            (SpaceCategory::MeetingRoom, Span::new(15 * H, 16 * H + 30)),
            (SpaceCategory::Office, Span::new(9 * H, 17 * H)),
        ]
    } else {
        vec![
            (SpaceCategory::Hall, Span::new(13 * H, 18 * H)),
            (SpaceCategory::MeetingRoom, Span::new(9 * H, 10 * H + 30)),
            (SpaceCategory::MeetingRoom, Span::new(14 * H, 15 * H)),
        ]
    }
}
