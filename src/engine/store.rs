use std::path::PathBuf;

use chrono::NaiveDate;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::model::*;
use crate::snapshot;

use super::EngineError;
use super::conflict::{check_no_conflict, validate_day};

/// Durable calendar: the only owner and the only writer of booking state.
///
/// A single `RwLock` guards the whole calendar. Writers hold it exclusively
/// across check + insert + save, so a check can never go stale before its
/// insert lands; readers share it and always see a committed state.
pub struct CalendarStore {
    path: PathBuf,
    calendar: RwLock<Calendar>,
}

impl CalendarStore {
    /// Load the calendar at `path`, or start empty if the file does not exist.
    ///
    /// A file that cannot be read, does not parse, names an unknown category,
    /// or holds overlapping or out-of-hours bookings is an error: starting
    /// from an empty calendar instead would silently allow double-booking.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let path = path.into();
        let mut calendar: Calendar = snapshot::read_json(&path)
            .map_err(|e| EngineError::persistence(&path, e))?
            .unwrap_or_default();
        calendar.fill_missing_categories();

        for (category, date, day) in calendar.days_mut() {
            validate_day(day).map_err(|reason| {
                EngineError::persistence(&path, format!("{category} on {date}: {reason}"))
            })?;
        }

        info!(
            "calendar loaded from {} ({} bookings)",
            path.display(),
            calendar.booking_count()
        );
        Ok(Self {
            path,
            calendar: RwLock::new(calendar),
        })
    }

    /// Booked spans for one (category, date), in start order.
    pub async fn bookings(&self, category: SpaceCategory, date: NaiveDate) -> Vec<Span> {
        self.calendar.read().await.day(category, date).to_vec()
    }

    /// Run `f` over one day's bookings under the shared lock.
    pub async fn read_day<R>(
        &self,
        category: SpaceCategory,
        date: NaiveDate,
        f: impl FnOnce(&[Span]) -> R,
    ) -> R {
        let guard = self.calendar.read().await;
        f(guard.day(category, date))
    }

    /// Consistent copy of the whole calendar.
    pub async fn snapshot(&self) -> Calendar {
        self.calendar.read().await.clone()
    }

    /// Guarded write: validate, check overlap against the current state,
    /// insert, save. Returns only once the booking is durable.
    ///
    /// If the save fails the insert is undone before the lock is released,
    /// so memory never holds a booking that is not on disk. A save error
    /// means the file was not replaced.
    pub async fn insert(
        &self,
        category: SpaceCategory,
        date: NaiveDate,
        span: Span,
    ) -> Result<Booking, EngineError> {
        let mut guard = self.calendar.write().await;

        check_no_conflict(guard.day(category, date), &span)?;

        let pos = guard.day_mut(category, date).insert(span);
        if let Err(e) = snapshot::write_json_atomic(&self.path, &*guard) {
            guard.day_mut(category, date).remove_at(pos);
            guard.prune_day(category, date);
            error!(
                "failed to persist {category} {date} {span}, rolled back: {e}"
            );
            return Err(EngineError::persistence(&self.path, e));
        }

        Ok(Booking {
            category,
            date,
            span,
        })
    }
}
