use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ulid::Ulid;

use crate::engine::EngineError;
use crate::limits::{CLOSE, OPEN};

/// Minutes since midnight, the only time-of-day type.
pub type Minute = u16;

/// The kinds of space that can be reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpaceCategory {
    Hall,
    MeetingRoom,
    Office,
    Flexdesk,
}

impl SpaceCategory {
    pub const ALL: [SpaceCategory; 4] = [
        SpaceCategory::Hall,
        SpaceCategory::MeetingRoom,
        SpaceCategory::Office,
        SpaceCategory::Flexdesk,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SpaceCategory::Hall => "hall",
            SpaceCategory::MeetingRoom => "meeting_room",
            SpaceCategory::Office => "office",
            SpaceCategory::Flexdesk => "flexdesk",
        }
    }

    /// Human-readable name used in outcome messages.
    pub fn label(&self) -> &'static str {
        match self {
            SpaceCategory::Hall => "hall",
            SpaceCategory::MeetingRoom => "meeting room",
            SpaceCategory::Office => "office",
            SpaceCategory::Flexdesk => "flexdesk",
        }
    }
}

impl fmt::Display for SpaceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpaceCategory {
    type Err = EngineError;

    /// Accepts the wire name plus the spaced/hyphenated spellings a caller
    /// may echo back from a message ("meeting room", "Meeting-Room").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        SpaceCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| EngineError::NotFound(s.trim().to_string()))
    }
}

// ── Time of day ──────────────────────────────────────────────────

pub fn parse_time(s: &str) -> Result<Minute, EngineError> {
    let t = NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map_err(|_| EngineError::Validation(format!("invalid time {s:?}, expected HH:MM")))?;
    Ok((t.hour() * 60 + t.minute()) as Minute)
}

pub fn format_time(m: Minute) -> String {
    format!("{:02}:{:02}", m / 60, m % 60)
}

pub fn parse_date(s: &str) -> Result<NaiveDate, EngineError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| EngineError::Validation(format!("invalid date {s:?}, expected YYYY-MM-DD")))
}

/// Half-open interval `[start, end)` on a single date.
///
/// Stored and sent on the wire as a `["HH:MM", "HH:MM"]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "(String, String)", try_from = "(String, String)")]
pub struct Span {
    pub start: Minute,
    pub end: Minute,
}

impl Span {
    pub fn new(start: Minute, end: Minute) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    /// Parse a pair of `HH:MM` strings. Rejects `start >= end`; business hours
    /// are checked separately so the caller gets the more specific reason.
    pub fn parse(start: &str, end: &str) -> Result<Self, EngineError> {
        let s = parse_time(start)?;
        let e = parse_time(end)?;
        if s >= e {
            return Err(EngineError::Validation(format!(
                "start time {} must be before end time {}",
                format_time(s),
                format_time(e)
            )));
        }
        Ok(Self { start: s, end: e })
    }

    pub fn business_hours() -> Self {
        Self::new(OPEN, CLOSE)
    }

    pub fn duration(&self) -> Minute {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", format_time(self.start), format_time(self.end))
    }
}

impl From<Span> for (String, String) {
    fn from(span: Span) -> Self {
        (format_time(span.start), format_time(span.end))
    }
}

impl TryFrom<(String, String)> for Span {
    type Error = EngineError;

    fn try_from((start, end): (String, String)) -> Result<Self, Self::Error> {
        Span::parse(&start, &end)
    }
}

// ── Calendar ─────────────────────────────────────────────────────

/// Bookings for one (category, date), sorted by start and mutually non-overlapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayBookings {
    spans: Vec<Span>,
}

impl DayBookings {
    pub fn as_slice(&self) -> &[Span] {
        &self.spans
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Insert maintaining sort order by start. Returns the position used,
    /// so a failed persist can undo exactly this insert.
    pub fn insert(&mut self, span: Span) -> usize {
        let pos = self.spans.partition_point(|s| s.start < span.start);
        self.spans.insert(pos, span);
        pos
    }

    pub fn remove_at(&mut self, pos: usize) -> Span {
        self.spans.remove(pos)
    }

    pub(crate) fn sort(&mut self) {
        self.spans.sort();
    }
}

/// `category -> date -> bookings`. Every known category is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Calendar {
    categories: BTreeMap<SpaceCategory, BTreeMap<NaiveDate, DayBookings>>,
}

impl Default for Calendar {
    fn default() -> Self {
        Self::new()
    }
}

impl Calendar {
    pub fn new() -> Self {
        let mut calendar = Self {
            categories: BTreeMap::new(),
        };
        calendar.fill_missing_categories();
        calendar
    }

    pub fn day(&self, category: SpaceCategory, date: NaiveDate) -> &[Span] {
        self.categories
            .get(&category)
            .and_then(|days| days.get(&date))
            .map(DayBookings::as_slice)
            .unwrap_or(&[])
    }

    pub fn day_mut(&mut self, category: SpaceCategory, date: NaiveDate) -> &mut DayBookings {
        self.categories
            .entry(category)
            .or_default()
            .entry(date)
            .or_default()
    }

    /// Drop an empty date key so the file never accumulates `"date": []` entries.
    pub fn prune_day(&mut self, category: SpaceCategory, date: NaiveDate) {
        if let Some(days) = self.categories.get_mut(&category)
            && days.get(&date).is_some_and(DayBookings::is_empty)
        {
            days.remove(&date);
        }
    }

    pub fn booking_count(&self) -> usize {
        self.categories
            .values()
            .flat_map(|days| days.values())
            .map(DayBookings::len)
            .sum()
    }

    pub(crate) fn fill_missing_categories(&mut self) {
        for category in SpaceCategory::ALL {
            self.categories.entry(category).or_default();
        }
    }

    pub(crate) fn days_mut(
        &mut self,
    ) -> impl Iterator<Item = (SpaceCategory, NaiveDate, &mut DayBookings)> {
        self.categories.iter_mut().flat_map(|(category, days)| {
            days.iter_mut().map(move |(date, day)| (*category, *date, day))
        })
    }
}

/// A committed reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Booking {
    pub category: SpaceCategory,
    pub date: NaiveDate,
    pub span: Span,
}

// ── Availability outcome ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub available: bool,
    pub message: String,
    /// The existing booking that blocks the request, if that is the reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict: Option<Span>,
}

// ── Inquiries ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactType {
    Email,
    Phone,
}

impl FromStr for ContactType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" | "e-mail" => Ok(ContactType::Email),
            "phone" | "telephone" => Ok(ContactType::Phone),
            other => Err(EngineError::Validation(format!(
                "unknown contact type {other:?}, expected email or phone"
            ))),
        }
    }
}

/// Input to `collect_contact`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactRequest {
    pub name: String,
    pub contact_type: ContactType,
    pub contact_value: String,
    pub space_type: SpaceCategory,
    pub requirements: Map<String, Value>,
}

/// A logged contact/requirements submission. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inquiry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Ulid>,
    pub timestamp: DateTime<Utc>,
    pub name: String,
    pub contact_type: ContactType,
    pub contact_value: String,
    pub space_type: SpaceCategory,
    #[serde(default)]
    pub requirements: Map<String, Value>,
}

impl Inquiry {
    pub fn from_request(req: ContactRequest, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Some(Ulid::new()),
            timestamp,
            name: req.name,
            contact_type: req.contact_type,
            contact_value: req.contact_value,
            space_type: req.space_type,
            requirements: req.requirements,
        }
    }
}
