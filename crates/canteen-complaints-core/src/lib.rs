use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

pub const COMPLAINT_ID_PREFIX: &str = "C";
pub const RESPONSE_ID_PREFIX: &str = "R";

/// Shown in place of a stall name when a complaint points at an unknown stall.
pub const UNKNOWN_STALL_NAME: &str = "ไม่พบร้าน";

const CALENDAR_DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum ComplaintsError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("date error: {0}")]
    Date(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintStatus {
    Pending,
    Resolved,
}

impl ComplaintStatus {
    pub const ALL: [Self; 2] = [Self::Pending, Self::Resolved];

    /// Literal written to and read from the complaint collection.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "รอดำเนินการ",
            Self::Resolved => "ดำเนินการแล้ว",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "รอดำเนินการ" => Some(Self::Pending),
            "ดำเนินการแล้ว" => Some(Self::Resolved),
            _ => None,
        }
    }

    /// Parses a stored status literal.
    ///
    /// # Errors
    /// Returns [`ComplaintsError::Validation`] for any literal other than the
    /// two known statuses.
    pub fn parse_stored(value: &str) -> Result<Self, ComplaintsError> {
        Self::parse(value).ok_or_else(|| {
            ComplaintsError::Validation(format!("unknown complaint status {value:?}"))
        })
    }
}

impl Display for ComplaintStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// A `YYYY-MM-DD` date exactly as stored.
///
/// The text is kept verbatim so rewritten collections reproduce it byte for
/// byte; it is only parsed when an operation orders records by it.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(transparent)]
pub struct CalendarDate(String);

impl CalendarDate {
    #[must_use]
    pub fn from_stored(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Formats a calendar date as `YYYY-MM-DD`.
    ///
    /// # Errors
    /// Returns [`ComplaintsError::Date`] when formatting fails.
    pub fn from_date(date: Date) -> Result<Self, ComplaintsError> {
        format_calendar_date(date).map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses the stored text.
    ///
    /// # Errors
    /// Returns [`ComplaintsError::Date`] when the stored text is not a valid
    /// `YYYY-MM-DD` date.
    pub fn to_date(&self) -> Result<Date, ComplaintsError> {
        parse_calendar_date(&self.0)
    }
}

impl Display for CalendarDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Canteen {
    pub canteen_id: String,
    pub canteen_name: String,
    pub location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Stall {
    pub stall_id: String,
    pub canteen_id: String,
    pub stall_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Complaint {
    pub complaint_id: String,
    pub stall_id: String,
    pub complaint_date: CalendarDate,
    pub problem_type: String,
    pub complaint_description: String,
    pub status: ComplaintStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Response {
    pub response_id: String,
    pub complaint_id: String,
    pub response_date: CalendarDate,
    pub response_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StallSummary {
    pub stall_id: String,
    pub stall_name: String,
    pub total_count: usize,
    pub pending_count: usize,
    pub resolved_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanteenSummary {
    pub canteen_id: String,
    pub canteen_name: String,
    pub location: String,
    pub total_count: usize,
}

/// One row of the complaint list: a complaint joined with its stall name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComplaintListing {
    pub complaint_id: String,
    pub stall_id: String,
    pub stall_name: String,
    pub complaint_date: CalendarDate,
    pub problem_type: String,
    pub status: ComplaintStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComplaintFilter {
    All,
    Stall(String),
    Status(ComplaintStatus),
}

impl ComplaintFilter {
    #[must_use]
    pub fn matches(&self, complaint: &Complaint) -> bool {
        match self {
            Self::All => true,
            Self::Stall(stall_id) => complaint.stall_id == *stall_id,
            Self::Status(status) => complaint.status == *status,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChangeEvent {
    ComplaintsUpdated,
    ComplaintDetailUpdated,
    ResponsesUpdated,
}

impl ChangeEvent {
    pub const ALL: [Self; 3] = [
        Self::ComplaintsUpdated,
        Self::ComplaintDetailUpdated,
        Self::ResponsesUpdated,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ComplaintsUpdated => "complaints_updated",
            Self::ComplaintDetailUpdated => "complaint_detail_updated",
            Self::ResponsesUpdated => "responses_updated",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "complaints_updated" => Some(Self::ComplaintsUpdated),
            "complaint_detail_updated" => Some(Self::ComplaintDetailUpdated),
            "responses_updated" => Some(Self::ResponsesUpdated),
            _ => None,
        }
    }
}

impl Display for ChangeEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Rejects blank values for a required field.
///
/// # Errors
/// Returns [`ComplaintsError::Validation`] when `value` is empty or only
/// whitespace.
pub fn require_present(field: &str, value: &str) -> Result<(), ComplaintsError> {
    if value.trim().is_empty() {
        return Err(ComplaintsError::Validation(format!(
            "{field} MUST be provided"
        )));
    }
    Ok(())
}

/// Allocates the next `<prefix><NNN>` identifier for a collection.
///
/// The sequence is one past the larger of the collection size and the
/// highest numeric suffix already carrying `prefix`, so an id that is
/// present in `existing` is never handed out again.
#[must_use]
pub fn next_sequential_id<'a, I>(prefix: &str, existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut count = 0_u64;
    let mut highest = 0_u64;

    for id in existing {
        count += 1;
        if let Some(sequence) = id.strip_prefix(prefix).and_then(parse_sequence) {
            highest = highest.max(sequence);
        }
    }

    let next = highest.max(count).saturating_add(1);
    format!("{prefix}{next:03}")
}

fn parse_sequence(digits: &str) -> Option<u64> {
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Orders complaints newest first. Complaints sharing a date keep their
/// stored relative order.
///
/// # Errors
/// Returns [`ComplaintsError::Date`] when any complaint date is malformed;
/// nothing is returned in that case.
pub fn sort_by_recency(complaints: Vec<Complaint>) -> Result<Vec<Complaint>, ComplaintsError> {
    sort_by_date(complaints, |complaint| &complaint.complaint_date, true)
}

/// Orders responses oldest first, keeping stored order for equal dates.
///
/// # Errors
/// Returns [`ComplaintsError::Date`] when any response date is malformed.
pub fn sort_chronologically(responses: Vec<Response>) -> Result<Vec<Response>, ComplaintsError> {
    sort_by_date(responses, |response| &response.response_date, false)
}

fn sort_by_date<T, F>(items: Vec<T>, date_of: F, newest_first: bool) -> Result<Vec<T>, ComplaintsError>
where
    F: Fn(&T) -> &CalendarDate,
{
    let mut keyed = items
        .into_iter()
        .map(|item| date_of(&item).to_date().map(|date| (date, item)))
        .collect::<Result<Vec<_>, _>>()?;

    // sort_by is stable, which is what keeps ties in stored order.
    if newest_first {
        keyed.sort_by(|lhs, rhs| rhs.0.cmp(&lhs.0));
    } else {
        keyed.sort_by(|lhs, rhs| lhs.0.cmp(&rhs.0));
    }

    Ok(keyed.into_iter().map(|(_, item)| item).collect())
}

/// Per-stall complaint counts, busiest stall first.
///
/// Every stall appears exactly once, including stalls nobody complained
/// about. Complaints naming an unknown stall are not counted anywhere.
#[must_use]
pub fn summarize_stalls(stalls: &[Stall], complaints: &[Complaint]) -> Vec<StallSummary> {
    let mut summaries: Vec<StallSummary> = Vec::with_capacity(stalls.len());
    let mut index_by_id: HashMap<&str, usize> = HashMap::with_capacity(stalls.len());

    for stall in stalls {
        if index_by_id.contains_key(stall.stall_id.as_str()) {
            continue;
        }
        index_by_id.insert(stall.stall_id.as_str(), summaries.len());
        summaries.push(StallSummary {
            stall_id: stall.stall_id.clone(),
            stall_name: stall.stall_name.clone(),
            total_count: 0,
            pending_count: 0,
            resolved_count: 0,
        });
    }

    for complaint in complaints {
        let Some(&index) = index_by_id.get(complaint.stall_id.as_str()) else {
            continue;
        };
        let summary = &mut summaries[index];
        summary.total_count += 1;
        match complaint.status {
            ComplaintStatus::Pending => summary.pending_count += 1,
            ComplaintStatus::Resolved => summary.resolved_count += 1,
        }
    }

    summaries.sort_by(|lhs, rhs| rhs.total_count.cmp(&lhs.total_count));
    summaries
}

/// Per-canteen complaint counts, busiest canteen first.
///
/// A complaint is attributed through its stall to the stall's canteen; if
/// either link is missing the complaint is skipped.
#[must_use]
pub fn summarize_canteens(
    canteens: &[Canteen],
    stalls: &[Stall],
    complaints: &[Complaint],
) -> Vec<CanteenSummary> {
    let mut summaries: Vec<CanteenSummary> = Vec::with_capacity(canteens.len());
    let mut index_by_id: HashMap<&str, usize> = HashMap::with_capacity(canteens.len());

    for canteen in canteens {
        if index_by_id.contains_key(canteen.canteen_id.as_str()) {
            continue;
        }
        index_by_id.insert(canteen.canteen_id.as_str(), summaries.len());
        summaries.push(CanteenSummary {
            canteen_id: canteen.canteen_id.clone(),
            canteen_name: canteen.canteen_name.clone(),
            location: canteen.location.clone(),
            total_count: 0,
        });
    }

    let mut canteen_by_stall: HashMap<&str, &str> = HashMap::with_capacity(stalls.len());
    for stall in stalls {
        canteen_by_stall
            .entry(stall.stall_id.as_str())
            .or_insert(stall.canteen_id.as_str());
    }

    for complaint in complaints {
        let Some(canteen_id) = canteen_by_stall.get(complaint.stall_id.as_str()) else {
            continue;
        };
        if let Some(&index) = index_by_id.get(canteen_id) {
            summaries[index].total_count += 1;
        }
    }

    summaries.sort_by(|lhs, rhs| rhs.total_count.cmp(&lhs.total_count));
    summaries
}

/// Joins already-ordered complaints with their stall names.
#[must_use]
pub fn list_complaints(ordered: &[Complaint], stalls: &[Stall]) -> Vec<ComplaintListing> {
    ordered
        .iter()
        .map(|complaint| ComplaintListing {
            complaint_id: complaint.complaint_id.clone(),
            stall_id: complaint.stall_id.clone(),
            stall_name: stall_name_or_placeholder(stalls, &complaint.stall_id),
            complaint_date: complaint.complaint_date.clone(),
            problem_type: complaint.problem_type.clone(),
            status: complaint.status,
        })
        .collect()
}

#[must_use]
pub fn stall_name_or_placeholder(stalls: &[Stall], stall_id: &str) -> String {
    stalls
        .iter()
        .find(|stall| stall.stall_id == stall_id)
        .map_or_else(|| UNKNOWN_STALL_NAME.to_string(), |stall| stall.stall_name.clone())
}

/// Parses a strict `YYYY-MM-DD` date.
///
/// # Errors
/// Returns [`ComplaintsError::Date`] when the input does not match.
pub fn parse_calendar_date(value: &str) -> Result<Date, ComplaintsError> {
    Date::parse(value, CALENDAR_DATE_FORMAT)
        .map_err(|err| ComplaintsError::Date(format!("invalid date {value:?}: {err}")))
}

/// Formats a date as `YYYY-MM-DD`.
///
/// # Errors
/// Returns [`ComplaintsError::Date`] when formatting fails.
pub fn format_calendar_date(date: Date) -> Result<String, ComplaintsError> {
    date.format(CALENDAR_DATE_FORMAT)
        .map_err(|err| ComplaintsError::Date(format!("failed to format date: {err}")))
}

/// Today's date in the local offset, falling back to UTC when the local
/// offset cannot be determined.
#[must_use]
pub fn today() -> Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}
