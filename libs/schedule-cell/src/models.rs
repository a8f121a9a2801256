use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate, NaiveTime};
use std::fmt;

/// A bookable time unit on the doctor's calendar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSlot {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: SlotStatus,
    pub consultation_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Available,
    Booked,
    Blocked,
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotStatus::Available => write!(f, "available"),
            SlotStatus::Booked => write!(f, "booked"),
            SlotStatus::Blocked => write!(f, "blocked"),
        }
    }
}

/// Half-open interval overlap on the same calendar day.
pub fn intervals_overlap(
    a_start: NaiveTime,
    a_end: NaiveTime,
    b_start: NaiveTime,
    b_end: NaiveTime,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Candidate windows stepped from `day_start`, dropping any partial slot
/// that would run past `day_end`.
pub fn generate_slot_windows(
    day_start: NaiveTime,
    day_end: NaiveTime,
    slot_minutes: i64,
) -> Vec<(NaiveTime, NaiveTime)> {
    let mut windows = Vec::new();
    if slot_minutes <= 0 || day_start >= day_end {
        return windows;
    }

    let step = chrono::Duration::minutes(slot_minutes);
    let mut cursor = day_start;

    loop {
        let end = cursor + step;
        // `+` wraps past midnight, so guard on both bounds
        if end > day_end || end <= cursor {
            break;
        }
        windows.push((cursor, end));
        cursor = end;
    }

    windows
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateSlotsRequest {
    pub date: NaiveDate,
    pub day_start: NaiveTime,
    pub day_end: NaiveTime,
    pub slot_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSlotRequest {
    pub consultation_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub status: Option<SlotStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum ScheduleError {
    #[error("Slot not found")]
    NotFound,

    #[error("Slot is not available")]
    SlotUnavailable,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_generate_full_morning() {
        let windows = generate_slot_windows(t(8, 0), t(12, 0), 30);
        assert_eq!(windows.len(), 8);
        assert_eq!(windows[0], (t(8, 0), t(8, 30)));
        assert_eq!(windows[7], (t(11, 30), t(12, 0)));
    }

    #[test]
    fn test_partial_trailing_slot_dropped() {
        // 8:00-9:50 with 45-minute slots: 8:00 and 8:45 fit, 9:30 does not
        let windows = generate_slot_windows(t(8, 0), t(9, 50), 45);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[1], (t(8, 45), t(9, 30)));
    }

    #[test]
    fn test_degenerate_inputs_yield_nothing() {
        assert!(generate_slot_windows(t(12, 0), t(8, 0), 30).is_empty());
        assert!(generate_slot_windows(t(8, 0), t(12, 0), 0).is_empty());
        assert!(generate_slot_windows(t(8, 0), t(12, 0), -15).is_empty());
    }

    #[test]
    fn test_overlap_predicate() {
        assert!(intervals_overlap(t(9, 0), t(10, 0), t(9, 30), t(10, 30)));
        assert!(intervals_overlap(t(9, 0), t(10, 0), t(8, 0), t(11, 0)));
        // Touching boundaries do not overlap
        assert!(!intervals_overlap(t(9, 0), t(10, 0), t(10, 0), t(11, 0)));
        assert!(!intervals_overlap(t(9, 0), t(10, 0), t(8, 0), t(9, 0)));
    }

    #[test]
    fn test_windows_never_cross_midnight() {
        let windows = generate_slot_windows(t(23, 0), t(23, 59), 30);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0], (t(23, 0), t(23, 30)));
    }
}
