//! Recurring calendar dates and desired-state computation.
//!
//! A meatball day is a month/day pair with no year. All "today" comparisons
//! use a single deployment-wide reference timezone (UTC); there is no
//! per-user timezone handling.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use thiserror::Error;

use polpetta_store::MeatballDay;

/// Input format for meatball days, shown in replies.
pub const DAY_FORMAT: &str = "MM-DD";

/// Example input in [`DAY_FORMAT`], shown in replies (2nd January).
pub const DAY_EXAMPLE: &str = "01-02";

/// A recurring month/day. Ordering is month-then-day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthDay {
    month: u8,
    day: u8,
}

/// A month/day pair that doesn't name a real calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidMonthDay {
    /// Month outside 1..=12.
    #[error("month {0} is out of range (1-12)")]
    MonthOutOfRange(u8),

    /// Day outside the month's range. Feb 29 is accepted: a recurring date
    /// may fall on the leap day.
    #[error("day {day} is out of range for month {month}")]
    DayOutOfRange { month: u8, day: u8 },

    /// Input not in `MM-DD` form.
    #[error("expected {DAY_FORMAT} format, e.g. {DAY_EXAMPLE}")]
    Format,
}

/// Days in each month for recurring-date validation (Feb 29 allowed).
fn days_in_month(month: u8) -> u8 {
    match month {
        2 => 29,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

fn month_name(month: u8) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        _ => "December",
    }
}

impl MonthDay {
    /// Validate a month/day pair.
    pub fn new(month: u8, day: u8) -> Result<Self, InvalidMonthDay> {
        if !(1..=12).contains(&month) {
            return Err(InvalidMonthDay::MonthOutOfRange(month));
        }
        if day < 1 || day > days_in_month(month) {
            return Err(InvalidMonthDay::DayOutOfRange { month, day });
        }
        Ok(Self { month, day })
    }

    /// Parse `MM-DD` input.
    pub fn parse(input: &str) -> Result<Self, InvalidMonthDay> {
        let (month, day) = input.trim().split_once('-').ok_or(InvalidMonthDay::Format)?;
        let month: u8 = month.parse().map_err(|_| InvalidMonthDay::Format)?;
        let day: u8 = day.parse().map_err(|_| InvalidMonthDay::Format)?;
        Self::new(month, day)
    }

    /// The month/day of the given instant, in UTC.
    pub fn from_utc(at: DateTime<Utc>) -> Self {
        Self {
            month: at.month() as u8,
            day: at.day() as u8,
        }
    }

    /// Today's month/day in the deployment reference timezone (UTC).
    pub fn today() -> Self {
        Self::from_utc(Utc::now())
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn day(&self) -> u8 {
        self.day
    }

    /// Whether the given record falls on this month/day.
    pub fn matches(&self, record: &MeatballDay) -> bool {
        record.month == self.month && record.day == self.day
    }
}

impl fmt::Display for MonthDay {
    /// Human format used in replies, e.g. "January 2".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", month_name(self.month), self.day)
    }
}

/// Human format for a stored record's month/day, e.g. "December 25".
pub fn pretty_day(record: &MeatballDay) -> String {
    format!("{} {}", month_name(record.month), record.day)
}

/// The desired set: user ids whose stored day is exactly `today`.
pub fn members_with_day(records: &[MeatballDay], today: MonthDay) -> HashSet<String> {
    records
        .iter()
        .filter(|r| today.matches(r))
        .map(|r| r.user_id.clone())
        .collect()
}

/// The next upcoming record: the earliest (month, day) that is on or after
/// `today`, wrapping to the earliest record overall when every date has
/// already passed this year.
pub fn next_upcoming(records: &[MeatballDay], today: MonthDay) -> Option<MeatballDay> {
    let mut sorted: Vec<&MeatballDay> = records.iter().collect();
    sorted.sort_by_key(|r| (r.month, r.day));

    sorted
        .iter()
        .find(|r| (r.month, r.day) >= (today.month, today.day))
        .or_else(|| sorted.first())
        .map(|r| (*r).clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(user: &str, month: u8, day: u8) -> MeatballDay {
        MeatballDay {
            guild_id: "g".to_string(),
            user_id: user.to_string(),
            month,
            day,
        }
    }

    fn month_day(month: u8, day: u8) -> MonthDay {
        MonthDay::new(month, day).unwrap()
    }

    #[test]
    fn test_new_validates_month() {
        assert!(MonthDay::new(0, 1).is_err());
        assert!(MonthDay::new(13, 1).is_err());
        assert!(MonthDay::new(1, 1).is_ok());
        assert!(MonthDay::new(12, 31).is_ok());
    }

    #[test]
    fn test_new_validates_day_per_month() {
        assert!(MonthDay::new(1, 0).is_err());
        assert!(MonthDay::new(1, 32).is_err());
        assert!(MonthDay::new(4, 31).is_err());
        assert!(MonthDay::new(4, 30).is_ok());
        // Feb 29 is a valid recurring date; Feb 30 is not.
        assert!(MonthDay::new(2, 29).is_ok());
        assert!(MonthDay::new(2, 30).is_err());
    }

    #[test]
    fn test_parse() {
        assert_eq!(MonthDay::parse("01-02").unwrap(), month_day(1, 2));
        assert_eq!(MonthDay::parse("12-25").unwrap(), month_day(12, 25));
        assert_eq!(MonthDay::parse(" 07-20 ").unwrap(), month_day(7, 20));
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        for input in ["", "0102", "1-2-3", "ab-cd", "1/2", "--"] {
            assert_eq!(MonthDay::parse(input), Err(InvalidMonthDay::Format), "{input:?}");
        }
        // Well-formed but not a date.
        assert!(matches!(
            MonthDay::parse("02-30"),
            Err(InvalidMonthDay::DayOutOfRange { .. })
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(month_day(1, 2).to_string(), "January 2");
        assert_eq!(month_day(12, 25).to_string(), "December 25");
        assert_eq!(pretty_day(&record("u", 2, 29)), "February 29");
    }

    #[test]
    fn test_ordering_is_month_then_day() {
        assert!(month_day(1, 30) < month_day(2, 1));
        assert!(month_day(3, 10) < month_day(3, 11));
        assert_eq!(month_day(6, 6), month_day(6, 6));
    }

    #[test]
    fn test_members_with_day_exact_match_only() {
        let records = vec![record("a", 12, 25), record("b", 12, 24), record("c", 12, 25)];

        let desired = members_with_day(&records, month_day(12, 25));
        assert_eq!(desired.len(), 2);
        assert!(desired.contains("a"));
        assert!(desired.contains("c"));

        assert!(members_with_day(&records, month_day(1, 1)).is_empty());
    }

    #[test]
    fn test_members_with_day_leap_day_boundary() {
        let records = vec![record("leap", 2, 29)];

        assert!(members_with_day(&records, month_day(2, 29)).contains("leap"));
        assert!(members_with_day(&records, month_day(3, 1)).is_empty());
        assert!(members_with_day(&records, month_day(2, 28)).is_empty());
    }

    #[test]
    fn test_next_upcoming_picks_first_on_or_after_today() {
        let records = vec![record("a", 3, 10), record("b", 1, 5), record("c", 7, 20)];

        let next = next_upcoming(&records, month_day(4, 1)).unwrap();
        assert_eq!((next.month, next.day), (7, 20));
    }

    #[test]
    fn test_next_upcoming_wraps_when_all_passed() {
        let records = vec![record("a", 3, 10), record("b", 1, 5), record("c", 7, 20)];

        let next = next_upcoming(&records, month_day(8, 1)).unwrap();
        assert_eq!((next.month, next.day), (1, 5));
    }

    #[test]
    fn test_next_upcoming_today_counts_as_upcoming() {
        let records = vec![record("a", 3, 10), record("b", 6, 1)];

        let next = next_upcoming(&records, month_day(3, 10)).unwrap();
        assert_eq!((next.month, next.day), (3, 10));
    }

    #[test]
    fn test_next_upcoming_empty() {
        assert!(next_upcoming(&[], month_day(1, 1)).is_none());
    }
}
