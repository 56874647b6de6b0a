//! Calendar months and month-column header recognition.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Number of month columns in every budget sheet.
pub const MONTHS: usize = 12;

/// One calendar month. Discriminants are the 0-based calendar index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Month {
    Jan,
    Feb,
    Mar,
    Apr,
    May,
    Jun,
    Jul,
    Aug,
    Sep,
    Oct,
    Nov,
    Dec,
}

impl Month {
    /// All twelve months in calendar order.
    pub const ALL: [Month; MONTHS] = [
        Month::Jan,
        Month::Feb,
        Month::Mar,
        Month::Apr,
        Month::May,
        Month::Jun,
        Month::Jul,
        Month::Aug,
        Month::Sep,
        Month::Oct,
        Month::Nov,
        Month::Dec,
    ];

    /// 0-based calendar index (`Jan` = 0).
    pub fn index(self) -> usize {
        self as usize
    }

    /// Month for a 0-based calendar index.
    pub fn from_index(index: usize) -> Option<Month> {
        Self::ALL.get(index).copied()
    }

    /// Three-letter English abbreviation, e.g. `"Mar"`.
    pub fn abbreviation(self) -> &'static str {
        match self {
            Month::Jan => "Jan",
            Month::Feb => "Feb",
            Month::Mar => "Mar",
            Month::Apr => "Apr",
            Month::May => "May",
            Month::Jun => "Jun",
            Month::Jul => "Jul",
            Month::Aug => "Aug",
            Month::Sep => "Sep",
            Month::Oct => "Oct",
            Month::Nov => "Nov",
            Month::Dec => "Dec",
        }
    }

    /// Full English month name, e.g. `"March"`.
    pub fn full_name(self) -> &'static str {
        match self {
            Month::Jan => "January",
            Month::Feb => "February",
            Month::Mar => "March",
            Month::Apr => "April",
            Month::May => "May",
            Month::Jun => "June",
            Month::Jul => "July",
            Month::Aug => "August",
            Month::Sep => "September",
            Month::Oct => "October",
            Month::Nov => "November",
            Month::Dec => "December",
        }
    }

    /// Recognise a month column header.
    ///
    /// Accepted forms, after trimming:
    ///
    /// * a case-insensitive prefix of the English month name that is at least
    ///   three letters long, optionally followed by a dot (`"jan"`, `"Sept."`,
    ///   `"DECEMBER"`);
    /// * the CJK numeric form `"1月"` .. `"12月"`.
    ///
    /// Headers that only start with a month's letters (`"Market"`) and the
    /// `"Total"` column are not months.
    ///
    /// # Examples
    ///
    /// ```
    /// use budget_core::months::Month;
    ///
    /// assert_eq!(Month::from_header(" sept "), Some(Month::Sep));
    /// assert_eq!(Month::from_header("3月"), Some(Month::Mar));
    /// assert_eq!(Month::from_header("Market"), None);
    /// ```
    pub fn from_header(header: &str) -> Option<Month> {
        let trimmed = header.trim();

        if let Some(caps) = cjk_month_regex().captures(trimmed) {
            let number: usize = caps[1].parse().ok()?;
            return Month::from_index(number - 1);
        }

        let word = trimmed.strip_suffix('.').unwrap_or(trimmed).to_lowercase();
        if word.chars().count() < 3 || !word.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }

        Self::ALL
            .into_iter()
            .find(|m| m.full_name().to_lowercase().starts_with(&word))
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

fn cjk_month_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(1[0-2]|0?[1-9])\s*月$").expect("regex is valid"))
}
