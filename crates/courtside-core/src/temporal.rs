//! League-local calendar handling.
//!
//! Providers report kickoff instants in UTC while users and league
//! schedules speak in local calendar days. [`LeagueClock`] converts between
//! the two with a fixed offset and filters game lists to an exact local
//! date.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::macros::offset;
use time::{Date, Duration, Month, UtcOffset};

use crate::domain::parse_calendar_date;
use crate::{GameResult, UtcDateTime, ValidationError};

const RELATIVE_PHRASES: [(&str, i64); 9] = [
    ("day after tomorrow", 2),
    ("day before yesterday", -2),
    ("tomorrow", 1),
    ("yesterday", -1),
    ("last night", -1),
    ("tonight", 0),
    ("today", 0),
    ("last week", -7),
    ("this week", 0),
];

/// Fixed-offset league clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeagueClock {
    offset: UtcOffset,
}

impl Default for LeagueClock {
    fn default() -> Self {
        Self::eastern_standard()
    }
}

impl LeagueClock {
    /// UTC-5, the offset used for NBA schedules.
    pub const fn eastern_standard() -> Self {
        Self { offset: offset!(-5) }
    }

    pub fn fixed(hours: i8) -> Result<Self, ValidationError> {
        if !(-12..=14).contains(&hours) {
            return Err(ValidationError::InvalidUtcOffset { hours });
        }
        let offset = UtcOffset::from_hms(hours, 0, 0)
            .map_err(|_| ValidationError::InvalidUtcOffset { hours })?;
        Ok(Self { offset })
    }

    pub const fn offset(&self) -> UtcOffset {
        self.offset
    }

    pub fn local_date(&self, instant: UtcDateTime) -> Date {
        instant.date_at(self.offset)
    }

    /// Local date of a game, preferring the start instant over a provider's
    /// own calendar date.
    pub fn game_local_date(&self, game: &GameResult) -> Option<Date> {
        game.start_time
            .map(|start| self.local_date(start))
            .or(game.game_date)
    }

    /// Keeps only games whose local date equals `date`.
    pub fn retain_on_date(&self, games: Vec<GameResult>, date: Date) -> Vec<GameResult> {
        games
            .into_iter()
            .filter(|game| self.game_local_date(game) == Some(date))
            .collect()
    }

    /// Resolves phrases such as "last night", "tomorrow", "1/15",
    /// "January 15th" or "2024-01-15" relative to `as_of`.
    pub fn resolve_phrase(&self, phrase: &str, as_of: UtcDateTime) -> Option<Date> {
        let today = self.local_date(as_of);
        let lowered = phrase.trim().to_lowercase();

        if let Some((_, days)) = RELATIVE_PHRASES
            .iter()
            .find(|(relative, _)| lowered.contains(relative))
        {
            return today.checked_add(Duration::days(*days));
        }

        explicit_date(&lowered, today.year())
    }
}

fn explicit_date(lowered: &str, year: i32) -> Option<Date> {
    let tokens: Vec<&str> = lowered
        .split(|ch: char| ch.is_whitespace() || ch == ',')
        .map(|token| token.trim_matches(|ch: char| !ch.is_alphanumeric()))
        .filter(|token| !token.is_empty())
        .collect();

    for (index, token) in tokens.iter().enumerate() {
        if let Ok(date) = parse_calendar_date(token) {
            return Some(date);
        }
        if let Some(date) = numeric_month_day(token, year) {
            return Some(date);
        }
        if let Some(month) = month_from_name(token) {
            let day = tokens
                .get(index + 1)
                .and_then(|next| strip_ordinal(next).parse::<u8>().ok());
            if let Some(date) = day.and_then(|day| Date::from_calendar_date(year, month, day).ok()) {
                return Some(date);
            }
        }
    }
    None
}

fn numeric_month_day(token: &str, default_year: i32) -> Option<Date> {
    let parts: Vec<&str> = token.split(['/', '-']).collect();
    if parts.iter().any(|part| part.is_empty() || !part.chars().all(|ch| ch.is_ascii_digit())) {
        return None;
    }
    let (month, day, year) = match parts.as_slice() {
        [month, day] => (*month, *day, default_year),
        [month, day, year] => {
            let year: i32 = year.parse().ok()?;
            let year = if year < 100 { 2000 + year } else { year };
            (*month, *day, year)
        }
        _ => return None,
    };
    if month.len() > 2 || day.len() > 2 {
        return None;
    }
    let month = Month::try_from(month.parse::<u8>().ok()?).ok()?;
    Date::from_calendar_date(year, month, day.parse().ok()?).ok()
}

fn month_from_name(token: &str) -> Option<Month> {
    let month = match token {
        "january" | "jan" => Month::January,
        "february" | "feb" => Month::February,
        "march" | "mar" => Month::March,
        "april" | "apr" => Month::April,
        "may" => Month::May,
        "june" | "jun" => Month::June,
        "july" | "jul" => Month::July,
        "august" | "aug" => Month::August,
        "september" | "sep" | "sept" => Month::September,
        "october" | "oct" => Month::October,
        "november" | "nov" => Month::November,
        "december" | "dec" => Month::December,
        _ => return None,
    };
    Some(month)
}

fn strip_ordinal(token: &str) -> &str {
    ["st", "nd", "rd", "th"]
        .iter()
        .find_map(|suffix| token.strip_suffix(suffix))
        .unwrap_or(token)
}

/// An NBA season, identified by the calendar year it starts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Season {
    start_year: i32,
}

impl Season {
    pub const fn starting(start_year: i32) -> Self {
        Self { start_year }
    }

    /// Seasons begin in October; earlier months belong to the season that
    /// started the previous year.
    pub fn containing(date: Date) -> Self {
        let year = date.year();
        if u8::from(date.month()) >= 10 {
            Self::starting(year)
        } else {
            Self::starting(year - 1)
        }
    }

    pub const fn start_year(self) -> i32 {
        self.start_year
    }

    /// Label in the `2024-25` form.
    pub fn label(self) -> String {
        format!("{}-{:02}", self.start_year, (self.start_year + 1).rem_euclid(100))
    }
}

impl Display for Season {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}
