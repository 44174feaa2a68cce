use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Capability, Conference, LeagueClock, StatCategory, UtcDateTime, ValidationError};

/// What is being asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FactKind {
    MostRecentResult,
    ResultsWindow { n: usize },
    GamesForDate { date: Date },
    Standings { conference: Conference },
    TopPlayersByStat { stat: StatCategory, limit: usize },
    /// The subject's top performer in its most recent completed game.
    TeamGameLeader { stat: StatCategory },
}

impl FactKind {
    pub const fn capability(self) -> Capability {
        match self {
            Self::MostRecentResult => Capability::MostRecentResult,
            Self::ResultsWindow { .. } => Capability::ResultsWindow,
            Self::GamesForDate { .. } => Capability::GamesForDate,
            Self::Standings { .. } => Capability::Standings,
            Self::TopPlayersByStat { .. } => Capability::TopPlayersByStat,
            Self::TeamGameLeader { .. } => Capability::TeamGameLeader,
        }
    }

    pub const fn as_str(self) -> &'static str {
        self.capability().as_str()
    }
}

impl Display for FactKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MostRecentResult => f.write_str(self.as_str()),
            Self::ResultsWindow { n } => write!(f, "{}(n={n})", self.as_str()),
            Self::GamesForDate { date } => write!(f, "{}({date})", self.as_str()),
            Self::Standings { conference } => write!(f, "{}({conference})", self.as_str()),
            Self::TopPlayersByStat { stat, limit } => {
                write!(f, "{}({stat}, limit={limit})", self.as_str())
            }
            Self::TeamGameLeader { stat } => write!(f, "{}({stat})", self.as_str()),
        }
    }
}

/// One normalized sports question.
///
/// `subject` is the caller's raw team text; it is resolved to a canonical
/// team during resolution. Standings and league leader requests carry no subject,
/// and a date request may leave it empty to ask for every game that day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FactRequest {
    pub kind: FactKind,
    pub subject: String,
    pub as_of: UtcDateTime,
}

impl FactRequest {
    pub fn most_recent_result(subject: impl Into<String>, as_of: UtcDateTime) -> Result<Self, ValidationError> {
        Ok(Self {
            kind: FactKind::MostRecentResult,
            subject: required_subject(subject.into())?,
            as_of,
        })
    }

    pub fn results_window(
        subject: impl Into<String>,
        n: usize,
        as_of: UtcDateTime,
    ) -> Result<Self, ValidationError> {
        if n == 0 {
            return Err(ValidationError::ZeroWindow);
        }
        Ok(Self {
            kind: FactKind::ResultsWindow { n },
            subject: required_subject(subject.into())?,
            as_of,
        })
    }

    /// Every game on `date`.
    pub fn games_for_date(date: Date, as_of: UtcDateTime) -> Self {
        Self {
            kind: FactKind::GamesForDate { date },
            subject: String::new(),
            as_of,
        }
    }

    /// The games `subject` played on `date`.
    pub fn games_for_team_on(
        subject: impl Into<String>,
        date: Date,
        as_of: UtcDateTime,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            kind: FactKind::GamesForDate { date },
            subject: required_subject(subject.into())?,
            as_of,
        })
    }

    /// Games on the day named by `phrase` ("tonight", "yesterday",
    /// "Jan 15th"). An unrecognized phrase means no date constraint, which
    /// for a date question is the current league-local day.
    pub fn games_on_phrase(
        subject: Option<&str>,
        phrase: &str,
        as_of: UtcDateTime,
        clock: &LeagueClock,
    ) -> Result<Self, ValidationError> {
        let date = clock
            .resolve_phrase(phrase, as_of)
            .unwrap_or_else(|| clock.local_date(as_of));
        match subject {
            Some(subject) => Self::games_for_team_on(subject, date, as_of),
            None => Ok(Self::games_for_date(date, as_of)),
        }
    }

    pub fn standings(conference: Conference, as_of: UtcDateTime) -> Self {
        Self {
            kind: FactKind::Standings { conference },
            subject: String::new(),
            as_of,
        }
    }

    pub fn top_players(stat: StatCategory, limit: usize, as_of: UtcDateTime) -> Result<Self, ValidationError> {
        if limit == 0 {
            return Err(ValidationError::ZeroLimit);
        }
        Ok(Self {
            kind: FactKind::TopPlayersByStat { stat, limit },
            subject: String::new(),
            as_of,
        })
    }

    /// Who led `subject` in `stat` in its latest game.
    pub fn team_game_leader(
        subject: impl Into<String>,
        stat: StatCategory,
        as_of: UtcDateTime,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            kind: FactKind::TeamGameLeader { stat },
            subject: required_subject(subject.into())?,
            as_of,
        })
    }

    /// The subject text, or `None` when the request has no team subject.
    pub fn subject_text(&self) -> Option<&str> {
        let trimmed = self.subject.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

fn required_subject(subject: String) -> Result<String, ValidationError> {
    let trimmed = subject.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptySubject);
    }
    Ok(trimmed.to_owned())
}
