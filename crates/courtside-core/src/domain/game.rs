use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{ProviderId, TeamId, UtcDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Scheduled,
    InProgress,
    Final,
}

impl GameStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::Final => "final",
        }
    }
}

impl Display for GameStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of a matchup a team played on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    Home,
    Away,
}

impl Venue {
    pub const fn opposite(self) -> Self {
        match self {
            Self::Home => Self::Away,
            Self::Away => Self::Home,
        }
    }
}

/// One side of a game as reported by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchupSide {
    pub team_id: TeamId,
    pub name: String,
    pub score: i32,
}

impl MatchupSide {
    pub fn new(team_id: TeamId, name: impl Into<String>, score: i32) -> Self {
        Self {
            team_id,
            name: name.into(),
            score,
        }
    }
}

/// A game seen from the perspective of one team (the subject).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    /// League-local calendar date of the game.
    pub game_date: Option<Date>,
    pub start_time: Option<UtcDateTime>,
    pub team_id: TeamId,
    pub team_name: String,
    pub opponent_id: TeamId,
    pub opponent_name: String,
    pub team_score: i32,
    pub opponent_score: i32,
    pub did_win: bool,
    pub status: GameStatus,
    pub venue: Option<Venue>,
    pub matchup_label: String,
    pub source_provider_id: ProviderId,
}

impl GameResult {
    /// Builds a record for `team` against `opponent`, deriving the win flag
    /// from the scores.
    pub fn new(
        team: MatchupSide,
        opponent: MatchupSide,
        status: GameStatus,
        game_date: Option<Date>,
        source_provider_id: ProviderId,
    ) -> Self {
        let mut result = Self {
            game_date,
            start_time: None,
            team_id: team.team_id,
            team_name: team.name,
            opponent_id: opponent.team_id,
            opponent_name: opponent.name,
            team_score: team.score,
            opponent_score: opponent.score,
            did_win: false,
            status,
            venue: None,
            matchup_label: String::new(),
            source_provider_id,
        };
        result.did_win = result.derived_win();
        result.matchup_label = result.label();
        result
    }

    /// Builds a record from a home/away pair with `subject` naming the
    /// subject's side.
    pub fn from_sides(
        home: MatchupSide,
        away: MatchupSide,
        subject: Venue,
        status: GameStatus,
        game_date: Option<Date>,
        source_provider_id: ProviderId,
    ) -> Self {
        let (team, opponent) = match subject {
            Venue::Home => (home, away),
            Venue::Away => (away, home),
        };
        Self::new(team, opponent, status, game_date, source_provider_id).with_venue(subject)
    }

    pub fn with_venue(mut self, venue: Venue) -> Self {
        self.venue = Some(venue);
        self.matchup_label = self.label();
        self
    }

    pub fn with_start_time(mut self, start_time: UtcDateTime) -> Self {
        self.start_time = Some(start_time);
        self
    }

    /// Win flag implied by the scores. For a game still in progress this
    /// is "currently leading"; an unplayed 0-0 game is never a win.
    pub fn derived_win(&self) -> bool {
        self.team_score > self.opponent_score
    }

    pub fn is_final(&self) -> bool {
        self.status == GameStatus::Final
    }

    pub fn involves(&self, team_id: &TeamId) -> bool {
        &self.team_id == team_id || &self.opponent_id == team_id
    }

    /// The same game seen from the other side.
    pub fn swapped(&self) -> Self {
        let mut flipped = Self {
            game_date: self.game_date,
            start_time: self.start_time,
            team_id: self.opponent_id.clone(),
            team_name: self.opponent_name.clone(),
            opponent_id: self.team_id.clone(),
            opponent_name: self.team_name.clone(),
            team_score: self.opponent_score,
            opponent_score: self.team_score,
            did_win: false,
            status: self.status,
            venue: self.venue.map(Venue::opposite),
            matchup_label: String::new(),
            source_provider_id: self.source_provider_id,
        };
        flipped.did_win = flipped.derived_win();
        flipped.matchup_label = flipped.label();
        flipped
    }

    /// Re-orients the record so that `team_id` is the subject.
    pub fn oriented_to(&self, team_id: &TeamId) -> Option<Self> {
        if &self.team_id == team_id {
            Some(self.clone())
        } else if &self.opponent_id == team_id {
            Some(self.swapped())
        } else {
            None
        }
    }

    fn label(&self) -> String {
        match self.venue {
            Some(Venue::Home) => format!("{} @ {}", self.opponent_id, self.team_id),
            Some(Venue::Away) => format!("{} @ {}", self.team_id, self.opponent_id),
            None => format!("{} vs {}", self.team_id, self.opponent_id),
        }
    }
}
