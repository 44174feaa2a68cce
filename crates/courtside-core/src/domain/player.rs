use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{GameResult, ProviderId, ValidationError};

/// Per-game statistic used to rank league leaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatCategory {
    Points,
    Assists,
    Rebounds,
    Steals,
    Blocks,
    ThreePointersMade,
}

impl StatCategory {
    pub const ALL: [Self; 6] = [
        Self::Points,
        Self::Assists,
        Self::Rebounds,
        Self::Steals,
        Self::Blocks,
        Self::ThreePointersMade,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Points => "points",
            Self::Assists => "assists",
            Self::Rebounds => "rebounds",
            Self::Steals => "steals",
            Self::Blocks => "blocks",
            Self::ThreePointersMade => "three_pointers_made",
        }
    }

    /// Column name used by the league stats tables.
    pub const fn stats_code(self) -> &'static str {
        match self {
            Self::Points => "PTS",
            Self::Assists => "AST",
            Self::Rebounds => "REB",
            Self::Steals => "STL",
            Self::Blocks => "BLK",
            Self::ThreePointersMade => "FG3M",
        }
    }

    /// Column label in a game box score. Three-pointers are reported as
    /// "made-attempted" under `3PT`.
    pub const fn box_score_label(self) -> &'static str {
        match self {
            Self::ThreePointersMade => "3PT",
            other => other.stats_code(),
        }
    }
}

impl Display for StatCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatCategory {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lowered = value.trim().to_ascii_lowercase();
        let category = match lowered.as_str() {
            "points" | "point" | "pts" | "ppg" | "score" | "scoring" | "scorers" => Self::Points,
            "assists" | "assist" | "ast" | "apg" => Self::Assists,
            "rebounds" | "rebound" | "reb" | "rpg" | "boards" => Self::Rebounds,
            "steals" | "steal" | "stl" => Self::Steals,
            "blocks" | "block" | "blk" => Self::Blocks,
            "three_pointers_made" | "threes" | "3pm" | "fg3m" | "3-pointers" | "three pointers" => {
                Self::ThreePointersMade
            }
            _ => {
                return Err(ValidationError::InvalidStat {
                    value: value.trim().to_owned(),
                })
            }
        };
        Ok(category)
    }
}

/// A player's value for one statistic: a season per-game average for
/// league leaders, a single-game total for game leaders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStatLine {
    pub rank: u32,
    pub player_name: String,
    pub team_abbreviation: String,
    pub stat: StatCategory,
    pub value: f64,
    pub games_played: u32,
    pub source_provider_id: ProviderId,
}

/// The subject team's top performer in one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameLeader {
    pub game: GameResult,
    pub leader: PlayerStatLine,
}
