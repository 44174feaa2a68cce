use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Canonical provider identifiers used in priority tables and attempt trails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProviderId {
    #[serde(rename = "espn")]
    Espn,
    #[serde(rename = "nba_stats")]
    NbaStats,
    #[serde(rename = "balldontlie")]
    BallDontLie,
}

impl ProviderId {
    pub const ALL: [Self; 3] = [Self::Espn, Self::NbaStats, Self::BallDontLie];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Espn => "espn",
            Self::NbaStats => "nba_stats",
            Self::BallDontLie => "balldontlie",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "espn" => Ok(Self::Espn),
            "nba_stats" | "nba-stats" | "nba_api" | "nba" => Ok(Self::NbaStats),
            "balldontlie" | "ball_dont_lie" | "bdl" => Ok(Self::BallDontLie),
            other => Err(ValidationError::InvalidProvider {
                value: other.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_aliases() {
        assert_eq!("ESPN".parse::<ProviderId>(), Ok(ProviderId::Espn));
        assert_eq!("nba_api".parse::<ProviderId>(), Ok(ProviderId::NbaStats));
        assert_eq!("bdl".parse::<ProviderId>(), Ok(ProviderId::BallDontLie));
        assert!("sportradar".parse::<ProviderId>().is_err());
    }

    #[test]
    fn serde_names_match_display() {
        for provider in ProviderId::ALL {
            let encoded = serde_json::to_string(&provider).expect("serialize");
            assert_eq!(encoded, format!("\"{provider}\""));
        }
    }
}
