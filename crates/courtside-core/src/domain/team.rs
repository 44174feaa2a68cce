use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Leagues known to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum League {
    Nba,
}

impl League {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nba => "nba",
        }
    }

    /// Final scores outside this range are accepted with a warning.
    pub const fn plausible_score_range(self) -> RangeInclusive<i32> {
        match self {
            Self::Nba => 50..=200,
        }
    }
}

impl Display for League {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Conference {
    East,
    West,
}

impl Conference {
    pub const ALL: [Self; 2] = [Self::East, Self::West];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::East => "east",
            Self::West => "west",
        }
    }
}

impl Display for Conference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Conference {
    type Err = ValidationError;

    /// Accepts `east`, `Eastern Conference`, `E` and the western equivalents.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lowered = value.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "e" => return Ok(Self::East),
            "w" => return Ok(Self::West),
            _ => {}
        }
        if lowered.starts_with("east") {
            Ok(Self::East)
        } else if lowered.starts_with("west") {
            Ok(Self::West)
        } else {
            Err(ValidationError::InvalidConference {
                value: value.trim().to_owned(),
            })
        }
    }
}

/// Canonical team identifier, an uppercase abbreviation such as `BOS`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(String);

impl TeamId {
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(value.as_ref().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for TeamId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A team after identity resolution.
///
/// `aliases` is stored lowercased and always contains the lowercased
/// canonical name and abbreviation. Teams produced by the resolver's
/// fallback path carry `synthetic = true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalTeam {
    pub id: TeamId,
    pub league: League,
    pub canonical_name: String,
    pub abbreviation: String,
    pub conference: Option<Conference>,
    pub aliases: BTreeSet<String>,
    pub synthetic: bool,
}

impl CanonicalTeam {
    pub fn new(
        league: League,
        abbreviation: &str,
        canonical_name: &str,
        conference: Option<Conference>,
        aliases: &[&str],
    ) -> Self {
        let mut alias_set: BTreeSet<String> = aliases
            .iter()
            .map(|alias| alias.trim().to_lowercase())
            .filter(|alias| !alias.is_empty())
            .collect();
        alias_set.insert(canonical_name.trim().to_lowercase());
        alias_set.insert(abbreviation.trim().to_lowercase());

        Self {
            id: TeamId::new(abbreviation),
            league,
            canonical_name: canonical_name.trim().to_owned(),
            abbreviation: abbreviation.trim().to_ascii_uppercase(),
            conference,
            aliases: alias_set,
            synthetic: false,
        }
    }

    /// Case-insensitive exact match against the canonical name, the
    /// abbreviation or any alias.
    pub fn answers_to(&self, name: &str) -> bool {
        let lowered = name.trim().to_lowercase();
        !lowered.is_empty() && self.aliases.contains(&lowered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_conference_spellings() {
        assert_eq!("Eastern Conference".parse::<Conference>(), Ok(Conference::East));
        assert_eq!("west".parse::<Conference>(), Ok(Conference::West));
        assert_eq!("W".parse::<Conference>(), Ok(Conference::West));
        assert!("central".parse::<Conference>().is_err());
    }

    #[test]
    fn aliases_include_name_and_abbreviation() {
        let team = CanonicalTeam::new(
            League::Nba,
            "bos",
            "Boston Celtics",
            Some(Conference::East),
            &["Celtics"],
        );
        assert_eq!(team.id.as_str(), "BOS");
        assert!(team.answers_to("BOSTON CELTICS"));
        assert!(team.answers_to("celtics"));
        assert!(team.answers_to("Bos"));
        assert!(!team.answers_to(""));
    }
}
