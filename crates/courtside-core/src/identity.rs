//! Team identity resolution.
//!
//! [`TeamDirectory::resolve`] maps free text ("Celtics", "BOS", "boston
//! celtics game last night") to a [`CanonicalTeam`]. It is total: text that
//! matches nothing yields a synthetic team rather than an error.

use std::collections::HashMap;

use tracing::debug;

use crate::{CanonicalTeam, Conference, League, TeamId};

/// Aliases shorter than this are only ever matched exactly.
const MIN_CONTAINMENT_LEN: usize = 3;

const SYNTHETIC_UNKNOWN: &str = "UNK";

struct TeamSeed {
    abbreviation: &'static str,
    name: &'static str,
    conference: Conference,
    aliases: &'static [&'static str],
}

const fn seed(
    abbreviation: &'static str,
    name: &'static str,
    conference: Conference,
    aliases: &'static [&'static str],
) -> TeamSeed {
    TeamSeed {
        abbreviation,
        name,
        conference,
        aliases,
    }
}

// Provider abbreviation variants (GS, PHO, NO, UTAH, WSH, SA, NY, BRK) live
// in the alias lists so that exact lookup covers them.
const NBA_TEAMS: [TeamSeed; 30] = [
    seed("ATL", "Atlanta Hawks", Conference::East, &["hawks", "atlanta"]),
    seed("BOS", "Boston Celtics", Conference::East, &["celtics", "boston"]),
    seed("BKN", "Brooklyn Nets", Conference::East, &["nets", "brooklyn", "brk"]),
    seed("CHA", "Charlotte Hornets", Conference::East, &["hornets", "charlotte", "cho"]),
    seed("CHI", "Chicago Bulls", Conference::East, &["bulls", "chicago"]),
    seed("CLE", "Cleveland Cavaliers", Conference::East, &["cavaliers", "cavs", "cleveland"]),
    seed("DAL", "Dallas Mavericks", Conference::West, &["mavericks", "mavs", "dallas"]),
    seed("DEN", "Denver Nuggets", Conference::West, &["nuggets", "denver"]),
    seed("DET", "Detroit Pistons", Conference::East, &["pistons", "detroit"]),
    seed("GSW", "Golden State Warriors", Conference::West, &["warriors", "golden state", "gs", "dubs"]),
    seed("HOU", "Houston Rockets", Conference::West, &["rockets", "houston"]),
    seed("IND", "Indiana Pacers", Conference::East, &["pacers", "indiana"]),
    seed("LAC", "LA Clippers", Conference::West, &["clippers", "los angeles clippers", "la clippers"]),
    seed("LAL", "Los Angeles Lakers", Conference::West, &["lakers", "la lakers"]),
    seed("MEM", "Memphis Grizzlies", Conference::West, &["grizzlies", "grizz", "memphis"]),
    seed("MIA", "Miami Heat", Conference::East, &["heat", "miami"]),
    seed("MIL", "Milwaukee Bucks", Conference::East, &["bucks", "milwaukee"]),
    seed("MIN", "Minnesota Timberwolves", Conference::West, &["timberwolves", "wolves", "minnesota"]),
    seed("NOP", "New Orleans Pelicans", Conference::West, &["pelicans", "pels", "new orleans", "no"]),
    seed("NYK", "New York Knicks", Conference::East, &["knicks", "new york", "ny"]),
    seed("OKC", "Oklahoma City Thunder", Conference::West, &["thunder", "oklahoma city", "oklahoma"]),
    seed("ORL", "Orlando Magic", Conference::East, &["magic", "orlando"]),
    seed("PHI", "Philadelphia 76ers", Conference::East, &["76ers", "sixers", "philadelphia"]),
    seed("PHX", "Phoenix Suns", Conference::West, &["suns", "phoenix", "pho"]),
    seed("POR", "Portland Trail Blazers", Conference::West, &["trail blazers", "blazers", "portland"]),
    seed("SAC", "Sacramento Kings", Conference::West, &["kings", "sacramento"]),
    seed("SAS", "San Antonio Spurs", Conference::West, &["spurs", "san antonio", "sa"]),
    seed("TOR", "Toronto Raptors", Conference::East, &["raptors", "toronto"]),
    seed("UTA", "Utah Jazz", Conference::West, &["jazz", "utah"]),
    seed("WAS", "Washington Wizards", Conference::East, &["wizards", "washington", "wsh"]),
];

/// Immutable team registry shared by every resolution.
#[derive(Debug, Clone)]
pub struct TeamDirectory {
    league: League,
    teams: Vec<CanonicalTeam>,
    by_alias: HashMap<String, usize>,
}

impl Default for TeamDirectory {
    fn default() -> Self {
        Self::nba()
    }
}

impl TeamDirectory {
    /// The 30 NBA franchises.
    pub fn nba() -> Self {
        let teams = NBA_TEAMS
            .iter()
            .map(|seed| {
                CanonicalTeam::new(
                    League::Nba,
                    seed.abbreviation,
                    seed.name,
                    Some(seed.conference),
                    seed.aliases,
                )
            })
            .collect();
        Self::from_teams(League::Nba, teams)
    }

    /// Builds a directory from explicit teams. On alias collisions the
    /// earlier team keeps the alias.
    pub fn from_teams(league: League, teams: Vec<CanonicalTeam>) -> Self {
        let mut by_alias = HashMap::new();
        for (index, team) in teams.iter().enumerate() {
            for alias in &team.aliases {
                by_alias.entry(alias.clone()).or_insert(index);
            }
        }
        Self {
            league,
            teams,
            by_alias,
        }
    }

    pub const fn league(&self) -> League {
        self.league
    }

    pub fn teams(&self) -> &[CanonicalTeam] {
        &self.teams
    }

    pub fn get(&self, id: &TeamId) -> Option<&CanonicalTeam> {
        self.teams.iter().find(|team| &team.id == id)
    }

    /// Exact, case-insensitive lookup by name, abbreviation or alias.
    pub fn lookup(&self, text: &str) -> Option<&CanonicalTeam> {
        let lowered = text.trim().to_lowercase();
        self.by_alias
            .get(&lowered)
            .and_then(|index| self.teams.get(*index))
    }

    pub fn in_conference(&self, conference: Conference) -> impl Iterator<Item = &CanonicalTeam> {
        self.teams
            .iter()
            .filter(move |team| team.conference == Some(conference))
    }

    /// Resolves free text to a team. Never fails.
    pub fn resolve(&self, text: &str) -> CanonicalTeam {
        if let Some(team) = self.lookup(text) {
            return team.clone();
        }

        let lowered = text.trim().to_lowercase();
        if let Some(team) = self.containment_match(&lowered) {
            debug!(input = text, team = %team.id, "resolved team by substring containment");
            return team.clone();
        }

        let team = self.synthetic(text);
        debug!(input = text, team = %team.id, "no team matched; using synthetic identity");
        team
    }

    fn containment_match(&self, lowered: &str) -> Option<&CanonicalTeam> {
        if lowered.chars().count() < MIN_CONTAINMENT_LEN {
            return None;
        }

        // Longest contained alias wins; ties keep table order.
        let mut best: Option<(usize, usize)> = None;
        for (index, team) in self.teams.iter().enumerate() {
            for alias in &team.aliases {
                if alias.chars().count() < MIN_CONTAINMENT_LEN || !lowered.contains(alias.as_str()) {
                    continue;
                }
                if best.map_or(true, |(len, _)| alias.len() > len) {
                    best = Some((alias.len(), index));
                }
            }
        }
        if let Some((_, index)) = best {
            return self.teams.get(index);
        }

        // Text that is part of an alias ("celt") must point at one team.
        let mut partial = self
            .teams
            .iter()
            .filter(|team| team.aliases.iter().any(|alias| alias.contains(lowered)));
        match (partial.next(), partial.next()) {
            (Some(team), None) => Some(team),
            (Some(_), Some(_)) => {
                debug!(input = lowered, "partial team name is ambiguous");
                None
            }
            _ => None,
        }
    }

    fn synthetic(&self, text: &str) -> CanonicalTeam {
        let trimmed = text.trim();
        let mut abbreviation: String = trimmed
            .chars()
            .filter(|ch| ch.is_alphanumeric())
            .take(3)
            .collect::<String>()
            .to_uppercase();
        if abbreviation.is_empty() {
            abbreviation = SYNTHETIC_UNKNOWN.to_owned();
        }
        let name = if trimmed.is_empty() { "Unknown" } else { trimmed };

        let mut team = CanonicalTeam::new(self.league, &abbreviation, name, None, &[]);
        team.synthetic = true;
        team
    }
}
