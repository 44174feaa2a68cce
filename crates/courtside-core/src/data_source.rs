//! Provider contract and per-capability request types.
//!
//! Every upstream provider is wrapped in a [`FactSource`] that speaks only
//! canonical domain types. The orchestrator never sees provider payloads.
//!
//! # Capabilities
//!
//! | Capability | Request | Response |
//! |------------|---------|----------|
//! | MostRecentResult | [`RecentGameRequest`] | [`GameResult`] |
//! | ResultsWindow | [`WindowRequest`] | `Vec<GameResult>` |
//! | GamesForDate | [`DateGamesRequest`] | `Vec<GameResult>` |
//! | Standings | [`StandingsRequest`] | `Vec<StandingEntry>` |
//! | TopPlayersByStat | [`LeadersRequest`] | `Vec<PlayerStatLine>` |
//! | TeamGameLeader | [`TeamLeaderRequest`] | [`GameLeader`] |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    CanonicalTeam, Conference, GameLeader, GameResult, PlayerStatLine, ProviderId, Season,
    StandingEntry, StatCategory, UtcDateTime,
};

/// Fact capability used for priority lookup and capability checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    MostRecentResult,
    ResultsWindow,
    GamesForDate,
    Standings,
    TopPlayersByStat,
    TeamGameLeader,
}

impl Capability {
    pub const ALL: [Self; 6] = [
        Self::MostRecentResult,
        Self::ResultsWindow,
        Self::GamesForDate,
        Self::Standings,
        Self::TopPlayersByStat,
        Self::TeamGameLeader,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MostRecentResult => "most_recent_result",
            Self::ResultsWindow => "results_window",
            Self::GamesForDate => "games_for_date",
            Self::Standings => "standings",
            Self::TopPlayersByStat => "top_players_by_stat",
            Self::TeamGameLeader => "team_game_leader",
        }
    }
}

impl Display for Capability {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported capability matrix for a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub most_recent_result: bool,
    pub results_window: bool,
    pub games_for_date: bool,
    pub standings: bool,
    pub top_players_by_stat: bool,
    #[serde(default)]
    pub team_game_leader: bool,
}

impl CapabilitySet {
    pub const fn new(
        most_recent_result: bool,
        results_window: bool,
        games_for_date: bool,
        standings: bool,
        top_players_by_stat: bool,
        team_game_leader: bool,
    ) -> Self {
        Self {
            most_recent_result,
            results_window,
            games_for_date,
            standings,
            top_players_by_stat,
            team_game_leader,
        }
    }

    pub const fn full() -> Self {
        Self::new(true, true, true, true, true, true)
    }

    pub const fn none() -> Self {
        Self::new(false, false, false, false, false, false)
    }

    pub const fn with(self, capability: Capability) -> Self {
        let mut next = self;
        match capability {
            Capability::MostRecentResult => next.most_recent_result = true,
            Capability::ResultsWindow => next.results_window = true,
            Capability::GamesForDate => next.games_for_date = true,
            Capability::Standings => next.standings = true,
            Capability::TopPlayersByStat => next.top_players_by_stat = true,
            Capability::TeamGameLeader => next.team_game_leader = true,
        }
        next
    }

    pub const fn supports(self, capability: Capability) -> bool {
        match capability {
            Capability::MostRecentResult => self.most_recent_result,
            Capability::ResultsWindow => self.results_window,
            Capability::GamesForDate => self.games_for_date,
            Capability::Standings => self.standings,
            Capability::TopPlayersByStat => self.top_players_by_stat,
            Capability::TeamGameLeader => self.team_game_leader,
        }
    }

    pub fn supported(self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|capability| self.supports(*capability))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Runtime provider health snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub state: HealthState,
    pub rate_available: bool,
}

impl HealthStatus {
    pub const fn new(state: HealthState, rate_available: bool) -> Self {
        Self {
            state,
            rate_available,
        }
    }

    pub const fn healthy() -> Self {
        Self::new(HealthState::Healthy, true)
    }

    pub const fn unhealthy() -> Self {
        Self::new(HealthState::Unhealthy, false)
    }

    pub const fn accepts_requests(self) -> bool {
        !matches!(self.state, HealthState::Unhealthy)
    }
}

/// Provider-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    UnsupportedCapability,
    Unavailable,
    RateLimited,
    NotFound,
    Malformed,
}

/// Structured provider error consumed by the orchestrator's fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderError {
    kind: ProviderErrorKind,
    message: String,
    retryable: bool,
}

impl ProviderError {
    pub fn unsupported(capability: Capability) -> Self {
        Self {
            kind: ProviderErrorKind::UnsupportedCapability,
            message: format!("capability '{capability}' is not supported by this provider"),
            retryable: false,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::NotFound,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Malformed,
            message: message.into(),
            retryable: true,
        }
    }

    pub const fn kind(&self) -> ProviderErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            ProviderErrorKind::UnsupportedCapability => "provider.unsupported_capability",
            ProviderErrorKind::Unavailable => "provider.unavailable",
            ProviderErrorKind::RateLimited => "provider.rate_limited",
            ProviderErrorKind::NotFound => "provider.not_found",
            ProviderErrorKind::Malformed => "provider.malformed",
        }
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for ProviderError {}

/// Request payload for the most recent completed game of a team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentGameRequest {
    pub team: CanonicalTeam,
    pub lookback_days: u32,
    pub as_of: UtcDateTime,
}

/// Request payload for the last `n` completed games of a team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowRequest {
    pub team: CanonicalTeam,
    pub n: usize,
    pub lookback_days: u32,
    pub as_of: UtcDateTime,
}

/// Request payload for every game on a league-local date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateGamesRequest {
    pub date: Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandingsRequest {
    pub conference: Conference,
    pub season: Season,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeadersRequest {
    pub stat: StatCategory,
    pub limit: usize,
    pub season: Season,
}

/// Request payload for the top performer of `team` in its most recent
/// completed game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamLeaderRequest {
    pub team: CanonicalTeam,
    pub stat: StatCategory,
    pub lookback_days: u32,
    pub as_of: UtcDateTime,
}

/// Boxed future returned by every provider capability.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ProviderError>> + Send + 'a>>;

/// Provider adapter contract.
///
/// Capabilities a provider does not offer fall through to the default
/// implementations, which fail with
/// [`ProviderErrorKind::UnsupportedCapability`]. Implementations are shared
/// across concurrent resolutions and must be `Send + Sync`.
pub trait FactSource: Send + Sync {
    fn id(&self) -> ProviderId;

    fn capabilities(&self) -> CapabilitySet;

    /// Most recent completed game of `req.team` no older than
    /// `req.lookback_days` local days before `req.as_of`.
    fn most_recent_result<'a>(&'a self, req: RecentGameRequest) -> SourceFuture<'a, GameResult> {
        let _ = req;
        Box::pin(async { Err(ProviderError::unsupported(Capability::MostRecentResult)) })
    }

    /// Up to `req.n` completed games, newest first.
    fn results_window<'a>(&'a self, req: WindowRequest) -> SourceFuture<'a, Vec<GameResult>> {
        let _ = req;
        Box::pin(async { Err(ProviderError::unsupported(Capability::ResultsWindow)) })
    }

    /// All games on a local date, oriented with the away side as the team.
    fn games_for_date<'a>(&'a self, req: DateGamesRequest) -> SourceFuture<'a, Vec<GameResult>> {
        let _ = req;
        Box::pin(async { Err(ProviderError::unsupported(Capability::GamesForDate)) })
    }

    fn standings<'a>(&'a self, req: StandingsRequest) -> SourceFuture<'a, Vec<StandingEntry>> {
        let _ = req;
        Box::pin(async { Err(ProviderError::unsupported(Capability::Standings)) })
    }

    fn top_players_by_stat<'a>(
        &'a self,
        req: LeadersRequest,
    ) -> SourceFuture<'a, Vec<PlayerStatLine>> {
        let _ = req;
        Box::pin(async { Err(ProviderError::unsupported(Capability::TopPlayersByStat)) })
    }

    fn team_game_leader<'a>(&'a self, req: TeamLeaderRequest) -> SourceFuture<'a, GameLeader> {
        let _ = req;
        Box::pin(async { Err(ProviderError::unsupported(Capability::TeamGameLeader)) })
    }

    /// Current health. Unhealthy providers are skipped without a call.
    fn health<'a>(&'a self) -> Pin<Box<dyn Future<Output = HealthStatus> + Send + 'a>> {
        Box::pin(async { HealthStatus::healthy() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_set_tracks_support() {
        let set = CapabilitySet::none()
            .with(Capability::Standings)
            .with(Capability::TopPlayersByStat);
        assert!(set.supports(Capability::Standings));
        assert!(!set.supports(Capability::GamesForDate));
        assert_eq!(
            set.supported(),
            vec![Capability::Standings, Capability::TopPlayersByStat]
        );
        assert_eq!(CapabilitySet::full().supported().len(), Capability::ALL.len());
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(
            ProviderError::unsupported(Capability::Standings).code(),
            "provider.unsupported_capability"
        );
        assert!(!ProviderError::unsupported(Capability::Standings).retryable());
        assert!(ProviderError::unavailable("down").retryable());
        assert_eq!(
            ProviderError::not_found("no games").to_string(),
            "no games (provider.not_found)"
        );
    }
}
