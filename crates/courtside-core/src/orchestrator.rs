//! Table-driven fact resolution.
//!
//! [`FactOrchestrator`] walks the provider chain configured for a request's
//! fact kind, gives each provider its attempt budget, validates every answer
//! and returns the first accepted one together with the full attempt trail.
//! Lower-priority providers are never consulted once an answer is accepted.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use time::Date;
use tokio::task::JoinSet;
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::adapters::{BallDontLieAdapter, EspnAdapter, NbaStatsAdapter};
use crate::cache::FactCache;
use crate::data_source::{
    Capability, CapabilitySet, DateGamesRequest, FactSource, LeadersRequest, ProviderError,
    ProviderErrorKind, RecentGameRequest, StandingsRequest, TeamLeaderRequest, WindowRequest,
};
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::retry::Backoff;
use crate::validation::{RejectReason, ResultValidator, Warning};
use crate::{
    assign_conference_ranks, CanonicalTeam, Conference, CoreError, EngineConfig, FactKind,
    FactRequest, GameLeader, GameResult, LeagueClock, PlayerStatLine, PriorityTable, ProviderId,
    ProviderPlan, Season, StandingEntry, StatCategory, TeamDirectory,
};

/// An accepted answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "fact", content = "records")]
pub enum Fact {
    Game(GameResult),
    Games(Vec<GameResult>),
    Standings(Vec<StandingEntry>),
    Leaders(Vec<PlayerStatLine>),
    GameLeader(GameLeader),
}

impl Fact {
    pub fn as_game(&self) -> Option<&GameResult> {
        match self {
            Self::Game(game) => Some(game),
            _ => None,
        }
    }

    pub fn as_games(&self) -> Option<&[GameResult]> {
        match self {
            Self::Games(games) => Some(games),
            _ => None,
        }
    }

    pub fn as_standings(&self) -> Option<&[StandingEntry]> {
        match self {
            Self::Standings(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn as_leaders(&self) -> Option<&[PlayerStatLine]> {
        match self {
            Self::Leaders(lines) => Some(lines),
            _ => None,
        }
    }

    pub fn as_game_leader(&self) -> Option<&GameLeader> {
        match self {
            Self::GameLeader(leader) => Some(leader),
            _ => None,
        }
    }
}

/// Error taxonomy shared by attempts and terminal failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    ProviderUnavailable,
    NoDataFound,
    ValidationFailed,
    AllProvidersExhausted,
}

impl ErrorClass {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProviderUnavailable => "provider_unavailable",
            Self::NoDataFound => "no_data_found",
            Self::ValidationFailed => "validation_failed",
            Self::AllProvidersExhausted => "all_providers_exhausted",
        }
    }
}

impl Display for ErrorClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one provider invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "detail")]
pub enum AttemptOutcome {
    Success,
    Rejected(RejectReason),
    /// Transport failure, 5xx, timeout, rate limit or open circuit.
    Unavailable(String),
    NoData(String),
    Malformed(String),
    /// The provider is not registered or cannot answer this fact kind.
    Unsupported,
    /// Cancelled mid-flight because a higher-priority provider answered.
    Aborted,
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn error_class(&self) -> Option<ErrorClass> {
        match self {
            Self::Success | Self::Aborted => None,
            Self::Unavailable(_) => Some(ErrorClass::ProviderUnavailable),
            Self::NoData(_) | Self::Unsupported => Some(ErrorClass::NoDataFound),
            Self::Rejected(_) | Self::Malformed(_) => Some(ErrorClass::ValidationFailed),
        }
    }

    fn allows_retry(&self) -> bool {
        !matches!(self, Self::Success | Self::Unsupported | Self::Aborted)
    }
}

impl From<ProviderError> for AttemptOutcome {
    fn from(error: ProviderError) -> Self {
        match error.kind() {
            ProviderErrorKind::Unavailable | ProviderErrorKind::RateLimited => {
                Self::Unavailable(error.message().to_owned())
            }
            ProviderErrorKind::NotFound => Self::NoData(error.message().to_owned()),
            ProviderErrorKind::Malformed => Self::Malformed(error.message().to_owned()),
            ProviderErrorKind::UnsupportedCapability => Self::Unsupported,
        }
    }
}

impl From<RejectReason> for AttemptOutcome {
    fn from(reason: RejectReason) -> Self {
        Self::Rejected(reason)
    }
}

impl Display for AttemptOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Rejected(reason) => write!(f, "rejected: {reason}"),
            Self::Unavailable(message) => write!(f, "unavailable: {message}"),
            Self::NoData(message) => write!(f, "no data: {message}"),
            Self::Malformed(message) => write!(f, "malformed: {message}"),
            Self::Unsupported => f.write_str("unsupported"),
            Self::Aborted => f.write_str("aborted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderAttempt {
    pub provider_id: ProviderId,
    /// 1-based within the provider's budget.
    pub attempt_number: u32,
    pub outcome: AttemptOutcome,
}

impl ProviderAttempt {
    pub fn new(provider_id: ProviderId, attempt_number: u32, outcome: AttemptOutcome) -> Self {
        Self {
            provider_id,
            attempt_number,
            outcome,
        }
    }
}

/// A successful resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolved {
    pub fact: Fact,
    pub source_provider_id: ProviderId,
    /// Non-empty when the accepted answer was corrected or looked unusual.
    pub warnings: Vec<Warning>,
    pub attempts: Vec<ProviderAttempt>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    AllProvidersExhausted,
    DeadlineExceeded,
    NoProvidersConfigured,
}

impl FailureKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AllProvidersExhausted => "all providers exhausted",
            Self::DeadlineExceeded => "resolution deadline exceeded",
            Self::NoProvidersConfigured => "no providers configured",
        }
    }
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failure with every attempt that led to it.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{kind} after {count} provider attempt(s)", count = .attempts.len())]
pub struct ResolutionFailure {
    pub kind: FailureKind,
    pub attempts: Vec<ProviderAttempt>,
}

impl ResolutionFailure {
    pub fn new(kind: FailureKind, attempts: Vec<ProviderAttempt>) -> Self {
        Self { kind, attempts }
    }

    pub const fn error_class(&self) -> ErrorClass {
        ErrorClass::AllProvidersExhausted
    }

    /// Class of the last failed attempt, for telling "providers down" apart
    /// from "nothing matched".
    pub fn last_attempt_class(&self) -> Option<ErrorClass> {
        self.attempts
            .iter()
            .rev()
            .find_map(|attempt| attempt.outcome.error_class())
    }
}

pub type ResolutionResult = Result<Resolved, ResolutionFailure>;

#[derive(Debug, Clone, Copy)]
struct Settings {
    provider_timeout: Duration,
    deadline: Duration,
    max_lookback_days: u32,
    race_top_k: usize,
    backoff: Backoff,
}

struct Inner {
    sources: HashMap<ProviderId, Arc<dyn FactSource>>,
    priorities: PriorityTable,
    directory: Arc<TeamDirectory>,
    clock: LeagueClock,
    validator: ResultValidator,
    settings: Settings,
    cache: FactCache<Resolved>,
}

/// Resolution engine. Cheap to clone; clones share providers and cache.
#[derive(Clone)]
pub struct FactOrchestrator {
    inner: Arc<Inner>,
}

/// What a request asks for, with its subject resolved.
#[derive(Debug, Clone)]
enum Scope {
    Recent(CanonicalTeam),
    Window { team: CanonicalTeam, n: usize },
    Date { date: Date, team: Option<CanonicalTeam> },
    Standings(Conference),
    Leaders { stat: StatCategory, limit: usize },
    TeamLeader { team: CanonicalTeam, stat: StatCategory },
}

#[derive(Debug, Clone)]
struct Prepared {
    request: FactRequest,
    scope: Scope,
    today: Date,
    season: Season,
}

impl Prepared {
    fn cache_key(&self) -> String {
        let subject = match &self.scope {
            Scope::Recent(team) | Scope::Window { team, .. } | Scope::TeamLeader { team, .. } => {
                team.id.as_str()
            }
            Scope::Date { team: Some(team), .. } => team.id.as_str(),
            _ => "*",
        };
        format!("{}|{subject}|{}", self.request.kind, self.today)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Direct,
    /// Most recent result derived from day-by-day date queries.
    ScanByDate,
}

struct Accepted {
    provider: ProviderId,
    fact: Fact,
    warnings: Vec<Warning>,
}

/// Attempts recorded as they finish, so a provider cut off mid-race keeps
/// the attempts it already made.
#[derive(Default)]
struct AttemptLog {
    attempts: Mutex<Vec<ProviderAttempt>>,
}

impl AttemptLog {
    fn record(&self, attempt: ProviderAttempt) {
        self.lock().push(attempt);
    }

    fn take(&self) -> Vec<ProviderAttempt> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ProviderAttempt>> {
        self.attempts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A raced provider: still running, or done with or without an answer.
enum RaceSlot {
    Running,
    Finished(Option<Accepted>),
}

impl RaceSlot {
    fn has_answer(&self) -> bool {
        matches!(self, Self::Finished(Some(_)))
    }
}

impl FactOrchestrator {
    pub fn builder(config: EngineConfig) -> FactOrchestratorBuilder {
        FactOrchestratorBuilder::new(config)
    }

    pub fn directory(&self) -> &TeamDirectory {
        &self.inner.directory
    }

    pub fn clock(&self) -> LeagueClock {
        self.inner.clock
    }

    /// Registered providers in canonical order.
    pub fn providers(&self) -> Vec<ProviderId> {
        ProviderId::ALL
            .into_iter()
            .filter(|provider| self.inner.sources.contains_key(provider))
            .collect()
    }

    /// Resolves one request.
    ///
    /// Never panics on provider failure; every failure ends up in the
    /// attempt trail of the returned value.
    pub async fn resolve(&self, request: FactRequest) -> ResolutionResult {
        let span = info_span!(
            "resolve",
            resolution_id = %Uuid::new_v4(),
            kind = %request.kind,
            subject = %request.subject,
        );
        self.resolve_in_span(request).instrument(span).await
    }

    async fn resolve_in_span(&self, request: FactRequest) -> ResolutionResult {
        let prepared = self.prepare(request);
        let cache_key = prepared.cache_key();
        if let Some(hit) = self.inner.cache.get(&cache_key).await {
            debug!(%cache_key, "serving cached resolution");
            return Ok(hit);
        }

        let capability = prepared.request.kind.capability();
        let chain = self.inner.priorities.chain(capability).to_vec();
        if chain.is_empty() {
            warn!(%capability, "no provider chain configured");
            return Err(ResolutionFailure::new(FailureKind::NoProvidersConfigured, Vec::new()));
        }

        let started = Instant::now();
        let deadline = started + self.inner.settings.deadline;
        let (head, tail) = chain.split_at(self.race_width(chain.len()));
        let mut attempts = Vec::new();
        let mut accepted = None;

        if !head.is_empty() {
            let (raced, raced_attempts) = self.race(&prepared, head, deadline).await;
            attempts.extend(raced_attempts);
            accepted = raced;
        }
        if accepted.is_none() {
            accepted = self.run_sequential(&prepared, tail, deadline, &mut attempts).await;
        }

        let elapsed_ms = started.elapsed().as_millis();
        match accepted {
            Some(accepted) => {
                info!(
                    provider = %accepted.provider,
                    attempts = attempts.len(),
                    warnings = accepted.warnings.len(),
                    elapsed_ms,
                    "fact resolved"
                );
                let resolved = Resolved {
                    fact: accepted.fact,
                    source_provider_id: accepted.provider,
                    warnings: accepted.warnings,
                    attempts,
                };
                self.inner.cache.put(cache_key, resolved.clone()).await;
                Ok(resolved)
            }
            None => {
                let kind = if Instant::now() >= deadline {
                    FailureKind::DeadlineExceeded
                } else {
                    FailureKind::AllProvidersExhausted
                };
                warn!(%kind, attempts = attempts.len(), elapsed_ms, "fact resolution failed");
                Err(ResolutionFailure::new(kind, attempts))
            }
        }
    }

    fn prepare(&self, request: FactRequest) -> Prepared {
        let directory = &self.inner.directory;
        let scope = match request.kind {
            FactKind::MostRecentResult => Scope::Recent(directory.resolve(&request.subject)),
            FactKind::ResultsWindow { n } => Scope::Window {
                team: directory.resolve(&request.subject),
                n,
            },
            FactKind::GamesForDate { date } => Scope::Date {
                date,
                team: request.subject_text().map(|subject| directory.resolve(subject)),
            },
            FactKind::Standings { conference } => Scope::Standings(conference),
            FactKind::TopPlayersByStat { stat, limit } => Scope::Leaders { stat, limit },
            FactKind::TeamGameLeader { stat } => Scope::TeamLeader {
                team: directory.resolve(&request.subject),
                stat,
            },
        };
        let today = self.inner.clock.local_date(request.as_of);
        debug!(?scope, %today, "request normalized");

        Prepared {
            request,
            scope,
            today,
            season: Season::containing(today),
        }
    }

    fn race_width(&self, chain_len: usize) -> usize {
        let top_k = self.inner.settings.race_top_k;
        if top_k > 1 && chain_len > 1 {
            top_k.min(chain_len)
        } else {
            0
        }
    }

    async fn run_sequential(
        &self,
        prepared: &Prepared,
        plans: &[ProviderPlan],
        deadline: Instant,
        attempts: &mut Vec<ProviderAttempt>,
    ) -> Option<Accepted> {
        for (position, plan) in plans.iter().enumerate() {
            if Instant::now() >= deadline {
                warn!(provider = %plan.provider, "resolution deadline reached; remaining providers skipped");
                break;
            }
            let log = AttemptLog::default();
            let accepted = self.run_plan(prepared, *plan, deadline, &log).await;
            attempts.extend(log.take());
            if accepted.is_some() {
                return accepted;
            }
            if let Some(next) = plans.get(position + 1) {
                info!(from = %plan.provider, to = %next.provider, "falling back to next provider");
            }
        }
        None
    }

    /// Runs the top of the chain concurrently. The highest-priority accepted
    /// answer wins; a lower-priority answer is held until every provider
    /// above it has failed.
    async fn race(
        &self,
        prepared: &Prepared,
        plans: &[ProviderPlan],
        deadline: Instant,
    ) -> (Option<Accepted>, Vec<ProviderAttempt>) {
        let logs: Vec<Arc<AttemptLog>> = plans.iter().map(|_| Arc::default()).collect();
        let mut tasks = JoinSet::new();
        for (slot, plan) in plans.iter().copied().enumerate() {
            let orchestrator = self.clone();
            let prepared = prepared.clone();
            let log = Arc::clone(&logs[slot]);
            tasks.spawn(
                async move { (slot, orchestrator.run_plan(&prepared, plan, deadline, &log).await) }
                    .in_current_span(),
            );
        }

        let mut slots: Vec<RaceSlot> = plans.iter().map(|_| RaceSlot::Running).collect();
        let mut deadline_hit = false;
        let winner = loop {
            if let Some(slot) = decided_winner(&slots) {
                break Some(slot);
            }
            match timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((slot, accepted)))) => slots[slot] = RaceSlot::Finished(accepted),
                Ok(Some(Err(error))) => {
                    if error.is_panic() {
                        std::panic::resume_unwind(error.into_panic());
                    }
                    warn!(%error, "raced provider task cancelled");
                }
                Ok(None) => break best_buffered(&slots),
                Err(_) => {
                    warn!("resolution deadline reached while racing providers");
                    deadline_hit = true;
                    break best_buffered(&slots);
                }
            }
        };
        tasks.abort_all();

        let mut accepted = None;
        let mut attempts = Vec::new();
        for (index, ((plan, slot), log)) in plans.iter().zip(slots).zip(&logs).enumerate() {
            let finished = log.take();
            let next_attempt = u32::try_from(finished.len() + 1).unwrap_or(u32::MAX);
            // A task can finish between the decision and the abort.
            let ran_out = next_attempt > plan.total_attempts()
                || finished
                    .last()
                    .is_some_and(|attempt| !attempt.outcome.allows_retry());
            attempts.extend(finished);
            match slot {
                RaceSlot::Finished(answer) => {
                    if Some(index) == winner {
                        accepted = answer;
                    }
                }
                RaceSlot::Running if ran_out => {}
                RaceSlot::Running if deadline_hit => attempts.push(ProviderAttempt::new(
                    plan.provider,
                    next_attempt,
                    AttemptOutcome::Unavailable(format!("{} attempt timed out", plan.provider)),
                )),
                RaceSlot::Running => {
                    debug!(provider = %plan.provider, "aborting lower-priority provider");
                    attempts.push(ProviderAttempt::new(plan.provider, next_attempt, AttemptOutcome::Aborted));
                }
            }
        }
        (accepted, attempts)
    }

    /// Every attempt one provider gets for this request, each recorded in
    /// `log` as soon as it finishes.
    async fn run_plan(
        &self,
        prepared: &Prepared,
        plan: ProviderPlan,
        deadline: Instant,
        log: &AttemptLog,
    ) -> Option<Accepted> {
        let provider = plan.provider;
        let capability = prepared.request.kind.capability();

        let Some(source) = self.inner.sources.get(&provider).cloned() else {
            debug!(%provider, "provider in chain is not registered");
            log.record(ProviderAttempt::new(provider, 1, AttemptOutcome::Unsupported));
            return None;
        };
        let Some(route) = route_for(source.capabilities(), capability) else {
            debug!(%provider, %capability, "provider cannot answer this fact kind");
            log.record(ProviderAttempt::new(provider, 1, AttemptOutcome::Unsupported));
            return None;
        };
        if !source.health().await.accepts_requests() {
            warn!(%provider, "skipping unhealthy provider");
            log.record(ProviderAttempt::new(
                provider,
                1,
                AttemptOutcome::Unavailable(format!("{provider} circuit open")),
            ));
            return None;
        }

        let settings = self.inner.settings;
        for attempt_number in 1..=plan.total_attempts() {
            if attempt_number > 1 {
                let pause = settings.backoff.delay(attempt_number - 2);
                if !pause.is_zero() {
                    sleep_until((Instant::now() + pause).min(deadline)).await;
                }
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }

            let attempt_deadline = (now + settings.provider_timeout).min(deadline);
            let result = timeout_at(attempt_deadline, self.attempt(source.as_ref(), route, prepared))
                .await
                .unwrap_or_else(|_| Err(AttemptOutcome::Unavailable(format!("{provider} attempt timed out"))));

            match result {
                Ok((fact, warnings)) => {
                    debug!(%provider, attempt = attempt_number, "attempt accepted");
                    log.record(ProviderAttempt::new(provider, attempt_number, AttemptOutcome::Success));
                    return Some(Accepted {
                        provider,
                        fact,
                        warnings,
                    });
                }
                Err(outcome) => {
                    debug!(%provider, attempt = attempt_number, %outcome, "attempt failed");
                    let retry = outcome.allows_retry();
                    log.record(ProviderAttempt::new(provider, attempt_number, outcome));
                    if !retry {
                        break;
                    }
                }
            }
        }
        None
    }

    /// One fetch plus validation.
    async fn attempt(
        &self,
        source: &dyn FactSource,
        route: Route,
        prepared: &Prepared,
    ) -> Result<(Fact, Vec<Warning>), AttemptOutcome> {
        let settings = self.inner.settings;
        let validator = &self.inner.validator;
        let clock = self.inner.clock;
        let as_of = prepared.request.as_of;

        match &prepared.scope {
            Scope::Recent(team) if route == Route::ScanByDate => {
                self.scan_most_recent(source, team, prepared.today).await
            }
            Scope::Recent(team) => {
                let game = source
                    .most_recent_result(RecentGameRequest {
                        team: team.clone(),
                        lookback_days: settings.max_lookback_days,
                        as_of,
                    })
                    .await?;
                let (game, warnings) = validator.validate_result(game, team).into_parts()?;
                Ok((Fact::Game(game), warnings))
            }
            Scope::Window { team, n } => {
                let games = source
                    .results_window(WindowRequest {
                        team: team.clone(),
                        n: *n,
                        lookback_days: settings.max_lookback_days,
                        as_of,
                    })
                    .await?;
                let (mut games, warnings) = validator.validate_results(games, team).into_parts()?;
                games.sort_by(|left, right| {
                    clock
                        .game_local_date(right)
                        .cmp(&clock.game_local_date(left))
                        .then_with(|| right.start_time.cmp(&left.start_time))
                });
                games.truncate(*n);
                Ok((Fact::Games(games), warnings))
            }
            Scope::Date { date, team } => {
                let games = source.games_for_date(DateGamesRequest { date: *date }).await?;
                let games = clock.retain_on_date(games, *date);
                let games: Vec<GameResult> = match team {
                    Some(team) => games
                        .iter()
                        .filter_map(|game| game.oriented_to(&team.id))
                        .collect(),
                    None => games,
                };
                if games.is_empty() {
                    return Err(AttemptOutcome::NoData(format!(
                        "{} reported no matching games on {date}",
                        source.id()
                    )));
                }
                let (games, warnings) = validator.validate_games(games, team.as_ref()).into_parts()?;
                Ok((Fact::Games(games), warnings))
            }
            Scope::Standings(conference) => {
                let rows = source
                    .standings(StandingsRequest {
                        conference: *conference,
                        season: prepared.season,
                    })
                    .await?;
                let (rows, mut warnings) = validator.validate_standings(rows).into_parts()?;
                let mut rows: Vec<StandingEntry> = rows
                    .into_iter()
                    .filter(|row| row.conference == *conference)
                    .collect();
                if rows.is_empty() {
                    return Err(AttemptOutcome::Rejected(RejectReason::NoValidRecords));
                }
                if assign_conference_ranks(&mut rows) {
                    warnings.push(Warning::RanksComputed);
                }
                Ok((Fact::Standings(rows), warnings))
            }
            Scope::Leaders { stat, limit } => {
                let lines = source
                    .top_players_by_stat(LeadersRequest {
                        stat: *stat,
                        limit: *limit,
                        season: prepared.season,
                    })
                    .await?;
                let (lines, warnings) = validator.validate_leaders(lines, *limit).into_parts()?;
                Ok((Fact::Leaders(lines), warnings))
            }
            Scope::TeamLeader { team, stat } => {
                let candidate = source
                    .team_game_leader(TeamLeaderRequest {
                        team: team.clone(),
                        stat: *stat,
                        lookback_days: settings.max_lookback_days,
                        as_of,
                    })
                    .await?;
                let (leader, warnings) = validator.validate_game_leader(candidate, team).into_parts()?;
                Ok((Fact::GameLeader(leader), warnings))
            }
        }
    }

    /// Walks local days back from `today`, one date query per day, until a
    /// completed game of `team` validates. Bounded by `max_lookback_days`.
    async fn scan_most_recent(
        &self,
        source: &dyn FactSource,
        team: &CanonicalTeam,
        today: Date,
    ) -> Result<(Fact, Vec<Warning>), AttemptOutcome> {
        let max_days = self.inner.settings.max_lookback_days;
        let mut last_rejection = None;

        for offset in 0..max_days {
            let Some(date) = today.checked_sub(time::Duration::days(i64::from(offset))) else {
                break;
            };
            let games = match source.games_for_date(DateGamesRequest { date }).await {
                Ok(games) => games,
                Err(error) if error.kind() == ProviderErrorKind::NotFound => continue,
                Err(error) => return Err(error.into()),
            };

            let mut candidates: Vec<GameResult> = self
                .inner
                .clock
                .retain_on_date(games, date)
                .iter()
                .filter(|game| game.is_final())
                .filter_map(|game| game.oriented_to(&team.id))
                .collect();
            candidates.sort_by(|left, right| right.start_time.cmp(&left.start_time));

            for candidate in candidates {
                match self.inner.validator.validate_result(candidate, team).into_parts() {
                    Ok((game, warnings)) => {
                        debug!(%date, days_scanned = offset + 1, "most recent game found by date scan");
                        return Ok((Fact::Game(game), warnings));
                    }
                    Err(reason) => last_rejection = Some(reason),
                }
            }
        }

        Err(match last_rejection {
            Some(reason) => AttemptOutcome::Rejected(reason),
            None => AttemptOutcome::NoData(format!(
                "no completed game for {} in the last {max_days} days",
                team.id
            )),
        })
    }
}

fn route_for(capabilities: CapabilitySet, capability: Capability) -> Option<Route> {
    if capabilities.supports(capability) {
        Some(Route::Direct)
    } else if capability == Capability::MostRecentResult
        && capabilities.supports(Capability::GamesForDate)
    {
        Some(Route::ScanByDate)
    } else {
        None
    }
}

/// The first slot holding an accepted answer, provided every slot above it
/// has finished without one.
fn decided_winner(slots: &[RaceSlot]) -> Option<usize> {
    for (index, slot) in slots.iter().enumerate() {
        match slot {
            RaceSlot::Running => return None,
            RaceSlot::Finished(Some(_)) => return Some(index),
            RaceSlot::Finished(None) => {}
        }
    }
    None
}

fn best_buffered(slots: &[RaceSlot]) -> Option<usize> {
    slots.iter().position(RaceSlot::has_answer)
}

/// Assembles a [`FactOrchestrator`] from configuration and injected
/// providers.
///
/// ```rust,ignore
/// let orchestrator = FactOrchestratorBuilder::new(EngineConfig::default().with_env_overrides()?)
///     .with_live_providers()
///     .build()?;
/// ```
pub struct FactOrchestratorBuilder {
    config: EngineConfig,
    directory: Option<Arc<TeamDirectory>>,
    sources: Vec<Arc<dyn FactSource>>,
    live_providers: bool,
    http_client: Option<Arc<dyn HttpClient>>,
}

impl FactOrchestratorBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            directory: None,
            sources: Vec::new(),
            live_providers: false,
            http_client: None,
        }
    }

    pub fn with_directory(mut self, directory: TeamDirectory) -> Self {
        self.directory = Some(Arc::new(directory));
        self
    }

    /// Registers a provider. A later source replaces an earlier one with the
    /// same id, including the live adapters.
    pub fn with_source(mut self, source: Arc<dyn FactSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Wires ESPN, stats.nba.com and, when an API key is configured,
    /// balldontlie.io over one pooled HTTP client.
    pub fn with_live_providers(mut self) -> Self {
        self.live_providers = true;
        self
    }

    /// Transport used by the live adapters instead of the default reqwest
    /// client.
    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    pub fn build(self) -> Result<FactOrchestrator, CoreError> {
        let config = self.config;
        if config.provider_timeout_ms == 0 || config.resolution_deadline_ms == 0 {
            return Err(CoreError::Config(String::from(
                "provider and resolution timeouts must be greater than zero",
            )));
        }
        let clock = config.clock()?;
        let directory = self
            .directory
            .unwrap_or_else(|| Arc::new(TeamDirectory::nba()));

        let mut sources: HashMap<ProviderId, Arc<dyn FactSource>> = HashMap::new();
        if self.live_providers {
            let http_client: Arc<dyn HttpClient> = self
                .http_client
                .unwrap_or_else(|| Arc::new(ReqwestHttpClient::new()));
            let timeout_ms = config.provider_timeout_ms;

            sources.insert(
                ProviderId::Espn,
                Arc::new(
                    EspnAdapter::new(Arc::clone(&http_client), Arc::clone(&directory), clock)
                        .with_timeout_ms(timeout_ms),
                ),
            );
            sources.insert(
                ProviderId::NbaStats,
                Arc::new(
                    NbaStatsAdapter::new(Arc::clone(&http_client), Arc::clone(&directory))
                        .with_timeout_ms(timeout_ms),
                ),
            );
            match config.balldontlie_api_key.as_deref() {
                Some(api_key) => {
                    sources.insert(
                        ProviderId::BallDontLie,
                        Arc::new(
                            BallDontLieAdapter::new(
                                Arc::clone(&http_client),
                                api_key,
                                Arc::clone(&directory),
                                clock,
                            )
                            .with_timeout_ms(timeout_ms),
                        ),
                    );
                }
                None => info!("balldontlie disabled: no API key configured"),
            }
        }
        for source in self.sources {
            sources.insert(source.id(), source);
        }

        for capability in Capability::ALL {
            for plan in config.priorities.chain(capability) {
                if !sources.contains_key(&plan.provider) {
                    warn!(provider = %plan.provider, %capability, "priority chain names an unregistered provider");
                }
            }
        }

        let settings = Settings {
            provider_timeout: config.provider_timeout(),
            deadline: config.resolution_deadline(),
            max_lookback_days: config.max_lookback_days,
            race_top_k: config.race_top_k,
            backoff: Backoff::from_base_millis(config.retry_backoff_ms),
        };
        let cache = FactCache::new(config.cache_ttl());
        let validator = ResultValidator::new(directory.league());

        Ok(FactOrchestrator {
            inner: Arc::new(Inner {
                sources,
                priorities: config.priorities,
                directory,
                clock,
                validator,
                settings,
                cache,
            }),
        })
    }
}
