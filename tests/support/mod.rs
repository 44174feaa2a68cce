#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use courtside_core::{
    CapabilitySet, DateGamesRequest, EngineConfig, FactOrchestrator, FactSource, GameLeader,
    GameResult, GameStatus, HealthStatus, LeadersRequest, MatchupSide, PlayerStatLine,
    PriorityTable, ProviderError, ProviderId, ProviderPlan, RecentGameRequest, SourceFuture,
    StandingEntry, StandingsRequest, StatCategory, TeamId, TeamLeaderRequest, UtcDateTime,
    WindowRequest,
};
use time::Date;

/// Replies handed out in order; once drained, `fallback` repeats.
struct Script<T> {
    replies: Mutex<VecDeque<Result<T, ProviderError>>>,
    fallback: Mutex<Option<Result<T, ProviderError>>>,
}

impl<T: Clone> Script<T> {
    fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(None),
        }
    }

    fn push(&self, reply: Result<T, ProviderError>) {
        self.replies.lock().expect("script lock").push_back(reply);
    }

    fn repeat(&self, reply: Result<T, ProviderError>) {
        *self.fallback.lock().expect("script lock") = Some(reply);
    }

    fn next(&self, what: &str) -> Result<T, ProviderError> {
        if let Some(reply) = self.replies.lock().expect("script lock").pop_front() {
            return reply;
        }
        self.fallback
            .lock()
            .expect("script lock")
            .clone()
            .unwrap_or_else(|| Err(ProviderError::not_found(format!("no scripted {what}"))))
    }
}

/// In-memory provider double with scripted replies per capability.
pub struct ScriptedSource {
    id: ProviderId,
    capabilities: CapabilitySet,
    healthy: bool,
    delay: Duration,
    calls: AtomicUsize,
    recent: Script<GameResult>,
    window: Script<Vec<GameResult>>,
    dates: Script<Vec<GameResult>>,
    games_by_date: Mutex<HashMap<Date, Vec<GameResult>>>,
    requested_dates: Mutex<Vec<Date>>,
    standings: Script<Vec<StandingEntry>>,
    leaders: Script<Vec<PlayerStatLine>>,
    game_leaders: Script<GameLeader>,
}

impl ScriptedSource {
    pub fn new(id: ProviderId) -> Self {
        Self {
            id,
            capabilities: CapabilitySet::full(),
            healthy: true,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            recent: Script::new(),
            window: Script::new(),
            dates: Script::new(),
            games_by_date: Mutex::new(HashMap::new()),
            requested_dates: Mutex::new(Vec::new()),
            standings: Script::new(),
            leaders: Script::new(),
            game_leaders: Script::new(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: CapabilitySet) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    /// Every call sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn then_recent(self, reply: Result<GameResult, ProviderError>) -> Self {
        self.recent.push(reply);
        self
    }

    pub fn always_recent(self, reply: Result<GameResult, ProviderError>) -> Self {
        self.recent.repeat(reply);
        self
    }

    pub fn always_window(self, reply: Result<Vec<GameResult>, ProviderError>) -> Self {
        self.window.repeat(reply);
        self
    }

    pub fn always_date_games(self, reply: Result<Vec<GameResult>, ProviderError>) -> Self {
        self.dates.repeat(reply);
        self
    }

    /// Answers date queries for `date` with `games`; other dates fall
    /// through to the date script.
    pub fn games_on(self, date: Date, games: Vec<GameResult>) -> Self {
        self.games_by_date
            .lock()
            .expect("date lock")
            .insert(date, games);
        self
    }

    pub fn always_standings(self, reply: Result<Vec<StandingEntry>, ProviderError>) -> Self {
        self.standings.repeat(reply);
        self
    }

    pub fn always_leaders(self, reply: Result<Vec<PlayerStatLine>, ProviderError>) -> Self {
        self.leaders.repeat(reply);
        self
    }

    pub fn then_game_leader(self, reply: Result<GameLeader, ProviderError>) -> Self {
        self.game_leaders.push(reply);
        self
    }

    pub fn always_game_leader(self, reply: Result<GameLeader, ProviderError>) -> Self {
        self.game_leaders.repeat(reply);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested_dates(&self) -> Vec<Date> {
        self.requested_dates.lock().expect("date lock").clone()
    }

    async fn answer<T>(&self, reply: impl FnOnce() -> Result<T, ProviderError>) -> Result<T, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        reply()
    }
}

impl FactSource for ScriptedSource {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    fn most_recent_result<'a>(&'a self, _req: RecentGameRequest) -> SourceFuture<'a, GameResult> {
        Box::pin(self.answer(|| self.recent.next("recent game")))
    }

    fn results_window<'a>(&'a self, _req: WindowRequest) -> SourceFuture<'a, Vec<GameResult>> {
        Box::pin(self.answer(|| self.window.next("results window")))
    }

    fn games_for_date<'a>(&'a self, req: DateGamesRequest) -> SourceFuture<'a, Vec<GameResult>> {
        Box::pin(self.answer(move || {
            self.requested_dates.lock().expect("date lock").push(req.date);
            match self.games_by_date.lock().expect("date lock").get(&req.date) {
                Some(games) => Ok(games.clone()),
                None => self.dates.next("date games"),
            }
        }))
    }

    fn standings<'a>(&'a self, _req: StandingsRequest) -> SourceFuture<'a, Vec<StandingEntry>> {
        Box::pin(self.answer(|| self.standings.next("standings")))
    }

    fn top_players_by_stat<'a>(
        &'a self,
        _req: LeadersRequest,
    ) -> SourceFuture<'a, Vec<PlayerStatLine>> {
        Box::pin(self.answer(|| self.leaders.next("leaders")))
    }

    fn team_game_leader<'a>(&'a self, _req: TeamLeaderRequest) -> SourceFuture<'a, GameLeader> {
        Box::pin(self.answer(|| self.game_leaders.next("game leader")))
    }

    fn health<'a>(&'a self) -> Pin<Box<dyn Future<Output = HealthStatus> + Send + 'a>> {
        let status = if self.healthy {
            HealthStatus::healthy()
        } else {
            HealthStatus::unhealthy()
        };
        Box::pin(async move { status })
    }
}

pub fn at(value: &str) -> UtcDateTime {
    UtcDateTime::parse(value).expect("valid timestamp")
}

/// A final game from `team`'s side, starting at `start` (UTC).
pub fn final_game(
    provider: ProviderId,
    team: &str,
    opponent: &str,
    scores: (i32, i32),
    game_date: Date,
    start: &str,
) -> GameResult {
    GameResult::new(
        MatchupSide::new(TeamId::new(team), team, scores.0),
        MatchupSide::new(TeamId::new(opponent), opponent, scores.1),
        GameStatus::Final,
        Some(game_date),
        provider,
    )
    .with_start_time(at(start))
}

/// `final_game` with another status; scores stay as given.
pub fn game_with_status(
    provider: ProviderId,
    team: &str,
    opponent: &str,
    scores: (i32, i32),
    status: GameStatus,
    game_date: Date,
    start: &str,
) -> GameResult {
    let mut game = final_game(provider, team, opponent, scores, game_date, start);
    game.status = status;
    game
}

/// `player` leading `game.team_id` with `value` points.
pub fn points_leader(game: GameResult, player: &str, team: &str, value: f64) -> GameLeader {
    let provider = game.source_provider_id;
    GameLeader {
        game,
        leader: PlayerStatLine {
            rank: 1,
            player_name: player.to_owned(),
            team_abbreviation: team.to_owned(),
            stat: StatCategory::Points,
            value,
            games_played: 1,
            source_provider_id: provider,
        },
    }
}

pub fn plans(entries: &[(ProviderId, u32)]) -> Vec<ProviderPlan> {
    entries
        .iter()
        .map(|(provider, extra)| ProviderPlan::new(*provider, *extra))
        .collect()
}

/// Config with `chains` installed for each listed capability and every
/// other chain empty.
pub fn config_with(chains: Vec<(courtside_core::Capability, Vec<ProviderPlan>)>) -> EngineConfig {
    let mut priorities = PriorityTable::empty();
    for (capability, chain) in chains {
        priorities = priorities.with_chain(capability, chain);
    }
    EngineConfig {
        provider_timeout_ms: 2_000,
        resolution_deadline_ms: 5_000,
        ..EngineConfig::default()
    }
    .with_priorities(priorities)
}

pub fn orchestrator(config: EngineConfig, sources: Vec<Arc<ScriptedSource>>) -> FactOrchestrator {
    sources
        .into_iter()
        .fold(FactOrchestrator::builder(config), |builder, source| {
            builder.with_source(source)
        })
        .build()
        .expect("orchestrator builds")
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
