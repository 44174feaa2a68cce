use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use time::{Date, Duration};
use tracing::debug;

use crate::adapters::matchup::{ReportedGame, ReportedSide};
use crate::adapters::transport::ProviderTransport;
use crate::circuit_breaker::CircuitBreaker;
use crate::data_source::{
    CapabilitySet, DateGamesRequest, FactSource, HealthStatus, ProviderError, RecentGameRequest,
    SourceFuture, WindowRequest,
};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::throttling::RateGate;
use crate::{
    parse_calendar_date, GameResult, GameStatus, LeagueClock, ProviderId, Season, TeamDirectory,
    UtcDateTime,
};

const GAMES_URL: &str = "https://api.balldontlie.io/v1/games";
const REQUESTS_PER_MINUTE: u32 = 30;
const PAGE_SIZE: &str = "100";
const MAX_PAGES: usize = 5;

/// balldontlie.io game feed adapter.
///
/// Every request carries the API key in the `authorization` header. Game
/// capabilities fetch a date range in one paged query and filter locally.
#[derive(Clone)]
pub struct BallDontLieAdapter {
    transport: ProviderTransport,
    auth: HttpAuth,
    directory: Arc<TeamDirectory>,
    clock: LeagueClock,
}

impl BallDontLieAdapter {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        api_key: impl Into<String>,
        directory: Arc<TeamDirectory>,
        clock: LeagueClock,
    ) -> Self {
        Self {
            transport: ProviderTransport::new(
                ProviderId::BallDontLie,
                http_client,
                RateGate::per_minute(REQUESTS_PER_MINUTE),
            ),
            auth: HttpAuth::ApiKey(api_key.into()),
            directory,
            clock,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.transport.set_timeout_ms(timeout_ms);
        self
    }

    pub fn with_circuit_breaker(mut self, circuit_breaker: Arc<CircuitBreaker>) -> Self {
        self.transport.set_circuit_breaker(circuit_breaker);
        self
    }

    /// All games between `start` and `end` inclusive, following the cursor
    /// for at most [`MAX_PAGES`] pages.
    async fn games_between(&self, start: Date, end: Date) -> Result<Vec<BdlGame>, ProviderError> {
        let mut games = Vec::new();
        let mut cursor: Option<u64> = None;

        for _ in 0..MAX_PAGES {
            let mut request = HttpRequest::get(GAMES_URL)
                .with_auth(&self.auth)
                .with_query("start_date", start.to_string())
                .with_query("end_date", end.to_string())
                .with_query("per_page", PAGE_SIZE);
            for season in seasons_between(start, end) {
                request = request.with_query("seasons[]", season.start_year().to_string());
            }
            if let Some(cursor) = cursor {
                request = request.with_query("cursor", cursor.to_string());
            }

            let page: GamesPage = self.transport.get_json(request).await?;
            games.extend(page.data);
            match page.meta.and_then(|meta| meta.next_cursor) {
                Some(next) => cursor = Some(next),
                None => return Ok(games),
            }
        }

        debug!(%start, %end, pages = MAX_PAGES, "stopping balldontlie pagination early");
        Ok(games)
    }

    fn local_date(&self, game: &ReportedGame<'_>) -> Option<Date> {
        game.start_time
            .map(|start| self.clock.local_date(start))
            .or(game.game_date)
    }

    async fn completed_games(
        &self,
        req: &RecentGameRequest,
        wanted: usize,
    ) -> Result<Vec<GameResult>, ProviderError> {
        let end = self.clock.local_date(req.as_of);
        let span = i64::from(req.lookback_days.saturating_sub(1));
        let start = end.checked_sub(Duration::days(span)).unwrap_or(end);

        let payload = self.games_between(start, end).await?;
        let mut games: Vec<GameResult> = payload
            .iter()
            .filter_map(reported_game)
            .filter(|game| game.status == GameStatus::Final)
            .filter(|game| self.local_date(game).is_some_and(|date| date >= start && date <= end))
            .filter_map(|game| game.for_subject(&self.directory, &req.team, ProviderId::BallDontLie))
            .collect();

        games.sort_by(|left, right| {
            right
                .game_date
                .cmp(&left.game_date)
                .then_with(|| right.start_time.cmp(&left.start_time))
        });
        games.truncate(wanted);

        if games.is_empty() {
            return Err(ProviderError::not_found(format!(
                "balldontlie has no completed game for {} between {start} and {end}",
                req.team.id
            )));
        }
        Ok(games)
    }
}

impl FactSource for BallDontLieAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::BallDontLie
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new(true, true, true, false, false, false)
    }

    fn most_recent_result<'a>(&'a self, req: RecentGameRequest) -> SourceFuture<'a, GameResult> {
        Box::pin(async move {
            let mut games = self.completed_games(&req, 1).await?;
            games
                .pop()
                .ok_or_else(|| ProviderError::not_found("balldontlie returned no completed game"))
        })
    }

    fn results_window<'a>(&'a self, req: WindowRequest) -> SourceFuture<'a, Vec<GameResult>> {
        Box::pin(async move {
            let recent = RecentGameRequest {
                team: req.team,
                lookback_days: req.lookback_days,
                as_of: req.as_of,
            };
            self.completed_games(&recent, req.n).await
        })
    }

    fn games_for_date<'a>(&'a self, req: DateGamesRequest) -> SourceFuture<'a, Vec<GameResult>> {
        Box::pin(async move {
            let payload = self.games_between(req.date, req.date).await?;
            Ok(payload
                .iter()
                .filter_map(reported_game)
                .filter(|game| self.local_date(game) == Some(req.date))
                .map(|game| game.neutral(&self.directory, ProviderId::BallDontLie))
                .collect())
        })
    }

    fn health<'a>(&'a self) -> Pin<Box<dyn Future<Output = HealthStatus> + Send + 'a>> {
        Box::pin(async move { self.transport.health() })
    }
}

fn seasons_between(start: Date, end: Date) -> Vec<Season> {
    let first = Season::containing(start);
    let last = Season::containing(end);
    if first == last {
        vec![first]
    } else {
        vec![first, last]
    }
}

fn reported_game(game: &BdlGame) -> Option<ReportedGame<'_>> {
    // `date` is the league-local day, sometimes with a midnight time part.
    let game_date = game
        .date
        .get(..10)
        .and_then(|day| parse_calendar_date(day).ok());
    let start_time = game
        .datetime
        .as_deref()
        .and_then(|raw| UtcDateTime::parse_lenient(raw).ok());
    if game_date.is_none() && start_time.is_none() {
        debug!(game = game.id, "skipping balldontlie game without a date");
        return None;
    }

    Some(ReportedGame {
        home: ReportedSide {
            abbreviation: &game.home_team.abbreviation,
            display_name: &game.home_team.full_name,
            score: game.home_team_score.unwrap_or(0),
        },
        away: ReportedSide {
            abbreviation: &game.visitor_team.abbreviation,
            display_name: &game.visitor_team.full_name,
            score: game.visitor_team_score.unwrap_or(0),
        },
        status: game_status(&game.status, game.period),
        game_date,
        start_time,
    })
}

fn game_status(status: &str, period: u32) -> GameStatus {
    let status = status.trim();
    if status.eq_ignore_ascii_case("final") {
        GameStatus::Final
    } else if period > 0
        || status.contains("Qtr")
        || status.eq_ignore_ascii_case("halftime")
        || status.contains("OT")
    {
        GameStatus::InProgress
    } else {
        GameStatus::Scheduled
    }
}

#[derive(Debug, Deserialize)]
struct GamesPage {
    #[serde(default)]
    data: Vec<BdlGame>,
    #[serde(default)]
    meta: Option<PageMeta>,
}

#[derive(Debug, Deserialize)]
struct PageMeta {
    #[serde(default)]
    next_cursor: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct BdlGame {
    #[serde(default)]
    id: u64,
    #[serde(default)]
    date: String,
    #[serde(default)]
    datetime: Option<String>,
    #[serde(default)]
    status: String,
    #[serde(default)]
    period: u32,
    home_team: BdlTeam,
    visitor_team: BdlTeam,
    #[serde(default)]
    home_team_score: Option<i32>,
    #[serde(default)]
    visitor_team_score: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct BdlTeam {
    #[serde(default)]
    abbreviation: String,
    #[serde(default)]
    full_name: String,
}
