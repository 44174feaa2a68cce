use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use time::{Date, Duration};
use tracing::debug;

use crate::adapters::matchup::{ReportedGame, ReportedSide};
use crate::adapters::transport::ProviderTransport;
use crate::circuit_breaker::CircuitBreaker;
use crate::data_source::{
    CapabilitySet, DateGamesRequest, FactSource, HealthStatus, ProviderError, ProviderErrorKind,
    RecentGameRequest, SourceFuture, StandingsRequest, TeamLeaderRequest, WindowRequest,
};
use crate::http_client::{HttpClient, HttpRequest};
use crate::throttling::RateGate;
use crate::{
    Conference, GameLeader, GameResult, GameStatus, LeagueClock, PlayerStatLine, ProviderId,
    StandingEntry, StatCategory, TeamDirectory, UtcDateTime,
};

const SCOREBOARD_URL: &str = "https://site.api.espn.com/apis/site/v2/sports/basketball/nba/scoreboard";
const STANDINGS_URL: &str = "https://site.api.espn.com/apis/v2/sports/basketball/nba/standings";
const SUMMARY_URL: &str = "https://site.api.espn.com/apis/site/v2/sports/basketball/nba/summary";
const REQUESTS_PER_MINUTE: u32 = 120;

/// ESPN public scoreboard, standings and box score adapter.
///
/// Game capabilities walk the scoreboard one local day at a time, newest
/// first, never further back than the request's lookback. Game leaders come
/// from the box score of the subject's latest completed event.
#[derive(Clone)]
pub struct EspnAdapter {
    transport: ProviderTransport,
    directory: Arc<TeamDirectory>,
    clock: LeagueClock,
}

impl EspnAdapter {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        directory: Arc<TeamDirectory>,
        clock: LeagueClock,
    ) -> Self {
        Self {
            transport: ProviderTransport::new(
                ProviderId::Espn,
                http_client,
                RateGate::per_minute(REQUESTS_PER_MINUTE),
            ),
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

    async fn scoreboard(&self, date: Date) -> Result<ScoreboardResponse, ProviderError> {
        let request = HttpRequest::get(SCOREBOARD_URL).with_query("dates", compact_date(date));
        self.transport.get_json(request).await
    }

    /// Scoreboard events whose local date is exactly `date`, keyed by event
    /// id.
    fn reported_games<'p>(
        &self,
        payload: &'p ScoreboardResponse,
        date: Date,
    ) -> Vec<(&'p str, ReportedGame<'p>)> {
        payload
            .events
            .iter()
            .filter_map(|event| {
                let game = reported_game(event)?;
                let local = game
                    .start_time
                    .map(|start| self.clock.local_date(start))
                    .or(game.game_date);
                if local == Some(date) {
                    Some((event.id.as_str(), game))
                } else {
                    debug!(event = %event.id, ?local, %date, "dropping scoreboard event outside requested day");
                    None
                }
            })
            .collect()
    }

    async fn completed_games(
        &self,
        req: &RecentGameRequest,
        wanted: usize,
    ) -> Result<Vec<GameResult>, ProviderError> {
        let events = self.completed_events(req, wanted).await?;
        Ok(events.into_iter().map(|(_, game)| game).collect())
    }

    /// Completed games of the subject with their event ids, newest first,
    /// scanning back from `as_of` until `wanted` games are found or the
    /// lookback runs out.
    async fn completed_events(
        &self,
        req: &RecentGameRequest,
        wanted: usize,
    ) -> Result<Vec<(String, GameResult)>, ProviderError> {
        let today = self.clock.local_date(req.as_of);
        let mut found = Vec::new();

        for offset in 0..req.lookback_days {
            let Some(date) = today.checked_sub(Duration::days(i64::from(offset))) else {
                break;
            };
            let payload = match self.scoreboard(date).await {
                Ok(payload) => payload,
                Err(error) if error.kind() == ProviderErrorKind::NotFound => continue,
                Err(error) => return Err(error),
            };

            let mut day: Vec<(String, GameResult)> = self
                .reported_games(&payload, date)
                .iter()
                .filter(|(_, game)| game.status == GameStatus::Final)
                .filter_map(|(event_id, game)| {
                    let game = game.for_subject(&self.directory, &req.team, ProviderId::Espn)?;
                    Some(((*event_id).to_owned(), game))
                })
                .collect();
            day.sort_by(|(_, left), (_, right)| right.start_time.cmp(&left.start_time));
            found.extend(day);

            if found.len() >= wanted {
                found.truncate(wanted);
                return Ok(found);
            }
        }

        if found.is_empty() {
            Err(ProviderError::not_found(format!(
                "espn has no completed game for {} in the last {} days",
                req.team.id, req.lookback_days
            )))
        } else {
            Ok(found)
        }
    }

    async fn fetch_game_leader(&self, req: TeamLeaderRequest) -> Result<GameLeader, ProviderError> {
        let recent = RecentGameRequest {
            team: req.team.clone(),
            lookback_days: req.lookback_days,
            as_of: req.as_of,
        };
        let (event_id, game) = self
            .completed_events(&recent, 1)
            .await?
            .pop()
            .ok_or_else(|| ProviderError::not_found("espn returned no completed game"))?;

        let request = HttpRequest::get(SUMMARY_URL).with_query("event", event_id.clone());
        let summary: SummaryResponse = self.transport.get_json(request).await?;
        let roster = summary
            .boxscore
            .players
            .iter()
            .find(|roster| {
                self.directory
                    .lookup(&roster.team.abbreviation)
                    .is_some_and(|team| team.id == req.team.id)
            })
            .ok_or_else(|| {
                ProviderError::malformed(format!("espn box score {event_id} has no {} players", req.team.id))
            })?;

        let (player_name, value) = roster.leader(req.stat).ok_or_else(|| {
            ProviderError::not_found(format!("espn box score {event_id} has no {} values", req.stat))
        })?;
        debug!(event = %event_id, player = %player_name, value, "box score leader found");

        let leader = PlayerStatLine {
            rank: 1,
            player_name,
            team_abbreviation: req.team.id.as_str().to_owned(),
            stat: req.stat,
            value,
            games_played: 1,
            source_provider_id: ProviderId::Espn,
        };
        Ok(GameLeader { game, leader })
    }

    async fn fetch_standings(&self, req: StandingsRequest) -> Result<Vec<StandingEntry>, ProviderError> {
        let request = HttpRequest::get(STANDINGS_URL)
            .with_query("season", (req.season.start_year() + 1).to_string());
        let payload: StandingsResponse = self.transport.get_json(request).await?;

        let group = payload
            .children
            .iter()
            .find(|group| {
                group.name.parse::<Conference>().ok()
                    .or_else(|| group.abbreviation.parse::<Conference>().ok())
                    == Some(req.conference)
            })
            .ok_or_else(|| {
                ProviderError::not_found(format!("espn standings have no {} conference", req.conference))
            })?;

        Ok(group
            .standings
            .entries
            .iter()
            .map(|row| {
                let team = self
                    .directory
                    .lookup(&row.team.abbreviation)
                    .cloned()
                    .unwrap_or_else(|| self.directory.resolve(&row.team.display_name));
                let wins = row.stat("wins").unwrap_or(0.0) as i32;
                let losses = row.stat("losses").unwrap_or(0.0) as i32;
                let mut entry = StandingEntry::new(
                    team.id,
                    team.canonical_name,
                    req.conference,
                    wins,
                    losses,
                    ProviderId::Espn,
                )
                .with_rank(row.stat("playoffSeed").map(|seed| seed as u32));
                if let Some(pct) = row.stat("winPercent") {
                    entry = entry.with_win_pct(pct);
                }
                entry
            })
            .collect())
    }
}

impl FactSource for EspnAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Espn
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new(true, true, true, true, false, true)
    }

    fn most_recent_result<'a>(&'a self, req: RecentGameRequest) -> SourceFuture<'a, GameResult> {
        Box::pin(async move {
            let mut games = self.completed_games(&req, 1).await?;
            games
                .pop()
                .ok_or_else(|| ProviderError::not_found("espn returned no completed game"))
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
            let payload = self.scoreboard(req.date).await?;
            Ok(self
                .reported_games(&payload, req.date)
                .iter()
                .map(|(_, game)| game.neutral(&self.directory, ProviderId::Espn))
                .collect())
        })
    }

    fn standings<'a>(&'a self, req: StandingsRequest) -> SourceFuture<'a, Vec<StandingEntry>> {
        Box::pin(self.fetch_standings(req))
    }

    fn team_game_leader<'a>(&'a self, req: TeamLeaderRequest) -> SourceFuture<'a, GameLeader> {
        Box::pin(self.fetch_game_leader(req))
    }

    fn health<'a>(&'a self) -> Pin<Box<dyn Future<Output = HealthStatus> + Send + 'a>> {
        Box::pin(async move { self.transport.health() })
    }
}

fn compact_date(date: Date) -> String {
    format!("{:04}{:02}{:02}", date.year(), u8::from(date.month()), date.day())
}

fn reported_game(event: &EspnEvent) -> Option<ReportedGame<'_>> {
    let competition = event.competitions.first()?;
    let competitors = &competition.competitors;
    if competitors.len() < 2 {
        return None;
    }

    let labelled = |label: &str| {
        competitors
            .iter()
            .find(|competitor| competitor.home_away.as_deref() == Some(label))
    };
    // Unlabelled feeds list the away side first.
    let home = labelled("home").unwrap_or(&competitors[1]);
    let away = labelled("away").unwrap_or(&competitors[0]);

    let status = competition
        .status
        .as_ref()
        .or(event.status.as_ref())
        .map(|status| status.kind.game_status())
        .unwrap_or(GameStatus::Scheduled);

    Some(ReportedGame {
        home: home.reported(),
        away: away.reported(),
        status,
        game_date: None,
        start_time: event
            .date
            .as_deref()
            .and_then(|raw| UtcDateTime::parse_lenient(raw).ok()),
    })
}

/// Scores arrive as strings, numbers or `{ "value": ... }` objects.
fn score_value(value: Option<&Value>) -> i32 {
    match value {
        Some(Value::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float as i64))
            .and_then(|score| i32::try_from(score).ok())
            .unwrap_or(0),
        Some(Value::String(text)) => text
            .trim()
            .parse::<f64>()
            .map(|score| score as i32)
            .unwrap_or(0),
        Some(Value::Object(map)) => score_value(map.get("value")),
        _ => 0,
    }
}

#[derive(Debug, Deserialize)]
struct ScoreboardResponse {
    #[serde(default)]
    events: Vec<EspnEvent>,
}

#[derive(Debug, Deserialize)]
struct EspnEvent {
    #[serde(default)]
    id: String,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    status: Option<EspnStatus>,
    #[serde(default)]
    competitions: Vec<EspnCompetition>,
}

#[derive(Debug, Deserialize)]
struct EspnCompetition {
    #[serde(default)]
    competitors: Vec<EspnCompetitor>,
    #[serde(default)]
    status: Option<EspnStatus>,
}

#[derive(Debug, Deserialize)]
struct EspnStatus {
    #[serde(rename = "type", default)]
    kind: EspnStatusType,
}

#[derive(Debug, Default, Deserialize)]
struct EspnStatusType {
    #[serde(default)]
    name: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    completed: bool,
}

impl EspnStatusType {
    fn game_status(&self) -> GameStatus {
        if self.completed || self.name == "STATUS_FINAL" || self.state == "post" {
            GameStatus::Final
        } else if self.state == "in" {
            GameStatus::InProgress
        } else {
            GameStatus::Scheduled
        }
    }
}

#[derive(Debug, Deserialize)]
struct EspnCompetitor {
    #[serde(rename = "homeAway", default)]
    home_away: Option<String>,
    #[serde(default)]
    team: EspnTeam,
    #[serde(default)]
    score: Option<Value>,
}

impl EspnCompetitor {
    fn reported(&self) -> ReportedSide<'_> {
        ReportedSide {
            abbreviation: &self.team.abbreviation,
            display_name: &self.team.display_name,
            score: score_value(self.score.as_ref()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct EspnTeam {
    #[serde(default)]
    abbreviation: String,
    #[serde(rename = "displayName", default)]
    display_name: String,
}

/// Box score values are strings; shooting columns read "made-attempted".
fn box_score_value(raw: &str) -> Option<f64> {
    let made = raw.split('-').next()?.trim();
    made.parse::<f64>().ok().filter(|value| value.is_finite())
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    #[serde(default)]
    boxscore: BoxScore,
}

#[derive(Debug, Default, Deserialize)]
struct BoxScore {
    #[serde(default)]
    players: Vec<BoxScoreRoster>,
}

#[derive(Debug, Deserialize)]
struct BoxScoreRoster {
    #[serde(default)]
    team: EspnTeam,
    #[serde(default)]
    statistics: Vec<BoxScoreTable>,
}

impl BoxScoreRoster {
    /// Highest value in the `stat` column; ties keep box score order.
    fn leader(&self, stat: StatCategory) -> Option<(String, f64)> {
        let table = self.statistics.first()?;
        let label = stat.box_score_label();
        let column = table
            .names
            .iter()
            .position(|name| name.eq_ignore_ascii_case(label))?;

        let mut best: Option<(&str, f64)> = None;
        for row in &table.athletes {
            let Some(value) = row.stats.get(column).and_then(|raw| box_score_value(raw)) else {
                continue;
            };
            if best.map_or(true, |(_, top)| value > top) {
                best = Some((row.athlete.display_name.as_str(), value));
            }
        }
        best.map(|(name, value)| (name.to_owned(), value))
    }
}

#[derive(Debug, Deserialize)]
struct BoxScoreTable {
    #[serde(default)]
    names: Vec<String>,
    #[serde(default)]
    athletes: Vec<BoxScoreRow>,
}

#[derive(Debug, Deserialize)]
struct BoxScoreRow {
    #[serde(default)]
    athlete: BoxScoreAthlete,
    #[serde(default)]
    stats: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BoxScoreAthlete {
    #[serde(rename = "displayName", default)]
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct StandingsResponse {
    #[serde(default)]
    children: Vec<ConferenceGroup>,
}

#[derive(Debug, Deserialize)]
struct ConferenceGroup {
    #[serde(default)]
    name: String,
    #[serde(default)]
    abbreviation: String,
    #[serde(default)]
    standings: StandingsTable,
}

#[derive(Debug, Default, Deserialize)]
struct StandingsTable {
    #[serde(default)]
    entries: Vec<StandingsRow>,
}

#[derive(Debug, Deserialize)]
struct StandingsRow {
    #[serde(default)]
    team: EspnTeam,
    #[serde(default)]
    stats: Vec<StandingsStat>,
}

impl StandingsRow {
    fn stat(&self, name: &str) -> Option<f64> {
        self.stats
            .iter()
            .find(|stat| stat.name == name)
            .and_then(|stat| stat.value)
            .filter(|value| value.is_finite())
    }
}

#[derive(Debug, Deserialize)]
struct StandingsStat {
    #[serde(default)]
    name: String,
    #[serde(default)]
    value: Option<f64>,
}
