use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::adapters::transport::ProviderTransport;
use crate::circuit_breaker::CircuitBreaker;
use crate::data_source::{
    CapabilitySet, FactSource, HealthStatus, LeadersRequest, ProviderError, SourceFuture,
    StandingsRequest,
};
use crate::http_client::{HttpClient, HttpRequest};
use crate::throttling::RateGate;
use crate::{Conference, PlayerStatLine, ProviderId, StandingEntry, TeamDirectory};

const LEADERS_URL: &str = "https://stats.nba.com/stats/leagueleaders";
const STANDINGS_URL: &str = "https://stats.nba.com/stats/leaguestandingsv3";
const REQUESTS_PER_MINUTE: u32 = 20;
const SEASON_TYPE: &str = "Regular Season";

/// stats.nba.com adapter for conference standings and league leaders.
///
/// The endpoint rejects requests that do not look like they come from
/// nba.com, so every request carries the site's referer and origin headers.
#[derive(Clone)]
pub struct NbaStatsAdapter {
    transport: ProviderTransport,
    directory: Arc<TeamDirectory>,
}

impl NbaStatsAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, directory: Arc<TeamDirectory>) -> Self {
        Self {
            transport: ProviderTransport::new(
                ProviderId::NbaStats,
                http_client,
                RateGate::per_minute(REQUESTS_PER_MINUTE),
            ),
            directory,
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

    fn request(url: &str) -> HttpRequest {
        HttpRequest::get(url)
            .with_header("accept", "application/json")
            .with_header("referer", "https://www.nba.com/")
            .with_header("origin", "https://www.nba.com")
            .with_header("x-nba-stats-origin", "stats")
            .with_header("x-nba-stats-token", "true")
            .with_query("LeagueID", "00")
    }

    async fn fetch_leaders(&self, req: LeadersRequest) -> Result<Vec<PlayerStatLine>, ProviderError> {
        let request = Self::request(LEADERS_URL)
            .with_query("PerMode", "PerGame")
            .with_query("Scope", "S")
            .with_query("Season", req.season.label())
            .with_query("SeasonType", SEASON_TYPE)
            .with_query("StatCategory", req.stat.stats_code());
        let payload: LeadersResponse = self.transport.get_json(request).await?;
        let table = payload.result_set;

        let player = table.column("PLAYER")?;
        let team = table.column("TEAM")?;
        let value = table.column(req.stat.stats_code())?;
        let games = table.column("GP").ok();
        let rank = table.column("RANK").ok();

        Ok(table
            .row_set
            .iter()
            .enumerate()
            .map(|(position, row)| PlayerStatLine {
                rank: rank
                    .and_then(|column| cell_u32(row, column))
                    .unwrap_or_else(|| u32::try_from(position + 1).unwrap_or(u32::MAX)),
                player_name: cell_str(row, player).to_owned(),
                team_abbreviation: cell_str(row, team).to_owned(),
                stat: req.stat,
                value: cell_f64(row, value).unwrap_or(f64::NAN),
                games_played: games.and_then(|column| cell_u32(row, column)).unwrap_or(0),
                source_provider_id: ProviderId::NbaStats,
            })
            .collect())
    }

    async fn fetch_standings(&self, req: StandingsRequest) -> Result<Vec<StandingEntry>, ProviderError> {
        let request = Self::request(STANDINGS_URL)
            .with_query("Season", req.season.label())
            .with_query("SeasonType", SEASON_TYPE);
        let payload: StandingsResponse = self.transport.get_json(request).await?;
        let table = payload
            .result_sets
            .into_iter()
            .find(|set| set.name == "Standings")
            .ok_or_else(|| ProviderError::malformed("nba_stats response has no Standings result set"))?;

        let city = table.column("TeamCity")?;
        let name = table.column("TeamName")?;
        let conference = table.column("Conference")?;
        let wins = table.column("WINS")?;
        let losses = table.column("LOSSES")?;
        let pct = table.column("WinPCT").ok();
        let playoff_rank = table.column("PlayoffRank").ok();

        let mut entries = Vec::new();
        for row in &table.row_set {
            let row_conference = cell_str(row, conference).parse::<Conference>().ok();
            if row_conference != Some(req.conference) {
                continue;
            }
            let full_name = format!("{} {}", cell_str(row, city), cell_str(row, name));
            let team = self.directory.resolve(full_name.trim());
            if team.synthetic {
                debug!(team = %full_name, "standings row did not match a known team");
            }

            let mut entry = StandingEntry::new(
                team.id,
                team.canonical_name,
                req.conference,
                cell_i32(row, wins).unwrap_or(0),
                cell_i32(row, losses).unwrap_or(0),
                ProviderId::NbaStats,
            )
            .with_rank(playoff_rank.and_then(|column| cell_u32(row, column)));
            if let Some(pct) = pct.and_then(|column| cell_f64(row, column)) {
                entry = entry.with_win_pct(pct);
            }
            entries.push(entry);
        }

        if entries.is_empty() {
            return Err(ProviderError::not_found(format!(
                "nba_stats has no {} standings for {}",
                req.conference, req.season
            )));
        }
        Ok(entries)
    }
}

impl FactSource for NbaStatsAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::NbaStats
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new(false, false, false, true, true, false)
    }

    fn standings<'a>(&'a self, req: StandingsRequest) -> SourceFuture<'a, Vec<StandingEntry>> {
        Box::pin(self.fetch_standings(req))
    }

    fn top_players_by_stat<'a>(
        &'a self,
        req: LeadersRequest,
    ) -> SourceFuture<'a, Vec<PlayerStatLine>> {
        Box::pin(self.fetch_leaders(req))
    }

    fn health<'a>(&'a self) -> Pin<Box<dyn Future<Output = HealthStatus> + Send + 'a>> {
        Box::pin(async move { self.transport.health() })
    }
}

fn cell_str(row: &[Value], column: usize) -> &str {
    row.get(column).and_then(Value::as_str).unwrap_or_default()
}

fn cell_f64(row: &[Value], column: usize) -> Option<f64> {
    match row.get(column)? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn cell_i32(row: &[Value], column: usize) -> Option<i32> {
    cell_f64(row, column).map(|value| value as i32)
}

fn cell_u32(row: &[Value], column: usize) -> Option<u32> {
    cell_f64(row, column)
        .filter(|value| *value >= 0.0)
        .map(|value| value as u32)
}

#[derive(Debug, Deserialize)]
struct LeadersResponse {
    #[serde(rename = "resultSet")]
    result_set: ResultSet,
}

#[derive(Debug, Deserialize)]
struct StandingsResponse {
    #[serde(rename = "resultSets", default)]
    result_sets: Vec<ResultSet>,
}

/// Column-oriented table used by every stats.nba.com endpoint.
#[derive(Debug, Deserialize)]
struct ResultSet {
    #[serde(default)]
    name: String,
    #[serde(default)]
    headers: Vec<String>,
    #[serde(rename = "rowSet", default)]
    row_set: Vec<Vec<Value>>,
}

impl ResultSet {
    fn column(&self, header: &str) -> Result<usize, ProviderError> {
        self.headers
            .iter()
            .position(|candidate| candidate.eq_ignore_ascii_case(header))
            .ok_or_else(|| ProviderError::malformed(format!("nba_stats result set has no {header} column")))
    }
}
