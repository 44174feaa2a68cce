use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use courtside_core::{
    Capability, Conference, EngineConfig, ErrorClass, FactOrchestrator, FactRequest, HttpClient,
    HttpError, HttpRequest, HttpResponse, ProviderId, StatCategory, UtcDateTime,
};
use time::macros::date;

/// Answers by URL fragment; unmatched URLs get a 404.
struct RoutedHttpClient {
    routes: Vec<(&'static str, HttpResponse)>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl RoutedHttpClient {
    fn new(routes: Vec<(&'static str, HttpResponse)>) -> Arc<Self> {
        Arc::new(Self {
            routes,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .expect("requests lock")
            .iter()
            .map(HttpRequest::full_url)
            .collect()
    }

    fn calls_to(&self, fragment: &str) -> usize {
        self.urls().iter().filter(|url| url.contains(fragment)).count()
    }
}

impl HttpClient for RoutedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        let response = self
            .routes
            .iter()
            .find(|(fragment, _)| request.url.contains(fragment))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| HttpResponse::with_status(404, "{}"));
        self.requests.lock().expect("requests lock").push(request);
        Box::pin(async move { Ok(response) })
    }
}

const ESPN_SCOREBOARD: &str = "site/v2/sports/basketball/nba/scoreboard";
const ESPN_STANDINGS: &str = "apis/v2/sports/basketball/nba/standings";
const ESPN_SUMMARY: &str = "site/v2/sports/basketball/nba/summary";
const BDL_GAMES: &str = "api.balldontlie.io/v1/games";
const NBA_LEADERS: &str = "stats/leagueleaders";
const NBA_STANDINGS: &str = "stats/leaguestandingsv3";

const SCOREBOARD: &str = r#"{"events":[
    {"id":"401","date":"2024-01-15T00:30Z","competitions":[{
        "status":{"type":{"name":"STATUS_FINAL","completed":true,"state":"post"}},
        "competitors":[
            {"homeAway":"home","team":{"abbreviation":"NY","displayName":"New York Knicks"},"score":"112"},
            {"homeAway":"away","team":{"abbreviation":"BOS","displayName":"Boston Celtics"},"score":"106"}
        ]}]},
    {"id":"402","date":"2024-01-15T03:00Z","competitions":[{
        "status":{"type":{"name":"STATUS_FINAL","completed":true,"state":"post"}},
        "competitors":[
            {"homeAway":"home","team":{"abbreviation":"GS","displayName":"Golden State Warriors"},"score":{"value":130}},
            {"homeAway":"away","team":{"abbreviation":"UTAH","displayName":"Utah Jazz"},"score":{"value":119}}
        ]}]}
]}"#;

const BOX_SCORE: &str = r#"{"boxscore":{"players":[
    {"team":{"abbreviation":"GS"},"statistics":[{"names":["MIN","PTS","REB","AST"],"athletes":[
        {"athlete":{"displayName":"Stephen Curry"},"stats":["35","36","5","7"]},
        {"athlete":{"displayName":"Draymond Green"},"stats":["30","9","11","10"]}
    ]}]},
    {"team":{"abbreviation":"UTAH"},"statistics":[{"names":["MIN","PTS","REB","AST"],"athletes":[
        {"athlete":{"displayName":"Lauri Markkanen"},"stats":["34","27","9","2"]}
    ]}]}
]}}"#;

const BDL_PAGE: &str = r#"{"data":[
    {"id":9,"date":"2024-01-14","status":"Final","period":4,
     "home_team":{"abbreviation":"NYK","full_name":"New York Knicks"},
     "visitor_team":{"abbreviation":"BOS","full_name":"Boston Celtics"},
     "home_team_score":112,"visitor_team_score":106}
],"meta":{"next_cursor":null}}"#;

const NBA_STANDINGS_BODY: &str = r#"{"resultSets":[{"name":"Standings",
    "headers":["TeamCity","TeamName","Conference","WINS","LOSSES","WinPCT","PlayoffRank"],
    "rowSet":[
        ["Boston","Celtics","East",32,9,0.780,1],
        ["Philadelphia","76ers","East",27,13,0.675,2],
        ["Denver","Nuggets","West",28,14,0.667,2]
    ]}]}"#;

const ESPN_STANDINGS_BODY: &str = r#"{"children":[
    {"name":"Eastern Conference","abbreviation":"East","standings":{"entries":[
        {"team":{"abbreviation":"BOS","displayName":"Boston Celtics"},
         "stats":[{"name":"wins","value":32},{"name":"losses","value":9}]},
        {"team":{"abbreviation":"PHI","displayName":"Philadelphia 76ers"},
         "stats":[{"name":"wins","value":27},{"name":"losses","value":13}]}
    ]}}
]}"#;

const LEADERS_BODY: &str = r#"{"resultSet":{"name":"LeagueLeaders",
    "headers":["PLAYER_ID","RANK","PLAYER","TEAM","GP","PTS"],
    "rowSet":[[1,1,"Luka Doncic","DAL",40,35.1],[2,2,"Joel Embiid","PHI",34,34.7],[3,3,"Giannis Antetokounmpo","MIL",41,31.1]]}}"#;

fn as_of() -> UtcDateTime {
    UtcDateTime::parse("2024-01-15T18:00:00Z").expect("timestamp")
}

fn engine(client: Arc<RoutedHttpClient>, api_key: Option<&str>) -> FactOrchestrator {
    let config = EngineConfig {
        balldontlie_api_key: api_key.map(str::to_owned),
        max_lookback_days: 3,
        ..EngineConfig::default()
    };
    FactOrchestrator::builder(config)
        .with_http_client(client)
        .with_live_providers()
        .build()
        .expect("live engine builds")
}

#[test]
fn live_adapters_declare_their_capabilities() {
    let client = RoutedHttpClient::new(Vec::new());
    let engine = engine(client, Some("key"));
    assert_eq!(
        engine.providers(),
        vec![ProviderId::Espn, ProviderId::NbaStats, ProviderId::BallDontLie]
    );

    let espn = courtside_core::EspnAdapter::new(
        RoutedHttpClient::new(Vec::new()),
        Arc::new(courtside_core::TeamDirectory::nba()),
        courtside_core::LeagueClock::eastern_standard(),
    );
    let capabilities = courtside_core::FactSource::capabilities(&espn);
    assert!(capabilities.supports(Capability::MostRecentResult));
    assert!(capabilities.supports(Capability::Standings));
    assert!(!capabilities.supports(Capability::TopPlayersByStat));
}

#[tokio::test]
async fn espn_scoreboard_answers_most_recent_result() {
    let client = RoutedHttpClient::new(vec![(ESPN_SCOREBOARD, HttpResponse::ok_json(SCOREBOARD))]);
    let engine = engine(Arc::clone(&client), None);

    let resolved = engine
        .resolve(FactRequest::most_recent_result("Warriors", as_of()).expect("request"))
        .await
        .expect("espn answers");

    let game = resolved.fact.as_game().expect("game");
    assert_eq!(resolved.source_provider_id, ProviderId::Espn);
    assert_eq!(game.team_id.as_str(), "GSW");
    assert_eq!(game.opponent_id.as_str(), "UTA");
    assert_eq!((game.team_score, game.opponent_score), (130, 119));
    assert!(game.did_win);
    assert!(client.urls().iter().any(|url| url.contains("dates=20240114")));
}

#[tokio::test]
async fn espn_outage_falls_back_to_balldontlie() {
    let client = RoutedHttpClient::new(vec![
        (ESPN_SCOREBOARD, HttpResponse::with_status(503, "unavailable")),
        (BDL_GAMES, HttpResponse::ok_json(BDL_PAGE)),
    ]);
    let engine = engine(Arc::clone(&client), Some("key"));

    let resolved = engine
        .resolve(FactRequest::most_recent_result("Celtics", as_of()).expect("request"))
        .await
        .expect("balldontlie answers");

    let game = resolved.fact.as_game().expect("game");
    assert_eq!(resolved.source_provider_id, ProviderId::BallDontLie);
    assert_eq!(game.team_id.as_str(), "BOS");
    assert!(!game.did_win);
    assert_eq!(client.calls_to(ESPN_SCOREBOARD), 2);
    assert!(resolved.attempts[..2]
        .iter()
        .all(|attempt| attempt.outcome.error_class() == Some(ErrorClass::ProviderUnavailable)));
}

#[tokio::test]
async fn missing_api_key_leaves_balldontlie_out() {
    let client = RoutedHttpClient::new(vec![
        (ESPN_SCOREBOARD, HttpResponse::with_status(503, "unavailable")),
        (BDL_GAMES, HttpResponse::ok_json(BDL_PAGE)),
    ]);
    let engine = engine(Arc::clone(&client), None);

    let failure = engine
        .resolve(FactRequest::most_recent_result("Celtics", as_of()).expect("request"))
        .await
        .expect_err("only espn is wired");

    assert_eq!(client.calls_to(BDL_GAMES), 0);
    assert_eq!(failure.attempts.last().map(|attempt| attempt.provider_id), Some(ProviderId::BallDontLie));
}

#[tokio::test]
async fn espn_scoreboard_answers_games_for_date() {
    let client = RoutedHttpClient::new(vec![(ESPN_SCOREBOARD, HttpResponse::ok_json(SCOREBOARD))]);
    let engine = engine(client, None);

    let resolved = engine
        .resolve(FactRequest::games_for_date(date!(2024 - 01 - 14), as_of()))
        .await
        .expect("games");

    let labels: Vec<&str> = resolved
        .fact
        .as_games()
        .expect("games")
        .iter()
        .map(|game| game.matchup_label.as_str())
        .collect();
    assert_eq!(labels, vec!["BOS @ NYK", "UTA @ GSW"]);
}

#[tokio::test]
async fn nba_stats_standings_keep_provider_ranks() {
    let client = RoutedHttpClient::new(vec![(NBA_STANDINGS, HttpResponse::ok_json(NBA_STANDINGS_BODY))]);
    let engine = engine(Arc::clone(&client), None);

    let resolved = engine
        .resolve(FactRequest::standings(Conference::East, as_of()))
        .await
        .expect("standings");

    let rows = resolved.fact.as_standings().expect("rows");
    assert_eq!(resolved.source_provider_id, ProviderId::NbaStats);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].team_id.as_str(), "PHI");
    assert_eq!(rows[1].conference_rank, Some(2));
    assert!(resolved.warnings.is_empty());
    assert!(client.urls()[0].contains("Season=2023-24"));
}

#[tokio::test]
async fn standings_fall_back_to_espn_and_compute_ranks() {
    let client = RoutedHttpClient::new(vec![
        (NBA_STANDINGS, HttpResponse::ok_json(r#"{"resultSets":[]}"#)),
        (ESPN_STANDINGS, HttpResponse::ok_json(ESPN_STANDINGS_BODY)),
    ]);
    let engine = engine(client, None);

    let resolved = engine
        .resolve(FactRequest::standings(Conference::East, as_of()))
        .await
        .expect("espn standings");

    let ranks: Vec<(&str, Option<u32>)> = resolved
        .fact
        .as_standings()
        .expect("rows")
        .iter()
        .map(|row| (row.team_id.as_str(), row.conference_rank))
        .collect();
    assert_eq!(resolved.source_provider_id, ProviderId::Espn);
    assert_eq!(ranks, vec![("BOS", Some(1)), ("PHI", Some(2))]);
    assert_eq!(
        resolved.attempts[0].outcome.error_class(),
        Some(ErrorClass::ValidationFailed)
    );
}

#[tokio::test]
async fn nba_stats_answers_league_leaders() {
    let client = RoutedHttpClient::new(vec![(NBA_LEADERS, HttpResponse::ok_json(LEADERS_BODY))]);
    let engine = engine(Arc::clone(&client), None);

    let resolved = engine
        .resolve(FactRequest::top_players(StatCategory::Points, 2, as_of()).expect("request"))
        .await
        .expect("leaders");

    let names: Vec<&str> = resolved
        .fact
        .as_leaders()
        .expect("leaders")
        .iter()
        .map(|line| line.player_name.as_str())
        .collect();
    assert_eq!(names, vec!["Luka Doncic", "Joel Embiid"]);
    assert!(client.urls()[0].contains("StatCategory=PTS"));
}

#[tokio::test]
async fn espn_box_score_answers_team_game_leader() {
    let client = RoutedHttpClient::new(vec![
        (ESPN_SCOREBOARD, HttpResponse::ok_json(SCOREBOARD)),
        (ESPN_SUMMARY, HttpResponse::ok_json(BOX_SCORE)),
    ]);
    let engine = engine(Arc::clone(&client), None);

    let rebounds = engine
        .resolve(FactRequest::team_game_leader("Warriors", StatCategory::Rebounds, as_of()).expect("request"))
        .await
        .expect("box score leader");

    let found = rebounds.fact.as_game_leader().expect("game leader");
    assert_eq!(rebounds.source_provider_id, ProviderId::Espn);
    assert_eq!(found.leader.player_name, "Draymond Green");
    assert_eq!(found.leader.team_abbreviation, "GSW");
    assert_eq!(found.game.opponent_id.as_str(), "UTA");
    assert!(found.game.did_win);
    assert_eq!(client.calls_to(ESPN_SUMMARY), 1);
    assert!(client.urls().iter().any(|url| url.contains("event=402")));
}
