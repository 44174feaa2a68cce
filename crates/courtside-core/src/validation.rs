//! Plausibility checks applied to every provider answer before it is
//! accepted.
//!
//! The validator either accepts a record, accepts it with a correction or
//! warning attached, or rejects it with a typed reason. Rejection makes the
//! orchestrator retry or fall back; it is never surfaced as an error.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{CanonicalTeam, GameLeader, GameResult, League, PlayerStatLine, StandingEntry};

/// Why a candidate answer was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    NonPositiveScore,
    NotCompleted,
    OpponentEqualsSubject,
    SubjectNotInGame,
    LeaderNotOnTeam,
    MissingOpponent,
    MissingDate,
    NegativeRecord,
    InvalidStatValue,
    MissingPlayer,
    NoValidRecords,
}

impl RejectReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NonPositiveScore => "non-positive score",
            Self::NotCompleted => "game not completed",
            Self::OpponentEqualsSubject => "opponent equals subject",
            Self::SubjectNotInGame => "subject did not play in game",
            Self::LeaderNotOnTeam => "leader not on subject team",
            Self::MissingOpponent => "missing opponent",
            Self::MissingDate => "missing date",
            Self::NegativeRecord => "negative win/loss record",
            Self::InvalidStatValue => "invalid stat value",
            Self::MissingPlayer => "missing player name",
            Self::NoValidRecords => "no valid records",
        }
    }
}

impl Display for RejectReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A correction or oddity attached to an accepted answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "warning")]
pub enum Warning {
    WinFlagCorrected,
    UnusualScoreRange,
    SidesSwapped,
    RecordsDropped { count: usize },
    RanksComputed,
    LeadersResorted,
}

impl Warning {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WinFlagCorrected => "win flag corrected",
            Self::UnusualScoreRange => "unusual score range",
            Self::SidesSwapped => "sides swapped",
            Self::RecordsDropped { .. } => "records dropped",
            Self::RanksComputed => "ranks computed",
            Self::LeadersResorted => "leaders re-sorted",
        }
    }
}

impl Display for Warning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RecordsDropped { count } => write!(f, "{} ({count})", self.as_str()),
            _ => f.write_str(self.as_str()),
        }
    }
}

/// Validator outcome. Accepted values carry any corrections already applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict<T> {
    Accept(T),
    AcceptWithWarning(T, Vec<Warning>),
    Reject(RejectReason),
}

impl<T> Verdict<T> {
    pub fn accepted(value: T, warnings: Vec<Warning>) -> Self {
        if warnings.is_empty() {
            Self::Accept(value)
        } else {
            Self::AcceptWithWarning(value, warnings)
        }
    }

    pub fn is_accepted(&self) -> bool {
        !matches!(self, Self::Reject(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Verdict<U> {
        match self {
            Self::Accept(value) => Verdict::Accept(f(value)),
            Self::AcceptWithWarning(value, warnings) => Verdict::AcceptWithWarning(f(value), warnings),
            Self::Reject(reason) => Verdict::Reject(reason),
        }
    }

    pub fn into_parts(self) -> Result<(T, Vec<Warning>), RejectReason> {
        match self {
            Self::Accept(value) => Ok((value, Vec::new())),
            Self::AcceptWithWarning(value, warnings) => Ok((value, warnings)),
            Self::Reject(reason) => Err(reason),
        }
    }
}

/// Stateless plausibility checker for one league.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultValidator {
    league: League,
}

impl Default for ResultValidator {
    fn default() -> Self {
        Self::new(League::Nba)
    }
}

impl ResultValidator {
    pub const fn new(league: League) -> Self {
        Self { league }
    }

    /// Checks one game.
    ///
    /// Final games need positive scores; games not yet finished only need
    /// non-negative ones. A wrong win flag is corrected from the scores.
    /// `subject`, when given, must be the team side and not the opponent.
    pub fn validate_game(
        &self,
        mut game: GameResult,
        subject: Option<&CanonicalTeam>,
    ) -> Verdict<GameResult> {
        let lowest = if game.is_final() { 1 } else { 0 };
        if game.team_score < lowest || game.opponent_score < lowest {
            return self.reject(&game, RejectReason::NonPositiveScore);
        }
        if game.opponent_id.is_empty() && game.opponent_name.trim().is_empty() {
            return self.reject(&game, RejectReason::MissingOpponent);
        }
        let names_subject = subject.is_some_and(|subject| {
            game.opponent_id == subject.id || subject.answers_to(&game.opponent_name)
        });
        if game.opponent_id == game.team_id || names_subject {
            return self.reject(&game, RejectReason::OpponentEqualsSubject);
        }
        let plays_as_team = subject.map_or(true, |subject| {
            game.team_id == subject.id || subject.answers_to(&game.team_name)
        });
        if !plays_as_team {
            return self.reject(&game, RejectReason::SubjectNotInGame);
        }
        if game.game_date.is_none() && game.start_time.is_none() {
            return self.reject(&game, RejectReason::MissingDate);
        }

        let mut warnings = Vec::new();
        let derived = game.derived_win();
        if game.did_win != derived {
            warn!(
                team = %game.team_id,
                opponent = %game.opponent_id,
                reported = game.did_win,
                corrected = derived,
                "correcting win flag from scores"
            );
            game.did_win = derived;
            warnings.push(Warning::WinFlagCorrected);
        }
        let plausible = self.league.plausible_score_range();
        if game.is_final()
            && !(plausible.contains(&game.team_score) && plausible.contains(&game.opponent_score))
        {
            warnings.push(Warning::UnusualScoreRange);
        }

        Verdict::accepted(game, warnings)
    }

    /// Like [`validate_game`](Self::validate_game), but an
    /// opponent-equals-subject rejection gets one re-check with the sides
    /// swapped.
    pub fn validate_game_or_swap(
        &self,
        game: GameResult,
        subject: Option<&CanonicalTeam>,
    ) -> Verdict<GameResult> {
        let swapped = game.swapped();
        match self.validate_game(game, subject) {
            Verdict::Reject(RejectReason::OpponentEqualsSubject) => {
                match self.validate_game(swapped, subject).into_parts() {
                    Ok((game, mut warnings)) => {
                        debug!(team = %game.team_id, "accepted game after swapping sides");
                        warnings.insert(0, Warning::SidesSwapped);
                        Verdict::accepted(game, warnings)
                    }
                    Err(_) => Verdict::Reject(RejectReason::OpponentEqualsSubject),
                }
            }
            verdict => verdict,
        }
    }

    /// A completed game of `subject`: anything not final is rejected before
    /// the regular checks run.
    pub fn validate_result(&self, game: GameResult, subject: &CanonicalTeam) -> Verdict<GameResult> {
        if !game.is_final() {
            return self.reject(&game, RejectReason::NotCompleted);
        }
        self.validate_game_or_swap(game, Some(subject))
    }

    /// Validates every game on its own, dropping rejects.
    pub fn validate_games(
        &self,
        games: Vec<GameResult>,
        subject: Option<&CanonicalTeam>,
    ) -> Verdict<Vec<GameResult>> {
        self.validate_each(games, |game| self.validate_game_or_swap(game, subject))
    }

    /// Like [`validate_games`](Self::validate_games), keeping only completed
    /// games of `subject`.
    pub fn validate_results(
        &self,
        games: Vec<GameResult>,
        subject: &CanonicalTeam,
    ) -> Verdict<Vec<GameResult>> {
        self.validate_each(games, |game| self.validate_result(game, subject))
    }

    /// The game must be a completed game of `subject` and the leader one of
    /// its players with a usable value.
    pub fn validate_game_leader(
        &self,
        candidate: GameLeader,
        subject: &CanonicalTeam,
    ) -> Verdict<GameLeader> {
        let GameLeader { game, leader } = candidate;
        let (game, warnings) = match self.validate_result(game, subject).into_parts() {
            Ok(parts) => parts,
            Err(reason) => return Verdict::Reject(reason),
        };

        let reason = if !leader.value.is_finite() || leader.value < 0.0 {
            Some(RejectReason::InvalidStatValue)
        } else if leader.player_name.trim().is_empty() {
            Some(RejectReason::MissingPlayer)
        } else if !subject.answers_to(&leader.team_abbreviation) {
            Some(RejectReason::LeaderNotOnTeam)
        } else {
            None
        };
        if let Some(reason) = reason {
            debug!(
                player = %leader.player_name,
                team = %leader.team_abbreviation,
                subject = %subject.id,
                %reason,
                "rejecting game leader"
            );
            return Verdict::Reject(reason);
        }

        Verdict::accepted(GameLeader { game, leader }, warnings)
    }

    fn validate_each(
        &self,
        games: Vec<GameResult>,
        check: impl Fn(GameResult) -> Verdict<GameResult>,
    ) -> Verdict<Vec<GameResult>> {
        let total = games.len();
        let mut kept = Vec::with_capacity(total);
        let mut warnings = Vec::new();

        for game in games {
            if let Ok((game, game_warnings)) = check(game).into_parts() {
                for warning in game_warnings {
                    if !warnings.contains(&warning) {
                        warnings.push(warning);
                    }
                }
                kept.push(game);
            }
        }

        self.finish_list(kept, total, warnings)
    }

    /// Drops rows with negative win or loss counts.
    pub fn validate_standings(&self, entries: Vec<StandingEntry>) -> Verdict<Vec<StandingEntry>> {
        let total = entries.len();
        let kept: Vec<StandingEntry> = entries
            .into_iter()
            .filter(|entry| {
                let valid = entry.wins >= 0 && entry.losses >= 0;
                if !valid {
                    debug!(team = %entry.team_id, reason = %RejectReason::NegativeRecord, "dropping standings row");
                }
                valid
            })
            .collect();

        self.finish_list(kept, total, Vec::new())
    }

    /// Drops non-finite or negative values, re-sorts descending if the
    /// provider order is off, renumbers ranks and truncates to `limit`.
    pub fn validate_leaders(
        &self,
        lines: Vec<PlayerStatLine>,
        limit: usize,
    ) -> Verdict<Vec<PlayerStatLine>> {
        let total = lines.len();
        let mut kept: Vec<PlayerStatLine> = lines
            .into_iter()
            .filter(|line| {
                let valid = line.value.is_finite() && line.value >= 0.0;
                if !valid {
                    debug!(player = %line.player_name, reason = %RejectReason::InvalidStatValue, "dropping leader row");
                }
                valid
            })
            .collect();
        let invalid = total - kept.len();

        let mut warnings = Vec::new();
        if kept.windows(2).any(|pair| pair[0].value < pair[1].value) {
            kept.sort_by(|left, right| right.value.total_cmp(&left.value));
            warnings.push(Warning::LeadersResorted);
        }
        for (position, line) in kept.iter_mut().enumerate() {
            line.rank = u32::try_from(position + 1).unwrap_or(u32::MAX);
        }
        kept.truncate(limit);

        // Truncation to `limit` is not a drop.
        let considered = kept.len() + invalid;
        self.finish_list(kept, considered, warnings)
    }

    fn finish_list<T>(
        &self,
        kept: Vec<T>,
        total: usize,
        mut warnings: Vec<Warning>,
    ) -> Verdict<Vec<T>> {
        if kept.is_empty() {
            debug!(total, "every record rejected");
            return Verdict::Reject(RejectReason::NoValidRecords);
        }
        let dropped = total.saturating_sub(kept.len());
        if dropped > 0 {
            warnings.push(Warning::RecordsDropped { count: dropped });
        }
        Verdict::accepted(kept, warnings)
    }

    fn reject<T>(&self, game: &GameResult, reason: RejectReason) -> Verdict<T> {
        debug!(
            team = %game.team_id,
            opponent = %game.opponent_id,
            provider = %game.source_provider_id,
            %reason,
            "rejecting game"
        );
        Verdict::Reject(reason)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;
    use crate::{Conference, GameStatus, MatchupSide, ProviderId, StatCategory, TeamDirectory, TeamId};

    fn final_game(team: &str, opponent: &str, team_score: i32, opponent_score: i32) -> GameResult {
        GameResult::new(
            MatchupSide::new(TeamId::new(team), team, team_score),
            MatchupSide::new(TeamId::new(opponent), opponent, opponent_score),
            GameStatus::Final,
            Some(date!(2024 - 01 - 15)),
            ProviderId::Espn,
        )
    }

    fn boston() -> CanonicalTeam {
        TeamDirectory::nba().resolve("Boston Celtics")
    }

    fn leader(name: &str, value: f64) -> PlayerStatLine {
        PlayerStatLine {
            rank: 0,
            player_name: name.to_owned(),
            team_abbreviation: String::from("BOS"),
            stat: StatCategory::Points,
            value,
            games_played: 40,
            source_provider_id: ProviderId::NbaStats,
        }
    }

    #[test]
    fn accepts_a_plausible_game() {
        let verdict = ResultValidator::default().validate_game(final_game("BOS", "MIA", 110, 102), Some(&boston()));
        assert!(matches!(verdict, Verdict::Accept(_)));
    }

    #[test]
    fn rejects_non_positive_final_scores() {
        let verdict = ResultValidator::default().validate_game(final_game("BOS", "MIA", 0, 102), None);
        assert_eq!(verdict, Verdict::Reject(RejectReason::NonPositiveScore));
    }

    #[test]
    fn scheduled_games_skip_score_rules() {
        let mut game = final_game("BOS", "MIA", 0, 0);
        game.status = GameStatus::Scheduled;
        assert!(ResultValidator::default().validate_game(game, None).is_accepted());
    }

    #[test]
    fn live_games_need_non_negative_scores_and_a_consistent_win_flag() {
        let mut game = final_game("NYK", "BOS", 50, 48);
        game.status = GameStatus::InProgress;
        game.did_win = false;
        let (game, warnings) = ResultValidator::default()
            .validate_game(game, None)
            .into_parts()
            .expect("live game is plausible");
        assert!(game.did_win);
        assert_eq!(warnings, vec![Warning::WinFlagCorrected]);

        let mut negative = final_game("NYK", "BOS", -2, 48);
        negative.status = GameStatus::InProgress;
        assert_eq!(
            ResultValidator::default().validate_game(negative, None),
            Verdict::Reject(RejectReason::NonPositiveScore)
        );
    }

    #[test]
    fn results_must_be_completed() {
        let validator = ResultValidator::default();
        for status in [GameStatus::InProgress, GameStatus::Scheduled] {
            let mut game = final_game("BOS", "MIA", 50, 48);
            game.status = status;
            assert_eq!(
                validator.validate_result(game, &boston()),
                Verdict::Reject(RejectReason::NotCompleted)
            );
        }
        assert!(validator.validate_result(final_game("BOS", "MIA", 110, 102), &boston()).is_accepted());
    }

    #[test]
    fn rejects_games_the_subject_did_not_play() {
        let verdict = ResultValidator::default()
            .validate_game_or_swap(final_game("MIA", "NYK", 110, 100), Some(&boston()));
        assert_eq!(verdict, Verdict::Reject(RejectReason::SubjectNotInGame));
    }

    #[test]
    fn result_lists_keep_completed_games_of_the_subject() {
        let mut live = final_game("BOS", "LAL", 60, 58);
        live.status = GameStatus::InProgress;
        let games = vec![final_game("BOS", "MIA", 110, 102), live, final_game("MIA", "NYK", 99, 97)];

        let (kept, warnings) = ResultValidator::default()
            .validate_results(games, &boston())
            .into_parts()
            .expect("one game survives");
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].opponent_id.as_str(), "MIA");
        assert_eq!(warnings, vec![Warning::RecordsDropped { count: 2 }]);
    }

    #[test]
    fn game_leader_must_belong_to_the_subject() {
        let validator = ResultValidator::default();
        let candidate = |team: &str, value: f64| GameLeader {
            game: final_game("MIA", "BOS", 102, 110),
            leader: PlayerStatLine {
                team_abbreviation: team.to_owned(),
                games_played: 1,
                rank: 1,
                ..leader("Jayson Tatum", value)
            },
        };

        match validator.validate_game_leader(candidate("BOS", 34.0), &boston()) {
            Verdict::AcceptWithWarning(accepted, warnings) => {
                assert_eq!(accepted.game.team_id.as_str(), "BOS");
                assert_eq!(warnings, vec![Warning::SidesSwapped]);
            }
            other => panic!("expected swapped acceptance, got {other:?}"),
        }
        assert_eq!(
            validator.validate_game_leader(candidate("MIA", 34.0), &boston()),
            Verdict::Reject(RejectReason::LeaderNotOnTeam)
        );
        assert_eq!(
            validator.validate_game_leader(candidate("BOS", f64::NAN), &boston()),
            Verdict::Reject(RejectReason::InvalidStatValue)
        );
    }

    #[test]
    fn rejects_opponent_matching_subject_by_alias() {
        let mut game = final_game("MIA", "XXX", 110, 102);
        game.opponent_id = TeamId::new("");
        game.opponent_name = String::from("celtics");
        let verdict = ResultValidator::default().validate_game(game, Some(&boston()));
        assert_eq!(verdict, Verdict::Reject(RejectReason::OpponentEqualsSubject));
    }

    #[test]
    fn rejects_team_playing_itself() {
        let verdict = ResultValidator::default().validate_game(final_game("BOS", "BOS", 101, 99), None);
        assert_eq!(verdict, Verdict::Reject(RejectReason::OpponentEqualsSubject));
    }

    #[test]
    fn rejects_missing_date() {
        let mut game = final_game("BOS", "MIA", 110, 102);
        game.game_date = None;
        let verdict = ResultValidator::default().validate_game(game, None);
        assert_eq!(verdict, Verdict::Reject(RejectReason::MissingDate));
    }

    #[test]
    fn corrects_wrong_win_flag() {
        let mut game = final_game("BOS", "MIA", 110, 102);
        game.did_win = false;
        match ResultValidator::default().validate_game(game, Some(&boston())) {
            Verdict::AcceptWithWarning(game, warnings) => {
                assert!(game.did_win);
                assert_eq!(warnings, vec![Warning::WinFlagCorrected]);
            }
            other => panic!("expected a corrected game, got {other:?}"),
        }
    }

    #[test]
    fn warns_on_unusual_score_range() {
        let verdict = ResultValidator::default().validate_game(final_game("BOS", "MIA", 210, 40), None);
        assert_eq!(
            verdict.into_parts().map(|(_, warnings)| warnings),
            Ok(vec![Warning::UnusualScoreRange])
        );
    }

    #[test]
    fn swaps_sides_once_when_subject_is_reported_as_opponent() {
        let reported = final_game("MIA", "BOS", 102, 110);
        match ResultValidator::default().validate_game_or_swap(reported, Some(&boston())) {
            Verdict::AcceptWithWarning(game, warnings) => {
                assert_eq!(game.team_id.as_str(), "BOS");
                assert!(game.did_win);
                assert_eq!(warnings, vec![Warning::SidesSwapped]);
            }
            other => panic!("expected swapped acceptance, got {other:?}"),
        }
    }

    #[test]
    fn swap_cannot_rescue_self_matchups() {
        let verdict = ResultValidator::default()
            .validate_game_or_swap(final_game("BOS", "BOS", 101, 99), Some(&boston()));
        assert_eq!(verdict, Verdict::Reject(RejectReason::OpponentEqualsSubject));
    }

    #[test]
    fn list_validation_drops_bad_records_with_warning() {
        let games = vec![
            final_game("BOS", "MIA", 110, 102),
            final_game("BOS", "NYK", 0, 0),
        ];
        match ResultValidator::default().validate_games(games, Some(&boston())) {
            Verdict::AcceptWithWarning(kept, warnings) => {
                assert_eq!(kept.len(), 1);
                assert_eq!(warnings, vec![Warning::RecordsDropped { count: 1 }]);
            }
            other => panic!("expected partial acceptance, got {other:?}"),
        }
    }

    #[test]
    fn list_with_no_valid_records_is_rejected() {
        let verdict = ResultValidator::default().validate_games(vec![final_game("BOS", "BOS", 1, 1)], None);
        assert_eq!(verdict, Verdict::Reject(RejectReason::NoValidRecords));
        let verdict = ResultValidator::default().validate_games(Vec::new(), None);
        assert_eq!(verdict, Verdict::Reject(RejectReason::NoValidRecords));
    }

    #[test]
    fn drops_negative_standings_rows() {
        let rows = vec![
            StandingEntry::new(TeamId::new("BOS"), "Boston Celtics", Conference::East, 30, 10, ProviderId::NbaStats),
            StandingEntry::new(TeamId::new("MIA"), "Miami Heat", Conference::East, -1, 10, ProviderId::NbaStats),
        ];
        let (kept, warnings) = ResultValidator::default()
            .validate_standings(rows)
            .into_parts()
            .expect("one row survives");
        assert_eq!(kept.len(), 1);
        assert_eq!(warnings, vec![Warning::RecordsDropped { count: 1 }]);
    }

    #[test]
    fn resorts_and_truncates_leaders() {
        let lines = vec![leader("B", 27.1), leader("A", 30.2), leader("C", 25.0), leader("D", f64::NAN)];
        let (kept, warnings) = ResultValidator::default()
            .validate_leaders(lines, 2)
            .into_parts()
            .expect("leaders accepted");

        let names: Vec<(&str, u32)> = kept.iter().map(|line| (line.player_name.as_str(), line.rank)).collect();
        assert_eq!(names, vec![("A", 1), ("B", 2)]);
        assert_eq!(
            warnings,
            vec![Warning::LeadersResorted, Warning::RecordsDropped { count: 1 }]
        );
    }

    #[test]
    fn ordered_leaders_are_accepted_cleanly() {
        let verdict = ResultValidator::default().validate_leaders(vec![leader("A", 30.0), leader("B", 29.0)], 5);
        assert!(matches!(verdict, Verdict::Accept(ref kept) if kept.len() == 2));
    }

    #[test]
    fn warning_strings_are_stable() {
        assert_eq!(Warning::WinFlagCorrected.to_string(), "win flag corrected");
        assert_eq!(Warning::RecordsDropped { count: 2 }.to_string(), "records dropped (2)");
        assert_eq!(RejectReason::NonPositiveScore.to_string(), "non-positive score");
    }
}
