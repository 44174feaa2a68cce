use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Conference, ProviderId, TeamId};

/// One row of a conference standings table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingEntry {
    pub team_id: TeamId,
    pub team_name: String,
    pub conference: Conference,
    pub wins: i32,
    pub losses: i32,
    pub win_pct: f64,
    pub conference_rank: Option<u32>,
    pub source_provider_id: ProviderId,
}

impl StandingEntry {
    pub fn new(
        team_id: TeamId,
        team_name: impl Into<String>,
        conference: Conference,
        wins: i32,
        losses: i32,
        source_provider_id: ProviderId,
    ) -> Self {
        let mut entry = Self {
            team_id,
            team_name: team_name.into(),
            conference,
            wins,
            losses,
            win_pct: 0.0,
            conference_rank: None,
            source_provider_id,
        };
        entry.win_pct = entry.computed_win_pct();
        entry
    }

    pub fn with_win_pct(mut self, win_pct: f64) -> Self {
        if win_pct.is_finite() && (0.0..=1.0).contains(&win_pct) {
            self.win_pct = win_pct;
        }
        self
    }

    pub fn with_rank(mut self, rank: Option<u32>) -> Self {
        self.conference_rank = rank.filter(|rank| *rank > 0);
        self
    }

    pub fn games_played(&self) -> i32 {
        self.wins.saturating_add(self.losses)
    }

    pub fn computed_win_pct(&self) -> f64 {
        let played = self.games_played();
        if played <= 0 {
            0.0
        } else {
            f64::from(self.wins) / f64::from(played)
        }
    }
}

fn by_record(left: &StandingEntry, right: &StandingEntry) -> Ordering {
    right
        .win_pct
        .total_cmp(&left.win_pct)
        .then_with(|| right.wins.cmp(&left.wins))
        .then_with(|| left.team_id.cmp(&right.team_id))
}

/// Fills in conference ranks when any entry lacks one.
///
/// Ranks are assigned per conference by descending win percentage, and
/// the slice is left ordered by conference then rank. Returns `true` when
/// ranks were computed rather than taken from the provider.
pub fn assign_conference_ranks(entries: &mut [StandingEntry]) -> bool {
    let computed = entries.iter().any(|entry| entry.conference_rank.is_none());
    if computed {
        entries.sort_by(by_record);
        let mut next_rank: HashMap<Conference, u32> = HashMap::new();
        for entry in entries.iter_mut() {
            let rank = next_rank.entry(entry.conference).or_insert(0);
            *rank += 1;
            entry.conference_rank = Some(*rank);
        }
    }

    entries.sort_by(|left, right| {
        left.conference
            .as_str()
            .cmp(right.conference.as_str())
            .then_with(|| left.conference_rank.cmp(&right.conference_rank))
            .then_with(|| by_record(left, right))
    });
    computed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, wins: i32, losses: i32) -> StandingEntry {
        StandingEntry::new(
            TeamId::new(id),
            id,
            Conference::East,
            wins,
            losses,
            ProviderId::NbaStats,
        )
    }

    #[test]
    fn computes_ranks_by_win_pct_when_missing() {
        let mut entries = vec![entry("MIA", 20, 30), entry("BOS", 40, 10), entry("NYK", 30, 20)];
        assert!(assign_conference_ranks(&mut entries));

        let ranked: Vec<(&str, Option<u32>)> = entries
            .iter()
            .map(|entry| (entry.team_id.as_str(), entry.conference_rank))
            .collect();
        assert_eq!(
            ranked,
            vec![("BOS", Some(1)), ("NYK", Some(2)), ("MIA", Some(3))]
        );
    }

    #[test]
    fn keeps_provider_ranks_when_complete() {
        let mut entries = vec![
            entry("BOS", 40, 10).with_rank(Some(2)),
            entry("NYK", 30, 20).with_rank(Some(1)),
        ];
        assert!(!assign_conference_ranks(&mut entries));
        assert_eq!(entries[0].team_id.as_str(), "NYK");
    }

    #[test]
    fn zero_rank_counts_as_missing() {
        assert_eq!(entry("BOS", 1, 1).with_rank(Some(0)).conference_rank, None);
    }

    #[test]
    fn ignores_out_of_range_win_pct() {
        let row = entry("BOS", 30, 10).with_win_pct(f64::NAN);
        assert!((row.win_pct - 0.75).abs() < f64::EPSILON);
    }
}
