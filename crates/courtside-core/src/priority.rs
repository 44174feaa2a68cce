use serde::{Deserialize, Serialize};

use crate::{Capability, ProviderId};

/// One entry of a provider chain: who to ask and how many extra attempts
/// the provider gets after its first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderPlan {
    pub provider: ProviderId,
    #[serde(default)]
    pub extra_attempts: u32,
}

impl ProviderPlan {
    pub const fn new(provider: ProviderId, extra_attempts: u32) -> Self {
        Self {
            provider,
            extra_attempts,
        }
    }

    pub const fn total_attempts(self) -> u32 {
        self.extra_attempts.saturating_add(1)
    }
}

/// Ordered provider chain per fact kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityTable {
    pub most_recent_result: Vec<ProviderPlan>,
    pub results_window: Vec<ProviderPlan>,
    pub games_for_date: Vec<ProviderPlan>,
    pub standings: Vec<ProviderPlan>,
    pub top_players_by_stat: Vec<ProviderPlan>,
    pub team_game_leader: Vec<ProviderPlan>,
}

impl Default for PriorityTable {
    fn default() -> Self {
        use ProviderId::{BallDontLie, Espn, NbaStats};

        Self {
            most_recent_result: vec![ProviderPlan::new(Espn, 1), ProviderPlan::new(BallDontLie, 0)],
            results_window: vec![ProviderPlan::new(Espn, 0), ProviderPlan::new(BallDontLie, 0)],
            games_for_date: vec![ProviderPlan::new(Espn, 0), ProviderPlan::new(BallDontLie, 0)],
            standings: vec![ProviderPlan::new(NbaStats, 0), ProviderPlan::new(Espn, 0)],
            top_players_by_stat: vec![ProviderPlan::new(NbaStats, 1)],
            team_game_leader: vec![ProviderPlan::new(Espn, 1)],
        }
    }
}

impl PriorityTable {
    /// A table with every chain empty.
    pub fn empty() -> Self {
        Self {
            most_recent_result: Vec::new(),
            results_window: Vec::new(),
            games_for_date: Vec::new(),
            standings: Vec::new(),
            top_players_by_stat: Vec::new(),
            team_game_leader: Vec::new(),
        }
    }

    pub fn chain(&self, capability: Capability) -> &[ProviderPlan] {
        match capability {
            Capability::MostRecentResult => &self.most_recent_result,
            Capability::ResultsWindow => &self.results_window,
            Capability::GamesForDate => &self.games_for_date,
            Capability::Standings => &self.standings,
            Capability::TopPlayersByStat => &self.top_players_by_stat,
            Capability::TeamGameLeader => &self.team_game_leader,
        }
    }

    pub fn with_chain(mut self, capability: Capability, plans: Vec<ProviderPlan>) -> Self {
        *self.chain_mut(capability) = dedupe_chain(plans);
        self
    }

    /// Removes repeated providers from every chain, keeping the first
    /// occurrence.
    pub fn normalized(mut self) -> Self {
        for capability in Capability::ALL {
            let chain = std::mem::take(self.chain_mut(capability));
            *self.chain_mut(capability) = dedupe_chain(chain);
        }
        self
    }

    fn chain_mut(&mut self, capability: Capability) -> &mut Vec<ProviderPlan> {
        match capability {
            Capability::MostRecentResult => &mut self.most_recent_result,
            Capability::ResultsWindow => &mut self.results_window,
            Capability::GamesForDate => &mut self.games_for_date,
            Capability::Standings => &mut self.standings,
            Capability::TopPlayersByStat => &mut self.top_players_by_stat,
            Capability::TeamGameLeader => &mut self.team_game_leader,
        }
    }
}

fn dedupe_chain(chain: Vec<ProviderPlan>) -> Vec<ProviderPlan> {
    let mut output: Vec<ProviderPlan> = Vec::with_capacity(chain.len());
    for plan in chain {
        if !output.iter().any(|existing| existing.provider == plan.provider) {
            output.push(plan);
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_chains_follow_provider_strengths() {
        let table = PriorityTable::default();
        assert_eq!(
            table.chain(Capability::MostRecentResult),
            &[
                ProviderPlan::new(ProviderId::Espn, 1),
                ProviderPlan::new(ProviderId::BallDontLie, 0)
            ]
        );
        assert_eq!(table.chain(Capability::Standings)[0].provider, ProviderId::NbaStats);
        assert_eq!(table.chain(Capability::TopPlayersByStat).len(), 1);
        assert_eq!(
            table.chain(Capability::TeamGameLeader),
            &[ProviderPlan::new(ProviderId::Espn, 1)]
        );
    }

    #[test]
    fn with_chain_drops_duplicate_providers() {
        let table = PriorityTable::empty().with_chain(
            Capability::GamesForDate,
            vec![
                ProviderPlan::new(ProviderId::Espn, 2),
                ProviderPlan::new(ProviderId::BallDontLie, 0),
                ProviderPlan::new(ProviderId::Espn, 0),
            ],
        );
        assert_eq!(
            table.chain(Capability::GamesForDate),
            &[
                ProviderPlan::new(ProviderId::Espn, 2),
                ProviderPlan::new(ProviderId::BallDontLie, 0)
            ]
        );
        assert!(table.chain(Capability::Standings).is_empty());
    }

    #[test]
    fn plan_counts_first_attempt() {
        assert_eq!(ProviderPlan::new(ProviderId::Espn, 0).total_attempts(), 1);
        assert_eq!(ProviderPlan::new(ProviderId::Espn, 2).total_attempts(), 3);
    }
}
