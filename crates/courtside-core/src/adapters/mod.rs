//! Live provider adapters.
//!
//! | Provider | Games | Standings | Leaders |
//! |---|---|---|---|
//! | [`EspnAdapter`] | yes | yes | no |
//! | [`BallDontLieAdapter`] | yes | no | no |
//! | [`NbaStatsAdapter`] | no | yes | yes |

mod balldontlie;
mod espn;
mod matchup;
mod nba_stats;
mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use balldontlie::BallDontLieAdapter;
pub use espn::EspnAdapter;
pub use nba_stats::NbaStatsAdapter;
