//! # Domain Models
//!
//! Canonical domain types for courtside sports facts.
//!
//! ## Models
//!
//! | Type | Description |
//! |------|-------------|
//! | [`CanonicalTeam`] | Resolved team with id, names and aliases |
//! | [`GameResult`] | A game seen from the subject team's side |
//! | [`StandingEntry`] | One conference standings row |
//! | [`PlayerStatLine`] | A league or game leader's stat value |
//! | [`GameLeader`] | A team's top performer in one game |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! Provider payloads never leave the adapters; everything downstream of an
//! adapter speaks these types.

mod game;
mod player;
mod standing;
mod team;
mod timestamp;

pub use game::{GameResult, GameStatus, MatchupSide, Venue};
pub use player::{GameLeader, PlayerStatLine, StatCategory};
pub use standing::{assign_conference_ranks, StandingEntry};
pub use team::{CanonicalTeam, Conference, League, TeamId};
pub use timestamp::{parse_calendar_date, UtcDateTime};
