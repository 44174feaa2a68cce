//! # Courtside Core
//!
//! Multi-provider resolution engine for sports facts: the latest result of a
//! team, its last `n` games, the games on a date, conference standings,
//! league leaders and a team's top performer in its latest game.
//!
//! ## Overview
//!
//! - **Canonical domain models** for teams, games, standings and leaders
//! - **Team identity** resolution from free-form text and provider codes
//! - **League-local dates** and relative date phrases
//! - **Provider adapters** for ESPN, balldontlie.io and stats.nba.com
//! - **Validation** of every provider answer before it is accepted
//! - **Orchestration** over per-fact priority chains with retries, fallback,
//!   optional head-of-chain racing and a hard deadline
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Live provider adapters |
//! | [`cache`] | TTL cache for resolved facts |
//! | [`circuit_breaker`] | Circuit breaker for upstream calls |
//! | [`config`] | TOML + environment configuration |
//! | [`data_source`] | Provider trait, capabilities and provider errors |
//! | [`domain`] | Teams, games, standings, stat lines, timestamps |
//! | [`error`] | Core error types |
//! | [`http_client`] | HTTP client abstraction |
//! | [`identity`] | Team directory and alias resolution |
//! | [`orchestrator`] | Fact resolution engine |
//! | [`priority`] | Per-fact provider chains |
//! | [`request`] | Normalized fact requests |
//! | [`retry`] | Backoff between same-provider attempts |
//! | [`source`] | Provider identifiers |
//! | [`temporal`] | League clock, date phrases, seasons |
//! | [`throttling`] | Per-provider rate gate |
//! | [`validation`] | Plausibility checks on provider answers |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use courtside_core::{EngineConfig, FactOrchestrator, FactRequest, UtcDateTime};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::default().with_env_overrides()?;
//!     let engine = FactOrchestrator::builder(config).with_live_providers().build()?;
//!
//!     let request = FactRequest::most_recent_result("Knicks", UtcDateTime::now())?;
//!     match engine.resolve(request).await {
//!         Ok(resolved) => println!("{:?} via {}", resolved.fact, resolved.source_provider_id),
//!         Err(failure) => eprintln!("{failure}"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  FactRequest    │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │  Orchestrator   │────▶│ Priority chains  │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ FactSource      │────▶│ HTTP Client      │
//! │ (Adapter Trait) │     │ (reqwest)        │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ ResultValidator │
//! └─────────────────┘
//! ```
//!
//! ## Security
//!
//! The balldontlie.io API key is read from configuration or the environment
//! and is never logged or serialized.

pub mod adapters;
pub mod cache;
pub mod circuit_breaker;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod identity;
pub mod orchestrator;
pub mod priority;
pub mod request;
pub mod retry;
pub mod source;
pub mod temporal;
pub mod throttling;
pub mod validation;

// Adapter implementations
pub use adapters::{BallDontLieAdapter, EspnAdapter, NbaStatsAdapter};

pub use cache::FactCache;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};

pub use config::EngineConfig;

// Provider trait and types
pub use data_source::{
    Capability, CapabilitySet, DateGamesRequest, FactSource, HealthState, HealthStatus,
    LeadersRequest, ProviderError, ProviderErrorKind, RecentGameRequest, SourceFuture,
    StandingsRequest, TeamLeaderRequest, WindowRequest,
};

// Domain models
pub use domain::{
    assign_conference_ranks, parse_calendar_date, CanonicalTeam, Conference, GameLeader,
    GameResult, GameStatus, League, MatchupSide, PlayerStatLine, StandingEntry, StatCategory, TeamId,
    UtcDateTime, Venue,
};

pub use error::{CoreError, ValidationError};

// HTTP client types
pub use http_client::{HttpAuth, HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};

pub use identity::TeamDirectory;

// Resolution engine
pub use orchestrator::{
    AttemptOutcome, ErrorClass, Fact, FactOrchestrator, FactOrchestratorBuilder, FailureKind,
    ProviderAttempt, ResolutionFailure, ResolutionResult, Resolved,
};

pub use priority::{PriorityTable, ProviderPlan};

pub use request::{FactKind, FactRequest};

pub use retry::Backoff;

pub use source::ProviderId;

pub use temporal::{LeagueClock, Season};

pub use throttling::RateGate;

pub use validation::{RejectReason, ResultValidator, Verdict, Warning};
