//! Engine-grounded chess analysis assistant core.
//!
//! This crate is the investigation pipeline described in the design: a
//! [`controller::Controller`] routes a user request to a fast deterministic
//! path, the chat collaborator, a game-history branch, or a full
//! [`planner::Planner`] + [`executor::Executor`] + [`investigator::Investigator`]
//! pipeline grounded by the engine adapter's dual-depth scan
//! ([`engine::BaselineScanner`]). The LLM, the real search engine process,
//! and platform game fetchers are external collaborators; this crate owns
//! only the seams ([`external::LlmClient`], [`external::GameFetcher`],
//! [`engine::EngineClient`]) plus everything that runs locally: tag/threat
//! detection, SEE, planning, execution, and task-level control flow.

pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod executor;
pub mod external;
pub mod investigator;
pub mod pgn;
pub mod plan;
pub mod planner;
pub mod rules;
pub mod see;
pub mod tags;
pub mod threats;

pub use config::CoreConfig;
pub use controller::Controller;
pub use error::{CoreError, CoreResult};
