//! Shared types for the plan runner.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("investigator error: {0}")]
    Investigator(#[from] crate::investigator::InvestigatorError),
    #[error("engine error: {0}")]
    Engine(#[from] crate::engine::EngineError),
    #[error("rules error: {0}")]
    Rules(#[from] crate::rules::RulesError),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type ExecutorResult<T> = Result<T, ExecutorError>;

/// Outcome of running a whole plan: per-step results keyed by step number,
/// the named FEN bindings accumulated along the way, and whether the run
/// stopped early for clarification or left critical gaps.
#[derive(Debug, Clone, Default)]
pub struct PlanRun {
    pub results: BTreeMap<u32, Value>,
    pub state_slots: HashMap<String, String>,
    pub stopped_for_clarification: bool,
    pub incomplete: bool,
}
