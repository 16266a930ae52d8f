//! Crate-level error boundary.
//!
//! Every subsystem owns its own `thiserror` enum and `Result` alias (see
//! `rules::RulesError`, `see::SeeError`, `engine::EngineError`, ...). This
//! type is the single point where the controller collapses all of them into
//! one error it can log and convert into a stop reason.

use thiserror::Error;

use crate::controller::ControllerError;
use crate::engine::EngineError;
use crate::executor::ExecutorError;
use crate::investigator::InvestigatorError;
use crate::planner::PlannerError;
use crate::rules::RulesError;
use crate::see::SeeError;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("rules: {0}")]
    Rules(#[from] RulesError),
    #[error("engine: {0}")]
    Engine(#[from] EngineError),
    #[error("see: {0}")]
    See(#[from] SeeError),
    #[error("investigator: {0}")]
    Investigator(#[from] InvestigatorError),
    #[error("planner: {0}")]
    Planner(#[from] PlannerError),
    #[error("executor: {0}")]
    Executor(#[from] ExecutorError),
    #[error("controller: {0}")]
    Controller(#[from] ControllerError),
}

pub type CoreResult<T> = Result<T, CoreError>;
