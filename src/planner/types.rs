//! Planner input/output types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::plan::ActionType;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("llm error: {0}")]
    Llm(#[from] crate::external::LlmError),
    #[error("engine error: {0}")]
    Engine(#[from] crate::engine::EngineError),
    #[error("rules error: {0}")]
    Rules(#[from] crate::rules::RulesError),
    #[error("malformed draft plan: {0}")]
    MalformedDraft(String),
}

pub type PlannerResult<T> = Result<T, PlannerError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestigationRequest {
    pub purpose: String,
    /// A move explicitly named by the user, if any.
    pub move_san: Option<String>,
    /// A piece type the user asked about (e.g. "knight"), used for piece
    /// identity resolution when more than one candidate of that type
    /// exists.
    pub piece_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectedIdea {
    /// `<color>_<piecetype>_<square>`, e.g. `white_knight_g1`.
    pub label: String,
}

/// Classified intent: the planner's input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub goal: String,
    pub summary: String,
    pub investigation_requests: Vec<InvestigationRequest>,
    pub root_fen: Option<String>,
    pub connected_ideas: Vec<ConnectedIdea>,
    /// `needs_clarification:<piecetype>:<opts>` entities surfaced by the
    /// interpreter when piece identity is ambiguous.
    pub needs_clarification: Vec<String>,
    /// Whether a baseline D2/D16 scan was already prefetched for this turn;
    /// when true, no extra candidates are injected.
    pub has_prefetched_baseline: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftStep {
    pub action_type: ActionType,
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
    pub purpose: String,
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub expected_output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanDraft {
    pub steps: Vec<DraftStep>,
    #[serde(default)]
    pub discussion_agenda: String,
}
