//! Data carried by every investigation.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shakmaty::Chess;
use thiserror::Error;

use crate::engine::MoveDelta;
use crate::see::ScanResult;

#[derive(Debug, Error)]
pub enum InvestigatorError {
    #[error("rules error: {0}")]
    Rules(#[from] crate::rules::RulesError),
    #[error("engine error: {0}")]
    Engine(#[from] crate::engine::EngineError),
    #[error("see error: {0}")]
    See(#[from] crate::see::SeeError),
    #[error("no legal moves at root position")]
    NoLegalMoves,
}

pub type InvestigatorResult<T> = Result<T, InvestigatorError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Success,
    Uncertain,
    Failure,
}

/// A target-search predicate plus a human label for reporting, used by
/// `investigate_target`. The predicate is a plain closure rather than an
/// enum of hardcoded goal kinds, since callers want open-ended goals ("can
/// castle next", "material threshold", "piece reaches square") without a
/// closed set.
#[derive(Clone)]
pub struct Goal {
    pub label: String,
    pub predicate: Arc<dyn Fn(&Chess) -> bool + Send + Sync>,
}

impl std::fmt::Debug for Goal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Goal").field("label", &self.label).finish()
    }
}

impl Goal {
    pub fn new(label: impl Into<String>, predicate: impl Fn(&Chess) -> bool + Send + Sync + 'static) -> Self {
        Self { label: label.into(), predicate: Arc::new(predicate) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalSearchResult {
    pub goal_status: GoalStatus,
    /// Shortest successful line; ties break by lexical join of SAN moves.
    pub witness_line_san: Option<Vec<String>>,
    pub witnesses: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveClassification {
    Best,
    Great,
    Good,
    Inaccuracy,
    Mistake,
    Blunder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticalMoment {
    pub ply: u32,
    pub move_san: String,
    pub eval_before: i32,
    pub eval_after: i32,
    pub classification: MoveClassification,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InvestigationResult {
    pub requested_move: Option<String>,
    pub eval_before: Option<i32>,
    pub eval_after: Option<i32>,
    pub eval_drop: Option<i32>,
    pub pv_after_move: Vec<String>,
    pub player_move: Option<String>,
    pub best_move: Option<String>,
    pub best_move_d16: Option<String>,
    pub top_moves_d2: Vec<String>,
    pub candidate_moves: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tactics_found: Option<ScanResult>,
    pub themes_identified: Vec<String>,
    pub pgn_branches: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal_search_results: Option<GoalSearchResult>,
    pub evidence_tags_gained_net: Vec<String>,
    pub evidence_tags_lost_net: Vec<String>,
    pub evidence_per_move_deltas: Vec<MoveDelta>,
    pub critical_moments: Vec<CriticalMoment>,
    pub end_fen: Option<String>,
    /// Branching factor x tactical density. Feeds the controller's
    /// confidence signal as a concrete default for a pluggable formula.
    pub complexity_score: Option<f64>,
}
