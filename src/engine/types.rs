//! Shared types for the engine adapter.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mate scores are encoded as plain centipawns by convention: `±10000`, or
/// `±(10000 - distance_to_mate)` when the transport surfaces the distance.
/// Callers treat `|eval| >= DECISIVE_THRESHOLD_CP` as a decisive (mating)
/// evaluation rather than pattern-matching on an exact value.
pub const MATE_SCORE_CP: i32 = 10000;
pub const DECISIVE_THRESHOLD_CP: i32 = 9000;

pub fn is_decisive(eval_cp: i32) -> bool {
    eval_cp.abs() >= DECISIVE_THRESHOLD_CP
}

pub fn encode_mate(plies_to_mate: i32) -> i32 {
    let sign = if plies_to_mate >= 0 { 1 } else { -1 };
    sign * (MATE_SCORE_CP - plies_to_mate.abs())
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("engine init timeout")]
    InitTimeout,
    #[error("engine produced no usable analysis")]
    NoMovesFound,
    #[error("rules error: {0}")]
    Rules(#[from] crate::rules::RulesError),
    #[error("broken pipe to engine process")]
    BrokenPipe,
    #[error("engine call cancelled")]
    Cancelled,
}

pub type EngineResult<T> = Result<T, EngineError>;

/// One line of a multi-PV analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisLine {
    pub move_san: String,
    pub eval_cp: i32,
    pub pv_san: Vec<String>,
}

/// Result of a single `analyze` call at one depth.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub eval_cp: i32,
    pub best_move_san: Option<String>,
    pub pv_san: Vec<String>,
    pub lines: Vec<AnalysisLine>,
    pub depth_reached: u32,
    /// Set when the wall-clock deadline fired before the requested depth
    /// was reached; the record still carries the best partial result.
    pub partial: bool,
}

impl AnalysisResult {
    pub fn empty() -> Self {
        Self {
            eval_cp: 0,
            best_move_san: None,
            pv_san: Vec::new(),
            lines: Vec::new(),
            depth_reached: 0,
            partial: true,
        }
    }
}

/// Cache key: analyses are memoized on normalized FEN, depth, and multi-PV
/// width.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub normalized_fen: String,
    pub depth: u32,
    pub multi_pv: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct AnalyzeRequest {
    pub depth: u32,
    pub multi_pv: usize,
    pub timeout: Duration,
}
