//! Taxonomy and wire types for the tactical scanner.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeeError {
    #[error("rules error: {0}")]
    Rules(#[from] crate::rules::RulesError),
    #[error("candidate {san} rejected: {reason}")]
    CandidateRejected { san: String, reason: String },
}

pub type SeeResult<T> = Result<T, SeeError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TacticKind {
    Fork,
    Skewer,
    DiscoveredAttack,
    DoubleAttack,
    PinWin,
    Deflection,
    Overloading,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatLevel {
    Winning,
    EqualTrade,
    LosesMaterial,
}

/// The SEE gate's verdict on a single candidate move.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub net_material_change: i32,
    pub threat_level: ThreatLevel,
    pub is_valid_tactic: bool,
    pub forced_mate: bool,
    pub chain_san: Vec<String>,
    /// Set only for tactics run through the fork-refutation minimax.
    pub refuted: Option<bool>,
    pub refutation_line: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenTactic {
    pub kind: TacticKind,
    pub move_san: String,
    pub targets: Vec<String>,
    pub threat_level: ThreatLevel,
    pub net_material_change: i32,
    pub refuted: Option<bool>,
    pub refutation_line: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedTactic {
    pub kind: TacticKind,
    pub clearing_move_san: String,
    pub move_san: String,
    pub targets: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureOutcome {
    Winning,
    MateForcing,
    Potential,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureTactic {
    pub move_san: String,
    pub net_material_change: i32,
    pub outcome: CaptureOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionKind {
    Immediate,
    Threat,
    Blocked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionTactic {
    pub move_san: String,
    pub kind: PromotionKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckmateTactic {
    pub move_san: String,
    /// 1 for mate-in-1, 2 for forced mate-in-2.
    pub plies: u32,
    /// Populated for mate-in-2: one mating reply per opponent defense.
    pub continuations: Vec<(String, String)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatePattern {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScanResult {
    pub open_tactics: Vec<OpenTactic>,
    pub blocked_tactics: Vec<BlockedTactic>,
    pub open_captures: Vec<CaptureTactic>,
    pub closed_captures: Vec<CaptureTactic>,
    pub promotions: Vec<PromotionTactic>,
    pub checkmates: Vec<CheckmateTactic>,
    pub mate_patterns: Vec<MatePattern>,
    pub has_winning_tactic: bool,
    pub has_losing_tactic: bool,
    pub has_immediate_threat: bool,
    pub has_promotion_threat: bool,
    pub has_mate_threat: bool,
    /// Candidates rejected during the scan with their reason; the scanner
    /// never aborts the whole scan on a single candidate's failure.
    pub rejected: Vec<(String, String)>,
}
