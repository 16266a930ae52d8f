//! Crate-wide tunables: depths, budgets, thresholds, cache sizes.
//!
//! A single config struct with a `Default` impl matching documented
//! defaults, deserializable from TOML so a deployment can override any
//! knob without a recompile.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Dual-depth (D2/D16) scan and engine-facing defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub d2_depth: u32,
    pub d16_depth: u32,
    pub branching_limit: usize,
    /// Max eval gap (centipawns) from the D2 best move for a candidate to be
    /// promoted to a D16 deep scan.
    pub d2_gap_threshold_cp: i32,
    pub pgn_max_chars: usize,
    pub cache_capacity: usize,
    pub default_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            d2_depth: 2,
            d16_depth: 16,
            branching_limit: 4,
            d2_gap_threshold_cp: 60,
            pgn_max_chars: 400,
            cache_capacity: 2048,
            default_timeout: Duration::from_secs(20),
        }
    }
}

/// SEE / tactical scanner tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeeConfig {
    /// Bounded ply depth for forced-capture-chain resolution.
    pub max_chain_plies: u32,
    /// Bounded ply depth for the fork-refutation capture-only minimax.
    pub refutation_plies: u32,
}

impl Default for SeeConfig {
    fn default() -> Self {
        Self { max_chain_plies: 6, refutation_plies: 4 }
    }
}

/// Investigator tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InvestigatorConfig {
    pub evidence_base_plies: u32,
    pub evidence_max_plies: u32,
    /// `investigate_game`'s critical-moment threshold.
    pub critical_threshold_cp: i32,
}

impl Default for InvestigatorConfig {
    fn default() -> Self {
        Self { evidence_base_plies: 4, evidence_max_plies: 10, critical_threshold_cp: 150 }
    }
}

/// Target-search (`investigate_target`) bounded best-first search policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPolicy {
    pub max_depth: u32,
    pub beam_width: usize,
    pub branching_limit: usize,
    pub opponent_model: OpponentModel,
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self { max_depth: 6, beam_width: 3, branching_limit: 4, opponent_model: OpponentModel::Best }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpponentModel {
    Best,
    Worst,
    Typical,
}

/// Planner tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub engine_probe_depth: u32,
    pub max_candidate_investigations: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self { engine_probe_depth: 10, max_candidate_investigations: 4 }
    }
}

/// Controller budget/threshold tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub max_time_s_light: u64,
    pub max_time_s_deep: u64,
    pub confidence_escalation_threshold: f64,
    pub chat_history_window: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_time_s_light: 12,
            max_time_s_deep: 30,
            confidence_escalation_threshold: 0.65,
            chat_history_window: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub engine: EngineConfig,
    pub see: SeeConfig,
    pub investigator: InvestigatorConfig,
    pub planner: PlannerConfig,
    pub controller: ControllerConfig,
}

impl CoreConfig {
    /// Load overrides from a TOML file, falling back to defaults for any
    /// section/field the file omits (`serde(default)` on every nested
    /// struct makes a partial file valid).
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = CoreConfig::default();
        assert_eq!(cfg.engine.d2_depth, 2);
        assert_eq!(cfg.engine.d16_depth, 16);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let cfg = CoreConfig::from_toml_str("[engine]\nd16_depth = 20\n").unwrap();
        assert_eq!(cfg.engine.d16_depth, 20);
        assert_eq!(cfg.engine.d2_depth, 2);
        assert_eq!(cfg.planner.engine_probe_depth, 10);
    }
}
