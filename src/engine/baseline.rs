//! Dual-depth (D2/D16) scan: the canonical grounding primitive for every
//! downstream claim about a position.
//!
//! A shallow, wide scan (D2, multi-PV = branching_limit) picks candidates;
//! every candidate within `d2_gap_threshold_cp` of the best is deepened
//! individually at D16, multi-PV 1. The root record carries both depths
//! plus a restartable evidence block with per-move deltas and a bounded PGN
//! rendering, so downstream callers never need to re-run the shallow scan.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::cache::AnalysisCache;
use super::client::EngineClient;
use super::types::{AnalysisResult, CacheKey, EngineResult};
use crate::config::EngineConfig;
use crate::rules;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveDelta {
    pub move_san: String,
    pub eval_cp_start: i32,
    pub eval_cp_end: i32,
    pub material_start: i32,
    pub material_end: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub per_move_deltas: Vec<MoveDelta>,
    /// PGN rendering of the main line, truncated to `pgn_max_chars` without
    /// splitting a move token.
    pub pgn_exploration: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineRecord {
    pub fen: String,
    pub eval_d2: i32,
    pub best_move_d2: Option<String>,
    pub top_moves_d2: Vec<String>,
    pub eval_d16: i32,
    pub best_move_d16: Option<String>,
    pub second_best_move_d16: Option<String>,
    pub pv_d16: Vec<String>,
    pub pv_after_move: Vec<String>,
    pub evidence: Evidence,
    /// Spearman-style rank correlation between the D2 candidate ranking and
    /// the D16 ranking; annotates confidence only, never gates correctness
    /// (ported from the original `tools/engine_correlation.py`).
    pub d2_d16_rank_correlation: f64,
    pub partial: bool,
}

pub struct BaselineScanner {
    client: Arc<dyn EngineClient>,
    cache: Arc<AnalysisCache>,
    config: EngineConfig,
}

impl BaselineScanner {
    pub fn new(client: Arc<dyn EngineClient>, cache: Arc<AnalysisCache>, config: EngineConfig) -> Self {
        Self { client, cache, config }
    }

    async fn analyze_cached(&self, fen: &str, depth: u32, multi_pv: usize) -> EngineResult<AnalysisResult> {
        let normalized = rules::normalize_fen(fen)?;
        let key = CacheKey { normalized_fen: normalized, depth, multi_pv };
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }
        let result = self.client.analyze(fen, depth, multi_pv, self.config.default_timeout).await?;
        self.cache.insert(key, result.clone());
        Ok(result)
    }

    pub async fn scan(&self, fen: &str) -> EngineResult<BaselineRecord> {
        let d2 = self
            .analyze_cached(fen, self.config.d2_depth, self.config.branching_limit)
            .await?;

        let best_d2_cp = d2.lines.first().map(|l| l.eval_cp).unwrap_or(d2.eval_cp);
        let mut deep_candidates: Vec<&super::types::AnalysisLine> = d2
            .lines
            .iter()
            .filter(|l| (best_d2_cp - l.eval_cp).abs() <= self.config.d2_gap_threshold_cp)
            .collect();
        if deep_candidates.is_empty() {
            deep_candidates = d2.lines.iter().take(1).collect();
        }

        let mut d16_results: Vec<(String, AnalysisResult)> = Vec::new();
        let mut partial_any = d2.partial;
        for candidate in deep_candidates {
            let after_fen = match rules::play_san(fen, &candidate.move_san) {
                Ok(f) => f,
                Err(_) => continue,
            };
            let reply = self.analyze_cached(&after_fen, self.config.d16_depth, 1).await?;
            partial_any |= reply.partial;
            // The deep scan is from the opponent's perspective after the
            // candidate is played; flip back to root's side-to-move.
            let root_side_eval = -reply.eval_cp;
            d16_results.push((
                candidate.move_san.clone(),
                AnalysisResult { eval_cp: root_side_eval, ..reply },
            ));
        }
        d16_results.sort_by(|a, b| b.1.eval_cp.cmp(&a.1.eval_cp));

        let best_move_d16 = d16_results.first().map(|(m, _)| m.clone());
        let eval_d16 = d16_results.first().map(|(_, r)| r.eval_cp).unwrap_or(d2.eval_cp);
        let second_best_move_d16 = d16_results.get(1).map(|(m, _)| m.clone());
        let pv_d16 = d16_results
            .first()
            .map(|(m, r)| {
                let mut pv = vec![m.clone()];
                pv.extend(r.pv_san.clone());
                pv
            })
            .unwrap_or_default();

        let pv_after_move = d16_results.first().map(|(_, r)| r.pv_san.clone()).unwrap_or_default();

        let top_moves_d2: Vec<String> = d2.lines.iter().map(|l| l.move_san.clone()).collect();

        let correlation = rank_correlation(&top_moves_d2, &d16_results.iter().map(|(m, _)| m.clone()).collect::<Vec<_>>());

        let evidence = self.build_evidence(fen, &pv_d16).await;

        Ok(BaselineRecord {
            fen: fen.to_string(),
            eval_d2: d2.eval_cp,
            best_move_d2: d2.best_move_san.clone(),
            top_moves_d2,
            eval_d16,
            best_move_d16,
            second_best_move_d16,
            pv_d16,
            pv_after_move,
            evidence,
            d2_d16_rank_correlation: correlation,
            partial: partial_any,
        })
    }

    async fn build_evidence(&self, fen: &str, pv: &[String]) -> Evidence {
        let mut deltas = Vec::new();
        let mut current_fen = fen.to_string();
        let mut pgn = String::new();
        let mut move_number = {
            let fields: Vec<&str> = fen.split_whitespace().collect();
            fields.get(5).and_then(|s| s.parse::<u32>().ok()).unwrap_or(1)
        };
        let mut white_to_move = rules::side_to_move(fen).map(|c| c == shakmaty::Color::White).unwrap_or(true);

        for san in pv {
            let before_pos = match rules::position_from_fen(&current_fen) {
                Ok(p) => p,
                Err(_) => break,
            };
            let material_start = rules::material_balance(&before_pos);
            let eval_start = self
                .analyze_cached(&current_fen, self.config.d2_depth, 1)
                .await
                .map(|r| r.eval_cp)
                .unwrap_or(0);

            let next_fen = match rules::play_san(&current_fen, san) {
                Ok(f) => f,
                Err(_) => break,
            };
            let after_pos = rules::position_from_fen(&next_fen).unwrap_or(before_pos.clone());
            let material_end = rules::material_balance(&after_pos);
            let eval_end = self
                .analyze_cached(&next_fen, self.config.d2_depth, 1)
                .await
                .map(|r| -r.eval_cp)
                .unwrap_or(0);

            deltas.push(MoveDelta {
                move_san: san.clone(),
                eval_cp_start: eval_start,
                eval_cp_end: eval_end,
                material_start,
                material_end,
            });

            let token = if white_to_move { format!("{move_number}.{san} ") } else { format!("{san} ") };
            pgn.push_str(&token);
            if !white_to_move {
                move_number += 1;
            }
            white_to_move = !white_to_move;
            current_fen = next_fen;
        }

        let pgn_exploration = truncate_pgn(&pgn, self.config.pgn_max_chars);
        Evidence { per_move_deltas: deltas, pgn_exploration }
    }
}

/// Truncate PGN text to at most `max_chars`, never splitting inside a move
/// token (cut at the last preceding whitespace boundary).
pub fn truncate_pgn(pgn: &str, max_chars: usize) -> String {
    if pgn.len() <= max_chars {
        return pgn.trim_end().to_string();
    }
    let slice = &pgn[..max_chars];
    match slice.rfind(' ') {
        Some(idx) => slice[..idx].trim_end().to_string(),
        None => String::new(),
    }
}

/// Spearman-like rank correlation between two move orderings sharing some
/// members; used only to annotate confidence.
fn rank_correlation(d2_order: &[String], d16_order: &[String]) -> f64 {
    if d2_order.is_empty() || d16_order.is_empty() {
        return 0.0;
    }
    let n = d2_order.len().min(d16_order.len());
    if n < 2 {
        return 1.0;
    }
    let mut sum_sq = 0f64;
    let mut counted = 0usize;
    for (d2_rank, mv) in d2_order.iter().enumerate() {
        if let Some(d16_rank) = d16_order.iter().position(|m| m == mv) {
            let diff = d2_rank as f64 - d16_rank as f64;
            sum_sq += diff * diff;
            counted += 1;
        }
    }
    if counted < 2 {
        return 0.0;
    }
    let n = counted as f64;
    1.0 - (6.0 * sum_sq) / (n * (n * n - 1.0)).max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mock::ScriptedEngineClient;
    use crate::engine::types::AnalysisLine;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[tokio::test]
    async fn truncates_pgn_without_splitting_a_move() {
        let pgn = "1.e4 e5 2.Nf3 Nc6 3.Bb5 a6";
        let truncated = truncate_pgn(pgn, 12);
        assert!(!truncated.ends_with("N") && !truncated.ends_with("B"));
        assert!(pgn.len() > truncated.len());
    }

    #[tokio::test]
    async fn scan_runs_d2_then_d16_on_candidates() {
        let client = Arc::new(ScriptedEngineClient::new());
        client.set(
            START,
            AnalysisResult {
                eval_cp: 20,
                best_move_san: Some("e4".to_string()),
                pv_san: vec!["e4".to_string()],
                lines: vec![
                    AnalysisLine { move_san: "e4".to_string(), eval_cp: 25, pv_san: vec!["e4".to_string()] },
                    AnalysisLine { move_san: "d4".to_string(), eval_cp: 20, pv_san: vec!["d4".to_string()] },
                ],
                depth_reached: 2,
                partial: false,
            },
        );
        let cache = Arc::new(AnalysisCache::new(64));
        let scanner = BaselineScanner::new(client, cache, EngineConfig::default());
        let record = scanner.scan(START).await.unwrap();
        assert_eq!(record.eval_d2, 20);
        assert!(record.best_move_d16.is_some());
    }
}
