//! In-memory `EngineClient` used by tests across the crate (investigator,
//! planner, executor, controller) so their tests never need a real engine
//! binary on PATH. Returns a deterministic, caller-supplied evaluation for
//! each FEN rather than actually searching.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::client::EngineClient;
use super::types::{AnalysisLine, AnalysisResult, EngineResult};
use crate::rules;

#[derive(Default)]
pub struct ScriptedEngineClient {
    responses: Mutex<HashMap<String, AnalysisResult>>,
    fallback_depth: u32,
}

impl ScriptedEngineClient {
    pub fn new() -> Self {
        Self { responses: Mutex::new(HashMap::new()), fallback_depth: 16 }
    }

    pub fn set(&self, fen: &str, result: AnalysisResult) {
        let normalized = rules::normalize_fen(fen).unwrap_or_else(|_| fen.to_string());
        self.responses.lock().unwrap().insert(normalized, result);
    }
}

#[async_trait]
impl EngineClient for ScriptedEngineClient {
    async fn analyze(
        &self,
        fen: &str,
        depth: u32,
        multi_pv: usize,
        _timeout: Duration,
    ) -> EngineResult<AnalysisResult> {
        let normalized = rules::normalize_fen(fen).unwrap_or_else(|_| fen.to_string());
        if let Some(scripted) = self.responses.lock().unwrap().get(&normalized) {
            let mut r = scripted.clone();
            r.depth_reached = depth.max(r.depth_reached.min(self.fallback_depth));
            r.lines.truncate(multi_pv.max(1));
            return Ok(r);
        }
        // No script for this FEN: fall back to "first legal move, eval 0",
        // which keeps untested positions from silently erroring out.
        let moves = rules::legal_moves_san(fen)?;
        if moves.is_empty() {
            return Ok(AnalysisResult { partial: false, depth_reached: depth, ..AnalysisResult::empty() });
        }
        let lines: Vec<AnalysisLine> = moves
            .into_iter()
            .take(multi_pv.max(1))
            .map(|m| AnalysisLine { move_san: m.clone(), eval_cp: 0, pv_san: vec![m] })
            .collect();
        Ok(AnalysisResult {
            eval_cp: 0,
            best_move_san: lines.first().map(|l| l.move_san.clone()),
            pv_san: lines.first().map(|l| l.pv_san.clone()).unwrap_or_default(),
            lines,
            depth_reached: depth,
            partial: false,
        })
    }
}
