//! Per-step handlers. Each takes the running `results`/`state_slots` plus
//! the step's parameters and returns a JSON value — the wire shape the
//! controller and any downstream `step:N.<path>` reference will see.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use crate::config::{CoreConfig, OpponentModel, SearchPolicy};
use crate::engine::EngineClient;
use crate::investigator::{GoalStatus, Investigator};
use crate::plan::ExecutionStep;
use crate::rules;

use super::goals::goal_from_params;
use super::reference;
use super::types::{ExecutorError, ExecutorResult};

fn investigator(engine: &Arc<dyn EngineClient>, cache: &Arc<crate::engine::AnalysisCache>, config: &CoreConfig) -> Investigator {
    Investigator::new(engine.clone(), cache.clone(), config.clone())
}

pub fn resolve_step_fen(
    step: &ExecutionStep,
    root_fen: &str,
    results: &BTreeMap<u32, Value>,
    state_slots: &HashMap<String, String>,
) -> String {
    step.param_str("fen_ref")
        .map(|raw| reference::resolve_fen(results, state_slots, raw, root_fen))
        .unwrap_or_else(|| root_fen.to_string())
}

pub async fn investigate_position(
    step: &ExecutionStep,
    root_fen: &str,
    results: &BTreeMap<u32, Value>,
    state_slots: &HashMap<String, String>,
    engine: &Arc<dyn EngineClient>,
    cache: &Arc<crate::engine::AnalysisCache>,
    config: &CoreConfig,
) -> ExecutorResult<Value> {
    let fen = resolve_step_fen(step, root_fen, results, state_slots);
    let depth = step.parameters.get("depth").and_then(Value::as_u64).map(|d| d as u32);
    let focus = step.param_str("focus");
    let result = investigator(engine, cache, config).investigate_position(&fen, depth, focus).await?;
    Ok(serde_json::to_value(result).unwrap_or(Value::Null))
}

pub async fn investigate_move(
    step: &ExecutionStep,
    root_fen: &str,
    results: &BTreeMap<u32, Value>,
    state_slots: &HashMap<String, String>,
    engine: &Arc<dyn EngineClient>,
    cache: &Arc<crate::engine::AnalysisCache>,
    config: &CoreConfig,
) -> ExecutorResult<Value> {
    let fen = resolve_step_fen(step, root_fen, results, state_slots);
    let move_san = step
        .param_str("move_san")
        .ok_or_else(|| ExecutorError::InvalidParameter("investigate_move needs move_san".to_string()))?;
    let depth_16 = step.parameters.get("depth_16").and_then(Value::as_u64).map(|d| d as u32);
    let depth_2 = step.parameters.get("depth_2").and_then(Value::as_u64).map(|d| d as u32);
    let evidence_base_plies = step.parameters.get("evidence_base_plies").and_then(Value::as_u64).map(|d| d as u32);
    let evidence_max_plies = step.parameters.get("evidence_max_plies").and_then(Value::as_u64).map(|d| d as u32);
    let follow_pv = step.parameters.get("follow_pv").and_then(Value::as_bool).unwrap_or(false);
    let focus = step.param_str("focus");
    let result = investigator(engine, cache, config)
        .investigate_move(&fen, move_san, depth_16, depth_2, evidence_base_plies, evidence_max_plies, follow_pv, focus)
        .await?;
    Ok(serde_json::to_value(result).unwrap_or(Value::Null))
}

pub async fn investigate_target(
    step: &ExecutionStep,
    root_fen: &str,
    results: &BTreeMap<u32, Value>,
    state_slots: &HashMap<String, String>,
    engine: &Arc<dyn EngineClient>,
    cache: &Arc<crate::engine::AnalysisCache>,
    config: &CoreConfig,
) -> ExecutorResult<Value> {
    let fen = resolve_step_fen(step, root_fen, results, state_slots);
    let goal = goal_from_params(&step.parameters)?;
    let policy = policy_from_params(&step.parameters);
    let result = investigator(engine, cache, config).investigate_target(&fen, &goal, &policy).await?;
    Ok(serde_json::to_value(result).unwrap_or(Value::Null))
}

pub async fn investigate_game(
    step: &ExecutionStep,
    engine: &Arc<dyn EngineClient>,
    cache: &Arc<crate::engine::AnalysisCache>,
    config: &CoreConfig,
) -> ExecutorResult<Value> {
    let moves: Vec<String> = if let Some(v) = step.parameters.get("pgn_moves_san") {
        serde_json::from_value(v.clone()).unwrap_or_default()
    } else if let Some(pgn) = step.param_str("pgn") {
        crate::pgn::moves_from_pgn(pgn).unwrap_or_default()
    } else {
        Vec::new()
    };
    let start_fen = step
        .param_str("start_fen")
        .unwrap_or("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
    let focus = step.param_str("focus");
    let result = investigator(engine, cache, config).investigate_game(&moves, start_fen, focus).await?;
    Ok(serde_json::to_value(result).unwrap_or(Value::Null))
}

pub fn policy_from_params(parameters: &BTreeMap<String, Value>) -> SearchPolicy {
    let mut policy = SearchPolicy::default();
    if let Some(d) = parameters.get("max_depth").and_then(Value::as_u64) {
        policy.max_depth = d as u32;
    }
    if let Some(w) = parameters.get("beam_width").and_then(Value::as_u64) {
        policy.beam_width = w as usize;
    }
    if let Some(b) = parameters.get("branching_limit").and_then(Value::as_u64) {
        policy.branching_limit = b as usize;
    }
    if let Some(m) = parameters.get("opponent_model").and_then(Value::as_str) {
        policy.opponent_model = match m {
            "worst" => OpponentModel::Worst,
            "typical" => OpponentModel::Typical,
            _ => OpponentModel::Best,
        };
    }
    policy
}

pub fn apply_line(
    step: &ExecutionStep,
    root_fen: &str,
    results: &BTreeMap<u32, Value>,
    state_slots: &HashMap<String, String>,
) -> Value {
    let start_fen = step
        .param_str("fen_ref")
        .map(|raw| reference::resolve_fen(results, state_slots, raw, root_fen))
        .unwrap_or_else(|| root_fen.to_string());

    let (prepend, mut moves) = step
        .param_str("line_ref")
        .map(|raw| reference::resolve_line(results, raw))
        .unwrap_or((None, Vec::new()));
    if let Some(player_move) = prepend {
        moves.insert(0, player_move);
    }
    let max_plies = step
        .parameters
        .get("max_plies")
        .and_then(Value::as_u64)
        .map(|p| p as usize)
        .unwrap_or(60)
        .min(60);
    moves.truncate(max_plies);

    let (fens, err) = rules::replay_san_line(&start_fen, &moves);
    let plies_applied = fens.len();
    let end_fen = fens.last().cloned().unwrap_or_else(|| start_fen.clone());
    json!({
        "start_fen": start_fen,
        "moves_san": moves,
        "fens": fens,
        "end_fen": end_fen,
        "plies_applied": plies_applied,
        "error": err.map(|e| e.to_string()),
    })
}

pub fn select_line(step: &ExecutionStep, results: &BTreeMap<u32, Value>) -> Value {
    let witnesses = step
        .param_str("witnesses_ref")
        .map(|raw| reference::resolve_witnesses(results, raw))
        .unwrap_or_default();
    let strategy = step.param_str("strategy").unwrap_or("first");
    let selected = match strategy {
        "by_index" => {
            let index = step.parameters.get("index").and_then(Value::as_u64).unwrap_or(0) as usize;
            witnesses.get(index).cloned()
        }
        "shortest" => witnesses
            .iter()
            .min_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.join(" ").cmp(&b.join(" "))))
            .cloned(),
        _ => witnesses.first().cloned(),
    };
    json!({"selected_line": selected})
}

pub fn save_state(
    step: &ExecutionStep,
    root_fen: &str,
    results: &BTreeMap<u32, Value>,
    state_slots: &mut HashMap<String, String>,
) -> Value {
    let name = step.param_str("save_as").unwrap_or("unnamed").to_string();
    let fen = resolve_step_fen(step, root_fen, results, state_slots);
    state_slots.insert(name.clone(), fen.clone());
    json!({"state_name": name, "fen": fen})
}

pub async fn score_state(
    step: &ExecutionStep,
    root_fen: &str,
    results: &BTreeMap<u32, Value>,
    state_slots: &HashMap<String, String>,
    engine: &Arc<dyn EngineClient>,
) -> ExecutorResult<Value> {
    let fen = resolve_step_fen(step, root_fen, results, state_slots);
    let depth = step.parameters.get("depth").and_then(Value::as_u64).map(|d| d as u32).unwrap_or(8).clamp(1, 18);
    let analysis = engine.analyze(&fen, depth, 1, Duration::from_secs(15)).await?;
    let white_to_move = rules::side_to_move(&fen)? == shakmaty::Color::White;
    let eval_cp_white = if white_to_move { analysis.eval_cp } else { -analysis.eval_cp };
    let score_side = step.param_str("side").unwrap_or(if white_to_move { "white" } else { "black" });
    let score_side_cp = if score_side == "white" { eval_cp_white } else { -eval_cp_white };
    Ok(json!({
        "eval_cp_white": eval_cp_white,
        "score_side_cp": score_side_cp,
        "best_move_san": analysis.best_move_san,
        "breakdown": analysis.lines,
    }))
}

pub fn select_state(step: &ExecutionStep, state_slots: &HashMap<String, String>) -> Value {
    let candidates: Vec<(String, f64)> = step
        .parameters
        .get("candidates")
        .and_then(|v| v.as_object())
        .map(|obj| obj.iter().filter_map(|(k, v)| v.as_f64().map(|f| (k.clone(), f))).collect())
        .unwrap_or_default();
    let minimize = step.parameters.get("minimize").and_then(Value::as_bool).unwrap_or(false);
    let winner = if minimize {
        candidates.iter().min_by(|a, b| a.1.total_cmp(&b.1))
    } else {
        candidates.iter().max_by(|a, b| a.1.total_cmp(&b.1))
    };
    let save_as = step.param_str("save_as").unwrap_or("selected_state").to_string();
    match winner {
        Some((name, score)) => {
            let fen = state_slots.get(name).cloned();
            json!({"save_as": save_as, "selected": name, "score": score, "fen": fen})
        }
        None => json!({"save_as": save_as, "selected": Value::Null}),
    }
}

pub async fn audit_line(
    step: &ExecutionStep,
    root_fen: &str,
    results: &BTreeMap<u32, Value>,
    state_slots: &HashMap<String, String>,
    engine: &Arc<dyn EngineClient>,
) -> ExecutorResult<Value> {
    let applied = apply_line(step, root_fen, results, state_slots);
    let end_fen = applied.get("end_fen").and_then(Value::as_str).unwrap_or(root_fen).to_string();
    let depth = step.parameters.get("audit_depth").and_then(Value::as_u64).map(|d| d as u32).unwrap_or(16).clamp(1, 24);
    let analysis = engine.analyze(&end_fen, depth, 2, Duration::from_secs(20)).await?;
    let best_cp = analysis.lines.first().map(|l| l.eval_cp).unwrap_or(analysis.eval_cp);
    let second_cp = analysis.lines.get(1).map(|l| l.eval_cp);
    let decisiveness_gap_cp = second_cp.map(|second| best_cp - second);
    Ok(json!({
        "applied_line": applied,
        "audit_eval_cp": analysis.eval_cp,
        "audit_best_move_san": analysis.best_move_san,
        "decisiveness_gap_cp": decisiveness_gap_cp,
    }))
}

fn goal_status_rank(status: GoalStatus) -> u8 {
    match status {
        GoalStatus::Success => 2,
        GoalStatus::Uncertain => 1,
        GoalStatus::Failure => 0,
    }
}

pub async fn retry_investigate_target(
    step: &ExecutionStep,
    root_fen: &str,
    results: &BTreeMap<u32, Value>,
    state_slots: &HashMap<String, String>,
    engine: &Arc<dyn EngineClient>,
    cache: &Arc<crate::engine::AnalysisCache>,
    config: &CoreConfig,
) -> ExecutorResult<Value> {
    let fen = resolve_step_fen(step, root_fen, results, state_slots);
    let goal = goal_from_params(&step.parameters)?;
    let base_policy = policy_from_params(&step.parameters);
    let retries = step.parameters.get("retries").and_then(Value::as_u64).unwrap_or(2).max(1) as u32;

    let investigator = investigator(engine, cache, config);
    let mut best: Option<Value> = None;
    let mut best_rank = -1i32;
    let mut attempts_used = 0u32;

    for i in 0..retries {
        let policy = SearchPolicy {
            max_depth: base_policy.max_depth + 2 * i,
            beam_width: base_policy.beam_width + i as usize,
            branching_limit: base_policy.branching_limit + 2 * i as usize,
            opponent_model: base_policy.opponent_model,
        };
        attempts_used += 1;
        let result = investigator.investigate_target(&fen, &goal, &policy).await?;
        let rank = result
            .goal_search_results
            .as_ref()
            .map(|g| goal_status_rank(g.goal_status) as i32)
            .unwrap_or(-1);
        let mut value = serde_json::to_value(&result).unwrap_or(Value::Null);
        if rank > best_rank {
            best_rank = rank;
            best = Some(value.clone());
        }
        if rank == 2 {
            value["retry_attempts"] = json!(attempts_used);
            best = Some(value);
            break;
        }
    }

    let mut final_value = best.unwrap_or(Value::Null);
    final_value["retry_attempts"] = json!(attempts_used);
    Ok(final_value)
}
