//! `investigate_target`: bounded best-first search for a goal predicate.
//! `opponent_model = typical` samples rather than picking a single
//! heuristic move: each opponent reply is drawn from the engine's multi-PV
//! list with weight inversely proportional to its rank, so "typical" play
//! is usually strong but not always the engine's top choice. See
//! `DESIGN.md`.

use std::time::Duration;

use rand::distributions::{Distribution, WeightedIndex};
use rand::thread_rng;

use crate::config::{OpponentModel, SearchPolicy};
use crate::rules;

use super::{Goal, GoalSearchResult, GoalStatus, InvestigationResult, Investigator, InvestigatorResult};

struct Branch {
    fen: String,
    path: Vec<String>,
}

pub async fn investigate_target(
    inv: &Investigator,
    fen: &str,
    goal: &Goal,
    policy: &SearchPolicy,
) -> InvestigatorResult<InvestigationResult> {
    let root_color = super::side_to_move_color(fen)?;
    let mut frontier = vec![Branch { fen: fen.to_string(), path: Vec::new() }];
    let mut witnesses: Vec<Vec<String>> = Vec::new();
    let mut exhausted_without_witness = false;

    {
        let pos = rules::position_from_fen(fen)?;
        if (goal.predicate)(&pos) {
            witnesses.push(Vec::new());
        }
    }

    for _ in 0..policy.max_depth {
        if frontier.is_empty() {
            break;
        }
        let mut next_frontier: Vec<Branch> = Vec::new();

        for branch in &frontier {
            let pos = rules::position_from_fen(&branch.fen)?;
            if pos.legal_moves().is_empty() {
                continue;
            }

            if pos.turn() == root_color {
                let candidates = rank_moves(inv, &branch.fen, policy.branching_limit).await;
                for mv in candidates {
                    let Ok(new_fen) = rules::play_san(&branch.fen, &mv) else { continue };
                    let mut new_path = branch.path.clone();
                    new_path.push(mv);
                    if let Ok(new_pos) = rules::position_from_fen(&new_fen) {
                        if (goal.predicate)(&new_pos) {
                            witnesses.push(new_path.clone());
                        }
                    }
                    next_frontier.push(Branch { fen: new_fen, path: new_path });
                }
            } else if let Some(mv) = select_opponent_move(inv, &branch.fen, policy).await {
                let Ok(new_fen) = rules::play_san(&branch.fen, &mv) else { continue };
                let mut new_path = branch.path.clone();
                new_path.push(mv);
                if let Ok(new_pos) = rules::position_from_fen(&new_fen) {
                    if (goal.predicate)(&new_pos) {
                        witnesses.push(new_path.clone());
                    }
                }
                next_frontier.push(Branch { fen: new_fen, path: new_path });
            }
        }

        if next_frontier.is_empty() {
            exhausted_without_witness = true;
            frontier = Vec::new();
            break;
        }

        // Keep the beam: rank by a quick shallow eval from the root side's
        // perspective and keep the top `beam_width`.
        let mut scored = Vec::new();
        for branch in next_frontier {
            let eval = quick_eval(inv, &branch.fen, root_color).await;
            scored.push((eval, branch));
        }
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.truncate(policy.beam_width.max(1));
        frontier = scored.into_iter().map(|(_, b)| b).collect();
    }

    let goal_status = if !witnesses.is_empty() {
        GoalStatus::Success
    } else if exhausted_without_witness {
        GoalStatus::Failure
    } else {
        GoalStatus::Uncertain
    };

    let witness_line_san = witnesses.iter().min_by(|a, b| {
        a.len().cmp(&b.len()).then_with(|| a.join(" ").cmp(&b.join(" ")))
    }).cloned();

    Ok(InvestigationResult {
        goal_search_results: Some(GoalSearchResult { goal_status, witness_line_san, witnesses }),
        end_fen: Some(fen.to_string()),
        ..Default::default()
    })
}

async fn rank_moves(inv: &Investigator, fen: &str, limit: usize) -> Vec<String> {
    let depth = inv.config.engine.d2_depth;
    match inv.client.analyze(fen, depth, limit.max(1), Duration::from_secs(5)).await {
        Ok(result) if !result.lines.is_empty() => {
            result.lines.into_iter().map(|l| l.move_san).collect()
        }
        _ => rules::legal_moves_san(fen).unwrap_or_default().into_iter().take(limit.max(1)).collect(),
    }
}

async fn select_opponent_move(inv: &Investigator, fen: &str, policy: &SearchPolicy) -> Option<String> {
    let depth = inv.config.engine.d2_depth;
    let limit = policy.branching_limit.max(1);
    let result = inv.client.analyze(fen, depth, limit, Duration::from_secs(5)).await.ok()?;
    if result.lines.is_empty() {
        return rules::legal_moves_san(fen).ok()?.into_iter().next();
    }
    match policy.opponent_model {
        OpponentModel::Best => Some(result.lines[0].move_san.clone()),
        OpponentModel::Worst => result.lines.last().map(|l| l.move_san.clone()),
        OpponentModel::Typical => {
            let weights: Vec<f64> = (1..=result.lines.len()).map(|rank| 1.0 / rank as f64).collect();
            let Ok(dist) = WeightedIndex::new(&weights) else {
                return Some(result.lines[0].move_san.clone());
            };
            let idx = dist.sample(&mut thread_rng());
            Some(result.lines[idx].move_san.clone())
        }
    }
}

async fn quick_eval(inv: &Investigator, fen: &str, root_color: shakmaty::Color) -> i32 {
    let depth = inv.config.engine.d2_depth;
    let side_to_move = rules::side_to_move(fen).unwrap_or(root_color);
    match inv.client.analyze(fen, depth, 1, Duration::from_secs(3)).await {
        Ok(r) if side_to_move == root_color => r.eval_cp,
        Ok(r) => -r.eval_cp,
        Err(_) => 0,
    }
}
