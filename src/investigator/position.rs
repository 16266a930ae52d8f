//! `investigate_position` and `investigate_move`.

use std::collections::BTreeMap;

use crate::engine::baseline::truncate_pgn;
use crate::rules;
use crate::see::{self, SeeConfig};

use super::{complexity_score, tag_deltas, themes_identified, InvestigationResult, Investigator, InvestigatorResult};

pub async fn investigate_position(
    inv: &Investigator,
    fen: &str,
    depth: Option<u32>,
    focus: Option<&str>,
) -> InvestigatorResult<InvestigationResult> {
    let mut engine_config = inv.config.engine.clone();
    if let Some(d) = depth {
        engine_config.d16_depth = d;
    }
    let scanner = crate::engine::BaselineScanner::new(
        inv.client.clone(),
        inv.cache.clone(),
        engine_config,
    );
    let baseline = scanner.scan(fen).await?;

    let color = super::side_to_move_color(fen)?;
    let pos = rules::position_from_fen(fen)?;
    let tactics = see::scan(&pos, color, &inv.config.see);
    let themes = themes_identified(fen, focus, 8);
    let complexity = complexity_score(fen, &tactics);

    Ok(InvestigationResult {
        eval_before: Some(baseline.eval_d2),
        best_move: baseline.best_move_d2.clone(),
        best_move_d16: baseline.best_move_d16.clone(),
        top_moves_d2: baseline.top_moves_d2.clone(),
        candidate_moves: baseline.top_moves_d2.clone(),
        tactics_found: Some(tactics),
        themes_identified: themes,
        pgn_branches: {
            let mut m = BTreeMap::new();
            m.insert("main".to_string(), baseline.evidence.pgn_exploration.clone());
            m
        },
        evidence_per_move_deltas: baseline.evidence.per_move_deltas.clone(),
        end_fen: Some(fen.to_string()),
        complexity_score: Some(complexity),
        ..Default::default()
    })
}

#[allow(clippy::too_many_arguments)]
pub async fn investigate_move(
    inv: &Investigator,
    fen: &str,
    move_san: &str,
    depth_16: Option<u32>,
    depth_2: Option<u32>,
    evidence_base_plies: Option<u32>,
    evidence_max_plies: Option<u32>,
    follow_pv: bool,
    focus: Option<&str>,
) -> InvestigatorResult<InvestigationResult> {
    let mut engine_config = inv.config.engine.clone();
    if let Some(d) = depth_16 {
        engine_config.d16_depth = d;
    }
    if let Some(d) = depth_2 {
        engine_config.d2_depth = d;
    }
    let max_plies = evidence_max_plies.unwrap_or(inv.config.investigator.evidence_max_plies);
    let base_plies = evidence_base_plies.unwrap_or(inv.config.investigator.evidence_base_plies);
    // A caller requesting a shallower-than-default D16 depth is investigating
    // a secondary candidate rather than the primary recommendation (the
    // planner's candidate-injection step sets `depth_16` this way for every
    // non-engine-best candidate, see `planner::injected_investigate_move_step`);
    // keep its evidence line short at `base_plies` instead of paying for the
    // full `max_plies` extension it has no use for.
    let is_primary = depth_16.is_none_or(|d| d >= inv.config.engine.d16_depth);
    let evidence_plies = if is_primary { max_plies } else { base_plies.min(max_plies) };

    let before_pos = rules::position_from_fen(fen)?;
    let before_color = before_pos.turn();

    let scanner = crate::engine::BaselineScanner::new(inv.client.clone(), inv.cache.clone(), engine_config.clone());
    let baseline_before = scanner.scan(fen).await?;
    let eval_before = baseline_before.eval_d2;

    let after_fen = rules::play_san(fen, move_san)?;
    let baseline_after = scanner.scan(&after_fen).await?;
    // `baseline_after.eval_d2` is from the side-to-move-after-the-move's
    // perspective; normalize back to the player who made `move_san`.
    let eval_after = -baseline_after.eval_d2;
    let eval_drop = eval_before - eval_after;

    let mut pv_after_move: Vec<String> = if follow_pv {
        baseline_after.pv_d16.clone()
    } else {
        baseline_after.pv_after_move.clone()
    };
    pv_after_move.truncate(evidence_plies as usize);

    let (end_fen, _) = {
        let (fens, _err) = rules::replay_san_line(&after_fen, &pv_after_move);
        (fens.last().cloned().unwrap_or_else(|| after_fen.clone()), fens)
    };

    let (gained, lost) = tag_deltas(fen, &after_fen)?;

    let pos_after = rules::position_from_fen(&after_fen)?;
    let tactics = see::scan(&pos_after, pos_after.turn(), &inv.config.see);
    let _ = before_color;

    let mut pgn_branches = BTreeMap::new();
    let mut full_line = vec![move_san.to_string()];
    full_line.extend(pv_after_move.iter().cloned());
    pgn_branches.insert(
        "played".to_string(),
        truncate_pgn(&full_line.join(" "), engine_config.pgn_max_chars),
    );

    let _ = SeeConfig::default();
    let themes = themes_identified(&after_fen, focus, 8);

    Ok(InvestigationResult {
        requested_move: Some(move_san.to_string()),
        eval_before: Some(eval_before),
        eval_after: Some(eval_after),
        eval_drop: Some(eval_drop),
        pv_after_move,
        player_move: Some(move_san.to_string()),
        best_move: baseline_before.best_move_d2.clone(),
        best_move_d16: baseline_before.best_move_d16.clone(),
        top_moves_d2: baseline_before.top_moves_d2.clone(),
        tactics_found: Some(tactics),
        themes_identified: themes,
        pgn_branches,
        evidence_tags_gained_net: gained,
        evidence_tags_lost_net: lost,
        evidence_per_move_deltas: baseline_after.evidence.per_move_deltas.clone(),
        end_fen: Some(end_fen),
        ..Default::default()
    })
}
