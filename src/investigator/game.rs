//! `investigate_game`: per-ply analysis surfacing critical moments and a
//! move-quality classification. A ply is critical when
//! `|eval_after - eval_before| >= critical_threshold_cp`, independent of
//! the move's classification band.

use std::time::Duration;

use super::{themes_identified, CriticalMoment, InvestigationResult, Investigator, InvestigatorResult, MoveClassification};
use crate::rules;

pub async fn investigate_game(
    inv: &Investigator,
    moves_san: &[String],
    start_fen: &str,
    focus: Option<&str>,
) -> InvestigatorResult<InvestigationResult> {
    let depth = inv.config.engine.d2_depth;
    let threshold = inv.config.investigator.critical_threshold_cp;

    let mut current_fen = start_fen.to_string();
    let mut critical_moments = Vec::new();

    for (idx, mv) in moves_san.iter().enumerate() {
        let before = inv.client.analyze(&current_fen, depth, 1, Duration::from_secs(5)).await?;
        let eval_before = before.eval_cp;
        let is_engine_best = before.best_move_san.as_deref() == Some(mv.as_str());

        let Ok(new_fen) = rules::play_san(&current_fen, mv) else { continue };
        let after = inv.client.analyze(&new_fen, depth, 1, Duration::from_secs(5)).await?;
        let eval_after = -after.eval_cp;
        let eval_drop = eval_before - eval_after;

        let classification = classify_move(eval_drop, is_engine_best);
        if (eval_after - eval_before).abs() >= threshold {
            critical_moments.push(CriticalMoment {
                ply: idx as u32 + 1,
                move_san: mv.clone(),
                eval_before,
                eval_after,
                classification,
            });
        }

        current_fen = new_fen;
    }

    let themes = themes_identified(&current_fen, focus, 8);

    Ok(InvestigationResult {
        critical_moments,
        end_fen: Some(current_fen),
        themes_identified: themes,
        ..Default::default()
    })
}

fn classify_move(eval_drop: i32, is_engine_best: bool) -> MoveClassification {
    if is_engine_best {
        return MoveClassification::Best;
    }
    match eval_drop {
        d if d <= 10 => MoveClassification::Great,
        d if d <= 25 => MoveClassification::Good,
        d if d <= 50 => MoveClassification::Inaccuracy,
        d if d <= 150 => MoveClassification::Mistake,
        _ => MoveClassification::Blunder,
    }
}
