//! FactsCard assembly and the deterministic grounding verifier.

use std::collections::BTreeMap;

use crate::engine::{AnalysisResult, BaselineRecord};
use crate::investigator::InvestigationResult;

use super::types::FactsCard;

#[allow(clippy::too_many_arguments)]
pub fn build_facts_card(
    fen: &str,
    baseline: Option<&BaselineRecord>,
    light_result: &InvestigationResult,
    deep_result: Option<&InvestigationResult>,
    confidence_signals: BTreeMap<String, f64>,
) -> FactsCard {
    let engine_top_k = baseline
        .map(|b| {
            b.top_moves_d2
                .iter()
                .map(|m| crate::engine::AnalysisLine { move_san: m.clone(), eval_cp: b.eval_d2, pv_san: Vec::new() })
                .collect()
        })
        .unwrap_or_default();

    let recommended_move = baseline
        .and_then(|b| b.best_move_d16.clone())
        .or_else(|| light_result.best_move.clone());

    let tag_sample = light_result.themes_identified.clone();

    let evidence_examples: Vec<String> = baseline
        .map(|b| vec![b.evidence.pgn_exploration.clone()])
        .unwrap_or_default();

    FactsCard {
        fen: Some(fen.to_string()),
        engine_top_k,
        recommended_move,
        tag_sample,
        confidence_signals,
        deep_eval: deep_result.map(|r| serde_json::to_value(r).unwrap_or(serde_json::Value::Null)),
        evidence_examples,
    }
}

/// Deterministic grounding check: a recommended move must be among the
/// engine's own candidate set for the root FEN, or it gets stripped and the
/// stop reason annotated.
pub fn verify_recommendation(card: &mut FactsCard, candidate_set: &[String], stop_reason: &mut String) {
    let Some(move_san) = &card.recommended_move else { return };
    if !candidate_set.iter().any(|c| c == move_san) {
        card.recommended_move = None;
        *stop_reason = format!("{stop_reason};ungrounded_recommendation_stripped");
    }
}

pub fn candidate_set_from_analysis(result: &AnalysisResult) -> Vec<String> {
    result.lines.iter().map(|l| l.move_san.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::investigator::InvestigationResult;

    #[test]
    fn strips_recommendation_not_in_candidate_set() {
        let mut card = FactsCard { recommended_move: Some("Qh5".into()), ..Default::default() };
        let mut stop_reason = "self_check_passed".to_string();
        verify_recommendation(&mut card, &["e4".to_string(), "d4".to_string()], &mut stop_reason);
        assert!(card.recommended_move.is_none());
        assert!(stop_reason.contains("ungrounded_recommendation_stripped"));
    }

    #[test]
    fn keeps_grounded_recommendation() {
        let mut card = FactsCard { recommended_move: Some("e4".into()), ..Default::default() };
        let mut stop_reason = "self_check_passed".to_string();
        verify_recommendation(&mut card, &["e4".to_string()], &mut stop_reason);
        assert_eq!(card.recommended_move.as_deref(), Some("e4"));
    }

    #[test]
    fn builds_facts_card_from_light_result() {
        let light = InvestigationResult { best_move: Some("e4".into()), ..Default::default() };
        let card = build_facts_card("fen", None, &light, None, BTreeMap::new());
        assert_eq!(card.recommended_move.as_deref(), Some("e4"));
    }
}
