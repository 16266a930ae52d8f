//! Deterministic repair pass: rewrite invalid `line_ref` paths and drop
//! style-only clarification steps once FEN + investigation requests are
//! already present.

use serde_json::Value;

use crate::plan::ActionType;

use super::types::DraftStep;

/// Rewrite a `line_ref` parameter string: if it points at an
/// `investigate_target` step, a naked `.witness_line_san` becomes
/// `.goal_search_results.witness_line_san`; if it points at an
/// `investigate_move` step, rewrite to `.pv_after_move`; otherwise, if a
/// prior `investigate_target` step exists, point at that step's witness
/// line instead.
pub fn repair_line_ref(raw: &str, steps: &[DraftStep]) -> String {
    let Some(rest) = raw.strip_prefix("step:") else { return raw.to_string() };
    let Some((num_str, path)) = rest.split_once('.') else { return raw.to_string() };
    let Ok(step_number) = num_str.parse::<usize>() else { return raw.to_string() };
    let Some(target) = steps.get(step_number.saturating_sub(1)) else { return raw.to_string() };

    match target.action_type {
        ActionType::InvestigateTarget if path == "witness_line_san" => {
            format!("step:{step_number}.goal_search_results.witness_line_san")
        }
        ActionType::InvestigateMove if path == "witness_line_san" || path == "line" => {
            format!("step:{step_number}.pv_after_move")
        }
        _ => {
            if path == "witness_line_san" {
                if let Some((idx, _)) =
                    steps.iter().enumerate().find(|(_, s)| s.action_type == ActionType::InvestigateTarget)
                {
                    return format!("step:{}.goal_search_results.witness_line_san", idx + 1);
                }
            }
            raw.to_string()
        }
    }
}

fn has_line_ref_like_key(key: &str) -> bool {
    key == "line_ref" || key == "fen_ref" || key.ends_with("_ref")
}

/// Apply `repair_line_ref` to every `*_ref` parameter in every step.
pub fn repair_all_refs(steps: &mut [DraftStep]) {
    let snapshot = steps.to_vec();
    for step in steps.iter_mut() {
        for (key, value) in step.parameters.iter_mut() {
            if !has_line_ref_like_key(key) {
                continue;
            }
            if let Value::String(s) = value {
                *s = repair_line_ref(s, &snapshot);
            }
        }
    }
}

/// Drop clarification steps whose question is about style/verbosity when
/// FEN and investigation requests are already present.
pub fn drop_style_clarifications(steps: Vec<DraftStep>, has_fen: bool, has_requests: bool) -> Vec<DraftStep> {
    if !(has_fen && has_requests) {
        return steps;
    }
    const STYLE_KEYWORDS: [&str; 5] = ["tone", "verbosity", "style", "length", "format"];
    steps
        .into_iter()
        .filter(|s| {
            if s.action_type != ActionType::AskClarification {
                return true;
            }
            let question = s.param_str("question").unwrap_or_default().to_lowercase();
            !STYLE_KEYWORDS.iter().any(|kw| question.contains(kw))
        })
        .collect()
}

impl DraftStep {
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn step(action_type: ActionType) -> DraftStep {
        DraftStep { action_type, parameters: BTreeMap::new(), purpose: String::new(), tool: None, expected_output: None }
    }

    #[test]
    fn rewrites_witness_line_for_investigate_target() {
        let steps = vec![step(ActionType::InvestigateTarget)];
        let rewritten = repair_line_ref("step:1.witness_line_san", &steps);
        assert_eq!(rewritten, "step:1.goal_search_results.witness_line_san");
    }

    #[test]
    fn rewrites_to_pv_after_move_for_investigate_move() {
        let steps = vec![step(ActionType::InvestigateMove)];
        let rewritten = repair_line_ref("step:1.witness_line_san", &steps);
        assert_eq!(rewritten, "step:1.pv_after_move");
    }

    #[test]
    fn drops_style_clarification_when_fen_and_requests_present() {
        let mut clar = step(ActionType::AskClarification);
        clar.parameters.insert("question".into(), Value::String("Should I keep it brief?".into()));
        let steps = vec![clar, step(ActionType::InvestigatePosition)];
        let result = drop_style_clarifications(steps, true, true);
        assert_eq!(result.len(), 1);
    }
}
