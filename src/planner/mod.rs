//! Turns a classified intent into an executable plan: draft from the LLM,
//! deterministic repair, candidate-move enforcement, a final legality pass,
//! and dense renumbering.

pub mod candidates;
pub mod draft;
pub mod repair;
pub mod types;

pub use types::{ConnectedIdea, Intent, InvestigationRequest, PlanDraft, PlannerError, PlannerResult};

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::config::PlannerConfig;
use crate::engine::{AnalysisCache, EngineClient};
use crate::external::LlmClient;
use crate::plan::{ExecutionPlan, ExecutionStep};

pub struct Planner {
    llm: Arc<dyn LlmClient>,
    engine: Arc<dyn EngineClient>,
    cache: Arc<AnalysisCache>,
    config: PlannerConfig,
}

impl Planner {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        engine: Arc<dyn EngineClient>,
        cache: Arc<AnalysisCache>,
        config: PlannerConfig,
    ) -> Self {
        Self { llm, engine, cache, config }
    }

    /// Build a validated, renumbered execution plan from a classified intent.
    pub async fn build_plan(&self, session_id: &str, intent: &Intent) -> PlannerResult<ExecutionPlan> {
        let mut draft = draft::draft_plan(&self.llm, session_id, intent).await?;
        repair::repair_all_refs(&mut draft.steps);
        let has_requests = !intent.investigation_requests.is_empty();
        draft.steps = repair::drop_style_clarifications(draft.steps, intent.root_fen.is_some(), has_requests);

        // Piece identity: when the interpreter could not
        // resolve which instance of a piece type the user meant, it surfaces
        // a `needs_clarification:<piecetype>:<opts>` entity rather than
        // guessing; the plan's first step becomes an ask_clarification so
        // the executor stops there instead of investigating the wrong piece.
        if let Some(question) = clarification_question(intent) {
            draft.steps.insert(0, ask_clarification_step(&question));
        }

        if let Some(root_fen) = &intent.root_fen {
            let candidate_set =
                candidates::enforce_candidates(intent, root_fen, &self.engine, &self.cache, &self.config)
                    .await?;
            for move_san in &candidate_set.moves {
                if draft_already_investigates(&draft.steps, move_san) {
                    continue;
                }
                let is_primary = candidate_set.engine_best.as_deref() == Some(move_san.as_str());
                let purpose = if is_primary {
                    format!("investigate the engine's top candidate {move_san}")
                } else {
                    format!("investigate the candidate move {move_san}")
                };
                draft.steps.push(injected_investigate_move_step(move_san, &purpose, is_primary));
            }
        }

        let steps = draft
            .steps
            .into_iter()
            .enumerate()
            .map(|(i, d)| ExecutionStep {
                step_number: i as u32 + 1,
                action_type: d.action_type,
                parameters: d.parameters,
                purpose: d.purpose,
                tool: d.tool,
                expected_output: d.expected_output,
                status: crate::plan::StepStatus::Pending,
            })
            .collect();

        let mut plan = ExecutionPlan {
            plan_id: Uuid::new_v4().to_string(),
            original_intent: intent.summary.clone(),
            discussion_agenda: draft.discussion_agenda,
            steps,
            metadata: Default::default(),
        };
        plan.renumber();
        Ok(plan)
    }
}

fn draft_already_investigates(steps: &[types::DraftStep], move_san: &str) -> bool {
    steps.iter().any(|s| {
        s.action_type == crate::plan::ActionType::InvestigateMove
            && s.param_str("move_san") == Some(move_san)
    })
}

/// Parse a `needs_clarification:<piecetype>:<opts>` entity into a concrete
/// question for the user, asking them to pick among the named squares.
fn clarification_question(intent: &Intent) -> Option<String> {
    let entity = intent.needs_clarification.first()?;
    let mut parts = entity.splitn(3, ':');
    let _prefix = parts.next()?;
    let piece_type = parts.next()?;
    let opts = parts.next().unwrap_or_default();
    Some(format!("Which {piece_type} did you mean — {opts}?"))
}

fn ask_clarification_step(question: &str) -> types::DraftStep {
    let mut parameters = std::collections::BTreeMap::new();
    parameters.insert("question".to_string(), Value::String(question.to_string()));
    types::DraftStep {
        action_type: crate::plan::ActionType::AskClarification,
        parameters,
        purpose: "resolve ambiguous piece identity before investigating".to_string(),
        tool: None,
        expected_output: None,
    }
}

/// Injected candidate moves are investigated at full D16 depth only when
/// they're the engine's top pick; the rest get a cheap D2-only look so the
/// executor isn't paying sixteen-ply search for every secondary candidate
/// (mirrors the "D16 for primary, D2 for the rest" split the planner's
/// speed policy enforces upstream of the executor).
fn injected_investigate_move_step(move_san: &str, purpose: &str, is_primary: bool) -> types::DraftStep {
    let mut parameters = std::collections::BTreeMap::new();
    parameters.insert("move_san".to_string(), Value::String(move_san.to_string()));
    if !is_primary {
        parameters.insert("depth_16".to_string(), Value::Number(2.into()));
    }
    types::DraftStep {
        action_type: crate::plan::ActionType::InvestigateMove,
        parameters,
        purpose: purpose.to_string(),
        tool: None,
        expected_output: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    use crate::engine::mock::ScriptedEngineClient;
    use crate::external::{LlmError, LlmResult};

    struct StubLlm;

    #[async_trait]
    impl LlmClient for StubLlm {
        async fn complete_json(
            &self,
            _session_id: &str,
            _stage: &str,
            _system_prompt: &str,
            _task_seed: &str,
            _user_text: &str,
            _model: &str,
        ) -> LlmResult<Value> {
            Ok(json!({
                "steps": [{
                    "action_type": "investigate_position",
                    "parameters": {},
                    "purpose": "orient on the current position"
                }],
                "discussion_agenda": "agenda"
            }))
        }

        async fn complete(&self, _s: &str, _sp: &str, _ut: &str, _m: &str) -> LlmResult<String> {
            Err(LlmError::Request("not used in this test".into()))
        }

        async fn get_task_memory(&self, _task_id: &str, _subsession: &str) -> LlmResult<Option<Value>> {
            Ok(None)
        }

        async fn set_task_memory(&self, _task_id: &str, _subsession: &str, _memory: Value) -> LlmResult<()> {
            Ok(())
        }
    }

    fn intent() -> Intent {
        Intent {
            goal: "understand the position".into(),
            summary: "why is white better here".into(),
            investigation_requests: vec![InvestigationRequest {
                purpose: "orient".into(),
                move_san: None,
                piece_type: None,
            }],
            root_fen: Some("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1".into()),
            connected_ideas: Vec::new(),
            needs_clarification: Vec::new(),
            has_prefetched_baseline: false,
        }
    }

    #[tokio::test]
    async fn build_plan_injects_engine_candidates_and_renumbers() {
        let planner = Planner::new(
            Arc::new(StubLlm),
            Arc::new(ScriptedEngineClient::new()),
            Arc::new(AnalysisCache::new(16)),
            PlannerConfig::default(),
        );
        let plan = planner.build_plan("session-1", &intent()).await.unwrap();
        assert!(plan.steps.len() >= 2);
        for (i, step) in plan.steps.iter().enumerate() {
            assert_eq!(step.step_number, i as u32 + 1);
        }
        assert!(plan.steps.iter().any(|s| s.action_type == crate::plan::ActionType::InvestigateMove));
    }

    #[tokio::test]
    async fn ambiguous_piece_identity_asks_for_clarification_first() {
        let planner = Planner::new(
            Arc::new(StubLlm),
            Arc::new(ScriptedEngineClient::new()),
            Arc::new(AnalysisCache::new(16)),
            PlannerConfig::default(),
        );
        let mut intent = intent();
        intent.needs_clarification = vec!["needs_clarification:knight:b1,g1".to_string()];
        let plan = planner.build_plan("session-1", &intent).await.unwrap();
        assert_eq!(plan.steps[0].action_type, crate::plan::ActionType::AskClarification);
        assert_eq!(plan.steps[0].step_number, 1);
        let question = plan.steps[0].param_str("question").unwrap();
        assert!(question.contains("knight"));
        assert!(question.contains("b1,g1"));
    }

    #[tokio::test]
    async fn non_primary_injected_candidates_get_a_shallow_depth_16() {
        let planner = Planner::new(
            Arc::new(StubLlm),
            Arc::new(ScriptedEngineClient::new()),
            Arc::new(AnalysisCache::new(16)),
            PlannerConfig::default(),
        );
        let plan = planner.build_plan("session-1", &intent()).await.unwrap();
        let injected: Vec<_> =
            plan.steps.iter().filter(|s| s.action_type == crate::plan::ActionType::InvestigateMove).collect();
        assert!(injected.len() >= 2, "expected more than one injected candidate move");
        let primary_count = injected.iter().filter(|s| s.parameters.get("depth_16").is_none()).count();
        let secondary_count = injected
            .iter()
            .filter(|s| s.parameters.get("depth_16").and_then(Value::as_u64) == Some(2))
            .count();
        assert_eq!(primary_count, 1, "exactly one candidate should keep the default full-depth D16 scan");
        assert_eq!(secondary_count, injected.len() - 1);
    }

    #[tokio::test]
    async fn prefetched_baseline_skips_candidate_injection() {
        let planner = Planner::new(
            Arc::new(StubLlm),
            Arc::new(ScriptedEngineClient::new()),
            Arc::new(AnalysisCache::new(16)),
            PlannerConfig::default(),
        );
        let mut intent = intent();
        intent.has_prefetched_baseline = true;
        let plan = planner.build_plan("session-1", &intent).await.unwrap();
        assert_eq!(plan.steps.len(), 1);
    }
}
