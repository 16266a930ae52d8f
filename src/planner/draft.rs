//! Draft-plan generation: a single `complete_json` round trip against the
//! `plan` schema, turning a classified [`Intent`] into an unvalidated
//! [`PlanDraft`]. Everything downstream (repair, candidate injection,
//! legality filtering, capping) assumes this draft is untrusted input.

use std::sync::Arc;

use crate::external::LlmClient;

use super::types::{Intent, PlanDraft};
use super::{PlannerError, PlannerResult};

const PLAN_SYSTEM_PROMPT: &str = "You write an execution plan as JSON matching the given schema. \
Each step names an action_type from the closed set (ask_clarification, investigate_position, \
investigate_move, investigate_target, apply_line, select_line, save_state, score_state, \
select_state, audit_line, retry_investigate_target, investigate_game, synthesize, answer). \
References to earlier steps use step:N.<path>; references to saved states use state:NAME. \
Never invent a step number that does not exist yet.";

pub async fn draft_plan(
    llm: &Arc<dyn LlmClient>,
    session_id: &str,
    intent: &Intent,
) -> PlannerResult<PlanDraft> {
    let task_seed = serde_json::to_string(intent)
        .map_err(|e| PlannerError::MalformedDraft(e.to_string()))?;
    let value = llm
        .complete_json(session_id, "plan", PLAN_SYSTEM_PROMPT, &task_seed, &intent.summary, "planner")
        .await
        .map_err(PlannerError::Llm)?;
    serde_json::from_value(value).map_err(|e| PlannerError::MalformedDraft(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    use crate::external::{LlmError, LlmResult};
    use crate::planner::types::InvestigationRequest;

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
                "discussion_agenda": "What's the right plan here?"
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
    async fn drafts_a_plan_from_the_llm_response() {
        let llm: Arc<dyn LlmClient> = Arc::new(StubLlm);
        let draft = draft_plan(&llm, "session-1", &intent()).await.unwrap();
        assert_eq!(draft.steps.len(), 1);
        assert_eq!(draft.discussion_agenda, "What's the right plan here?");
    }
}
