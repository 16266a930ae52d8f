//! Runs an [`ExecutionPlan`] to completion: sequential step dispatch with
//! opportunistic parallel batching for consecutive `investigate_move` steps
//! sharing a root FEN, reference resolution, and per-step failure isolation.

mod goals;
mod handlers;
mod reference;
mod types;

pub use types::{ExecutorError, ExecutorResult, PlanRun};

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::{json, Value};

use crate::config::CoreConfig;
use crate::engine::{AnalysisCache, EngineClient};
use crate::plan::{ActionType, ExecutionPlan, StepStatus};

pub struct Executor {
    engine: Arc<dyn EngineClient>,
    cache: Arc<AnalysisCache>,
    config: CoreConfig,
}

impl Executor {
    pub fn new(engine: Arc<dyn EngineClient>, cache: Arc<AnalysisCache>, config: CoreConfig) -> Self {
        Self { engine, cache, config }
    }

    pub async fn run_plan(&self, plan: &mut ExecutionPlan, root_fen: &str) -> PlanRun {
        let mut run = PlanRun::default();
        let steps_len = plan.steps.len();
        let mut i = 0usize;

        while i < steps_len {
            if plan.steps[i].action_type == ActionType::InvestigateMove {
                let batch_fen = handlers::resolve_step_fen(&plan.steps[i], root_fen, &run.results, &run.state_slots);
                let mut j = i;
                while j + 1 < steps_len
                    && plan.steps[j + 1].action_type == ActionType::InvestigateMove
                    && handlers::resolve_step_fen(&plan.steps[j + 1], root_fen, &run.results, &run.state_slots)
                        == batch_fen
                {
                    j += 1;
                }
                if j > i {
                    log::info!("batching investigate_move steps {}..={} at shared root", i + 1, j + 1);
                    self.run_batch(plan, i, j, root_fen, &mut run).await;
                    i = j + 1;
                    continue;
                }
            }

            plan.steps[i].status = StepStatus::InProgress;
            let (mut value, critical_failure) = self.dispatch(&plan.steps[i], root_fen, &run).await;
            if let Some(state_update) = value.get("__state_slots_update").cloned() {
                if let Some(obj) = state_update.as_object() {
                    for (k, v) in obj {
                        if let Some(s) = v.as_str() {
                            run.state_slots.insert(k.clone(), s.to_string());
                        }
                    }
                }
                if let Some(obj) = value.as_object_mut() {
                    obj.remove("__state_slots_update");
                }
            }
            let stops_for_clarification =
                plan.steps[i].action_type == ActionType::AskClarification;
            let step_number = plan.steps[i].step_number;
            run.results.insert(step_number, value);
            plan.steps[i].status = if critical_failure { StepStatus::Failed } else { StepStatus::Completed };
            run.incomplete |= critical_failure;
            if critical_failure {
                log::warn!("step {step_number} failed critically; plan may be incomplete");
            }

            if stops_for_clarification {
                run.stopped_for_clarification = true;
                break;
            }
            i += 1;
        }

        run
    }

    async fn run_batch(
        &self,
        plan: &mut ExecutionPlan,
        start: usize,
        end: usize,
        root_fen: &str,
        run: &mut PlanRun,
    ) {
        for k in start..=end {
            plan.steps[k].status = StepStatus::InProgress;
        }
        let mut tasks = Vec::new();
        for k in start..=end {
            let step = plan.steps[k].clone();
            let fen = handlers::resolve_step_fen(&step, root_fen, &run.results, &run.state_slots);
            let engine = self.engine.clone();
            let cache = self.cache.clone();
            let config = self.config.clone();
            let results = run.results.clone();
            let state_slots = run.state_slots.clone();
            tasks.push(tokio::spawn(async move {
                let value = handlers::investigate_move(&step, &fen, &results, &state_slots, &engine, &cache, &config)
                    .await
                    .unwrap_or_else(|e| json!({"error": e.to_string()}));
                (step.step_number, value)
            }));
        }

        // Ordering is preserved by indexing the pre-sized results below, not
        // by the order these tasks happen to finish in.
        let mut collected: Vec<(u32, Value)> = Vec::with_capacity(tasks.len());
        for task in tasks {
            match task.await {
                Ok(pair) => collected.push(pair),
                Err(join_err) => {
                    log::error!("batched investigate_move task panicked: {join_err}");
                }
            }
        }
        collected.sort_by_key(|(step_number, _)| *step_number);
        for (step_number, value) in collected {
            let is_error = value.get("error").is_some();
            run.incomplete |= is_error;
            run.results.insert(step_number, value);
            if let Some(step) = plan.steps.iter_mut().find(|s| s.step_number == step_number) {
                step.status = if is_error { StepStatus::Failed } else { StepStatus::Completed };
            }
        }
    }

    async fn dispatch(
        &self,
        step: &crate::plan::ExecutionStep,
        root_fen: &str,
        run: &PlanRun,
    ) -> (Value, bool) {
        use ActionType::*;
        let results = &run.results;
        let state_slots = &run.state_slots;

        let outcome: Result<Value, String> = match step.action_type {
            AskClarification => Ok(json!({
                "needs_clarification": true,
                "question": step.param_str("question").unwrap_or("Could you clarify what you'd like to investigate?"),
            })),
            InvestigatePosition => handlers::investigate_position(step, root_fen, results, state_slots, &self.engine, &self.cache, &self.config)
                .await
                .map_err(|e| e.to_string()),
            InvestigateMove => handlers::investigate_move(step, root_fen, results, state_slots, &self.engine, &self.cache, &self.config)
                .await
                .map_err(|e| e.to_string()),
            InvestigateTarget => handlers::investigate_target(step, root_fen, results, state_slots, &self.engine, &self.cache, &self.config)
                .await
                .map_err(|e| e.to_string()),
            InvestigateGame => handlers::investigate_game(step, &self.engine, &self.cache, &self.config)
                .await
                .map_err(|e| e.to_string()),
            ApplyLine => Ok(handlers::apply_line(step, root_fen, results, state_slots)),
            SelectLine => Ok(handlers::select_line(step, results)),
            SaveState => {
                let mut slots = state_slots.clone();
                let value = handlers::save_state(step, root_fen, results, &mut slots);
                let mut value = value;
                value["__state_slots_update"] = json!(slots);
                Ok(value)
            }
            ScoreState => handlers::score_state(step, root_fen, results, state_slots, &self.engine)
                .await
                .map_err(|e| e.to_string()),
            SelectState => Ok(handlers::select_state(step, state_slots)),
            AuditLine => handlers::audit_line(step, root_fen, results, state_slots, &self.engine)
                .await
                .map_err(|e| e.to_string()),
            RetryInvestigateTarget => {
                handlers::retry_investigate_target(step, root_fen, results, state_slots, &self.engine, &self.cache, &self.config)
                    .await
                    .map_err(|e| e.to_string())
            }
            Synthesize => Ok(json!({"marker": "synthesize"})),
            Answer => Ok(json!({"marker": "answer"})),
        };

        let is_investigation = matches!(
            step.action_type,
            InvestigatePosition | InvestigateMove | InvestigateTarget | InvestigateGame
        );

        match outcome {
            Ok(value) => (value, false),
            Err(e) => (json!({"error": e}), is_investigation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap as Map;

    use crate::engine::mock::ScriptedEngineClient;
    use crate::plan::{ActionType as A, ExecutionStep, StepStatus};

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    fn step(action_type: A, parameters: Value) -> ExecutionStep {
        ExecutionStep {
            step_number: 0,
            action_type,
            parameters: serde_json::from_value(parameters).unwrap(),
            purpose: "test".into(),
            tool: None,
            expected_output: None,
            status: StepStatus::Pending,
        }
    }

    fn executor() -> Executor {
        Executor::new(Arc::new(ScriptedEngineClient::new()), Arc::new(AnalysisCache::new(64)), CoreConfig::default())
    }

    #[tokio::test]
    async fn ask_clarification_stops_the_plan() {
        let mut plan = ExecutionPlan {
            plan_id: "p".into(),
            original_intent: "x".into(),
            discussion_agenda: String::new(),
            steps: vec![
                step(A::AskClarification, json!({"question": "which piece?"})),
                step(A::InvestigatePosition, json!({})),
            ],
            metadata: Map::new(),
        };
        plan.renumber();
        let run = executor().run_plan(&mut plan, START).await;
        assert!(run.stopped_for_clarification);
        assert_eq!(run.results.len(), 1);
    }

    #[tokio::test]
    async fn batches_consecutive_investigate_move_steps() {
        let mut plan = ExecutionPlan {
            plan_id: "p".into(),
            original_intent: "x".into(),
            discussion_agenda: String::new(),
            steps: vec![
                step(A::InvestigateMove, json!({"move_san": "e4"})),
                step(A::InvestigateMove, json!({"move_san": "d4"})),
            ],
            metadata: Map::new(),
        };
        plan.renumber();
        let run = executor().run_plan(&mut plan, START).await;
        assert_eq!(run.results.len(), 2);
        assert!(!run.incomplete);
    }

    #[tokio::test]
    async fn apply_line_replays_from_root() {
        let mut plan = ExecutionPlan {
            plan_id: "p".into(),
            original_intent: "x".into(),
            discussion_agenda: String::new(),
            steps: vec![step(
                A::ApplyLine,
                json!({"line_ref": "step:1.pv_after_move", "max_plies": 10}),
            )],
            metadata: Map::new(),
        };
        plan.renumber();
        let run = executor().run_plan(&mut plan, START).await;
        let result = &run.results[&1];
        assert_eq!(result["start_fen"], json!(START));
    }

    #[tokio::test]
    async fn save_state_then_score_state_round_trips() {
        let mut plan = ExecutionPlan {
            plan_id: "p".into(),
            original_intent: "x".into(),
            discussion_agenda: String::new(),
            steps: vec![
                step(A::SaveState, json!({"save_as": "root"})),
                step(A::ScoreState, json!({"fen_ref": "state:root", "depth": 4})),
            ],
            metadata: Map::new(),
        };
        plan.renumber();
        let run = executor().run_plan(&mut plan, START).await;
        assert!(run.results[&2].get("eval_cp_white").is_some());
    }
}
