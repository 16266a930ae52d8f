//! Task-level state machine: the single entry point that routes a user
//! request to a fast deterministic path, chat, game selection/review, or a
//! full engine-grounded investigation, and always ends in one verified
//! [`AnswerEnvelope`].

mod budget;
mod facts;
mod router;
mod types;
mod ui;

pub use types::{
    AnswerEnvelope, ChatTurn, ClassifiedIntent, ControllerError, ControllerResult, FactsCard, IntentKind, Mode,
    TaskContext, UiCommand, UiCommandKind,
};

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::config::CoreConfig;
use crate::engine::{AnalysisCache, BaselineScanner, EngineClient};
use crate::executor::Executor;
use crate::external::{GameFetcher, LlmClient};
use crate::investigator::Investigator;
use crate::planner::Planner;

const INTENT_SYSTEM_PROMPT: &str = "Classify the user's chess request into {kind, mode, goal, summary, \
root_fen?, investigation_requests, selection_requests, username?, platform?}. kind is one of chat, \
game_select, game_review, investigation. mode is one of play, discuss, analyze.";

const JUSTIFY_SYSTEM_PROMPT: &str = "Using only the given facts, write a short justification paragraph. \
You may propose ui_commands from the closed set and worded principal-variation notes.";

const EXPLAIN_SYSTEM_PROMPT: &str = "Using the same facts and the justification, write the final explanation \
the user will read. Merge in any ui_commands from the justification step.";

struct ModeRouterPolicy {
    light_depth: u32,
    compare_enabled: bool,
    compare_depth: u32,
    deep_depth: u32,
    max_time_s: u64,
}

fn policy_for_mode(mode: Mode) -> ModeRouterPolicy {
    match mode {
        Mode::Play => ModeRouterPolicy { light_depth: 10, compare_enabled: false, compare_depth: 10, deep_depth: 14, max_time_s: 8 },
        Mode::Discuss => ModeRouterPolicy { light_depth: 12, compare_enabled: true, compare_depth: 14, deep_depth: 18, max_time_s: 12 },
        Mode::Analyze => ModeRouterPolicy { light_depth: 16, compare_enabled: true, compare_depth: 18, deep_depth: 22, max_time_s: 30 },
    }
}

pub struct Controller {
    llm: Arc<dyn LlmClient>,
    engine: Arc<dyn EngineClient>,
    cache: Arc<AnalysisCache>,
    game_fetcher: Option<Arc<dyn GameFetcher>>,
    config: CoreConfig,
    planner: Planner,
    executor: Executor,
}

impl Controller {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        engine: Arc<dyn EngineClient>,
        cache: Arc<AnalysisCache>,
        game_fetcher: Option<Arc<dyn GameFetcher>>,
        config: CoreConfig,
    ) -> Self {
        let planner = Planner::new(llm.clone(), engine.clone(), cache.clone(), config.planner.clone());
        let executor = Executor::new(engine.clone(), cache.clone(), config.clone());
        Self { llm, engine, cache, game_fetcher, config, planner, executor }
    }

    fn investigator(&self) -> Investigator {
        Investigator::new(self.engine.clone(), self.cache.clone(), self.config.clone())
    }

    pub async fn run_task(&self, session_id: &str, task_id: &str, user_text: &str, context: TaskContext) -> AnswerEnvelope {
        if let Some(fast) = router::fast_route(user_text, context.root_fen.as_deref()) {
            log::info!("task {task_id}: fast route hit");
            return fast;
        }

        let history = router::windowed_history(&context.chat_history, self.config.controller.chat_history_window, 2000);

        let mut intent = match self.classify_intent(session_id, user_text, &context, &history).await {
            Ok(intent) => intent,
            Err(e) => {
                log::warn!("task {task_id}: intent classification failed ({e}); falling back to chat");
                return self.chat_fallback(session_id, user_text, &history).await;
            }
        };

        router::coerce_intent(&mut intent);

        match intent.kind {
            IntentKind::Chat => self.chat_fallback(session_id, user_text, &history).await,
            IntentKind::GameSelect | IntentKind::GameReview => self.run_game_branch(session_id, &intent).await,
            IntentKind::Investigation => self.run_investigation(session_id, task_id, &intent, &context).await,
        }
    }

    async fn classify_intent(
        &self,
        session_id: &str,
        user_text: &str,
        context: &TaskContext,
        history: &[ChatTurn],
    ) -> ControllerResult<ClassifiedIntent> {
        let task_seed = serde_json::json!({
            "root_fen": context.root_fen,
            "history": history.iter().map(|t| (t.role.clone(), t.content.clone())).collect::<Vec<_>>(),
        })
        .to_string();
        let value = self
            .llm
            .complete_json(session_id, "intent_classification", INTENT_SYSTEM_PROMPT, &task_seed, user_text, "controller")
            .await?;
        serde_json::from_value(value).map_err(|e| ControllerError::MalformedIntent(e.to_string()))
    }

    async fn chat_fallback(&self, session_id: &str, user_text: &str, history: &[ChatTurn]) -> AnswerEnvelope {
        let prompt = history.iter().map(|t| format!("{}: {}", t.role, t.content)).collect::<Vec<_>>().join("\n");
        let explanation = self
            .llm
            .complete(session_id, "Chat naturally about chess.", &format!("{prompt}\nuser: {user_text}"), "controller")
            .await
            .unwrap_or_else(|e| format!("I couldn't reach the chat collaborator ({e})."));
        AnswerEnvelope {
            facts_card: FactsCard::default(),
            recommended_move: None,
            alternatives: Vec::new(),
            explanation,
            ui_commands: Vec::new(),
            confidence: None,
            stop_reason: "chat".to_string(),
            budgets: BTreeMap::new(),
            artifacts_used: Vec::new(),
        }
    }

    async fn run_game_branch(&self, session_id: &str, intent: &ClassifiedIntent) -> AnswerEnvelope {
        let Some(fetcher) = &self.game_fetcher else {
            return AnswerEnvelope {
                explanation: "No game history source is configured.".to_string(),
                stop_reason: "no_game_fetcher".to_string(),
                ..Default::default()
            };
        };
        let username = intent.username.clone().unwrap_or_default();
        let platform = intent.platform.clone().unwrap_or_default();
        let games = match fetcher.fetch_games(&username, &platform, 20, 6).await {
            Ok(games) => games,
            Err(e) => {
                return AnswerEnvelope {
                    explanation: format!("Couldn't fetch games: {e}"),
                    stop_reason: "game_fetch_failed".to_string(),
                    ..Default::default()
                };
            }
        };

        let summary = format!("Found {} games for {username} on {platform}.", games.len());
        let prose = self
            .llm
            .complete(session_id, "Summarize these games for the user in natural prose.", &summary, "controller")
            .await
            .unwrap_or(summary);

        let ui_commands = games
            .first()
            .map(|g| vec![UiCommand { command: UiCommandKind::NewTab, parameters: serde_json::json!({"pgn": g.pgn}) }])
            .unwrap_or_default();

        AnswerEnvelope {
            facts_card: FactsCard::default(),
            recommended_move: None,
            alternatives: Vec::new(),
            explanation: prose,
            ui_commands,
            confidence: None,
            stop_reason: if intent.kind == IntentKind::GameSelect { "game_select".to_string() } else { "game_review".to_string() },
            budgets: BTreeMap::new(),
            artifacts_used: vec!["platform_game_fetcher".to_string()],
        }
    }

    async fn run_investigation(
        &self,
        session_id: &str,
        task_id: &str,
        intent: &ClassifiedIntent,
        context: &TaskContext,
    ) -> AnswerEnvelope {
        let Some(fen) = intent.root_fen.clone().or_else(|| context.root_fen.clone()) else {
            return AnswerEnvelope {
                explanation: "I need a position to investigate.".to_string(),
                stop_reason: "missing_fen".to_string(),
                ..Default::default()
            };
        };

        let policy = policy_for_mode(intent.mode);
        let mut budget = budget::Budget::new(policy.max_time_s);
        let mut artifacts_used = Vec::new();

        let baseline = if matches!(intent.mode, Mode::Discuss | Mode::Analyze) {
            match &context.prefetched_baseline {
                Some(b) => Some(b.clone()),
                None => {
                    let scanner = BaselineScanner::new(self.engine.clone(), self.cache.clone(), self.config.engine.clone());
                    scanner.scan(&fen).await.ok()
                }
            }
        } else {
            None
        };
        if baseline.is_some() {
            artifacts_used.push("baseline_d2_d16_scan".to_string());
            budget.reset(policy.max_time_s);
        }
        if budget.exceeded() {
            return self.budget_exceeded_envelope(&fen, baseline.as_ref());
        }

        let investigator = self.investigator();
        let light_result = match investigator.investigate_position(&fen, Some(policy.light_depth), None).await {
            Ok(r) => r,
            Err(e) => {
                return AnswerEnvelope {
                    explanation: format!("Investigation failed: {e}"),
                    stop_reason: "investigation_error".to_string(),
                    ..Default::default()
                };
            }
        };
        if budget.exceeded() {
            return self.budget_exceeded_envelope(&fen, baseline.as_ref());
        }

        // Optional move-compare judge: re-score the top two D2 candidates at
        // a deeper, equal depth so the chosen move isn't an artifact of
        // asymmetric search effort between them.
        let mut chosen_move = baseline.as_ref().and_then(|b| b.best_move_d16.clone()).or_else(|| light_result.best_move.clone());
        if policy.compare_enabled {
            if let Some(b) = &baseline {
                if let (Some(first), Some(second)) = (b.top_moves_d2.first(), b.top_moves_d2.get(1)) {
                    if let Ok(compared) = self.compare_moves(&fen, first, second, policy.compare_depth).await {
                        chosen_move = Some(compared);
                        artifacts_used.push("move_compare_judge".to_string());
                    }
                }
            }
        }
        if budget.exceeded() {
            return self.budget_exceeded_envelope(&fen, baseline.as_ref());
        }

        let correlation = baseline.as_ref().map(|b| b.d2_d16_rank_correlation).unwrap_or(0.0);
        let mut confidence = ((correlation + 1.0) / 2.0).clamp(0.0, 1.0);
        let mut deep_result = None;
        let mut stop_reason = "self_check_passed".to_string();

        if confidence < self.config.controller.confidence_escalation_threshold && !budget.exceeded() {
            match investigator.investigate_position(&fen, Some(policy.deep_depth), None).await {
                Ok(deep) => {
                    chosen_move = deep.best_move.clone().or(chosen_move);
                    confidence = (confidence + 0.2).min(0.95);
                    artifacts_used.push("deep_escalation".to_string());
                    deep_result = Some(deep);
                    stop_reason = "escalated_then_passed".to_string();
                }
                Err(e) => log::warn!("task {task_id}: deep escalation failed: {e}"),
            }
        }
        if budget.exceeded() {
            stop_reason = "budget_time_exceeded".to_string();
        }

        let mut confidence_signals = BTreeMap::new();
        confidence_signals.insert("d2_d16_rank_correlation".to_string(), correlation);
        if let Some(score) = light_result.complexity_score {
            confidence_signals.insert("complexity_score".to_string(), score);
        }

        let mut facts_card = facts::build_facts_card(&fen, baseline.as_ref(), &light_result, deep_result.as_ref(), confidence_signals);
        facts_card.recommended_move = chosen_move.clone();

        if let Ok(memory) = self.llm.get_task_memory(task_id, "investigation").await {
            if let Some(memory) = memory {
                facts_card.evidence_examples.push(format!("prior_memory:{memory}"));
            }
        }

        let (explanation, raw_ui_commands) = self.write_answer(session_id, &facts_card, &stop_reason).await;
        let ui_commands = parse_ui_commands(raw_ui_commands);
        let ui_commands = ui::validate(ui_commands, intent.mode, context.allow_ui_mutations);

        let candidate_set = baseline.as_ref().map(|b| b.top_moves_d2.clone()).unwrap_or_else(|| light_result.candidate_moves.clone());
        facts::verify_recommendation(&mut facts_card, &candidate_set, &mut stop_reason);

        let mut budgets = BTreeMap::new();
        budgets.insert("elapsed_s".to_string(), budget.elapsed_s());
        budgets.insert("max_time_s".to_string(), policy.max_time_s as f64);

        let envelope = AnswerEnvelope {
            recommended_move: facts_card.recommended_move.clone(),
            alternatives: light_result.candidate_moves.clone(),
            explanation,
            ui_commands,
            confidence: Some(confidence),
            stop_reason,
            budgets,
            artifacts_used,
            facts_card,
        };

        let memory_summary = serde_json::json!({
            "fen": fen,
            "recommended_move": envelope.recommended_move,
            "stop_reason": envelope.stop_reason,
        });
        let _ = self.llm.set_task_memory(task_id, "investigation", memory_summary).await;

        envelope
    }

    async fn compare_moves(&self, fen: &str, first: &str, second: &str, depth: u32) -> Result<String, crate::engine::EngineError> {
        let fen_a = crate::rules::play_san(fen, first).map_err(crate::engine::EngineError::Rules)?;
        let fen_b = crate::rules::play_san(fen, second).map_err(crate::engine::EngineError::Rules)?;
        let eval_a = -self.engine.analyze(&fen_a, depth, 1, Duration::from_secs(10)).await?.eval_cp;
        let eval_b = -self.engine.analyze(&fen_b, depth, 1, Duration::from_secs(10)).await?.eval_cp;
        Ok(if eval_a >= eval_b { first.to_string() } else { second.to_string() })
    }

    async fn write_answer(&self, session_id: &str, facts_card: &FactsCard, stop_reason: &str) -> (String, Vec<Value>) {
        let task_seed = serde_json::to_string(facts_card).unwrap_or_default();
        let justification = self
            .llm
            .complete_json(session_id, "justification", JUSTIFY_SYSTEM_PROMPT, &task_seed, stop_reason, "controller")
            .await
            .unwrap_or(Value::Null);
        let explanation_value = self
            .llm
            .complete_json(session_id, "explanation", EXPLAIN_SYSTEM_PROMPT, &task_seed, stop_reason, "controller")
            .await
            .unwrap_or(Value::Null);

        let explanation = explanation_value
            .get("explanation")
            .and_then(Value::as_str)
            .or_else(|| justification.get("explanation").and_then(Value::as_str))
            .unwrap_or("No explanation could be generated.")
            .to_string();

        let mut commands = justification.get("ui_commands").and_then(Value::as_array).cloned().unwrap_or_default();
        if let Some(more) = explanation_value.get("ui_commands").and_then(Value::as_array) {
            commands.extend(more.iter().cloned());
        }
        (explanation, commands)
    }

    fn budget_exceeded_envelope(&self, fen: &str, baseline: Option<&crate::engine::BaselineRecord>) -> AnswerEnvelope {
        let mut budgets = BTreeMap::new();
        budgets.insert("elapsed_s".to_string(), 0.0);
        AnswerEnvelope {
            facts_card: FactsCard { fen: Some(fen.to_string()), recommended_move: baseline.and_then(|b| b.best_move_d16.clone()), ..Default::default() },
            recommended_move: baseline.and_then(|b| b.best_move_d16.clone()),
            alternatives: Vec::new(),
            explanation: "The time budget ran out before a full investigation completed.".to_string(),
            ui_commands: Vec::new(),
            confidence: None,
            stop_reason: "budget_time_exceeded".to_string(),
            budgets,
            artifacts_used: Vec::new(),
        }
    }
}

fn parse_ui_commands(raw: Vec<Value>) -> Vec<UiCommand> {
    raw.into_iter().filter_map(|v| serde_json::from_value::<UiCommand>(v).ok()).collect()
}

impl Default for AnswerEnvelope {
    fn default() -> Self {
        Self {
            facts_card: FactsCard::default(),
            recommended_move: None,
            alternatives: Vec::new(),
            explanation: String::new(),
            ui_commands: Vec::new(),
            confidence: None,
            stop_reason: "unknown".to_string(),
            budgets: BTreeMap::new(),
            artifacts_used: Vec::new(),
        }
    }
}
