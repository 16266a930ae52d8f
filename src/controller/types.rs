//! Shared types for the task state machine: classified intent, UI command
//! surface, facts card, and the final answer envelope.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::engine::AnalysisLine;
use crate::planner::InvestigationRequest;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("llm error: {0}")]
    Llm(#[from] crate::external::LlmError),
    #[error("planner error: {0}")]
    Planner(#[from] crate::planner::PlannerError),
    #[error("executor error: {0}")]
    Executor(#[from] crate::executor::ExecutorError),
    #[error("engine error: {0}")]
    Engine(#[from] crate::engine::EngineError),
    #[error("rules error: {0}")]
    Rules(#[from] crate::rules::RulesError),
    #[error("game fetch error: {0}")]
    GameFetch(#[from] crate::external::GameFetchError),
    #[error("malformed intent: {0}")]
    MalformedIntent(String),
}

pub type ControllerResult<T> = Result<T, ControllerError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Play,
    Discuss,
    Analyze,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Chat,
    GameSelect,
    GameReview,
    Investigation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedIntent {
    pub kind: IntentKind,
    pub mode: Mode,
    pub goal: String,
    pub summary: String,
    #[serde(default)]
    pub root_fen: Option<String>,
    #[serde(default)]
    pub investigation_requests: Vec<InvestigationRequest>,
    #[serde(default)]
    pub selection_requests: Vec<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct TaskContext {
    pub root_fen: Option<String>,
    pub chat_history: Vec<ChatTurn>,
    pub prefetched_baseline: Option<crate::engine::BaselineRecord>,
    pub allow_ui_mutations: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiCommandKind {
    LoadPosition,
    NewTab,
    Navigate,
    Annotate,
    PushMove,
    SetFen,
    SetPgn,
    DeleteMove,
    DeleteVariation,
    PromoteVariation,
    SetAiGame,
}

impl UiCommandKind {
    /// Commands that change board/game state rather than just navigating the
    /// UI; gated behind `allow_ui_mutations` outside PLAY mode.
    pub fn is_mutating(self) -> bool {
        !matches!(self, UiCommandKind::LoadPosition | UiCommandKind::NewTab | UiCommandKind::Navigate)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiCommand {
    pub command: UiCommandKind,
    #[serde(default)]
    pub parameters: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FactsCard {
    pub fen: Option<String>,
    pub engine_top_k: Vec<AnalysisLine>,
    pub recommended_move: Option<String>,
    pub tag_sample: Vec<String>,
    pub confidence_signals: BTreeMap<String, f64>,
    pub deep_eval: Option<Value>,
    pub evidence_examples: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnswerEnvelope {
    pub facts_card: FactsCard,
    pub recommended_move: Option<String>,
    pub alternatives: Vec<String>,
    pub explanation: String,
    pub ui_commands: Vec<UiCommand>,
    pub confidence: Option<f64>,
    pub stop_reason: String,
    pub budgets: BTreeMap<String, f64>,
    pub artifacts_used: Vec<String>,
}
