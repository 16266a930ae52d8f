//! Command-line entry point: a REPL that drives the [`Controller`] against a
//! real UCI engine subprocess. No LLM vendor is wired in by default — see
//! [`HeuristicLlm`] below — so this binary is usable offline; point it at a
//! real `LlmClient` implementation to get natural-language justification and
//! explanation prose instead of the templated fallback.

use std::collections::HashMap;
use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use chess_insight_core::config::CoreConfig;
use chess_insight_core::controller::{ChatTurn, Controller, TaskContext};
use chess_insight_core::engine::{AnalysisCache, UciProcessClient};
use chess_insight_core::external::{GameFetchError, GameFetcher, GameRef, LlmClient, LlmError, LlmResult};

#[tokio::main]
async fn main() {
    env_logger::init();

    let mut args = env::args().skip(1);
    let engine_path = args.next().unwrap_or_else(|| "stockfish".to_string());
    let config_path = args.next();

    let config = match config_path {
        Some(path) => match std::fs::read_to_string(&path) {
            Ok(raw) => match CoreConfig::from_toml_str(&raw) {
                Ok(cfg) => cfg,
                Err(e) => {
                    eprintln!("failed to parse config at {path}: {e}");
                    std::process::exit(1);
                }
            },
            Err(e) => {
                eprintln!("failed to read config at {path}: {e}");
                std::process::exit(1);
            }
        },
        None => CoreConfig::default(),
    };

    let engine = Arc::new(UciProcessClient::new(PathBuf::from(engine_path)));
    let cache = Arc::new(AnalysisCache::new(config.engine.cache_capacity));
    let llm: Arc<dyn LlmClient> = Arc::new(HeuristicLlm::default());
    let game_fetcher: Option<Arc<dyn GameFetcher>> = Some(Arc::new(NoGameFetcher));
    let controller = Controller::new(llm, engine, cache, game_fetcher, config);

    println!("chess-insight ready. Paste a FEN on its own line to set the position, then ask questions. Ctrl-D to quit.");

    let stdin = io::stdin();
    let mut history: Vec<ChatTurn> = Vec::new();
    let mut root_fen: Option<String> = None;

    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if looks_like_fen(line) {
            root_fen = Some(line.to_string());
            println!("position set.");
            continue;
        }

        let context = TaskContext {
            root_fen: root_fen.clone(),
            chat_history: history.clone(),
            prefetched_baseline: None,
            allow_ui_mutations: false,
        };

        let envelope = controller.run_task("cli-session", "cli-task", line, context).await;
        history.push(ChatTurn { role: "user".to_string(), content: line.to_string() });
        history.push(ChatTurn { role: "assistant".to_string(), content: envelope.explanation.clone() });

        println!("\n{}", envelope.explanation);
        if let Some(mv) = &envelope.recommended_move {
            println!("recommended: {mv} (confidence {:.2})", envelope.confidence.unwrap_or(0.0));
        }
        println!("[stop_reason: {}]\n", envelope.stop_reason);
        io::stdout().flush().ok();
    }
}

fn looks_like_fen(line: &str) -> bool {
    line.split_whitespace().count() >= 4 && line.contains('/')
}

/// A deterministic, network-free stand-in for the real LLM collaborator,
/// which is a contract this crate consumes rather than ships. Intent
/// classification falls back to simple keyword/FEN-presence rules;
/// justification and explanation are templated from the facts card rather
/// than generated prose. Swap this for a real client in a deployment.
#[derive(Default)]
struct HeuristicLlm {
    memory: Mutex<HashMap<String, Value>>,
}

#[async_trait]
impl LlmClient for HeuristicLlm {
    async fn complete_json(
        &self,
        _session_id: &str,
        stage: &str,
        _system_prompt: &str,
        task_seed: &str,
        user_text: &str,
        _model: &str,
    ) -> LlmResult<Value> {
        match stage {
            "intent_classification" => {
                let seed: Value = serde_json::from_str(task_seed).unwrap_or(Value::Null);
                let root_fen = seed.get("root_fen").and_then(Value::as_str).map(str::to_string);
                let kind = if root_fen.is_some() { "investigation" } else { "chat" };
                Ok(json!({
                    "kind": kind,
                    "mode": "discuss",
                    "goal": user_text,
                    "summary": user_text,
                    "root_fen": root_fen,
                    "investigation_requests": [],
                    "selection_requests": [],
                }))
            }
            "justification" | "explanation" => {
                let facts: Value = serde_json::from_str(task_seed).unwrap_or(Value::Null);
                let recommended = facts.get("recommended_move").and_then(Value::as_str);
                let explanation = match recommended {
                    Some(mv) => format!("The grounded analysis recommends {mv}."),
                    None => "No grounded recommendation was available for this position.".to_string(),
                };
                Ok(json!({ "explanation": explanation, "ui_commands": [] }))
            }
            other => Err(LlmError::SchemaInvalid(format!("no local handler for stage {other}"))),
        }
    }

    async fn complete(&self, _session_id: &str, _system_prompt: &str, user_text: &str, _model: &str) -> LlmResult<String> {
        Ok(format!("I heard: \"{user_text}\". Paste a FEN to let me analyze a position."))
    }

    async fn get_task_memory(&self, task_id: &str, subsession: &str) -> LlmResult<Option<Value>> {
        let key = format!("{task_id}:{subsession}");
        Ok(self.memory.lock().unwrap().get(&key).cloned())
    }

    async fn set_task_memory(&self, task_id: &str, subsession: &str, memory: Value) -> LlmResult<()> {
        let key = format!("{task_id}:{subsession}");
        self.memory.lock().unwrap().insert(key, memory);
        Ok(())
    }
}

struct NoGameFetcher;

#[async_trait]
impl GameFetcher for NoGameFetcher {
    async fn fetch_games(
        &self,
        _username: &str,
        platform: &str,
        _max_games: usize,
        _months_back: u32,
    ) -> Result<Vec<GameRef>, GameFetchError> {
        Err(GameFetchError::NoLinkedAccount(platform.to_string()))
    }
}
