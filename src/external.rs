//! External collaborator contracts. Neither is implemented here — the LLM,
//! the platform game fetchers, and the real search engine
//! (`engine::EngineClient`) are out of scope for this crate; this module is
//! just the seam the controller/planner code against.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("schema-invalid output after repair attempt: {0}")]
    SchemaInvalid(String),
}

pub type LlmResult<T> = Result<T, LlmError>;

/// `complete_json`/`complete`: the LLM collaborator contract. `stage` selects
/// the schema the caller expects back (`intent_classification`, `plan`,
/// `justification`, `explanation`, `chat`); implementations validate
/// against that schema and retry once via a "repair" variant on failure.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete_json(
        &self,
        session_id: &str,
        stage: &str,
        system_prompt: &str,
        task_seed: &str,
        user_text: &str,
        model: &str,
    ) -> LlmResult<Value>;

    async fn complete(
        &self,
        session_id: &str,
        system_prompt: &str,
        user_text: &str,
        model: &str,
    ) -> LlmResult<String>;

    async fn get_task_memory(&self, task_id: &str, subsession: &str) -> LlmResult<Option<Value>>;

    async fn set_task_memory(&self, task_id: &str, subsession: &str, memory: Value) -> LlmResult<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRef {
    pub pgn: String,
    pub date: Option<NaiveDate>,
    pub white_rating: Option<u32>,
    pub black_rating: Option<u32>,
    pub result: String,
    pub opening_tokens: Vec<String>,
    pub time_control: String,
}

#[derive(Debug, Error)]
pub enum GameFetchError {
    #[error("no linked account for platform {0}")]
    NoLinkedAccount(String),
    #[error("fetch failed: {0}")]
    Request(String),
}

/// `fetch_games`: the platform game fetcher contract.
#[async_trait]
pub trait GameFetcher: Send + Sync {
    async fn fetch_games(
        &self,
        username: &str,
        platform: &str,
        max_games: usize,
        months_back: u32,
    ) -> Result<Vec<GameRef>, GameFetchError>;
}
