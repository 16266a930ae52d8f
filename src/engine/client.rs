//! `EngineClient`: the contract the core calls against. The actual search
//! engine is an external collaborator; this trait is the seam.
//! [`UciProcessClient`] is one concrete implementation (a real UCI
//! subprocess), but any other transport can implement the same trait.

use std::time::Duration;

use async_trait::async_trait;

use super::types::{AnalysisResult, EngineResult};

#[async_trait]
pub trait EngineClient: Send + Sync {
    /// Analyze `fen` to `depth` plies, returning the top `multi_pv` lines.
    /// Must return within `timeout`; on a deadline miss, return the best
    /// partial record observed so far with `partial: true` rather than
    /// erroring.
    async fn analyze(
        &self,
        fen: &str,
        depth: u32,
        multi_pv: usize,
        timeout: Duration,
    ) -> EngineResult<AnalysisResult>;
}
