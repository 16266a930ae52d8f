//! Engine adapter: request/response wrapper around a UCI-compatible
//! analyzer, plus the dual-depth (D2/D16) scan primitive that grounds every
//! downstream claim. The real engine process is an external collaborator;
//! this module owns only the contract ([`EngineClient`]), a concrete
//! subprocess implementation, the shared cache, and the scan logic built on
//! top of the trait.

pub mod baseline;
pub mod cache;
pub mod client;
pub mod mock;
pub mod process;
pub mod types;

pub use baseline::{BaselineRecord, BaselineScanner, Evidence, MoveDelta};
pub use cache::AnalysisCache;
pub use client::EngineClient;
pub use process::UciProcessClient;
pub use types::{
    is_decisive, AnalysisLine, AnalysisResult, AnalyzeRequest, CacheKey, EngineError, EngineResult,
    DECISIVE_THRESHOLD_CP, MATE_SCORE_CP,
};
