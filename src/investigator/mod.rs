//! The Investigator: four primary operations that turn a FEN (and, for
//! moves, a SAN) into a grounded [`InvestigationResult`]. Every
//! investigation holds its own `shakmaty::Chess` scratch position — a
//! single `Investigator` is not safe to share across concurrent tasks; the
//! executor constructs one per batched parallel investigation.

pub mod game;
pub mod position;
pub mod target;
pub mod types;

pub use types::{
    CriticalMoment, Goal, GoalSearchResult, GoalStatus, InvestigationResult, InvestigatorError,
    InvestigatorResult, MoveClassification,
};

use std::sync::Arc;

use shakmaty::{Color, Position};

use crate::config::{CoreConfig, SearchPolicy};
use crate::engine::{AnalysisCache, BaselineScanner, EngineClient};
use crate::rules;
use crate::see;
use crate::tags;

pub struct Investigator {
    client: Arc<dyn EngineClient>,
    cache: Arc<AnalysisCache>,
    config: CoreConfig,
}

impl Investigator {
    pub fn new(client: Arc<dyn EngineClient>, cache: Arc<AnalysisCache>, config: CoreConfig) -> Self {
        Self { client, cache, config }
    }

    fn scanner(&self) -> BaselineScanner {
        BaselineScanner::new(self.client.clone(), self.cache.clone(), self.config.engine.clone())
    }

    /// `investigate_position(fen, depth, focus) -> InvestigationResult`.
    /// `depth` overrides the D16 depth for this call only; `focus` narrows
    /// `themes_identified` to tag names containing the substring, when
    /// given.
    pub async fn investigate_position(
        &self,
        fen: &str,
        depth: Option<u32>,
        focus: Option<&str>,
    ) -> InvestigatorResult<InvestigationResult> {
        position::investigate_position(self, fen, depth, focus).await
    }

    /// `investigate_move(...) -> InvestigationResult`.
    #[allow(clippy::too_many_arguments)]
    pub async fn investigate_move(
        &self,
        fen: &str,
        move_san: &str,
        depth_16: Option<u32>,
        depth_2: Option<u32>,
        evidence_base_plies: Option<u32>,
        evidence_max_plies: Option<u32>,
        follow_pv: bool,
        focus: Option<&str>,
    ) -> InvestigatorResult<InvestigationResult> {
        position::investigate_move(
            self,
            fen,
            move_san,
            depth_16,
            depth_2,
            evidence_base_plies,
            evidence_max_plies,
            follow_pv,
            focus,
        )
        .await
    }

    /// `investigate_target(fen, goal, policy) -> InvestigationResult`.
    pub async fn investigate_target(
        &self,
        fen: &str,
        goal: &crate::investigator::types::Goal,
        policy: &SearchPolicy,
    ) -> InvestigatorResult<InvestigationResult> {
        target::investigate_target(self, fen, goal, policy).await
    }

    /// `investigate_game(pgn, focus) -> InvestigationResult`.
    pub async fn investigate_game(
        &self,
        pgn_moves_san: &[String],
        start_fen: &str,
        focus: Option<&str>,
    ) -> InvestigatorResult<InvestigationResult> {
        game::investigate_game(self, pgn_moves_san, start_fen, focus).await
    }
}

/// Top-K tag names, biased toward tactical and king-safety tags: a
/// count-based ranking consistent with downstream consumers' expectations.
pub fn themes_identified(fen: &str, focus: Option<&str>, top_k: usize) -> Vec<String> {
    let Ok(all_tags) = tags::detect_all_tags(fen) else { return Vec::new() };
    let mut scored: Vec<(i32, String)> = all_tags
        .into_iter()
        .filter(|t| focus.is_none_or(|f| t.name.contains(f)))
        .map(|t| {
            let mut weight = 1;
            if t.name.contains("threat") || t.name.contains("tactic") {
                weight += 3;
            }
            if t.name.contains("king") {
                weight += 2;
            }
            (weight, t.name)
        })
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    scored.dedup_by(|a, b| a.1 == b.1);
    scored.into_iter().take(top_k).map(|(_, name)| name).collect()
}

/// Branching factor x tactical density.
pub fn complexity_score(fen: &str, tactics: &see::ScanResult) -> f64 {
    let Ok(pos) = rules::position_from_fen(fen) else { return 0.0 };
    let branching_factor = pos.legal_moves().len() as f64;
    let tactical_count =
        (tactics.open_tactics.len() + tactics.open_captures.len() + tactics.checkmates.len()) as f64;
    let density = if branching_factor > 0.0 { tactical_count / branching_factor } else { 0.0 };
    branching_factor * density
}

/// Net tag deltas between two positions (gained in `after` not in `before`,
/// lost the reverse), compared by `(name, side)` identity so instance-level
/// tags diff as single instances, not reshaped aggregates.
pub fn tag_deltas(before: &str, after: &str) -> InvestigatorResult<(Vec<String>, Vec<String>)> {
    let before_tags = tags::detect_all_tags(before)?;
    let after_tags = tags::detect_all_tags(after)?;
    let before_keys: std::collections::HashSet<String> =
        before_tags.iter().map(tag_identity).collect();
    let after_keys: std::collections::HashSet<String> = after_tags.iter().map(tag_identity).collect();

    let mut gained: Vec<String> = after_keys.difference(&before_keys).cloned().collect();
    let mut lost: Vec<String> = before_keys.difference(&after_keys).cloned().collect();
    gained.sort();
    lost.sort();
    Ok((gained, lost))
}

fn tag_identity(tag: &tags::Tag) -> String {
    let pieces = tag.pieces.clone().unwrap_or_default().join(",");
    let squares = tag.squares.clone().unwrap_or_default().join(",");
    format!("{}|{:?}|{pieces}|{squares}", tag.name, tag.side)
}

pub(crate) fn side_to_move_color(fen: &str) -> InvestigatorResult<Color> {
    Ok(rules::side_to_move(fen)?)
}
