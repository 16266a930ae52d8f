//! Candidate-move enforcement: the primary source of candidate injection.
//! The executor itself never injects extra candidates unless this step is
//! explicitly disabled on the plan.

use std::sync::Arc;
use std::time::Duration;

use shakmaty::{Color, File, Position, Rank, Square};

use crate::config::PlannerConfig;
use crate::engine::{AnalysisCache, CacheKey, EngineClient};
use crate::planner::types::{ConnectedIdea, Intent};
use crate::rules;

use super::PlannerResult;

pub struct CandidateSet {
    pub moves: Vec<String>,
    pub engine_best: Option<String>,
}

pub async fn enforce_candidates(
    intent: &Intent,
    root_fen: &str,
    client: &Arc<dyn EngineClient>,
    cache: &Arc<AnalysisCache>,
    config: &PlannerConfig,
) -> PlannerResult<CandidateSet> {
    let named: Vec<String> =
        intent.investigation_requests.iter().filter_map(|r| r.move_san.clone()).collect();
    if !named.is_empty() {
        let legal = legality_filter(root_fen, dedupe(named));
        return Ok(CandidateSet { moves: legal, engine_best: None });
    }

    if intent.has_prefetched_baseline {
        return Ok(CandidateSet { moves: Vec::new(), engine_best: None });
    }

    let mut candidates = engine_candidates(root_fen, client, cache, config).await?;
    let engine_best = candidates.first().cloned();

    for req in &intent.investigation_requests {
        if let Some(piece_type) = &req.piece_type {
            for mv in piece_typed_moves(root_fen, piece_type, &intent.connected_ideas) {
                if !candidates.contains(&mv) {
                    candidates.push(mv);
                }
            }
        }
    }

    let mut candidates = legality_filter(root_fen, candidates);
    if candidates.len() > config.max_candidate_investigations {
        // Always preserve the engine-best move even after capping.
        if let Some(best) = &engine_best {
            if let Some(pos) = candidates.iter().position(|m| m == best) {
                candidates.swap(0, pos);
            }
        }
        candidates.truncate(config.max_candidate_investigations);
    }

    Ok(CandidateSet { moves: candidates, engine_best })
}

async fn engine_candidates(
    root_fen: &str,
    client: &Arc<dyn EngineClient>,
    cache: &Arc<AnalysisCache>,
    config: &PlannerConfig,
) -> PlannerResult<Vec<String>> {
    let normalized = rules::normalize_fen(root_fen)?;
    // Prefer any cached multi-PV analysis over a fresh probe.
    for depth in [config.engine_probe_depth, config.engine_probe_depth.saturating_sub(2)] {
        for multi_pv in [4usize, 3, 2, 1] {
            let key = CacheKey { normalized_fen: normalized.clone(), depth, multi_pv };
            if let Some(hit) = cache.get(&key) {
                if !hit.lines.is_empty() {
                    return Ok(dedupe(hit.lines.into_iter().map(|l| l.move_san).collect()));
                }
            }
        }
    }

    let result = client
        .analyze(root_fen, config.engine_probe_depth, 4, Duration::from_secs(8))
        .await
        .map_err(super::PlannerError::Engine)?;
    let key = CacheKey { normalized_fen: normalized, depth: config.engine_probe_depth, multi_pv: 4 };
    cache.insert(key, result.clone());
    Ok(dedupe(result.lines.into_iter().map(|l| l.move_san).collect()))
}

/// Resolve which instance(s) of `piece_type` on the side to move the user
/// meant, via `connected_ideas` labels of the form `<color>_<piecetype>_<square>`.
/// Returns every legal move of that role if no `connected_ideas` entity
/// names it (nothing to disambiguate), the moves of a single resolved
/// instance if exactly one entity matches, or nothing at all if more than
/// one instance matches — genuine ambiguity that the `needs_clarification`
/// entity (handled in `planner::mod`) is responsible for resolving instead
/// of the planner guessing.
fn piece_typed_moves(fen: &str, piece_type: &str, connected_ideas: &[ConnectedIdea]) -> Vec<String> {
    let role = match piece_type.to_lowercase().as_str() {
        "knight" => shakmaty::Role::Knight,
        "bishop" => shakmaty::Role::Bishop,
        "rook" => shakmaty::Role::Rook,
        "queen" => shakmaty::Role::Queen,
        "king" => shakmaty::Role::King,
        "pawn" => shakmaty::Role::Pawn,
        _ => return Vec::new(),
    };
    let Ok(pos) = rules::position_from_fen(fen) else { return Vec::new() };
    let side = pos.turn();

    let resolved = resolve_instances(connected_ideas, piece_type, side);
    if resolved.len() > 1 {
        return Vec::new();
    }

    pos.legal_moves()
        .iter()
        .filter(|mv| mv.role() == role)
        .filter(|mv| resolved.is_empty() || mv.from().is_some_and(|from| resolved.contains(&from)))
        .map(|mv| rules::move_to_san(&pos, mv))
        .collect()
}

/// Parse `connected_ideas` labels matching `piece_type` on `side`.
fn resolve_instances(connected_ideas: &[ConnectedIdea], piece_type: &str, side: Color) -> Vec<Square> {
    let side_str = match side {
        Color::White => "white",
        Color::Black => "black",
    };
    let piece_type = piece_type.to_lowercase();
    connected_ideas
        .iter()
        .filter_map(|idea| {
            let label = idea.label.to_lowercase();
            let mut parts = label.splitn(3, '_');
            let color = parts.next()?;
            let kind = parts.next()?;
            let square = parts.next()?;
            if color != side_str || kind != piece_type {
                return None;
            }
            parse_square(square)
        })
        .collect()
}

fn parse_square(s: &str) -> Option<Square> {
    let bytes = s.as_bytes();
    if bytes.len() != 2 {
        return None;
    }
    let file = (bytes[0].to_ascii_lowercase() as i32) - ('a' as i32);
    let rank = (bytes[1] as i32) - ('1' as i32);
    if !(0..8).contains(&file) || !(0..8).contains(&rank) {
        return None;
    }
    Some(Square::from_coords(File::new(file as u32), Rank::new(rank as u32)))
}

fn dedupe(moves: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    moves.into_iter().filter(|m| seen.insert(m.clone())).collect()
}

fn legality_filter(fen: &str, moves: Vec<String>) -> Vec<String> {
    moves.into_iter().filter(|m| rules::is_legal_san(fen, m)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mock::ScriptedEngineClient;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    fn intent(requests: Vec<super::super::types::InvestigationRequest>) -> Intent {
        Intent {
            goal: "test".into(),
            summary: String::new(),
            investigation_requests: requests,
            root_fen: Some(START.into()),
            connected_ideas: Vec::new(),
            needs_clarification: Vec::new(),
            has_prefetched_baseline: false,
        }
    }

    #[tokio::test]
    async fn named_move_short_circuits_engine_probe() {
        let client: Arc<dyn EngineClient> = Arc::new(ScriptedEngineClient::new());
        let cache = Arc::new(AnalysisCache::new(16));
        let intent = intent(vec![super::super::types::InvestigationRequest {
            purpose: "user named this".into(),
            move_san: Some("e4".into()),
            piece_type: None,
        }]);
        let set = enforce_candidates(&intent, START, &client, &cache, &PlannerConfig::default())
            .await
            .unwrap();
        assert_eq!(set.moves, vec!["e4".to_string()]);
    }

    #[tokio::test]
    async fn prefetched_baseline_skips_injection() {
        let client: Arc<dyn EngineClient> = Arc::new(ScriptedEngineClient::new());
        let cache = Arc::new(AnalysisCache::new(16));
        let mut intent = intent(Vec::new());
        intent.has_prefetched_baseline = true;
        let set = enforce_candidates(&intent, START, &client, &cache, &PlannerConfig::default())
            .await
            .unwrap();
        assert!(set.moves.is_empty());
    }

    #[test]
    fn illegal_named_move_is_dropped() {
        let filtered = legality_filter(START, vec!["e5".to_string(), "e4".to_string()]);
        assert_eq!(filtered, vec!["e4".to_string()]);
    }

    #[test]
    fn piece_typed_moves_with_no_connected_ideas_returns_every_instance() {
        let moves = piece_typed_moves(START, "knight", &[]);
        assert!(moves.iter().any(|m| m == "Na3"));
        assert!(moves.iter().any(|m| m == "Nc3"));
        assert!(moves.iter().any(|m| m == "Nf3"));
        assert!(moves.iter().any(|m| m == "Nh3"));
    }

    #[test]
    fn piece_typed_moves_resolves_single_connected_idea_to_one_instance() {
        let connected = vec![ConnectedIdea { label: "white_knight_b1".to_string() }];
        let moves = piece_typed_moves(START, "knight", &connected);
        assert_eq!(moves.len(), 2);
        assert!(moves.contains(&"Na3".to_string()));
        assert!(moves.contains(&"Nc3".to_string()));
        assert!(!moves.contains(&"Nf3".to_string()));
        assert!(!moves.contains(&"Nh3".to_string()));
    }

    #[test]
    fn piece_typed_moves_defers_to_clarification_when_still_ambiguous() {
        let connected = vec![
            ConnectedIdea { label: "white_knight_b1".to_string() },
            ConnectedIdea { label: "white_knight_g1".to_string() },
        ];
        let moves = piece_typed_moves(START, "knight", &connected);
        assert!(moves.is_empty());
    }
}
