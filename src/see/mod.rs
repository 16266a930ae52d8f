//! The "two-move win engine": 1-2 ply tactic classification gated by Static
//! Exchange Evaluation. Structural candidates come from
//! [`crate::threats`]; this module is what decides whether any of them is
//! actually sound.

pub mod gate;
pub mod types;

pub use gate::{classify_candidate, fork_refutation, material_for, reply_danger_score};
pub use types::*;

use shakmaty::{Chess, Color, Position, Rank, Role};

use crate::config::SeeConfig;
use crate::rules;
use crate::threats;

/// Run the full scan for `color` at `pos`. Requires `pos.turn() == color` —
/// for "has the opponent got a winning reply" queries, call this with
/// `color` equal to the side actually on move and read `has_winning_tactic`
/// back as the *other* side's `has_losing_tactic`.
pub fn scan(pos: &Chess, color: Color, config: &SeeConfig) -> ScanResult {
    let mut result = ScanResult::default();
    if pos.turn() != color {
        return result;
    }

    scan_open_tactics(pos, color, config, &mut result);
    scan_blocked_tactics(pos, color, config, &mut result);
    scan_captures(pos, color, config, &mut result);
    scan_promotions(pos, color, &mut result);
    scan_checkmates(pos, color, &mut result);
    result.mate_patterns = detect_mate_patterns(pos, color);

    result.has_immediate_threat = result.has_winning_tactic || result.has_mate_threat;
    result.has_promotion_threat =
        result.promotions.iter().any(|p| !matches!(p.kind, PromotionKind::Blocked));
    result
}

/// Convenience query: does the opponent (to move next) have a winning
/// reply against `my_color`? Call with `my_color` on the opponent's turn.
pub fn has_losing_tactic(pos: &Chess, my_color: Color, config: &SeeConfig) -> bool {
    if pos.turn() == my_color {
        return false;
    }
    scan(pos, pos.turn(), config).has_winning_tactic
}

fn tactic_kind_for_tag(name: &str, move_san: &str) -> Option<TacticKind> {
    if name.starts_with("tag.threat.fork") {
        // Knight forks are the textbook "fork"; the same multi-attack
        // pattern from any other piece is a double attack.
        Some(if move_san.starts_with('N') { TacticKind::Fork } else { TacticKind::DoubleAttack })
    } else if name.starts_with("tag.threat.skewer") {
        Some(TacticKind::Skewer)
    } else if name.starts_with("tag.threat.pin") {
        Some(TacticKind::PinWin)
    } else if name.starts_with("tag.threat.discovered_attack") {
        Some(TacticKind::DiscoveredAttack)
    } else if name.starts_with("tag.threat.deflection") {
        Some(TacticKind::Deflection)
    } else if name.starts_with("tag.threat.overloading") {
        Some(TacticKind::Overloading)
    } else {
        None
    }
}

/// Threats that describe a structural weakness rather than a single move
/// (static pins, overloaded defenders) carry no `move_san`; the actual
/// tactic is realized by capturing one of the threat's targets outright.
fn exploit_move_for(pos: &Chess, threat: &threats::ThreatTag) -> Option<String> {
    if !threat.move_san.is_empty() {
        return Some(threat.move_san.clone());
    }
    threat.targets.iter().find_map(|target| {
        pos.legal_moves()
            .iter()
            .find(|m| m.capture().is_some() && m.to().to_string() == *target)
            .map(|m| rules::move_to_san(pos, m))
    })
}

fn scan_open_tactics(pos: &Chess, color: Color, config: &SeeConfig, result: &mut ScanResult) {
    let fen = rules::fen_from_position(pos);
    for threat in threats::detect_all_threats(pos, color) {
        let Some(kind) = tactic_kind_for_tag(&threat.tag.name, &threat.move_san) else { continue };
        let Some(move_san) = exploit_move_for(pos, &threat) else { continue };
        let Ok(mv) = rules::resolve_san(&fen, &move_san) else {
            result.rejected.push((move_san, "could not re-resolve threat move".into()));
            continue;
        };

        let verdict = gate::classify_candidate(pos, &mv, color, config);
        let (refuted, refutation_line) = if matches!(kind, TacticKind::Fork | TacticKind::DoubleAttack) {
            let (r, line) = gate::fork_refutation(pos, &mv, color, config);
            (Some(r), line)
        } else {
            (None, Vec::new())
        };

        let is_winning = verdict.is_valid_tactic && refuted != Some(true);
        if is_winning {
            result.has_winning_tactic = true;
        }
        result.open_tactics.push(OpenTactic {
            kind,
            move_san,
            targets: threat.targets,
            threat_level: if is_winning { ThreatLevel::Winning } else { verdict.threat_level },
            net_material_change: verdict.net_material_change,
            refuted,
            refutation_line,
        });
    }
}

/// Bounded search for tactics that require one clearing move first: try a
/// clearing move, let the opponent answer with their highest-danger reply,
/// then check whether a winning tactic newly exists. Capped to the first
/// `CLEARING_MOVE_CAP` legal moves to keep this within the same ply budget
/// as the rest of the scanner.
const CLEARING_MOVE_CAP: usize = 20;

fn scan_blocked_tactics(pos: &Chess, color: Color, config: &SeeConfig, result: &mut ScanResult) {
    let open_moves: std::collections::HashSet<String> =
        result.open_tactics.iter().map(|t| t.move_san.clone()).collect();

    for clearing_mv in pos.legal_moves().iter().take(CLEARING_MOVE_CAP) {
        let clearing_san = rules::move_to_san(pos, clearing_mv);
        let mut after_clear = pos.clone();
        after_clear.play_unchecked(clearing_mv);
        if after_clear.legal_moves().is_empty() {
            continue;
        }
        let reply = after_clear
            .legal_moves()
            .iter()
            .max_by_key(|m| gate::reply_danger_score(&after_clear, m, m.to()))
            .cloned()
            .unwrap();
        let mut after_reply = after_clear.clone();
        after_reply.play_unchecked(&reply);
        if after_reply.turn() != color {
            continue;
        }

        for threat in threats::detect_all_threats(&after_reply, color) {
            let Some(kind) = tactic_kind_for_tag(&threat.tag.name, &threat.move_san) else { continue };
            let Some(move_san) = exploit_move_for(&after_reply, &threat) else { continue };
            if open_moves.contains(&move_san) {
                continue;
            }
            let fen = rules::fen_from_position(&after_reply);
            let Ok(mv) = rules::resolve_san(&fen, &move_san) else { continue };
            let verdict = gate::classify_candidate(&after_reply, &mv, color, config);
            if !verdict.is_valid_tactic {
                continue;
            }
            result.blocked_tactics.push(BlockedTactic {
                kind,
                clearing_move_san: clearing_san.clone(),
                move_san,
                targets: threat.targets,
            });
        }
    }
}

fn scan_captures(pos: &Chess, color: Color, config: &SeeConfig, result: &mut ScanResult) {
    for mv in pos.legal_moves().iter().filter(|m| m.capture().is_some()) {
        let verdict = gate::classify_candidate(pos, mv, color, config);
        let san = rules::move_to_san(pos, mv);
        let outcome = if verdict.forced_mate {
            CaptureOutcome::MateForcing
        } else if verdict.is_valid_tactic {
            CaptureOutcome::Winning
        } else {
            CaptureOutcome::Potential
        };
        let tactic = CaptureTactic { move_san: san, net_material_change: verdict.net_material_change, outcome };
        match outcome {
            CaptureOutcome::Winning | CaptureOutcome::MateForcing => {
                result.has_winning_tactic = true;
                result.open_captures.push(tactic);
            }
            CaptureOutcome::Potential => result.closed_captures.push(tactic),
        }
    }
}

fn scan_promotions(pos: &Chess, color: Color, result: &mut ScanResult) {
    let mut pawns_with_immediate = std::collections::HashSet::new();
    for mv in pos.legal_moves().iter().filter(|m| m.promotion().is_some()) {
        if let Some(from) = mv.from() {
            pawns_with_immediate.insert(from);
        }
        result
            .promotions
            .push(PromotionTactic { move_san: rules::move_to_san(pos, mv), kind: PromotionKind::Immediate });
    }

    let promo_rank = if color == Color::White { Rank::Seventh } else { Rank::Second };
    let delta: i32 = if color == Color::White { 8 } else { -8 };
    for sq in pos.board().by_piece(shakmaty::Piece { color, role: Role::Pawn }) {
        if sq.rank() != promo_rank || pawns_with_immediate.contains(&sq) {
            continue;
        }
        let Some(forward) = sq.offset(delta) else { continue };
        let kind = if pos.board().piece_at(forward).is_some() {
            PromotionKind::Blocked
        } else {
            PromotionKind::Threat
        };
        result.promotions.push(PromotionTactic { move_san: format!("pawn@{sq}"), kind });
    }
}

fn scan_checkmates(pos: &Chess, color: Color, result: &mut ScanResult) {
    for mv in pos.legal_moves().iter() {
        let mut after = pos.clone();
        after.play_unchecked(mv);
        if after.is_checkmate() {
            result.checkmates.push(CheckmateTactic {
                move_san: rules::move_to_san(pos, mv),
                plies: 1,
                continuations: Vec::new(),
            });
            result.has_mate_threat = true;
        }
    }

    // Mate-in-2: every opponent defense must have a mating reply.
    for mv in pos.legal_moves().iter() {
        let mut after = pos.clone();
        after.play_unchecked(mv);
        if after.is_checkmate() || after.is_stalemate() {
            continue;
        }
        let opponent_replies = after.legal_moves();
        if opponent_replies.is_empty() {
            continue;
        }
        let mut continuations = Vec::new();
        let mut every_defense_mated = true;
        for reply in opponent_replies.iter() {
            let mut after_reply = after.clone();
            after_reply.play_unchecked(reply);
            let mating = after_reply.legal_moves().into_iter().find(|m2| {
                let mut after2 = after_reply.clone();
                after2.play_unchecked(m2);
                after2.is_checkmate()
            });
            match mating {
                Some(m2) => {
                    continuations
                        .push((rules::move_to_san(&after, reply), rules::move_to_san(&after_reply, &m2)));
                }
                None => {
                    every_defense_mated = false;
                    break;
                }
            }
        }
        if every_defense_mated && !continuations.is_empty() {
            result.checkmates.push(CheckmateTactic {
                move_san: rules::move_to_san(pos, mv),
                plies: 2,
                continuations,
            });
            result.has_mate_threat = true;
        }
    }
}

/// A minimal structural mate pattern: the opponent's king is on its home
/// back rank with all three forward flight squares occupied by its own
/// pawns (classic back-rank weakness).
fn detect_mate_patterns(pos: &Chess, color: Color) -> Vec<MatePattern> {
    let opp = !color;
    let mut patterns = Vec::new();
    let Some(king_sq) = pos.board().king_of(opp) else { return patterns };
    let home_rank = if opp == Color::White { Rank::First } else { Rank::Eighth };
    if king_sq.rank() != home_rank {
        return patterns;
    }
    let delta: i32 = if opp == Color::White { 8 } else { -8 };
    let flight_squares: Vec<_> = [-1i32, 0, 1]
        .into_iter()
        .filter_map(|df| king_sq.offset(delta + df).or_else(|| king_sq.offset(delta)))
        .collect();
    let all_blocked = !flight_squares.is_empty()
        && flight_squares
            .iter()
            .all(|sq| pos.board().piece_at(*sq).is_some_and(|p| p.color == opp && p.role == Role::Pawn));
    if all_blocked {
        patterns.push(MatePattern {
            name: "back_rank_weakness".to_string(),
            description: format!("{opp:?} king on {king_sq} has no flight squares off the back rank"),
        });
    }
    patterns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::position_from_fen;

    #[test]
    fn mate_in_one_is_flagged() {
        // Back-rank mate: Rd8# for white.
        let fen = "6k1/5ppp/8/8/8/8/8/R3K3 w - - 0 1";
        let pos = position_from_fen(fen).unwrap();
        let result = scan(&pos, Color::White, &SeeConfig::default());
        assert!(result.checkmates.iter().any(|c| c.plies == 1));
        assert!(result.has_mate_threat);
    }

    #[test]
    fn no_tactics_flagged_false_for_quiet_opening() {
        const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
        let pos = position_from_fen(START).unwrap();
        let result = scan(&pos, Color::White, &SeeConfig::default());
        assert!(!result.has_winning_tactic);
        assert!(!result.has_mate_threat);
    }

    #[test]
    fn winning_tactic_has_nonnegative_material_change() {
        let fen = "4k3/8/8/4p3/8/8/8/4KQ2 w - - 0 1";
        let pos = position_from_fen(fen).unwrap();
        let result = scan(&pos, Color::White, &SeeConfig::default());
        for tactic in &result.open_captures {
            if matches!(tactic.outcome, CaptureOutcome::Winning | CaptureOutcome::MateForcing) {
                assert!(tactic.net_material_change >= 0);
            }
        }
    }
}
