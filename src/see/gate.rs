//! The SEE gate: the core soundness mechanism behind every tactic claim.
//! Given a candidate move, this resolves the forced reply sequence and
//! reports whether the mover actually comes out ahead.

use shakmaty::{Chess, Color, Move, Position, Role, Square};

use super::types::{ThreatLevel, Verdict};
use crate::config::SeeConfig;
use crate::rules;

/// Material for `color` (not side-to-move-relative), in centipawns.
pub fn material_for(pos: &Chess, color: Color) -> i32 {
    let board = pos.board();
    let mut total = 0i32;
    for role in [Role::Pawn, Role::Knight, Role::Bishop, Role::Rook, Role::Queen] {
        let mine = board.by_piece(shakmaty::Piece { color, role }).into_iter().count() as i32;
        let theirs =
            board.by_piece(shakmaty::Piece { color: !color, role }).into_iter().count() as i32;
        total += (mine - theirs) * rules::piece_value(role);
    }
    total
}

/// Danger heuristic used to pick an opponent's "best" reply: captures of
/// the just-moved piece weigh heaviest, then
/// MVV-LVA for other captures, then zwischenzug checks/mates, then
/// fork-like multi-attack potential.
pub fn reply_danger_score(pos: &Chess, mv: &Move, just_moved_to: Square) -> i64 {
    let mut score = 0i64;

    if let Some(captured) = mv.capture() {
        if mv.to() == just_moved_to {
            score += 1_000_000 + rules::piece_value(captured) as i64;
        } else {
            let attacker_value = rules::piece_value(mv.role());
            score += 1_000 + rules::piece_value(captured) as i64 * 10 - attacker_value as i64;
        }
    }

    let mut after = pos.clone();
    after.play_unchecked(mv);
    if after.is_checkmate() {
        score += 5_000_000;
    } else if after.is_check() {
        score += 2_000;
    }

    let dest = mv.to();
    if let Some(piece) = after.board().piece_at(dest) {
        let attacked = shakmaty::attacks::attacks(dest, piece, after.board().occupied());
        let count = attacked
            .into_iter()
            .filter(|&sq| after.board().piece_at(sq).is_some_and(|p| p.color != piece.color))
            .count();
        if count >= 2 {
            score += 100 * count as i64;
        }
    }

    score
}

/// Whether the side to move at `pos` is in a "forced" reply situation: in
/// check, OR exactly one capture exists with at most three legal moves
/// total, OR some capture wins material outright.
fn is_forced(pos: &Chess) -> Option<Move> {
    let legal = pos.legal_moves();
    if legal.is_empty() {
        return None;
    }
    let captures: Vec<&Move> = legal.iter().filter(|m| m.capture().is_some()).collect();

    if let Some(winning_capture) = captures
        .iter()
        .find(|m| rules::piece_value(m.capture().unwrap()) as i32 > rules::piece_value(m.role()) as i32)
    {
        return Some((*winning_capture).clone());
    }
    if pos.is_check() {
        return legal.iter().max_by_key(|m| reply_danger_score(pos, m, m.to())).cloned();
    }
    if captures.len() == 1 && legal.len() <= 3 {
        return Some(captures[0].clone());
    }
    None
}

/// Resolve a forced capture-chain from `pos` up to `max_plies`, stopping as
/// soon as a position is no longer "forced".
fn resolve_forced_chain(mut pos: Chess, max_plies: u32) -> (Chess, Vec<String>) {
    let mut chain = Vec::new();
    for _ in 0..max_plies {
        if pos.is_checkmate() || pos.is_stalemate() {
            break;
        }
        let Some(mv) = is_forced(&pos) else { break };
        let san = rules::move_to_san(&pos, &mv);
        pos.play_unchecked(&mv);
        chain.push(san);
    }
    (pos, chain)
}

/// Apply the SEE gate to a single candidate move, from `color`'s point of
/// view, at `root_pos` (where it is `color`'s turn to move).
pub fn classify_candidate(root_pos: &Chess, mv: &Move, color: Color, config: &SeeConfig) -> Verdict {
    let material_before = material_for(root_pos, color);
    let san = rules::move_to_san(root_pos, mv);
    let just_moved_to = mv.to();

    let mut after = root_pos.clone();
    after.play_unchecked(mv);

    if after.is_checkmate() {
        return Verdict {
            net_material_change: material_for(&after, color) - material_before,
            threat_level: ThreatLevel::Winning,
            is_valid_tactic: true,
            forced_mate: true,
            chain_san: vec![san],
            refuted: None,
            refutation_line: Vec::new(),
        };
    }

    let opponent_moves = after.legal_moves();
    if opponent_moves.is_empty() {
        // Stalemate: the position is whatever it is, no further forcing play.
        let net = material_for(&after, color) - material_before;
        return verdict_from_net(net, false, vec![san]);
    }

    let best_reply = opponent_moves
        .iter()
        .max_by_key(|m| reply_danger_score(&after, m, just_moved_to))
        .cloned()
        .unwrap();
    let reply_san = rules::move_to_san(&after, &best_reply);
    let mut after_reply = after.clone();
    after_reply.play_unchecked(&best_reply);

    let (final_pos, mut rest) = resolve_forced_chain(after_reply, config.max_chain_plies);
    let mut chain_san = vec![san, reply_san];
    chain_san.append(&mut rest);

    let net = material_for(&final_pos, color) - material_before;
    let mate_forcing = final_pos.is_checkmate() && final_pos.turn() != color;
    verdict_from_net(net, mate_forcing, chain_san)
}

fn verdict_from_net(net: i32, mate_forcing: bool, chain_san: Vec<String>) -> Verdict {
    let threat_level = if net > 0 || (net == 0 && mate_forcing) {
        ThreatLevel::Winning
    } else if net == 0 {
        ThreatLevel::EqualTrade
    } else {
        ThreatLevel::LosesMaterial
    };
    Verdict {
        net_material_change: net,
        threat_level,
        is_valid_tactic: matches!(threat_level, ThreatLevel::Winning),
        forced_mate: mate_forcing,
        chain_san,
        refuted: None,
        refutation_line: Vec::new(),
    }
}

/// SEE refutation: a capture-only minimax confined to the destination
/// square, up to `refutation_plies`. Every fork is subjected to
/// this regardless of what the general gate said, because a fork can look
/// materially fine at the first reply and still lose the piece on a deeper
/// recapture.
pub fn fork_refutation(root_pos: &Chess, mv: &Move, color: Color, config: &SeeConfig) -> (bool, Vec<String>) {
    let material_before = material_for(root_pos, color);
    let dest = mv.to();
    let san = rules::move_to_san(root_pos, mv);
    let mut pos = root_pos.clone();
    pos.play_unchecked(mv);

    let mut line = vec![san];
    for _ in 0..config.refutation_plies {
        let captures_on_dest: Vec<Move> =
            pos.legal_moves().into_iter().filter(|m| m.to() == dest && m.capture().is_some()).collect();
        let Some(best) = captures_on_dest.iter().min_by_key(|m| rules::piece_value(m.role())).cloned()
        else {
            break;
        };
        let s = rules::move_to_san(&pos, &best);
        pos.play_unchecked(&best);
        line.push(s);
    }

    let net = material_for(&pos, color) - material_before;
    (net < 0, line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::position_from_fen;

    #[test]
    fn winning_capture_has_positive_net() {
        // White Qxe5 wins a free pawn, nothing can recapture.
        let pos = position_from_fen("4k3/8/8/4p3/8/8/8/4KQ2 w - - 0 1").unwrap();
        let mv = rules::resolve_san("4k3/8/8/4p3/8/8/8/4KQ2 w - - 0 1", "Qxe5").unwrap();
        let verdict = classify_candidate(&pos, &mv, Color::White, &SeeConfig::default());
        assert!(verdict.net_material_change > 0);
        assert!(verdict.is_valid_tactic);
    }

    #[test]
    fn unsound_sacrifice_is_rejected() {
        // Queen sac onto a defended pawn, nothing gained.
        let fen = "4k3/4p3/8/8/8/8/8/4KQ2 w - - 0 1";
        let pos = position_from_fen(fen).unwrap();
        let mv = rules::resolve_san(fen, "Qxe7+").unwrap();
        let verdict = classify_candidate(&pos, &mv, Color::White, &SeeConfig::default());
        // King recaptures the queen for a pawn: clearly losing.
        assert!(verdict.net_material_change < 0);
        assert!(!verdict.is_valid_tactic);
    }
}
