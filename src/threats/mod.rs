//! Tactical threat tags: forks, pins, skewers, and discovered attacks.
//!
//! Each detector here proposes *candidate* tactics from the current position
//! — it does not validate them. Validation (the SEE gate) lives in
//! [`crate::see`], which consumes these as raw material.

use shakmaty::{attacks as shak_attacks, Chess, Color, Piece, Position, Role, Square};

use crate::rules;
use crate::tags::{DetailValue, Side, Tag};

/// A candidate tactic: a move (possibly none, for a tactic already present on
/// the board, like a static pin) plus the enemy squares it threatens.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreatTag {
    pub tag: Tag,
    pub move_san: String,
    pub targets: Vec<String>,
}

pub fn detect_all_threats(pos: &Chess, color: Color) -> Vec<ThreatTag> {
    let mut threats = Vec::new();
    threats.extend(detect_fork_threats(pos, color));
    threats.extend(detect_skewer_threats(pos, color));
    threats.extend(detect_pin_threats(pos, color));
    threats.extend(detect_discovered_attack_threats(pos, color));
    threats.extend(detect_deflection_threats(pos, color));
    threats.extend(detect_overloading_threats(pos, color));
    threats
}

fn piece_attacks(pos: &Chess, sq: Square, piece: Piece) -> shakmaty::Bitboard {
    shak_attacks::attacks(sq, piece, pos.board().occupied())
}

/// A move creates a fork if the piece lands on a square from which it
/// attacks two or more enemy pieces (king included) at once.
pub fn detect_fork_threats(pos: &Chess, color: Color) -> Vec<ThreatTag> {
    let mut threats = Vec::new();
    if pos.turn() != color {
        return threats;
    }

    for mv in pos.legal_moves().iter() {
        let dest = mv.to();
        let mut after = pos.clone();
        let san = rules::move_to_san(pos, &mv);
        after.play_unchecked(&mv);

        let moved_role = after.board().piece_at(dest).map(|p| p.role).unwrap_or(mv.role());
        let attacked = piece_attacks(&after, dest, Piece { color, role: moved_role });

        let targets: Vec<Square> = attacked
            .into_iter()
            .filter(|&sq| after.board().piece_at(sq).map_or(false, |p| p.color != color))
            .collect();

        if targets.len() >= 2 {
            let target_names: Vec<String> = targets.iter().map(|s| s.to_string()).collect();
            let tag = Tag::new(format!("tag.threat.fork.{dest}"), Side::from(color))
                .with_squares(target_names.clone())
                .with_detail("move", DetailValue::Text(san.clone()));
            threats.push(ThreatTag { tag, move_san: san, targets: target_names });
        }
    }

    threats
}

/// A slider move skewers when it attacks an enemy piece with a less valuable
/// enemy piece directly behind it on the same ray; forcing the front piece
/// to move exposes the rear one.
pub fn detect_skewer_threats(pos: &Chess, color: Color) -> Vec<ThreatTag> {
    let mut threats = Vec::new();
    if pos.turn() != color {
        return threats;
    }

    for mv in pos.legal_moves().iter() {
        if !matches!(mv.role(), Role::Bishop | Role::Rook | Role::Queen) {
            continue;
        }
        let dest = mv.to();
        let mut after = pos.clone();
        let san = rules::move_to_san(pos, &mv);
        after.play_unchecked(&mv);

        let piece = Piece { color, role: mv.role() };
        for (df, dr) in ray_directions(mv.role()) {
            let ray = cast_ray(&after, dest, df, dr);
            let mut enemy_hits: Vec<Square> = Vec::new();
            for sq in ray {
                if after.board().piece_at(sq).is_some() {
                    enemy_hits.push(sq);
                    if enemy_hits.len() == 2 {
                        break;
                    }
                }
            }
            if enemy_hits.len() == 2 {
                let (front, back) = (enemy_hits[0], enemy_hits[1]);
                let front_piece = after.board().piece_at(front).unwrap();
                let back_piece = after.board().piece_at(back).unwrap();
                if front_piece.color == color || back_piece.color == color {
                    continue;
                }
                if rules::piece_value(front_piece.role) >= rules::piece_value(back_piece.role) {
                    let targets = vec![front.to_string(), back.to_string()];
                    let tag = Tag::new(format!("tag.threat.skewer.{dest}"), Side::from(color))
                        .with_squares(targets.clone())
                        .with_detail("move", DetailValue::Text(san.clone()));
                    threats.push(ThreatTag { tag, move_san: san.clone(), targets });
                }
            }
            let _ = piece;
        }
    }

    threats
}

/// Absolute pins already present on the board: one of `color`'s sliders has
/// an enemy piece on a ray to the enemy king with nothing else between.
pub fn detect_pin_threats(pos: &Chess, color: Color) -> Vec<ThreatTag> {
    let mut threats = Vec::new();
    let board = pos.board();
    let Some(king_sq) = board.king_of(!color) else { return threats };

    for role in [Role::Bishop, Role::Rook, Role::Queen] {
        for slider_sq in board.by_piece(Piece { color, role }).into_iter() {
            for (df, dr) in ray_directions(role) {
                let ray = cast_ray(pos, slider_sq, df, dr);
                let mut pinned: Option<Square> = None;
                let mut found_king = false;
                for sq in ray {
                    if let Some(p) = board.piece_at(sq) {
                        if pinned.is_none() {
                            if p.color == color {
                                break;
                            }
                            pinned = Some(sq);
                        } else if sq == king_sq && p.color != color {
                            found_king = true;
                            break;
                        } else {
                            break;
                        }
                    }
                }
                if found_king {
                    if let Some(pinned_sq) = pinned {
                        let targets = vec![pinned_sq.to_string()];
                        let tag = Tag::new(format!("tag.threat.pin.{pinned_sq}"), Side::from(color))
                            .with_squares(targets.clone())
                            .with_pieces(vec![format!("{}{slider_sq}", role_symbol(role))]);
                        threats.push(ThreatTag { tag, move_san: String::new(), targets });
                    }
                }
            }
        }
    }

    threats
}

/// Ported from the reference "two-move win engine"'s discovered-attack
/// check: find a slider that is blocked only by the square a candidate move
/// vacates, with an enemy (non-pawn) piece beyond it that was not already
/// attacked before the move.
pub fn detect_discovered_attack_threats(pos: &Chess, color: Color) -> Vec<ThreatTag> {
    let mut threats = Vec::new();
    if pos.turn() != color {
        return threats;
    }
    let board = pos.board();

    for mv in pos.legal_moves().iter() {
        let from_sq = mv.from();
        let Some(from_sq) = from_sq else { continue };

        let mut candidates: Vec<(Square, Square)> = Vec::new();
        for role in [Role::Rook, Role::Bishop, Role::Queen] {
            for slider_sq in board.by_piece(Piece { color, role }).into_iter() {
                if slider_sq == from_sq {
                    continue;
                }
                for (df, dr) in ray_directions(role) {
                    let ray = cast_ray(pos, slider_sq, df, dr);
                    let first_blocker = ray.into_iter().find(|sq| board.piece_at(*sq).is_some());
                    if first_blocker != Some(from_sq) {
                        continue;
                    }
                    let beyond = cast_ray(pos, from_sq, df, dr);
                    if let Some(target_sq) = beyond.into_iter().find(|sq| board.piece_at(*sq).is_some())
                    {
                        let target_piece = board.piece_at(target_sq).unwrap();
                        if target_piece.color != color
                            && target_piece.role != Role::Pawn
                            && !piece_attacks(pos, slider_sq, Piece { color, role })
                                .into_iter()
                                .any(|s| s == target_sq)
                        {
                            candidates.push((slider_sq, target_sq));
                        }
                    }
                }
            }
        }

        if candidates.is_empty() {
            continue;
        }

        let san = rules::move_to_san(pos, &mv);
        let mut after = pos.clone();
        after.play_unchecked(&mv);

        let mut targets = Vec::new();
        for (slider_sq, target_sq) in candidates {
            let Some(slider_piece) = after.board().piece_at(slider_sq) else { continue };
            if slider_piece.color != color {
                continue;
            }
            let Some(target_piece) = after.board().piece_at(target_sq) else { continue };
            if target_piece.color == color {
                continue;
            }
            if piece_attacks(&after, slider_sq, slider_piece).into_iter().any(|s| s == target_sq) {
                targets.push(target_sq.to_string());
            }
        }
        targets.sort();
        targets.dedup();

        if !targets.is_empty() {
            let tag = Tag::new("tag.threat.discovered_attack", Side::from(color))
                .with_squares(targets.clone())
                .with_detail("move", DetailValue::Text(san.clone()));
            threats.push(ThreatTag { tag, move_san: san, targets });
        }
    }

    threats
}

/// A capture that removes an enemy piece which was the sole defender of
/// another enemy piece `color` already attacks: once the defender is gone,
/// the second piece is loose. No SEE validation here — that happens once the
/// scanner re-resolves this move as a capture candidate.
pub fn detect_deflection_threats(pos: &Chess, color: Color) -> Vec<ThreatTag> {
    let mut threats = Vec::new();
    if pos.turn() != color {
        return threats;
    }
    let board = pos.board();

    for mv in pos.legal_moves().iter().filter(|m| m.capture().is_some()) {
        let captured_sq = mv.to();
        let Some(captured_piece) = board.piece_at(captured_sq) else { continue };
        if captured_piece.role == Role::King {
            continue;
        }

        let defended: Vec<Square> = piece_attacks(pos, captured_sq, captured_piece)
            .into_iter()
            .filter(|&sq| sq != captured_sq && board.piece_at(sq).is_some_and(|p| p.color == captured_piece.color))
            .collect();

        let newly_loose: Vec<Square> = defended
            .into_iter()
            .filter(|&sq| {
                !rules::attackers(pos, sq, color).is_empty()
                    && rules::defenders(pos, sq, captured_piece.color).len() == 1
            })
            .collect();

        if !newly_loose.is_empty() {
            let san = rules::move_to_san(pos, mv);
            let targets: Vec<String> = newly_loose.iter().map(|s| s.to_string()).collect();
            let tag = Tag::new(format!("tag.threat.deflection.{captured_sq}"), Side::from(color))
                .with_squares(targets.clone())
                .with_detail("move", DetailValue::Text(san.clone()));
            threats.push(ThreatTag { tag, move_san: san, targets });
        }
    }

    threats
}

/// An enemy piece is overloaded when it is the sole defender of two or more
/// of its own side's pieces that `color` is already attacking: distracting
/// or removing it wins material on whichever one does not get recaptured
/// for. Like a static pin, the weakness already exists on the board, so
/// there is no single "the" move — `move_san` is left empty and the scanner
/// resolves it against an actual capturing move on one of the targets.
pub fn detect_overloading_threats(pos: &Chess, color: Color) -> Vec<ThreatTag> {
    let mut threats = Vec::new();
    let board = pos.board();

    for role in [Role::Pawn, Role::Knight, Role::Bishop, Role::Rook, Role::Queen] {
        for defender_sq in board.by_piece(Piece { color: !color, role }).into_iter() {
            let defends: Vec<Square> = piece_attacks(pos, defender_sq, Piece { color: !color, role })
                .into_iter()
                .filter(|&sq| sq != defender_sq && board.piece_at(sq).is_some_and(|p| p.color == !color))
                .collect();

            let depends_on_this_defender: Vec<Square> = defends
                .into_iter()
                .filter(|&sq| {
                    !rules::attackers(pos, sq, color).is_empty()
                        && rules::defenders(pos, sq, !color).len() == 1
                })
                .collect();

            if depends_on_this_defender.len() >= 2 {
                let targets: Vec<String> = depends_on_this_defender.iter().map(|s| s.to_string()).collect();
                let tag = Tag::new(format!("tag.threat.overloading.{defender_sq}"), Side::from(color))
                    .with_squares(targets.clone())
                    .with_pieces(vec![format!("{}{defender_sq}", role_symbol(role))]);
                threats.push(ThreatTag { tag, move_san: String::new(), targets });
            }
        }
    }

    threats
}

fn ray_directions(role: Role) -> Vec<(i8, i8)> {
    match role {
        Role::Rook => vec![(1, 0), (-1, 0), (0, 1), (0, -1)],
        Role::Bishop => vec![(1, 1), (1, -1), (-1, 1), (-1, -1)],
        Role::Queen => vec![(1, 0), (-1, 0), (0, 1), (0, -1), (1, 1), (1, -1), (-1, 1), (-1, -1)],
        _ => Vec::new(),
    }
}

fn cast_ray(pos: &Chess, from: Square, df: i8, dr: i8) -> Vec<Square> {
    let _ = pos;
    let mut squares = Vec::new();
    let mut f = u8::from(from.file()) as i8 + df;
    let mut r = u8::from(from.rank()) as i8 + dr;
    while (0..8).contains(&f) && (0..8).contains(&r) {
        squares.push(Square::from_coords(
            shakmaty::File::new(f as u32),
            shakmaty::Rank::new(r as u32),
        ));
        f += df;
        r += dr;
    }
    squares
}

fn role_symbol(role: Role) -> &'static str {
    match role {
        Role::Pawn => "",
        Role::Knight => "N",
        Role::Bishop => "B",
        Role::Rook => "R",
        Role::Queen => "Q",
        Role::King => "K",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::position_from_fen;

    #[test]
    fn detects_knight_fork_on_king_and_rook() {
        // White knight to d6 forks black king (e8) and rook (b7)... a simpler
        // constructed position: Nc7+ forking Ke8 and Ra8.
        let pos = position_from_fen("r3k3/8/8/8/8/8/8/3NK3 w - - 0 1").unwrap();
        let threats = detect_fork_threats(&pos, Color::White);
        assert!(threats.iter().any(|t| t.tag.name.starts_with("tag.threat.fork")));
    }

    #[test]
    fn no_pins_in_starting_position() {
        const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
        let pos = position_from_fen(START).unwrap();
        assert!(detect_pin_threats(&pos, Color::White).is_empty());
    }

    #[test]
    fn detects_overloaded_rook_defending_two_pieces() {
        // Black's Ra8 is the only defender of both Ba4 (file) and Nd8
        // (rank); White's Ra1/Qd1 already attack both.
        let fen = "r2n3k/8/8/8/b7/8/8/R2QK3 w - - 0 1";
        let pos = position_from_fen(fen).unwrap();
        let threats = detect_overloading_threats(&pos, Color::White);
        assert!(threats.iter().any(|t| t.targets.len() >= 2));
    }

    #[test]
    fn detects_deflection_removing_sole_defender() {
        // Black's Re8 is the only defender of Be4; Rd8xe8 removes it while
        // White's queen on e1 already attacks the bishop.
        let fen = "3Rr2k/8/8/8/4b3/8/8/K3Q3 w - - 0 1";
        let pos = position_from_fen(fen).unwrap();
        let threats = detect_deflection_threats(&pos, Color::White);
        assert!(threats.iter().any(|t| t.tag.name.starts_with("tag.threat.deflection")));
    }
}
