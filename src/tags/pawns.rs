//! Pawn structure: doubled pawns and passed pawns.

use shakmaty::{Chess, Color, File, Piece, Position, Rank, Role, Square};

use crate::rules;

use super::{DetailValue, Side, Tag};

pub fn detect(pos: &Chess) -> Vec<Tag> {
    let mut tags = Vec::new();
    let board = pos.board();

    for color in [Color::White, Color::Black] {
        let direction: i8 = if color == Color::White { 1 } else { -1 };
        let own_pawns: Vec<Square> = board.by_piece(Piece { color, role: Role::Pawn }).into_iter().collect();
        let enemy_pawns: Vec<Square> =
            board.by_piece(Piece { color: !color, role: Role::Pawn }).into_iter().collect();

        for file_idx in 0u8..8 {
            let pawns_on_file: Vec<Square> = own_pawns
                .iter()
                .copied()
                .filter(|sq| u8::from(sq.file()) == file_idx)
                .collect();
            if pawns_on_file.len() >= 2 {
                let file_name = file_letter(file_idx);
                tags.push(
                    Tag::new(format!("tag.pawn.doubled.{file_name}"), Side::from(color))
                        .with_pieces(pawns_on_file.iter().map(|s| format!("P{s}")).collect())
                        .with_squares(pawns_on_file.iter().map(|s| s.to_string()).collect())
                        .with_detail("file", DetailValue::Text(file_name))
                        .with_detail("count", DetailValue::Int(pawns_on_file.len() as i64)),
                );
            }
        }

        for &pawn_sq in &own_pawns {
            let file_idx: i8 = u8::from(pawn_sq.file()) as i8;
            let rank_idx: i8 = u8::from(pawn_sq.rank()) as i8;
            let end_rank: i8 = if color == Color::White { 7 } else { 0 };

            let mut is_passed = true;
            let mut check_rank = rank_idx + direction;
            while (0..8).contains(&check_rank) {
                for check_file in [file_idx - 1, file_idx, file_idx + 1] {
                    if !(0..8).contains(&check_file) {
                        continue;
                    }
                    let sq = Square::from_coords(File::new(check_file as u32), Rank::new(check_rank as u32));
                    if enemy_pawns.contains(&sq) {
                        is_passed = false;
                    }
                }
                if !is_passed || check_rank == end_rank {
                    break;
                }
                check_rank += direction;
            }

            if !is_passed {
                continue;
            }

            let is_protected =
                rules::attackers(pos, pawn_sq, color).iter().any(|p| p.role == Role::Pawn);

            tags.push(
                Tag::new(format!("tag.pawn.passed.{pawn_sq}"), Side::from(color))
                    .with_pieces(vec![format!("P{pawn_sq}")])
                    .with_squares(vec![pawn_sq.to_string()])
                    .with_detail("protected", DetailValue::Bool(is_protected)),
            );

            if is_protected {
                tags.push(
                    Tag::new("tag.pawn.passed.protected", Side::from(color))
                        .with_pieces(vec![format!("P{pawn_sq}")])
                        .with_squares(vec![pawn_sq.to_string()]),
                );
            }
        }
    }

    tags
}

fn file_letter(file: u8) -> String {
    char::from(File::new(file as u32)).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::position_from_fen;

    #[test]
    fn detects_doubled_pawns_on_same_file() {
        let pos = position_from_fen("4k3/8/8/8/3P4/8/3P4/4K3 w - - 0 1").unwrap();
        let tags = detect(&pos);
        assert!(tags.iter().any(|t| t.name == "tag.pawn.doubled.d"));
    }

    #[test]
    fn detects_protected_passed_pawn() {
        let pos = position_from_fen("4k3/8/8/8/3P4/4P3/8/4K3 w - - 0 1").unwrap();
        let tags = detect(&pos);
        assert!(tags.iter().any(|t| t.name == "tag.pawn.passed.protected"));
    }
}
