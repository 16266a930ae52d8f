//! Lever tags: own pawn whose push square is adjacent (by file, same rank)
//! to an enemy pawn.

use shakmaty::{Chess, Color, File, Piece, Rank, Role, Square};

use super::{DetailValue, Side, Tag};

pub fn detect(pos: &Chess) -> Vec<Tag> {
    let mut tags = Vec::new();
    let board = pos.board();

    for color in [Color::White, Color::Black] {
        let direction: i8 = if color == Color::White { 1 } else { -1 };
        let mut pawns: Vec<Square> =
            board.by_piece(Piece { color, role: Role::Pawn }).into_iter().collect();
        pawns.sort_by_key(|sq| (u8::from(sq.rank()), u8::from(sq.file())));

        for pawn_sq in pawns {
            let file_idx: i8 = u8::from(pawn_sq.file()) as i8;
            let rank_idx: i8 = u8::from(pawn_sq.rank()) as i8;
            let push_rank = rank_idx + direction;
            if !(0..8).contains(&push_rank) {
                continue;
            }
            let push_square = Square::from_coords(pawn_sq.file(), Rank::new(push_rank as u32));

            for adj_file in [file_idx - 1, file_idx + 1] {
                if !(0..8).contains(&adj_file) {
                    continue;
                }
                let adj_square = Square::from_coords(File::new(adj_file as u32), Rank::new(push_rank as u32));
                if let Some(occupant) = board.piece_at(adj_square) {
                    if occupant.role == Role::Pawn && occupant.color != color {
                        tags.push(
                            Tag::new(format!("tag.lever.{push_square}"), Side::from(color))
                                .with_pieces(vec![format!("P{pawn_sq}")])
                                .with_squares(vec![push_square.to_string()])
                                .with_detail("target", DetailValue::Text(adj_square.to_string())),
                        );
                    }
                }
            }
        }
    }

    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::position_from_fen;

    #[test]
    fn detects_lever_between_adjacent_pawns() {
        let pos = position_from_fen("4k3/8/8/8/3p4/4P3/8/4K3 w - - 0 1").unwrap();
        let tags = detect(&pos);
        assert!(tags.iter().any(|t| t.name.starts_with("tag.lever.")));
    }
}
