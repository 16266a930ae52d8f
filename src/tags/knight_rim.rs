//! Knights on the a/h files, conventionally a sign of reduced scope.

use shakmaty::{Chess, Color, Piece, Position, Role, Square};

use super::{DetailValue, Side, Tag};

pub fn detect(pos: &Chess) -> Vec<Tag> {
    let mut tags = Vec::new();
    let board = pos.board();

    for color in [Color::White, Color::Black] {
        for knight_sq in board.by_piece(Piece { color, role: Role::Knight }).into_iter() {
            let file_idx: u8 = knight_sq.file().into();
            if file_idx == 0 || file_idx == 7 {
                let rank_idx: u8 = knight_sq.rank().into();
                tags.push(
                    Tag::new("tag.knight.rim", Side::from(color))
                        .with_pieces(vec![format!("N{knight_sq}")])
                        .with_squares(vec![knight_sq.to_string()])
                        .with_detail("file", DetailValue::Text(file_letter(file_idx)))
                        .with_detail("rank", DetailValue::Text((rank_idx + 1).to_string()))
                        .with_detail("is_edge_file", DetailValue::Bool(true))
                        .with_detail("is_edge_rank", DetailValue::Bool(false)),
                );
            }
        }
    }

    tags
}

fn file_letter(file: u8) -> String {
    char::from(shakmaty::File::new(file as u32)).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::position_from_fen;

    #[test]
    fn detects_knight_on_rim_file() {
        let pos = position_from_fen("4k3/8/8/8/8/7N/8/4K3 w - - 0 1").unwrap();
        let tags = detect(&pos);
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "tag.knight.rim");
    }

    #[test]
    fn starting_position_knights_not_on_rim() {
        const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
        let pos = position_from_fen(START).unwrap();
        assert!(detect(&pos).is_empty());
    }
}
