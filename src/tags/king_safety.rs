//! King safety tags: attacker/defender counts, center exposure, pawn shield
//! integrity, and open files around the king.

use shakmaty::{CastlingSide, Chess, Color, File, Piece, Position, Rank, Role, Square};

use crate::rules;

use super::{DetailValue, Side, Tag};

pub fn detect(pos: &Chess) -> Vec<Tag> {
    let mut tags = Vec::new();
    let board = pos.board();

    for color in [Color::White, Color::Black] {
        let king_sq = match board.king_of(color) {
            Some(sq) => sq,
            None => continue,
        };
        let file_idx: u8 = king_sq.file().into();

        let attacking = rules::attackers(pos, king_sq, !color);
        let defending = rules::attackers(pos, king_sq, color);

        tags.push(
            Tag::new("tag.king.attackers.count", Side::from(color))
                .with_squares(vec![king_sq.to_string()])
                .with_pieces(attacking.iter().map(|p| p.token()).collect())
                .with_detail("count", DetailValue::Int(attacking.len() as i64)),
        );
        tags.push(
            Tag::new("tag.king.defenders.count", Side::from(color))
                .with_squares(vec![king_sq.to_string()])
                .with_pieces(defending.iter().map(|p| p.token()).collect())
                .with_detail("count", DetailValue::Int(defending.len() as i64)),
        );

        if file_idx == 3 || file_idx == 4 {
            let central_files_open = [3u8, 4u8].into_iter().any(|central_file| {
                let white_pawns = pawns_on_file(board, Color::White, central_file);
                let black_pawns = pawns_on_file(board, Color::Black, central_file);
                white_pawns == 0 || black_pawns == 0
            });

            let mut shield_files: [u8; 3] = [5, 6, 7];
            if pos.castles().has(color, CastlingSide::Queen)
                && !pos.castles().has(color, CastlingSide::King)
            {
                shield_files = [0, 1, 2];
            }
            let shield_rank: u8 = if color == Color::White { 1 } else { 6 };
            let shield_pawns =
                shield_files.iter().filter(|&&f| has_own_pawn(board, color, f, shield_rank)).count();

            if central_files_open && shield_pawns <= 1 {
                tags.push(
                    Tag::new("tag.king.center.exposed", Side::from(color))
                        .with_squares(vec![king_sq.to_string()])
                        .with_detail("shield_pawns", DetailValue::Int(shield_pawns as i64))
                        .with_detail("central_files_open", DetailValue::Bool(true)),
                );
            }
        }

        if !pos.castles().has_side(color) {
            let shield_files: Option<[u8; 3]> = if file_idx >= 5 {
                Some([5, 6, 7])
            } else if file_idx <= 2 {
                Some([0, 1, 2])
            } else {
                None
            };

            if let Some(shield_files) = shield_files {
                let shield_rank: u8 = if color == Color::White { 1 } else { 6 };
                let shield_pawns = shield_files
                    .iter()
                    .filter(|&&f| has_own_pawn(board, color, f, shield_rank))
                    .count();

                if shield_pawns == 3 {
                    tags.push(
                        Tag::new("tag.king.shield.intact", Side::from(color))
                            .with_squares(vec![king_sq.to_string()])
                            .with_detail("pawns", DetailValue::Int(3)),
                    );
                } else {
                    for &f in &shield_files {
                        if !has_own_pawn(board, color, f, shield_rank) {
                            tags.push(
                                Tag::new(
                                    format!("tag.king.shield.missing.{}", file_letter(f)),
                                    Side::from(color),
                                )
                                .with_squares(vec![king_sq.to_string()]),
                            );
                        }
                    }
                }
            }
        }

        for adj_file_signed in [file_idx as i8 - 1, file_idx as i8, file_idx as i8 + 1] {
            if !(0..8).contains(&adj_file_signed) {
                continue;
            }
            let adj_file = adj_file_signed as u8;
            let white_pawns = pawns_on_file(board, Color::White, adj_file);
            let black_pawns = pawns_on_file(board, Color::Black, adj_file);

            if white_pawns == 0 && black_pawns == 0 {
                tags.push(
                    Tag::new("tag.king.file.open", Side::from(color))
                        .with_squares(vec![king_sq.to_string()])
                        .with_detail("file", DetailValue::Text(file_letter(adj_file))),
                );
            } else if (color == Color::White && white_pawns == 0)
                || (color == Color::Black && black_pawns == 0)
            {
                tags.push(
                    Tag::new("tag.king.file.semi", Side::from(color))
                        .with_squares(vec![king_sq.to_string()])
                        .with_detail("file", DetailValue::Text(file_letter(adj_file))),
                );
            }
        }
    }

    tags
}

fn pawns_on_file(board: &shakmaty::Board, color: Color, file: u8) -> u32 {
    board
        .by_piece(Piece { color, role: Role::Pawn })
        .into_iter()
        .filter(|sq| u8::from(sq.file()) == file)
        .count() as u32
}

fn has_own_pawn(board: &shakmaty::Board, color: Color, file: u8, rank: u8) -> bool {
    let sq = Square::from_coords(File::new(file as u32), Rank::new(rank as u32));
    board.piece_at(sq) == Some(Piece { color, role: Role::Pawn })
}

fn file_letter(file: u8) -> String {
    char::from(File::new(file as u32)).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::position_from_fen;

    #[test]
    fn counts_attackers_and_defenders_of_king() {
        const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
        let pos = position_from_fen(START).unwrap();
        let tags = detect(&pos);
        assert!(tags.iter().any(|t| t.name == "tag.king.attackers.count"));
        assert!(tags.iter().any(|t| t.name == "tag.king.defenders.count"));
    }

    #[test]
    fn exposed_king_requires_all_three_conditions() {
        // King on e-file, e-file open, shield thin.
        let pos = position_from_fen("r1bq1rk1/ppp2ppp/2n5/3p4/3P4/2N5/PPP2PPP/R1BQK2R w KQ - 0 9").unwrap();
        let tags = detect(&pos);
        for tag in tags.iter().filter(|t| t.name == "tag.king.center.exposed") {
            let shield_pawns = match tag.details.as_ref().and_then(|d| d.get("shield_pawns")) {
                Some(crate::tags::DetailValue::Int(n)) => *n,
                _ => panic!("missing shield_pawns detail"),
            };
            assert!(shield_pawns <= 1);
        }
    }
}
