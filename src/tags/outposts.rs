//! Knight outposts and color-complex holes in the king zone.

use shakmaty::{Chess, Color, File, Piece, Position, Rank, Role, Square};

use crate::rules;

use super::{DetailValue, Side, Tag};

pub fn detect(pos: &Chess) -> Vec<Tag> {
    let mut tags = Vec::new();
    tags.extend(detect_outposts(pos));
    tags.extend(detect_holes(pos));
    tags
}

fn detect_outposts(pos: &Chess) -> Vec<Tag> {
    let mut tags = Vec::new();
    let board = pos.board();

    for color in [Color::White, Color::Black] {
        let mut knights: Vec<Square> =
            board.by_piece(Piece { color, role: Role::Knight }).into_iter().collect();
        knights.sort_by_key(square_index);

        for knight_sq in knights {
            let rank: u8 = knight_sq.rank().into();
            let on_outpost_rank = match color {
                Color::White => matches!(rank, 4 | 5),
                Color::Black => matches!(rank, 2 | 3),
            };
            if !on_outpost_rank {
                continue;
            }

            let is_protected = rules::attackers(pos, knight_sq, color)
                .iter()
                .any(|p| p.role == Role::Pawn);

            let can_be_chased = board
                .by_piece(Piece { color: !color, role: Role::Pawn })
                .into_iter()
                .any(|enemy_pawn| rules::square_distance(knight_sq, enemy_pawn) <= 2);

            if is_protected && !can_be_chased {
                tags.push(
                    Tag::new(format!("tag.square.outpost.knight.{knight_sq}"), Side::from(color))
                        .with_pieces(vec![format!("N{knight_sq}")])
                        .with_squares(vec![knight_sq.to_string()])
                        .with_detail("protected", DetailValue::Bool(is_protected)),
                );
            }
        }
    }

    tags
}

fn detect_holes(pos: &Chess) -> Vec<Tag> {
    let mut tags = Vec::new();
    let board = pos.board();

    for color in [Color::White, Color::Black] {
        let king_sq = match board.king_of(color) {
            Some(sq) => sq,
            None => continue,
        };

        let starting_rank: u8 = if color == Color::White { 1 } else { 6 };
        let own_pawns: Vec<Square> =
            board.by_piece(Piece { color, role: Role::Pawn }).into_iter().collect();
        let has_pawn_structure_change = own_pawns
            .iter()
            .any(|sq| u8::from(sq.rank()) != starting_rank)
            || total_pawn_count(board) < 16;

        if !has_pawn_structure_change {
            continue;
        }

        let king_zone: Vec<Square> = Square::ALL
            .into_iter()
            .filter(|sq| rules::square_distance(*sq, king_sq) <= 2)
            .collect();

        for sq in king_zone {
            if board.piece_at(sq).is_some() {
                continue;
            }

            let sq_file: u8 = sq.file().into();
            let sq_rank: u8 = sq.rank().into();
            let sq_color = if (sq_file + sq_rank) % 2 == 1 { "dark" } else { "light" };

            let can_be_guarded = own_pawns.iter().any(|&pawn_sq| {
                if pawn_attacks(pawn_sq, color).contains(&sq) {
                    return true;
                }
                let direction: i8 = if color == Color::White { 1 } else { -1 };
                let pawn_rank: i8 = u8::from(pawn_sq.rank()) as i8;
                let push_rank = pawn_rank + direction;
                if !(0..8).contains(&push_rank) {
                    return false;
                }
                let push_sq = Square::from_coords(pawn_sq.file(), Rank::new(push_rank as u32));
                if board.piece_at(push_sq).is_some() {
                    return false;
                }
                let push_file: u8 = push_sq.file().into();
                let push_rank_u8: u8 = push_sq.rank().into();
                (sq_file as i16 - push_file as i16).abs() == 1 && push_rank_u8 == sq_rank
            });

            if can_be_guarded {
                continue;
            }

            let opp_control = !rules::attackers(pos, sq, !color).is_empty();
            let king_file: u8 = king_sq.file().into();
            let adjacent_to_king_file = (sq_file as i16 - king_file as i16).abs() <= 1;

            if opp_control && adjacent_to_king_file {
                tags.push(
                    Tag::new(format!("tag.color.hole.{sq_color}.{sq}"), Side::from(color))
                        .with_squares(vec![sq.to_string()])
                        .with_detail("color", DetailValue::Text(sq_color.to_string()))
                        .with_detail("zone", DetailValue::Text("king_zone".to_string()))
                        .with_detail("opp_control", DetailValue::Bool(true)),
                );
            }
        }
    }

    tags
}

fn total_pawn_count(board: &shakmaty::Board) -> u32 {
    board.by_role(Role::Pawn).into_iter().count() as u32
}

fn pawn_attacks(pawn_sq: Square, color: Color) -> Vec<Square> {
    let direction: i8 = if color == Color::White { 1 } else { -1 };
    let file: i8 = u8::from(pawn_sq.file()) as i8;
    let rank: i8 = u8::from(pawn_sq.rank()) as i8;
    let target_rank = rank + direction;
    if !(0..8).contains(&target_rank) {
        return Vec::new();
    }
    [file - 1, file + 1]
        .into_iter()
        .filter(|f| (0..8).contains(f))
        .map(|f| Square::from_coords(File::new(f as u32), Rank::new(target_rank as u32)))
        .collect()
}

fn square_index(sq: &Square) -> u32 {
    let file: u8 = sq.file().into();
    let rank: u8 = sq.rank().into();
    rank as u32 * 8 + file as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::position_from_fen;

    #[test]
    fn detects_protected_knight_outpost() {
        let pos = position_from_fen("4k3/8/8/3N4/3P4/8/8/4K3 w - - 0 1").unwrap();
        let tags = detect_outposts(&pos);
        assert!(tags.iter().any(|t| t.name.contains("outpost.knight")));
    }

    #[test]
    fn no_holes_in_starting_position() {
        const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
        let pos = position_from_fen(START).unwrap();
        assert!(detect_holes(&pos).is_empty());
    }
}
