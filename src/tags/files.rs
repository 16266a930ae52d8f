//! File tags: open/semi-open files, rooks on open files, rooks on the 7th/2nd
//! rank, connected rooks.

use shakmaty::{Chess, Color, File, Piece, Position, Rank, Role, Square};

use super::{Side, Tag};

pub fn detect(pos: &Chess) -> Vec<Tag> {
    let mut tags = Vec::new();
    let board = pos.board();

    for file in File::ALL {
        let white_pawns = pawns_on_file(pos, Color::White, file);
        let black_pawns = pawns_on_file(pos, Color::Black, file);

        if white_pawns == 0 && black_pawns == 0 {
            tags.push(
                Tag::new("tag.file.open", Side::Both).with_squares(vec![file_label(file)]),
            );
        } else if white_pawns == 0 {
            tags.push(
                Tag::new("tag.file.semi_open", Side::White).with_squares(vec![file_label(file)]),
            );
        } else if black_pawns == 0 {
            tags.push(
                Tag::new("tag.file.semi_open", Side::Black).with_squares(vec![file_label(file)]),
            );
        }
    }

    for color in [Color::White, Color::Black] {
        let seventh = if color == Color::White { Rank::Seventh } else { Rank::Second };
        let second = if color == Color::White { Rank::Second } else { Rank::Seventh };

        let mut rooks: Vec<Square> = board.by_piece(Piece { color, role: Role::Rook }).into_iter().collect();
        rooks.sort_by_key(square_index);

        for &rook_sq in &rooks {
            let file = rook_sq.file();
            let white_pawns = pawns_on_file(pos, Color::White, file);
            let black_pawns = pawns_on_file(pos, Color::Black, file);

            if white_pawns == 0 && black_pawns == 0 {
                tags.push(
                    Tag::new("tag.rook.open_file", color.into())
                        .with_pieces(vec![piece_token(Role::Rook, rook_sq)]),
                );
            } else if (color == Color::White && white_pawns == 0)
                || (color == Color::Black && black_pawns == 0)
            {
                tags.push(
                    Tag::new("tag.rook.semi_open_file", color.into())
                        .with_pieces(vec![piece_token(Role::Rook, rook_sq)]),
                );
            }

            if rook_sq.rank() == seventh {
                tags.push(
                    Tag::new("tag.rook.seventh_rank", color.into())
                        .with_pieces(vec![piece_token(Role::Rook, rook_sq)]),
                );
            } else if rook_sq.rank() == second {
                tags.push(
                    Tag::new("tag.rook.second_rank", color.into())
                        .with_pieces(vec![piece_token(Role::Rook, rook_sq)]),
                );
            }
        }

        if rooks.len() == 2 {
            let (a, b) = (rooks[0], rooks[1]);
            let same_rank = a.rank() == b.rank();
            let same_file = a.file() == b.file();
            if same_rank || same_file {
                let between_clear = squares_between(a, b)
                    .into_iter()
                    .all(|sq| board.piece_at(sq).is_none());
                if between_clear {
                    tags.push(
                        Tag::new("tag.rook.connected", color.into())
                            .with_pieces(vec![piece_token(Role::Rook, a), piece_token(Role::Rook, b)]),
                    );
                }
            }
        }
    }

    tags
}

fn pawns_on_file(pos: &Chess, color: Color, file: File) -> u32 {
    pos.board()
        .by_piece(Piece { color, role: Role::Pawn })
        .into_iter()
        .filter(|sq| sq.file() == file)
        .count() as u32
}

fn file_label(file: File) -> String {
    format!("file:{}", char::from(file))
}

fn piece_token(role: Role, sq: Square) -> String {
    let letter = match role {
        Role::Knight => "N",
        Role::Bishop => "B",
        Role::Rook => "R",
        Role::Queen => "Q",
        Role::King => "K",
        Role::Pawn => "",
    };
    format!("{letter}{sq}")
}

fn square_index(sq: &Square) -> u32 {
    let file: u8 = sq.file().into();
    let rank: u8 = sq.rank().into();
    rank as u32 * 8 + file as u32
}

/// Squares strictly between two aligned squares (same rank or file only).
fn squares_between(a: Square, b: Square) -> Vec<Square> {
    let mut result = Vec::new();
    let a_file: i8 = u8::from(a.file()) as i8;
    let b_file: i8 = u8::from(b.file()) as i8;
    let a_rank: i8 = u8::from(a.rank()) as i8;
    let b_rank: i8 = u8::from(b.rank()) as i8;

    if a_file == b_file {
        let (lo, hi) = (a_rank.min(b_rank), a_rank.max(b_rank));
        for rank in (lo + 1)..hi {
            result.push(Square::from_coords(a.file(), Rank::new(rank as u32)));
        }
    } else if a_rank == b_rank {
        let (lo, hi) = (a_file.min(b_file), a_file.max(b_file));
        for file in (lo + 1)..hi {
            result.push(Square::from_coords(File::new(file as u32), a.rank()));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::position_from_fen;

    #[test]
    fn detects_open_file() {
        let pos = position_from_fen("4k3/8/8/8/8/8/PPP1PPPP/4K3 w - - 0 1").unwrap();
        let tags = detect(&pos);
        assert!(tags.iter().any(|t| t.name == "tag.file.open"
            && t.squares.as_ref().unwrap().contains(&"file:d".to_string())));
    }

    #[test]
    fn detects_connected_rooks_on_rank() {
        let pos = position_from_fen("4k3/8/8/8/8/8/8/R2RK3 w - - 0 1").unwrap();
        let tags = detect(&pos);
        assert!(tags.iter().any(|t| t.name == "tag.rook.connected"));
    }
}
