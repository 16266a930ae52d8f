//! Diagonal tags: open diagonals for bishops/queens, long diagonals, and
//! queen+bishop batteries aimed at the enemy king.

use shakmaty::{Chess, Color, File, Piece, Position, Rank, Role, Square};

use super::{DetailValue, Side, Tag};

struct DiagonalScan {
    squares: Vec<Square>,
}

fn scan_diagonal(pos: &Chess, file: i8, rank: i8, df: i8, dr: i8) -> DiagonalScan {
    let board = pos.board();
    let mut squares = Vec::new();
    let mut f = file + df;
    let mut r = rank + dr;
    while (0..8).contains(&f) && (0..8).contains(&r) {
        let sq = Square::from_coords(File::new(f as u32), Rank::new(r as u32));
        if board.piece_at(sq).is_some() {
            break;
        }
        squares.push(sq);
        f += df;
        r += dr;
    }
    DiagonalScan { squares }
}

pub fn detect(pos: &Chess) -> Vec<Tag> {
    let mut tags = Vec::new();
    let board = pos.board();

    for color in [Color::White, Color::Black] {
        for role in [Role::Bishop, Role::Queen] {
            let symbol = if role == Role::Bishop { "B" } else { "Q" };
            let mut pieces: Vec<Square> =
                board.by_piece(Piece { color, role }).into_iter().collect();
            pieces.sort_by_key(square_index);

            for piece_sq in pieces {
                let file = u8::from(piece_sq.file()) as i8;
                let rank = u8::from(piece_sq.rank()) as i8;

                for (df, dr, dir_name) in [(1, 1, "ne"), (-1, 1, "nw"), (1, -1, "se"), (-1, -1, "sw")] {
                    let scan = scan_diagonal(pos, file, rank, df, dr);
                    if scan.squares.len() >= 2 {
                        let end_sq = *scan.squares.last().unwrap();
                        let diag_name = format!("{piece_sq}-{end_sq}");
                        tags.push(
                            Tag::new(format!("tag.diagonal.open.{diag_name}"), Side::from(color))
                                .with_pieces(vec![format!("{symbol}{piece_sq}")])
                                .with_squares(scan.squares.iter().take(7).map(|s| s.to_string()).collect())
                                .with_detail("direction", DetailValue::Text(dir_name.to_string()))
                                .with_detail("length", DetailValue::Int(scan.squares.len() as i64))
                                .with_detail("open", DetailValue::Bool(true)),
                        );
                    }
                }

                let on_main_diag = file == rank;
                let on_anti_diag = file + rank == 7;

                if on_main_diag {
                    let ne = scan_diagonal(pos, file, rank, 1, 1);
                    let sw = scan_diagonal(pos, file, rank, -1, -1);
                    let total_length = ne.squares.len() + sw.squares.len() + 1;
                    if total_length >= 4 {
                        let mut squares = vec![piece_sq.to_string()];
                        squares.extend(ne.squares.iter().take(3).map(|s| s.to_string()));
                        squares.extend(sw.squares.iter().take(3).map(|s| s.to_string()));
                        tags.push(
                            Tag::new("tag.diagonal.open.long.a1h8", Side::from(color))
                                .with_pieces(vec![format!("{symbol}{piece_sq}")])
                                .with_squares(squares)
                                .with_detail("on_main_diagonal", DetailValue::Bool(true))
                                .with_detail("open", DetailValue::Bool(true)),
                        );
                    }
                }

                if on_anti_diag {
                    let nw = scan_diagonal(pos, file, rank, -1, 1);
                    let se = scan_diagonal(pos, file, rank, 1, -1);
                    let total_length = nw.squares.len() + se.squares.len() + 1;
                    if total_length >= 4 {
                        let mut squares = vec![piece_sq.to_string()];
                        squares.extend(nw.squares.iter().take(3).map(|s| s.to_string()));
                        squares.extend(se.squares.iter().take(3).map(|s| s.to_string()));
                        tags.push(
                            Tag::new("tag.diagonal.open.long.h1a8", Side::from(color))
                                .with_pieces(vec![format!("{symbol}{piece_sq}")])
                                .with_squares(squares)
                                .with_detail("on_main_diagonal", DetailValue::Bool(true))
                                .with_detail("open", DetailValue::Bool(true)),
                        );
                    }
                }
            }
        }
    }

    for color in [Color::White, Color::Black] {
        let queens: Vec<Square> =
            board.by_piece(Piece { color, role: Role::Queen }).into_iter().collect();
        let bishops: Vec<Square> =
            board.by_piece(Piece { color, role: Role::Bishop }).into_iter().collect();
        let opp_king = board.king_of(!color);

        for &q_sq in &queens {
            for &b_sq in &bishops {
                let q_file = u8::from(q_sq.file()) as i8;
                let q_rank = u8::from(q_sq.rank()) as i8;
                let b_file = u8::from(b_sq.file()) as i8;
                let b_rank = u8::from(b_sq.rank()) as i8;
                if (q_file - b_file).abs() != (q_rank - b_rank).abs() {
                    continue;
                }
                if let Some(king_sq) = opp_king {
                    let k_file = u8::from(king_sq.file()) as i8;
                    let k_rank = u8::from(king_sq.rank()) as i8;
                    if (q_file - k_file).abs() == (q_rank - k_rank).abs() {
                        tags.push(
                            Tag::new("tag.battery.qb.diagonal", Side::from(color))
                                .with_pieces(vec![format!("Q{q_sq}"), format!("B{b_sq}")])
                                .with_squares(vec![q_sq.to_string(), b_sq.to_string()])
                                .with_detail("target", DetailValue::Text(king_sq.to_string())),
                        );
                    }
                }
            }
        }
    }

    tags
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
    fn detects_open_long_diagonal_for_fianchettoed_bishop() {
        let pos = position_from_fen("4k3/8/8/8/8/6P1/5PBP/6K1 w - - 0 1").unwrap();
        let tags = detect(&pos);
        assert!(tags.iter().any(|t| t.name.starts_with("tag.diagonal.open.")));
    }
}
