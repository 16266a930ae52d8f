//! Piece activity: mobility totals, undeveloped pieces, trapped pieces, bad
//! bishops, the bishop pair, and overworked defenders.

use shakmaty::attacks as shak_attacks;
use shakmaty::{Chess, Color, Piece, Position, Role, Square};

use crate::rules;

use super::{DetailValue, Side, Tag};

pub fn detect(pos: &Chess) -> Vec<Tag> {
    let mut tags = Vec::new();
    tags.extend(detect_mobility_and_development(pos));
    tags.extend(detect_trapped_pieces(pos));
    tags.extend(detect_bishop_tags(pos));
    tags.extend(detect_overworked_pieces(pos));
    tags
}

fn piece_attacks(pos: &Chess, sq: Square, piece: Piece) -> shakmaty::Bitboard {
    shak_attacks::attacks(sq, piece, pos.board().occupied())
}

fn detect_mobility_and_development(pos: &Chess) -> Vec<Tag> {
    let mut tags = Vec::new();
    let board = pos.board();

    for color in [Color::White, Color::Black] {
        for (role, name) in [
            (Role::Knight, "knight"),
            (Role::Bishop, "bishop"),
            (Role::Rook, "rook"),
            (Role::Queen, "queen"),
        ] {
            let total_mobility: u32 = board
                .by_piece(Piece { color, role })
                .into_iter()
                .map(|sq| piece_attacks(pos, sq, Piece { color, role }).into_iter().count() as u32)
                .sum();

            if total_mobility > 0 {
                tags.push(
                    Tag::new(format!("tag.activity.mobility.{name}"), Side::from(color))
                        .with_detail("mobility", DetailValue::Int(total_mobility as i64)),
                );
            }
        }

        for (role, name, symbol, starting_squares) in starting_square_table(color) {
            let mut undeveloped: Vec<Square> = board
                .by_piece(Piece { color, role })
                .into_iter()
                .filter(|sq| starting_squares.contains(sq))
                .collect();
            undeveloped.sort_by_key(square_index);

            let total_count = undeveloped.len();
            for sq in undeveloped {
                tags.push(
                    Tag::new(format!("tag.undeveloped.{name}"), Side::from(color))
                        .with_squares(vec![sq.to_string()])
                        .with_pieces(vec![format!("{symbol}{sq}")])
                        .with_detail("count", DetailValue::Int(1))
                        .with_detail("count_total", DetailValue::Int(total_count as i64)),
                );
            }
        }
    }

    tags
}

fn starting_square_table(color: Color) -> Vec<(Role, &'static str, &'static str, Vec<Square>)> {
    if color == Color::White {
        vec![
            (Role::Knight, "knight", "N", vec![Square::B1, Square::G1]),
            (Role::Bishop, "bishop", "B", vec![Square::C1, Square::F1]),
            (Role::Rook, "rook", "R", vec![Square::A1, Square::H1]),
            (Role::Queen, "queen", "Q", vec![Square::D1]),
        ]
    } else {
        vec![
            (Role::Knight, "knight", "N", vec![Square::B8, Square::G8]),
            (Role::Bishop, "bishop", "B", vec![Square::C8, Square::F8]),
            (Role::Rook, "rook", "R", vec![Square::A8, Square::H8]),
            (Role::Queen, "queen", "Q", vec![Square::D8]),
        ]
    }
}

fn detect_trapped_pieces(pos: &Chess) -> Vec<Tag> {
    let mut tags = Vec::new();
    let board = pos.board();

    for color in [Color::White, Color::Black] {
        for role in [Role::Knight, Role::Bishop, Role::Rook] {
            let symbol = match role {
                Role::Knight => "N",
                Role::Bishop => "B",
                Role::Rook => "R",
                _ => unreachable!(),
            };

            for piece_sq in board.by_piece(Piece { color, role }).into_iter() {
                let all_moves: Vec<Square> = piece_attacks(pos, piece_sq, Piece { color, role })
                    .into_iter()
                    .filter(|sq| board.piece_at(*sq).map_or(true, |p| p.color != color))
                    .collect();

                let safe_squares: Vec<Square> = all_moves
                    .iter()
                    .copied()
                    .filter(|&sq| rules::attackers(pos, sq, !color).is_empty())
                    .collect();
                let attacked_squares: Vec<Square> = all_moves
                    .iter()
                    .copied()
                    .filter(|&sq| !rules::attackers(pos, sq, !color).is_empty())
                    .collect();

                if safe_squares.len() <= 1 {
                    tags.push(
                        Tag::new("tag.piece.trapped", Side::from(color))
                            .with_pieces(vec![format!("{symbol}{piece_sq}")])
                            .with_squares(vec![piece_sq.to_string()])
                            .with_detail("safe_squares", DetailValue::Int(safe_squares.len() as i64))
                            .with_detail(
                                "safe_squares_list",
                                DetailValue::List(safe_squares.iter().map(|s| s.to_string()).collect()),
                            )
                            .with_detail(
                                "attacked_squares",
                                DetailValue::List(
                                    attacked_squares.iter().map(|s| s.to_string()).collect(),
                                ),
                            ),
                    );
                }
            }
        }
    }

    tags
}

fn detect_bishop_tags(pos: &Chess) -> Vec<Tag> {
    let mut tags = Vec::new();
    let board = pos.board();

    for color in [Color::White, Color::Black] {
        let bishops: Vec<Square> = board.by_piece(Piece { color, role: Role::Bishop }).into_iter().collect();
        let pawns: Vec<Square> = board.by_piece(Piece { color, role: Role::Pawn }).into_iter().collect();
        let total_pawns = pawns.len();

        for &bishop_sq in &bishops {
            let bishop_color_complex = square_color_complex(bishop_sq);
            let same_color_pawns =
                pawns.iter().filter(|&&sq| square_color_complex(sq) == bishop_color_complex).count();

            if total_pawns > 0 && (same_color_pawns as f64 / total_pawns as f64) > 0.6 {
                let mobility =
                    piece_attacks(pos, bishop_sq, Piece { color, role: Role::Bishop }).into_iter().count();
                if mobility < 5 {
                    tags.push(
                        Tag::new("tag.bishop.bad", Side::from(color))
                            .with_pieces(vec![format!("B{bishop_sq}")])
                            .with_squares(vec![bishop_sq.to_string()])
                            .with_detail("locked_pawns", DetailValue::Int(same_color_pawns as i64))
                            .with_detail("mobility", DetailValue::Int(mobility as i64)),
                    );
                }
            }
        }

        if bishops.len() == 2 {
            tags.push(
                Tag::new("tag.bishop.pair", Side::from(color))
                    .with_pieces(bishops.iter().map(|s| format!("B{s}")).collect()),
            );
        }
    }

    tags
}

/// `0` for light squares, `1` for dark squares: `(file + rank) % 2`.
fn square_color_complex(sq: Square) -> u8 {
    let file: u8 = sq.file().into();
    let rank: u8 = sq.rank().into();
    (file + rank) % 2
}

struct Defended {
    square: Square,
    piece: Piece,
    attackers: Vec<Square>,
    all_defenders: Vec<Square>,
}

fn detect_overworked_pieces(pos: &Chess) -> Vec<Tag> {
    let mut tags = Vec::new();
    let board = pos.board();

    for color in [Color::White, Color::Black] {
        for role in [Role::Pawn, Role::Knight, Role::Bishop, Role::Rook, Role::Queen] {
            for defender_sq in board.by_piece(Piece { color, role }).into_iter() {
                let defender_piece = Piece { color, role };
                let defended_squares = piece_attacks(pos, defender_sq, defender_piece);

                let mut defended_pieces = Vec::new();
                for target_sq in defended_squares.into_iter() {
                    let target_piece = match board.piece_at(target_sq) {
                        Some(p) if p.color == color && target_sq != defender_sq => p,
                        _ => continue,
                    };
                    if rules::attackers(pos, target_sq, !color).is_empty() {
                        continue;
                    }
                    let attacker_squares: Vec<Square> =
                        rules::attackers(pos, target_sq, !color).iter().map(|p| p.square).collect();
                    let all_defenders: Vec<Square> =
                        rules::attackers(pos, target_sq, color).iter().map(|p| p.square).collect();
                    defended_pieces.push(Defended {
                        square: target_sq,
                        piece: target_piece,
                        attackers: attacker_squares,
                        all_defenders,
                    });
                }

                if defended_pieces.len() < 2 {
                    continue;
                }

                for i in 0..defended_pieces.len() {
                    for j in (i + 1)..defended_pieces.len() {
                        let p1 = &defended_pieces[i];
                        let p2 = &defended_pieces[j];
                        let p1_other = p1.all_defenders.iter().filter(|&&s| s != defender_sq).count();
                        let p2_other = p2.all_defenders.iter().filter(|&&s| s != defender_sq).count();

                        let overworked = p1_other == 0 || p2_other == 0;
                        if !overworked {
                            continue;
                        }

                        tags.push(
                            Tag::new(
                                format!("tag.piece.overworked.{defender_sq}"),
                                Side::from(color),
                            )
                            .with_pieces(vec![format!("{}{defender_sq}", role_symbol(role))])
                            .with_squares(vec![defender_sq.to_string()])
                            .with_detail(
                                "defends",
                                DetailValue::List(vec![p1.square.to_string(), p2.square.to_string()]),
                            )
                            .with_detail(
                                "defended_piece_types",
                                DetailValue::List(vec![
                                    role_name(p1.piece.role).to_string(),
                                    role_name(p2.piece.role).to_string(),
                                ]),
                            )
                            .with_detail(
                                "attackers",
                                DetailValue::List(
                                    p1.attackers
                                        .iter()
                                        .chain(p2.attackers.iter())
                                        .map(|s| s.to_string())
                                        .collect(),
                                ),
                            ),
                        );
                    }
                }
            }
        }
    }

    tags
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

fn role_name(role: Role) -> &'static str {
    match role {
        Role::Pawn => "Pawn",
        Role::Knight => "Knight",
        Role::Bishop => "Bishop",
        Role::Rook => "Rook",
        Role::Queen => "Queen",
        Role::King => "King",
    }
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
    fn starting_position_reports_all_pieces_undeveloped() {
        const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
        let pos = position_from_fen(START).unwrap();
        let tags = detect(&pos);
        assert!(tags.iter().any(|t| t.name == "tag.undeveloped.knight"));
        assert!(tags.iter().any(|t| t.name == "tag.undeveloped.queen"));
    }

    #[test]
    fn no_bishop_pair_tag_with_only_one_bishop() {
        let pos = position_from_fen("4k3/8/8/8/8/8/8/3BK3 w - - 0 1").unwrap();
        let tags = detect_bishop_tags(&pos);
        assert!(!tags.iter().any(|t| t.name == "tag.bishop.pair"));
    }
}
