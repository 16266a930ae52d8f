//! Center/space control tags plus per-key-square control detail.

use shakmaty::{Chess, Color, Role, Square};

use crate::rules;

use super::{DetailValue, Side, Tag};

const CORE_SQUARES: [Square; 4] = [Square::D4, Square::E4, Square::D5, Square::E5];
const NEAR_CENTER: [Square; 4] = [Square::C4, Square::F4, Square::C5, Square::F5];
const KEY_SQUARES: [(&str, Square); 4] =
    [("e4", Square::E4), ("d4", Square::D4), ("e5", Square::E5), ("d5", Square::D5)];

pub fn detect(pos: &Chess) -> Vec<Tag> {
    let mut tags = Vec::new();
    let board = pos.board();

    for color in [Color::White, Color::Black] {
        let controls = |sq: Square, c: Color| rules::attackers(pos, sq, c).len();

        let core_controlled: Vec<Square> = CORE_SQUARES
            .into_iter()
            .filter(|&sq| controls(sq, color) > controls(sq, !color))
            .collect();
        if core_controlled.len() >= 2 {
            tags.push(
                Tag::new("tag.center.control.core", Side::from(color))
                    .with_squares(core_controlled.iter().map(|s| s.to_string()).collect())
                    .with_detail("count", DetailValue::Int(core_controlled.len() as i64)),
            );
        }

        let near_controlled: Vec<Square> = NEAR_CENTER
            .into_iter()
            .filter(|&sq| controls(sq, color) > controls(sq, !color))
            .collect();
        if near_controlled.len() >= 2 {
            tags.push(
                Tag::new("tag.center.control.near", Side::from(color))
                    .with_squares(near_controlled.iter().map(|s| s.to_string()).collect())
                    .with_detail("count", DetailValue::Int(near_controlled.len() as i64)),
            );
        }

        for (sq_name, sq) in KEY_SQUARES {
            let occupant = board.piece_at(sq);
            let own_occupant = occupant.map_or(false, |p| p.color == color);
            if controls(sq, color) > controls(sq, !color) || own_occupant {
                let mut controllers: Vec<String> = rules::attackers(pos, sq, color)
                    .iter()
                    .map(|p| format!("{}{}", p.role_letter(), p.square))
                    .collect();
                if own_occupant {
                    if let Some(p) = occupant {
                        controllers.push(format!("{}{}@occupying", p.token_letter(), sq));
                    }
                }
                controllers.truncate(5);

                tags.push(
                    Tag::new(format!("tag.key.{sq_name}"), Side::from(color))
                        .with_squares(vec![sq_name.to_string()])
                        .with_pieces(controllers),
                );
            }
        }

        let opp_half: Vec<Square> = Square::ALL
            .into_iter()
            .filter(|sq| in_half(*sq, color.other_half()))
            .collect();
        let own_half: Vec<Square> = Square::ALL
            .into_iter()
            .filter(|sq| in_half(*sq, color.own_half()))
            .collect();

        let space_control = opp_half.iter().filter(|&&sq| controls(sq, color) > 0).count() as i64;
        let opp_control_own = own_half.iter().filter(|&&sq| controls(sq, !color) > 0).count() as i64;

        if space_control - opp_control_own > 5 {
            tags.push(
                Tag::new("tag.space.advantage", Side::from(color))
                    .with_detail("differential", DetailValue::Int(space_control - opp_control_own)),
            );
        }
    }

    tags
}

/// Half-board side, used for space-control accounting.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Half {
    Low,
    High,
}

trait ColorHalf {
    fn own_half(self) -> Half;
    fn other_half(self) -> Half;
}

impl ColorHalf for Color {
    fn own_half(self) -> Half {
        if self == Color::White { Half::Low } else { Half::High }
    }
    fn other_half(self) -> Half {
        if self == Color::White { Half::High } else { Half::Low }
    }
}

fn in_half(sq: Square, half: Half) -> bool {
    let rank: u8 = sq.rank().into();
    match half {
        Half::Low => rank < 4,
        Half::High => rank >= 4,
    }
}

trait PieceLabel {
    fn role_letter(&self) -> &'static str;
    fn token_letter(&self) -> &'static str;
}

impl PieceLabel for rules::Piece {
    fn role_letter(&self) -> &'static str {
        match self.role {
            Role::Pawn => "P",
            Role::Knight => "N",
            Role::Bishop => "B",
            Role::Rook => "R",
            Role::Queen => "Q",
            Role::King => "K",
        }
    }
    fn token_letter(&self) -> &'static str {
        self.role_letter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::position_from_fen;

    #[test]
    fn detects_core_center_control_after_two_pawn_moves() {
        let pos =
            position_from_fen("rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2")
                .unwrap();
        let tags = detect(&pos);
        assert!(tags.iter().any(|t| t.name.starts_with("tag.key.")));
    }
}
