//! Castling rights and availability tags.
//!
//! Rights and availability are reported separately: a side can hold castling
//! rights long after the move has stopped being legal (pieces in the way,
//! king in check), and losing that distinction makes for a confusing delta
//! when rights simply go stale rather than actually change.

use shakmaty::{CastlingSide, Chess, Color, Position};

use super::{DetailValue, Side, Tag};

pub fn detect(pos: &Chess) -> Vec<Tag> {
    let mut tags = Vec::new();

    for color in [Color::White, Color::Black] {
        for (castling_side, rights_name, available_name) in [
            (CastlingSide::King, "tag.castling.rights.kingside", "tag.castling.available.kingside"),
            (CastlingSide::Queen, "tag.castling.rights.queenside", "tag.castling.available.queenside"),
        ] {
            if !pos.castles().has(color, castling_side) {
                continue;
            }

            tags.push(
                Tag::new(rights_name, Side::from(color)).with_detail("rights", DetailValue::Bool(true)),
            );

            if can_castle_now(pos, color, castling_side) {
                tags.push(
                    Tag::new(available_name, Side::from(color))
                        .with_detail("legal", DetailValue::Bool(true)),
                );
            }
        }
    }

    tags
}

/// Whether `color` could legally castle to `side`, either right now (if it is
/// their turn) or on their next turn (checked by replaying the position with
/// the side to move flipped, since castling legality does not depend on
/// whose turn it actually is beyond "is the king in check").
fn can_castle_now(pos: &Chess, color: Color, side: CastlingSide) -> bool {
    let san = match side {
        CastlingSide::King => "O-O",
        CastlingSide::Queen => "O-O-O",
    };

    if pos.turn() == color {
        return pos.legal_moves().iter().any(|mv| crate::rules::move_to_san(pos, mv) == san);
    }

    let fen = crate::rules::fen_from_position(pos);
    let fields: Vec<&str> = fen.split_whitespace().collect();
    if fields.len() < 6 {
        return false;
    }
    let flipped_turn = if color == Color::White { "w" } else { "b" };
    let flipped_fen =
        format!("{} {} {} {} {} {}", fields[0], flipped_turn, fields[2], fields[3], fields[4], fields[5]);

    match crate::rules::position_from_fen(&flipped_fen) {
        Ok(flipped_pos) => {
            flipped_pos.legal_moves().iter().any(|mv| crate::rules::move_to_san(&flipped_pos, mv) == san)
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::position_from_fen;

    #[test]
    fn starting_position_has_no_castling_rights_tags_until_development() {
        const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
        let pos = position_from_fen(START).unwrap();
        let tags = detect(&pos);
        assert!(tags.iter().any(|t| t.name == "tag.castling.rights.kingside"));
        assert!(!tags.iter().any(|t| t.name == "tag.castling.available.kingside"));
    }

    #[test]
    fn reports_available_kingside_castle_when_path_is_clear() {
        let pos = position_from_fen("rnbqk2r/pppp1ppp/5n2/2b1p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4")
            .unwrap();
        let tags = detect(&pos);
        assert!(tags.iter().any(|t| t.name == "tag.castling.available.kingside"));
    }
}
