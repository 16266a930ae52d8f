//! Structural tag detector.
//!
//! Every detector here is a pure function of a `shakmaty::Chess` position:
//! same position in, same tags out, regardless of how it was reached. That
//! purity is what lets callers diff two tag sets and trust the result.

pub mod activity;
pub mod castling;
pub mod center;
pub mod diagonals;
pub mod files;
pub mod king_safety;
pub mod knight_rim;
pub mod levers;
pub mod outposts;
pub mod pawns;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shakmaty::Color;

use crate::rules::{self, RulesResult};

/// Which side(s) a tag is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    White,
    Black,
    Both,
}

impl From<Color> for Side {
    fn from(c: Color) -> Self {
        match c {
            Color::White => Side::White,
            Color::Black => Side::Black,
        }
    }
}

/// A free-form detail value; kept intentionally small (no nested objects)
/// because every consumer of `details` only ever reads scalars or lists of
/// scalars back out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum DetailValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<String>),
}

/// A structural observation on a position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    pub name: String,
    pub side: Side,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pieces: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub squares: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, DetailValue>>,
}

impl Tag {
    pub fn new(name: impl Into<String>, side: Side) -> Self {
        Self { name: name.into(), side, pieces: None, squares: None, details: None }
    }

    pub fn with_pieces(mut self, pieces: Vec<String>) -> Self {
        self.pieces = Some(pieces);
        self
    }

    pub fn with_squares(mut self, squares: Vec<String>) -> Self {
        self.squares = Some(squares);
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: DetailValue) -> Self {
        self.details.get_or_insert_with(BTreeMap::new).insert(key.into(), value);
        self
    }
}

/// Run every tag family detector over a FEN and return the union, both
/// colors. Deterministic ordering: detectors run in a fixed sequence and
/// each detector sorts its own `pieces`/`squares` output, so two calls on
/// the same FEN always produce byte-identical results.
///
/// Threat tags are folded in here too: the threat detector is a separate
/// module because it is also consumed directly by the SEE gate, but its
/// output is structurally a `Tag` meant to land in the same tag set, so
/// every consumer of `detect_all_tags` (themes ranking, facts-card tag
/// samples) sees tactical tags alongside
/// structural ones without needing to know about `crate::threats`.
pub fn detect_all_tags(fen: &str) -> RulesResult<Vec<Tag>> {
    let pos = rules::position_from_fen(fen)?;
    let mut tags = Vec::new();
    tags.extend(files::detect(&pos));
    tags.extend(levers::detect(&pos));
    tags.extend(diagonals::detect(&pos));
    tags.extend(outposts::detect(&pos));
    tags.extend(center::detect(&pos));
    tags.extend(king_safety::detect(&pos));
    tags.extend(castling::detect(&pos));
    tags.extend(activity::detect(&pos));
    tags.extend(pawns::detect(&pos));
    tags.extend(knight_rim::detect(&pos));
    for color in [Color::White, Color::Black] {
        tags.extend(crate::threats::detect_all_threats(&pos, color).into_iter().map(|t| t.tag));
    }
    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_position_yields_no_hole_tags() {
        const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
        let tags = detect_all_tags(START).unwrap();
        assert!(!tags.iter().any(|t| t.name.starts_with("tag.") && t.name.contains("hole")));
    }

    #[test]
    fn detected_tags_are_deterministic_across_calls() {
        const FEN: &str = "r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4";
        let a = detect_all_tags(FEN).unwrap();
        let b = detect_all_tags(FEN).unwrap();
        assert_eq!(a, b);
    }
}
