//! Builds a [`Goal`] predicate from a step's JSON parameters.
//!
//! The goal-search examples span very different shapes ("can castle next",
//! "reach a material threshold", "a piece reaches a square"), so rather than
//! forcing every caller through one schema, a step names a `goal_kind` and
//! supplies the parameters that kind needs. Unrecognized kinds are rejected
//! up front so a typo surfaces at plan-build time instead of as a silently
//! never-satisfied goal.

use std::collections::BTreeMap;

use serde_json::Value;
use shakmaty::{Color, Position, Role, Square};

use crate::investigator::Goal;

use super::types::ExecutorError;

pub fn goal_from_params(parameters: &BTreeMap<String, Value>) -> Result<Goal, ExecutorError> {
    let kind = parameters
        .get("goal_kind")
        .and_then(Value::as_str)
        .ok_or_else(|| ExecutorError::InvalidParameter("missing goal_kind".to_string()))?;

    match kind {
        "checkmate" => Ok(Goal::new("checkmate", |pos| pos.is_checkmate())),
        "stalemate" => Ok(Goal::new("stalemate", |pos| pos.is_stalemate())),
        "give_check" => Ok(Goal::new("give check", |pos| pos.is_check())),
        "can_castle" => {
            let color = parse_color(parameters)?;
            let kingside = parameters.get("side").and_then(Value::as_str) != Some("queenside");
            let label = format!("{color:?} can castle {}", if kingside { "kingside" } else { "queenside" });
            Ok(Goal::new(label, move |pos| {
                let castles = pos.castles();
                if kingside {
                    castles.has(color, shakmaty::CastlingSide::KingSide)
                } else {
                    castles.has(color, shakmaty::CastlingSide::QueenSide)
                }
            }))
        }
        "material_threshold" => {
            let min_cp = parameters
                .get("min_cp")
                .and_then(Value::as_i64)
                .ok_or_else(|| ExecutorError::InvalidParameter("material_threshold needs min_cp".to_string()))?
                as i32;
            let label = format!("material balance at least {min_cp}cp");
            Ok(Goal::new(label, move |pos| crate::rules::material_balance(pos) >= min_cp))
        }
        "piece_reaches_square" => {
            let role = parse_role(parameters)?;
            let color = parse_color(parameters)?;
            let square_str = parameters
                .get("square")
                .and_then(Value::as_str)
                .ok_or_else(|| ExecutorError::InvalidParameter("piece_reaches_square needs square".to_string()))?;
            let square: Square = square_str
                .parse()
                .map_err(|_| ExecutorError::InvalidParameter(format!("bad square {square_str}")))?;
            let label = format!("{color:?} {role:?} reaches {square_str}");
            Ok(Goal::new(label, move |pos| {
                pos.board().piece_at(square).is_some_and(|p| p.color == color && p.role == role)
            }))
        }
        other => Err(ExecutorError::InvalidParameter(format!("unknown goal_kind {other}"))),
    }
}

fn parse_color(parameters: &BTreeMap<String, Value>) -> Result<Color, ExecutorError> {
    match parameters.get("color").and_then(Value::as_str) {
        Some("white") => Ok(Color::White),
        Some("black") => Ok(Color::Black),
        _ => Err(ExecutorError::InvalidParameter("missing or invalid color".to_string())),
    }
}

fn parse_role(parameters: &BTreeMap<String, Value>) -> Result<Role, ExecutorError> {
    match parameters.get("piece_type").and_then(Value::as_str).map(str::to_lowercase).as_deref() {
        Some("pawn") => Ok(Role::Pawn),
        Some("knight") => Ok(Role::Knight),
        Some("bishop") => Ok(Role::Bishop),
        Some("rook") => Ok(Role::Rook),
        Some("queen") => Ok(Role::Queen),
        Some("king") => Ok(Role::King),
        _ => Err(ExecutorError::InvalidParameter("missing or invalid piece_type".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> BTreeMap<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn builds_material_threshold_goal() {
        let goal = goal_from_params(&params(json!({"goal_kind": "material_threshold", "min_cp": 300}))).unwrap();
        let pos = crate::rules::position_from_fen(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        )
        .unwrap();
        assert!(!(goal.predicate)(&pos));
    }

    #[test]
    fn rejects_unknown_goal_kind() {
        let err = goal_from_params(&params(json!({"goal_kind": "nonsense"})));
        assert!(err.is_err());
    }

    #[test]
    fn builds_piece_reaches_square_goal() {
        let goal = goal_from_params(&params(json!({
            "goal_kind": "piece_reaches_square",
            "piece_type": "knight",
            "color": "white",
            "square": "f3"
        })))
        .unwrap();
        let pos = crate::rules::position_from_fen(
            "rnbqkbnr/pppppppp/8/8/8/5N2/PPPPPPPP/RNBQKB1R b KQkq - 0 1",
        )
        .unwrap();
        assert!((goal.predicate)(&pos));
    }
}
