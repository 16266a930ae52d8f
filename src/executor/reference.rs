//! Reference resolution: `step:N.<dotted-path>` and `state:NAME`, resolved
//! at read time against the executor's running results/state_slots. Any
//! reference that fails to resolve falls back to the caller-supplied root
//! FEN (for FEN slots) or an empty value (for line slots), rather than
//! erroring the whole plan run.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use crate::plan::Reference;

pub fn resolve_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

/// Resolve a `fen_ref`-style parameter string to a concrete FEN.
pub fn resolve_fen(
    results: &BTreeMap<u32, Value>,
    state_slots: &HashMap<String, String>,
    raw: &str,
    fallback_fen: &str,
) -> String {
    match Reference::parse(raw) {
        Some(Reference::State { name }) => {
            state_slots.get(&name).cloned().unwrap_or_else(|| fallback_fen.to_string())
        }
        Some(Reference::Step { step_number, path }) => results
            .get(&step_number)
            .and_then(|v| resolve_path(v, &path))
            .and_then(Value::as_str)
            .map(String::from)
            .unwrap_or_else(|| fallback_fen.to_string()),
        None => raw.to_string(),
    }
}

/// Resolve a `line_ref`-style parameter string to a SAN move list, plus an
/// optional move to prepend when the line came from an `investigate_move`
/// step's `pv_after_move` (that PV starts after the player's move, so the
/// sequence is incomplete from the root FEN without it).
pub fn resolve_line(results: &BTreeMap<u32, Value>, raw: &str) -> (Option<String>, Vec<String>) {
    let Some(Reference::Step { step_number, path }) = Reference::parse(raw) else {
        return (None, Vec::new());
    };
    let Some(result) = results.get(&step_number) else {
        return (None, Vec::new());
    };
    let Some(value) = resolve_path(result, &path) else {
        return (None, Vec::new());
    };
    let moves: Vec<String> = serde_json::from_value(value.clone()).unwrap_or_default();
    let prepend = if path == "pv_after_move" {
        result.get("player_move").and_then(Value::as_str).map(String::from)
    } else {
        None
    };
    (prepend, moves)
}

/// Resolve a reference to a list of candidate lines (`witnesses`).
pub fn resolve_witnesses(results: &BTreeMap<u32, Value>, raw: &str) -> Vec<Vec<String>> {
    let Some(Reference::Step { step_number, path }) = Reference::parse(raw) else {
        return Vec::new();
    };
    results
        .get(&step_number)
        .and_then(|v| resolve_path(v, &path))
        .and_then(|v| serde_json::from_value::<Vec<Vec<String>>>(v.clone()).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_nested_step_path() {
        let mut results = BTreeMap::new();
        results.insert(1u32, json!({"goal_search_results": {"witness_line_san": ["Nf3", "Nc6"]}}));
        let fen = resolve_fen(&results, &HashMap::new(), "step:1.goal_search_results.witness_line_san", "fallback");
        // The path resolves to an array, not a string, so this falls back.
        assert_eq!(fen, "fallback");
    }

    #[test]
    fn resolves_state_slot() {
        let mut slots = HashMap::new();
        slots.insert("after_castle".to_string(), "fen-here".to_string());
        let fen = resolve_fen(&BTreeMap::new(), &slots, "state:after_castle", "fallback");
        assert_eq!(fen, "fen-here");
    }

    #[test]
    fn missing_reference_falls_back() {
        let fen = resolve_fen(&BTreeMap::new(), &HashMap::new(), "state:missing", "fallback");
        assert_eq!(fen, "fallback");
    }

    #[test]
    fn resolves_pv_after_move_with_prepended_player_move() {
        let mut results = BTreeMap::new();
        results.insert(2u32, json!({"player_move": "e4", "pv_after_move": ["e5", "Nf3"]}));
        let (prepend, moves) = resolve_line(&results, "step:2.pv_after_move");
        assert_eq!(prepend, Some("e4".to_string()));
        assert_eq!(moves, vec!["e5".to_string(), "Nf3".to_string()]);
    }
}
