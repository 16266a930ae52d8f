//! Fast deterministic routing and intent coercion, run before any LLM call.

use crate::rules;

use super::types::{AnswerEnvelope, ChatTurn, ClassifiedIntent, FactsCard, IntentKind, UiCommand, UiCommandKind};

/// A trivial deterministic path: "play <san>" against a known root FEN needs
/// no intent classification or investigation at all, and neither does
/// free-form play-intent chatter ("let's play a game") with no move named.
pub fn fast_route(user_text: &str, root_fen: Option<&str>) -> Option<AnswerEnvelope> {
    let trimmed = user_text.trim();
    let lower = trimmed.to_lowercase();

    if let Some(envelope) = fast_route_specific_move(&lower, root_fen) {
        return Some(envelope);
    }
    if is_generic_play_intent(&lower) {
        return Some(play_intent_envelope());
    }
    None
}

fn fast_route_specific_move(lower: &str, root_fen: Option<&str>) -> Option<AnswerEnvelope> {
    let san = lower.strip_prefix("play ").map(str::trim)?;
    let fen = root_fen?;
    if !rules::is_legal_san(fen, san) {
        return None;
    }
    let command = UiCommand {
        command: UiCommandKind::PushMove,
        parameters: serde_json::json!({"move_san": san}),
    };
    Some(AnswerEnvelope {
        facts_card: FactsCard { fen: Some(fen.to_string()), ..Default::default() },
        recommended_move: Some(san.to_string()),
        alternatives: Vec::new(),
        explanation: format!("Playing {san}."),
        ui_commands: vec![command],
        confidence: Some(1.0),
        stop_reason: "fast_route_play".to_string(),
        budgets: Default::default(),
        artifacts_used: Vec::new(),
    })
}

/// Phrases that express an intent to play rather than a specific move. No
/// SAN is named, so there's nothing to push to the board: the answer is a
/// plain system message with `stop_reason = "play_intent_detected"` and no
/// UI mutations.
const PLAY_INTENT_PHRASES: [&str; 6] =
    ["let's play a game", "lets play a game", "let's play", "lets play", "play a game", "start a game"];

fn is_generic_play_intent(lower: &str) -> bool {
    PLAY_INTENT_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

fn play_intent_envelope() -> AnswerEnvelope {
    AnswerEnvelope {
        facts_card: FactsCard::default(),
        recommended_move: None,
        alternatives: Vec::new(),
        explanation: "Sure, let's play. Make your move whenever you're ready.".to_string(),
        ui_commands: Vec::new(),
        confidence: Some(1.0),
        stop_reason: "play_intent_detected".to_string(),
        budgets: Default::default(),
        artifacts_used: Vec::new(),
    }
}

/// If the interpreter produced `game_review` but the goal/summary text reads
/// like a listing/selection request, coerce to `game_select` and derive
/// selection-request labels from the summary.
pub fn coerce_intent(intent: &mut ClassifiedIntent) {
    if intent.kind != IntentKind::GameReview {
        return;
    }
    let text = format!("{} {}", intent.goal, intent.summary).to_lowercase();
    let looks_like_selection = ["which game", "list", "select", "games from", "my games"]
        .iter()
        .any(|kw| text.contains(kw));
    if !looks_like_selection {
        return;
    }
    intent.kind = IntentKind::GameSelect;
    intent.selection_requests = derive_selection_requests(&text);
}

fn derive_selection_requests(text: &str) -> Vec<String> {
    const LABELS: [(&str, &str); 4] = [
        ("last_game", "last game"),
        ("won_game", "won"),
        ("rapid_game", "rapid"),
        ("played_as_black", "as black"),
    ];
    let mut labels: Vec<String> = LABELS
        .iter()
        .filter(|(_, keyword)| text.contains(keyword))
        .map(|(label, _)| label.to_string())
        .collect();
    if labels.is_empty() {
        labels.push("last_game".to_string());
    }
    labels
}

/// Truncate chat history to the last `window` turns, each content-truncated
/// so a single long message can't blow the LLM context budget.
pub fn windowed_history(history: &[ChatTurn], window: usize, max_chars_per_turn: usize) -> Vec<ChatTurn> {
    let start = history.len().saturating_sub(window);
    history[start..]
        .iter()
        .map(|turn| ChatTurn {
            role: turn.role.clone(),
            content: truncate_chars(&turn.content, max_chars_per_turn),
        })
        .collect()
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[test]
    fn fast_routes_a_legal_play_command() {
        let envelope = fast_route("play e4", Some(START)).unwrap();
        assert_eq!(envelope.recommended_move.as_deref(), Some("e4"));
    }

    #[test]
    fn fast_route_declines_illegal_moves() {
        assert!(fast_route("play e5", Some(START)).is_none());
    }

    #[test]
    fn play_intent_chatter_routes_with_no_board_mutation() {
        let envelope = fast_route("let's play a game", Some(START)).unwrap();
        assert_eq!(envelope.stop_reason, "play_intent_detected");
        assert!(envelope.ui_commands.is_empty());
        assert!(envelope.recommended_move.is_none());
    }

    #[test]
    fn play_intent_chatter_routes_without_a_root_fen() {
        let envelope = fast_route("let's play a game", None).unwrap();
        assert_eq!(envelope.stop_reason, "play_intent_detected");
        assert!(envelope.ui_commands.is_empty());
    }

    #[test]
    fn coerces_game_review_to_game_select_when_listing() {
        let mut intent = ClassifiedIntent {
            kind: IntentKind::GameReview,
            mode: super::super::types::Mode::Discuss,
            goal: "show my games".into(),
            summary: "which game from last week did I win as black".into(),
            root_fen: None,
            investigation_requests: Vec::new(),
            selection_requests: Vec::new(),
            username: None,
            platform: None,
        };
        coerce_intent(&mut intent);
        assert_eq!(intent.kind, IntentKind::GameSelect);
        assert!(intent.selection_requests.contains(&"won_game".to_string()));
    }

    #[test]
    fn truncates_history_window() {
        let history: Vec<ChatTurn> =
            (0..20).map(|i| ChatTurn { role: "user".into(), content: format!("turn {i}") }).collect();
        let windowed = windowed_history(&history, 10, 100);
        assert_eq!(windowed.len(), 10);
    }
}
