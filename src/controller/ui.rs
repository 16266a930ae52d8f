//! UI command surface validation: only the closed command set survives, and
//! mutating commands are stripped outside PLAY mode unless the caller opted
//! in.

use super::types::{Mode, UiCommand};

pub fn validate(commands: Vec<UiCommand>, mode: Mode, allow_ui_mutations: bool) -> Vec<UiCommand> {
    commands
        .into_iter()
        .filter(|cmd| mode == Mode::Play || allow_ui_mutations || !cmd.command.is_mutating())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::types::UiCommandKind;
    use serde_json::json;

    fn cmd(kind: UiCommandKind) -> UiCommand {
        UiCommand { command: kind, parameters: json!({}) }
    }

    #[test]
    fn strips_mutating_commands_outside_play_without_opt_in() {
        let commands = vec![cmd(UiCommandKind::PushMove), cmd(UiCommandKind::Navigate)];
        let validated = validate(commands, Mode::Discuss, false);
        assert_eq!(validated.len(), 1);
        assert_eq!(validated[0].command, UiCommandKind::Navigate);
    }

    #[test]
    fn keeps_mutating_commands_in_play_mode() {
        let commands = vec![cmd(UiCommandKind::PushMove)];
        let validated = validate(commands, Mode::Play, false);
        assert_eq!(validated.len(), 1);
    }

    #[test]
    fn keeps_mutating_commands_when_explicitly_allowed() {
        let commands = vec![cmd(UiCommandKind::SetFen)];
        let validated = validate(commands, Mode::Analyze, true);
        assert_eq!(validated.len(), 1);
    }
}
