//! Shared plan/step data model: `ExecutionStep`/`ExecutionPlan`.
//!
//! The closed `action_type` set is a tagged enum rather than a late-bound
//! string, giving exhaustive dispatch at every call site; the string form
//! only appears at the JSON boundary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    AskClarification,
    InvestigatePosition,
    InvestigateMove,
    InvestigateTarget,
    ApplyLine,
    SelectLine,
    SaveState,
    ScoreState,
    SelectState,
    AuditLine,
    RetryInvestigateTarget,
    InvestigateGame,
    Synthesize,
    Answer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionStep {
    pub step_number: u32,
    pub action_type: ActionType,
    pub parameters: BTreeMap<String, Value>,
    pub purpose: String,
    pub tool: Option<String>,
    pub expected_output: Option<String>,
    pub status: StepStatus,
}

impl ExecutionStep {
    pub fn new(action_type: ActionType, purpose: impl Into<String>) -> Self {
        Self {
            step_number: 0,
            action_type,
            parameters: BTreeMap::new(),
            purpose: purpose.into(),
            tool: None,
            expected_output: None,
            status: StepStatus::Pending,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub plan_id: String,
    pub original_intent: String,
    pub discussion_agenda: String,
    pub steps: Vec<ExecutionStep>,
    pub metadata: BTreeMap<String, Value>,
}

impl ExecutionPlan {
    /// Renumber every step densely as 1..=N.
    pub fn renumber(&mut self) {
        for (i, step) in self.steps.iter_mut().enumerate() {
            step.step_number = i as u32 + 1;
        }
    }

    pub fn disables_candidate_injection(&self) -> bool {
        self.metadata.get("disable_candidate_injection").and_then(Value::as_bool).unwrap_or(false)
    }
}

/// A `step:N.<path>` or `state:NAME` reference, parsed from its wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Step { step_number: u32, path: String },
    State { name: String },
}

impl Reference {
    pub fn parse(raw: &str) -> Option<Reference> {
        if let Some(rest) = raw.strip_prefix("step:") {
            let (num, path) = rest.split_once('.')?;
            let step_number: u32 = num.parse().ok()?;
            Some(Reference::Step { step_number, path: path.to_string() })
        } else {
            raw.strip_prefix("state:").map(|name| Reference::State { name: name.to_string() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renumbers_densely_after_removal() {
        let mut plan = ExecutionPlan {
            plan_id: "p1".into(),
            original_intent: "x".into(),
            discussion_agenda: String::new(),
            steps: vec![
                ExecutionStep::new(ActionType::InvestigatePosition, "a"),
                ExecutionStep::new(ActionType::InvestigateMove, "b"),
            ],
            metadata: BTreeMap::new(),
        };
        plan.steps.remove(0);
        plan.renumber();
        assert_eq!(plan.steps[0].step_number, 1);
    }

    #[test]
    fn parses_step_reference() {
        let r = Reference::parse("step:3.goal_search_results.witness_line_san").unwrap();
        assert_eq!(r, Reference::Step { step_number: 3, path: "goal_search_results.witness_line_san".into() });
    }

    #[test]
    fn parses_state_reference() {
        let r = Reference::parse("state:after_castle").unwrap();
        assert_eq!(r, Reference::State { name: "after_castle".into() });
    }
}
