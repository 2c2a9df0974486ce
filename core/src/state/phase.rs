use serde::{Deserialize, Serialize};

use crate::error::RunError;

/// Run lifecycle phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Plan,
    Execute,
    Replan,
    Respond,
    Clarify,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::Execute => "execute",
            Self::Replan => "replan",
            Self::Respond => "respond",
            Self::Clarify => "clarify",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase transition rules.
pub struct PhaseTransition;

impl PhaseTransition {
    /// Check that `from -> to` is an edge of the run state machine.
    pub fn validate(from: Phase, to: Phase) -> Result<(), RunError> {
        if Self::is_terminal(from) {
            return Err(RunError::FromTerminalPhase(from));
        }

        let is_valid = match (from, to) {
            (_, Phase::Plan) => false,
            (Phase::Plan, _) => true,
            (Phase::Execute, _) => true,
            (Phase::Replan, _) => true,
            _ => false,
        };

        if is_valid {
            Ok(())
        } else {
            Err(RunError::InvalidTransition { from, to })
        }
    }

    pub fn is_terminal(phase: Phase) -> bool {
        matches!(phase, Phase::Respond | Phase::Clarify)
    }

    pub fn phase_description(phase: Phase) -> &'static str {
        match phase {
            Phase::Plan => "building the initial task list",
            Phase::Execute => "running one ready task",
            Phase::Replan => "revising the task list",
            Phase::Respond => "synthesizing the final answer",
            Phase::Clarify => "asking the caller for clarification",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        assert!(PhaseTransition::validate(Phase::Plan, Phase::Execute).is_ok());
        assert!(PhaseTransition::validate(Phase::Plan, Phase::Clarify).is_ok());
        assert!(PhaseTransition::validate(Phase::Execute, Phase::Execute).is_ok());
        assert!(PhaseTransition::validate(Phase::Execute, Phase::Replan).is_ok());
        assert!(PhaseTransition::validate(Phase::Replan, Phase::Execute).is_ok());
        assert!(PhaseTransition::validate(Phase::Replan, Phase::Respond).is_ok());
    }

    #[test]
    fn test_invalid_transitions() {
        assert_eq!(
            PhaseTransition::validate(Phase::Execute, Phase::Plan),
            Err(RunError::InvalidTransition {
                from: Phase::Execute,
                to: Phase::Plan
            })
        );
        assert_eq!(
            PhaseTransition::validate(Phase::Respond, Phase::Execute),
            Err(RunError::FromTerminalPhase(Phase::Respond))
        );
        assert!(PhaseTransition::validate(Phase::Clarify, Phase::Respond).is_err());
    }

    #[test]
    fn test_terminal_phases() {
        assert!(PhaseTransition::is_terminal(Phase::Respond));
        assert!(PhaseTransition::is_terminal(Phase::Clarify));
        assert!(!PhaseTransition::is_terminal(Phase::Replan));
    }
}
