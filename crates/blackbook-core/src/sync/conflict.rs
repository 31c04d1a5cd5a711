//! Conflict resolution protocol
//!
//! Each drifted pair is presented once and resolved by exactly one
//! [`ConflictAction`]. Where the decision comes from is the caller's
//! business: the CLI asks interactively, tests replay a script. The
//! configured [`DriftPolicy`] may settle one-sided drift before the prompt
//! is consulted; both-changed conflicts always reach the prompt.

use std::collections::VecDeque;

use serde::Serialize;

use super::module::Direction;
use super::status::DriftKind;
use crate::config::DriftPolicy;
use crate::{Error, Result};

/// A drifted pair awaiting a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub file_name: String,
    /// `tool:instance`
    pub instance: String,
    /// `None` when the pair has never been synced
    pub drift_kind: Option<DriftKind>,
    pub diff: Option<String>,
}

/// The only legal resolutions of a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictAction {
    /// Copy source over target
    ForceForward,
    /// Copy target back over source
    ForcePullback,
    /// Leave both sides and the baseline alone
    Skip,
}

impl ConflictAction {
    /// Copy direction, `None` for [`ConflictAction::Skip`].
    pub fn direction(self) -> Option<Direction> {
        match self {
            Self::ForceForward => Some(Direction::Forward),
            Self::ForcePullback => Some(Direction::Pullback),
            Self::Skip => None,
        }
    }
}

impl std::fmt::Display for ConflictAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ForceForward => write!(f, "force-forward"),
            Self::ForcePullback => write!(f, "force-pullback"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

/// Source of conflict decisions.
pub trait ConflictPrompt {
    fn decide(&mut self, conflict: &Conflict) -> Result<ConflictAction>;
}

/// Answers every conflict with the same action.
#[derive(Debug, Clone, Copy)]
pub struct FixedPrompt(pub ConflictAction);

impl ConflictPrompt for FixedPrompt {
    fn decide(&mut self, _conflict: &Conflict) -> Result<ConflictAction> {
        Ok(self.0)
    }
}

/// Refuses to decide; used when nobody is there to ask.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefusingPrompt;

impl ConflictPrompt for RefusingPrompt {
    fn decide(&mut self, conflict: &Conflict) -> Result<ConflictAction> {
        Err(Error::ConflictUnresolved {
            asset: conflict.file_name.clone(),
            instance: conflict.instance.clone(),
        })
    }
}

/// Replays a fixed sequence of decisions and records what it was shown.
///
/// Once the script runs out every further conflict is skipped.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPrompt {
    script: VecDeque<ConflictAction>,
    presented: Vec<Conflict>,
}

impl ScriptedPrompt {
    pub fn new(script: impl IntoIterator<Item = ConflictAction>) -> Self {
        Self {
            script: script.into_iter().collect(),
            presented: Vec::new(),
        }
    }

    /// Every conflict presented so far, in order.
    pub fn presented(&self) -> &[Conflict] {
        &self.presented
    }
}

impl ConflictPrompt for ScriptedPrompt {
    fn decide(&mut self, conflict: &Conflict) -> Result<ConflictAction> {
        self.presented.push(conflict.clone());
        Ok(self.script.pop_front().unwrap_or(ConflictAction::Skip))
    }
}

/// The action `policy` takes without asking, if any.
pub fn policy_action(policy: DriftPolicy, drift_kind: Option<DriftKind>) -> Option<ConflictAction> {
    match (policy, drift_kind?) {
        (DriftPolicy::Auto, DriftKind::SourceChanged) => Some(ConflictAction::ForceForward),
        (DriftPolicy::Auto, DriftKind::TargetChanged) => Some(ConflictAction::ForcePullback),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn conflict() -> Conflict {
        Conflict {
            file_name: "CLAUDE.md".into(),
            instance: "claude:default".into(),
            drift_kind: Some(DriftKind::BothChanged),
            diff: None,
        }
    }

    #[rstest]
    #[case(DriftPolicy::Auto, Some(DriftKind::SourceChanged), Some(ConflictAction::ForceForward))]
    #[case(DriftPolicy::Auto, Some(DriftKind::TargetChanged), Some(ConflictAction::ForcePullback))]
    #[case(DriftPolicy::Auto, Some(DriftKind::BothChanged), None)]
    #[case(DriftPolicy::Auto, None, None)]
    #[case(DriftPolicy::Prompt, Some(DriftKind::SourceChanged), None)]
    #[case(DriftPolicy::Prompt, Some(DriftKind::TargetChanged), None)]
    fn policy_never_decides_conflicts(
        #[case] policy: DriftPolicy,
        #[case] kind: Option<DriftKind>,
        #[case] expected: Option<ConflictAction>,
    ) {
        assert_eq!(policy_action(policy, kind), expected);
    }

    #[test]
    fn scripted_prompt_replays_then_skips() {
        let mut prompt = ScriptedPrompt::new([ConflictAction::ForcePullback]);
        assert_eq!(prompt.decide(&conflict()).unwrap(), ConflictAction::ForcePullback);
        assert_eq!(prompt.decide(&conflict()).unwrap(), ConflictAction::Skip);
        assert_eq!(prompt.presented().len(), 2);
    }

    #[test]
    fn refusing_prompt_reports_unresolved() {
        let err = RefusingPrompt.decide(&conflict()).unwrap_err();
        assert!(matches!(err, Error::ConflictUnresolved { .. }));
        assert!(err.to_string().contains("CLAUDE.md"));
    }

    #[test]
    fn skip_has_no_direction() {
        assert_eq!(ConflictAction::Skip.direction(), None);
        assert_eq!(ConflictAction::ForceForward.direction(), Some(Direction::Forward));
    }
}
