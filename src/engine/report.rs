//! Per-kind run reports

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Backup,
    Restore,
    Diff,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backup => "backup",
            Self::Restore => "restore",
            Self::Diff => "diff",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    BackedUp,
    /// Created remotely; `new_id` is the id the server assigned
    Created { new_id: String },
    Updated,
    Unchanged,
    Differs { diff: String },
    Skipped { reason: String },
    Failed { reason: String },
    /// Computed, but thrown away because a sibling failed the batch
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdStatus {
    pub id: String,
    pub outcome: Outcome,
}

impl IdStatus {
    pub fn new(id: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            id: id.into(),
            outcome,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub backed_up: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub differs: usize,
    pub skipped: usize,
    pub failed: usize,
    pub discarded: usize,
}

#[derive(Debug, Clone)]
pub struct KindReport {
    pub kind: String,
    pub action: Action,
    pub statuses: Vec<IdStatus>,
    /// Set when the kind as a whole failed
    pub failure: Option<String>,
}

impl KindReport {
    pub fn new(kind: impl Into<String>, action: Action) -> Self {
        Self {
            kind: kind.into(),
            action,
            statuses: Vec::new(),
            failure: None,
        }
    }

    pub fn push(&mut self, id: impl Into<String>, outcome: Outcome) {
        self.statuses.push(IdStatus::new(id, outcome));
    }

    /// True when neither the kind nor any id failed
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
            && !self
                .statuses
                .iter()
                .any(|s| matches!(s.outcome, Outcome::Failed { .. }))
    }

    pub fn outcome_of(&self, id: &str) -> Option<&Outcome> {
        self.statuses.iter().find(|s| s.id == id).map(|s| &s.outcome)
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for status in &self.statuses {
            match status.outcome {
                Outcome::BackedUp => summary.backed_up += 1,
                Outcome::Created { .. } => summary.created += 1,
                Outcome::Updated => summary.updated += 1,
                Outcome::Unchanged => summary.unchanged += 1,
                Outcome::Differs { .. } => summary.differs += 1,
                Outcome::Skipped { .. } => summary.skipped += 1,
                Outcome::Failed { .. } => summary.failed += 1,
                Outcome::Discarded => summary.discarded += 1,
            }
        }
        summary
    }
}

impl fmt::Display for KindReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.summary();
        write!(f, "{} {}: ", self.kind, self.action.as_str())?;
        match self.action {
            Action::Backup => write!(f, "{} backed up", s.backed_up)?,
            Action::Restore => write!(
                f,
                "{} created, {} updated, {} unchanged",
                s.created, s.updated, s.unchanged
            )?,
            Action::Diff => write!(f, "{} differ, {} unchanged", s.differs, s.unchanged)?,
        }
        write!(f, ", {} skipped, {} failed", s.skipped, s.failed)?;
        if s.discarded > 0 {
            write!(f, ", {} discarded", s.discarded)?;
        }
        if let Some(failure) = &self.failure {
            write!(f, " (FAILED: {failure})")?;
        }
        Ok(())
    }
}
