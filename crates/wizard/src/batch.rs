//! Staged multi-record wizard.
//!
//! ```text
//! Sizing ──size(n>0)──▶ Collecting ──next()×n──▶ ReadyToCommit ──confirm()──▶ Committing
//!   │                                                                            │
//!   └─size(0)──▶ Empty                                      commit() ──▶ Done | Failed{index}
//!                                                                                │
//!                                         Failed ──confirm()──▶ Committing (resume at index)
//! ```
//!
//! `index() == staged().len()` always holds. Drafts are committed in staged
//! order, one call at a time, stopping at the first failure.

use std::fmt;

use examdesk_gateway::{EntityDraft, GatewayError, CREATE_FIELDS, DELETE_FIELDS, FIELD_ID, FIELD_YEAR};

use crate::error::{CommitError, WizardError};
use crate::store::RecordStore;

/// Which mutation the batch performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardKind {
    Create,
    Delete,
}

impl WizardKind {
    /// Fields collected per record, in prompt order.
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            Self::Create => &CREATE_FIELDS,
            Self::Delete => &DELETE_FIELDS,
        }
    }

    /// Destructive batches need an explicit yes right before confirming.
    pub fn requires_confirmation(self) -> bool {
        matches!(self, Self::Delete)
    }

    pub fn empty_draft(self) -> EntityDraft {
        EntityDraft::with_fields(self.fields())
    }

    fn validate(self, draft: &EntityDraft) -> Result<(), WizardError> {
        if let Some(extra) = draft.field_names().find(|name| !self.fields().contains(name)) {
            return Err(WizardError::validation(extra, "unknown field"));
        }
        match self {
            Self::Create => Ok(()),
            Self::Delete => {
                let year = draft.get(FIELD_YEAR).unwrap_or_default();
                if year.trim().is_empty() {
                    Err(WizardError::validation(FIELD_YEAR, "year is required"))
                } else {
                    Ok(())
                }
            }
        }
    }

    fn apply<S: RecordStore + ?Sized>(self, store: &S, draft: &EntityDraft) -> Result<(), GatewayError> {
        match self {
            Self::Create => store.create(draft),
            Self::Delete => {
                let id = draft.get(FIELD_ID).unwrap_or_default().trim();
                let year = draft.get(FIELD_YEAR).unwrap_or_default().trim();
                store.delete(id, year)
            }
        }
    }
}

impl fmt::Display for WizardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the batch size.
    Sizing,
    /// Editing draft `index()` of `target()`.
    Collecting,
    ReadyToCommit,
    /// Confirmed; `commit` may run.
    Committing,
    Done,
    /// Stopped at `index`; drafts before it are committed.
    Failed { index: usize },
    /// Sized to zero. Nothing to do.
    Empty,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sizing => write!(f, "sizing"),
            Self::Collecting => write!(f, "collecting"),
            Self::ReadyToCommit => write!(f, "ready to commit"),
            Self::Committing => write!(f, "committing"),
            Self::Done => write!(f, "done"),
            Self::Failed { index } => write!(f, "failed at record {}", index + 1),
            Self::Empty => write!(f, "empty"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchWizard {
    kind: WizardKind,
    phase: Phase,
    target: usize,
    draft: EntityDraft,
    staged: Vec<EntityDraft>,
    /// Drafts already accepted by the server.
    committed: usize,
}

impl BatchWizard {
    pub fn new(kind: WizardKind) -> Self {
        Self {
            kind,
            phase: Phase::Sizing,
            target: 0,
            draft: kind.empty_draft(),
            staged: Vec::new(),
            committed: 0,
        }
    }

    pub fn kind(&self) -> WizardKind {
        self.kind
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn target(&self) -> usize {
        self.target
    }

    /// Number of drafts staged so far.
    pub fn index(&self) -> usize {
        self.staged.len()
    }

    pub fn staged(&self) -> &[EntityDraft] {
        &self.staged
    }

    pub fn current_draft(&self) -> &EntityDraft {
        &self.draft
    }

    pub fn committed(&self) -> usize {
        self.committed
    }

    pub fn is_complete(&self) -> bool {
        self.target > 0 && self.index() == self.target
    }

    pub fn requires_confirmation(&self) -> bool {
        self.kind.requires_confirmation()
    }

    /// Set the batch size. Allowed until the first draft is staged.
    pub fn size(&mut self, n: usize) -> Result<(), WizardError> {
        let resizable = match self.phase {
            Phase::Sizing => true,
            Phase::Collecting => self.staged.is_empty(),
            _ => false,
        };
        if !resizable {
            return Err(self.invalid("size"));
        }
        self.target = n;
        self.phase = if n == 0 { Phase::Empty } else { Phase::Collecting };
        log::debug!("{} wizard sized to {n}", self.kind);
        Ok(())
    }

    pub fn set_field(&mut self, name: &str, value: impl Into<String>) -> Result<(), WizardError> {
        if self.phase != Phase::Collecting {
            return Err(self.invalid("set_field"));
        }
        if self.draft.set(name, value) {
            Ok(())
        } else {
            Err(WizardError::validation(name, "unknown field"))
        }
    }

    /// Validate the current draft and stage it.
    ///
    /// On a validation error neither the draft nor the staged list changes.
    pub fn next(&mut self) -> Result<(), WizardError> {
        if self.phase != Phase::Collecting {
            return Err(self.invalid("next"));
        }
        self.kind.validate(&self.draft)?;

        let draft = std::mem::replace(&mut self.draft, self.kind.empty_draft());
        self.staged.push(draft);
        if self.staged.len() == self.target {
            self.phase = Phase::ReadyToCommit;
        }
        log::debug!("staged {} record {}/{}", self.kind, self.staged.len(), self.target);
        Ok(())
    }

    /// Replace the current draft with `draft` and stage it.
    ///
    /// A rejected draft leaves the wizard untouched.
    pub fn next_with(&mut self, draft: EntityDraft) -> Result<(), WizardError> {
        if self.phase != Phase::Collecting {
            return Err(self.invalid("next"));
        }
        self.kind.validate(&draft)?;
        self.draft = draft;
        self.next()
    }

    /// Arm the commit. Also re-arms after a failure.
    pub fn confirm(&mut self) -> Result<(), WizardError> {
        match self.phase {
            Phase::ReadyToCommit | Phase::Failed { .. } => {
                self.phase = Phase::Committing;
                Ok(())
            }
            _ => Err(self.invalid("confirm")),
        }
    }

    /// Send every uncommitted draft, in order, one call at a time.
    ///
    /// Returns how many drafts this call committed. The first failure moves
    /// the wizard to `Failed` and nothing after it is sent; earlier drafts
    /// are not rolled back.
    pub fn commit<S: RecordStore + ?Sized>(&mut self, store: &S) -> Result<usize, WizardError> {
        if self.phase != Phase::Committing {
            return Err(self.invalid("commit"));
        }

        let start = self.committed;
        for index in start..self.staged.len() {
            if let Err(error) = self.kind.apply(store, &self.staged[index]) {
                log::warn!("{} record {} failed: {error}", self.kind, index + 1);
                self.phase = Phase::Failed { index };
                return Err(WizardError::Commit(CommitError { index, error }));
            }
            self.committed = index + 1;
            log::info!("{} record {}/{} committed", self.kind, index + 1, self.staged.len());
        }

        self.phase = Phase::Done;
        Ok(self.committed - start)
    }

    fn invalid(&self, action: &'static str) -> WizardError {
        WizardError::InvalidTransition {
            action,
            phase: self.phase,
        }
    }
}
