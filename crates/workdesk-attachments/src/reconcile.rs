//! Reconciliation rule.
//!
//! Evaluated whenever the parent id becomes known, the pending queue changes,
//! or a commit settles. Pure: the session applies the decision.

use workdesk_core::ParentId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Start a commit of the current queue snapshot against this parent.
    Commit(ParentId),
    Skip(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    SessionClosed,
    ParentUnknown,
    CommitInFlight,
    NothingPending,
}

pub fn evaluate(
    parent_id: Option<&ParentId>,
    commit_in_flight: bool,
    pending_count: usize,
    closed: bool,
) -> Decision {
    if closed {
        return Decision::Skip(SkipReason::SessionClosed);
    }
    let Some(parent_id) = parent_id else {
        return Decision::Skip(SkipReason::ParentUnknown);
    };
    if commit_in_flight {
        return Decision::Skip(SkipReason::CommitInFlight);
    }
    if pending_count == 0 {
        return Decision::Skip(SkipReason::NothingPending);
    }
    Decision::Commit(parent_id.clone())
}
