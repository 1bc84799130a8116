/// Status resolution
///
/// Challenges and ideas carry an optional tri-state `approvalStatus`, and
/// ideas additionally carry a legacy free-form `status` string. This module
/// is the single place those fields become an `ApprovalStatus`; filters,
/// counters and the notification feed all call through it.
use crate::models::{ApprovalStatus, Challenge, Idea};
use serde::{Deserialize, Serialize};

/// Canonical status of a challenge
///
/// Challenges that predate the approval feature are treated as live.
pub fn resolve_challenge_status(challenge: &Challenge) -> ApprovalStatus {
    challenge.approval_status.unwrap_or(ApprovalStatus::Approved)
}

/// Canonical status of an idea
///
/// The explicit flag wins. Otherwise the legacy status maps as
/// Accepted → Approved, Declined → Rejected, In Review / Pending → Pending,
/// and anything else (including stage names and absence) → Approved.
pub fn resolve_idea_status(idea: &Idea) -> ApprovalStatus {
    if let Some(status) = idea.approval_status {
        return status;
    }

    match idea.status.as_deref().map(str::trim) {
        Some("Accepted") => ApprovalStatus::Approved,
        Some("Declined") => ApprovalStatus::Rejected,
        Some("In Review") | Some("Pending") => ApprovalStatus::Pending,
        _ => ApprovalStatus::Approved,
    }
}

/// Challenges whose resolved status matches
pub fn filter_challenges(
    challenges: &[Challenge],
    status: ApprovalStatus,
) -> impl Iterator<Item = &Challenge> {
    challenges
        .iter()
        .filter(move |c| resolve_challenge_status(c) == status)
}

/// Ideas whose resolved status matches
pub fn filter_ideas(ideas: &[Idea], status: ApprovalStatus) -> impl Iterator<Item = &Idea> {
    ideas
        .iter()
        .filter(move |i| resolve_idea_status(i) == status)
}

/// Tally of items by resolved status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

impl StatusCounts {
    pub fn record(&mut self, status: ApprovalStatus) {
        match status {
            ApprovalStatus::Pending => self.pending += 1,
            ApprovalStatus::Approved => self.approved += 1,
            ApprovalStatus::Rejected => self.rejected += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.approved + self.rejected
    }

    pub fn of_challenges(challenges: &[Challenge]) -> Self {
        let mut counts = Self::default();
        for challenge in challenges {
            counts.record(resolve_challenge_status(challenge));
        }
        counts
    }

    pub fn of_ideas(ideas: &[Idea]) -> Self {
        let mut counts = Self::default();
        for idea in ideas {
            counts.record(resolve_idea_status(idea));
        }
        counts
    }
}
