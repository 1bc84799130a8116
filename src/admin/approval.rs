/// Approval workflow over registrations, challenges and ideas
///
/// Every successful decision mutates the target collection and appends
/// exactly one admin log entry in the same unit of work. Unknown ids and
/// blank reject reasons are refused with `false` before anything is
/// written. Repeating a decision is allowed and logs again; rejecting an
/// approved item (or the reverse) simply overrides it.
use crate::{
    admin::audit::AdminLog,
    error::PipelineResult,
    models::{next_sequential_id, ApprovalStatus, ItemKind, User},
    store::{tables, EntityStore},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Approve or reject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalAction {
    Approve,
    Reject,
}

/// Command-surface message for an admin decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalCommand {
    #[serde(rename = "type")]
    pub action: ApprovalAction,
    pub kind: ItemKind,
    pub id: String,
    pub admin_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum Decision<'a> {
    Approve { note: Option<&'a str> },
    Reject { reason: &'a str },
}

impl Decision<'_> {
    fn status(&self) -> ApprovalStatus {
        match self {
            Decision::Approve { .. } => ApprovalStatus::Approved,
            Decision::Reject { .. } => ApprovalStatus::Rejected,
        }
    }

    fn action(&self, kind: ItemKind) -> String {
        match self {
            Decision::Approve { .. } => format!("Approved {}", kind.label()),
            Decision::Reject { .. } => format!("Rejected {}", kind.label()),
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            Decision::Approve { note } => note
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(String::from),
            Decision::Reject { reason } => Some(reason.trim().to_string()),
        }
    }

    fn rejection_reason(&self) -> Option<String> {
        match self {
            Decision::Approve { .. } => None,
            Decision::Reject { reason } => Some(reason.trim().to_string()),
        }
    }

    /// Legacy idea status kept in step for older consumers
    fn legacy_idea_status(&self) -> &'static str {
        match self {
            Decision::Approve { .. } => "Accepted",
            Decision::Reject { .. } => "Declined",
        }
    }
}

/// Approval workflow
#[derive(Clone)]
pub struct ApprovalWorkflow {
    store: Arc<EntityStore>,
    log: AdminLog,
}

impl ApprovalWorkflow {
    pub fn new(store: Arc<EntityStore>, log: AdminLog) -> Self {
        Self { store, log }
    }

    /// Dispatch a command-surface message
    pub async fn apply(&self, command: &ApprovalCommand) -> PipelineResult<bool> {
        match command.action {
            ApprovalAction::Approve => {
                self.approve(
                    command.kind,
                    &command.id,
                    &command.admin_name,
                    command.reason.as_deref(),
                )
                .await
            }
            ApprovalAction::Reject => {
                self.reject(
                    command.kind,
                    &command.id,
                    &command.admin_name,
                    command.reason.as_deref().unwrap_or(""),
                )
                .await
            }
        }
    }

    /// Approve an item; `note` is optional
    pub async fn approve(
        &self,
        kind: ItemKind,
        id: &str,
        admin_name: &str,
        note: Option<&str>,
    ) -> PipelineResult<bool> {
        self.decide(kind, id, admin_name, Decision::Approve { note })
            .await
    }

    /// Reject an item; refused when `reason` is blank
    pub async fn reject(
        &self,
        kind: ItemKind,
        id: &str,
        admin_name: &str,
        reason: &str,
    ) -> PipelineResult<bool> {
        if reason.trim().is_empty() {
            warn!("Refusing to reject {} {} without a reason", kind.as_str(), id);
            return Ok(false);
        }

        self.decide(kind, id, admin_name, Decision::Reject { reason })
            .await
    }

    async fn decide(
        &self,
        kind: ItemKind,
        id: &str,
        admin_name: &str,
        decision: Decision<'_>,
    ) -> PipelineResult<bool> {
        let applied = match kind {
            ItemKind::Registration => self.decide_registration(id, admin_name, decision).await?,
            ItemKind::Challenge => self.decide_challenge(id, admin_name, decision).await?,
            ItemKind::Idea => self.decide_idea(id, admin_name, decision).await?,
        };

        if applied {
            info!(
                "{} {} by {}",
                decision.action(kind),
                id,
                admin_name
            );
        } else {
            debug!("No {} found with id {}", kind.as_str(), id);
        }

        Ok(applied)
    }

    /// Approval consumes the request into Users; rejection moves it to
    /// RejectedRegistrations
    async fn decide_registration(
        &self,
        email: &str,
        admin_name: &str,
        decision: Decision<'_>,
    ) -> PipelineResult<bool> {
        let mut pending = self.store.get(tables::PENDING_REGISTRATIONS).await?;
        let Some(index) = pending
            .iter()
            .position(|r| r.email.eq_ignore_ascii_case(email.trim()))
        else {
            return Ok(false);
        };

        let mut request = pending.remove(index);
        let now = Utc::now();
        let mut uow = self.store.begin();
        uow.set(tables::PENDING_REGISTRATIONS, &pending)?;

        match decision {
            Decision::Approve { .. } => {
                let mut users = self.store.get(tables::USERS).await?;
                let id = next_sequential_id("USR", 3, users.iter().map(|u| u.id.as_str()));
                info!(
                    "Registering {} as {} with role {}",
                    request.email,
                    id,
                    request.requested_role.as_str()
                );
                users.push(User {
                    id,
                    name: request.name.clone(),
                    email: request.email.clone(),
                    role: request.requested_role,
                    department: request.department.clone(),
                    joined_at: now,
                });
                uow.set(tables::USERS, &users)?;
            }
            Decision::Reject { .. } => {
                let mut rejected = self.store.get(tables::REJECTED_REGISTRATIONS).await?;
                request.rejection_reason = decision.rejection_reason();
                request.rejected_by = Some(admin_name.to_string());
                request.rejected_at = Some(now);
                rejected.retain(|r| !r.email.eq_ignore_ascii_case(&request.email));
                rejected.push(request.clone());
                uow.set(tables::REJECTED_REGISTRATIONS, &rejected)?;
            }
        }

        let entry = AdminLog::entry(
            decision.action(ItemKind::Registration),
            ItemKind::Registration,
            &request.name,
            admin_name,
            decision.status(),
            decision.details(),
        );
        self.log.stage(&mut uow, entry).await?;
        uow.commit().await?;

        Ok(true)
    }

    async fn decide_challenge(
        &self,
        id: &str,
        admin_name: &str,
        decision: Decision<'_>,
    ) -> PipelineResult<bool> {
        let mut challenges = self.store.get(tables::CHALLENGES).await?;
        let Some(challenge) = challenges.iter_mut().find(|c| c.id == id) else {
            return Ok(false);
        };

        let now = Utc::now();
        challenge.approval_status = Some(decision.status());
        challenge.rejection_reason = decision.rejection_reason();
        challenge.reviewed_by = Some(admin_name.to_string());
        challenge.reviewed_at = Some(now);
        challenge.updated_at = now;

        let entry = AdminLog::entry(
            decision.action(ItemKind::Challenge),
            ItemKind::Challenge,
            &challenge.title,
            admin_name,
            decision.status(),
            decision.details(),
        );

        let mut uow = self.store.begin();
        uow.set(tables::CHALLENGES, &challenges)?;
        self.log.stage(&mut uow, entry).await?;
        uow.commit().await?;

        Ok(true)
    }

    async fn decide_idea(
        &self,
        id: &str,
        admin_name: &str,
        decision: Decision<'_>,
    ) -> PipelineResult<bool> {
        let mut ideas = self.store.get(tables::IDEAS).await?;
        let Some(idea) = ideas.iter_mut().find(|i| i.id == id) else {
            return Ok(false);
        };

        let now = Utc::now();
        idea.approval_status = Some(decision.status());
        idea.status = Some(decision.legacy_idea_status().to_string());
        idea.rejection_reason = decision.rejection_reason();
        idea.reviewed_by = Some(admin_name.to_string());
        idea.reviewed_at = Some(now);
        idea.updated_at = now;

        let entry = AdminLog::entry(
            decision.action(ItemKind::Idea),
            ItemKind::Idea,
            &idea.title,
            admin_name,
            decision.status(),
            decision.details(),
        );

        let mut uow = self.store.begin();
        uow.set(tables::IDEAS, &ideas)?;
        self.log.stage(&mut uow, entry).await?;
        uow.commit().await?;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::audit::DEFAULT_LOG_CAPACITY;
    use crate::status::{resolve_challenge_status, resolve_idea_status};

    fn workflow() -> (Arc<EntityStore>, ApprovalWorkflow) {
        let store = Arc::new(EntityStore::in_memory());
        let log = AdminLog::new(store.clone(), DEFAULT_LOG_CAPACITY);
        (store.clone(), ApprovalWorkflow::new(store, log))
    }

    async fn log_len(store: &EntityStore) -> usize {
        store.get(tables::ADMIN_LOG).await.unwrap().len()
    }

    #[tokio::test]
    async fn test_approve_registration_moves_request_into_users() {
        let (store, workflow) = workflow();
        let pending_before = store.get(tables::PENDING_REGISTRATIONS).await.unwrap().len();
        let users_before = store.get(tables::USERS).await.unwrap().len();
        let log_before = log_len(&store).await;

        assert!(workflow
            .approve(ItemKind::Registration, "kavita@x.com", "Admin", None)
            .await
            .unwrap());

        let pending = store.get(tables::PENDING_REGISTRATIONS).await.unwrap();
        let users = store.get(tables::USERS).await.unwrap();
        assert_eq!(pending.len(), pending_before - 1);
        assert_eq!(users.len(), users_before + 1);
        assert!(users.iter().any(|u| u.email == "kavita@x.com"));

        let log = store.get(tables::ADMIN_LOG).await.unwrap();
        assert_eq!(log.len(), log_before + 1);
        let entry = log.last().unwrap();
        assert_eq!(entry.status, ApprovalStatus::Approved);
        assert_eq!(entry.action, "Approved Registration");
        assert_eq!(entry.item_type, "Registration");
        assert_eq!(entry.admin_name, "Admin");
    }

    #[tokio::test]
    async fn test_approved_registration_cannot_be_approved_twice() {
        let (store, workflow) = workflow();
        assert!(workflow
            .approve(ItemKind::Registration, "kavita@x.com", "Admin", None)
            .await
            .unwrap());
        let log_after_first = log_len(&store).await;

        assert!(!workflow
            .approve(ItemKind::Registration, "kavita@x.com", "Admin", None)
            .await
            .unwrap());
        assert_eq!(log_len(&store).await, log_after_first);
    }

    #[tokio::test]
    async fn test_reject_registration_moves_request_to_rejected() {
        let (store, workflow) = workflow();
        assert!(workflow
            .reject(ItemKind::Registration, "arjun@x.com", "Admin", "Unknown department")
            .await
            .unwrap());

        let pending = store.get(tables::PENDING_REGISTRATIONS).await.unwrap();
        let rejected = store.get(tables::REJECTED_REGISTRATIONS).await.unwrap();
        let users = store.get(tables::USERS).await.unwrap();
        assert!(!pending.iter().any(|r| r.email == "arjun@x.com"));
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].rejection_reason.as_deref(), Some("Unknown department"));
        assert_eq!(rejected[0].rejected_by.as_deref(), Some("Admin"));
        assert!(!users.iter().any(|u| u.email == "arjun@x.com"));

        // A rejected request is no longer pending, so it cannot be approved
        assert!(!workflow
            .approve(ItemKind::Registration, "arjun@x.com", "Admin", None)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_reject_with_blank_reason_is_refused() {
        let (store, workflow) = workflow();
        let log_before = log_len(&store).await;

        for reason in ["", "   ", "\n\t"] {
            assert!(!workflow
                .reject(ItemKind::Challenge, "CH-009", "Admin", reason)
                .await
                .unwrap());
        }

        let challenges = store.get(tables::CHALLENGES).await.unwrap();
        let challenge = challenges.iter().find(|c| c.id == "CH-009").unwrap();
        assert_eq!(resolve_challenge_status(challenge), ApprovalStatus::Pending);
        assert_eq!(challenge.reviewed_by, None);
        assert_eq!(log_len(&store).await, log_before);
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let (store, workflow) = workflow();
        let log_before = log_len(&store).await;

        assert!(!workflow
            .approve(ItemKind::Challenge, "CH-999", "Admin", None)
            .await
            .unwrap());
        assert!(!workflow
            .reject(ItemKind::Idea, "ID-9999", "Admin", "Duplicate")
            .await
            .unwrap());
        assert_eq!(log_len(&store).await, log_before);
    }

    #[tokio::test]
    async fn test_approve_challenge_records_note() {
        let (store, workflow) = workflow();
        assert!(workflow
            .approve(ItemKind::Challenge, "CH-009", "Admin", Some("Good fit"))
            .await
            .unwrap());

        let challenges = store.get(tables::CHALLENGES).await.unwrap();
        let challenge = challenges.iter().find(|c| c.id == "CH-009").unwrap();
        assert_eq!(resolve_challenge_status(challenge), ApprovalStatus::Approved);
        assert_eq!(challenge.reviewed_by.as_deref(), Some("Admin"));

        let log = store.get(tables::ADMIN_LOG).await.unwrap();
        let entry = log.last().unwrap();
        assert_eq!(entry.action, "Approved Challenge");
        assert_eq!(entry.item_name, "Meeting room utilization");
        assert_eq!(entry.details.as_deref(), Some("Good fit"));
    }

    #[tokio::test]
    async fn test_idea_decisions_keep_legacy_status_in_step() {
        let (store, workflow) = workflow();

        assert!(workflow
            .approve(ItemKind::Idea, "ID-0042", "Admin", None)
            .await
            .unwrap());
        let ideas = store.get(tables::IDEAS).await.unwrap();
        let idea = ideas.iter().find(|i| i.id == "ID-0042").unwrap();
        assert_eq!(idea.approval_status, Some(ApprovalStatus::Approved));
        assert_eq!(idea.status.as_deref(), Some("Accepted"));

        assert!(workflow
            .reject(ItemKind::Idea, "ID-0042", "Admin", "Out of budget")
            .await
            .unwrap());
        let ideas = store.get(tables::IDEAS).await.unwrap();
        let idea = ideas.iter().find(|i| i.id == "ID-0042").unwrap();
        assert_eq!(resolve_idea_status(idea), ApprovalStatus::Rejected);
        assert_eq!(idea.status.as_deref(), Some("Declined"));
        assert_eq!(idea.rejection_reason.as_deref(), Some("Out of budget"));
    }

    #[tokio::test]
    async fn test_repeated_decisions_each_log() {
        let (store, workflow) = workflow();
        let log_before = log_len(&store).await;

        for _ in 0..3 {
            assert!(workflow
                .reject(ItemKind::Challenge, "CH-002", "Admin", "Paused")
                .await
                .unwrap());
        }

        assert_eq!(log_len(&store).await, log_before + 3);
        let challenges = store.get(tables::CHALLENGES).await.unwrap();
        let challenge = challenges.iter().find(|c| c.id == "CH-002").unwrap();
        assert_eq!(resolve_challenge_status(challenge), ApprovalStatus::Rejected);
    }

    #[tokio::test]
    async fn test_apply_dispatches_commands() {
        let (store, workflow) = workflow();
        let command: ApprovalCommand = serde_json::from_value(serde_json::json!({
            "type": "reject",
            "kind": "challenge",
            "id": "CH-009",
            "adminName": "Admin",
        }))
        .unwrap();
        assert!(!workflow.apply(&command).await.unwrap());

        let command = ApprovalCommand {
            reason: Some("Duplicate of CH-007".to_string()),
            ..command
        };
        assert!(workflow.apply(&command).await.unwrap());

        let challenges = store.get(tables::CHALLENGES).await.unwrap();
        let challenge = challenges.iter().find(|c| c.id == "CH-009").unwrap();
        assert_eq!(challenge.rejection_reason.as_deref(), Some("Duplicate of CH-007"));
    }
}
