/// Notification feed
///
/// Privileged callers see synthesized action items for everything awaiting
/// a decision, followed by the persisted notifications. Action items are
/// rebuilt on every read with ids of the form `action-<kind>-<key>`, so
/// their read state lives in a separate set of acknowledged ids rather than
/// on the items themselves.

use crate::{
    auth::Actor,
    error::PipelineResult,
    models::{next_sequential_id, ApprovalStatus, ItemKind, Notification},
    status::{filter_challenges, filter_ideas},
    store::{tables, EntityStore},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

const ACTION_PREFIX: &str = "action-";
const ACTION_KIND: &str = "approval";

/// Stable id of the action item for a pending entity
///
/// The key is the registration email or the challenge/idea id.
pub fn action_id(kind: ItemKind, natural_key: &str) -> String {
    format!("{}{}-{}", ACTION_PREFIX, kind.as_str(), natural_key)
}

pub fn is_action_id(id: &str) -> bool {
    id.starts_with(ACTION_PREFIX)
}

/// Feed returned to a caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
    pub items: Vec<Notification>,
    pub unread_count: usize,
}

/// Notification aggregator
#[derive(Clone)]
pub struct NotificationAggregator {
    store: Arc<EntityStore>,
}

impl NotificationAggregator {
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self { store }
    }

    /// Build the feed for `actor`
    pub async fn feed(&self, actor: &Actor) -> PipelineResult<Feed> {
        let mut items = if actor.privileged {
            self.action_items().await?
        } else {
            Vec::new()
        };
        items.extend(self.store.get(tables::NOTIFICATIONS).await?);

        let unread_count = items.iter().filter(|n| n.unread).count();
        Ok(Feed {
            items,
            unread_count,
        })
    }

    /// Action items for pending registrations, challenges and ideas
    pub async fn action_items(&self) -> PipelineResult<Vec<Notification>> {
        let acknowledged: HashSet<String> = self
            .store
            .get(tables::ACKNOWLEDGED_ACTIONS)
            .await?
            .into_iter()
            .collect();
        let registrations = self.store.get(tables::PENDING_REGISTRATIONS).await?;
        let challenges = self.store.get(tables::CHALLENGES).await?;
        let ideas = self.store.get(tables::IDEAS).await?;

        let action = |kind: ItemKind, key: &str, title: &str, text: String, time, tab: &str| {
            let id = action_id(kind, key);
            Notification {
                unread: !acknowledged.contains(&id),
                id,
                kind: ACTION_KIND.to_string(),
                title: title.to_string(),
                text,
                time,
                link: format!("/admin/approvals?tab={}", tab),
                action_needed: Some(true),
            }
        };

        let mut items = Vec::new();
        for request in &registrations {
            items.push(action(
                ItemKind::Registration,
                &request.email,
                "New registration request",
                format!("{} ({}) is waiting for access", request.name, request.email),
                request.submitted_at,
                "registrations",
            ));
        }
        for challenge in filter_challenges(&challenges, ApprovalStatus::Pending) {
            items.push(action(
                ItemKind::Challenge,
                &challenge.id,
                "Challenge awaiting approval",
                format!("{} submitted by {}", challenge.title, challenge.owner),
                challenge.created_at,
                "challenges",
            ));
        }
        for idea in filter_ideas(&ideas, ApprovalStatus::Pending) {
            items.push(action(
                ItemKind::Idea,
                &idea.id,
                "Idea awaiting approval",
                format!("{} submitted by {}", idea.title, idea.submitted_by),
                idea.created_at,
                "ideas",
            ));
        }

        Ok(items)
    }

    /// Mark one item read
    ///
    /// Action ids go into the acknowledged set; the pending entity behind
    /// them is left alone. Unknown persisted ids are ignored.
    pub async fn acknowledge(&self, id: &str) -> PipelineResult<()> {
        if is_action_id(id) {
            let mut acknowledged = self.store.get(tables::ACKNOWLEDGED_ACTIONS).await?;
            if !acknowledged.iter().any(|a| a == id) {
                acknowledged.push(id.to_string());
                self.store
                    .set(tables::ACKNOWLEDGED_ACTIONS, &acknowledged)
                    .await?;
            }
            debug!("Acknowledged action item {}", id);
            return Ok(());
        }

        let mut notifications = self.store.get(tables::NOTIFICATIONS).await?;
        match notifications.iter_mut().find(|n| n.id == id) {
            Some(notification) if notification.unread => {
                notification.unread = false;
                self.store.set(tables::NOTIFICATIONS, &notifications).await?;
                debug!("Marked notification {} read", id);
            }
            Some(_) => {}
            None => debug!("Acknowledge ignored, no notification {}", id),
        }

        Ok(())
    }

    /// Mark everything in the actor's feed read
    ///
    /// The acknowledged set is rewritten to exactly the current action
    /// items, dropping ids whose entity has since been decided or deleted.
    pub async fn acknowledge_all(&self, actor: &Actor) -> PipelineResult<()> {
        let mut uow = self.store.begin();

        if actor.privileged {
            let acknowledged: Vec<String> = self
                .action_items()
                .await?
                .into_iter()
                .map(|item| item.id)
                .collect();
            uow.set(tables::ACKNOWLEDGED_ACTIONS, &acknowledged)?;
        }

        let mut notifications = self.store.get(tables::NOTIFICATIONS).await?;
        for notification in notifications.iter_mut() {
            notification.unread = false;
        }
        uow.set(tables::NOTIFICATIONS, &notifications)?;

        uow.commit().await?;
        info!("{} marked all notifications read", actor.name);
        Ok(())
    }

    /// Persist a new notification at the end of the collection
    pub async fn publish(&self, notification: Notification) -> PipelineResult<()> {
        let mut notifications = self.store.get(tables::NOTIFICATIONS).await?;
        debug!("Publishing notification {}", notification.id);
        notifications.push(notification);
        self.store.set(tables::NOTIFICATIONS, &notifications).await
    }

    /// Publish an unread notification under the next `ntf-NNNN` id
    pub async fn notify(
        &self,
        kind: &str,
        title: &str,
        text: &str,
        link: &str,
    ) -> PipelineResult<Notification> {
        let notifications = self.store.get(tables::NOTIFICATIONS).await?;
        let id = next_sequential_id("ntf", 4, notifications.iter().map(|n| n.id.as_str()));

        let notification = Notification {
            id,
            kind: kind.to_string(),
            title: title.to_string(),
            text: text.to_string(),
            time: Utc::now(),
            unread: true,
            link: link.to_string(),
            action_needed: None,
        };
        self.publish(notification.clone()).await?;
        Ok(notification)
    }
}
