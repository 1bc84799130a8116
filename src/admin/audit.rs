/// Admin action history
///
/// Entries are never edited. The collection keeps the most recent
/// `capacity` entries by insertion order; older ones are dropped first.
use crate::{
    error::PipelineResult,
    models::{AdminLogEntry, ApprovalStatus, ItemKind},
    store::{tables, EntityStore, UnitOfWork},
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// Admin log
#[derive(Clone)]
pub struct AdminLog {
    store: Arc<EntityStore>,
    capacity: usize,
}

impl AdminLog {
    pub fn new(store: Arc<EntityStore>, capacity: usize) -> Self {
        Self {
            store,
            capacity: capacity.max(1),
        }
    }

    /// Build a new entry stamped with the current time
    pub fn entry(
        action: String,
        kind: ItemKind,
        item_name: &str,
        admin_name: &str,
        status: ApprovalStatus,
        details: Option<String>,
    ) -> AdminLogEntry {
        AdminLogEntry {
            id: format!("log-{}", Uuid::new_v4()),
            action,
            item_type: kind.label().to_string(),
            item_name: item_name.to_string(),
            admin_name: admin_name.to_string(),
            status,
            details,
            timestamp: Utc::now(),
        }
    }

    /// Stage an append as part of a larger unit of work
    pub async fn stage(&self, uow: &mut UnitOfWork<'_>, entry: AdminLogEntry) -> PipelineResult<()> {
        let mut entries = self.store.get(tables::ADMIN_LOG).await?;
        self.push(&mut entries, entry);
        uow.set(tables::ADMIN_LOG, &entries)
    }

    /// All retained entries, oldest first
    pub async fn entries(&self) -> PipelineResult<Vec<AdminLogEntry>> {
        self.store.get(tables::ADMIN_LOG).await
    }

    /// Most recent entries, newest first
    pub async fn recent(&self, limit: usize) -> PipelineResult<Vec<AdminLogEntry>> {
        let entries = self.entries().await?;
        Ok(entries.into_iter().rev().take(limit).collect())
    }

    fn push(&self, entries: &mut Vec<AdminLogEntry>, entry: AdminLogEntry) {
        entries.push(entry);
        if entries.len() > self.capacity {
            let excess = entries.len() - self.capacity;
            entries.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn append(log: &AdminLog, entry: AdminLogEntry) {
        let mut uow = log.store.begin();
        log.stage(&mut uow, entry).await.unwrap();
        uow.commit().await.unwrap();
    }

    fn sample(n: usize) -> AdminLogEntry {
        AdminLog::entry(
            "Approved Idea".to_string(),
            ItemKind::Idea,
            &format!("Idea {}", n),
            "Admin",
            ApprovalStatus::Approved,
            None,
        )
    }

    #[tokio::test]
    async fn test_append_keeps_insertion_order() {
        let store = Arc::new(EntityStore::in_memory());
        let log = AdminLog::new(store, DEFAULT_LOG_CAPACITY);
        let before = log.entries().await.unwrap().len();

        append(&log, sample(1)).await;
        append(&log, sample(2)).await;

        let entries = log.entries().await.unwrap();
        assert_eq!(entries.len(), before + 2);
        assert_eq!(entries[before].item_name, "Idea 1");
        assert_eq!(entries[before + 1].item_name, "Idea 2");

        let recent = log.recent(1).await.unwrap();
        assert_eq!(recent[0].item_name, "Idea 2");
    }

    #[tokio::test]
    async fn test_capacity_drops_oldest_first() {
        let store = Arc::new(EntityStore::in_memory());
        store.set(tables::ADMIN_LOG, &[]).await.unwrap();
        let log = AdminLog::new(store, 3);

        for n in 0..5 {
            append(&log, sample(n)).await;
        }

        let names: Vec<_> = log
            .entries()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.item_name)
            .collect();
        assert_eq!(names, vec!["Idea 2", "Idea 3", "Idea 4"]);
    }

    #[tokio::test]
    async fn test_default_capacity_is_one_hundred() {
        let store = Arc::new(EntityStore::in_memory());
        store.set(tables::ADMIN_LOG, &[]).await.unwrap();
        let log = AdminLog::new(store, DEFAULT_LOG_CAPACITY);

        for n in 0..105 {
            append(&log, sample(n)).await;
        }

        let entries = log.entries().await.unwrap();
        assert_eq!(entries.len(), 100);
        assert_eq!(entries[0].item_name, "Idea 5");
        assert_eq!(entries[99].item_name, "Idea 104");
    }
}
