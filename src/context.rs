/// Application context and dependency injection
use crate::{
    admin::{AdminLog, ApprovalWorkflow},
    config::{PipelineConfig, StoreBackend},
    db,
    error::PipelineResult,
    kanban::KanbanEngine,
    notifications::NotificationAggregator,
    pipeline::Pipeline,
    store::{EntityStore, SqliteBackend},
};
use std::sync::Arc;
use tracing::info;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<PipelineConfig>,
    pub store: Arc<EntityStore>,
    pub admin_log: AdminLog,
    pub approvals: Arc<ApprovalWorkflow>,
    pub kanban: Arc<KanbanEngine>,
    pub notifications: Arc<NotificationAggregator>,
    pub pipeline: Arc<Pipeline>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: PipelineConfig) -> PipelineResult<Self> {
        // Validate configuration
        config.validate()?;

        let store = match config.storage.backend {
            StoreBackend::Memory => {
                info!("Using in-memory store");
                EntityStore::in_memory()
            }
            StoreBackend::Sqlite => {
                info!("Using SQLite store at {}", config.storage.database.display());
                tokio::fs::create_dir_all(&config.storage.data_directory).await?;

                let pool =
                    db::create_pool(&config.storage.database, db::DatabaseOptions::default())
                        .await?;
                db::run_migrations(&pool).await?;
                db::test_connection(&pool).await?;

                EntityStore::new(Arc::new(SqliteBackend::new(pool)))
            }
        };

        Ok(Self::with_store(config, Arc::new(store)))
    }

    /// Wire services over an existing store
    pub fn with_store(config: PipelineConfig, store: Arc<EntityStore>) -> Self {
        let admin_log = AdminLog::new(store.clone(), config.admin.log_capacity);
        let approvals = Arc::new(ApprovalWorkflow::new(store.clone(), admin_log.clone()));
        let kanban = Arc::new(KanbanEngine::new(store.clone()));
        let notifications = Arc::new(NotificationAggregator::new(store.clone()));
        let pipeline = Arc::new(Pipeline::new(store.clone()));

        Self {
            config: Arc::new(config),
            store,
            admin_log,
            approvals,
            kanban,
            notifications,
            pipeline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Actor;
    use crate::models::{ItemKind, Stage};

    #[tokio::test]
    async fn test_memory_context_end_to_end() {
        let mut config = PipelineConfig::default();
        config.storage.backend = StoreBackend::Memory;
        let ctx = AppContext::new(config).await.unwrap();
        let admin = Actor::admin("Admin");

        let challenge = ctx
            .pipeline
            .submit_challenge(
                &Actor::member("Sara Lee"),
                crate::pipeline::NewChallenge {
                    title: "Reusable packaging".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let feed = ctx.notifications.feed(&admin).await.unwrap();
        let action = format!("action-challenge-{}", challenge.id);
        assert!(feed.items.iter().any(|n| n.id == action));

        assert!(ctx
            .approvals
            .approve(ItemKind::Challenge, &challenge.id, &admin.name, None)
            .await
            .unwrap());
        let outcome = ctx
            .kanban
            .move_card(&challenge.id, Stage::IdeationEvaluation, 0)
            .await
            .unwrap();
        assert!(outcome.success);

        let feed = ctx.notifications.feed(&admin).await.unwrap();
        assert!(!feed.items.iter().any(|n| n.id == action));
        let recent = ctx.admin_log.recent(1).await.unwrap();
        assert_eq!(recent[0].item_name, "Reusable packaging");
    }

    #[tokio::test]
    async fn test_sqlite_context_creates_database() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PipelineConfig::default();
        config.storage.data_directory = dir.path().to_path_buf();
        config.storage.database = dir.path().join("nested").join("pipeline.sqlite");

        let ctx = AppContext::new(config).await.unwrap();
        let board = ctx.kanban.board().await.unwrap();
        assert_eq!(board.len(), 5);
        assert!(dir.path().join("nested").join("pipeline.sqlite").exists());
    }
}
