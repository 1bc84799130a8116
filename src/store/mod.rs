/// Entity store
///
/// Keyed collections, each persisted as a single JSON array and read or
/// written as a whole. Missing or malformed collections fall back to the
/// compiled-in seed instead of failing the caller.
///
/// There is no locking: two writers of the same collection race and the
/// last whole-collection write wins.

pub mod memory;
pub mod seed;
pub mod sqlite;

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

use crate::error::PipelineResult;
use crate::models::{
    AdminLogEntry, Challenge, ChallengeDetail, Idea, KanbanCard, Notification,
    RegistrationRequest, User,
};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Persisted collection names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Users,
    Challenges,
    ChallengeDetails,
    Ideas,
    KanbanCards,
    PendingRegistrations,
    RejectedRegistrations,
    AdminLog,
    Notifications,
    AcknowledgedActions,
}

impl Collection {
    pub const ALL: [Collection; 10] = [
        Collection::Users,
        Collection::Challenges,
        Collection::ChallengeDetails,
        Collection::Ideas,
        Collection::KanbanCards,
        Collection::PendingRegistrations,
        Collection::RejectedRegistrations,
        Collection::AdminLog,
        Collection::Notifications,
        Collection::AcknowledgedActions,
    ];

    /// Storage key
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Challenges => "challenges",
            Collection::ChallengeDetails => "challengeDetails",
            Collection::Ideas => "ideas",
            Collection::KanbanCards => "kanbanCards",
            Collection::PendingRegistrations => "pendingRegistrations",
            Collection::RejectedRegistrations => "rejectedRegistrations",
            Collection::AdminLog => "adminLog",
            Collection::Notifications => "notifications",
            Collection::AcknowledgedActions => "acknowledgedActions",
        }
    }
}

/// Typed handle tying a collection to its record type
pub struct Table<T> {
    collection: Collection,
    _record: PhantomData<fn() -> T>,
}

impl<T> Table<T> {
    pub const fn new(collection: Collection) -> Self {
        Self {
            collection,
            _record: PhantomData,
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }
}

impl<T> Clone for Table<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Table<T> {}

/// Typed handles for every collection
pub mod tables {
    use super::*;

    pub const USERS: Table<User> = Table::new(Collection::Users);
    pub const CHALLENGES: Table<Challenge> = Table::new(Collection::Challenges);
    pub const CHALLENGE_DETAILS: Table<ChallengeDetail> = Table::new(Collection::ChallengeDetails);
    pub const IDEAS: Table<Idea> = Table::new(Collection::Ideas);
    pub const KANBAN_CARDS: Table<KanbanCard> = Table::new(Collection::KanbanCards);
    pub const PENDING_REGISTRATIONS: Table<RegistrationRequest> =
        Table::new(Collection::PendingRegistrations);
    pub const REJECTED_REGISTRATIONS: Table<RegistrationRequest> =
        Table::new(Collection::RejectedRegistrations);
    pub const ADMIN_LOG: Table<AdminLogEntry> = Table::new(Collection::AdminLog);
    pub const NOTIFICATIONS: Table<Notification> = Table::new(Collection::Notifications);
    /// Synthetic notification ids the admin has marked read
    pub const ACKNOWLEDGED_ACTIONS: Table<String> = Table::new(Collection::AcknowledgedActions);
}

/// Persistence backend trait
///
/// Implementations store one serialized document per collection.
#[async_trait]
pub trait CollectionBackend: Send + Sync {
    /// Read the raw document for a collection, `None` if never written
    async fn load(&self, collection: Collection) -> PipelineResult<Option<String>>;

    /// Replace the raw document for a collection
    async fn save(&self, collection: Collection, data: String) -> PipelineResult<()>;

    /// Replace several documents atomically
    async fn save_all(&self, writes: Vec<(Collection, String)>) -> PipelineResult<()>;
}

/// Typed access to the collections over a backend
#[derive(Clone)]
pub struct EntityStore {
    backend: Arc<dyn CollectionBackend>,
}

impl EntityStore {
    pub fn new(backend: Arc<dyn CollectionBackend>) -> Self {
        Self { backend }
    }

    /// Store backed by process memory, starting from seed data
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Read a whole collection
    ///
    /// Absent or undecodable documents yield the seed for that collection.
    pub async fn get<T: DeserializeOwned>(&self, table: Table<T>) -> PipelineResult<Vec<T>> {
        let collection = table.collection();
        match self.backend.load(collection).await? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(records) => Ok(records),
                Err(e) => {
                    warn!(
                        "Collection {} is malformed ({}), falling back to seed data",
                        collection.name(),
                        e
                    );
                    Ok(Self::seed(table))
                }
            },
            None => {
                debug!("Collection {} not stored yet, using seed data", collection.name());
                Ok(Self::seed(table))
            }
        }
    }

    /// Replace a whole collection
    pub async fn set<T: Serialize>(&self, table: Table<T>, records: &[T]) -> PipelineResult<()> {
        let data = serde_json::to_string(records)?;
        self.backend.save(table.collection(), data).await
    }

    /// Start a unit of work grouping several collection writes
    pub fn begin(&self) -> UnitOfWork<'_> {
        UnitOfWork {
            store: self,
            writes: Vec::new(),
        }
    }

    /// Write every seed collection, overwriting what is stored
    pub async fn reset_to_seed(&self) -> PipelineResult<()> {
        let mut writes = Vec::with_capacity(Collection::ALL.len());
        for collection in Collection::ALL {
            writes.push((collection, seed::default_collection(collection).to_string()));
        }
        self.backend.save_all(writes).await
    }

    fn seed<T: DeserializeOwned>(table: Table<T>) -> Vec<T> {
        let collection = table.collection();
        match serde_json::from_value(seed::default_collection(collection)) {
            Ok(records) => records,
            Err(e) => {
                error!("Seed data for {} does not decode: {}", collection.name(), e);
                Vec::new()
            }
        }
    }
}

/// Staged multi-collection write
///
/// Nothing reaches the backend until `commit`; dropping the unit of work
/// discards the staged writes.
pub struct UnitOfWork<'a> {
    store: &'a EntityStore,
    writes: Vec<(Collection, String)>,
}

impl UnitOfWork<'_> {
    /// Stage a whole-collection replacement; a later stage of the same
    /// collection replaces the earlier one
    pub fn set<T: Serialize>(&mut self, table: Table<T>, records: &[T]) -> PipelineResult<()> {
        let data = serde_json::to_string(records)?;
        let collection = table.collection();
        self.writes.retain(|(c, _)| *c != collection);
        self.writes.push((collection, data));
        Ok(())
    }

    pub async fn commit(self) -> PipelineResult<()> {
        if self.writes.is_empty() {
            return Ok(());
        }
        debug!(
            "Committing unit of work over {:?}",
            self.writes.iter().map(|(c, _)| c.name()).collect::<Vec<_>>()
        );
        self.store.backend.save_all(self.writes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Stage;

    #[tokio::test]
    async fn test_absent_collection_yields_seed() {
        let store = EntityStore::in_memory();
        let challenges = store.get(tables::CHALLENGES).await.unwrap();
        assert!(challenges.iter().any(|c| c.id == "CH-001"));
    }

    #[tokio::test]
    async fn test_malformed_collection_falls_back_to_seed() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .save(Collection::Challenges, "{not json".to_string())
            .await
            .unwrap();
        let store = EntityStore::new(backend);

        let challenges = store.get(tables::CHALLENGES).await.unwrap();
        assert_eq!(challenges.len(), seed::SEED_CHALLENGE_COUNT);
    }

    #[tokio::test]
    async fn test_set_then_get_observes_write() {
        let store = EntityStore::in_memory();
        let mut cards = store.get(tables::KANBAN_CARDS).await.unwrap();
        cards.truncate(2);
        cards[0].stage = Stage::ParkingLot;
        store.set(tables::KANBAN_CARDS, &cards).await.unwrap();

        let reread = store.get(tables::KANBAN_CARDS).await.unwrap();
        assert_eq!(reread, cards);
    }

    #[tokio::test]
    async fn test_dropped_unit_of_work_writes_nothing() {
        let store = EntityStore::in_memory();
        {
            let mut uow = store.begin();
            uow.set(tables::CHALLENGES, &[]).unwrap();
            uow.set(tables::KANBAN_CARDS, &[]).unwrap();
        }
        assert!(!store.get(tables::CHALLENGES).await.unwrap().is_empty());
        assert!(!store.get(tables::KANBAN_CARDS).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unit_of_work_commits_every_collection() {
        let store = EntityStore::in_memory();
        let mut uow = store.begin();
        uow.set(tables::CHALLENGES, &[]).unwrap();
        uow.set(tables::KANBAN_CARDS, &[]).unwrap();
        uow.commit().await.unwrap();

        assert!(store.get(tables::CHALLENGES).await.unwrap().is_empty());
        assert!(store.get(tables::KANBAN_CARDS).await.unwrap().is_empty());
    }

    #[test]
    fn test_collection_names_are_unique() {
        let mut names: Vec<_> = Collection::ALL.iter().map(|c| c.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), Collection::ALL.len());
    }
}
