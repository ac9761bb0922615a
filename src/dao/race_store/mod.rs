//! Abstraction over the persistence layer for races, participants, and
//! chat messages, with one backend per supported database.

pub mod memory;
#[cfg(feature = "postgres-store")]
pub mod postgres;

use futures::future::BoxFuture;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::dao::models::{ParticipantEntity, RaceEntity, RaceListItemEntity, RaceMessageEntity};
use crate::dao::storage::StorageResult;

/// Outcome of a conditional participant insert.
///
/// The uniqueness and capacity checks run inside the backend so that the
/// check and the insert cannot interleave with a concurrent join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The participant row was inserted.
    Joined,
    /// The race does not exist.
    RaceMissing,
    /// A row for this `(race, user)` pair already exists.
    AlreadyJoined,
    /// The race is at its participant cap.
    RaceFull,
}

/// Abstraction over the persistence layer for race rooms.
///
/// Cascade semantics: deleting a race removes its participants and
/// messages. Every mutation of a race's children refreshes the race's
/// `updated_at` stamp, which the cleanup sweep keys off.
pub trait RaceStore: Send + Sync {
    /// Persist a new race together with its auto-enrolled creator.
    fn create_race(
        &self,
        race: RaceEntity,
        creator: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// Fetch a single race by id.
    fn find_race(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RaceEntity>>>;

    /// List race summaries with participant counts, newest first.
    fn list_races(&self) -> BoxFuture<'static, StorageResult<Vec<RaceListItemEntity>>>;

    /// Persist race-level mutations (status, timestamps).
    fn update_race(&self, race: RaceEntity) -> BoxFuture<'static, StorageResult<()>>;

    /// Delete a race and cascade its children. Returns whether a row existed.
    fn delete_race(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;

    /// Conditionally insert a participant, enforcing uniqueness and the
    /// race's participant cap atomically.
    fn insert_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<JoinOutcome>>;

    /// Fetch one participant row.
    fn find_participant(
        &self,
        race_id: Uuid,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>>;

    /// List every participant of a race in join order.
    fn list_participants(
        &self,
        race_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>>;

    /// Persist a participant mutation. Returns whether the row existed.
    fn update_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<bool>>;

    /// Remove one participant row. Returns whether the row existed.
    fn remove_participant(
        &self,
        race_id: Uuid,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<bool>>;

    /// Append a chat-log entry.
    fn insert_message(
        &self,
        message: RaceMessageEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// List a race's messages ordered by creation time ascending.
    fn list_messages(
        &self,
        race_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<RaceMessageEntity>>>;

    /// Count finished races whose last update is older than `cutoff`.
    fn count_stale_finished(
        &self,
        cutoff: OffsetDateTime,
    ) -> BoxFuture<'static, StorageResult<u64>>;

    /// Delete finished races whose last update is older than `cutoff`,
    /// returning how many were removed.
    fn delete_stale_finished(
        &self,
        cutoff: OffsetDateTime,
    ) -> BoxFuture<'static, StorageResult<u64>>;

    /// Cheap connectivity probe used by the health endpoint and the
    /// storage supervisor.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;

    /// Attempt to restore a dropped connection.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
