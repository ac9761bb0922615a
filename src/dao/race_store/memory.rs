//! In-memory race store backed by a [`DashMap`].
//!
//! Used by the test suite and as a zero-dependency local backend. Each
//! race's participants and messages live inside the race's map entry, so a
//! conditional join holds the entry lock for the whole check-and-insert.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::dao::models::{ParticipantEntity, RaceEntity, RaceListItemEntity, RaceMessageEntity};
use crate::dao::race_store::{JoinOutcome, RaceStore};
use crate::dao::storage::StorageResult;
use crate::races::status::RaceStatus;

/// One race room with its children, stored as a single map entry.
#[derive(Debug, Clone)]
struct RaceRoom {
    race: RaceEntity,
    participants: Vec<ParticipantEntity>,
    messages: Vec<RaceMessageEntity>,
}

/// In-memory implementation of [`RaceStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryRaceStore {
    rooms: Arc<DashMap<Uuid, RaceRoom>>,
}

impl MemoryRaceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RaceStore for MemoryRaceStore {
    fn create_race(
        &self,
        race: RaceEntity,
        creator: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let rooms = Arc::clone(&self.rooms);
        Box::pin(async move {
            rooms.insert(
                race.id,
                RaceRoom {
                    race,
                    participants: vec![creator],
                    messages: Vec::new(),
                },
            );
            Ok(())
        })
    }

    fn find_race(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RaceEntity>>> {
        let rooms = Arc::clone(&self.rooms);
        Box::pin(async move { Ok(rooms.get(&id).map(|room| room.race.clone())) })
    }

    fn list_races(&self) -> BoxFuture<'static, StorageResult<Vec<RaceListItemEntity>>> {
        let rooms = Arc::clone(&self.rooms);
        Box::pin(async move {
            let mut items: Vec<RaceListItemEntity> = rooms
                .iter()
                .map(|entry| {
                    let race = &entry.race;
                    RaceListItemEntity {
                        id: race.id,
                        game_name: race.game_name.clone(),
                        category_name: race.category_name.clone(),
                        objective: race.objective.clone(),
                        status: race.status,
                        participant_count: entry.participants.len() as u32,
                        max_participants: race.max_participants,
                        has_password: race.password.is_some(),
                        owner_id: race.owner_id,
                        created_at: race.created_at,
                    }
                })
                .collect();
            items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(items)
        })
    }

    fn update_race(&self, race: RaceEntity) -> BoxFuture<'static, StorageResult<()>> {
        let rooms = Arc::clone(&self.rooms);
        Box::pin(async move {
            if let Some(mut room) = rooms.get_mut(&race.id) {
                room.race = race;
            }
            Ok(())
        })
    }

    fn delete_race(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let rooms = Arc::clone(&self.rooms);
        Box::pin(async move { Ok(rooms.remove(&id).is_some()) })
    }

    fn insert_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<JoinOutcome>> {
        let rooms = Arc::clone(&self.rooms);
        Box::pin(async move {
            let Some(mut room) = rooms.get_mut(&participant.race_id) else {
                return Ok(JoinOutcome::RaceMissing);
            };

            if room
                .participants
                .iter()
                .any(|existing| existing.user_id == participant.user_id)
            {
                return Ok(JoinOutcome::AlreadyJoined);
            }

            if room.participants.len() as u32 >= room.race.max_participants {
                return Ok(JoinOutcome::RaceFull);
            }

            room.race.updated_at = participant.joined_at;
            room.participants.push(participant);
            Ok(JoinOutcome::Joined)
        })
    }

    fn find_participant(
        &self,
        race_id: Uuid,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let rooms = Arc::clone(&self.rooms);
        Box::pin(async move {
            Ok(rooms.get(&race_id).and_then(|room| {
                room.participants
                    .iter()
                    .find(|participant| participant.user_id == user_id)
                    .cloned()
            }))
        })
    }

    fn list_participants(
        &self,
        race_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let rooms = Arc::clone(&self.rooms);
        Box::pin(async move {
            Ok(rooms
                .get(&race_id)
                .map(|room| room.participants.clone())
                .unwrap_or_default())
        })
    }

    fn update_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let rooms = Arc::clone(&self.rooms);
        Box::pin(async move {
            let Some(mut room) = rooms.get_mut(&participant.race_id) else {
                return Ok(false);
            };

            let Some(slot) = room
                .participants
                .iter_mut()
                .find(|existing| existing.user_id == participant.user_id)
            else {
                return Ok(false);
            };

            *slot = participant;
            room.race.updated_at = OffsetDateTime::now_utc();
            Ok(true)
        })
    }

    fn remove_participant(
        &self,
        race_id: Uuid,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let rooms = Arc::clone(&self.rooms);
        Box::pin(async move {
            let Some(mut room) = rooms.get_mut(&race_id) else {
                return Ok(false);
            };

            let before = room.participants.len();
            room.participants
                .retain(|participant| participant.user_id != user_id);
            let removed = room.participants.len() != before;
            if removed {
                room.race.updated_at = OffsetDateTime::now_utc();
            }
            Ok(removed)
        })
    }

    fn insert_message(
        &self,
        message: RaceMessageEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let rooms = Arc::clone(&self.rooms);
        Box::pin(async move {
            if let Some(mut room) = rooms.get_mut(&message.race_id) {
                room.messages.push(message);
            }
            Ok(())
        })
    }

    fn list_messages(
        &self,
        race_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<RaceMessageEntity>>> {
        let rooms = Arc::clone(&self.rooms);
        Box::pin(async move {
            let mut messages = rooms
                .get(&race_id)
                .map(|room| room.messages.clone())
                .unwrap_or_default();
            messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            Ok(messages)
        })
    }

    fn count_stale_finished(
        &self,
        cutoff: OffsetDateTime,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        let rooms = Arc::clone(&self.rooms);
        Box::pin(async move {
            let count = rooms
                .iter()
                .filter(|entry| {
                    entry.race.status == RaceStatus::Finished && entry.race.updated_at <= cutoff
                })
                .count();
            Ok(count as u64)
        })
    }

    fn delete_stale_finished(
        &self,
        cutoff: OffsetDateTime,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        let rooms = Arc::clone(&self.rooms);
        Box::pin(async move {
            let stale: Vec<Uuid> = rooms
                .iter()
                .filter(|entry| {
                    entry.race.status == RaceStatus::Finished && entry.race.updated_at <= cutoff
                })
                .map(|entry| entry.race.id)
                .collect();

            let mut deleted = 0;
            for id in stale {
                if rooms.remove(&id).is_some() {
                    deleted += 1;
                }
            }
            Ok(deleted)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
