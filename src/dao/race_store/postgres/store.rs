use futures::future::BoxFuture;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::dao::models::{ParticipantEntity, RaceEntity, RaceListItemEntity, RaceMessageEntity};
use crate::dao::race_store::{JoinOutcome, RaceStore};
use crate::dao::storage::StorageResult;

use super::config::PgConfig;
use super::error::{PgDaoError, PgResult};

const RACE_COLUMNS: &str = "\
    id, game_id, game_name, category_id, category_name, objective, status, \
    max_participants, password, owner_id, created_at, updated_at, started_at, ended_at";

const PARTICIPANT_COLUMNS: &str =
    "race_id, user_id, status, finish_time_ms, stream_url, placement, joined_at";

const MESSAGE_COLUMNS: &str = "id, race_id, author_id, content, kind, created_at";

/// Schema applied at connect time. `ON DELETE CASCADE` gives the store its
/// race-deletion cascade semantics.
const SCHEMA: &str = "\
    CREATE TABLE IF NOT EXISTS races (\
        id UUID PRIMARY KEY,\
        game_id TEXT NOT NULL,\
        game_name TEXT NOT NULL,\
        category_id TEXT NOT NULL,\
        category_name TEXT NOT NULL,\
        objective TEXT,\
        status TEXT NOT NULL,\
        max_participants INTEGER NOT NULL,\
        password TEXT,\
        owner_id UUID NOT NULL,\
        created_at TIMESTAMPTZ NOT NULL,\
        updated_at TIMESTAMPTZ NOT NULL,\
        started_at TIMESTAMPTZ,\
        ended_at TIMESTAMPTZ\
    );\
    CREATE TABLE IF NOT EXISTS race_participants (\
        race_id UUID NOT NULL REFERENCES races(id) ON DELETE CASCADE,\
        user_id UUID NOT NULL,\
        status TEXT NOT NULL,\
        finish_time_ms BIGINT,\
        stream_url TEXT,\
        placement INTEGER,\
        joined_at TIMESTAMPTZ NOT NULL,\
        PRIMARY KEY (race_id, user_id)\
    );\
    CREATE TABLE IF NOT EXISTS race_messages (\
        id UUID PRIMARY KEY,\
        race_id UUID NOT NULL REFERENCES races(id) ON DELETE CASCADE,\
        author_id UUID,\
        content TEXT NOT NULL,\
        kind TEXT NOT NULL,\
        created_at TIMESTAMPTZ NOT NULL\
    );\
    CREATE INDEX IF NOT EXISTS race_messages_by_race \
        ON race_messages (race_id, created_at);\
    CREATE INDEX IF NOT EXISTS races_by_status_updated \
        ON races (status, updated_at)";

#[derive(Debug, FromRow)]
struct RaceRow {
    id: Uuid,
    game_id: String,
    game_name: String,
    category_id: String,
    category_name: String,
    objective: Option<String>,
    status: String,
    max_participants: i32,
    password: Option<String>,
    owner_id: Uuid,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    started_at: Option<OffsetDateTime>,
    ended_at: Option<OffsetDateTime>,
}

impl RaceRow {
    fn into_entity(self) -> PgResult<RaceEntity> {
        Ok(RaceEntity {
            id: self.id,
            game_id: self.game_id,
            game_name: self.game_name,
            category_id: self.category_id,
            category_name: self.category_name,
            objective: self.objective,
            status: self
                .status
                .parse()
                .map_err(|source| PgDaoError::CorruptStatus { source })?,
            max_participants: self.max_participants.max(0) as u32,
            password: self.password,
            owner_id: self.owner_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            started_at: self.started_at,
            ended_at: self.ended_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ParticipantRow {
    race_id: Uuid,
    user_id: Uuid,
    status: String,
    finish_time_ms: Option<i64>,
    stream_url: Option<String>,
    placement: Option<i32>,
    joined_at: OffsetDateTime,
}

impl ParticipantRow {
    fn into_entity(self) -> PgResult<ParticipantEntity> {
        Ok(ParticipantEntity {
            race_id: self.race_id,
            user_id: self.user_id,
            status: self
                .status
                .parse()
                .map_err(|source| PgDaoError::CorruptStatus { source })?,
            finish_time_ms: self.finish_time_ms.map(|ms| ms.max(0) as u64),
            stream_url: self.stream_url,
            placement: self.placement.map(|p| p.max(0) as u32),
            joined_at: self.joined_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct MessageRow {
    id: Uuid,
    race_id: Uuid,
    author_id: Option<Uuid>,
    content: String,
    kind: String,
    created_at: OffsetDateTime,
}

impl MessageRow {
    fn into_entity(self) -> PgResult<RaceMessageEntity> {
        Ok(RaceMessageEntity {
            id: self.id,
            race_id: self.race_id,
            author_id: self.author_id,
            content: self.content,
            kind: self
                .kind
                .parse()
                .map_err(|source| PgDaoError::CorruptStatus { source })?,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct RaceListRow {
    id: Uuid,
    game_name: String,
    category_name: String,
    objective: Option<String>,
    status: String,
    participant_count: i64,
    max_participants: i32,
    has_password: bool,
    owner_id: Uuid,
    created_at: OffsetDateTime,
}

impl RaceListRow {
    fn into_entity(self) -> PgResult<RaceListItemEntity> {
        Ok(RaceListItemEntity {
            id: self.id,
            game_name: self.game_name,
            category_name: self.category_name,
            objective: self.objective,
            status: self
                .status
                .parse()
                .map_err(|source| PgDaoError::CorruptStatus { source })?,
            participant_count: self.participant_count.max(0) as u32,
            max_participants: self.max_participants.max(0) as u32,
            has_password: self.has_password,
            owner_id: self.owner_id,
            created_at: self.created_at,
        })
    }
}

/// PostgreSQL-backed implementation of [`RaceStore`].
#[derive(Clone)]
pub struct PgRaceStore {
    pool: PgPool,
}

impl PgRaceStore {
    /// Open a connection pool and ensure the schema exists.
    pub async fn connect(config: PgConfig) -> PgResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(|source| PgDaoError::Connect { source })?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> PgResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|source| PgDaoError::Schema { source })?;
        Ok(())
    }

    async fn ping(&self) -> PgResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|source| PgDaoError::Query {
                context: "ping",
                source,
            })?;
        Ok(())
    }
}

impl RaceStore for PgRaceStore {
    fn create_race(
        &self,
        race: RaceEntity,
        creator: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let mut tx = pool.begin().await.map_err(|source| PgDaoError::Query {
                context: "create race (begin)",
                source,
            })?;

            let insert_race = format!(
                "INSERT INTO races ({RACE_COLUMNS}) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
            );
            sqlx::query(&insert_race)
                .bind(race.id)
                .bind(&race.game_id)
                .bind(&race.game_name)
                .bind(&race.category_id)
                .bind(&race.category_name)
                .bind(&race.objective)
                .bind(race.status.as_wire())
                .bind(race.max_participants as i32)
                .bind(&race.password)
                .bind(race.owner_id)
                .bind(race.created_at)
                .bind(race.updated_at)
                .bind(race.started_at)
                .bind(race.ended_at)
                .execute(&mut *tx)
                .await
                .map_err(|source| PgDaoError::Query {
                    context: "create race",
                    source,
                })?;

            let insert_creator = format!(
                "INSERT INTO race_participants ({PARTICIPANT_COLUMNS}) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)"
            );
            sqlx::query(&insert_creator)
                .bind(creator.race_id)
                .bind(creator.user_id)
                .bind(creator.status.as_wire())
                .bind(creator.finish_time_ms.map(|ms| ms as i64))
                .bind(&creator.stream_url)
                .bind(creator.placement.map(|p| p as i32))
                .bind(creator.joined_at)
                .execute(&mut *tx)
                .await
                .map_err(|source| PgDaoError::Query {
                    context: "enroll creator",
                    source,
                })?;

            tx.commit().await.map_err(|source| PgDaoError::Query {
                context: "create race (commit)",
                source,
            })?;
            Ok(())
        })
    }

    fn find_race(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RaceEntity>>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let query = format!("SELECT {RACE_COLUMNS} FROM races WHERE id = $1");
            let row = sqlx::query_as::<_, RaceRow>(&query)
                .bind(id)
                .fetch_optional(&pool)
                .await
                .map_err(|source| PgDaoError::Query {
                    context: "find race",
                    source,
                })?;
            Ok(row.map(RaceRow::into_entity).transpose()?)
        })
    }

    fn list_races(&self) -> BoxFuture<'static, StorageResult<Vec<RaceListItemEntity>>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let query = "SELECT r.id, r.game_name, r.category_name, r.objective, r.status, \
                 COUNT(p.user_id) AS participant_count, r.max_participants, \
                 (r.password IS NOT NULL) AS has_password, r.owner_id, r.created_at \
                 FROM races r \
                 LEFT JOIN race_participants p ON p.race_id = r.id \
                 GROUP BY r.id \
                 ORDER BY r.created_at DESC";
            let rows = sqlx::query_as::<_, RaceListRow>(query)
                .fetch_all(&pool)
                .await
                .map_err(|source| PgDaoError::Query {
                    context: "list races",
                    source,
                })?;
            rows.into_iter()
                .map(|row| row.into_entity().map_err(Into::into))
                .collect()
        })
    }

    fn update_race(&self, race: RaceEntity) -> BoxFuture<'static, StorageResult<()>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            sqlx::query(
                "UPDATE races SET status = $2, updated_at = $3, started_at = $4, ended_at = $5 \
                 WHERE id = $1",
            )
            .bind(race.id)
            .bind(race.status.as_wire())
            .bind(race.updated_at)
            .bind(race.started_at)
            .bind(race.ended_at)
            .execute(&pool)
            .await
            .map_err(|source| PgDaoError::Query {
                context: "update race",
                source,
            })?;
            Ok(())
        })
    }

    fn delete_race(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM races WHERE id = $1")
                .bind(id)
                .execute(&pool)
                .await
                .map_err(|source| PgDaoError::Query {
                    context: "delete race",
                    source,
                })?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn insert_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<JoinOutcome>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let mut tx = pool.begin().await.map_err(|source| PgDaoError::Query {
                context: "join race (begin)",
                source,
            })?;

            // Locking the race row serializes concurrent joins for the same
            // race, closing the check-then-act window on the cap.
            let cap: Option<(i32,)> =
                sqlx::query_as("SELECT max_participants FROM races WHERE id = $1 FOR UPDATE")
                    .bind(participant.race_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(|source| PgDaoError::Query {
                        context: "join race (lock)",
                        source,
                    })?;

            let Some((max_participants,)) = cap else {
                return Ok(JoinOutcome::RaceMissing);
            };

            let already: Option<(i64,)> = sqlx::query_as(
                "SELECT 1::BIGINT FROM race_participants WHERE race_id = $1 AND user_id = $2",
            )
            .bind(participant.race_id)
            .bind(participant.user_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|source| PgDaoError::Query {
                context: "join race (membership check)",
                source,
            })?;

            if already.is_some() {
                return Ok(JoinOutcome::AlreadyJoined);
            }

            let (count,): (i64,) =
                sqlx::query_as("SELECT COUNT(*) FROM race_participants WHERE race_id = $1")
                    .bind(participant.race_id)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|source| PgDaoError::Query {
                        context: "join race (count)",
                        source,
                    })?;

            if count >= max_participants as i64 {
                return Ok(JoinOutcome::RaceFull);
            }

            let insert = format!(
                "INSERT INTO race_participants ({PARTICIPANT_COLUMNS}) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)"
            );
            sqlx::query(&insert)
                .bind(participant.race_id)
                .bind(participant.user_id)
                .bind(participant.status.as_wire())
                .bind(participant.finish_time_ms.map(|ms| ms as i64))
                .bind(&participant.stream_url)
                .bind(participant.placement.map(|p| p as i32))
                .bind(participant.joined_at)
                .execute(&mut *tx)
                .await
                .map_err(|source| PgDaoError::Query {
                    context: "join race (insert)",
                    source,
                })?;

            sqlx::query("UPDATE races SET updated_at = $2 WHERE id = $1")
                .bind(participant.race_id)
                .bind(participant.joined_at)
                .execute(&mut *tx)
                .await
                .map_err(|source| PgDaoError::Query {
                    context: "join race (touch)",
                    source,
                })?;

            tx.commit().await.map_err(|source| PgDaoError::Query {
                context: "join race (commit)",
                source,
            })?;
            Ok(JoinOutcome::Joined)
        })
    }

    fn find_participant(
        &self,
        race_id: Uuid,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let query = format!(
                "SELECT {PARTICIPANT_COLUMNS} FROM race_participants \
                 WHERE race_id = $1 AND user_id = $2"
            );
            let row = sqlx::query_as::<_, ParticipantRow>(&query)
                .bind(race_id)
                .bind(user_id)
                .fetch_optional(&pool)
                .await
                .map_err(|source| PgDaoError::Query {
                    context: "find participant",
                    source,
                })?;
            Ok(row.map(ParticipantRow::into_entity).transpose()?)
        })
    }

    fn list_participants(
        &self,
        race_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let query = format!(
                "SELECT {PARTICIPANT_COLUMNS} FROM race_participants \
                 WHERE race_id = $1 ORDER BY joined_at ASC"
            );
            let rows = sqlx::query_as::<_, ParticipantRow>(&query)
                .bind(race_id)
                .fetch_all(&pool)
                .await
                .map_err(|source| PgDaoError::Query {
                    context: "list participants",
                    source,
                })?;
            rows.into_iter()
                .map(|row| row.into_entity().map_err(Into::into))
                .collect()
        })
    }

    fn update_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let result = sqlx::query(
                "UPDATE race_participants \
                 SET status = $3, finish_time_ms = $4, stream_url = $5, placement = $6 \
                 WHERE race_id = $1 AND user_id = $2",
            )
            .bind(participant.race_id)
            .bind(participant.user_id)
            .bind(participant.status.as_wire())
            .bind(participant.finish_time_ms.map(|ms| ms as i64))
            .bind(&participant.stream_url)
            .bind(participant.placement.map(|p| p as i32))
            .execute(&pool)
            .await
            .map_err(|source| PgDaoError::Query {
                context: "update participant",
                source,
            })?;

            let updated = result.rows_affected() > 0;
            if updated {
                sqlx::query("UPDATE races SET updated_at = NOW() WHERE id = $1")
                    .bind(participant.race_id)
                    .execute(&pool)
                    .await
                    .map_err(|source| PgDaoError::Query {
                        context: "update participant (touch)",
                        source,
                    })?;
            }
            Ok(updated)
        })
    }

    fn remove_participant(
        &self,
        race_id: Uuid,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let result =
                sqlx::query("DELETE FROM race_participants WHERE race_id = $1 AND user_id = $2")
                    .bind(race_id)
                    .bind(user_id)
                    .execute(&pool)
                    .await
                    .map_err(|source| PgDaoError::Query {
                        context: "remove participant",
                        source,
                    })?;

            let removed = result.rows_affected() > 0;
            if removed {
                sqlx::query("UPDATE races SET updated_at = NOW() WHERE id = $1")
                    .bind(race_id)
                    .execute(&pool)
                    .await
                    .map_err(|source| PgDaoError::Query {
                        context: "remove participant (touch)",
                        source,
                    })?;
            }
            Ok(removed)
        })
    }

    fn insert_message(
        &self,
        message: RaceMessageEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let query = format!(
                "INSERT INTO race_messages ({MESSAGE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6)"
            );
            sqlx::query(&query)
                .bind(message.id)
                .bind(message.race_id)
                .bind(message.author_id)
                .bind(&message.content)
                .bind(message.kind.as_wire())
                .bind(message.created_at)
                .execute(&pool)
                .await
                .map_err(|source| PgDaoError::Query {
                    context: "insert message",
                    source,
                })?;
            Ok(())
        })
    }

    fn list_messages(
        &self,
        race_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<RaceMessageEntity>>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let query = format!(
                "SELECT {MESSAGE_COLUMNS} FROM race_messages \
                 WHERE race_id = $1 ORDER BY created_at ASC"
            );
            let rows = sqlx::query_as::<_, MessageRow>(&query)
                .bind(race_id)
                .fetch_all(&pool)
                .await
                .map_err(|source| PgDaoError::Query {
                    context: "list messages",
                    source,
                })?;
            rows.into_iter()
                .map(|row| row.into_entity().map_err(Into::into))
                .collect()
        })
    }

    fn count_stale_finished(
        &self,
        cutoff: OffsetDateTime,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let (count,): (i64,) = sqlx::query_as(
                "SELECT COUNT(*) FROM races WHERE status = 'finished' AND updated_at <= $1",
            )
            .bind(cutoff)
            .fetch_one(&pool)
            .await
            .map_err(|source| PgDaoError::Query {
                context: "count stale races",
                source,
            })?;
            Ok(count.max(0) as u64)
        })
    }

    fn delete_stale_finished(
        &self,
        cutoff: OffsetDateTime,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let result = sqlx::query(
                "DELETE FROM races WHERE status = 'finished' AND updated_at <= $1",
            )
            .bind(cutoff)
            .execute(&pool)
            .await
            .map_err(|source| PgDaoError::Query {
                context: "delete stale races",
                source,
            })?;
            Ok(result.rows_affected())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            // The pool re-establishes connections on demand; a successful
            // ping means we are back.
            store.ping().await.map_err(Into::into)
        })
    }
}
