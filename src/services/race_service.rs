//! Race lifecycle operations: room creation, membership, status updates,
//! and the chat log.
//!
//! Every mutation follows the same shape: persist the participant-level
//! change first, then re-fetch the room and let [`crate::races::lifecycle`]
//! decide whether the race itself advances. System messages narrating the
//! change are appended on the way out.

use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::dao::models::{MessageKind, ParticipantEntity, RaceEntity, RaceMessageEntity};
use crate::dao::race_store::{JoinOutcome, RaceStore};
use crate::dto::races::{
    ChatMessageRequest, CreateRaceRequest, JoinRaceRequest, MessageView, RaceDetail, RaceSummary,
    UpdateStatusRequest,
};
use crate::error::ServiceError;
use crate::races::lifecycle;
use crate::races::status::{ParticipantStatus, RaceStatus};
use crate::services::cleanup_service;
use crate::state::SharedState;

use std::sync::Arc;

/// Participant cap applied when the creation payload omits one.
const DEFAULT_MAX_PARTICIPANTS: u32 = 4;

/// Create a race room and auto-enroll its creator.
pub async fn create_race(
    state: &SharedState,
    owner_id: Uuid,
    request: CreateRaceRequest,
) -> Result<RaceDetail, ServiceError> {
    let store = state.require_race_store().await?;
    let now = OffsetDateTime::now_utc();
    let race = RaceEntity {
        id: Uuid::new_v4(),
        game_id: request.game_id,
        game_name: request.game_name,
        category_id: request.category_id,
        category_name: request.category_name,
        objective: request.objective,
        status: RaceStatus::Waiting,
        max_participants: request.max_participants.unwrap_or(DEFAULT_MAX_PARTICIPANTS),
        password: request.password.filter(|p| !p.is_empty()),
        owner_id,
        created_at: now,
        updated_at: now,
        started_at: None,
        ended_at: None,
    };
    let creator = ParticipantEntity {
        race_id: race.id,
        user_id: owner_id,
        status: ParticipantStatus::Enrolled,
        finish_time_ms: None,
        stream_url: None,
        placement: None,
        joined_at: now,
    };

    let race_id = race.id;
    store.create_race(race, creator).await?;
    append_system_message(
        &store,
        race_id,
        format!("{} created the race", participant_name(owner_id)),
    )
    .await?;
    info!(%race_id, %owner_id, "race created");

    assemble_detail(&store, race_id).await
}

/// List every race as a summary projection, newest first.
pub async fn list_races(state: &SharedState) -> Result<Vec<RaceSummary>, ServiceError> {
    let store = state.require_race_store().await?;
    let races = store.list_races().await?;
    Ok(races.into_iter().map(Into::into).collect())
}

/// Fetch one race with its participants and chat log.
pub async fn get_race(state: &SharedState, race_id: Uuid) -> Result<RaceDetail, ServiceError> {
    let store = state.require_race_store().await?;
    assemble_detail(&store, race_id).await
}

/// Join an open race, enforcing its password and participant cap.
pub async fn join_race(
    state: &SharedState,
    race_id: Uuid,
    user_id: Uuid,
    request: JoinRaceRequest,
) -> Result<RaceDetail, ServiceError> {
    let store = state.require_race_store().await?;
    let race = require_race(&store, race_id).await?;

    if race.status != RaceStatus::Waiting {
        return Err(ServiceError::Conflict(format!(
            "race is {} and no longer accepts participants",
            race.status
        )));
    }
    if let Some(expected) = &race.password
        && request.password.as_deref() != Some(expected.as_str())
    {
        return Err(ServiceError::Conflict("wrong race password".into()));
    }

    let participant = ParticipantEntity {
        race_id,
        user_id,
        status: ParticipantStatus::Enrolled,
        finish_time_ms: None,
        stream_url: None,
        placement: None,
        joined_at: OffsetDateTime::now_utc(),
    };
    match store.insert_participant(participant).await? {
        JoinOutcome::Joined => {}
        JoinOutcome::RaceMissing => {
            return Err(ServiceError::NotFound(format!("race {race_id}")));
        }
        JoinOutcome::AlreadyJoined => {
            return Err(ServiceError::Conflict("already enrolled in this race".into()));
        }
        JoinOutcome::RaceFull => {
            return Err(ServiceError::Conflict("race is full".into()));
        }
    }

    append_system_message(
        &store,
        race_id,
        format!("{} joined the race", participant_name(user_id)),
    )
    .await?;
    info!(%race_id, %user_id, "participant joined");

    assemble_detail(&store, race_id).await
}

/// Leave a race before it starts. When the owner is the last participant,
/// the whole room is deleted; the returned flag reports that case.
pub async fn leave_race(
    state: &SharedState,
    race_id: Uuid,
    user_id: Uuid,
) -> Result<bool, ServiceError> {
    let store = state.require_race_store().await?;
    let race = require_race(&store, race_id).await?;
    let participant = require_participant(&store, race_id, user_id).await?;

    if matches!(
        participant.status,
        ParticipantStatus::Racing | ParticipantStatus::Finished
    ) {
        return Err(ServiceError::Conflict(
            "cannot leave mid-race; abandon instead".into(),
        ));
    }

    let participants = store.list_participants(race_id).await?;
    if race.owner_id == user_id && participants.len() == 1 {
        store.delete_race(race_id).await?;
        info!(%race_id, %user_id, "owner left; race deleted");
        return Ok(true);
    }

    if !store.remove_participant(race_id, user_id).await? {
        return Err(ServiceError::NotFound(format!(
            "user {user_id} in race {race_id}"
        )));
    }
    append_system_message(
        &store,
        race_id,
        format!("{} left the race", participant_name(user_id)),
    )
    .await?;
    info!(%race_id, %user_id, "participant left");

    advance_race(&store, race_id).await?;
    Ok(false)
}

/// Delete a race. Only its owner may do so.
pub async fn delete_race(
    state: &SharedState,
    race_id: Uuid,
    user_id: Uuid,
) -> Result<(), ServiceError> {
    let store = state.require_race_store().await?;
    let race = require_race(&store, race_id).await?;
    if race.owner_id != user_id {
        return Err(ServiceError::Unauthorized(
            "only the race owner may delete it".into(),
        ));
    }
    store.delete_race(race_id).await?;
    info!(%race_id, %user_id, "race deleted by owner");
    Ok(())
}

/// Update the caller's status inside a race, narrate the change, and let
/// the room advance when the new snapshot warrants it.
pub async fn update_status(
    state: &SharedState,
    race_id: Uuid,
    user_id: Uuid,
    request: UpdateStatusRequest,
) -> Result<RaceDetail, ServiceError> {
    let store = state.require_race_store().await?;
    let race = require_race(&store, race_id).await?;
    if race.status == RaceStatus::Finished {
        return Err(ServiceError::Conflict("race is already finished".into()));
    }

    let mut participant = require_participant(&store, race_id, user_id).await?;
    let next = participant.status.transition_to(request.status)?;

    participant.status = next;
    if let Some(url) = request.stream_url {
        participant.stream_url = Some(url);
    }
    match next {
        ParticipantStatus::Finished => {
            participant.finish_time_ms = request.finish_time_ms;
            let others = store
                .list_participants(race_id)
                .await?
                .into_iter()
                .filter(|p| p.user_id != user_id)
                .map(|p| p.status)
                .collect::<Vec<_>>();
            participant.placement = Some(lifecycle::next_placement(&others));
        }
        ParticipantStatus::Enrolled => {
            // Un-readying clears nothing but the readiness itself.
        }
        _ => {}
    }

    if !store.update_participant(participant).await? {
        return Err(ServiceError::NotFound(format!(
            "user {user_id} in race {race_id}"
        )));
    }

    if let Some(line) = lifecycle::narration(
        &participant_name(user_id),
        next,
        request.finish_time_ms.filter(|_| next == ParticipantStatus::Finished),
    ) {
        append_system_message(&store, race_id, line).await?;
    }
    info!(%race_id, %user_id, status = %next, "participant status updated");

    if advance_race(&store, race_id).await? == Some(RaceStatus::Finished) {
        // A finish is the natural moment to look for stale rooms; the sweep
        // throttles itself.
        let state = Arc::clone(state);
        tokio::spawn(async move {
            if let Err(err) = cleanup_service::sweep(&state, false).await {
                tracing::debug!(error = %err, "post-finish cleanup check failed");
            }
        });
    }
    assemble_detail(&store, race_id).await
}

/// Post a chat message into a race. Only participants may write.
pub async fn send_message(
    state: &SharedState,
    race_id: Uuid,
    user_id: Uuid,
    request: ChatMessageRequest,
) -> Result<MessageView, ServiceError> {
    let store = state.require_race_store().await?;
    require_race(&store, race_id).await?;
    require_participant(&store, race_id, user_id).await?;

    let message = RaceMessageEntity {
        id: Uuid::new_v4(),
        race_id,
        author_id: Some(user_id),
        content: request.content,
        kind: MessageKind::Chat,
        created_at: OffsetDateTime::now_utc(),
    };
    let view = MessageView::from(message.clone());
    store.insert_message(message).await?;
    Ok(view)
}

/// List a race's chat log, oldest first.
pub async fn list_messages(
    state: &SharedState,
    race_id: Uuid,
) -> Result<Vec<MessageView>, ServiceError> {
    let store = state.require_race_store().await?;
    require_race(&store, race_id).await?;
    let messages = store.list_messages(race_id).await?;
    Ok(messages.into_iter().map(Into::into).collect())
}

/// Short display handle derived from a user id, used in system messages
/// until profiles carry display names.
fn participant_name(user_id: Uuid) -> String {
    let id = user_id.to_string();
    format!("runner-{}", &id[..8])
}

async fn require_race(
    store: &Arc<dyn RaceStore>,
    race_id: Uuid,
) -> Result<RaceEntity, ServiceError> {
    store
        .find_race(race_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("race {race_id}")))
}

async fn require_participant(
    store: &Arc<dyn RaceStore>,
    race_id: Uuid,
    user_id: Uuid,
) -> Result<ParticipantEntity, ServiceError> {
    store
        .find_participant(race_id, user_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("user {user_id} in race {race_id}")))
}

async fn append_system_message(
    store: &Arc<dyn RaceStore>,
    race_id: Uuid,
    content: String,
) -> Result<(), ServiceError> {
    let message = RaceMessageEntity {
        id: Uuid::new_v4(),
        race_id,
        author_id: None,
        content,
        kind: MessageKind::System,
        created_at: OffsetDateTime::now_utc(),
    };
    store.insert_message(message).await?;
    Ok(())
}

/// Re-fetch the room and advance the race-level status when the fresh
/// participant snapshot warrants it, stamping `started_at`/`ended_at`.
/// Returns the new race status when the room moved.
async fn advance_race(
    store: &Arc<dyn RaceStore>,
    race_id: Uuid,
) -> Result<Option<RaceStatus>, ServiceError> {
    let Some(mut race) = store.find_race(race_id).await? else {
        // The room vanished between the mutation and the re-fetch.
        return Ok(None);
    };
    let statuses = store
        .list_participants(race_id)
        .await?
        .iter()
        .map(|p| p.status)
        .collect::<Vec<_>>();

    let Some(next) = lifecycle::next_status(race.status, &statuses) else {
        return Ok(None);
    };

    let now = OffsetDateTime::now_utc();
    race.status = next;
    race.updated_at = now;
    match next {
        RaceStatus::Running if race.started_at.is_none() => race.started_at = Some(now),
        RaceStatus::Finished => race.ended_at = Some(now),
        _ => {}
    }
    store.update_race(race).await?;
    info!(%race_id, status = %next, "race advanced");
    Ok(Some(next))
}

async fn assemble_detail(
    store: &Arc<dyn RaceStore>,
    race_id: Uuid,
) -> Result<RaceDetail, ServiceError> {
    let race = require_race(store, race_id).await?;
    let participants = store.list_participants(race_id).await?;
    let messages = store.list_messages(race_id).await?;
    Ok(RaceDetail::assemble(race, participants, messages))
}
