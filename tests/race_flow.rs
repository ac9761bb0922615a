//! End-to-end race lifecycle scenarios running against the in-memory store.

use std::sync::Arc;

use time::{Duration as TimeDuration, OffsetDateTime};
use uuid::Uuid;

use glitchless_back::catalog::{CatalogAggregator, CatalogClient};
use glitchless_back::config::AppConfig;
use glitchless_back::dao::race_store::memory::MemoryRaceStore;
use glitchless_back::dto::races::{
    ChatMessageRequest, CreateRaceRequest, JoinRaceRequest, UpdateStatusRequest,
};
use glitchless_back::error::ServiceError;
use glitchless_back::races::status::{ParticipantStatus, RaceStatus};
use glitchless_back::services::{cleanup_service, race_service};
use glitchless_back::state::{AppState, SharedState};

async fn test_state() -> SharedState {
    let config = AppConfig::default();
    let client =
        CatalogClient::new(&config.catalog_base_url, config.catalog_timeout).expect("client");
    let aggregator = CatalogAggregator::new(client, config.aggregator.clone());
    let state = AppState::new(config, aggregator);
    state
        .set_race_store(Arc::new(MemoryRaceStore::new()))
        .await;
    state
}

fn create_request(password: Option<&str>, max_participants: Option<u32>) -> CreateRaceRequest {
    CreateRaceRequest {
        game_id: "9d3rr0dl".into(),
        game_name: "Ocarina of Time".into(),
        category_id: "z275w5k0".into(),
        category_name: "100%".into(),
        objective: Some("all medallions".into()),
        max_participants,
        password: password.map(Into::into),
    }
}

fn status_request(status: ParticipantStatus) -> UpdateStatusRequest {
    UpdateStatusRequest {
        status,
        finish_time_ms: None,
        stream_url: None,
    }
}

fn finish_request(finish_time_ms: u64) -> UpdateStatusRequest {
    UpdateStatusRequest {
        status: ParticipantStatus::Finished,
        finish_time_ms: Some(finish_time_ms),
        stream_url: None,
    }
}

#[tokio::test]
async fn creator_is_auto_enrolled_and_owns_the_race() {
    let state = test_state().await;
    let owner = Uuid::new_v4();

    let detail = race_service::create_race(&state, owner, create_request(None, None))
        .await
        .unwrap();

    assert_eq!(detail.status, RaceStatus::Waiting);
    assert_eq!(detail.owner_id, owner);
    assert_eq!(detail.max_participants, 4);
    assert_eq!(detail.participants.len(), 1);
    assert_eq!(detail.participants[0].user_id, owner);
    assert_eq!(detail.participants[0].status, ParticipantStatus::Enrolled);
    assert!(!detail.has_password);

    let summaries = race_service::list_races(&state).await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].participant_count, 1);
}

#[tokio::test]
async fn join_enforces_password_cap_and_uniqueness() {
    let state = test_state().await;
    let owner = Uuid::new_v4();
    let detail = race_service::create_race(&state, owner, create_request(Some("hunter2"), Some(2)))
        .await
        .unwrap();
    let race_id = detail.id;

    let guest = Uuid::new_v4();
    let wrong = race_service::join_race(
        &state,
        race_id,
        guest,
        JoinRaceRequest {
            password: Some("wrong".into()),
        },
    )
    .await;
    assert!(matches!(wrong, Err(ServiceError::Conflict(_))));

    // The failed attempt must leave no trace: nobody enrolled, and the
    // chat log still holds only the creation announcement.
    let detail = race_service::get_race(&state, race_id).await.unwrap();
    assert_eq!(detail.participants.len(), 1);
    assert_eq!(detail.messages.len(), 1);
    assert!(detail.messages[0].content.ends_with("created the race"));

    let joined = race_service::join_race(
        &state,
        race_id,
        guest,
        JoinRaceRequest {
            password: Some("hunter2".into()),
        },
    )
    .await
    .unwrap();
    assert_eq!(joined.participants.len(), 2);

    let again = race_service::join_race(
        &state,
        race_id,
        guest,
        JoinRaceRequest {
            password: Some("hunter2".into()),
        },
    )
    .await;
    assert!(matches!(again, Err(ServiceError::Conflict(_))));

    let third = race_service::join_race(
        &state,
        race_id,
        Uuid::new_v4(),
        JoinRaceRequest {
            password: Some("hunter2".into()),
        },
    )
    .await;
    assert!(matches!(third, Err(ServiceError::Conflict(_))));
}

#[tokio::test]
async fn two_player_race_runs_to_completion() {
    let state = test_state().await;
    let owner = Uuid::new_v4();
    let guest = Uuid::new_v4();

    let detail = race_service::create_race(&state, owner, create_request(None, None))
        .await
        .unwrap();
    let race_id = detail.id;
    race_service::join_race(&state, race_id, guest, JoinRaceRequest::default())
        .await
        .unwrap();

    // One ready participant is not enough to arm the race.
    let detail =
        race_service::update_status(&state, race_id, owner, status_request(ParticipantStatus::Ready))
            .await
            .unwrap();
    assert_eq!(detail.status, RaceStatus::Waiting);

    let detail =
        race_service::update_status(&state, race_id, guest, status_request(ParticipantStatus::Ready))
            .await
            .unwrap();
    assert_eq!(detail.status, RaceStatus::Ready);

    let detail = race_service::update_status(
        &state,
        race_id,
        owner,
        status_request(ParticipantStatus::Racing),
    )
    .await
    .unwrap();
    assert_eq!(detail.status, RaceStatus::Running);
    assert!(detail.started_at.is_some());

    let detail = race_service::update_status(&state, race_id, owner, finish_request(12_000))
        .await
        .unwrap();
    // Guest has not finished yet; the race keeps running.
    assert_eq!(detail.status, RaceStatus::Running);

    let guest_detail = race_service::update_status(
        &state,
        race_id,
        guest,
        status_request(ParticipantStatus::Racing),
    )
    .await
    .unwrap();
    assert_eq!(guest_detail.status, RaceStatus::Running);

    let finished = race_service::update_status(&state, race_id, guest, finish_request(15_345))
        .await
        .unwrap();
    assert_eq!(finished.status, RaceStatus::Finished);
    assert!(finished.ended_at.is_some());

    let owner_entry = finished
        .participants
        .iter()
        .find(|p| p.user_id == owner)
        .unwrap();
    let guest_entry = finished
        .participants
        .iter()
        .find(|p| p.user_id == guest)
        .unwrap();
    assert_eq!(owner_entry.placement, Some(1));
    assert_eq!(owner_entry.finish_time_ms, Some(12_000));
    assert_eq!(guest_entry.placement, Some(2));

    // The chat log narrates the finishes with formatted durations.
    let contents: Vec<&str> = finished
        .messages
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    assert!(contents.iter().any(|c| c.ends_with("finished in 0:12.000")));
    assert!(contents.iter().any(|c| c.ends_with("finished in 0:15.345")));

    // A finished race is terminal for everyone.
    let late = race_service::update_status(
        &state,
        race_id,
        guest,
        status_request(ParticipantStatus::Ready),
    )
    .await;
    assert!(matches!(late, Err(ServiceError::Conflict(_))));
}

#[tokio::test]
async fn abandoning_counts_toward_completion_without_a_time() {
    let state = test_state().await;
    let owner = Uuid::new_v4();
    let guest = Uuid::new_v4();

    let detail = race_service::create_race(&state, owner, create_request(None, None))
        .await
        .unwrap();
    let race_id = detail.id;
    race_service::join_race(&state, race_id, guest, JoinRaceRequest::default())
        .await
        .unwrap();

    for user in [owner, guest] {
        race_service::update_status(&state, race_id, user, status_request(ParticipantStatus::Ready))
            .await
            .unwrap();
    }
    for user in [owner, guest] {
        race_service::update_status(
            &state,
            race_id,
            user,
            status_request(ParticipantStatus::Racing),
        )
        .await
        .unwrap();
    }

    race_service::update_status(&state, race_id, owner, finish_request(90_000))
        .await
        .unwrap();
    let detail = race_service::update_status(
        &state,
        race_id,
        guest,
        status_request(ParticipantStatus::Abandoned),
    )
    .await
    .unwrap();

    assert_eq!(detail.status, RaceStatus::Finished);
    let abandoned = detail
        .participants
        .iter()
        .find(|p| p.user_id == guest)
        .unwrap();
    assert_eq!(abandoned.status, ParticipantStatus::Abandoned);
    assert_eq!(abandoned.finish_time_ms, None);
    assert_eq!(abandoned.placement, None);
}

#[tokio::test]
async fn unready_is_allowed_but_skipping_ready_is_not() {
    let state = test_state().await;
    let owner = Uuid::new_v4();
    let detail = race_service::create_race(&state, owner, create_request(None, None))
        .await
        .unwrap();
    let race_id = detail.id;

    // Straight to racing without readying first is rejected.
    let skip = race_service::update_status(
        &state,
        race_id,
        owner,
        status_request(ParticipantStatus::Racing),
    )
    .await;
    assert!(matches!(skip, Err(ServiceError::Conflict(_))));

    race_service::update_status(&state, race_id, owner, status_request(ParticipantStatus::Ready))
        .await
        .unwrap();
    let detail = race_service::update_status(
        &state,
        race_id,
        owner,
        status_request(ParticipantStatus::Enrolled),
    )
    .await
    .unwrap();
    assert_eq!(
        detail.participants[0].status,
        ParticipantStatus::Enrolled
    );
}

#[tokio::test]
async fn owner_leaving_alone_deletes_the_race() {
    let state = test_state().await;
    let owner = Uuid::new_v4();
    let detail = race_service::create_race(&state, owner, create_request(None, None))
        .await
        .unwrap();

    let deleted = race_service::leave_race(&state, detail.id, owner).await.unwrap();
    assert!(deleted);

    let gone = race_service::get_race(&state, detail.id).await;
    assert!(matches!(gone, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn guest_leaving_keeps_the_race_alive() {
    let state = test_state().await;
    let owner = Uuid::new_v4();
    let guest = Uuid::new_v4();
    let detail = race_service::create_race(&state, owner, create_request(None, None))
        .await
        .unwrap();
    race_service::join_race(&state, detail.id, guest, JoinRaceRequest::default())
        .await
        .unwrap();

    let deleted = race_service::leave_race(&state, detail.id, guest).await.unwrap();
    assert!(!deleted);

    let detail = race_service::get_race(&state, detail.id).await.unwrap();
    assert_eq!(detail.participants.len(), 1);
    assert_eq!(detail.participants[0].user_id, owner);
}

#[tokio::test]
async fn only_the_owner_may_delete_a_race() {
    let state = test_state().await;
    let owner = Uuid::new_v4();
    let guest = Uuid::new_v4();
    let detail = race_service::create_race(&state, owner, create_request(None, None))
        .await
        .unwrap();
    race_service::join_race(&state, detail.id, guest, JoinRaceRequest::default())
        .await
        .unwrap();

    let denied = race_service::delete_race(&state, detail.id, guest).await;
    assert!(matches!(denied, Err(ServiceError::Unauthorized(_))));

    race_service::delete_race(&state, detail.id, owner).await.unwrap();
    let gone = race_service::get_race(&state, detail.id).await;
    assert!(matches!(gone, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn chat_is_reserved_to_participants() {
    let state = test_state().await;
    let owner = Uuid::new_v4();
    let detail = race_service::create_race(&state, owner, create_request(None, None))
        .await
        .unwrap();

    let outsider = Uuid::new_v4();
    let denied = race_service::send_message(
        &state,
        detail.id,
        outsider,
        ChatMessageRequest {
            content: "glhf".into(),
        },
    )
    .await;
    assert!(matches!(denied, Err(ServiceError::NotFound(_))));

    race_service::send_message(
        &state,
        detail.id,
        owner,
        ChatMessageRequest {
            content: "glhf".into(),
        },
    )
    .await
    .unwrap();
    let messages = race_service::list_messages(&state, detail.id).await.unwrap();
    assert!(messages.iter().any(|m| m.content == "glhf"));
}

#[tokio::test]
async fn cleanup_deletes_only_races_past_the_retention_window() {
    let state = test_state().await;
    let store = Arc::new(MemoryRaceStore::new());
    state.set_race_store(store.clone()).await;

    let owner = Uuid::new_v4();
    let stale = race_service::create_race(&state, owner, create_request(None, None))
        .await
        .unwrap();
    let fresh = race_service::create_race(&state, owner, create_request(None, None))
        .await
        .unwrap();

    // Backdate the first race into a finished state past the retention
    // window; the second one finished just now.
    use glitchless_back::dao::race_store::RaceStore;
    let mut race = store.find_race(stale.id).await.unwrap().unwrap();
    race.status = RaceStatus::Finished;
    race.updated_at = OffsetDateTime::now_utc() - TimeDuration::hours(2);
    store.update_race(race).await.unwrap();

    let mut race = store.find_race(fresh.id).await.unwrap().unwrap();
    race.status = RaceStatus::Finished;
    store.update_race(race).await.unwrap();

    let outcome = cleanup_service::sweep(&state, false).await.unwrap();
    assert!(outcome.ran);
    assert_eq!(outcome.deleted, 1);

    assert!(race_service::get_race(&state, stale.id).await.is_err());
    assert!(race_service::get_race(&state, fresh.id).await.is_ok());

    // A second sweep right away is throttled unless forced.
    let throttled = cleanup_service::sweep(&state, false).await.unwrap();
    assert!(!throttled.ran);
    let forced = cleanup_service::sweep(&state, true).await.unwrap();
    assert!(forced.ran);
    assert_eq!(forced.deleted, 0);
}
