use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};
use axum_valid::Valid;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    dto::races::{
        ActionResponse, ChatMessageRequest, CleanupResponse, CreateRaceRequest, JoinRaceRequest,
        MessageView, RaceDetail, RaceSummary, UpdateStatusRequest,
    },
    error::AppError,
    services::{cleanup_service, race_service},
    state::SharedState,
};

/// Routes handling race rooms, membership, statuses, and chat.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/races", post(create_race).get(list_races))
        .route("/races/cleanup", post(trigger_cleanup))
        .route("/races/{id}", get(get_race).delete(delete_race))
        .route("/races/{id}/join", post(join_race))
        .route("/races/{id}/leave", post(leave_race))
        .route("/races/{id}/status", put(update_status))
        .route("/races/{id}/messages", post(send_message).get(list_messages))
}

/// Create a race room; the caller becomes owner and first participant.
#[utoipa::path(
    post,
    path = "/races",
    tag = "races",
    request_body = CreateRaceRequest,
    responses(
        (status = 201, description = "Race created", body = RaceDetail),
        (status = 400, description = "Invalid payload"),
        (status = 401, description = "Missing caller identity")
    )
)]
pub async fn create_race(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Valid(Json(payload)): Valid<Json<CreateRaceRequest>>,
) -> Result<(StatusCode, Json<RaceDetail>), AppError> {
    let detail = race_service::create_race(&state, user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// List every race as a summary, newest first.
#[utoipa::path(
    get,
    path = "/races",
    tag = "races",
    responses((status = 200, description = "Race summaries", body = [RaceSummary]))
)]
pub async fn list_races(
    State(state): State<SharedState>,
) -> Result<Json<Vec<RaceSummary>>, AppError> {
    let races = race_service::list_races(&state).await?;
    Ok(Json(races))
}

/// Fetch one race with its participants and chat log.
#[utoipa::path(
    get,
    path = "/races/{id}",
    tag = "races",
    params(("id" = Uuid, Path, description = "Race identifier")),
    responses(
        (status = 200, description = "Race detail", body = RaceDetail),
        (status = 404, description = "Race not found")
    )
)]
pub async fn get_race(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RaceDetail>, AppError> {
    let detail = race_service::get_race(&state, id).await?;
    Ok(Json(detail))
}

/// Delete a race. Only its owner may do so.
#[utoipa::path(
    delete,
    path = "/races/{id}",
    tag = "races",
    params(("id" = Uuid, Path, description = "Race identifier")),
    responses(
        (status = 200, description = "Race deleted", body = ActionResponse),
        (status = 401, description = "Caller is not the owner"),
        (status = 404, description = "Race not found")
    )
)]
pub async fn delete_race(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ActionResponse>, AppError> {
    race_service::delete_race(&state, id, user_id).await?;
    Ok(Json(ActionResponse::ok("race deleted")))
}

/// Join an open race.
#[utoipa::path(
    post,
    path = "/races/{id}/join",
    tag = "races",
    params(("id" = Uuid, Path, description = "Race identifier")),
    request_body = JoinRaceRequest,
    responses(
        (status = 200, description = "Joined", body = RaceDetail),
        (status = 404, description = "Race not found"),
        (status = 400, description = "Race full, already joined, wrong password, or already started")
    )
)]
pub async fn join_race(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
    payload: Option<Json<JoinRaceRequest>>,
) -> Result<Json<RaceDetail>, AppError> {
    let request = payload.map(|Json(body)| body).unwrap_or_default();
    let detail = race_service::join_race(&state, id, user_id, request).await?;
    Ok(Json(detail))
}

/// Leave a race before it starts.
#[utoipa::path(
    post,
    path = "/races/{id}/leave",
    tag = "races",
    params(("id" = Uuid, Path, description = "Race identifier")),
    responses(
        (status = 200, description = "Left the race", body = ActionResponse),
        (status = 404, description = "Race or membership not found"),
        (status = 400, description = "Race already running")
    )
)]
pub async fn leave_race(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ActionResponse>, AppError> {
    let race_deleted = race_service::leave_race(&state, id, user_id).await?;
    let message = if race_deleted {
        "left the race; empty race deleted"
    } else {
        "left the race"
    };
    Ok(Json(ActionResponse::ok(message)))
}

/// Update the caller's status inside a race.
#[utoipa::path(
    put,
    path = "/races/{id}/status",
    tag = "races",
    params(("id" = Uuid, Path, description = "Race identifier")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = RaceDetail),
        (status = 404, description = "Race or membership not found"),
        (status = 400, description = "Transition not allowed")
    )
)]
pub async fn update_status(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<RaceDetail>, AppError> {
    let detail = race_service::update_status(&state, id, user_id, payload).await?;
    Ok(Json(detail))
}

/// Post a chat message into a race.
#[utoipa::path(
    post,
    path = "/races/{id}/messages",
    tag = "races",
    params(("id" = Uuid, Path, description = "Race identifier")),
    request_body = ChatMessageRequest,
    responses(
        (status = 201, description = "Message posted", body = MessageView),
        (status = 404, description = "Race or membership not found")
    )
)]
pub async fn send_message(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<ChatMessageRequest>>,
) -> Result<(StatusCode, Json<MessageView>), AppError> {
    let message = race_service::send_message(&state, id, user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// List a race's chat log, oldest first.
#[utoipa::path(
    get,
    path = "/races/{id}/messages",
    tag = "races",
    params(("id" = Uuid, Path, description = "Race identifier")),
    responses(
        (status = 200, description = "Chat log", body = [MessageView]),
        (status = 404, description = "Race not found")
    )
)]
pub async fn list_messages(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<MessageView>>, AppError> {
    let messages = race_service::list_messages(&state, id).await?;
    Ok(Json(messages))
}

/// Query parameters of the cleanup trigger.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct CleanupParams {
    /// Bypass the sweep throttle when true.
    #[serde(default)]
    pub force: bool,
}

/// Trigger a cleanup sweep of stale finished races.
#[utoipa::path(
    post,
    path = "/races/cleanup",
    tag = "races",
    params(CleanupParams),
    responses(
        (status = 200, description = "Sweep outcome", body = CleanupResponse),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn trigger_cleanup(
    State(state): State<SharedState>,
    Query(params): Query<CleanupParams>,
) -> Result<Json<CleanupResponse>, AppError> {
    let outcome = cleanup_service::sweep(&state, params.force).await?;
    Ok(Json(CleanupResponse {
        ran: outcome.ran,
        deleted: outcome.deleted,
    }))
}
