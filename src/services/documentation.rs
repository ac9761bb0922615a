use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Glitchless Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::races::create_race,
        crate::routes::races::list_races,
        crate::routes::races::get_race,
        crate::routes::races::delete_race,
        crate::routes::races::join_race,
        crate::routes::races::leave_race,
        crate::routes::races::update_status,
        crate::routes::races::send_message,
        crate::routes::races::list_messages,
        crate::routes::races::trigger_cleanup,
        crate::routes::catalog::search_games,
        crate::routes::catalog::search_games_exhaustive,
        crate::routes::catalog::popular_games,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::races::CreateRaceRequest,
            crate::dto::races::JoinRaceRequest,
            crate::dto::races::UpdateStatusRequest,
            crate::dto::races::ChatMessageRequest,
            crate::dto::races::RaceSummary,
            crate::dto::races::RaceDetail,
            crate::dto::races::ParticipantView,
            crate::dto::races::MessageView,
            crate::dto::races::ActionResponse,
            crate::dto::races::CleanupResponse,
            crate::dto::catalog::GameView,
            crate::dto::catalog::GameListResponse,
            crate::races::status::RaceStatus,
            crate::races::status::ParticipantStatus,
            crate::dao::models::MessageKind,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "races", description = "Race rooms, membership, and chat"),
        (name = "catalog", description = "Remote speedrun catalog queries"),
    )
)]
pub struct ApiDoc;
