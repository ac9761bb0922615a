//! DTO definitions for the race room REST API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::dao::models::{
    MessageKind, ParticipantEntity, RaceEntity, RaceListItemEntity, RaceMessageEntity,
};
use crate::dto::{format_timestamp, validation::validate_not_blank};
use crate::races::status::{ParticipantStatus, RaceStatus};

/// Payload creating a new race room. The caller becomes the owner and the
/// first enrolled participant.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateRaceRequest {
    /// Remote catalog identifier of the game.
    #[validate(custom(function = validate_not_blank))]
    pub game_id: String,
    /// Display name of the game.
    #[validate(custom(function = validate_not_blank))]
    pub game_name: String,
    /// Remote catalog identifier of the category.
    #[validate(custom(function = validate_not_blank))]
    pub category_id: String,
    /// Display name of the category.
    #[validate(custom(function = validate_not_blank))]
    pub category_name: String,
    /// Free-text objective shown to participants.
    #[serde(default)]
    pub objective: Option<String>,
    /// Participant cap; defaults to 4 when omitted.
    #[serde(default)]
    #[validate(range(min = 2, max = 50))]
    pub max_participants: Option<u32>,
    /// Optional room password.
    #[serde(default)]
    pub password: Option<String>,
}

/// Payload joining an existing race.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct JoinRaceRequest {
    /// Password of the room, when it has one.
    #[serde(default)]
    pub password: Option<String>,
}

/// Payload updating the caller's status inside a race.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    /// Requested status; accepts the wire literals and English aliases.
    pub status: ParticipantStatus,
    /// Finish duration in milliseconds; meaningful only with the finished
    /// status.
    #[serde(default, alias = "finishTime")]
    pub finish_time_ms: Option<u64>,
    /// Stream URL to display next to the participant.
    #[serde(default)]
    pub stream_url: Option<String>,
}

/// Payload posting a chat message into a race.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ChatMessageRequest {
    /// Message text.
    #[validate(custom(function = validate_not_blank))]
    pub content: String,
}

/// One participant as exposed by the API.
#[derive(Debug, Serialize, ToSchema)]
pub struct ParticipantView {
    /// Enrolled user.
    pub user_id: Uuid,
    /// Personal progress status.
    pub status: ParticipantStatus,
    /// Finish duration in milliseconds, when finished.
    pub finish_time_ms: Option<u64>,
    /// Stream URL, when announced.
    pub stream_url: Option<String>,
    /// Placement among finishers.
    pub placement: Option<u32>,
    /// Join timestamp (RFC 3339).
    pub joined_at: String,
}

impl From<ParticipantEntity> for ParticipantView {
    fn from(entity: ParticipantEntity) -> Self {
        Self {
            user_id: entity.user_id,
            status: entity.status,
            finish_time_ms: entity.finish_time_ms,
            stream_url: entity.stream_url,
            placement: entity.placement,
            joined_at: format_timestamp(entity.joined_at),
        }
    }
}

/// One chat-log entry as exposed by the API.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageView {
    /// Message identifier.
    pub id: Uuid,
    /// Author, absent for system messages.
    pub author_id: Option<Uuid>,
    /// Message text.
    pub content: String,
    /// Chat or system.
    pub kind: MessageKind,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
}

impl From<RaceMessageEntity> for MessageView {
    fn from(entity: RaceMessageEntity) -> Self {
        Self {
            id: entity.id,
            author_id: entity.author_id,
            content: entity.content,
            kind: entity.kind,
            created_at: format_timestamp(entity.created_at),
        }
    }
}

/// Summary projection of a race for the listing endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct RaceSummary {
    /// Race identifier.
    pub id: Uuid,
    /// Display name of the game.
    pub game_name: String,
    /// Display name of the category.
    pub category_name: String,
    /// Free-text objective.
    pub objective: Option<String>,
    /// Room-level status.
    pub status: RaceStatus,
    /// Current number of participants.
    pub participant_count: u32,
    /// Participant cap.
    pub max_participants: u32,
    /// Whether joining requires a password.
    pub has_password: bool,
    /// Room owner.
    pub owner_id: Uuid,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
}

impl From<RaceListItemEntity> for RaceSummary {
    fn from(entity: RaceListItemEntity) -> Self {
        Self {
            id: entity.id,
            game_name: entity.game_name,
            category_name: entity.category_name,
            objective: entity.objective,
            status: entity.status,
            participant_count: entity.participant_count,
            max_participants: entity.max_participants,
            has_password: entity.has_password,
            owner_id: entity.owner_id,
            created_at: format_timestamp(entity.created_at),
        }
    }
}

/// Full projection of a race including participants and the chat log.
#[derive(Debug, Serialize, ToSchema)]
pub struct RaceDetail {
    /// Race identifier.
    pub id: Uuid,
    /// Remote catalog identifier of the game.
    pub game_id: String,
    /// Display name of the game.
    pub game_name: String,
    /// Remote catalog identifier of the category.
    pub category_id: String,
    /// Display name of the category.
    pub category_name: String,
    /// Free-text objective.
    pub objective: Option<String>,
    /// Room-level status.
    pub status: RaceStatus,
    /// Participant cap.
    pub max_participants: u32,
    /// Whether joining requires a password.
    pub has_password: bool,
    /// Room owner.
    pub owner_id: Uuid,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
    /// Stamped when the race started running.
    pub started_at: Option<String>,
    /// Stamped when the race finished.
    pub ended_at: Option<String>,
    /// Participants in join order.
    pub participants: Vec<ParticipantView>,
    /// Chat log, oldest first.
    pub messages: Vec<MessageView>,
}

impl RaceDetail {
    /// Assemble the detail view from the race and its children.
    pub fn assemble(
        race: RaceEntity,
        participants: Vec<ParticipantEntity>,
        messages: Vec<RaceMessageEntity>,
    ) -> Self {
        Self {
            id: race.id,
            game_id: race.game_id,
            game_name: race.game_name,
            category_id: race.category_id,
            category_name: race.category_name,
            objective: race.objective,
            status: race.status,
            max_participants: race.max_participants,
            has_password: race.password.is_some(),
            owner_id: race.owner_id,
            created_at: format_timestamp(race.created_at),
            started_at: race.started_at.map(format_timestamp),
            ended_at: race.ended_at.map(format_timestamp),
            participants: participants.into_iter().map(Into::into).collect(),
            messages: messages.into_iter().map(Into::into).collect(),
        }
    }
}

/// Generic action acknowledgement.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    /// Outcome flag mirrored in the HTTP status.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
}

impl ActionResponse {
    /// Successful acknowledgement with a message.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Result of a cleanup sweep invocation.
#[derive(Debug, Serialize, ToSchema)]
pub struct CleanupResponse {
    /// Whether the sweep actually ran (false when throttled).
    pub ran: bool,
    /// Number of stale races deleted.
    pub deleted: u64,
}
