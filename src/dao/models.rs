use serde::{Deserialize, Serialize};
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::races::status::{ParticipantStatus, RaceStatus, UnknownStatus};

/// Aggregate race entity persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RaceEntity {
    /// Primary key of the race.
    pub id: Uuid,
    /// Remote catalog identifier of the game being raced.
    pub game_id: String,
    /// Display name of the game, denormalized from the catalog.
    pub game_name: String,
    /// Remote catalog identifier of the category.
    pub category_id: String,
    /// Display name of the category.
    pub category_name: String,
    /// Free-text objective agreed by the room (e.g. "any% no wrong warp").
    pub objective: Option<String>,
    /// Room-level status.
    pub status: RaceStatus,
    /// Hard cap on the number of participants.
    pub max_participants: u32,
    /// Optional room password, compared by exact string equality.
    pub password: Option<String>,
    /// User who created the room and may delete it.
    pub owner_id: Uuid,
    /// Creation timestamp.
    pub created_at: OffsetDateTime,
    /// Last mutation timestamp; the cleanup sweep keys off this.
    pub updated_at: OffsetDateTime,
    /// Stamped when the race first enters the running state.
    pub started_at: Option<OffsetDateTime>,
    /// Stamped when the race enters the finished state.
    pub ended_at: Option<OffsetDateTime>,
}

/// A user's membership record within one race.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantEntity {
    /// Race the membership belongs to.
    pub race_id: Uuid,
    /// Enrolled user; at most one record per `(race_id, user_id)` pair.
    pub user_id: Uuid,
    /// Personal progress status.
    pub status: ParticipantStatus,
    /// Finish duration in milliseconds, set only on the finished status.
    pub finish_time_ms: Option<u64>,
    /// Optional stream URL announced by the participant.
    pub stream_url: Option<String>,
    /// Placement among finishers, assigned in finish order.
    pub placement: Option<u32>,
    /// When the user joined the race.
    pub joined_at: OffsetDateTime,
}

/// Distinguishes user chat lines from backend-generated announcements.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Written by a participant.
    Chat,
    /// Generated by the backend on joins, leaves, and status changes.
    System,
}

impl MessageKind {
    /// Stable string literal used on the wire and in the database.
    pub fn as_wire(&self) -> &'static str {
        match self {
            MessageKind::Chat => "chat",
            MessageKind::System => "system",
        }
    }
}

impl FromStr for MessageKind {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "chat" => Ok(MessageKind::Chat),
            "system" => Ok(MessageKind::System),
            other => Err(UnknownStatus {
                value: other.to_string(),
            }),
        }
    }
}

/// Append-only chat-log entry scoped to one race.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RaceMessageEntity {
    /// Primary key of the message.
    pub id: Uuid,
    /// Race the message belongs to; deleted via race cascade only.
    pub race_id: Uuid,
    /// Author, absent for system messages.
    pub author_id: Option<Uuid>,
    /// Message text.
    pub content: String,
    /// Chat or system.
    pub kind: MessageKind,
    /// Creation timestamp; messages are ordered by it ascending.
    pub created_at: OffsetDateTime,
}

/// Summary projection of a race used by the listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RaceListItemEntity {
    /// Primary key of the race.
    pub id: Uuid,
    /// Display name of the game.
    pub game_name: String,
    /// Display name of the category.
    pub category_name: String,
    /// Free-text objective.
    pub objective: Option<String>,
    /// Room-level status.
    pub status: RaceStatus,
    /// Current number of enrolled participants.
    pub participant_count: u32,
    /// Hard cap on the number of participants.
    pub max_participants: u32,
    /// Whether joining requires a password (the password itself never leaves
    /// the store layer through this projection).
    pub has_password: bool,
    /// User who created the room.
    pub owner_id: Uuid,
    /// Creation timestamp.
    pub created_at: OffsetDateTime,
}
