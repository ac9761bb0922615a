//! Race domain logic: status enums, transition rules, and the race-level
//! progression machine evaluated after every participant update.

pub mod lifecycle;
pub mod status;

pub use status::{InvalidStatusTransition, ParticipantStatus, RaceStatus};
