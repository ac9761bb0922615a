use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Room-level status of a race.
///
/// Transitions are monotonic: a race never moves backwards, and `Finished`
/// is terminal (a finished race is only ever deleted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RaceStatus {
    /// Participants are gathering; the room was just created.
    Waiting,
    /// Every participant signalled readiness (and there are at least two).
    Ready,
    /// At least one participant started racing.
    Running,
    /// Everyone either finished or abandoned; awaiting deferred deletion.
    Finished,
}

impl fmt::Display for RaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

impl RaceStatus {
    /// Stable string literal used on the wire and in the database.
    pub fn as_wire(&self) -> &'static str {
        match self {
            RaceStatus::Waiting => "waiting",
            RaceStatus::Ready => "ready",
            RaceStatus::Running => "running",
            RaceStatus::Finished => "finished",
        }
    }
}

impl FromStr for RaceStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "waiting" => Ok(RaceStatus::Waiting),
            "ready" => Ok(RaceStatus::Ready),
            "running" => Ok(RaceStatus::Running),
            "finished" => Ok(RaceStatus::Finished),
            other => Err(UnknownStatus {
                value: other.to_string(),
            }),
        }
    }
}

/// Personal progress of one participant inside a race.
///
/// The wire format keeps the legacy French literals; the English names are
/// accepted as input aliases so newer clients can use either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ParticipantStatus {
    /// Joined the race but not yet ready.
    #[serde(rename = "inscrit", alias = "enrolled")]
    Enrolled,
    /// Signalled readiness to start.
    #[serde(rename = "pret", alias = "ready")]
    Ready,
    /// Currently racing.
    #[serde(rename = "en-course", alias = "racing")]
    Racing,
    /// Crossed the finish line; a finish time is recorded.
    #[serde(rename = "termine", alias = "finished")]
    Finished,
    /// Gave up; no finish time is recorded.
    #[serde(rename = "abandon", alias = "abandoned")]
    Abandoned,
}

impl fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

impl ParticipantStatus {
    /// Stable string literal used on the wire and in the database.
    pub fn as_wire(&self) -> &'static str {
        match self {
            ParticipantStatus::Enrolled => "inscrit",
            ParticipantStatus::Ready => "pret",
            ParticipantStatus::Racing => "en-course",
            ParticipantStatus::Finished => "termine",
            ParticipantStatus::Abandoned => "abandon",
        }
    }

    /// Whether this status ends the participant's active involvement.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ParticipantStatus::Finished | ParticipantStatus::Abandoned
        )
    }

    /// Validate a requested transition against the allowed graph:
    /// `enrolled → ready → racing → (finished | abandoned)`, with
    /// `ready → enrolled` as the only backward edge (un-readying).
    pub fn transition_to(
        self,
        next: ParticipantStatus,
    ) -> Result<ParticipantStatus, InvalidStatusTransition> {
        use ParticipantStatus::*;

        let allowed = matches!(
            (self, next),
            (Enrolled, Ready) | (Ready, Enrolled) | (Ready, Racing) | (Racing, Finished | Abandoned)
        );

        if allowed {
            Ok(next)
        } else {
            Err(InvalidStatusTransition { from: self, to: next })
        }
    }
}

impl FromStr for ParticipantStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "inscrit" | "enrolled" => Ok(ParticipantStatus::Enrolled),
            "pret" | "ready" => Ok(ParticipantStatus::Ready),
            "en-course" | "racing" => Ok(ParticipantStatus::Racing),
            "termine" | "finished" => Ok(ParticipantStatus::Finished),
            "abandon" | "abandoned" => Ok(ParticipantStatus::Abandoned),
            other => Err(UnknownStatus {
                value: other.to_string(),
            }),
        }
    }
}

/// A status string that matches neither the wire literal nor an alias.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown status literal `{value}`")]
pub struct UnknownStatus {
    /// The rejected input.
    pub value: String,
}

/// Error returned when a participant requests a transition outside the
/// allowed graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid status transition: {from} cannot move to {to}")]
pub struct InvalidStatusTransition {
    /// Status the participant currently holds.
    pub from: ParticipantStatus,
    /// Status that was requested.
    pub to: ParticipantStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_chain_is_allowed() {
        use ParticipantStatus::*;
        assert_eq!(Enrolled.transition_to(Ready), Ok(Ready));
        assert_eq!(Ready.transition_to(Racing), Ok(Racing));
        assert_eq!(Racing.transition_to(Finished), Ok(Finished));
        assert_eq!(Racing.transition_to(Abandoned), Ok(Abandoned));
    }

    #[test]
    fn unready_is_the_only_backward_edge() {
        use ParticipantStatus::*;
        assert_eq!(Ready.transition_to(Enrolled), Ok(Enrolled));
        assert!(Racing.transition_to(Ready).is_err());
        assert!(Finished.transition_to(Racing).is_err());
        assert!(Abandoned.transition_to(Enrolled).is_err());
    }

    #[test]
    fn terminal_states_reject_everything() {
        use ParticipantStatus::*;
        for next in [Enrolled, Ready, Racing, Finished, Abandoned] {
            assert!(Finished.transition_to(next).is_err());
            assert!(Abandoned.transition_to(next).is_err());
        }
    }

    #[test]
    fn same_status_is_rejected() {
        use ParticipantStatus::*;
        for status in [Enrolled, Ready, Racing] {
            assert_eq!(
                status.transition_to(status),
                Err(InvalidStatusTransition {
                    from: status,
                    to: status
                })
            );
        }
    }

    #[test]
    fn wire_literals_round_trip_with_aliases() {
        assert_eq!(
            "inscrit".parse::<ParticipantStatus>().unwrap(),
            ParticipantStatus::Enrolled
        );
        assert_eq!(
            "enrolled".parse::<ParticipantStatus>().unwrap(),
            ParticipantStatus::Enrolled
        );
        assert_eq!(ParticipantStatus::Racing.as_wire(), "en-course");
        assert!("en course".parse::<ParticipantStatus>().is_err());

        assert_eq!("running".parse::<RaceStatus>().unwrap(), RaceStatus::Running);
        assert_eq!(RaceStatus::Waiting.as_wire(), "waiting");
    }

    #[test]
    fn participant_serde_emits_french_literals() {
        let json = serde_json::to_string(&ParticipantStatus::Finished).unwrap();
        assert_eq!(json, "\"termine\"");
        let parsed: ParticipantStatus = serde_json::from_str("\"finished\"").unwrap();
        assert_eq!(parsed, ParticipantStatus::Finished);
    }
}
