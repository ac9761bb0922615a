//! Pure evaluation of the race-level progression machine.
//!
//! The service layer persists a participant update first, then re-fetches
//! the participant list and asks this module whether the race itself should
//! advance. Keeping the rules pure makes every edge testable without a
//! store.

use crate::races::status::{ParticipantStatus, RaceStatus};

/// Decide whether the race should advance given a fresh snapshot of every
/// participant's status.
///
/// Returns `None` when the race stays where it is. Race transitions are
/// monotonic; `Finished` never yields a successor.
pub fn next_status(current: RaceStatus, participants: &[ParticipantStatus]) -> Option<RaceStatus> {
    if participants.is_empty() || current == RaceStatus::Finished {
        return None;
    }

    // A single racer pulls the whole room into the running state, whatever
    // the room was doing before.
    if current != RaceStatus::Running
        && participants
            .iter()
            .any(|status| *status == ParticipantStatus::Racing)
    {
        return Some(RaceStatus::Running);
    }

    if current == RaceStatus::Waiting
        && participants.len() >= 2
        && participants
            .iter()
            .all(|status| *status == ParticipantStatus::Ready)
    {
        return Some(RaceStatus::Ready);
    }

    if current == RaceStatus::Running
        && participants.iter().all(ParticipantStatus::is_terminal)
        && participants
            .iter()
            .any(|status| *status == ParticipantStatus::Finished)
    {
        return Some(RaceStatus::Finished);
    }

    None
}

/// Placement awarded to a participant finishing now, given the statuses of
/// everyone else in the race.
pub fn next_placement(others: &[ParticipantStatus]) -> u32 {
    let already_finished = others
        .iter()
        .filter(|status| **status == ParticipantStatus::Finished)
        .count();
    already_finished as u32 + 1
}

/// System chat line narrating a participant transition, or `None` for
/// transitions with no canonical narration (un-readying).
pub fn narration(
    display_name: &str,
    to: ParticipantStatus,
    finish_time_ms: Option<u64>,
) -> Option<String> {
    match to {
        ParticipantStatus::Enrolled => None,
        ParticipantStatus::Ready => Some(format!("{display_name} is ready")),
        ParticipantStatus::Racing => Some(format!("{display_name} started racing")),
        ParticipantStatus::Finished => match finish_time_ms {
            Some(ms) => Some(format!(
                "{display_name} finished in {}",
                format_duration_ms(ms)
            )),
            None => Some(format!("{display_name} finished")),
        },
        ParticipantStatus::Abandoned => Some(format!("{display_name} abandoned the race")),
    }
}

/// Render a millisecond duration as `h:mm:ss.mmm`, dropping the hour part
/// when zero.
pub fn format_duration_ms(ms: u64) -> String {
    let millis = ms % 1_000;
    let total_seconds = ms / 1_000;
    let seconds = total_seconds % 60;
    let minutes = (total_seconds / 60) % 60;
    let hours = total_seconds / 3_600;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}.{millis:03}")
    } else {
        format!("{minutes}:{seconds:02}.{millis:03}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ParticipantStatus::*;

    #[test]
    fn empty_room_never_advances() {
        assert_eq!(next_status(RaceStatus::Waiting, &[]), None);
    }

    #[test]
    fn lone_ready_participant_does_not_arm_the_race() {
        assert_eq!(next_status(RaceStatus::Waiting, &[Ready]), None);
    }

    #[test]
    fn race_becomes_ready_when_everyone_is() {
        assert_eq!(next_status(RaceStatus::Waiting, &[Ready, Enrolled]), None);
        assert_eq!(
            next_status(RaceStatus::Waiting, &[Ready, Ready]),
            Some(RaceStatus::Ready)
        );
        assert_eq!(
            next_status(RaceStatus::Waiting, &[Ready, Ready, Ready]),
            Some(RaceStatus::Ready)
        );
    }

    #[test]
    fn a_single_racer_starts_the_race_from_any_state() {
        assert_eq!(
            next_status(RaceStatus::Waiting, &[Racing, Enrolled]),
            Some(RaceStatus::Running)
        );
        assert_eq!(
            next_status(RaceStatus::Ready, &[Racing, Ready]),
            Some(RaceStatus::Running)
        );
        assert_eq!(next_status(RaceStatus::Running, &[Racing, Ready]), None);
    }

    #[test]
    fn race_finishes_only_when_everyone_is_done_and_someone_finished() {
        assert_eq!(next_status(RaceStatus::Running, &[Finished, Racing]), None);
        assert_eq!(
            next_status(RaceStatus::Running, &[Finished, Abandoned]),
            Some(RaceStatus::Finished)
        );
        assert_eq!(
            next_status(RaceStatus::Running, &[Finished, Finished]),
            Some(RaceStatus::Finished)
        );
        // Everyone abandoning does not count as a finish.
        assert_eq!(
            next_status(RaceStatus::Running, &[Abandoned, Abandoned]),
            None
        );
    }

    #[test]
    fn finished_race_is_terminal() {
        assert_eq!(next_status(RaceStatus::Finished, &[Racing, Racing]), None);
        assert_eq!(next_status(RaceStatus::Finished, &[Finished, Finished]), None);
    }

    #[test]
    fn placements_follow_finish_order() {
        assert_eq!(next_placement(&[Racing, Racing]), 1);
        assert_eq!(next_placement(&[Finished, Racing]), 2);
        assert_eq!(next_placement(&[Finished, Finished, Abandoned]), 3);
    }

    #[test]
    fn narration_covers_every_announced_transition() {
        assert_eq!(narration("runner", Enrolled, None), None);
        assert_eq!(narration("runner", Ready, None).unwrap(), "runner is ready");
        assert_eq!(
            narration("runner", Finished, Some(12_000)).unwrap(),
            "runner finished in 0:12.000"
        );
        assert_eq!(
            narration("runner", Abandoned, None).unwrap(),
            "runner abandoned the race"
        );
    }

    #[test]
    fn durations_render_with_and_without_hours() {
        assert_eq!(format_duration_ms(12_000), "0:12.000");
        assert_eq!(format_duration_ms(15_345), "0:15.345");
        assert_eq!(format_duration_ms(3_725_001), "1:02:05.001");
    }
}
