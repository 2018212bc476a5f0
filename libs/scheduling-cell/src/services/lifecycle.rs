// libs/scheduling-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use crate::models::{AppointmentStatus, SchedulingError};

/// The appointment state machine. Every status change in the engine goes
/// through `validate_transition`; nothing compares statuses ad hoc.
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Reject any transition not listed in the table. Transitions out of a
    /// terminal state are the rejections; same-status writes pass as no-ops
    /// so idempotent callers need no special casing.
    pub fn validate_transition(
        &self,
        current: AppointmentStatus,
        next: AppointmentStatus,
    ) -> Result<(), SchedulingError> {
        debug!("Validating status transition {} -> {}", current, next);

        if current == next {
            return Ok(());
        }

        if !self.valid_transitions(current).contains(&next) {
            warn!("Invalid status transition attempted: {} -> {}", current, next);
            return Err(SchedulingError::AlreadyInTerminalState(current));
        }

        Ok(())
    }

    /// All statuses reachable from `current`. Any active appointment may move
    /// to any other status (`NoShow` only through the administrative status
    /// patch; create/reschedule/cancel/complete never produce it); terminal
    /// states admit nothing.
    pub fn valid_transitions(&self, current: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current {
            AppointmentStatus::Scheduled
            | AppointmentStatus::Confirmed
            | AppointmentStatus::Rescheduled => vec![
                AppointmentStatus::Scheduled,
                AppointmentStatus::Confirmed,
                AppointmentStatus::Rescheduled,
                AppointmentStatus::Cancelled,
                AppointmentStatus::Completed,
                AppointmentStatus::NoShow,
            ],
            AppointmentStatus::Cancelled
            | AppointmentStatus::Completed
            | AppointmentStatus::NoShow => vec![],
        }
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const ALL: [AppointmentStatus; 6] = [
        AppointmentStatus::Scheduled,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Rescheduled,
        AppointmentStatus::Cancelled,
        AppointmentStatus::Completed,
        AppointmentStatus::NoShow,
    ];

    #[test]
    fn active_states_can_move_anywhere() {
        let lifecycle = AppointmentLifecycleService::new();
        for from in ALL.iter().filter(|status| status.is_active()) {
            for to in ALL {
                assert!(lifecycle.validate_transition(*from, to).is_ok());
            }
        }
    }

    #[test]
    fn terminal_states_admit_no_transition() {
        let lifecycle = AppointmentLifecycleService::new();
        for from in ALL.iter().filter(|status| status.is_terminal()) {
            for to in ALL.iter().filter(|to| *to != from) {
                assert_matches!(
                    lifecycle.validate_transition(*from, *to),
                    Err(SchedulingError::AlreadyInTerminalState(status)) if status == *from
                );
            }
        }
    }

    #[test]
    fn same_status_is_a_no_op_even_when_terminal() {
        let lifecycle = AppointmentLifecycleService::new();
        assert!(lifecycle
            .validate_transition(AppointmentStatus::Cancelled, AppointmentStatus::Cancelled)
            .is_ok());
    }
}
