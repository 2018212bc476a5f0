// libs/scheduling-cell/src/services/conflict.rs
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::interval::TimeInterval;
use crate::models::{Appointment, SchedulingError};
use crate::store::AppointmentStore;

/// Read-only conflict detection against a practitioner's active appointments.
///
/// On its own this is just a query; the booking service makes it part of an
/// atomic check-then-write by holding the store's practitioner lock across
/// this call and the insert/update that follows.
pub struct ConflictDetectionService {
    store: Arc<dyn AppointmentStore>,
}

impl ConflictDetectionService {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self { store }
    }

    /// First active appointment overlapping `candidate`, or `None`. Existence
    /// is the decision signal; no tie-break among multiple overlaps.
    pub async fn find_conflict(
        &self,
        practitioner_id: Uuid,
        candidate: TimeInterval,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<Option<Appointment>, SchedulingError> {
        debug!(
            "Checking conflicts for practitioner {} from {} to {}",
            practitioner_id, candidate.start, candidate.end
        );

        let overlapping = self
            .store
            .active_appointments_in_range(practitioner_id, candidate, exclude_appointment_id)
            .await?;

        match overlapping.into_iter().next() {
            Some(blocking) => {
                warn!(
                    "Conflict detected for practitioner {}: candidate overlaps appointment {}",
                    practitioner_id, blocking.id
                );
                Ok(Some(blocking))
            }
            None => Ok(None),
        }
    }
}
