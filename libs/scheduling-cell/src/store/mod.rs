// libs/scheduling-cell/src/store/mod.rs
pub mod memory;

use async_trait::async_trait;
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use crate::interval::TimeInterval;
use crate::models::{Appointment, AppointmentSearchQuery, Schedule, SchedulingError};

pub use memory::InMemoryStore;

/// Persistence boundary for the scheduling engine.
///
/// Implementations must make a conflict query plus the subsequent write atomic
/// with respect to other mutations on the same practitioner: callers acquire
/// the practitioner lock first and hold it across both. Reads take no lock but
/// observe a consistent snapshot of the active-appointment set.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn insert_appointment(
        &self,
        appointment: Appointment,
    ) -> Result<Appointment, SchedulingError>;

    async fn fetch_appointment(&self, id: Uuid) -> Result<Option<Appointment>, SchedulingError>;

    /// Replace a stored appointment wholesale. Fails with `AppointmentNotFound`
    /// when the id is unknown.
    async fn update_appointment(
        &self,
        appointment: Appointment,
    ) -> Result<Appointment, SchedulingError>;

    /// Hard delete. Returns whether a record was removed.
    async fn delete_appointment(&self, id: Uuid) -> Result<bool, SchedulingError>;

    async fn search_appointments(
        &self,
        query: &AppointmentSearchQuery,
    ) -> Result<Vec<Appointment>, SchedulingError>;

    /// All active appointments for the practitioner whose `[start, end)`
    /// overlaps `range`, optionally omitting one appointment (used while it is
    /// being rescheduled). Ordered by start time.
    async fn active_appointments_in_range(
        &self,
        practitioner_id: Uuid,
        range: TimeInterval,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, SchedulingError>;

    async fn insert_schedule(&self, schedule: Schedule) -> Result<Schedule, SchedulingError>;

    async fn fetch_schedule(&self, id: Uuid) -> Result<Option<Schedule>, SchedulingError>;

    /// The practitioner's effective schedule: the most recently created one
    /// flagged active, if any.
    async fn fetch_active_schedule(
        &self,
        practitioner_id: Uuid,
    ) -> Result<Option<Schedule>, SchedulingError>;

    async fn update_schedule(&self, schedule: Schedule) -> Result<Schedule, SchedulingError>;

    /// Removes the schedule and, with it, its slots. Returns whether a record
    /// was removed.
    async fn delete_schedule(&self, id: Uuid) -> Result<bool, SchedulingError>;

    async fn list_schedules(
        &self,
        practitioner_id: Option<Uuid>,
        is_active: Option<bool>,
    ) -> Result<Vec<Schedule>, SchedulingError>;

    /// Mutual exclusion for one practitioner's bookings. The guard must be
    /// held across the conflict check and the write it protects.
    async fn lock_practitioner(&self, practitioner_id: Uuid) -> OwnedMutexGuard<()>;
}
