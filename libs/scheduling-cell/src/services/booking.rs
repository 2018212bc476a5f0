// libs/scheduling-cell/src/services/booking.rs
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::interval::TimeInterval;
use crate::models::{
    Appointment, AppointmentPatch, AppointmentSearchQuery, AppointmentStatus,
    BookAppointmentRequest, CancelAppointmentRequest, CompleteAppointmentRequest,
    NotificationEvent, NotificationKind, RecipientType, RescheduleAppointmentRequest,
    SchedulingError,
};
use crate::services::conflict::ConflictDetectionService;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::notifications::{LogSink, NotificationSink};
use crate::store::AppointmentStore;

/// Booking, rescheduling, cancellation and completion of appointments.
///
/// Every interval-moving write acquires the store's practitioner lock before
/// the conflict check and holds it until the write lands, so two concurrent
/// requests for overlapping intervals on one practitioner can never both
/// succeed. Status-only writes take no lock; they only shrink the active set.
pub struct AppointmentBookingService {
    store: Arc<dyn AppointmentStore>,
    conflict_service: ConflictDetectionService,
    lifecycle_service: AppointmentLifecycleService,
    notifications: Arc<dyn NotificationSink>,
}

impl AppointmentBookingService {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self::with_notification_sink(store, Arc::new(LogSink))
    }

    pub fn with_notification_sink(
        store: Arc<dyn AppointmentStore>,
        notifications: Arc<dyn NotificationSink>,
    ) -> Self {
        let conflict_service = ConflictDetectionService::new(Arc::clone(&store));
        Self {
            store,
            conflict_service,
            lifecycle_service: AppointmentLifecycleService::new(),
            notifications,
        }
    }

    /// Book a new appointment. The interval is validated before any store
    /// interaction; the conflict check and insert run under the practitioner
    /// lock. Booking is not checked against the practitioner's declared
    /// schedule, only against existing bookings.
    pub async fn book_appointment(
        &self,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        info!(
            "Booking appointment for patient {} with practitioner {} at {}",
            request.patient_id, request.practitioner_id, request.start_time
        );

        if request.start_time >= request.end_time {
            return Err(SchedulingError::InvalidInterval);
        }
        let candidate = TimeInterval::new(request.start_time, request.end_time);

        let _guard = self.store.lock_practitioner(request.practitioner_id).await;

        if let Some(blocking) = self
            .conflict_service
            .find_conflict(request.practitioner_id, candidate, None)
            .await?
        {
            return Err(SchedulingError::Conflict {
                blocking_id: blocking.id,
            });
        }

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id: request.patient_id,
            practitioner_id: request.practitioner_id,
            title: request.title,
            start_time: request.start_time,
            end_time: request.end_time,
            status: AppointmentStatus::Scheduled,
            location: request.location,
            is_virtual: request.is_virtual,
            meeting_link: request.meeting_link,
            patient_notes: request.patient_notes,
            practitioner_notes: None,
            reminders_sent: false,
            google_calendar_event_id: None,
            ms_calendar_event_id: None,
            created_at: now,
            updated_at: now,
        };

        let stored = self.store.insert_appointment(appointment).await?;
        info!("Booked appointment {}", stored.id);
        Ok(stored)
    }

    pub async fn get_appointment(&self, id: Uuid) -> Result<Appointment, SchedulingError> {
        self.require_appointment(id).await
    }

    pub async fn search_appointments(
        &self,
        query: &AppointmentSearchQuery,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        debug!("Searching appointments: {:?}", query);
        self.store.search_appointments(query).await
    }

    /// Apply a field patch. A patch that moves the interval re-runs the
    /// conflict check (excluding this appointment) under the practitioner
    /// lock; a patch that sets `status` goes through the transition table.
    pub async fn update_appointment(
        &self,
        id: Uuid,
        patch: AppointmentPatch,
    ) -> Result<Appointment, SchedulingError> {
        debug!("Updating appointment {}", id);

        let existing = self.require_appointment(id).await?;

        let _guard = if patch.moves_interval() {
            Some(self.store.lock_practitioner(existing.practitioner_id).await)
        } else {
            None
        };
        // Re-read under the lock so the conflict check sees the latest state.
        let mut appointment = self.require_appointment(id).await?;

        let new_start = patch.start_time.unwrap_or(appointment.start_time);
        let new_end = patch.end_time.unwrap_or(appointment.end_time);
        if new_start >= new_end {
            return Err(SchedulingError::InvalidInterval);
        }

        if patch.moves_interval() {
            let candidate = TimeInterval::new(new_start, new_end);
            if let Some(blocking) = self
                .conflict_service
                .find_conflict(appointment.practitioner_id, candidate, Some(id))
                .await?
            {
                return Err(SchedulingError::Conflict {
                    blocking_id: blocking.id,
                });
            }
        }

        if let Some(next) = patch.status {
            self.lifecycle_service
                .validate_transition(appointment.status, next)?;
            appointment.status = next;
        }

        appointment.start_time = new_start;
        appointment.end_time = new_end;
        if let Some(title) = patch.title {
            appointment.title = title;
        }
        if let Some(location) = patch.location {
            appointment.location = Some(location);
        }
        if let Some(is_virtual) = patch.is_virtual {
            appointment.is_virtual = is_virtual;
        }
        if let Some(meeting_link) = patch.meeting_link {
            appointment.meeting_link = Some(meeting_link);
        }
        if let Some(patient_notes) = patch.patient_notes {
            appointment.patient_notes = Some(patient_notes);
        }
        if let Some(practitioner_notes) = patch.practitioner_notes {
            appointment.practitioner_notes = Some(practitioner_notes);
        }
        if let Some(reminders_sent) = patch.reminders_sent {
            appointment.reminders_sent = reminders_sent;
        }
        if let Some(event_id) = patch.google_calendar_event_id {
            appointment.google_calendar_event_id = Some(event_id);
        }
        if let Some(event_id) = patch.ms_calendar_event_id {
            appointment.ms_calendar_event_id = Some(event_id);
        }
        appointment.updated_at = Utc::now();

        let updated = self.store.update_appointment(appointment).await?;
        info!("Updated appointment {}", updated.id);
        Ok(updated)
    }

    /// Move an appointment to a new interval. On conflict nothing is written;
    /// the stored interval and status stay as they were.
    pub async fn reschedule_appointment(
        &self,
        id: Uuid,
        request: RescheduleAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        info!(
            "Rescheduling appointment {} to {} - {}",
            id, request.new_start_time, request.new_end_time
        );

        if request.new_start_time >= request.new_end_time {
            return Err(SchedulingError::InvalidInterval);
        }

        let existing = self.require_appointment(id).await?;
        let _guard = self.store.lock_practitioner(existing.practitioner_id).await;
        let mut appointment = self.require_appointment(id).await?;

        self.lifecycle_service
            .validate_transition(appointment.status, AppointmentStatus::Rescheduled)?;

        let candidate = TimeInterval::new(request.new_start_time, request.new_end_time);
        if let Some(blocking) = self
            .conflict_service
            .find_conflict(appointment.practitioner_id, candidate, Some(id))
            .await?
        {
            return Err(SchedulingError::Conflict {
                blocking_id: blocking.id,
            });
        }

        appointment.start_time = request.new_start_time;
        appointment.end_time = request.new_end_time;
        appointment.status = AppointmentStatus::Rescheduled;
        if let Some(reason) = request.reason {
            append_note(
                &mut appointment.practitioner_notes,
                format!("Reschedule reason: {reason}"),
            );
        }
        appointment.updated_at = Utc::now();

        let updated = self.store.update_appointment(appointment).await?;
        info!("Rescheduled appointment {}", updated.id);

        self.notify_both(&updated, NotificationKind::Rescheduled);
        Ok(updated)
    }

    /// Cancel an appointment. Cancelling an already-cancelled appointment is
    /// an idempotent no-op returning the unchanged record.
    pub async fn cancel_appointment(
        &self,
        id: Uuid,
        request: CancelAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        info!("Cancelling appointment {}", id);

        let mut appointment = self.require_appointment(id).await?;

        if appointment.status == AppointmentStatus::Cancelled {
            warn!("Appointment {} is already cancelled", id);
            return Ok(appointment);
        }

        self.lifecycle_service
            .validate_transition(appointment.status, AppointmentStatus::Cancelled)?;

        appointment.status = AppointmentStatus::Cancelled;
        if let Some(reason) = request.reason {
            append_note(
                &mut appointment.practitioner_notes,
                format!("Cancellation reason: {reason}"),
            );
        }
        appointment.updated_at = Utc::now();

        let updated = self.store.update_appointment(appointment).await?;
        info!("Cancelled appointment {}", updated.id);

        if request.notify_patient {
            self.notifications.dispatch(NotificationEvent {
                recipient_id: updated.patient_id,
                recipient_type: RecipientType::Patient,
                kind: NotificationKind::Cancelled,
                appointment_id: updated.id,
            });
        }
        if request.notify_practitioner {
            self.notifications.dispatch(NotificationEvent {
                recipient_id: updated.practitioner_id,
                recipient_type: RecipientType::Practitioner,
                kind: NotificationKind::Cancelled,
                appointment_id: updated.id,
            });
        }

        Ok(updated)
    }

    /// Mark an appointment completed. Already completed or cancelled
    /// appointments are returned unchanged. A requested follow-up is a hint
    /// for the follow-up collaborator, never an automatic booking.
    pub async fn complete_appointment(
        &self,
        id: Uuid,
        request: CompleteAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        info!("Completing appointment {}", id);

        let mut appointment = self.require_appointment(id).await?;

        if matches!(
            appointment.status,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled
        ) {
            warn!(
                "Appointment {} is already {}",
                id, appointment.status
            );
            return Ok(appointment);
        }

        self.lifecycle_service
            .validate_transition(appointment.status, AppointmentStatus::Completed)?;

        appointment.status = AppointmentStatus::Completed;
        if let Some(notes) = request.notes {
            append_note(&mut appointment.practitioner_notes, notes);
        }
        appointment.updated_at = Utc::now();

        let updated = self.store.update_appointment(appointment).await?;
        info!("Completed appointment {}", updated.id);

        self.notifications.dispatch(NotificationEvent {
            recipient_id: updated.patient_id,
            recipient_type: RecipientType::Patient,
            kind: NotificationKind::Completed,
            appointment_id: updated.id,
        });
        if request.follow_up_required {
            debug!(
                "Follow-up requested for appointment {} in {:?} days",
                updated.id, request.follow_up_in_days
            );
            self.notifications.dispatch(NotificationEvent {
                recipient_id: updated.practitioner_id,
                recipient_type: RecipientType::Practitioner,
                kind: NotificationKind::FollowUpRequested,
                appointment_id: updated.id,
            });
        }

        Ok(updated)
    }

    /// Remove an appointment entirely. Not a lifecycle transition; meant for
    /// erroneous or duplicate records.
    pub async fn delete_appointment(&self, id: Uuid) -> Result<(), SchedulingError> {
        info!("Deleting appointment {}", id);
        if !self.store.delete_appointment(id).await? {
            return Err(SchedulingError::AppointmentNotFound(id));
        }
        Ok(())
    }

    fn notify_both(&self, appointment: &Appointment, kind: NotificationKind) {
        self.notifications.dispatch(NotificationEvent {
            recipient_id: appointment.patient_id,
            recipient_type: RecipientType::Patient,
            kind,
            appointment_id: appointment.id,
        });
        self.notifications.dispatch(NotificationEvent {
            recipient_id: appointment.practitioner_id,
            recipient_type: RecipientType::Practitioner,
            kind,
            appointment_id: appointment.id,
        });
    }

    async fn require_appointment(&self, id: Uuid) -> Result<Appointment, SchedulingError> {
        self.store
            .fetch_appointment(id)
            .await?
            .ok_or(SchedulingError::AppointmentNotFound(id))
    }
}

fn append_note(notes: &mut Option<String>, line: String) {
    *notes = Some(match notes.take() {
        Some(existing) => format!("{existing}\n{line}"),
        None => line,
    });
}
