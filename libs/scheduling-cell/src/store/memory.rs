// libs/scheduling-cell/src/store/memory.rs
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use crate::interval::TimeInterval;
use crate::models::{Appointment, AppointmentSearchQuery, Schedule, SchedulingError};
use crate::store::AppointmentStore;

/// In-process store backing the engine. Appointments and schedules live in
/// `RwLock`ed maps, so reads see a consistent snapshot while mutations are
/// serialized per map; booking atomicity comes from the per-practitioner
/// locks handed out by `lock_practitioner`.
#[derive(Default)]
pub struct InMemoryStore {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
    schedules: RwLock<HashMap<Uuid, Schedule>>,
    practitioner_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryStore {
    async fn insert_appointment(
        &self,
        appointment: Appointment,
    ) -> Result<Appointment, SchedulingError> {
        let mut appointments = self.appointments.write().await;
        appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn fetch_appointment(&self, id: Uuid) -> Result<Option<Appointment>, SchedulingError> {
        let appointments = self.appointments.read().await;
        Ok(appointments.get(&id).cloned())
    }

    async fn update_appointment(
        &self,
        appointment: Appointment,
    ) -> Result<Appointment, SchedulingError> {
        let mut appointments = self.appointments.write().await;
        if !appointments.contains_key(&appointment.id) {
            return Err(SchedulingError::AppointmentNotFound(appointment.id));
        }
        appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn delete_appointment(&self, id: Uuid) -> Result<bool, SchedulingError> {
        let mut appointments = self.appointments.write().await;
        Ok(appointments.remove(&id).is_some())
    }

    async fn search_appointments(
        &self,
        query: &AppointmentSearchQuery,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let appointments = self.appointments.read().await;
        let mut matches: Vec<Appointment> = appointments
            .values()
            .filter(|apt| query.patient_id.is_none_or(|id| apt.patient_id == id))
            .filter(|apt| query.practitioner_id.is_none_or(|id| apt.practitioner_id == id))
            .filter(|apt| query.status.is_none_or(|status| apt.status == status))
            .filter(|apt| query.from_date.is_none_or(|from| apt.start_time >= from))
            .filter(|apt| query.to_date.is_none_or(|to| apt.start_time < to))
            .cloned()
            .collect();

        matches.sort_by_key(|apt| apt.start_time);

        let offset = query.offset.unwrap_or(0);
        let matches: Vec<Appointment> = matches
            .into_iter()
            .skip(offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();

        Ok(matches)
    }

    async fn active_appointments_in_range(
        &self,
        practitioner_id: Uuid,
        range: TimeInterval,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let appointments = self.appointments.read().await;
        let mut matches: Vec<Appointment> = appointments
            .values()
            .filter(|apt| apt.practitioner_id == practitioner_id)
            .filter(|apt| apt.is_active())
            .filter(|apt| exclude_appointment_id != Some(apt.id))
            .filter(|apt| apt.interval().overlaps(&range))
            .cloned()
            .collect();

        matches.sort_by_key(|apt| apt.start_time);
        Ok(matches)
    }

    async fn insert_schedule(&self, schedule: Schedule) -> Result<Schedule, SchedulingError> {
        let mut schedules = self.schedules.write().await;
        schedules.insert(schedule.id, schedule.clone());
        Ok(schedule)
    }

    async fn fetch_schedule(&self, id: Uuid) -> Result<Option<Schedule>, SchedulingError> {
        let schedules = self.schedules.read().await;
        Ok(schedules.get(&id).cloned())
    }

    async fn fetch_active_schedule(
        &self,
        practitioner_id: Uuid,
    ) -> Result<Option<Schedule>, SchedulingError> {
        let schedules = self.schedules.read().await;
        let active = schedules
            .values()
            .filter(|schedule| schedule.practitioner_id == practitioner_id && schedule.is_active)
            .max_by_key(|schedule| schedule.created_at)
            .cloned();
        Ok(active)
    }

    async fn update_schedule(&self, schedule: Schedule) -> Result<Schedule, SchedulingError> {
        let mut schedules = self.schedules.write().await;
        if !schedules.contains_key(&schedule.id) {
            return Err(SchedulingError::ScheduleNotFound(schedule.id));
        }
        schedules.insert(schedule.id, schedule.clone());
        Ok(schedule)
    }

    async fn delete_schedule(&self, id: Uuid) -> Result<bool, SchedulingError> {
        let mut schedules = self.schedules.write().await;
        Ok(schedules.remove(&id).is_some())
    }

    async fn list_schedules(
        &self,
        practitioner_id: Option<Uuid>,
        is_active: Option<bool>,
    ) -> Result<Vec<Schedule>, SchedulingError> {
        let schedules = self.schedules.read().await;
        let mut matches: Vec<Schedule> = schedules
            .values()
            .filter(|schedule| practitioner_id.is_none_or(|id| schedule.practitioner_id == id))
            .filter(|schedule| is_active.is_none_or(|active| schedule.is_active == active))
            .cloned()
            .collect();

        matches.sort_by_key(|schedule| schedule.created_at);
        Ok(matches)
    }

    async fn lock_practitioner(&self, practitioner_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.practitioner_locks.lock().await;
            Arc::clone(locks.entry(practitioner_id).or_default())
        };
        lock.lock_owned().await
    }
}
