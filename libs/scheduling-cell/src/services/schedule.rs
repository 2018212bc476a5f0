// libs/scheduling-cell/src/services/schedule.rs
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{
    CreateScheduleRequest, Schedule, ScheduleSlot, ScheduleSlotCreate, ScheduleSlotUpdate,
    SchedulingError, UpdateScheduleRequest,
};
use crate::store::AppointmentStore;

/// Management of practitioner schedules and their slots. The schedule owns
/// its slots; deleting the schedule removes them with it.
pub struct ScheduleService {
    store: Arc<dyn AppointmentStore>,
}

impl ScheduleService {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self { store }
    }

    pub async fn create_schedule(
        &self,
        request: CreateScheduleRequest,
    ) -> Result<Schedule, SchedulingError> {
        info!(
            "Creating schedule for practitioner {}",
            request.practitioner_id
        );

        let slots = request
            .slots
            .into_iter()
            .map(build_slot)
            .collect::<Result<Vec<ScheduleSlot>, SchedulingError>>()?;

        let now = Utc::now();
        let schedule = Schedule {
            id: Uuid::new_v4(),
            practitioner_id: request.practitioner_id,
            name: request.name.unwrap_or_else(|| "Default Schedule".to_string()),
            is_active: request.is_active.unwrap_or(true),
            slots,
            created_at: now,
            updated_at: now,
        };

        let stored = self.store.insert_schedule(schedule).await?;
        info!("Created schedule {}", stored.id);
        Ok(stored)
    }

    pub async fn get_schedule(&self, id: Uuid) -> Result<Schedule, SchedulingError> {
        self.store
            .fetch_schedule(id)
            .await?
            .ok_or(SchedulingError::ScheduleNotFound(id))
    }

    /// The practitioner's effective schedule (most recently created active
    /// one, per the store's tie-break).
    pub async fn get_practitioner_schedule(
        &self,
        practitioner_id: Uuid,
    ) -> Result<Schedule, SchedulingError> {
        self.store
            .fetch_active_schedule(practitioner_id)
            .await?
            .ok_or(SchedulingError::ScheduleNotFound(practitioner_id))
    }

    pub async fn list_schedules(
        &self,
        practitioner_id: Option<Uuid>,
        is_active: Option<bool>,
    ) -> Result<Vec<Schedule>, SchedulingError> {
        debug!(
            "Listing schedules: practitioner={:?}, is_active={:?}",
            practitioner_id, is_active
        );
        self.store.list_schedules(practitioner_id, is_active).await
    }

    pub async fn update_schedule(
        &self,
        id: Uuid,
        request: UpdateScheduleRequest,
    ) -> Result<Schedule, SchedulingError> {
        let mut schedule = self.get_schedule(id).await?;

        if let Some(name) = request.name {
            schedule.name = name;
        }
        if let Some(is_active) = request.is_active {
            schedule.is_active = is_active;
        }
        schedule.updated_at = Utc::now();

        let updated = self.store.update_schedule(schedule).await?;
        info!("Updated schedule {}", updated.id);
        Ok(updated)
    }

    pub async fn delete_schedule(&self, id: Uuid) -> Result<(), SchedulingError> {
        info!("Deleting schedule {}", id);
        if !self.store.delete_schedule(id).await? {
            return Err(SchedulingError::ScheduleNotFound(id));
        }
        Ok(())
    }

    pub async fn add_slots(
        &self,
        schedule_id: Uuid,
        slots: Vec<ScheduleSlotCreate>,
    ) -> Result<Schedule, SchedulingError> {
        let mut schedule = self.get_schedule(schedule_id).await?;

        for slot in slots {
            schedule.slots.push(build_slot(slot)?);
        }
        schedule.updated_at = Utc::now();

        let updated = self.store.update_schedule(schedule).await?;
        info!("Added slots to schedule {}", updated.id);
        Ok(updated)
    }

    pub async fn update_slot(
        &self,
        schedule_id: Uuid,
        slot_id: Uuid,
        update: ScheduleSlotUpdate,
    ) -> Result<Schedule, SchedulingError> {
        let mut schedule = self.get_schedule(schedule_id).await?;

        let slot = schedule
            .slots
            .iter_mut()
            .find(|slot| slot.id == slot_id)
            .ok_or(SchedulingError::ScheduleNotFound(slot_id))?;

        let start = update.start_time.unwrap_or(slot.start_time);
        let end = update.end_time.unwrap_or(slot.end_time);
        if start >= end {
            return Err(SchedulingError::InvalidInterval);
        }

        slot.start_time = start;
        slot.end_time = end;
        if let Some(day) = update.day_of_week {
            slot.day_of_week = day;
        }
        if let Some(is_available) = update.is_available {
            slot.is_available = is_available;
        }
        schedule.updated_at = Utc::now();

        self.store.update_schedule(schedule).await
    }

    pub async fn remove_slot(
        &self,
        schedule_id: Uuid,
        slot_id: Uuid,
    ) -> Result<Schedule, SchedulingError> {
        let mut schedule = self.get_schedule(schedule_id).await?;

        let before = schedule.slots.len();
        schedule.slots.retain(|slot| slot.id != slot_id);
        if schedule.slots.len() == before {
            return Err(SchedulingError::ScheduleNotFound(slot_id));
        }
        schedule.updated_at = Utc::now();

        self.store.update_schedule(schedule).await
    }
}

fn build_slot(create: ScheduleSlotCreate) -> Result<ScheduleSlot, SchedulingError> {
    if create.start_time >= create.end_time {
        return Err(SchedulingError::InvalidInterval);
    }
    Ok(ScheduleSlot {
        id: Uuid::new_v4(),
        day_of_week: create.day_of_week,
        start_time: create.start_time,
        end_time: create.end_time,
        is_available: create.is_available.unwrap_or(true),
    })
}
