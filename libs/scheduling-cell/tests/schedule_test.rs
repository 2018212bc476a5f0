use assert_matches::assert_matches;
use chrono::NaiveTime;
use std::sync::Arc;
use uuid::Uuid;

use scheduling_cell::models::{
    CreateScheduleRequest, ScheduleSlotCreate, ScheduleSlotUpdate, SchedulingError,
    UpdateScheduleRequest, WeekDay,
};
use scheduling_cell::services::schedule::ScheduleService;
use scheduling_cell::store::{AppointmentStore, InMemoryStore};

fn schedule_service() -> ScheduleService {
    let store = Arc::new(InMemoryStore::new());
    ScheduleService::new(store as Arc<dyn AppointmentStore>)
}

fn time(hour: u32, min: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, min, 0).unwrap()
}

fn slot(day: WeekDay, start: NaiveTime, end: NaiveTime) -> ScheduleSlotCreate {
    ScheduleSlotCreate {
        day_of_week: day,
        start_time: start,
        end_time: end,
        is_available: None,
    }
}

#[tokio::test]
async fn create_applies_defaults() {
    let service = schedule_service();
    let practitioner = Uuid::new_v4();

    let schedule = service
        .create_schedule(CreateScheduleRequest {
            practitioner_id: practitioner,
            name: None,
            is_active: None,
            slots: vec![slot(WeekDay::Monday, time(9, 0), time(17, 0))],
        })
        .await
        .unwrap();

    assert_eq!(schedule.name, "Default Schedule");
    assert!(schedule.is_active);
    assert_eq!(schedule.slots.len(), 1);
    assert!(schedule.slots[0].is_available);

    let fetched = service
        .get_practitioner_schedule(practitioner)
        .await
        .unwrap();
    assert_eq!(fetched.id, schedule.id);
}

#[tokio::test]
async fn inverted_slot_bounds_are_rejected() {
    let service = schedule_service();

    let result = service
        .create_schedule(CreateScheduleRequest {
            practitioner_id: Uuid::new_v4(),
            name: None,
            is_active: None,
            slots: vec![slot(WeekDay::Monday, time(17, 0), time(9, 0))],
        })
        .await;

    assert_matches!(result, Err(SchedulingError::InvalidInterval));
}

#[tokio::test]
async fn deactivating_hides_the_schedule_from_lookup() {
    let service = schedule_service();
    let practitioner = Uuid::new_v4();

    let schedule = service
        .create_schedule(CreateScheduleRequest {
            practitioner_id: practitioner,
            name: Some("Spring".to_string()),
            is_active: None,
            slots: vec![],
        })
        .await
        .unwrap();

    service
        .update_schedule(
            schedule.id,
            UpdateScheduleRequest {
                name: None,
                is_active: Some(false),
            },
        )
        .await
        .unwrap();

    let result = service.get_practitioner_schedule(practitioner).await;
    assert_matches!(result, Err(SchedulingError::ScheduleNotFound(_)));
}

#[tokio::test]
async fn slot_lifecycle_add_update_remove() {
    let service = schedule_service();

    let schedule = service
        .create_schedule(CreateScheduleRequest {
            practitioner_id: Uuid::new_v4(),
            name: None,
            is_active: None,
            slots: vec![],
        })
        .await
        .unwrap();

    let schedule = service
        .add_slots(
            schedule.id,
            vec![
                slot(WeekDay::Monday, time(9, 0), time(12, 0)),
                slot(WeekDay::Friday, time(13, 0), time(17, 0)),
            ],
        )
        .await
        .unwrap();
    assert_eq!(schedule.slots.len(), 2);

    let monday_slot = schedule.slots[0].id;
    let schedule = service
        .update_slot(
            schedule.id,
            monday_slot,
            ScheduleSlotUpdate {
                end_time: Some(time(11, 0)),
                is_available: Some(false),
                ..ScheduleSlotUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(schedule.slots[0].end_time, time(11, 0));
    assert!(!schedule.slots[0].is_available);

    let result = service
        .update_slot(
            schedule.id,
            monday_slot,
            ScheduleSlotUpdate {
                start_time: Some(time(11, 30)),
                ..ScheduleSlotUpdate::default()
            },
        )
        .await;
    assert_matches!(result, Err(SchedulingError::InvalidInterval));

    let schedule = service.remove_slot(schedule.id, monday_slot).await.unwrap();
    assert_eq!(schedule.slots.len(), 1);
    assert_eq!(schedule.slots[0].day_of_week, WeekDay::Friday);
}

#[tokio::test]
async fn delete_removes_schedule_and_slots() {
    let service = schedule_service();
    let practitioner = Uuid::new_v4();

    let schedule = service
        .create_schedule(CreateScheduleRequest {
            practitioner_id: practitioner,
            name: None,
            is_active: None,
            slots: vec![slot(WeekDay::Monday, time(9, 0), time(17, 0))],
        })
        .await
        .unwrap();

    service.delete_schedule(schedule.id).await.unwrap();

    let result = service.get_schedule(schedule.id).await;
    assert_matches!(result, Err(SchedulingError::ScheduleNotFound(_)));

    let listed = service.list_schedules(Some(practitioner), None).await.unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn list_filters_by_active_flag() {
    let service = schedule_service();
    let practitioner = Uuid::new_v4();

    for active in [true, false] {
        service
            .create_schedule(CreateScheduleRequest {
                practitioner_id: practitioner,
                name: None,
                is_active: Some(active),
                slots: vec![],
            })
            .await
            .unwrap();
    }

    let active_only = service
        .list_schedules(Some(practitioner), Some(true))
        .await
        .unwrap();
    assert_eq!(active_only.len(), 1);
    assert!(active_only[0].is_active);
}
