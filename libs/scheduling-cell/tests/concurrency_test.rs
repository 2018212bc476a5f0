use chrono::{DateTime, Duration, TimeZone, Utc};
use futures::future;
use std::sync::Arc;
use uuid::Uuid;

use scheduling_cell::models::{
    AppointmentSearchQuery, BookAppointmentRequest, RescheduleAppointmentRequest,
};
use scheduling_cell::services::booking::AppointmentBookingService;
use scheduling_cell::store::{AppointmentStore, InMemoryStore};

fn monday_at(hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, hour, min, 0).unwrap()
}

fn book_request(
    practitioner_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> BookAppointmentRequest {
    BookAppointmentRequest {
        patient_id: Uuid::new_v4(),
        practitioner_id,
        title: "Consultation".to_string(),
        start_time: start,
        end_time: end,
        location: None,
        is_virtual: true,
        meeting_link: None,
        patient_notes: None,
    }
}

async fn assert_no_active_overlap(service: &AppointmentBookingService, practitioner: Uuid) {
    let all = service
        .search_appointments(&AppointmentSearchQuery {
            practitioner_id: Some(practitioner),
            ..AppointmentSearchQuery::default()
        })
        .await
        .unwrap();
    let active: Vec<_> = all.into_iter().filter(|apt| apt.is_active()).collect();
    for (i, a) in active.iter().enumerate() {
        for b in active.iter().skip(i + 1) {
            assert!(
                !a.interval().overlaps(&b.interval()),
                "active appointments {} and {} overlap",
                a.id,
                b.id
            );
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_overlapping_bookings_admit_exactly_one() {
    let store = Arc::new(InMemoryStore::new());
    let service = Arc::new(AppointmentBookingService::new(
        Arc::clone(&store) as Arc<dyn AppointmentStore>
    ));
    let practitioner = Uuid::new_v4();

    // Eight requests, all pairwise overlapping around [10:00, 11:00).
    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let service = Arc::clone(&service);
            let start = monday_at(10, 0) + Duration::minutes(5 * i);
            tokio::spawn(async move {
                service
                    .book_appointment(book_request(practitioner, start, start + Duration::minutes(60)))
                    .await
            })
        })
        .collect();

    let results = future::join_all(tasks).await;
    let successes = results
        .into_iter()
        .map(|joined| joined.unwrap())
        .filter(|result| result.is_ok())
        .count();

    assert_eq!(successes, 1);
    assert_no_active_overlap(&service, practitioner).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_disjoint_bookings_all_succeed() {
    let store = Arc::new(InMemoryStore::new());
    let service = Arc::new(AppointmentBookingService::new(
        Arc::clone(&store) as Arc<dyn AppointmentStore>
    ));
    let practitioner = Uuid::new_v4();

    let tasks: Vec<_> = (0..6)
        .map(|i| {
            let service = Arc::clone(&service);
            let start = monday_at(9, 0) + Duration::hours(i);
            tokio::spawn(async move {
                service
                    .book_appointment(book_request(practitioner, start, start + Duration::hours(1)))
                    .await
            })
        })
        .collect();

    let results = future::join_all(tasks).await;
    assert!(results.into_iter().all(|joined| joined.unwrap().is_ok()));
    assert_no_active_overlap(&service, practitioner).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_reschedules_into_one_window_admit_exactly_one() {
    let store = Arc::new(InMemoryStore::new());
    let service = Arc::new(AppointmentBookingService::new(
        Arc::clone(&store) as Arc<dyn AppointmentStore>
    ));
    let practitioner = Uuid::new_v4();

    // Disjoint bookings first, then race them all toward the same window.
    let mut ids = Vec::new();
    for i in 0..4 {
        let start = monday_at(9, 0) + Duration::hours(i);
        let appointment = service
            .book_appointment(book_request(practitioner, start, start + Duration::hours(1)))
            .await
            .unwrap();
        ids.push(appointment.id);
    }

    let target = monday_at(14, 0);
    let tasks: Vec<_> = ids
        .into_iter()
        .map(|id| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                service
                    .reschedule_appointment(
                        id,
                        RescheduleAppointmentRequest {
                            new_start_time: target,
                            new_end_time: target + Duration::hours(1),
                            reason: None,
                        },
                    )
                    .await
            })
        })
        .collect();

    let results = future::join_all(tasks).await;
    let successes = results
        .into_iter()
        .map(|joined| joined.unwrap())
        .filter(|result| result.is_ok())
        .count();

    assert_eq!(successes, 1);
    assert_no_active_overlap(&service, practitioner).await;
}
