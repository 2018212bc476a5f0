// libs/scheduling-cell/src/services/availability.rs
use chrono::{DateTime, Duration, NaiveDate, Utc};
use shared_config::SchedulingConfig;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::interval::TimeInterval;
use crate::models::{AvailabilityResponse, DailyAvailability, SchedulingError, TimeSlot, WeekDay};
use crate::store::AppointmentStore;

/// Computes open, bookable slots by reconciling a practitioner's recurring
/// weekly schedule with their booked appointments over a bounded window.
pub struct AvailabilityService {
    store: Arc<dyn AppointmentStore>,
    config: SchedulingConfig,
}

impl AvailabilityService {
    pub fn new(store: Arc<dyn AppointmentStore>, config: SchedulingConfig) -> Self {
        Self { store, config }
    }

    /// Open slots for `[window_start, window_end)`, grouped by calendar day
    /// in ascending order. Windows longer than the configured maximum are
    /// silently truncated. Each call recomputes from scratch.
    pub async fn get_practitioner_availability(
        &self,
        practitioner_id: Uuid,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<AvailabilityResponse, SchedulingError> {
        debug!(
            "Computing availability for practitioner {} from {} to {}",
            practitioner_id, window_start, window_end
        );

        let mut window_end = window_end;
        let max_span = Duration::days(self.config.max_availability_window_days);
        if window_end - window_start > max_span {
            window_end = window_start + max_span;
            warn!(
                "Availability window too large, truncated to {} days ending {}",
                self.config.max_availability_window_days, window_end
            );
        }

        let schedule = match self.store.fetch_active_schedule(practitioner_id).await? {
            Some(schedule) if schedule.slots.iter().any(|slot| slot.is_available) => schedule,
            _ => {
                warn!(
                    "No active schedule with available slots for practitioner {}",
                    practitioner_id
                );
                return Ok(AvailabilityResponse {
                    practitioner_id,
                    days: vec![],
                });
            }
        };

        // One range query for the whole window, partitioned by start date.
        let window = TimeInterval::new(window_start, window_end);
        let booked = self
            .store
            .active_appointments_in_range(practitioner_id, window, None)
            .await?;
        let mut booked_by_date: HashMap<NaiveDate, Vec<TimeInterval>> = HashMap::new();
        for appointment in &booked {
            booked_by_date
                .entry(appointment.start_time.date_naive())
                .or_default()
                .push(appointment.interval());
        }

        let duration = Duration::minutes(self.config.appointment_duration_minutes);
        let step = Duration::minutes(self.config.availability_granularity_minutes);

        let mut days = Vec::new();
        let mut current_date = window_start.date_naive();
        let end_date = window_end.date_naive();

        while current_date < end_date {
            let weekday = WeekDay::from_date(current_date);
            let day_booked = booked_by_date
                .get(&current_date)
                .map(Vec::as_slice)
                .unwrap_or(&[]);

            let mut day_slots = Vec::new();
            for schedule_slot in schedule.available_slots_on(weekday) {
                let slot_start = current_date.and_time(schedule_slot.start_time).and_utc();
                let slot_end = current_date.and_time(schedule_slot.end_time).and_utc();

                // Candidate starts step forward by the granularity; each
                // candidate spans the full configured duration and must fit
                // inside the schedule slot.
                let mut candidate_start = slot_start;
                while candidate_start + duration <= slot_end {
                    let candidate = TimeInterval::new(candidate_start, candidate_start + duration);

                    let blocked = day_booked.iter().any(|booked| candidate.overlaps(booked));
                    if !blocked && window.contains(&candidate) {
                        day_slots.push(TimeSlot {
                            start_time: candidate.start,
                            end_time: candidate.end,
                        });
                    }

                    candidate_start += step;
                }
            }

            if !day_slots.is_empty() {
                day_slots.sort_by_key(|slot| slot.start_time);
                days.push(DailyAvailability {
                    date: current_date,
                    slots: day_slots,
                });
            }

            current_date += Duration::days(1);
        }

        debug!(
            "Found {} available slots for practitioner {}",
            days.iter().map(|day| day.slots.len()).sum::<usize>(),
            practitioner_id
        );

        Ok(AvailabilityResponse {
            practitioner_id,
            days,
        })
    }
}
