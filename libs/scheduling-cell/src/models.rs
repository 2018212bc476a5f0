// libs/scheduling-cell/src/models.rs
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::interval::TimeInterval;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub practitioner_id: Uuid,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub location: Option<String>,
    pub is_virtual: bool,
    pub meeting_link: Option<String>,
    pub patient_notes: Option<String>,
    pub practitioner_notes: Option<String>,
    pub reminders_sent: bool,
    pub google_calendar_event_id: Option<String>,
    pub ms_calendar_event_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// The booked `[start, end)` range.
    pub fn interval(&self) -> TimeInterval {
        TimeInterval::new(self.start_time, self.end_time)
    }

    /// Whether this appointment still occupies practitioner time.
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Rescheduled,
    Cancelled,
    Completed,
    NoShow,
}

impl AppointmentStatus {
    /// Active statuses block conflicting bookings.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Scheduled
                | AppointmentStatus::Confirmed
                | AppointmentStatus::Rescheduled
        )
    }

    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Cancelled
                | AppointmentStatus::Completed
                | AppointmentStatus::NoShow
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Rescheduled => write!(f, "rescheduled"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
        }
    }
}

// ==============================================================================
// SCHEDULE MODELS
// ==============================================================================

/// A practitioner's recurring weekly availability template. One schedule per
/// practitioner is consulted at a time (the most recently created active one).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: Uuid,
    pub practitioner_id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub slots: Vec<ScheduleSlot>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Schedule {
    /// Available slots for a given weekday, in stored order.
    pub fn available_slots_on(&self, day: WeekDay) -> Vec<&ScheduleSlot> {
        self.slots
            .iter()
            .filter(|slot| slot.is_available && slot.day_of_week == day)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSlot {
    pub id: Uuid,
    pub day_of_week: WeekDay,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_available: bool,
}

/// Day of the week, indexed 0 = Monday .. 6 = Sunday.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WeekDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl WeekDay {
    pub fn from_date(date: NaiveDate) -> Self {
        match date.weekday() {
            Weekday::Mon => WeekDay::Monday,
            Weekday::Tue => WeekDay::Tuesday,
            Weekday::Wed => WeekDay::Wednesday,
            Weekday::Thu => WeekDay::Thursday,
            Weekday::Fri => WeekDay::Friday,
            Weekday::Sat => WeekDay::Saturday,
            Weekday::Sun => WeekDay::Sunday,
        }
    }

    pub fn index(&self) -> u8 {
        *self as u8
    }
}

// ==============================================================================
// AVAILABILITY MODELS
// ==============================================================================

/// An open, bookable slot produced by the availability calculator. Always of
/// the configured duration and fully inside one schedule slot window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeSlot {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyAvailability {
    pub date: NaiveDate,
    pub slots: Vec<TimeSlot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub practitioner_id: Uuid,
    pub days: Vec<DailyAvailability>,
}

impl AvailabilityResponse {
    pub fn total_slots(&self) -> usize {
        self.days.iter().map(|day| day.slots.len()).sum()
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub patient_id: Uuid,
    pub practitioner_id: Uuid,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: Option<String>,
    pub is_virtual: bool,
    pub meeting_link: Option<String>,
    pub patient_notes: Option<String>,
}

/// Explicit per-field patch for appointment updates. Only the fields listed
/// here can be changed through the generic update path; unknown keys are
/// rejected at deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppointmentPatch {
    pub title: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: Option<AppointmentStatus>,
    pub location: Option<String>,
    pub is_virtual: Option<bool>,
    pub meeting_link: Option<String>,
    pub patient_notes: Option<String>,
    pub practitioner_notes: Option<String>,
    pub reminders_sent: Option<bool>,
    pub google_calendar_event_id: Option<String>,
    pub ms_calendar_event_id: Option<String>,
}

impl AppointmentPatch {
    /// Whether applying this patch moves the booked interval.
    pub fn moves_interval(&self) -> bool {
        self.start_time.is_some() || self.end_time.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub new_start_time: DateTime<Utc>,
    pub new_end_time: DateTime<Utc>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: Option<String>,
    pub notify_patient: bool,
    pub notify_practitioner: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteAppointmentRequest {
    pub notes: Option<String>,
    pub follow_up_required: bool,
    pub follow_up_in_days: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentSearchQuery {
    pub patient_id: Option<Uuid>,
    pub practitioner_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

// ==============================================================================
// SCHEDULE REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateScheduleRequest {
    pub practitioner_id: Uuid,
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub slots: Vec<ScheduleSlotCreate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateScheduleRequest {
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSlotCreate {
    pub day_of_week: WeekDay,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_available: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleSlotUpdate {
    pub day_of_week: Option<WeekDay>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub is_available: Option<bool>,
}

// ==============================================================================
// NOTIFICATION EVENT MODELS
// ==============================================================================

/// Fire-and-forget signal for the external notification collaborator. The
/// engine records who should hear about what; it never delivers anything.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationEvent {
    pub recipient_id: Uuid,
    pub recipient_type: RecipientType,
    pub kind: NotificationKind,
    pub appointment_id: Uuid,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecipientType {
    Patient,
    Practitioner,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Rescheduled,
    Cancelled,
    Completed,
    FollowUpRequested,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("appointment start time must be before end time")]
    InvalidInterval,

    #[error("time slot conflicts with an existing appointment (id: {blocking_id})")]
    Conflict { blocking_id: Uuid },

    #[error("appointment {0} not found")]
    AppointmentNotFound(Uuid),

    #[error("schedule not found for {0}")]
    ScheduleNotFound(Uuid),

    #[error("appointment is already in terminal state: {0}")]
    AlreadyInTerminalState(AppointmentStatus),

    #[error("store failure: {0}")]
    StoreFailure(String),
}
