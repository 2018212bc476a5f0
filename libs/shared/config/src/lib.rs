use std::env;
use tracing::warn;

/// Engine-wide scheduling parameters. Values come from the environment with
/// sensible defaults; they are not persisted per practitioner or per request.
#[derive(Debug, Clone)]
pub struct SchedulingConfig {
    /// Length of every candidate slot produced by the availability calculator.
    pub appointment_duration_minutes: i64,
    /// Step between successive candidate slot start times.
    pub availability_granularity_minutes: i64,
    /// Maximum span of an availability query; longer windows are truncated.
    pub max_availability_window_days: i64,
}

impl SchedulingConfig {
    pub fn from_env() -> Self {
        Self {
            appointment_duration_minutes: env_positive("APPOINTMENT_DURATION_MINUTES", 60),
            availability_granularity_minutes: env_positive("AVAILABILITY_GRANULARITY_MINUTES", 15),
            max_availability_window_days: env_positive("MAX_AVAILABILITY_WINDOW_DAYS", 28),
        }
    }
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            appointment_duration_minutes: 60,
            availability_granularity_minutes: 15,
            max_availability_window_days: 28,
        }
    }
}

fn env_positive(key: &str, default: i64) -> i64 {
    match env::var(key) {
        Ok(raw) => match raw.parse::<i64>() {
            Ok(value) if value > 0 => value,
            _ => {
                warn!("{} set to unusable value {:?}, using default {}", key, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_engine_constants() {
        let config = SchedulingConfig::default();
        assert_eq!(config.appointment_duration_minutes, 60);
        assert_eq!(config.availability_granularity_minutes, 15);
        assert_eq!(config.max_availability_window_days, 28);
    }
}
