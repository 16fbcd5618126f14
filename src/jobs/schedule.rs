use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;

use crate::jobs::error::{JobError, JobResult};

/// Parses a classic 5-field cron expression (minute, hour, day of month,
/// month, day of week).
///
/// The `cron` crate and the scheduler clock both want a leading seconds
/// field, so a `0` is prepended before parsing. Jobs therefore fire at
/// second zero of their scheduled minute.
pub fn parse_schedule(expression: &str) -> JobResult<Schedule> {
    let fields = expression.split_whitespace().count();
    if fields != 5 {
        return Err(JobError::InvalidCronExpression {
            expression: expression.to_string(),
            reason: format!("expected 5 fields, found {fields}"),
        });
    }

    Schedule::from_str(&clock_expression(expression)).map_err(|e| {
        JobError::InvalidCronExpression {
            expression: expression.to_string(),
            reason: e.to_string(),
        }
    })
}

/// Rewrites a validated 5-field expression into the 6-field form the
/// scheduler clock understands.
pub fn clock_expression(expression: &str) -> String {
    format!("0 {}", expression.trim())
}

/// Computes the next fire time strictly after `after`.
pub fn next_fire(schedule: &Schedule, after: &DateTime<Utc>) -> Option<DateTime<Utc>> {
    schedule.after(after).next()
}
