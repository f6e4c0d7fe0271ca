//! Five-field CRON expression matching
//!
//! Minute-resolution matching only: an expression "fires" on a tick when
//! the tick's minute satisfies all fields. Supported syntax per field:
//! `*`, `*/n`, `a`, `a-b`, `a-b/n`, and comma lists of those. Day-of-month
//! and day-of-week follow the usual rule: when both are restricted, either
//! matching suffices.

use chrono::{DateTime, Datelike, TimeZone, Timelike};
use thiserror::Error;

/// CRON parse errors
#[derive(Debug, Error)]
pub enum CronError {
    #[error("expected 5 fields, got {0}")]
    FieldCount(usize),

    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error("value {value} out of range {min}-{max}")]
    OutOfRange { value: u32, min: u32, max: u32 },
}

/// Result type for cron parsing
pub type CronResult<T> = Result<T, CronError>;

/// One component of a field's comma list
#[derive(Debug, Clone, PartialEq, Eq)]
enum FieldPart {
    Any,
    Step(u32),
    Value(u32),
    Range(u32, u32),
    RangeStep(u32, u32, u32),
}

impl FieldPart {
    fn matches(&self, value: u32) -> bool {
        match *self {
            FieldPart::Any => true,
            FieldPart::Step(step) => value % step == 0,
            FieldPart::Value(v) => value == v,
            FieldPart::Range(lo, hi) => value >= lo && value <= hi,
            FieldPart::RangeStep(lo, hi, step) => {
                value >= lo && value <= hi && (value - lo) % step == 0
            }
        }
    }
}

/// One of the five cron fields
#[derive(Debug, Clone, PartialEq, Eq)]
struct Field {
    parts: Vec<FieldPart>,
}

impl Field {
    fn is_wildcard(&self) -> bool {
        self.parts.iter().any(|p| matches!(p, FieldPart::Any))
    }

    fn matches(&self, value: u32) -> bool {
        self.parts.iter().any(|p| p.matches(value))
    }
}

/// A parsed five-field CRON expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpr {
    minute: Field,
    hour: Field,
    day_of_month: Field,
    month: Field,
    day_of_week: Field,
}

impl CronExpr {
    /// Parse `minute hour day-of-month month day-of-week`
    pub fn parse(expression: &str) -> CronResult<Self> {
        let fields: Vec<&str> = expression.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(CronError::FieldCount(fields.len()));
        }

        Ok(Self {
            minute: parse_field(fields[0], 0, 59)?,
            hour: parse_field(fields[1], 0, 23)?,
            day_of_month: parse_field(fields[2], 1, 31)?,
            month: parse_field(fields[3], 1, 12)?,
            day_of_week: parse_dow_field(fields[4])?,
        })
    }

    /// Whether the expression matches the minute containing `time`
    pub fn matches_minute<Tz: TimeZone>(&self, time: &DateTime<Tz>) -> bool {
        if !self.minute.matches(time.minute()) || !self.hour.matches(time.hour()) {
            return false;
        }
        if !self.month.matches(time.month()) {
            return false;
        }

        let dom_ok = self.day_of_month.matches(time.day());
        let dow_ok = self.day_of_week.matches(time.weekday().num_days_from_sunday());

        // Vixie rule: both restricted means either may match
        match (self.day_of_month.is_wildcard(), self.day_of_week.is_wildcard()) {
            (false, false) => dom_ok || dow_ok,
            _ => dom_ok && dow_ok,
        }
    }
}

fn parse_number(s: &str, min: u32, max: u32) -> CronResult<u32> {
    let value: u32 = s.parse().map_err(|_| CronError::InvalidField {
        field: s.to_string(),
        reason: "not a number".to_string(),
    })?;
    if value < min || value > max {
        return Err(CronError::OutOfRange { value, min, max });
    }
    Ok(value)
}

fn parse_part(part: &str, min: u32, max: u32) -> CronResult<FieldPart> {
    if part == "*" {
        return Ok(FieldPart::Any);
    }

    if let Some(step_str) = part.strip_prefix("*/") {
        let step = parse_number(step_str, 1, max)?;
        return Ok(FieldPart::Step(step));
    }

    let (range_str, step) = match part.split_once('/') {
        Some((range, step_str)) => (range, Some(parse_number(step_str, 1, max)?)),
        None => (part, None),
    };

    match range_str.split_once('-') {
        Some((lo_str, hi_str)) => {
            let lo = parse_number(lo_str, min, max)?;
            let hi = parse_number(hi_str, min, max)?;
            if lo > hi {
                return Err(CronError::InvalidField {
                    field: part.to_string(),
                    reason: "range start exceeds end".to_string(),
                });
            }
            Ok(match step {
                Some(step) => FieldPart::RangeStep(lo, hi, step),
                None => FieldPart::Range(lo, hi),
            })
        }
        None => {
            if step.is_some() {
                return Err(CronError::InvalidField {
                    field: part.to_string(),
                    reason: "step requires a range".to_string(),
                });
            }
            Ok(FieldPart::Value(parse_number(range_str, min, max)?))
        }
    }
}

fn parse_field(field: &str, min: u32, max: u32) -> CronResult<Field> {
    let parts = field
        .split(',')
        .map(|part| parse_part(part, min, max))
        .collect::<CronResult<Vec<_>>>()?;
    if parts.is_empty() {
        return Err(CronError::InvalidField {
            field: field.to_string(),
            reason: "empty field".to_string(),
        });
    }
    Ok(Field { parts })
}

/// Day-of-week accepts 0-7 with 7 normalized to Sunday
fn parse_dow_field(field: &str) -> CronResult<Field> {
    let mut parsed = parse_field(field, 0, 7)?;
    for part in &mut parsed.parts {
        if let FieldPart::Value(7) = part {
            *part = FieldPart::Value(0);
        }
    }
    Ok(parsed)
}
