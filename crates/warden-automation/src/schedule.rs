//! Scheduled trigger evaluation
//!
//! Called once per scheduler tick with the tick's timestamp. Fixed-time
//! schedules fire when the tick's minute matches the CRON expression in
//! the schedule's timezone; solar schedules fire within a one-minute
//! window around the offset sun time. Every failure path (missing
//! location, stale sun data, bad CRON, bad timezone) is a logged non-fire,
//! never an error.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};
use warden_store::{Store, StoredAutomation};

use crate::config::ScheduleConfig;
use crate::cron::CronExpr;

/// Fire window half-width for solar schedules
const SOLAR_WINDOW_SECONDS: i64 = 60;

/// Whether a scheduled automation should fire on this tick
pub fn schedule_should_fire(
    schedule: &ScheduleConfig,
    automation: &StoredAutomation,
    store: &Store,
    now: DateTime<Utc>,
) -> bool {
    match schedule {
        ScheduleConfig::FixedTime {
            cron_expression,
            timezone,
        } => fixed_time_fires(cron_expression, timezone.as_deref(), automation, store, now),
        ScheduleConfig::Sunrise { offset_minutes } => {
            solar_fires(automation, store, now, *offset_minutes, true)
        }
        ScheduleConfig::Sunset { offset_minutes } => {
            solar_fires(automation, store, now, *offset_minutes, false)
        }
    }
}

fn fixed_time_fires(
    cron_expression: &str,
    timezone: Option<&str>,
    automation: &StoredAutomation,
    store: &Store,
    now: DateTime<Utc>,
) -> bool {
    let cron = match CronExpr::parse(cron_expression) {
        Ok(cron) => cron,
        Err(e) => {
            warn!(
                automation_id = automation.id,
                automation = %automation.name,
                cron = cron_expression,
                error = %e,
                "Unparseable CRON expression; not firing"
            );
            return false;
        }
    };

    let tz = resolve_timezone(timezone, automation, store);
    let local = now.with_timezone(&tz);
    let fires = cron.matches_minute(&local);

    if fires {
        debug!(
            automation_id = automation.id,
            cron = cron_expression,
            tz = %tz,
            "Fixed-time schedule matches current minute"
        );
    }
    fires
}

/// Schedule timezone precedence: explicit config, then the automation's
/// location, then UTC
fn resolve_timezone(
    configured: Option<&str>,
    automation: &StoredAutomation,
    store: &Store,
) -> Tz {
    if let Some(name) = configured {
        match name.parse() {
            Ok(tz) => return tz,
            Err(_) => {
                warn!(
                    automation_id = automation.id,
                    timezone = name,
                    "Unknown schedule timezone; falling back"
                );
            }
        }
    }

    if let Some(location_id) = automation.location_id {
        if let Ok(Some(location)) = store.find_location(location_id) {
            match location.timezone.parse() {
                Ok(tz) => return tz,
                Err(_) => {
                    warn!(
                        location_id,
                        timezone = %location.timezone,
                        "Unknown location timezone; falling back to UTC"
                    );
                }
            }
        }
    }

    Tz::UTC
}

fn solar_fires(
    automation: &StoredAutomation,
    store: &Store,
    now: DateTime<Utc>,
    offset_minutes: i32,
    sunrise: bool,
) -> bool {
    let Some(location_id) = automation.location_id else {
        warn!(
            automation_id = automation.id,
            automation = %automation.name,
            "Solar schedule without a location scope; not firing"
        );
        return false;
    };

    let sun_times = match store.find_sun_times(location_id) {
        Ok(Some(times)) => times,
        Ok(None) => {
            warn!(
                automation_id = automation.id,
                location_id, "No sun-times record for location; not firing"
            );
            return false;
        }
        Err(e) => {
            warn!(
                automation_id = automation.id,
                location_id,
                error = %e,
                "Failed loading sun times; not firing"
            );
            return false;
        }
    };

    if sun_times.is_stale(now) {
        warn!(
            automation_id = automation.id,
            location_id,
            updated_at = %sun_times.updated_at,
            "Sun-times record is stale; not firing"
        );
        return false;
    }

    let base = if sunrise {
        sun_times.sunrise_utc
    } else {
        sun_times.sunset_utc
    };
    let target = base + chrono::Duration::minutes(offset_minutes.into());
    let delta = (now - target).num_seconds().abs();
    let fires = delta <= SOLAR_WINDOW_SECONDS;

    if fires {
        debug!(
            automation_id = automation.id,
            target = %target,
            delta_seconds = delta,
            "Solar schedule within fire window"
        );
    }
    fires
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScheduleConfig;
    use serde_json::json;

    const ORG: &str = "org-test";

    fn at(spec: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(spec)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn setup(location_tz: &str) -> (Store, i64) {
        let store = Store::open_in_memory().unwrap();
        store.create_organization(ORG, "Test").unwrap();
        let location_id = store.create_location(ORG, "HQ", location_tz).unwrap();
        (store, location_id)
    }

    fn automation(store: &Store, location_id: Option<i64>) -> StoredAutomation {
        let id = store
            .create_automation(ORG, "Sched", true, location_id, &json!({"actions": []}))
            .unwrap();
        store.find_automation(id).unwrap().unwrap()
    }

    #[test]
    fn test_cron_fires_within_minute_in_timezone() {
        let (store, location_id) = setup("America/New_York");
        let automation = automation(&store, Some(location_id));
        let schedule = ScheduleConfig::FixedTime {
            cron_expression: "0 9 * * *".to_string(),
            timezone: Some("America/New_York".to_string()),
        };

        // 09:00:30 EST == 14:00:30 UTC (March 2nd, before DST)
        assert!(schedule_should_fire(
            &schedule,
            &automation,
            &store,
            at("2026-03-02T14:00:30Z")
        ));

        // 09:02:00 local is outside the window
        assert!(!schedule_should_fire(
            &schedule,
            &automation,
            &store,
            at("2026-03-02T14:02:00Z")
        ));

        // 09:00 UTC is 04:00 local; must not fire
        assert!(!schedule_should_fire(
            &schedule,
            &automation,
            &store,
            at("2026-03-02T09:00:00Z")
        ));
    }

    #[test]
    fn test_cron_falls_back_to_location_timezone() {
        let (store, location_id) = setup("America/Chicago");
        let automation = automation(&store, Some(location_id));
        let schedule = ScheduleConfig::FixedTime {
            cron_expression: "30 6 * * *".to_string(),
            timezone: None,
        };

        // 06:30 CST == 12:30 UTC
        assert!(schedule_should_fire(
            &schedule,
            &automation,
            &store,
            at("2026-03-02T12:30:10Z")
        ));
    }

    #[test]
    fn test_bad_cron_is_a_clean_non_fire() {
        let (store, location_id) = setup("UTC");
        let automation = automation(&store, Some(location_id));
        let schedule = ScheduleConfig::FixedTime {
            cron_expression: "whenever".to_string(),
            timezone: None,
        };

        assert!(!schedule_should_fire(
            &schedule,
            &automation,
            &store,
            Utc::now()
        ));
    }

    #[test]
    fn test_sunset_offset_window() {
        let (store, location_id) = setup("UTC");
        let automation = automation(&store, Some(location_id));
        let sunset = at("2026-03-02T17:45:00Z");
        store
            .set_sun_times(location_id, at("2026-03-02T06:30:00Z"), sunset)
            .unwrap();

        let schedule = ScheduleConfig::Sunset { offset_minutes: -30 };

        // Target is 17:15; a tick 20 seconds later fires
        assert!(schedule_should_fire(
            &schedule,
            &automation,
            &store,
            at("2026-03-02T17:15:20Z")
        ));

        // Two minutes later does not
        assert!(!schedule_should_fire(
            &schedule,
            &automation,
            &store,
            at("2026-03-02T17:17:30Z")
        ));

        // Neither does plain sunset time
        assert!(!schedule_should_fire(
            &schedule,
            &automation,
            &store,
            sunset
        ));
    }

    #[test]
    fn test_sunrise_requires_location_and_fresh_data() {
        let (store, location_id) = setup("UTC");
        let schedule = ScheduleConfig::Sunrise { offset_minutes: 0 };

        // No location scope
        let unscoped = automation(&store, None);
        assert!(!schedule_should_fire(
            &schedule,
            &unscoped,
            &store,
            Utc::now()
        ));

        // No sun-times record
        let scoped = automation(&store, Some(location_id));
        assert!(!schedule_should_fire(
            &schedule,
            &scoped,
            &store,
            Utc::now()
        ));
    }
}
