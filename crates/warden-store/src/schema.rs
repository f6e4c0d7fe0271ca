//! Database schema
//!
//! Convention notes:
//! - Timestamps are RFC3339 TEXT in UTC
//! - JSON columns are TEXT
//! - All tables use INTEGER PRIMARY KEY for rowid aliasing, except
//!   externally-keyed tables (organizations, connectors, audit_log)
//! - Every org-owned table carries organization_id; the events table is
//!   joined through connectors

/// Schema initialization SQL, applied idempotently at open
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS organizations (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS connectors (
    id TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL REFERENCES organizations(id),
    name TEXT NOT NULL,
    category TEXT NOT NULL,
    enabled INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS idx_connectors_org ON connectors(organization_id);

CREATE TABLE IF NOT EXISTS locations (
    id INTEGER PRIMARY KEY,
    organization_id TEXT NOT NULL REFERENCES organizations(id),
    name TEXT NOT NULL,
    timezone TEXT NOT NULL DEFAULT 'UTC'
);

CREATE INDEX IF NOT EXISTS idx_locations_org ON locations(organization_id);

CREATE TABLE IF NOT EXISTS spaces (
    id INTEGER PRIMARY KEY,
    organization_id TEXT NOT NULL REFERENCES organizations(id),
    location_id INTEGER NOT NULL REFERENCES locations(id),
    name TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_spaces_location ON spaces(location_id);

CREATE TABLE IF NOT EXISTS alarm_zones (
    id INTEGER PRIMARY KEY,
    organization_id TEXT NOT NULL REFERENCES organizations(id),
    location_id INTEGER NOT NULL REFERENCES locations(id),
    name TEXT NOT NULL,
    armed_state TEXT NOT NULL DEFAULT 'DISARMED',
    trigger_behavior TEXT NOT NULL DEFAULT 'standard',
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_zones_org ON alarm_zones(organization_id);
CREATE INDEX IF NOT EXISTS idx_zones_location ON alarm_zones(location_id);

CREATE TABLE IF NOT EXISTS trigger_overrides (
    zone_id INTEGER NOT NULL REFERENCES alarm_zones(id) ON DELETE CASCADE,
    event_type TEXT NOT NULL,
    should_trigger INTEGER NOT NULL,
    PRIMARY KEY (zone_id, event_type)
);

-- Devices: one space and one alarm zone at most, each a nullable single
-- foreign key so multi-zone assignment cannot be represented
CREATE TABLE IF NOT EXISTS devices (
    id INTEGER PRIMARY KEY,
    organization_id TEXT NOT NULL REFERENCES organizations(id),
    connector_id TEXT NOT NULL REFERENCES connectors(id),
    external_id TEXT NOT NULL,
    name TEXT NOT NULL,
    device_type TEXT NOT NULL,
    subtype TEXT,
    status TEXT,
    battery_percentage INTEGER,
    space_id INTEGER REFERENCES spaces(id),
    alarm_zone_id INTEGER REFERENCES alarm_zones(id),
    updated_at TEXT NOT NULL,
    UNIQUE(connector_id, external_id)
);

CREATE INDEX IF NOT EXISTS idx_devices_zone ON devices(alarm_zone_id);
CREATE INDEX IF NOT EXISTS idx_devices_space ON devices(space_id);

-- Immutable event records; org scope is derived through the connector
CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY,
    event_uuid TEXT NOT NULL UNIQUE,
    connector_id TEXT NOT NULL REFERENCES connectors(id),
    device_external_id TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    category TEXT NOT NULL,
    event_type TEXT NOT NULL,
    subtype TEXT,
    payload TEXT NOT NULL,
    original_event TEXT NOT NULL,
    ingested_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_events_connector ON events(connector_id, device_external_id);
CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp);

CREATE TABLE IF NOT EXISTS audit_log (
    id TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL REFERENCES organizations(id),
    zone_id INTEGER NOT NULL REFERENCES alarm_zones(id),
    action TEXT NOT NULL,
    previous_state TEXT NOT NULL,
    new_state TEXT NOT NULL,
    reason TEXT NOT NULL,
    trigger_event_uuid TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_audit_zone ON audit_log(zone_id, created_at);

-- Automations are authored externally; the core only reads them
CREATE TABLE IF NOT EXISTS automations (
    id INTEGER PRIMARY KEY,
    organization_id TEXT NOT NULL REFERENCES organizations(id),
    name TEXT NOT NULL,
    enabled INTEGER NOT NULL DEFAULT 1,
    location_id INTEGER REFERENCES locations(id),
    config_json TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_automations_org ON automations(organization_id, enabled);

CREATE TABLE IF NOT EXISTS automation_executions (
    id INTEGER PRIMARY KEY,
    organization_id TEXT NOT NULL REFERENCES organizations(id),
    automation_id INTEGER NOT NULL REFERENCES automations(id),
    trigger_kind TEXT NOT NULL,
    trigger_timestamp TEXT NOT NULL,
    trigger_event_uuid TEXT,
    status TEXT NOT NULL,
    total_actions INTEGER NOT NULL,
    successful_actions INTEGER NOT NULL DEFAULT 0,
    failed_actions INTEGER NOT NULL DEFAULT 0,
    duration_ms INTEGER,
    started_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_executions_automation
    ON automation_executions(automation_id, started_at);

CREATE TABLE IF NOT EXISTS automation_action_executions (
    id INTEGER PRIMARY KEY,
    execution_id INTEGER NOT NULL REFERENCES automation_executions(id) ON DELETE CASCADE,
    action_index INTEGER NOT NULL,
    action_type TEXT NOT NULL,
    action_params TEXT NOT NULL,
    status TEXT NOT NULL,
    error_message TEXT,
    started_at TEXT NOT NULL,
    finished_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_action_executions_parent
    ON automation_action_executions(execution_id, action_index);

CREATE TABLE IF NOT EXISTS sun_times (
    location_id INTEGER PRIMARY KEY REFERENCES locations(id),
    sunrise_utc TEXT NOT NULL,
    sunset_utc TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;
