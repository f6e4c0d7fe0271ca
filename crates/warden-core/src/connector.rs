//! Connector records
//!
//! A connector is an integration adapter for one external security/IoT
//! vendor, scoped to an organization. The core only reads connectors;
//! provisioning them is an admin concern.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error parsing a persisted connector category
#[derive(Debug, Error)]
#[error("unknown connector category: {0}")]
pub struct ConnectorCategoryParseError(String);

/// Kind of external system a connector integrates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorCategory {
    /// Camera/video management platform (events, bookmarks, snapshots)
    CameraPlatform,

    /// IoT sensor hub (contacts, motion, environment)
    SensorHub,

    /// Door/access controller
    AccessControl,

    /// Push-notification gateway
    NotificationGateway,
}

impl ConnectorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectorCategory::CameraPlatform => "camera_platform",
            ConnectorCategory::SensorHub => "sensor_hub",
            ConnectorCategory::AccessControl => "access_control",
            ConnectorCategory::NotificationGateway => "notification_gateway",
        }
    }

    /// Whether this category can host camera events and bookmarks
    pub fn supports_camera_api(&self) -> bool {
        matches!(self, ConnectorCategory::CameraPlatform)
    }
}

impl std::str::FromStr for ConnectorCategory {
    type Err = ConnectorCategoryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "camera_platform" => Ok(ConnectorCategory::CameraPlatform),
            "sensor_hub" => Ok(ConnectorCategory::SensorHub),
            "access_control" => Ok(ConnectorCategory::AccessControl),
            "notification_gateway" => Ok(ConnectorCategory::NotificationGateway),
            other => Err(ConnectorCategoryParseError(other.to_string())),
        }
    }
}

/// An integration adapter for one external vendor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connector {
    /// Stable external id (referenced by standardized events)
    pub id: String,

    /// Owning organization
    pub organization_id: String,

    /// Display name
    pub name: String,

    /// Kind of system integrated
    pub category: ConnectorCategory,

    /// Whether the connector is active
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip() {
        for cat in [
            ConnectorCategory::CameraPlatform,
            ConnectorCategory::SensorHub,
            ConnectorCategory::AccessControl,
            ConnectorCategory::NotificationGateway,
        ] {
            assert_eq!(cat.as_str().parse::<ConnectorCategory>().unwrap(), cat);
        }
    }

    #[test]
    fn test_camera_api_support() {
        assert!(ConnectorCategory::CameraPlatform.supports_camera_api());
        assert!(!ConnectorCategory::SensorHub.supports_camera_api());
    }
}
