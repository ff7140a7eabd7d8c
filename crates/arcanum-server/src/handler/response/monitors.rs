//! Monitor response types.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use crate::service::HealthReport;

/// Overall service status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(AsRefStr, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Unhealthy,
}

/// Reachability of each dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ServiceChecks {
    pub database: bool,
    pub counter_store: bool,
}

/// Health check response.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: ServiceStatus,
    pub services: ServiceChecks,
}

impl HealthStatus {
    pub fn from_report(report: HealthReport) -> Self {
        let status = if report.is_healthy() {
            ServiceStatus::Healthy
        } else {
            ServiceStatus::Unhealthy
        };

        Self {
            status,
            services: ServiceChecks {
                database: report.database,
                counter_store: report.counter_store,
            },
        }
    }
}
