//! Liveness of the pipeline's long-running loops.
//!
//! Each ingestion worker and the reporter hold a [`HealthHandle`] and keep reporting
//! healthy while their loop runs. The pipeline is live when every registered loop
//! reported recently enough. A registry with nothing registered is not live.
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use time::OffsetDateTime;
use tracing::warn;

type Components = Arc<RwLock<BTreeMap<String, ComponentStatus>>>;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ComponentStatus {
    /// Registered, hasn't reported yet
    Starting,
    /// Must report again before this instant
    HealthyUntil(OffsetDateTime),
    Unhealthy,
    /// Missed its deadline. Only ever computed, never reported.
    Stalled,
}

impl ComponentStatus {
    fn at(self, now: OffsetDateTime) -> Self {
        match self {
            ComponentStatus::HealthyUntil(until) if until <= now => ComponentStatus::Stalled,
            status => status,
        }
    }

    fn is_healthy(self) -> bool {
        matches!(self, ComponentStatus::HealthyUntil(_))
    }
}

/// Point-in-time liveness of every registered loop.
#[derive(Debug, Default)]
pub struct HealthStatus {
    pub healthy: bool,
    pub components: BTreeMap<String, ComponentStatus>,
}

impl IntoResponse for HealthStatus {
    fn into_response(self) -> Response {
        let code = if self.healthy {
            StatusCode::OK
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (code, format!("{:?}", self.components)).into_response()
    }
}

#[derive(Clone)]
pub struct HealthHandle {
    component: String,
    deadline: Duration,
    components: Components,
}

impl HealthHandle {
    /// Must be called more often than the deadline the handle was registered with.
    pub fn report_healthy(&self) {
        self.report_status(ComponentStatus::HealthyUntil(
            OffsetDateTime::now_utc() + self.deadline,
        ))
    }

    pub fn report_status(&self, status: ComponentStatus) {
        self.components
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(self.component.clone(), status);
    }
}

#[derive(Clone)]
pub struct HealthRegistry {
    name: String,
    components: Components,
}

impl HealthRegistry {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            components: Default::default(),
        }
    }

    /// Register a loop that will report at least once per `deadline`. Registering the
    /// same name again replaces the previous component.
    pub fn register(&self, component: impl Into<String>, deadline: Duration) -> HealthHandle {
        let handle = HealthHandle {
            component: component.into(),
            deadline,
            components: self.components.clone(),
        };
        handle.report_status(ComponentStatus::Starting);
        handle
    }

    pub fn get_status(&self) -> HealthStatus {
        let now = OffsetDateTime::now_utc();
        let components: BTreeMap<_, _> = self
            .components
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, status)| (name.clone(), status.at(now)))
            .collect();

        let healthy = !components.is_empty() && components.values().all(|s| s.is_healthy());
        if !healthy {
            warn!("{} check failed: {:?}", self.name, components);
        }
        HealthStatus {
            healthy,
            components,
        }
    }
}
