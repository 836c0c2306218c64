use std::sync::Arc;

use crate::background::escalation::EscalationScanner;
use crate::config::ServerConfig;
use crate::engine::RuleEngine;
use crate::ws::ConnectionRegistry;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: fleetwatch_db::DbPool,
    /// Server configuration (accessed by middleware and handlers).
    pub config: Arc<ServerConfig>,
    /// WebSocket connection registry (operator sessions).
    pub registry: Arc<ConnectionRegistry>,
    /// Centralized event bus for publishing fleet events.
    pub event_bus: Arc<fleetwatch_events::EventBus>,
    /// Rule evaluation pipeline fed by telemetry ingest.
    pub engine: Arc<RuleEngine>,
    /// Escalation scanner, exposed so the scheduler endpoint can trigger
    /// a sweep outside the built-in interval.
    pub scanner: Arc<EscalationScanner>,
}
