use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use syncforge_adapter::{Adapter, StubAdapter};
use syncforge_config::SyncforgeConfig;
use syncforge_conflict::{ConflictDetector, ConflictResolver};
use syncforge_fanout::{FanoutHub, HubState, TokenValidator};
use syncforge_mapper::StatusMapper;
use syncforge_monitor::{HealthMonitor, SyncMonitor};
use syncforge_orchestrator::Orchestrator;
use syncforge_queue::EventQueue;
use syncforge_types::System;

/// Everything `main` needs to run the sweep loops and drop in a graceful
/// shutdown signal once the server stops accepting connections.
pub struct Runtime {
    pub router: Router,
    pub orchestrator: Arc<Orchestrator>,
    pub queue: Arc<EventQueue>,
    pub health_monitor: Arc<HealthMonitor>,
}

/// Wires C1 (mapper) through C7 (monitor) together and builds the `axum`
/// router, the way `kimberlite-server::server::Server::new` assembles its
/// core runtime, auth service, and replication submitter before returning
/// a value `main` can `run()`.
pub fn build(config: &SyncforgeConfig) -> Runtime {
    let mapper = Arc::new(StatusMapper::new(config.mapper.clone()));
    let queue = Arc::new(EventQueue::new(config.queue.clone()));
    let detector = Arc::new(ConflictDetector::new(config.conflict.clone(), mapper.clone()));
    let resolver = Arc::new(ConflictResolver::with_defaults(config.conflict.escalation_threshold));
    let monitor = Arc::new(SyncMonitor::new(&config.monitor).expect("failed to register prometheus collectors"));

    // No concrete adapter implementations ship in this workspace (spec.md
    // §1's Non-goal: the REST/GraphQL/SQL/agent-service clients
    // themselves). `StubAdapter` stands in so the orchestrator and the
    // demo `/ws` surface are usable out of the box.
    let adapters: HashMap<System, Arc<dyn Adapter>> =
        System::ALL.into_iter().map(|s| (s, Arc::new(StubAdapter::new(s)) as Arc<dyn Adapter>)).collect();

    let hub = Arc::new(FanoutHub::new(config.fanout.clone()));
    let health_monitor = Arc::new(HealthMonitor::new(adapters.values().cloned().collect(), monitor.alerts.clone()));

    let orchestrator = Arc::new(
        Orchestrator::new(config.orchestrator.clone(), mapper, queue.clone(), detector, resolver, adapters, monitor)
            .with_hub(hub.clone()),
    );

    let hub_state = HubState {
        hub,
        validator: Arc::new(TokenValidator::new(config.server.jwt_secret.clone())),
        sink: orchestrator.clone() as Arc<dyn syncforge_fanout::StatusUpdateSink>,
    };

    let fanout_routes = Router::new().route("/ws", get(syncforge_fanout::ws_handler)).with_state(hub_state);
    let observability_routes = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .with_state(orchestrator.clone());

    let router = fanout_routes.merge(observability_routes).layer(TraceLayer::new_for_http());

    info!("syncforge runtime assembled");
    Runtime { router, orchestrator, queue, health_monitor }
}

async fn metrics_handler(State(orchestrator): State<Arc<Orchestrator>>) -> impl IntoResponse {
    match orchestrator.monitor().render() {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn health_handler() -> impl IntoResponse {
    StatusCode::OK
}

async fn ready_handler(State(orchestrator): State<Arc<Orchestrator>>) -> impl IntoResponse {
    let unhealthy = orchestrator
        .monitor()
        .active_alerts()
        .iter()
        .any(|alert| matches!(alert.severity, syncforge_monitor::AlertSeverity::Critical));
    if unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    }
}
