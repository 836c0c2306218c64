//! WebSocket upgrade handler and client message protocol.
//!
//! A session authenticates with a JWT passed as a query parameter (browser
//! WebSocket clients cannot set headers), then exchanges JSON frames:
//!
//! - `subscribe` / `unsubscribe` with a topic string
//!   (`device:<id>`, `location:<id>`, `user:<id>`, `global-alerts`)
//! - `acknowledge_alert` / `resolve_alert` with an alert id
//! - `arm_device` / `disarm_device` with a device id
//!
//! Errors (unknown entity, missing privilege, status conflict, malformed
//! frame) go back to the requesting session only, as typed `error` frames;
//! they are never broadcast.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use fleetwatch_core::alert_events::{
    ERROR_CODE_BAD_MESSAGE, ERROR_CODE_CONFLICT, ERROR_CODE_FORBIDDEN, ERROR_CODE_INTERNAL,
    ERROR_CODE_UNKNOWN_ENTITY, EVENT_ALERT_ACKNOWLEDGED, EVENT_ALERT_RESOLVED,
    EVENT_DEVICE_COMMAND, MSG_TYPE_ERROR, MSG_TYPE_SUBSCRIBED, MSG_TYPE_UNSUBSCRIBED,
};
use fleetwatch_core::error::CoreError;
use fleetwatch_core::topic::Topic;
use fleetwatch_core::types::DbId;
use fleetwatch_db::repositories::{AlertRepo, DeviceRepo, LocationRepo};
use fleetwatch_events::FleetEvent;

use crate::auth::jwt::validate_token;
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::can_operate;
use crate::realtime::publish_alert_event;
use crate::state::AppState;
use crate::ws::ConnectionRegistry;

/// Query parameters for the WebSocket upgrade request.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// JWT access token.
    token: String,
}

/// Inbound client frames, tagged by `type`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Subscribe { topic: String },
    Unsubscribe { topic: String },
    AcknowledgeAlert { alert_id: DbId },
    ResolveAlert { alert_id: DbId },
    ArmDevice { device_id: DbId },
    DisarmDevice { device_id: DbId },
}

/// HTTP handler that authenticates and upgrades the connection to WebSocket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let claims = validate_token(&query.token, &state.config.jwt)
        .map_err(|_| AppError::Core(CoreError::Unauthorized("Invalid or expired token".into())))?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, claims.sub, claims.role)))
}

/// Manage a single WebSocket session after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the session with the [`ConnectionRegistry`].
///   2. Spawns a sender task that forwards messages from the registry channel.
///   3. Processes inbound frames on the current task.
///   4. Cleans up on disconnect.
async fn handle_socket(socket: WebSocket, state: AppState, user_id: DbId, role: String) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, user_id, "WebSocket connected");

    // Register and get the receiver for outbound messages.
    let mut rx = state
        .registry
        .register(conn_id.clone(), user_id, role.clone())
        .await;

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward channel messages to the WebSocket sink.
    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    // Receiver loop: process inbound frames.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(Message::Text(text)) => {
                process_client_message(&state, &conn_id, user_id, &role, text.as_str()).await;
            }
            Ok(_) => {
                // Binary and Ping frames carry no protocol meaning here.
            }
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    // Clean up: remove the session from every topic and abort the sender.
    state.registry.unregister(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, user_id, "WebSocket disconnected");
}

/// Dispatch one inbound JSON frame.
async fn process_client_message(
    state: &AppState,
    conn_id: &str,
    user_id: DbId,
    role: &str,
    text: &str,
) {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            send_error(
                &state.registry,
                conn_id,
                ERROR_CODE_BAD_MESSAGE,
                format!("Malformed message: {e}"),
            )
            .await;
            return;
        }
    };

    match message {
        ClientMessage::Subscribe { topic } => {
            handle_subscribe(state, conn_id, user_id, &topic).await;
        }
        ClientMessage::Unsubscribe { topic } => {
            handle_unsubscribe(state, conn_id, &topic).await;
        }
        ClientMessage::AcknowledgeAlert { alert_id } => {
            handle_alert_transition(state, conn_id, user_id, role, alert_id, AlertAction::Acknowledge)
                .await;
        }
        ClientMessage::ResolveAlert { alert_id } => {
            handle_alert_transition(state, conn_id, user_id, role, alert_id, AlertAction::Resolve)
                .await;
        }
        ClientMessage::ArmDevice { device_id } => {
            handle_device_command(state, conn_id, user_id, role, device_id, true).await;
        }
        ClientMessage::DisarmDevice { device_id } => {
            handle_device_command(state, conn_id, user_id, role, device_id, false).await;
        }
    }
}

/// Validate the referenced entity, then record the subscription.
///
/// Unknown devices/locations produce a `subscription` error frame to the
/// requester; nothing is recorded, so no later publish can reach them.
async fn handle_subscribe(state: &AppState, conn_id: &str, user_id: DbId, raw_topic: &str) {
    let topic = match Topic::parse(raw_topic) {
        Ok(t) => t,
        Err(e) => {
            send_error(&state.registry, conn_id, ERROR_CODE_BAD_MESSAGE, e.to_string()).await;
            return;
        }
    };

    let exists = match topic {
        Topic::Device(id) => DeviceRepo::exists(&state.pool, id).await,
        Topic::Location(id) => LocationRepo::exists(&state.pool, id).await,
        Topic::User(id) => {
            // Sessions may only watch their own user feed.
            if id != user_id {
                send_error(
                    &state.registry,
                    conn_id,
                    ERROR_CODE_FORBIDDEN,
                    "Cannot subscribe to another user's feed".into(),
                )
                .await;
                return;
            }
            Ok(true)
        }
        Topic::GlobalAlerts => Ok(true),
    };

    match exists {
        Ok(true) => {
            state.registry.subscribe(conn_id, topic).await;
            let frame = serde_json::json!({
                "type": MSG_TYPE_SUBSCRIBED,
                "topic": topic,
            });
            send_json(&state.registry, conn_id, frame).await;
        }
        Ok(false) => {
            send_error(
                &state.registry,
                conn_id,
                ERROR_CODE_UNKNOWN_ENTITY,
                format!("No such entity for topic '{topic}'"),
            )
            .await;
        }
        Err(e) => {
            tracing::error!(conn_id = %conn_id, error = %e, "Subscription entity lookup failed");
            send_error(
                &state.registry,
                conn_id,
                ERROR_CODE_INTERNAL,
                "Subscription check failed, try again".into(),
            )
            .await;
        }
    }
}

/// Unsubscribe is idempotent; a malformed topic is still reported.
async fn handle_unsubscribe(state: &AppState, conn_id: &str, raw_topic: &str) {
    match Topic::parse(raw_topic) {
        Ok(topic) => {
            state.registry.unsubscribe(conn_id, topic).await;
            let frame = serde_json::json!({
                "type": MSG_TYPE_UNSUBSCRIBED,
                "topic": topic,
            });
            send_json(&state.registry, conn_id, frame).await;
        }
        Err(e) => {
            send_error(&state.registry, conn_id, ERROR_CODE_BAD_MESSAGE, e.to_string()).await;
        }
    }
}

enum AlertAction {
    Acknowledge,
    Resolve,
}

/// Apply an acknowledge/resolve transition with the persistence layer's
/// conditional-update guard, then broadcast the outcome via the event bus.
async fn handle_alert_transition(
    state: &AppState,
    conn_id: &str,
    user_id: DbId,
    role: &str,
    alert_id: DbId,
    action: AlertAction,
) {
    if !can_operate(role) {
        send_error(
            &state.registry,
            conn_id,
            ERROR_CODE_FORBIDDEN,
            "Operator role required".into(),
        )
        .await;
        return;
    }

    let (result, event_type, conflict_reason) = match action {
        AlertAction::Acknowledge => (
            AlertRepo::acknowledge(&state.pool, alert_id, user_id).await,
            EVENT_ALERT_ACKNOWLEDGED,
            "it is not active",
        ),
        AlertAction::Resolve => (
            AlertRepo::resolve(&state.pool, alert_id, user_id).await,
            EVENT_ALERT_RESOLVED,
            "it is already resolved or missing",
        ),
    };

    match result {
        Ok(Some(alert)) => {
            publish_alert_event(state, event_type, &alert, Some(user_id)).await;
        }
        Ok(None) => {
            send_error(
                &state.registry,
                conn_id,
                ERROR_CODE_CONFLICT,
                format!("Alert {alert_id} was not updated: {conflict_reason}"),
            )
            .await;
        }
        Err(e) => {
            tracing::error!(alert_id, error = %e, "Alert status update failed");
            send_error(
                &state.registry,
                conn_id,
                ERROR_CODE_INTERNAL,
                "Alert update failed, try again".into(),
            )
            .await;
        }
    }
}

/// Persist an arm/disarm config push and notify the device's watchers.
async fn handle_device_command(
    state: &AppState,
    conn_id: &str,
    user_id: DbId,
    role: &str,
    device_id: DbId,
    armed: bool,
) {
    if !can_operate(role) {
        send_error(
            &state.registry,
            conn_id,
            ERROR_CODE_FORBIDDEN,
            "Operator role required".into(),
        )
        .await;
        return;
    }

    match DeviceRepo::set_armed(&state.pool, device_id, armed).await {
        Ok(Some(device)) => {
            let command = if armed { "arm" } else { "disarm" };
            let event = FleetEvent::new(EVENT_DEVICE_COMMAND)
                .with_device(device.id)
                .with_location(device.location_id)
                .with_actor(user_id)
                .with_payload(serde_json::json!({
                    "command": command,
                    "is_armed": device.is_armed,
                }));
            state.event_bus.publish(event);
        }
        Ok(None) => {
            send_error(
                &state.registry,
                conn_id,
                ERROR_CODE_UNKNOWN_ENTITY,
                format!("No such device: {device_id}"),
            )
            .await;
        }
        Err(e) => {
            tracing::error!(device_id, error = %e, "Device command failed");
            send_error(
                &state.registry,
                conn_id,
                ERROR_CODE_INTERNAL,
                "Device command failed, try again".into(),
            )
            .await;
        }
    }
}

async fn send_json(registry: &ConnectionRegistry, conn_id: &str, frame: serde_json::Value) {
    registry
        .send_to_session(conn_id, Message::Text(frame.to_string().into()))
        .await;
}

async fn send_error(registry: &ConnectionRegistry, conn_id: &str, code: &str, message: String) {
    let frame = serde_json::json!({
        "type": MSG_TYPE_ERROR,
        "code": code,
        "message": message,
    });
    send_json(registry, conn_id, frame).await;
}
