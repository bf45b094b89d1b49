//! WebSocket server + REST endpoints for the chat widget.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::genai::{ContentGenerator, ContentSuggestion};
use crate::nav::Navigator;
use crate::session::{ChatMessage, ChatSession, SessionEvent};

// ── JSON Protocol ───────────────────────────────────────────────────

/// Frame from web client → server.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientFrame {
    Message { content: String },
    QuickAction { action_id: String },
    TourAdvance,
    TourEnd,
    Clear,
    Toggle,
}

/// Frame from server → web client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerFrame {
    /// Full state sync, sent on connect and after broadcast lag.
    Sync {
        messages: Vec<ChatMessage>,
        is_tour_active: bool,
        current_tour_step: usize,
    },
    Message {
        message: ChatMessage,
    },
    TourState {
        active: bool,
        step: usize,
    },
    Cleared,
    Visibility {
        open: bool,
    },
    /// The client's router should change route.
    Navigate {
        route: String,
    },
}

impl From<SessionEvent> for ServerFrame {
    fn from(event: SessionEvent) -> Self {
        match event {
            SessionEvent::MessageAdded { message } => Self::Message { message },
            SessionEvent::TourState { active, step } => Self::TourState { active, step },
            SessionEvent::Cleared => Self::Cleared,
            SessionEvent::Visibility { open } => Self::Visibility { open },
        }
    }
}

// ── Navigation bridge ───────────────────────────────────────────────

/// Navigator that forwards route changes to connected WS clients. The
/// engine fires and forgets; whether any client is listening is irrelevant.
pub struct BroadcastNavigator {
    tx: broadcast::Sender<String>,
}

impl BroadcastNavigator {
    /// Create the navigator and the route channel the server listens on.
    pub fn channel(capacity: usize) -> (Arc<Self>, broadcast::Sender<String>) {
        let (tx, _) = broadcast::channel(capacity);
        (Arc::new(Self { tx: tx.clone() }), tx)
    }
}

impl Navigator for BroadcastNavigator {
    fn navigate_to(&self, route: &str) {
        debug!(route, "Navigation requested");
        let _ = self.tx.send(route.to_string());
    }
}

// ── Router ──────────────────────────────────────────────────────────

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub session: ChatSession,
    /// Route-change fan-out fed by [`BroadcastNavigator`].
    pub nav_tx: broadcast::Sender<String>,
    /// Content generator for the assist endpoints (None if unconfigured).
    pub generator: Option<Arc<dyn ContentGenerator>>,
}

/// Build the Axum router with the chat WebSocket and REST routes.
pub fn chat_routes(
    session: ChatSession,
    nav_tx: broadcast::Sender<String>,
    generator: Option<Arc<dyn ContentGenerator>>,
) -> Router {
    let state = AppState {
        session,
        nav_tx,
        generator,
    };

    Router::new()
        .route("/ws/chat", get(ws_handler))
        .route("/health", get(health))
        .route("/api/chat/history", get(history))
        .route("/api/chat/message", post(submit_message))
        .route("/api/chat/quick-action", post(quick_action))
        .route("/api/chat/quick-actions", get(quick_action_menu))
        .route("/api/chat/tour/start", post(tour_start))
        .route("/api/chat/tour/advance", post(tour_advance))
        .route("/api/chat/tour/end", post(tour_end))
        .route("/api/chat/clear", post(clear))
        .route("/api/chat/toggle", post(toggle))
        .route("/api/assist/suggest", post(assist_suggest))
        .route("/api/assist/enhance", post(assist_enhance))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Health ──────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "guide-assist"
    }))
}

// ── WebSocket ───────────────────────────────────────────────────────

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    info!("Chat client connecting");
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    info!("Chat client connected");

    let mut events = state.session.subscribe();
    let mut navs = state.nav_tx.subscribe();

    // Full state sync on connect.
    if send_frame(&mut socket, &sync_frame(&state.session).await)
        .await
        .is_err()
    {
        warn!("Failed to send initial sync, client disconnected");
        return;
    }

    loop {
        tokio::select! {
            // Forward session events to this client.
            result = events.recv() => {
                match result {
                    Ok(event) => {
                        if send_frame(&mut socket, &ServerFrame::from(event)).await.is_err() {
                            debug!("Client disconnected during send");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(missed = n, "WS client lagged behind broadcast");
                        // Re-sync with the full session state.
                        if send_frame(&mut socket, &sync_frame(&state.session).await).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Session event channel closed");
                        break;
                    }
                }
            }

            // Forward navigation side effects.
            result = navs.recv() => {
                match result {
                    Ok(route) => {
                        if send_frame(&mut socket, &ServerFrame::Navigate { route }).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(missed = n, "WS client missed navigation events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            // Receive frames from the client.
            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_frame(&text, &state.session).await;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Chat client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    info!("Chat connection closed");
}

async fn sync_frame(session: &ChatSession) -> ServerFrame {
    let snapshot = session.snapshot().await;
    ServerFrame::Sync {
        messages: snapshot.messages,
        is_tour_active: snapshot.is_tour_active,
        current_tour_step: snapshot.current_tour_step,
    }
}

async fn send_frame(socket: &mut WebSocket, frame: &ServerFrame) -> Result<(), axum::Error> {
    match serde_json::to_string(frame) {
        Ok(json) => socket.send(Message::Text(json.into())).await,
        Err(e) => {
            warn!(error = %e, "Failed to serialize server frame");
            Ok(())
        }
    }
}

async fn handle_client_frame(text: &str, session: &ChatSession) {
    match serde_json::from_str::<ClientFrame>(text) {
        Ok(ClientFrame::Message { content }) => session.submit_user_message(&content).await,
        Ok(ClientFrame::QuickAction { action_id }) => {
            session.execute_quick_action_id(&action_id).await;
        }
        Ok(ClientFrame::TourAdvance) => session.advance_tour().await,
        Ok(ClientFrame::TourEnd) => session.end_tour().await,
        Ok(ClientFrame::Clear) => session.clear().await,
        Ok(ClientFrame::Toggle) => session.toggle().await,
        Err(e) => debug!(error = %e, "Ignoring malformed client frame"),
    }
}

// ── REST: chat ──────────────────────────────────────────────────────

async fn history(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.session.snapshot().await)
}

#[derive(Debug, Deserialize)]
struct SubmitMessageRequest {
    content: String,
}

async fn submit_message(
    State(state): State<AppState>,
    Json(req): Json<SubmitMessageRequest>,
) -> impl IntoResponse {
    state.session.submit_user_message(&req.content).await;
    StatusCode::ACCEPTED
}

#[derive(Debug, Deserialize)]
struct QuickActionRequest {
    action_id: String,
}

async fn quick_action(
    State(state): State<AppState>,
    Json(req): Json<QuickActionRequest>,
) -> impl IntoResponse {
    state.session.execute_quick_action_id(&req.action_id).await;
    StatusCode::ACCEPTED
}

/// Quick-action menu entry for UI rendering.
#[derive(Debug, Clone, Serialize)]
struct QuickActionItem {
    id: &'static str,
    label: &'static str,
    icon: &'static str,
    action: &'static str,
}

async fn quick_action_menu() -> impl IntoResponse {
    Json(vec![
        QuickActionItem {
            id: "tour",
            label: "Take a Tour",
            icon: "🚀",
            action: "start_tour",
        },
        QuickActionItem {
            id: "help",
            label: "Help with Navigation",
            icon: "🧭",
            action: "help_navigation",
        },
        QuickActionItem {
            id: "question",
            label: "Ask a Question",
            icon: "❓",
            action: "ask_question",
        },
    ])
}

async fn tour_start(State(state): State<AppState>) -> impl IntoResponse {
    state.session.start_tour().await;
    StatusCode::ACCEPTED
}

async fn tour_advance(State(state): State<AppState>) -> impl IntoResponse {
    state.session.advance_tour().await;
    StatusCode::ACCEPTED
}

async fn tour_end(State(state): State<AppState>) -> impl IntoResponse {
    state.session.end_tour().await;
    StatusCode::ACCEPTED
}

async fn clear(State(state): State<AppState>) -> impl IntoResponse {
    state.session.clear().await;
    StatusCode::ACCEPTED
}

async fn toggle(State(state): State<AppState>) -> impl IntoResponse {
    state.session.toggle().await;
    StatusCode::ACCEPTED
}

// ── REST: content assistance ────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SuggestRequest {
    topic: String,
}

async fn assist_suggest(
    State(state): State<AppState>,
    Json(req): Json<SuggestRequest>,
) -> Result<Json<ContentSuggestion>, StatusCode> {
    let Some(generator) = &state.generator else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };
    Ok(Json(generator.generate_suggestion(&req.topic).await))
}

#[derive(Debug, Deserialize)]
struct EnhanceRequest {
    content: String,
}

#[derive(Debug, Serialize)]
struct EnhanceResponse {
    content: String,
}

async fn assist_enhance(
    State(state): State<AppState>,
    Json(req): Json<EnhanceRequest>,
) -> Result<Json<EnhanceResponse>, StatusCode> {
    let Some(generator) = &state.generator else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };
    let content = generator.enhance_content(&req.content).await;
    Ok(Json(EnhanceResponse { content }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_frames_deserialize() {
        let frame: ClientFrame =
            serde_json::from_str(r#"{"type":"message","content":"hi"}"#).unwrap();
        assert!(matches!(frame, ClientFrame::Message { content } if content == "hi"));

        let frame: ClientFrame =
            serde_json::from_str(r#"{"type":"quick_action","action_id":"start_tour"}"#).unwrap();
        assert!(matches!(frame, ClientFrame::QuickAction { .. }));

        let frame: ClientFrame = serde_json::from_str(r#"{"type":"tour_advance"}"#).unwrap();
        assert!(matches!(frame, ClientFrame::TourAdvance));
    }

    #[test]
    fn server_frames_are_tagged() {
        let json = serde_json::to_string(&ServerFrame::Navigate {
            route: "/create".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"navigate","route":"/create"}"#);

        let json = serde_json::to_string(&ServerFrame::TourState {
            active: true,
            step: 1,
        })
        .unwrap();
        assert!(json.contains("\"type\":\"tour_state\""));
    }

    #[test]
    fn session_event_maps_to_frame() {
        let frame = ServerFrame::from(SessionEvent::Cleared);
        assert!(matches!(frame, ServerFrame::Cleared));

        let frame = ServerFrame::from(SessionEvent::Visibility { open: true });
        assert!(matches!(frame, ServerFrame::Visibility { open: true }));
    }
}
