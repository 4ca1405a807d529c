//! Webhook endpoints, one per conversational stage:
//!
//! - `POST /voice`          — call opened, greet and ask for the name
//! - `POST /take_name`      — name captured, invite the first order
//! - `POST /take_order`     — utterance → extraction → catalog check
//! - `POST /confirm_item`   — yes/no on the pending line
//! - `POST /confirm_order`  — final yes/no on the whole order
//! - `GET  /`               — static acknowledgement
//!
//! Every stage endpoint shares one handler: the engine derives the true
//! stage from the session, so a retried or misrouted webhook can never
//! skip a stage or corrupt state — it just replays as a re-ask.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use storeline_core::{CallId, DialogueEngine, TurnContext};
use storeline_sessions::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<DialogueEngine>,
    pub sessions: Arc<SessionStore>,
}

#[derive(Debug, Deserialize)]
pub struct TurnRequest {
    pub call_id: String,
    #[serde(default)]
    pub utterance: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct TurnResponse {
    pub spoken_prompt: String,
    pub await_next_utterance: bool,
    pub terminate_call: bool,
}

#[derive(Debug, Serialize)]
pub struct Acknowledgement {
    pub service: &'static str,
    pub status: &'static str,
    pub checked_at: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(acknowledge))
        .route("/voice", post(handle_turn))
        .route("/take_name", post(handle_turn))
        .route("/take_order", post(handle_turn))
        .route("/confirm_item", post(handle_turn))
        .route("/confirm_order", post(handle_turn))
        .with_state(state)
}

pub async fn acknowledge() -> Json<Acknowledgement> {
    Json(Acknowledgement {
        service: "storeline-server",
        status: "ok",
        checked_at: Utc::now().to_rfc3339(),
    })
}

pub async fn handle_turn(
    State(state): State<AppState>,
    Json(request): Json<TurnRequest>,
) -> Json<TurnResponse> {
    let ctx = TurnContext { correlation_id: Uuid::new_v4().to_string() };
    let call_id = CallId(request.call_id);
    let utterance = request.utterance.as_deref().unwrap_or("");

    let handle = state.sessions.get_or_create(&call_id);
    let mut session = handle.lock().await;
    session.touch();

    let reply = state.engine.advance(&mut session, utterance, &ctx).await;

    let terminal = session.is_terminal();
    drop(session);
    if terminal {
        state.sessions.remove(&call_id);
        info!(
            event_name = "server.session_closed",
            call_id = %call_id,
            correlation_id = %ctx.correlation_id,
            "call finalized, session removed"
        );
    }

    Json(TurnResponse {
        spoken_prompt: reply.spoken_prompt,
        await_next_utterance: reply.await_next_utterance,
        terminate_call: reply.terminate_call,
    })
}
