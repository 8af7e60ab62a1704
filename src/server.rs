//! Thin webhook glue between the transport adapter and the engine.
//!
//! One request = one unit of work: load the draft, hand it to the engine with
//! the decoded event, persist the result, return the reply. No retries, no
//! cross-request state beyond the session store.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use crate::draft::Draft;
use crate::engine::{ConversationEngine, Event, Reply};
use crate::session::SessionStore;

/// Wire shape of an inbound event, as normalized by the transport adapter.
#[derive(Debug, Deserialize)]
pub struct InboundEvent {
    pub conversation_id: String,
    pub kind: InboundKind,
    pub payload: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InboundKind {
    Text,
    Media,
    Selection,
}

impl InboundEvent {
    fn into_event(self) -> Event {
        match self.kind {
            InboundKind::Text => Event::Text(self.payload),
            InboundKind::Media => Event::Media(self.payload),
            InboundKind::Selection => Event::Selection(self.payload),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ConversationEngine>,
    pub store: Arc<dyn SessionStore>,
    pub session_ttl: Duration,
}

/// Build the webhook router.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(handle_event))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn handle_event(
    State(state): State<AppState>,
    Json(inbound): Json<InboundEvent>,
) -> Json<Reply> {
    let conversation_id = inbound.conversation_id.clone();

    let mut draft = match state.store.get(&conversation_id).await {
        Ok(Some(draft)) => draft,
        Ok(None) => Draft::default(),
        Err(e) => {
            // The fallback store already absorbed backend trouble; anything
            // left is a decode problem — start the conversation over.
            tracing::error!(error = %e, conversation_id, "failed to load draft; starting fresh");
            Draft::default()
        }
    };

    let reply = state.engine.handle(&mut draft, inbound.into_event()).await;

    if let Err(e) = state
        .store
        .set(&conversation_id, &draft, state.session_ttl)
        .await
    {
        tracing::error!(error = %e, conversation_id, "failed to persist draft");
    }

    Json(reply)
}

async fn health() -> &'static str {
    "ok"
}
