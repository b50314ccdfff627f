mod registry;
mod sweeper;

pub use registry::{Participant, Registry};
pub use sweeper::Sweeper;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router, debug_handler};
use serde::Deserialize;

use crate::chat::{EVERYONE, MessageKind, MessageLog};
use crate::session::Requester;
use crate::{AppResult, AppState, Error};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/participants", get(list_participants).post(join))
        .route("/status", post(heartbeat))
}

#[derive(Deserialize)]
struct JoinBody {
    name: String,
}

#[debug_handler(state = AppState)]
async fn join(
    State(registry): State<Arc<Registry>>,
    State(log): State<Arc<MessageLog>>,
    Json(JoinBody { name }): Json<JoinBody>,
) -> AppResult<Response> {
    let participant = registry.join(&name).await?;
    // the join already stands; a lost notice must not fail it
    if let Err(err) = log.post(&name, EVERYONE, "joined", MessageKind::Status).await {
        tracing::warn!(%name, %err, "join notice dropped");
    }
    Ok((StatusCode::CREATED, Json(participant)).into_response())
}

#[debug_handler(state = AppState)]
async fn heartbeat(
    State(registry): State<Arc<Registry>>,
    Requester(name): Requester,
) -> AppResult<Json<Participant>> {
    let name = name.ok_or(Error::NotFound)?;
    Ok(Json(registry.heartbeat(&name).await?))
}

#[debug_handler(state = AppState)]
async fn list_participants(
    State(registry): State<Arc<Registry>>,
) -> AppResult<Json<Vec<Participant>>> {
    Ok(Json(registry.list().await?))
}
