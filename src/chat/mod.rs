mod log;
mod visibility;

pub use log::{EVERYONE, Message, MessageFields, MessageKind, MessageLog};
pub use visibility::visible;

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router, debug_handler};
use serde::Deserialize;
use uuid::Uuid;

use crate::presence::Registry;
use crate::session::Requester;
use crate::{AppResult, AppState, Error};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/messages", get(list_messages).post(post_message))
        .route("/messages/{id}", put(edit_message).delete(delete_message))
}

#[derive(Deserialize)]
struct PostBody {
    to: String,
    text: String,
    kind: MessageKind,
}

#[debug_handler(state = AppState)]
async fn post_message(
    State(registry): State<Arc<Registry>>,
    State(log): State<Arc<MessageLog>>,
    Requester(from): Requester,
    Json(PostBody { to, text, kind }): Json<PostBody>,
) -> AppResult<Response> {
    let from = from.ok_or(Error::InvalidMessage("missing User header"))?;
    if kind == MessageKind::Status {
        return Err(Error::InvalidMessage("status messages are system-generated").into());
    }
    if registry.find(&from).await?.is_none() {
        return Err(Error::InvalidMessage("sender is not an active participant").into());
    }
    let message = log.post(&from, &to, &text, kind).await?;
    Ok((StatusCode::CREATED, Json(message)).into_response())
}

#[derive(Deserialize)]
struct ListQuery {
    limit: Option<i64>,
}

/// Filter first, then tail-slice: with `limit=n` the response is the most
/// recent `n` visible messages, still oldest-first (no reversal).
#[debug_handler(state = AppState)]
async fn list_messages(
    State(log): State<Arc<MessageLog>>,
    Requester(requester): Requester,
    Query(ListQuery { limit }): Query<ListQuery>,
) -> AppResult<Json<Vec<Message>>> {
    let mut messages = visible(log.all().await?, requester.as_deref());
    if let Some(limit) = limit {
        let limit = usize::try_from(limit)
            .ok()
            .filter(|n| *n > 0)
            .ok_or(Error::InvalidMessage("limit must be a positive integer"))?;
        if messages.len() > limit {
            messages.drain(..messages.len() - limit);
        }
    }
    Ok(Json(messages))
}

#[debug_handler(state = AppState)]
async fn edit_message(
    State(log): State<Arc<MessageLog>>,
    Requester(requester): Requester,
    Path(id): Path<Uuid>,
    Json(fields): Json<MessageFields>,
) -> AppResult<Json<Message>> {
    let requester = requester.ok_or(Error::Unauthorized)?;
    if fields.kind == MessageKind::Status {
        return Err(Error::InvalidMessage("status messages are system-generated").into());
    }
    Ok(Json(log.edit(id, &requester, fields).await?))
}

#[debug_handler(state = AppState)]
async fn delete_message(
    State(log): State<Arc<MessageLog>>,
    Requester(requester): Requester,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let requester = requester.ok_or(Error::Unauthorized)?;
    log.delete(id, &requester).await?;
    Ok(StatusCode::OK.into_response())
}
