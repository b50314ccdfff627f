pub mod chat;
pub mod clock;
pub mod config;
pub mod presence;
pub mod session;
pub mod store;

use std::sync::Arc;

use axum::Router;
use axum::extract::FromRef;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use chat::MessageLog;
use presence::Registry;
use store::StoreError;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub log: Arc<MessageLog>,
}

/// The full relay router with its transport middleware.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(presence::router())
        .merge(chat::router())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// What can go wrong inside the relay core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("name must be non-empty")]
    InvalidName,
    #[error("name is already taken")]
    DuplicateName,
    #[error("invalid message: {0}")]
    InvalidMessage(&'static str),
    #[error("no such entity")]
    NotFound,
    #[error("requester is not the author")]
    Unauthorized,
    /// Transient backing-store failure; retryable, unlike the rest.
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type AppResult<T> = Result<T, AppError>;

pub struct AppError(pub Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::InvalidName | Error::InvalidMessage(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::DuplicateName => StatusCode::CONFLICT,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::Store(err) => {
                tracing::error!(%err, "backing store unavailable");
                StatusCode::SERVICE_UNAVAILABLE
            }
        };
        (status, self.0.to_string()).into_response()
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}
