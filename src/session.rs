//! Caller identity. The relay trusts a bare `User` header; there are no
//! accounts or sessions behind it.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

pub const USER_HEADER: &str = "User";

/// The participant name a request claims to act as, if any.
pub struct Requester(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for Requester {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Infallible> {
        let name = parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|name| !name.is_empty())
            .map(str::to_owned);
        Ok(Self(name))
    }
}
