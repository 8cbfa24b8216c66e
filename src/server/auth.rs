use super::state::ServerState;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    response::IntoResponse,
};
use tracing::debug;

const BEARER_SCHEME: &str = "Bearer";

/// Proof that the request carried the configured bearer token.
#[derive(Debug)]
pub struct Authenticated;

#[derive(Debug, PartialEq, Eq)]
pub enum AuthRejection {
    MissingHeader,
    InvalidFormat,
    EmptyToken,
    InvalidToken,
}

impl AuthRejection {
    fn message(&self) -> &'static str {
        match self {
            AuthRejection::MissingHeader => "Unauthorized: Missing Authorization header",
            AuthRejection::InvalidFormat => "Unauthorized: Invalid Authorization format",
            AuthRejection::EmptyToken => "Unauthorized: Empty token",
            AuthRejection::InvalidToken => "Unauthorized: Invalid token",
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::UNAUTHORIZED, self.message()).into_response()
    }
}

fn check_bearer(headers: &HeaderMap, expected: &str) -> Result<(), AuthRejection> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthRejection::MissingHeader)?
        .to_str()
        .map_err(|_| AuthRejection::InvalidFormat)?;

    let token = match value.split_once(' ') {
        Some((BEARER_SCHEME, token)) => token,
        _ => return Err(AuthRejection::InvalidFormat),
    };
    if token.is_empty() {
        return Err(AuthRejection::EmptyToken);
    }
    if token != expected {
        return Err(AuthRejection::InvalidToken);
    }
    Ok(())
}

impl FromRequestParts<ServerState> for Authenticated {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = ctx.config.bearer_token.as_deref() else {
            return Ok(Authenticated);
        };
        check_bearer(&parts.headers, expected)
            .map(|_| Authenticated)
            .inspect_err(|rejection| debug!("Rejected request: {:?}", rejection))
    }
}
