//! Request logging middleware, also feeding the HTTP metrics.

use super::super::state::ServerState;
use crate::server::metrics::record_http_request;
use axum::extract::State;
use axum::{
    body::{Body, HttpBody},
    http::{header::AUTHORIZATION, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use byte_unit::Byte;
use std::time::Instant;
use tracing::{error, info};

/// How much of each exchange gets logged. Every level includes the ones
/// before it.
#[derive(PartialEq, PartialOrd, Clone, Debug, Default, clap::ValueEnum)]
pub enum RequestsLoggingLevel {
    None,
    #[default]
    Path,
    Headers,
    Body,
}

/// Larger response bodies are only logged by size.
const MAX_LOGGED_BODY_BYTES: u64 = 4 * 1024;

fn log_headers(title: &str, headers: &HeaderMap) {
    info!("  {}:", title);
    for (name, value) in headers.iter() {
        if name == AUTHORIZATION {
            info!("    {:?}: <redacted>", name);
        } else {
            info!("    {:?}: {:?}", name, value);
        }
    }
}

async fn log_response_body(response: Response) -> Response {
    let Some(size) = response.body().size_hint().exact() else {
        info!("  Resp Body: streamed, size unknown");
        return response;
    };
    if size > MAX_LOGGED_BODY_BYTES {
        info!("  Resp Body: {:#}, too big to log", Byte::from(size));
        return response;
    }

    let (parts, body) = response.into_parts();
    match axum::body::to_bytes(body, MAX_LOGGED_BODY_BYTES as usize).await {
        Ok(bytes) => {
            info!("  Resp Body:\n{}", String::from_utf8_lossy(&bytes));
            Response::from_parts(parts, Body::from(bytes))
        }
        Err(err) => {
            error!("Failed to read response body: {:?}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

pub async fn log_requests(
    State(state): State<ServerState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let level = state.config.requests_logging_level.clone();
    let start = Instant::now();

    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    if level > RequestsLoggingLevel::None {
        info!(">>> {} {}", method, request.uri());
    }
    if level >= RequestsLoggingLevel::Headers {
        log_headers("Req Headers", request.headers());
    }

    let mut response = next.run(request).await;

    if level >= RequestsLoggingLevel::Headers {
        log_headers("Resp Headers", response.headers());
    }
    if level >= RequestsLoggingLevel::Body {
        response = log_response_body(response).await;
    }

    let status = response.status().as_u16();
    let duration = start.elapsed();
    if level > RequestsLoggingLevel::None {
        info!("<<< {} ({}ms)", status, duration.as_millis());
    }

    // Path only, the query carries caller supplied targets
    record_http_request(&method, &path, status, duration);

    response
}
