use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::context::ActorContext;

/// Header carrying the validated actor identity, set by the upstream auth
/// gateway. Authentication itself is out of scope here; this boundary only
/// requires that an identity arrived.
pub const ACTOR_HEADER: &str = "x-actor-id";

pub async fn actor_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let actor_id = extract_actor(req.headers())?;

    req.extensions_mut().insert(ActorContext::new(actor_id));

    Ok(next.run(req).await)
}

fn extract_actor(headers: &HeaderMap) -> Result<stockroom_core::ActorId, StatusCode> {
    let header = headers
        .get(ACTOR_HEADER)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    header.trim().parse().map_err(|_| StatusCode::UNAUTHORIZED)
}
