//! Session check for protected routes.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use super::AppState;

/// Token of the session that made the request, inserted by [`require_session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionToken(pub Uuid);

/// Reject requests without a bearer token issued by a successful login.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(header) = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
    else {
        tracing::warn!("Missing Authorization header");
        return Err(StatusCode::UNAUTHORIZED);
    };

    let Some(token) = parse_bearer(header) else {
        tracing::warn!("Invalid Authorization header format");
        return Err(StatusCode::UNAUTHORIZED);
    };

    if !state.sessions.is_valid(&token) {
        tracing::warn!("Unknown or expired session token");
        return Err(StatusCode::UNAUTHORIZED);
    }

    request.extensions_mut().insert(SessionToken(token));
    Ok(next.run(request).await)
}

/// Extract the bearer token from a header value, if well-formed.
pub fn parse_bearer(header: &str) -> Option<Uuid> {
    header
        .strip_prefix("Bearer ")
        .and_then(|t| Uuid::parse_str(t.trim()).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bearer_tokens() {
        let token = Uuid::new_v4();
        assert_eq!(parse_bearer(&format!("Bearer {}", token)), Some(token));
    }

    #[test]
    fn rejects_other_schemes_and_garbage() {
        assert_eq!(parse_bearer("Basic dXNlcjpwYXNz"), None);
        assert_eq!(parse_bearer("Bearer not-a-uuid"), None);
        assert_eq!(parse_bearer(""), None);
    }
}
