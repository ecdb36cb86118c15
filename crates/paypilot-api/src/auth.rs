//! Bearer-token authentication.
//!
//! The token lives in `<data_dir>/api_token`. It is generated on first start
//! and shared with the messaging gateway out of band.

use std::path::Path;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use paypilot_core::PayPilotError;
use rand::Rng;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::state::AppState;

pub const TOKEN_FILE: &str = "api_token";

/// Random 32-character hex token.
pub fn generate_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    hex::encode(bytes)
}

/// Read the token at `path`, creating one (mode 0600) if the file is
/// missing or blank.
pub fn load_or_generate_token(path: &Path) -> Result<String, PayPilotError> {
    if let Ok(contents) = std::fs::read_to_string(path) {
        let token = contents.trim();
        if !token.is_empty() {
            info!(path = %path.display(), "API token loaded");
            return Ok(token.to_string());
        }
    }

    let token = generate_token();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, &token)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)) {
            warn!(error = %e, path = %path.display(), "Could not restrict API token permissions");
        }
    }
    info!(path = %path.display(), "API token generated");
    Ok(token)
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;
    let value = value
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Invalid Authorization header encoding".to_string()))?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or_else(|| ApiError::Unauthorized("Expected a bearer token".to_string()))
}

// Length is not secret; the contents are compared without early exit.
fn tokens_match(given: &str, expected: &str) -> bool {
    given.len() == expected.len()
        && given
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

/// Middleware rejecting requests without the configured bearer token.
pub async fn require_auth(State(state): State<AppState>, req: Request, next: Next) -> Response {
    match bearer_token(req.headers()) {
        Ok(token) if tokens_match(token, &state.api_token) => next.run(req).await,
        Ok(_) => ApiError::Unauthorized("Invalid bearer token".to_string()).into_response(),
        Err(e) => e.into_response(),
    }
}
