use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::{AppState, AuthConfig};

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PilotClaims {
    /// Pilot id.
    pub sub: String,
    pub exp: usize,
}

pub fn issue_token(auth: &AuthConfig, pilot_id: i64) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = PilotClaims {
        sub: pilot_id.to_string(),
        exp: (Utc::now() + Duration::seconds(auth.expiration as i64)).timestamp() as usize,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(auth.secret.as_bytes()))
}

// ============================================================================
// Pilot Authentication Middleware
// ============================================================================

/// Resolves the bearer token into a [`flightdeck_core::Pilot`] and stores it in
/// the request extensions for the handlers.
pub async fn pilot_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // 1. Extract token from Authorization header
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| AppError::AuthenticationError("Missing bearer token".to_string()))?;

    // 2. Decode and validate JWT
    let token_data = decode::<PilotClaims>(
        bearer.token(),
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthenticationError("Invalid token".to_string()))?;

    let pilot_id: i64 = token_data
        .claims
        .sub
        .parse()
        .map_err(|_| AppError::AuthenticationError("Invalid token subject".to_string()))?;

    // 3. Load the pilot with its authorized subfleets
    let pilot = state
        .pilots
        .find_pilot(pilot_id)
        .await
        .map_err(|e| AppError::ServiceUnavailable(e.to_string()))?
        .ok_or_else(|| AppError::AuthenticationError("Unknown pilot".to_string()))?;

    tracing::debug!(pilot_id = pilot.id, "Authenticated pilot");

    // 4. Inject pilot into request extensions
    req.extensions_mut().insert(pilot);

    Ok(next.run(req).await)
}
