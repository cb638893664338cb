// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};

use crate::{common::error::AppError, config::AppState, models::auth::CurrentUser};

/// Route guard: validates the bearer token and stores the caller in the request extensions.
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = match request.headers().typed_get::<Authorization<Bearer>>() {
        Some(Authorization(bearer)) => bearer.token().to_owned(),
        // Present but not `Bearer <token>`
        None if request.headers().contains_key(AUTHORIZATION) => return Err(AppError::InvalidToken),
        None => return Err(AppError::MissingToken),
    };

    let claims = app_state.auth_service.validate_token(&token)?;
    request.extensions_mut().insert(CurrentUser::from(claims));

    Ok(next.run(request).await)
}

// Extractor for handlers behind `auth_guard`
pub struct AuthenticatedUser(pub CurrentUser);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .map(AuthenticatedUser)
            .ok_or(AppError::MissingToken)
    }
}
