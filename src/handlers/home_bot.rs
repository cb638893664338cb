// src/handlers/home_bot.rs

use axum::{extract::State, Json};
use validator::Validate;

use crate::{
    common::{error::AppError, extract::ApiJson},
    config::AppState,
    models::home_bot::{AskLifecyclePayload, LifecycleAnswer},
};

#[utoipa::path(
    post,
    path = "/v1/home-bot/ask-lifecycle-question",
    tag = "Home Bot",
    request_body = AskLifecyclePayload,
    responses(
        (status = 200, description = "Answer from the closest lifespan record", body = LifecycleAnswer),
        (status = 500, description = "The lifespan index is unavailable")
    ),
    security(("api_jwt" = []))
)]
pub async fn ask_lifecycle_question(
    State(app_state): State<AppState>,
    ApiJson(payload): ApiJson<AskLifecyclePayload>,
) -> Result<Json<LifecycleAnswer>, AppError> {
    payload.validate()?;

    let question = payload.question.unwrap_or_default();
    let age = payload.appliance_age.unwrap_or_default();
    Ok(Json(app_state.home_bot_service.ask(question.trim(), age)?))
}
