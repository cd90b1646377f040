//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API, WebSocket endpoint, and OpenAPI documentation.

use crate::{
    handlers,
    models::{
        ChatMessage, CredentialStatus, ErrorResponse, LessonInfo, LessonStatus, PhaseTransition,
        SenderInfo, UpdateCredentialPayload,
    },
    state::AppState,
    ws::ws_handler,
};

use axum::{Router, routing::get};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_lesson,
        handlers::get_credential,
        handlers::update_credential,
    ),
    components(
        schemas(LessonInfo, SenderInfo, LessonStatus, ChatMessage, PhaseTransition, CredentialStatus, UpdateCredentialPayload, ErrorResponse)
    ),
    tags(
        (name = "Island API", description = "Desert Island Adventure lesson chat; the live lesson runs over the /ws WebSocket")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/lesson", get(handlers::get_lesson))
        .route(
            "/credential",
            get(handlers::get_credential).put(handlers::update_credential),
        )
        .route("/ws", get(ws_handler))
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
