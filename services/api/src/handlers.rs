//! Axum Handlers for the REST API
//!
//! Lesson metadata and the credential dialog. It uses `utoipa` doc comments
//! to generate OpenAPI documentation.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use island_core::credential::{Credential, Provider};
use std::sync::Arc;
use tracing::error;

use crate::{
    models::{CredentialStatus, ErrorResponse, LessonInfo, UpdateCredentialPayload},
    state::AppState,
};

pub enum ApiError {
    BadRequest(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

/// Describe the lesson: title, facilitator, participants and phases.
#[utoipa::path(
    get,
    path = "/lesson",
    responses(
        (status = 200, description = "Lesson details", body = LessonInfo)
    )
)]
pub async fn get_lesson(State(state): State<Arc<AppState>>) -> Json<LessonInfo> {
    Json(LessonInfo::from(&state.roster))
}

/// Report whether an AI credential is configured.
#[utoipa::path(
    get,
    path = "/credential",
    responses(
        (status = 200, description = "Credential status", body = CredentialStatus)
    )
)]
pub async fn get_credential(State(state): State<Arc<AppState>>) -> Json<CredentialStatus> {
    let provider = state.credential_provider().await;
    Json(CredentialStatus {
        configured: provider.is_some(),
        provider: provider.map(|p| p.as_str().to_string()),
    })
}

/// Store a new AI credential. Running lessons switch to it on their next reply.
#[utoipa::path(
    put,
    path = "/credential",
    request_body = UpdateCredentialPayload,
    responses(
        (status = 204, description = "Credential saved"),
        (status = 400, description = "Unknown provider or malformed key", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn update_credential(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UpdateCredentialPayload>,
) -> Result<StatusCode, ApiError> {
    let credential = payload
        .provider
        .parse::<Provider>()
        .and_then(|provider| Credential::new(provider, &payload.api_key))
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    state.replace_credential(credential).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::{config::Config, router::create_router, state::AppState};
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use island_core::{
        credential::{CredentialStore, MemoryCredentialStore, Provider},
        llm_client::CompletionSettings,
        response_bank::ResponseBank,
    };
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(store: Arc<MemoryCredentialStore>) -> Router {
        let state = AppState::new(
            Config::for_tests(),
            ResponseBank::desert_island(),
            CompletionSettings::default(),
            store,
        )
        .unwrap();
        create_router(Arc::new(state))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn put_credential(body: Value) -> Request<Body> {
        Request::builder()
            .method("PUT")
            .uri("/credential")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_lesson() {
        let response = app(Arc::new(MemoryCredentialStore::new()))
            .oneshot(Request::builder().uri("/lesson").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["title"], "Desert Island Adventure");
        assert_eq!(body["facilitator"]["name"], "Ms. Adventure");
        assert_eq!(body["participants"].as_array().map(Vec::len), Some(6));
    }

    #[tokio::test]
    async fn test_credential_starts_unconfigured() {
        let response = app(Arc::new(MemoryCredentialStore::new()))
            .oneshot(Request::builder().uri("/credential").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"configured": false, "provider": null})
        );
    }

    #[tokio::test]
    async fn test_put_credential_saves_and_reports_provider() {
        let store = Arc::new(MemoryCredentialStore::new());
        let app = app(store.clone());

        let response = app
            .clone()
            .oneshot(put_credential(json!({"provider": "gemini", "api_key": " AIzaSecret "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let saved = store.load().unwrap().unwrap();
        assert_eq!(saved.provider(), Provider::Gemini);
        assert_eq!(saved.api_key(), "AIzaSecret");

        let response = app
            .oneshot(Request::builder().uri("/credential").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body, json!({"configured": true, "provider": "gemini"}));
        assert!(!body.to_string().contains("AIzaSecret"));
    }

    #[tokio::test]
    async fn test_put_credential_rejects_wrong_prefix() {
        let store = Arc::new(MemoryCredentialStore::new());
        let response = app(store.clone())
            .oneshot(put_credential(json!({"provider": "openai", "api_key": "AIzaNope"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(
            body["message"],
            "Invalid API key format. openai keys start with \"sk-\""
        );
        assert!(store.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_credential_rejects_unknown_provider() {
        let response = app(Arc::new(MemoryCredentialStore::new()))
            .oneshot(put_credential(json!({"provider": "acme", "api_key": "sk-1"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
