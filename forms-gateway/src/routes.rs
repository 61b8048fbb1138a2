//! Axum route handlers for the forms API.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use forms_core::{CoreError, Form, FormDetail, Question, Slug};
use forms_engine::{Attributes, FormService, Payload};
use serde::Serialize;
use serde_json::Value;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    auth::{Authenticated, IdentityResolver},
    error::GatewayError,
};

// ── Shared state ─────────────────────────────────────────────────────────────

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Form lifecycle operations.
    pub forms: Arc<FormService>,
    /// Verifies request credentials.
    pub identity: Arc<dyn IdentityResolver>,
}

impl AppState {
    /// Bundle the service and identity resolver.
    #[must_use]
    pub fn new(forms: Arc<FormService>, identity: Arc<dyn IdentityResolver>) -> Self {
        Self { forms, identity }
    }
}

// ── Response types ────────────────────────────────────────────────────────────

/// Confirmation returned by `DELETE /forms/{slug}`.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: Slug,
    pub questions_removed: usize,
}

// ── Router ────────────────────────────────────────────────────────────────────

/// Build the application router with the given state.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/forms", get(list_forms).post(create_form))
        .route(
            "/forms/{slug}",
            get(show_form).put(update_form).patch(update_form).delete(destroy_form),
        )
        .route("/forms/{slug}/questions", post(create_question));

    Router::new()
        .nest("/api/v1", api)
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// `GET /health` — liveness check.
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"})))
}

/// `GET /api/v1/forms` — the caller's forms, without questions.
///
/// # Errors
/// 401 without valid credentials; 500 if the store fails.
pub async fn list_forms(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
) -> Result<Json<Vec<Form>>, GatewayError> {
    Ok(Json(state.forms.list(&principal).await?))
}

/// `GET /api/v1/forms/{slug}` — a visible form with its questions.
///
/// # Errors
/// 401 without valid credentials; 404 if the form is absent or disabled.
pub async fn show_form(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(slug): Path<String>,
) -> Result<Json<FormDetail>, GatewayError> {
    Ok(Json(state.forms.read(&principal, &Slug::new(slug)).await?))
}

/// `POST /api/v1/forms` — create a form owned by the caller.
///
/// Accepts a bare attribute object or one wrapped as `{"form": {...}}`.
///
/// # Errors
/// 401 without valid credentials; 400 for a malformed or invalid body.
pub async fn create_form(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    body: Result<Json<Attributes>, JsonRejection>,
) -> Result<Json<Form>, GatewayError> {
    let payload = payload_from(body, "form");
    Ok(Json(state.forms.create(&principal, payload).await?))
}

/// `PUT|PATCH /api/v1/forms/{slug}` — update a form the caller owns.
///
/// # Errors
/// 401 without valid credentials; 404 if absent; 403 if not the owner;
/// 400 for a malformed or invalid body. The body is only judged once the
/// form is known to exist and belong to the caller.
pub async fn update_form(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(slug): Path<String>,
    body: Result<Json<Attributes>, JsonRejection>,
) -> Result<Json<Form>, GatewayError> {
    let payload = payload_from(body, "form");
    Ok(Json(state.forms.update(&principal, &Slug::new(slug), payload).await?))
}

/// `DELETE /api/v1/forms/{slug}` — delete a form and its questions.
///
/// # Errors
/// 401 without valid credentials; 404 if absent; 403 if not the owner;
/// 500 if the cascade fails, in which case nothing was deleted.
pub async fn destroy_form(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(slug): Path<String>,
) -> Result<Json<DeleteResponse>, GatewayError> {
    let slug = Slug::new(slug);
    let questions_removed = state.forms.delete(&principal, &slug).await?;
    Ok(Json(DeleteResponse { deleted: slug, questions_removed }))
}

/// `POST /api/v1/forms/{slug}/questions` — append a question.
///
/// Accepts a bare attribute object or one wrapped as `{"question": {...}}`.
///
/// # Errors
/// 401 without valid credentials; 404 if absent; 403 if not the owner;
/// 400 for a malformed or invalid body.
pub async fn create_question(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(slug): Path<String>,
    body: Result<Json<Attributes>, JsonRejection>,
) -> Result<Json<Question>, GatewayError> {
    let payload = payload_from(body, "question");
    Ok(Json(state.forms.add_question(&principal, &Slug::new(slug), payload).await?))
}

// ── Body helpers ──────────────────────────────────────────────────────────────

/// Decode a JSON object body, unwrapping a single `{envelope: {...}}` key.
///
/// A rejected body is carried along rather than returned early; the service
/// decides when it matters.
fn payload_from(body: Result<Json<Attributes>, JsonRejection>, envelope: &str) -> Payload {
    let Json(mut map) = body.map_err(|e| CoreError::MalformedBody { reason: e.body_text() })?;
    if map.len() == 1 && matches!(map.get(envelope), Some(Value::Object(_))) {
        if let Some(Value::Object(inner)) = map.remove(envelope) {
            return Ok(inner);
        }
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use forms_core::PrincipalId;
    use forms_engine::{MemoryStore, RandomSlugProvider};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::auth::TokenRegistry;

    fn test_app() -> Router {
        let registry = TokenRegistry::new();
        registry.register(PrincipalId::new("alice"), "alice-token");
        registry.register(PrincipalId::new("bob"), "bob-token");
        let forms = FormService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(RandomSlugProvider::new()),
        );
        create_router(AppState::new(Arc::new(forms), Arc::new(registry)))
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = match app.clone().oneshot(req).await {
            Ok(r) => r,
            Err(e) => panic!("handler error: {e}"),
        };
        let status = resp.status();
        let bytes = match axum::body::to_bytes(resp.into_body(), 64 * 1024).await {
            Ok(b) => b,
            Err(e) => panic!("failed to read body: {e}"),
        };
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            match serde_json::from_slice(&bytes) {
                Ok(v) => v,
                Err(e) => panic!("invalid JSON: {e}"),
            }
        };
        (status, body)
    }

    fn request(method: &str, uri: &str, token: Option<&str>, body: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_owned())
            }
            None => Body::empty(),
        };
        match builder.body(body) {
            Ok(r) => r,
            Err(e) => panic!("failed to build request: {e}"),
        }
    }

    #[tokio::test]
    async fn health_response_format_returns_ok_with_status_field() {
        let (status, body) = send(&test_app(), request("GET", "/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn create_accepts_wrapped_and_bare_bodies() {
        let app = test_app();
        let wrapped = r#"{"form": {"title": "Wrapped"}}"#;
        let (status, body) =
            send(&app, request("POST", "/api/v1/forms", Some("alice-token"), Some(wrapped))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Wrapped");

        let bare = r#"{"title": "Bare"}"#;
        let (status, body) =
            send(&app, request("POST", "/api/v1/forms", Some("alice-token"), Some(bare))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Bare");
        assert_eq!(body["owner_id"], "alice");
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let (status, body) = send(
            &test_app(),
            request("POST", "/api/v1/forms", Some("alice-token"), Some("{not json")),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
        assert_eq!(body["field"], "body");
    }

    async fn alice_form(app: &Router) -> String {
        let (status, body) = send(
            app,
            request("POST", "/api/v1/forms", Some("alice-token"), Some(r#"{"title": "A"}"#)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        match body["slug"].as_str() {
            Some(s) => s.to_owned(),
            None => panic!("no slug in {body}"),
        }
    }

    #[tokio::test]
    async fn bodiless_update_by_non_owner_is_forbidden() {
        let app = test_app();
        let slug = alice_form(&app).await;
        let uri = format!("/api/v1/forms/{slug}");
        let (status, _) = send(&app, request("PUT", &uri, Some("bob-token"), None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = send(&app, request("PATCH", &uri, Some("bob-token"), Some("[]"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn bodiless_update_of_absent_form_is_not_found() {
        let (status, _) =
            send(&test_app(), request("PUT", "/api/v1/forms/missing", Some("bob-token"), None))
                .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn bodiless_update_by_owner_is_bad_request() {
        let app = test_app();
        let slug = alice_form(&app).await;
        let uri = format!("/api/v1/forms/{slug}");
        let (status, body) = send(&app, request("PUT", &uri, Some("alice-token"), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "body");
    }

    #[tokio::test]
    async fn bodiless_question_for_foreign_form_is_forbidden() {
        let app = test_app();
        let slug = alice_form(&app).await;
        let uri = format!("/api/v1/forms/{slug}/questions");
        let (status, _) = send(&app, request("POST", &uri, Some("bob-token"), None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn bodiless_question_for_absent_form_is_not_found() {
        let (status, _) = send(
            &test_app(),
            request("POST", "/api/v1/forms/missing/questions", Some("bob-token"), None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unauthenticated_create_is_rejected_before_body_checks() {
        let (status, _) =
            send(&test_app(), request("POST", "/api/v1/forms", None, Some("{not json"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn payload_from_unwraps_only_a_lone_envelope() {
        let Value::Object(wrapped) = json!({"form": {"title": "T"}}) else { panic!() };
        let inner = match payload_from(Ok(Json(wrapped)), "form") {
            Ok(m) => m,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert_eq!(inner.get("title"), Some(&json!("T")));

        let Value::Object(mixed) = json!({"form": {"title": "T"}, "title": "outer"}) else {
            panic!()
        };
        let kept = match payload_from(Ok(Json(mixed)), "form") {
            Ok(m) => m,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert_eq!(kept.len(), 2, "a non-lone envelope is left as a plain field");
    }

    #[test]
    fn delete_response_serialization_includes_all_fields() {
        let resp = DeleteResponse { deleted: Slug::new("abc"), questions_removed: 3 };
        let json = match serde_json::to_string(&resp) {
            Ok(s) => s,
            Err(e) => panic!("serialization failed: {e}"),
        };
        assert!(json.contains("\"deleted\":\"abc\""), "missing deleted field");
        assert!(json.contains("\"questions_removed\":3"), "missing questions_removed field");
    }
}
