use crate::error::ApiError;
use application::UserApp;
use axum::{
    body::{to_bytes, Body},
    extract::{rejection::JsonRejection, Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use domain::{User, UserId, UserPatch};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::debug;

#[derive(Clone)]
pub struct AppState {
    pub user_app: Arc<UserApp>,
}

/// Body of create and full update. Any `id` in the body is ignored.
#[derive(Debug, Deserialize)]
pub struct UserRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl From<UserRequest> for User {
    fn from(request: UserRequest) -> Self {
        User::new(request.name, request.email)
    }
}

/// Body of a partial update. Keys other than `name` and `email` are rejected.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatchUserRequest {
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub email: Option<Value>,
}

// Keeps an explicit `null` distinguishable from a missing key.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

fn patch_value(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

impl From<PatchUserRequest> for UserPatch {
    fn from(request: PatchUserRequest) -> Self {
        UserPatch {
            name: request.name.map(patch_value),
            email: request.email.map(patch_value),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id().map(|id| id.to_string()),
            name: user.name().map(str::to_string),
            email: user.email().map(str::to_string),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub email: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/users", get(list_users).post(create_user))
        .route(
            "/api/v1/users/:id",
            get(get_user)
                .put(update_user)
                .patch(patch_user)
                .delete(delete_user),
        )
        .route("/health", get(health_check))
        .layer(middleware::from_fn(log_request_response))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Logs method, uri and body of every request, then status and body of its
/// response. Both bodies are buffered and handed on unchanged.
async fn log_request_response(request: Request, next: Next) -> Result<Response, StatusCode> {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?;
    debug!("REQUEST {} {}: {}", method, uri, describe_body(&bytes));

    let response = next.run(Request::from_parts(parts, Body::from(bytes))).await;

    let (parts, body) = response.into_parts();
    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    debug!(
        "RESPONSE for {} {}: STATUS={}, {}",
        method,
        uri,
        parts.status.as_u16(),
        describe_body(&bytes)
    );
    Ok(Response::from_parts(parts, Body::from(bytes)))
}

fn describe_body(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        "EMPTY BODY".to_string()
    } else {
        format!("BODY={}", String::from_utf8_lossy(bytes))
    }
}

fn parse_id(raw: &str) -> Result<UserId, ApiError> {
    Ok(raw.parse::<UserId>()?)
}

// Handler functions
async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let id = parse_id(&id)?;
    let user = state.user_app.user_service.get_user_by_id(id).await?;
    Ok(Json(user.into()))
}

async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let service = &state.user_app.user_service;

    let users = match query.email.filter(|email| !email.trim().is_empty()) {
        Some(email) => vec![service.get_user_by_email(&email).await?],
        None => service.get_all_users().await?,
    };
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<Option<UserRequest>>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let user = state
        .user_app
        .user_service
        .create_user(payload.map(Into::into))
        .await?;

    debug!("Created user {:?}", user.id());
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Option<UserRequest>>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let id = parse_id(&id)?;
    let Json(payload) = payload?;
    let user = state
        .user_app
        .user_service
        .update_user(id, payload.map(Into::into))
        .await?;
    Ok(Json(user.into()))
}

async fn patch_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Option<PatchUserRequest>>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let id = parse_id(&id)?;
    let Json(payload) = payload?;
    let user = state
        .user_app
        .user_service
        .patch_user(id, payload.map(Into::into))
        .await?;
    Ok(Json(user.into()))
}

async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    state.user_app.user_service.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
