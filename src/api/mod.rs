//! HTTP surface: `/ask`, user CRUD under `/users`, and health checks.

mod error;

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::compose::Composer;
use crate::lang::Lang;
use crate::users::{User, UserInput, UserStore};
pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub composer: Arc<Composer>,
    pub users: UserStore,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/db", get(health_db))
        .route("/ask", get(ask))
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(read_user).put(update_user).delete(delete_user),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Success body shared by the user endpoints.
#[derive(Serialize)]
struct Envelope<T> {
    status: &'static str,
    message: &'static str,
    code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_row_id: Option<i64>,
    data: T,
}

fn success<T: Serialize>(code: StatusCode, message: &'static str, data: T) -> Response {
    envelope(code, message, None, data)
}

fn envelope<T: Serialize>(
    code: StatusCode,
    message: &'static str,
    last_row_id: Option<i64>,
    data: T,
) -> Response {
    let body = Envelope {
        status: "success",
        message,
        code: code.as_u16(),
        last_row_id,
        data,
    };
    (code, Json(body)).into_response()
}

async fn health() -> &'static str {
    "ok"
}

async fn health_db(State(state): State<AppState>) -> Result<Response, ApiError> {
    let version = state.users.server_version().await?;
    Ok(Json(json!({
        "message": format!("Connected to database server version {version}")
    }))
    .into_response())
}

#[derive(Debug, Deserialize)]
struct AskParams {
    q: Option<String>,
    ln: Option<String>,
    name: Option<String>,
}

async fn ask(
    State(state): State<AppState>,
    params: Result<Query<AskParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::InvalidInput(e.body_text()))?;

    // Blank questions are refused, but the question is passed on as sent.
    let question = params.q.as_deref().unwrap_or_default();
    if question.trim().is_empty() {
        return Err(ApiError::InvalidInput(
            "query parameter 'q' must not be empty".into(),
        ));
    }
    let lang: Lang = params
        .ln
        .as_deref()
        .ok_or_else(|| ApiError::InvalidInput("query parameter 'ln' is required".into()))?
        .parse()?;

    info!(%lang, "ask");
    let answer = state
        .composer
        .compose(question, params.name.as_deref(), lang)
        .await;
    Ok(Json(answer).into_response())
}

fn user_input(body: Result<Json<UserInput>, JsonRejection>) -> Result<UserInput, ApiError> {
    let Json(input) = body.map_err(|e| ApiError::InvalidInput(e.body_text()))?;
    input.validate()?;
    Ok(input)
}

fn user_id(id: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    id.map(|Path(id)| id)
        .map_err(|e| ApiError::InvalidInput(e.body_text()))
}

async fn create_user(
    State(state): State<AppState>,
    body: Result<Json<UserInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    let input = user_input(body)?;
    let user = state.users.create(&input).await?;
    info!(id = user.id, "user created");
    Ok(envelope(
        StatusCode::CREATED,
        "User inserted successfully",
        Some(user.id),
        user,
    ))
}

async fn list_users(State(state): State<AppState>) -> Result<Response, ApiError> {
    let users: Vec<User> = state.users.list().await?;
    Ok(success(StatusCode::OK, "User list fetch successfully", users))
}

async fn read_user(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Response, ApiError> {
    let user = state
        .users
        .get(user_id(id)?)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(success(StatusCode::OK, "User fetched successfully", user))
}

async fn update_user(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<UserInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    let id = user_id(id)?;
    let input = user_input(body)?;
    let user = state
        .users
        .update(id, &input)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(success(StatusCode::OK, "User updated successfully", user))
}

async fn delete_user(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Response, ApiError> {
    let user = state
        .users
        .delete(user_id(id)?)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    info!(id = user.id, "user deleted");
    Ok(success(StatusCode::OK, "User deleted successfully", user))
}
