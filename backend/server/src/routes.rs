use std::sync::Arc;

use axum::{
    Form, Json,
    body::Bytes,
    extract::{Path, Query, State, rejection::FormRejection},
    http::HeaderMap,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    dashboards::{
        dashboard_url, delete_dashboard, list_dashboards, publish_dashboard, read_dashboard,
        resolve_dashboard_location,
    },
    error::AppError,
    paths::studio_url,
    state::AppState,
    users::UserRecord,
    utils::{get_publish_request, non_empty},
};

#[derive(Deserialize)]
pub struct UserForm {
    user: Option<String>,
}

#[derive(Deserialize)]
pub struct DashboardParams {
    user: Option<String>,
    name: Option<String>,
}

#[derive(Deserialize)]
pub struct StudioParams {
    hub: Option<String>,
    language: Option<String>,
}

pub async fn routes_handler() -> Json<Value> {
    Json(route_table())
}

pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn add_user_handler(
    State(state): State<Arc<AppState>>,
    form: Result<Form<UserForm>, FormRejection>,
) -> Result<Json<UserRecord>, AppError> {
    let Form(form) = form?;
    let user = non_empty(form.user.as_deref()).ok_or(AppError::MissingField {
        route: "/add_user",
        fields: vec!["user"],
    })?;

    Ok(Json(state.users.add_user(user).await?))
}

pub async fn list_user_dashboards_handler(
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(list_dashboards(&state, &user).await?))
}

pub async fn add_dashboard_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<String, AppError> {
    let request = get_publish_request("/add_dashboard", &headers, body)?;

    publish_dashboard(
        &state,
        request.user.as_deref(),
        &request.name,
        &request.dashboard,
        request.studio_secret.as_deref(),
    )
    .await
}

pub async fn get_dashboard_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DashboardParams>,
) -> Result<String, AppError> {
    resolve_dashboard_location(
        &state,
        params.user.as_deref(),
        params.name.as_deref(),
        "/get_dashboard",
    )
    .await
}

pub async fn get_dashboard_url_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DashboardParams>,
) -> Result<String, AppError> {
    dashboard_url(
        &state,
        params.user.as_deref(),
        params.name.as_deref(),
        "/get_dashboard_url",
    )
    .await
}

pub async fn get_dashboard_content_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DashboardParams>,
) -> Result<Json<Value>, AppError> {
    let document = read_dashboard(
        &state,
        params.user.as_deref(),
        params.name.as_deref(),
        "/get_dashboard_content",
    )
    .await?;

    Ok(Json(document))
}

pub async fn delete_dashboard_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Form<DashboardParams>, FormRejection>,
) -> Result<String, AppError> {
    let Form(params) = params?;

    delete_dashboard(
        &state,
        params.user.as_deref(),
        params.name.as_deref(),
        "/delete_dashboard",
    )
    .await
}

pub async fn get_studio_url_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StudioParams>,
) -> String {
    studio_url(
        &state.config.studio_base_url,
        params.hub.as_deref(),
        params.language.as_deref(),
    )
}

fn route_table() -> Value {
    json!({
        "/, /routes": {
            "method": "GET",
            "parameters": [],
            "side effects": "None",
            "returns": "Dictionary of routes as a JSON object",
            "errors": "None"
        },
        "/health": {
            "method": "GET",
            "parameters": [],
            "side effects": "None",
            "returns": "Server status and version as a JSON object",
            "errors": "None"
        },
        "/add_user": {
            "method": "POST",
            "parameter-passing": "form",
            "parameters": ["user"],
            "side effects": "Adds the user to the database with the next user count",
            "returns": "User name and count as a JSON object",
            "errors": "400 if the user exists"
        },
        "/list_user_dashboards/<user>": {
            "method": "GET",
            "parameters": [],
            "side effects": "None",
            "returns": "JSON list of the dashboards published by the user, or anonymously if the user is unknown",
            "errors": "None"
        },
        "/add_dashboard": {
            "method": "POST",
            "parameter-passing": "JSON body",
            "parameters": ["user", "name", "dashboard", "studio_secret"],
            "side effects": "Stores the dashboard in the user's folder under name, overwriting any existing dashboard. Adds the user if studio_secret is correct and the user is not registered",
            "returns": "The URL of the dashboard",
            "errors": "400 if the body is not JSON or name or dashboard is missing"
        },
        "/get_dashboard": {
            "method": "GET",
            "parameters": ["user", "name"],
            "side effects": "None",
            "returns": "The storage path of the dashboard",
            "errors": "400 if name is missing"
        },
        "/get_dashboard_url": {
            "method": "GET",
            "parameters": ["user", "name"],
            "side effects": "None",
            "returns": "The URL of the dashboard as a string",
            "errors": "400 if name is missing"
        },
        "/get_dashboard_content": {
            "method": "GET",
            "parameters": ["user", "name"],
            "side effects": "None",
            "returns": "The dashboard as JSON",
            "errors": "400 if name is missing or the dashboard doesn't exist"
        },
        "/delete_dashboard": {
            "method": "POST",
            "parameter-passing": "form",
            "parameters": ["user", "name"],
            "side effects": "Deletes the dashboard from the user's folder",
            "returns": "The name of the deleted dashboard",
            "errors": "400 if the user doesn't exist or the dashboard doesn't exist"
        },
        "/get_studio_url": {
            "method": "GET",
            "parameters": ["hub", "language"],
            "side effects": "None",
            "returns": "The URL of the studio for the hub and language",
            "errors": "None"
        }
    })
}
