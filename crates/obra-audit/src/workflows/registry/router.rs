use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde_json::json;

use super::domain::{NewSite, NewUser, SiteId, UserId};
use super::repository::{RepositoryError, SiteRepository, UserRepository};

pub(crate) struct RegistryState<S, U> {
    pub(crate) sites: Arc<S>,
    pub(crate) users: Arc<U>,
}

impl<S, U> Clone for RegistryState<S, U> {
    fn clone(&self) -> Self {
        Self {
            sites: self.sites.clone(),
            users: self.users.clone(),
        }
    }
}

/// Router exposing site and user registration.
pub fn registry_router<S, U>(sites: Arc<S>, users: Arc<U>) -> Router
where
    S: SiteRepository + 'static,
    U: UserRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/sites",
            get(list_sites_handler::<S, U>).post(create_site_handler::<S, U>),
        )
        .route(
            "/api/v1/users",
            get(list_users_handler::<S, U>).post(create_user_handler::<S, U>),
        )
        .route(
            "/api/v1/users/:user_id/sites/:site_id/toggle",
            post(toggle_site_handler::<S, U>),
        )
        .with_state(RegistryState { sites, users })
}

pub(crate) async fn list_sites_handler<S, U>(
    State(state): State<RegistryState<S, U>>,
) -> Response
where
    S: SiteRepository + 'static,
    U: UserRepository + 'static,
{
    match state.sites.list() {
        Ok(sites) => (StatusCode::OK, axum::Json(sites)).into_response(),
        Err(err) => repository_failure(err),
    }
}

pub(crate) async fn create_site_handler<S, U>(
    State(state): State<RegistryState<S, U>>,
    axum::Json(payload): axum::Json<NewSite>,
) -> Response
where
    S: SiteRepository + 'static,
    U: UserRepository + 'static,
{
    if payload.name.trim().is_empty() {
        return unprocessable("site name is required");
    }

    match state.sites.create(payload.into_site(Utc::now())) {
        Ok(site) => (StatusCode::CREATED, axum::Json(site)).into_response(),
        Err(err) => repository_failure(err),
    }
}

pub(crate) async fn list_users_handler<S, U>(
    State(state): State<RegistryState<S, U>>,
) -> Response
where
    S: SiteRepository + 'static,
    U: UserRepository + 'static,
{
    match state.users.list() {
        Ok(users) => (StatusCode::OK, axum::Json(users)).into_response(),
        Err(err) => repository_failure(err),
    }
}

pub(crate) async fn create_user_handler<S, U>(
    State(state): State<RegistryState<S, U>>,
    axum::Json(payload): axum::Json<NewUser>,
) -> Response
where
    S: SiteRepository + 'static,
    U: UserRepository + 'static,
{
    if payload.name.trim().is_empty() || !payload.email.contains('@') {
        return unprocessable("user name and a valid email are required");
    }

    match state.users.create(payload.into_user()) {
        Ok(user) => (StatusCode::CREATED, axum::Json(user)).into_response(),
        Err(err) => repository_failure(err),
    }
}

pub(crate) async fn toggle_site_handler<S, U>(
    State(state): State<RegistryState<S, U>>,
    Path((user_id, site_id)): Path<(String, String)>,
) -> Response
where
    S: SiteRepository + 'static,
    U: UserRepository + 'static,
{
    let site_id = SiteId(site_id);
    match state.sites.fetch(&site_id) {
        Ok(Some(_)) => {}
        Ok(None) => return not_found(format!("site {site_id} not found")),
        Err(err) => return repository_failure(err),
    }

    let user_id = UserId(user_id);
    let mut user = match state.users.fetch(&user_id) {
        Ok(Some(user)) => user,
        Ok(None) => return not_found(format!("user {} not found", user_id.0)),
        Err(err) => return repository_failure(err),
    };

    let linked = user.toggle_site(site_id.clone());
    if let Err(err) = state.users.update(user) {
        return repository_failure(err);
    }

    let payload = json!({
        "user_id": user_id.0,
        "site_id": site_id.0,
        "linked": linked,
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

fn unprocessable(message: &str) -> Response {
    let payload = json!({ "error": message });
    (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
}

fn not_found(message: String) -> Response {
    let payload = json!({ "error": message });
    (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
}

fn repository_failure(err: RepositoryError) -> Response {
    let status = match err {
        RepositoryError::Conflict => StatusCode::CONFLICT,
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": err.to_string() });
    (status, axum::Json(payload)).into_response()
}
