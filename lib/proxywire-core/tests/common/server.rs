#![allow(dead_code)]
use std::collections::BTreeMap;
use std::time::Duration;

use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

/// Delay of the `/api/slow` route.
pub const SLOW_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
}

const ECHOED_HEADERS: [&str; 5] = [
    "user-agent",
    "x-forwarded-for",
    "accept-language",
    "x-request-id",
    "x-api-version",
];

pub fn router() -> Router {
    Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/users/{id}", get(get_user).delete(delete_user))
        .route("/api/search", get(search))
        .route("/api/headers", get(echo_headers))
        .route("/api/slow", get(slow))
        .route("/api/broken", get(broken))
}

async fn list_users(Query(query): Query<BTreeMap<String, String>>) -> Json<BTreeMap<String, String>> {
    Json(query)
}

async fn get_user(Path(id): Path<u32>) -> Result<Json<User>, StatusCode> {
    if id == 404 {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(User {
        id,
        name: format!("user-{id}"),
    }))
}

async fn create_user(Json(new_user): Json<NewUser>) -> impl IntoResponse {
    let user = User {
        id: 100,
        name: new_user.name,
    };
    (StatusCode::CREATED, Json(user))
}

async fn delete_user(Path(_id): Path<u32>) -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn search(Query(query): Query<BTreeMap<String, String>>) -> Json<BTreeMap<String, String>> {
    Json(query)
}

async fn echo_headers(headers: HeaderMap) -> Json<BTreeMap<String, String>> {
    let echoed = ECHOED_HEADERS
        .iter()
        .filter_map(|name| {
            let value = headers.get(*name)?.to_str().ok()?;
            Some(((*name).to_string(), value.to_string()))
        })
        .collect();
    Json(echoed)
}

async fn slow() -> Json<User> {
    tokio::time::sleep(SLOW_DELAY).await;
    Json(User {
        id: 0,
        name: "late".to_string(),
    })
}

async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "database unavailable")
}
