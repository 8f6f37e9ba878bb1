//! Async HTTP client wrapping the user-management endpoints.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response};
use roster_core::{
  api::{ApiError, UserAdminApi},
  user::{UserId, UserRecord, UserUpdate},
};
use serde_json::Value;

/// Connection settings for the backend API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  /// Prefix under which `/auth/users` lives, e.g. `http://localhost:8000/api`.
  pub base_url: String,
  /// Bearer token from the session record, if signed in.
  pub token:    Option<String>,
}

/// Async HTTP client for the user-management API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn auth(&self, req: RequestBuilder) -> RequestBuilder {
    match &self.config.token {
      Some(token) => req.bearer_auth(token),
      None => req,
    }
  }

  async fn send(&self, req: RequestBuilder) -> Result<Response, ApiError> {
    let resp = self
      .auth(req)
      .send()
      .await
      .map_err(|e| ApiError::Transport(e.to_string()))?;
    if resp.status().is_success() {
      Ok(resp)
    } else {
      Err(status_error(resp).await)
    }
  }
}

impl UserAdminApi for ApiClient {
  /// `GET /auth/users`
  async fn list_users(&self) -> Result<Vec<UserRecord>, ApiError> {
    self
      .send(self.client.get(self.url("/auth/users")))
      .await?
      .json()
      .await
      .map_err(|e| ApiError::Decode(e.to_string()))
  }

  /// `PUT /auth/users/{id}`
  async fn update_user(&self, id: UserId, update: &UserUpdate) -> Result<(), ApiError> {
    self
      .send(self.client.put(self.url(&format!("/auth/users/{id}"))).json(update))
      .await?;
    Ok(())
  }

  /// `DELETE /auth/users/{id}`
  async fn delete_user(&self, id: UserId) -> Result<(), ApiError> {
    self
      .send(self.client.delete(self.url(&format!("/auth/users/{id}"))))
      .await?;
    Ok(())
  }
}

// ─── Error bodies ─────────────────────────────────────────────────────────────

async fn status_error(resp: Response) -> ApiError {
  let status = resp.status().as_u16();
  let detail = resp
    .json::<Value>()
    .await
    .ok()
    .and_then(|body| detail_of(&body));
  ApiError::Status { status, detail }
}

/// Pull the reason out of an error body.
///
/// Handles `{"detail": "..."}` and the validation shape
/// `{"detail": [{"msg": "...", ...}]}`, taking the first message.
fn detail_of(body: &Value) -> Option<String> {
  match body.get("detail")? {
    Value::String(s) => Some(s.clone()),
    Value::Array(items) => items.first()?.get("msg")?.as_str().map(str::to_owned),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::{get, put},
  };
  use serde_json::json;

  use super::*;

  #[derive(Clone, Default)]
  struct Seen {
    bodies: Arc<Mutex<Vec<(i64, Value)>>>,
    auth:   Arc<Mutex<Vec<Option<String>>>>,
  }

  async fn list(State(seen): State<Seen>, headers: HeaderMap) -> impl IntoResponse {
    seen.auth.lock().unwrap().push(
      headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned),
    );
    Json(json!([
      { "id": 1, "full_name": "Root", "email": "root@x.com", "role": "admin",
        "is_active": 1, "created_at": "2024-01-02T03:04:05" },
      { "id": 2, "full_name": "Bob", "email": "b@x.com", "role": "student",
        "is_active": 0, "created_at": "2024-02-03T04:05:06Z" }
    ]))
  }

  async fn update(
    State(seen): State<Seen>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
  ) -> impl IntoResponse {
    seen.bodies.lock().unwrap().push((id, body.clone()));
    match id {
      2 => (StatusCode::OK, Json(json!({ "message": "ok" }))),
      3 => (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "detail": [{ "loc": ["body", "full_name"], "msg": "field required" }] })),
      ),
      _ => (StatusCode::BAD_REQUEST, Json(json!({ "detail": "name too long" }))),
    }
  }

  async fn remove(Path(id): Path<i64>) -> impl IntoResponse {
    match id {
      2 => StatusCode::NO_CONTENT.into_response(),
      _ => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
    }
  }

  async fn serve(seen: Seen) -> String {
    let app = Router::new()
      .route("/api/auth/users", get(list))
      .route("/api/auth/users/{id}", put(update).delete(remove))
      .with_state(seen);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}/api/")
  }

  fn client(base_url: String, token: Option<&str>) -> ApiClient {
    ApiClient::new(ApiConfig {
      base_url,
      token: token.map(str::to_owned),
    })
    .unwrap()
  }

  #[tokio::test]
  async fn lists_users_with_bearer_token() {
    let seen = Seen::default();
    let api = client(serve(seen.clone()).await, Some("tok"));

    let users = api.list_users().await.unwrap();
    assert_eq!(users.len(), 2);
    assert!(users[0].role.is_admin());
    assert!(!users[1].is_active);
    assert_eq!(seen.auth.lock().unwrap().as_slice(), &[Some("Bearer tok".to_owned())]);
  }

  #[tokio::test]
  async fn omits_authorization_without_token() {
    let seen = Seen::default();
    let api = client(serve(seen.clone()).await, None);
    api.list_users().await.unwrap();
    assert_eq!(seen.auth.lock().unwrap().as_slice(), &[None]);
  }

  #[tokio::test]
  async fn put_body_is_name_and_flag_only() {
    let seen = Seen::default();
    let api = client(serve(seen.clone()).await, None);

    let update = UserUpdate {
      full_name: "Bobby".into(),
      is_active: false,
    };
    api.update_user(UserId(2), &update).await.unwrap();
    assert_eq!(
      seen.bodies.lock().unwrap().as_slice(),
      &[(2, json!({ "full_name": "Bobby", "is_active": 0 }))]
    );
  }

  #[tokio::test]
  async fn put_failure_carries_server_detail() {
    let api = client(serve(Seen::default()).await, None);
    let update = UserUpdate {
      full_name: "x".into(),
      is_active: true,
    };

    let err = api.update_user(UserId(9), &update).await.unwrap_err();
    assert_eq!(err, ApiError::Status {
      status: 400,
      detail: Some("name too long".into()),
    });

    let err = api.update_user(UserId(3), &update).await.unwrap_err();
    assert_eq!(err.detail(), Some("field required"));
  }

  #[tokio::test]
  async fn delete_maps_status_codes() {
    let api = client(serve(Seen::default()).await, None);
    api.delete_user(UserId(2)).await.unwrap();

    let err = api.delete_user(UserId(1)).await.unwrap_err();
    assert_eq!(err, ApiError::Status {
      status: 500,
      detail: None,
    });
  }

  #[tokio::test]
  async fn unreachable_server_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = client(format!("http://{addr}"), None);
    assert!(matches!(api.list_users().await, Err(ApiError::Transport(_))));
  }

  #[test]
  fn detail_shapes() {
    assert_eq!(detail_of(&json!({ "detail": "nope" })).as_deref(), Some("nope"));
    assert_eq!(
      detail_of(&json!({ "detail": [{ "msg": "first" }, { "msg": "second" }] })).as_deref(),
      Some("first")
    );
    assert_eq!(detail_of(&json!({ "detail": 5 })), None);
    assert_eq!(detail_of(&json!({ "error": "x" })), None);
    assert_eq!(detail_of(&json!([])), None);
  }
}
