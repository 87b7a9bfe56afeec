//! Request routing and handlers.
//!
//! Dispatch mirrors the service contract: a global session gate in front of
//! everything except `/login` and `/change-password-page`, JSON responses
//! for the API surface, HTML pages for navigation, and one deliberate
//! special case where an illegal note name gets an inline alert fragment.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, Query, RawQuery, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use kvnotes_core::{CredentialManager, KvStore, NoteStore, SaveOutcome, SessionManager, note};

use crate::pages;

/// Shared application state: stateless manager handles over one store.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionManager,
    pub credentials: CredentialManager,
    pub notes: NoteStore,
}

impl AppState {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            sessions: SessionManager::new(store.clone()),
            credentials: CredentialManager::new(store.clone()),
            notes: NoteStore::new(store),
        }
    }
}

/// Build the application router with the session gate applied.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/login", get(login_page).post(login))
        .route("/change-password", post(change_password))
        .route("/change-password-page", get(change_password_page))
        .route("/admin", get(admin_page))
        .route("/next-id", get(next_id))
        .route("/", get(root).post(save_unnamed_note))
        .route(
            "/{name}",
            get(get_note).post(save_note).delete(delete_note),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session_gate,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =========================================================================
// Session gate
// =========================================================================

/// Paths reachable without a session. `/login` must accept the login POST,
/// `/change-password-page` is viewable so the form can load, and
/// `/change-password` answers JSON 401 itself instead of an HTML page.
const GATE_EXEMPT: &[&str] = &["/login", "/change-password", "/change-password-page"];

async fn session_gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if GATE_EXEMPT.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let session_id = session_id_from(request.headers(), request.uri().query());
    let valid = match session_id {
        Some(id) => state.sessions.is_valid_session(&id).await,
        None => false,
    };
    if valid {
        return next.run(request).await;
    }

    // Page navigation gets the login page with HTTP 200, not a redirect;
    // the requested location rides along as a client-side hint.
    let redirect = request
        .uri()
        .path_and_query()
        .map_or_else(|| "/".to_string(), |pq| pq.as_str().to_string());
    Html(pages::login_page(&redirect)).into_response()
}

/// Extract the session id: `session_id` cookie first, query parameter as
/// the fallback. The token is an unsigned bearer token.
fn session_id_from(headers: &HeaderMap, query: Option<&str>) -> Option<String> {
    if let Some(id) = cookie_value(headers, "session_id") {
        return Some(id);
    }
    query_param(query.unwrap_or(""), "session_id")
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    cookie_header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

fn query_param(query: &str, name: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

// =========================================================================
// Authentication
// =========================================================================

#[derive(Deserialize)]
struct LoginRequest {
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest {
    current_password: String,
    new_password: String,
}

/// `POST /login` -- body `{password}`, answers `{success, sessionId}`.
async fn login(State(state): State<AppState>, body: String) -> Response {
    let Ok(request) = serde_json::from_str::<LoginRequest>(&body) else {
        return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to process request");
    };

    // A store failure during verification fails closed: wrong password.
    let valid = match state.credentials.verify_password(&request.password).await {
        Ok(valid) => valid,
        Err(err) => {
            warn!(error = %err, "password verification failed");
            false
        }
    };
    if !valid {
        return error_json(StatusCode::UNAUTHORIZED, "Wrong password");
    }

    match state.sessions.create_session().await {
        Ok(session_id) => {
            Json(json!({ "success": true, "sessionId": session_id })).into_response()
        }
        Err(err) => {
            // Login succeeded but no session exists; distinct from 401.
            error!(error = %err, "session creation failed");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create session")
        }
    }
}

/// `GET /login` -- the login form.
async fn login_page() -> Html<String> {
    Html(pages::login_page("/"))
}

/// `POST /change-password` -- requires a valid session, verifies the
/// current password, then overwrites it.
async fn change_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: String,
) -> Response {
    let session_id = session_id_from(&headers, query.as_deref());
    let valid = match session_id {
        Some(id) => state.sessions.is_valid_session(&id).await,
        None => false,
    };
    if !valid {
        return error_json(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    let Ok(request) = serde_json::from_str::<ChangePasswordRequest>(&body) else {
        return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to process request");
    };

    let current_ok = match state
        .credentials
        .verify_password(&request.current_password)
        .await
    {
        Ok(valid) => valid,
        Err(err) => {
            warn!(error = %err, "password verification failed");
            false
        }
    };
    if !current_ok {
        return error_json(StatusCode::UNAUTHORIZED, "Current password is wrong");
    }

    match state.credentials.update_password(&request.new_password).await {
        Ok(()) => Json(json!({ "success": true, "message": "Password updated" })).into_response(),
        Err(err) => {
            error!(error = %err, "password update failed");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update password")
        }
    }
}

/// `GET /change-password-page` -- form is viewable without a session; the
/// POST it issues is still gated.
async fn change_password_page() -> Html<&'static str> {
    Html(pages::change_password_page())
}

// =========================================================================
// Directory and index
// =========================================================================

#[derive(Deserialize)]
struct RootQuery {
    list: Option<String>,
    #[serde(rename = "includeContent")]
    include_content: Option<String>,
}

/// `GET /` -- the notes directory page, or the JSON listing with `list=1`.
async fn root(State(state): State<AppState>, Query(query): Query<RootQuery>) -> Response {
    if query.list.as_deref() == Some("1") {
        let include_content = query.include_content.as_deref() == Some("1");
        return match state.notes.list(include_content).await {
            Ok(entries) => Json(entries).into_response(),
            Err(err) => {
                error!(error = %err, "index read failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read index").into_response()
            }
        };
    }

    // First visit to an empty store gets the example note. A failure here
    // only costs the seed; the page still renders.
    if let Err(err) = state.notes.seed_example_note().await {
        warn!(error = %err, "seeding example note failed");
    }

    Html(pages::directory_page()).into_response()
}

/// `GET /next-id` -- next free numeric note name.
async fn next_id(State(state): State<AppState>) -> Response {
    match state.notes.index().next_id().await {
        Ok(id) => Json(json!({ "nextId": id })).into_response(),
        Err(err) => {
            error!(error = %err, "next-id read failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to compute next id").into_response()
        }
    }
}

/// `GET /admin` -- management page (bulk delete / export).
async fn admin_page() -> Html<&'static str> {
    Html(pages::admin_page())
}

// =========================================================================
// Note CRUD
// =========================================================================

/// `GET /{name}` -- the editor page, or plain-text content with `?raw`.
async fn get_note(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !note::is_valid_note_name(&name) {
        return invalid_name_response();
    }

    if query.contains_key("raw") {
        return match state.notes.get(&name).await {
            Ok(Some(n)) => {
                ([(header::CONTENT_TYPE, "text/plain;charset=UTF-8")], n.content).into_response()
            }
            Ok(None) => (StatusCode::NOT_FOUND, "Not found").into_response(),
            Err(err) => {
                error!(error = %err, %name, "note read failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read note").into_response()
            }
        };
    }

    match state.notes.get(&name).await {
        Ok(found) => Html(pages::note_page(&name, &found.unwrap_or_default())).into_response(),
        Err(err) => {
            error!(error = %err, %name, "note read failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read note").into_response()
        }
    }
}

/// `POST /{name}` -- create, update, or (on empty title and content)
/// delete the note.
async fn save_note(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: String,
) -> Response {
    if !note::is_valid_note_name(&name) {
        return invalid_name_response();
    }
    save_note_body(&state, &name, body).await
}

/// `POST /` -- a write with no name lands on a fresh random name.
async fn save_unnamed_note(State(state): State<AppState>, body: String) -> Response {
    let name = note::random_note_name();
    save_note_body(&state, &name, body).await
}

async fn save_note_body(state: &AppState, name: &str, body: String) -> Response {
    // A JSON object body carries {title, content}; any other body, JSON or
    // not, degrades to "the raw body is the content" / empty fields.
    let (title, content) = match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(value) => (
            value
                .get("title")
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_string(),
            value
                .get("content")
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_string(),
        ),
        Err(_) => (String::new(), body),
    };

    match state.notes.save(name, &title, &content).await {
        Ok(SaveOutcome::Saved {
            created_at,
            updated_at,
        }) => Json(json!({ "created_at": created_at, "updated_at": updated_at })).into_response(),
        Ok(SaveOutcome::Deleted) => Json(json!({ "deleted": true })).into_response(),
        Err(err) => {
            error!(error = %err, %name, "note save failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to save note").into_response()
        }
    }
}

/// `DELETE /{name}` -- idempotent removal.
async fn delete_note(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    if !note::is_valid_note_name(&name) {
        return invalid_name_response();
    }
    match state.notes.delete(&name).await {
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(err) => {
            error!(error = %err, %name, "note delete failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete note").into_response()
        }
    }
}

// =========================================================================
// Response helpers
// =========================================================================

fn error_json(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "error": message }))).into_response()
}

/// The one user-facing path that answers an HTML/script fragment instead
/// of JSON: an illegal note name pops an alert and navigates back.
fn invalid_name_response() -> Response {
    Html(pages::INVALID_NAME_FRAGMENT).into_response()
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, value.parse().unwrap());
        headers
    }

    #[test]
    fn session_id_prefers_cookie() {
        let headers = headers_with_cookie("a=1; session_id=abc; b=2");
        let id = session_id_from(&headers, Some("session_id=from-query"));
        assert_eq!(id.as_deref(), Some("abc"));
    }

    #[test]
    fn session_id_falls_back_to_query() {
        let id = session_id_from(&HeaderMap::new(), Some("x=1&session_id=from-query"));
        assert_eq!(id.as_deref(), Some("from-query"));
    }

    #[test]
    fn session_id_absent() {
        assert_eq!(session_id_from(&HeaderMap::new(), None), None);
        let headers = headers_with_cookie("other=1");
        assert_eq!(session_id_from(&headers, Some("y=2")), None);
    }
}
