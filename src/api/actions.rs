//! Machine Action Endpoint
//!
//! Handles `/admin/actions/machines?action=create|update|delete|upload|toggle_status`.
//!
//! Checks run in a fixed order: authentication, then the action name, then
//! the CSRF token (POST only), then the method. Each action answers with JSON
//! or with a redirect back to the dashboard, depending on what the client asked for.

use super::{AppState, error::ApiError, form::ActionForm, guards::AdminUser};
use crate::entities::MachineStatus;
use axum::{
    Json,
    extract::{Query, Request, State},
    http::{HeaderMap, Method, header::ACCEPT},
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use std::collections::HashMap;
use tracing::{info, warn};

/// Header carrying the CSRF token for clients that do not send it as a form field.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// The operations the endpoint dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Insert a new machine
    Create,
    /// Partially update an existing machine
    Update,
    /// Hard-delete a machine
    Delete,
    /// Store an image and return its URL
    Upload,
    /// Move a machine to another status
    ToggleStatus,
}

impl Action {
    /// Maps the `action` parameter onto an [`Action`].
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            "upload" => Some(Self::Upload),
            "toggle_status" => Some(Self::ToggleStatus),
            _ => None,
        }
    }
}

/// Successful result of an action.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Outcome {
    Created(i64),
    Saved(i64),
    Deleted,
    Uploaded(String),
    StatusChanged { id: i64, status: MachineStatus },
}

/// Decides between JSON and redirect responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reply {
    Json,
    Redirect,
}

impl Reply {
    fn negotiate(headers: &HeaderMap, query: &HashMap<String, String>, form: Option<&ActionForm>) -> Self {
        let accepts_json = headers
            .get(ACCEPT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("application/json"));
        if accepts_json
            || query.contains_key("__json")
            || form.is_some_and(|f| f.contains("__json"))
        {
            Self::Json
        } else {
            Self::Redirect
        }
    }
}

/// Appends `params` to `base`, which may already carry a query string.
fn redirect_url(base: &str, params: &[(&str, String)]) -> String {
    if params.is_empty() {
        return base.to_string();
    }
    let query = params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}{query}")
}

fn success_response(reply: Reply, dashboard: &str, outcome: Outcome) -> Response {
    let params = match (reply, outcome) {
        // Uploads are only ever requested by script
        (_, Outcome::Uploaded(url)) => {
            return Json(json!({ "success": true, "url": url })).into_response();
        }
        (Reply::Json, Outcome::Created(id) | Outcome::Saved(id)) => {
            return Json(json!({ "success": true, "id": id })).into_response();
        }
        (Reply::Json, Outcome::Deleted) => {
            return Json(json!({ "success": true })).into_response();
        }
        (Reply::Json, Outcome::StatusChanged { id, status }) => {
            return Json(json!({ "success": true, "id": id, "status": status })).into_response();
        }
        (Reply::Redirect, Outcome::Created(_)) => vec![("created", "1".to_string())],
        (Reply::Redirect, Outcome::Saved(_)) => vec![("saved", "1".to_string())],
        (Reply::Redirect, Outcome::Deleted) => vec![("deleted", "1".to_string())],
        (Reply::Redirect, Outcome::StatusChanged { id, status }) => {
            vec![("status", status.to_string()), ("id", id.to_string())]
        }
    };
    Redirect::to(&redirect_url(dashboard, &params)).into_response()
}

fn error_response(reply: Reply, dashboard: &str, err: ApiError) -> Response {
    match reply {
        Reply::Json => err.into_response(),
        Reply::Redirect => {
            Redirect::to(&redirect_url(dashboard, &[("err", err.code().to_string())]))
                .into_response()
        }
    }
}

/// ANY /admin/actions/machines - dispatch a machine action
#[tracing::instrument(skip(state, headers, request))]
pub async fn handle_action(
    State(state): State<AppState>,
    method: Method,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    request: Request,
) -> Response {
    let dashboard = state.config.dashboard_path.as_str();

    let Some(user) = state.auth.current_user(&headers) else {
        let reply = Reply::negotiate(&headers, &query, None);
        return error_response(reply, dashboard, ApiError::Unauthorized);
    };

    let form = if method == Method::POST {
        match ActionForm::read(request).await {
            Ok(form) => form,
            Err(err) => {
                let reply = Reply::negotiate(&headers, &query, None);
                return error_response(reply, dashboard, err);
            }
        }
    } else {
        ActionForm::default()
    };
    let reply = Reply::negotiate(&headers, &query, Some(&form));

    let action_name = query
        .get("action")
        .map(String::as_str)
        .or_else(|| form.get("action"))
        .unwrap_or_default();
    let Some(action) = Action::parse(action_name) else {
        return error_response(reply, dashboard, ApiError::UnknownAction);
    };

    if method == Method::POST {
        let token = form
            .get("csrf")
            .filter(|t| !t.is_empty())
            .or_else(|| headers.get(CSRF_HEADER).and_then(|v| v.to_str().ok()))
            .unwrap_or_default();
        if !state.csrf.check(token) {
            warn!("Rejected {:?} from user {}: bad CSRF token", action, user.id);
            return error_response(reply, dashboard, ApiError::Forbidden);
        }
    } else {
        return error_response(reply, dashboard, ApiError::MethodNotAllowed);
    }

    match run_action(&state, action, reply, &form, &user).await {
        Ok(outcome) => success_response(reply, dashboard, outcome),
        Err(err) => error_response(reply, dashboard, err),
    }
}

async fn run_action(
    state: &AppState,
    action: Action,
    reply: Reply,
    form: &ActionForm,
    user: &AdminUser,
) -> Result<Outcome, ApiError> {
    match action {
        Action::Create => {
            let mut input = form.machine_input()?;
            input.check(true)?;
            if let Some(file) = form.file("image") {
                let url = state.images.ingest(&file.bytes, &file.filename).await?;
                input.main_image = Some(Some(url));
            }
            let id = state.service.create(input, user.id).await?;
            info!("User {} created machine {}", user.id, id);
            Ok(Outcome::Created(id))
        }
        Action::Update => {
            let id = form.id()?;
            let mut input = form.machine_input()?;
            // A browser form omits an unticked checkbox
            if reply == Reply::Redirect && input.featured.is_none() {
                input.featured = Some(false);
            }
            input.check(false)?;
            if let Some(file) = form.file("image") {
                state.service.get(id).await?;
                let url = state.images.ingest(&file.bytes, &file.filename).await?;
                input.main_image = Some(Some(url));
            }
            state.service.update(id, input, user.id).await?;
            info!("User {} updated machine {}", user.id, id);
            Ok(Outcome::Saved(id))
        }
        Action::Delete => {
            let id = form.id()?;
            state.service.delete(id).await?;
            info!("User {} deleted machine {}", user.id, id);
            Ok(Outcome::Deleted)
        }
        Action::Upload => {
            let file = form
                .file("image")
                .or_else(|| form.file("file"))
                .ok_or_else(|| ApiError::Validation("invalid file".to_string()))?;
            let url = state.images.ingest(&file.bytes, &file.filename).await?;
            Ok(Outcome::Uploaded(url))
        }
        Action::ToggleStatus => {
            let id = form.id()?;
            let to = form.get("to").unwrap_or(MachineStatus::Published.as_str());
            let status = state.service.toggle_status(id, to).await?;
            Ok(Outcome::StatusChanged { id, status })
        }
    }
}
