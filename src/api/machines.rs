//! Machine Read Endpoints
//!
//! Exposes the admin list at GET /admin/api/machines and single records at
//! GET /admin/api/machines/:id.

use super::{AppState, error::ApiError};
use crate::core::{MachineFilter, PageRequest};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
};
use serde::Deserialize;
use serde_json::{Value, json};

/// Query string accepted by the list endpoint.
///
/// Paging values that do not parse fall back to their defaults; a malformed
/// `category_id` is rejected.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Case-insensitive substring of name, model or slug
    pub q: Option<String>,
    /// Exact status wire value
    pub status: Option<String>,
    /// Exact category id
    pub category_id: Option<String>,
    /// 1-based page number
    pub page: Option<String>,
    /// Rows per page, capped server-side
    pub limit: Option<String>,
}

impl ListParams {
    fn filter(&self) -> Result<MachineFilter, ApiError> {
        let category_id = match self.category_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<i64>()
                    .map_err(|_| ApiError::Validation("invalid category_id".to_string()))?,
            ),
        };
        Ok(MachineFilter {
            q: self.q.clone(),
            status: self.status.clone(),
            category_id,
        })
    }

    fn page_request(&self) -> PageRequest {
        let number = |raw: &Option<String>| raw.as_deref().and_then(|v| v.trim().parse::<i64>().ok());
        PageRequest::new(number(&self.page), number(&self.limit))
    }
}

fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    state
        .auth
        .current_user(headers)
        .map(|_| ())
        .ok_or(ApiError::Unauthorized)
}

/// GET /admin/api/machines - one page of machines, newest first
#[tracing::instrument(skip(state, headers))]
pub async fn list_machines(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &headers)?;
    let page = state
        .service
        .list(&params.filter()?, params.page_request())
        .await?;
    Ok(Json(json!({ "success": true, "data": page })))
}

/// GET /admin/api/machines/:id - a machine with its specification and pricing
#[tracing::instrument(skip(state, headers))]
pub async fn get_machine(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &headers)?;
    let id = id
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::Validation("invalid id".to_string()))?;
    let detail = state.service.get(id).await?;
    Ok(Json(json!({ "success": true, "data": detail })))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::api::test_support::*;
    use crate::core::MachineInput;
    use crate::errors::Result;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    async fn seed(state: &AppState, name: &str, status: &str) -> Result<i64> {
        let input = MachineInput {
            name: Some(name.to_string()),
            status: Some(status.to_string()),
            ..Default::default()
        };
        state.service.create(input, 1).await
    }

    #[test]
    fn test_list_params_parsing() {
        let params = ListParams {
            page: Some("0".to_string()),
            limit: Some("999".to_string()),
            ..Default::default()
        };
        let page = params.page_request();
        assert_eq!((page.page(), page.limit()), (1, 50));

        let garbage = ListParams {
            page: Some("x".to_string()),
            ..Default::default()
        };
        assert_eq!(garbage.page_request(), PageRequest::default());

        let bad_category = ListParams {
            category_id: Some("abc".to_string()),
            ..Default::default()
        };
        assert!(bad_category.filter().is_err());
    }

    #[tokio::test]
    async fn test_list_machines() -> Result<()> {
        let (app, state, _tmp) = test_app().await?;
        seed(&state, "Hydraulic Press", "published").await?;
        seed(&state, "Band Saw", "draft").await?;
        seed(&state, "Press Brake", "draft").await?;

        let response = app
            .clone()
            .oneshot(authed_get("/admin/api/machines?q=PRESS&limit=1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["pagination"]["total"], 2);
        assert_eq!(body["data"]["pagination"]["total_pages"], 2);
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"]["items"][0]["name"], "Press Brake");

        let response = app
            .oneshot(authed_get("/admin/api/machines?status=published"))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["data"]["pagination"]["total"], 1);
        assert_eq!(body["data"]["items"][0]["status"], "published");
        Ok(())
    }

    #[tokio::test]
    async fn test_list_far_page_is_empty() -> Result<()> {
        let (app, state, _tmp) = test_app().await?;
        seed(&state, "Lathe", "draft").await?;

        let response = app
            .oneshot(authed_get(&format!("/admin/api/machines?page={}", i64::MAX)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["pagination"]["total"], 1);
        assert!(body["data"]["items"].as_array().unwrap().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_get_machine() -> Result<()> {
        let (app, state, _tmp) = test_app().await?;
        let id = seed(&state, "X", "draft").await?;

        let response = app
            .clone()
            .oneshot(authed_get(&format!("/admin/api/machines/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["name"], "X");
        assert_eq!(body["data"]["slug"], "x");
        assert_eq!(body["data"]["status"], "draft");
        assert!(body["data"]["pricing"].is_null());

        let response = app
            .clone()
            .oneshot(authed_get("/admin/api/machines/9999"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["success"], false);

        let response = app
            .oneshot(authed_get("/admin/api/machines/abc"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_read_endpoints_require_auth() -> Result<()> {
        let (app, _state, _tmp) = test_app().await?;
        let mut request = authed_get("/admin/api/machines");
        request.headers_mut().remove("authorization");

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }
}
