use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use tracing::info;

use super::AppState;
use super::error::ApiError;
use super::extract::Authenticated;
use crate::storage::{Template, TemplateParams};

#[derive(Debug, Deserialize)]
pub struct TemplateBody {
    pub name: String,
    pub description: Option<String>,
    /// Any JSON value; stored as text.
    #[serde(default = "empty_layout")]
    pub layout: serde_json::Value,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn empty_layout() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

const fn default_active() -> bool {
    true
}

impl TemplateBody {
    fn validated(&self) -> Result<(String, String), ApiError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ApiError::BadRequest("Template name is required".to_string()));
        }
        let layout = serde_json::to_string(&self.layout)
            .map_err(|e| ApiError::BadRequest(format!("Invalid layout: {e}")))?;
        Ok((name.to_string(), layout))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListTemplatesQuery {
    #[serde(default)]
    pub active_only: bool,
}

/// `GET /api/templates`
pub async fn list(
    State(state): State<AppState>,
    _auth: Authenticated,
    Query(query): Query<ListTemplatesQuery>,
) -> Result<Json<Vec<Template>>, ApiError> {
    Ok(Json(state.db.list_templates(query.active_only).await?))
}

/// `POST /api/templates`
pub async fn create(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(body): Json<TemplateBody>,
) -> Result<(StatusCode, Json<Template>), ApiError> {
    let (name, layout) = body.validated()?;
    let params = TemplateParams {
        name: &name,
        description: body.description.as_deref(),
        layout: &layout,
        is_active: body.is_active,
    };
    let template = match state.db.create_template(&params).await {
        Ok(template) => template,
        Err(e) if e.is_constraint() => {
            return Err(ApiError::Conflict(format!(
                "A template named '{name}' already exists"
            )));
        }
        Err(e) => return Err(e.into()),
    };
    info!(template_id = template.id, actor = %auth.actor(), "Template created");
    Ok((StatusCode::CREATED, Json(template)))
}

/// `GET /api/templates/{template_id}`
pub async fn get_one(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(template_id): Path<i64>,
) -> Result<Json<Template>, ApiError> {
    Ok(Json(state.db.get_template(template_id).await?))
}

/// `PUT /api/templates/{template_id}`
pub async fn update(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(template_id): Path<i64>,
    Json(body): Json<TemplateBody>,
) -> Result<Json<Template>, ApiError> {
    let (name, layout) = body.validated()?;
    let params = TemplateParams {
        name: &name,
        description: body.description.as_deref(),
        layout: &layout,
        is_active: body.is_active,
    };
    let template = match state.db.update_template(template_id, &params).await {
        Ok(template) => template,
        Err(e) if e.is_constraint() => {
            return Err(ApiError::Conflict(format!(
                "A template named '{name}' already exists"
            )));
        }
        Err(e) => return Err(e.into()),
    };
    info!(template_id, actor = %auth.actor(), "Template updated");
    Ok(Json(template))
}

/// `DELETE /api/templates/{template_id}`
pub async fn delete(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(template_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.admin.delete_template(template_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
