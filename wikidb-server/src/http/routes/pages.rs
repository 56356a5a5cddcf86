//! Page endpoints
//!
//! Success bodies carry `"success": true` next to the payload; failures go
//! through `ApiError`.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use wikidb_store::Page;

use crate::http::error::ApiError;
use crate::http::extractors::{PageId, ValidJson};
use crate::http::server::AppState;
use crate::validation;

/// Create page request
#[derive(Deserialize, Default)]
#[serde(default)]
pub struct CreatePageRequest {
    pub name: Option<String>,
    pub markdown: Option<String>,
}

/// Update page request
#[derive(Deserialize, Default)]
#[serde(default)]
pub struct UpdatePageRequest {
    pub markdown: Option<String>,
}

/// Page listing entry
#[derive(Serialize)]
pub struct PageSummary {
    pub id: i64,
    pub name: String,
}

/// Full page body
#[derive(Serialize)]
pub struct PageBody {
    pub id: i64,
    pub name: String,
    pub markdown: String,
}

impl From<Page> for PageBody {
    fn from(p: Page) -> Self {
        Self {
            id: p.id,
            name: p.name,
            markdown: p.content,
        }
    }
}

#[derive(Serialize)]
pub struct PagesResponse {
    pub success: bool,
    pub pages: Vec<PageSummary>,
}

#[derive(Serialize)]
pub struct PageResponse {
    pub success: bool,
    pub page: PageBody,
}

#[derive(Serialize)]
pub struct NamesResponse {
    pub success: bool,
    pub names: Vec<String>,
}

#[derive(Serialize)]
pub struct Ack {
    pub success: bool,
}

const ACK: Ack = Ack { success: true };

/// GET /api/pages - id and name of every page
async fn list_pages(State(state): State<Arc<AppState>>) -> Result<Json<PagesResponse>, ApiError> {
    let pages = state.db.fetch_all_pages_data().await?;

    Ok(Json(PagesResponse {
        success: true,
        pages: pages
            .into_iter()
            .map(|p| PageSummary {
                id: p.id,
                name: p.name,
            })
            .collect(),
    }))
}

/// GET /api/page-names - sorted page names
async fn list_names(State(state): State<Arc<AppState>>) -> Result<Json<NamesResponse>, ApiError> {
    let names = state.db.fetch_all_pages().await?;
    Ok(Json(NamesResponse {
        success: true,
        names,
    }))
}

/// GET /api/pages/{id}
async fn get_page(
    State(state): State<Arc<AppState>>,
    PageId(id): PageId,
) -> Result<Json<PageResponse>, ApiError> {
    let page = state
        .db
        .fetch_page_by_id(id)
        .await?
        .ok_or_else(|| ApiError::page_not_found(id))?;

    Ok(Json(PageResponse {
        success: true,
        page: page.into(),
    }))
}

/// POST /api/pages
async fn create_page(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<CreatePageRequest>,
) -> Result<(StatusCode, Json<Ack>), ApiError> {
    let name = validation::required(req.name, "name")?;
    let markdown = validation::required(req.markdown, "markdown")?;
    let name = validation::page_name(&name)?;

    state.db.create_page(name, &markdown).await?;
    tracing::debug!(page = %name, "page created");

    Ok((StatusCode::CREATED, Json(ACK)))
}

/// PUT /api/pages/{id}
async fn update_page(
    State(state): State<Arc<AppState>>,
    PageId(id): PageId,
    ValidJson(req): ValidJson<UpdatePageRequest>,
) -> Result<Json<Ack>, ApiError> {
    let markdown = validation::required(req.markdown, "markdown")?;
    state.db.save_page(id, &markdown).await?;
    Ok(Json(ACK))
}

/// DELETE /api/pages/{id}
async fn delete_page(
    State(state): State<Arc<AppState>>,
    PageId(id): PageId,
) -> Result<Json<Ack>, ApiError> {
    state.db.delete_page(id).await?;
    Ok(Json(ACK))
}

/// Page routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/pages", get(list_pages).post(create_page))
        .route(
            "/api/pages/{id}",
            get(get_page).put(update_page).delete(delete_page),
        )
        .route("/api/page-names", get(list_names))
}
