//! The page operation set
//!
//! Everything outside this crate talks to page storage through this trait.
//! `PageStore` implements it directly; `PageServiceClient` implements it
//! over the bus.

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::model::Page;

#[async_trait]
pub trait WikiDatabase: Send + Sync {
    /// All page names, sorted.
    async fn fetch_all_pages(&self) -> Result<Vec<String>, ServiceError>;

    /// Page by name, `None` when absent.
    async fn fetch_page(&self, name: &str) -> Result<Option<Page>, ServiceError>;

    /// Page by id, `None` when absent.
    async fn fetch_page_by_id(&self, id: i64) -> Result<Option<Page>, ServiceError>;

    /// Create a page. A taken name fails with `Conflict`.
    async fn create_page(&self, name: &str, content: &str) -> Result<(), ServiceError>;

    /// Overwrite a page's content. Succeeds even when no page has `id`.
    async fn save_page(&self, id: i64, content: &str) -> Result<(), ServiceError>;

    /// Delete a page. Succeeds even when no page has `id`.
    async fn delete_page(&self, id: i64) -> Result<(), ServiceError>;

    /// Every page with its content, ordered by id.
    async fn fetch_all_pages_data(&self) -> Result<Vec<Page>, ServiceError>;
}
