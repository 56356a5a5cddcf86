//! Page store - CRUD over the pooled database
//!
//! Each operation checks out one connection, runs one statement from the
//! query catalog, and returns the connection before resolving. A
//! `PageStore` value only exists once its schema bootstrap has succeeded.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::catalog::{QueryCatalog, QueryId};
use crate::error::ServiceError;
use crate::model::Page;
use crate::pool::ConnectionPool;
use crate::protocol::{Operation, Reply, Request};
use crate::service::WikiDatabase;

/// A ready page store instance.
#[derive(Debug, Clone)]
pub struct PageStore {
    pool: ConnectionPool,
    catalog: Arc<QueryCatalog>,
}

impl PageStore {
    /// Bootstrap the schema and return a ready instance.
    ///
    /// Safe to run from many instances at once: the create statement is
    /// `IF NOT EXISTS`, so a table created by a peer is a no-op here.
    pub async fn start(
        pool: ConnectionPool,
        catalog: Arc<QueryCatalog>,
    ) -> Result<Self, ServiceError> {
        let store = Self { pool, catalog };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Run the create-table statement.
    pub async fn ensure_schema(&self) -> Result<(), ServiceError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query(self.sql(QueryId::CreatePagesTable))
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    fn sql(&self, id: QueryId) -> &str {
        self.catalog.get(id)
    }

    pub async fn fetch_all_pages(&self) -> Result<Vec<String>, ServiceError> {
        let mut conn = self.pool.acquire().await?;
        let mut names: Vec<String> = sqlx::query_scalar::<_, String>(self.sql(QueryId::AllPages))
            .fetch_all(&mut *conn)
            .await?;
        drop(conn);

        // Sorted here whatever order the catalog query returns
        names.sort();
        Ok(names)
    }

    pub async fn fetch_page(&self, name: &str) -> Result<Option<Page>, ServiceError> {
        let mut conn = self.pool.acquire().await?;
        let page = sqlx::query_as::<_, Page>(self.sql(QueryId::GetPage))
            .bind(name)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(page)
    }

    pub async fn fetch_page_by_id(&self, id: i64) -> Result<Option<Page>, ServiceError> {
        let mut conn = self.pool.acquire().await?;
        let page = sqlx::query_as::<_, Page>(self.sql(QueryId::GetPageById))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(page)
    }

    pub async fn create_page(&self, name: &str, content: &str) -> Result<(), ServiceError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query(self.sql(QueryId::CreatePage))
            .bind(name)
            .bind(content)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    pub async fn save_page(&self, id: i64, content: &str) -> Result<(), ServiceError> {
        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query(self.sql(QueryId::SavePage))
            .bind(content)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            debug!(id, "save matched no page");
        }
        Ok(())
    }

    pub async fn delete_page(&self, id: i64) -> Result<(), ServiceError> {
        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query(self.sql(QueryId::DeletePage))
            .bind(id)
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            debug!(id, "delete matched no page");
        }
        Ok(())
    }

    pub async fn fetch_all_pages_data(&self) -> Result<Vec<Page>, ServiceError> {
        let mut conn = self.pool.acquire().await?;
        let pages = sqlx::query_as::<_, Page>(self.sql(QueryId::AllPagesData))
            .fetch_all(&mut *conn)
            .await?;
        Ok(pages)
    }

    /// Answer one bus request. Always yields a reply; failures become
    /// error replies rather than escaping the instance.
    pub async fn handle(&self, request: Request) -> Reply {
        let op = request.op;
        match self.dispatch(&request).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!(?op, error = %err, "page operation failed");
                Reply::failure(&err)
            }
        }
    }

    async fn dispatch(&self, request: &Request) -> Result<Reply, ServiceError> {
        request.check_arity()?;

        let reply = match request.op {
            Operation::FetchAllPages => Reply::ok(&self.fetch_all_pages().await?),
            Operation::FetchPage => Reply::ok(&self.fetch_page(request.text(0)?).await?),
            Operation::FetchPageById => Reply::ok(&self.fetch_page_by_id(request.int(0)?).await?),
            Operation::CreatePage => {
                self.create_page(request.text(0)?, request.text(1)?).await?;
                Reply::empty()
            }
            Operation::SavePage => {
                self.save_page(request.int(0)?, request.text(1)?).await?;
                Reply::empty()
            }
            Operation::DeletePage => {
                self.delete_page(request.int(0)?).await?;
                Reply::empty()
            }
            Operation::FetchAllPagesData => Reply::ok(&self.fetch_all_pages_data().await?),
        };
        Ok(reply)
    }
}

#[async_trait]
impl WikiDatabase for PageStore {
    async fn fetch_all_pages(&self) -> Result<Vec<String>, ServiceError> {
        PageStore::fetch_all_pages(self).await
    }

    async fn fetch_page(&self, name: &str) -> Result<Option<Page>, ServiceError> {
        PageStore::fetch_page(self, name).await
    }

    async fn fetch_page_by_id(&self, id: i64) -> Result<Option<Page>, ServiceError> {
        PageStore::fetch_page_by_id(self, id).await
    }

    async fn create_page(&self, name: &str, content: &str) -> Result<(), ServiceError> {
        PageStore::create_page(self, name, content).await
    }

    async fn save_page(&self, id: i64, content: &str) -> Result<(), ServiceError> {
        PageStore::save_page(self, id, content).await
    }

    async fn delete_page(&self, id: i64) -> Result<(), ServiceError> {
        PageStore::delete_page(self, id).await
    }

    async fn fetch_all_pages_data(&self) -> Result<Vec<Page>, ServiceError> {
        PageStore::fetch_all_pages_data(self).await
    }
}
