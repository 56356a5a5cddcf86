//! Caller-side stub for a page store registered on the bus
//!
//! Each trait method becomes one request to the configured address; the
//! reply is decoded back into the typed result or `ServiceError`. No
//! retries happen here.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::bus::EventBus;
use crate::error::ServiceError;
use crate::model::Page;
use crate::protocol::{Operation, Param, Request};
use crate::service::WikiDatabase;

/// Default wait for a reply before the call fails with a timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Page operations addressed over the bus.
#[derive(Debug, Clone)]
pub struct PageServiceClient {
    bus: EventBus,
    address: String,
    timeout: Duration,
}

impl PageServiceClient {
    pub fn new(bus: EventBus, address: impl Into<String>) -> Self {
        Self {
            bus,
            address: address.into(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    async fn call<T: DeserializeOwned>(
        &self,
        op: Operation,
        params: Vec<Param>,
    ) -> Result<T, ServiceError> {
        let reply = self
            .bus
            .request(&self.address, Request::new(op, params), self.timeout)
            .await?;
        reply.into_result()
    }
}

#[async_trait]
impl WikiDatabase for PageServiceClient {
    async fn fetch_all_pages(&self) -> Result<Vec<String>, ServiceError> {
        self.call(Operation::FetchAllPages, vec![]).await
    }

    async fn fetch_page(&self, name: &str) -> Result<Option<Page>, ServiceError> {
        self.call(Operation::FetchPage, vec![name.into()]).await
    }

    async fn fetch_page_by_id(&self, id: i64) -> Result<Option<Page>, ServiceError> {
        self.call(Operation::FetchPageById, vec![id.into()]).await
    }

    async fn create_page(&self, name: &str, content: &str) -> Result<(), ServiceError> {
        self.call(Operation::CreatePage, vec![name.into(), content.into()])
            .await
    }

    async fn save_page(&self, id: i64, content: &str) -> Result<(), ServiceError> {
        self.call(Operation::SavePage, vec![id.into(), content.into()])
            .await
    }

    async fn delete_page(&self, id: i64) -> Result<(), ServiceError> {
        self.call(Operation::DeletePage, vec![id.into()]).await
    }

    async fn fetch_all_pages_data(&self) -> Result<Vec<Page>, ServiceError> {
        self.call(Operation::FetchAllPagesData, vec![]).await
    }
}
