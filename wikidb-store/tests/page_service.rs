//! End-to-end page service behaviour: client -> bus -> worker pool -> SQLite

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tempfile::TempDir;
use wikidb_store::{
    BusError, ConnectionPool, EventBus, PageServiceClient, PageStore, QueryCatalog,
    ServiceError, WikiDatabase, WikiDbConfig, WorkerPool,
};

fn config_for(dir: &TempDir, max_pool_size: u32, instances: usize) -> WikiDbConfig {
    WikiDbConfig {
        jdbc_url: format!("jdbc:sqlite:{}", dir.path().join("wiki.db").display()),
        max_pool_size,
        instances,
        ..Default::default()
    }
}

async fn deploy(dir: &TempDir) -> WorkerPool {
    WorkerPool::deploy(&config_for(dir, 4, 3), EventBus::new())
        .await
        .expect("deployment failed")
}

#[tokio::test]
async fn bootstrap_is_idempotent_across_instances() {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite:{}", dir.path().join("wiki.db").display());
    let catalog = Arc::new(QueryCatalog::bundled().unwrap());

    // Each simulated instance gets its own pool, as separate processes would
    let starts = (0..6).map(|_| {
        let url = url.clone();
        let catalog = Arc::clone(&catalog);
        tokio::spawn(async move {
            let pool = ConnectionPool::connect_with(&url, 2, Duration::from_secs(10))
                .await
                .expect("pool creation failed");
            PageStore::start(pool, catalog).await
        })
    });
    let stores: Vec<PageStore> = join_all(starts)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked").expect("bootstrap failed"))
        .collect();

    // Bootstrapping again on a ready store is a no-op
    stores[0].ensure_schema().await.unwrap();

    let inspector = ConnectionPool::connect_with(&url, 1, Duration::from_secs(5))
        .await
        .unwrap();
    let mut conn = inspector.acquire().await.unwrap();
    let tables =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'pages'")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
    assert_eq!(tables, 1);

    let columns =
        sqlx::query_scalar::<_, String>("SELECT name FROM pragma_table_info('pages') ORDER BY cid")
            .fetch_all(&mut *conn)
            .await
            .unwrap();
    assert_eq!(columns, vec!["id", "name", "content"]);
}

#[tokio::test]
async fn created_page_is_fetchable_by_name() {
    let dir = TempDir::new().unwrap();
    let workers = deploy(&dir).await;
    let client = workers.client();

    client.create_page("Sample", "# A page").await.unwrap();
    let page = client.fetch_page("Sample").await.unwrap().expect("page missing");

    assert_eq!(page.name, "Sample");
    assert_eq!(page.content, "# A page");
    workers.shutdown().await;
}

#[tokio::test]
async fn duplicate_name_is_a_conflict() {
    let dir = TempDir::new().unwrap();
    let workers = deploy(&dir).await;
    let client = workers.client();

    client.create_page("Sample", "first").await.unwrap();
    let err = client.create_page("Sample", "second").await.unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)), "got {:?}", err);

    let pages = client.fetch_all_pages_data().await.unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].content, "first");
    workers.shutdown().await;
}

#[tokio::test]
async fn deleted_page_is_not_found() {
    let dir = TempDir::new().unwrap();
    let workers = deploy(&dir).await;
    let client = workers.client();

    client.create_page("Doomed", "bye").await.unwrap();
    let id = client.fetch_page("Doomed").await.unwrap().unwrap().id;

    client.delete_page(id).await.unwrap();
    assert_eq!(client.fetch_page_by_id(id).await.unwrap(), None);
    workers.shutdown().await;
}

#[tokio::test]
async fn names_are_listed_in_lexicographic_order() {
    let dir = TempDir::new().unwrap();
    let workers = deploy(&dir).await;
    let client = workers.client();

    client.create_page("B", "").await.unwrap();
    client.create_page("A", "").await.unwrap();
    client.create_page("C", "").await.unwrap();

    assert_eq!(client.fetch_all_pages().await.unwrap(), vec!["A", "B", "C"]);
    workers.shutdown().await;
}

#[tokio::test]
async fn missing_page_resolves_successfully() {
    let dir = TempDir::new().unwrap();
    let workers = deploy(&dir).await;
    let client = workers.client();

    assert_eq!(client.fetch_page_by_id(9999).await, Ok(None));
    assert_eq!(client.fetch_page("Nowhere").await, Ok(None));
    workers.shutdown().await;
}

#[tokio::test]
async fn save_overwrites_and_keeps_name() {
    let dir = TempDir::new().unwrap();
    let workers = deploy(&dir).await;
    let client = workers.client();

    client.create_page("Notes", "draft").await.unwrap();
    let id = client.fetch_page("Notes").await.unwrap().unwrap().id;
    client.save_page(id, "final").await.unwrap();

    let page = client.fetch_page_by_id(id).await.unwrap().unwrap();
    assert_eq!(page.name, "Notes");
    assert_eq!(page.content, "final");

    // No page with this id: still a success
    assert!(client.save_page(id + 1000, "ghost").await.is_ok());
    workers.shutdown().await;
}

#[tokio::test]
async fn unregistered_address_fails_fast() {
    let bus = EventBus::new();
    let client = PageServiceClient::new(bus, "wikidb.queue");

    let outcome = tokio::time::timeout(Duration::from_secs(1), client.fetch_all_pages())
        .await
        .expect("call blocked instead of failing");
    assert!(matches!(
        outcome,
        Err(ServiceError::Transport(BusError::NoHandlers { .. }))
    ));
}

#[tokio::test]
async fn pool_never_exceeds_its_size() {
    let dir = TempDir::new().unwrap();
    let workers = WorkerPool::deploy(&config_for(&dir, 2, 4), EventBus::new())
        .await
        .unwrap();
    let client = workers.client();

    let creates = (0..16).map(|i| {
        let client = client.clone();
        async move { client.create_page(&format!("page-{:02}", i), "body").await }
    });
    for result in join_all(creates).await {
        result.unwrap();
    }

    let pool = workers.pool();
    assert!(pool.peak_checked_out() <= 2, "peak was {}", pool.peak_checked_out());
    assert_eq!(pool.checked_out(), 0);
    assert_eq!(client.fetch_all_pages().await.unwrap().len(), 16);
    workers.shutdown().await;
}

#[tokio::test]
async fn each_request_is_served_exactly_once() {
    let dir = TempDir::new().unwrap();
    let workers = deploy(&dir).await;
    let client = workers.client();

    let creates = (0..30).map(|i| {
        let client = client.clone();
        async move { client.create_page(&format!("p{}", i), "x").await }
    });
    let results = join_all(creates).await;

    // A duplicate delivery would surface as a Conflict on the second run
    assert!(results.iter().all(Result::is_ok));
    assert_eq!(client.fetch_all_pages_data().await.unwrap().len(), 30);
    workers.shutdown().await;
}
