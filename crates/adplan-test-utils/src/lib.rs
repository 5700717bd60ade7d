//! PostgreSQL fixture for adplan integration tests.
//!
//! One server is shared per test binary; every test gets its own freshly
//! migrated database on it.
//!
//! - With **`ADPLAN_TEST_PG_URL`** set, that server is used as-is.
//! - Otherwise a container is started through testcontainers on first use
//!   and kept alive in a `OnceCell` for the rest of the binary.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use testcontainers::ContainerAsync;
use testcontainers::ImageExt;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

use adplan_db::pool;

pub const TEST_PG_URL_ENV: &str = "ADPLAN_TEST_PG_URL";

struct SharedServer {
    /// Server root URL, no database name.
    base_url: String,
    _container: Option<ContainerAsync<Postgres>>,
}

static SHARED: OnceCell<SharedServer> = OnceCell::const_new();

async fn start_server() -> SharedServer {
    if let Ok(url) = std::env::var(TEST_PG_URL_ENV) {
        return SharedServer {
            base_url: url.trim_end_matches('/').to_string(),
            _container: None,
        };
    }

    let container = Postgres::default()
        .with_tag("16-alpine")
        .start()
        .await
        .expect("failed to start PostgreSQL container");
    let host = container.get_host().await.expect("failed to get host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("failed to get mapped port");

    SharedServer {
        base_url: format!("postgresql://postgres:postgres@{host}:{port}"),
        _container: Some(container),
    }
}

/// Root URL of the shared server.
pub async fn pg_url() -> &'static str {
    &SHARED.get_or_init(start_server).await.base_url
}

async fn connect(url: &str, max_connections: u32) -> PgPool {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(url)
        .await
        .unwrap_or_else(|e| panic!("failed to connect to {url}: {e}"))
}

/// A throwaway, migrated database.
pub struct TestDb {
    pub pool: PgPool,
    pub name: String,
}

impl TestDb {
    /// Create a uniquely named database and apply the migrations.
    pub async fn create() -> Self {
        let base_url = pg_url().await;
        let maint = connect(&format!("{base_url}/postgres"), 1).await;

        let name = format!("adplan_test_{}", Uuid::new_v4().simple());
        maint
            .execute(format!("CREATE DATABASE {name}").as_str())
            .await
            .unwrap_or_else(|e| panic!("failed to create test database {name}: {e}"));
        maint.close().await;

        let pool = connect(&format!("{base_url}/{name}"), 5).await;
        pool::run_migrations(&pool)
            .await
            .expect("migrations should succeed");

        Self { pool, name }
    }

    /// Close the pool and drop the database. Safe to call on a database that
    /// is already gone.
    pub async fn drop_db(self) {
        self.pool.close().await;

        let base_url = pg_url().await;
        let maint = connect(&format!("{base_url}/postgres"), 1).await;
        let terminate = format!(
            "SELECT pg_terminate_backend(pid) FROM pg_stat_activity \
             WHERE datname = '{}' AND pid <> pg_backend_pid()",
            self.name
        );
        let _ = maint.execute(terminate.as_str()).await;
        let _ = maint
            .execute(format!("DROP DATABASE IF EXISTS {}", self.name).as_str())
            .await;
        maint.close().await;
    }
}
