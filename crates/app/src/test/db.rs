//! Database test utilities and shared infrastructure
//!
//! Isolation is database-level: every test gets its own freshly migrated
//! database inside one shared PostgreSQL container. Services commit their
//! transactions normally; clean state comes from the per-test database, not
//! from rollback tricks.

use once_cell::sync::Lazy;
use sqlx::{Connection, PgConnection, PgPool};
use testcontainers::{ContainerAsync, ImageExt, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres as PostgresImage;
use tokio::sync::{OnceCell, mpsc};

use crate::database::MIGRATOR;

const DB_USER: &str = "checkout_test";
const DB_PASSWORD: &str = "checkout_test_password";

/// Shared PostgreSQL container that starts once and is reused across tests.
static POSTGRES_CONTAINER: Lazy<OnceCell<ContainerAsync<PostgresImage>>> = Lazy::new(OnceCell::new);

/// Channel feeding the background database-drop task.
static CLEANUP_SENDER: Lazy<OnceCell<mpsc::UnboundedSender<String>>> = Lazy::new(OnceCell::new);

async fn init_postgres_container() -> ContainerAsync<PostgresImage> {
    PostgresImage::default()
        .with_user(DB_USER)
        .with_password(DB_PASSWORD)
        .with_db_name("checkout_test")
        .with_env_var("POSTGRES_INITDB_ARGS", "--auth-host=trust")
        .start()
        .await
        .expect("Failed to start PostgreSQL container")
}

fn container_host() -> String {
    std::env::var("TESTCONTAINERS_HOST_OVERRIDE").unwrap_or_else(|_| "localhost".to_string())
}

async fn server_url() -> String {
    let container = POSTGRES_CONTAINER
        .get_or_init(init_postgres_container)
        .await;

    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("Failed to get container port");

    format!(
        "postgresql://{DB_USER}:{DB_PASSWORD}@{}:{port}/postgres",
        container_host()
    )
}

async fn init_cleanup_task() -> mpsc::UnboundedSender<String> {
    let (sender, mut receiver) = mpsc::unbounded_channel::<String>();

    tokio::spawn(async move {
        while let Some(db_name) = receiver.recv().await {
            if let Err(err) = drop_database(&db_name).await {
                eprintln!("Failed to drop test database '{db_name}': {err}");
            }
        }
    });

    sender
}

async fn drop_database(db_name: &str) -> Result<(), sqlx::Error> {
    let mut conn = PgConnection::connect(&server_url().await).await?;

    sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\""))
        .execute(&mut conn)
        .await?;

    conn.close().await
}

/// One isolated, migrated database. Dropped in the background when this
/// handle goes out of scope.
#[derive(Debug, Clone)]
pub(crate) struct TestDb {
    pool: PgPool,
    name: String,
}

impl Drop for TestDb {
    fn drop(&mut self) {
        if let Some(sender) = CLEANUP_SENDER.get() {
            let _ = sender.send(self.name.clone());
        }
    }
}

impl TestDb {
    pub(crate) async fn new() -> Self {
        let _sender = CLEANUP_SENDER.get_or_init(init_cleanup_task).await;

        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_nanos();

        let thread_id = std::thread::current().id();

        let name =
            format!("checkout_test_{nanos}_{thread_id:?}").replace([':', ' ', '(', ')'], "");

        let server_url = server_url().await;

        let mut conn = PgConnection::connect(&server_url)
            .await
            .expect("Failed to connect to postgres database");

        sqlx::query(&format!("CREATE DATABASE \"{name}\""))
            .execute(&mut conn)
            .await
            .expect("Failed to create test database");

        conn.close()
            .await
            .expect("Failed to close admin connection");

        let database_url = server_url
            .rsplit_once('/')
            .map(|(base, _)| format!("{base}/{name}"))
            .expect("server url has a database segment");

        let pool = PgPool::connect(&database_url)
            .await
            .expect("Failed to create pool for test database");

        MIGRATOR
            .run(&pool)
            .await
            .expect("Failed to run migrations on test database");

        Self { pool, name }
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_database_is_migrated_and_queryable() {
        let test_db = TestDb::new().await;

        let result: i64 = sqlx::query_scalar("SELECT count(*) FROM products")
            .fetch_one(test_db.pool())
            .await
            .expect("products table should exist after migrations");

        assert_eq!(result, 0);
    }

    #[tokio::test]
    async fn each_test_db_is_isolated() {
        let db_a = TestDb::new().await;
        let db_b = TestDb::new().await;

        sqlx::query(
            "INSERT INTO users (uuid, username) \
             VALUES ('a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11', 'only-in-a')",
        )
            .execute(db_a.pool())
            .await
            .expect("insert into db_a should succeed");

        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM users")
            .fetch_one(db_b.pool())
            .await
            .expect("query against db_b should succeed");

        assert_eq!(count, 0, "rows must not leak between test databases");
    }
}
