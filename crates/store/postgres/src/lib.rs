//! PostgreSQL storage backend.
//!
//! Live-database conformance tests run with `cargo test -- --ignored`
//! against `LEADFLOW_TEST_DATABASE_URL`.

pub mod config;
pub mod migrations;
pub mod store;

pub use config::PostgresConfig;
pub use store::PostgresStore;

#[cfg(test)]
mod tests {
    use leadflow_store::testing::{
        run_definition_conformance_tests, run_enrollment_conformance_tests,
    };

    use super::*;

    async fn live_store() -> Option<PostgresStore> {
        let url = std::env::var("LEADFLOW_TEST_DATABASE_URL").ok()?;
        let config = PostgresConfig {
            url,
            table_prefix: "leadflow_test_".into(),
            ..PostgresConfig::default()
        };
        Some(PostgresStore::new(config).await.expect("connect"))
    }

    #[tokio::test]
    #[ignore = "requires a live PostgreSQL at LEADFLOW_TEST_DATABASE_URL"]
    async fn definition_conformance() {
        let Some(store) = live_store().await else {
            panic!("LEADFLOW_TEST_DATABASE_URL not set");
        };
        run_definition_conformance_tests(&store).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a live PostgreSQL at LEADFLOW_TEST_DATABASE_URL"]
    async fn enrollment_conformance() {
        let Some(store) = live_store().await else {
            panic!("LEADFLOW_TEST_DATABASE_URL not set");
        };
        run_enrollment_conformance_tests(&store).await.unwrap();
    }
}
