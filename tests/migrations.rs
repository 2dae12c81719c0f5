#[cfg(test)]
mod tests {
    use replica_etl::migrate;
    use test_context::{test_context, AsyncTestContext};

    #[test]
    fn migration_versions_are_found_in_ascending_order() {
        let versions = migrate::migration_versions();
        assert!(!versions.is_empty());
        let mut sorted = versions.clone();
        sorted.sort();
        assert_eq!(versions, sorted, "sqlx::migrate! must discover files in numeric-prefix order");
    }

    /// Requires a disposable Postgres reachable at `TEST_DATABASE_URL`.
    struct MigrationTestContext {
        pool: sqlx::PgPool,
    }

    impl AsyncTestContext for MigrationTestContext {
        async fn setup() -> Self {
            let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set for this test");
            let pool = sqlx::PgPool::connect(&url).await.unwrap();
            MigrationTestContext { pool }
        }
    }

    /// Verifies that applying the migration directory twice is a no-op,
    /// matching each file's `CREATE TABLE/INDEX IF NOT EXISTS` guard.
    #[test_context(MigrationTestContext)]
    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL pointing at a disposable Postgres instance"]
    async fn applying_migrations_twice_is_idempotent(ctx: &mut MigrationTestContext) {
        migrate::apply(&ctx.pool).await.unwrap();
        let pending_after_first = migrate::pending_count(&ctx.pool).await.unwrap();
        assert_eq!(pending_after_first, 0);

        migrate::apply(&ctx.pool).await.unwrap();
        let pending_after_second = migrate::pending_count(&ctx.pool).await.unwrap();
        assert_eq!(pending_after_second, 0);
    }
}
