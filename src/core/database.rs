use crate::core::config::DatabaseConfig;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};
use std::borrow::Cow;
use std::time::Duration;

/// PostgreSQL error code raised when `lock_timeout` expires
const LOCK_NOT_AVAILABLE: &str = "55P03";

/// PostgreSQL error code for unique constraint violations
const UNIQUE_VIOLATION: &str = "23505";

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .connect(&config.url)
        .await
}

/// Begin a transaction whose row lock waits are capped at `lock_timeout`.
///
/// A lock wait that exceeds the budget fails the statement with
/// [`is_lock_timeout`] instead of blocking the request.
pub async fn begin_with_lock_timeout(
    pool: &PgPool,
    lock_timeout: Duration,
) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    // SET does not accept bind parameters
    let statement = format!("SET LOCAL lock_timeout = '{}ms'", lock_timeout.as_millis());
    sqlx::query(&statement).execute(&mut *tx).await?;
    Ok(tx)
}

pub fn is_lock_timeout(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.code() == Some(Cow::Borrowed(LOCK_NOT_AVAILABLE)))
}

/// Name of the violated unique constraint, if `e` is a unique violation.
pub fn unique_violation_constraint(e: &sqlx::Error) -> Option<String> {
    match e {
        sqlx::Error::Database(db_err) if db_err.code() == Some(Cow::Borrowed(UNIQUE_VIOLATION)) => {
            Some(db_err.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    }
}

/// A database error carrying only a SQLSTATE code
#[cfg(test)]
pub(crate) fn pg_error(code: &'static str) -> sqlx::Error {
    #[derive(Debug)]
    struct PgCode(&'static str);

    impl std::fmt::Display for PgCode {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "SQLSTATE {}", self.0)
        }
    }

    impl std::error::Error for PgCode {}

    impl sqlx::error::DatabaseError for PgCode {
        fn message(&self) -> &str {
            self.0
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.0))
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::Other
        }
    }

    sqlx::Error::Database(Box::new(PgCode(code)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_timeout_detection() {
        assert!(is_lock_timeout(&pg_error(LOCK_NOT_AVAILABLE)));
        assert!(!is_lock_timeout(&pg_error(UNIQUE_VIOLATION)));
        assert!(!is_lock_timeout(&sqlx::Error::RowNotFound));
    }
}
