//! Mapping of sqlx failures onto `SearchError`

use std::time::Duration;

use mq_core::SearchError;

/// PostgreSQL `query_canceled`, raised when `statement_timeout` fires
const QUERY_CANCELED: &str = "57014";

/// Classify a driver error. `elapsed` is the time spent on the failed call.
pub fn classify(err: sqlx::Error, elapsed: Duration) -> SearchError {
    match err {
        sqlx::Error::PoolTimedOut => SearchError::unavailable("timed out acquiring a connection"),
        sqlx::Error::PoolClosed => SearchError::unavailable("connection pool is closed"),
        sqlx::Error::Io(e) => SearchError::unavailable(e.to_string()),
        sqlx::Error::Tls(e) => SearchError::unavailable(e.to_string()),
        sqlx::Error::Database(db) => {
            let code = db.code().map(|c| c.into_owned());
            match code.as_deref() {
                Some(QUERY_CANCELED) => SearchError::QueryTimeout {
                    elapsed_ms: elapsed.as_millis() as u64,
                },
                // class 08: connection exception
                Some(c) if c.starts_with("08") => SearchError::unavailable(db.message()),
                _ => SearchError::engine(db.message()),
            }
        }
        other => SearchError::engine(other.to_string()),
    }
}

/// Classify an error from a call that runs without a time budget
pub fn db_error(err: sqlx::Error) -> SearchError {
    classify(err, Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_are_unavailable() {
        let err = classify(sqlx::Error::PoolTimedOut, Duration::from_millis(5));
        assert!(matches!(err, SearchError::StoreUnavailable(_)));
        assert!(err.is_transient());

        let err = classify(sqlx::Error::PoolClosed, Duration::ZERO);
        assert!(matches!(err, SearchError::StoreUnavailable(_)));
    }

    #[test]
    fn test_io_error_is_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = classify(sqlx::Error::Io(io), Duration::ZERO);
        assert_eq!(err, SearchError::StoreUnavailable("refused".to_string()));
    }

    #[test]
    fn test_other_errors_are_engine_failures() {
        let err = classify(sqlx::Error::RowNotFound, Duration::ZERO);
        assert!(matches!(err, SearchError::Engine(_)));
        assert!(!err.is_transient());

        let err = classify(
            sqlx::Error::ColumnNotFound("team_name".to_string()),
            Duration::ZERO,
        );
        assert!(matches!(err, SearchError::Engine(msg) if msg.contains("team_name")));
    }
}
