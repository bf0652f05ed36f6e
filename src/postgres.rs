//! PostgreSQL store backend.

use logsim_core::{classify_store_message, LogRecord, Store, StoreConnector, StoreError};
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use tokio_postgres::NoTls;

/// Connector minting PostgreSQL-backed store connections for the pool.
pub struct PostgresConnector {
    config: tokio_postgres::Config,
}

impl PostgresConnector {
    /// Parse a connection string (`host=... user=... dbname=...`).
    pub fn new(params: &str) -> Result<Self, StoreError> {
        let config = params
            .parse::<tokio_postgres::Config>()
            .map_err(|e| StoreError::Fatal(format!("invalid connection string: {e}")))?;
        Ok(Self { config })
    }
}

#[async_trait::async_trait]
impl StoreConnector for PostgresConnector {
    async fn connect(&self) -> Result<Box<dyn Store>, StoreError> {
        let (client, connection) = self
            .config
            .connect(NoTls)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        // The connection object drives the socket; it runs until the client
        // is dropped.
        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!("postgres connection task ended: {e}");
            }
        });

        Ok(Box::new(PostgresStore { client, driver }))
    }
}

/// One PostgreSQL session.
pub struct PostgresStore {
    client: tokio_postgres::Client,
    driver: tokio::task::JoinHandle<()>,
}

#[async_trait::async_trait]
impl Store for PostgresStore {
    async fn execute(&mut self, query: &str, rows: Option<&[LogRecord]>) -> Result<(), StoreError> {
        match rows {
            None => self
                .client
                .batch_execute(query)
                .await
                .map_err(map_postgres_error),
            Some(rows) => {
                if rows.is_empty() {
                    return Ok(());
                }

                let sql = format!(
                    "{query} {}",
                    values_clause(rows.len(), LogRecord::COLUMNS.len())
                );

                let mut params: Vec<&(dyn ToSql + Sync)> =
                    Vec::with_capacity(rows.len() * LogRecord::COLUMNS.len());
                for record in rows {
                    params.push(&record.timestamp);
                    params.push(&record.login);
                    params.push(&record.event);
                    params.push(&record.subsystem);
                    params.push(&record.comment);
                    params.push(&record.description);
                }

                self.client
                    .execute(sql.as_str(), &params)
                    .await
                    .map(|_| ())
                    .map_err(map_postgres_error)
            }
        }
    }

    async fn close(self: Box<Self>) {
        // Dropping the client terminates the session; give the driver task a
        // moment to wind down before detaching it.
        let this = *self;
        drop(this.client);
        let _ = tokio::time::timeout(std::time::Duration::from_secs(1), this.driver).await;
    }
}

/// Build the `($1, $2, ...), ($7, ...)` placeholder tuples for a multi-row
/// INSERT.
fn values_clause(row_count: usize, column_count: usize) -> String {
    let mut clause = String::new();
    for row in 0..row_count {
        if row > 0 {
            clause.push_str(", ");
        }
        clause.push('(');
        for column in 0..column_count {
            if column > 0 {
                clause.push_str(", ");
            }
            clause.push('$');
            clause.push_str(&(row * column_count + column + 1).to_string());
        }
        clause.push(')');
    }
    clause
}

/// Map a tokio-postgres error into the store taxonomy.
///
/// Transport-level failures mark the connection dead. Database errors are
/// tagged transient when the server cancelled the statement (timeout) or
/// refused on connection pressure (overload), or when the message carries a
/// retryable signature; everything else is fatal.
fn map_postgres_error(err: tokio_postgres::Error) -> StoreError {
    if err.is_closed() {
        return StoreError::Connection(err.to_string());
    }

    if let Some(db_err) = err.as_db_error() {
        if db_err.code() == &SqlState::QUERY_CANCELED
            || db_err.code() == &SqlState::TOO_MANY_CONNECTIONS
        {
            return StoreError::Transient(db_err.message().to_string());
        }
        return classify_store_message(db_err.message());
    }

    // No database error payload means the failure happened on the wire.
    StoreError::Connection(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_clause_single_row() {
        assert_eq!(values_clause(1, 6), "($1, $2, $3, $4, $5, $6)");
    }

    #[test]
    fn test_values_clause_numbers_across_rows() {
        assert_eq!(
            values_clause(3, 2),
            "($1, $2), ($3, $4), ($5, $6)"
        );
    }

    #[test]
    fn test_insert_statement_shape() {
        let sql = format!(
            "{} {}",
            logsim_core::insert_query("logs_insert_test"),
            values_clause(2, 6)
        );
        assert_eq!(
            sql,
            "INSERT INTO logs_insert_test (timestamp, login, event, subsystem, comment, description) \
             VALUES ($1, $2, $3, $4, $5, $6), ($7, $8, $9, $10, $11, $12)"
        );
    }

    #[test]
    fn test_rejects_invalid_connection_string() {
        assert!(PostgresConnector::new("not a =valid= string==").is_err());
    }
}
