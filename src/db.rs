use crate::Result;
use crate::config::DatabaseSettings;
use ohno::{IntoAppError, bail};
use tokio_postgres::{NoTls, SimpleQueryMessage};

/// Log target for database operations
const LOG_TARGET: &str = "        db";

/// A `(schema, table)` destination in the target store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableRef {
    pub schema: &'static str,
    pub table: &'static str,
}

impl TableRef {
    /// Fully qualified name with quoted identifiers, for SQL statements.
    #[must_use]
    pub fn qualified(&self) -> String {
        format!("{}.{}", quote_ident(self.schema), quote_ident(self.table))
    }

    /// Unquoted `schema.table` form, as the external conversion tool expects it.
    #[must_use]
    pub fn dotted(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

/// Quote an identifier so arbitrary column names survive, including
/// digits-only names and reserved words.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Tabular result of a row-producing statement.
#[derive(Debug)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

/// The single long-lived database connection shared by every pipeline step.
///
/// Statements are executed through the simple query protocol and
/// auto-committed; no transaction spans more than one statement.
#[derive(Debug)]
pub struct Database {
    client: tokio_postgres::Client,
}

impl Database {
    /// Open the connection used for the whole run.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self> {
        let (client, connection) = settings
            .client_config()
            .connect(NoTls)
            .await
            .into_app_err_with(|| format!("could not connect to database '{}' on {}:{}", settings.name, settings.host, settings.port))?;

        // The connection object drives the socket; it runs until the client is dropped.
        drop(tokio::spawn(async move {
            if let Err(e) = connection.await {
                log::error!(target: LOG_TARGET, "database connection error: {e}");
            }
        }));

        log::debug!(target: LOG_TARGET, "connected to database '{}' on {}:{}", settings.name, settings.host, settings.port);
        Ok(Self { client })
    }

    /// Execute one raw statement.
    ///
    /// Returns `Some` with column names and stringly-typed row values when the
    /// statement produces rows, `None` otherwise.
    pub async fn execute(&self, sql: &str) -> Result<Option<QueryOutput>> {
        log::debug!(target: LOG_TARGET, "executing: {}", sql.trim());

        let messages = self
            .client
            .simple_query(sql)
            .await
            .into_app_err_with(|| format!("statement failed: {}", sql.trim()))?;

        let mut columns = Vec::new();
        let mut rows = Vec::new();
        for message in messages {
            if let SimpleQueryMessage::Row(row) = message {
                if columns.is_empty() {
                    columns = row.columns().iter().map(|c| c.name().to_string()).collect();
                }

                rows.push((0..row.len()).map(|i| row.get(i).map(str::to_string)).collect());
            }
        }

        if columns.is_empty() && rows.is_empty() {
            return Ok(None);
        }

        Ok(Some(QueryOutput { columns, rows }))
    }

    /// Row count of a destination table.
    pub async fn count(&self, table: TableRef) -> Result<i64> {
        let sql = format!("SELECT count(*) FROM {}", table.qualified());
        let output = self.execute(&sql).await?;

        let Some(output) = output else {
            bail!("count query against {} produced no rows", table.dotted());
        };

        let value = output
            .rows
            .first()
            .and_then(|row| row.first())
            .and_then(Option::as_deref)
            .into_app_err_with(|| format!("count query against {} produced no value", table.dotted()))?;

        value
            .parse::<i64>()
            .into_app_err_with(|| format!("count query against {} produced a non-numeric value '{value}'", table.dotted()))
    }
}
