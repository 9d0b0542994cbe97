use crate::Result;
use crate::db::{Database, TableRef, quote_ident};
use crate::ingest::schema::InferredSchema;
use core::fmt::Write as _;
use ohno::EnrichableExt;

/// Log target for table provisioning
const LOG_TARGET: &str = " provision";

/// Cascading drop, so dependent objects (a prior materialized view built on
/// this table would otherwise block the drop) go away with it.
#[must_use]
pub fn drop_table_sql(dest: TableRef) -> String {
    format!("DROP TABLE IF EXISTS {} CASCADE", dest.qualified())
}

/// `CREATE TABLE` with one column per inferred field. Identifiers are quoted
/// so digits-only or reserved-word column names survive.
#[must_use]
pub fn create_table_sql(dest: TableRef, schema: &InferredSchema, if_not_exists: bool) -> String {
    let mut sql = String::from("CREATE TABLE ");
    if if_not_exists {
        sql.push_str("IF NOT EXISTS ");
    }

    let _ = write!(sql, "{} (", dest.qualified());
    for (i, column) in schema.columns.iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }

        let _ = write!(sql, "{} {}", quote_ident(&column.name), column.sql_type);
    }

    sql.push(')');
    sql
}

/// Make sure the destination schema exists before anything is created in it.
pub async fn ensure_schema(db: &Database, schema: &str) -> Result<()> {
    let _ = db.execute(&format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(schema))).await?;
    Ok(())
}

/// Idempotently (re)create a destination table from an inferred schema.
///
/// With `overwrite` the prior table and its dependents are dropped first;
/// without it an existing table is left untouched and assumed compatible.
pub async fn provision(db: &Database, dest: TableRef, schema: &InferredSchema, overwrite: bool) -> Result<()> {
    let result = provision_inner(db, dest, schema, overwrite).await;
    result.map_err(|e| e.enrich_with(|| format!("could not provision table {}", dest.dotted())))
}

async fn provision_inner(db: &Database, dest: TableRef, schema: &InferredSchema, overwrite: bool) -> Result<()> {
    if overwrite {
        let _ = db.execute(&drop_table_sql(dest)).await?;
        let _ = db.execute(&create_table_sql(dest, schema, false)).await?;
    } else {
        let _ = db.execute(&create_table_sql(dest, schema, true)).await?;
    }

    log::info!(target: LOG_TARGET, "table {} ready with {} columns", dest.dotted(), schema.columns.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::schema::{ColumnSpec, INFERRED_SQL_TYPE};

    const DEST: TableRef = TableRef {
        schema: "istat",
        table: "census_sections",
    };

    fn schema_of(names: &[&str]) -> InferredSchema {
        InferredSchema {
            columns: names
                .iter()
                .map(|n| ColumnSpec {
                    name: (*n).to_string(),
                    sql_type: INFERRED_SQL_TYPE,
                })
                .collect(),
        }
    }

    #[test]
    fn test_drop_is_cascading() {
        assert_eq!(drop_table_sql(DEST), "DROP TABLE IF EXISTS \"istat\".\"census_sections\" CASCADE");
    }

    #[test]
    fn test_create_quotes_every_identifier() {
        let sql = create_table_sql(DEST, &schema_of(&["id", "2011", "user"]), false);
        assert_eq!(
            sql,
            "CREATE TABLE \"istat\".\"census_sections\" (\"id\" integer, \"2011\" integer, \"user\" integer)"
        );
    }

    #[test]
    fn test_create_preserves_column_order() {
        let sql = create_table_sql(DEST, &schema_of(&["z", "a", "m"]), false);
        let z = sql.find("\"z\"").unwrap();
        let a = sql.find("\"a\"").unwrap();
        let m = sql.find("\"m\"").unwrap();
        assert!(z < a && a < m);
    }

    #[test]
    fn test_append_mode_creates_only_if_missing() {
        let sql = create_table_sql(DEST, &schema_of(&["id"]), true);
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS "));
    }
}
