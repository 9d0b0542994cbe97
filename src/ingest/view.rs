use crate::Result;
use crate::datasets::{CENSUS_DEST, MUNICIPALITIES_DEST, VIEW_DEST};
use crate::db::{Database, TableRef};
use ohno::bail;
use std::collections::HashSet;

/// Log target for view materialization
const LOG_TARGET: &str = "      view";

/// Census columns the view SQL is coupled to. Names come verbatim from the
/// dataset's header row via schema inference, so they are a contract: drift
/// upstream must fail here with a named error, not as a database-level
/// column-not-found deep inside the DDL.
pub const REQUIRED_CENSUS_COLUMNS: &[&str] = &["CODPRO", "CODCOM", "PROVINCIA", "COMUNE", "P1", "P47"];

/// Boundary-layer columns the view SQL is coupled to, as the conversion tool
/// names them (laundered to lower case on layer creation).
pub const REQUIRED_MUNICIPALITY_COLUMNS: &[&str] = &["pro_com", "shape_area", "wkb_geometry"];

#[must_use]
pub fn drop_view_sql() -> String {
    format!("DROP TABLE IF EXISTS {} CASCADE", VIEW_DEST.qualified())
}

/// The join/aggregate statement building the analytical table.
///
/// The synthesized join key is the province code concatenated with the
/// zero-padded 3-digit municipality code, matched against the boundary
/// layer's combined municipal identifier. Aggregation leaves exactly one row
/// per municipality; the unique index makes that an enforced invariant.
#[must_use]
pub fn create_view_sql() -> String {
    format!(
        "CREATE TABLE {view} AS \
         SELECT m.\"pro_com\", \
                c.\"PROVINCIA\" AS \"provincia\", \
                c.\"COMUNE\" AS \"comune\", \
                sum(c.\"P1\") AS \"total_population\", \
                sum(c.\"P47\") AS \"university_educated\", \
                m.\"shape_area\", \
                ST_Area(m.\"wkb_geometry\"::geography) AS \"area_m2\", \
                m.\"wkb_geometry\" \
         FROM {census} c \
         JOIN {municipalities} m \
           ON c.\"CODPRO\"::text || lpad(c.\"CODCOM\"::text, 3, '0') = m.\"pro_com\"::text \
         GROUP BY m.\"pro_com\", c.\"PROVINCIA\", c.\"COMUNE\", m.\"shape_area\", m.\"wkb_geometry\"",
        view = VIEW_DEST.qualified(),
        census = CENSUS_DEST.qualified(),
        municipalities = MUNICIPALITIES_DEST.qualified(),
    )
}

#[must_use]
pub fn unique_index_sql() -> String {
    format!(
        "CREATE UNIQUE INDEX \"{}_pro_com_idx\" ON {} (\"pro_com\")",
        VIEW_DEST.table,
        VIEW_DEST.qualified()
    )
}

/// Rebuild the derived analytical table from the two freshly loaded datasets.
///
/// Validates the column contract against both source tables before issuing
/// any DDL, optionally drops the prior view (cascading), then creates the
/// table and its uniqueness constraint. Never incrementally updated.
pub async fn materialize(db: &Database, overwrite: bool) -> Result<()> {
    validate_contract(db, CENSUS_DEST, REQUIRED_CENSUS_COLUMNS).await?;
    validate_contract(db, MUNICIPALITIES_DEST, REQUIRED_MUNICIPALITY_COLUMNS).await?;

    if overwrite {
        let _ = db.execute(&drop_view_sql()).await?;
    }

    let _ = db.execute(&create_view_sql()).await?;
    let _ = db.execute(&unique_index_sql()).await?;

    let rows = db.count(VIEW_DEST).await?;
    log::info!(target: LOG_TARGET, "materialized {} with {rows} municipalities", VIEW_DEST.dotted());
    Ok(())
}

async fn validate_contract(db: &Database, table: TableRef, required: &[&str]) -> Result<()> {
    let sql = format!(
        "SELECT column_name FROM information_schema.columns WHERE table_schema = '{}' AND table_name = '{}'",
        table.schema, table.table
    );

    let present: HashSet<String> = match db.execute(&sql).await? {
        Some(output) => output.rows.iter().filter_map(|row| row.first().cloned().flatten()).collect(),
        None => HashSet::new(),
    };

    let missing: Vec<&str> = required.iter().filter(|c| !present.contains(**c)).copied().collect();
    if !missing.is_empty() {
        bail!(
            "cannot materialize the analytical view: table {} is missing required columns {}",
            table.dotted(),
            missing.join(", ")
        );
    }

    Ok(())
}
