//! The two canned analytical queries run against the materialized view, plus
//! the console table they print into.

use crate::datasets::VIEW_DEST;
use crate::db::QueryOutput;
use core::fmt::Write as _;

const COLUMN_GAP: usize = 2;

/// Per-municipality population density for one province, densest first.
#[must_use]
pub fn density_sql(province: &str) -> String {
    let province = province.replace('\'', "''");
    format!(
        "SELECT \"comune\", \
                \"total_population\", \
                round((\"total_population\" / nullif(\"area_m2\", 0)) * 1000000.0) AS \"people_per_km2\" \
         FROM {view} \
         WHERE \"provincia\" = '{province}' \
         ORDER BY \"people_per_km2\" DESC NULLS LAST",
        view = VIEW_DEST.qualified(),
    )
}

/// Top-10 provinces ranked by university-educated population share.
#[must_use]
pub fn top_provinces_sql() -> String {
    format!(
        "SELECT \"provincia\", \
                sum(\"total_population\") AS \"total_population\", \
                sum(\"university_educated\") AS \"university_educated\", \
                round(sum(\"university_educated\")::numeric / nullif(sum(\"total_population\"), 0) * 100.0, 2) AS \"share_pct\" \
         FROM {view} \
         GROUP BY \"provincia\" \
         ORDER BY \"share_pct\" DESC NULLS LAST \
         LIMIT 10",
        view = VIEW_DEST.qualified(),
    )
}

/// Render a result set as an aligned text table.
#[must_use]
pub fn render_table(output: &QueryOutput) -> String {
    let mut widths: Vec<usize> = output.columns.iter().map(String::len).collect();
    for row in &output.rows {
        for (i, cell) in row.iter().enumerate() {
            let len = cell.as_deref().unwrap_or("").len();
            if len > widths[i] {
                widths[i] = len;
            }
        }
    }

    let mut text = String::new();
    for (i, column) in output.columns.iter().enumerate() {
        let _ = write!(text, "{:<width$}{}", column, " ".repeat(COLUMN_GAP), width = widths[i]);
    }
    text.push('\n');

    for (i, width) in widths.iter().enumerate() {
        let _ = write!(text, "{}{}", "-".repeat(*width), " ".repeat(if i + 1 < widths.len() { COLUMN_GAP } else { 0 }));
    }
    text.push('\n');

    for row in &output.rows {
        for (i, cell) in row.iter().enumerate() {
            let _ = write!(text, "{:<width$}{}", cell.as_deref().unwrap_or(""), " ".repeat(COLUMN_GAP), width = widths[i]);
        }
        text.push('\n');
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_density_sql_escapes_quotes_in_the_province_name() {
        let sql = density_sql("L'Aquila");
        assert!(sql.contains("'L''Aquila'"));
    }

    #[test]
    fn test_density_sql_filters_one_province() {
        let sql = density_sql("Milano");
        assert!(sql.contains("WHERE \"provincia\" = 'Milano'"));
        assert!(sql.contains("\"istat\".\"municipality_stats\""));
    }

    #[test]
    fn test_top_provinces_sql_is_limited_to_ten() {
        let sql = top_provinces_sql();
        assert!(sql.ends_with("LIMIT 10"));
        assert!(sql.contains("GROUP BY \"provincia\""));
    }

    #[test]
    fn test_render_table_aligns_columns() {
        let output = QueryOutput {
            columns: vec!["comune".to_string(), "pop".to_string()],
            rows: vec![
                vec![Some("Milano".to_string()), Some("1242123".to_string())],
                vec![Some("Rho".to_string()), None],
            ],
        };

        let text = render_table(&output);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("comune"));
        assert!(lines[1].starts_with("------"));
        assert!(lines[2].contains("Milano"));
        assert!(lines[3].starts_with("Rho"));
    }
}
