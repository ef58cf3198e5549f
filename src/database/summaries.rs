use crate::database::connection::{ echo_sql, Database };
use crate::database::models::{ CurrencySummary, DatabaseResult };
use crate::database::unix_now;
use rusqlite::{ params, OptionalExtension, Row };

impl Database {
    /// Fetch the summary for one `(from, to, league)` bucket
    pub fn get_summary(
        &self,
        from_currency: &str,
        to_currency: &str,
        league: &str
    ) -> DatabaseResult<Option<CurrencySummary>> {
        let conn = self.conn.lock().unwrap();
        let summary = conn
            .query_row(
                &format!("{} WHERE from_currency = ?1 AND to_currency = ?2 AND league = ?3", SELECT_SUMMARY),
                params![from_currency, to_currency, league],
                row_to_summary
            )
            .optional()?;
        Ok(summary)
    }

    /// Upsert the statistics for one bucket; insert stamps `created_at`
    pub fn upsert_summary(
        &self,
        from_currency: &str,
        to_currency: &str,
        league: &str,
        count: i64,
        mean: f64,
        standard_dev: f64,
        weight: f64
    ) -> DatabaseResult<()> {
        let conn = self.conn.lock().unwrap();
        let now = unix_now();

        conn.execute(
            "INSERT INTO currency_summary (
                from_currency, to_currency, league, count, mean,
                standard_dev, weight, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
             ON CONFLICT(from_currency, to_currency, league) DO UPDATE SET
                count = excluded.count,
                mean = excluded.mean,
                standard_dev = excluded.standard_dev,
                weight = excluded.weight,
                updated_at = excluded.updated_at",
            params![from_currency, to_currency, league, count, mean, standard_dev, weight, now]
        )?;

        Ok(())
    }

    /// Every currency name observed as a summary's from-side, for the
    /// dynamic alias map
    pub fn distinct_from_currencies(&self) -> DatabaseResult<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        echo_sql("SELECT DISTINCT from_currency FROM currency_summary");

        let mut stmt = conn.prepare("SELECT DISTINCT from_currency FROM currency_summary")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(names)
    }

    /// All exchange edges leaving `from_currency` in a league, most
    /// reliable first
    pub fn summaries_from(
        &self,
        from_currency: &str,
        league: &str
    ) -> DatabaseResult<Vec<CurrencySummary>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            &format!(
                "{} WHERE from_currency = ?1 AND league = ?2 ORDER BY weight DESC",
                SELECT_SUMMARY
            )
        )?;
        let rows = stmt
            .query_map(params![from_currency, league], row_to_summary)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }

    /// Total number of summary buckets
    pub fn count_summaries(&self) -> DatabaseResult<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM currency_summary",
            [],
            |row| row.get(0)
        )?;
        Ok(count)
    }
}

const SELECT_SUMMARY: &str =
    "SELECT id, from_currency, to_currency, league, count, mean,
            standard_dev, weight, created_at, updated_at
     FROM currency_summary";

/// Helper to convert a database row to a CurrencySummary
fn row_to_summary(row: &Row) -> rusqlite::Result<CurrencySummary> {
    Ok(CurrencySummary {
        id: row.get(0)?,
        from_currency: row.get(1)?,
        to_currency: row.get(2)?,
        league: row.get(3)?,
        count: row.get(4)?,
        mean: row.get(5)?,
        standard_dev: row.get(6)?,
        weight: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}
