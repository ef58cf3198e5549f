use crate::database::connection::{ echo_sql, Database };
use crate::database::models::{ DatabaseResult, ItemStashRow, Sale, SaleObservation };
use crate::database::unix_now;
use rusqlite::{ params, OptionalExtension, Row };

impl Database {
    /// Upsert the sale row for an item, returning the sale's primary key
    ///
    /// Keyed on `item_id`; a re-observed offer refreshes the price fields
    /// and clears the chaos value until the next valuation writes it back.
    pub fn upsert_sale(
        &self,
        row: &ItemStashRow,
        name: &str,
        is_currency: bool,
        sale_currency: &str,
        sale_amount: f64
    ) -> DatabaseResult<i64> {
        let conn = self.conn.lock().unwrap();
        let now = unix_now();

        let existing: Option<i64> = conn
            .query_row("SELECT id FROM sale WHERE item_id = ?1", [row.item_id], |r| r.get(0))
            .optional()?;

        if let Some(id) = existing {
            conn.execute(
                "UPDATE sale SET
                    name = ?1, is_currency = ?2, sale_currency = ?3,
                    sale_amount = ?4, sale_amount_chaos = NULL,
                    item_updated_at = ?5, updated_at = ?6
                 WHERE id = ?7",
                params![name, is_currency as i64, sale_currency, sale_amount, row.updated_at, now, id]
            )?;
            Ok(id)
        } else {
            conn.execute(
                "INSERT INTO sale (
                    item_id, item_api_id, name, is_currency, sale_currency,
                    sale_amount, sale_amount_chaos, item_updated_at,
                    created_at, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7, ?8, ?8)",
                params![
                    row.item_id,
                    row.item_api_id,
                    name,
                    is_currency as i64,
                    sale_currency,
                    sale_amount,
                    row.updated_at,
                    now
                ]
            )?;
            Ok(conn.last_insert_rowid())
        }
    }

    /// Record the chaos value computed for a sale
    pub fn set_sale_chaos(&self, sale_id: i64, amount_chaos: f64) -> DatabaseResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE sale SET sale_amount_chaos = ?1 WHERE id = ?2",
            params![amount_chaos, sale_id]
        )?;
        Ok(())
    }

    /// The item update time of the most recently processed sale, i.e. the
    /// processor's resume point
    pub fn last_processed_item_time(&self) -> DatabaseResult<Option<i64>> {
        let conn = self.conn.lock().unwrap();
        let time: Option<i64> = conn
            .query_row(
                "SELECT item_updated_at FROM sale ORDER BY item_updated_at DESC LIMIT 1",
                [],
                |row| row.get(0)
            )
            .optional()?;
        Ok(time)
    }

    /// Historical observations for one `(name, currency, league)` bucket,
    /// restricted to sales after `cutoff`
    pub fn bucket_observations(
        &self,
        name: &str,
        sale_currency: &str,
        league: &str,
        cutoff: i64
    ) -> DatabaseResult<Vec<SaleObservation>> {
        let conn = self.conn.lock().unwrap();
        echo_sql("SELECT sale_amount, item_updated_at FROM sale JOIN item ...");

        let mut stmt = conn.prepare(
            "SELECT sale.sale_amount, sale.item_updated_at
             FROM sale
             JOIN item ON sale.item_id = item.id
             WHERE sale.name = ?1
               AND item.league = ?2
               AND sale.sale_currency = ?3
               AND sale.item_updated_at > ?4"
        )?;

        let rows = stmt
            .query_map(params![name, league, sale_currency, cutoff], |row| {
                Ok(SaleObservation {
                    sale_amount: row.get(0)?,
                    item_updated_at: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }

    /// Fetch a sale by its item's row id
    pub fn get_sale_by_item_id(&self, item_id: i64) -> DatabaseResult<Option<Sale>> {
        let conn = self.conn.lock().unwrap();
        let sale = conn
            .query_row(
                "SELECT id, item_id, item_api_id, name, is_currency, sale_currency,
                        sale_amount, sale_amount_chaos, item_updated_at,
                        created_at, updated_at
                 FROM sale WHERE item_id = ?1",
                [item_id],
                row_to_sale
            )
            .optional()?;
        Ok(sale)
    }

    /// Fetch a sale by its item's external id
    pub fn get_sale_by_item_api_id(&self, item_api_id: &str) -> DatabaseResult<Option<Sale>> {
        let conn = self.conn.lock().unwrap();
        let sale = conn
            .query_row(
                "SELECT id, item_id, item_api_id, name, is_currency, sale_currency,
                        sale_amount, sale_amount_chaos, item_updated_at,
                        created_at, updated_at
                 FROM sale WHERE item_api_id = ?1",
                [item_api_id],
                row_to_sale
            )
            .optional()?;
        Ok(sale)
    }

    /// Total number of recorded sales
    pub fn count_sales(&self) -> DatabaseResult<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sale", [], |row| row.get(0))?;
        Ok(count)
    }
}

/// Helper to convert a database row to a Sale
fn row_to_sale(row: &Row) -> rusqlite::Result<Sale> {
    Ok(Sale {
        id: row.get(0)?,
        item_id: row.get(1)?,
        item_api_id: row.get(2)?,
        name: row.get(3)?,
        is_currency: row.get::<_, i64>(4)? != 0,
        sale_currency: row.get(5)?,
        sale_amount: row.get(6)?,
        sale_amount_chaos: row.get(7)?,
        item_updated_at: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}
