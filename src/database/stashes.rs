use crate::database::connection::{ echo_sql, Database };
use crate::database::models::DatabaseResult;
use crate::database::unix_now;
use crate::stash_api::ApiStash;
use rusqlite::{ params, OptionalExtension };

impl Database {
    /// Upsert a stash from the feed, returning its row id
    ///
    /// With `with_items` set, the stash's current items are re-recorded:
    /// everything previously seen in the stash is marked inactive first,
    /// then each item in the feed payload flips back to active. Items the
    /// feed no longer reports stay inactive.
    pub fn insert_api_stash(&self, stash: &ApiStash, with_items: bool) -> DatabaseResult<i64> {
        let stash_id = self.upsert_stash(stash)?;

        if with_items {
            self.mark_stash_items_inactive(stash_id)?;
            for item in stash.valid_items() {
                self.insert_api_item(&item, stash_id)?;
            }
        }

        Ok(stash_id)
    }

    /// Insert or update the stash row itself, keyed on its external id
    fn upsert_stash(&self, stash: &ApiStash) -> DatabaseResult<i64> {
        let conn = self.conn.lock().unwrap();
        let now = unix_now();

        let existing: Option<i64> = conn
            .query_row("SELECT id FROM stash WHERE api_id = ?1", [&stash.id], |row| row.get(0))
            .optional()?;

        if let Some(id) = existing {
            conn.execute(
                "UPDATE stash SET
                    account_name = ?1, last_character_name = ?2, stash_name = ?3,
                    stash_type = ?4, public = ?5, updated_at = ?6
                 WHERE id = ?7",
                params![
                    stash.account_name,
                    stash.last_character_name,
                    stash.stash,
                    stash.stash_type,
                    stash.public as i64,
                    now,
                    id
                ]
            )?;
            Ok(id)
        } else {
            conn.execute(
                "INSERT INTO stash (
                    api_id, account_name, last_character_name, stash_name,
                    stash_type, public, created_at, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    stash.id,
                    stash.account_name,
                    stash.last_character_name,
                    stash.stash,
                    stash.stash_type,
                    stash.public as i64,
                    now,
                    now
                ]
            )?;
            Ok(conn.last_insert_rowid())
        }
    }

    /// Mark every item recorded in a stash as inactive
    pub fn mark_stash_items_inactive(&self, stash_id: i64) -> DatabaseResult<usize> {
        let conn = self.conn.lock().unwrap();
        echo_sql("UPDATE item SET active = 0 WHERE stash_id = ?");
        let rows = conn.execute("UPDATE item SET active = 0 WHERE stash_id = ?1", [stash_id])?;
        Ok(rows)
    }

    /// Active flag for an item, by external id (None when unknown)
    pub fn item_active(&self, api_id: &str) -> DatabaseResult<Option<bool>> {
        let conn = self.conn.lock().unwrap();
        let active: Option<i64> = conn
            .query_row("SELECT active FROM item WHERE api_id = ?1", [api_id], |row| row.get(0))
            .optional()?;
        Ok(active.map(|a| a != 0))
    }
}
