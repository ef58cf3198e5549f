use crate::database::connection::{ echo_sql, Database };
use crate::database::models::{ DatabaseResult, ItemStashRow };
use crate::database::unix_now;
use crate::stash_api::ApiItem;
use rusqlite::{ params, Row };
use serde_json::Value;

/// Serialize an optional JSON bag to its text column form
fn json_text(value: &Option<Value>) -> Option<String> {
    value.as_ref().map(|v| v.to_string())
}

impl Database {
    /// Upsert an item from the feed into its stash
    ///
    /// Keyed on the item's external id; re-observed items keep their row id
    /// and `created_at`, get refreshed attributes, and flip back to active.
    pub fn insert_api_item(&self, item: &ApiItem, stash_id: i64) -> DatabaseResult<()> {
        let conn = self.conn.lock().unwrap();
        let now = unix_now();

        conn.execute(
            "INSERT INTO item (
                api_id, stash_id, h, w, x, y,
                abyssJewel, artFilename, category, corrupted, cosmeticMods,
                craftedMods, descrText, duplicated, elder, enchantMods,
                explicitMods, flavourText, frameType, icon, identified, ilvl,
                implicitMods, inventoryId, isRelic, league, lockedToCharacter,
                maxStackSize, name, nextLevelRequirements, note, properties,
                prophecyDiffText, prophecyText, requirements, secDescrText,
                shaper, sockets, stackSize, support, talismanTier, typeLine,
                utilityMods, verified, active, created_at, updated_at
             ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26,
                ?27, ?28, ?29, ?30, ?31, ?32, ?33, ?34, ?35, ?36, ?37, ?38,
                ?39, ?40, ?41, ?42, ?43, ?44, 1, ?45, ?45
             )
             ON CONFLICT(api_id) DO UPDATE SET
                stash_id = excluded.stash_id,
                h = excluded.h, w = excluded.w, x = excluded.x, y = excluded.y,
                abyssJewel = excluded.abyssJewel,
                artFilename = excluded.artFilename,
                category = excluded.category,
                corrupted = excluded.corrupted,
                cosmeticMods = excluded.cosmeticMods,
                craftedMods = excluded.craftedMods,
                descrText = excluded.descrText,
                duplicated = excluded.duplicated,
                elder = excluded.elder,
                enchantMods = excluded.enchantMods,
                explicitMods = excluded.explicitMods,
                flavourText = excluded.flavourText,
                frameType = excluded.frameType,
                icon = excluded.icon,
                identified = excluded.identified,
                ilvl = excluded.ilvl,
                implicitMods = excluded.implicitMods,
                inventoryId = excluded.inventoryId,
                isRelic = excluded.isRelic,
                league = excluded.league,
                lockedToCharacter = excluded.lockedToCharacter,
                maxStackSize = excluded.maxStackSize,
                name = excluded.name,
                nextLevelRequirements = excluded.nextLevelRequirements,
                note = excluded.note,
                properties = excluded.properties,
                prophecyDiffText = excluded.prophecyDiffText,
                prophecyText = excluded.prophecyText,
                requirements = excluded.requirements,
                secDescrText = excluded.secDescrText,
                shaper = excluded.shaper,
                sockets = excluded.sockets,
                stackSize = excluded.stackSize,
                support = excluded.support,
                talismanTier = excluded.talismanTier,
                typeLine = excluded.typeLine,
                utilityMods = excluded.utilityMods,
                verified = excluded.verified,
                active = 1,
                updated_at = excluded.updated_at",
            params![
                item.id,
                stash_id,
                item.h,
                item.w,
                item.x,
                item.y,
                item.abyss_jewel as i64,
                item.art_filename,
                json_text(&item.category),
                item.corrupted as i64,
                json_text(&item.cosmetic_mods),
                json_text(&item.crafted_mods),
                item.descr_text,
                item.duplicated as i64,
                item.elder as i64,
                json_text(&item.enchant_mods),
                json_text(&item.explicit_mods),
                json_text(&item.flavour_text),
                item.frame_type,
                item.icon,
                item.identified as i64,
                item.ilvl,
                json_text(&item.implicit_mods),
                item.inventory_id,
                item.is_relic as i64,
                item.league,
                item.locked_to_character as i64,
                item.max_stack_size,
                item.clean_name(),
                json_text(&item.next_level_requirements),
                item.note,
                json_text(&item.properties),
                item.prophecy_diff_text,
                item.prophecy_text,
                json_text(&item.requirements),
                item.sec_descr_text,
                item.shaper as i64,
                json_text(&item.sockets),
                item.stack_size,
                item.support as i64,
                item.talisman_tier,
                item.clean_type_line(),
                json_text(&item.utility_mods),
                item.verified as i64,
                now
            ]
        )?;

        Ok(())
    }

    /// Fetch one block of items joined to their public stashes, in
    /// ascending `(updated_at, created_at, id)` order
    ///
    /// `start` restricts to items updated at or after that time; the
    /// processor derives it from the last recorded sale to resume.
    pub fn fetch_process_block(
        &self,
        start: Option<i64>,
        block_size: u32,
        offset: u64
    ) -> DatabaseResult<Vec<ItemStashRow>> {
        let conn = self.conn.lock().unwrap();

        let mut sql = String::from(
            "SELECT item.id, item.api_id, item.name, item.typeLine, item.note,
                    item.league, item.category, item.updated_at, stash.stash_name
             FROM item
             JOIN stash ON stash.id = item.stash_id
             WHERE stash.public = 1"
        );
        if start.is_some() {
            sql.push_str(" AND item.updated_at >= ?3");
        }
        sql.push_str(
            " ORDER BY item.updated_at, item.created_at, item.id
              LIMIT ?1 OFFSET ?2"
        );
        echo_sql(&sql);

        let mut stmt = conn.prepare(&sql)?;
        let map_row = |row: &Row| -> rusqlite::Result<ItemStashRow> {
            let category_text: Option<String> = row.get(6)?;
            Ok(ItemStashRow {
                item_id: row.get(0)?,
                item_api_id: row.get(1)?,
                name: row.get(2)?,
                type_line: row.get(3)?,
                note: row.get(4)?,
                league: row.get(5)?,
                category: category_text.and_then(|t| serde_json::from_str(&t).ok()),
                updated_at: row.get(7)?,
                stash_name: row.get(8)?,
            })
        };

        let rows = if let Some(start) = start {
            stmt.query_map(params![block_size, offset as i64, start], map_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
            stmt.query_map(params![block_size, offset as i64], map_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?
        };

        Ok(rows)
    }
}
