use crate::database::models::DatabaseConfig;
use crate::logger::{ self, LogTag };
use anyhow::{ Context, Result };
use rusqlite::Connection;
use std::sync::Mutex;

/// Main database connection wrapper
///
/// All access goes through one connection behind a mutex; the processor is
/// single-threaded and serializes every write, the lock only guards against
/// accidental cross-task use.
pub struct Database {
    pub(crate) conn: Mutex<Connection>,
}

impl Database {
    /// Open a database and create any missing tables
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).with_context(||
            format!("Failed to open database: {}", db_path)
        )?;

        let db = Self {
            conn: Mutex::new(conn),
        };

        db.initialize_tables()?;
        Ok(db)
    }

    /// Open a database with custom configuration
    pub fn with_config(config: &DatabaseConfig) -> Result<Self> {
        Self::new(&config.path)
    }

    /// Initialize all required database tables
    ///
    /// `IF NOT EXISTS` makes re-creation a no-op; any other DDL failure is
    /// propagated as fatal.
    fn initialize_tables(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        // Create tables in order of dependencies
        self.create_stash_table(&conn)?;
        self.create_item_table(&conn)?;
        self.create_sale_table(&conn)?;
        self.create_currency_summary_table(&conn)?;

        // Create indexes for the processor's access paths
        self.create_indexes(&conn)?;

        Ok(())
    }

    /// Create stash table
    fn create_stash_table(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS stash (
                id INTEGER PRIMARY KEY,
                api_id TEXT NOT NULL UNIQUE,
                account_name TEXT,
                last_character_name TEXT,
                stash_name TEXT,
                stash_type TEXT NOT NULL,
                public INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            []
        )?;
        Ok(())
    }

    /// Create item table
    ///
    /// Field names follow the upstream API (camelCase) as the feed hands
    /// them to us; JSON-valued fields are stored as UTF-8 JSON text.
    fn create_item_table(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS item (
                id INTEGER PRIMARY KEY,
                api_id TEXT NOT NULL UNIQUE,
                stash_id INTEGER NOT NULL REFERENCES stash(id),
                h INTEGER NOT NULL,
                w INTEGER NOT NULL,
                x INTEGER NOT NULL,
                y INTEGER NOT NULL,
                abyssJewel INTEGER DEFAULT 0,
                artFilename TEXT,
                category TEXT,
                corrupted INTEGER DEFAULT 0,
                cosmeticMods TEXT,
                craftedMods TEXT,
                descrText TEXT,
                duplicated INTEGER DEFAULT 0,
                elder INTEGER DEFAULT 0,
                enchantMods TEXT,
                explicitMods TEXT,
                flavourText TEXT,
                frameType INTEGER NOT NULL,
                icon TEXT NOT NULL,
                identified INTEGER NOT NULL,
                ilvl INTEGER NOT NULL,
                implicitMods TEXT,
                inventoryId TEXT,
                isRelic INTEGER DEFAULT 0,
                league TEXT NOT NULL,
                lockedToCharacter INTEGER DEFAULT 0,
                maxStackSize INTEGER,
                name TEXT NOT NULL,
                nextLevelRequirements TEXT,
                note TEXT,
                properties TEXT,
                prophecyDiffText TEXT,
                prophecyText TEXT,
                requirements TEXT,
                secDescrText TEXT,
                shaper INTEGER DEFAULT 0,
                sockets TEXT,
                stackSize INTEGER,
                support INTEGER DEFAULT 0,
                talismanTier INTEGER,
                typeLine TEXT NOT NULL,
                utilityMods TEXT,
                verified INTEGER NOT NULL,
                active INTEGER NOT NULL DEFAULT 1,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            []
        )?;
        Ok(())
    }

    /// Create sale table
    fn create_sale_table(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS sale (
                id INTEGER PRIMARY KEY,
                item_id INTEGER NOT NULL REFERENCES item(id),
                item_api_id TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                is_currency INTEGER NOT NULL,
                sale_currency TEXT NOT NULL,
                sale_amount REAL NOT NULL,
                sale_amount_chaos REAL,
                item_updated_at INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            []
        )?;
        Ok(())
    }

    /// Create currency summary table
    fn create_currency_summary_table(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS currency_summary (
                id INTEGER PRIMARY KEY,
                from_currency TEXT NOT NULL,
                to_currency TEXT NOT NULL,
                league TEXT NOT NULL,
                count INTEGER NOT NULL,
                mean REAL NOT NULL,
                standard_dev REAL NOT NULL,
                weight REAL NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE(from_currency, to_currency, league)
            )",
            []
        )?;
        Ok(())
    }

    /// Create database indexes for the processor's access paths
    fn create_indexes(&self, conn: &Connection) -> Result<()> {
        // Item pagination and lookups
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_item_updated_at ON item(updated_at)",
            []
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_item_created_at ON item(created_at)",
            []
        )?;
        conn.execute("CREATE INDEX IF NOT EXISTS idx_item_name ON item(name)", [])?;
        conn.execute("CREATE INDEX IF NOT EXISTS idx_item_type_line ON item(typeLine)", [])?;
        conn.execute("CREATE INDEX IF NOT EXISTS idx_item_stash ON item(stash_id)", [])?;

        // Sale history scans for summary statistics
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_sale_item_updated_at ON sale(item_updated_at)",
            []
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_sale_bucket ON sale(name, sale_currency)",
            []
        )?;

        // Valuation edge lookups
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_summary_from ON currency_summary(from_currency, league)",
            []
        )?;

        Ok(())
    }

    /// Begin the per-block transaction
    pub fn begin_block(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        echo_sql("BEGIN");
        conn.execute_batch("BEGIN")?;
        Ok(())
    }

    /// Commit the per-block transaction
    pub fn commit_block(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        echo_sql("COMMIT");
        conn.execute_batch("COMMIT")?;
        Ok(())
    }

    /// Roll back the per-block transaction, e.g. after a transient error
    pub fn rollback_block(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        echo_sql("ROLLBACK");
        conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

/// Echo a statement to the log; active at debug verbosity and above
pub(crate) fn echo_sql(sql: &str) {
    logger::debug(LogTag::Database, sql);
}
