use crate::animals::{AnimalType, Gender};
use crate::inventory::InventoryLedger;
use crate::lending::{LendingEngine, Notification};
use crate::loans::LoanBook;
use crate::registry::{ProfileRegistry, UserProfile};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Meta Table (administrator identity, recorded once at creation)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Inventory Table (available count per animal type)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS inventory (
            animal TEXT PRIMARY KEY,
            count INTEGER NOT NULL CHECK (count >= 0)
        )",
        [],
    )?;

    // ==========================================================================
    // Profiles Table (immutable age/gender pair per identity)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS profiles (
            identity TEXT PRIMARY KEY,
            age INTEGER NOT NULL,
            gender TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Loans Table (outstanding loan per identity)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS loans (
            identity TEXT PRIMARY KEY,
            animal TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Events Table (append-only notification log)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_actor ON events(actor)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// IDENTITY DERIVATION
// ============================================================================

/// Stable identity key for a caller name.
///
/// The engine only ever sees these opaque keys; the derivation (SHA-256 hex
/// of the name) is a host concern and can be swapped without touching the
/// lending logic.
pub fn derive_identity(caller: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(caller.trim().as_bytes());
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// ADMINISTRATOR
// ============================================================================

/// The administrator identity recorded at initialization, if any
pub fn get_admin(conn: &Connection) -> Result<Option<String>> {
    let admin = conn
        .query_row("SELECT value FROM meta WHERE key = 'admin'", [], |row| {
            row.get(0)
        })
        .optional()?;

    Ok(admin)
}

/// Record the administrator identity. The administrator is a single fixed
/// identity; re-recording a different one is rejected.
pub fn store_admin(conn: &Connection, identity: &str) -> Result<()> {
    match get_admin(conn)? {
        Some(existing) if existing != identity => {
            bail!("An administrator is already recorded for this ledger")
        }
        Some(_) => Ok(()),
        None => {
            conn.execute(
                "INSERT INTO meta (key, value) VALUES ('admin', ?1)",
                params![identity],
            )?;
            Ok(())
        }
    }
}

// ============================================================================
// STATE LOAD / PERSIST
// ============================================================================

/// Rehydrate the full lending engine from the database.
pub fn load_engine(conn: &Connection) -> Result<LendingEngine> {
    let admin = get_admin(conn)?
        .context("Ledger not initialized (run: pet-ledger init <admin-name>)")?;

    // Inventory
    let mut stmt = conn.prepare("SELECT animal, count FROM inventory")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut counts = Vec::new();
    for (name, count) in rows {
        let animal = AnimalType::parse(&name)
            .with_context(|| format!("Unknown animal type in inventory: {}", name))?;
        counts.push((animal, count.max(0) as u64));
    }

    // Profiles
    let mut stmt = conn.prepare("SELECT identity, age, gender FROM profiles")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut profiles = Vec::new();
    for (identity, age, gender) in rows {
        let age = u8::try_from(age)
            .with_context(|| format!("Stored age out of range for {}", identity))?;
        let gender = Gender::parse(&gender)
            .with_context(|| format!("Unknown gender in profile for {}", identity))?;
        profiles.push((identity, UserProfile::new(age, gender)));
    }

    // Loans
    let mut stmt = conn.prepare("SELECT identity, animal FROM loans")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut loans = Vec::new();
    for (identity, name) in rows {
        let animal = AnimalType::parse(&name)
            .with_context(|| format!("Unknown animal type in loan for {}", identity))?;
        loans.push((identity, animal));
    }

    Ok(LendingEngine::from_parts(
        admin,
        InventoryLedger::from_counts(counts),
        ProfileRegistry::from_profiles(profiles),
        LoanBook::from_loans(loans),
    ))
}

/// Write the engine's state back inside one SQLite transaction, so a whole
/// state-machine step commits or does not.
pub fn persist_engine(conn: &mut Connection, engine: &LendingEngine) -> Result<()> {
    let tx = conn
        .transaction()
        .context("Failed to start state transaction")?;

    tx.execute("DELETE FROM inventory", [])?;
    for (animal, count) in engine.inventory().counts() {
        tx.execute(
            "INSERT INTO inventory (animal, count) VALUES (?1, ?2)",
            params![animal.as_str(), count as i64],
        )?;
    }

    tx.execute("DELETE FROM profiles", [])?;
    for (identity, profile) in engine.profiles().profiles() {
        tx.execute(
            "INSERT INTO profiles (identity, age, gender) VALUES (?1, ?2, ?3)",
            params![identity, profile.age as i64, profile.gender.as_str()],
        )?;
    }

    tx.execute("DELETE FROM loans", [])?;
    for (identity, animal) in engine.loans().loans() {
        tx.execute(
            "INSERT INTO loans (identity, animal) VALUES (?1, ?2)",
            params![identity, animal.as_str()],
        )?;
    }

    tx.commit().context("Failed to commit state transaction")?;
    Ok(())
}

// ============================================================================
// EVENTS
// ============================================================================

/// One audit-trail record per successful transition
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }

    /// Build the audit record for a successful transition
    pub fn from_notification(note: &Notification, actor: &str) -> Self {
        let data = match note {
            Notification::Added { animal, count } => serde_json::json!({
                "animal": animal.as_str(),
                "count": count,
            }),
            Notification::Borrowed { animal } | Notification::Returned { animal } => {
                serde_json::json!({ "animal": animal.as_str() })
            }
        };

        Event::new(note.event_type(), "animal", note.animal().as_str(), data, actor)
    }
}

/// Append an event to the audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Most recent events, newest first
pub fn get_recent_events(conn: &Connection, limit: usize) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         ORDER BY id DESC
         LIMIT ?1",
    )?;

    let events = stmt
        .query_map(params![limit as i64], |row| {
            let timestamp_str: String = row.get(1)?;
            let data_json: String = row.get(5)?;

            Ok(Event {
                event_id: row.get(0)?,
                timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                    .map_err(|_| rusqlite::Error::InvalidQuery)?
                    .with_timezone(&Utc),
                event_type: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: serde_json::from_str(&data_json)
                    .map_err(|_| rusqlite::Error::InvalidQuery)?,
                actor: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}

// ============================================================================
// STOCK IMPORT (CSV)
// ============================================================================

/// One row of an administrator stock file.
///
/// Expected headers: `Animal,Count` with animal names matching the closed
/// enumeration (e.g. `Dog,3`).
#[derive(Debug, Clone, Deserialize)]
pub struct StockRecord {
    #[serde(rename = "Animal")]
    pub animal: AnimalType,

    #[serde(rename = "Count")]
    pub count: u64,
}

pub fn load_stock_csv(path: &Path) -> Result<Vec<StockRecord>> {
    let rdr = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open stock CSV: {:?}", path))?;

    read_stock_records(rdr)
}

/// Parse stock rows, rejecting the whole file before any row is applied
pub fn read_stock_records<R: std::io::Read>(mut rdr: csv::Reader<R>) -> Result<Vec<StockRecord>> {
    let mut records = Vec::new();

    for (i, result) in rdr.deserialize().enumerate() {
        let record: StockRecord =
            result.with_context(|| format!("Failed to parse stock row {}", i + 1))?;

        if !record.animal.is_borrowable() {
            bail!("Stock row {} names 'None', which cannot be stocked", i + 1);
        }

        records.push(record);
    }

    Ok(records)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    #[test]
    fn test_setup_is_idempotent() {
        let conn = fresh_conn();
        setup_database(&conn).unwrap();
    }

    #[test]
    fn test_admin_recorded_once() {
        let conn = fresh_conn();
        assert_eq!(get_admin(&conn).unwrap(), None);

        let admin = derive_identity("admin");
        store_admin(&conn, &admin).unwrap();
        assert_eq!(get_admin(&conn).unwrap(), Some(admin.clone()));

        // Same identity is fine, a different one is rejected
        store_admin(&conn, &admin).unwrap();
        assert!(store_admin(&conn, &derive_identity("mallory")).is_err());
        assert_eq!(get_admin(&conn).unwrap(), Some(admin));
    }

    #[test]
    fn test_derive_identity_is_stable() {
        assert_eq!(derive_identity("alice"), derive_identity("alice"));
        assert_eq!(derive_identity("alice"), derive_identity("  alice  "));
        assert_ne!(derive_identity("alice"), derive_identity("bob"));
        // 32 bytes of hex
        assert_eq!(derive_identity("alice").len(), 64);
    }

    #[test]
    fn test_persist_and_load_roundtrip() {
        let mut conn = fresh_conn();
        let admin = derive_identity("admin");
        store_admin(&conn, &admin).unwrap();

        let mut engine = LendingEngine::new(admin.clone());
        engine.add(&admin, AnimalType::Dog, 3).unwrap();
        engine.add(&admin, AnimalType::Cat, 1).unwrap();
        engine
            .borrow(&derive_identity("alice"), 25, Gender::Male, AnimalType::Dog)
            .unwrap();

        persist_engine(&mut conn, &engine).unwrap();
        let loaded = load_engine(&conn).unwrap();

        assert_eq!(loaded.admin(), engine.admin());
        assert_eq!(loaded.inventory().counts(), engine.inventory().counts());
        assert_eq!(loaded.profiles().profiles(), engine.profiles().profiles());
        assert_eq!(loaded.loans().loans(), engine.loans().loans());
    }

    #[test]
    fn test_persist_overwrites_previous_state() {
        let mut conn = fresh_conn();
        let admin = derive_identity("admin");
        store_admin(&conn, &admin).unwrap();

        let mut engine = LendingEngine::new(admin.clone());
        engine.add(&admin, AnimalType::Fish, 2).unwrap();
        persist_engine(&mut conn, &engine).unwrap();

        let identity = derive_identity("bob");
        engine
            .borrow(&identity, 30, Gender::Male, AnimalType::Fish)
            .unwrap();
        persist_engine(&mut conn, &engine).unwrap();

        let loaded = load_engine(&conn).unwrap();
        assert_eq!(loaded.available_count(AnimalType::Fish), 1);
        assert_eq!(loaded.loans().current_loan(&identity), AnimalType::Fish);

        // Return and persist again
        engine.return_animal(&identity).unwrap();
        persist_engine(&mut conn, &engine).unwrap();

        let loaded = load_engine(&conn).unwrap();
        assert_eq!(loaded.available_count(AnimalType::Fish), 2);
        assert_eq!(loaded.loans().loans().len(), 0);
    }

    #[test]
    fn test_load_requires_initialization() {
        let conn = fresh_conn();
        assert!(load_engine(&conn).is_err());
    }

    #[test]
    fn test_event_log_order_newest_first() {
        let conn = fresh_conn();

        let notes = [
            Notification::Added {
                animal: AnimalType::Dog,
                count: 2,
            },
            Notification::Borrowed {
                animal: AnimalType::Dog,
            },
            Notification::Returned {
                animal: AnimalType::Dog,
            },
        ];
        for note in &notes {
            insert_event(&conn, &Event::from_notification(note, "alice")).unwrap();
        }

        let events = get_recent_events(&conn, 10).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].event_type, "returned");
        assert_eq!(events[1].event_type, "borrowed");
        assert_eq!(events[2].event_type, "added");
        assert_eq!(events[2].data["count"], 2);

        // Limit applies
        let events = get_recent_events(&conn, 1).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "returned");
    }

    #[test]
    fn test_read_stock_records() {
        let csv = "Animal,Count\nDog,3\nFish,5\n";
        let rdr = csv::Reader::from_reader(csv.as_bytes());
        let records = read_stock_records(rdr).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].animal, AnimalType::Dog);
        assert_eq!(records[0].count, 3);
        assert_eq!(records[1].animal, AnimalType::Fish);
        assert_eq!(records[1].count, 5);
    }

    #[test]
    fn test_read_stock_records_rejects_none_and_unknown() {
        let csv = "Animal,Count\nNone,1\n";
        let rdr = csv::Reader::from_reader(csv.as_bytes());
        assert!(read_stock_records(rdr).is_err());

        let csv = "Animal,Count\nDragon,1\n";
        let rdr = csv::Reader::from_reader(csv.as_bytes());
        assert!(read_stock_records(rdr).is_err());
    }
}
