//! Persistence for characters, memories, conversations and the event log.
//!
//! The simulation treats storage as best effort: every call may fail and
//! callers log and continue. [`SqliteStore`] keeps each character as a JSON
//! document (with an optional CRC-32) and each memory as a row whose sort
//! keys (importance, creation time) are real columns:
//!
//! ```sql
//! CREATE TABLE characters    (id TEXT PRIMARY KEY, name TEXT, data BLOB,
//!                             checksum TEXT, created_at INTEGER, updated_at TEXT);
//! CREATE TABLE memories      (id TEXT PRIMARY KEY, character_id TEXT, data BLOB,
//!                             importance INTEGER, created_at INTEGER);
//! CREATE TABLE conversations (id TEXT PRIMARY KEY, data BLOB, updated_at TEXT);
//! CREATE TABLE events        (id INTEGER PRIMARY KEY AUTOINCREMENT, character_id TEXT,
//!                             kind TEXT, description TEXT, x INTEGER, y INTEGER,
//!                             importance INTEGER, created_at INTEGER);
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::character::Character;
use crate::config::PersistenceConfig;
use crate::conversation::Conversation;
use crate::error::{HamletError, Result};
use crate::memory::StoredMemory;
use crate::types::{CharacterId, Position};

// ---------------------------------------------------------------------------
// Event log records
// ---------------------------------------------------------------------------

/// Category of a logged event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// An executed action.
    Action,
    /// A conversation took place.
    Conversation,
    /// A need was satisfied.
    NeedFulfilled,
    /// Two characters interacted.
    Interaction,
    /// Something new was found.
    Discovery,
    /// Characters clashed.
    Conflict,
    /// A goal was reached.
    Achievement,
}

impl EventKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Action => "action",
            Self::Conversation => "conversation",
            Self::NeedFulfilled => "need_fulfilled",
            Self::Interaction => "interaction",
            Self::Discovery => "discovery",
            Self::Conflict => "conflict",
            Self::Achievement => "achievement",
        }
    }

    fn base_importance(self) -> u8 {
        match self {
            Self::Action => 3,
            Self::NeedFulfilled => 4,
            Self::Conversation => 5,
            Self::Interaction => 6,
            Self::Discovery => 7,
            Self::Conflict | Self::Achievement => 8,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Importance of an event: a base per kind, +2 for a first-time event,
/// +3 when danger is involved, clamped to `[1, 10]`.
#[must_use]
pub fn event_importance(kind: EventKind, description: &str) -> u8 {
    let text = description.to_lowercase();
    let mut score = kind.base_importance();
    if text.contains("ilk") || text.contains("first") {
        score += 2;
    }
    if text.contains("tehlike") || text.contains("danger") {
        score += 3;
    }
    score.clamp(1, 10)
}

/// One entry of the event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Who it happened to.
    pub character_id: CharacterId,
    /// Category.
    pub kind: EventKind,
    /// What happened.
    pub description: String,
    /// Where.
    pub position: Position,
    /// Importance in `[1, 10]`.
    pub importance: u8,
    /// When.
    pub timestamp: DateTime<Utc>,
}

impl EventRecord {
    /// Build a record stamped now, scoring its importance from the description.
    #[must_use]
    pub fn new(
        character_id: CharacterId,
        kind: EventKind,
        description: impl Into<String>,
        position: Position,
    ) -> Self {
        let description = description.into();
        Self {
            character_id,
            kind,
            importance: event_importance(kind, &description),
            description,
            position,
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Store trait
// ---------------------------------------------------------------------------

/// Durable storage used by the simulation.
pub trait PersistenceStore: Send + Sync {
    /// Insert or replace a character by ID.
    ///
    /// # Errors
    /// Storage-specific failure.
    fn save_character(&self, character: &Character) -> Result<()>;

    /// Every stored character, in first-save order.
    ///
    /// # Errors
    /// Storage-specific failure.
    fn get_all_characters(&self) -> Result<Vec<Character>>;

    /// Store a memory.
    ///
    /// # Errors
    /// Storage-specific failure.
    fn save_memory(&self, memory: &StoredMemory) -> Result<()>;

    /// Up to `limit` memories of a character, by importance then recency.
    ///
    /// # Errors
    /// Storage-specific failure.
    fn get_memories(&self, character: CharacterId, limit: usize) -> Result<Vec<StoredMemory>>;

    /// Insert or replace a conversation by ID.
    ///
    /// # Errors
    /// Storage-specific failure.
    fn save_conversation(&self, conversation: &Conversation) -> Result<()>;

    /// Append to the event log.
    ///
    /// # Errors
    /// Storage-specific failure.
    fn log_event(&self, event: &EventRecord) -> Result<()>;
}

/// A store that keeps nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

impl PersistenceStore for NullStore {
    fn save_character(&self, _character: &Character) -> Result<()> {
        Ok(())
    }

    fn get_all_characters(&self) -> Result<Vec<Character>> {
        Ok(Vec::new())
    }

    fn save_memory(&self, _memory: &StoredMemory) -> Result<()> {
        Ok(())
    }

    fn get_memories(&self, _character: CharacterId, _limit: usize) -> Result<Vec<StoredMemory>> {
        Ok(Vec::new())
    }

    fn save_conversation(&self, _conversation: &Conversation) -> Result<()> {
        Ok(())
    }

    fn log_event(&self, _event: &EventRecord) -> Result<()> {
        Ok(())
    }
}

/// Open the backend named in `config`.
///
/// # Errors
/// Returns `HamletError::Config` for an unknown backend, or a database error
/// if the SQLite file cannot be opened.
pub fn open_store(config: &PersistenceConfig) -> Result<Box<dyn PersistenceStore>> {
    match config.backend.as_str() {
        "sqlite" => Ok(Box::new(SqliteStore::open(&config.path, config)?)),
        "none" => Ok(Box::new(NullStore)),
        other => Err(HamletError::Config(format!(
            "unknown persistence backend: {other}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// CRC-32 checksum helper
// ---------------------------------------------------------------------------

fn crc32_hex(data: &[u8]) -> String {
    format!("{:08x}", crc32_compute(data))
}

/// CRC-32 (ISO 3309), reflected polynomial.
fn crc32_compute(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            crc = if crc & 1 == 1 { (crc >> 1) ^ POLY } else { crc >> 1 };
        }
    }
    !crc
}

// ---------------------------------------------------------------------------
// SqliteStore
// ---------------------------------------------------------------------------

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS characters (
        id         TEXT PRIMARY KEY,
        name       TEXT NOT NULL,
        data       BLOB NOT NULL,
        checksum   TEXT,
        created_at INTEGER NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS memories (
        id           TEXT PRIMARY KEY,
        character_id TEXT NOT NULL,
        data         BLOB NOT NULL,
        importance   INTEGER NOT NULL,
        created_at   INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS memories_by_character
        ON memories (character_id, importance DESC, created_at DESC);
    CREATE TABLE IF NOT EXISTS conversations (
        id         TEXT PRIMARY KEY,
        data       BLOB NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS events (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        character_id TEXT NOT NULL,
        kind         TEXT NOT NULL,
        description  TEXT NOT NULL,
        x            INTEGER NOT NULL,
        y            INTEGER NOT NULL,
        importance   INTEGER NOT NULL,
        created_at   INTEGER NOT NULL
    );
";

/// SQLite-backed [`PersistenceStore`].
pub struct SqliteStore {
    conn: Mutex<Connection>,
    checksum_enabled: bool,
    db_path: PathBuf,
}

impl fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteStore")
            .field("db_path", &self.db_path)
            .field("checksum_enabled", &self.checksum_enabled)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (or create) a database at `path`.
    ///
    /// # Errors
    /// Returns `HamletError::Database` on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&db_path, flags)?;
        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL; PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        info!(path = %db_path.display(), wal = config.wal_mode, "Hamlet store opened");
        Ok(Self {
            conn: Mutex::new(conn),
            checksum_enabled: config.checksum_enabled,
            db_path,
        })
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns `HamletError::Database` on SQLite failures.
    pub fn open_in_memory(config: &PersistenceConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            checksum_enabled: config.checksum_enabled,
            db_path: PathBuf::from(":memory:"),
        })
    }
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

impl PersistenceStore for SqliteStore {
    fn save_character(&self, character: &Character) -> Result<()> {
        let start = Instant::now();
        let json =
            serde_json::to_vec(character).map_err(|e| HamletError::Serialization(e.to_string()))?;
        let checksum = self.checksum_enabled.then(|| crc32_hex(&json));
        let now = Utc::now();

        self.conn.lock().execute(
            "INSERT INTO characters (id, name, data, checksum, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                data = excluded.data,
                checksum = excluded.checksum,
                updated_at = excluded.updated_at",
            params![
                character.id.to_string(),
                character.name,
                json,
                checksum,
                now.timestamp_micros(),
                now.to_rfc3339()
            ],
        )?;

        debug!(
            character = %character.id,
            bytes = json.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Saved character"
        );
        Ok(())
    }

    fn get_all_characters(&self) -> Result<Vec<Character>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT id, data, checksum FROM characters ORDER BY created_at, rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Vec<u8>>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?;

        let mut characters = Vec::new();
        for row in rows {
            let (id, data, stored_checksum) = row?;
            if self.checksum_enabled {
                if let Some(expected) = stored_checksum {
                    let actual = crc32_hex(&data);
                    if expected != actual {
                        warn!(
                            character = %id,
                            expected = %expected,
                            actual = %actual,
                            "Checksum mismatch, possible save corruption"
                        );
                    }
                }
            }
            match serde_json::from_slice::<Character>(&data) {
                Ok(c) => characters.push(c),
                Err(e) => warn!(character = %id, error = %e, "Skipping unreadable character"),
            }
        }
        Ok(characters)
    }

    fn save_memory(&self, memory: &StoredMemory) -> Result<()> {
        let json =
            serde_json::to_vec(memory).map_err(|e| HamletError::Serialization(e.to_string()))?;
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO memories (id, character_id, data, importance, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                memory.id.to_string(),
                memory.character_id.to_string(),
                json,
                i64::from(memory.importance),
                memory.created_at.timestamp_micros()
            ],
        )?;
        Ok(())
    }

    fn get_memories(&self, character: CharacterId, limit: usize) -> Result<Vec<StoredMemory>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT data FROM memories WHERE character_id = ?1
             ORDER BY importance DESC, created_at DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![character.to_string(), sql_limit(limit)], |row| {
            row.get::<_, Vec<u8>>(0)
        })?;

        let mut memories = Vec::new();
        for row in rows {
            let data = row?;
            let memory: StoredMemory = serde_json::from_slice(&data)
                .map_err(|e| HamletError::Serialization(e.to_string()))?;
            memories.push(memory);
        }
        Ok(memories)
    }

    fn save_conversation(&self, conversation: &Conversation) -> Result<()> {
        let json = serde_json::to_vec(conversation)
            .map_err(|e| HamletError::Serialization(e.to_string()))?;
        self.conn.lock().execute(
            "INSERT INTO conversations (id, data, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
            params![conversation.id.to_string(), json, Utc::now().to_rfc3339()],
        )?;
        debug!(
            conversation = %conversation.id,
            messages = conversation.messages.len(),
            "Saved conversation"
        );
        Ok(())
    }

    fn log_event(&self, event: &EventRecord) -> Result<()> {
        self.conn.lock().execute(
            "INSERT INTO events (character_id, kind, description, x, y, importance, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                event.character_id.to_string(),
                event.kind.as_str(),
                event.description,
                event.position.x,
                event.position.y,
                i64::from(event.importance),
                event.timestamp.timestamp_micros()
            ],
        )?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::MessageKind;
    use crate::memory::MemoryKind;
    use crate::personality::Personality;
    use chrono::Duration;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory(&PersistenceConfig::default()).expect("open")
    }

    fn character(name: &str) -> Character {
        let mut rng = StdRng::seed_from_u64(42);
        Character::new(name, Personality::random(&mut rng), &mut rng)
    }

    #[test]
    fn save_character_is_idempotent_upsert() {
        let store = store();
        let mut ahmet = character("Ahmet");
        store.save_character(&ahmet).expect("save");
        store.save_character(&character("Ayşe")).expect("save");

        ahmet.set_activity("dinleniyor");
        store.save_character(&ahmet).expect("save again");

        let all = store.get_all_characters().expect("load");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "Ahmet");
        assert_eq!(all[0].current_activity, "dinleniyor");
    }

    #[test]
    fn memories_order_by_importance_then_recency() {
        let store = store();
        let owner = CharacterId::new();
        let now = Utc::now();
        let old_high = StoredMemory::new(owner, MemoryKind::Event, "eski önemli", 9)
            .with_created_at(now - Duration::days(2));
        let new_low = StoredMemory::new(owner, MemoryKind::Event, "yeni sıradan", 3);
        let new_high = StoredMemory::new(owner, MemoryKind::Event, "yeni önemli", 9);
        for m in [&old_high, &new_low, &new_high] {
            store.save_memory(m).expect("save");
        }
        store
            .save_memory(&StoredMemory::new(CharacterId::new(), MemoryKind::Event, "başkası", 10))
            .expect("save");

        let got = store.get_memories(owner, 10).expect("load");
        let ids: Vec<_> = got.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![new_high.id, old_high.id, new_low.id]);
        assert_eq!(store.get_memories(owner, 1).expect("load").len(), 1);
    }

    #[test]
    fn conversation_and_events_round_trip() {
        let store = store();
        let a = CharacterId::new();
        let mut convo = Conversation::new(a, CharacterId::new());
        convo.push(Some(a), "Ahmet", "Merhaba", MessageKind::Character).expect("open");
        store.save_conversation(&convo).expect("save");
        store.save_conversation(&convo).expect("upsert");

        store
            .log_event(&EventRecord::new(a, EventKind::Action, "Ahmet keşfe çıktı", Position::new(3, 4)))
            .expect("log");
        let (kind, x, y, importance): (String, i32, i32, i64) = store
            .conn
            .lock()
            .query_row("SELECT kind, x, y, importance FROM events", [], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })
            .expect("one event");
        assert_eq!(kind, "action");
        assert_eq!((x, y), (3, 4));
        assert!((1..=10).contains(&importance));
    }

    #[test]
    fn importance_scoring() {
        assert_eq!(event_importance(EventKind::Conversation, "sohbet"), 5);
        assert_eq!(event_importance(EventKind::Discovery, "ilk kez su buldu"), 9);
        assert_eq!(event_importance(EventKind::Conflict, "first danger"), 10);
        assert_eq!(event_importance(EventKind::NeedFulfilled, "yemek"), 4);
    }

    #[test]
    fn checksum_mismatch_still_loads() {
        let store = store();
        let c = character("Mehmet");
        store.save_character(&c).expect("save");
        store
            .conn
            .lock()
            .execute("UPDATE characters SET checksum = 'deadbeef'", [])
            .expect("corrupt");
        assert_eq!(store.get_all_characters().expect("load").len(), 1);
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = PersistenceConfig::default();
        let path = dir.path().join("hamlet.db");
        {
            let store = SqliteStore::open(&path, &config).expect("open");
            store.save_character(&character("Fatma")).expect("save");
        }
        let reopened = SqliteStore::open(&path, &config).expect("reopen");
        assert_eq!(reopened.get_all_characters().expect("load")[0].name, "Fatma");
    }

    #[test]
    fn open_store_by_backend() {
        let none = PersistenceConfig {
            backend: "none".into(),
            ..PersistenceConfig::default()
        };
        let store = open_store(&none).expect("null store");
        assert!(store.get_all_characters().expect("empty").is_empty());

        let bad = PersistenceConfig {
            backend: "postgres".into(),
            ..PersistenceConfig::default()
        };
        assert!(matches!(open_store(&bad), Err(HamletError::Config(_))));
    }

    #[test]
    fn crc32_known_vector() {
        assert_eq!(crc32_compute(b"123456789"), 0xCBF4_3926);
    }
}
