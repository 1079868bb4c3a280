use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::IdentityResolver;
use super::database::Database;
use super::models::StoredSession;
use crate::common::Identity;
use crate::error::StoreError;

/// Persisted login state (one identity at a time).
///
/// The identity is kept as a JSON payload so that a damaged row can be
/// told apart from an absent one.
pub struct SessionDatabase {
    db: Mutex<Database>,
}

impl SessionDatabase {
    /// Open the session database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::init(Database::open(path)?)
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::init(Database::in_memory()?)
    }

    fn init(db: Database) -> Result<Self, StoreError> {
        db.connection().execute(
            "CREATE TABLE IF NOT EXISTS session (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                payload TEXT NOT NULL,
                saved_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self { db: Mutex::new(db) })
    }

    fn lock(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Save identity (replace if exists)
    pub fn save_identity(&self, identity: &Identity) -> Result<(), StoreError> {
        let payload = serde_json::to_string(identity)?;
        let db = self.lock();
        db.connection().execute(
            "INSERT OR REPLACE INTO session (id, payload, saved_at) VALUES (1, ?1, ?2)",
            params![payload, Utc::now()],
        )?;
        log::info!("Stored session for {}", identity.username);
        Ok(())
    }

    /// Load the stored session, if any.
    pub fn load_session(&self) -> Result<Option<StoredSession>, StoreError> {
        let db = self.lock();
        let row = db
            .connection()
            .query_row("SELECT payload, saved_at FROM session WHERE id = 1", [], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, DateTime<Utc>>(1)?))
            })
            .optional()?;

        match row {
            Some((payload, saved_at)) => Ok(Some(StoredSession {
                identity: serde_json::from_str(&payload)?,
                saved_at,
            })),
            None => Ok(None),
        }
    }

    /// Forget the stored identity. Clearing an empty store is not an error.
    pub fn clear_identity(&self) -> Result<(), StoreError> {
        let db = self.lock();
        let removed = db
            .connection()
            .execute("DELETE FROM session WHERE id = 1", [])?;
        if removed > 0 {
            log::info!("Cleared stored session");
        }
        Ok(())
    }
}

impl IdentityResolver for SessionDatabase {
    fn resolve_identity(&self) -> Identity {
        match self.load_session() {
            Ok(Some(session)) => session.identity,
            Ok(None) => Identity::default(),
            Err(err) => {
                log::warn!("Stored session unreadable, treating as logged out: {err}");
                Identity::default()
            }
        }
    }
}
