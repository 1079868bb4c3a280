use chrono::{DateTime, Utc};

use crate::common::Identity;

/// Row of the single-entry `session` table.
#[derive(Debug, Clone)]
pub struct StoredSession {
    pub identity: Identity,
    pub saved_at: DateTime<Utc>,
}
