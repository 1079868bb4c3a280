pub mod database;
pub mod models;
pub mod session_db;

pub use session_db::SessionDatabase;

use crate::common::Identity;

/// Read side of the session store, as consumed by the chat session.
///
/// Implementations never fail: anything unreadable resolves to the
/// zero-value [`Identity`], which the session treats as logged out.
pub trait IdentityResolver: Send + Sync {
    fn resolve_identity(&self) -> Identity;
}
