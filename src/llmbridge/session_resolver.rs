//! Decides which session an inbound request belongs to.
//!
//! Omitting `session_id`, or sending an empty string or the sentinel `"default"`, starts a
//! fresh, unlinked conversation under a newly generated id. Any other value is used verbatim. Every response echoes the id it used, so a
//! client continues a conversation by passing that id back on its next call.

use uuid::Uuid;

/// The reserved id meaning "no specific session requested".
pub const DEFAULT_SESSION_ID: &str = "default";

/// Whether `session_id` asks for a fresh conversation.
pub fn is_sentinel(session_id: Option<&str>) -> bool {
    match session_id {
        None => true,
        Some(id) => id.is_empty() || id == DEFAULT_SESSION_ID,
    }
}

/// Resolve the requested id to the concrete id the request will use.
pub fn resolve(requested: Option<&str>) -> String {
    match requested {
        Some(id) if !is_sentinel(Some(id)) => id.to_string(),
        _ => generate_session_id(),
    }
}

/// A new random opaque session id (UUID v4, simple form).
pub fn generate_session_id() -> String {
    Uuid::new_v4().simple().to_string()
}
