//! Cache and lock key conventions.
//!
//! Pure string functions shared by every process so that leases and cached
//! snapshots line up across the fleet.

use uuid::Uuid;

/// Snapshot of a single package.
pub fn package(id: Uuid) -> String {
    format!("pkg:{id}")
}

/// Every active, non-deleted package as one JSON array.
pub const ALL_ACTIVE_PACKAGES: &str = "all-active-packages";

/// Distributed lease guarding writes to `key`.
pub fn lock(key: &str) -> String {
    format!("lock:{key}")
}

/// Rate limiter bucket for resending the signup verification mail.
pub fn resend_verification(email_ciphertext: &str) -> String {
    format!("ratelimit:resend-verification:{email_ciphertext}")
}

/// Rate limiter bucket for questionnaire submissions.
pub fn submit_questionnaire(caller: &str) -> String {
    format!("ratelimit:submit:{caller}")
}
