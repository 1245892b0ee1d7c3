//! Shared constants for end-to-end tests
#![allow(dead_code)]

// ============================================================================
// Callers
// ============================================================================

/// User id of the catalog admin
pub const ADMIN_ID: i64 = 1;

/// User id of the regular user who uploads the fixture songs
pub const UPLOADER_ID: i64 = 10;

/// User id of a regular user with no songs of their own
pub const OTHER_USER_ID: i64 = 11;

// ============================================================================
// Seconds
// ============================================================================

pub const DAY: i64 = 86_400;

/// Fixed "now" used by tests that control view timestamps
pub const NOW: i64 = 1_760_000_000;
