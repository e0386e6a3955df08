//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// Success - operation completed without errors
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Content error - malformed or unsupported content documents
pub const CONTENT_ERROR: i32 = 2;

/// Store error - the store could not be opened, read or written
pub const STORE_ERROR: i32 = 3;

/// Remote error - fetching content or writing to a registry failed
pub const REMOTE_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Interrupted by the user (128 + SIGINT)
pub const INTERRUPTED: i32 = 130;
