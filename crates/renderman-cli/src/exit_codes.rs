//! Exit codes for CLI operations
//!
//! `check` follows the `diff` convention: 0 means in sync, 1 means differences.
//! Errors use distinct codes so scripts can tell them apart.

/// Success - in sync, or the operation completed without errors
pub const SUCCESS: i32 = 0;

/// Rendered output differs from the output tree
pub const OUT_OF_SYNC: i32 = 1;

/// Config file missing, malformed or invalid
pub const CONFIG_ERROR: i32 = 2;

/// One or more units failed to render
pub const RENDER_ERROR: i32 = 3;

/// The app filter names an unknown or disabled app
pub const NOT_FOUND: i32 = 4;

/// IO error - reading or writing the output tree failed
pub const IO_ERROR: i32 = 5;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;
