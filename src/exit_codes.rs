//! Process exit codes of the `subpatch` binary.
//!
//! - 0: Success
//! - 1: An explicit check failed (e.g. `subtree checksum --check`)
//! - 2: Invalid command-line usage (handled by clap)
//! - 3: Interrupted
//! - 4: Any error reported by subpatch

pub const SUCCESS: u8 = 0;
pub const CHECK_FAILED: u8 = 1;
pub const USAGE: u8 = 2;
pub const INTERRUPTED: u8 = 3;
pub const ERROR: u8 = 4;
