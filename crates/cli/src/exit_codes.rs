//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `mlink` exit codes.
//! Exit codes are part of the shell contract: the daily scheduler branches
//! on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success, every partition produced its artifacts      |
//! | 1    | General error (I/O outside a partition, etc.)        |
//! | 2    | Usage error (bad date, missing base path)            |
//! | 3    | One or more partitions were skipped                  |
//! | 4    | No partitions found                                  |
//! | 5    | Invalid pipeline configuration                       |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant below
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing base path.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Run / summarize (3-4)
// =============================================================================

/// At least one partition was skipped (fatal partition error or no input
/// files). The remaining partitions still wrote their artifacts.
pub const EXIT_PARTITION_SKIPPED: u8 = 3;

/// The report folder holds no partition matching the request.
pub const EXIT_NO_PARTITIONS: u8 = 4;

// =============================================================================
// Config (5)
// =============================================================================

/// Pipeline configuration failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 5;
