//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain     | Description                                  |
//! |---------|------------|----------------------------------------------|
//! | 0       | Universal  | Success                                      |
//! | 1       | Universal  | General error (unspecified)                  |
//! | 2       | Universal  | Usage or input validation error              |
//! | 3-9     | records    | Lookup and confirmation outcomes             |
//! | 10-19   | api        | Records API transport/response failures      |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use examdesk_gateway::GatewayError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, or input rejected before anything was sent.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Records (3-9)
// =============================================================================

/// No record matched the identifier (and year, when given).
pub const EXIT_NOT_FOUND: u8 = 3;

/// User declined a confirmation prompt, or input ended before one.
pub const EXIT_CANCELLED: u8 = 4;

// =============================================================================
// API (10-19)
// =============================================================================

/// Cannot reach the records API (refused, DNS, timeout).
pub const EXIT_NETWORK: u8 = 10;

/// API answered with a non-2xx status.
pub const EXIT_API: u8 = 11;

/// API answered 2xx with a body we cannot read.
pub const EXIT_DECODE: u8 = 12;

/// Batch stopped part way; some records were committed.
pub const EXIT_PARTIAL_COMMIT: u8 = 13;

/// Map a GatewayError to its exit code.
pub fn gateway_exit_code(err: &GatewayError) -> u8 {
    match err {
        GatewayError::Network(_) => EXIT_NETWORK,
        GatewayError::Api { .. } => EXIT_API,
        GatewayError::Decode(_) => EXIT_DECODE,
        GatewayError::InvalidUrl(_) => EXIT_USAGE,
        GatewayError::Io(_) => EXIT_ERROR,
    }
}
