//! Input validation for command-line arguments
//!
//! The engine in [`crate::core`] accepts anything and degrades gracefully;
//! these helpers are for the places where a clear error to the user is more
//! useful than a silently skipped entry.

use crate::core::aliases::{ALLOWED_PORT_NAME_HELP, PortAliases};
use crate::core::ranges::{PortRange, RangeError};

/// Validates a single port number.
///
/// # Errors
///
/// Returns `Err` if port is 0 (reserved).
pub fn validate_port(port: u16) -> Result<u16, String> {
    if port == 0 {
        Err("Port must be between 1 and 65535".to_string())
    } else {
        Ok(port)
    }
}

/// Parses and validates a numeric port argument.
///
/// # Errors
///
/// Returns `Err` if the argument is not a number in `1..=65535`.
pub fn validate_port_number(input: &str) -> Result<u16, String> {
    let port = input
        .trim()
        .parse::<u16>()
        .map_err(|_| format!("'{input}' is not a port number (1-65535)"))?;
    validate_port(port)
}

/// Validates a port token (number or service name).
///
/// # Errors
///
/// Returns `Err` if the token uses characters that are not allowed in port
/// names, or is a number above 65535.
pub fn validate_port_token(input: &str) -> Result<String, String> {
    if input.is_empty() {
        return Err("Port cannot be empty".to_string());
    }
    if PortAliases::is_allowed_port_name(input) {
        Ok(input.to_string())
    } else {
        Err(format!("'{input}' is not an allowed port.\n{ALLOWED_PORT_NAME_HELP}"))
    }
}

/// Validates a port range token (`min:max`).
///
/// # Errors
///
/// Returns `Err` with the reason the range is not valid.
pub fn validate_range_token(input: &str) -> Result<PortRange, String> {
    input.parse::<PortRange>().map_err(|e| match e {
        RangeError::NotARange => {
            format!("'{input}' is not a port range (use min:max, e.g. 8000:8080)")
        }
        e => format!("'{input}' is not a valid port range: {e}"),
    })
}

/// Validates a range bound for `make`.
///
/// Zero and values above 65535 are accepted here; range construction reports
/// them itself.
///
/// # Errors
///
/// Returns `Err` if the input is not a non-negative integer.
pub fn validate_range_bound(input: &str) -> Result<u32, String> {
    input
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("'{input}' is not a number"))
}
