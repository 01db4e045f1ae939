//! Port alias and port-range reasoning
//!
//! This module contains the engine that firewall zone configuration code uses
//! to reason about the ports it opens. It provides:
//!
//! - [`services`]: Access to the system service database
//! - [`aliases`]: Resolution between port names and port numbers
//! - [`ranges`]: Port range validation, membership, and editing
//! - [`flatten`]: Reduction of service lists to a minimal equivalent form
//! - [`protocol`]: Protocols a service list can belong to
//! - [`report`]: Deduplicated diagnostics
//! - [`error`]: Error types for the I/O seams around the engine

pub mod aliases;
pub mod error;
pub mod flatten;
pub mod protocol;
pub mod ranges;
pub mod report;
pub mod services;

#[cfg(test)]
pub mod test_helpers;
