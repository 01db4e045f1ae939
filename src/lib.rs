//! fwports - port alias and port-range reasoning for firewall zones
//!
//! Firewall zone configuration lists the services it opens as port numbers,
//! service names, and `min:max` port ranges. This crate decides how those
//! relate: which names mean which port, whether a port is covered by a range,
//! how to punch a port out of a set of ranges, and how to flatten a service
//! list into a minimal equivalent one.
//!
//! # Architecture
//!
//! - [`core`] - Alias resolution, range validation and editing, flattening
//! - [`validators`] - Input validation for command-line arguments
//! - [`config`] - Configuration persistence
//! - [`utils`] - Utility functions (XDG directories, logging setup)
//!
//! # Example
//!
//! ```
//! use fwports::{PortAliases, PortRanges, Protocol, ServiceTable};
//! use std::sync::Arc;
//!
//! let aliases = Arc::new(PortAliases::new(ServiceTable::default()));
//! let ranges = PortRanges::new(aliases);
//!
//! assert!(ranges.is_valid_port_range("54:135"));
//! assert_eq!(
//!     ranges.flatten_services(&["ssh", "http", "79", "81:90"], &Protocol::Tcp),
//!     vec!["ssh", "79:90"]
//! );
//! ```

// Allow pedantic clippy warnings that are not worth fixing for this codebase
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod core;
pub mod utils;
pub mod validators;

// Re-export commonly used types
pub use core::aliases::PortAliases;
pub use core::error::{Error, Result};
pub use core::protocol::Protocol;
pub use core::ranges::{PortRange, PortRanges, ServiceCollection, is_port_range, make_range};
pub use core::services::{Getent, ServiceDatabase, ServiceTable};
