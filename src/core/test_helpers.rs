//! Shared test utilities for core module tests
//!
//! Provides common test helpers to avoid duplication across test suites.
//! This module is only compiled in test mode.

use crate::core::aliases::PortAliases;
use crate::core::ranges::{PortRange, PortRanges};
use crate::core::services::ServiceTable;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Services file excerpt used across tests (IANA entries above 10000).
pub const TEST_SERVICES: &str = "\
blocks             10288/tcp    # Blocks  [Carl_Malamud]
blocks             10288/udp    # Blocks  [Carl_Malamud]
cosir              10321/tcp    # Computer Op System Information Report
bngsync            10439/udp    # BalanceNG session table synchronization protocol
hip-nat-t          10500/udp    # HIP NAT-Traversal  [RFC5770]
MOS-lower          10540/tcp    # MOS Media Object Metadata Port
MOS-lower          10540/udp    # MOS Media Object Metadata Port
MOS-upper          10541/tcp    # MOS Running Order Port
MOS-upper          10541/udp    # MOS Running Order Port
";

/// Creates a `PortRanges` backed by [`TEST_SERVICES`].
pub fn create_port_ranges() -> PortRanges {
    PortRanges::new(Arc::new(PortAliases::new(ServiceTable::parse(
        TEST_SERVICES,
    ))))
}

/// Expands numeric ports and valid ranges into the set of covered port numbers.
///
/// Names, unparsable tokens, and invalid ranges are ignored.
pub fn coverage(tokens: &[String]) -> BTreeSet<u16> {
    let mut covered = BTreeSet::new();
    for token in tokens {
        if let Ok(range) = token.parse::<PortRange>() {
            covered.extend(range.start()..=range.end());
        } else if let Ok(port) = token.parse::<u16>() {
            covered.insert(port);
        }
    }
    covered
}
