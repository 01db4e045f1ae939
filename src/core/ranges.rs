//! Port ranges as used by firewall zone configuration
//!
//! A port range is written as two numbers separated by a colon: `"3000:3010"`.
//! Both ends are included. A *valid* range is an ascending pair of numbers in
//! `1..=65535`; anything else with the same shape is still a range
//! syntactically, but is skipped (and reported once) by every operation here.
//!
//! # Operations
//!
//! - [`is_port_range`]: shape check only
//! - [`PortRanges::is_valid_port_range`]: shape and bounds
//! - [`PortRanges::port_in_ranges`]: membership of a port token
//! - [`PortRanges::remove_port_from_ranges`]: punches a port out of ranges
//! - [`make_range`]: builds range text from two bounds
//! - [`PortRanges::divide_ports_and_ranges`]: splits a token list
//! - [`PortRanges::flatten`]: minimal equivalent collection (see [`super::flatten`])
//!
//! # Example
//!
//! ```
//! use fwports::core::aliases::PortAliases;
//! use fwports::core::ranges::PortRanges;
//! use fwports::core::services::ServiceTable;
//! use std::sync::Arc;
//!
//! let ranges = PortRanges::new(Arc::new(PortAliases::new(ServiceTable::default())));
//!
//! assert!(ranges.port_in_ranges("pop3", &["100:150", "10:30"]));
//! assert_eq!(
//!     ranges.remove_port_from_ranges(25, &["19:88", "152:160"]),
//!     vec!["19:24", "26:88", "152:160"]
//! );
//! ```

use crate::core::aliases::{MAX_PORT_NUMBER, PortAliases, is_numeric_token};
use crate::core::report::ReportOnce;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Separator between the two bounds of a range.
pub const RANGE_SEPARATOR: char = ':';

/// Why a range string is not a valid port range.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("not a port range")]
    NotARange,

    #[error("bounds are not numbers")]
    Unparsable,

    #[error("starting port {0} is outside 1-65535")]
    StartOutOfBounds(u32),

    #[error("ending port {0} is outside 1-65535")]
    EndOutOfBounds(u32),

    #[error("starting port {start} is not below ending port {end}")]
    NotAscending { start: u32, end: u32 },
}

/// A valid inclusive port range (`1 <= start < end <= 65535`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PortRange {
    start: u16,
    end: u16,
}

impl PortRange {
    /// Creates a range from two bounds.
    ///
    /// # Errors
    ///
    /// Returns `Err` if either bound is outside `1..=65535` or `start >= end`.
    pub fn new(start: u32, end: u32) -> Result<Self, RangeError> {
        if start < 1 || start > MAX_PORT_NUMBER {
            return Err(RangeError::StartOutOfBounds(start));
        }
        if end < 1 || end > MAX_PORT_NUMBER {
            return Err(RangeError::EndOutOfBounds(end));
        }
        if start >= end {
            return Err(RangeError::NotAscending { start, end });
        }
        Ok(Self {
            start: start as u16,
            end: end as u16,
        })
    }

    pub fn start(&self) -> u16 {
        self.start
    }

    pub fn end(&self) -> u16 {
        self.end
    }

    /// Number of ports covered by the range.
    pub fn len(&self) -> u32 {
        u32::from(self.end) - u32::from(self.start) + 1
    }

    /// Ranges always cover at least two ports.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, port: u16) -> bool {
        self.start <= port && port <= self.end
    }

    /// Returns `true` if the two ranges nest, overlap, or sit next to each
    /// other without a gap.
    pub fn overlaps_or_touches(&self, other: &PortRange) -> bool {
        u32::from(self.start) <= u32::from(other.end) + 1
            && u32::from(other.start) <= u32::from(self.end) + 1
    }

    /// Smallest range covering both.
    pub fn union(&self, other: &PortRange) -> PortRange {
        PortRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.start, RANGE_SEPARATOR, self.end)
    }
}

impl FromStr for PortRange {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !is_port_range(s) {
            return Err(RangeError::NotARange);
        }
        let (start, end) = s
            .split_once(RANGE_SEPARATOR)
            .ok_or(RangeError::NotARange)?;
        let start = start.parse::<u32>().map_err(|_| RangeError::Unparsable)?;
        let end = end.parse::<u32>().map_err(|_| RangeError::Unparsable)?;
        PortRange::new(start, end)
    }
}

/// Returns `true` if the string has the shape of a port range (`digits:digits`).
///
/// Bounds are not checked, see [`PortRanges::is_valid_port_range`].
///
/// ```
/// use fwports::core::ranges::is_port_range;
///
/// assert!(is_port_range("34:38"));
/// assert!(is_port_range("0:38"));
/// assert!(!is_port_range("port-range"));
/// assert!(!is_port_range("19-22"));
/// ```
pub fn is_port_range(s: &str) -> bool {
    s.split_once(RANGE_SEPARATOR)
        .is_some_and(|(start, end)| is_numeric_token(start) && is_numeric_token(end))
}

/// Builds the textual form of a range from two bounds.
///
/// Equal bounds collapse to a single port. Returns `None` (and logs the
/// reason) for a zero bound, an end above 65535, or a start above the end.
///
/// ```
/// use fwports::core::ranges::make_range;
///
/// assert_eq!(make_range(10, 20).as_deref(), Some("10:20"));
/// assert_eq!(make_range(10, 10).as_deref(), Some("10"));
/// assert_eq!(make_range(0, 20), None);
/// assert_eq!(make_range(20, 10), None);
/// ```
pub fn make_range(min: u32, max: u32) -> Option<String> {
    if min == 0 {
        tracing::error!(
            "Wrong definition of the starting port '{}', it must be between 1 and 65535",
            min
        );
        return None;
    }
    if max == 0 || max > MAX_PORT_NUMBER {
        tracing::error!(
            "Wrong definition of the ending port '{}', it must be between 1 and 65535",
            max
        );
        return None;
    }

    match min.cmp(&max) {
        std::cmp::Ordering::Equal => Some(min.to_string()),
        std::cmp::Ordering::Less => Some(format!("{min}{RANGE_SEPARATOR}{max}")),
        std::cmp::Ordering::Greater => {
            tracing::error!(
                "Starting port '{}' cannot be bigger than ending port '{}'",
                min,
                max
            );
            None
        }
    }
}

/// Single ports and port ranges of one protocol, each deduplicated and kept
/// in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCollection {
    pub ports: Vec<String>,
    pub port_ranges: Vec<String>,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_port(&mut self, port: impl Into<String>) {
        let port = port.into();
        if !self.ports.contains(&port) {
            self.ports.push(port);
        }
    }

    pub fn push_range(&mut self, range: impl Into<String>) {
        let range = range.into();
        if !self.port_ranges.contains(&range) {
            self.port_ranges.push(range);
        }
    }

    pub fn len(&self) -> usize {
        self.ports.len() + self.port_ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty() && self.port_ranges.is_empty()
    }

    /// Ports followed by ranges, as one token list.
    pub fn into_tokens(self) -> Vec<String> {
        let mut tokens = self.ports;
        for range in self.port_ranges {
            if !tokens.contains(&range) {
                tokens.push(range);
            }
        }
        tokens
    }
}

/// Port range reasoning bound to an alias classifier.
///
/// Holds its own seen-set so repeated diagnostics about the same malformed
/// entry are only logged once per instance.
#[derive(Debug)]
pub struct PortRanges {
    pub(crate) aliases: Arc<PortAliases>,
    pub(crate) reported: ReportOnce,
}

impl PortRanges {
    pub fn new(aliases: Arc<PortAliases>) -> Self {
        Self {
            aliases,
            reported: ReportOnce::new(),
        }
    }

    pub fn aliases(&self) -> &PortAliases {
        &self.aliases
    }

    /// Parses a range, reporting the reason once if it is not valid.
    pub(crate) fn parse_reported(&self, range: &str) -> Option<PortRange> {
        match range.parse::<PortRange>() {
            Ok(parsed) => Some(parsed),
            Err(RangeError::NotARange) => {
                self.reported.info(format!("Not a port-range {range}"));
                None
            }
            Err(RangeError::Unparsable) => {
                self.reported.warn(format!("Wrong port-range: '{range}'"));
                None
            }
            Err(e) => {
                self.reported
                    .warn(format!("Wrong port-range definition {range}: {e}"));
                None
            }
        }
    }

    /// Checks whether the string is a valid port range.
    ///
    /// ```
    /// # use fwports::core::{aliases::PortAliases, ranges::PortRanges, services::ServiceTable};
    /// # use std::sync::Arc;
    /// let ranges = PortRanges::new(Arc::new(PortAliases::new(ServiceTable::default())));
    ///
    /// assert!(ranges.is_valid_port_range("54:135"));
    /// assert!(!ranges.is_valid_port_range("135:54")); // reverse order
    /// assert!(!ranges.is_valid_port_range("0:135"));  // cannot start at 0
    /// assert!(!ranges.is_valid_port_range("135"));    // cannot be one number
    /// assert!(!ranges.is_valid_port_range("54-135")); // wrong separator
    /// ```
    pub fn is_valid_port_range(&self, range: &str) -> bool {
        self.parse_reported(range).is_some()
    }

    /// Returns `true` if the port (number or name) lies inside any valid range.
    ///
    /// Unknown port names and invalid ranges never match.
    pub fn port_in_ranges(&self, port: &str, ranges: &[impl AsRef<str>]) -> bool {
        if ranges.is_empty() {
            return false;
        }
        let Some(port_number) = self.aliases.port_number(port) else {
            return false;
        };
        self.number_in_ranges(port_number, ranges)
    }

    pub(crate) fn number_in_ranges(&self, port_number: u16, ranges: &[impl AsRef<str>]) -> bool {
        ranges.iter().any(|range| {
            self.parse_reported(range.as_ref())
                .is_some_and(|parsed| parsed.contains(port_number))
        })
    }

    /// Removes a port number from every range, splitting ranges around it.
    ///
    /// Entries that are single ports are dropped only if they equal the port
    /// textually; invalid ranges and ranges without the port are kept as is.
    /// A split range yields its lower part first.
    pub fn remove_port_from_ranges(&self, port: u16, ranges: &[impl AsRef<str>]) -> Vec<String> {
        let ranges: Vec<String> = ranges.iter().map(|r| r.as_ref().to_string()).collect();
        if ranges.is_empty() || port == 0 {
            return ranges;
        }

        tracing::info!("Removing port {} from port ranges {:?}", port, ranges);

        let port_text = port.to_string();
        let mut result = Vec::with_capacity(ranges.len() + 1);
        for range in ranges {
            if !is_port_range(&range) {
                if range != port_text {
                    result.push(range);
                }
                continue;
            }

            let Some(parsed) = self
                .parse_reported(&range)
                .filter(|parsed| parsed.contains(port))
            else {
                result.push(range);
                continue;
            };

            let port = u32::from(port);
            let (start, end) = (u32::from(parsed.start()), u32::from(parsed.end()));
            if port > start {
                result.extend(make_range(start, port - 1));
            }
            if port < end {
                result.extend(make_range(port + 1, end));
            }
        }

        tracing::info!("Result: {:?}", result);
        result
    }

    /// Splits tokens into single ports and ranges.
    ///
    /// With `with_aliases`, every single port is expanded to its number and
    /// all its names. Ranges are never expanded.
    pub fn divide_ports_and_ranges(
        &self,
        tokens: &[impl AsRef<str>],
        with_aliases: bool,
    ) -> ServiceCollection {
        let mut collection = ServiceCollection::new();
        for token in tokens {
            let token: &str = token.as_ref();
            if is_port_range(token) {
                collection.push_range(token);
            } else if with_aliases {
                for alias in self.aliases.service_aliases(token) {
                    collection.push_port(alias);
                }
            } else {
                collection.push_port(token);
            }
        }
        collection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::services::ServiceTable;

    fn port_ranges() -> PortRanges {
        PortRanges::new(Arc::new(PortAliases::new(ServiceTable::parse(
            "blocks 10288/tcp\ncosir 10321/tcp\n",
        ))))
    }

    #[test]
    fn test_is_port_range() {
        assert!(is_port_range("34:38"));
        assert!(is_port_range("0:38"));
        assert!(is_port_range("99999:1"));
        assert!(!is_port_range("port-range"));
        assert!(!is_port_range("19-22"));
        assert!(!is_port_range(":22"));
        assert!(!is_port_range("22:"));
        assert!(!is_port_range("1:2:3"));
        assert!(!is_port_range("22"));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("54:135".parse::<PortRange>().unwrap().to_string(), "54:135");
        assert_eq!("135".parse::<PortRange>(), Err(RangeError::NotARange));
        assert_eq!("0:135".parse::<PortRange>(), Err(RangeError::StartOutOfBounds(0)));
        assert_eq!(
            "1:65536".parse::<PortRange>(),
            Err(RangeError::EndOutOfBounds(65536))
        );
        assert_eq!(
            "135:54".parse::<PortRange>(),
            Err(RangeError::NotAscending { start: 135, end: 54 })
        );
        assert_eq!(
            "10:10".parse::<PortRange>(),
            Err(RangeError::NotAscending { start: 10, end: 10 })
        );
        assert_eq!(
            "1:99999999999999999999".parse::<PortRange>(),
            Err(RangeError::Unparsable)
        );
    }

    #[test]
    fn test_is_valid_port_range() {
        let ranges = port_ranges();
        assert!(ranges.is_valid_port_range("54:135"));
        assert!(ranges.is_valid_port_range("1:65535"));
        assert!(!ranges.is_valid_port_range("135:54"));
        assert!(!ranges.is_valid_port_range("0:135"));
        assert!(!ranges.is_valid_port_range("135"));
        assert!(!ranges.is_valid_port_range("54-135"));
        assert!(!ranges.is_valid_port_range("100:100"));
    }

    #[test]
    fn test_invalid_range_reported_once() {
        let ranges = port_ranges();
        for _ in 0..10 {
            assert!(!ranges.is_valid_port_range("135:54"));
        }
        assert_eq!(ranges.reported.len(), 1);
    }

    #[test]
    fn test_port_in_ranges() {
        let ranges = port_ranges();
        assert!(ranges.port_in_ranges("130", &["100:150", "10:30"]));
        assert!(!ranges.port_in_ranges("30", &["100:150", "10:20"]));
        assert!(ranges.port_in_ranges("pop3", &["100:150", "10:30"]));
        assert!(!ranges.port_in_ranges("http", &["100:150", "10:20"]));
    }

    #[test]
    fn test_port_in_ranges_bounds_inclusive() {
        let ranges = port_ranges();
        assert!(ranges.port_in_ranges("100", &["100:150"]));
        assert!(ranges.port_in_ranges("150", &["100:150"]));
        assert!(!ranges.port_in_ranges("151", &["100:150"]));
    }

    #[test]
    fn test_port_in_ranges_skips_invalid() {
        let ranges = port_ranges();
        assert!(!ranges.port_in_ranges("120", &["150:100", "120"]));
        assert!(ranges.port_in_ranges("120", &["150:100", "110:130"]));
        assert!(!ranges.port_in_ranges("unknown-name", &["1:65535"]));
        assert!(!ranges.port_in_ranges("80", &[] as &[&str]));
    }

    #[test]
    fn test_port_in_ranges_database_name() {
        let ranges = port_ranges();
        assert!(ranges.port_in_ranges("blocks", &["10000:10300"]));
        assert!(!ranges.port_in_ranges("cosir", &["10000:10300"]));
    }

    #[test]
    fn test_make_range() {
        assert_eq!(make_range(10, 20).as_deref(), Some("10:20"));
        assert_eq!(make_range(10, 10).as_deref(), Some("10"));
        assert_eq!(make_range(0, 20), None);
        assert_eq!(make_range(20, 10), None);
        assert_eq!(make_range(10, 0), None);
        assert_eq!(make_range(10, 65536), None);
        assert_eq!(make_range(1, 65535).as_deref(), Some("1:65535"));
    }

    #[test]
    fn test_remove_port_interior() {
        let ranges = port_ranges();
        assert_eq!(
            ranges.remove_port_from_ranges(25, &["19:88", "152:160"]),
            vec!["19:24", "26:88", "152:160"]
        );
    }

    #[test]
    fn test_remove_port_at_bounds() {
        let ranges = port_ranges();
        assert_eq!(ranges.remove_port_from_ranges(19, &["19:88"]), vec!["20:88"]);
        assert_eq!(ranges.remove_port_from_ranges(88, &["19:88"]), vec!["19:87"]);
        assert_eq!(ranges.remove_port_from_ranges(20, &["19:21"]), vec!["19", "21"]);
        assert_eq!(ranges.remove_port_from_ranges(19, &["19:20"]), vec!["20"]);
    }

    #[test]
    fn test_remove_port_single_entries() {
        let ranges = port_ranges();
        assert_eq!(
            ranges.remove_port_from_ranges(25, &["25", "26", "http"]),
            vec!["26", "http"]
        );
    }

    #[test]
    fn test_remove_port_noop() {
        let ranges = port_ranges();
        assert_eq!(
            ranges.remove_port_from_ranges(0, &["19:88"]),
            vec!["19:88"]
        );
        assert!(ranges.remove_port_from_ranges(25, &[] as &[&str]).is_empty());
        assert_eq!(
            ranges.remove_port_from_ranges(25, &["88:19", "30:40"]),
            vec!["88:19", "30:40"]
        );
    }

    #[test]
    fn test_divide_without_aliases() {
        let ranges = port_ranges();
        let divided = ranges.divide_ports_and_ranges(&["22", "100:200", "http", "22"], false);
        assert_eq!(divided.ports, vec!["22", "http"]);
        assert_eq!(divided.port_ranges, vec!["100:200"]);
    }

    #[test]
    fn test_divide_with_aliases() {
        let ranges = port_ranges();
        let divided = ranges.divide_ports_and_ranges(&["www", "80", "5:10", "nope"], true);
        assert_eq!(divided.ports, vec!["80", "http", "www", "www-http", "nope"]);
        assert_eq!(divided.port_ranges, vec!["5:10"]);
    }

    #[test]
    fn test_overlaps_or_touches() {
        let a: PortRange = "10:20".parse().unwrap();
        assert!(a.overlaps_or_touches(&"21:30".parse().unwrap()));
        assert!(a.overlaps_or_touches(&"1:9".parse().unwrap()));
        assert!(a.overlaps_or_touches(&"12:15".parse().unwrap()));
        assert!(a.overlaps_or_touches(&"15:25".parse().unwrap()));
        assert!(!a.overlaps_or_touches(&"22:30".parse().unwrap()));
        assert!(!a.overlaps_or_touches(&"1:8".parse().unwrap()));
        assert_eq!(a.union(&"15:25".parse().unwrap()).to_string(), "10:25");
        assert_eq!(a.len(), 11);
    }

    #[test]
    fn test_collection_into_tokens() {
        let mut collection = ServiceCollection::new();
        collection.push_port("ssh");
        collection.push_port("ssh");
        collection.push_range("100:200");
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.into_tokens(), vec!["ssh", "100:200"]);
    }
}
