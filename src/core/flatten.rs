//! Flattening of service lists into a minimal equivalent collection
//!
//! A zone's TCP or UDP service list grows by accretion: single ports, their
//! names, and ranges end up overlapping. Flattening rewrites the list so that
//! every port is still covered, but:
//!
//! - single ports already inside a range are dropped
//! - several names for the same port collapse into one entry
//! - a single port right next to a range is folded into that range
//! - overlapping, nested, and touching ranges are joined
//!
//! Tokens that cannot be resolved to a port number are kept verbatim, and
//! invalid ranges are passed through untouched. Ranges keep their input
//! order; a joined range takes the place of its earliest member and is
//! written as `start:end`.
//!
//! # Example
//!
//! ```
//! use fwports::core::aliases::PortAliases;
//! use fwports::core::protocol::Protocol;
//! use fwports::core::ranges::PortRanges;
//! use fwports::core::services::ServiceTable;
//! use std::sync::Arc;
//!
//! let ranges = PortRanges::new(Arc::new(PortAliases::new(ServiceTable::default())));
//!
//! let flat = ranges.flatten_services(&["21", "22", "23", "20:25"], &Protocol::Tcp);
//! assert_eq!(flat, vec!["20:25"]);
//!
//! let untouched = ranges.flatten_services(&["80", "443"], &Protocol::Icmp);
//! assert_eq!(untouched, vec!["80", "443"]);
//! ```

use crate::core::protocol::Protocol;
use crate::core::ranges::{PortRange, PortRanges, RANGE_SEPARATOR, ServiceCollection, is_port_range};
use std::collections::HashSet;

/// A stretch of ports taking part in joining.
///
/// `slot` is the index of the input range it came from, `None` for a run of
/// single ports folded in next to a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: u32,
    end: u32,
    slot: Option<usize>,
}

/// Spans that ended up joined into one range.
#[derive(Debug, Default, PartialEq, Eq)]
struct Joined {
    start: u32,
    end: u32,
    slots: Vec<usize>,
    has_ports: bool,
}

impl PortRanges {
    /// Flattens a service list into a minimal [`ServiceCollection`].
    ///
    /// Returns `None` for protocols that do not support port ranges.
    pub fn flatten(
        &self,
        tokens: &[impl AsRef<str>],
        protocol: &Protocol,
    ) -> Option<ServiceCollection> {
        if !protocol.supports_port_ranges() {
            self.reported.info(format!(
                "Protocol {protocol} doesn't support port ranges, skipping..."
            ));
            return None;
        }

        let mut collection = ServiceCollection::new();
        let mut range_texts: Vec<String> = Vec::new();
        let mut seen_ranges: HashSet<&str> = HashSet::new();
        // Port numbers in order of first appearance, with the token naming them first
        let mut ports: Vec<(u16, &str)> = Vec::new();
        let mut seen_ports: HashSet<u16> = HashSet::new();

        for token in tokens {
            let token: &str = token.as_ref();
            if is_port_range(token) {
                if seen_ranges.insert(token) {
                    range_texts.push(token.to_string());
                }
                continue;
            }

            let Some(number) = self.aliases.port_number(token) else {
                tracing::warn!(
                    "Unknown port {} but leaving it in the configuration.",
                    token
                );
                collection.push_port(token);
                continue;
            };

            if seen_ports.insert(number) {
                ports.push((number, token));
            }
        }

        let parsed: Vec<Option<PortRange>> = range_texts
            .iter()
            .map(|text| self.parse_reported(text))
            .collect();
        let mut spans: Vec<Span> = parsed
            .iter()
            .enumerate()
            .filter_map(|(slot, range)| {
                range.map(|range| Span {
                    start: u32::from(range.start()),
                    end: u32::from(range.end()),
                    slot: Some(slot),
                })
            })
            .collect();

        let coverage: Vec<(u32, u32)> = join_spans(spans.clone())
            .into_iter()
            .map(|joined| (joined.start, joined.end))
            .collect();
        let absorbed = fold_ports(&ports, &coverage, &mut spans);

        for (number, name) in ports {
            if !absorbed.contains(&number) {
                collection.push_port(name);
            }
        }

        // Joined ranges take the place of their earliest member
        let mut placed: Vec<(usize, String)> = Vec::with_capacity(range_texts.len());
        for joined in join_spans(spans) {
            let order = joined.slots.iter().copied().min().unwrap_or(range_texts.len());
            if let [slot] = joined.slots.as_slice()
                && !joined.has_ports
            {
                placed.push((order, range_texts[*slot].clone()));
                continue;
            }
            let text = format!("{}{}{}", joined.start, RANGE_SEPARATOR, joined.end);
            tracing::info!(
                "Joining {:?} into {}",
                joined
                    .slots
                    .iter()
                    .map(|slot| range_texts[*slot].as_str())
                    .collect::<Vec<_>>(),
                text
            );
            placed.push((order, text));
        }
        for (slot, range) in parsed.iter().enumerate() {
            if range.is_none() {
                placed.push((slot, range_texts[slot].clone()));
            }
        }
        placed.sort_by_key(|(order, _)| *order);

        for (_, range) in placed {
            collection.push_range(range);
        }

        Some(collection)
    }

    /// Flattens a service list, returning a single token list.
    ///
    /// For protocols without port ranges the input comes back unchanged.
    pub fn flatten_services(&self, tokens: &[impl AsRef<str>], protocol: &Protocol) -> Vec<String> {
        match self.flatten(tokens, protocol) {
            Some(collection) => collection.into_tokens(),
            None => tokens.iter().map(|t| t.as_ref().to_string()).collect(),
        }
    }
}

/// Finds the ports that a range covers or that sit next to one, directly or
/// through a run of consecutive listed ports.
///
/// Runs that extend a range are added to `spans` so joining widens it.
/// Port 0 can never be part of a range and always stays single.
fn fold_ports(
    ports: &[(u16, &str)],
    coverage: &[(u32, u32)],
    spans: &mut Vec<Span>,
) -> HashSet<u16> {
    let mut absorbed = HashSet::new();
    if coverage.is_empty() {
        return absorbed;
    }

    let mut numbers: Vec<u32> = ports
        .iter()
        .map(|(number, _)| u32::from(*number))
        .filter(|number| *number != 0)
        .collect();
    numbers.sort_unstable();

    let mut runs: Vec<(u32, u32)> = Vec::new();
    for number in numbers {
        match runs.last_mut() {
            Some((_, end)) if *end + 1 == number => *end = number,
            _ => runs.push((number, number)),
        }
    }

    for (start, end) in runs {
        // First covered stretch that does not end before the run
        let idx = coverage.partition_point(|&(_, covered_end)| covered_end + 1 < start);
        let Some(&(covered_start, covered_end)) = coverage.get(idx) else {
            continue;
        };
        if covered_start > end + 1 {
            continue;
        }

        if covered_start <= start && end <= covered_end {
            tracing::info!(
                "Removing ports {}-{} mentioned in port ranges",
                start,
                end
            );
        } else {
            tracing::info!("Folding ports {}-{} into port ranges", start, end);
            spans.push(Span {
                start,
                end,
                slot: None,
            });
        }
        absorbed.extend((start..=end).map(|number| number as u16));
    }

    absorbed
}

/// Joins nested, overlapping, and touching spans in one sweep by start port.
fn join_spans(mut spans: Vec<Span>) -> Vec<Joined> {
    spans.sort_by_key(|span| (span.start, span.end));

    let mut joined: Vec<Joined> = Vec::new();
    for span in spans {
        if !joined
            .last()
            .is_some_and(|current| span.start <= current.end + 1)
        {
            joined.push(Joined {
                start: span.start,
                end: span.end,
                ..Joined::default()
            });
        }
        if let Some(current) = joined.last_mut() {
            current.end = current.end.max(span.end);
            match span.slot {
                Some(slot) => current.slots.push(slot),
                None => current.has_ports = true,
            }
        }
    }
    joined
}
