//! Integration tests for fwports
//!
//! These tests drive the public library API end to end: a services file on
//! disk, the configuration that selects it, and the range operations on top.
//! No test depends on the host's `/etc/services` or on `getent`.

#![allow(clippy::uninlined_format_args)]

use fwports::config::{self, AppConfig, ServicesSource};
use fwports::{PortAliases, PortRanges, Protocol, ServiceTable, make_range};
use std::io::Write;
use std::sync::Arc;

const SERVICES: &str = "\
# Local services
blocks             10288/tcp    # Blocks
blocks             10288/udp    # Blocks
cosir              10321/tcp
hip-nat-t          10500/udp
MOS-lower          10540/tcp
MOS-upper          10541/tcp    mos-orders
";

fn create_port_ranges() -> PortRanges {
    PortRanges::new(Arc::new(PortAliases::new(ServiceTable::parse(SERVICES))))
}

fn strings(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(ToString::to_string).collect()
}

#[test]
fn test_services_file_through_config() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SERVICES.as_bytes()).unwrap();

    let config = AppConfig::default().with_services_override(file.path().to_str().unwrap());
    assert_eq!(config.services_source, ServicesSource::File);

    let aliases = PortAliases::with_database(config.open_service_database().unwrap());
    assert_eq!(aliases.port_number("mos-orders"), Some(10541));
    assert_eq!(
        aliases.service_aliases("10541"),
        strings(&["10541", "MOS-upper", "mos-orders"])
    );
}

#[test]
fn test_builtin_names_without_database() {
    let config = AppConfig::default().with_services_override("none");
    let aliases = PortAliases::with_database(config.open_service_database().unwrap());
    let ranges = PortRanges::new(Arc::new(aliases));

    assert!(ranges.port_in_ranges("https", &["400:500"]));
    assert!(!ranges.port_in_ranges("blocks", &["10000:11000"]));
}

#[test]
fn test_zone_edit_session() {
    let ranges = create_port_ranges();
    let mut services = strings(&["ssh", "10280:10300", "10500", "8000:8080"]);

    // Close a port in the middle of a range
    let idx = services.iter().position(|s| s == "10280:10300").unwrap();
    let rest = services.split_off(idx);
    let mut edited = services;
    edited.extend(ranges.remove_port_from_ranges(10288, &rest[..1]));
    edited.extend_from_slice(&rest[1..]);
    assert_eq!(
        edited,
        strings(&["ssh", "10280:10287", "10289:10300", "10500", "8000:8080"])
    );
    assert!(!ranges.port_in_ranges("blocks", &edited));

    // Re-open it by name and flatten back
    edited.push("blocks".to_string());
    let flat = ranges.flatten(&edited, &Protocol::Tcp).unwrap();
    assert_eq!(flat.ports, strings(&["ssh", "10500"]));
    assert_eq!(flat.port_ranges, strings(&["10280:10300", "8000:8080"]));
}

#[test]
fn test_divide_with_aliases() {
    let ranges = create_port_ranges();
    let collection =
        ranges.divide_ports_and_ranges(&["www", "1:10", "MOS-upper", "80", "1:10"], true);
    assert_eq!(
        collection.ports,
        strings(&["80", "http", "www", "www-http", "10541", "MOS-upper", "mos-orders"])
    );
    assert_eq!(collection.port_ranges, strings(&["1:10"]));
}

#[test]
fn test_flatten_json_shape() {
    let ranges = create_port_ranges();
    let collection = ranges
        .flatten(&["http", "81:90", "cosir"], &Protocol::Udp)
        .unwrap();
    let json = serde_json::to_value(&collection).unwrap();
    assert_eq!(
        json,
        serde_json::json!({ "ports": ["cosir"], "port_ranges": ["80:90"] })
    );
}

#[test]
fn test_make_range_edges() {
    assert_eq!(make_range(1, 65535).as_deref(), Some("1:65535"));
    assert_eq!(make_range(443, 443).as_deref(), Some("443"));
    assert_eq!(make_range(0, 10), None);
    assert_eq!(make_range(20, 10), None);
}

#[test]
fn test_shared_classifier_across_threads() {
    let aliases = Arc::new(PortAliases::new(ServiceTable::parse(SERVICES)));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let aliases = Arc::clone(&aliases);
            std::thread::spawn(move || {
                let ranges = PortRanges::new(aliases);
                ranges.flatten_services(&["blocks", "10289:10300", "ssh"], &Protocol::Tcp)
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), strings(&["ssh", "10288:10300"]));
    }
}

#[tokio::test]
async fn test_config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");

    let config = AppConfig::default().with_services_override("none");
    config::save_config_to(&path, &config).await.unwrap();

    let loaded = config::load_config_from(&path).await;
    assert_eq!(loaded.services_source, ServicesSource::None);
    assert_eq!(loaded, config);
}
