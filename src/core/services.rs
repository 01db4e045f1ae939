//! System service database access
//!
//! Port aliases that are not part of the built-in table are looked up in the
//! system service database (`/etc/services`, or whatever NSS serves through
//! `getent services`). The engine only needs two questions answered:
//!
//! - which port does a service name map to
//! - which names are registered for a port number
//!
//! [`ServiceTable`] answers them from parsed `/etc/services` text and
//! [`Getent`] by asking `getent` once per key.

use crate::core::error::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Synchronous lookup into a service database.
///
/// "Not found" is `Ok(None)` / an empty list; `Err` means the database itself
/// could not be queried.
pub trait ServiceDatabase: Send + Sync {
    fn port_for_name(&self, name: &str) -> Result<Option<u16>>;

    fn names_for_port(&self, port: u16) -> Result<Vec<String>>;
}

/// One parsed services entry with the protocol suffix removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEntry {
    pub port: u16,
    /// Canonical name first, then aliases.
    pub names: Vec<String>,
}

/// Parses one line in `/etc/services` (or `getent services`) syntax.
///
/// `name port/proto [alias ...] [# comment]`. Returns `None` for comments,
/// blank lines and lines without a usable port.
pub fn parse_services_line(line: &str) -> Option<ServiceEntry> {
    let line = line.split('#').next().unwrap_or_default();
    let mut fields = line.split_whitespace();

    let name = fields.next()?;
    let port_field = fields.next()?;
    let port = port_field
        .split('/')
        .next()
        .and_then(|p| p.parse::<u16>().ok())?;

    let mut names = vec![name.to_string()];
    for alias in fields {
        if !names.iter().any(|n| n == alias) {
            names.push(alias.to_string());
        }
    }

    Some(ServiceEntry { port, names })
}

/// In-memory service database built from `/etc/services` text.
#[derive(Debug, Clone, Default)]
pub struct ServiceTable {
    by_port: HashMap<u16, Vec<String>>,
    by_name: HashMap<String, u16>,
}

impl ServiceTable {
    /// Builds a table from services-file text.
    ///
    /// The same service usually appears once per protocol; those lines merge
    /// into a single entry. A name keeps the first port it was seen with.
    pub fn parse(text: &str) -> Self {
        let mut table = Self::default();
        for entry in text.lines().filter_map(parse_services_line) {
            table.insert(entry);
        }
        table
    }

    /// Reads and parses a services file.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the file cannot be read.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let table = Self::parse(&text);
        tracing::debug!(
            "Loaded {} service ports from {}",
            table.by_port.len(),
            path.display()
        );
        Ok(table)
    }

    pub fn insert(&mut self, entry: ServiceEntry) {
        let names = self.by_port.entry(entry.port).or_default();
        for name in entry.names {
            self.by_name.entry(name.clone()).or_insert(entry.port);
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.by_port.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_port.is_empty()
    }
}

impl ServiceDatabase for ServiceTable {
    fn port_for_name(&self, name: &str) -> Result<Option<u16>> {
        Ok(self.by_name.get(name).copied())
    }

    fn names_for_port(&self, port: u16) -> Result<Vec<String>> {
        Ok(self.by_port.get(&port).cloned().unwrap_or_default())
    }
}

/// Exit status `getent` uses when the key is not in the database.
const GETENT_NOT_FOUND: i32 = 2;

/// Service database backed by `getent services <key>`.
#[derive(Debug, Clone)]
pub struct Getent {
    program: PathBuf,
}

impl Default for Getent {
    fn default() -> Self {
        Self::new("getent")
    }
}

impl Getent {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn query(&self, key: &str) -> Result<Vec<ServiceEntry>> {
        let output = Command::new(&self.program)
            .arg("services")
            .arg(key)
            .output()
            .map_err(|e| Error::ServiceDatabase {
                message: format!("failed to run {}: {e}", self.program.display()),
                exit_code: None,
            })?;

        match output.status.code() {
            Some(0) => Ok(String::from_utf8_lossy(&output.stdout)
                .lines()
                .filter_map(parse_services_line)
                .collect()),
            Some(GETENT_NOT_FOUND) => Ok(Vec::new()),
            code => Err(Error::ServiceDatabase {
                message: format!(
                    "{} services {key}: {}",
                    self.program.display(),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
                exit_code: code,
            }),
        }
    }
}

impl ServiceDatabase for Getent {
    fn port_for_name(&self, name: &str) -> Result<Option<u16>> {
        // getent treats an all-digit key as a port number, and a leading
        // dash as an option
        if name.is_empty()
            || name.starts_with('-')
            || name.bytes().all(|b| b.is_ascii_digit())
        {
            return Ok(None);
        }
        Ok(self.query(name)?.first().map(|entry| entry.port))
    }

    fn names_for_port(&self, port: u16) -> Result<Vec<String>> {
        let mut names: Vec<String> = Vec::new();
        for entry in self.query(&port.to_string())? {
            if entry.port != port {
                continue;
            }
            for name in entry.names {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        Ok(names)
    }
}
