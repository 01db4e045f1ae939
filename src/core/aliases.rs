//! Port alias resolution
//!
//! Ports can be written as numbers (`"80"`) or as service names (`"http"`,
//! `"www"`, `"www-http"`). [`PortAliases`] maps between the two, starting
//! from a built-in table of services commonly opened in firewall zones and
//! falling back to a [`ServiceDatabase`] for everything else.
//!
//! # Caching
//!
//! Every answer from the database, including "not found", is cached for the
//! lifetime of the [`PortAliases`] value. Entries are never invalidated, so the
//! cache sits behind a plain `RwLock` and the classifier can be shared across
//! threads. Ports from the built-in table still ask the database once, so
//! extra aliases registered there are merged after the built-in names.
//! Names that are not allowed port names are never sent to the database.
//!
//! # Example
//!
//! ```
//! use fwports::core::aliases::PortAliases;
//! use fwports::core::services::ServiceTable;
//!
//! let aliases = PortAliases::new(ServiceTable::default());
//! assert_eq!(aliases.port_number("www"), Some(80));
//! assert_eq!(aliases.port_number("8080"), Some(8080));
//! assert_eq!(aliases.service_aliases("80"), vec!["80", "http", "www", "www-http"]);
//! ```

use crate::core::report::ReportOnce;
use crate::core::services::ServiceDatabase;
use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

/// Highest valid port number.
pub const MAX_PORT_NUMBER: u32 = 65_535;

/// Services that resolve without consulting the system database.
const KNOWN_SERVICES: &[(u16, &[&str])] = &[
    (22, &["ssh"]),
    (25, &["smtp"]),
    (53, &["domain"]),
    (67, &["bootps"]),
    (68, &["bootpc"]),
    (69, &["tftp"]),
    (80, &["http", "www", "www-http"]),
    (110, &["pop3"]),
    (111, &["sunrpc"]),
    (123, &["ntp"]),
    (137, &["netbios-ns"]),
    (138, &["netbios-dgm"]),
    (139, &["netbios-ssn"]),
    (143, &["imap"]),
    (389, &["ldap"]),
    (443, &["https"]),
    (445, &["microsoft-ds"]),
    (500, &["isakmp"]),
    (631, &["ipp"]),
    (636, &["ldaps"]),
    (873, &["rsync"]),
    (993, &["imaps"]),
    (995, &["pop3s"]),
    (3128, &["ndl-aas"]),
    (4500, &["ipsec-nat-t"]),
    (8080, &["http-alt"]),
];

/// Help text describing what [`PortAliases::is_allowed_port_name`] accepts.
pub const ALLOWED_PORT_NAME_HELP: &str = "A port name may consist of the characters 'a-z', 'A-Z', '0-9', and '*+._-'.\n\
     A port number may be a number from 0 to 65535.\n\
     No spaces are allowed.\n";

/// Returns `true` if the token is a non-empty string of ASCII digits.
pub fn is_numeric_token(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

fn known_names(port: u16) -> &'static [&'static str] {
    KNOWN_SERVICES
        .iter()
        .find(|(known, _)| *known == port)
        .map_or(&[], |(_, names)| *names)
}

fn is_port_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '*' | '/' | '+' | '.' | '_' | '-')
}

#[derive(Debug, Default)]
struct AliasCache {
    names_by_port: HashMap<u16, Vec<String>>,
    port_by_name: HashMap<String, Option<u16>>,
    /// Ports whose names were already asked from the database.
    resolved_ports: HashSet<u16>,
}

impl AliasCache {
    fn seeded() -> Self {
        let mut cache = Self::default();
        for (port, names) in KNOWN_SERVICES {
            for name in *names {
                cache.add_name(*port, name);
            }
        }
        cache
    }

    fn add_name(&mut self, port: u16, name: &str) {
        let names = self.names_by_port.entry(port).or_default();
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
        self.port_by_name
            .entry(name.to_string())
            .or_insert(Some(port));
    }
}

/// Classifier for port tokens, owning the alias cache.
pub struct PortAliases {
    database: Box<dyn ServiceDatabase>,
    cache: RwLock<AliasCache>,
    reported: ReportOnce,
}

impl std::fmt::Debug for PortAliases {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortAliases")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl PortAliases {
    pub fn new(database: impl ServiceDatabase + 'static) -> Self {
        Self::with_database(Box::new(database))
    }

    pub fn with_database(database: Box<dyn ServiceDatabase>) -> Self {
        Self {
            database,
            cache: RwLock::new(AliasCache::seeded()),
            reported: ReportOnce::new(),
        }
    }

    /// Returns `true` if the token is an allowed port number or port name.
    ///
    /// Numbers must lie in `0..=65535`; names may only use the characters
    /// listed in [`ALLOWED_PORT_NAME_HELP`]. Whether the name is actually known
    /// is not checked.
    pub fn is_allowed_port_name(token: &str) -> bool {
        if is_numeric_token(token) {
            return token
                .parse::<u32>()
                .is_ok_and(|number| number <= MAX_PORT_NUMBER);
        }
        if token.is_empty() {
            tracing::error!("Invalid port name: {:?}", token);
            return false;
        }
        token.chars().all(is_port_name_char)
    }

    /// Resolves a port token to its port number.
    ///
    /// Numeric tokens are parsed directly; names are looked up in the built-in
    /// table and then in the service database. Returns `None` when the name is
    /// unknown or the number does not fit a port.
    pub fn port_number(&self, token: &str) -> Option<u16> {
        if is_numeric_token(token) {
            return token.parse::<u16>().ok();
        }

        if let Some(cached) = self.read_cache().port_by_name.get(token) {
            return *cached;
        }

        if !Self::is_allowed_port_name(token) {
            return None;
        }

        let port = match self.database.port_for_name(token) {
            Ok(port) => port,
            Err(e) => {
                self.reported
                    .warn(format!("Cannot look up port name '{token}': {e}"));
                None
            }
        };

        let mut cache = self.write_cache();
        match port {
            Some(port) => cache.add_name(port, token),
            None => {
                cache.port_by_name.insert(token.to_string(), None);
            }
        }
        port
    }

    /// Returns the service names registered for a port number.
    pub fn aliases_for(&self, port: u16) -> Vec<String> {
        {
            let cache = self.read_cache();
            if cache.resolved_ports.contains(&port) {
                return cache.names_by_port.get(&port).cloned().unwrap_or_default();
            }
        }

        let names = match self.database.names_for_port(port) {
            Ok(names) => names,
            Err(e) => {
                self.reported
                    .warn(format!("Cannot look up names for port {port}: {e}"));
                Vec::new()
            }
        };

        // Built-in names first, then database order, then names cached
        // earlier by `port_number`
        let mut cache = self.write_cache();
        let earlier = cache.names_by_port.remove(&port).unwrap_or_default();
        let builtin = known_names(port).iter().copied();
        for name in builtin.chain(names.iter().chain(&earlier).map(String::as_str)) {
            cache.add_name(port, name);
        }
        cache.resolved_ports.insert(port);
        cache.names_by_port.get(&port).cloned().unwrap_or_default()
    }

    /// Returns the port number followed by all its names, for either form of
    /// token. Unknown and disallowed tokens come back as `[token]`.
    ///
    /// ```
    /// use fwports::core::aliases::PortAliases;
    /// use fwports::core::services::ServiceTable;
    ///
    /// let aliases = PortAliases::new(ServiceTable::parse("MOS-upper 10541/tcp"));
    /// assert_eq!(aliases.service_aliases("MOS-upper"), vec!["10541", "MOS-upper"]);
    /// assert_eq!(aliases.service_aliases("666"), vec!["666"]);
    /// ```
    pub fn service_aliases(&self, token: &str) -> Vec<String> {
        let port = if is_numeric_token(token) {
            token.parse::<u16>().ok()
        } else if Self::is_allowed_port_name(token) {
            self.port_number(token)
        } else {
            self.reported
                .error_then_debug(format!("Port name '{token}' is not allowed"));
            None
        };

        let Some(port) = port else {
            return vec![token.to_string()];
        };

        let names = self.aliases_for(port);
        if names.is_empty() {
            return vec![token.to_string()];
        }

        let mut all = Vec::with_capacity(names.len() + 1);
        all.push(port.to_string());
        all.extend(names);
        all
    }

    /// Returns `true` if the token has at least one alias besides itself.
    pub fn is_known_port_name(&self, token: &str) -> bool {
        self.service_aliases(token).len() > 1
    }

    /// Number of distinct port names cached so far, including misses.
    pub fn cached_names(&self) -> usize {
        self.read_cache().port_by_name.len()
    }

    fn read_cache(&self) -> std::sync::RwLockReadGuard<'_, AliasCache> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_cache(&self) -> std::sync::RwLockWriteGuard<'_, AliasCache> {
        self.cache.write().unwrap_or_else(PoisonError::into_inner)
    }
}
