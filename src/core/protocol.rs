//! Protocols that firewall zones list services for

use std::fmt;

/// Network protocol of a zone's service list.
///
/// Parsing is case-insensitive; anything unrecognized is kept as
/// [`Protocol::Other`] so callers can pass it through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, strum::EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Protocol {
    /// Transmission Control Protocol
    #[strum(serialize = "tcp")]
    Tcp,
    /// User Datagram Protocol
    #[strum(serialize = "udp")]
    Udp,
    /// ONC RPC services (listed by program name, not port)
    #[strum(serialize = "rpc")]
    Rpc,
    /// Raw IP protocols (listed by protocol name)
    #[strum(serialize = "ip")]
    Ip,
    /// Internet Control Message Protocol
    #[strum(serialize = "icmp")]
    Icmp,
    #[strum(default)]
    Other(String),
}

impl Protocol {
    /// Returns the upper-case name used in zone configuration.
    pub fn as_str(&self) -> &str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
            Protocol::Rpc => "RPC",
            Protocol::Ip => "IP",
            Protocol::Icmp => "ICMP",
            Protocol::Other(name) => name,
        }
    }

    /// Only TCP and UDP services can be written as port ranges.
    pub fn supports_port_ranges(&self) -> bool {
        matches!(self, Protocol::Tcp | Protocol::Udp)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("TCP".parse::<Protocol>().unwrap(), Protocol::Tcp);
        assert_eq!("udp".parse::<Protocol>().unwrap(), Protocol::Udp);
        assert_eq!("Icmp".parse::<Protocol>().unwrap(), Protocol::Icmp);
    }

    #[test]
    fn test_parse_unknown_is_other() {
        let protocol: Protocol = "SCTP".parse().unwrap();
        assert_eq!(protocol, Protocol::Other("SCTP".to_string()));
        assert_eq!(protocol.to_string(), "SCTP");
    }

    #[test]
    fn test_supports_port_ranges() {
        assert!(Protocol::Tcp.supports_port_ranges());
        assert!(Protocol::Udp.supports_port_ranges());
        assert!(!Protocol::Rpc.supports_port_ranges());
        assert!(!Protocol::Ip.supports_port_ranges());
        assert!(!Protocol::Icmp.supports_port_ranges());
        assert!(!Protocol::Other("sctp".to_string()).supports_port_ranges());
    }
}
