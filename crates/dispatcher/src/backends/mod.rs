//! Built-in output backends
//!
//! Contains syslog-alert, json-alert, and stats-table.

pub mod json;
pub mod stats_table;
pub mod syslog;
pub mod target;

pub use self::json::JsonAlertContext;
pub use self::stats_table::{StatsTableContext, TableThread};
pub use self::syslog::{Facility, SyslogAlertContext, SyslogThread};
pub use self::target::{LineTarget, TargetSpec};

use contracts::ModuleDescriptor;

/// Descriptors of every built-in module
pub fn builtin_modules() -> Vec<ModuleDescriptor> {
    vec![
        syslog::descriptor(),
        json::descriptor(),
        stats_table::descriptor(),
    ]
}

/// IANA keyword of a well-known IP protocol
pub fn protocol_name(protocol: u8) -> Option<&'static str> {
    let name = match protocol {
        0 => "HOPOPT",
        1 => "ICMP",
        2 => "IGMP",
        4 => "IPv4",
        6 => "TCP",
        17 => "UDP",
        41 => "IPv6",
        43 => "IPv6-Route",
        44 => "IPv6-Frag",
        46 => "RSVP",
        47 => "GRE",
        50 => "ESP",
        51 => "AH",
        58 => "IPv6-ICMP",
        59 => "IPv6-NoNxt",
        60 => "IPv6-Opts",
        89 => "OSPFIGP",
        103 => "PIM",
        112 => "VRRP",
        132 => "SCTP",
        136 => "UDPLite",
        137 => "MPLS-in-IP",
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_names() {
        assert_eq!(protocol_name(6), Some("TCP"));
        assert_eq!(protocol_name(58), Some("IPv6-ICMP"));
        assert_eq!(protocol_name(132), Some("SCTP"));
        assert_eq!(protocol_name(253), None);
    }
}
