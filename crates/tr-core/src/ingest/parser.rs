//! Notification parser.
//!
//! Input layout, one notification per invocation:
//!
//! ```text
//! host-a                                      <- line 1: reporting host
//! UDP: [10.0.0.5]:161->[10.0.0.1]:162         <- line 2: transport descriptor
//! SNMPv2-MIB::snmpTrapOID.0 IF-MIB::linkDown  <- lines 3+: identifier, whitespace, value
//! IF-MIB::ifIndex.1 5
//! ```
//!
//! Data lines are split at the first whitespace run. A data line without
//! whitespace cannot be a pair and is dropped.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tr_common::Varbind;

/// `TRANSPORT: [ADDR]:PORT->`, e.g. `UDP: [10.0.0.5]:161->[10.0.0.1]:162`.
static BRACKETED_ADDR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9/]+:\s*\[([^\]]+)\]:\d+\s*->").expect("valid transport regex")
});

/// Bare dotted quad anywhere in the descriptor.
static DOTTED_QUAD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.\d+\.\d+\.\d+)").expect("valid address regex"));

/// Errors from the notification parser.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("no input lines received")]
    Empty,
}

impl From<ParseError> for tr_common::Error {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Empty => tr_common::Error::EmptyNotification,
        }
    }
}

/// Parser output: header fields plus varbinds in protocol order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedNotification {
    pub host: String,
    pub transport: String,
    pub source_ip: String,
    pub varbinds: Vec<Varbind>,
    /// Total raw lines, including headers and dropped lines.
    pub line_count: usize,
}

/// Parse the full line sequence of one notification.
pub fn parse_notification<S: AsRef<str>>(lines: &[S]) -> Result<ParsedNotification, ParseError> {
    if lines.is_empty() {
        return Err(ParseError::Empty);
    }

    let host = strip_terminator(lines[0].as_ref()).to_string();
    let transport = lines
        .get(1)
        .map(|l| strip_terminator(l.as_ref()).to_string())
        .unwrap_or_default();
    let source_ip = extract_source_ip(&transport);

    let varbinds = lines
        .iter()
        .skip(2)
        .filter_map(|l| split_pair(l.as_ref()))
        .collect();

    Ok(ParsedNotification {
        host,
        transport,
        source_ip,
        varbinds,
        line_count: lines.len(),
    })
}

/// Extract the sender address from a transport descriptor.
///
/// Tries the bracketed form first, then any dotted quad, else empty.
pub fn extract_source_ip(transport: &str) -> String {
    if let Some(caps) = BRACKETED_ADDR.captures(transport) {
        return caps[1].to_string();
    }
    DOTTED_QUAD
        .captures(transport)
        .map(|caps| caps[1].to_string())
        .unwrap_or_default()
}

/// Split one data line into `(identifier, value)`.
pub fn split_pair(line: &str) -> Option<Varbind> {
    let line = strip_terminator(line).trim_start();
    let at = line.find(char::is_whitespace)?;
    let (oid, rest) = line.split_at(at);
    Some(Varbind::new(oid, rest.trim()))
}

fn strip_terminator(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_headers_and_pairs() {
        let parsed = parse_notification(&[
            "host-a",
            "UDP: [10.0.0.5]:161->[10.0.0.1]:162",
            "SNMPv2-MIB::snmpTrapOID.0 SNMPv2-MIB::linkDown",
            "IF-MIB::ifIndex.1 5",
        ])
        .unwrap();

        assert_eq!(parsed.host, "host-a");
        assert_eq!(parsed.source_ip, "10.0.0.5");
        assert_eq!(parsed.line_count, 4);
        assert_eq!(
            parsed.varbinds,
            vec![
                Varbind::new("SNMPv2-MIB::snmpTrapOID.0", "SNMPv2-MIB::linkDown"),
                Varbind::new("IF-MIB::ifIndex.1", "5"),
            ]
        );
    }

    #[test]
    fn empty_input_is_rejected() {
        let lines: [&str; 0] = [];
        assert_eq!(parse_notification(&lines), Err(ParseError::Empty));
    }

    #[test]
    fn single_line_gives_host_only() {
        let parsed = parse_notification(&["host-a"]).unwrap();
        assert_eq!(parsed.transport, "");
        assert_eq!(parsed.source_ip, "");
        assert!(parsed.varbinds.is_empty());
    }

    #[test]
    fn lines_without_whitespace_are_dropped() {
        let parsed = parse_notification(&[
            "h",
            "t",
            "lonelytoken",
            "",
            "a.b.c   value with  spaces   ",
        ])
        .unwrap();
        assert_eq!(parsed.varbinds, vec![Varbind::new("a.b.c", "value with  spaces")]);
    }

    #[test]
    fn identifier_with_only_trailing_whitespace_keeps_empty_value() {
        assert_eq!(split_pair("  IF-MIB::ifAlias.3 \t"), Some(Varbind::new("IF-MIB::ifAlias.3", "")));
    }

    #[test]
    fn source_ip_fallbacks() {
        assert_eq!(extract_source_ip("UDP: [192.168.1.9]:50123->[10.0.0.1]:162"), "192.168.1.9");
        assert_eq!(extract_source_ip("TCP:[fe80::1]:4000->[::1]:162"), "fe80::1");
        assert_eq!(extract_source_ip("via 172.16.0.4 port 162"), "172.16.0.4");
        assert_eq!(extract_source_ip("<UNKNOWN>"), "");
    }

    #[test]
    fn carriage_returns_are_stripped_from_headers() {
        let parsed = parse_notification(&["host-a\r\n", "UDP: [10.0.0.5]:161->\r"]).unwrap();
        assert_eq!(parsed.host, "host-a");
        assert_eq!(parsed.transport, "UDP: [10.0.0.5]:161->");
    }

    #[test]
    fn line_terminators_are_not_separators() {
        let parsed = parse_notification(&["h", "t", "lonelytoken\r", "oid.0 v\r\n"]).unwrap();
        assert_eq!(parsed.varbinds, vec![Varbind::new("oid.0", "v")]);
        assert_eq!(split_pair("lonelytoken\n"), None);
    }
}
