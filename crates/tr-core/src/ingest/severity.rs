//! Vendor severity classification.

use tr_common::Severity;

/// Symbolic marker of the vendor alarm-severity identifier.
pub const VENDOR_SEVERITY_MARKER: &str = "eagleXgDsrAlarmSeverity";

/// Fully numeric form of the same identifier.
pub const VENDOR_SEVERITY_NUMERIC: &str = ".1.3.6.1.4.1.323.5.3.28.1.1.3.5.1.7";

/// Map a vendor severity indicator to a [`Severity`].
///
/// Total: absent, empty, or unknown indicators classify as `info`.
pub fn classify(indicator: Option<&str>) -> Severity {
    let Some(raw) = indicator else {
        return Severity::Info;
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "critical" => Severity::Critical,
        "2" | "major" => Severity::Major,
        "3" | "minor" => Severity::Minor,
        "4" | "info" => Severity::Info,
        "5" | "clear" => Severity::Clear,
        _ => Severity::Info,
    }
}

/// Whether `oid` names the vendor alarm-severity field, in any namespace.
pub fn is_vendor_severity_oid(oid: &str) -> bool {
    oid.to_ascii_lowercase()
        .contains(&VENDOR_SEVERITY_MARKER.to_ascii_lowercase())
        || oid.contains(VENDOR_SEVERITY_NUMERIC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documented_mapping() {
        let cases = [
            ("1", Severity::Critical),
            ("2", Severity::Major),
            ("3", Severity::Minor),
            ("4", Severity::Info),
            ("5", Severity::Clear),
            ("CRITICAL", Severity::Critical),
            ("Major", Severity::Major),
            ("minor", Severity::Minor),
            ("Info", Severity::Info),
            ("clear", Severity::Clear),
        ];
        for (input, expected) in cases {
            assert_eq!(classify(Some(input)), expected, "{input}");
        }
    }

    #[test]
    fn unknown_or_absent_is_info() {
        assert_eq!(classify(None), Severity::Info);
        assert_eq!(classify(Some("")), Severity::Info);
        assert_eq!(classify(Some("6")), Severity::Info);
        assert_eq!(classify(Some("warning")), Severity::Info);
    }

    #[test]
    fn vendor_oid_matching() {
        assert!(is_vendor_severity_oid("EAGLEXGDSR-MIB::eagleXgDsrAlarmSeverity"));
        assert!(is_vendor_severity_oid("eaglexgdsralarmseverity.0"));
        assert!(is_vendor_severity_oid(".1.3.6.1.4.1.323.5.3.28.1.1.3.5.1.7.0"));
        assert!(!is_vendor_severity_oid("IF-MIB::ifIndex.1"));
    }
}
