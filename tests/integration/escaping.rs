//! Property-based tests for value escaping.
//!
//! Identifiers arrive from the directory itself and may contain any
//! character. Lookups built from them must select exactly the entry they
//! name, never a wildcard match.

use group_sync_builders::dn::{Dn, escape_dn_value};
use group_sync_builders::filter::Filter;
use group_sync_builders::Entry;
use proptest::prelude::*;

proptest! {
    #[test]
    fn test_equality_filter_selects_its_value(value in "\\PC{1,24}") {
        let rendered = Filter::equality("cn", &value).to_string();
        let parsed = Filter::parse(&rendered).unwrap();

        let entry = Entry::new("cn=x,dc=example,dc=com").with_attribute("cn", [value.as_str()]);
        prop_assert!(parsed.matches(&entry));
    }

    #[test]
    fn test_wildcards_in_values_stay_literal(prefix in "[a-z]{1,8}") {
        let filter = Filter::equality("uid", &format!("{}*", prefix));
        let other = Entry::new("uid=y,dc=example,dc=com")
            .with_attribute("uid", [format!("{}suffix", prefix)]);
        prop_assert!(!filter.matches(&other));
        prop_assert!(Filter::parse(&filter.to_string()).unwrap() == filter);
    }

    #[test]
    fn test_escaped_dn_values_survive_parsing(value in "[a-zA-Z0-9 ,+=#;<>\"\\\\]{1,16}") {
        let dn = Dn::parse(&format!("cn={},ou=groups,dc=example,dc=com", escape_dn_value(&value)))
            .unwrap();
        prop_assert_eq!(dn.depth(), 4);
        prop_assert_eq!(dn.leaf().unwrap()[0].value(), value.as_str());
    }
}
