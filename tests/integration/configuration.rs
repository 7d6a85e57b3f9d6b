//! Configuration documents and validation.

use crate::assert_err_matches;
use crate::common::fixtures::{self, load_fixture};
use crate::common::builder_for;
use group_sync_builders::query::{AttributeQuery, Scope};
use group_sync_builders::{BuildError, ConfigError, ConnectionParameters, Rfc2307Builder, SchemaConfig};

#[test]
fn test_posix_fixture_parses() {
    let config = fixtures::posix_config();
    assert_eq!(config.group_query.base_dn, "ou=groups,dc=example,dc=com");
    assert_eq!(config.group_query.scope, "one");
    assert_eq!(config.group_query.time_limit, 10);
    assert_eq!(config.group_query.page_size, 50);
    assert_eq!(config.group_uid_attribute, "cn");
    assert_eq!(
        config.group_name_attributes,
        Some(vec!["description".to_string(), "cn".to_string()])
    );
    assert!(!config.tolerate_member_not_found_errors);

    let groups = AttributeQuery::new(&config.group_query, &config.group_uid_attribute).unwrap();
    assert_eq!(groups.query().scope(), Scope::OneLevel);
}

#[test]
fn test_optional_fields_default() {
    let config = fixtures::group_of_names_config();
    assert_eq!(config.group_query.scope, "");
    assert_eq!(config.group_query.page_size, 0);
    assert!(!config.tolerate_member_out_of_scope_errors);

    let users = AttributeQuery::new(&config.user_query, &config.user_uid_attribute).unwrap();
    assert_eq!(users.query().scope(), Scope::Subtree);
    assert!(users.keyed_on_dn());
}

#[test]
fn test_rejects_malformed_documents() {
    let broken_filter = load_fixture("rfc2307/posix_sync_config.json")
        .replace("(objectClass=posixGroup)", "(objectClass=posixGroup");
    assert_err_matches!(
        SchemaConfig::from_json(&broken_filter),
        ConfigError::InvalidFilter { .. }
    );

    let bad_scope = load_fixture("rfc2307/posix_sync_config.json")
        .replace("\"scope\": \"one\"", "\"scope\": \"children\"");
    assert_err_matches!(SchemaConfig::from_json(&bad_scope), ConfigError::InvalidScope(_));

    assert_err_matches!(SchemaConfig::from_json("{"), ConfigError::Json(_));
}

#[test]
fn test_blank_uid_attribute() {
    let mut config = fixtures::posix_config();
    config.user_uid_attribute = "  ".to_string();
    assert_err_matches!(config.validate(), ConfigError::EmptyAttribute { .. });
}

#[test]
fn test_connection_fixture() {
    let connection = fixtures::bound_connection();
    assert!(connection.validate().is_ok());
    assert!(connection.uses_start_tls());
    assert_eq!(connection.connect_timeout().as_secs(), 5);
    assert_eq!(connection.operation_timeout().as_secs(), 20);

    let debug = format!("{:?}", connection);
    assert!(!debug.contains("hunter2"));

    let serialized = serde_json::to_string(&connection).unwrap();
    assert!(serialized.contains("bindDN"));
    assert!(!serialized.contains("hunter2"));
}

#[test]
fn test_connection_errors_surface_from_accessors() {
    let directory = fixtures::directory();
    let builder = Rfc2307Builder::new(
        ConnectionParameters::new("http://directory.example.com"),
        fixtures::posix_config(),
        directory.clone(),
    );
    assert_err_matches!(
        builder.group_lister(),
        BuildError::Config(ConfigError::InvalidUrl { .. })
    );
    assert_eq!(directory.open_count(), 0);
}

#[test]
fn test_invalid_base_dn_surfaces_from_accessors() {
    let mut config = fixtures::posix_config();
    config.user_query.base_dn = "ou=users,,dc=example".to_string();
    let builder = builder_for(config, fixtures::directory());
    assert_err_matches!(
        builder.user_name_mapper(),
        BuildError::Config(ConfigError::InvalidDn { .. })
    );
}
