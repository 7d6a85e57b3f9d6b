//! Test fixtures for loading directories and configurations.
//!
//! Fixture files live under `tests/fixtures/` and are cached after the first
//! read.

use group_sync_builders::directory::InMemoryDirectory;
use group_sync_builders::{ConnectionParameters, Entry, SchemaConfig};
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

/// Cache for loaded fixtures to avoid repeated file I/O
static FIXTURE_CACHE: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();

/// Load a fixture file as text, with caching
pub fn load_fixture(path: &str) -> String {
    let cache = FIXTURE_CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    let mut cache = cache.lock().unwrap();

    if let Some(cached) = cache.get(path) {
        return cached.clone();
    }

    let fixture_path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), path);
    let content = std::fs::read_to_string(&fixture_path)
        .unwrap_or_else(|_| panic!("Failed to load fixture: {}", fixture_path));
    cache.insert(path.to_string(), content.clone());
    content
}

/// Entries of the fixture directory
pub fn entries() -> Vec<Entry> {
    serde_json::from_str(&load_fixture("rfc2307/directory.json"))
        .expect("Failed to parse directory fixture")
}

/// A fresh in-memory directory holding the fixture entries
pub fn directory() -> InMemoryDirectory {
    InMemoryDirectory::with_entries(entries())
}

/// posixGroup layout: groups keyed on `cn`, members listed by `memberUid`
pub fn posix_config() -> SchemaConfig {
    SchemaConfig::from_json(&load_fixture("rfc2307/posix_sync_config.json"))
        .expect("Failed to parse posix config fixture")
}

/// groupOfNames layout: groups and users keyed on their DN
pub fn group_of_names_config() -> SchemaConfig {
    SchemaConfig::from_json(&load_fixture("rfc2307/group_of_names_sync_config.json"))
        .expect("Failed to parse groupOfNames config fixture")
}

/// Authenticated connection parameters
pub fn bound_connection() -> ConnectionParameters {
    serde_json::from_str(&load_fixture("rfc2307/connection.json"))
        .expect("Failed to parse connection fixture")
}

/// Well-known identifiers in the fixture directory
pub mod dns {
    pub const PLATFORM: &str = "cn=platform,ou=groups,dc=example,dc=com";
    pub const UNNAMED: &str = "cn=unnamed,ou=groups,dc=example,dc=com";
    pub const ADMINS: &str = "cn=admins,ou=groups,dc=example,dc=com";
    pub const ALICE: &str = "uid=alice,ou=users,dc=example,dc=com";
    pub const BOB: &str = "uid=bob,ou=users,dc=example,dc=com";
    pub const CAROL: &str = "uid=carol,ou=users,dc=example,dc=com";
    pub const DAVE: &str = "uid=dave,ou=users,dc=example,dc=com";
    pub const EVE: &str = "uid=eve,ou=contractors,dc=example,dc=com";
}
