//! Group existence checks.

use crate::common::builder_for;
use crate::common::builders::GroupEntryBuilder;
use crate::common::fixtures::{self, dns};
use crate::common::test_utils::{RecordingHandler, UnavailableDirectory};
use group_sync_builders::{DirectoryError, Entry, SchemaConfig, SyncError};

#[tokio::test]
async fn test_present_and_absent_groups() {
    let builder = builder_for(fixtures::posix_config(), fixtures::directory());
    let detector = builder.group_detector().unwrap();
    assert!(detector.exists("admins").await.unwrap());
    assert!(!detector.exists("nobody").await.unwrap());
}

#[tokio::test]
async fn test_dn_keyed_detection() {
    let builder = builder_for(fixtures::group_of_names_config(), fixtures::directory());
    let detector = builder.group_detector().unwrap();

    assert!(detector.exists(dns::PLATFORM).await.unwrap());
    // Missing base entry.
    assert!(!detector.exists("cn=gone,ou=groups,dc=example,dc=com").await.unwrap());
    // Outside the group base.
    assert!(!detector.exists("cn=platform,ou=teams,dc=example,dc=com").await.unwrap());
    // Exists, but the group filter rejects it.
    assert!(!detector.exists(dns::ADMINS).await.unwrap());
}

#[tokio::test]
async fn test_deleted_group_is_detected() {
    let directory = fixtures::directory();
    let builder = builder_for(fixtures::posix_config(), directory.clone());
    let detector = builder.group_detector().unwrap();

    directory.remove(dns::ADMINS).await;
    assert!(!detector.exists("admins").await.unwrap());
}

fn duplicate_gid_directory() -> group_sync_builders::InMemoryDirectory {
    group_sync_builders::InMemoryDirectory::with_entries([
        GroupEntryBuilder::posix("blue").gid(4000).build(),
        GroupEntryBuilder::posix("green").gid(4000).build(),
    ])
}

fn gid_keyed_config() -> SchemaConfig {
    let mut config = fixtures::posix_config();
    config.group_uid_attribute = "gidNumber".to_string();
    config
}

#[tokio::test]
async fn test_ambiguous_group_aborts_by_default() {
    let builder = builder_for(gid_keyed_config(), duplicate_gid_directory());
    let error = builder.group_detector().unwrap().exists("4000").await.unwrap_err();
    assert!(matches!(error, SyncError::MultipleEntries { count: 2, .. }));
}

#[tokio::test]
async fn test_ambiguous_group_skipped_counts_as_present() {
    let handler = RecordingHandler::skipping();
    let builder = builder_for(gid_keyed_config(), duplicate_gid_directory())
        .with_error_handler(handler.clone());

    assert!(builder.group_detector().unwrap().exists("4000").await.unwrap());
    assert_eq!(handler.seen().len(), 1);
}

#[tokio::test]
async fn test_directory_failures_are_not_absence() {
    let builder = builder_for(fixtures::posix_config(), UnavailableDirectory);
    let error = builder.group_detector().unwrap().exists("admins").await.unwrap_err();
    assert!(matches!(
        error,
        SyncError::Directory(DirectoryError::Operation { .. })
    ));
}

const TRAILING_SPACE_GROUP: &str = r"cn=ops\ ,ou=groups,dc=example,dc=com";

#[tokio::test]
async fn test_group_dn_with_escaped_trailing_space_exists() {
    let directory = fixtures::directory();
    assert!(
        directory
            .insert(
                Entry::new(TRAILING_SPACE_GROUP)
                    .with_attribute("objectClass", ["groupOfNames"])
                    .with_attribute("cn", ["ops "]),
            )
            .await
    );

    let builder = builder_for(fixtures::group_of_names_config(), directory);
    let detector = builder.group_detector().unwrap();
    assert!(detector.exists(TRAILING_SPACE_GROUP).await.unwrap());
    // The unescaped sibling is a different entry.
    assert!(!detector.exists("cn=ops,ou=groups,dc=example,dc=com").await.unwrap());
}

#[tokio::test]
async fn test_malformed_group_dn_is_not_absence() {
    let builder = builder_for(fixtures::group_of_names_config(), fixtures::directory());
    let error = builder
        .group_detector()
        .unwrap()
        .exists("cn=ops,ou=groups,dc")
        .await
        .unwrap_err();
    assert!(matches!(error, SyncError::InvalidDn { ref value, .. } if value == "cn=ops,ou=groups,dc"));
}

#[tokio::test]
async fn test_malformed_group_dn_skipped_counts_as_present() {
    let handler = RecordingHandler::skipping();
    let builder = builder_for(fixtures::group_of_names_config(), fixtures::directory())
        .with_error_handler(handler.clone());

    assert!(builder.group_detector().unwrap().exists(r"cn=ops\").await.unwrap());
    assert_eq!(handler.seen().len(), 1);
}
