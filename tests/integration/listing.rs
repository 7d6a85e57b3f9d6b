//! Group enumeration.

use crate::common::builders::GroupEntryBuilder;
use crate::common::fixtures::{self, dns};
use crate::common::test_utils::RecordingHandler;
use crate::common::builder_for;
use group_sync_builders::SyncError;

#[tokio::test]
async fn test_lists_group_uids_in_directory_order() {
    let builder = builder_for(fixtures::posix_config(), fixtures::directory());
    let groups = builder.group_lister().unwrap().list_groups().await.unwrap();
    assert_eq!(groups, vec!["admins", "developers", "empty"]);
}

#[tokio::test]
async fn test_dn_keyed_groups_list_their_dns() {
    let builder = builder_for(fixtures::group_of_names_config(), fixtures::directory());
    let groups = builder.group_lister().unwrap().list_groups().await.unwrap();
    assert_eq!(groups, vec![dns::PLATFORM, dns::UNNAMED]);
}

#[tokio::test]
async fn test_listing_respects_scope() {
    let directory = fixtures::directory();
    directory
        .insert(GroupEntryBuilder::posix("nested").gid(1500).build())
        .await;
    let deep = group_sync_builders::Entry::new("cn=deep,cn=nested,ou=groups,dc=example,dc=com")
        .with_attribute("objectClass", ["posixGroup"])
        .with_attribute("cn", ["deep"]);
    directory.insert(deep).await;

    // The fixture group query is one-level, so "deep" stays out of scope.
    let builder = builder_for(fixtures::posix_config(), directory);
    let groups = builder.group_lister().unwrap().list_groups().await.unwrap();
    assert!(groups.contains(&"nested".to_string()));
    assert!(!groups.contains(&"deep".to_string()));
}

#[tokio::test]
async fn test_group_without_uid_aborts_by_default() {
    let directory = fixtures::directory();
    directory
        .insert(GroupEntryBuilder::posix_without_cn("ghosts").gid(2000).build())
        .await;

    let builder = builder_for(fixtures::posix_config(), directory);
    let error = builder.group_lister().unwrap().list_groups().await.unwrap_err();
    match error {
        SyncError::MissingUid { dn, attribute } => {
            assert_eq!(dn, "cn=ghosts,ou=groups,dc=example,dc=com");
            assert_eq!(attribute, "cn");
        }
        other => panic!("expected MissingUid, got {:?}", other),
    }
}

#[tokio::test]
async fn test_group_without_uid_can_be_skipped() {
    let directory = fixtures::directory();
    directory
        .insert(GroupEntryBuilder::posix_without_cn("ghosts").gid(2000).build())
        .await;

    let handler = RecordingHandler::skipping();
    let builder = builder_for(fixtures::posix_config(), directory).with_error_handler(handler.clone());
    let groups = builder.group_lister().unwrap().list_groups().await.unwrap();

    assert_eq!(groups, vec!["admins", "developers", "empty"]);
    assert_eq!(handler.seen().len(), 1);
    assert!(handler.seen()[0].contains("cn=ghosts"));
}

#[tokio::test]
async fn test_empty_directory_lists_nothing() {
    let builder = builder_for(
        fixtures::posix_config(),
        group_sync_builders::InMemoryDirectory::new(),
    );
    assert!(builder.group_lister().unwrap().list_groups().await.unwrap().is_empty());
}
