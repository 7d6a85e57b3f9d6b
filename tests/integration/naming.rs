//! Group and user name mapping.

use crate::common::builder_for;
use crate::common::fixtures::{self, dns};
use crate::common::test_utils::RecordingHandler;
use group_sync_builders::{Entry, SyncError};

#[tokio::test]
async fn test_group_names_follow_attribute_order() {
    let builder = builder_for(fixtures::posix_config(), fixtures::directory());
    let mapper = builder.group_name_mapper().unwrap().unwrap();

    // description wins where present, cn fills in otherwise.
    assert_eq!(mapper.group_name_for("admins").await.unwrap(), "Administrators");
    assert_eq!(mapper.group_name_for("developers").await.unwrap(), "developers");
}

#[tokio::test]
async fn test_dn_keyed_group_names() {
    let builder = builder_for(fixtures::group_of_names_config(), fixtures::directory());
    let mapper = builder.group_name_mapper().unwrap().unwrap();
    assert_eq!(mapper.group_name_for(dns::PLATFORM).await.unwrap(), "Platform Team");
}

#[tokio::test]
async fn test_unmappable_group_aborts_by_default() {
    let builder = builder_for(fixtures::group_of_names_config(), fixtures::directory());
    let mapper = builder.group_name_mapper().unwrap().unwrap();

    match mapper.group_name_for(dns::UNNAMED).await {
        Err(SyncError::Mapping { dn, attributes }) => {
            assert_eq!(dn, dns::UNNAMED);
            assert_eq!(attributes, vec!["description", "cn"]);
        }
        other => panic!("expected Mapping error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unmappable_group_can_be_skipped() {
    let handler = RecordingHandler::skipping();
    let builder = builder_for(fixtures::group_of_names_config(), fixtures::directory())
        .with_error_handler(handler.clone());
    let mapper = builder.group_name_mapper().unwrap().unwrap();

    let error = mapper.group_name_for(dns::UNNAMED).await.unwrap_err();
    assert!(error.is_skippable());
    assert_eq!(handler.seen().len(), 1);
}

#[tokio::test]
async fn test_unknown_group_name_lookup() {
    let builder = builder_for(fixtures::posix_config(), fixtures::directory());
    let mapper = builder.group_name_mapper().unwrap().unwrap();
    let error = mapper.group_name_for("nobody").await.unwrap_err();
    assert!(error.is_not_found());
}

#[tokio::test]
async fn test_user_names_from_extracted_members() {
    let builder = builder_for(fixtures::posix_config(), fixtures::directory());
    let members = builder
        .group_member_extractor()
        .unwrap()
        .extract_members("admins")
        .await
        .unwrap();
    let mapper = builder.user_name_mapper().unwrap();

    let names: Vec<String> = members
        .iter()
        .map(|m| mapper.user_name_for(m).unwrap())
        .collect();
    // alice has mail, bob falls back to uid.
    assert_eq!(names, vec!["alice@example.com", "bob"]);
}

#[test]
fn test_user_without_name_attributes() {
    let builder = builder_for(fixtures::posix_config(), fixtures::directory());
    let mapper = builder.user_name_mapper().unwrap();

    let nameless = Entry::new(dns::EVE).with_attribute("mail", [""]);
    match mapper.user_name_for(&nameless) {
        Err(SyncError::Mapping { dn, attributes }) => {
            assert_eq!(dn, dns::EVE);
            assert_eq!(attributes, vec!["mail", "uid"]);
        }
        other => panic!("expected Mapping error, got {:?}", other),
    }
}
