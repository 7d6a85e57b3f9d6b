//! Lazy construction and sharing of the directory adapter.

use crate::assert_err_matches;
use crate::common::test_utils::CountingConnector;
use crate::common::{builder_for, fixtures};
use group_sync_builders::{BuildError, ConfigError, DirectoryError};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_nothing_happens_before_first_accessor() {
    let directory = fixtures::directory();
    let builder = builder_for(fixtures::posix_config(), directory.clone());

    assert!(!builder.is_built());
    assert_eq!(directory.open_count(), 0);
    assert_eq!(directory.search_count(), 0);

    builder.group_detector().unwrap();
    assert!(builder.is_built());
    assert_eq!(directory.open_count(), 1);
    // Construction itself runs no search.
    assert_eq!(directory.search_count(), 0);
}

#[test]
fn test_every_accessor_reuses_the_adapter() {
    let directory = fixtures::directory();
    let builder = builder_for(fixtures::posix_config(), directory.clone());

    let lister = builder.group_lister().unwrap();
    let detector = builder.group_detector().unwrap();
    builder.group_name_mapper().unwrap().unwrap();
    builder.user_name_mapper().unwrap();
    builder.group_member_extractor().unwrap();

    assert_eq!(directory.open_count(), 1);
    assert_eq!(
        Arc::as_ptr(&lister) as *const (),
        Arc::as_ptr(&detector) as *const ()
    );
}

#[tokio::test]
async fn test_capabilities_share_cached_entries() {
    let directory = fixtures::directory();
    let builder = builder_for(fixtures::posix_config(), directory.clone());

    builder.group_lister().unwrap().list_groups().await.unwrap();
    let after_listing = directory.search_count();

    let mapper = builder.group_name_mapper().unwrap().unwrap();
    assert_eq!(mapper.group_name_for("admins").await.unwrap(), "Administrators");
    assert!(builder.group_detector().unwrap().exists("developers").await.unwrap());
    assert_eq!(directory.search_count(), after_listing);
}

#[test]
fn test_concurrent_first_calls_open_once() {
    let connector = CountingConnector::new(fixtures::directory())
        .with_open_delay(Duration::from_millis(50));
    let builder = builder_for(fixtures::posix_config(), connector.clone());

    let pointers: Vec<usize> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let builder = &builder;
                scope.spawn(move || {
                    if i % 2 == 0 {
                        Arc::as_ptr(&builder.group_lister().unwrap()) as *const () as usize
                    } else {
                        Arc::as_ptr(&builder.group_detector().unwrap()) as *const () as usize
                    }
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(connector.opens(), 1);
    assert!(pointers.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn test_failed_connection_is_not_memoized() {
    let connector = CountingConnector::new(fixtures::directory()).failing_first(1);
    let builder = builder_for(fixtures::posix_config(), connector.clone());

    assert_err_matches!(
        builder.group_lister(),
        BuildError::Connect(DirectoryError::Connection { .. })
    );
    assert!(!builder.is_built());

    builder.group_lister().unwrap();
    assert!(builder.is_built());
    assert_eq!(connector.opens(), 2);
}

#[test]
fn test_invalid_config_fails_every_accessor() {
    let directory = fixtures::directory();
    let mut config = fixtures::posix_config();
    config.group_membership_attributes.clear();
    let builder = builder_for(config, directory.clone());

    assert_err_matches!(
        builder.group_lister(),
        BuildError::Config(ConfigError::MissingAttributes { .. })
    );
    assert_err_matches!(
        builder.group_name_mapper(),
        BuildError::Config(ConfigError::MissingAttributes { .. })
    );
    assert_err_matches!(
        builder.user_name_mapper(),
        BuildError::Config(ConfigError::MissingAttributes { .. })
    );
    assert_err_matches!(
        builder.group_member_extractor(),
        BuildError::Config(ConfigError::MissingAttributes { .. })
    );
    assert_err_matches!(
        builder.group_detector(),
        BuildError::Config(ConfigError::MissingAttributes { .. })
    );
    assert_eq!(directory.open_count(), 0);
}

#[test]
fn test_group_name_mapper_absent_without_attributes() {
    let directory = fixtures::directory();
    let mut config = fixtures::posix_config();
    config.group_name_attributes = None;
    let builder = builder_for(config, directory.clone());

    assert!(builder.group_name_mapper().unwrap().is_none());
    // The adapter is still built, so later accessors do not open again.
    builder.group_lister().unwrap();
    assert_eq!(directory.open_count(), 1);
}
