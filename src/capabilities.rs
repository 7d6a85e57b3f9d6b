//! Narrow capability contracts handed to the synchronization engine.
//!
//! The engine depends only on the capability it needs. A builder hands out
//! every capability as an `Arc<dyn ...>` view over one shared adapter, so the
//! engine never sees the concrete adapter type.

use crate::entry::Entry;
use crate::error::SyncResult;
use async_trait::async_trait;

/// Enumerates every group in scope.
#[async_trait]
pub trait GroupLister: Send + Sync {
    /// UIDs of all groups selected by the group query, in directory order.
    async fn list_groups(&self) -> SyncResult<Vec<String>>;
}

/// Fetches the directory entry behind a group UID.
#[async_trait]
pub trait GroupEntryLookup: Send + Sync {
    async fn group_entry_for(&self, group_uid: &str) -> SyncResult<Entry>;
}

/// Resolves a group UID to the name of the local group it syncs into.
#[async_trait]
pub trait GroupNameMapper: Send + Sync {
    async fn group_name_for(&self, group_uid: &str) -> SyncResult<String>;
}

/// Resolves a user entry to the user name recorded in local groups.
pub trait UserNameMapper: Send + Sync {
    fn user_name_for(&self, user: &Entry) -> SyncResult<String>;
}

/// Resolves the members recorded on a group into user entries.
#[async_trait]
pub trait MemberExtractor: Send + Sync {
    async fn extract_members(&self, group_uid: &str) -> SyncResult<Vec<Entry>>;
}

/// Reports whether a group still has a live directory counterpart.
#[async_trait]
pub trait GroupDetector: Send + Sync {
    /// `Ok(false)` when nothing matches; never an error for a missing group.
    async fn exists(&self, group_uid: &str) -> SyncResult<bool>;
}
