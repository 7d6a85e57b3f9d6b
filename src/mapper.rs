//! Name mapping by ordered attribute fallback.
//!
//! A name is the first non-empty value found walking the configured
//! attributes in order. When nothing matches, the failure goes to the error
//! policy. A skip comes back as [`SyncError::Skipped`] so the caller can drop
//! the entry without confusing it with an abort.

use crate::capabilities::{GroupEntryLookup, GroupNameMapper};
use crate::entry::Entry;
use crate::error::{SyncError, SyncResult};
use crate::error_policy::{ErrorDecision, ErrorHandler};
use async_trait::async_trait;
use std::sync::Arc;

/// Map `entry` to a name using `attributes` in order.
pub fn map_entry_name(
    entry: &Entry,
    attributes: &[String],
    handler: &dyn ErrorHandler,
) -> SyncResult<String> {
    match entry.first_non_empty(attributes) {
        Some(name) => Ok(name.to_string()),
        None => Err(escalate(
            handler,
            SyncError::Mapping {
                dn: entry.dn().to_string(),
                attributes: attributes.to_vec(),
            },
        )),
    }
}

/// Ask `handler` about `error` and tag it as skipped if the handler says so.
fn escalate(handler: &dyn ErrorHandler, error: SyncError) -> SyncError {
    match handler.handle_error(&error) {
        ErrorDecision::Skip => SyncError::Skipped(Box::new(error)),
        ErrorDecision::Abort => error,
    }
}

/// Group name mapper reading names from attributes of the group entry.
pub struct EntryAttributeGroupNameMapper {
    name_attributes: Vec<String>,
    lookup: Arc<dyn GroupEntryLookup>,
    error_handler: Arc<dyn ErrorHandler>,
}

impl EntryAttributeGroupNameMapper {
    pub fn new(
        name_attributes: Vec<String>,
        lookup: Arc<dyn GroupEntryLookup>,
        error_handler: Arc<dyn ErrorHandler>,
    ) -> Self {
        Self {
            name_attributes,
            lookup,
            error_handler,
        }
    }

    /// Map an already fetched group entry.
    pub fn name_for_entry(&self, group: &Entry) -> SyncResult<String> {
        map_entry_name(group, &self.name_attributes, self.error_handler.as_ref())
    }
}

#[async_trait]
impl GroupNameMapper for EntryAttributeGroupNameMapper {
    async fn group_name_for(&self, group_uid: &str) -> SyncResult<String> {
        let group = self
            .lookup
            .group_entry_for(group_uid)
            .await
            .map_err(|e| escalate(self.error_handler.as_ref(), e))?;
        self.name_for_entry(&group)
    }
}

impl std::fmt::Debug for EntryAttributeGroupNameMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryAttributeGroupNameMapper")
            .field("name_attributes", &self.name_attributes)
            .field("error_handler", &self.error_handler)
            .finish_non_exhaustive()
    }
}
