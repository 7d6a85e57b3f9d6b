//! Adapter for RFC2307 style schemas.
//!
//! In RFC2307 layouts, group entries record their members directly: each
//! value of a membership attribute (`memberUid`, `member`, ...) identifies a
//! user entry through the user query's UID attribute. One
//! [`Rfc2307Directory`] serves every capability a builder hands out, so group
//! and user entries fetched by one capability are reused by the others.
//!
//! Per-entry failures (a group without a UID, a member that cannot be found,
//! an identifier matching more than one entry) go to the configured
//! [`ErrorHandler`]. Transport failures never do; they always abort.

use crate::capabilities::{
    GroupDetector, GroupEntryLookup, GroupLister, MemberExtractor, UserNameMapper,
};
use crate::config::SchemaConfig;
use crate::directory::{DirectoryClient, SearchRequest};
use crate::entry::Entry;
use crate::error::{SyncError, SyncResult};
use crate::error_policy::{ErrorHandler, resolve};
use crate::mapper::map_entry_name;
use crate::query::AttributeQuery;
use async_trait::async_trait;
use log::{debug, info, trace};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Directory adapter implementing every RFC2307 capability.
pub struct Rfc2307Directory<C: DirectoryClient> {
    client: C,
    group_query: AttributeQuery,
    group_attributes: Vec<String>,
    group_membership_attributes: Vec<String>,
    user_query: AttributeQuery,
    user_attributes: Vec<String>,
    user_name_attributes: Vec<String>,
    error_handler: Arc<dyn ErrorHandler>,
    cached_groups: RwLock<HashMap<String, Entry>>,
    cached_users: RwLock<HashMap<String, Entry>>,
}

impl<C: DirectoryClient> Rfc2307Directory<C> {
    /// Assemble an adapter from compiled queries and the attribute lists in `config`.
    pub fn new(
        client: C,
        group_query: AttributeQuery,
        user_query: AttributeQuery,
        config: &SchemaConfig,
        error_handler: Arc<dyn ErrorHandler>,
    ) -> Self {
        Self {
            client,
            group_query,
            group_attributes: config.group_attributes(),
            group_membership_attributes: config.group_membership_attributes.clone(),
            user_query,
            user_attributes: config.user_attributes(),
            user_name_attributes: config.user_name_attributes.clone(),
            error_handler,
            cached_groups: RwLock::new(HashMap::new()),
            cached_users: RwLock::new(HashMap::new()),
        }
    }

    pub fn group_query(&self) -> &AttributeQuery {
        &self.group_query
    }

    pub fn user_query(&self) -> &AttributeQuery {
        &self.user_query
    }

    pub fn error_handler(&self) -> &Arc<dyn ErrorHandler> {
        &self.error_handler
    }

    /// Fetch the user entry identified by `user_uid`, consulting the cache first.
    pub async fn user_entry_for(&self, user_uid: &str) -> SyncResult<Entry> {
        if let Some(user) = self.cached_users.read().await.get(user_uid) {
            trace!("User cache hit for {}", user_uid);
            return Ok(user.clone());
        }

        let request = self.user_query.search_for(user_uid, &self.user_attributes)?;
        let user = self.query_single(&request).await?;
        self.cached_users
            .write()
            .await
            .insert(user_uid.to_string(), user.clone());
        Ok(user)
    }

    /// Drop every cached entry.
    pub async fn clear_cache(&self) {
        self.cached_groups.write().await.clear();
        self.cached_users.write().await.clear();
    }

    /// Run `request` and require exactly one result.
    async fn query_single(&self, request: &SearchRequest) -> SyncResult<Entry> {
        let mut entries = self.client.search(request).await?;
        match entries.len() {
            0 => Err(SyncError::EntryNotFound {
                base_dn: request.base_dn.to_string(),
                filter: request.filter.to_string(),
            }),
            1 => Ok(entries.remove(0)),
            count => Err(SyncError::MultipleEntries {
                base_dn: request.base_dn.to_string(),
                filter: request.filter.to_string(),
                count,
            }),
        }
    }

    /// Distinct non-empty member identifiers recorded on `group`, in attribute order.
    fn member_uids(&self, group: &Entry) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut uids = Vec::new();
        for attribute in &self.group_membership_attributes {
            for value in group.values(attribute) {
                if !value.is_empty() && seen.insert(value) {
                    uids.push(value.to_string());
                }
            }
        }
        uids
    }
}

#[async_trait]
impl<C: DirectoryClient> GroupEntryLookup for Rfc2307Directory<C> {
    async fn group_entry_for(&self, group_uid: &str) -> SyncResult<Entry> {
        if let Some(group) = self.cached_groups.read().await.get(group_uid) {
            trace!("Group cache hit for {}", group_uid);
            return Ok(group.clone());
        }

        let request = self.group_query.search_for(group_uid, &self.group_attributes)?;
        let group = self.query_single(&request).await?;
        self.cached_groups
            .write()
            .await
            .insert(group_uid.to_string(), group.clone());
        Ok(group)
    }
}

#[async_trait]
impl<C: DirectoryClient> GroupLister for Rfc2307Directory<C> {
    async fn list_groups(&self) -> SyncResult<Vec<String>> {
        let request = self.group_query.search_all(&self.group_attributes);
        let entries = self.client.search(&request).await?;

        let mut uids = Vec::with_capacity(entries.len());
        let mut seen = HashSet::new();
        let mut cache = self.cached_groups.write().await;
        for entry in entries {
            let Some(uid) = self.group_query.key_of(&entry).map(str::to_string) else {
                resolve(
                    self.error_handler.as_ref(),
                    SyncError::MissingUid {
                        dn: entry.dn().to_string(),
                        attribute: self.group_query.attribute().to_string(),
                    },
                )?;
                debug!("Skipping group {} without a UID", entry.dn());
                continue;
            };
            if seen.insert(uid.clone()) {
                cache.insert(uid.clone(), entry);
                uids.push(uid);
            }
        }

        info!(
            "Listed {} groups under '{}'",
            uids.len(),
            self.group_query.query().base_dn()
        );
        Ok(uids)
    }
}

#[async_trait]
impl<C: DirectoryClient> MemberExtractor for Rfc2307Directory<C> {
    async fn extract_members(&self, group_uid: &str) -> SyncResult<Vec<Entry>> {
        let group = self.group_entry_for(group_uid).await?;
        let member_uids = self.member_uids(&group);

        let mut members = Vec::with_capacity(member_uids.len());
        for member_uid in member_uids {
            match self.user_entry_for(&member_uid).await {
                Ok(user) => members.push(user),
                Err(error) => {
                    resolve(
                        self.error_handler.as_ref(),
                        SyncError::member_lookup(group_uid, &member_uid, error),
                    )?;
                }
            }
        }

        debug!("Group {} resolved {} members", group_uid, members.len());
        Ok(members)
    }
}

#[async_trait]
impl<C: DirectoryClient> GroupDetector for Rfc2307Directory<C> {
    async fn exists(&self, group_uid: &str) -> SyncResult<bool> {
        match self.group_entry_for(group_uid).await {
            Ok(_) => Ok(true),
            Err(error) if error.is_not_found() || error.is_out_of_bounds() => {
                debug!("Group {} no longer exists: {}", group_uid, error);
                Ok(false)
            }
            // An ambiguous match still proves the group exists, and an
            // unparseable DN proves nothing about absence.
            Err(error @ (SyncError::MultipleEntries { .. } | SyncError::InvalidDn { .. })) => {
                resolve(self.error_handler.as_ref(), error).map(|()| true)
            }
            Err(error) => Err(error),
        }
    }
}

impl<C: DirectoryClient> UserNameMapper for Rfc2307Directory<C> {
    fn user_name_for(&self, user: &Entry) -> SyncResult<String> {
        map_entry_name(user, &self.user_name_attributes, self.error_handler.as_ref())
    }
}

impl<C: DirectoryClient> std::fmt::Debug for Rfc2307Directory<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rfc2307Directory")
            .field("group_query", &self.group_query)
            .field("user_query", &self.user_query)
            .field("group_membership_attributes", &self.group_membership_attributes)
            .field("user_name_attributes", &self.user_name_attributes)
            .field("error_handler", &self.error_handler)
            .finish_non_exhaustive()
    }
}
