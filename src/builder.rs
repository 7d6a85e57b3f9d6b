//! Capability builders.
//!
//! A builder holds connection parameters, a [`SchemaConfig`] and an error
//! policy. Nothing touches the directory until the first capability is
//! requested; that request validates the configuration, compiles both
//! queries, opens a client and stores the resulting adapter. Every later
//! request, from any thread, gets a view over that same adapter.
//!
//! # Example Usage
//!
//! ```rust
//! use group_sync_builders::builder::Rfc2307Builder;
//! use group_sync_builders::config::{ConnectionParameters, QueryDefinition, SchemaConfig};
//! use group_sync_builders::directory::InMemoryDirectory;
//!
//! let config = SchemaConfig::new(
//!     QueryDefinition::new("ou=groups,dc=example,dc=com", "(objectClass=posixGroup)"),
//!     "cn",
//!     QueryDefinition::new("ou=users,dc=example,dc=com", "(objectClass=inetOrgPerson)"),
//!     "uid",
//! )
//! .with_group_membership_attributes(["memberUid"])
//! .with_user_name_attributes(["uid"]);
//!
//! let directory = InMemoryDirectory::new();
//! let builder = Rfc2307Builder::new(
//!     ConnectionParameters::new("ldap://directory.example.com"),
//!     config,
//!     directory.clone(),
//! );
//!
//! assert!(!builder.is_built());
//! let _lister = builder.group_lister()?;
//! let _detector = builder.group_detector()?;
//! assert_eq!(directory.open_count(), 1);
//! # Ok::<(), group_sync_builders::error::BuildError>(())
//! ```

use crate::capabilities::{
    GroupDetector, GroupLister, GroupNameMapper, MemberExtractor, UserNameMapper,
};
use crate::config::{ConnectionParameters, SchemaConfig};
use crate::directory::DirectoryConnector;
use crate::error::BuildResult;
use crate::error_policy::{ErrorHandler, ErrorPolicy};
use crate::mapper::EntryAttributeGroupNameMapper;
use crate::query::AttributeQuery;
use crate::rfc2307::Rfc2307Directory;
use log::{debug, info};
use std::sync::{Arc, Mutex, PoisonError};

/// Capabilities needed to synchronize directory groups into local groups.
pub trait SyncBuilder {
    fn group_lister(&self) -> BuildResult<Arc<dyn GroupLister>>;

    /// `None` when the configuration names no group name attributes.
    fn group_name_mapper(&self) -> BuildResult<Option<Arc<dyn GroupNameMapper>>>;

    fn user_name_mapper(&self) -> BuildResult<Arc<dyn UserNameMapper>>;

    fn group_member_extractor(&self) -> BuildResult<Arc<dyn MemberExtractor>>;
}

/// Capabilities needed to prune local groups whose directory group is gone.
pub trait PruneBuilder {
    fn group_lister(&self) -> BuildResult<Arc<dyn GroupLister>>;

    fn group_name_mapper(&self) -> BuildResult<Option<Arc<dyn GroupNameMapper>>>;

    fn group_detector(&self) -> BuildResult<Arc<dyn GroupDetector>>;
}

/// Builds RFC2307 capabilities over one lazily constructed adapter.
pub struct Rfc2307Builder<K: DirectoryConnector> {
    connection: ConnectionParameters,
    config: SchemaConfig,
    error_handler: Arc<dyn ErrorHandler>,
    connector: K,
    adapter: Mutex<Option<Arc<Rfc2307Directory<K::Client>>>>,
}

impl<K: DirectoryConnector> Rfc2307Builder<K> {
    /// Create a builder whose error policy follows the config's tolerate flags.
    pub fn new(connection: ConnectionParameters, config: SchemaConfig, connector: K) -> Self {
        let error_handler = ErrorPolicy::from_config(&config);
        Self {
            connection,
            config,
            error_handler,
            connector,
            adapter: Mutex::new(None),
        }
    }

    /// Replace the error policy. Has no effect on an adapter already built.
    pub fn with_error_handler(mut self, error_handler: Arc<dyn ErrorHandler>) -> Self {
        self.error_handler = error_handler;
        self
    }

    pub fn config(&self) -> &SchemaConfig {
        &self.config
    }

    pub fn connection(&self) -> &ConnectionParameters {
        &self.connection
    }

    /// Whether the shared adapter has been constructed.
    pub fn is_built(&self) -> bool {
        self.slot().is_some()
    }

    pub fn group_lister(&self) -> BuildResult<Arc<dyn GroupLister>> {
        Ok(self.ensure_adapter()?)
    }

    /// Group name mapper, or `None` when no group name attributes are configured.
    ///
    /// The adapter is built either way, so configuration errors surface here too.
    pub fn group_name_mapper(&self) -> BuildResult<Option<Arc<dyn GroupNameMapper>>> {
        let adapter = self.ensure_adapter()?;
        let Some(attributes) = &self.config.group_name_attributes else {
            debug!("No group name attributes configured; group names come from elsewhere");
            return Ok(None);
        };

        let mapper = EntryAttributeGroupNameMapper::new(
            attributes.clone(),
            adapter,
            Arc::clone(&self.error_handler),
        );
        Ok(Some(Arc::new(mapper)))
    }

    pub fn user_name_mapper(&self) -> BuildResult<Arc<dyn UserNameMapper>> {
        Ok(self.ensure_adapter()?)
    }

    pub fn group_member_extractor(&self) -> BuildResult<Arc<dyn MemberExtractor>> {
        Ok(self.ensure_adapter()?)
    }

    pub fn group_detector(&self) -> BuildResult<Arc<dyn GroupDetector>> {
        Ok(self.ensure_adapter()?)
    }

    /// Return the shared adapter, constructing it on first use.
    ///
    /// The slot stays locked for the whole construction, so concurrent first
    /// calls open exactly one client. A failed construction leaves the slot
    /// empty and the next call tries again.
    fn ensure_adapter(&self) -> BuildResult<Arc<Rfc2307Directory<K::Client>>> {
        let mut slot = self.slot();
        if let Some(adapter) = slot.as_ref() {
            return Ok(Arc::clone(adapter));
        }

        self.connection.validate()?;
        self.config.validate_attributes()?;
        let group_query =
            AttributeQuery::new(&self.config.group_query, &self.config.group_uid_attribute)?;
        let user_query =
            AttributeQuery::new(&self.config.user_query, &self.config.user_uid_attribute)?;

        let client = self.connector.open(&self.connection)?;
        let adapter = Arc::new(Rfc2307Directory::new(
            client,
            group_query,
            user_query,
            &self.config,
            Arc::clone(&self.error_handler),
        ));
        info!(
            "Built RFC2307 adapter for {} (groups under '{}', users under '{}')",
            self.connection.url, self.config.group_query.base_dn, self.config.user_query.base_dn
        );

        *slot = Some(Arc::clone(&adapter));
        Ok(adapter)
    }

    // The slot is only written after construction succeeds, so a panic in a
    // connector's `open` leaves it empty or holding a finished adapter.
    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Arc<Rfc2307Directory<K::Client>>>> {
        self.adapter.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K: DirectoryConnector> SyncBuilder for Rfc2307Builder<K> {
    fn group_lister(&self) -> BuildResult<Arc<dyn GroupLister>> {
        Rfc2307Builder::group_lister(self)
    }

    fn group_name_mapper(&self) -> BuildResult<Option<Arc<dyn GroupNameMapper>>> {
        Rfc2307Builder::group_name_mapper(self)
    }

    fn user_name_mapper(&self) -> BuildResult<Arc<dyn UserNameMapper>> {
        Rfc2307Builder::user_name_mapper(self)
    }

    fn group_member_extractor(&self) -> BuildResult<Arc<dyn MemberExtractor>> {
        Rfc2307Builder::group_member_extractor(self)
    }
}

impl<K: DirectoryConnector> PruneBuilder for Rfc2307Builder<K> {
    fn group_lister(&self) -> BuildResult<Arc<dyn GroupLister>> {
        Rfc2307Builder::group_lister(self)
    }

    fn group_name_mapper(&self) -> BuildResult<Option<Arc<dyn GroupNameMapper>>> {
        Rfc2307Builder::group_name_mapper(self)
    }

    fn group_detector(&self) -> BuildResult<Arc<dyn GroupDetector>> {
        Rfc2307Builder::group_detector(self)
    }
}

impl<K: DirectoryConnector> std::fmt::Debug for Rfc2307Builder<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rfc2307Builder")
            .field("connection", &self.connection)
            .field("config", &self.config)
            .field("error_handler", &self.error_handler)
            .field("built", &self.is_built())
            .finish_non_exhaustive()
    }
}
