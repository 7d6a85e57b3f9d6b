//! Pluggable handling of per-entry failures.
//!
//! Capabilities never decide on their own whether a failed entry aborts the
//! run. They hand the error to an [`ErrorHandler`], which votes
//! [`ErrorDecision::Skip`] or [`ErrorDecision::Abort`].
//!
//! The stock handlers cover the two tolerances a sync configuration can ask
//! for (members that no longer exist and members outside the user query's
//! base). [`ErrorPolicy::from_config`] assembles them from a [`SchemaConfig`].

use crate::config::SchemaConfig;
use crate::error::{SyncError, SyncResult};
use log::warn;
use std::fmt;
use std::sync::Arc;

/// Outcome of handling one failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDecision {
    /// Drop the failing entry and continue
    Skip,
    /// Stop and surface the error
    Abort,
}

/// Decides whether a per-entry failure is tolerated.
pub trait ErrorHandler: Send + Sync + fmt::Debug {
    fn handle_error(&self, error: &SyncError) -> ErrorDecision;
}

/// Consult `handler` and turn its decision into a result.
///
/// `Ok(())` means the caller should skip the entry and keep going.
pub fn resolve(handler: &dyn ErrorHandler, error: SyncError) -> SyncResult<()> {
    match handler.handle_error(&error) {
        ErrorDecision::Skip => Ok(()),
        ErrorDecision::Abort => Err(error),
    }
}

/// Aborts on every error. The default policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbortOnError;

impl ErrorHandler for AbortOnError {
    fn handle_error(&self, _error: &SyncError) -> ErrorDecision {
        ErrorDecision::Abort
    }
}

/// Skips member lookups whose member entry does not exist.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemberNotFoundSuppressor;

impl ErrorHandler for MemberNotFoundSuppressor {
    fn handle_error(&self, error: &SyncError) -> ErrorDecision {
        match error {
            SyncError::MemberLookup { source, .. } if source.is_not_found() => {
                warn!("Skipping missing group member: {}", error);
                ErrorDecision::Skip
            }
            _ => ErrorDecision::Abort,
        }
    }
}

/// Skips member lookups that point outside the user query's base.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemberOutOfScopeSuppressor;

impl ErrorHandler for MemberOutOfScopeSuppressor {
    fn handle_error(&self, error: &SyncError) -> ErrorDecision {
        match error {
            SyncError::MemberLookup { source, .. } if source.is_out_of_bounds() => {
                warn!("Skipping out-of-scope group member: {}", error);
                ErrorDecision::Skip
            }
            _ => ErrorDecision::Abort,
        }
    }
}

/// Skips if any inner handler skips.
#[derive(Debug, Clone, Default)]
pub struct CompoundHandler {
    handlers: Vec<Arc<dyn ErrorHandler>>,
}

impl CompoundHandler {
    pub fn new(handlers: Vec<Arc<dyn ErrorHandler>>) -> Self {
        Self { handlers }
    }

    pub fn with_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl ErrorHandler for CompoundHandler {
    fn handle_error(&self, error: &SyncError) -> ErrorDecision {
        if self
            .handlers
            .iter()
            .any(|h| h.handle_error(error) == ErrorDecision::Skip)
        {
            ErrorDecision::Skip
        } else {
            ErrorDecision::Abort
        }
    }
}

/// Ready-made policies.
pub struct ErrorPolicy;

impl ErrorPolicy {
    /// The policy a sync configuration asks for through its tolerate flags.
    pub fn from_config(config: &SchemaConfig) -> Arc<dyn ErrorHandler> {
        let mut compound = CompoundHandler::default();
        if config.tolerate_member_not_found_errors {
            compound = compound.with_handler(Arc::new(MemberNotFoundSuppressor));
        }
        if config.tolerate_member_out_of_scope_errors {
            compound = compound.with_handler(Arc::new(MemberOutOfScopeSuppressor));
        }

        if compound.is_empty() {
            Arc::new(AbortOnError)
        } else {
            Arc::new(compound)
        }
    }

    /// Abort on everything.
    pub fn strict() -> Arc<dyn ErrorHandler> {
        Arc::new(AbortOnError)
    }
}
