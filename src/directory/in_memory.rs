//! In-memory directory for tests and dry runs.
//!
//! Entries are held in a shared vector behind a tokio `RwLock`; searches
//! evaluate scope and filter locally. Clones share the same data, so a test
//! can keep a handle, hand another to a builder, and mutate the directory
//! between capability calls.
//!
//! # Behavior
//!
//! * Base-scope searches fail with `NoSuchObject` when the base entry is
//!   absent, like a real server
//! * One-level and subtree searches do not require the base entry to exist
//! * Paging, time limits and alias dereferencing are accepted and ignored

use crate::config::ConnectionParameters;
use crate::directory::{DirectoryClient, DirectoryConnector, SearchRequest};
use crate::dn::Dn;
use crate::entry::Entry;
use crate::error::{DirectoryError, DirectoryResult};
use crate::query::Scope;
use log::{debug, trace};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Thread-safe in-memory directory.
#[derive(Clone, Default)]
pub struct InMemoryDirectory {
    entries: Arc<RwLock<Vec<(Dn, Entry)>>>,
    searches: Arc<AtomicUsize>,
    opens: Arc<AtomicUsize>,
}

impl InMemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory pre-populated with `entries`.
    ///
    /// Entries whose DN does not parse are dropped.
    pub fn with_entries(entries: impl IntoIterator<Item = Entry>) -> Self {
        let parsed = entries
            .into_iter()
            .filter_map(|entry| Dn::parse(entry.dn()).ok().map(|dn| (dn, entry)))
            .collect();
        Self {
            entries: Arc::new(RwLock::new(parsed)),
            ..Self::default()
        }
    }

    /// Add or replace an entry. Returns `false` if its DN does not parse.
    pub async fn insert(&self, entry: Entry) -> bool {
        let Ok(dn) = Dn::parse(entry.dn()) else {
            return false;
        };
        let mut guard = self.entries.write().await;
        match guard.iter_mut().find(|(existing, _)| *existing == dn) {
            Some(slot) => slot.1 = entry,
            None => guard.push((dn, entry)),
        }
        true
    }

    /// Remove an entry by DN. Returns whether it existed.
    pub async fn remove(&self, dn: &str) -> bool {
        let Ok(dn) = Dn::parse(dn) else {
            return false;
        };
        let mut guard = self.entries.write().await;
        let before = guard.len();
        guard.retain(|(existing, _)| *existing != dn);
        guard.len() != before
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the directory holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Number of searches executed so far, across all clones.
    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    /// Number of times this directory was opened as a connector.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    fn in_scope(dn: &Dn, request: &SearchRequest) -> bool {
        match request.scope {
            Scope::Base => *dn == request.base_dn,
            Scope::OneLevel => dn.is_child_of(&request.base_dn),
            Scope::Subtree => dn.is_within(&request.base_dn),
        }
    }
}

impl DirectoryClient for InMemoryDirectory {
    async fn search(&self, request: &SearchRequest) -> DirectoryResult<Vec<Entry>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        let guard = self.entries.read().await;

        if request.scope == Scope::Base && !guard.iter().any(|(dn, _)| *dn == request.base_dn) {
            return Err(DirectoryError::NoSuchObject {
                dn: request.base_dn.to_string(),
            });
        }

        let found: Vec<Entry> = guard
            .iter()
            .filter(|(dn, _)| Self::in_scope(dn, request))
            .filter(|(_, entry)| request.filter.matches(entry))
            .map(|(_, entry)| entry.project(&request.attributes))
            .collect();

        debug!(
            "In-memory search base='{}' scope={} filter={} matched {} entries",
            request.base_dn,
            request.scope,
            request.filter,
            found.len()
        );
        Ok(found)
    }
}

impl DirectoryConnector for InMemoryDirectory {
    type Client = InMemoryDirectory;

    fn open(&self, parameters: &ConnectionParameters) -> DirectoryResult<Self::Client> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        trace!("Opening in-memory directory for {}", parameters.url);
        Ok(self.clone())
    }
}

impl std::fmt::Debug for InMemoryDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDirectory")
            .field("searches", &self.search_count())
            .field("opens", &self.open_count())
            .finish_non_exhaustive()
    }
}
