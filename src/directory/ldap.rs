//! LDAP backend built on `ldap3`.
//!
//! Every search opens its own connection, binds, streams the results and
//! unbinds. The adapter above caches what it fetched, so a sync run issues
//! few enough searches that pooling is not worth the shared mutable state.
//!
//! Connecting is bounded by `connectTimeout`; the bind and the whole search
//! (including every streamed page) are each bounded by `operationTimeout`.

use crate::config::ConnectionParameters;
use crate::directory::{DirectoryClient, DirectoryConnector, SearchRequest};
use crate::entry::Entry;
use crate::error::{DirectoryError, DirectoryResult};
use crate::query::{DerefAliases, Scope};
use ldap3::adapters::{Adapter, EntriesOnly, PagedResults};
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, SearchEntry, SearchOptions};
use log::{debug, warn};
use std::future::Future;
use std::time::Duration;

const RC_SUCCESS: u32 = 0;
const RC_NO_SUCH_OBJECT: u32 = 32;
const RC_INVALID_CREDENTIALS: u32 = 49;

/// Opens [`LdapClient`]s. Opening never touches the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct LdapConnector;

impl DirectoryConnector for LdapConnector {
    type Client = LdapClient;

    fn open(&self, parameters: &ConnectionParameters) -> DirectoryResult<Self::Client> {
        debug!(
            "Preparing LDAP client for {} (start_tls={}, skip_tls_verify={})",
            parameters.url,
            parameters.uses_start_tls(),
            parameters.skip_tls_verify
        );
        Ok(LdapClient {
            parameters: parameters.clone(),
        })
    }
}

/// Directory client talking to a live LDAP server.
#[derive(Debug, Clone)]
pub struct LdapClient {
    parameters: ConnectionParameters,
}

impl LdapClient {
    async fn connect(&self) -> DirectoryResult<Ldap> {
        let timeout = self.parameters.connect_timeout();
        let settings = LdapConnSettings::new()
            .set_conn_timeout(timeout)
            .set_starttls(self.parameters.uses_start_tls())
            .set_no_tls_verify(self.parameters.skip_tls_verify);

        let (conn, mut ldap) = tokio::time::timeout(
            timeout,
            LdapConnAsync::with_settings(settings, &self.parameters.url),
        )
        .await
        .map_err(|_| DirectoryError::Timeout(timeout))?
        .map_err(|e| {
            DirectoryError::connection(format!("Failed to connect to {}: {}", self.parameters.url, e))
        })?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!("LDAP connection driver error: {}", e);
            }
        });

        if !self.parameters.bind_dn.is_empty() {
            bounded(self.parameters.operation_timeout(), self.bind(&mut ldap)).await?;
        }

        Ok(ldap)
    }

    async fn bind(&self, ldap: &mut Ldap) -> DirectoryResult<()> {
        let password = self.parameters.bind_password.as_deref().unwrap_or("");
        let result = ldap
            .simple_bind(&self.parameters.bind_dn, password)
            .await
            .map_err(|e| DirectoryError::connection(format!("Bind failed: {}", e)))?;
        match result.rc {
            RC_SUCCESS => Ok(()),
            RC_INVALID_CREDENTIALS => Err(DirectoryError::Authentication {
                bind_dn: self.parameters.bind_dn.clone(),
            }),
            rc => Err(DirectoryError::connection(format!(
                "Bind failed with code {}: {}",
                rc, result.text
            ))),
        }
    }

    async fn run_search(ldap: &mut Ldap, request: &SearchRequest) -> DirectoryResult<Vec<Entry>> {
        let base = request.base_dn.to_string();
        let filter = request.filter.to_string();
        let options = SearchOptions::new()
            .deref(deref_aliases(request.deref_aliases))
            .timelimit(i32::try_from(request.time_limit).unwrap_or(i32::MAX));

        let mut adapters: Vec<Box<dyn Adapter<'_, String, Vec<String>>>> =
            vec![Box::new(EntriesOnly::new())];
        if request.page_size > 0 {
            let page_size = i32::try_from(request.page_size).unwrap_or(i32::MAX);
            adapters.push(Box::new(PagedResults::new(page_size)));
        }

        let mut stream = ldap
            .with_search_options(options)
            .streaming_search_with(
                adapters,
                &base,
                scope(request.scope),
                &filter,
                request.attributes.clone(),
            )
            .await
            .map_err(|e| DirectoryError::operation(format!("Search under '{}' failed: {}", base, e)))?;

        let mut entries = Vec::new();
        while let Some(raw) = stream
            .next()
            .await
            .map_err(|e| DirectoryError::operation(format!("Search under '{}' failed: {}", base, e)))?
        {
            entries.push(to_entry(SearchEntry::construct(raw)));
        }

        let result = stream.finish().await;
        match result.rc {
            RC_SUCCESS => Ok(entries),
            RC_NO_SUCH_OBJECT => Err(DirectoryError::NoSuchObject { dn: base }),
            rc => Err(DirectoryError::operation(format!(
                "Search under '{}' returned code {}: {}",
                base, rc, result.text
            ))),
        }
    }
}

impl DirectoryClient for LdapClient {
    async fn search(&self, request: &SearchRequest) -> DirectoryResult<Vec<Entry>> {
        let limit = self.parameters.operation_timeout();
        let mut ldap = self.connect().await?;
        let result = bounded(limit, Self::run_search(&mut ldap, request)).await;
        match tokio::time::timeout(limit, ldap.unbind()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("Unbind from {} failed: {}", self.parameters.url, e),
            Err(_) => debug!("Unbind from {} timed out", self.parameters.url),
        }

        if let Ok(entries) = &result {
            debug!(
                "LDAP search base='{}' scope={} filter={} returned {} entries",
                request.base_dn,
                request.scope,
                request.filter,
                entries.len()
            );
        }
        result
    }
}

/// Run `operation`, failing with [`DirectoryError::Timeout`] once `limit` passes.
async fn bounded<T>(
    limit: Duration,
    operation: impl Future<Output = DirectoryResult<T>>,
) -> DirectoryResult<T> {
    tokio::time::timeout(limit, operation)
        .await
        .map_err(|_| DirectoryError::Timeout(limit))?
}

fn scope(scope: Scope) -> ldap3::Scope {
    match scope {
        Scope::Base => ldap3::Scope::Base,
        Scope::OneLevel => ldap3::Scope::OneLevel,
        Scope::Subtree => ldap3::Scope::Subtree,
    }
}

fn deref_aliases(deref: DerefAliases) -> ldap3::DerefAliases {
    match deref {
        DerefAliases::Never => ldap3::DerefAliases::Never,
        DerefAliases::Searching => ldap3::DerefAliases::Searching,
        DerefAliases::Finding => ldap3::DerefAliases::Finding,
        DerefAliases::Always => ldap3::DerefAliases::Always,
    }
}

fn to_entry(raw: SearchEntry) -> Entry {
    let mut entry = Entry::new(raw.dn);
    for (name, values) in raw.attrs {
        entry.set_attribute(name, values);
    }
    entry
}
