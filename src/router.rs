//! C2S session registry and stanza router.
//!
//! The [`SessionRouter`] tracks every registered client stream, groups
//! authenticated streams by username, and resolves stanza recipients
//! according to the XMPP server rules for handling stanzas: local
//! domain filter, block-list filter, resource selection, and priority
//! tie-break for bare-JID messages.
//!
//! # Lock discipline
//!
//! One reader/writer lock protects the three registry maps. Holders
//! never call into storage or [`ClientStream::send_element`] while the
//! lock is held:
//!
//! - recipient resolution collects matching streams under the read
//!   lock and releases it before any delivery;
//! - the block-list cache follows a double-checked pattern: read-lock
//!   probe, release, storage fetch, write-lock install;
//! - the `user_exists` fallback runs after resolution returned.
//!
//! A send racing an unregister may still reach the removed stream;
//! [`ClientStream::send_element`] is required to tolerate that.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use jid::Jid;
use opentelemetry::KeyValue;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::config::C2sConfig;
use crate::error::RouterError;
use crate::jid_match::{self, jid_matches, JidParts};
use crate::metrics;
use crate::stanza::Stanza;
use crate::storage::Storage;
use crate::stream::ClientStream;

#[derive(Default)]
struct Registry {
    /// Every registered stream, keyed by stream id.
    streams: HashMap<String, Arc<dyn ClientStream>>,
    /// Streams that completed bind and authentication, by username.
    /// Order within a list is insertion order.
    authed: HashMap<String, Vec<Arc<dyn ClientStream>>>,
    /// Memoized per-user block lists; an absent key means "not yet
    /// loaded this lifecycle".
    block_lists: HashMap<String, Vec<Jid>>,
}

/// Session registry and stanza router for client-to-server streams.
pub struct SessionRouter {
    cfg: C2sConfig,
    storage: Arc<dyn Storage>,
    registry: RwLock<Registry>,
}

impl SessionRouter {
    /// Create a session router over the given configuration and storage.
    pub fn new(cfg: C2sConfig, storage: Arc<dyn Storage>) -> Result<Self, RouterError> {
        cfg.validate().map_err(RouterError::Config)?;
        Ok(Self {
            cfg,
            storage,
            registry: RwLock::new(Registry::default()),
        })
    }

    /// Default local domain (the first configured domain).
    pub fn default_local_domain(&self) -> &str {
        // Config is validated non-empty at construction.
        &self.cfg.domains[0]
    }

    /// Whether `domain` is one of the configured local domains.
    pub fn is_local_domain(&self, domain: &str) -> bool {
        self.cfg.domains.iter().any(|d| d == domain)
    }

    /// Register a client stream.
    ///
    /// Fails if the stream's domain is not local or if a stream with
    /// the same id is already registered.
    pub fn register_stream(&self, stm: Arc<dyn ClientStream>) -> Result<(), RouterError> {
        if !self.is_local_domain(&stm.domain()) {
            return Err(RouterError::InvalidDomain(stm.domain()));
        }
        let count = {
            let mut registry = self.registry.write();
            if registry.streams.contains_key(&stm.id()) {
                return Err(RouterError::AlreadyRegistered(stm.id()));
            }
            registry.streams.insert(stm.id(), Arc::clone(&stm));
            registry.streams.len()
        };
        metrics::registered_streams().record(count as u64, &[]);
        info!(id = %stm.id(), "registered c2s stream");
        Ok(())
    }

    /// Unregister a client stream, removing its bound resource.
    ///
    /// Fails if the stream was never registered.
    pub fn unregister_stream(&self, stm: &dyn ClientStream) -> Result<(), RouterError> {
        let count = {
            let mut registry = self.registry.write();
            if !registry.streams.contains_key(&stm.id()) {
                return Err(RouterError::StreamNotFound(stm.id()));
            }
            let username = stm.username();
            if let Some(authed) = registry.authed.get_mut(&username) {
                let resource = stm.resource();
                if let Some(pos) = authed.iter().position(|s| s.resource() == resource) {
                    authed.remove(pos);
                }
                if authed.is_empty() {
                    registry.authed.remove(&username);
                }
            }
            registry.streams.remove(&stm.id());
            registry.streams.len()
        };
        metrics::registered_streams().record(count as u64, &[]);
        info!(id = %stm.id(), "unregistered c2s stream");
        Ok(())
    }

    /// Mark a previously registered stream as authenticated.
    ///
    /// The stream must have a bound resource. Callers invoke this once
    /// per successful bind; the registry does not deduplicate.
    pub fn authenticate_stream(&self, stm: Arc<dyn ClientStream>) -> Result<(), RouterError> {
        if stm.resource().is_empty() {
            return Err(RouterError::ResourceNotAssigned(stm.id()));
        }
        let (username, resource) = (stm.username(), stm.resource());
        self.registry
            .write()
            .authed
            .entry(username.clone())
            .or_default()
            .push(stm);
        info!(username = %username, resource = %resource, "authenticated c2s stream");
        Ok(())
    }

    /// Drop the cached block list for a user.
    ///
    /// The next routing decision reloads it from storage. Must be
    /// called after any external mutation of the persisted list.
    pub fn reload_block_list(&self, username: &str) {
        self.registry.write().block_lists.remove(username);
        info!(username = %username, "block list reloaded");
    }

    /// All authenticated streams matching a JID.
    ///
    /// The match mask always includes the domain, adds the resource
    /// for full JIDs and the node when one is present. Returns an
    /// empty list for non-local domains.
    pub fn streams_matching_jid(&self, jid: &Jid) -> Vec<Arc<dyn ClientStream>> {
        if !self.is_local_domain(jid.domain().as_str()) {
            return Vec::new();
        }
        let mut parts = JidParts::DOMAIN;
        if jid.resource().is_some() {
            parts |= JidParts::RESOURCE;
        }

        let registry = self.registry.read();
        let mut matched = Vec::new();
        if let Some(node) = jid.node() {
            parts |= JidParts::NODE;
            if let Some(streams) = registry.authed.get(node.as_str()) {
                for stm in streams {
                    if jid_matches(&stm.jid(), jid, parts) {
                        matched.push(Arc::clone(stm));
                    }
                }
            }
        } else {
            for streams in registry.authed.values() {
                for stm in streams {
                    if jid_matches(&stm.jid(), jid, parts) {
                        matched.push(Arc::clone(stm));
                    }
                }
            }
        }
        matched
    }

    /// Route a stanza, applying the recipient's block list.
    pub async fn route(&self, stanza: &Stanza) -> Result<(), RouterError> {
        self.count_errors(self.do_route(stanza, false).await)
    }

    /// Route a stanza, ignoring block lists.
    pub async fn must_route(&self, stanza: &Stanza) -> Result<(), RouterError> {
        self.count_errors(self.do_route(stanza, true).await)
    }

    fn count_errors(&self, result: Result<(), RouterError>) -> Result<(), RouterError> {
        if let Err(err) = &result {
            metrics::routing_errors().add(1, &[KeyValue::new("error", err.error_code())]);
        }
        result
    }

    /// Whether `jid` matches any entry of a user's block list.
    ///
    /// The list is loaded lazily from storage and cached until
    /// [`reload_block_list`] drops it. Storage failures degrade to
    /// "no blocks" and are not cached.
    ///
    /// [`reload_block_list`]: SessionRouter::reload_block_list
    pub async fn is_blocked_jid(&self, jid: &Jid, username: &str) -> bool {
        self.block_list(username)
            .await
            .iter()
            .any(|blocked| jid_match::matches_blocked_jid(jid, blocked))
    }

    async fn do_route(&self, stanza: &Stanza, ignore_blocking: bool) -> Result<(), RouterError> {
        let Some(to) = stanza.to() else {
            // Stanzas without a destination are the stream layer's
            // concern, not this router's.
            return Ok(());
        };
        if !self.is_local_domain(to.domain().as_str()) {
            return Ok(());
        }
        if !ignore_blocking && !jid_match::is_server(to) {
            let node = to.node().map(|n| n.as_str()).unwrap_or_default();
            // Block patterns match against the sender JID; a stanza
            // without one (server-originated, the connection layer
            // stamps `from` on everything a client sends) has nothing
            // to match and passes.
            let blocked = match stanza.from() {
                Some(from) => self.is_blocked_jid(from, node).await,
                None => false,
            };
            if blocked {
                return Err(RouterError::BlockedJid);
            }
        }

        let recipients = self.streams_matching_jid(&Jid::from(to.to_bare()));
        if recipients.is_empty() {
            let node = to.node().map(|n| n.as_str()).unwrap_or_default();
            let exists = self.storage.user_exists(node).await?;
            if exists {
                return Err(RouterError::NotAuthenticated);
            }
            return Err(RouterError::NotExistingAccount);
        }

        if jid_match::is_full_with_user(to) {
            let resource = to.resource().map(|r| r.as_str()).unwrap_or_default();
            for stm in &recipients {
                if stm.resource() == resource {
                    stm.send_element(stanza.clone());
                    metrics::stanzas_routed().add(1, &[KeyValue::new("kind", stanza.name())]);
                    return Ok(());
                }
            }
            return Err(RouterError::ResourceNotFound);
        }

        match stanza {
            Stanza::Message(_) => {
                // Deliver to the highest-priority resource; ties keep
                // the first seen, and no presence counts as zero.
                let mut best = &recipients[0];
                let mut highest = best.presence().map(|p| p.priority).unwrap_or(0);
                for rcp in recipients.iter().skip(1) {
                    if let Some(p) = rcp.presence() {
                        if p.priority > highest {
                            best = rcp;
                            highest = p.priority;
                        }
                    }
                }
                debug!(to = %to, resource = %best.resource(), priority = highest, "delivering message");
                best.send_element(stanza.clone());
            }
            _ => {
                for stm in &recipients {
                    stm.send_element(stanza.clone());
                }
            }
        }
        metrics::stanzas_routed().add(1, &[KeyValue::new("kind", stanza.name())]);
        Ok(())
    }

    async fn block_list(&self, username: &str) -> Vec<Jid> {
        {
            let registry = self.registry.read();
            if let Some(list) = registry.block_lists.get(username) {
                return list.clone();
            }
        }
        // Not cached: fetch outside the lock. Two racing loaders may
        // both fetch; the last writer wins with an equal list.
        let items = match self.storage.fetch_block_list_items(username).await {
            Ok(items) => items,
            Err(err) => {
                warn!(username = %username, error = %err, "failed to fetch block list");
                return Vec::new();
            }
        };
        let list: Vec<Jid> = items.iter().filter_map(|item| item.jid.parse().ok()).collect();
        self.registry
            .write()
            .block_lists
            .insert(username.to_string(), list.clone());
        list
    }
}

impl std::fmt::Debug for SessionRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.registry.read();
        f.debug_struct("SessionRouter")
            .field("domains", &self.cfg.domains)
            .field("streams", &registry.streams.len())
            .field("authed_users", &registry.authed.len())
            .finish()
    }
}

// ============================================================================
// Process-wide instance
// ============================================================================

static INITIALIZED: AtomicU32 = AtomicU32::new(0);
static INSTANCE: RwLock<Option<Arc<SessionRouter>>> = RwLock::new(None);

/// Initialize the process-wide session router.
///
/// Concurrent calls are serialized by a compare-and-swap; only the
/// first caller constructs the instance, later calls are no-ops.
pub fn initialize(cfg: C2sConfig, storage: Arc<dyn Storage>) -> Result<(), RouterError> {
    if INITIALIZED
        .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
        .is_ok()
    {
        match SessionRouter::new(cfg, storage) {
            Ok(router) => *INSTANCE.write() = Some(Arc::new(router)),
            Err(err) => {
                INITIALIZED.store(0, Ordering::SeqCst);
                return Err(err);
            }
        }
    }
    Ok(())
}

/// Get the process-wide session router.
///
/// # Panics
///
/// Panics if [`initialize`] has not completed; calling before
/// initialization is a programming error.
pub fn instance() -> Arc<SessionRouter> {
    INSTANCE
        .read()
        .clone()
        .expect("c2s session router not initialized")
}

/// Tear down the process-wide session router.
///
/// Intended for tests only.
pub fn shutdown() {
    if INITIALIZED
        .compare_exchange(1, 0, Ordering::SeqCst, Ordering::SeqCst)
        .is_ok()
    {
        *INSTANCE.write() = None;
    }
}
