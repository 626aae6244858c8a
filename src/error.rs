//! Error types for the session registry and router.

use thiserror::Error;

use crate::storage::StorageError;

/// Routing and registry errors.
///
/// Routing errors are returned to the caller, never written to the wire;
/// the connection layer decides how (and whether) to surface them as
/// stanza errors.
#[derive(Debug, Error)]
pub enum RouterError {
    /// No local account exists for the destination node.
    #[error("account does not exist")]
    NotExistingAccount,

    /// The account exists but has no bound resources right now.
    #[error("user not authenticated")]
    NotAuthenticated,

    /// A full JID was addressed but no bound stream has that resource.
    #[error("resource not found")]
    ResourceNotFound,

    /// The sender matches an entry in the recipient's block list.
    #[error("destination jid is blocked")]
    BlockedJid,

    /// Stream domain is not one of the configured local domains.
    #[error("invalid domain: {0}")]
    InvalidDomain(String),

    /// A stream with the same id is already registered.
    #[error("stream already registered: {0}")]
    AlreadyRegistered(String),

    /// The stream was never registered (or already unregistered).
    #[error("stream not found: {0}")]
    StreamNotFound(String),

    /// Authentication requires a bound resource first.
    #[error("resource not yet assigned: {0}")]
    ResourceNotAssigned(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage failure, propagated verbatim.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl RouterError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotExistingAccount => "not_existing_account",
            Self::NotAuthenticated => "not_authenticated",
            Self::ResourceNotFound => "resource_not_found",
            Self::BlockedJid => "blocked_jid",
            Self::InvalidDomain(_) => "invalid_domain",
            Self::AlreadyRegistered(_) => "already_registered",
            Self::StreamNotFound(_) => "stream_not_found",
            Self::ResourceNotAssigned(_) => "resource_not_assigned",
            Self::Config(_) => "config",
            Self::Storage(_) => "storage",
        }
    }
}
