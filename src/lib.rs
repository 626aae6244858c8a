//! # tern-xmpp
//!
//! Client-to-server session registry and stanza router for an XMPP
//! server, designed to be embedded in a server binary that owns the
//! network, TLS, SASL and stream-negotiation layers.
//!
//! ## Architecture
//!
//! - **[`SessionRouter`]**: process-wide registry of client streams,
//!   authenticated resources grouped by username, and cached per-user
//!   block lists. Routes stanzas per the RFC 6121 server rules:
//!   local-domain filter, block-list filter, resource selection,
//!   priority tie-break for bare-JID messages.
//! - **[`ClientStream`]**: the capability a connection exposes to the
//!   registry — identity, security flags, current presence, and a
//!   non-blocking delivery sink.
//! - **[`StreamContext`]**: thread-safe per-stream key/value bag with
//!   a one-shot termination signal, shared between a stream and its
//!   modules.
//! - **[`xep::xep0077`]**: in-band registration (account creation,
//!   password change, cancellation) against the [`Storage`] boundary.
//!
//! Persistence is consumed through the [`Storage`] trait; an
//! in-memory implementation is provided for single-node deployments
//! and tests.

pub mod config;
pub mod context;
pub mod jid_match;
pub mod metrics;
pub mod router;
pub mod stanza;
pub mod storage;
pub mod stream;
pub mod xep;

mod error;

pub use config::{C2sConfig, RegistrationConfig};
pub use context::{ContextValue, StreamContext};
pub use error::RouterError;
pub use router::SessionRouter;
pub use stanza::{iq_error_reply, iq_result_reply, Stanza};
pub use storage::{BlockListItem, MemoryStorage, Storage, StorageError, User};
pub use stream::{ClientStream, StreamError};
pub use xep::xep0077::InBandRegistration;
