//! JID shape predicates and component-wise matching.
//!
//! Routing and block-list checks compare JIDs one component at a time:
//! a destination selects which of {node, domain, resource} must match,
//! and a blocked-JID pattern implies a mask from its own shape. The
//! four shapes are:
//!
//! - *server*: `domain`
//! - *bare*: `node@domain`
//! - *full with user*: `node@domain/resource`
//! - *full with server*: `domain/resource`

use bitflags::bitflags;
use jid::Jid;

bitflags! {
    /// Which JID components take part in a comparison.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct JidParts: u8 {
        /// Compare the node (local) part.
        const NODE = 0b001;
        /// Compare the domain part.
        const DOMAIN = 0b010;
        /// Compare the resource part.
        const RESOURCE = 0b100;
    }
}

/// Compare two JIDs on the selected components.
///
/// Components outside the mask are ignored; within the mask, absent
/// components only match absent components.
pub fn jid_matches(jid: &Jid, other: &Jid, parts: JidParts) -> bool {
    if parts.contains(JidParts::NODE) && jid.node() != other.node() {
        return false;
    }
    if parts.contains(JidParts::DOMAIN) && jid.domain() != other.domain() {
        return false;
    }
    if parts.contains(JidParts::RESOURCE) && jid.resource() != other.resource() {
        return false;
    }
    true
}

/// Whether the JID is a server JID (domain only).
pub fn is_server(jid: &Jid) -> bool {
    jid.node().is_none() && jid.resource().is_none()
}

/// Whether the JID is a bare user JID (`node@domain`).
pub fn is_bare(jid: &Jid) -> bool {
    jid.node().is_some() && jid.resource().is_none()
}

/// Whether the JID is a full user JID (`node@domain/resource`).
pub fn is_full_with_user(jid: &Jid) -> bool {
    jid.node().is_some() && jid.resource().is_some()
}

/// Whether the JID is a full server JID (`domain/resource`).
pub fn is_full_with_server(jid: &Jid) -> bool {
    jid.node().is_none() && jid.resource().is_some()
}

/// Whether `jid` matches a block-list pattern.
///
/// The pattern's shape decides which components must match:
///
/// | pattern shape    | compared components        |
/// |------------------|----------------------------|
/// | full with user   | node, domain, resource     |
/// | full with server | domain, resource           |
/// | bare             | node, domain               |
/// | server           | domain                     |
pub fn matches_blocked_jid(jid: &Jid, blocked: &Jid) -> bool {
    if is_full_with_user(blocked) {
        jid_matches(jid, blocked, JidParts::NODE | JidParts::DOMAIN | JidParts::RESOURCE)
    } else if is_full_with_server(blocked) {
        jid_matches(jid, blocked, JidParts::DOMAIN | JidParts::RESOURCE)
    } else if is_bare(blocked) {
        jid_matches(jid, blocked, JidParts::NODE | JidParts::DOMAIN)
    } else {
        jid_matches(jid, blocked, JidParts::DOMAIN)
    }
}
