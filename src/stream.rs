//! The client stream capability consumed by the router.

use jid::Jid;
use xmpp_parsers::presence::Presence;

use crate::context::StreamContext;
use crate::stanza::Stanza;

/// Error handed to [`ClientStream::disconnect`].
pub type StreamError = Box<dyn std::error::Error + Send + Sync>;

/// One connected client, as seen by the session registry.
///
/// The connection layer owns negotiation, TLS, SASL and resource
/// binding; the registry only consumes the resulting identity and
/// delivery sink. Identity accessors return the current bind state:
/// `resource` is empty until a resource is bound, and `jid` reflects
/// whatever is bound so far.
pub trait ClientStream: Send + Sync {
    /// Unique stream identifier.
    fn id(&self) -> String;

    /// Stream-scoped shared context.
    fn context(&self) -> &StreamContext;

    /// Account local part bound to this stream.
    fn username(&self) -> String;

    /// Domain this stream connected to.
    fn domain(&self) -> String;

    /// Bound resource; empty until resource binding completes.
    fn resource(&self) -> String;

    /// Current JID of the stream.
    fn jid(&self) -> Jid;

    /// Whether the transport is secured (TLS).
    fn is_secured(&self) -> bool;

    /// Whether SASL authentication has completed.
    fn is_authenticated(&self) -> bool;

    /// Whether stream compression is active.
    fn is_compressed(&self) -> bool;

    /// Last presence broadcast by this stream, if any.
    fn presence(&self) -> Option<Presence>;

    /// Queue a stanza for delivery to this client.
    ///
    /// Must be non-blocking and must tolerate being called after the
    /// stream was unregistered; a send racing teardown is dropped by
    /// the implementation, not surfaced to the router.
    fn send_element(&self, stanza: Stanza);

    /// Disconnect the stream, optionally with an error.
    ///
    /// Never invoked by the router; exposed for modules that own the
    /// stream lifecycle.
    fn disconnect(&self, err: Option<StreamError>);
}
