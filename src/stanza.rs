//! Stanza sum type and reply helpers.
//!
//! The router branches on the stanza kind and needs uniform access to
//! the addressing attributes, so the three top-level stanza kinds are
//! wrapped in a single enum. Reply helpers build result and error
//! stanzas by swapping the addressing of the original, the way an XMPP
//! entity answers an IQ.

use jid::Jid;
use minidom::Element;
use xmpp_parsers::iq::{Iq, IqType};
use xmpp_parsers::message::{Message, MessageType};
use xmpp_parsers::presence::{Presence, Type as PresenceType};
use xmpp_parsers::stanza_error::{DefinedCondition, ErrorType, StanzaError};

/// A top-level XMPP stanza.
#[derive(Debug, Clone)]
pub enum Stanza {
    /// A message stanza.
    Message(Message),
    /// A presence stanza.
    Presence(Presence),
    /// An info/query stanza.
    Iq(Iq),
}

impl Stanza {
    /// Get the stanza kind name for tracing.
    pub fn name(&self) -> &'static str {
        match self {
            Stanza::Message(_) => "message",
            Stanza::Presence(_) => "presence",
            Stanza::Iq(_) => "iq",
        }
    }

    /// Destination JID, if the stanza carries one.
    pub fn to(&self) -> Option<&Jid> {
        match self {
            Stanza::Message(m) => m.to.as_ref(),
            Stanza::Presence(p) => p.to.as_ref(),
            Stanza::Iq(iq) => iq.to.as_ref(),
        }
    }

    /// Sender JID, if the stanza carries one.
    pub fn from(&self) -> Option<&Jid> {
        match self {
            Stanza::Message(m) => m.from.as_ref(),
            Stanza::Presence(p) => p.from.as_ref(),
            Stanza::Iq(iq) => iq.from.as_ref(),
        }
    }

    /// Build the error reply for this stanza.
    ///
    /// Addressing is swapped, the type becomes `error` and the defined
    /// condition is attached. Message and presence replies keep the
    /// original payload alongside the error element.
    pub fn error_reply(&self, condition: DefinedCondition, error_type: ErrorType) -> Stanza {
        match self {
            Stanza::Message(m) => {
                let mut reply = m.clone();
                reply.from = m.to.clone();
                reply.to = m.from.clone();
                reply.type_ = MessageType::Error;
                reply.payloads.push(stanza_error(condition, error_type).into());
                Stanza::Message(reply)
            }
            Stanza::Presence(p) => {
                let mut reply = p.clone();
                reply.from = p.to.clone();
                reply.to = p.from.clone();
                reply.type_ = PresenceType::Error;
                reply.payloads.push(stanza_error(condition, error_type).into());
                Stanza::Presence(reply)
            }
            Stanza::Iq(iq) => Stanza::Iq(iq_error_reply(iq, condition, error_type)),
        }
    }
}

impl From<Message> for Stanza {
    fn from(m: Message) -> Self {
        Stanza::Message(m)
    }
}

impl From<Presence> for Stanza {
    fn from(p: Presence) -> Self {
        Stanza::Presence(p)
    }
}

impl From<Iq> for Stanza {
    fn from(iq: Iq) -> Self {
        Stanza::Iq(iq)
    }
}

/// Build a result reply for an IQ, with an optional payload element.
pub fn iq_result_reply(iq: &Iq, payload: Option<Element>) -> Iq {
    Iq {
        from: iq.to.clone(),
        to: iq.from.clone(),
        id: iq.id.clone(),
        payload: IqType::Result(payload),
    }
}

/// Build an error reply for an IQ.
pub fn iq_error_reply(iq: &Iq, condition: DefinedCondition, error_type: ErrorType) -> Iq {
    Iq {
        from: iq.to.clone(),
        to: iq.from.clone(),
        id: iq.id.clone(),
        payload: IqType::Error(stanza_error(condition, error_type)),
    }
}

fn stanza_error(condition: DefinedCondition, error_type: ErrorType) -> StanzaError {
    StanzaError::new(error_type, condition, "en", "")
}
