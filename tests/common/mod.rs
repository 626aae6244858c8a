//! Test utilities for the session router and registration suites.
//!
//! Provides a mock client stream that records everything sent to it,
//! plus stanza builders and reply assertions.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use jid::Jid;
use minidom::Element;
use parking_lot::Mutex;
use xmpp_parsers::iq::{Iq, IqType};
use xmpp_parsers::message::{Message, MessageType};
use xmpp_parsers::presence::{Presence, Type as PresenceType};
use xmpp_parsers::stanza_error::DefinedCondition;

use tern_xmpp::{ClientStream, Stanza, StreamContext, StreamError};

pub const NS_REGISTER: &str = "jabber:iq:register";

/// Mock client stream that records every stanza sent to it.
pub struct MockStream {
    id: String,
    username: String,
    domain: String,
    resource: String,
    secured: AtomicBool,
    authenticated: AtomicBool,
    context: StreamContext,
    presence: Mutex<Option<Presence>>,
    sent: Mutex<Vec<Stanza>>,
}

impl MockStream {
    /// A stream that completed bind and authentication.
    pub fn bound(username: &str, domain: &str, resource: &str) -> Arc<Self> {
        Arc::new(Self {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            domain: domain.to_string(),
            resource: resource.to_string(),
            secured: AtomicBool::new(true),
            authenticated: AtomicBool::new(true),
            context: StreamContext::new(),
            presence: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
        })
    }

    /// A stream that has not authenticated yet.
    pub fn unauthenticated(username: &str, domain: &str) -> Arc<Self> {
        let stream = Self::bound(username, domain, "");
        stream.authenticated.store(false, Ordering::SeqCst);
        stream
    }

    pub fn set_secured(&self, secured: bool) {
        self.secured.store(secured, Ordering::SeqCst);
    }

    /// Record an available presence with the given priority.
    pub fn set_priority(&self, priority: i8) {
        let mut presence = Presence::new(PresenceType::None);
        presence.priority = priority;
        *self.presence.lock() = Some(presence);
    }

    /// Everything sent to this stream so far.
    pub fn sent(&self) -> Vec<Stanza> {
        self.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    /// The last stanza sent to this stream.
    pub fn last_sent(&self) -> Stanza {
        self.sent
            .lock()
            .last()
            .cloned()
            .expect("no stanza was sent to this stream")
    }
}

impl ClientStream for MockStream {
    fn id(&self) -> String {
        self.id.clone()
    }
    fn context(&self) -> &StreamContext {
        &self.context
    }
    fn username(&self) -> String {
        self.username.clone()
    }
    fn domain(&self) -> String {
        self.domain.clone()
    }
    fn resource(&self) -> String {
        self.resource.clone()
    }
    fn jid(&self) -> Jid {
        let mut jid = String::new();
        if !self.username.is_empty() {
            jid.push_str(&self.username);
            jid.push('@');
        }
        jid.push_str(&self.domain);
        if !self.resource.is_empty() {
            jid.push('/');
            jid.push_str(&self.resource);
        }
        jid.parse().unwrap()
    }
    fn is_secured(&self) -> bool {
        self.secured.load(Ordering::SeqCst)
    }
    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }
    fn is_compressed(&self) -> bool {
        false
    }
    fn presence(&self) -> Option<Presence> {
        self.presence.lock().clone()
    }
    fn send_element(&self, stanza: Stanza) {
        self.sent.lock().push(stanza);
    }
    fn disconnect(&self, _err: Option<StreamError>) {}
}

/// Build a chat message stanza.
pub fn message(from: &str, to: &str) -> Stanza {
    let to: Jid = to.parse().unwrap();
    let mut msg = Message::new(Some(to));
    msg.from = Some(from.parse().unwrap());
    msg.type_ = MessageType::Chat;
    Stanza::Message(msg)
}

/// Build an IQ get stanza with a ping payload.
pub fn iq(from: &str, to: &str) -> Stanza {
    Stanza::Iq(Iq {
        from: Some(from.parse().unwrap()),
        to: Some(to.parse().unwrap()),
        id: uuid::Uuid::new_v4().to_string(),
        payload: IqType::Get(Element::builder("ping", "urn:xmpp:ping").build()),
    })
}

/// Build a presence stanza addressed to a JID.
pub fn presence(from: &str, to: &str) -> Stanza {
    let mut p = Presence::new(PresenceType::None);
    p.from = Some(from.parse().unwrap());
    p.to = Some(to.parse().unwrap());
    Stanza::Presence(p)
}

/// Registration form request (IQ get with an empty query).
pub fn register_get() -> Iq {
    Iq {
        from: None,
        to: None,
        id: "reg1".to_string(),
        payload: IqType::Get(Element::builder("query", NS_REGISTER).build()),
    }
}

/// Registration submission (IQ set with username and password).
pub fn register_set(username: &str, password: &str) -> Iq {
    let query = Element::builder("query", NS_REGISTER)
        .append(
            Element::builder("username", NS_REGISTER)
                .append(username)
                .build(),
        )
        .append(
            Element::builder("password", NS_REGISTER)
                .append(password)
                .build(),
        )
        .build();
    Iq {
        from: None,
        to: None,
        id: "reg2".to_string(),
        payload: IqType::Set(query),
    }
}

/// Registration cancellation (IQ set with a remove child).
pub fn register_remove() -> Iq {
    let query = Element::builder("query", NS_REGISTER)
        .append(Element::builder("remove", NS_REGISTER).build())
        .build();
    Iq {
        from: None,
        to: None,
        id: "unreg1".to_string(),
        payload: IqType::Set(query),
    }
}

/// Assert the stanza is an IQ error with the given condition.
pub fn assert_iq_error(stanza: &Stanza, condition: DefinedCondition) {
    match stanza {
        Stanza::Iq(iq) => match &iq.payload {
            IqType::Error(err) => assert_eq!(err.defined_condition, condition),
            other => panic!("expected IQ error payload, got {:?}", other),
        },
        other => panic!("expected IQ stanza, got {}", other.name()),
    }
}

/// Assert the stanza is an IQ result, returning its payload.
pub fn assert_iq_result(stanza: &Stanza) -> Option<Element> {
    match stanza {
        Stanza::Iq(iq) => match &iq.payload {
            IqType::Result(payload) => payload.clone(),
            other => panic!("expected IQ result payload, got {:?}", other),
        },
        other => panic!("expected IQ stanza, got {}", other.name()),
    }
}
