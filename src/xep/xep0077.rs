//! XEP-0077: In-Band Registration
//!
//! Per-stream IQ handler for the `jabber:iq:register` namespace:
//! account creation before authentication, password change and account
//! cancellation after it.
//!
//! ## Protocol Flow
//!
//! 1. Client requests the registration form:
//!    ```xml
//!    <iq type='get' id='reg1'>
//!      <query xmlns='jabber:iq:register'/>
//!    </iq>
//!    ```
//!
//! 2. Server responds with the required fields:
//!    ```xml
//!    <iq type='result' id='reg1'>
//!      <query xmlns='jabber:iq:register'>
//!        <username/>
//!        <password/>
//!      </query>
//!    </iq>
//!    ```
//!
//! 3. Client submits credentials:
//!    ```xml
//!    <iq type='set' id='reg2'>
//!      <query xmlns='jabber:iq:register'>
//!        <username>alice</username>
//!        <password>s3cret</password>
//!      </query>
//!    </iq>
//!    ```
//!
//! 4. Server replies with an empty result, or a stanza error.
//!
//! An authenticated client cancels with `<remove/>` inside the query,
//! or changes its password by submitting `username` and `password`
//! over a secured transport.
//!
//! Every outcome is translated into a reply on the owning stream; no
//! error value escapes the handler.

use std::sync::Arc;

use minidom::Element;
use tracing::{debug, error};
use xmpp_parsers::iq::{Iq, IqType};
use xmpp_parsers::stanza_error::{DefinedCondition, ErrorType};

use crate::config::RegistrationConfig;
use crate::jid_match;
use crate::metrics;
use crate::stanza::{iq_error_reply, iq_result_reply, Stanza};
use crate::storage::{Storage, User};
use crate::stream::ClientStream;

/// Namespace for XEP-0077 In-Band Registration.
pub const NS_REGISTER: &str = "jabber:iq:register";

/// Check whether an IQ belongs to the registration module.
///
/// True when the IQ carries a direct `query` child in the register
/// namespace.
pub fn is_registration_query(iq: &Iq) -> bool {
    match &iq.payload {
        IqType::Get(el) | IqType::Set(el) => is_register_query(el),
        IqType::Result(Some(el)) => is_register_query(el),
        _ => false,
    }
}

fn is_register_query(el: &Element) -> bool {
    el.name() == "query" && el.ns() == NS_REGISTER
}

/// In-band registration handler, one per client stream.
///
/// Owned by the stream and torn down with it. The `registered` latch
/// prevents a second account creation on the same unauthenticated
/// stream.
pub struct InBandRegistration {
    cfg: RegistrationConfig,
    stream: Arc<dyn ClientStream>,
    storage: Arc<dyn Storage>,
    registered: bool,
}

impl InBandRegistration {
    /// Create a registration handler for a stream.
    pub fn new(
        cfg: RegistrationConfig,
        stream: Arc<dyn ClientStream>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        Self {
            cfg,
            stream,
            storage,
            registered: false,
        }
    }

    /// Namespaces owned by this module.
    pub fn associated_namespaces(&self) -> &'static [&'static str] {
        &[NS_REGISTER]
    }

    /// Process a registration IQ, replying on the owning stream.
    pub async fn process_iq(&mut self, iq: &Iq) {
        if !self.is_valid_to_jid(iq.to.as_ref()) {
            self.send_error(iq, DefinedCondition::Forbidden, ErrorType::Auth);
            return;
        }
        if !self.stream.is_authenticated() {
            match &iq.payload {
                IqType::Get(query) if is_register_query(query) => {
                    if !self.cfg.allow_registration {
                        self.send_error(iq, DefinedCondition::NotAllowed, ErrorType::Cancel);
                        return;
                    }
                    self.send_registration_fields(iq, query);
                }
                IqType::Set(query) if is_register_query(query) => {
                    if self.registered {
                        // A second identity on the same stream.
                        self.send_error(iq, DefinedCondition::NotAcceptable, ErrorType::Modify);
                        return;
                    }
                    self.register_new_user(iq, query).await;
                }
                _ => self.send_error(iq, DefinedCondition::BadRequest, ErrorType::Modify),
            }
            return;
        }
        match &iq.payload {
            IqType::Set(query) if is_register_query(query) => {
                if query.get_child("remove", NS_REGISTER).is_some() {
                    self.cancel_registration(iq, query).await;
                    return;
                }
                let username = query.get_child("username", NS_REGISTER);
                let password = query.get_child("password", NS_REGISTER);
                match (username, password) {
                    (Some(username), Some(password)) => {
                        self.change_password(&password.text(), &username.text(), iq).await;
                    }
                    _ => self.send_error(iq, DefinedCondition::BadRequest, ErrorType::Modify),
                }
            }
            _ => self.send_error(iq, DefinedCondition::BadRequest, ErrorType::Modify),
        }
    }

    fn send_registration_fields(&self, iq: &Iq, query: &Element) {
        if query.children().next().is_some() {
            self.send_error(iq, DefinedCondition::BadRequest, ErrorType::Modify);
            return;
        }
        let fields = Element::builder("query", NS_REGISTER)
            .append(Element::builder("username", NS_REGISTER).build())
            .append(Element::builder("password", NS_REGISTER).build())
            .build();
        self.stream
            .send_element(Stanza::Iq(iq_result_reply(iq, Some(fields))));
    }

    async fn register_new_user(&mut self, iq: &Iq, query: &Element) {
        let username = query
            .get_child("username", NS_REGISTER)
            .map(|el| el.text())
            .unwrap_or_default();
        let password = query
            .get_child("password", NS_REGISTER)
            .map(|el| el.text())
            .unwrap_or_default();
        if username.is_empty() || password.is_empty() {
            self.send_error(iq, DefinedCondition::BadRequest, ErrorType::Modify);
            return;
        }
        match self.storage.user_exists(&username).await {
            Ok(true) => {
                self.send_error(iq, DefinedCondition::Conflict, ErrorType::Cancel);
                return;
            }
            Ok(false) => {}
            Err(err) => {
                error!(error = %err, "failed to check user existence");
                self.send_error(iq, DefinedCondition::InternalServerError, ErrorType::Wait);
                return;
            }
        }
        let user = User { username, password };
        if let Err(err) = self.storage.insert_or_update_user(user).await {
            error!(error = %err, "failed to insert user");
            self.send_error(iq, DefinedCondition::InternalServerError, ErrorType::Wait);
            return;
        }
        self.stream.send_element(Stanza::Iq(iq_result_reply(iq, None)));
        self.registered = true;
        metrics::registrations_total().add(1, &[]);
    }

    async fn cancel_registration(&self, iq: &Iq, query: &Element) {
        if !self.cfg.allow_cancel {
            self.send_error(iq, DefinedCondition::NotAllowed, ErrorType::Cancel);
            return;
        }
        if query.children().count() > 1 {
            self.send_error(iq, DefinedCondition::BadRequest, ErrorType::Modify);
            return;
        }
        let username = self.stream.username();
        if let Err(err) = self.storage.delete_user(&username).await {
            error!(username = %username, error = %err, "failed to delete user");
            self.send_error(iq, DefinedCondition::InternalServerError, ErrorType::Wait);
            return;
        }
        debug!(username = %username, "registration cancelled");
        self.stream.send_element(Stanza::Iq(iq_result_reply(iq, None)));
    }

    async fn change_password(&self, password: &str, username: &str, iq: &Iq) {
        if !self.cfg.allow_change {
            self.send_error(iq, DefinedCondition::NotAllowed, ErrorType::Cancel);
            return;
        }
        if username != self.stream.username() {
            self.send_error(iq, DefinedCondition::NotAllowed, ErrorType::Cancel);
            return;
        }
        if !self.stream.is_secured() {
            // The channel is not safe enough for a password change.
            self.send_error(iq, DefinedCondition::NotAuthorized, ErrorType::Auth);
            return;
        }
        let user = match self.storage.fetch_user(username).await {
            Ok(user) => user,
            Err(err) => {
                error!(username = %username, error = %err, "failed to fetch user");
                self.send_error(iq, DefinedCondition::InternalServerError, ErrorType::Wait);
                return;
            }
        };
        let Some(mut user) = user else {
            self.stream.send_element(Stanza::Iq(iq_result_reply(iq, None)));
            return;
        };
        if user.password != password {
            user.password = password.to_string();
            if let Err(err) = self.storage.insert_or_update_user(user).await {
                error!(username = %username, error = %err, "failed to update password");
                self.send_error(iq, DefinedCondition::InternalServerError, ErrorType::Wait);
                return;
            }
        }
        self.stream.send_element(Stanza::Iq(iq_result_reply(iq, None)));
    }

    fn is_valid_to_jid(&self, to: Option<&jid::Jid>) -> bool {
        let Some(to) = to else {
            // A missing 'to' addresses the server itself.
            return true;
        };
        if self.stream.is_authenticated() {
            return jid_match::is_server(to);
        }
        let username = self.stream.username();
        jid_match::is_server(to)
            || (jid_match::is_bare(to) && to.node().map(|n| n.as_str()) == Some(username.as_str()))
    }

    fn send_error(&self, iq: &Iq, condition: DefinedCondition, error_type: ErrorType) {
        self.stream
            .send_element(Stanza::Iq(iq_error_reply(iq, condition, error_type)));
    }
}
