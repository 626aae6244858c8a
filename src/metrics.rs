//! Router metrics for observability.
//!
//! Uses the global OpenTelemetry meter provider, which must be
//! initialized by the host application. Instruments are created on
//! first use and are never part of any routing contract.

use opentelemetry::metrics::{Counter, Gauge, Meter};
use std::sync::OnceLock;

static METER: OnceLock<Meter> = OnceLock::new();

fn meter() -> &'static Meter {
    METER.get_or_init(|| opentelemetry::global::meter("tern-xmpp"))
}

/// Counter for stanzas routed to local recipients.
pub fn stanzas_routed() -> Counter<u64> {
    meter()
        .u64_counter("xmpp.c2s.stanzas.routed")
        .with_description("Total stanzas routed to local streams")
        .with_unit("stanza")
        .build()
}

/// Counter for routing failures, labeled by error code.
pub fn routing_errors() -> Counter<u64> {
    meter()
        .u64_counter("xmpp.c2s.routing.errors")
        .with_description("Total routing failures by error code")
        .with_unit("stanza")
        .build()
}

/// Counter for in-band account registrations.
pub fn registrations_total() -> Counter<u64> {
    meter()
        .u64_counter("xmpp.c2s.registrations")
        .with_description("Total accounts created through in-band registration")
        .with_unit("account")
        .build()
}

/// Gauge for currently registered client streams.
pub fn registered_streams() -> Gauge<u64> {
    meter()
        .u64_gauge("xmpp.c2s.streams.registered")
        .with_description("Client streams currently registered")
        .with_unit("stream")
        .build()
}
