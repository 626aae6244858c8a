//! Per-stream shared context.
//!
//! A stream context is a thread-safe key/value bag that modules use to
//! share scratch state across the lifetime of a single client stream,
//! plus a one-shot termination signal and a "run at most once" latch
//! keyed by handler name.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;

/// A value stored in a [`StreamContext`].
#[derive(Clone)]
pub enum ContextValue {
    /// String value.
    String(String),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Boolean value.
    Bool(bool),
    /// Opaque shared reference.
    Object(Arc<dyn Any + Send + Sync>),
}

impl std::fmt::Debug for ContextValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) => f.debug_tuple("String").field(s).finish(),
            Self::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Self::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Object(_) => f.write_str("Object(..)"),
        }
    }
}

#[derive(Default)]
struct ContextInner {
    values: HashMap<String, ContextValue>,
    once_handlers: HashSet<String>,
}

/// Stream-scoped context shared between a stream and its modules.
///
/// All methods are safe for concurrent use. Typed accessors return the
/// zero value of the requested type when the key is absent or holds a
/// value of a different type.
pub struct StreamContext {
    inner: RwLock<ContextInner>,
    terminated: AtomicBool,
    done_tx: watch::Sender<bool>,
    done_rx: watch::Receiver<bool>,
}

impl StreamContext {
    /// Create an empty stream context.
    pub fn new() -> Self {
        let (done_tx, done_rx) = watch::channel(false);
        Self {
            inner: RwLock::new(ContextInner::default()),
            terminated: AtomicBool::new(false),
            done_tx,
            done_rx,
        }
    }

    /// Store a string value.
    pub fn set_string(&self, key: &str, value: impl Into<String>) {
        self.set(key, ContextValue::String(value.into()));
    }

    /// Retrieve a previously stored string value.
    pub fn string(&self, key: &str) -> String {
        match self.inner.read().values.get(key) {
            Some(ContextValue::String(s)) => s.clone(),
            _ => String::new(),
        }
    }

    /// Store an integer value.
    pub fn set_int(&self, key: &str, value: i64) {
        self.set(key, ContextValue::Int(value));
    }

    /// Retrieve a previously stored integer value.
    pub fn int(&self, key: &str) -> i64 {
        match self.inner.read().values.get(key) {
            Some(ContextValue::Int(i)) => *i,
            _ => 0,
        }
    }

    /// Store a floating point value.
    pub fn set_float(&self, key: &str, value: f64) {
        self.set(key, ContextValue::Float(value));
    }

    /// Retrieve a previously stored floating point value.
    pub fn float(&self, key: &str) -> f64 {
        match self.inner.read().values.get(key) {
            Some(ContextValue::Float(f)) => *f,
            _ => 0.0,
        }
    }

    /// Store a boolean value.
    pub fn set_bool(&self, key: &str, value: bool) {
        self.set(key, ContextValue::Bool(value));
    }

    /// Retrieve a previously stored boolean value.
    pub fn bool(&self, key: &str) -> bool {
        match self.inner.read().values.get(key) {
            Some(ContextValue::Bool(b)) => *b,
            _ => false,
        }
    }

    /// Store an opaque shared reference.
    pub fn set_object(&self, key: &str, value: Arc<dyn Any + Send + Sync>) {
        self.set(key, ContextValue::Object(value));
    }

    /// Retrieve a previously stored object reference.
    pub fn object(&self, key: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        match self.inner.read().values.get(key) {
            Some(ContextValue::Object(o)) => Some(Arc::clone(o)),
            _ => None,
        }
    }

    /// Run `f` at most once per context for the given handler name.
    ///
    /// The name is marked before the lock is released, so a concurrent
    /// call with the same name skips; `f` itself runs outside the lock
    /// and may re-enter other context methods.
    pub fn do_once<F: FnOnce()>(&self, handler: &str, f: F) {
        {
            let mut inner = self.inner.write();
            if !inner.once_handlers.insert(handler.to_string()) {
                return;
            }
        }
        f();
    }

    /// Get a receiver that resolves once the stream is terminated.
    ///
    /// Await `changed()` on the receiver to block until [`terminate`]
    /// is called; `*borrow()` reads the current state.
    ///
    /// [`terminate`]: StreamContext::terminate
    pub fn done(&self) -> watch::Receiver<bool> {
        self.done_rx.clone()
    }

    /// Whether the stream has been terminated.
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// Signal stream termination.
    ///
    /// # Panics
    ///
    /// Panics if called twice; terminating a stream is a one-shot
    /// transition and a second call is a programming error.
    pub fn terminate(&self) {
        if self.terminated.swap(true, Ordering::SeqCst) {
            panic!("stream context terminated twice");
        }
        let _ = self.done_tx.send(true);
    }

    fn set(&self, key: &str, value: ContextValue) {
        self.inner.write().values.insert(key.to_string(), value);
    }
}

impl Default for StreamContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StreamContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamContext")
            .field("keys", &self.inner.read().values.len())
            .field("terminated", &self.is_terminated())
            .finish()
    }
}
