//! Identity scoping for cached data.
//!
//! Cached templates are partitioned by the identity that requested them.
//! The current identity is supplied through a [`ScopeProvider`] rather than
//! global state, so callers and tests can substitute their own.

use std::fmt;
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

/// Identity a cache entry belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Guest,
    User(String),
}

impl Scope {
    /// Filesystem safe key for this scope. Distinct scopes never share a key.
    pub fn cache_key(&self) -> String {
        match self {
            Scope::Guest => "guest".to_string(),
            Scope::User(id) => format!("user_{}", encode_path_component(id)),
        }
    }
}

/// Escape `raw` into a single path component without collisions.
///
/// Lowercase ASCII letters, digits and `-` pass through. Every other byte,
/// `_` and uppercase letters included, becomes `_XX` in hex, so the result
/// stays distinct on case-insensitive filesystems too.
pub(crate) fn encode_path_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'-' {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("_{:02X}", byte));
        }
    }
    out
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Guest => f.write_str("guest"),
            Scope::User(id) => write!(f, "user:{}", id),
        }
    }
}

/// Called with `(previous, next)` whenever the identity changes.
pub type ScopeListener = Box<dyn Fn(&Scope, &Scope) + Send + Sync>;

pub trait ScopeProvider: Send + Sync {
    fn current_scope(&self) -> Scope;

    fn on_scope_change(&self, listener: ScopeListener);
}

/// Scope provider backed by the signed-in session.
pub struct SessionScope {
    current: RwLock<Scope>,
    listeners: RwLock<Vec<ScopeListener>>,
}

impl SessionScope {
    pub fn new(initial: Scope) -> Arc<Self> {
        Arc::new(Self {
            current: RwLock::new(initial),
            listeners: RwLock::new(Vec::new()),
        })
    }

    pub fn sign_in(&self, user_id: impl Into<String>) {
        self.set_scope(Scope::User(user_id.into()));
    }

    pub fn sign_out(&self) {
        self.set_scope(Scope::Guest);
    }

    /// Replace the current scope, notifying listeners if it changed.
    pub fn set_scope(&self, next: Scope) {
        let previous = {
            let mut current = match self.current.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if *current == next {
                debug!(scope = %next, "Scope unchanged");
                return;
            }
            std::mem::replace(&mut *current, next.clone())
        };

        info!(from = %previous, to = %next, "Scope changed");

        let listeners = match self.listeners.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        for listener in listeners.iter() {
            listener(&previous, &next);
        }
    }
}

impl ScopeProvider for SessionScope {
    fn current_scope(&self) -> Scope {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn on_scope_change(&self, listener: ScopeListener) {
        let mut listeners = match self.listeners.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        listeners.push(listener);
    }
}
