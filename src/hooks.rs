//! Named lifecycle callbacks.
//!
//! The dispatcher fires [`ON_REQUEST`] before anything else and [`ON_RESPONSE`]
//! exactly once when the request is finished. A missing callback is not an
//! error. Callback failures (errors or panics) are logged and swallowed so a
//! broken hook can never take the request or the `onResponse` guarantee down
//! with it.

use crate::server::{Request, Response};
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::warn;

/// Fired before dispatch with the request.
pub const ON_REQUEST: &str = "onRequest";
/// Fired after dispatch with the finished response.
pub const ON_RESPONSE: &str = "onResponse";

/// Argument handed to a callback.
#[derive(Clone, Copy, Debug)]
pub enum HookArg<'a> {
    Request(&'a Request),
    Response(&'a Response),
}

pub type Callback = Arc<dyn Fn(HookArg<'_>) -> anyhow::Result<()> + Send + Sync>;

/// Name to callback table, built during setup and read-only afterwards.
#[derive(Clone, Default)]
pub struct CallbackRegistry {
    callbacks: HashMap<String, Callback>,
}

impl CallbackRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: &str, callback: F)
    where
        F: Fn(HookArg<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.callbacks.insert(name.to_string(), Arc::new(callback));
    }

    #[must_use]
    pub fn with<F>(mut self, name: &str, callback: F) -> Self
    where
        F: Fn(HookArg<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(name, callback);
        self
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.callbacks.contains_key(name)
    }

    /// Invoke the callback registered as `name`, if any.
    ///
    /// Returns whether a callback was found.
    pub fn invoke_callback(&self, name: &str, arg: HookArg<'_>) -> bool {
        let Some(callback) = self.callbacks.get(name) else {
            return false;
        };
        match panic::catch_unwind(AssertUnwindSafe(|| callback(arg))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(callback = name, error = %format!("{e:#}"), "Callback failed"),
            Err(_) => warn!(callback = name, "Callback panicked"),
        }
        true
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("callbacks", &self.callbacks.keys().collect::<Vec<_>>())
            .finish()
    }
}
