use super::fallback;
use crate::continuation::{ContinuationGate, NoContinuations};
use crate::error::{ActionRuntimeError, DispatchError, ResolutionError};
use crate::hooks::{CallbackRegistry, HookArg, ON_REQUEST, ON_RESPONSE};
use crate::registry::{resolve_action, ActionRegistry, ModuleLoader, ResolutionPolicy};
use crate::router::{self, normalize_path};
use crate::server::response::DEFAULT_CONTENT_TYPE;
use crate::server::{Request, Response};
use crate::setup::SetupSource;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span};

/// How a request was finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The continuation gate handled the request; the url table was not read
    Resumed,
    /// An action ran to completion
    Handled {
        /// Position of the winning entry in the url table
        route_index: usize,
    },
    /// No entry matched (or there was no url table)
    NotFound,
    /// The error page was rendered
    Failed,
}

/// Per-request dispatcher over a url table re-read on every request.
///
/// Holds no per-request mutable state, so one instance serves all concurrent
/// requests behind an `Arc`.
pub struct Dispatcher {
    setup: Arc<dyn SetupSource>,
    loader: Arc<dyn ModuleLoader>,
    callbacks: CallbackRegistry,
    continuations: Arc<dyn ContinuationGate>,
    policy: ResolutionPolicy,
}

/// Builder for [`Dispatcher`]; see [`Dispatcher::builder`].
pub struct DispatcherBuilder {
    setup: Arc<dyn SetupSource>,
    loader: Arc<dyn ModuleLoader>,
    callbacks: CallbackRegistry,
    continuations: Arc<dyn ContinuationGate>,
    policy: ResolutionPolicy,
}

impl DispatcherBuilder {
    /// Module loader used for `module.function` references. Defaults to an
    /// empty [`ActionRegistry`].
    #[must_use]
    pub fn loader(mut self, loader: impl ModuleLoader + 'static) -> Self {
        self.loader = Arc::new(loader);
        self
    }

    #[must_use]
    pub fn callbacks(mut self, callbacks: CallbackRegistry) -> Self {
        self.callbacks = callbacks;
        self
    }

    #[must_use]
    pub fn continuations(mut self, gate: Arc<dyn ContinuationGate>) -> Self {
        self.continuations = gate;
        self
    }

    #[must_use]
    pub fn policy(mut self, policy: ResolutionPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn build(self) -> Dispatcher {
        Dispatcher {
            setup: self.setup,
            loader: self.loader,
            callbacks: self.callbacks,
            continuations: self.continuations,
            policy: self.policy,
        }
    }
}

impl Dispatcher {
    pub fn builder(setup: impl SetupSource + 'static) -> DispatcherBuilder {
        Self::builder_shared(Arc::new(setup))
    }

    /// Like [`Dispatcher::builder`] for a setup source chosen at runtime.
    #[must_use]
    pub fn builder_shared(setup: Arc<dyn SetupSource>) -> DispatcherBuilder {
        DispatcherBuilder {
            setup,
            loader: Arc::new(ActionRegistry::new()),
            callbacks: CallbackRegistry::new(),
            continuations: Arc::new(NoContinuations),
            policy: ResolutionPolicy::default(),
        }
    }

    /// The setup source requests are routed from.
    #[must_use]
    pub fn setup_source(&self) -> &dyn SetupSource {
        self.setup.as_ref()
    }

    #[must_use]
    pub fn policy(&self) -> ResolutionPolicy {
        self.policy
    }

    /// Dispatch one request.
    ///
    /// Fires `onRequest`, asks the continuation gate, then walks the url
    /// table. Every failure (including a panic) is rendered as the error page.
    /// `onResponse` fires exactly once on every path, after the response is
    /// complete.
    pub fn handle_request(&self, req: &Request, res: &mut Response) -> Outcome {
        let span = info_span!(
            "dispatch",
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path
        );
        let _entered = span.enter();
        let started = Instant::now();

        let mut res = ResponseGuard {
            res,
            callbacks: &self.callbacks,
        };
        self.callbacks
            .invoke_callback(ON_REQUEST, HookArg::Request(req));
        res.content_type = DEFAULT_CONTENT_TYPE.to_string();

        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(req, &mut res))) {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => Self::fail(&mut res, &err),
            Err(payload) => {
                let err = DispatchError::from(ActionRuntimeError::from_panic(payload.as_ref()));
                Self::fail(&mut res, &err)
            }
        };

        info!(
            status = res.status,
            outcome = ?outcome,
            duration_us = started.elapsed().as_micros() as u64,
            "Dispatch complete"
        );
        outcome
    }

    fn dispatch(&self, req: &Request, res: &mut Response) -> Result<Outcome, DispatchError> {
        if self
            .continuations
            .resume(req, res)
            .map_err(|e| ActionRuntimeError::from_error(&e))?
        {
            debug!("Request resumed a continuation");
            return Ok(Outcome::Resumed);
        }

        let path = normalize_path(&req.path);
        let setup = self
            .setup
            .load()
            .map_err(|source| ResolutionError::SetupUnavailable { source })?;
        let Some(urls) = setup.urls.as_deref() else {
            debug!("Setup module has no url table");
            fallback::not_found(req, res);
            return Ok(Outcome::NotFound);
        };

        for found in router::matches(urls, path) {
            let found = found?;
            let Some(action) = resolve_action(&found.entry.action, self.loader.as_ref(), self.policy)?
            else {
                continue;
            };
            debug!(
                route_index = found.index,
                action = action.name(),
                matched = %found.matched,
                groups = found.groups.len(),
                "Invoking action"
            );
            action
                .invoke(req, res, &found.groups)
                .map_err(|e| ActionRuntimeError::from_error(&e))?;
            return Ok(Outcome::Handled {
                route_index: found.index,
            });
        }

        fallback::not_found(req, res);
        Ok(Outcome::NotFound)
    }

    fn fail(res: &mut Response, err: &DispatchError) -> Outcome {
        error!(
            kind = err.kind(),
            error = %err,
            causes = ?err.causes(),
            location = ?err.location().map(|l| l.to_string()),
            "Dispatch failed"
        );
        fallback::error(res, err);
        Outcome::Failed
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("callbacks", &self.callbacks)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Fires `onResponse` when dropped, including while unwinding.
struct ResponseGuard<'a> {
    res: &'a mut Response,
    callbacks: &'a CallbackRegistry,
}

impl Deref for ResponseGuard<'_> {
    type Target = Response;

    fn deref(&self) -> &Response {
        self.res
    }
}

impl DerefMut for ResponseGuard<'_> {
    fn deref_mut(&mut self) -> &mut Response {
        self.res
    }
}

impl Drop for ResponseGuard<'_> {
    fn drop(&mut self) {
        self.callbacks
            .invoke_callback(ON_RESPONSE, HookArg::Response(self.res));
    }
}
