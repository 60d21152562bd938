//! # Continuations
//!
//! Resumable multi-request interactions (wizard-style flows).
//!
//! Before any routing happens the dispatcher asks its [`ContinuationGate`]
//! whether the request resumes a suspended interaction. When the gate reports
//! the request as handled, routing is skipped entirely.
//!
//! [`ContinuationStore`] is the built-in gate: an action suspends the next step
//! of its flow with [`ContinuationStore::suspend`], links to
//! [`continuation_url`], and the follow-up request carrying
//! `?_continuation=<id>` runs that step exactly once. Steps nobody comes back
//! for expire after the store's TTL.
//!
//! ```rust
//! use std::sync::Arc;
//! use webdispatch::continuation::{continuation_url, ContinuationGate, ContinuationStore};
//! use webdispatch::server::{Request, Response};
//!
//! let store = Arc::new(ContinuationStore::new());
//! let id = store.suspend(|_req, res| {
//!     res.writeln(&[&"step two"]);
//!     Ok(())
//! });
//! let url = continuation_url("/wizard", id);
//! let req = Request::get("/wizard").with_query_param("_continuation", id.to_string());
//! let mut res = Response::new();
//! assert!(store.resume(&req, &mut res).unwrap());
//! assert!(url.ends_with(&id.to_string()));
//! ```

use crate::ids::ContinuationId;
use crate::server::{Request, Response};
use dashmap::DashMap;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

/// Query parameter carrying the id of the continuation to resume.
pub const CONTINUATION_PARAM: &str = "_continuation";

/// Decides whether a request resumes a pending interaction.
pub trait ContinuationGate: Send + Sync {
    /// Resume a pending interaction for this request, if there is one.
    ///
    /// Returns `Ok(true)` when the request has been fully handled.
    ///
    /// # Errors
    ///
    /// Errors raised by the resumed step; the dispatcher renders them as a
    /// server error.
    fn resume(&self, req: &Request, res: &mut Response) -> anyhow::Result<bool>;
}

/// Gate that never resumes anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoContinuations;

impl ContinuationGate for NoContinuations {
    fn resume(&self, _req: &Request, _res: &mut Response) -> anyhow::Result<bool> {
        Ok(false)
    }
}

impl<F> ContinuationGate for F
where
    F: Fn(&Request, &mut Response) -> anyhow::Result<bool> + Send + Sync,
{
    fn resume(&self, req: &Request, res: &mut Response) -> anyhow::Result<bool> {
        self(req, res)
    }
}

/// One suspended step of an interaction.
pub type Continuation =
    Box<dyn FnOnce(&Request, &mut Response) -> anyhow::Result<()> + Send + Sync>;

/// How long a suspended step waits for its follow-up request by default.
pub const DEFAULT_CONTINUATION_TTL: Duration = Duration::from_secs(30 * 60);

struct Pending {
    suspended_at: Instant,
    step: Continuation,
}

/// Concurrent table of suspended steps, each resumable once.
///
/// Steps not resumed within the store's TTL are dropped; expired entries are
/// purged whenever a new step is suspended.
pub struct ContinuationStore {
    pending: DashMap<ContinuationId, Pending>,
    ttl: Duration,
}

impl Default for ContinuationStore {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_CONTINUATION_TTL)
    }
}

impl ContinuationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            pending: DashMap::new(),
            ttl,
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Park `step` until a request carrying the returned id arrives.
    pub fn suspend<F>(&self, step: F) -> ContinuationId
    where
        F: FnOnce(&Request, &mut Response) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.purge_expired();
        let id = ContinuationId::new();
        self.pending.insert(
            id,
            Pending {
                suspended_at: Instant::now(),
                step: Box::new(step),
            },
        );
        debug!(continuation_id = %id, pending = self.pending.len(), "Continuation suspended");
        id
    }

    /// Drop every step older than the TTL. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let before = self.pending.len();
        self.pending
            .retain(|_, pending| pending.suspended_at.elapsed() <= self.ttl);
        let purged = before.saturating_sub(self.pending.len());
        if purged > 0 {
            debug!(purged, "Expired continuations dropped");
        }
        purged
    }

    /// Drop a pending step without running it.
    pub fn cancel(&self, id: ContinuationId) -> bool {
        self.pending.remove(&id).is_some()
    }

    #[must_use]
    pub fn is_pending(&self, id: ContinuationId) -> bool {
        self.pending
            .get(&id)
            .is_some_and(|pending| pending.suspended_at.elapsed() <= self.ttl)
    }

    /// Steps still waiting to be resumed; expired steps are purged first.
    pub fn pending(&self) -> usize {
        self.purge_expired();
        self.pending.len()
    }
}

impl fmt::Debug for ContinuationStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContinuationStore")
            .field("pending", &self.pending.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl ContinuationGate for ContinuationStore {
    fn resume(&self, req: &Request, res: &mut Response) -> anyhow::Result<bool> {
        let Some(raw) = req.get_query_param(CONTINUATION_PARAM) else {
            return Ok(false);
        };
        let Ok(id) = raw.parse::<ContinuationId>() else {
            debug!(continuation_id = raw, "Malformed continuation id");
            return Ok(false);
        };
        let Some((_, pending)) = self.pending.remove(&id) else {
            debug!(continuation_id = %id, "No pending continuation");
            return Ok(false);
        };
        if pending.suspended_at.elapsed() > self.ttl {
            debug!(continuation_id = %id, "Continuation expired");
            return Ok(false);
        }
        debug!(continuation_id = %id, "Resuming continuation");
        (pending.step)(req, res)?;
        Ok(true)
    }
}

/// Link that resumes continuation `id` at `path`.
#[must_use]
pub fn continuation_url(path: &str, id: ContinuationId) -> String {
    let sep = if path.contains('?') { '&' } else { '?' };
    format!("{path}{sep}{CONTINUATION_PARAM}={id}")
}
