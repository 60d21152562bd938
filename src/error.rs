//! # Error Module
//!
//! Typed errors for every failure path of a request dispatch, plus the
//! startup error returned by [`crate::server::WebApp::start`].
//!
//! Per-request errors fall into three categories, all of which are folded into
//! [`DispatchError`] and rendered uniformly by the error page:
//!
//! - [`ConfigurationError`] - malformed pattern, malformed symbolic action
//!   reference, or an action that is neither callable nor symbolic
//! - [`ResolutionError`] - module/symbol lookup failure, or a setup module that
//!   cannot be loaded
//! - [`ActionRuntimeError`] - an error returned (or a panic raised) by the
//!   invoked action itself
//!
//! [`StartupError`] is never caught by the library; it propagates to the
//! process entry point.

use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::panic::Location;

/// Source position attached to an action failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    /// Source file the failure was raised in
    pub file: &'static str,
    /// 1-based line number
    pub line: u32,
}

impl From<&'static Location<'static>> for SourceLocation {
    fn from(loc: &'static Location<'static>) -> Self {
        Self {
            file: loc.file(),
            line: loc.line(),
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Malformed route table content.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// Pattern is neither a compiled regex nor a string
    #[error("Pattern must be a regular expression or string (got {found})")]
    InvalidPatternType {
        /// Description of the value found in the table
        found: String,
    },
    /// Pattern string is not a valid regular expression
    #[error("Invalid route pattern '{pattern}'")]
    InvalidPattern {
        /// The pattern source
        pattern: String,
        /// Underlying regex compilation error
        #[source]
        source: regex::Error,
    },
    /// Symbolic action reference without a `.` separator
    #[error("Action must be of form \"module.function\" (got '{action}')")]
    MalformedActionRef {
        /// The offending reference
        action: String,
    },
    /// Action is neither callable nor a symbolic reference
    #[error("Action must either be a string or a function (got {found})")]
    InvalidActionType {
        /// Description of the value found in the table
        found: String,
    },
    /// Symbolic reference resolved to a non-callable export (strict policy only)
    #[error("Action '{action}' does not resolve to a function")]
    NotCallable {
        /// The symbolic reference
        action: String,
    },
}

/// Failure to look up the code a route points at.
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    /// No module registered under the identifier
    #[error("Module '{module}' not found")]
    ModuleNotFound {
        /// Module identifier
        module: String,
    },
    /// Module exists but does not export the symbol (strict policy only)
    #[error("Module '{module}' has no export named '{symbol}'")]
    SymbolNotFound {
        /// Module identifier
        module: String,
        /// Requested export
        symbol: String,
    },
    /// The setup module holding the route table could not be loaded
    #[error("Couldn't load setup module: {source:#}")]
    SetupUnavailable {
        /// Underlying load/parse error
        #[source]
        source: anyhow::Error,
    },
}

/// Error raised by an action with an explicit source position.
///
/// Actions that want the error page to show where they failed return this
/// (usually via `?` into `anyhow::Error`). The location is the caller of
/// [`ActionFailure::new`].
#[derive(Debug, Clone)]
pub struct ActionFailure {
    message: String,
    location: SourceLocation,
}

impl ActionFailure {
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: Location::caller().into(),
        }
    }

    #[must_use]
    pub fn location(&self) -> SourceLocation {
        self.location
    }
}

impl fmt::Display for ActionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ActionFailure {}

/// Error raised by the invoked action's own logic.
///
/// Diagnostics (cause chain, location, backtrace) are captured eagerly when the
/// error crosses the dispatch boundary so that rendering never needs to touch
/// the original error value.
#[derive(Debug)]
pub struct ActionRuntimeError {
    message: String,
    location: Option<SourceLocation>,
    causes: Vec<String>,
    backtrace: Option<String>,
}

impl ActionRuntimeError {
    /// Capture an error returned by an action.
    #[must_use]
    pub fn from_error(err: &anyhow::Error) -> Self {
        let location = err
            .chain()
            .find_map(|e| e.downcast_ref::<ActionFailure>())
            .map(ActionFailure::location);
        let causes = err.chain().skip(1).map(ToString::to_string).collect();
        Self {
            message: err.to_string(),
            location,
            causes,
            backtrace: captured(err.backtrace()),
        }
    }

    /// Capture a panic payload caught around dispatch.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let detail = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self {
            message: format!("Action panicked: {detail}"),
            location: None,
            causes: Vec::new(),
            backtrace: captured(&Backtrace::capture()),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ActionRuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ActionRuntimeError {}

fn captured(bt: &Backtrace) -> Option<String> {
    (bt.status() == BacktraceStatus::Captured).then(|| bt.to_string())
}

/// Any error caught while dispatching a single request.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Action(#[from] ActionRuntimeError),
}

impl DispatchError {
    /// Short category name used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::Configuration(_) => "configuration",
            DispatchError::Resolution(_) => "resolution",
            DispatchError::Action(_) => "action",
        }
    }

    /// File/line of the failure, when the error carries one.
    #[must_use]
    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            DispatchError::Action(e) => e.location,
            _ => None,
        }
    }

    /// Lower-level causes, outermost first.
    #[must_use]
    pub fn causes(&self) -> Vec<String> {
        if let DispatchError::Action(e) = self {
            return e.causes.clone();
        }
        let mut causes = Vec::new();
        let mut next = std::error::Error::source(self);
        while let Some(err) = next {
            causes.push(err.to_string());
            next = err.source();
        }
        causes
    }

    /// Captured host backtrace, if one was recorded.
    #[must_use]
    pub fn backtrace(&self) -> Option<&str> {
        match self {
            DispatchError::Action(e) => e.backtrace.as_deref(),
            _ => None,
        }
    }
}

/// Failure to bring the HTTP transport up. Fatal by design.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Invalid listen address '{addr}'")]
    InvalidAddress {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed to start HTTP server on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("Server is already running on {addr}")]
    AlreadyRunning { addr: SocketAddr },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fails() -> anyhow::Result<()> {
        Err(ActionFailure::new("boom").into())
    }

    #[test]
    fn test_action_failure_records_caller_location() {
        let err = fails().unwrap_err();
        let captured = ActionRuntimeError::from_error(&err);
        let loc = captured.location.expect("location");
        assert!(loc.file.ends_with("error.rs"));
        assert_eq!(captured.message(), "boom");
    }

    #[test]
    fn test_context_chain_becomes_causes() {
        let err = anyhow::anyhow!("disk full").context("saving order");
        let dispatch: DispatchError = ActionRuntimeError::from_error(&err).into();
        assert_eq!(dispatch.to_string(), "saving order");
        assert_eq!(dispatch.causes(), vec!["disk full".to_string()]);
        assert_eq!(dispatch.kind(), "action");
    }

    #[test]
    fn test_panic_payloads() {
        let err = ActionRuntimeError::from_panic(&"bad index");
        assert_eq!(err.message(), "Action panicked: bad index");
        let err = ActionRuntimeError::from_panic(&String::from("owned"));
        assert_eq!(err.message(), "Action panicked: owned");
        let err = ActionRuntimeError::from_panic(&42_u8);
        assert_eq!(err.message(), "Action panicked: unknown panic payload");
    }

    #[test]
    fn test_configuration_error_walks_regex_source() {
        let source = regex::Regex::new("(").unwrap_err();
        let err: DispatchError = ConfigurationError::InvalidPattern {
            pattern: "(".into(),
            source,
        }
        .into();
        assert_eq!(err.to_string(), "Invalid route pattern '('");
        assert_eq!(err.causes().len(), 1);
        assert!(err.location().is_none());
    }
}
