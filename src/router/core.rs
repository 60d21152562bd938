//! Router core module - hot path for request routing.
//!
//! Route entries are tried strictly in table order and the first entry whose
//! pattern matches wins. Patterns use search semantics: a match anywhere in the
//! normalized path counts, so authors anchor with `^`/`$` when they need to.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use crate::error::ConfigurationError;
use crate::registry::Action;
use once_cell::sync::OnceCell;
use regex::Regex;
use smallvec::SmallVec;
use std::fmt;
use tracing::debug;

/// Maximum number of capture groups before heap allocation.
pub const MAX_INLINE_CAPTURES: usize = 8;

/// Positional capture groups of a match, group 1 first.
///
/// Groups that did not participate in the match are `None`.
pub type Captures = SmallVec<[Option<String>; MAX_INLINE_CAPTURES]>;

/// Strip exactly one leading `/` from a request path.
///
/// No other normalization happens here; percent-decoding is done by the
/// transport before the dispatcher sees the path.
#[inline]
#[must_use]
pub fn normalize_path(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

/// Pattern half of a route entry.
#[derive(Clone)]
pub enum PatternSpec {
    /// Already compiled expression
    Regex(Regex),
    /// Expression source, compiled on first use and cached for the lifetime of
    /// the table snapshot
    Source {
        source: String,
        compiled: OnceCell<Result<Regex, regex::Error>>,
    },
    /// Value of some other type found in the table (description of the value)
    Invalid(String),
}

impl PatternSpec {
    pub fn source(source: impl Into<String>) -> Self {
        PatternSpec::Source {
            source: source.into(),
            compiled: OnceCell::new(),
        }
    }

    /// Compile the pattern with default (unanchored) semantics.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::InvalidPatternType`] for a non-pattern value and
    /// [`ConfigurationError::InvalidPattern`] for a string that is not a valid
    /// regular expression.
    pub fn compile(&self) -> Result<&Regex, ConfigurationError> {
        match self {
            PatternSpec::Regex(re) => Ok(re),
            PatternSpec::Source { source, compiled } => compiled
                .get_or_init(|| Regex::new(source))
                .as_ref()
                .map_err(|e| ConfigurationError::InvalidPattern {
                    pattern: source.clone(),
                    source: e.clone(),
                }),
            PatternSpec::Invalid(found) => Err(ConfigurationError::InvalidPatternType {
                found: found.clone(),
            }),
        }
    }
}

impl fmt::Display for PatternSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternSpec::Regex(re) => f.write_str(re.as_str()),
            PatternSpec::Source { source, .. } => f.write_str(source),
            PatternSpec::Invalid(found) => write!(f, "<{found}>"),
        }
    }
}

impl fmt::Debug for PatternSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternSpec::Regex(re) => f.debug_tuple("Regex").field(&re.as_str()).finish(),
            PatternSpec::Source { source, .. } => f.debug_tuple("Source").field(source).finish(),
            PatternSpec::Invalid(found) => f.debug_tuple("Invalid").field(found).finish(),
        }
    }
}

impl From<Regex> for PatternSpec {
    fn from(re: Regex) -> Self {
        PatternSpec::Regex(re)
    }
}

impl From<&str> for PatternSpec {
    fn from(source: &str) -> Self {
        PatternSpec::source(source)
    }
}

impl From<String> for PatternSpec {
    fn from(source: String) -> Self {
        PatternSpec::source(source)
    }
}

/// Action half of a route entry.
#[derive(Clone, Debug)]
pub enum ActionRef {
    /// Callable used as-is
    Callable(Action),
    /// `module.function` reference resolved through a module loader
    Symbolic(String),
    /// Value of some other type found in the table (description of the value)
    Invalid(String),
}

impl From<Action> for ActionRef {
    fn from(action: Action) -> Self {
        ActionRef::Callable(action)
    }
}

impl From<&str> for ActionRef {
    fn from(reference: &str) -> Self {
        ActionRef::Symbolic(reference.to_string())
    }
}

impl From<String> for ActionRef {
    fn from(reference: String) -> Self {
        ActionRef::Symbolic(reference)
    }
}

impl fmt::Display for ActionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionRef::Callable(action) => f.write_str(action.name()),
            ActionRef::Symbolic(reference) => f.write_str(reference),
            ActionRef::Invalid(found) => write!(f, "<{found}>"),
        }
    }
}

/// One `(pattern, action)` line of a url table.
#[derive(Clone, Debug)]
pub struct RouteEntry {
    pub pattern: PatternSpec,
    pub action: ActionRef,
}

impl RouteEntry {
    pub fn new(pattern: impl Into<PatternSpec>, action: impl Into<ActionRef>) -> Self {
        Self {
            pattern: pattern.into(),
            action: action.into(),
        }
    }

    /// Test this entry against a normalized path.
    ///
    /// # Errors
    ///
    /// Returns the pattern's compilation error.
    pub fn captures(&self, path: &str) -> Result<Option<(String, Captures)>, ConfigurationError> {
        let regex = self.pattern.compile()?;
        Ok(regex.captures(path).map(|caps| {
            let matched = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
            let groups = caps
                .iter()
                .skip(1)
                .map(|g| g.map(|m| m.as_str().to_owned()))
                .collect();
            (matched.to_owned(), groups)
        }))
    }
}

/// Result of applying one route entry to a path.
#[derive(Debug, Clone)]
pub struct RouteMatch<'t> {
    /// Position of the entry in its table
    pub index: usize,
    /// The matching entry
    pub entry: &'t RouteEntry,
    /// Text of the whole match (group 0)
    pub matched: String,
    /// Capture groups 1..n in declaration order
    pub groups: Captures,
}

/// Iterate the entries of `table` that match `path`, in table order.
///
/// Entries are compiled lazily as the iterator reaches them. A compilation
/// error is yielded in place of that entry; entries before it have already
/// been tested, entries after it have not.
pub fn matches<'t>(
    table: &'t [RouteEntry],
    path: &'t str,
) -> impl Iterator<Item = Result<RouteMatch<'t>, ConfigurationError>> + 't {
    table.iter().enumerate().filter_map(move |(index, entry)| {
        debug!(route_index = index, pattern = %entry.pattern, "Checking url line");
        match entry.captures(path) {
            Err(e) => Some(Err(e)),
            Ok(None) => None,
            Ok(Some((matched, groups))) => Some(Ok(RouteMatch {
                index,
                entry,
                matched,
                groups,
            })),
        }
    })
}

/// First entry of `table` matching `path`, ignoring what its action resolves to.
///
/// # Errors
///
/// Returns the first compilation error reached before a match.
pub fn first_match<'t>(
    table: &'t [RouteEntry],
    path: &'t str,
) -> Result<Option<RouteMatch<'t>>, ConfigurationError> {
    matches(table, path).next().transpose()
}
