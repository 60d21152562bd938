//! # Setup Module
//!
//! The setup module is the application's configuration unit: an ordered url
//! table under `urls` and optional listener settings under `httpConf`.
//!
//! It is read through a [`SetupSource`] on **every** request, so a source that
//! re-reads its backing file picks up route changes without a restart.
//!
//! ## File Format
//!
//! YAML (`.yaml`/`.yml`) or JSON (`.json`):
//!
//! ```yaml
//! urls:
//!   - ['^hello/(\w+)$', 'greet.hello']
//!   - ['^echo', 'echo.request']
//! httpConf:
//!   host: 127.0.0.1
//!   port: 8080
//! ```
//!
//! Malformed entries are kept in place as invalid patterns or actions. The
//! configuration error only surfaces when a request actually reaches that entry,
//! so earlier entries keep working.

use crate::router::{ActionRef, PatternSpec, RouteEntry};
use crate::runtime_config::HttpConf;
use anyhow::{Context, Result};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Extensions tried, in order, when locating a setup module.
pub const SETUP_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// Snapshot of the setup module.
#[derive(Debug, Clone, Default)]
pub struct Setup {
    /// Url table; `None` when the module has no usable `urls` sequence
    pub urls: Option<Vec<RouteEntry>>,
    /// Listener settings consumed by [`crate::server::WebApp::start`]
    pub http_conf: Option<HttpConf>,
}

impl Setup {
    /// Empty setup with an empty (but present) url table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            urls: Some(Vec::new()),
            http_conf: None,
        }
    }

    /// Append a route to the url table.
    #[must_use]
    pub fn route(mut self, pattern: impl Into<PatternSpec>, action: impl Into<ActionRef>) -> Self {
        self.urls
            .get_or_insert_with(Vec::new)
            .push(RouteEntry::new(pattern, action));
        self
    }

    #[must_use]
    pub fn http_conf(mut self, conf: HttpConf) -> Self {
        self.http_conf = Some(conf);
        self
    }

    /// Build a setup from an already parsed document.
    ///
    /// # Errors
    ///
    /// Fails only when `httpConf` is present but malformed. Problems in `urls`
    /// are deferred to dispatch time.
    pub fn from_value(value: &Value) -> Result<Self> {
        let urls = match value.get("urls") {
            Some(Value::Array(entries)) => Some(entries.iter().map(entry_from_value).collect()),
            Some(other) => {
                debug!(found = describe(other), "Setup urls is not a sequence");
                None
            }
            None => None,
        };
        let http_conf = value
            .get("httpConf")
            .filter(|v| !v.is_null())
            .map(|v| serde_json::from_value(v.clone()))
            .transpose()
            .context("invalid httpConf")?;
        Ok(Self { urls, http_conf })
    }

    /// Parse a YAML document.
    ///
    /// # Errors
    ///
    /// YAML syntax errors and malformed `httpConf`.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let value: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_yaml::from_str(text).context("setup is not valid YAML")?
        };
        Self::from_value(&value)
    }

    /// Parse a JSON document.
    ///
    /// # Errors
    ///
    /// JSON syntax errors and malformed `httpConf`.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text).context("setup is not valid JSON")?;
        Self::from_value(&value)
    }

    /// Read and parse a setup file, choosing the format by extension.
    ///
    /// # Errors
    ///
    /// I/O and parse errors, with the path as context.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read setup module {}", path.display()))?;
        let parsed = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_yaml_str(&text),
        };
        parsed.with_context(|| format!("failed to parse setup module {}", path.display()))
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

fn pattern_from_value(pattern: &Value) -> PatternSpec {
    match pattern {
        Value::String(s) => PatternSpec::source(s.as_str()),
        other => PatternSpec::Invalid(describe(other).to_string()),
    }
}

fn entry_from_value(value: &Value) -> RouteEntry {
    match value.as_array().map(Vec::as_slice) {
        Some([pattern, action, ..]) => RouteEntry {
            pattern: pattern_from_value(pattern),
            action: match action {
                Value::String(s) => ActionRef::Symbolic(s.clone()),
                other => ActionRef::Invalid(describe(other).to_string()),
            },
        },
        // The pattern still decides whether the line matches.
        Some([pattern]) => RouteEntry {
            pattern: pattern_from_value(pattern),
            action: ActionRef::Invalid("missing action".to_string()),
        },
        _ => {
            let found = format!("{} url line", describe(value));
            RouteEntry {
                pattern: PatternSpec::Invalid(found.clone()),
                action: ActionRef::Invalid(found),
            }
        }
    }
}

/// Where the dispatcher gets its setup snapshot from on each request.
pub trait SetupSource: Send + Sync {
    /// # Errors
    ///
    /// The setup module cannot be read or parsed.
    fn load(&self) -> Result<Arc<Setup>>;
}

impl<F> SetupSource for F
where
    F: Fn() -> Result<Arc<Setup>> + Send + Sync,
{
    fn load(&self) -> Result<Arc<Setup>> {
        self()
    }
}

/// Fixed in-memory setup.
#[derive(Debug, Clone)]
pub struct StaticSetup(Arc<Setup>);

impl StaticSetup {
    #[must_use]
    pub fn new(setup: Setup) -> Self {
        Self(Arc::new(setup))
    }
}

impl SetupSource for StaticSetup {
    fn load(&self) -> Result<Arc<Setup>> {
        Ok(Arc::clone(&self.0))
    }
}

/// Setup file re-read on every request.
#[derive(Debug, Clone)]
pub struct FileSetup {
    path: PathBuf,
}

impl FileSetup {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SetupSource for FileSetup {
    fn load(&self) -> Result<Arc<Setup>> {
        Setup::load_file(&self.path).map(Arc::new)
    }
}

/// Stand-in used when no setup module could be located.
///
/// Every load fails, so requests get the error page and the server starts
/// with default listener settings.
#[derive(Debug, Clone)]
pub struct MissingSetup {
    name: String,
    searched: Vec<PathBuf>,
}

impl MissingSetup {
    #[must_use]
    pub fn new(name: &str, repositories: &Repositories) -> Self {
        Self {
            name: name.to_string(),
            searched: repositories.dirs().to_vec(),
        }
    }
}

impl SetupSource for MissingSetup {
    fn load(&self) -> Result<Arc<Setup>> {
        anyhow::bail!(
            "setup module '{}' not found in {}",
            self.name,
            DisplayDirs(&self.searched)
        )
    }
}

/// Ordered directory search path for setup modules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Repositories {
    dirs: Vec<PathBuf>,
}

impl Repositories {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a directory to the end of the search path.
    pub fn add(&mut self, dir: impl Into<PathBuf>) {
        self.dirs.push(dir.into());
    }

    #[must_use]
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// First `<dir>/<name>.<ext>` that exists, trying directories in order and
    /// [`SETUP_EXTENSIONS`] in order within each directory.
    #[must_use]
    pub fn locate(&self, name: &str) -> Option<PathBuf> {
        self.dirs.iter().find_map(|dir| {
            let exact = dir.join(name);
            if exact.extension().is_some() && exact.is_file() {
                return Some(exact);
            }
            SETUP_EXTENSIONS
                .iter()
                .map(|ext| dir.join(format!("{name}.{ext}")))
                .find(|candidate| candidate.is_file())
        })
    }
}

impl<P: Into<PathBuf>> FromIterator<P> for Repositories {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self {
            dirs: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for Repositories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", DisplayDirs(&self.dirs))
    }
}

struct DisplayDirs<'a>(&'a [PathBuf]);

impl fmt::Display for DisplayDirs<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, dir) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", dir.display())?;
        }
        f.write_str("]")
    }
}
