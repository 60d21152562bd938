use crate::dispatcher::Dispatcher;
use crate::echo;
use crate::hot_reload::WatchedSetup;
use crate::registry::{ActionRegistry, ResolutionPolicy};
use crate::runtime_config::HttpConf;
use crate::server::WebApp;
use crate::setup::{FileSetup, MissingSetup, Repositories, SetupSource};
use anyhow::Context;
use clap::Parser;
use std::ffi::OsString;
use std::sync::Arc;
use tracing::{info, warn};

/// Command-line flags, parsed after the leading repository arguments.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "webdispatch")]
#[command(about = "Serve a regex url table over HTTP", long_about = None, version)]
pub struct Cli {
    /// Listen address (`host:port`), overriding the setup module's httpConf
    #[arg(long, env = "WEBDISPATCH_ADDR")]
    pub addr: Option<String>,

    /// Reload the setup module when its file changes
    #[arg(long, default_value_t = false)]
    pub watch: bool,

    /// Fail requests whose action reference names a missing or non-callable export
    #[arg(long, default_value_t = false)]
    pub strict: bool,

    /// Setup module name, looked up as <name>.yaml, <name>.yml or <name>.json
    #[arg(long, default_value = "setup")]
    pub setup: String,
}

impl Cli {
    #[must_use]
    pub fn policy(&self) -> ResolutionPolicy {
        if self.strict {
            ResolutionPolicy::Strict
        } else {
            ResolutionPolicy::Permissive
        }
    }
}

/// Split argv into leading repository directories and everything else.
///
/// The first element (the program name) is kept at the front of the
/// remainder. Repositories run up to, not including, the first argument
/// starting with `-`.
pub fn split_repositories<I, T>(args: I) -> (Repositories, Vec<OsString>)
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut args = args.into_iter().map(Into::into);
    let mut rest: Vec<OsString> = args.next().into_iter().collect();
    let mut repositories = Repositories::new();
    for arg in args.by_ref() {
        if arg.to_string_lossy().starts_with('-') {
            rest.push(arg);
            break;
        }
        repositories.add(arg);
    }
    rest.extend(args);
    (repositories, rest)
}

/// Split and parse a full argv.
///
/// # Errors
///
/// Clap errors for unknown or malformed flags (including `--help`).
pub fn parse_args<I, T>(args: I) -> Result<(Repositories, Cli), clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let (repositories, rest) = split_repositories(args);
    let cli = Cli::try_parse_from(rest)?;
    Ok((repositories, cli))
}

/// Wire up the application the binary serves.
///
/// Registers the built-in `echo` module and locates the setup module in
/// `repositories` (the current directory when none were given). A missing
/// setup module is tolerated: the server starts with default listener
/// settings and every request renders the error page.
///
/// # Errors
///
/// The setup file exists but cannot be watched or initially parsed (`--watch`).
pub fn build_app(mut repositories: Repositories, cli: &Cli) -> anyhow::Result<WebApp> {
    if repositories.is_empty() {
        repositories.add(".");
    }
    info!(repositories = %repositories, setup = %cli.setup, "setup module search");

    let source: Arc<dyn SetupSource> = match repositories.locate(&cli.setup) {
        Some(path) if cli.watch => Arc::new(
            WatchedSetup::watch(&path)
                .with_context(|| format!("failed to watch {}", path.display()))?,
        ),
        Some(path) => {
            info!(path = %path.display(), "Using setup module");
            Arc::new(FileSetup::new(path))
        }
        None => {
            warn!(repositories = %repositories, setup = %cli.setup, "Setup module not found");
            Arc::new(MissingSetup::new(&cli.setup, &repositories))
        }
    };

    let registry = ActionRegistry::new().with_module(echo::module());
    let dispatcher = Dispatcher::builder_shared(source)
        .loader(registry)
        .policy(cli.policy())
        .build();
    Ok(WebApp::new(Arc::new(dispatcher)))
}

/// Start the server and block until it exits.
///
/// # Errors
///
/// Invalid `--addr`, setup watch failures, and startup errors.
pub fn run(repositories: Repositories, cli: &Cli) -> anyhow::Result<()> {
    let app = build_app(repositories, cli)?;
    let conf = cli.addr.as_deref().map(HttpConf::from_addr).transpose()?;
    let addr = app.start(conf)?;
    info!(%addr, "webdispatch listening");
    app.join()
        .map_err(|_| anyhow::anyhow!("server on {addr} panicked"))
}

/// Process entry point: parse `std::env::args_os()` and [`run`].
///
/// # Errors
///
/// See [`run`].
pub fn run_cli() -> anyhow::Result<()> {
    let (repositories, rest) = split_repositories(std::env::args_os());
    let cli = Cli::parse_from(rest);
    run(repositories, &cli)
}
