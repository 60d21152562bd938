//! # webdispatch
//!
//! **webdispatch** is a minimal, coroutine-powered HTTP request dispatcher. An
//! ordered table of regular expressions maps request paths to actions; the
//! first matching entry wins and its capture groups become the action's
//! arguments.
//!
//! ## Architecture
//!
//! - **[`router`]** - Path normalization, pattern compilation and first-match search
//! - **[`registry`]** - Modules of named actions and `module.function` resolution
//! - **[`hooks`]** - `onRequest` / `onResponse` lifecycle callbacks
//! - **[`continuation`]** - Resuming suspended multi-request interactions
//! - **[`setup`]** - The setup module (`urls`, `httpConf`) and where it is loaded from
//! - **[`hot_reload`]** - Setup snapshots swapped in when the file changes
//! - **[`dispatcher`]** - The per-request loop and the 404/500 pages
//! - **[`server`]** - Request/response values and the `may_minihttp` transport
//! - **[`cli`]** - The `webdispatch` binary's argument handling
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Server as server::AppService
//!     participant Dispatcher
//!     participant Gate as ContinuationGate
//!     participant Setup as SetupSource
//!     participant Action
//!
//!     Client->>Server: HTTP request
//!     Server->>Dispatcher: handle_request(req, res)
//!     Dispatcher->>Dispatcher: onRequest
//!     Dispatcher->>Gate: resume(req, res)
//!     alt resumed
//!         Gate-->>Dispatcher: true
//!     else routed
//!         Dispatcher->>Setup: load()
//!         Dispatcher->>Dispatcher: first matching url line
//!         Dispatcher->>Action: invoke(req, res, groups)
//!     end
//!     Dispatcher->>Dispatcher: onResponse (always)
//!     Server-->>Client: status, content type, body
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use webdispatch::dispatcher::Dispatcher;
//! use webdispatch::hooks::{CallbackRegistry, HookArg, ON_RESPONSE};
//! use webdispatch::registry::{ActionRegistry, Module};
//! use webdispatch::server::WebApp;
//! use webdispatch::setup::FileSetup;
//!
//! let registry = ActionRegistry::new().with_module(
//!     Module::new("greet").action("hello", |_req, res, groups| {
//!         res.write(&[&"Hello,", &groups[0].as_deref().unwrap_or("world")]);
//!         Ok(())
//!     }),
//! );
//! let callbacks = CallbackRegistry::new().with(ON_RESPONSE, |arg| {
//!     if let HookArg::Response(res) = arg {
//!         tracing::info!(status = res.status, "served");
//!     }
//!     Ok(())
//! });
//!
//! // setup.yaml:
//! //   urls:
//! //     - ['^hello/(\w+)$', 'greet.hello']
//! //   httpConf: { port: 8080 }
//! let dispatcher = Dispatcher::builder(FileSetup::new("setup.yaml"))
//!     .loader(registry)
//!     .callbacks(callbacks)
//!     .build();
//!
//! let app = WebApp::new(Arc::new(dispatcher));
//! app.start(None)?;
//! app.join().ok();
//! # Ok::<(), webdispatch::error::StartupError>(())
//! ```
//!
//! ## Error Handling
//!
//! Everything that can go wrong inside a request is contained in that request:
//! malformed url lines, unknown modules and failing or panicking actions all
//! render a 500 page. Only [`error::StartupError`] escapes, from
//! [`server::WebApp::start`].

pub mod cli;
pub mod continuation;
pub mod dispatcher;
mod echo;
pub mod error;
pub mod hooks;
pub mod hot_reload;
pub mod ids;
pub mod logging;
pub mod registry;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod setup;

pub use dispatcher::{Dispatcher, Outcome};
pub use error::{
    ActionFailure, ActionRuntimeError, ConfigurationError, DispatchError, ResolutionError,
    StartupError,
};
pub use registry::{Action, ActionRegistry, Module, ResolutionPolicy};
pub use router::RouteEntry;
pub use server::{Request, Response, WebApp};
pub use setup::{Setup, SetupSource};
