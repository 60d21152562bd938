//! # Dispatcher Module
//!
//! The per-request core: given a request and a response, find the action for
//! the request path and run it, or render a fallback page.
//!
//! ## Request Flow
//!
//! 1. `onRequest` fires with the request
//! 2. The response content type defaults to `text/html; charset=UTF-8`
//! 3. The continuation gate may handle the request outright
//! 4. The setup module is loaded fresh and its url table walked in order;
//!    the first entry whose pattern matches and whose action resolves wins
//! 5. The action runs with the request, the response and the capture groups
//! 6. No match renders the 404 page; any error or panic renders the 500 page
//! 7. `onResponse` fires with the finished response, exactly once
//!
//! ## Example
//!
//! ```rust
//! use webdispatch::dispatcher::{Dispatcher, Outcome};
//! use webdispatch::registry::{ActionRegistry, Module};
//! use webdispatch::server::{Request, Response};
//! use webdispatch::setup::{Setup, StaticSetup};
//!
//! let registry = ActionRegistry::new().with_module(
//!     Module::new("pets").action("show", |_req, res, groups| {
//!         res.write(&[&"pet", &groups[0].as_deref().unwrap_or("?")]);
//!         Ok(())
//!     }),
//! );
//! let dispatcher = Dispatcher::builder(StaticSetup::new(
//!     Setup::new().route(r"^pets/(\d+)$", "pets.show"),
//! ))
//! .loader(registry)
//! .build();
//!
//! let mut res = Response::new();
//! let outcome = dispatcher.handle_request(&Request::get("/pets/42"), &mut res);
//! assert_eq!(outcome, Outcome::Handled { route_index: 0 });
//! assert_eq!(res.body(), "pet 42");
//! ```
//!
//! ## Error Handling
//!
//! Configuration, resolution and action errors are caught per request and
//! rendered by [`fallback::error`]; they never reach the transport and never
//! affect other requests. Hook failures are logged and ignored.

mod core;
pub mod fallback;

pub use core::{Dispatcher, DispatcherBuilder, Outcome};
