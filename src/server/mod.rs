//! # Server Module
//!
//! Request/response values seen by actions, and the `may_minihttp` transport
//! that feeds them to the dispatcher.
//!
//! - [`Request`] / [`Response`] - value objects passed to actions and hooks
//! - [`AppService`] - `HttpService` adapter around a shared [`crate::dispatcher::Dispatcher`]
//! - [`HttpServer`] / [`ServerHandle`] - start, wait, stop, join
//! - [`WebApp`] - start/stop lifecycle driven by `httpConf`

pub mod http_server;
mod lifecycle;
pub mod request;
pub mod response;
pub mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use lifecycle::WebApp;
pub use request::{parse_request, Request};
pub use response::{write_response, Response, DEFAULT_CONTENT_TYPE};
pub use service::AppService;
