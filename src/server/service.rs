use super::request::parse_request;
use super::response::{write_response, Response};
use crate::dispatcher::Dispatcher;
use may_minihttp::HttpService;
use std::io;
use std::sync::Arc;
use tracing::debug;

/// `may_minihttp` service that hands every request to a [`Dispatcher`].
///
/// Cloned once per connection by the transport; clones share the dispatcher.
#[derive(Clone)]
pub struct AppService {
    dispatcher: Arc<Dispatcher>,
}

impl AppService {
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }
}

impl HttpService for AppService {
    fn call(
        &mut self,
        req: may_minihttp::Request,
        res: &mut may_minihttp::Response,
    ) -> io::Result<()> {
        let request = parse_request(req);
        let mut response = Response::new();
        let outcome = self.dispatcher.handle_request(&request, &mut response);
        debug!(
            request_id = %request.request_id,
            status = response.status,
            outcome = ?outcome,
            body_size_bytes = response.body().len(),
            "Writing response"
        );
        write_response(res, response);
        Ok(())
    }
}
