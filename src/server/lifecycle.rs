use super::http_server::{HttpServer, ServerHandle};
use super::service::AppService;
use crate::dispatcher::Dispatcher;
use crate::error::StartupError;
use crate::runtime_config::{HttpConf, RuntimeConfig};
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use tracing::{debug, info, warn};

/// Start/stop wrapper tying a [`Dispatcher`] to the HTTP transport.
pub struct WebApp {
    dispatcher: Arc<Dispatcher>,
    runtime: RuntimeConfig,
    server: Mutex<Option<ServerHandle>>,
}

impl WebApp {
    /// Runtime settings are read from the environment.
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            runtime: RuntimeConfig::from_env(),
            server: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_runtime_config(mut self, runtime: RuntimeConfig) -> Self {
        self.runtime = runtime;
        self
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    fn slot(&self) -> MutexGuard<'_, Option<ServerHandle>> {
        self.server.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The listener settings `start(explicit)` would use.
    ///
    /// An explicit configuration wins; otherwise `httpConf` from the setup
    /// module; otherwise defaults. A setup module that cannot be loaded is
    /// logged and tolerated.
    #[must_use]
    pub fn effective_conf(&self, explicit: Option<HttpConf>) -> HttpConf {
        if let Some(conf) = explicit {
            return conf;
        }
        match self.dispatcher.setup_source().load() {
            Ok(setup) => setup.http_conf.clone().unwrap_or_default(),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Couldn't load setup module - using defaults");
                HttpConf::default()
            }
        }
    }

    /// Bind and start serving.
    ///
    /// # Errors
    ///
    /// [`StartupError`] when the address is invalid, cannot be bound, or the
    /// app is already running. Nothing is retried.
    pub fn start(&self, conf: Option<HttpConf>) -> Result<SocketAddr, StartupError> {
        let mut slot = self.slot();
        if let Some(running) = slot.as_ref() {
            return Err(StartupError::AlreadyRunning {
                addr: running.addr(),
            });
        }

        let conf = self.effective_conf(conf);
        let requested = conf.addr();
        let addr = requested
            .to_socket_addrs()
            .and_then(|mut addrs| {
                addrs.next().ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidInput, "address resolved to nothing")
                })
            })
            .map_err(|source| StartupError::InvalidAddress {
                addr: requested.clone(),
                source,
            })?;

        let stack_size = conf.stack_size.unwrap_or(self.runtime.stack_size);
        may::config().set_stack_size(stack_size);

        let service = AppService::new(Arc::clone(&self.dispatcher));
        let handle = HttpServer(service)
            .start(addr)
            .map_err(|source| StartupError::Bind { addr, source })?;
        info!(
            %addr,
            stack_size,
            policy = ?self.dispatcher.policy(),
            "HTTP server started"
        );
        *slot = Some(handle);
        Ok(addr)
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.slot().is_some()
    }

    #[must_use]
    pub fn addr(&self) -> Option<SocketAddr> {
        self.slot().as_ref().map(ServerHandle::addr)
    }

    /// Block until the running server accepts connections.
    ///
    /// # Errors
    ///
    /// `NotConnected` when the app is not running, `TimedOut` when the server
    /// never became reachable.
    pub fn wait_ready(&self) -> io::Result<()> {
        match self.slot().as_ref() {
            Some(handle) => handle.wait_ready(),
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "server not started")),
        }
    }

    /// Stop serving. Stopping an app that is not running does nothing.
    pub fn stop(&self) {
        let Some(handle) = self.slot().take() else {
            debug!("Stop requested but server is not running");
            return;
        };
        let addr = handle.addr();
        handle.stop();
        info!(%addr, "HTTP server stopped");
    }

    /// Block until the server exits.
    ///
    /// The app no longer counts as running once joined, so it cannot be
    /// stopped from another thread while this blocks.
    ///
    /// # Errors
    ///
    /// The server coroutine panicked.
    pub fn join(&self) -> thread::Result<()> {
        let handle = self.slot().take();
        match handle {
            Some(handle) => handle.join(),
            None => Ok(()),
        }
    }
}

impl Drop for WebApp {
    fn drop(&mut self) {
        self.stop();
    }
}
