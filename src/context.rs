/// Everything a pipeline operation needs to reach the outside world: the
/// shared fetcher, the loaded configuration and an optional caller cancel
/// signal.

use std::sync::Arc;

use crate::config::{HttpConfig, ServiceConfig};
use crate::error::TransportError;
use crate::http::{CancelSignal, Fetcher, HttpTransport, ReqwestTransport};

#[derive(Clone)]
pub struct Context {
    pub fetcher: Fetcher,
    pub config: ServiceConfig,
    cancel: Option<CancelSignal>,
}

impl Context {
    pub fn new(fetcher: Fetcher, config: ServiceConfig) -> Self {
        Context {
            fetcher,
            config,
            cancel: None,
        }
    }

    /// Production context over a `reqwest` transport.
    pub fn from_config(config: ServiceConfig) -> Result<Self, TransportError> {
        let transport = Arc::new(ReqwestTransport::new(&config.http.user_agent)?);
        Ok(Self::with_transport(transport, config))
    }

    pub fn with_transport(transport: Arc<dyn HttpTransport>, config: ServiceConfig) -> Self {
        let fetcher = build_fetcher(transport, &config.http);
        Self::new(fetcher, config)
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn cancel(&self) -> Option<&CancelSignal> {
        self.cancel.as_ref()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelSignal::is_cancelled)
    }
}

pub fn build_fetcher(transport: Arc<dyn HttpTransport>, http: &HttpConfig) -> Fetcher {
    Fetcher::new(transport, http.proxy())
        .direct_first(http.direct_first)
        .with_defaults(http.timeout(), http.retries, http.backoff())
}
